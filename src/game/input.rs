//! Input Capture
//!
//! Raw key-hold state is turned into per-paddle intents. Intents come
//! either from a human (`KeyState`) or from the AI controller; both
//! feed the same [`apply_intent`] so paddles move identically.

use std::collections::BTreeSet;
use serde::{Serialize, Deserialize};

use crate::game::state::{Side, World};

// =============================================================================
// KEYS
// =============================================================================

/// Keys the game listens to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Key {
    /// Left paddle up
    W,
    /// Left paddle down
    S,
    /// Right paddle up
    ArrowUp,
    /// Right paddle down
    ArrowDown,
}

impl Key {
    /// Parse a DOM-style key name (`"w"`, `"ArrowUp"`, ...).
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "w" | "W" => Some(Key::W),
            "s" | "S" => Some(Key::S),
            "ArrowUp" => Some(Key::ArrowUp),
            "ArrowDown" => Some(Key::ArrowDown),
            _ => None,
        }
    }
}

/// Set of currently held keys.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyState {
    held: BTreeSet<Key>,
}

impl KeyState {
    /// Mark a key as held.
    pub fn press(&mut self, key: Key) {
        self.held.insert(key);
    }

    /// Mark a key as released.
    pub fn release(&mut self, key: Key) {
        self.held.remove(&key);
    }

    /// Is `key` held?
    #[inline]
    pub fn is_held(&self, key: Key) -> bool {
        self.held.contains(&key)
    }

    /// Release everything (focus loss, match end).
    pub fn clear(&mut self) {
        self.held.clear();
    }

    /// Intent for one paddle: W/S drive the left, arrows the right.
    pub fn intent(&self, side: Side) -> PaddleIntent {
        let (up, down) = match side {
            Side::Left => (Key::W, Key::S),
            Side::Right => (Key::ArrowUp, Key::ArrowDown),
        };
        PaddleIntent {
            up: self.is_held(up),
            down: self.is_held(down),
        }
    }
}

// =============================================================================
// INTENT
// =============================================================================

/// Directional intent for one paddle for one tick.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaddleIntent {
    /// Move toward y = 0
    pub up: bool,
    /// Move toward the bottom edge
    pub down: bool,
}

impl PaddleIntent {
    /// No movement.
    pub const IDLE: Self = Self { up: false, down: false };
    /// Move up.
    pub const UP: Self = Self { up: true, down: false };
    /// Move down.
    pub const DOWN: Self = Self { up: false, down: true };

    /// Combine two sources (a held key or the AI), either one moves.
    #[inline]
    pub fn or(self, other: Self) -> Self {
        Self {
            up: self.up || other.up,
            down: self.down || other.down,
        }
    }

    /// True when nothing is requested.
    #[inline]
    pub fn is_idle(&self) -> bool {
        !self.up && !self.down
    }
}

/// Move one paddle by its speed according to `intent`, clamped to the canvas.
///
/// Up and down are applied in sequence, so holding both roughly cancels.
pub fn apply_intent(world: &mut World, side: Side, intent: PaddleIntent) {
    let height = world.config.height;
    let paddle = world.paddle_mut(side);
    let speed = paddle.speed;

    if intent.up {
        paddle.move_by(-speed, height);
    }
    if intent.down {
        paddle.move_by(speed, height);
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::state::ArenaConfig;

    #[test]
    fn test_key_names() {
        assert_eq!(Key::from_name("w"), Some(Key::W));
        assert_eq!(Key::from_name("ArrowDown"), Some(Key::ArrowDown));
        assert_eq!(Key::from_name("Enter"), None);
    }

    #[test]
    fn test_intent_mapping() {
        let mut keys = KeyState::default();
        keys.press(Key::W);
        keys.press(Key::ArrowDown);

        assert_eq!(keys.intent(Side::Left), PaddleIntent::UP);
        assert_eq!(keys.intent(Side::Right), PaddleIntent::DOWN);

        keys.release(Key::W);
        assert!(keys.intent(Side::Left).is_idle());

        keys.clear();
        assert!(keys.intent(Side::Right).is_idle());
    }

    #[test]
    fn test_apply_intent_clamps() {
        let mut world = World::new(ArenaConfig::default(), 1);

        apply_intent(&mut world, Side::Left, PaddleIntent::UP);
        assert_eq!(world.left.y, 190.0);

        for _ in 0..100 {
            apply_intent(&mut world, Side::Left, PaddleIntent::UP);
        }
        assert_eq!(world.left.y, 0.0);

        for _ in 0..100 {
            apply_intent(&mut world, Side::Right, PaddleIntent::DOWN);
        }
        assert_eq!(world.right.y, 400.0);
    }

    #[test]
    fn test_intent_or() {
        let combined = PaddleIntent::IDLE.or(PaddleIntent::DOWN);
        assert_eq!(combined, PaddleIntent::DOWN);
    }
}
