//! Game Events
//!
//! Typed events emitted by the physics step. Renderers and match
//! orchestration subscribe to these instead of being called directly.

use serde::{Serialize, Deserialize};
use crate::core::vec2::Vec2;
use crate::game::state::{Score, Side};

/// Which horizontal wall the ball touched.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Wall {
    /// y = 0
    Top,
    /// y = canvas height
    Bottom,
}

/// Game event data.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum GameEventData {
    /// Ball reflected off a wall
    WallBounce {
        wall: Wall,
        position: Vec2,
    },

    /// Ball returned by a paddle
    PaddleHit {
        side: Side,
        /// Normalized impact point on the paddle face, 0 = top, 1 = bottom
        impact: f64,
        /// Speed after acceleration
        speed: f64,
    },

    /// A side scored
    PointScored {
        scorer: Side,
        score: Score,
    },

    /// Ball put back in play after a point
    BallServed {
        toward: Side,
        velocity: Vec2,
    },
}

/// A game event stamped with the tick it happened on.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GameEvent {
    /// Tick when event occurred
    pub tick: u64,

    /// Event data
    pub data: GameEventData,
}

impl GameEvent {
    /// Create a new event.
    pub fn new(tick: u64, data: GameEventData) -> Self {
        Self { tick, data }
    }

    /// Create wall bounce event.
    pub fn wall_bounce(tick: u64, wall: Wall, position: Vec2) -> Self {
        Self::new(tick, GameEventData::WallBounce { wall, position })
    }

    /// Create paddle hit event.
    pub fn paddle_hit(tick: u64, side: Side, impact: f64, speed: f64) -> Self {
        Self::new(tick, GameEventData::PaddleHit { side, impact, speed })
    }

    /// Create point scored event.
    pub fn point_scored(tick: u64, scorer: Side, score: Score) -> Self {
        Self::new(tick, GameEventData::PointScored { scorer, score })
    }

    /// Create ball served event.
    pub fn ball_served(tick: u64, toward: Side, velocity: Vec2) -> Self {
        Self::new(tick, GameEventData::BallServed { toward, velocity })
    }

    /// The scoring side, if this is a point.
    pub fn scorer(&self) -> Option<Side> {
        match self.data {
            GameEventData::PointScored { scorer, .. } => Some(scorer),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scorer_only_on_points() {
        let hit = GameEvent::paddle_hit(3, Side::Left, 0.5, 5.6);
        assert_eq!(hit.scorer(), None);

        let point = GameEvent::point_scored(4, Side::Right, Score { left: 0, right: 1 });
        assert_eq!(point.scorer(), Some(Side::Right));
    }

    #[test]
    fn test_event_json_tagged() {
        let event = GameEvent::wall_bounce(1, Wall::Top, Vec2::new(1.0, 10.0));
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"kind\":\"wall_bounce\""));
        assert!(json.contains("\"wall\":\"top\""));
    }
}
