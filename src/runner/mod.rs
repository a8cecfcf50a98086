//! Match Runner
//!
//! Owns a `World` and drives it tick by tick: collect paddle intents from
//! held keys and AI controllers, move the paddles, run the physics step,
//! report points and hand events to a renderer.
//!
//! The runner knows nothing about win conditions or game modes. It calls
//! `on_score` for every point; deciding when a match is over belongs to
//! the caller (see [`crate::session`]).

pub mod clock;
pub mod task;

use serde::{Serialize, Deserialize};

use crate::ai::controller::AiController;
use crate::game::events::GameEvent;
use crate::game::input::{apply_intent, KeyState};
use crate::game::state::{ArenaConfig, Side, World};
use crate::game::tick::{step, TickResult};
use crate::TICK_RATE;

pub use clock::FrameClock;
pub use task::MatchLoop;

/// Observer for rendered frames.
///
/// Receives the world after each batch of ticks along with every event
/// those ticks emitted.
pub trait Renderer: Send {
    /// Draw (or otherwise consume) one frame.
    fn render(&mut self, world: &World, events: &[GameEvent]);
}

/// Renderer that ignores everything (headless matches, tests).
#[derive(Debug, Default, Clone, Copy)]
pub struct NullRenderer;

impl Renderer for NullRenderer {
    fn render(&mut self, _world: &World, _events: &[GameEvent]) {}
}

/// Timing configuration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RunnerConfig {
    /// Simulation rate (Hz)
    pub tick_rate: u32,
    /// Most ticks run for a single frame; slower frames drop time
    pub max_catch_up_ticks: u32,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            tick_rate: TICK_RATE,
            max_catch_up_ticks: 1,
        }
    }
}

/// Drives one match over its own `World`.
#[derive(Debug)]
pub struct MatchRunner {
    world: World,
    keys: KeyState,
    left_ai: Option<AiController>,
    right_ai: Option<AiController>,
    clock: FrameClock,
    sim_time_ms: f64,
    running: bool,
}

impl MatchRunner {
    /// Create a stopped runner with a fresh world.
    pub fn new(config: RunnerConfig, arena: ArenaConfig, seed: u64) -> Self {
        Self {
            world: World::new(arena, seed),
            keys: KeyState::default(),
            left_ai: None,
            right_ai: None,
            clock: FrameClock::new(config.tick_rate, config.max_catch_up_ticks),
            sim_time_ms: 0.0,
            running: false,
        }
    }

    /// Hand a paddle to an AI controller (replacing any previous one).
    pub fn attach_ai(&mut self, ai: AiController) {
        match ai.side() {
            Side::Left => self.left_ai = Some(ai),
            Side::Right => self.right_ai = Some(ai),
        }
    }

    /// Take a paddle back from its AI controller.
    pub fn detach_ai(&mut self, side: Side) -> Option<AiController> {
        match side {
            Side::Left => self.left_ai.take(),
            Side::Right => self.right_ai.take(),
        }
    }

    /// AI controlling `side`, if any.
    pub fn ai(&self, side: Side) -> Option<&AiController> {
        match side {
            Side::Left => self.left_ai.as_ref(),
            Side::Right => self.right_ai.as_ref(),
        }
    }

    /// Mutable AI controlling `side`, if any.
    pub fn ai_mut(&mut self, side: Side) -> Option<&mut AiController> {
        match side {
            Side::Left => self.left_ai.as_mut(),
            Side::Right => self.right_ai.as_mut(),
        }
    }

    /// Held-key state fed by the input layer.
    pub fn keys_mut(&mut self) -> &mut KeyState {
        &mut self.keys
    }

    /// Current world.
    pub fn world(&self) -> &World {
        &self.world
    }

    /// Mutable world (snapshot restore, effects toggle).
    pub fn world_mut(&mut self) -> &mut World {
        &mut self.world
    }

    /// Simulated time since the last reset (milliseconds).
    pub fn sim_time_ms(&self) -> f64 {
        self.sim_time_ms
    }

    /// Whether frames advance the simulation.
    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Reset to kickoff and begin accepting frames.
    pub fn start(&mut self) {
        self.reset();
        self.running = true;
    }

    /// Stop advancing. Safe to call when already stopped.
    pub fn stop(&mut self) {
        self.running = false;
    }

    /// Restore kickoff positions, clear cosmetics, timers and keys.
    pub fn reset(&mut self) {
        self.world.reset();
        self.keys.clear();
        self.clock.reset();
        self.sim_time_ms = 0.0;
        if let Some(ai) = self.left_ai.as_mut() {
            ai.reset();
        }
        if let Some(ai) = self.right_ai.as_mut() {
            ai.reset();
        }
    }

    /// Run exactly one tick regardless of timing or the running flag.
    pub fn tick(&mut self, on_score: &mut dyn FnMut(Side)) -> TickResult {
        let now_ms = self.sim_time_ms as u64;

        for side in [Side::Left, Side::Right] {
            let mut intent = self.keys.intent(side);
            let ai = match side {
                Side::Left => self.left_ai.as_mut(),
                Side::Right => self.right_ai.as_mut(),
            };
            if let Some(ai) = ai {
                intent = intent.or(ai.update(now_ms, &mut self.world));
            }
            apply_intent(&mut self.world, side, intent);
        }

        let result = step(&mut self.world);
        self.sim_time_ms += self.clock.tick_ms();

        if let Some(scorer) = result.scored {
            on_score(scorer);
        }
        result
    }

    /// Feed a frame delta to the clock and return how many ticks are due.
    /// Always zero while stopped.
    pub fn advance_clock(&mut self, elapsed_ms: f64) -> u32 {
        if !self.running {
            return 0;
        }
        self.clock.advance(elapsed_ms)
    }

    /// Advance by a wall-clock frame delta.
    ///
    /// Runs as many ticks as the clock allows, then renders once if any
    /// ran. Returns the number of ticks run; zero while stopped.
    pub fn frame(
        &mut self,
        elapsed_ms: f64,
        renderer: &mut dyn Renderer,
        on_score: &mut dyn FnMut(Side),
    ) -> u32 {
        let ticks = self.advance_clock(elapsed_ms);
        let mut events = Vec::new();
        for _ in 0..ticks {
            events.extend(self.tick(on_score).events);
        }

        if ticks > 0 {
            renderer.render(&self.world, &events);
        }
        ticks
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::config::Difficulty;
    use crate::core::vec2::Vec2;
    use crate::game::input::Key;

    struct CountingRenderer {
        frames: usize,
        events: usize,
    }

    impl Renderer for CountingRenderer {
        fn render(&mut self, _world: &World, events: &[GameEvent]) {
            self.frames += 1;
            self.events += events.len();
        }
    }

    fn runner() -> MatchRunner {
        MatchRunner::new(RunnerConfig::default(), ArenaConfig::default(), 77)
    }

    #[test]
    fn test_stopped_runner_ignores_frames() {
        let mut r = runner();
        let mut renderer = NullRenderer;
        assert_eq!(r.frame(100.0, &mut renderer, &mut |_| {}), 0);
        assert_eq!(r.world().tick, 0);
    }

    #[test]
    fn test_frame_renders_after_ticks() {
        let mut r = runner();
        r.start();
        let mut renderer = CountingRenderer { frames: 0, events: 0 };

        assert_eq!(r.frame(5.0, &mut renderer, &mut |_| {}), 0);
        assert_eq!(renderer.frames, 0);

        assert_eq!(r.frame(20.0, &mut renderer, &mut |_| {}), 1);
        assert_eq!(renderer.frames, 1);
        // First tick from kickoff touches nothing
        assert_eq!(renderer.events, 0);
    }

    #[test]
    fn test_keys_move_paddles() {
        let mut r = runner();
        r.start();
        r.keys_mut().press(Key::S);
        r.keys_mut().press(Key::ArrowUp);

        r.tick(&mut |_| {});
        assert_eq!(r.world().left.y, 210.0);
        assert_eq!(r.world().right.y, 190.0);
    }

    #[test]
    fn test_on_score_fires_per_point() {
        let mut r = runner();
        r.start();
        let mut points = Vec::new();

        for _ in 0..3 {
            r.world_mut().ball.position = Vec2::new(2.0, 50.0);
            r.world_mut().ball.velocity = Vec2::new(-13.0, 0.0);
            r.world_mut().left.y = 300.0;
            r.tick(&mut |side| points.push(side));
        }

        assert_eq!(points, vec![Side::Right; 3]);
        assert_eq!(r.world().score.right, 3);
    }

    #[test]
    fn test_stop_is_idempotent_and_reset_restores() {
        let mut r = runner();
        r.start();
        for _ in 0..30 {
            r.tick(&mut |_| {});
        }
        r.stop();
        r.stop();
        assert!(!r.is_running());

        r.reset();
        assert_eq!(r.world().ball.position, r.world().config.center());
        assert_eq!(r.world().tick, 0);
        assert_eq!(r.sim_time_ms(), 0.0);
    }

    #[test]
    fn test_ai_drives_its_paddle() {
        let mut r = runner();
        r.attach_ai(AiController::new(Side::Right, Difficulty::Hard, 1));
        r.start();
        r.world_mut().ball.position = Vec2::new(600.0, 40.0);
        r.world_mut().ball.velocity = Vec2::new(5.0, 0.0);

        let start_y = r.world().right.y;
        for _ in 0..5 {
            r.tick(&mut |_| {});
        }
        assert!(r.world().right.y < start_y);
        assert!(r.ai(Side::Right).is_some());
        assert!(r.detach_ai(Side::Right).is_some());
        assert!(r.ai(Side::Right).is_none());
    }

    #[test]
    fn test_ai_vs_ai_is_deterministic() {
        let play = || {
            let mut r = runner();
            r.attach_ai(AiController::new(Side::Left, Difficulty::Normal, 3));
            r.attach_ai(AiController::new(Side::Right, Difficulty::Hard, 4));
            r.start();
            let mut points = Vec::new();
            for _ in 0..5000 {
                r.tick(&mut |side| points.push(side));
            }
            (points, r.world().score)
        };

        assert_eq!(play(), play());
    }
}
