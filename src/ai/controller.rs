//! AI Paddle Controller
//!
//! A small state machine driven by two timers:
//!
//! - the decision timer re-predicts the target every `reaction_time_ms`
//! - the hold timer stops the paddle from flipping direction more often
//!   than every `min_state_hold_ms`
//!
//! The output is a [`PaddleIntent`], the same thing a human's keys produce.

use serde::{Serialize, Deserialize};
use tracing::debug;

use crate::ai::config::{AiConfig, Difficulty};
use crate::ai::predict::predict_ball_intersection;
use crate::core::rng::DeterministicRng;
use crate::game::input::PaddleIntent;
use crate::game::state::{Side, World};

/// Distance under which HARD may re-commit without waiting out the hold.
const HARD_RECOMMIT_DISTANCE: f64 = 60.0;

/// Chance an EASY decision tick keeps the old target.
const EASY_SKIP_PREDICTION: f64 = 0.2;

/// Chance an EASY paddle ignores a chance to change direction.
const EASY_IGNORE_CHANGE: f64 = 0.15;

/// Controller state.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AiState {
    /// No decision made since the last reset
    #[default]
    Waiting,
    /// Holding "up"
    MoveUp,
    /// Holding "down"
    MoveDown,
    /// Inside the dead band
    Idle,
}

impl AiState {
    fn intent(self) -> PaddleIntent {
        match self {
            AiState::MoveUp => PaddleIntent::UP,
            AiState::MoveDown => PaddleIntent::DOWN,
            AiState::Waiting | AiState::Idle => PaddleIntent::IDLE,
        }
    }

    fn is_moving(self) -> bool {
        matches!(self, AiState::MoveUp | AiState::MoveDown)
    }
}

/// Direction to take toward `target` from a paddle centered at `center`.
pub fn determine_next_state(center: f64, target: f64, threshold: f64) -> AiState {
    let distance = target - center;
    if distance.abs() <= threshold {
        AiState::Idle
    } else if distance < 0.0 {
        AiState::MoveUp
    } else {
        AiState::MoveDown
    }
}

/// Computer opponent for one paddle.
#[derive(Clone, Debug)]
pub struct AiController {
    side: Side,
    difficulty: Difficulty,
    config: AiConfig,
    state: AiState,
    last_decision_ms: Option<u64>,
    last_state_change_ms: Option<u64>,
    target_y: Option<f64>,
    consecutive_losses: u32,
    rng: DeterministicRng,
}

impl AiController {
    /// Create a controller for `side` at the given tier.
    pub fn new(side: Side, difficulty: Difficulty, seed: u64) -> Self {
        Self {
            side,
            difficulty,
            config: difficulty.preset(),
            state: AiState::Waiting,
            last_decision_ms: None,
            last_state_change_ms: None,
            target_y: None,
            consecutive_losses: 0,
            rng: DeterministicRng::new(seed),
        }
    }

    /// Switch tier. Restores the tier preset, discarding any tuning, and
    /// resets the state machine.
    pub fn set_difficulty(&mut self, difficulty: Difficulty) {
        self.difficulty = difficulty;
        self.config = difficulty.preset();
        self.reset();
    }

    /// Forget timers and target; the next `update` decides immediately.
    pub fn reset(&mut self) {
        self.state = AiState::Waiting;
        self.last_decision_ms = None;
        self.last_state_change_ms = None;
        self.target_y = None;
    }

    /// The human won a match: sharpen the active config one step.
    pub fn on_loss(&mut self) {
        self.consecutive_losses += 1;
        self.config = self
            .config
            .tuned(self.difficulty.tuning_step(), self.difficulty.tuning_bounds());
        self.reset();

        debug!(
            difficulty = %self.difficulty,
            losses = self.consecutive_losses,
            accuracy = self.config.prediction_accuracy,
            error = self.config.error_margin,
            "AI tuned after loss"
        );
    }

    /// The AI won a match. The config is never softened.
    pub fn on_win(&mut self) {
        self.consecutive_losses = 0;
    }

    /// Advance the controller to `now_ms` and return this tick's intent.
    ///
    /// Also sets the controlled paddle's speed to the tier's `max_speed`.
    pub fn update(&mut self, now_ms: u64, world: &mut World) -> PaddleIntent {
        let config = self.config;
        let height = world.config.height;
        world.paddle_mut(self.side).speed = config.max_speed;
        let paddle = world.paddle(self.side);
        let center = paddle.center_y();

        let should_decide = elapsed_at_least(self.last_decision_ms, now_ms, config.reaction_time_ms);
        let can_change = elapsed_at_least(self.last_state_change_ms, now_ms, config.min_state_hold_ms);

        if should_decide {
            self.last_decision_ms = Some(now_ms);
            let skip = self.difficulty == Difficulty::Easy
                && self.target_y.is_some()
                && self.rng.chance(EASY_SKIP_PREDICTION);
            if !skip {
                self.target_y = Some(predict_ball_intersection(
                    &world.ball,
                    paddle,
                    height,
                    self.difficulty,
                    &config,
                    &mut self.rng,
                ));
            }
            if self.state == AiState::Waiting {
                self.state = AiState::Idle;
            }
        }

        let target = self.target_y.unwrap_or(height / 2.0);

        if can_change {
            let next = determine_next_state(center, target, config.threshold);
            let hesitate = self.difficulty == Difficulty::Easy
                && self.state.is_moving()
                && self.rng.chance(EASY_IGNORE_CHANGE);

            if !hesitate && next != self.state {
                let close = (target - center).abs() < HARD_RECOMMIT_DISTANCE;
                self.last_state_change_ms = if self.difficulty == Difficulty::Hard && close {
                    Some(now_ms.saturating_sub(config.min_state_hold_ms))
                } else {
                    Some(now_ms)
                };
                self.state = next;
            }
        }

        // Never push into a wall; stop right away instead of waiting
        // for the next decision.
        let blocked = match self.state {
            AiState::MoveUp => paddle.at_top(),
            AiState::MoveDown => paddle.at_bottom(height),
            _ => false,
        };
        if blocked {
            self.state = AiState::Idle;
            self.last_state_change_ms = Some(now_ms);
        }

        if let Some(snap) = self.difficulty.snap_distance() {
            if (center - target).abs() < snap {
                self.state = AiState::Idle;
            }
        }

        self.state.intent()
    }

    /// Side this controller drives.
    pub fn side(&self) -> Side {
        self.side
    }

    /// Current tier.
    pub fn difficulty(&self) -> Difficulty {
        self.difficulty
    }

    /// Active (possibly tuned) configuration.
    pub fn config(&self) -> &AiConfig {
        &self.config
    }

    /// Current state.
    pub fn state(&self) -> AiState {
        self.state
    }

    /// Current target y, if a decision has been made.
    pub fn target_y(&self) -> Option<f64> {
        self.target_y
    }

    /// Losses since the last AI win.
    pub fn consecutive_losses(&self) -> u32 {
        self.consecutive_losses
    }
}

#[inline]
fn elapsed_at_least(since: Option<u64>, now: u64, interval: u64) -> bool {
    since.map_or(true, |t| now.saturating_sub(t) >= interval)
}

// =============================================================================
// TESTS
// =============================================================================
