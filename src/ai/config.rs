//! AI Difficulty Configuration
//!
//! Tier presets, the per-loss tuning step and the bounds that tuning may
//! never cross. `AiConfig` is a plain `Copy` value: tuning produces a new
//! config rather than editing a shared table, so two AI opponents never
//! influence each other.

use serde::{Serialize, Deserialize};

/// AI difficulty tier.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Difficulty {
    /// Slow, center-biased, easily fooled by bounces
    Easy,
    /// Moderate
    #[default]
    Normal,
    /// Tracks the ball closely and models long rallies
    Hard,
}

impl Difficulty {
    /// All tiers, easiest first.
    pub const ALL: [Difficulty; 3] = [Difficulty::Easy, Difficulty::Normal, Difficulty::Hard];

    /// Parse a tier name (case-insensitive).
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "easy" => Some(Difficulty::Easy),
            "normal" => Some(Difficulty::Normal),
            "hard" => Some(Difficulty::Hard),
            _ => None,
        }
    }

    /// Starting configuration for this tier.
    pub fn preset(self) -> AiConfig {
        match self {
            Difficulty::Easy => AiConfig {
                reaction_time_ms: 1000,
                error_margin: 80.0,
                prediction_accuracy: 0.3,
                max_speed: 10.0,
                min_state_hold_ms: 450,
                threshold: 100.0,
                max_bounces: 1.0,
            },
            Difficulty::Normal => AiConfig {
                reaction_time_ms: 1000,
                error_margin: 40.0,
                prediction_accuracy: 0.6,
                max_speed: 10.0,
                min_state_hold_ms: 300,
                threshold: 50.0,
                max_bounces: 2.0,
            },
            Difficulty::Hard => AiConfig {
                reaction_time_ms: 1000,
                error_margin: 5.0,
                prediction_accuracy: 0.95,
                max_speed: 10.0,
                min_state_hold_ms: 80,
                threshold: 15.0,
                max_bounces: 6.0,
            },
        }
    }

    /// How far one human win moves this tier's config.
    pub fn tuning_step(self) -> TuningStep {
        match self {
            Difficulty::Easy => TuningStep {
                accuracy_increase: 0.05,
                error_reduction: 5.0,
                bounce_increase: 0.2,
                threshold_reduction: 10.0,
                hold_reduction_ms: 20,
            },
            Difficulty::Normal => TuningStep {
                accuracy_increase: 0.07,
                error_reduction: 7.0,
                bounce_increase: 0.5,
                threshold_reduction: 5.0,
                hold_reduction_ms: 30,
            },
            Difficulty::Hard => TuningStep {
                accuracy_increase: 0.01,
                error_reduction: 1.0,
                bounce_increase: 0.5,
                threshold_reduction: 2.0,
                hold_reduction_ms: 5,
            },
        }
    }

    /// Limits tuning can reach for this tier.
    pub fn tuning_bounds(self) -> TuningBounds {
        match self {
            Difficulty::Easy => TuningBounds {
                max_accuracy: 0.6,
                min_error: 40.0,
                max_bounces: 2.0,
                min_hold_ms: 300,
                min_threshold: 50.0,
            },
            Difficulty::Normal => TuningBounds {
                max_accuracy: 0.85,
                min_error: 15.0,
                max_bounces: 4.0,
                min_hold_ms: 150,
                min_threshold: 25.0,
            },
            Difficulty::Hard => TuningBounds {
                max_accuracy: 0.99,
                min_error: 2.0,
                max_bounces: 8.0,
                min_hold_ms: 50,
                min_threshold: 8.0,
            },
        }
    }

    /// Weight given to the canvas center (vs. the ball) when the ball is
    /// moving away from the AI paddle.
    pub fn idle_center_weight(self) -> f64 {
        match self {
            Difficulty::Easy => 0.8,
            Difficulty::Normal => 0.7,
            Difficulty::Hard => 0.1,
        }
    }

    /// Distance to target below which the paddle snaps to idle, if any.
    pub fn snap_distance(self) -> Option<f64> {
        match self {
            Difficulty::Easy => None,
            Difficulty::Normal => Some(20.0),
            Difficulty::Hard => Some(8.0),
        }
    }
}

impl std::fmt::Display for Difficulty {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Difficulty::Easy => "easy",
            Difficulty::Normal => "normal",
            Difficulty::Hard => "hard",
        };
        f.write_str(name)
    }
}

/// Tunable AI parameters.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct AiConfig {
    /// Minimum time between target re-predictions
    pub reaction_time_ms: u64,
    /// Spread of injected prediction noise (pixels)
    pub error_margin: f64,
    /// Probability a prediction is taken without noise
    pub prediction_accuracy: f64,
    /// Paddle speed while AI-driven (pixels per tick)
    pub max_speed: f64,
    /// Minimum time a movement state persists before it may change
    pub min_state_hold_ms: u64,
    /// Dead band around the target (pixels)
    pub threshold: f64,
    /// Wall reflections modelled by the predictor; fractional after tuning
    pub max_bounces: f64,
}

/// One tuning increment.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct TuningStep {
    /// Added to `prediction_accuracy`
    pub accuracy_increase: f64,
    /// Subtracted from `error_margin`
    pub error_reduction: f64,
    /// Added to `max_bounces`
    pub bounce_increase: f64,
    /// Subtracted from `threshold`
    pub threshold_reduction: f64,
    /// Subtracted from `min_state_hold_ms`
    pub hold_reduction_ms: u64,
}

/// Ceilings and floors for tuning.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct TuningBounds {
    /// Ceiling for `prediction_accuracy`
    pub max_accuracy: f64,
    /// Floor for `error_margin`
    pub min_error: f64,
    /// Ceiling for `max_bounces`
    pub max_bounces: f64,
    /// Floor for `min_state_hold_ms`
    pub min_hold_ms: u64,
    /// Floor for `threshold`
    pub min_threshold: f64,
}

impl AiConfig {
    /// Return a sharper copy: one step toward harder values, clamped.
    ///
    /// Values already past a bound are left where they are.
    #[must_use]
    pub fn tuned(self, step: TuningStep, bounds: TuningBounds) -> Self {
        Self {
            prediction_accuracy: (self.prediction_accuracy + step.accuracy_increase)
                .min(bounds.max_accuracy)
                .max(self.prediction_accuracy),
            error_margin: (self.error_margin - step.error_reduction)
                .max(bounds.min_error)
                .min(self.error_margin),
            max_bounces: (self.max_bounces + step.bounce_increase)
                .min(bounds.max_bounces)
                .max(self.max_bounces),
            threshold: (self.threshold - step.threshold_reduction)
                .max(bounds.min_threshold)
                .min(self.threshold),
            min_state_hold_ms: self
                .min_state_hold_ms
                .saturating_sub(step.hold_reduction_ms)
                .max(bounds.min_hold_ms)
                .min(self.min_state_hold_ms),
            ..self
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_presets_ordered_by_sharpness() {
        let easy = Difficulty::Easy.preset();
        let normal = Difficulty::Normal.preset();
        let hard = Difficulty::Hard.preset();

        assert!(easy.prediction_accuracy < normal.prediction_accuracy);
        assert!(normal.prediction_accuracy < hard.prediction_accuracy);
        assert!(easy.error_margin > normal.error_margin);
        assert!(normal.error_margin > hard.error_margin);
        assert!(easy.max_bounces < hard.max_bounces);
    }

    #[test]
    fn test_tuned_single_step() {
        let hard = Difficulty::Hard;
        let next = hard.preset().tuned(hard.tuning_step(), hard.tuning_bounds());

        assert!((next.prediction_accuracy - 0.96).abs() < 1e-9);
        assert_eq!(next.error_margin, 4.0);
        assert_eq!(next.max_bounces, 6.5);
        assert_eq!(next.threshold, 13.0);
        assert_eq!(next.min_state_hold_ms, 75);
        assert_eq!(next.reaction_time_ms, 1000);
    }

    #[test]
    fn test_tuned_clamps_at_bounds() {
        for tier in Difficulty::ALL {
            let bounds = tier.tuning_bounds();
            let mut config = tier.preset();
            for _ in 0..100 {
                config = config.tuned(tier.tuning_step(), bounds);
            }

            assert!((config.prediction_accuracy - bounds.max_accuracy).abs() < 1e-9);
            assert_eq!(config.error_margin, bounds.min_error);
            assert_eq!(config.max_bounces, bounds.max_bounces);
            assert_eq!(config.threshold, bounds.min_threshold);
            assert_eq!(config.min_state_hold_ms, bounds.min_hold_ms);
        }
    }

    #[test]
    fn test_easy_never_reaches_hard_start() {
        let easy = Difficulty::Easy;
        let mut config = easy.preset();
        for _ in 0..50 {
            config = config.tuned(easy.tuning_step(), easy.tuning_bounds());
        }
        let hard = Difficulty::Hard.preset();

        assert!(config.prediction_accuracy < hard.prediction_accuracy);
        assert!(config.error_margin > hard.error_margin);
    }

    #[test]
    fn test_difficulty_names() {
        assert_eq!(Difficulty::from_name("HARD"), Some(Difficulty::Hard));
        assert_eq!(Difficulty::from_name("insane"), None);
        assert_eq!(Difficulty::Easy.to_string(), "easy");
    }
}
