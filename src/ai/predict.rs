//! Ball Trajectory Prediction
//!
//! Projects the ball forward to the AI paddle's face, folding the path
//! back into the canvas at each wall. Only `max_bounces` reflections are
//! modelled: past that the projection is clamped instead, so low tiers
//! misjudge long multi-bounce rallies. This is a deliberate handicap, not
//! an accuracy bug.

use crate::ai::config::{AiConfig, Difficulty};
use crate::core::rng::DeterministicRng;
use crate::game::collision::approaching;
use crate::game::state::{Ball, Paddle};

/// Distance-independent lead the HARD tier adds when no wall bounce is
/// expected.
const HARD_ANTICIPATION: f64 = 25.0;

/// Extra lead per modelled bounce for the HARD tier.
const HARD_BOUNCE_LEAD: f64 = 5.0;

/// Center pull applied to every EASY prediction.
const EASY_CENTER_BIAS: f64 = 0.3;

/// Raw geometric projection before noise.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Projection {
    /// Predicted y at the paddle face, clamped to `[0, height]`
    pub y: f64,
    /// Wall reflections applied
    pub bounces: u32,
}

/// Project the ball to `paddle`'s face.
///
/// Returns `None` when the ball is not moving toward the paddle.
pub fn project_to_paddle(
    ball: &Ball,
    paddle: &Paddle,
    canvas_height: f64,
    max_bounces: f64,
) -> Option<Projection> {
    if !approaching(ball, paddle.side) {
        return None;
    }

    let time_to_reach = (paddle.face_x() - ball.position.x) / ball.velocity.x;
    let mut y = ball.position.y + ball.velocity.y * time_to_reach;
    let mut bounces = 0u32;

    while (y < 0.0 || y > canvas_height) && f64::from(bounces) < max_bounces {
        if y < 0.0 {
            y = -y;
        } else {
            y = 2.0 * canvas_height - y;
        }
        bounces += 1;
    }

    Some(Projection {
        y: y.clamp(0.0, canvas_height),
        bounces,
    })
}

/// Pick a target y for the AI paddle, tier noise included.
///
/// When the ball is moving away the paddle drifts toward a blend of the
/// canvas center and the ball's height, weighted by tier.
pub fn predict_ball_intersection(
    ball: &Ball,
    paddle: &Paddle,
    canvas_height: f64,
    difficulty: Difficulty,
    config: &AiConfig,
    rng: &mut DeterministicRng,
) -> f64 {
    let center = canvas_height / 2.0;

    let Some(projection) = project_to_paddle(ball, paddle, canvas_height, config.max_bounces) else {
        let w = difficulty.idle_center_weight();
        return center * w + ball.position.y * (1.0 - w);
    };

    let mut y = projection.y;
    let e = config.error_margin;
    let vy_sign = if ball.velocity.y > 0.0 {
        1.0
    } else if ball.velocity.y < 0.0 {
        -1.0
    } else {
        0.0
    };

    match difficulty {
        Difficulty::Easy => {
            y += (center - y) * EASY_CENTER_BIAS + rng.symmetric(e / 2.0);
        }
        Difficulty::Normal => {
            if !rng.chance(config.prediction_accuracy) {
                y += rng.symmetric(e);
            }
        }
        Difficulty::Hard => {
            if !rng.chance(config.prediction_accuracy) {
                y += rng.symmetric(e / 2.0);
            }
            if projection.bounces == 0 {
                y += vy_sign * HARD_ANTICIPATION;
            } else {
                y += vy_sign * HARD_BOUNCE_LEAD * f64::from(projection.bounces);
            }
        }
    }

    y.clamp(0.0, canvas_height)
}
