//! Collision Detection
//!
//! Ball against walls, paddles and goal lines. Each function mutates the
//! ball in place and reports what happened so the tick can emit events.

use std::f64::consts::PI;

use crate::game::events::Wall;
use crate::game::state::{Ball, Paddle, Side};

/// Reflect the ball off the top or bottom wall.
///
/// Vertical velocity is set away from the wall (not merely negated) and
/// the ball is clamped inside, so a clamped ball cannot re-trigger.
pub fn resolve_wall(ball: &mut Ball, canvas_height: f64) -> Option<Wall> {
    if ball.position.y - ball.radius <= 0.0 {
        ball.velocity.y = ball.velocity.y.abs();
        ball.position.y = ball.radius;
        Some(Wall::Top)
    } else if ball.position.y + ball.radius >= canvas_height {
        ball.velocity.y = -ball.velocity.y.abs();
        ball.position.y = canvas_height - ball.radius;
        Some(Wall::Bottom)
    } else {
        None
    }
}

/// True when the ball is moving toward `paddle`.
#[inline]
pub fn approaching(ball: &Ball, side: Side) -> bool {
    match side {
        Side::Left => ball.velocity.x < 0.0,
        Side::Right => ball.velocity.x > 0.0,
    }
}

/// Check ball/paddle overlap, only counting a ball heading toward it.
pub fn check_paddle_collision(ball: &Ball, paddle: &Paddle) -> bool {
    let r = ball.radius;
    let p = ball.position;

    p.x - r <= paddle.x + paddle.width
        && p.x + r >= paddle.x
        && p.y >= paddle.y
        && p.y <= paddle.y + paddle.height
        && approaching(ball, paddle.side)
}

/// Bounce the ball off `paddle`.
///
/// The outgoing angle depends on where the ball struck the face: the
/// center sends it straight back, the edges up to `cone * PI` off
/// horizontal. Speed is preserved, then accelerated and capped.
/// Returns the normalized impact point in `[0, 1]`.
pub fn resolve_paddle_hit(
    ball: &mut Ball,
    paddle: &Paddle,
    cone: f64,
    min_outward_speed: f64,
) -> f64 {
    let impact = ((ball.position.y - paddle.y) / paddle.height).clamp(0.0, 1.0);
    let mut angle = (impact - 0.5) * PI * (2.0 * cone);
    if paddle.side == Side::Right {
        angle += PI;
    }

    let speed = ball.speed();
    ball.velocity.x = angle.cos() * speed;
    ball.velocity.y = angle.sin() * speed;

    let outward = paddle.side.outward_sign();
    if ball.velocity.x * outward <= 0.0 {
        ball.velocity.x = outward * min_outward_speed;
    }

    ball.position.x = paddle.face_x() + outward * ball.radius;
    ball.accelerate();

    impact
}

/// Which side scored, if the ball has fully left the table.
pub fn check_goal(ball: &Ball, canvas_width: f64) -> Option<Side> {
    if ball.position.x + ball.radius <= 0.0 {
        Some(Side::Right)
    } else if ball.position.x - ball.radius >= canvas_width {
        Some(Side::Left)
    } else {
        None
    }
}
