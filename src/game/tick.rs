//! Physics Step
//!
//! Advances a `World` by one fixed tick. The order is fixed:
//!
//! 1. Integrate ball position (and record the trail)
//! 2. Wall collision
//! 3. Paddle collision, left then right
//! 4. Goal check, score and serve
//! 5. Particle update
//!
//! Paddle movement is applied by the runner before calling [`step`].

#[cfg(feature = "debug-tracing")]
use tracing::trace;

use crate::game::collision::{check_goal, check_paddle_collision, resolve_paddle_hit, resolve_wall};
use crate::game::effects::{PADDLE_BURST, SERVE_BURST, WALL_BURST};
use crate::game::events::GameEvent;
use crate::game::state::{Side, World};

/// Result of a tick.
#[derive(Debug, Default)]
pub struct TickResult {
    /// Events generated this tick, in emission order
    pub events: Vec<GameEvent>,
    /// Side that scored this tick, if any
    pub scored: Option<Side>,
}

/// Run one physics tick.
///
/// Scoring is exclusive: at most one side scores per tick, and the ball
/// is re-served immediately.
pub fn step(world: &mut World) -> TickResult {
    let mut result = TickResult::default();
    world.tick += 1;
    let tick = world.tick;
    let effects = world.effects_enabled;

    // 1. Integrate
    world.ball.position += world.ball.velocity;
    if effects {
        world.ball.record_trail(world.config.trail_length, world.config.trail_fade);
    }

    // 2. Walls
    if let Some(wall) = resolve_wall(&mut world.ball, world.config.height) {
        let at = world.ball.position;
        if effects {
            world.particles.burst(at, WALL_BURST, &mut world.rng);
        }
        result.events.push(GameEvent::wall_bounce(tick, wall, at));
    }

    // 3. Paddles
    for side in [Side::Left, Side::Right] {
        let paddle = world.paddle(side);
        if !check_paddle_collision(&world.ball, paddle) {
            continue;
        }
        let paddle = paddle.clone();
        let impact = resolve_paddle_hit(
            &mut world.ball,
            &paddle,
            world.config.bounce_cone,
            world.config.min_outward_speed,
        );
        if effects {
            world.particles.burst(world.ball.position, PADDLE_BURST, &mut world.rng);
        }
        result.events.push(GameEvent::paddle_hit(tick, side, impact, world.ball.speed()));
    }

    // 4. Goals
    if let Some(scorer) = check_goal(&world.ball, world.config.width) {
        world.score.award(scorer);
        result.scored = Some(scorer);
        result.events.push(GameEvent::point_scored(tick, scorer, world.score));

        let conceded = scorer.opposite();
        let center = world.config.center();
        world.ball.serve(center, conceded, world.config.serve_speed, &mut world.rng);
        if effects {
            world.particles.burst(center, SERVE_BURST, &mut world.rng);
        }
        result.events.push(GameEvent::ball_served(tick, conceded, world.ball.velocity));
    }

    // 5. Particles
    if effects {
        world.particles.update(&mut world.rng);
    }

    #[cfg(feature = "debug-tracing")]
    trace!(
        tick,
        x = world.ball.position.x,
        y = world.ball.position.y,
        vx = world.ball.velocity.x,
        vy = world.ball.velocity.y,
        "physics step"
    );

    result
}

// =============================================================================
// TESTS
// =============================================================================
