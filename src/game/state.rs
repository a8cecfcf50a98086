//! Game State Definitions
//!
//! The world a match runs on: one ball, two paddles and the score.
//! A `World` is owned by exactly one runner; there is no global state.

use std::collections::VecDeque;
use serde::{Serialize, Deserialize};

use crate::core::rng::DeterministicRng;
use crate::core::vec2::Vec2;
use crate::game::effects::ParticleField;

// =============================================================================
// SIDE
// =============================================================================

/// Which end of the table a paddle (or a point) belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    /// Left paddle, player one
    Left,
    /// Right paddle, player two (or the AI)
    Right,
}

impl Side {
    /// The other side.
    #[inline]
    pub fn opposite(self) -> Self {
        match self {
            Side::Left => Side::Right,
            Side::Right => Side::Left,
        }
    }

    /// Horizontal direction pointing away from this side's goal (+1 or -1).
    #[inline]
    pub fn outward_sign(self) -> f64 {
        match self {
            Side::Left => 1.0,
            Side::Right => -1.0,
        }
    }
}

// =============================================================================
// CONFIGURATION
// =============================================================================

/// Arena geometry and ball tuning.
///
/// Defaults reproduce the classic 1000x500 table.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ArenaConfig {
    /// Canvas width (pixels)
    pub width: f64,
    /// Canvas height (pixels)
    pub height: f64,
    /// Paddle width
    pub paddle_width: f64,
    /// Paddle height
    pub paddle_height: f64,
    /// Distance of the left paddle from the left edge
    pub paddle_margin: f64,
    /// Paddle speed (pixels per tick)
    pub paddle_speed: f64,
    /// Ball radius
    pub ball_radius: f64,
    /// Velocity components at match start
    pub kickoff_speed: f64,
    /// Horizontal speed (and vertical spread) after a point
    pub serve_speed: f64,
    /// Multiplier applied on every paddle hit
    pub acceleration: f64,
    /// Hard cap on ball speed magnitude
    pub max_ball_speed: f64,
    /// Half-width of the paddle bounce cone, as a fraction of PI
    pub bounce_cone: f64,
    /// Minimum horizontal speed away from a paddle after a hit
    pub min_outward_speed: f64,
    /// Number of trail points kept
    pub trail_length: usize,
    /// Alpha removed from each trail point per tick
    pub trail_fade: f64,
}

impl Default for ArenaConfig {
    fn default() -> Self {
        Self {
            width: 1000.0,
            height: 500.0,
            paddle_width: 10.0,
            paddle_height: 100.0,
            paddle_margin: 20.0,
            paddle_speed: 10.0,
            ball_radius: 10.0,
            kickoff_speed: 4.0,
            serve_speed: 3.0,
            acceleration: 1.4,
            max_ball_speed: 15.0,
            bounce_cone: 0.35,
            min_outward_speed: 2.0,
            trail_length: 10,
            trail_fade: 0.1,
        }
    }
}

impl ArenaConfig {
    /// Canvas center.
    #[inline]
    pub fn center(&self) -> Vec2 {
        Vec2::new(self.width / 2.0, self.height / 2.0)
    }

    /// Fixed x coordinate (left edge) of a side's paddle.
    #[inline]
    pub fn paddle_x(&self, side: Side) -> f64 {
        match side {
            Side::Left => self.paddle_margin,
            Side::Right => self.width - self.paddle_margin - self.paddle_width,
        }
    }

    /// Largest legal paddle y.
    #[inline]
    pub fn paddle_max_y(&self) -> f64 {
        self.height - self.paddle_height
    }
}

// =============================================================================
// BALL
// =============================================================================

/// One fading point of the ball trail (cosmetic).
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct TrailPoint {
    /// Position x
    pub x: f64,
    /// Position y
    pub y: f64,
    /// Opacity, 1.0 when pushed
    pub alpha: f64,
}

/// The ball.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Ball {
    /// Center position
    pub position: Vec2,
    /// Velocity (pixels per tick)
    pub velocity: Vec2,
    /// Radius
    pub radius: f64,
    /// Speed multiplier per paddle hit
    pub acceleration: f64,
    /// Speed cap
    pub max_speed: f64,
    /// Recent positions, oldest first
    pub trail: VecDeque<TrailPoint>,
}

impl Ball {
    /// Create a stationary ball at `position`.
    pub fn new(config: &ArenaConfig, position: Vec2) -> Self {
        Self {
            position,
            velocity: Vec2::ZERO,
            radius: config.ball_radius,
            acceleration: config.acceleration,
            max_speed: config.max_ball_speed,
            trail: VecDeque::with_capacity(config.trail_length + 1),
        }
    }

    /// Current speed magnitude.
    #[inline]
    pub fn speed(&self) -> f64 {
        self.velocity.length()
    }

    /// Multiply velocity by the acceleration factor, then cap at `max_speed`.
    pub fn accelerate(&mut self) {
        self.velocity = (self.velocity * self.acceleration).clamp_length(self.max_speed);
    }

    /// Put the ball back in the center heading toward `toward`.
    ///
    /// Horizontal speed is fixed, vertical speed is uniform in
    /// `[-speed, speed)`. The trail is cleared.
    pub fn serve(&mut self, center: Vec2, toward: Side, speed: f64, rng: &mut DeterministicRng) {
        self.position = center;
        self.velocity = Vec2::new(-toward.outward_sign() * speed, rng.symmetric(speed));
        self.trail.clear();
    }

    /// Push the current position onto the trail and fade older points.
    pub fn record_trail(&mut self, max_len: usize, fade: f64) {
        self.trail.push_back(TrailPoint {
            x: self.position.x,
            y: self.position.y,
            alpha: 1.0,
        });
        while self.trail.len() > max_len {
            self.trail.pop_front();
        }
        for point in self.trail.iter_mut() {
            point.alpha -= fade;
        }
    }
}

// =============================================================================
// PADDLE
// =============================================================================

/// A paddle. `y` is the top edge.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Paddle {
    /// Which side it defends
    pub side: Side,
    /// Left edge (fixed per side)
    pub x: f64,
    /// Top edge, kept in `[0, height - paddle_height]`
    pub y: f64,
    /// Width
    pub width: f64,
    /// Height
    pub height: f64,
    /// Movement per tick
    pub speed: f64,
}

impl Paddle {
    /// Create a centered paddle for `side`.
    pub fn new(config: &ArenaConfig, side: Side) -> Self {
        Self {
            side,
            x: config.paddle_x(side),
            y: (config.height - config.paddle_height) / 2.0,
            width: config.paddle_width,
            height: config.paddle_height,
            speed: config.paddle_speed,
        }
    }

    /// Vertical center.
    #[inline]
    pub fn center_y(&self) -> f64 {
        self.y + self.height / 2.0
    }

    /// x coordinate of the face the ball bounces off.
    #[inline]
    pub fn face_x(&self) -> f64 {
        match self.side {
            Side::Left => self.x + self.width,
            Side::Right => self.x,
        }
    }

    /// Move by `dy`, clamped to the canvas.
    #[inline]
    pub fn move_by(&mut self, dy: f64, canvas_height: f64) {
        self.y = (self.y + dy).clamp(0.0, (canvas_height - self.height).max(0.0));
    }

    /// True when the paddle sits at the top bound.
    #[inline]
    pub fn at_top(&self) -> bool {
        self.y <= 0.0
    }

    /// True when the paddle sits at the bottom bound.
    #[inline]
    pub fn at_bottom(&self, canvas_height: f64) -> bool {
        self.y >= canvas_height - self.height
    }
}

// =============================================================================
// SCORE
// =============================================================================

/// Points per side. Only ever incremented within a match.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Score {
    /// Left side points
    pub left: u32,
    /// Right side points
    pub right: u32,
}

impl Score {
    /// Points for a side.
    #[inline]
    pub fn get(&self, side: Side) -> u32 {
        match side {
            Side::Left => self.left,
            Side::Right => self.right,
        }
    }

    /// Add one point to `side`, returning its new total.
    pub fn award(&mut self, side: Side) -> u32 {
        let slot = match side {
            Side::Left => &mut self.left,
            Side::Right => &mut self.right,
        };
        *slot += 1;
        *slot
    }
}

// =============================================================================
// WORLD
// =============================================================================

/// Complete geometry state for one match.
#[derive(Clone, Debug)]
pub struct World {
    /// Geometry and tuning
    pub config: ArenaConfig,
    /// The ball
    pub ball: Ball,
    /// Left paddle
    pub left: Paddle,
    /// Right paddle
    pub right: Paddle,
    /// Current score
    pub score: Score,
    /// Cosmetic particles
    pub particles: ParticleField,
    /// Whether trail and particles are simulated
    pub effects_enabled: bool,
    /// Ticks since the last reset
    pub tick: u64,
    /// Randomness for serves and effects
    pub rng: DeterministicRng,
}

impl World {
    /// Create a world in its kickoff position.
    pub fn new(config: ArenaConfig, seed: u64) -> Self {
        let center = config.center();
        let mut world = Self {
            ball: Ball::new(&config, center),
            left: Paddle::new(&config, Side::Left),
            right: Paddle::new(&config, Side::Right),
            score: Score::default(),
            particles: ParticleField::default(),
            effects_enabled: true,
            tick: 0,
            rng: DeterministicRng::new(seed),
            config,
        };
        world.reset();
        world
    }

    /// Restore kickoff: centered ball moving at `(k, k)`, centered paddles
    /// at default speed, zero score, no particles or trail.
    pub fn reset(&mut self) {
        let k = self.config.kickoff_speed;
        self.ball = Ball::new(&self.config, self.config.center());
        self.ball.velocity = Vec2::new(k, k);
        self.left = Paddle::new(&self.config, Side::Left);
        self.right = Paddle::new(&self.config, Side::Right);
        self.score = Score::default();
        self.particles.clear();
        self.tick = 0;
    }

    /// Paddle for a side.
    #[inline]
    pub fn paddle(&self, side: Side) -> &Paddle {
        match side {
            Side::Left => &self.left,
            Side::Right => &self.right,
        }
    }

    /// Mutable paddle for a side.
    #[inline]
    pub fn paddle_mut(&mut self, side: Side) -> &mut Paddle {
        match side {
            Side::Left => &mut self.left,
            Side::Right => &mut self.right,
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
