//! Cosmetic Particles
//!
//! Bursts spawned on wall hits, paddle hits and serves. Particles drift
//! randomly and expire; they never influence gameplay.

use std::f64::consts::TAU;
use serde::{Serialize, Deserialize};

use crate::core::rng::DeterministicRng;
use crate::core::vec2::Vec2;

/// Particles spawned on a wall bounce.
pub const WALL_BURST: usize = 5;
/// Particles spawned on a paddle hit.
pub const PADDLE_BURST: usize = 10;
/// Particles spawned on a serve.
pub const SERVE_BURST: usize = 20;

/// One particle.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Particle {
    /// Position
    pub position: Vec2,
    /// Radius (1..4)
    pub size: f64,
    /// Drift speed (1..4)
    pub speed: f64,
    /// Remaining life in ticks
    pub life: f64,
}

impl Particle {
    /// Opacity for rendering, fading out with remaining life.
    #[inline]
    pub fn alpha(&self) -> f64 {
        (self.life / 50.0).clamp(0.0, 1.0)
    }
}

/// Live particle set.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ParticleField {
    particles: Vec<Particle>,
}

impl ParticleField {
    /// Spawn `count` particles at `at`.
    pub fn burst(&mut self, at: Vec2, count: usize, rng: &mut DeterministicRng) {
        self.particles.reserve(count);
        for _ in 0..count {
            self.particles.push(Particle {
                position: at,
                size: rng.range_f64(1.0, 4.0),
                speed: rng.range_f64(1.0, 4.0),
                life: rng.range_f64(30.0, 50.0),
            });
        }
    }

    /// Age every particle by one tick, dropping dead ones and jittering the rest.
    pub fn update(&mut self, rng: &mut DeterministicRng) {
        self.particles.retain_mut(|p| {
            p.life -= 1.0;
            if p.life <= 0.0 {
                return false;
            }
            let angle = rng.range_f64(0.0, TAU);
            p.position += Vec2::from_angle(angle, p.speed * 0.5);
            true
        });
    }

    /// Remove everything.
    pub fn clear(&mut self) {
        self.particles.clear();
    }

    /// Live particles.
    pub fn iter(&self) -> impl Iterator<Item = &Particle> {
        self.particles.iter()
    }

    /// Number of live particles.
    pub fn len(&self) -> usize {
        self.particles.len()
    }

    /// True when no particles are alive.
    pub fn is_empty(&self) -> bool {
        self.particles.is_empty()
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_burst_ranges() {
        let mut rng = DeterministicRng::new(3);
        let mut field = ParticleField::default();
        field.burst(Vec2::new(10.0, 10.0), SERVE_BURST, &mut rng);

        assert_eq!(field.len(), 20);
        for p in field.iter() {
            assert!((1.0..4.0).contains(&p.size));
            assert!((1.0..4.0).contains(&p.speed));
            assert!((30.0..50.0).contains(&p.life));
        }
    }

    #[test]
    fn test_particles_expire() {
        let mut rng = DeterministicRng::new(4);
        let mut field = ParticleField::default();
        field.burst(Vec2::ZERO, PADDLE_BURST, &mut rng);

        for _ in 0..29 {
            field.update(&mut rng);
        }
        assert_eq!(field.len(), PADDLE_BURST);

        for _ in 0..21 {
            field.update(&mut rng);
        }
        assert!(field.is_empty());
    }
}
