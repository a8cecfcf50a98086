//! Core primitives.
//!
//! Geometry, seeded randomness and hashing shared by every other module.

pub mod vec2;
pub mod rng;
pub mod hash;

// Re-export core types
pub use vec2::Vec2;
pub use rng::DeterministicRng;
pub use hash::{StateHash, StateHasher};
