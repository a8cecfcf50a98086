//! Computer opponent.
//!
//! Difficulty tiers, trajectory prediction and the paddle state machine.
//! Each opponent owns its own config and random stream.

pub mod config;
pub mod predict;
pub mod controller;

pub use config::{AiConfig, Difficulty};
pub use controller::{AiController, AiState};
