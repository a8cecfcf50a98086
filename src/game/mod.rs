//! Game simulation.
//!
//! World state, the fixed-tick physics step and input handling.
//! Nothing in here performs I/O or reads the clock.

pub mod state;
pub mod events;
pub mod effects;
pub mod collision;
pub mod input;
pub mod tick;

pub use state::{ArenaConfig, Ball, Paddle, Score, Side, World};
pub use events::{GameEvent, GameEventData};
pub use input::{Key, KeyState, PaddleIntent};
pub use tick::{step, TickResult};
