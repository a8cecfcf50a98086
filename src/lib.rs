//! # Pong Arena
//!
//! Real-time Pong core: fixed-tick physics, an adaptive computer opponent,
//! single-elimination tournaments and a matchmaking queue.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                        PONG ARENA                            │
//! ├─────────────────────────────────────────────────────────────┤
//! │  core/           - Primitives                                │
//! │  ├── vec2.rs     - 2D vector (pixels)                        │
//! │  ├── rng.rs      - Seeded Xorshift128+ PRNG                  │
//! │  └── hash.rs     - Snapshot checksums                        │
//! │                                                              │
//! │  game/           - Simulation (no I/O, no clock)             │
//! │  ├── state.rs    - Ball, paddles, score, world               │
//! │  ├── collision.rs- Wall, paddle and goal checks              │
//! │  ├── tick.rs     - One physics step                          │
//! │  ├── input.rs    - Held keys to paddle intents               │
//! │  ├── events.rs   - Typed events for renderers                │
//! │  └── effects.rs  - Cosmetic particles                        │
//! │                                                              │
//! │  ai/             - Computer opponent                         │
//! │  runner/         - Fixed-timestep loop (sync + tokio)        │
//! │  session/        - Win condition, result routing, snapshots  │
//! │  tournament/     - Brackets and placement                    │
//! │  records.rs      - Result persistence interface              │
//! │                                                              │
//! │  network/        - WebSocket presence and matchmaking        │
//! │  ├── server.rs   - tokio-tungstenite server                  │
//! │  ├── presence.rs - Connections, broadcast, heartbeat         │
//! │  ├── matchmaking.rs - FIFO pairing                           │
//! │  └── protocol.rs - Message types                             │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Determinism
//!
//! Everything under `game/`, `ai/` and `runner/` draws randomness from a
//! seeded [`DeterministicRng`] and time from the simulation clock, so a
//! match replays identically from its seed and inputs. Wall-clock time
//! enters only through frame deltas and snapshot timestamps.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod core;
pub mod game;
pub mod ai;
pub mod runner;
pub mod session;
pub mod tournament;
pub mod records;
pub mod network;

// Re-export commonly used types
pub use core::rng::DeterministicRng;
pub use core::vec2::Vec2;
pub use game::state::{ArenaConfig, Side, World};
pub use ai::{AiController, Difficulty};
pub use runner::{MatchLoop, MatchRunner};
pub use session::{GameMode, MatchOutcome, MatchSession};
pub use tournament::{Tournament, TournamentError};
pub use network::{GameServer, MatchmakingQueue, ServerConfig};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Simulation tick rate (Hz)
pub const TICK_RATE: u32 = 60;

/// Points needed to win a match
pub const DEFAULT_TARGET_SCORE: u32 = 5;
