//! Network Layer
//!
//! WebSocket presence and matchmaking. Nothing here touches a running
//! match; paired players start their game through [`crate::session`].

pub mod protocol;
pub mod matchmaking;
pub mod presence;
pub mod server;

pub use protocol::{ClientMessage, ServerMessage, MatchPairing, PresenceStatus};
pub use matchmaking::{Broadcaster, BroadcastReport, MatchmakingQueue, MatchmakingError};
pub use presence::{PresenceHub, StatusStore, MemoryStatusStore};
pub use server::{GameServer, ServerConfig, GameServerError};
