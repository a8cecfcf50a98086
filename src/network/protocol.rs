//! Protocol Messages
//!
//! JSON wire format for the presence and matchmaking socket. Field names
//! follow the browser client (`userId`, `matchId`, `isRefresh`).

use serde::{Serialize, Deserialize};

// =============================================================================
// CLIENT -> SERVER MESSAGES
// =============================================================================

/// Messages sent from client to server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Enter the matchmaking queue.
    #[serde(rename_all = "camelCase")]
    JoinQueue {
        /// Queued user
        user_id: String,
    },

    /// Leave the matchmaking queue.
    #[serde(rename_all = "camelCase")]
    LeaveQueue {
        /// User to remove
        user_id: String,
    },

    /// Presence change announced by the client.
    #[serde(rename_all = "camelCase")]
    UserStatus {
        /// User whose status changed
        user_id: String,
        /// New status
        status: PresenceStatus,
        /// Page reload: store the status but do not broadcast it
        #[serde(default)]
        is_refresh: bool,
    },

    /// Ping for latency measurement.
    Ping {
        /// Client timestamp, echoed back
        timestamp: u64,
    },
}

/// Online presence of a user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PresenceStatus {
    /// Connected (or within the reconnect grace window)
    Online,
    /// Gone
    Offline,
}

// =============================================================================
// SERVER -> CLIENT MESSAGES
// =============================================================================

/// Messages sent from server to client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Two queued players were paired. Sent to every connection.
    MatchFound {
        /// The pairing
        #[serde(rename = "match")]
        pairing: MatchPairing,
    },

    /// Join accepted, still waiting for an opponent.
    Queued {
        /// Queue contents, oldest first
        queue: Vec<String>,
    },

    /// Presence change of some user.
    #[serde(rename_all = "camelCase")]
    UserStatus {
        /// User whose status changed
        user_id: String,
        /// New status
        status: PresenceStatus,
    },

    /// Pong response.
    Pong { timestamp: u64, server_time: u64 },

    /// Error message.
    Error(ServerError),

    /// Server is shutting down.
    Shutdown { reason: String },
}

/// Two players paired by the queue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchPairing {
    /// `"{player1}-{player2}"`
    pub match_id: String,
    /// Oldest queued player
    pub player1: String,
    /// Second oldest queued player
    pub player2: String,
}

impl MatchPairing {
    /// Pair two players under the synthetic id.
    pub fn new(player1: String, player2: String) -> Self {
        Self {
            match_id: format!("{player1}-{player2}"),
            player1,
            player2,
        }
    }
}

/// Error payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerError {
    /// Error code.
    pub code: ErrorCode,
    /// Human-readable message.
    pub message: String,
}

/// Error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    /// Message could not be parsed.
    InvalidInput,
    /// User is already waiting in the queue.
    AlreadyQueued,
    /// Message names a different user than the connection.
    WrongUser,
    /// Server overloaded.
    ServerOverloaded,
}

impl ServerMessage {
    /// Build an error message.
    pub fn error(code: ErrorCode, message: impl Into<String>) -> Self {
        ServerMessage::Error(ServerError { code, message: message.into() })
    }
}

// =============================================================================
// SERIALIZATION HELPERS
// =============================================================================

impl ClientMessage {
    /// Serialize to JSON string.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Deserialize from JSON string.
    pub fn from_json(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }
}

impl ServerMessage {
    /// Serialize to JSON string.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Deserialize from JSON string.
    pub fn from_json(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    #[test]
    fn test_match_found_wire_shape() {
        let msg = ServerMessage::MatchFound {
            pairing: MatchPairing::new("7".into(), "12".into()),
        };
        let value: Value = serde_json::from_str(&msg.to_json().unwrap()).unwrap();

        assert_eq!(
            value,
            json!({
                "type": "match_found",
                "match": { "matchId": "7-12", "player1": "7", "player2": "12" }
            })
        );
    }

    #[test]
    fn test_parse_browser_status_message() {
        let raw = r#"{"type":"user_status","userId":"3","status":"offline"}"#;
        assert_eq!(
            ClientMessage::from_json(raw).unwrap(),
            ClientMessage::UserStatus {
                user_id: "3".into(),
                status: PresenceStatus::Offline,
                is_refresh: false,
            }
        );

        let raw = r#"{"type":"user_status","userId":"3","status":"online","isRefresh":true}"#;
        match ClientMessage::from_json(raw).unwrap() {
            ClientMessage::UserStatus { is_refresh, .. } => assert!(is_refresh),
            other => panic!("Wrong message type: {other:?}"),
        }
    }

    #[test]
    fn test_join_queue_roundtrip() {
        let msg = ClientMessage::JoinQueue { user_id: "42".into() };
        let json = msg.to_json().unwrap();
        assert!(json.contains("\"userId\":\"42\""));
        assert_eq!(ClientMessage::from_json(&json).unwrap(), msg);
    }

    #[test]
    fn test_error_codes() {
        let json = ServerMessage::error(ErrorCode::AlreadyQueued, "Already queued")
            .to_json()
            .unwrap();
        assert!(json.contains("already_queued"));
    }

    #[test]
    fn test_unknown_type_rejected() {
        assert!(ClientMessage::from_json(r#"{"type":"teleport"}"#).is_err());
    }
}
