//! Matchmaking Queue
//!
//! FIFO of waiting users. Every second join pairs the two oldest entries,
//! announces the pairing to all connected clients and hands it back to the
//! caller. Entries never expire; a user leaves the queue by pairing or by
//! an explicit `leave`.

use std::collections::VecDeque;
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::network::protocol::{MatchPairing, ServerMessage};

/// Delivery summary of one broadcast.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BroadcastReport {
    /// Connections that accepted the message
    pub delivered: usize,
    /// Connections whose send failed
    pub failed: usize,
}

/// Sends a message to every connected client.
///
/// A failed send to one client never stops delivery to the others.
pub trait Broadcaster: Send + Sync {
    /// Deliver `message` to all connections.
    fn broadcast(&self, message: &ServerMessage) -> BroadcastReport;
}

/// Waiting users. A pairing is handed out and announced, never kept.
pub struct MatchmakingQueue {
    waiting: VecDeque<String>,
    broadcaster: Option<Arc<dyn Broadcaster>>,
}

impl MatchmakingQueue {
    /// Queue that only returns pairings to the caller.
    pub fn new() -> Self {
        Self {
            waiting: VecDeque::new(),
            broadcaster: None,
        }
    }

    /// Queue that also announces each pairing through `broadcaster`.
    pub fn with_broadcaster(broadcaster: Arc<dyn Broadcaster>) -> Self {
        Self {
            broadcaster: Some(broadcaster),
            ..Self::new()
        }
    }

    /// Add a user. Returns the pairing when this join completed one.
    pub fn join(&mut self, user_id: &str) -> Result<Option<MatchPairing>, MatchmakingError> {
        if user_id.is_empty() {
            return Err(MatchmakingError::EmptyPlayerId);
        }
        if self.is_queued(user_id) {
            return Err(MatchmakingError::AlreadyQueued(user_id.to_string()));
        }

        self.waiting.push_back(user_id.to_string());
        debug!(user_id, queued = self.waiting.len(), "Joined queue");

        if self.waiting.len() < 2 {
            return Ok(None);
        }
        let (Some(player1), Some(player2)) = (self.waiting.pop_front(), self.waiting.pop_front()) else {
            return Ok(None);
        };

        let pairing = MatchPairing::new(player1, player2);
        info!(match_id = %pairing.match_id, "Match found");

        if let Some(broadcaster) = &self.broadcaster {
            let report = broadcaster.broadcast(&ServerMessage::MatchFound { pairing: pairing.clone() });
            if report.failed > 0 {
                warn!(
                    match_id = %pairing.match_id,
                    failed = report.failed,
                    delivered = report.delivered,
                    "Match announcement partially failed"
                );
            }
        }

        Ok(Some(pairing))
    }

    /// Remove a waiting user. Returns whether they were queued.
    pub fn leave(&mut self, user_id: &str) -> bool {
        let before = self.waiting.len();
        self.waiting.retain(|id| id != user_id);
        let removed = self.waiting.len() != before;
        if removed {
            debug!(user_id, "Left queue");
        }
        removed
    }

    /// Whether `user_id` is waiting.
    pub fn is_queued(&self, user_id: &str) -> bool {
        self.waiting.iter().any(|id| id == user_id)
    }

    /// Waiting users, oldest first.
    pub fn waiting(&self) -> Vec<String> {
        self.waiting.iter().cloned().collect()
    }

    /// Number of waiting users.
    pub fn len(&self) -> usize {
        self.waiting.len()
    }

    /// No one is waiting.
    pub fn is_empty(&self) -> bool {
        self.waiting.is_empty()
    }
}

impl Default for MatchmakingQueue {
    fn default() -> Self {
        Self::new()
    }
}

/// Matchmaking errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MatchmakingError {
    /// User is already waiting.
    #[error("Already queued: {0}")]
    AlreadyQueued(String),

    /// Empty user id.
    #[error("Player id required")]
    EmptyPlayerId,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recorder {
        sent: Mutex<Vec<ServerMessage>>,
    }

    impl Broadcaster for Recorder {
        fn broadcast(&self, message: &ServerMessage) -> BroadcastReport {
            self.sent.lock().unwrap().push(message.clone());
            BroadcastReport { delivered: 3, failed: 1 }
        }
    }

    #[test]
    fn test_pairs_oldest_first() {
        let mut queue = MatchmakingQueue::new();
        assert_eq!(queue.join("a"), Ok(None));
        assert_eq!(queue.join("b").unwrap(), Some(MatchPairing::new("a".into(), "b".into())));
        assert!(queue.is_empty());

        assert_eq!(queue.join("c"), Ok(None));
        assert_eq!(queue.waiting(), vec!["c".to_string()]);
    }

    #[test]
    fn test_duplicate_join_rejected() {
        let mut queue = MatchmakingQueue::new();
        queue.join("a").unwrap();
        assert_eq!(queue.join("a"), Err(MatchmakingError::AlreadyQueued("a".into())));
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn test_empty_id_rejected() {
        let mut queue = MatchmakingQueue::new();
        assert_eq!(queue.join(""), Err(MatchmakingError::EmptyPlayerId));
    }

    #[test]
    fn test_pairing_is_broadcast() {
        let recorder = Arc::new(Recorder::default());
        let mut queue = MatchmakingQueue::with_broadcaster(recorder.clone());

        queue.join("1").unwrap();
        assert!(recorder.sent.lock().unwrap().is_empty());

        let pairing = queue.join("2").unwrap().unwrap();
        assert_eq!(pairing.match_id, "1-2");

        let sent = recorder.sent.lock().unwrap();
        assert_eq!(sent.as_slice(), [ServerMessage::MatchFound { pairing: pairing.clone() }]);
    }

    #[test]
    fn test_leave_and_rejoin() {
        let mut queue = MatchmakingQueue::new();
        queue.join("a").unwrap();
        assert!(queue.leave("a"));
        assert!(!queue.leave("a"));

        // Can rejoin after being paired
        queue.join("a").unwrap();
        queue.join("b").unwrap();
        assert_eq!(queue.join("a"), Ok(None));
        assert_eq!(queue.waiting(), vec!["a".to_string()]);
    }

    #[test]
    fn test_pairings_leave_nothing_behind() {
        let mut queue = MatchmakingQueue::new();
        for i in 0..500 {
            assert_eq!(queue.join(&format!("a{i}")), Ok(None));
            let pairing = queue.join(&format!("b{i}")).unwrap().unwrap();
            assert_eq!(pairing.match_id, format!("a{i}-b{i}"));
            assert!(queue.is_empty());
        }
        // Same players pair again with the same id
        queue.join("a0").unwrap();
        assert_eq!(
            queue.join("b0").unwrap().map(|p| p.match_id),
            Some("a0-b0".to_string())
        );
    }
}
