//! Match and Tournament Records
//!
//! Finished matches and tournaments are handed to a [`ResultStore`]. Writes
//! are bookkeeping only: the `*_detached` helpers run them in the
//! background and log failures instead of returning them.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, PoisonError};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::tournament::Standing;

/// Medal prefixes for the first three placement groups.
pub const MEDALS: [&str; 3] = ["🏆", "🥈", "🥉"];

/// A finished one-on-one match.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchRecord {
    /// Record identifier
    pub id: Uuid,
    /// Left player
    pub player1: String,
    /// Right player
    pub player2: String,
    /// Either `player1` or `player2`
    pub winner: String,
    /// Final score (player1, player2)
    pub score: (u32, u32),
    /// When the match ended
    pub played_at: DateTime<Utc>,
}

impl MatchRecord {
    /// Build a record; the winner must be one of the players.
    pub fn new(
        player1: impl Into<String>,
        player2: impl Into<String>,
        winner: impl Into<String>,
        score: (u32, u32),
    ) -> Result<Self, RecordError> {
        let (player1, player2, winner) = (player1.into(), player2.into(), winner.into());
        if winner != player1 && winner != player2 {
            return Err(RecordError::InvalidWinner(winner));
        }
        Ok(Self {
            id: Uuid::new_v4(),
            player1,
            player2,
            winner,
            score,
            played_at: Utc::now(),
        })
    }

    /// Whether `player` took part.
    pub fn involves(&self, player: &str) -> bool {
        self.player1 == player || self.player2 == player
    }
}

/// A completed tournament.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TournamentRecord {
    /// Tournament identifier
    pub id: Uuid,
    /// Registered players
    pub players: Vec<String>,
    /// Placement, best first, with medal prefixes
    pub ranking: Vec<String>,
    /// When the final ended
    pub recorded_at: DateTime<Utc>,
}

impl TournamentRecord {
    /// Build a record from the placement table.
    pub fn new(id: Uuid, players: Vec<String>, standings: &[Standing]) -> Self {
        Self {
            id,
            players,
            ranking: medal_ranking(standings),
            recorded_at: Utc::now(),
        }
    }
}

/// Decorate the placement table: every member of the first three groups
/// gets that group's medal.
pub fn medal_ranking(standings: &[Standing]) -> Vec<String> {
    standings
        .iter()
        .map(|s| match MEDALS.get(s.group as usize) {
            Some(medal) => format!("{medal} {}", s.player),
            None => s.player.clone(),
        })
        .collect()
}

/// Persistence for results.
pub trait ResultStore: Send + Sync {
    /// Store a finished match.
    fn record_match(&self, record: MatchRecord) -> Result<(), RecordError>;
    /// Store a finished tournament.
    fn record_tournament(&self, record: TournamentRecord) -> Result<(), RecordError>;
}

/// Store a match without waiting for it; failures are logged.
pub fn record_match_detached(store: Arc<dyn ResultStore>, record: MatchRecord) {
    detached("match", move || store.record_match(record));
}

/// Store a tournament without waiting for it; failures are logged.
pub fn record_tournament_detached(store: Arc<dyn ResultStore>, record: TournamentRecord) {
    detached("tournament", move || store.record_tournament(record));
}

fn detached<F>(kind: &'static str, write: F)
where
    F: FnOnce() -> Result<(), RecordError> + Send + 'static,
{
    let run = move || match write() {
        Ok(()) => debug!(kind, "Result stored"),
        Err(e) => warn!(kind, error = %e, "Failed to store result"),
    };

    // Stores may block on I/O
    match tokio::runtime::Handle::try_current() {
        Ok(handle) => {
            handle.spawn_blocking(run);
        }
        Err(_) => run(),
    }
}

/// In-memory result store.
#[derive(Debug, Default)]
pub struct MemoryResultStore {
    matches: Mutex<Vec<MatchRecord>>,
    tournaments: Mutex<Vec<TournamentRecord>>,
}

impl MemoryResultStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Wins per player, most wins first. Players without a win are listed
    /// with zero.
    pub fn leaderboard(&self) -> Vec<(String, u32)> {
        let matches = self.matches.lock().unwrap_or_else(PoisonError::into_inner);
        let mut wins: BTreeMap<&str, u32> = BTreeMap::new();
        for m in matches.iter() {
            wins.entry(m.player1.as_str()).or_default();
            wins.entry(m.player2.as_str()).or_default();
            *wins.entry(m.winner.as_str()).or_default() += 1;
        }

        let mut board: Vec<(String, u32)> = wins.into_iter().map(|(p, w)| (p.to_string(), w)).collect();
        board.sort_by(|a, b| b.1.cmp(&a.1));
        board
    }

    /// Matches `player` took part in, newest first.
    pub fn matches_for(&self, player: &str) -> Vec<MatchRecord> {
        let matches = self.matches.lock().unwrap_or_else(PoisonError::into_inner);
        matches.iter().rev().filter(|m| m.involves(player)).cloned().collect()
    }

    /// Tournaments `player` was registered in.
    pub fn tournaments_for(&self, player: &str) -> Vec<TournamentRecord> {
        let tournaments = self.tournaments.lock().unwrap_or_else(PoisonError::into_inner);
        tournaments
            .iter()
            .filter(|t| t.players.iter().any(|p| p == player))
            .cloned()
            .collect()
    }

    /// Number of stored matches.
    pub fn match_count(&self) -> usize {
        self.matches.lock().unwrap_or_else(PoisonError::into_inner).len()
    }
}

impl ResultStore for MemoryResultStore {
    fn record_match(&self, record: MatchRecord) -> Result<(), RecordError> {
        self.matches.lock().unwrap_or_else(PoisonError::into_inner).push(record);
        Ok(())
    }

    fn record_tournament(&self, record: TournamentRecord) -> Result<(), RecordError> {
        self.tournaments.lock().unwrap_or_else(PoisonError::into_inner).push(record);
        Ok(())
    }
}

/// Record errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RecordError {
    /// Winner is not one of the players.
    #[error("Winner not in match: {0}")]
    InvalidWinner(String),

    /// Backend write failed.
    #[error("Storage failure: {0}")]
    Storage(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    struct BrokenStore;

    impl ResultStore for BrokenStore {
        fn record_match(&self, _record: MatchRecord) -> Result<(), RecordError> {
            Err(RecordError::Storage("disk full".into()))
        }

        fn record_tournament(&self, _record: TournamentRecord) -> Result<(), RecordError> {
            Err(RecordError::Storage("disk full".into()))
        }
    }

    fn standing(player: &str, place: u32, group: u32) -> Standing {
        Standing {
            player: player.into(),
            place,
            group,
            elimination: 0.0,
        }
    }

    #[test]
    fn test_winner_must_play() {
        assert!(MatchRecord::new("a", "b", "a", (5, 2)).is_ok());
        assert_eq!(
            MatchRecord::new("a", "b", "c", (5, 2)).unwrap_err(),
            RecordError::InvalidWinner("c".into())
        );
    }

    #[test]
    fn test_medal_ranking() {
        let table = vec![
            standing("A", 1, 0),
            standing("D", 2, 1),
            standing("B", 3, 2),
            standing("C", 4, 3),
            standing("E", 5, 4),
        ];
        assert_eq!(medal_ranking(&table), vec!["🏆 A", "🥈 D", "🥉 B", "C", "E"]);
    }

    #[test]
    fn test_leaderboard_and_history() {
        let store = MemoryResultStore::new();
        store.record_match(MatchRecord::new("a", "b", "a", (5, 1)).unwrap()).unwrap();
        store.record_match(MatchRecord::new("a", "c", "c", (3, 5)).unwrap()).unwrap();
        store.record_match(MatchRecord::new("c", "b", "c", (5, 4)).unwrap()).unwrap();

        let board = store.leaderboard();
        assert_eq!(board[0], ("c".to_string(), 2));
        assert_eq!(board[1], ("a".to_string(), 1));
        assert_eq!(board[2], ("b".to_string(), 0));

        let history = store.matches_for("a");
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].winner, "c");
    }

    #[test]
    fn test_tournaments_for_player() {
        let store = MemoryResultStore::new();
        let players = vec!["A".to_string(), "B".to_string()];
        let record = TournamentRecord::new(Uuid::new_v4(), players, &[standing("A", 1, 0), standing("B", 2, 1)]);
        store.record_tournament(record).unwrap();

        assert_eq!(store.tournaments_for("B").len(), 1);
        assert!(store.tournaments_for("Z").is_empty());
    }

    #[test]
    fn test_detached_without_runtime_writes_inline() {
        let store = Arc::new(MemoryResultStore::new());
        record_match_detached(store.clone(), MatchRecord::new("a", "b", "b", (0, 5)).unwrap());
        assert_eq!(store.match_count(), 1);

        // Failure is swallowed
        record_match_detached(Arc::new(BrokenStore), MatchRecord::new("a", "b", "b", (0, 5)).unwrap());
    }

    #[tokio::test]
    async fn test_detached_on_runtime() {
        let store = Arc::new(MemoryResultStore::new());
        record_match_detached(store.clone(), MatchRecord::new("a", "b", "a", (5, 0)).unwrap());
        record_tournament_detached(
            Arc::new(BrokenStore),
            TournamentRecord::new(Uuid::new_v4(), vec![], &[]),
        );

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(store.match_count(), 1);
    }

    struct SlowStore(MemoryResultStore);

    impl ResultStore for SlowStore {
        fn record_match(&self, record: MatchRecord) -> Result<(), RecordError> {
            std::thread::sleep(Duration::from_millis(300));
            self.0.record_match(record)
        }

        fn record_tournament(&self, record: TournamentRecord) -> Result<(), RecordError> {
            self.0.record_tournament(record)
        }
    }

    #[tokio::test(flavor = "current_thread")]
    async fn test_slow_store_does_not_stall_runtime() {
        let store = Arc::new(SlowStore(MemoryResultStore::new()));
        record_match_detached(store.clone(), MatchRecord::new("a", "b", "a", (5, 0)).unwrap());

        let start = std::time::Instant::now();
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(start.elapsed() < Duration::from_millis(200));

        for _ in 0..100 {
            if store.0.match_count() == 1 {
                return;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        panic!("slow write never landed");
    }
}
