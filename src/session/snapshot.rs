//! Match Snapshots
//!
//! Saved score and geometry of an in-progress match so a reload can pick
//! up where it left off. A snapshot is trusted only after its checksum,
//! its age and its geometry all check out; otherwise the caller starts
//! from a fresh kickoff.
//!
//! Scores and geometry age differently. The score stays restorable for
//! minutes, the ball and paddles only for a few seconds.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::core::hash::{short_hex, StateHash, StateHasher};
use crate::core::vec2::Vec2;
use crate::game::state::{Score, World};

/// How long each part of a snapshot stays valid.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SnapshotPolicy {
    /// Score is restored while the snapshot is younger than this.
    pub scores_ttl: Duration,
    /// Ball and paddles are restored while younger than this.
    pub geometry_ttl: Duration,
    /// Minimum spacing between geometry saves.
    pub save_interval: Duration,
}

impl Default for SnapshotPolicy {
    fn default() -> Self {
        Self {
            scores_ttl: Duration::from_secs(180),
            geometry_ttl: Duration::from_secs(10),
            save_interval: Duration::from_secs(2),
        }
    }
}

impl SnapshotPolicy {
    /// Whether a new snapshot is due.
    pub fn should_save(&self, last_saved: Option<DateTime<Utc>>, now: DateTime<Utc>) -> bool {
        match last_saved {
            None => true,
            Some(last) => age(last, now) >= self.save_interval,
        }
    }
}

/// What a successful restore brought back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Restored {
    /// Score, ball and paddles.
    Full,
    /// Score only; geometry was too old and the world is at kickoff.
    ScoreOnly,
}

/// Saved state of one match.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchSnapshot {
    /// When the snapshot was taken
    pub saved_at: DateTime<Utc>,
    /// Score at that moment
    pub score: Score,
    /// Left paddle y
    pub left_y: f64,
    /// Right paddle y
    pub right_y: f64,
    /// Ball centre
    pub ball_position: Vec2,
    /// Ball velocity
    pub ball_velocity: Vec2,
    /// SHA-256 over every field above
    pub checksum: StateHash,
}

impl MatchSnapshot {
    /// Capture the current world.
    pub fn capture(world: &World, now: DateTime<Utc>) -> Self {
        let mut snapshot = Self {
            saved_at: now,
            score: world.score,
            left_y: world.left.y,
            right_y: world.right.y,
            ball_position: world.ball.position,
            ball_velocity: world.ball.velocity,
            checksum: [0; 32],
        };
        snapshot.checksum = snapshot.compute_checksum();
        snapshot
    }

    /// Checksum of the payload fields in a fixed order.
    pub fn compute_checksum(&self) -> StateHash {
        let mut hasher = StateHasher::for_snapshot();
        hasher.update_i64(self.saved_at.timestamp_millis());
        hasher.update_u32(self.score.left);
        hasher.update_u32(self.score.right);
        for value in [
            self.left_y,
            self.right_y,
            self.ball_position.x,
            self.ball_position.y,
            self.ball_velocity.x,
            self.ball_velocity.y,
        ] {
            hasher.update_f64(value);
        }
        hasher.finalize()
    }

    /// Load this snapshot into `world`.
    ///
    /// On error the world is left exactly as it was.
    pub fn restore(
        &self,
        world: &mut World,
        now: DateTime<Utc>,
        policy: &SnapshotPolicy,
    ) -> Result<Restored, SnapshotError> {
        if self.compute_checksum() != self.checksum {
            warn!(checksum = %short_hex(&self.checksum), "Discarding snapshot with bad checksum");
            return Err(SnapshotError::ChecksumMismatch);
        }

        let age = age(self.saved_at, now);
        if age > policy.scores_ttl {
            debug!(age_ms = age.as_millis() as u64, "Snapshot expired");
            return Err(SnapshotError::Expired(age));
        }

        if age > policy.geometry_ttl {
            world.reset();
            world.score = self.score;
            debug!(age_ms = age.as_millis() as u64, "Restored score only");
            return Ok(Restored::ScoreOnly);
        }

        if let Err(e) = self.validate_geometry(world) {
            warn!(error = %e, "Discarding snapshot with invalid geometry");
            return Err(e);
        }

        world.reset();
        world.score = self.score;
        world.left.y = self.left_y;
        world.right.y = self.right_y;
        world.ball.position = self.ball_position;
        world.ball.velocity = self.ball_velocity;
        Ok(Restored::Full)
    }

    fn validate_geometry(&self, world: &World) -> Result<(), SnapshotError> {
        let config = &world.config;
        let invalid = |what: &str| Err(SnapshotError::InvalidGeometry(what.to_string()));

        if !self.ball_position.is_finite() || !self.ball_velocity.is_finite() {
            return invalid("non-finite ball");
        }
        let Vec2 { x, y } = self.ball_position;
        if !(0.0..=config.width).contains(&x) || !(0.0..=config.height).contains(&y) {
            return invalid("ball outside canvas");
        }
        if self.ball_velocity.length() > config.max_ball_speed + 1e-9 {
            return invalid("ball too fast");
        }
        for paddle_y in [self.left_y, self.right_y] {
            if !paddle_y.is_finite() || !(0.0..=config.paddle_max_y()).contains(&paddle_y) {
                return invalid("paddle out of bounds");
            }
        }
        Ok(())
    }

    /// Compact binary encoding.
    pub fn to_bytes(&self) -> Result<Vec<u8>, SnapshotError> {
        bincode::serialize(self).map_err(|e| SnapshotError::Decode(e.to_string()))
    }

    /// Decode the binary encoding.
    pub fn from_bytes(data: &[u8]) -> Result<Self, SnapshotError> {
        bincode::deserialize(data).map_err(|e| SnapshotError::Decode(e.to_string()))
    }

    /// JSON encoding.
    pub fn to_json(&self) -> Result<String, SnapshotError> {
        serde_json::to_string(self).map_err(|e| SnapshotError::Decode(e.to_string()))
    }

    /// Decode the JSON encoding.
    pub fn from_json(s: &str) -> Result<Self, SnapshotError> {
        serde_json::from_str(s).map_err(|e| SnapshotError::Decode(e.to_string()))
    }
}

/// Age of a timestamp; timestamps from the future count as fresh.
fn age(saved_at: DateTime<Utc>, now: DateTime<Utc>) -> Duration {
    (now - saved_at).to_std().unwrap_or(Duration::ZERO)
}

/// Snapshot errors.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SnapshotError {
    /// Older than the score TTL.
    #[error("Snapshot expired ({0:?} old)")]
    Expired(Duration),

    /// Payload does not match its checksum.
    #[error("Snapshot checksum mismatch")]
    ChecksumMismatch,

    /// Geometry outside the arena or non-finite.
    #[error("Invalid geometry: {0}")]
    InvalidGeometry(String),

    /// Encoding or decoding failed.
    #[error("Snapshot codec error: {0}")]
    Decode(String),
}
