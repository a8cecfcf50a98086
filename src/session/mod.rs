//! Match Sessions
//!
//! A session wraps one [`MatchRunner`] with what the runner deliberately
//! does not know: who is playing, the target score, and where the result
//! goes once someone reaches it (AI self-tuning, the tournament bracket,
//! the result store).

pub mod snapshot;

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::ai::config::Difficulty;
use crate::ai::controller::AiController;
use crate::core::rng::derive_seed;
use crate::game::events::GameEvent;
use crate::game::state::{ArenaConfig, Score, Side};
use crate::records::{
    record_match_detached, record_tournament_detached, MatchRecord, ResultStore, TournamentRecord,
};
use crate::runner::{MatchRunner, Renderer, RunnerConfig};
use crate::tournament::{MatchupRef, Progress, Tournament, TournamentError};
use crate::DEFAULT_TARGET_SCORE;

pub use snapshot::{MatchSnapshot, Restored, SnapshotError, SnapshotPolicy};

/// How a match was set up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", content = "difficulty", rename_all = "snake_case")]
pub enum GameMode {
    /// Two humans on one keyboard.
    Local,
    /// Human on the left against the computer on the right.
    Ai(Difficulty),
    /// A bracket game.
    Tournament,
    /// Players paired by the matchmaking queue.
    Online,
}

/// Session configuration.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// First side to reach this many points wins.
    pub target_score: u32,
    /// Loop timing.
    pub runner: RunnerConfig,
    /// Arena geometry.
    pub arena: ArenaConfig,
    /// Seed for serves, effects and AI noise; random when `None`.
    pub seed: Option<u64>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            target_score: DEFAULT_TARGET_SCORE,
            runner: RunnerConfig::default(),
            arena: ArenaConfig::default(),
            seed: None,
        }
    }
}

/// Result of a finished match.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchOutcome {
    /// Session that produced it
    pub session_id: Uuid,
    /// Mode of the match
    pub mode: GameMode,
    /// Winning player
    pub winner: String,
    /// Losing player
    pub loser: String,
    /// Side the winner played on
    pub winner_side: Side,
    /// Final score
    pub score: Score,
    /// Ticks simulated
    pub ticks: u64,
}

/// One match from kickoff to a declared winner.
pub struct MatchSession {
    id: Uuid,
    mode: GameMode,
    left_player: String,
    right_player: String,
    target_score: u32,
    runner: MatchRunner,
    outcome: Option<MatchOutcome>,
    matchup: Option<MatchupRef>,
}

impl MatchSession {
    /// Create a session. In AI mode the right paddle is given to the
    /// computer.
    pub fn new(
        mode: GameMode,
        left_player: impl Into<String>,
        right_player: impl Into<String>,
        config: SessionConfig,
    ) -> Self {
        let id = Uuid::new_v4();
        let seed = config.seed.unwrap_or_else(|| derive_seed("session", id.as_bytes()));
        let mut runner = MatchRunner::new(config.runner, config.arena, seed);

        if let GameMode::Ai(difficulty) = mode {
            let ai_seed = derive_seed("ai", &seed.to_le_bytes());
            runner.attach_ai(AiController::new(Side::Right, difficulty, ai_seed));
        }

        Self {
            id,
            mode,
            left_player: left_player.into(),
            right_player: right_player.into(),
            target_score: config.target_score.max(1),
            runner,
            outcome: None,
            matchup: None,
        }
    }

    /// Session for the tournament's next pending game.
    pub fn for_tournament(tournament: &Tournament, config: SessionConfig) -> Result<Self, SessionError> {
        let (at, matchup) = tournament.next_match().ok_or(SessionError::NoPendingMatch)?;
        let (Some(player1), Some(player2)) = (&matchup.player1, &matchup.player2) else {
            return Err(TournamentError::AwaitingOpponent(at).into());
        };

        let mut session = Self::new(GameMode::Tournament, player1.clone(), player2.clone(), config);
        session.matchup = Some(at);
        Ok(session)
    }

    /// Session identifier.
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Match mode.
    pub fn mode(&self) -> GameMode {
        self.mode
    }

    /// Player on `side`.
    pub fn player(&self, side: Side) -> &str {
        match side {
            Side::Left => &self.left_player,
            Side::Right => &self.right_player,
        }
    }

    /// Points scored so far, read from the world.
    pub fn points(&self) -> Score {
        self.runner.world().score
    }

    /// The result, once decided.
    pub fn outcome(&self) -> Option<&MatchOutcome> {
        self.outcome.as_ref()
    }

    /// Bracket position for tournament sessions.
    pub fn matchup(&self) -> Option<MatchupRef> {
        self.matchup
    }

    /// Underlying runner (keys, world).
    pub fn runner(&self) -> &MatchRunner {
        &self.runner
    }

    /// Mutable runner.
    pub fn runner_mut(&mut self) -> &mut MatchRunner {
        &mut self.runner
    }

    /// Kick off. A decided match cannot be restarted.
    pub fn start(&mut self) -> Result<(), SessionError> {
        if self.outcome.is_some() {
            return Err(SessionError::AlreadyFinished);
        }
        self.runner.start();
        info!(
            session = %self.id,
            mode = ?self.mode,
            left = %self.left_player,
            right = %self.right_player,
            target = self.target_score,
            "Match started"
        );
        Ok(())
    }

    /// Abandon the match without a result.
    pub fn stop(&mut self) {
        if self.runner.is_running() {
            self.runner.stop();
            info!(session = %self.id, "Match stopped");
        }
    }

    /// Run one tick. Returns the outcome on the tick that decided it.
    /// A decided match no longer ticks.
    pub fn tick(&mut self) -> Option<MatchOutcome> {
        self.tick_events(&mut Vec::new())
    }

    /// Advance by a frame delta. Returns the outcome if it was decided in
    /// this frame; ticks owed after the deciding one are not run.
    pub fn frame(&mut self, elapsed_ms: f64, renderer: &mut dyn Renderer) -> Option<MatchOutcome> {
        let ticks = self.runner.advance_clock(elapsed_ms);
        let mut events = Vec::new();
        let mut decided = None;
        for _ in 0..ticks {
            decided = self.tick_events(&mut events);
            if decided.is_some() {
                break;
            }
        }

        if ticks > 0 {
            renderer.render(self.runner.world(), &events);
        }
        decided
    }

    fn tick_events(&mut self, events: &mut Vec<GameEvent>) -> Option<MatchOutcome> {
        if self.outcome.is_some() {
            return None;
        }
        let mut scored = None;
        events.extend(self.runner.tick(&mut |side| scored = Some(side)).events);
        scored.and_then(|side| self.settle(side))
    }

    /// Tick without rendering until decided or `max_ticks` have run.
    pub fn play_headless(&mut self, max_ticks: u64) -> Option<MatchOutcome> {
        for _ in 0..max_ticks {
            if let Some(outcome) = self.tick() {
                return Some(outcome);
            }
        }
        None
    }

    /// Award a point scored outside the simulation (forfeits, remote
    /// results). Declares the winner exactly once; later points are
    /// ignored.
    pub fn award_point(&mut self, side: Side) -> Option<MatchOutcome> {
        if self.outcome.is_some() {
            debug!(session = %self.id, ?side, "Point after match end ignored");
            return None;
        }
        self.runner.world_mut().score.award(side);
        self.settle(side)
    }

    /// Check the target after the world recorded a point for `side`.
    fn settle(&mut self, side: Side) -> Option<MatchOutcome> {
        let score = self.runner.world().score;
        debug!(session = %self.id, ?side, left = score.left, right = score.right, "Point scored");
        if score.get(side) < self.target_score {
            return None;
        }

        self.runner.stop();
        let outcome = MatchOutcome {
            session_id: self.id,
            mode: self.mode,
            winner: self.player(side).to_string(),
            loser: self.player(side.opposite()).to_string(),
            winner_side: side,
            score,
            ticks: self.runner.world().tick,
        };
        info!(
            session = %self.id,
            winner = %outcome.winner,
            left = outcome.score.left,
            right = outcome.score.right,
            "Match won"
        );

        if let GameMode::Ai(_) = self.mode {
            if let Some(ai) = self.runner.ai_mut(Side::Right) {
                match side {
                    Side::Left => ai.on_loss(),
                    Side::Right => ai.on_win(),
                }
            }
        }

        self.outcome = Some(outcome.clone());
        Some(outcome)
    }

    /// Feed a decided tournament game into its bracket. When that finishes
    /// the tournament, its ranking goes to `store`.
    pub fn report_to_tournament(
        &self,
        tournament: &mut Tournament,
        store: Option<Arc<dyn ResultStore>>,
    ) -> Result<Progress, SessionError> {
        let outcome = self.outcome.as_ref().ok_or(SessionError::NotFinished)?;
        let at = self.matchup.ok_or(SessionError::NotATournamentMatch)?;

        let progress = tournament.record_result(at, &outcome.winner)?;
        if let (Progress::Completed { .. }, Some(store)) = (&progress, store) {
            let standings = tournament.compute_ranking()?;
            let record = TournamentRecord::new(tournament.id, tournament.players().to_vec(), &standings);
            record_tournament_detached(store, record);
        }
        Ok(progress)
    }

    /// Send a decided local or online match to `store`. AI and tournament
    /// games are not recorded as matches.
    pub fn record(&self, store: Arc<dyn ResultStore>) -> Result<bool, SessionError> {
        let outcome = self.outcome.as_ref().ok_or(SessionError::NotFinished)?;
        if !matches!(self.mode, GameMode::Local | GameMode::Online) {
            return Ok(false);
        }

        match MatchRecord::new(
            self.left_player.clone(),
            self.right_player.clone(),
            outcome.winner.clone(),
            (outcome.score.left, outcome.score.right),
        ) {
            Ok(record) => {
                record_match_detached(store, record);
                Ok(true)
            }
            Err(e) => {
                warn!(session = %self.id, error = %e, "Match not recorded");
                Ok(false)
            }
        }
    }

    /// Capture score and geometry.
    pub fn snapshot(&self, now: DateTime<Utc>) -> MatchSnapshot {
        MatchSnapshot::capture(self.runner.world(), now)
    }

    /// Resume from a snapshot, or fall back to a fresh kickoff when it
    /// cannot be trusted.
    pub fn restore_or_reset(
        &mut self,
        snapshot: &MatchSnapshot,
        now: DateTime<Utc>,
        policy: &SnapshotPolicy,
    ) -> Option<Restored> {
        match snapshot.restore(self.runner.world_mut(), now, policy) {
            Ok(restored) => Some(restored),
            Err(e) => {
                warn!(session = %self.id, error = %e, "Snapshot discarded, resetting");
                self.runner.reset();
                None
            }
        }
    }
}

/// Session errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    /// The match already has a winner.
    #[error("Match already finished")]
    AlreadyFinished,

    /// No winner yet.
    #[error("Match not finished")]
    NotFinished,

    /// The session was not created from a bracket.
    #[error("Not a tournament match")]
    NotATournamentMatch,

    /// The tournament has no game waiting to be played.
    #[error("No pending tournament match")]
    NoPendingMatch,

    /// Bracket rejected the result.
    #[error("Tournament error: {0}")]
    Tournament(#[from] TournamentError),
}
