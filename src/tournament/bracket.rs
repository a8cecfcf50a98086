//! Single-Elimination Bracket
//!
//! The whole bracket is laid out when it is generated: round one pairs the
//! shuffled players, every later round has half as many matchups (rounded
//! up) with empty slots. Winners move into the first open slot of the next
//! round. A matchup holding a single player once its feeder round has
//! finished is a bye and resolves on its own.

use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use uuid::Uuid;

use crate::core::rng::DeterministicRng;
use crate::tournament::ranking::{compute_ranking, Standing};

/// Player identifier (display name or user id).
pub type PlayerId = String;

/// Position of a matchup inside the bracket.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MatchupRef {
    /// Round index (0 = first round)
    pub round: usize,
    /// Matchup index within the round
    pub index: usize,
}

/// One bracket game.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Matchup {
    /// First slot
    pub player1: Option<PlayerId>,
    /// Second slot (`None` in round one means a bye)
    pub player2: Option<PlayerId>,
    /// Set once and never changed
    pub winner: Option<PlayerId>,
}

impl Matchup {
    /// Matchup between two players.
    pub fn new(player1: PlayerId, player2: Option<PlayerId>) -> Self {
        Self {
            player1: Some(player1),
            player2,
            winner: None,
        }
    }

    /// Whether a winner has been recorded.
    #[inline]
    pub fn is_resolved(&self) -> bool {
        self.winner.is_some()
    }

    /// Both slots are filled.
    #[inline]
    pub fn is_ready(&self) -> bool {
        self.player1.is_some() && self.player2.is_some()
    }

    /// Exactly one slot is filled.
    pub fn lone_player(&self) -> Option<&PlayerId> {
        match (&self.player1, &self.player2) {
            (Some(p), None) | (None, Some(p)) => Some(p),
            _ => None,
        }
    }

    /// Whether `player` sits in either slot.
    pub fn involves(&self, player: &str) -> bool {
        self.player1.as_deref() == Some(player) || self.player2.as_deref() == Some(player)
    }

    /// The participant who did not win, once resolved.
    pub fn loser(&self) -> Option<&PlayerId> {
        let winner = self.winner.as_ref()?;
        [&self.player1, &self.player2]
            .into_iter()
            .flatten()
            .find(|p| *p != winner)
    }

    /// Put `player` into the first open slot.
    fn seat(&mut self, player: PlayerId) -> bool {
        if self.player1.is_none() {
            self.player1 = Some(player);
            true
        } else if self.player2.is_none() {
            self.player2 = Some(player);
            true
        } else {
            false
        }
    }
}

/// A bracket round.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Round {
    /// 1-based round number
    pub number: u32,
    /// Games in this round
    pub matchups: Vec<Matchup>,
}

impl Round {
    fn is_complete(&self) -> bool {
        self.matchups.iter().all(Matchup::is_resolved)
    }
}

/// What a recorded result led to.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Progress {
    /// The winner moved on; more games remain.
    Advanced,
    /// The final was decided.
    Completed {
        /// Tournament champion
        champion: PlayerId,
    },
}

/// A single-elimination tournament.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Tournament {
    /// Tournament identifier
    pub id: Uuid,
    players: Vec<PlayerId>,
    rounds: Vec<Round>,
    winner: Option<PlayerId>,
    ranking: Option<Vec<Standing>>,
}

impl Tournament {
    /// Register players. At least two, all distinct.
    pub fn new(players: Vec<PlayerId>) -> Result<Self, TournamentError> {
        if players.len() < 2 {
            return Err(TournamentError::NotEnoughPlayers(players.len()));
        }
        for (i, player) in players.iter().enumerate() {
            if players[..i].contains(player) {
                return Err(TournamentError::DuplicatePlayer(player.clone()));
            }
        }

        Ok(Self {
            id: Uuid::new_v4(),
            players,
            rounds: Vec::new(),
            winner: None,
            ranking: None,
        })
    }

    /// Registered players in registration order.
    pub fn players(&self) -> &[PlayerId] {
        &self.players
    }

    /// Bracket rounds (empty before generation).
    pub fn rounds(&self) -> &[Round] {
        &self.rounds
    }

    /// Champion, once the final is decided.
    pub fn winner(&self) -> Option<&PlayerId> {
        self.winner.as_ref()
    }

    /// Final placement, once the final is decided.
    pub fn ranking(&self) -> Option<&[Standing]> {
        self.ranking.as_deref()
    }

    /// Look up a matchup.
    pub fn matchup(&self, at: MatchupRef) -> Option<&Matchup> {
        self.rounds.get(at.round)?.matchups.get(at.index)
    }

    /// Shuffle the players and lay out every round. Can only run once.
    pub fn generate_bracket(&mut self, rng: &mut DeterministicRng) -> Result<(), TournamentError> {
        if !self.rounds.is_empty() {
            return Err(TournamentError::BracketAlreadyGenerated);
        }

        let mut seeded = self.players.clone();
        rng.shuffle(&mut seeded);

        let mut first = Vec::with_capacity(seeded.len().div_ceil(2));
        let mut remaining = seeded.into_iter();
        while let Some(player1) = remaining.next() {
            first.push(Matchup::new(player1, remaining.next()));
        }

        let mut width = first.len();
        self.rounds.push(Round { number: 1, matchups: first });
        while width > 1 {
            width = width.div_ceil(2);
            self.rounds.push(Round {
                number: self.rounds.len() as u32 + 1,
                matchups: vec![Matchup::default(); width],
            });
        }

        info!(
            tournament = %self.id,
            players = self.players.len(),
            rounds = self.rounds.len(),
            "Bracket generated"
        );

        self.advance_byes();
        Ok(())
    }

    /// Next game to play: the first unresolved matchup with both players,
    /// else an unresolved final that has at least one player.
    pub fn next_match(&self) -> Option<(MatchupRef, &Matchup)> {
        if self.winner.is_some() {
            return None;
        }

        for (r, round) in self.rounds.iter().enumerate() {
            for (i, matchup) in round.matchups.iter().enumerate() {
                if !matchup.is_resolved() && matchup.is_ready() {
                    return Some((MatchupRef { round: r, index: i }, matchup));
                }
            }
        }

        let last = self.rounds.len().checked_sub(1)?;
        match self.rounds[last].matchups.as_slice() {
            [final_match]
                if !final_match.is_resolved()
                    && (final_match.player1.is_some() || final_match.player2.is_some()) =>
            {
                Some((MatchupRef { round: last, index: 0 }, final_match))
            }
            _ => None,
        }
    }

    /// Record the winner of a played game and move them on.
    pub fn record_result(
        &mut self,
        at: MatchupRef,
        winner: &str,
    ) -> Result<Progress, TournamentError> {
        if self.rounds.is_empty() {
            return Err(TournamentError::BracketNotGenerated);
        }
        let matchup = self
            .rounds
            .get(at.round)
            .and_then(|r| r.matchups.get(at.index))
            .ok_or(TournamentError::MatchupNotFound(at))?;

        if matchup.is_resolved() {
            return Err(TournamentError::AlreadyResolved(at));
        }
        if !matchup.is_ready() {
            return Err(TournamentError::AwaitingOpponent(at));
        }
        if !matchup.involves(winner) {
            return Err(TournamentError::WinnerNotInMatchup(winner.to_string()));
        }

        info!(tournament = %self.id, round = at.round + 1, winner, "Result recorded");
        self.resolve(at, winner.to_string());
        self.advance_byes();

        Ok(match &self.winner {
            Some(champion) => Progress::Completed { champion: champion.clone() },
            None => Progress::Advanced,
        })
    }

    /// Placement table. Only available once the final is decided.
    pub fn compute_ranking(&self) -> Result<Vec<Standing>, TournamentError> {
        let champion = self.winner.as_ref().ok_or(TournamentError::NotFinished)?;
        Ok(compute_ranking(&self.players, &self.rounds, champion))
    }

    /// Set the winner and propagate. Finishing the final completes the
    /// tournament.
    fn resolve(&mut self, at: MatchupRef, winner: PlayerId) {
        self.rounds[at.round].matchups[at.index].winner = Some(winner.clone());

        let next = at.round + 1;
        if next == self.rounds.len() {
            self.finish(winner);
            return;
        }

        let round = &mut self.rounds[next];
        if !round.matchups.iter_mut().any(|m| m.seat(winner.clone())) {
            round.matchups.push(Matchup::new(winner, None));
        }
    }

    /// Resolve every bye whose feeder round has finished, repeating until
    /// nothing changes.
    fn advance_byes(&mut self) {
        loop {
            let bye = self.rounds.iter().enumerate().find_map(|(r, round)| {
                if r > 0 && !self.rounds[r - 1].is_complete() {
                    return None;
                }
                round.matchups.iter().enumerate().find_map(|(i, m)| {
                    if m.is_resolved() {
                        return None;
                    }
                    m.lone_player()
                        .map(|p| (MatchupRef { round: r, index: i }, p.clone()))
                })
            });

            match bye {
                Some((at, player)) => {
                    debug!(round = at.round + 1, player = %player, "Bye advanced");
                    self.resolve(at, player);
                }
                None => break,
            }
        }
    }

    fn finish(&mut self, champion: PlayerId) {
        let ranking = compute_ranking(&self.players, &self.rounds, &champion);
        info!(tournament = %self.id, champion = %champion, "Tournament completed");
        self.winner = Some(champion);
        self.ranking = Some(ranking);
    }
}

// =============================================================================
// ERRORS
// =============================================================================

/// Tournament errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TournamentError {
    /// Fewer than two players registered.
    #[error("Not enough players: {0}")]
    NotEnoughPlayers(usize),

    /// A player was registered twice.
    #[error("Duplicate player: {0}")]
    DuplicatePlayer(PlayerId),

    /// `generate_bracket` already ran.
    #[error("Bracket already generated")]
    BracketAlreadyGenerated,

    /// No bracket yet.
    #[error("Bracket not generated")]
    BracketNotGenerated,

    /// No matchup at that position.
    #[error("Matchup not found: {0:?}")]
    MatchupNotFound(MatchupRef),

    /// Winner is not one of the two players.
    #[error("Winner not in matchup: {0}")]
    WinnerNotInMatchup(PlayerId),

    /// Matchup already has a winner.
    #[error("Matchup already resolved: {0:?}")]
    AlreadyResolved(MatchupRef),

    /// Matchup is still missing a player.
    #[error("Matchup awaiting opponent: {0:?}")]
    AwaitingOpponent(MatchupRef),

    /// The final has not been played.
    #[error("Tournament not finished")]
    NotFinished,
}

// =============================================================================
// TESTS
// =============================================================================
