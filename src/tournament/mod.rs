//! Single-elimination tournaments.
//!
//! Bracket generation, result propagation with automatic byes and the
//! final placement table.

pub mod bracket;
pub mod ranking;

pub use bracket::{Matchup, MatchupRef, PlayerId, Progress, Round, Tournament, TournamentError};
pub use ranking::Standing;
