//! Final placement.
//!
//! Every player is tagged with the index of the round they were knocked out
//! in; the champion gets one past the last round. Semifinal losers are
//! split for third place: losing to the champion adds 0.6, losing to the
//! runner-up adds 0.5. Sorting the tags descending gives the table.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::tournament::bracket::{PlayerId, Round};

/// Bonus for a semifinal loss against the eventual champion.
pub const LOST_TO_CHAMPION_BONUS: f64 = 0.6;
/// Bonus for a semifinal loss against the runner-up.
pub const LOST_TO_RUNNER_UP_BONUS: f64 = 0.5;

/// One row of the placement table.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Standing {
    /// Player
    pub player: PlayerId,
    /// 1-based place; tied players share it
    pub place: u32,
    /// Index of the tie group (0 = champion)
    pub group: u32,
    /// Elimination tag the table is sorted by
    pub elimination: f64,
}

/// Build the placement table for a finished bracket.
pub fn compute_ranking(players: &[PlayerId], rounds: &[Round], champion: &str) -> Vec<Standing> {
    let mut eliminated: BTreeMap<&str, f64> = BTreeMap::new();
    for (index, round) in rounds.iter().enumerate() {
        for matchup in &round.matchups {
            if let Some(loser) = matchup.loser() {
                eliminated.insert(loser.as_str(), index as f64);
            }
        }
    }
    eliminated.insert(champion, rounds.len() as f64);

    if rounds.len() >= 2 {
        let runner_up = rounds[rounds.len() - 1]
            .matchups
            .first()
            .and_then(|m| m.loser())
            .map(String::as_str);
        let semifinal = rounds.len() - 2;

        for matchup in &rounds[semifinal].matchups {
            let (Some(loser), Some(conqueror)) = (matchup.loser(), matchup.winner.as_deref()) else {
                continue;
            };
            let bonus = if conqueror == champion {
                LOST_TO_CHAMPION_BONUS
            } else if Some(conqueror) == runner_up {
                LOST_TO_RUNNER_UP_BONUS
            } else {
                continue;
            };
            eliminated.insert(loser.as_str(), semifinal as f64 + bonus);
        }
    }

    let mut table: Vec<Standing> = players
        .iter()
        .map(|p| Standing {
            player: p.clone(),
            place: 0,
            group: 0,
            elimination: eliminated.get(p.as_str()).copied().unwrap_or(0.0),
        })
        .collect();
    table.sort_by(|a, b| b.elimination.total_cmp(&a.elimination));

    let mut group = 0;
    for i in 0..table.len() {
        if i > 0 && table[i].elimination < table[i - 1].elimination {
            group += 1;
        }
        let tag = table[i].elimination;
        let ahead = table[..i].iter().filter(|s| s.elimination > tag).count() as u32;
        table[i].group = group;
        table[i].place = 1 + ahead;
    }

    table
}
