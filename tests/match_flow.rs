//! End-to-end match flows: computer players driving full sessions through
//! a bracket and into the result store.

use std::sync::Arc;

use pong_arena::{
    ai::AiController,
    core::rng::DeterministicRng,
    records::{MemoryResultStore, ResultStore},
    session::{MatchSession, SessionConfig},
    tournament::Progress,
    Difficulty, GameMode, Side, Tournament,
};

/// Half an hour of simulated play.
const MAX_TICKS: u64 = 60 * 60 * 30;

fn seeded(seed: u64) -> SessionConfig {
    SessionConfig {
        seed: Some(seed),
        ..Default::default()
    }
}

fn bot_session(session: &mut MatchSession, rng: &mut DeterministicRng) {
    for side in [Side::Left, Side::Right] {
        session
            .runner_mut()
            .attach_ai(AiController::new(side, Difficulty::Easy, rng.next_u64()));
    }
}

#[test]
fn test_full_tournament_with_bots() {
    let players: Vec<String> = ["ann", "bob", "cat", "dan", "eve"].iter().map(|s| s.to_string()).collect();
    let store = Arc::new(MemoryResultStore::new());
    let mut tournament = Tournament::new(players.clone()).unwrap();
    let mut rng = DeterministicRng::new(2024);
    tournament.generate_bracket(&mut rng).unwrap();

    let mut games = 0;
    let champion = loop {
        let mut session = MatchSession::for_tournament(&tournament, seeded(rng.next_u64())).unwrap();
        bot_session(&mut session, &mut rng);
        session.start().unwrap();

        let outcome = session.play_headless(MAX_TICKS).expect("match should finish");
        assert_eq!(outcome.score.left.max(outcome.score.right), pong_arena::DEFAULT_TARGET_SCORE);
        games += 1;

        let store: Arc<dyn ResultStore> = store.clone();
        match session.report_to_tournament(&mut tournament, Some(store)).unwrap() {
            Progress::Completed { champion } => break champion,
            Progress::Advanced => {}
        }
    };

    // Single elimination: everyone but the champion loses exactly once
    assert_eq!(games, players.len() - 1);
    assert_eq!(tournament.winner(), Some(&champion));

    let ranking = tournament.compute_ranking().unwrap();
    assert_eq!(ranking.len(), players.len());
    assert_eq!(ranking[0].player, champion);
    assert_eq!(ranking[0].place, 1);

    let stored = store.tournaments_for(&champion);
    assert_eq!(stored.len(), 1);
    assert!(stored[0].ranking[0].contains(&champion));
}

#[test]
fn test_seeded_bot_match_replays() {
    let play = || {
        let mut session = MatchSession::new(GameMode::Local, "left", "right", seeded(99));
        bot_session(&mut session, &mut DeterministicRng::new(5));
        session.start().unwrap();
        session.play_headless(MAX_TICKS).expect("match should finish")
    };

    let first = play();
    let second = play();
    assert_eq!(first.winner, second.winner);
    assert_eq!(first.score, second.score);
    assert_eq!(first.ticks, second.ticks);
}

#[test]
fn test_ai_mode_updates_opponent() {
    let mut session = MatchSession::new(GameMode::Ai(Difficulty::Normal), "human", "cpu", seeded(3));
    session.start().unwrap();

    // Nobody presses a key; the left paddle stays put
    let outcome = session.play_headless(MAX_TICKS).expect("match should finish");
    let ai = session.runner().ai(Side::Right).unwrap();
    if outcome.winner == "human" {
        assert_eq!(ai.consecutive_losses(), 1);
    } else {
        assert_eq!(outcome.winner, "cpu");
        assert_eq!(ai.consecutive_losses(), 0);
    }

    let store = Arc::new(MemoryResultStore::new());
    assert_eq!(session.record(store.clone()), Ok(false));
    assert_eq!(store.match_count(), 0);
}

#[test]
fn test_local_match_recorded() {
    let store = Arc::new(MemoryResultStore::new());
    let mut session = MatchSession::new(GameMode::Local, "ann", "bob", seeded(17));
    bot_session(&mut session, &mut DeterministicRng::new(8));
    session.start().unwrap();

    let outcome = session.play_headless(MAX_TICKS).expect("match should finish");
    assert_eq!(session.record(store.clone()), Ok(true));

    let leaderboard = store.leaderboard();
    assert_eq!(leaderboard[0], (outcome.winner.clone(), 1));
    assert_eq!(store.matches_for(&outcome.loser).len(), 1);
}
