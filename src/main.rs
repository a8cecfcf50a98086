//! Pong Arena Server
//!
//! Runs the presence and matchmaking WebSocket server. `demo` plays a
//! headless four-bot tournament instead.

use std::collections::BTreeMap;
use std::sync::Arc;

use anyhow::{bail, Context};
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use pong_arena::{
    ai::AiController,
    core::rng::{derive_seed, DeterministicRng},
    records::{MemoryResultStore, ResultStore},
    session::{MatchSession, SessionConfig},
    tournament::{Progress, Tournament},
    Difficulty, GameServer, ServerConfig, Side, TICK_RATE, VERSION,
};

/// Ten simulated minutes per match at most.
const DEMO_MAX_TICKS: u64 = TICK_RATE as u64 * 600;

fn main() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = FmtSubscriber::builder().with_env_filter(filter).finish();
    tracing::subscriber::set_global_default(subscriber).context("Failed to set tracing subscriber")?;

    info!("Pong Arena v{}", VERSION);
    info!("Tick Rate: {} Hz", TICK_RATE);

    match std::env::args().nth(1).as_deref() {
        // No runtime: detached record writes happen inline
        Some("demo") => demo_tournament(),
        _ => tokio::runtime::Runtime::new()
            .context("Failed to start runtime")?
            .block_on(serve()),
    }
}

async fn serve() -> anyhow::Result<()> {
    let config = ServerConfig::from_env();
    info!("Binding {}", config.bind_addr);
    let server = Arc::new(GameServer::new(config));

    let signal = server.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            signal.shutdown();
        }
    });

    server.run().await.context("Server failed")?;
    Ok(())
}

/// Four computer players fight it out; results go to an in-memory store.
fn demo_tournament() -> anyhow::Result<()> {
    info!("=== Starting Demo Tournament ===");

    let bots: BTreeMap<String, Difficulty> = [
        ("easy-bot", Difficulty::Easy),
        ("normal-bot", Difficulty::Normal),
        ("hard-bot", Difficulty::Hard),
        ("rookie-bot", Difficulty::Easy),
    ]
    .into_iter()
    .map(|(name, d)| (name.to_string(), d))
    .collect();

    let store = Arc::new(MemoryResultStore::new());
    let mut tournament = Tournament::new(bots.keys().cloned().collect())?;
    let mut rng = DeterministicRng::new(derive_seed("demo", tournament.id.as_bytes()));
    tournament.generate_bracket(&mut rng)?;

    loop {
        let config = SessionConfig {
            seed: Some(rng.next_u64()),
            ..Default::default()
        };
        let mut session = MatchSession::for_tournament(&tournament, config)?;
        for side in [Side::Left, Side::Right] {
            let name = session.player(side).to_string();
            let difficulty = bots.get(&name).copied().unwrap_or_default();
            session
                .runner_mut()
                .attach_ai(AiController::new(side, difficulty, rng.next_u64()));
        }

        session.start()?;
        let Some(outcome) = session.play_headless(DEMO_MAX_TICKS) else {
            bail!("{} vs {} did not finish", session.player(Side::Left), session.player(Side::Right));
        };
        info!(
            "{} beat {} {}-{} in {} ticks",
            outcome.winner,
            outcome.loser,
            outcome.score.left.max(outcome.score.right),
            outcome.score.left.min(outcome.score.right),
            outcome.ticks
        );

        let store: Arc<dyn ResultStore> = store.clone();
        if let Progress::Completed { champion } = session.report_to_tournament(&mut tournament, Some(store))? {
            info!("Champion: {}", champion);
            break;
        }
    }

    for standing in tournament.compute_ranking()? {
        info!("#{} {}", standing.place, standing.player);
    }
    for record in store.tournaments_for("hard-bot") {
        info!("Stored ranking: {}", record.ranking.join(", "));
    }

    Ok(())
}
