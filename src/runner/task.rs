//! Async Match Loop
//!
//! Schedules a [`MatchRunner`] on a tokio interval. One loop drives one
//! runner; starting again always cancels the previous loop first, so two
//! loops can never race on the same world.
//!
//! `on_score` runs while the runner is locked. Forward points over a
//! channel rather than touching the runner from inside the callback.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::{broadcast, Mutex};
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info};

use crate::game::state::Side;
use crate::runner::{MatchRunner, Renderer};

/// Callback invoked for every point.
pub type ScoreCallback = Box<dyn FnMut(Side) + Send>;

/// Owns the background task driving a shared runner.
pub struct MatchLoop {
    runner: Arc<Mutex<MatchRunner>>,
    tick_rate: u32,
    handle: Option<JoinHandle<()>>,
    shutdown_tx: Option<broadcast::Sender<()>>,
}

impl MatchLoop {
    /// Wrap a runner. Nothing is scheduled until [`MatchLoop::start`].
    pub fn new(runner: MatchRunner, tick_rate: u32) -> Self {
        Self {
            runner: Arc::new(Mutex::new(runner)),
            tick_rate: tick_rate.max(1),
            handle: None,
            shutdown_tx: None,
        }
    }

    /// Shared handle to the runner (keys, world inspection).
    pub fn runner(&self) -> Arc<Mutex<MatchRunner>> {
        Arc::clone(&self.runner)
    }

    /// True while a loop task is alive.
    pub fn is_active(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Reset the runner and start a fresh loop, cancelling any loop that
    /// was already running.
    pub async fn start(&mut self, mut renderer: Box<dyn Renderer>, mut on_score: ScoreCallback) {
        self.stop();
        self.runner.lock().await.start();

        let (shutdown_tx, mut shutdown_rx) = broadcast::channel(1);
        let runner = Arc::clone(&self.runner);
        let period = Duration::from_micros(1_000_000 / u64::from(self.tick_rate));

        let handle = tokio::spawn(async move {
            let mut ticker = interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            let mut last = Instant::now();

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        let now = Instant::now();
                        let elapsed_ms = now.duration_since(last).as_secs_f64() * 1000.0;
                        last = now;

                        let mut runner = runner.lock().await;
                        if !runner.is_running() {
                            break;
                        }
                        runner.frame(elapsed_ms, renderer.as_mut(), &mut *on_score);
                    }
                    _ = shutdown_rx.recv() => {
                        break;
                    }
                }
            }
            debug!("Match loop exited");
        });

        self.handle = Some(handle);
        self.shutdown_tx = Some(shutdown_tx);
        info!(tick_rate = self.tick_rate, "Match loop started");
    }

    /// Cancel the loop. Synchronous and idempotent.
    pub fn stop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.handle.take() {
            handle.abort();
            info!("Match loop stopped");
        }
    }

    /// Stop the loop and put the runner back at kickoff.
    pub async fn reset(&mut self) {
        self.stop();
        let mut runner = self.runner.lock().await;
        runner.stop();
        runner.reset();
    }
}

impl Drop for MatchLoop {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::state::ArenaConfig;
    use crate::runner::{NullRenderer, RunnerConfig};

    fn match_loop() -> MatchLoop {
        let runner = MatchRunner::new(RunnerConfig::default(), ArenaConfig::default(), 5);
        MatchLoop::new(runner, 60)
    }

    #[tokio::test]
    async fn test_loop_advances_and_stops() {
        let mut lp = match_loop();
        lp.start(Box::new(NullRenderer), Box::new(|_| {})).await;
        assert!(lp.is_active());

        tokio::time::sleep(Duration::from_millis(200)).await;
        lp.stop();
        let ticks = lp.runner().lock().await.world().tick;
        assert!(ticks > 0);

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(lp.runner().lock().await.world().tick, ticks);
        assert!(!lp.is_active());

        // Second stop is a no-op
        lp.stop();
    }

    #[tokio::test]
    async fn test_restart_replaces_loop() {
        let mut lp = match_loop();
        lp.start(Box::new(NullRenderer), Box::new(|_| {})).await;
        tokio::time::sleep(Duration::from_millis(50)).await;

        // Restart resets the world and runs a single loop
        lp.start(Box::new(NullRenderer), Box::new(|_| {})).await;
        tokio::time::sleep(Duration::from_millis(170)).await;
        lp.stop();

        // One 60 Hz loop cannot exceed ~12 ticks in 170 ms (frame catch-up is 1)
        let ticks = lp.runner().lock().await.world().tick;
        assert!(ticks <= 14, "ticks = {ticks}");
    }

    #[tokio::test]
    async fn test_reset_restores_kickoff() {
        let mut lp = match_loop();
        lp.start(Box::new(NullRenderer), Box::new(|_| {})).await;
        tokio::time::sleep(Duration::from_millis(100)).await;
        lp.reset().await;

        let runner = lp.runner();
        let runner = runner.lock().await;
        assert_eq!(runner.world().tick, 0);
        assert!(!runner.is_running());
    }

    #[tokio::test]
    async fn test_points_forwarded_over_channel() {
        let mut lp = match_loop();
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        lp.start(Box::new(NullRenderer), Box::new(move |side| {
            let _ = tx.send(side);
        }))
        .await;

        {
            let runner = lp.runner();
            let mut runner = runner.lock().await;
            let world = runner.world_mut();
            world.ball.position = crate::core::vec2::Vec2::new(2.0, 50.0);
            world.ball.velocity = crate::core::vec2::Vec2::new(-13.0, 0.0);
            world.left.y = 300.0;
        }

        let side = tokio::time::timeout(Duration::from_secs(2), rx.recv()).await.unwrap();
        assert_eq!(side, Some(Side::Right));
        lp.stop();
    }
}
