//! Fixed-Timestep Clock
//!
//! Converts wall-clock frame deltas into a whole number of simulation
//! ticks. Leftover time carries over to the next frame; time beyond the
//! catch-up limit is dropped so a stalled frame never triggers a burst
//! of ticks.

/// Accumulates elapsed time and hands out ticks.
#[derive(Clone, Debug)]
pub struct FrameClock {
    tick_ms: f64,
    max_catch_up: u32,
    accumulator: f64,
    dropped_ms: f64,
}

impl FrameClock {
    /// Create a clock for `tick_rate` Hz, running at most `max_catch_up`
    /// ticks per frame (minimum 1).
    pub fn new(tick_rate: u32, max_catch_up: u32) -> Self {
        Self {
            tick_ms: 1000.0 / f64::from(tick_rate.max(1)),
            max_catch_up: max_catch_up.max(1),
            accumulator: 0.0,
            dropped_ms: 0.0,
        }
    }

    /// Duration of one tick in milliseconds.
    #[inline]
    pub fn tick_ms(&self) -> f64 {
        self.tick_ms
    }

    /// Feed a frame delta and get the number of ticks to run now.
    pub fn advance(&mut self, elapsed_ms: f64) -> u32 {
        if !elapsed_ms.is_finite() || elapsed_ms <= 0.0 {
            return 0;
        }
        self.accumulator += elapsed_ms;

        let due = (self.accumulator / self.tick_ms).floor();
        let run = due.min(f64::from(self.max_catch_up));
        if due > run {
            // Keep only the sub-tick remainder
            let remainder = self.accumulator % self.tick_ms;
            self.dropped_ms += self.accumulator - remainder - run * self.tick_ms;
            self.accumulator = remainder;
        } else {
            self.accumulator -= run * self.tick_ms;
        }

        run as u32
    }

    /// Total time discarded because frames fell too far behind.
    pub fn dropped_ms(&self) -> f64 {
        self.dropped_ms
    }

    /// Clear accumulated time.
    pub fn reset(&mut self) {
        self.accumulator = 0.0;
        self.dropped_ms = 0.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_frames_accumulate() {
        let mut clock = FrameClock::new(60, 1);
        assert_eq!(clock.advance(10.0), 0);
        assert_eq!(clock.advance(10.0), 1);
        // 20 - 16.67 = 3.33 carried over
        assert_eq!(clock.advance(10.0), 0);
        assert_eq!(clock.advance(4.0), 1);
    }

    #[test]
    fn test_slow_frame_capped() {
        let mut clock = FrameClock::new(60, 1);
        assert_eq!(clock.advance(1005.0), 1);
        assert!(clock.dropped_ms() > 900.0);
        // Backlog was dropped, not replayed
        assert_eq!(clock.advance(1.0), 0);
    }

    #[test]
    fn test_catch_up_limit() {
        let mut clock = FrameClock::new(60, 4);
        assert_eq!(clock.advance(51.0), 3);
        assert_eq!(clock.advance(200.0), 4);
    }

    #[test]
    fn test_rejects_bad_deltas() {
        let mut clock = FrameClock::new(60, 1);
        assert_eq!(clock.advance(-5.0), 0);
        assert_eq!(clock.advance(f64::NAN), 0);
        assert_eq!(clock.advance(0.0), 0);
    }
}
