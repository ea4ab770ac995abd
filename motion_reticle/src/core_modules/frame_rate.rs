use std::time::{Duration, Instant};

/// Cycles-per-second diagnostic, refreshed once every `window` cycles.
///
/// The figure is measured over the real elapsed time of the window on a monotonic
/// clock. It is informational only; the loop is paced by the input poll.
#[derive(Debug, Clone)]
pub struct FrameRateMeter {
    window: u32,
    count: u32,
    window_start: Instant,
    last_rate: Option<f64>,
}

impl FrameRateMeter {
    pub fn new(window: u32) -> Self {
        Self::starting_at(window, Instant::now())
    }

    pub fn starting_at(window: u32, start: Instant) -> Self {
        Self {
            window: window.max(1),
            count: 0,
            window_start: start,
            last_rate: None,
        }
    }

    /// Counts one cycle. Returns the fresh rate when this cycle closes a window.
    pub fn tick(&mut self) -> Option<f64> {
        self.tick_at(Instant::now())
    }

    pub fn tick_at(&mut self, now: Instant) -> Option<f64> {
        self.count += 1;
        if self.count < self.window {
            return None;
        }

        let elapsed = now.saturating_duration_since(self.window_start);
        let rate = rate_for(self.count, elapsed);
        self.count = 0;
        self.window_start = now;
        self.last_rate = Some(rate);
        Some(rate)
    }

    /// The most recent complete measurement.
    pub fn rate(&self) -> Option<f64> {
        self.last_rate
    }
}

fn rate_for(cycles: u32, elapsed: Duration) -> f64 {
    let seconds = elapsed.as_secs_f64();
    if seconds <= f64::EPSILON {
        return 0.0;
    }
    cycles as f64 / seconds
}
