//! Wall-clock timing for solver steps.

use std::time::Instant;

/// A simple timer that measures elapsed wall time.
#[derive(Debug, Clone, Copy)]
pub struct Timer {
    label: &'static str,
    start: Instant,
}

impl Timer {
    /// Create and start a new timer with the given label.
    pub fn start(label: &'static str) -> Self {
        Self {
            label,
            start: Instant::now(),
        }
    }

    /// Elapsed seconds since `start`.
    pub fn elapsed_s(&self) -> f64 {
        self.start.elapsed().as_secs_f64()
    }

    /// Stop the timer, log it at trace level, and return elapsed seconds.
    pub fn stop(self) -> f64 {
        let elapsed = self.elapsed_s();
        tracing::trace!(label = self.label, elapsed_s = elapsed, "timer stopped");
        elapsed
    }
}
