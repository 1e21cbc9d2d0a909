//! Wall-clock timing for stages and runs.

use std::time::Instant;
use tracing::debug;

/// Simple span timing helper.
#[derive(Debug)]
pub struct SpanTimer {
    start: Instant,
    name: String,
}

impl SpanTimer {
    /// Starts a new span timer.
    #[must_use]
    pub fn start(name: impl Into<String>) -> Self {
        Self {
            start: Instant::now(),
            name: name.into(),
        }
    }

    /// Finishes the span and returns the duration in seconds.
    #[must_use]
    pub fn finish(self) -> f64 {
        let seconds = self.start.elapsed().as_secs_f64();
        debug!(span = %self.name, duration_ms = seconds * 1000.0, "Span finished");
        seconds
    }
}
