use std::borrow::Cow;
use std::time::{Duration, Instant};

use crate::helpers::tracing::format_duration;
use crate::prelude::*;

/// Stopwatch to log a code block execution time.
pub struct Stopwatch {
    /// Logged message.
    message: Cow<'static, str>,

    start: Instant,

    /// Optional execution time threshold.
    /// If exceeded, raises the logging level to warning.
    threshold: Option<Duration>,
}

impl Stopwatch {
    pub fn new<M: Into<Cow<'static, str>>>(message: M) -> Self {
        Self {
            message: message.into(),
            start: Instant::now(),
            threshold: None,
        }
    }

    #[must_use]
    pub fn threshold(mut self, threshold: Duration) -> Self {
        self.threshold = Some(threshold);
        self
    }

    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }
}

impl Drop for Stopwatch {
    fn drop(&mut self) {
        let elapsed = self.start.elapsed();
        match self.threshold {
            Some(threshold) if elapsed >= threshold => {
                warn!(elapsed = %format_duration(elapsed), "{}", self.message);
            }
            _ => {
                debug!(elapsed = %format_duration(elapsed), "{}", self.message);
            }
        }
    }
}
