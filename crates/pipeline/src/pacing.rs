//! Fixed delay between consecutive external calls in a batch.

use std::time::Duration;

/// Default delay between batched requests.
pub const DEFAULT_PACING: Duration = Duration::from_millis(500);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pacing {
    delay: Duration,
}

impl Pacing {
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }

    /// No delay at all.
    pub fn none() -> Self {
        Self::new(Duration::ZERO)
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Sleep for the configured delay.
    pub async fn wait(&self) {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
    }
}

impl Default for Pacing {
    fn default() -> Self {
        Self::new(DEFAULT_PACING)
    }
}
