//! Bounded polling for long-running generation jobs.
//!
//! Video jobs are asynchronous on the service side: the caller submits, then
//! polls an operation until it reports completion. [`poll_until`] keeps
//! polling with a growing delay until the check yields a value, the check
//! fails, or [`PollPolicy::max_wait`] elapses.

use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;

use crate::error::GenerationError;

/// Tunable parameters for job polling.
#[derive(Debug, Clone)]
pub struct PollPolicy {
    /// Delay before the second check.
    pub interval: Duration,
    /// Upper bound on the delay between checks.
    pub max_interval: Duration,
    /// Factor by which the delay grows after each pending check.
    pub multiplier: f64,
    /// Total time budget before giving up with a timeout.
    pub max_wait: Duration,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(5),
            max_interval: Duration::from_secs(30),
            multiplier: 1.5,
            max_wait: Duration::from_secs(600),
        }
    }
}

impl PollPolicy {
    /// Fixed-interval policy with the given budget.
    pub fn fixed(interval: Duration, max_wait: Duration) -> Self {
        Self {
            interval,
            max_interval: interval,
            multiplier: 1.0,
            max_wait,
        }
    }
}

/// Calculate the next delay from the current delay and policy.
///
/// The result is clamped to [`PollPolicy::max_interval`].
pub fn next_interval(current: Duration, policy: &PollPolicy) -> Duration {
    let next_ms = (current.as_millis() as f64 * policy.multiplier) as u64;
    Duration::from_millis(next_ms).min(policy.max_interval)
}

/// Poll `check` until it returns `Ok(Some(_))`.
///
/// `check` receives the 1-based attempt number. `Ok(None)` means "still
/// running"; any `Err` ends polling immediately. When the next wait would
/// exceed the budget the result is [`GenerationError::Timeout`].
pub async fn poll_until<T, F, Fut>(policy: &PollPolicy, mut check: F) -> Result<T, GenerationError>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<Option<T>, GenerationError>>,
{
    let started = Instant::now();
    let mut delay = policy.interval;
    let mut attempt = 0u32;

    loop {
        attempt += 1;
        if let Some(value) = check(attempt).await? {
            return Ok(value);
        }

        let waited = started.elapsed();
        if waited + delay > policy.max_wait {
            tracing::warn!(
                attempt,
                waited_ms = waited.as_millis() as u64,
                "Generation job exceeded its polling budget",
            );
            return Err(GenerationError::Timeout { waited });
        }

        tracing::debug!(attempt, delay_ms = delay.as_millis() as u64, "Job pending");
        tokio::time::sleep(delay).await;
        delay = next_interval(delay, policy);
    }
}
