//! Retry policy for deferred webhook processing.

use std::time::Duration;

/// Bounded-retry policy with a fixed backoff schedule.
///
/// Defaults match the reconciliation SLO: five attempts spread over
/// roughly ten minutes, each capped at two minutes of wall clock.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Maximum number of attempts (including the first).
    pub max_attempts: u32,

    /// Delay before each retry; attempt N waits `backoff[N-1]`.
    /// Attempts beyond the table reuse the last entry.
    pub backoff: Vec<Duration>,

    /// Wall-clock budget per attempt.
    pub attempt_timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            backoff: vec![
                Duration::from_secs(10),
                Duration::from_secs(30),
                Duration::from_secs(60),
                Duration::from_secs(120),
                Duration::from_secs(300),
            ],
            attempt_timeout: Duration::from_secs(120),
        }
    }
}

impl RetryPolicy {
    /// Delay to wait after the given 1-based attempt fails.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let index = (attempt.max(1) as usize - 1).min(self.backoff.len().saturating_sub(1));
        self.backoff.get(index).copied().unwrap_or_default()
    }

    /// Policy with tight timings for tests.
    pub fn immediate(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            backoff: vec![Duration::from_millis(1)],
            attempt_timeout: Duration::from_secs(1),
        }
    }
}
