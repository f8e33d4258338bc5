//! Retry policies for transient store failures.
//!
//! Policies are pure: they decide whether and when to retry, the caller does
//! the waiting.

use std::time::Duration;

use crate::error::StoreError;

/// Decides whether a failed attempt is retried.
pub trait RetryPolicy: Send + Sync {
    /// `attempt` is the 1-based number of the attempt that just failed.
    /// Returns the delay before the next attempt, or `None` to give up.
    fn next_delay(&self, attempt: u32, error: &StoreError) -> Option<Duration>;
}

/// Never retries.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoRetry;

impl RetryPolicy for NoRetry {
    fn next_delay(&self, _attempt: u32, _error: &StoreError) -> Option<Duration> {
        None
    }
}

/// Doubles the delay after every transient failure, up to `max_delay`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExponentialRetry {
    /// Total attempts including the first one.
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for ExponentialRetry {
    fn default() -> Self {
        Self {
            max_attempts: 4,
            base_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(5),
        }
    }
}

impl ExponentialRetry {
    pub fn new(max_attempts: u32, base_delay: Duration, max_delay: Duration) -> Self {
        Self {
            max_attempts,
            base_delay,
            max_delay,
        }
    }

    /// Delay after the given failed attempt, ignoring the attempt limit.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(31);
        self.base_delay
            .saturating_mul(1u32 << exponent)
            .min(self.max_delay)
    }
}

impl RetryPolicy for ExponentialRetry {
    fn next_delay(&self, attempt: u32, error: &StoreError) -> Option<Duration> {
        if !error.is_transient() || attempt >= self.max_attempts {
            return None;
        }
        Some(self.delay_for(attempt))
    }
}
