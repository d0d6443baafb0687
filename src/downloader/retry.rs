//! Retry decisions and backoff delays.

use crate::error::TransportError;

use std::time::Duration;

/// Exponential backoff without jitter.
///
/// The delay before attempt `n + 1` is `base * factor^(n - 1)`, capped at
/// `max`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    /// Total number of attempts, the first one included.
    pub max_attempts: u32,
    pub base: Duration,
    pub factor: f64,
    pub max: Duration,
}

impl RetryPolicy {
    /// Delay to wait after failed attempt number `attempt` (1-based).
    pub fn delay(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(i32::MAX as u32) as i32;
        let secs = self.base.as_secs_f64() * self.factor.powi(exponent);
        Duration::try_from_secs_f64(secs)
            .unwrap_or(self.max)
            .min(self.max)
    }

    /// Whether a failure on attempt number `attempt` warrants another one.
    pub fn should_retry(&self, attempt: u32, error: &TransportError) -> bool {
        error.is_transient() && attempt < self.max_attempts
    }
}
