//! Bounded retry with exponential backoff for provider calls.

use std::time::Duration;

/// Attempt cap and backoff schedule applied to retryable provider failures.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Retries allowed after the initial attempt.
    pub max_retries: u32,
    /// First backoff delay; doubles per retry.
    pub base_backoff_ms: u64,
    /// Ceiling for any single delay.
    pub max_backoff_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self { max_retries: 2, base_backoff_ms: 100, max_backoff_ms: 10_000 }
    }
}

impl RetryPolicy {
    /// Delay to wait before retry number `attempt` (0-based).
    pub fn delay(&self, attempt: u32) -> Duration {
        let ms = self
            .base_backoff_ms
            .saturating_mul(2_u64.saturating_pow(attempt))
            .min(self.max_backoff_ms);
        Duration::from_millis(ms)
    }
}
