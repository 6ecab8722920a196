//! Backoff policy for interrupted chunk uploads.

use std::time::Duration;

/// Retry policy configuration.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of retry attempts per upload.
    pub max_retries: u32,
    /// Base delay for exponential backoff (in milliseconds).
    pub base_delay_ms: u64,
    /// Maximum delay cap (in milliseconds).
    pub max_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay_ms: 1000,
            max_delay_ms: 30_000,
        }
    }
}

impl RetryConfig {
    /// Delay before retry number `attempt` (zero based).
    ///
    /// `base * 2^attempt` capped at the maximum, unless the server asked for
    /// a specific wait.
    pub fn delay_for(&self, attempt: u32, retry_after_ms: Option<u64>) -> Duration {
        if let Some(after) = retry_after_ms {
            return Duration::from_millis(after.min(self.max_delay_ms));
        }

        let exp_delay = self.base_delay_ms.saturating_mul(2u64.saturating_pow(attempt));
        Duration::from_millis(exp_delay.min(self.max_delay_ms))
    }
}
