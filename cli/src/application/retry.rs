//! Retry with exponential backoff for any fallible async operation.

use std::future::Future;
use std::time::Duration;

use anyhow::Result;

use crate::domain::NetworkError;

/// How often and how patiently to retry an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first. Always at least 1.
    pub max_attempts: u32,
    /// Delay after the first failure; doubles after each further failure.
    pub base_delay: Duration,
    /// Upper bound on any single delay.
    pub max_delay: Duration,
}

impl RetryPolicy {
    pub const DEFAULT_BASE_DELAY: Duration = Duration::from_secs(2);
    pub const DEFAULT_MAX_DELAY: Duration = Duration::from_secs(10);

    /// Exponential backoff (2s, 4s, 8s, capped at 10s) over `max_attempts` attempts.
    #[must_use]
    pub fn exponential(max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay: Self::DEFAULT_BASE_DELAY,
            max_delay: Self::DEFAULT_MAX_DELAY,
        }
    }

    /// Same attempt budget, no waiting between attempts.
    #[must_use]
    pub fn without_delay(self) -> Self {
        Self {
            base_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
            ..self
        }
    }

    /// Delay to wait after failed attempt number `attempt` (1-based).
    #[must_use]
    pub fn delay_after(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        self.base_delay.saturating_mul(factor).min(self.max_delay)
    }

    /// Run `op` until it succeeds, fails with a non-retryable error, or the
    /// attempt budget is spent. `op` receives the 1-based attempt number.
    ///
    /// # Errors
    ///
    /// Returns the first non-retryable error, or the last error once
    /// `max_attempts` is exhausted.
    pub async fn run<T, F, Fut, P>(&self, mut op: F, is_retryable: P) -> Result<T>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T>>,
        P: Fn(&anyhow::Error) -> bool,
    {
        let mut attempt = 1;
        loop {
            match op(attempt).await {
                Ok(value) => return Ok(value),
                Err(err) if attempt < self.max_attempts && is_retryable(&err) => {
                    let delay = self.delay_after(attempt);
                    let reason = format!("{err:#}");
                    tracing::warn!(
                        attempt,
                        max_attempts = self.max_attempts,
                        delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                        error = %reason,
                        "retrying after failure"
                    );
                    if !delay.is_zero() {
                        tokio::time::sleep(delay).await;
                    }
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::exponential(3)
    }
}

/// Retry predicate: only network failures are worth another attempt.
#[must_use]
pub fn is_network_error(err: &anyhow::Error) -> bool {
    err.chain().any(|cause| cause.is::<NetworkError>())
}
