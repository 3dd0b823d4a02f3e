//! Bounded retry with exponential backoff for remote calls.
//!
//! Every remote operation the engine issues goes through a [`RetryPolicy`]:
//! the call is attempted once and retried up to [`RetryPolicy::max_retries`]
//! further times, sleeping `base_delay * 2^attempt` between attempts. There
//! is no jitter; the default budget (two retries, one second base) keeps the
//! worst case short.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use tracing::warn;

/// Backoff schedule for retried remote operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the initial attempt
    pub max_retries: u32,
    /// Delay before the first retry; doubles on each further retry
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 2,
            base_delay: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    /// A policy that never retries.
    #[must_use]
    pub const fn none() -> Self {
        Self {
            max_retries: 0,
            base_delay: Duration::ZERO,
        }
    }

    /// Delay before the given zero-based retry attempt.
    #[must_use]
    pub const fn delay_for(self, attempt: u32) -> Duration {
        self.base_delay.saturating_mul(2_u32.saturating_pow(attempt))
    }

    /// Run `operation`, retrying failures according to this policy.
    ///
    /// Returns the first success, or the last error once the retry budget is
    /// exhausted. Every failure that will be retried logs a warning with the
    /// attempt number and the upcoming delay.
    pub async fn run<T, E, F, Fut>(self, op_name: &str, mut operation: F) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Display,
    {
        let mut attempt = 0;
        loop {
            match operation().await {
                Ok(value) => return Ok(value),
                Err(err) if attempt < self.max_retries => {
                    let delay = self.delay_for(attempt);
                    warn!(
                        operation = op_name,
                        attempt = attempt + 1,
                        delay = ?delay,
                        error = %err,
                        "remote operation failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }
}
