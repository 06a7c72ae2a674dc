use std::future::Future;
use std::sync::atomic::Ordering;
use std::time::Duration;

use tokio::time::sleep;

use crate::errors::FetchError;
use crate::metrics::METRICS;

/// Exponential backoff policy for one logical fetch.
///
/// With the defaults the fetcher makes up to 4 attempts and waits
/// 2s, 4s and 8s between them (`2^retry` seconds).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt
    pub max_retries: u32,

    /// Delay before the first retry; doubled for every further retry
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_secs(2),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_retries: u32) -> Self {
        Self {
            max_retries,
            ..Self::default()
        }
    }

    pub fn with_base_delay(mut self, base_delay: Duration) -> Self {
        self.base_delay = base_delay;
        self
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }

    /// Delay to wait before retry number `retry` (1-based).
    pub fn delay_for(&self, retry: u32) -> Duration {
        let factor = 2u32.saturating_pow(retry.saturating_sub(1));
        self.base_delay.saturating_mul(factor)
    }
}

/// Runs `operation` until it succeeds, fails permanently, or the
/// retry budget is spent.
///
/// The closure receives the 1-based attempt number.
///
/// CONTRACT:
/// - Only `FetchError::Transient` is retried
/// - Any other error is returned as-is after the attempt that produced it
/// - Exhaustion is reported as `FetchError::Unavailable`
///
/// The backoff sleep is a plain tokio sleep. Callers that need to
/// abandon a fetch mid-backoff can drop the returned future.
pub async fn retry_with_backoff<T, F, Fut>(
    policy: &RetryPolicy,
    mut operation: F,
) -> Result<T, FetchError>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, FetchError>>,
{
    let mut attempt = 0u32;

    loop {
        attempt += 1;
        METRICS.fetch_attempts.fetch_add(1, Ordering::Relaxed);

        match operation(attempt).await {
            Ok(value) => return Ok(value),

            Err(FetchError::Transient(reason)) if attempt <= policy.max_retries => {
                let delay = policy.delay_for(attempt);
                log::warn!(
                    "attempt {}/{} failed ({}), retrying in {:?}",
                    attempt,
                    policy.max_attempts(),
                    reason,
                    delay
                );
                METRICS.fetch_retries.fetch_add(1, Ordering::Relaxed);
                sleep(delay).await;
            }

            Err(FetchError::Transient(reason)) => {
                return Err(FetchError::Unavailable {
                    attempts: attempt,
                    last_error: reason,
                });
            }

            Err(e) => return Err(e),
        }
    }
}
