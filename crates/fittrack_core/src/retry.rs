use rand::{RngExt, rng};
use std::time::Duration;

use crate::TrackerError;

/// Exponential backoff with full jitter, for flaky upstream calls.
#[derive(Clone, Debug)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 2,
            base_delay: Duration::from_millis(200),
        }
    }
}

impl RetryPolicy {
    /// No retries; the first failure is returned as-is.
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            base_delay: Duration::ZERO,
        }
    }

    /// Retry `f` while `should_retry` accepts the error.
    pub async fn retry_async_if<F, Fut, T, E, P>(&self, mut f: F, should_retry: P) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: std::future::Future<Output = Result<T, E>>,
        P: Fn(&E) -> bool,
    {
        let mut attempt = 0u32;
        loop {
            match f().await {
                Ok(v) => return Ok(v),
                Err(e) => {
                    attempt += 1;
                    if attempt > self.max_retries || !should_retry(&e) {
                        return Err(e);
                    }
                    let delay = self.backoff(attempt);
                    tracing::debug!(attempt, delay_ms = delay.as_millis() as u64, "retrying");
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }

    /// Retry only errors that [`TrackerError::is_transient`] reports.
    pub async fn retry_transient<F, Fut, T>(&self, f: F) -> Result<T, TrackerError>
    where
        F: FnMut() -> Fut,
        Fut: std::future::Future<Output = Result<T, TrackerError>>,
    {
        self.retry_async_if(f, TrackerError::is_transient).await
    }

    fn backoff(&self, attempt: u32) -> Duration {
        let max_ms = (self.base_delay * (1u32 << attempt.min(16))).as_millis() as u64;
        if max_ms == 0 {
            return Duration::ZERO;
        }
        let mut rng = rng();
        Duration::from_millis(rng.random_range(0..max_ms))
    }
}
