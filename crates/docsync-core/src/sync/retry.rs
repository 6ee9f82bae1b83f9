//! Fixed-backoff retry for store calls
//!
//! Only errors that report themselves as retryable are tried again; anything
//! else returns immediately.

use std::future::Future;
use std::time::Duration;

use tokio::time::sleep;

use crate::store::StoreError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryConfig {
    /// Total attempts, first try included
    pub max_attempts: u32,
    /// Delay before each retry
    pub backoff: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff: Duration::from_millis(500),
        }
    }
}

pub trait IsRetryable {
    fn is_retryable(&self) -> bool;
}

impl IsRetryable for StoreError {
    /// Conflicts come from concurrent mutation and clear up on their own
    fn is_retryable(&self) -> bool {
        self.is_conflict()
    }
}

/// Run `operation` until it succeeds, fails with a non-retryable error or
/// runs out of attempts
///
/// `on_retry` is called with the 1-based attempt that failed and its error,
/// before sleeping.
pub async fn with_retry<T, E, F, Fut, R>(
    config: RetryConfig,
    mut operation: F,
    mut on_retry: R,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: IsRetryable,
    R: FnMut(u32, &E),
{
    let max_attempts = config.max_attempts.max(1);
    let mut attempt = 1;

    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(err) if err.is_retryable() && attempt < max_attempts => {
                on_retry(attempt, &err);
                sleep(config.backoff).await;
                attempt += 1;
            }
            Err(err) => return Err(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use tokio::time::Instant;

    fn conflict() -> StoreError {
        StoreError::Conflict {
            block_id: "b".into(),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_retries_conflicts_with_fixed_backoff() {
        let calls = AtomicU32::new(0);
        let counter = &calls;
        let mut retried = Vec::new();
        let start = Instant::now();

        let result = with_retry(
            RetryConfig::default(),
            move || async move {
                if counter.fetch_add(1, Ordering::SeqCst) < 2 {
                    Err(conflict())
                } else {
                    Ok("done")
                }
            },
            |attempt, _| retried.push(attempt),
        )
        .await;

        assert_eq!(result, Ok("done"));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(retried, vec![1, 2]);
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_millis(1000), "{:?}", elapsed);
        assert!(elapsed < Duration::from_millis(1100), "{:?}", elapsed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_gives_up_after_max_attempts() {
        let calls = AtomicU32::new(0);
        let counter = &calls;
        let result: Result<(), _> = with_retry(
            RetryConfig::default(),
            move || async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err(conflict())
            },
            |_, _| {},
        )
        .await;

        assert!(result.unwrap_err().is_conflict());
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_other_errors_are_not_retried() {
        let calls = AtomicU32::new(0);
        let counter = &calls;
        let start = Instant::now();
        let result: Result<(), _> = with_retry(
            RetryConfig::default(),
            move || async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err(StoreError::RateLimited)
            },
            |_, _| {},
        )
        .await;

        assert_eq!(result, Err(StoreError::RateLimited));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(start.elapsed() < Duration::from_millis(1));
    }
}
