//! Reusable retry policy with exponential backoff.
//!
//! Every call site that retries a logical operation goes through one
//! [`RetryPolicy`] value applied exactly once per operation — retry
//! decoration is never stacked. The policy is parameterized by attempt
//! cap, backoff base and a retryable-error predicate supplied by the
//! caller.

use crate::error::{Result, SearchError};
use std::future::Future;
use std::time::Duration;
use tracing::warn;

/// Retry policy: attempt cap plus exponential backoff curve.
///
/// Delay before attempt `n + 1` is `base_delay * 2^(n - 1)`, so a 500 ms
/// base yields 500 ms, 1 s, 2 s, ...
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    max_attempts: u32,
    base_delay: Duration,
}

impl RetryPolicy {
    /// Create a policy with the given attempt cap and backoff base.
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts,
            base_delay,
        }
    }

    /// The configured attempt cap.
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Run `operation` until it succeeds, a non-retryable error occurs, or
    /// the attempt cap is reached. Returns the last error on exhaustion.
    ///
    /// `retryable` decides whether an error is worth another attempt;
    /// non-retryable errors are returned immediately without backoff.
    pub async fn run<T, F, Fut, P>(&self, mut operation: F, retryable: P) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
        P: Fn(&SearchError) -> bool,
    {
        let mut last_error: Option<SearchError> = None;

        for attempt in 1..=self.max_attempts.max(1) {
            match operation().await {
                Ok(value) => return Ok(value),
                Err(err) if !retryable(&err) => return Err(err),
                Err(err) => {
                    warn!(
                        attempt,
                        max = self.max_attempts,
                        error = %err,
                        "retryable operation failed"
                    );
                    last_error = Some(err);
                    if attempt < self.max_attempts {
                        let backoff = self.base_delay * 2u32.saturating_pow(attempt - 1);
                        tokio::time::sleep(backoff).await;
                    }
                }
            }
        }

        Err(last_error
            .unwrap_or_else(|| SearchError::Config("retry policy with zero attempts".into())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn fast_policy(max_attempts: u32) -> RetryPolicy {
        RetryPolicy::new(max_attempts, Duration::from_millis(1))
    }

    #[tokio::test]
    async fn first_success_needs_no_retry() {
        let calls = AtomicU32::new(0);
        let policy = fast_policy(3);
        let result = policy
            .run(
                || {
                    calls.fetch_add(1, Ordering::SeqCst);
                    async { Ok(42u32) }
                },
                SearchError::is_transient,
            )
            .await;
        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn transient_failures_retry_until_success() {
        let calls = AtomicU32::new(0);
        let policy = fast_policy(3);
        let result = policy
            .run(
                || {
                    let n = calls.fetch_add(1, Ordering::SeqCst);
                    async move {
                        if n < 2 {
                            Err(SearchError::Http("connection refused".into()))
                        } else {
                            Ok("issued")
                        }
                    }
                },
                SearchError::is_transient,
            )
            .await;
        assert_eq!(result.unwrap(), "issued");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn exhaustion_returns_last_error() {
        let calls = AtomicU32::new(0);
        let policy = fast_policy(3);
        let result: Result<()> = policy
            .run(
                || {
                    calls.fetch_add(1, Ordering::SeqCst);
                    async { Err(SearchError::Http("503 from issuer".into())) }
                },
                SearchError::is_transient,
            )
            .await;
        let err = result.unwrap_err();
        assert!(err.to_string().contains("503 from issuer"));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn non_retryable_error_returns_immediately() {
        let calls = AtomicU32::new(0);
        let policy = fast_policy(5);
        let result: Result<()> = policy
            .run(
                || {
                    calls.fetch_add(1, Ordering::SeqCst);
                    async { Err(SearchError::Config("bad endpoint".into())) }
                },
                SearchError::is_transient,
            )
            .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn zero_attempt_policy_still_runs_once() {
        let calls = AtomicU32::new(0);
        let policy = fast_policy(0);
        let result = policy
            .run(
                || {
                    calls.fetch_add(1, Ordering::SeqCst);
                    async { Ok(1u8) }
                },
                SearchError::is_transient,
            )
            .await;
        assert_eq!(result.unwrap(), 1);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
