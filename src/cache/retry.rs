//! Retry policy for upstream fetches
//!
//! Wraps a fallible async operation with bounded attempts, exponential
//! backoff between failures, and a per-attempt timeout so a hung request
//! cannot stall a refresh indefinitely.

use std::future::Future;
use std::time::Duration;

use thiserror::Error;

/// How fetch attempts are retried and bounded.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total number of attempts before giving up (the first try included).
    /// A value of 0 is treated as 1; at least one attempt is always made.
    pub max_attempts: u32,
    /// Delay before the second attempt; doubles after every further failure.
    pub initial_backoff: Duration,
    /// Upper bound on a single attempt. A timed-out attempt counts as a
    /// failed attempt for backoff purposes.
    pub fetch_timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff: Duration::from_millis(300),
            fetch_timeout: Duration::from_secs(10),
        }
    }
}

/// Failure of a single fetch attempt.
#[derive(Debug, Error)]
pub enum FetchError<E> {
    /// The upstream operation itself returned an error
    #[error("upstream fetch failed: {0}")]
    Upstream(E),
    /// The attempt exceeded the configured per-attempt timeout
    #[error("fetch attempt timed out after {0:?}")]
    TimedOut(Duration),
}

impl RetryPolicy {
    /// Runs `fetch` until it succeeds or `max_attempts` attempts have failed.
    ///
    /// Sleeps `initial_backoff * 2^(n-1)` after the n-th failed attempt, so
    /// with the defaults a fully failing fetch waits 300ms then 600ms before
    /// surfacing the final error.
    ///
    /// # Returns
    /// * `Ok(value)` from the first successful attempt
    /// * `Err(FetchError)` describing the last failed attempt
    pub async fn run<T, E, F, Fut>(&self, fetch: F) -> Result<T, FetchError<E>>
    where
        E: std::fmt::Display,
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let mut backoff = self.initial_backoff;
        let mut attempt: u32 = 1;

        loop {
            let failure = match tokio::time::timeout(self.fetch_timeout, fetch()).await {
                Ok(Ok(value)) => return Ok(value),
                Ok(Err(err)) => FetchError::Upstream(err),
                Err(_) => FetchError::TimedOut(self.fetch_timeout),
            };

            if attempt >= self.max_attempts {
                return Err(failure);
            }

            tracing::debug!(
                attempt,
                backoff_ms = backoff.as_millis() as u64,
                error = %failure,
                "fetch attempt failed, backing off"
            );
            tokio::time::sleep(backoff).await;
            backoff *= 2;
            attempt += 1;
        }
    }

    /// Effective number of attempts this policy makes.
    pub fn attempts(&self) -> u32 {
        self.max_attempts.max(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;
    use thiserror::Error;
    use tokio::time::Instant;

    #[derive(Debug, Error)]
    #[error("boom")]
    struct TestError;

    #[test]
    fn test_retry_policy_default() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_attempts, 3);
        assert_eq!(policy.initial_backoff, Duration::from_millis(300));
        assert_eq!(policy.fetch_timeout, Duration::from_secs(10));
    }

    #[tokio::test(start_paused = true)]
    async fn test_success_on_first_attempt_takes_no_time() {
        let policy = RetryPolicy::default();
        let start = Instant::now();

        let result: Result<u32, _> = policy.run(|| async { Ok::<_, TestError>(7) }).await;

        assert_eq!(result.expect("first attempt should succeed"), 7);
        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failure_then_success_waits_initial_backoff() {
        let policy = RetryPolicy::default();
        let calls = Arc::new(AtomicU32::new(0));
        let calls_clone = Arc::clone(&calls);
        let start = Instant::now();

        let result = policy
            .run(move || {
                let calls = Arc::clone(&calls_clone);
                async move {
                    if calls.fetch_add(1, Ordering::SeqCst) == 0 {
                        Err(TestError)
                    } else {
                        Ok(42u32)
                    }
                }
            })
            .await;

        assert_eq!(result.expect("second attempt should succeed"), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(start.elapsed(), Duration::from_millis(300));
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhaustion_surfaces_last_error_after_doubling_backoff() {
        let policy = RetryPolicy {
            max_attempts: 4,
            ..Default::default()
        };
        let calls = Arc::new(AtomicU32::new(0));
        let calls_clone = Arc::clone(&calls);
        let start = Instant::now();

        let result: Result<u32, _> = policy
            .run(move || {
                let calls = Arc::clone(&calls_clone);
                async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Err::<u32, _>(TestError)
                }
            })
            .await;

        assert!(matches!(result, Err(FetchError::Upstream(TestError))));
        assert_eq!(calls.load(Ordering::SeqCst), 4);
        // 300 + 600 + 1200 between the four attempts
        assert_eq!(start.elapsed(), Duration::from_millis(2100));
    }

    #[tokio::test(start_paused = true)]
    async fn test_timed_out_attempt_counts_as_failure() {
        let policy = RetryPolicy {
            max_attempts: 1,
            fetch_timeout: Duration::from_secs(10),
            ..Default::default()
        };
        let start = Instant::now();

        let result: Result<u32, FetchError<TestError>> = policy
            .run(|| async {
                tokio::time::sleep(Duration::from_secs(60)).await;
                Ok(1)
            })
            .await;

        assert!(matches!(result, Err(FetchError::TimedOut(_))));
        assert_eq!(start.elapsed(), Duration::from_secs(10));
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_max_attempts_still_tries_once() {
        let policy = RetryPolicy {
            max_attempts: 0,
            ..Default::default()
        };
        let calls = Arc::new(AtomicU32::new(0));
        let calls_clone = Arc::clone(&calls);

        let result: Result<u32, _> = policy
            .run(move || {
                let calls = Arc::clone(&calls_clone);
                async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Err::<u32, _>(TestError)
                }
            })
            .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(policy.attempts(), 1);
    }
}
