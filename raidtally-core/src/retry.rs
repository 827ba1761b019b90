//! Retry policy with capped exponential backoff.
//!
//! The policy is a plain value rather than an attribute on the fetch path,
//! so the schedule and the retryable-error predicate can be tested without
//! touching the network.

use std::future::Future;
use std::time::Duration;

use tracing::debug;

use crate::error::Result;

/// Retry policy for transient fetch failures.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Total number of attempts, including the first one.
    pub max_attempts: u32,
    /// Backoff floor and multiplier base.
    pub base_delay: Duration,
    /// Backoff ceiling.
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(8),
        }
    }
}

impl RetryPolicy {
    /// Delay slept before attempt `attempt` (attempts are 1-based; the
    /// first attempt runs immediately). The schedule doubles from
    /// `base_delay` and is clamped to `[base_delay, max_delay]`.
    pub fn delay_before(&self, attempt: u32) -> Duration {
        if attempt <= 1 {
            return Duration::ZERO;
        }
        let doublings = 1u32.checked_shl(attempt - 1).unwrap_or(u32::MAX);
        self.base_delay
            .saturating_mul(doublings)
            .clamp(self.base_delay, self.max_delay)
    }
}

/// Drive `operation` under `policy`: re-run it while it fails with a
/// transient error and attempts remain, sleeping the scheduled backoff
/// between attempts. The final error after exhaustion (or any fatal
/// error) is returned unchanged.
pub async fn retry<T, F, Fut>(policy: RetryPolicy, mut operation: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut attempt = 1;
    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(err) if err.is_transient() && attempt < policy.max_attempts => {
                let delay = policy.delay_before(attempt + 1);
                debug!(
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    error = %err,
                    "transient fetch failure, retrying"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(err) => return Err(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};

    use super::*;
    use crate::error::Error;

    fn transient() -> Error {
        Error::Transport {
            status: 503,
            body: "unavailable".to_string(),
        }
    }

    #[test]
    fn backoff_doubles_and_caps() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.delay_before(1), Duration::ZERO);
        assert_eq!(policy.delay_before(2), Duration::from_secs(1));
        assert_eq!(policy.delay_before(3), Duration::from_secs(2));
        assert_eq!(policy.delay_before(4), Duration::from_secs(4));
        assert_eq!(policy.delay_before(5), Duration::from_secs(8));
        // Stays at the ceiling past the default attempt count.
        assert_eq!(policy.delay_before(12), Duration::from_secs(8));
    }

    #[test]
    fn backoff_never_drops_below_base() {
        let policy = RetryPolicy {
            max_attempts: 3,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(8),
        };
        assert!(policy.delay_before(2) >= policy.base_delay);
    }

    #[tokio::test(start_paused = true)]
    async fn succeeds_after_transient_failures() {
        let attempts = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&attempts);

        let result = retry(RetryPolicy::default(), move || {
            let counter = Arc::clone(&counter);
            async move {
                if counter.fetch_add(1, Ordering::SeqCst) < 4 {
                    Err(transient())
                } else {
                    Ok(42)
                }
            }
        })
        .await;

        assert_eq!(result.unwrap(), 42);
        assert_eq!(attempts.load(Ordering::SeqCst), 5);
    }

    #[tokio::test(start_paused = true)]
    async fn exhaustion_returns_final_error() {
        let attempts = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&attempts);

        let result: Result<()> = retry(RetryPolicy::default(), move || {
            let counter = Arc::clone(&counter);
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err(Error::Transport {
                    status: 500,
                    body: "boom".to_string(),
                })
            }
        })
        .await;

        assert_eq!(attempts.load(Ordering::SeqCst), 5);
        match result.unwrap_err() {
            Error::Transport { status, body } => {
                assert_eq!(status, 500);
                assert_eq!(body, "boom");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn fatal_errors_are_not_retried() {
        let attempts = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&attempts);

        let result: Result<()> = retry(RetryPolicy::default(), move || {
            let counter = Arc::clone(&counter);
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err(Error::Malformed("missing Response".to_string()))
            }
        })
        .await;

        assert!(result.is_err());
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }
}
