//! Retry budget for session start

use bittrex_types::BittrexResult;
use rand::Rng;
use std::future::Future;
use std::time::Duration;
use tracing::warn;

/// How many times to repeat a failed session start, and how long to wait
///
/// Only errors for which [`BittrexError::is_retryable`] holds are repeated.
/// Once a session is streaming nothing is retried.
///
/// [`BittrexError::is_retryable`]: bittrex_types::BittrexError::is_retryable
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Wait before the first retry; doubles on each further retry
    pub initial_delay: Duration,
    /// Upper bound on any single wait
    pub max_delay: Duration,
    /// Fraction of each wait randomized in both directions (0.0 to 1.0)
    pub jitter: f64,
    /// Retries after the first attempt
    pub max_retries: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(10),
            jitter: 0.2,
            max_retries: 3,
        }
    }
}

impl RetryPolicy {
    pub fn new() -> Self {
        Self::default()
    }

    /// A single attempt, no retries
    pub fn disabled() -> Self {
        Self {
            max_retries: 0,
            ..Default::default()
        }
    }

    pub fn with_initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = delay;
        self
    }

    pub fn with_jitter(mut self, jitter: f64) -> Self {
        self.jitter = jitter.clamp(0.0, 1.0);
        self
    }

    pub fn with_max_retries(mut self, max: u32) -> Self {
        self.max_retries = max;
        self
    }

    /// Run `attempt` until it succeeds, fails with a non-retryable error,
    /// or the budget is spent
    ///
    /// The last error is returned as-is.
    pub async fn run<T, F, Fut>(&self, mut attempt: F) -> BittrexResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = BittrexResult<T>>,
    {
        let mut retries = 0;
        loop {
            match attempt().await {
                Ok(value) => return Ok(value),
                Err(e) if e.is_retryable() && retries < self.max_retries => {
                    retries += 1;
                    let delay = self.backoff(retries);
                    warn!(error = %e, retry = retries, ?delay, "Session start failed, retrying");
                    tokio::time::sleep(delay).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Wait before retry number `retry` (1-indexed), jitter included
    fn backoff(&self, retry: u32) -> Duration {
        let factor = 1u32.checked_shl(retry.saturating_sub(1)).unwrap_or(u32::MAX);
        let base = self.initial_delay.saturating_mul(factor).min(self.max_delay);
        if self.jitter == 0.0 {
            return base;
        }
        let spread = rand::thread_rng().gen_range(-self.jitter..=self.jitter);
        base.mul_f64(1.0 + spread)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bittrex_types::BittrexError;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn refused() -> BittrexError {
        BittrexError::ConnectionFailed {
            url: "ws://localhost".into(),
            reason: "refused".into(),
        }
    }

    fn quick(retries: u32) -> RetryPolicy {
        RetryPolicy::new()
            .with_initial_delay(Duration::from_millis(1))
            .with_jitter(0.0)
            .with_max_retries(retries)
    }

    #[test]
    fn test_backoff_doubles_up_to_cap() {
        let policy = RetryPolicy::new()
            .with_initial_delay(Duration::from_millis(100))
            .with_jitter(0.0);

        assert_eq!(policy.backoff(1), Duration::from_millis(100));
        assert_eq!(policy.backoff(2), Duration::from_millis(200));
        assert_eq!(policy.backoff(4), Duration::from_millis(800));
        assert_eq!(policy.backoff(8), Duration::from_secs(10));
        assert_eq!(policy.backoff(200), Duration::from_secs(10));
    }

    #[test]
    fn test_backoff_jitter_bounds() {
        let policy = RetryPolicy::new()
            .with_initial_delay(Duration::from_millis(1000))
            .with_jitter(0.5);
        for _ in 0..100 {
            let delay = policy.backoff(1);
            assert!(delay >= Duration::from_millis(500));
            assert!(delay <= Duration::from_millis(1500));
        }
    }

    #[tokio::test]
    async fn test_run_retries_until_success() {
        let attempts = &AtomicU32::new(0);
        let value = quick(3)
            .run(move || async move {
                if attempts.fetch_add(1, Ordering::SeqCst) < 2 {
                    Err(refused())
                } else {
                    Ok(7)
                }
            })
            .await
            .unwrap();

        assert_eq!(value, 7);
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_run_spends_budget_then_returns_last_error() {
        let attempts = &AtomicU32::new(0);
        let err = quick(2)
            .run(move || async move {
                attempts.fetch_add(1, Ordering::SeqCst);
                Err::<(), _>(refused())
            })
            .await
            .unwrap_err();

        assert!(matches!(err, BittrexError::ConnectionFailed { .. }));
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_run_does_not_repeat_non_retryable() {
        let attempts = &AtomicU32::new(0);
        let err = quick(5)
            .run(move || async move {
                attempts.fetch_add(1, Ordering::SeqCst);
                Err::<(), _>(BittrexError::Configuration("bad hub".into()))
            })
            .await
            .unwrap_err();

        assert!(matches!(err, BittrexError::Configuration(_)));
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_disabled_makes_one_attempt() {
        let attempts = &AtomicU32::new(0);
        let _ = RetryPolicy::disabled()
            .run(move || async move {
                attempts.fetch_add(1, Ordering::SeqCst);
                Err::<(), _>(refused())
            })
            .await;

        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }
}
