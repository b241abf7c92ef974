//! Retry with exponential backoff, plus the time primitives it depends on
//!
//! Sleeping and "now" are injected so tests run without real delays.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Classifies an error as transient
pub(crate) trait Retryable {
    fn is_retryable(&self) -> bool;
}

#[async_trait]
pub(crate) trait Sleeper: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

pub(crate) trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Bounded retry: `max_attempts` tries, waiting `base_delay * 2^(n-1)` after
/// the n-th failed one.
#[derive(Clone)]
pub(crate) struct RetryPolicy {
    pub(crate) max_attempts: u32,
    pub(crate) base_delay: Duration,
    pub(crate) sleeper: Arc<dyn Sleeper>,
}

impl RetryPolicy {
    pub(crate) fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts,
            base_delay,
            sleeper: Arc::new(TokioSleeper),
        }
    }

    pub(crate) fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    pub(crate) fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(16);
        self.base_delay.saturating_mul(1 << exponent)
    }

    /// Run `operation` until it succeeds, fails with a non-retryable error,
    /// or every attempt has been used. Returns the last error on failure.
    pub(crate) async fn run<T, E, F, Fut>(&self, mut operation: F) -> Result<T, E>
    where
        E: Retryable + std::fmt::Display,
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let max_attempts = self.max_attempts.max(1);
        let mut attempt = 1;
        loop {
            match operation(attempt).await {
                Ok(value) => {
                    if attempt > 1 {
                        info!(attempts = attempt, "Operation succeeded after retry");
                    }
                    return Ok(value);
                }
                Err(err) if !err.is_retryable() => {
                    debug!(attempt, error = %err, "Non-retryable failure");
                    return Err(err);
                }
                Err(err) if attempt >= max_attempts => {
                    warn!(attempts = attempt, error = %err, "Operation failed after all retries");
                    return Err(err);
                }
                Err(err) => {
                    let delay = self.delay_for_attempt(attempt);
                    debug!(
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "Operation failed, retrying with backoff"
                    );
                    self.sleeper.sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }
}


#[cfg(test)]
mod tests {
    use super::testing::RecordingSleeper;
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[derive(Debug)]
    struct TestError(bool);

    impl std::fmt::Display for TestError {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(f, "retryable={}", self.0)
        }
    }

    impl Retryable for TestError {
        fn is_retryable(&self) -> bool {
            self.0
        }
    }

    fn policy(attempts: u32, sleeper: Arc<RecordingSleeper>) -> RetryPolicy {
        RetryPolicy::new(attempts, Duration::from_millis(100)).with_sleeper(sleeper)
    }

    #[test]
    fn backoff_doubles() {
        let p = RetryPolicy::new(5, Duration::from_millis(250));
        assert_eq!(p.delay_for_attempt(1), Duration::from_millis(250));
        assert_eq!(p.delay_for_attempt(2), Duration::from_millis(500));
        assert_eq!(p.delay_for_attempt(3), Duration::from_millis(1000));
    }

    #[tokio::test]
    async fn retries_transient_errors_then_succeeds() {
        let sleeper = Arc::new(RecordingSleeper::default());
        let calls = AtomicU32::new(0);
        let result: Result<u32, TestError> = policy(3, sleeper.clone())
            .run(|attempt| {
                calls.fetch_add(1, Ordering::SeqCst);
                async move { if attempt < 3 { Err(TestError(true)) } else { Ok(attempt) } }
            })
            .await;
        assert_eq!(result.unwrap(), 3);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(
            *sleeper.delays.lock().unwrap(),
            vec![Duration::from_millis(100), Duration::from_millis(200)]
        );
    }

    #[tokio::test]
    async fn stops_on_non_retryable_error() {
        let sleeper = Arc::new(RecordingSleeper::default());
        let calls = AtomicU32::new(0);
        let result: Result<(), TestError> = policy(5, sleeper.clone())
            .run(|_| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(TestError(false)) }
            })
            .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(sleeper.delays.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn gives_up_after_max_attempts() {
        let sleeper = Arc::new(RecordingSleeper::default());
        let calls = AtomicU32::new(0);
        let result: Result<(), TestError> = policy(2, sleeper.clone())
            .run(|_| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(TestError(true)) }
            })
            .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(sleeper.delays.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn zero_attempts_still_tries_once() {
        let sleeper = Arc::new(RecordingSleeper::default());
        let result: Result<u8, TestError> = policy(0, sleeper).run(|_| async { Ok(7) }).await;
        assert_eq!(result.unwrap(), 7);
    }
}
