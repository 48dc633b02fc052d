//! Bounded retry with exponential backoff
//!
//! Every backend failure is retried until the attempt budget runs out; the
//! last error is then handed back exactly as the operation produced it.

use crate::config::RetrySettings;
use crate::error::Result;
use rand::Rng;
use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{info, warn};

/// Retry policy applied to a single step invocation
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempts, including the first one
    pub attempts: u32,
    pub initial_delay: Duration,
    pub max_delay: Duration,
    pub jitter: bool,
    pub jitter_factor: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_settings(&RetrySettings::default())
    }
}

impl RetryPolicy {
    pub fn from_settings(settings: &RetrySettings) -> Self {
        Self {
            attempts: settings.attempts.max(1),
            initial_delay: settings.initial_delay,
            max_delay: settings.max_delay,
            jitter: settings.jitter,
            jitter_factor: settings.jitter_factor,
        }
    }

    /// Run `operation` until it succeeds or the attempt budget is spent.
    ///
    /// `payload_size` is only reported in the success log line.
    pub async fn execute<F, Fut, T>(
        &self,
        context: &str,
        payload_size: usize,
        mut operation: F,
    ) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut attempt = 0;

        loop {
            attempt += 1;
            let started = Instant::now();

            match operation().await {
                Ok(result) => {
                    info!(
                        step = context,
                        attempt,
                        elapsed_ms = started.elapsed().as_millis() as u64,
                        payload_bytes = payload_size,
                        "{} completed in {:.2}s",
                        context,
                        started.elapsed().as_secs_f64()
                    );
                    return Ok(result);
                }
                Err(err) => {
                    if attempt >= self.attempts {
                        warn!(
                            step = context,
                            attempts = attempt,
                            error = %err,
                            "Giving up on {}",
                            context
                        );
                        return Err(err);
                    }

                    let delay = self.apply_jitter(self.calculate_delay(attempt));
                    warn!(
                        step = context,
                        error = %err,
                        "Retrying {} (attempt {}/{}) after {:?}",
                        context,
                        attempt,
                        self.attempts,
                        delay
                    );
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }

    /// Delay after the given failed attempt (1-based): 2s, 4s, 8s, capped
    pub fn calculate_delay(&self, attempt: u32) -> Duration {
        2u32.checked_pow(attempt.saturating_sub(1))
            .and_then(|factor| self.initial_delay.checked_mul(factor))
            .map_or(self.max_delay, |delay| delay.min(self.max_delay))
    }

    fn apply_jitter(&self, delay: Duration) -> Duration {
        if !self.jitter {
            return delay;
        }

        let mut rng = rand::rng();
        let jitter_range = delay.as_secs_f64() * self.jitter_factor;
        let jitter = rng.random_range(-jitter_range / 2.0..=jitter_range / 2.0);
        Duration::from_secs_f64((delay.as_secs_f64() + jitter).max(0.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    #[test]
    fn test_backoff_doubles_and_caps() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.calculate_delay(1), Duration::from_secs(2));
        assert_eq!(policy.calculate_delay(2), Duration::from_secs(4));
        assert_eq!(policy.calculate_delay(3), Duration::from_secs(8));
        assert_eq!(policy.calculate_delay(4), Duration::from_secs(10));
        assert_eq!(policy.calculate_delay(40), Duration::from_secs(10));
    }

    #[test]
    fn test_jitter_stays_within_factor() {
        let policy = RetryPolicy {
            jitter: true,
            jitter_factor: 0.5,
            ..RetryPolicy::default()
        };
        for _ in 0..100 {
            let delay = policy.apply_jitter(Duration::from_secs(4));
            assert!(delay >= Duration::from_secs(3));
            assert!(delay <= Duration::from_secs(5));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhausted_attempts_return_last_error() {
        let policy = RetryPolicy::default();
        let calls = Arc::new(AtomicU32::new(0));
        let started = Instant::now();

        let counter = calls.clone();
        let result: Result<()> = policy
            .execute("always_fails", 0, || {
                let n = counter.fetch_add(1, Ordering::SeqCst) + 1;
                async move { Err(Error::Backend(format!("failure {n}"))) }
            })
            .await;

        assert_eq!(calls.load(Ordering::SeqCst), 3);
        match result {
            Err(Error::Backend(msg)) => assert_eq!(msg, "failure 3"),
            other => panic!("unexpected result: {other:?}"),
        }
        assert!(started.elapsed() >= Duration::from_secs(6));
    }

    #[tokio::test(start_paused = true)]
    async fn test_recovers_after_transient_failure() {
        let policy = RetryPolicy::default();
        let calls = Arc::new(AtomicU32::new(0));

        let counter = calls.clone();
        let result = policy
            .execute("flaky", 12, || {
                let n = counter.fetch_add(1, Ordering::SeqCst) + 1;
                async move {
                    if n < 2 {
                        Err(Error::Backend("temporary".to_string()))
                    } else {
                        Ok("done")
                    }
                }
            })
            .await;

        assert_eq!(result.unwrap(), "done");
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_success_on_first_attempt_does_not_wait() {
        let policy = RetryPolicy {
            initial_delay: Duration::from_secs(3600),
            max_delay: Duration::from_secs(3600),
            ..RetryPolicy::default()
        };
        let result = policy.execute("instant", 0, || async { Ok(7) }).await;
        assert_eq!(result.unwrap(), 7);
    }
}
