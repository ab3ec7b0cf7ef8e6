//! Retry logic.
//!
//! Runs an operation up to `max_attempts` times. Only errors that report
//! themselves as retryable (timeouts, connection failures, 5xx) are retried;
//! everything else aborts immediately. No sleep follows the final attempt.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use crate::config::RetryConfig;
use crate::observability::metrics;
use crate::resilience::backoff::{base_delay, calculate_backoff, BackoffPolicy};

/// Errors that know whether another attempt could succeed.
pub trait Retryable {
    fn is_retryable(&self) -> bool;
}

/// How many times to try and how long to wait in between.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub backoff: BackoffPolicy,
}

impl RetryPolicy {
    /// Same backoff, one attempt. Used for half-open trials.
    pub fn single_attempt(self) -> Self {
        Self {
            max_attempts: 1,
            ..self
        }
    }

    /// Longest a retried operation can run when every attempt uses up
    /// `per_attempt` and every backoff draws its full jitter.
    pub fn worst_case(&self, per_attempt: Duration) -> Duration {
        let attempts = self.max_attempts.max(1);
        let sleeps: Duration = (1..attempts)
            .map(|attempt| {
                base_delay(attempt, &self.backoff) + Duration::from_millis(self.backoff.jitter_ms)
            })
            .sum();
        per_attempt * attempts + sleeps
    }
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(config: &RetryConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            backoff: BackoffPolicy::from(config),
        }
    }
}

/// Why a retried operation gave up.
#[derive(Debug)]
pub enum RetryError<E> {
    /// Every attempt failed with a retryable error.
    Exhausted { attempts: u32, last: E },
    /// An attempt failed with an error that must not be retried.
    Aborted(E),
}

/// Execute `f` under `policy`. `f` receives the 1-based attempt number.
pub async fn retry<T, E, F, Fut>(
    operation: &str,
    policy: RetryPolicy,
    mut f: F,
) -> Result<T, RetryError<E>>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Retryable + Display,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 0;

    loop {
        attempt += 1;
        match f(attempt).await {
            Ok(value) => return Ok(value),
            Err(e) if !e.is_retryable() => return Err(RetryError::Aborted(e)),
            Err(e) => {
                if attempt >= max_attempts {
                    tracing::warn!(operation, attempts = attempt, error = %e, "Retries exhausted");
                    return Err(RetryError::Exhausted {
                        attempts: attempt,
                        last: e,
                    });
                }

                let delay = calculate_backoff(attempt, &policy.backoff);
                tracing::info!(
                    operation,
                    attempt,
                    delay = ?delay,
                    error = %e,
                    "Retrying panel request"
                );
                metrics::record_retry(operation);
                tokio::time::sleep(delay).await;
            }
        }
    }
}
