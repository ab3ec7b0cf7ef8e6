//! Timeout enforcement.

use std::future::Future;
use std::time::Duration;

use crate::config::TimeoutConfig;

/// Deadlines applied to each panel attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Deadlines {
    pub connect: Duration,
    pub request: Duration,
}

impl From<&TimeoutConfig> for Deadlines {
    fn from(config: &TimeoutConfig) -> Self {
        Self {
            connect: Duration::from_secs(config.connect_secs.max(1)),
            request: Duration::from_secs(config.request_secs.max(1)),
        }
    }
}

/// Returned when a future misses its deadline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("timed out after {0:?}")]
pub struct Elapsed(pub Duration);

/// Run `fut` with a deadline.
pub async fn with_deadline<F: Future>(deadline: Duration, fut: F) -> Result<F::Output, Elapsed> {
    tokio::time::timeout(deadline, fut)
        .await
        .map_err(|_| Elapsed(deadline))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_deadline_elapses() {
        let result = with_deadline(Duration::from_secs(5), tokio::time::sleep(Duration::from_secs(6))).await;
        assert_eq!(result, Err(Elapsed(Duration::from_secs(5))));
    }

    #[tokio::test(start_paused = true)]
    async fn test_fast_future_completes() {
        let result = with_deadline(Duration::from_secs(5), async { 7 }).await;
        assert_eq!(result, Ok(7));
    }

    #[test]
    fn test_zero_timeouts_are_raised() {
        let deadlines = Deadlines::from(&TimeoutConfig {
            connect_secs: 0,
            request_secs: 0,
        });
        assert_eq!(deadlines.connect, Duration::from_secs(1));
        assert_eq!(deadlines.request, Duration::from_secs(1));
    }
}
