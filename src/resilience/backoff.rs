//! Exponential backoff with jitter.

use std::time::Duration;

use rand::Rng;

use crate::config::RetryConfig;

/// Backoff schedule parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackoffPolicy {
    pub base_ms: u64,
    pub max_ms: u64,
    pub jitter_ms: u64,
}

impl BackoffPolicy {
    /// A schedule that never sleeps. Handy in tests.
    pub const fn none() -> Self {
        Self {
            base_ms: 0,
            max_ms: 0,
            jitter_ms: 0,
        }
    }
}

impl From<&RetryConfig> for BackoffPolicy {
    fn from(config: &RetryConfig) -> Self {
        Self {
            base_ms: config.base_delay_ms,
            max_ms: config.max_delay_ms,
            jitter_ms: config.jitter_ms,
        }
    }
}

/// Deterministic part of the delay after `attempt` failed attempts.
pub fn base_delay(attempt: u32, policy: &BackoffPolicy) -> Duration {
    if attempt == 0 {
        return Duration::ZERO;
    }

    let exponential_base = 2u64.saturating_pow(attempt - 1);
    let delay_ms = policy.base_ms.saturating_mul(exponential_base);
    Duration::from_millis(delay_ms.min(policy.max_ms))
}

/// Calculate exponential backoff delay with jitter.
pub fn calculate_backoff(attempt: u32, policy: &BackoffPolicy) -> Duration {
    let capped = base_delay(attempt, policy);
    if capped.is_zero() {
        return capped;
    }

    let jitter = if policy.jitter_ms > 0 {
        rand::thread_rng().gen_range(0..policy.jitter_ms)
    } else {
        0
    };

    capped + Duration::from_millis(jitter)
}

#[cfg(test)]
mod tests {
    use super::*;

    const POLICY: BackoffPolicy = BackoffPolicy {
        base_ms: 1200,
        max_ms: 30_000,
        jitter_ms: 400,
    };

    #[test]
    fn test_backoff_calculation() {
        let b1 = calculate_backoff(1, &POLICY);
        assert!(b1 >= Duration::from_millis(1200) && b1 < Duration::from_millis(1600));

        let b2 = calculate_backoff(2, &POLICY);
        assert!(b2 >= Duration::from_millis(2400) && b2 < Duration::from_millis(2800));

        let b3 = calculate_backoff(3, &POLICY);
        assert!(b3 >= Duration::from_millis(4800));
    }

    #[test]
    fn test_backoff_is_capped() {
        assert_eq!(base_delay(10, &POLICY), Duration::from_millis(30_000));
        assert_eq!(base_delay(64, &POLICY), Duration::from_millis(30_000));
        assert!(calculate_backoff(40, &POLICY) < Duration::from_millis(30_400));
    }

    #[test]
    fn test_base_delay_is_monotone() {
        let mut previous = Duration::ZERO;
        for attempt in 0..20 {
            let delay = base_delay(attempt, &POLICY);
            assert!(delay >= previous);
            previous = delay;
        }
    }

    #[test]
    fn test_zero_policy_never_sleeps() {
        assert_eq!(calculate_backoff(3, &BackoffPolicy::none()), Duration::ZERO);
    }
}
