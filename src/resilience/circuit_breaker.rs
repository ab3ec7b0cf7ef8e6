//! Circuit breaker for panel protection.
//!
//! # States
//! - Closed: normal operation, requests pass through
//! - Open: panel assumed down, requests fail fast
//! - Half-Open: one trial request tests whether the panel recovered
//!
//! # State Transitions
//! ```text
//! Closed → Open: failure_count >= threshold within failure_window
//! Open → Half-Open: after cooldown, on the next acquire
//! Half-Open → Closed: trial succeeds (failure count reset to 0)
//! Half-Open → Open: trial fails (cooldown restarts)
//! ```
//!
//! One breaker exists per panel and is shared by every caller, so all state
//! lives behind a single mutex and every transition happens under it.

use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use serde::Serialize;
use thiserror::Error;
use tokio::time::Instant;

use crate::config::validation::MIN_COOLDOWN_SECS;
use crate::config::CircuitBreakerConfig;
use crate::observability::metrics;

/// Circuit breaker states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

impl CircuitState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Closed => "closed",
            Self::Open => "open",
            Self::HalfOpen => "half_open",
        }
    }
}

/// Thresholds the breaker runs with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BreakerSettings {
    pub failure_threshold: u32,
    pub cooldown: Duration,
    pub failure_window: Duration,
}

impl From<&CircuitBreakerConfig> for BreakerSettings {
    fn from(config: &CircuitBreakerConfig) -> Self {
        Self {
            failure_threshold: config.failure_threshold.max(1),
            cooldown: Duration::from_secs(config.cooldown_secs.max(MIN_COOLDOWN_SECS)),
            failure_window: Duration::from_secs(config.failure_window_secs),
        }
    }
}

impl Default for BreakerSettings {
    fn default() -> Self {
        Self::from(&CircuitBreakerConfig::default())
    }
}

/// Point-in-time view of the breaker, for status reporting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CircuitSnapshot {
    pub state: CircuitState,
    pub failure_count: u32,
    pub failure_threshold: u32,
    /// Epoch seconds of the most recent counted failure.
    pub last_failure_at: Option<u64>,
    /// Seconds until the next trial is allowed, while open.
    pub retry_in_secs: Option<u64>,
}

/// Returned instead of a permit while the circuit is open.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("circuit open, next trial in {}s", .retry_in.as_secs())]
pub struct BreakerRejected {
    pub retry_in: Duration,
}

#[derive(Debug)]
struct Inner {
    settings: BreakerSettings,
    state: CircuitState,
    failure_count: u32,
    last_failure: Option<Instant>,
    last_failure_at: Option<u64>,
    opened_at: Option<Instant>,
    trial_in_flight: bool,
}

impl Inner {
    fn retry_in(&self, now: Instant) -> Duration {
        match self.opened_at {
            Some(opened) => self
                .settings
                .cooldown
                .saturating_sub(now.saturating_duration_since(opened)),
            None => Duration::ZERO,
        }
    }
}

/// Process-wide circuit breaker guarding one panel.
#[derive(Debug)]
pub struct CircuitBreaker {
    name: String,
    inner: Mutex<Inner>,
}

impl CircuitBreaker {
    pub fn new(name: impl Into<String>, settings: BreakerSettings) -> Self {
        Self {
            name: name.into(),
            inner: Mutex::new(Inner {
                settings,
                state: CircuitState::Closed,
                failure_count: 0,
                last_failure: None,
                last_failure_at: None,
                opened_at: None,
                trial_in_flight: false,
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Ask to make a call. While open, this fails without touching the panel.
    pub fn try_acquire(&self) -> Result<BreakerPermit<'_>, BreakerRejected> {
        let now = Instant::now();
        let mut inner = self.lock();

        match inner.state {
            CircuitState::Closed => Ok(BreakerPermit::new(self, false)),
            CircuitState::Open => {
                let retry_in = inner.retry_in(now);
                if retry_in.is_zero() {
                    inner.trial_in_flight = true;
                    self.transition(&mut inner, CircuitState::HalfOpen);
                    Ok(BreakerPermit::new(self, true))
                } else {
                    Err(BreakerRejected { retry_in })
                }
            }
            CircuitState::HalfOpen => {
                if inner.trial_in_flight {
                    Err(BreakerRejected {
                        retry_in: Duration::ZERO,
                    })
                } else {
                    inner.trial_in_flight = true;
                    Ok(BreakerPermit::new(self, true))
                }
            }
        }
    }

    fn on_success(&self, trial: bool) {
        let mut inner = self.lock();
        if trial {
            inner.trial_in_flight = false;
        }

        match inner.state {
            CircuitState::HalfOpen if trial => {
                inner.failure_count = 0;
                inner.opened_at = None;
                self.transition(&mut inner, CircuitState::Closed);
            }
            CircuitState::Closed => inner.failure_count = 0,
            // A call admitted before the circuit opened; it says nothing about the trial.
            _ => {}
        }
    }

    fn on_failure(&self, trial: bool) {
        let now = Instant::now();
        let mut inner = self.lock();
        if trial {
            inner.trial_in_flight = false;
        }

        let window = inner.settings.failure_window;
        if let Some(last) = inner.last_failure {
            if !window.is_zero() && now.saturating_duration_since(last) > window {
                inner.failure_count = 0;
            }
        }
        inner.failure_count = inner.failure_count.saturating_add(1);
        inner.last_failure = Some(now);
        inner.last_failure_at = Some(epoch_secs());

        match inner.state {
            CircuitState::HalfOpen if trial => {
                inner.opened_at = Some(now);
                self.transition(&mut inner, CircuitState::Open);
            }
            CircuitState::Closed => {
                if inner.failure_count >= inner.settings.failure_threshold {
                    inner.opened_at = Some(now);
                    self.transition(&mut inner, CircuitState::Open);
                } else {
                    tracing::debug!(
                        breaker = %self.name,
                        failures = inner.failure_count,
                        threshold = inner.settings.failure_threshold,
                        "Panel request failed ({}/{})",
                        inner.failure_count,
                        inner.settings.failure_threshold
                    );
                }
            }
            _ => {}
        }
    }

    fn release_trial(&self) {
        let mut inner = self.lock();
        inner.trial_in_flight = false;
    }

    fn transition(&self, inner: &mut Inner, to: CircuitState) {
        let from = inner.state;
        inner.state = to;
        match to {
            CircuitState::Open => tracing::warn!(
                breaker = %self.name,
                from = from.as_str(),
                failures = inner.failure_count,
                cooldown_secs = inner.settings.cooldown.as_secs(),
                "Circuit breaker opened"
            ),
            _ => tracing::info!(
                breaker = %self.name,
                from = from.as_str(),
                to = to.as_str(),
                "Circuit breaker state changed"
            ),
        }
        metrics::record_circuit_transition(to);
    }

    /// Current state as stored. An expired cooldown still reads as open until
    /// the next acquire turns it into a trial.
    pub fn state(&self) -> CircuitState {
        self.lock().state
    }

    pub fn snapshot(&self) -> CircuitSnapshot {
        let now = Instant::now();
        let inner = self.lock();
        let retry_in_secs = match inner.state {
            CircuitState::Open => Some(inner.retry_in(now).as_secs()),
            _ => None,
        };

        CircuitSnapshot {
            state: inner.state,
            failure_count: inner.failure_count,
            failure_threshold: inner.settings.failure_threshold,
            last_failure_at: inner.last_failure_at,
            retry_in_secs,
        }
    }

    pub fn settings(&self) -> BreakerSettings {
        self.lock().settings
    }

    /// Apply new thresholds. Current state and counters are kept.
    pub fn update_settings(&self, settings: BreakerSettings) {
        let mut inner = self.lock();
        if inner.settings != settings {
            tracing::info!(
                breaker = %self.name,
                threshold = settings.failure_threshold,
                cooldown_secs = settings.cooldown.as_secs(),
                "Circuit breaker settings updated"
            );
            inner.settings = settings;
        }
    }
}

/// Admission to make one call. Report the outcome with [`success`] or
/// [`failure`]; dropping it unreported frees a half-open trial slot without
/// changing state.
///
/// [`success`]: BreakerPermit::success
/// [`failure`]: BreakerPermit::failure
#[derive(Debug)]
#[must_use]
pub struct BreakerPermit<'a> {
    breaker: &'a CircuitBreaker,
    trial: bool,
    settled: bool,
}

impl<'a> BreakerPermit<'a> {
    fn new(breaker: &'a CircuitBreaker, trial: bool) -> Self {
        Self {
            breaker,
            trial,
            settled: false,
        }
    }

    /// True for the single call allowed through in half-open state.
    pub fn is_trial(&self) -> bool {
        self.trial
    }

    pub fn success(mut self) {
        self.settled = true;
        self.breaker.on_success(self.trial);
    }

    pub fn failure(mut self) {
        self.settled = true;
        self.breaker.on_failure(self.trial);
    }
}

impl Drop for BreakerPermit<'_> {
    fn drop(&mut self) {
        if !self.settled && self.trial {
            self.breaker.release_trial();
        }
    }
}

fn epoch_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(threshold: u32) -> BreakerSettings {
        BreakerSettings {
            failure_threshold: threshold,
            cooldown: Duration::from_secs(60),
            failure_window: Duration::from_secs(600),
        }
    }

    fn fail(breaker: &CircuitBreaker) {
        breaker.try_acquire().unwrap().failure();
    }

    #[tokio::test(start_paused = true)]
    async fn test_opens_at_threshold() {
        let breaker = CircuitBreaker::new("panel", settings(3));

        fail(&breaker);
        fail(&breaker);
        assert_eq!(breaker.state(), CircuitState::Closed);

        fail(&breaker);
        assert_eq!(breaker.state(), CircuitState::Open);

        let rejected = breaker.try_acquire().unwrap_err();
        assert_eq!(rejected.retry_in, Duration::from_secs(60));
    }

    #[tokio::test(start_paused = true)]
    async fn test_open_rejects_until_cooldown() {
        let breaker = CircuitBreaker::new("panel", settings(1));
        fail(&breaker);

        tokio::time::advance(Duration::from_secs(59)).await;
        let rejected = breaker.try_acquire().unwrap_err();
        assert_eq!(rejected.retry_in, Duration::from_secs(1));

        tokio::time::advance(Duration::from_secs(1)).await;
        let permit = breaker.try_acquire().unwrap();
        assert!(permit.is_trial());
        assert_eq!(breaker.state(), CircuitState::HalfOpen);
        drop(permit);
    }

    #[tokio::test(start_paused = true)]
    async fn test_half_open_success_closes_and_resets() {
        let breaker = CircuitBreaker::new("panel", settings(2));
        fail(&breaker);
        fail(&breaker);
        assert_eq!(breaker.snapshot().failure_count, 2);

        tokio::time::advance(Duration::from_secs(60)).await;
        breaker.try_acquire().unwrap().success();

        let snapshot = breaker.snapshot();
        assert_eq!(snapshot.state, CircuitState::Closed);
        assert_eq!(snapshot.failure_count, 0);
        assert_eq!(snapshot.retry_in_secs, None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_half_open_failure_reopens_with_fresh_cooldown() {
        let breaker = CircuitBreaker::new("panel", settings(1));
        fail(&breaker);

        tokio::time::advance(Duration::from_secs(60)).await;
        breaker.try_acquire().unwrap().failure();
        assert_eq!(breaker.state(), CircuitState::Open);

        let rejected = breaker.try_acquire().unwrap_err();
        assert_eq!(rejected.retry_in, Duration::from_secs(60));
    }

    #[tokio::test(start_paused = true)]
    async fn test_single_trial_in_half_open() {
        let breaker = CircuitBreaker::new("panel", settings(1));
        fail(&breaker);
        tokio::time::advance(Duration::from_secs(60)).await;

        let trial = breaker.try_acquire().unwrap();
        assert!(breaker.try_acquire().is_err());

        // An abandoned trial frees the slot but keeps the circuit half-open.
        drop(trial);
        assert_eq!(breaker.state(), CircuitState::HalfOpen);
        let retry = breaker.try_acquire().unwrap();
        assert!(retry.is_trial());
        retry.success();
        assert_eq!(breaker.state(), CircuitState::Closed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_success_resets_consecutive_failures() {
        let breaker = CircuitBreaker::new("panel", settings(3));
        fail(&breaker);
        fail(&breaker);
        breaker.try_acquire().unwrap().success();
        fail(&breaker);
        fail(&breaker);
        assert_eq!(breaker.state(), CircuitState::Closed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failures_outside_window_expire() {
        let breaker = CircuitBreaker::new("panel", settings(2));
        fail(&breaker);

        tokio::time::advance(Duration::from_secs(601)).await;
        fail(&breaker);
        assert_eq!(breaker.state(), CircuitState::Closed);
        assert_eq!(breaker.snapshot().failure_count, 1);

        fail(&breaker);
        assert_eq!(breaker.state(), CircuitState::Open);
    }

    #[tokio::test(start_paused = true)]
    async fn test_late_result_while_open_is_ignored() {
        let breaker = CircuitBreaker::new("panel", settings(1));
        let slow = breaker.try_acquire().unwrap();
        fail(&breaker);
        assert_eq!(breaker.state(), CircuitState::Open);

        slow.success();
        assert_eq!(breaker.state(), CircuitState::Open);
    }

    #[test]
    fn test_settings_are_clamped() {
        let config = CircuitBreakerConfig {
            failure_threshold: 0,
            cooldown_secs: 2,
            failure_window_secs: 30,
        };
        let settings = BreakerSettings::from(&config);
        assert_eq!(settings.failure_threshold, 1);
        assert_eq!(settings.cooldown, Duration::from_secs(10));
    }

    #[tokio::test(start_paused = true)]
    async fn test_update_settings_applies_new_threshold() {
        let breaker = CircuitBreaker::new("panel", settings(5));
        fail(&breaker);
        breaker.update_settings(settings(2));
        fail(&breaker);
        assert_eq!(breaker.state(), CircuitState::Open);
    }
}
