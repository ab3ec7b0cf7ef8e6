//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Panel operation:
//!     → circuit_breaker.rs (fail fast while open, one trial when half-open)
//!     → retries.rs (bounded attempts, only transient errors retried)
//!     → backoff.rs (exponential delay with jitter between attempts)
//!     → timeouts.rs (connect/request deadlines on every attempt)
//! ```
//!
//! The breaker sees one outcome per operation, not per attempt.

pub mod backoff;
pub mod circuit_breaker;
pub mod retries;
pub mod timeouts;

pub use circuit_breaker::{BreakerRejected, BreakerSettings, CircuitBreaker, CircuitSnapshot, CircuitState};
pub use retries::{retry, RetryError, RetryPolicy, Retryable};
