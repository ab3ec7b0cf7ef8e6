//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → logging.rs (structured tracing events, pretty or JSON)
//!     → metrics.rs (counters, gauges, histograms)
//!
//! Consumers:
//!     → stdout (log shipping)
//!     → Prometheus scrape endpoint (optional)
//! ```
//!
//! Metric calls are no-ops until a recorder is installed, so tests and
//! `--check` runs need no setup.

pub mod logging;
pub mod metrics;
