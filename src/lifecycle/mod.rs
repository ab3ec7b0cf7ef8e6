//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Load config → Validate → Check panel TCP port → Start tasks
//!
//! Shutdown (shutdown.rs):
//!     Signal received → broadcast → poller, discovery and API server stop
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Trigger graceful shutdown
//!
//! Reload (reload.rs):
//!     Config watcher update → retries, breaker, polling, zone names, arming
//! ```

pub mod reload;
pub mod shutdown;
pub mod signals;
pub mod startup;

pub use shutdown::Shutdown;
