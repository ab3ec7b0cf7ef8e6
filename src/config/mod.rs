//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → BridgeConfig (validated, immutable)
//!
//! On file change:
//!     watcher.rs detects change
//!     → loader.rs loads new config
//!     → validation.rs validates
//!     → daemon applies live options (intervals, retries, breaker, zone names)
//! ```
//!
//! Connection settings (host, credentials, timeouts, API bind) need a restart.

pub mod loader;
pub mod schema;
pub mod validation;
pub mod watcher;

pub use loader::{load_config, ConfigError};
pub use schema::{
    ApiConfig, ArmingConfig, BridgeConfig, CircuitBreakerConfig, Locale, LogFormat,
    ObservabilityConfig, PanelConfig, PollingConfig, RetryConfig, TimeoutConfig,
};
