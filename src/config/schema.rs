//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the bridge.
//! All types derive Serde traits for deserialization from config files.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

/// Root configuration for the Secvest bridge.
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
#[serde(default)]
pub struct BridgeConfig {
    /// Panel connection settings.
    pub panel: PanelConfig,

    /// Poll intervals for mode and zones.
    pub polling: PollingConfig,

    /// Retry configuration for panel requests.
    pub retries: RetryConfig,

    /// Circuit breaker thresholds.
    pub circuit_breaker: CircuitBreakerConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Which open zones each arm mode tolerates.
    pub arming: ArmingConfig,

    /// Friendly zone names keyed by normalized zone key (or raw panel name).
    pub zone_names: BTreeMap<String, String>,

    /// Language for mode labels and spoken zone lists.
    pub locale: Locale,

    /// Host-facing HTTP API.
    pub api: ApiConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

impl BridgeConfig {
    /// Unique id prefix for entities; falls back to the panel host.
    pub fn instance_id(&self) -> String {
        match &self.panel.instance_id {
            Some(id) if !id.trim().is_empty() => id.trim().to_string(),
            _ => self.panel.host.trim().to_string(),
        }
    }

    /// True when `other` differs only in settings that can be applied live.
    pub fn same_connection(&self, other: &BridgeConfig) -> bool {
        self.panel == other.panel
            && self.timeouts == other.timeouts
            && self.api == other.api
            && self.observability == other.observability
    }
}

/// Panel connection configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct PanelConfig {
    /// Panel base URL, e.g. "https://192.168.1.50:4433". Scheme defaults to https.
    pub host: String,

    /// Basic auth username.
    pub username: String,

    /// Basic auth password.
    pub password: String,

    /// User code sent with every mode change.
    pub user_code: String,

    /// Verify the panel's TLS certificate (panels ship self-signed certs).
    pub verify_ssl: bool,

    /// Optional stable id used as entity unique-id prefix.
    pub instance_id: Option<String>,
}

impl Default for PanelConfig {
    fn default() -> Self {
        Self {
            host: String::new(),
            username: String::new(),
            password: String::new(),
            user_code: String::new(),
            verify_ssl: false,
            instance_id: None,
        }
    }
}

/// Polling configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct PollingConfig {
    /// Mode poll interval in seconds.
    pub scan_interval_secs: u64,

    /// Zone poll interval in seconds (accumulated from scan ticks).
    pub zones_interval_secs: u64,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            scan_interval_secs: 30,
            zones_interval_secs: 120,
        }
    }
}

/// Retry configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct RetryConfig {
    /// Total attempts per operation, including the first one.
    pub max_attempts: u32,

    /// Base delay for exponential backoff in milliseconds.
    pub base_delay_ms: u64,

    /// Maximum delay for exponential backoff in milliseconds.
    pub max_delay_ms: u64,

    /// Upper bound of the random jitter added to each delay.
    pub jitter_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 4,
            base_delay_ms: 1200,
            max_delay_ms: 30_000,
            jitter_ms: 400,
        }
    }
}

/// Circuit breaker configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct CircuitBreakerConfig {
    /// Failures within the window that open the circuit.
    pub failure_threshold: u32,

    /// Seconds the circuit stays open before a half-open trial.
    pub cooldown_secs: u64,

    /// Failures older than this many seconds no longer count.
    pub failure_window_secs: u64,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            cooldown_secs: 300,
            failure_window_secs: 600,
        }
    }
}

/// Timeout configuration for panel requests.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Connection establishment timeout in seconds.
    pub connect_secs: u64,

    /// Request timeout (total time for request/response) in seconds.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            connect_secs: 10,
            request_secs: 60,
        }
    }
}

/// Arming policy configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
#[serde(default)]
pub struct ArmingConfig {
    /// Zone keys that may stay open when arming in home mode.
    pub home_tolerated_zones: BTreeSet<String>,
}

/// Output language.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Locale {
    #[default]
    De,
    En,
}

/// Host-facing API configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ApiConfig {
    /// Enable the HTTP API.
    pub enabled: bool,

    /// Bind address.
    pub bind_address: String,

    /// API key for authentication (Bearer token).
    pub api_key: String,

    /// Seconds a command request waits for its result. A command that runs
    /// longer keeps going in the background and the caller gets a timeout
    /// error. Arming makes two retried panel calls, so the default covers
    /// twice the default retry schedule.
    pub request_timeout_secs: u64,
}

/// Placeholder key; validation warns when it is left in place.
pub const PLACEHOLDER_API_KEY: &str = "CHANGE_ME";

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            bind_address: "127.0.0.1:8080".to_string(),
            api_key: PLACEHOLDER_API_KEY.to_string(),
            request_timeout_secs: 600,
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Pretty for terminals, JSON for log shipping.
    pub log_format: LogFormat,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
