//! Configuration validation.
//!
//! Serde handles syntax; this module checks value ranges and required fields.
//! All errors are collected so a broken file is reported in one pass.

use std::net::SocketAddr;
use std::time::Duration;

use thiserror::Error;

use crate::config::schema::{BridgeConfig, PLACEHOLDER_API_KEY};
use crate::resilience::timeouts::Deadlines;
use crate::resilience::RetryPolicy;

/// Lowest cooldown the breaker accepts; smaller values are raised to this.
pub const MIN_COOLDOWN_SECS: u64 = 10;

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{field}: {message}")]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

/// Validate a parsed configuration.
pub fn validate_config(config: &BridgeConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.panel.host.trim().is_empty() {
        errors.push(ValidationError::new("panel.host", "must not be empty"));
    } else if let Err(e) = crate::panel::transport::normalize_base_url(&config.panel.host) {
        errors.push(ValidationError::new("panel.host", e.to_string()));
    }
    if config.panel.username.is_empty() {
        errors.push(ValidationError::new("panel.username", "must not be empty"));
    }
    if config.panel.user_code.trim().is_empty() {
        errors.push(ValidationError::new("panel.user_code", "must not be empty"));
    }

    if config.polling.scan_interval_secs == 0 {
        errors.push(ValidationError::new(
            "polling.scan_interval_secs",
            "must be greater than 0",
        ));
    }
    if config.polling.zones_interval_secs == 0 {
        errors.push(ValidationError::new(
            "polling.zones_interval_secs",
            "must be greater than 0",
        ));
    }

    if config.retries.max_attempts == 0 {
        errors.push(ValidationError::new(
            "retries.max_attempts",
            "must be at least 1",
        ));
    }
    if config.retries.base_delay_ms > config.retries.max_delay_ms {
        errors.push(ValidationError::new(
            "retries.base_delay_ms",
            "must not exceed retries.max_delay_ms",
        ));
    }

    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::new(
            "timeouts.request_secs",
            "must be greater than 0",
        ));
    }
    if config.timeouts.connect_secs == 0 {
        errors.push(ValidationError::new(
            "timeouts.connect_secs",
            "must be greater than 0",
        ));
    }

    if config.api.enabled {
        if config.api.bind_address.parse::<SocketAddr>().is_err() {
            errors.push(ValidationError::new(
                "api.bind_address",
                format!("invalid socket address '{}'", config.api.bind_address),
            ));
        }
        if config.api.api_key.is_empty() {
            errors.push(ValidationError::new("api.api_key", "must not be empty"));
        }
        if config.api.request_timeout_secs == 0 {
            errors.push(ValidationError::new(
                "api.request_timeout_secs",
                "must be greater than 0",
            ));
        }
    }

    if config.observability.metrics_enabled
        && config
            .observability
            .metrics_address
            .parse::<SocketAddr>()
            .is_err()
    {
        errors.push(ValidationError::new(
            "observability.metrics_address",
            format!(
                "invalid socket address '{}'",
                config.observability.metrics_address
            ),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Worst-case duration of an arm: a retried zone refresh followed by a
/// retried mode command.
pub fn command_budget(config: &BridgeConfig) -> Duration {
    let per_attempt = Deadlines::from(&config.timeouts).request;
    RetryPolicy::from(&config.retries).worst_case(per_attempt) * 2
}

/// Non-fatal findings worth logging at startup.
pub fn config_warnings(config: &BridgeConfig) -> Vec<String> {
    let mut warnings = Vec::new();

    if config.api.enabled && config.api.api_key == PLACEHOLDER_API_KEY {
        warnings.push("api.api_key is the placeholder value; set a real key".to_string());
    }
    if config.circuit_breaker.failure_threshold == 0 {
        warnings.push("circuit_breaker.failure_threshold 0 is treated as 1".to_string());
    }
    if config.circuit_breaker.cooldown_secs < MIN_COOLDOWN_SECS {
        warnings.push(format!(
            "circuit_breaker.cooldown_secs {} is raised to {}",
            config.circuit_breaker.cooldown_secs, MIN_COOLDOWN_SECS
        ));
    }
    let budget = command_budget(config);
    if config.api.enabled && Duration::from_secs(config.api.request_timeout_secs) < budget {
        warnings.push(format!(
            "api.request_timeout_secs {} is below the worst-case arm duration of {}s; slow commands finish in the background after the API reports a timeout",
            config.api.request_timeout_secs,
            budget.as_secs_f64().ceil()
        ));
    }
    if config.polling.zones_interval_secs < config.polling.scan_interval_secs {
        warnings.push(
            "polling.zones_interval_secs is shorter than scan_interval_secs; zones refresh every scan"
                .to_string(),
        );
    }

    warnings
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_config() -> BridgeConfig {
        let mut config = BridgeConfig::default();
        config.panel.host = "192.168.1.50".to_string();
        config.panel.username = "admin".to_string();
        config.panel.password = "secret".to_string();
        config.panel.user_code = "1234".to_string();
        config.api.api_key = "real-key".to_string();
        config
    }

    #[test]
    fn test_valid_config_passes() {
        assert!(validate_config(&valid_config()).is_ok());
        assert!(config_warnings(&valid_config()).is_empty());
    }

    #[test]
    fn test_collects_all_errors() {
        let mut config = valid_config();
        config.panel.host = String::new();
        config.panel.user_code = String::new();
        config.retries.max_attempts = 0;
        config.api.bind_address = "not-an-address".to_string();

        let errors = validate_config(&config).unwrap_err();
        let fields: Vec<_> = errors.iter().map(|e| e.field).collect();
        assert_eq!(
            fields,
            vec![
                "panel.host",
                "panel.user_code",
                "retries.max_attempts",
                "api.bind_address"
            ]
        );
    }

    #[test]
    fn test_disabled_api_skips_api_checks() {
        let mut config = valid_config();
        config.api.enabled = false;
        config.api.bind_address = "garbage".to_string();
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_breaker_values_are_clamped_not_rejected() {
        let mut config = valid_config();
        config.circuit_breaker.failure_threshold = 0;
        config.circuit_breaker.cooldown_secs = 1;

        assert!(validate_config(&config).is_ok());
        assert_eq!(config_warnings(&config).len(), 2);
    }

    #[test]
    fn test_default_api_timeout_covers_an_arm() {
        let config = valid_config();
        assert_eq!(command_budget(&config), Duration::from_millis(2 * 249_600));
        assert!(Duration::from_secs(config.api.request_timeout_secs) >= command_budget(&config));
    }

    #[test]
    fn test_short_api_timeout_warns() {
        let mut config = valid_config();
        config.api.request_timeout_secs = 300;
        let warnings = config_warnings(&config);
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("api.request_timeout_secs 300"));
    }

    #[test]
    fn test_placeholder_key_warns() {
        let mut config = valid_config();
        config.api.api_key = PLACEHOLDER_API_KEY.to_string();
        let warnings = config_warnings(&config);
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("placeholder"));
    }
}
