//! Applying reloaded configuration to running components.

use crate::alarm::{AlarmController, ArmPolicy, Coordinator, CoordinatorOptions};
use crate::config::BridgeConfig;
use crate::resilience::{BreakerSettings, RetryPolicy};

/// Push the live options of `next` into the running components. Connection
/// settings are only reported; they need a restart.
pub fn apply_live_config(
    previous: &BridgeConfig,
    next: &BridgeConfig,
    coordinator: &Coordinator,
    controller: &AlarmController,
) {
    if !previous.same_connection(next) {
        tracing::warn!("Panel, timeout, API or observability settings changed; restart to apply them");
    }

    let client = coordinator.client();
    client.update_retry_policy(RetryPolicy::from(&next.retries));
    client
        .breaker()
        .update_settings(BreakerSettings::from(&next.circuit_breaker));
    coordinator.update_options(CoordinatorOptions::from(next));
    controller.update_policy(ArmPolicy::from(&next.arming));

    tracing::info!(
        scan_interval_secs = next.polling.scan_interval_secs,
        zones_interval_secs = next.polling.zones_interval_secs,
        max_attempts = next.retries.max_attempts,
        failure_threshold = next.circuit_breaker.failure_threshold,
        "Configuration reloaded"
    );
}
