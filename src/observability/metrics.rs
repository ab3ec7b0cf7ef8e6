//! Metrics collection and exposition.
//!
//! # Metrics
//! - `secvest_panel_requests_total` (counter): panel operations by operation, outcome
//! - `secvest_panel_request_duration_seconds` (histogram): operation latency incl. retries
//! - `secvest_panel_retries_total` (counter): retry sleeps by operation
//! - `secvest_circuit_state` (gauge): 0=closed, 1=half-open, 2=open
//! - `secvest_circuit_transitions_total` (counter): transitions by target state
//! - `secvest_open_zones` (gauge): open zones in the latest snapshot
//! - `secvest_arm_rejections_total` (counter): refused arm attempts by reason

use std::net::SocketAddr;
use std::time::Duration;

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

use crate::resilience::CircuitState;

/// Start the Prometheus scrape endpoint. Must run inside the tokio runtime.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics endpoint listening");
    Ok(())
}

pub fn record_panel_request(operation: &'static str, outcome: &'static str, elapsed: Option<Duration>) {
    counter!(
        "secvest_panel_requests_total",
        "operation" => operation,
        "outcome" => outcome
    )
    .increment(1);

    if let Some(elapsed) = elapsed {
        histogram!("secvest_panel_request_duration_seconds", "operation" => operation)
            .record(elapsed.as_secs_f64());
    }
}

pub fn record_retry(operation: &str) {
    counter!("secvest_panel_retries_total", "operation" => operation.to_string()).increment(1);
}

fn circuit_gauge_value(state: CircuitState) -> f64 {
    match state {
        CircuitState::Closed => 0.0,
        CircuitState::HalfOpen => 1.0,
        CircuitState::Open => 2.0,
    }
}

pub fn set_circuit_state(state: CircuitState) {
    gauge!("secvest_circuit_state").set(circuit_gauge_value(state));
}

pub fn record_circuit_transition(to: CircuitState) {
    counter!("secvest_circuit_transitions_total", "to" => to.as_str()).increment(1);
    set_circuit_state(to);
}

pub fn set_open_zones(count: usize) {
    gauge!("secvest_open_zones").set(count as f64);
}

pub fn record_arm_rejection(reason: &'static str) {
    counter!("secvest_arm_rejections_total", "reason" => reason).increment(1);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_circuit_gauge_values() {
        assert_eq!(circuit_gauge_value(CircuitState::Closed), 0.0);
        assert_eq!(circuit_gauge_value(CircuitState::HalfOpen), 1.0);
        assert_eq!(circuit_gauge_value(CircuitState::Open), 2.0);
    }

    #[test]
    fn test_recording_without_recorder_is_noop() {
        record_panel_request("get_mode", "ok", Some(Duration::from_millis(5)));
        record_retry("get_mode");
        record_arm_rejection("open_zones");
    }
}
