//! Resilient Secvest API client.
//!
//! Every operation takes a breaker permit first. While the circuit is open the
//! transport is never called. A half-open trial runs a single attempt; all
//! other calls run the configured retry policy.

use std::sync::Arc;

use arc_swap::ArcSwap;
use serde_json::{json, Value};
use tokio::time::Instant;

use crate::config::BridgeConfig;
use crate::observability::metrics;
use crate::panel::transport::{PanelMethod, PanelRequest, PanelTransport, ReqwestTransport, TransportError};
use crate::panel::types::{truncate, PanelError, PanelMode, RawZone};
use crate::resilience::timeouts::Deadlines;
use crate::resilience::{retry, BreakerSettings, CircuitBreaker, RetryError, RetryPolicy};

pub const MODE_PATHS: [&str; 2] = ["/system/partitions-1/state", "/system/partitions-1/state/"];
pub const ZONES_PATHS: [&str; 2] = ["/system/partitions-1/zones/", "/system/partitions-1/zones"];
pub const PARTITION_PATHS: [&str; 2] = ["/system/partitions-1/", "/system/partitions-1"];

/// Panel operations, used as metric and log labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    GetMode,
    GetZones,
    SetMode,
}

impl Operation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::GetMode => "get_mode",
            Self::GetZones => "get_zones",
            Self::SetMode => "set_mode",
        }
    }
}

/// Client for one panel. Cheap to share behind an `Arc`.
pub struct SecvestClient {
    transport: Arc<dyn PanelTransport>,
    user_code: String,
    retry_policy: ArcSwap<RetryPolicy>,
    breaker: Arc<CircuitBreaker>,
}

impl SecvestClient {
    pub fn new(
        transport: Arc<dyn PanelTransport>,
        user_code: impl Into<String>,
        retry_policy: RetryPolicy,
        breaker: Arc<CircuitBreaker>,
    ) -> Self {
        Self {
            transport,
            user_code: user_code.into(),
            retry_policy: ArcSwap::from_pointee(retry_policy),
            breaker,
        }
    }

    /// Build a reqwest-backed client from configuration.
    pub fn from_config(config: &BridgeConfig) -> Result<Self, TransportError> {
        let transport = ReqwestTransport::new(&config.panel, Deadlines::from(&config.timeouts))?;
        let breaker = Arc::new(CircuitBreaker::new(
            config.instance_id(),
            BreakerSettings::from(&config.circuit_breaker),
        ));

        Ok(Self::new(
            Arc::new(transport),
            config.panel.user_code.clone(),
            RetryPolicy::from(&config.retries),
            breaker,
        ))
    }

    pub fn breaker(&self) -> &Arc<CircuitBreaker> {
        &self.breaker
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        **self.retry_policy.load()
    }

    pub fn update_retry_policy(&self, policy: RetryPolicy) {
        self.retry_policy.store(Arc::new(policy));
    }

    /// Read the partition mode string.
    pub async fn get_mode(&self) -> Result<String, PanelError> {
        let payload = self
            .execute(Operation::GetMode, PanelMethod::Get, &MODE_PATHS, None)
            .await?
            .unwrap_or(Value::Null);

        match payload.get("state").and_then(Value::as_str) {
            Some(state) => Ok(state.to_string()),
            None => Err(PanelError::InvalidResponse(format!(
                "invalid mode payload: {}",
                truncate(&payload.to_string(), 200)
            ))),
        }
    }

    /// Read all zone entries.
    pub async fn get_zones(&self) -> Result<Vec<RawZone>, PanelError> {
        let payload = self
            .execute(Operation::GetZones, PanelMethod::Get, &ZONES_PATHS, None)
            .await?
            .unwrap_or(Value::Null);
        RawZone::parse_list(&payload)
    }

    /// Change the partition mode. The response body is ignored.
    pub async fn set_mode(&self, mode: PanelMode) -> Result<(), PanelError> {
        let body = json!({ "state": mode.as_str(), "code": self.user_code });
        self.execute(Operation::SetMode, PanelMethod::Put, &PARTITION_PATHS, Some(body))
            .await?;
        Ok(())
    }

    async fn execute(
        &self,
        operation: Operation,
        method: PanelMethod,
        paths: &[&str],
        body: Option<Value>,
    ) -> Result<Option<Value>, PanelError> {
        let permit = match self.breaker.try_acquire() {
            Ok(permit) => permit,
            Err(rejected) => {
                metrics::record_panel_request(operation.as_str(), "circuit_open", None);
                return Err(rejected.into());
            }
        };

        let policy = if permit.is_trial() {
            tracing::info!(operation = operation.as_str(), "Half-open trial request");
            self.retry_policy().single_attempt()
        } else {
            self.retry_policy()
        };

        let expect_json = method == PanelMethod::Get;
        let body = body.as_ref();
        let started = Instant::now();
        let result = retry(operation.as_str(), policy, move |_| {
            self.attempt(method, paths, body, expect_json)
        })
        .await
        .map_err(|e| match e {
            RetryError::Exhausted { attempts, last } => PanelError::RetriesExhausted {
                attempts,
                last: Box::new(last),
            },
            RetryError::Aborted(e) => e,
        });

        match &result {
            Err(e) if e.trips_breaker() => permit.failure(),
            _ => permit.success(),
        }

        let outcome = match &result {
            Ok(_) => "ok",
            Err(e) => e.kind(),
        };
        metrics::record_panel_request(operation.as_str(), outcome, Some(started.elapsed()));

        result
    }

    /// One attempt: walk the candidate paths in order.
    async fn attempt(
        &self,
        method: PanelMethod,
        paths: &[&str],
        body: Option<&Value>,
        expect_json: bool,
    ) -> Result<Option<Value>, PanelError> {
        let fallback = paths.len() > 1;

        for path in paths {
            let request = PanelRequest {
                method,
                path: path.to_string(),
                body: body.cloned(),
            };
            let response = self.transport.send(&request).await?;
            let status = response.status;

            match status {
                404 if fallback => {
                    tracing::debug!(path, "Panel path not found, trying next");
                    continue;
                }
                401 | 403 => {
                    return Err(PanelError::Auth {
                        status,
                        path: path.to_string(),
                    })
                }
                409 => {
                    return Err(PanelError::Conflict {
                        body: truncate(response.body.trim(), 300),
                    })
                }
                400..=499 => {
                    return Err(PanelError::Http {
                        status,
                        body: truncate(response.body.trim(), 300),
                    })
                }
                500..=599 => return Err(PanelError::ServerError { status }),
                _ => {}
            }

            if !expect_json {
                return Ok(None);
            }

            let text = response.body.trim();
            return serde_json::from_str(text).map(Some).map_err(|_| {
                PanelError::InvalidResponse(format!(
                    "response not JSON (status={status}) body={}",
                    truncate(text, 200)
                ))
            });
        }

        Err(PanelError::NotFound {
            paths: paths.join(", "),
        })
    }
}
