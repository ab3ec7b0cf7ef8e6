//! Arm, disarm and set-mode commands.
//!
//! Every arm runs: invalidate the zone cache, refresh zones exactly once,
//! check open zones against the mode's policy, then submit. A failed refresh
//! stops the sequence before any arm request reaches the panel.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use arc_swap::ArcSwap;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::Instrument;
use uuid::Uuid;

use crate::alarm::coordinator::{error_text, Coordinator};
use crate::config::ArmingConfig;
use crate::observability::metrics;
use crate::panel::{PanelError, PanelMode};
use crate::zones::{spoken_zone_list, ZoneState};

/// Arm target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArmMode {
    Home,
    Away,
}

impl ArmMode {
    pub fn panel_mode(&self) -> PanelMode {
        match self {
            Self::Home => PanelMode::PartSet,
            Self::Away => PanelMode::Set,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Home => "home",
            Self::Away => "away",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArmRequest {
    pub mode: ArmMode,
    pub operation_id: Uuid,
}

impl ArmRequest {
    pub fn new(mode: ArmMode) -> Self {
        Self {
            mode,
            operation_id: Uuid::new_v4(),
        }
    }
}

/// Which open zones each mode tolerates. Away tolerates none.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArmPolicy {
    pub home_tolerated_zones: BTreeSet<String>,
}

impl From<&ArmingConfig> for ArmPolicy {
    fn from(config: &ArmingConfig) -> Self {
        Self {
            home_tolerated_zones: config.home_tolerated_zones.clone(),
        }
    }
}

impl ArmPolicy {
    /// Open zones that prevent arming in `mode`, in key order.
    pub fn blocking_zones<'a>(&self, mode: ArmMode, zones: &'a BTreeMap<String, ZoneState>) -> Vec<&'a ZoneState> {
        zones
            .values()
            .filter(|zone| zone.open)
            .filter(|zone| match mode {
                ArmMode::Away => true,
                ArmMode::Home => !self.home_tolerated_zones.contains(&zone.key),
            })
            .collect()
    }
}

#[derive(Debug, Error)]
pub enum ArmError {
    #[error("invalid mode '{mode}', use one of: set, partset, unset")]
    InvalidMode { mode: String },

    #[error("zone refresh before arming failed: {0}")]
    ZoneRefresh(#[source] PanelError),

    #[error("{message}")]
    OpenZones { zones: Vec<String>, message: String },

    #[error("Secvest status currently unknown")]
    StatusUnknown,

    #[error("Secvest API error: {0}")]
    Command(#[source] PanelError),
}

impl ArmError {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidMode { .. } => "invalid_mode",
            Self::ZoneRefresh(_) => "zone_refresh_failed",
            Self::OpenZones { .. } => "open_zones",
            Self::StatusUnknown => "status_unknown",
            Self::Command(_) => "command_failed",
        }
    }

    /// The underlying panel error, if any.
    pub fn panel_error(&self) -> Option<&PanelError> {
        match self {
            Self::ZoneRefresh(e) | Self::Command(e) => Some(e),
            _ => None,
        }
    }
}

pub struct AlarmController {
    coordinator: Arc<Coordinator>,
    policy: ArcSwap<ArmPolicy>,
    commands: Mutex<()>,
}

impl AlarmController {
    pub fn new(coordinator: Arc<Coordinator>, policy: ArmPolicy) -> Self {
        Self {
            coordinator,
            policy: ArcSwap::from_pointee(policy),
            commands: Mutex::new(()),
        }
    }

    pub fn update_policy(&self, policy: ArmPolicy) {
        self.policy.store(Arc::new(policy));
    }

    pub async fn arm_home(&self) -> Result<(), ArmError> {
        self.arm(ArmRequest::new(ArmMode::Home)).await
    }

    pub async fn arm_away(&self) -> Result<(), ArmError> {
        self.arm(ArmRequest::new(ArmMode::Away)).await
    }

    pub async fn arm(&self, request: ArmRequest) -> Result<(), ArmError> {
        let span = tracing::info_span!(
            "arm",
            operation_id = %request.operation_id,
            mode = request.mode.as_str()
        );
        async {
            let _command = self.commands.lock().await;
            self.arm_locked(request.mode).await
        }
        .instrument(span)
        .await
    }

    async fn arm_locked(&self, mode: ArmMode) -> Result<(), ArmError> {
        let cache = self.coordinator.cache();
        cache.invalidate();

        if let Err(e) = self.coordinator.refresh_zones_now().await {
            tracing::warn!(error = %e, "Live zones refresh failed before arming");
            metrics::record_arm_rejection("zone_refresh");
            let error = ArmError::ZoneRefresh(e);
            self.coordinator.record_error(refresh_error_text(&error)).await;
            return Err(error);
        }

        let zones = cache.fresh().ok_or(ArmError::StatusUnknown)?;
        let blocking: Vec<String> = self
            .policy
            .load()
            .blocking_zones(mode, &zones)
            .into_iter()
            .map(|zone| zone.friendly_name.clone())
            .collect();

        if !blocking.is_empty() {
            let message = spoken_zone_list(&blocking, self.coordinator.locale());
            tracing::warn!(open_zones = ?blocking, "Arming blocked by open zones");
            metrics::record_arm_rejection("open_zones");
            self.coordinator.record_error(message.clone()).await;
            return Err(ArmError::OpenZones {
                zones: blocking,
                message,
            });
        }

        self.submit(mode.panel_mode()).await
    }

    /// Disarm. No zone refresh is needed.
    pub async fn disarm(&self) -> Result<(), ArmError> {
        let span = tracing::info_span!("disarm", operation_id = %Uuid::new_v4());
        async {
            let _command = self.commands.lock().await;
            self.submit(PanelMode::Unset).await
        }
        .instrument(span)
        .await
    }

    /// Generic mode service: `set` and `partset` arm, `unset` disarms.
    pub async fn set_mode(&self, raw: &str) -> Result<(), ArmError> {
        let mode = PanelMode::parse(raw).ok_or_else(|| ArmError::InvalidMode {
            mode: raw.to_string(),
        })?;

        match mode {
            PanelMode::Set => self.arm_away().await,
            PanelMode::PartSet => self.arm_home().await,
            PanelMode::Unset => self.disarm().await,
        }
    }

    async fn submit(&self, mode: PanelMode) -> Result<(), ArmError> {
        match self.coordinator.client().set_mode(mode).await {
            Ok(()) => {
                tracing::info!(mode = mode.as_str(), "Panel mode set");
                self.coordinator.request_refresh();
                Ok(())
            }
            Err(e) => {
                tracing::error!(mode = mode.as_str(), error = %e, "Setting panel mode failed");
                self.coordinator.record_error(error_text(&e)).await;
                Err(ArmError::Command(e))
            }
        }
    }
}

fn refresh_error_text(error: &ArmError) -> String {
    match error.panel_error() {
        Some(e @ PanelError::CircuitOpen { .. }) => error_text(e),
        _ => error.to_string(),
    }
}
