use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::Value;

use crate::alarm::PanelSnapshot;
use crate::entities::{Entity, EntityState, Platform};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AlarmState {
    Disarmed,
    ArmedHome,
    ArmedAway,
}

impl AlarmState {
    pub fn from_raw(raw_mode: &str) -> Option<Self> {
        match raw_mode {
            "unset" => Some(Self::Disarmed),
            "partset" => Some(Self::ArmedHome),
            "set" => Some(Self::ArmedAway),
            _ => None,
        }
    }
}

/// "Secvest Alarm". The bridge sends the user code itself, so no code is
/// required from the host.
#[derive(Debug, Clone)]
pub struct AlarmPanelEntity {
    instance_id: String,
}

impl AlarmPanelEntity {
    pub fn new(instance_id: &str) -> Self {
        Self {
            instance_id: instance_id.to_string(),
        }
    }

    pub fn state(snapshot: Option<&PanelSnapshot>) -> Option<AlarmState> {
        snapshot?.raw_mode.as_deref().and_then(AlarmState::from_raw)
    }
}

impl Entity for AlarmPanelEntity {
    fn unique_id(&self) -> String {
        format!("{}_alarm", self.instance_id)
    }

    fn render(&self, snapshot: Option<&PanelSnapshot>) -> EntityState {
        let attributes = BTreeMap::from([
            ("code_arm_required".to_string(), Value::Bool(false)),
            ("code_disarm_required".to_string(), Value::Bool(false)),
            (
                "supported_features".to_string(),
                serde_json::json!(["arm_home", "arm_away"]),
            ),
        ]);

        EntityState {
            unique_id: self.unique_id(),
            platform: Platform::AlarmControlPanel,
            name: "Secvest Alarm".to_string(),
            device_class: None,
            icon: Some("mdi:shield-home"),
            state: serde_json::to_value(Self::state(snapshot)).unwrap_or(Value::Null),
            attributes,
        }
    }
}
