//! Entity projections of the panel snapshot.
//!
//! Each entity renders an [`EntityState`] from the latest snapshot, the way a
//! home-automation host would display it. The registry tracks which zone
//! entities exist and adds new ones as zones appear.

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::Value;

use crate::alarm::PanelSnapshot;

pub mod alarm_panel;
pub mod binary_sensor;
pub mod registry;
pub mod sensor;

pub use alarm_panel::AlarmPanelEntity;
pub use binary_sensor::{AnyZoneOpenSensor, AvailableSensor, ZoneSensor};
pub use registry::EntityRegistry;
pub use sensor::{SensorKind, SnapshotSensor};

/// Entity platform, as the host groups them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Platform {
    AlarmControlPanel,
    BinarySensor,
    Sensor,
}

/// Device all entities belong to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeviceInfo {
    pub identifier: String,
    pub name: &'static str,
    pub manufacturer: &'static str,
    pub model: &'static str,
    pub configuration_url: Option<String>,
}

impl DeviceInfo {
    pub fn secvest(instance_id: &str, configuration_url: Option<String>) -> Self {
        Self {
            identifier: instance_id.to_string(),
            name: "ABUS Secvest",
            manufacturer: "ABUS",
            model: "Secvest",
            configuration_url,
        }
    }
}

/// Rendered state of one entity.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EntityState {
    pub unique_id: String,
    pub platform: Platform,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device_class: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon: Option<&'static str>,
    pub state: Value,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub attributes: BTreeMap<String, Value>,
}

pub trait Entity: Send + Sync {
    fn unique_id(&self) -> String;

    fn render(&self, snapshot: Option<&PanelSnapshot>) -> EntityState;
}

fn bool_state(value: Option<bool>) -> Value {
    match value {
        Some(true) => Value::from("on"),
        Some(false) => Value::from("off"),
        None => Value::Null,
    }
}
