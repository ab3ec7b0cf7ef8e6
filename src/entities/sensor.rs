use std::collections::BTreeMap;

use serde_json::Value;

use crate::alarm::PanelSnapshot;
use crate::entities::{Entity, EntityState, Platform};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorKind {
    RawMode,
    HumanMode,
    OpenZonesCsv,
    OpenZonesSpoken,
    OpenZonesCount,
    LastError,
}

impl SensorKind {
    pub const ALL: [SensorKind; 6] = [
        SensorKind::RawMode,
        SensorKind::HumanMode,
        SensorKind::OpenZonesCsv,
        SensorKind::OpenZonesSpoken,
        SensorKind::OpenZonesCount,
        SensorKind::LastError,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Self::RawMode => "Secvest Mode (Raw)",
            Self::HumanMode => "Secvest Mode (DE)",
            Self::OpenZonesCsv => "Open Zones (CSV)",
            Self::OpenZonesSpoken => "Open Zones Spoken",
            Self::OpenZonesCount => "Open Zones Count",
            Self::LastError => "Last Error",
        }
    }

    pub fn key(&self) -> &'static str {
        match self {
            Self::RawMode => "raw_mode",
            Self::HumanMode => "human_mode",
            Self::OpenZonesCsv => "open_zones_csv",
            Self::OpenZonesSpoken => "open_zones_spoken",
            Self::OpenZonesCount => "open_zones_count",
            Self::LastError => "last_error",
        }
    }

    pub fn value(&self, snapshot: Option<&PanelSnapshot>) -> Value {
        let Some(s) = snapshot else {
            return match self {
                Self::OpenZonesCount => Value::from(0),
                Self::LastError => Value::from("OK"),
                _ => Value::Null,
            };
        };

        match self {
            Self::RawMode => s.raw_mode.clone().map_or(Value::Null, Value::from),
            Self::HumanMode => s.human_mode.clone().map_or(Value::Null, Value::from),
            Self::OpenZonesCsv => Value::from(s.open_zones_csv.clone()),
            Self::OpenZonesSpoken => Value::from(s.open_zones_spoken.clone()),
            Self::OpenZonesCount => Value::from(s.open_zone_count()),
            Self::LastError => match s.last_error.as_deref() {
                Some(error) if !error.is_empty() => Value::from(error),
                _ => Value::from("OK"),
            },
        }
    }
}

/// A sensor reading one snapshot field.
#[derive(Debug, Clone)]
pub struct SnapshotSensor {
    instance_id: String,
    kind: SensorKind,
}

impl SnapshotSensor {
    pub fn new(instance_id: &str, kind: SensorKind) -> Self {
        Self {
            instance_id: instance_id.to_string(),
            kind,
        }
    }
}

impl Entity for SnapshotSensor {
    fn unique_id(&self) -> String {
        format!("{}_sensor_{}", self.instance_id, self.kind.key())
    }

    fn render(&self, snapshot: Option<&PanelSnapshot>) -> EntityState {
        EntityState {
            unique_id: self.unique_id(),
            platform: Platform::Sensor,
            name: self.kind.name().to_string(),
            device_class: None,
            icon: None,
            state: self.kind.value(snapshot),
            attributes: BTreeMap::new(),
        }
    }
}
