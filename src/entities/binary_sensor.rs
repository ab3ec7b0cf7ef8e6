use std::collections::BTreeMap;

use serde_json::Value;

use crate::alarm::PanelSnapshot;
use crate::entities::{bool_state, Entity, EntityState, Platform};

/// "Secvest Available": whether the last poll reached the panel.
#[derive(Debug, Clone)]
pub struct AvailableSensor {
    instance_id: String,
}

impl AvailableSensor {
    pub fn new(instance_id: &str) -> Self {
        Self {
            instance_id: instance_id.to_string(),
        }
    }
}

impl Entity for AvailableSensor {
    fn unique_id(&self) -> String {
        format!("{}_available", self.instance_id)
    }

    fn render(&self, snapshot: Option<&PanelSnapshot>) -> EntityState {
        EntityState {
            unique_id: self.unique_id(),
            platform: Platform::BinarySensor,
            name: "Secvest Available".to_string(),
            device_class: Some("connectivity"),
            icon: Some("mdi:shield-check"),
            state: bool_state(Some(snapshot.is_some_and(|s| s.available))),
            attributes: BTreeMap::new(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AnyZoneOpenSensor {
    instance_id: String,
}

impl AnyZoneOpenSensor {
    pub fn new(instance_id: &str) -> Self {
        Self {
            instance_id: instance_id.to_string(),
        }
    }
}

impl Entity for AnyZoneOpenSensor {
    fn unique_id(&self) -> String {
        format!("{}_any_zone_open", self.instance_id)
    }

    fn render(&self, snapshot: Option<&PanelSnapshot>) -> EntityState {
        EntityState {
            unique_id: self.unique_id(),
            platform: Platform::BinarySensor,
            name: "Secvest Any Zone Open".to_string(),
            device_class: None,
            icon: Some("mdi:door-open"),
            state: bool_state(Some(snapshot.is_some_and(|s| !s.open_zone_names.is_empty()))),
            attributes: BTreeMap::new(),
        }
    }
}

/// One door/window contact.
#[derive(Debug, Clone)]
pub struct ZoneSensor {
    instance_id: String,
    key: String,
}

impl ZoneSensor {
    pub fn new(instance_id: &str, key: &str) -> Self {
        Self {
            instance_id: instance_id.to_string(),
            key: key.to_string(),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    fn fallback_name(&self) -> String {
        format!("Secvest Zone {}", self.key.replace('_', " "))
    }
}

impl Entity for ZoneSensor {
    fn unique_id(&self) -> String {
        format!("{}_zone_{}", self.instance_id, self.key)
    }

    fn render(&self, snapshot: Option<&PanelSnapshot>) -> EntityState {
        let zone = snapshot.and_then(|s| s.zones.get(&self.key));

        let name = match zone {
            Some(zone) if !zone.friendly_name.is_empty() => format!("Secvest {}", zone.friendly_name),
            _ => self.fallback_name(),
        };

        let mut attributes = BTreeMap::new();
        if snapshot.is_some() {
            attributes.insert("secvest_key".to_string(), Value::from(self.key.clone()));
            attributes.insert(
                "secvest_name".to_string(),
                zone.map_or(Value::Null, |z| Value::from(z.name.clone())),
            );
            attributes.insert(
                "friendly_name".to_string(),
                zone.map_or(Value::Null, |z| Value::from(z.friendly_name.clone())),
            );
            attributes.insert(
                "secvest_state".to_string(),
                zone.map_or(Value::Null, |z| Value::from(z.state.clone())),
            );
        }

        EntityState {
            unique_id: self.unique_id(),
            platform: Platform::BinarySensor,
            name,
            device_class: Some("door"),
            icon: None,
            state: bool_state(zone.map(|z| z.open)),
            attributes,
        }
    }
}
