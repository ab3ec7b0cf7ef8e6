//! Entity registry with runtime zone discovery.

use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tokio::sync::{broadcast, watch};

use crate::alarm::PanelSnapshot;
use crate::entities::{
    AlarmPanelEntity, AnyZoneOpenSensor, AvailableSensor, DeviceInfo, Entity, EntityState, SensorKind,
    SnapshotSensor, ZoneSensor,
};

pub struct EntityRegistry {
    instance_id: String,
    device: DeviceInfo,
    fixed: Vec<Box<dyn Entity>>,
    zones: DashMap<String, ZoneSensor>,
}

impl EntityRegistry {
    pub fn new(instance_id: &str, configuration_url: Option<String>) -> Self {
        let mut fixed: Vec<Box<dyn Entity>> = vec![
            Box::new(AlarmPanelEntity::new(instance_id)),
            Box::new(AvailableSensor::new(instance_id)),
            Box::new(AnyZoneOpenSensor::new(instance_id)),
        ];
        fixed.extend(
            SensorKind::ALL
                .into_iter()
                .map(|kind| Box::new(SnapshotSensor::new(instance_id, kind)) as Box<dyn Entity>),
        );

        Self {
            instance_id: instance_id.to_string(),
            device: DeviceInfo::secvest(instance_id, configuration_url),
            fixed,
            zones: DashMap::new(),
        }
    }

    pub fn device(&self) -> &DeviceInfo {
        &self.device
    }

    /// Register zone entities for zones not seen before. Returns the new ones.
    pub fn discover(&self, snapshot: &PanelSnapshot) -> Vec<ZoneSensor> {
        let mut discovered = Vec::new();
        for key in snapshot.zones.keys() {
            if let Entry::Vacant(slot) = self.zones.entry(key.clone()) {
                tracing::info!(zone = %key, "Discovered new Secvest zone");
                let sensor = ZoneSensor::new(&self.instance_id, key);
                discovered.push(sensor.clone());
                slot.insert(sensor);
            }
        }
        discovered
    }

    pub fn zone_count(&self) -> usize {
        self.zones.len()
    }

    /// Render every registered entity against `snapshot`. Zone entities come
    /// last, ordered by key.
    pub fn render_all(&self, snapshot: Option<&PanelSnapshot>) -> Vec<EntityState> {
        let mut zones: Vec<EntityState> = self
            .zones
            .iter()
            .map(|entry| entry.value().render(snapshot))
            .collect();
        zones.sort_by(|a, b| a.unique_id.cmp(&b.unique_id));

        self.fixed
            .iter()
            .map(|entity| entity.render(snapshot))
            .chain(zones)
            .collect()
    }

    /// Follow published snapshots and discover zones until shutdown.
    pub async fn run_discovery(
        self: Arc<Self>,
        mut snapshots: watch::Receiver<Option<Arc<PanelSnapshot>>>,
        mut shutdown: broadcast::Receiver<()>,
    ) {
        loop {
            let current = snapshots.borrow_and_update().clone();
            if let Some(snapshot) = current {
                self.discover(&snapshot);
            }

            tokio::select! {
                changed = snapshots.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
                _ = shutdown.recv() => break,
            }
        }
        tracing::debug!("Zone discovery stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alarm::snapshot::SnapshotParts;
    use crate::config::Locale;
    use crate::resilience::{CircuitSnapshot, CircuitState};
    use crate::zones::ZoneState;
    use serde_json::Value;
    use std::collections::BTreeMap;

    fn snapshot(zones: &[(&str, &str, bool)]) -> PanelSnapshot {
        let zones = zones
            .iter()
            .map(|(key, friendly, open)| {
                (
                    key.to_string(),
                    ZoneState {
                        key: key.to_string(),
                        name: key.to_string(),
                        friendly_name: friendly.to_string(),
                        state: if *open { "open" } else { "closed" }.to_string(),
                        open: *open,
                        updated_at: 0,
                    },
                )
            })
            .collect::<BTreeMap<_, _>>();

        PanelSnapshot::compose(
            SnapshotParts {
                raw_mode: Some("set".to_string()),
                zones,
                available: true,
                last_error: None,
                circuit: CircuitSnapshot {
                    state: CircuitState::Closed,
                    failure_count: 0,
                    failure_threshold: 5,
                    last_failure_at: None,
                    retry_in_secs: None,
                },
            },
            Locale::De,
        )
    }

    #[test]
    fn test_zones_are_discovered_once() {
        let registry = EntityRegistry::new("home", None);

        let first = registry.discover(&snapshot(&[("Flur", "Flur", false)]));
        assert_eq!(first.len(), 1);

        let second = registry.discover(&snapshot(&[("Flur", "Flur", false), ("Bad", "Bad", true)]));
        assert_eq!(second.len(), 1);
        assert_eq!(second[0].key(), "Bad");
        assert_eq!(registry.zone_count(), 2);
    }

    #[test]
    fn test_render_all_includes_fixed_and_zone_entities() {
        let registry = EntityRegistry::new("home", Some("https://10.0.0.2".to_string()));
        let snapshot = snapshot(&[("Kueche", "Küche", true)]);
        registry.discover(&snapshot);

        let rendered = registry.render_all(Some(&snapshot));
        // Alarm panel, two binary sensors, six sensors, one zone.
        assert_eq!(rendered.len(), 10);

        let zone = rendered
            .iter()
            .find(|e| e.unique_id == "home_zone_Kueche")
            .unwrap();
        assert_eq!(zone.name, "Secvest Küche");
        assert_eq!(zone.state, Value::from("on"));
        assert_eq!(zone.attributes["secvest_state"], Value::from("open"));

        let alarm = rendered.iter().find(|e| e.unique_id == "home_alarm").unwrap();
        assert_eq!(alarm.state, Value::from("armed_away"));

        let count = rendered
            .iter()
            .find(|e| e.unique_id == "home_sensor_open_zones_count")
            .unwrap();
        assert_eq!(count.state, Value::from(1));
    }

    #[test]
    fn test_zone_entities_render_in_key_order() {
        let registry = EntityRegistry::new("home", None);
        let snapshot = snapshot(&[("Wohnzimmer", "Wohnzimmer", false), ("Bad", "Bad", false), ("Flur", "Flur", true)]);
        registry.discover(&snapshot);
        registry.discover(&snapshot);

        let zone_ids: Vec<String> = registry
            .render_all(Some(&snapshot))
            .into_iter()
            .map(|e| e.unique_id)
            .filter(|id| id.starts_with("home_zone_"))
            .collect();
        assert_eq!(zone_ids, vec!["home_zone_Bad", "home_zone_Flur", "home_zone_Wohnzimmer"]);
        assert_eq!(registry.zone_count(), 3);
    }

    #[test]
    fn test_zone_entity_falls_back_without_data() {
        let entity = ZoneSensor::new("home", "EG_Tuer");
        let rendered = entity.render(None);
        assert_eq!(rendered.name, "Secvest Zone EG Tuer");
        assert_eq!(rendered.state, Value::Null);
        assert!(rendered.attributes.is_empty());
    }

    #[tokio::test]
    async fn test_discovery_follows_snapshots() {
        let registry = Arc::new(EntityRegistry::new("home", None));
        let (tx, rx) = watch::channel(None);
        let (shutdown_tx, shutdown_rx) = broadcast::channel(1);

        let task = tokio::spawn(registry.clone().run_discovery(rx, shutdown_rx));
        tx.send_replace(Some(Arc::new(snapshot(&[("Flur", "Flur", false)]))));

        tokio::time::timeout(std::time::Duration::from_secs(5), async {
            while registry.zone_count() == 0 {
                tokio::task::yield_now().await;
            }
        })
        .await
        .unwrap();

        shutdown_tx.send(()).unwrap();
        task.await.unwrap();
    }
}
