//! Polling coordinator.
//!
//! Fetches the mode every scan interval and the zones whenever the
//! accumulated scan time reaches the zones interval (or no zones were ever
//! loaded). Each cycle publishes a [`PanelSnapshot`] on a watch channel. On
//! failure the previous snapshot is republished as unavailable.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwap;
use tokio::sync::{broadcast, watch, Mutex, Notify};

use crate::alarm::snapshot::{PanelSnapshot, SnapshotParts};
use crate::config::{BridgeConfig, Locale};
use crate::observability::metrics;
use crate::panel::{PanelError, SecvestClient};
use crate::resilience::CircuitState;
use crate::zones::{ZoneCache, ZoneState};

/// Options that can change while running.
#[derive(Debug, Clone, PartialEq)]
pub struct CoordinatorOptions {
    pub scan_interval: Duration,
    pub zones_interval: Duration,
    pub zone_names: BTreeMap<String, String>,
    pub locale: Locale,
}

impl From<&BridgeConfig> for CoordinatorOptions {
    fn from(config: &BridgeConfig) -> Self {
        Self {
            scan_interval: Duration::from_secs(config.polling.scan_interval_secs.max(1)),
            zones_interval: Duration::from_secs(config.polling.zones_interval_secs.max(1)),
            zone_names: config.zone_names.clone(),
            locale: config.locale,
        }
    }
}

#[derive(Debug, Default)]
struct CycleState {
    zones_tick: Duration,
}

pub struct Coordinator {
    client: Arc<SecvestClient>,
    cache: Arc<ZoneCache>,
    options: ArcSwap<CoordinatorOptions>,
    snapshot_tx: watch::Sender<Option<Arc<PanelSnapshot>>>,
    cycle: Mutex<CycleState>,
    wake: Notify,
}

impl Coordinator {
    pub fn new(client: Arc<SecvestClient>, cache: Arc<ZoneCache>, options: CoordinatorOptions) -> Self {
        let (snapshot_tx, _) = watch::channel(None);
        Self {
            client,
            cache,
            options: ArcSwap::from_pointee(options),
            snapshot_tx,
            cycle: Mutex::new(CycleState::default()),
            wake: Notify::new(),
        }
    }

    pub fn client(&self) -> &Arc<SecvestClient> {
        &self.client
    }

    pub fn cache(&self) -> &Arc<ZoneCache> {
        &self.cache
    }

    pub fn options(&self) -> Arc<CoordinatorOptions> {
        self.options.load_full()
    }

    pub fn locale(&self) -> Locale {
        self.options.load().locale
    }

    /// Apply reloaded options. Zone names take effect immediately.
    pub fn update_options(&self, options: CoordinatorOptions) {
        let names_changed = self.options.load().zone_names != options.zone_names;
        self.options.store(Arc::new(options));
        if names_changed {
            self.cache.apply_names(&self.options.load().zone_names);
            if let Some(current) = self.current() {
                self.publish(current.parts());
            }
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<Arc<PanelSnapshot>>> {
        self.snapshot_tx.subscribe()
    }

    /// Latest published snapshot, if any cycle has completed.
    pub fn current(&self) -> Option<Arc<PanelSnapshot>> {
        self.snapshot_tx.borrow().clone()
    }

    /// Wake the poll loop for an immediate cycle.
    pub fn request_refresh(&self) {
        self.wake.notify_one();
    }

    /// Run one update cycle.
    ///
    /// On failure with a previous snapshot, that snapshot is republished as
    /// unavailable and returned. Without one, the error is returned.
    pub async fn refresh(&self) -> Result<Arc<PanelSnapshot>, PanelError> {
        let mut cycle = self.cycle.lock().await;
        let options = self.options.load_full();

        match self.fetch(&mut cycle, &options).await {
            Ok((raw_mode, zones)) => Ok(self.publish(SnapshotParts {
                raw_mode: Some(raw_mode),
                zones,
                available: true,
                last_error: None,
                circuit: self.client.breaker().snapshot(),
            })),
            Err(e) => {
                let message = error_text(&e);
                let circuit = self.client.breaker().snapshot();
                if !matches!(e, PanelError::CircuitOpen { .. }) && circuit.state != CircuitState::Open {
                    tracing::warn!(
                        failures = circuit.failure_count,
                        threshold = circuit.failure_threshold,
                        error = %message,
                        "Secvest temporary error ({}/{})",
                        circuit.failure_count,
                        circuit.failure_threshold
                    );
                }

                match self.current() {
                    Some(previous) => Ok(self.publish(SnapshotParts {
                        available: false,
                        last_error: Some(message),
                        circuit,
                        ..previous.parts()
                    })),
                    None => Err(e),
                }
            }
        }
    }

    async fn fetch(
        &self,
        cycle: &mut CycleState,
        options: &CoordinatorOptions,
    ) -> Result<(String, BTreeMap<String, ZoneState>), PanelError> {
        let raw_mode = self.client.get_mode().await?;

        cycle.zones_tick += options.scan_interval;
        let zones = if cycle.zones_tick >= options.zones_interval || !self.cache.is_populated() {
            let raw = self.client.get_zones().await?;
            cycle.zones_tick = Duration::ZERO;
            self.cache.replace(&raw, &options.zone_names)
        } else {
            self.cache.all()
        };

        Ok((raw_mode, zones))
    }

    /// Fetch zones now and publish them, bypassing the zones interval.
    pub async fn refresh_zones_now(&self) -> Result<BTreeMap<String, ZoneState>, PanelError> {
        let mut cycle = self.cycle.lock().await;
        let options = self.options.load_full();

        let raw = self.client.get_zones().await?;
        let zones = self.cache.replace(&raw, &options.zone_names);
        cycle.zones_tick = Duration::ZERO;

        let (raw_mode, last_error) = match self.current() {
            Some(previous) => (previous.raw_mode.clone(), previous.last_error.clone()),
            None => (None, None),
        };
        self.publish(SnapshotParts {
            raw_mode,
            zones: zones.clone(),
            available: true,
            last_error,
            circuit: self.client.breaker().snapshot(),
        });

        Ok(zones)
    }

    /// Record an error on the last-error sensor without touching other state.
    pub async fn record_error(&self, message: impl Into<String>) {
        let _cycle = self.cycle.lock().await;
        let message = message.into();

        let parts = match self.current() {
            Some(previous) => SnapshotParts {
                last_error: Some(message),
                circuit: self.client.breaker().snapshot(),
                ..previous.parts()
            },
            None => SnapshotParts {
                raw_mode: None,
                zones: self.cache.all(),
                available: false,
                last_error: Some(message),
                circuit: self.client.breaker().snapshot(),
            },
        };
        self.publish(parts);
    }

    fn publish(&self, parts: SnapshotParts) -> Arc<PanelSnapshot> {
        let snapshot = Arc::new(PanelSnapshot::compose(parts, self.locale()));
        metrics::set_open_zones(snapshot.open_zone_count());
        metrics::set_circuit_state(snapshot.circuit.state);
        self.snapshot_tx.send_replace(Some(snapshot.clone()));
        snapshot
    }

    /// Poll until shutdown.
    pub async fn run(self: Arc<Self>, mut shutdown: broadcast::Receiver<()>) {
        tracing::info!(
            scan_interval = ?self.options.load().scan_interval,
            zones_interval = ?self.options.load().zones_interval,
            "Coordinator started"
        );

        loop {
            if let Err(e) = self.refresh().await {
                tracing::warn!(error = %error_text(&e), "Update cycle failed with no previous data");
            }

            let scan_interval = self.options.load().scan_interval;
            tokio::select! {
                _ = tokio::time::sleep(scan_interval) => {}
                _ = self.wake.notified() => {
                    tracing::debug!("Refresh requested");
                }
                _ = shutdown.recv() => {
                    tracing::info!("Coordinator stopping");
                    break;
                }
            }
        }
    }
}

/// Text for the last-error sensor.
pub fn error_text(error: &PanelError) -> String {
    match error {
        PanelError::CircuitOpen { retry_in } => {
            format!("Circuit breaker active (retry in {}s)", retry_in.as_secs())
        }
        other => other.to_string(),
    }
}
