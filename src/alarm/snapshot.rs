//! Composed panel state published by the coordinator.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::config::Locale;
use crate::panel::PanelMode;
use crate::resilience::CircuitSnapshot;
use crate::zones::cache::epoch_secs;
use crate::zones::{mode_label, spoken_zone_list, ZoneState};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PanelSnapshot {
    pub raw_mode: Option<String>,
    pub mode: Option<PanelMode>,
    pub human_mode: Option<String>,
    pub zones: BTreeMap<String, ZoneState>,
    pub open_zone_names: Vec<String>,
    pub open_zones_csv: String,
    pub open_zones_spoken: String,
    pub available: bool,
    pub last_error: Option<String>,
    pub circuit: CircuitSnapshot,
    pub updated_at: u64,
}

/// Inputs a snapshot is derived from.
#[derive(Debug, Clone)]
pub struct SnapshotParts {
    pub raw_mode: Option<String>,
    pub zones: BTreeMap<String, ZoneState>,
    pub available: bool,
    pub last_error: Option<String>,
    pub circuit: CircuitSnapshot,
}

impl PanelSnapshot {
    /// Derive mode labels and open-zone summaries from the parts.
    pub fn compose(parts: SnapshotParts, locale: Locale) -> Self {
        let open_zone_names: Vec<String> = parts
            .zones
            .values()
            .filter(|zone| zone.open)
            .map(|zone| zone.friendly_name.clone())
            .collect();

        Self {
            mode: parts.raw_mode.as_deref().and_then(PanelMode::parse),
            human_mode: mode_label(parts.raw_mode.as_deref(), locale),
            open_zones_csv: open_zone_names.join(", "),
            open_zones_spoken: spoken_zone_list(&open_zone_names, locale),
            open_zone_names,
            raw_mode: parts.raw_mode,
            zones: parts.zones,
            available: parts.available,
            last_error: parts.last_error,
            circuit: parts.circuit,
            updated_at: epoch_secs(),
        }
    }

    /// The parts this snapshot was built from, for recomposition.
    pub fn parts(&self) -> SnapshotParts {
        SnapshotParts {
            raw_mode: self.raw_mode.clone(),
            zones: self.zones.clone(),
            available: self.available,
            last_error: self.last_error.clone(),
            circuit: self.circuit.clone(),
        }
    }

    pub fn open_zone_count(&self) -> usize {
        self.open_zone_names.len()
    }
}
