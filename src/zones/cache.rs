//! Last-known zone states.
//!
//! The cache distinguishes "has data" from "fresh": [`ZoneCache::invalidate`]
//! keeps the entries for display but makes [`ZoneCache::fresh`] return `None`
//! until the next successful [`ZoneCache::replace`]. Arm decisions only read
//! fresh data.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use dashmap::DashMap;
use serde::Serialize;

use crate::panel::RawZone;
use crate::zones::naming::{friendly_name, normalize_name};

/// State of one zone contact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ZoneState {
    pub key: String,
    pub name: String,
    pub friendly_name: String,
    pub state: String,
    pub open: bool,
    pub updated_at: u64,
}

impl ZoneState {
    pub fn from_raw(raw: &RawZone, overrides: &BTreeMap<String, String>, updated_at: u64) -> Self {
        let key = normalize_name(&raw.name);
        Self {
            friendly_name: friendly_name(&key, &raw.name, overrides),
            name: raw.name.clone(),
            open: raw.state == "open",
            state: raw.state.clone(),
            updated_at,
            key,
        }
    }
}

#[derive(Debug, Default)]
pub struct ZoneCache {
    zones: DashMap<String, ZoneState>,
    populated: AtomicBool,
    fresh: AtomicBool,
}

impl ZoneCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace all zones with a freshly fetched payload.
    pub fn replace(&self, raw: &[RawZone], overrides: &BTreeMap<String, String>) -> BTreeMap<String, ZoneState> {
        let now = epoch_secs();
        let states: BTreeMap<String, ZoneState> = raw
            .iter()
            .map(|zone| {
                let state = ZoneState::from_raw(zone, overrides, now);
                (state.key.clone(), state)
            })
            .collect();

        self.zones.retain(|key, _| states.contains_key(key));
        for (key, state) in &states {
            self.zones.insert(key.clone(), state.clone());
        }
        self.populated.store(true, Ordering::Release);
        self.fresh.store(true, Ordering::Release);

        states
    }

    /// Mark the cached states as stale. Entries stay readable via [`all`](Self::all).
    pub fn invalidate(&self) {
        self.fresh.store(false, Ordering::Release);
    }

    /// True once any zone payload was stored.
    pub fn is_populated(&self) -> bool {
        self.populated.load(Ordering::Acquire)
    }

    pub fn is_fresh(&self) -> bool {
        self.fresh.load(Ordering::Acquire)
    }

    /// All zones ordered by key, fresh or not.
    pub fn all(&self) -> BTreeMap<String, ZoneState> {
        self.zones
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().clone()))
            .collect()
    }

    /// Zones refreshed since the last invalidation.
    pub fn fresh(&self) -> Option<BTreeMap<String, ZoneState>> {
        self.is_fresh().then(|| self.all())
    }

    /// Recompute friendly names after the override map changed.
    pub fn apply_names(&self, overrides: &BTreeMap<String, String>) {
        for mut entry in self.zones.iter_mut() {
            let zone = entry.value_mut();
            zone.friendly_name = friendly_name(&zone.key, &zone.name, overrides);
        }
    }
}

pub(crate) fn epoch_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(name: &str, state: &str) -> RawZone {
        RawZone {
            name: name.to_string(),
            state: state.to_string(),
        }
    }

    #[test]
    fn test_replace_builds_states() {
        let cache = ZoneCache::new();
        assert!(!cache.is_populated());

        let states = cache.replace(
            &[raw("Küche Fenster", "open"), raw("Flur", "closed")],
            &BTreeMap::new(),
        );

        let kitchen = &states["Kueche_Fenster"];
        assert!(kitchen.open);
        assert_eq!(kitchen.friendly_name, "Kueche Fenster");
        assert_eq!(kitchen.name, "Küche Fenster");
        assert!(!states["Flur"].open);
        assert!(cache.is_populated());
        assert!(cache.is_fresh());
    }

    #[test]
    fn test_only_open_state_counts_as_open() {
        let zone = ZoneState::from_raw(&raw("Bad", "tamper"), &BTreeMap::new(), 0);
        assert!(!zone.open);
    }

    #[test]
    fn test_invalidate_hides_fresh_view_only() {
        let cache = ZoneCache::new();
        cache.replace(&[raw("Flur", "closed")], &BTreeMap::new());

        cache.invalidate();
        assert!(cache.fresh().is_none());
        assert_eq!(cache.all().len(), 1);

        cache.replace(&[raw("Flur", "open")], &BTreeMap::new());
        let fresh = cache.fresh().unwrap();
        assert!(fresh["Flur"].open);
    }

    #[test]
    fn test_replace_drops_vanished_zones() {
        let cache = ZoneCache::new();
        cache.replace(&[raw("A", "closed"), raw("B", "closed")], &BTreeMap::new());
        cache.replace(&[raw("B", "open")], &BTreeMap::new());

        let all = cache.all();
        assert_eq!(all.keys().collect::<Vec<_>>(), vec!["B"]);
    }

    #[test]
    fn test_apply_names() {
        let cache = ZoneCache::new();
        cache.replace(&[raw("EG Tür", "closed")], &BTreeMap::new());

        let mut overrides = BTreeMap::new();
        overrides.insert("EG_Tuer".to_string(), "Haustür".to_string());
        cache.apply_names(&overrides);

        assert_eq!(cache.all()["EG_Tuer"].friendly_name, "Haustür");
    }
}
