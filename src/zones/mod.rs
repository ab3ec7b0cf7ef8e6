//! Zone state: naming rules and the last-known zone cache.

pub mod cache;
pub mod naming;

pub use cache::{ZoneCache, ZoneState};
pub use naming::{friendly_name, mode_label, normalize_name, spoken_zone_list};
