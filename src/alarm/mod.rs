//! Alarm subsystem.
//!
//! # Data Flow
//! ```text
//! Coordinator (coordinator.rs)
//!     poll loop: mode every scan interval, zones every zones interval
//!     → ZoneCache + PanelSnapshot (snapshot.rs)
//!     → watch channel → entity registry, HTTP API
//!
//! AlarmController (controller.rs)
//!     arm: invalidate cache → refresh zones once → check open zones → PUT mode
//!     disarm: PUT mode
//!     → request coordinator refresh
//! ```

pub mod controller;
pub mod coordinator;
pub mod snapshot;

pub use controller::{AlarmController, ArmError, ArmMode, ArmPolicy, ArmRequest};
pub use coordinator::{Coordinator, CoordinatorOptions};
pub use snapshot::PanelSnapshot;
