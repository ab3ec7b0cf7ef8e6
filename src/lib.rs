//! Local bridge to an ABUS Secvest alarm panel.

pub mod alarm;
pub mod config;
pub mod entities;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod panel;
pub mod resilience;
pub mod zones;

pub use alarm::{AlarmController, Coordinator};
pub use config::schema::BridgeConfig;
pub use http::ApiServer;
pub use lifecycle::Shutdown;
pub use panel::SecvestClient;
