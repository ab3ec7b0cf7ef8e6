//! Panel access subsystem.
//!
//! # Data Flow
//! ```text
//! SecvestClient (client.rs)
//!     → circuit breaker permit
//!     → retry loop, one attempt = ordered path fallback
//!     → PanelTransport (transport.rs: reqwest, or mock.rs in tests)
//!     → response classification into PanelError (types.rs)
//! ```

pub mod client;
pub mod mock;
pub mod transport;
pub mod types;

pub use client::SecvestClient;
pub use transport::{PanelMethod, PanelRequest, PanelResponse, PanelTransport, ReqwestTransport, TransportError};
pub use types::{PanelError, PanelMode, RawZone};
