//! Host-facing HTTP API.
//!
//! # Data Flow
//! ```text
//! Host request
//!     → SetRequestId / Trace / Timeout layers (server.rs)
//!     → bearer auth (auth.rs), except /health
//!     → handlers.rs (read snapshot, run alarm commands)
//!     → error.rs (map failures to status + JSON body)
//! ```

pub mod auth;
pub mod error;
pub mod handlers;
pub mod server;

pub use error::ApiError;
pub use server::{build_router, ApiServer, AppState};
