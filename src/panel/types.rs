//! Panel data types and the panel error taxonomy.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::panel::transport::TransportError;
use crate::resilience::{BreakerRejected, Retryable};

/// Partition mode as the panel names it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PanelMode {
    #[serde(rename = "set")]
    Set,
    #[serde(rename = "partset")]
    PartSet,
    #[serde(rename = "unset")]
    Unset,
}

impl PanelMode {
    pub const ALL: [PanelMode; 3] = [PanelMode::Set, PanelMode::PartSet, PanelMode::Unset];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Set => "set",
            Self::PartSet => "partset",
            Self::Unset => "unset",
        }
    }

    /// Parse a wire name. Unknown names yield `None`.
    pub fn parse(raw: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|mode| mode.as_str() == raw)
    }
}

impl fmt::Display for PanelMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One zone entry as reported by the panel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawZone {
    pub name: String,
    pub state: String,
}

impl RawZone {
    /// Extract zones from a zones payload. Entries that are not objects or lack
    /// a string `name` and `state` are skipped.
    pub fn parse_list(payload: &Value) -> Result<Vec<RawZone>, PanelError> {
        let entries = payload.as_array().ok_or_else(|| {
            PanelError::InvalidResponse(format!("invalid zones payload: {}", truncate(&payload.to_string(), 200)))
        })?;

        Ok(entries
            .iter()
            .filter_map(|entry| {
                let name = entry.get("name")?.as_str()?;
                let state = entry.get("state")?.as_str()?;
                Some(RawZone {
                    name: name.to_string(),
                    state: state.to_string(),
                })
            })
            .collect())
    }
}

/// Errors from panel operations.
#[derive(Debug, Error)]
pub enum PanelError {
    #[error("circuit breaker open, retry in {}s", .retry_in.as_secs())]
    CircuitOpen { retry_in: Duration },

    #[error("request failed after {attempts} attempts: {last}")]
    RetriesExhausted { attempts: u32, last: Box<PanelError> },

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("server error {status} from Secvest")]
    ServerError { status: u16 },

    #[error("auth failed ({status}) for {path}")]
    Auth { status: u16, path: String },

    #[error("409 Conflict from Secvest: {body}")]
    Conflict { body: String },

    #[error("HTTP {status} from Secvest: {body}")]
    Http { status: u16, body: String },

    #[error("no endpoint found, tried {paths}")]
    NotFound { paths: String },

    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

impl PanelError {
    /// Stable label used in metrics and API bodies.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::CircuitOpen { .. } => "circuit_open",
            Self::RetriesExhausted { .. } => "retries_exhausted",
            Self::Transport(_) => "transport",
            Self::ServerError { .. } => "server_error",
            Self::Auth { .. } => "auth",
            Self::Conflict { .. } => "conflict",
            Self::Http { .. } => "http",
            Self::NotFound { .. } => "not_found",
            Self::InvalidResponse(_) => "invalid_response",
        }
    }

    /// Whether this outcome counts as a breaker failure. Anything else means
    /// the panel answered.
    pub fn trips_breaker(&self) -> bool {
        matches!(self, Self::RetriesExhausted { .. } | Self::InvalidResponse(_))
    }
}

impl Retryable for PanelError {
    fn is_retryable(&self) -> bool {
        match self {
            Self::Transport(e) => e.is_transient(),
            Self::ServerError { .. } => true,
            _ => false,
        }
    }
}

impl From<BreakerRejected> for PanelError {
    fn from(rejected: BreakerRejected) -> Self {
        Self::CircuitOpen {
            retry_in: rejected.retry_in,
        }
    }
}

/// Cut `text` to at most `max` characters.
pub fn truncate(text: &str, max: usize) -> String {
    text.chars().take(max).collect()
}
