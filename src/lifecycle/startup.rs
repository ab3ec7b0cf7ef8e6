//! Startup connectivity check.
//!
//! A plain TCP connect to the panel's host and port. Runs before the first
//! poll and under `--check`; it does not speak HTTP.

use std::time::Duration;

use thiserror::Error;
use tokio::net::TcpStream;

use crate::panel::transport::{normalize_base_url, TransportError};
use crate::resilience::timeouts::with_deadline;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReachabilitySettings {
    pub timeout: Duration,
    pub attempts: u32,
    pub pause: Duration,
}

impl Default for ReachabilitySettings {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(20),
            attempts: 3,
            pause: Duration::from_secs(1),
        }
    }
}

#[derive(Debug, Error)]
pub enum ReachabilityError {
    #[error(transparent)]
    InvalidHost(#[from] TransportError),

    #[error("cannot connect to {target} after {attempts} attempts: {last}")]
    Unreachable {
        target: String,
        attempts: u32,
        last: String,
    },
}

/// Host and port to connect to. The port defaults to 443 for https and 80 for http.
pub fn panel_address(host: &str) -> Result<(String, u16), TransportError> {
    let url = normalize_base_url(host)?;
    let hostname = url
        .host_str()
        .ok_or_else(|| TransportError::InvalidUrl(format!("{host}: missing host")))?
        .trim_start_matches('[')
        .trim_end_matches(']')
        .to_string();
    let port = url.port_or_known_default().unwrap_or(443);
    Ok((hostname, port))
}

/// Try to open a TCP connection to the panel.
pub async fn check_panel(host: &str, settings: ReachabilitySettings) -> Result<(), ReachabilityError> {
    let (hostname, port) = panel_address(host)?;
    let target = format!("{hostname}:{port}");
    let attempts = settings.attempts.max(1);
    let mut last = String::new();

    for attempt in 1..=attempts {
        match with_deadline(settings.timeout, TcpStream::connect((hostname.as_str(), port))).await {
            Ok(Ok(_stream)) => {
                tracing::info!(panel = %target, attempt, "Panel reachable");
                return Ok(());
            }
            Ok(Err(e)) => last = e.to_string(),
            Err(e) => last = e.to_string(),
        }

        tracing::warn!(panel = %target, attempt, error = %last, "Panel TCP connect failed");
        if attempt < attempts {
            tokio::time::sleep(settings.pause).await;
        }
    }

    Err(ReachabilityError::Unreachable {
        target,
        attempts,
        last,
    })
}
