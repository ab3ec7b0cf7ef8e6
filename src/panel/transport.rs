//! HTTP transport to the panel's local REST API.
//!
//! The `PanelTransport` trait separates request execution from retry and
//! classification logic, so the client can be driven by a scripted mock.

use std::fmt;

use async_trait::async_trait;
use reqwest::header::{ACCEPT, CONNECTION};
use serde_json::Value;
use thiserror::Error;
use url::Url;

use crate::config::PanelConfig;
use crate::resilience::timeouts::Deadlines;

/// HTTP methods the panel API uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PanelMethod {
    Get,
    Put,
}

impl fmt::Display for PanelMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Get => "GET",
            Self::Put => "PUT",
        })
    }
}

/// A single request against one panel path.
#[derive(Debug, Clone, PartialEq)]
pub struct PanelRequest {
    pub method: PanelMethod,
    pub path: String,
    pub body: Option<Value>,
}

/// Raw response from the panel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PanelResponse {
    pub status: u16,
    pub body: String,
}

impl PanelResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }
}

/// Failures below HTTP: no status code was received.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("request timed out")]
    Timeout,

    #[error("connection failed: {0}")]
    Connect(String),

    #[error("I/O error: {0}")]
    Io(String),

    #[error("invalid panel URL: {0}")]
    InvalidUrl(String),

    #[error("failed to build request: {0}")]
    Build(String),
}

impl TransportError {
    /// Timeouts, refused connections and dropped sockets may succeed on retry.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Timeout | Self::Connect(_) | Self::Io(_))
    }
}

impl From<reqwest::Error> for TransportError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            Self::Timeout
        } else if e.is_connect() {
            Self::Connect(e.to_string())
        } else if e.is_builder() {
            Self::Build(e.to_string())
        } else {
            Self::Io(e.to_string())
        }
    }
}

/// Executes requests against the panel.
#[async_trait]
pub trait PanelTransport: Send + Sync {
    async fn send(&self, request: &PanelRequest) -> Result<PanelResponse, TransportError>;
}

/// Parse the configured host into a base URL. A missing scheme means https.
pub fn normalize_base_url(host: &str) -> Result<Url, TransportError> {
    let host = host.trim().trim_end_matches('/');
    if host.is_empty() {
        return Err(TransportError::InvalidUrl("host is empty".to_string()));
    }

    let candidate = if host.contains("://") {
        host.to_string()
    } else {
        format!("https://{host}")
    };

    let url = Url::parse(&candidate).map_err(|e| TransportError::InvalidUrl(format!("{candidate}: {e}")))?;
    match url.scheme() {
        "http" | "https" => {}
        other => {
            return Err(TransportError::InvalidUrl(format!(
                "unsupported scheme '{other}'"
            )))
        }
    }
    if url.host_str().is_none() {
        return Err(TransportError::InvalidUrl(format!("{candidate}: missing host")));
    }
    Ok(url)
}

/// Production transport using reqwest.
///
/// Sends Basic auth, `Accept: application/json` and `Connection: close` on
/// every request. Panels ship self-signed certificates, so verification is
/// off unless `verify_ssl` is set.
#[derive(Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
    base: String,
    username: String,
    password: String,
}

impl ReqwestTransport {
    pub fn new(panel: &PanelConfig, deadlines: Deadlines) -> Result<Self, TransportError> {
        let base = normalize_base_url(&panel.host)?;
        let client = reqwest::Client::builder()
            .danger_accept_invalid_certs(!panel.verify_ssl)
            .connect_timeout(deadlines.connect)
            .timeout(deadlines.request)
            .pool_max_idle_per_host(0)
            .build()
            .map_err(|e| TransportError::Build(e.to_string()))?;

        Ok(Self {
            client,
            base: base.as_str().trim_end_matches('/').to_string(),
            username: panel.username.clone(),
            password: panel.password.clone(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base
    }
}

#[async_trait]
impl PanelTransport for ReqwestTransport {
    #[tracing::instrument(skip(self, request), fields(method = %request.method, path = %request.path))]
    async fn send(&self, request: &PanelRequest) -> Result<PanelResponse, TransportError> {
        let url = format!("{}{}", self.base, request.path);
        let method = match request.method {
            PanelMethod::Get => reqwest::Method::GET,
            PanelMethod::Put => reqwest::Method::PUT,
        };

        let mut builder = self
            .client
            .request(method, &url)
            .basic_auth(&self.username, Some(&self.password))
            .header(ACCEPT, "application/json")
            .header(CONNECTION, "close");
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder.send().await.map_err(|e| {
            tracing::debug!(url = %url, error = %e, "Panel request failed");
            TransportError::from(e)
        })?;

        let status = response.status().as_u16();
        let body = response.text().await?;

        tracing::debug!(status, response_len = body.len(), "Panel request completed");
        Ok(PanelResponse { status, body })
    }
}
