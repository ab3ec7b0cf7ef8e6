//! API error responses.

use std::time::Duration;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::alarm::coordinator::error_text;
use crate::alarm::ArmError;
use crate::panel::PanelError;

#[derive(Debug)]
pub enum ApiError {
    Arm(ArmError),
    Panel(PanelError),
    NoData,
    /// Request body could not be read as a command.
    InvalidBody(String),
    /// The command outlived the response deadline and is still running.
    Timeout(Duration),
    /// The command task panicked.
    Internal(String),
}

impl From<ArmError> for ApiError {
    fn from(e: ArmError) -> Self {
        Self::Arm(e)
    }
}

impl From<PanelError> for ApiError {
    fn from(e: PanelError) -> Self {
        Self::Panel(e)
    }
}

fn panel_status(error: &PanelError) -> StatusCode {
    match error {
        PanelError::CircuitOpen { .. } => StatusCode::SERVICE_UNAVAILABLE,
        _ => StatusCode::BAD_GATEWAY,
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Arm(ArmError::InvalidMode { .. }) => StatusCode::BAD_REQUEST,
            Self::Arm(ArmError::OpenZones { .. }) => StatusCode::CONFLICT,
            Self::Arm(ArmError::StatusUnknown) | Self::NoData => StatusCode::SERVICE_UNAVAILABLE,
            Self::Arm(ArmError::ZoneRefresh(e) | ArmError::Command(e)) => panel_status(e),
            Self::Panel(e) => panel_status(e),
            Self::InvalidBody(_) => StatusCode::BAD_REQUEST,
            Self::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Arm(e) => match e.panel_error() {
                Some(PanelError::CircuitOpen { .. }) => "circuit_open",
                _ => e.kind(),
            },
            Self::Panel(e) => e.kind(),
            Self::NoData => "status_unknown",
            Self::InvalidBody(_) => "invalid_mode",
            Self::Timeout(_) => "timeout",
            Self::Internal(_) => "internal",
        }
    }

    pub fn message(&self) -> String {
        match self {
            Self::Arm(e) => e.to_string(),
            Self::Panel(e) => error_text(e),
            Self::NoData => "Secvest status currently unknown".to_string(),
            Self::InvalidBody(detail) => {
                format!("invalid request body, expected {{\"mode\": \"set|partset|unset\"}}: {detail}")
            }
            Self::Timeout(after) => format!(
                "command still running after {}s; check /api/status for the outcome",
                after.as_secs()
            ),
            Self::Internal(detail) => format!("command failed unexpectedly: {detail}"),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::warn!(status = status.as_u16(), error = %self.message(), "API request failed");
        }
        (status, Json(json!({ "error": self.kind(), "message": self.message() }))).into_response()
    }
}
