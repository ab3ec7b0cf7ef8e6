use std::future::Future;

use axum::{extract::rejection::JsonRejection, extract::State, Json};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::alarm::PanelSnapshot;
use crate::entities::{DeviceInfo, EntityState};
use crate::http::error::ApiError;
use crate::http::server::AppState;
use crate::resilience::CircuitSnapshot;
use crate::zones::ZoneState;

#[derive(Serialize)]
pub struct SystemStatus {
    pub version: &'static str,
    pub available: bool,
    pub mode: Option<String>,
    pub human_mode: Option<String>,
    pub open_zones: usize,
    pub last_error: Option<String>,
    pub circuit: CircuitSnapshot,
    pub updated_at: Option<u64>,
}

#[derive(Serialize)]
pub struct EntitiesResponse {
    pub device: DeviceInfo,
    pub entities: Vec<EntityState>,
}

#[derive(Debug, Deserialize)]
pub struct SetModeRequest {
    pub mode: String,
}

pub async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

pub async fn get_status(State(state): State<AppState>) -> Json<SystemStatus> {
    let snapshot = state.coordinator.current();
    let snapshot = snapshot.as_deref();

    Json(SystemStatus {
        version: env!("CARGO_PKG_VERSION"),
        available: snapshot.is_some_and(|s| s.available),
        mode: snapshot.and_then(|s| s.raw_mode.clone()),
        human_mode: snapshot.and_then(|s| s.human_mode.clone()),
        open_zones: snapshot.map_or(0, PanelSnapshot::open_zone_count),
        last_error: snapshot.and_then(|s| s.last_error.clone()),
        circuit: state.coordinator.client().breaker().snapshot(),
        updated_at: snapshot.map(|s| s.updated_at),
    })
}

pub async fn get_snapshot(State(state): State<AppState>) -> Result<Json<PanelSnapshot>, ApiError> {
    let snapshot = state.coordinator.current().ok_or(ApiError::NoData)?;
    Ok(Json((*snapshot).clone()))
}

pub async fn get_zones(State(state): State<AppState>) -> Json<Vec<ZoneState>> {
    let zones = match state.coordinator.current() {
        Some(snapshot) => snapshot.zones.values().cloned().collect(),
        None => state.coordinator.cache().all().into_values().collect(),
    };
    Json(zones)
}

pub async fn get_entities(State(state): State<AppState>) -> Json<EntitiesResponse> {
    let snapshot = state.coordinator.current();
    if let Some(snapshot) = &snapshot {
        state.registry.discover(snapshot);
    }

    Json(EntitiesResponse {
        device: state.registry.device().clone(),
        entities: state.registry.render_all(snapshot.as_deref()),
    })
}

/// Run a panel command on its own task. The task finishes even when the
/// caller gives up or the response deadline passes.
async fn run_command<T, F>(state: &AppState, command: F) -> Result<T, ApiError>
where
    T: Send + 'static,
    F: Future<Output = Result<T, ApiError>> + Send + 'static,
{
    let mut task = tokio::spawn(command);
    match tokio::time::timeout(state.command_timeout, &mut task).await {
        Ok(Ok(result)) => result,
        Ok(Err(e)) => {
            tracing::error!(error = %e, "Command task failed");
            Err(ApiError::Internal(e.to_string()))
        }
        Err(_) => {
            tracing::warn!(
                timeout = ?state.command_timeout,
                "Command still running past the response deadline"
            );
            Err(ApiError::Timeout(state.command_timeout))
        }
    }
}

pub async fn refresh_zones(State(state): State<AppState>) -> Result<Json<Vec<ZoneState>>, ApiError> {
    let coordinator = state.coordinator.clone();
    let zones = run_command(&state, async move {
        coordinator.refresh_zones_now().await.map_err(ApiError::from)
    })
    .await?;
    Ok(Json(zones.into_values().collect()))
}

pub async fn arm_home(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    let controller = state.controller.clone();
    run_command(&state, async move { controller.arm_home().await.map_err(ApiError::from) }).await?;
    Ok(accepted("partset"))
}

pub async fn arm_away(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    let controller = state.controller.clone();
    run_command(&state, async move { controller.arm_away().await.map_err(ApiError::from) }).await?;
    Ok(accepted("set"))
}

pub async fn disarm(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    let controller = state.controller.clone();
    run_command(&state, async move { controller.disarm().await.map_err(ApiError::from) }).await?;
    Ok(accepted("unset"))
}

pub async fn set_mode(
    State(state): State<AppState>,
    payload: Result<Json<SetModeRequest>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let Json(request) = payload.map_err(|rejection| ApiError::InvalidBody(rejection.body_text()))?;

    let controller = state.controller.clone();
    let mode = request.mode.clone();
    run_command(&state, async move { controller.set_mode(&mode).await.map_err(ApiError::from) }).await?;
    Ok(accepted(&request.mode))
}

fn accepted(mode: &str) -> Json<Value> {
    Json(json!({ "status": "ok", "mode": mode }))
}
