//! API server setup.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::alarm::{AlarmController, Coordinator};
use crate::entities::EntityRegistry;
use crate::http::auth::api_auth_middleware;
use crate::http::handlers::*;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub coordinator: Arc<Coordinator>,
    pub controller: Arc<AlarmController>,
    pub registry: Arc<EntityRegistry>,
    pub api_key: Arc<str>,
    /// How long a command request waits for its result.
    pub command_timeout: Duration,
}

/// Headroom between the command deadline and the router-wide timeout, so a
/// slow command is answered with a JSON timeout error.
const ROUTER_TIMEOUT_MARGIN: Duration = Duration::from_secs(10);

/// Build the API router with all middleware layers.
#[allow(deprecated)]
pub fn build_router(state: AppState) -> Router {
    let request_timeout = state.command_timeout + ROUTER_TIMEOUT_MARGIN;
    let api = Router::new()
        .route("/api/status", get(get_status))
        .route("/api/snapshot", get(get_snapshot))
        .route("/api/zones", get(get_zones))
        .route("/api/entities", get(get_entities))
        .route("/api/zones/refresh", post(refresh_zones))
        .route("/api/alarm/arm_home", post(arm_home))
        .route("/api/alarm/arm_away", post(arm_away))
        .route("/api/alarm/disarm", post(disarm))
        .route("/api/mode", post(set_mode))
        .route_layer(middleware::from_fn_with_state(state.clone(), api_auth_middleware));

    Router::new()
        .route("/health", get(health))
        .merge(api)
        .with_state(state)
        .layer(TimeoutLayer::new(request_timeout))
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(TraceLayer::new_for_http())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
}

/// HTTP API server.
pub struct ApiServer {
    router: Router,
}

impl ApiServer {
    pub fn new(state: AppState) -> Self {
        Self {
            router: build_router(state),
        }
    }

    /// Serve until the shutdown signal fires.
    pub async fn run(self, listener: TcpListener, mut shutdown: broadcast::Receiver<()>) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "API server starting");

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("API server shutting down");
            })
            .await?;

        tracing::info!("API server stopped");
        Ok(())
    }
}
