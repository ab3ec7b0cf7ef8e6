//! Secvest bridge daemon.
//!
//! # Architecture Overview
//!
//! ```text
//!     ┌───────────────┐   poll    ┌──────────────┐  snapshots  ┌──────────────┐
//!     │ Secvest panel │◀──────────│ coordinator  │────────────▶│   entities   │
//!     │  (HTTPS API)  │           │ + zone cache │             │   registry   │
//!     └───────▲───────┘           └──────▲───────┘             └──────┬───────┘
//!             │ retry + breaker          │ refresh before arm         │
//!             │                   ┌──────┴───────┐             ┌──────▼───────┐
//!             └───────────────────│  controller  │◀────────────│   HTTP API   │
//!                   PUT mode      └──────────────┘   commands  └──────────────┘
//! ```

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tokio::net::TcpListener;

use secvest_bridge::alarm::{AlarmController, ArmPolicy, Coordinator, CoordinatorOptions};
use secvest_bridge::config::validation::config_warnings;
use secvest_bridge::config::watcher::ConfigWatcher;
use secvest_bridge::config::load_config;
use secvest_bridge::entities::EntityRegistry;
use secvest_bridge::http::{ApiServer, AppState};
use secvest_bridge::lifecycle::reload::apply_live_config;
use secvest_bridge::lifecycle::signals::wait_for_signal;
use secvest_bridge::lifecycle::startup::{check_panel, ReachabilitySettings};
use secvest_bridge::lifecycle::Shutdown;
use secvest_bridge::observability::{logging, metrics};
use secvest_bridge::panel::transport::normalize_base_url;
use secvest_bridge::zones::ZoneCache;
use secvest_bridge::SecvestClient;

const SHUTDOWN_GRACE: Duration = Duration::from_secs(10);

#[derive(Parser)]
#[command(name = "secvest-bridge")]
#[command(about = "Local bridge for ABUS Secvest alarm panels", long_about = None)]
struct Args {
    /// Path to the TOML configuration file.
    #[arg(short, long, default_value = "secvest.toml")]
    config: PathBuf,

    /// Validate the configuration, check the panel and exit.
    #[arg(long)]
    check: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let config = load_config(&args.config)?;
    logging::init_logging(&config.observability);

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        config = %args.config.display(),
        "secvest-bridge starting"
    );
    for warning in config_warnings(&config) {
        tracing::warn!("{}", warning);
    }

    if args.check {
        check_panel(&config.panel.host, ReachabilitySettings::default()).await?;
        tracing::info!("Configuration valid and panel reachable");
        return Ok(());
    }

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => {
                if let Err(e) = metrics::init_metrics(addr) {
                    tracing::error!(error = %e, "Failed to start metrics exporter");
                }
            }
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    if let Err(e) = check_panel(&config.panel.host, ReachabilitySettings::default()).await {
        tracing::warn!(error = %e, "Panel not reachable yet; polling will keep trying");
    }

    let client = Arc::new(SecvestClient::from_config(&config)?);
    let coordinator = Arc::new(Coordinator::new(
        client,
        Arc::new(ZoneCache::new()),
        CoordinatorOptions::from(&config),
    ));
    let controller = Arc::new(AlarmController::new(
        coordinator.clone(),
        ArmPolicy::from(&config.arming),
    ));
    let configuration_url = normalize_base_url(&config.panel.host)
        .ok()
        .map(|url| url.to_string());
    let registry = Arc::new(EntityRegistry::new(&config.instance_id(), configuration_url));

    let shutdown = Shutdown::new();
    let mut tasks = Vec::new();

    tasks.push(tokio::spawn(coordinator.clone().run(shutdown.subscribe())));
    tasks.push(tokio::spawn(
        registry
            .clone()
            .run_discovery(coordinator.subscribe(), shutdown.subscribe()),
    ));

    if config.api.enabled {
        let listener = TcpListener::bind(&config.api.bind_address).await?;
        let state = AppState {
            coordinator: coordinator.clone(),
            controller: controller.clone(),
            registry: registry.clone(),
            api_key: Arc::from(config.api.api_key.as_str()),
            command_timeout: Duration::from_secs(config.api.request_timeout_secs),
        };
        let server = ApiServer::new(state);
        let rx = shutdown.subscribe();
        tasks.push(tokio::spawn(async move {
            if let Err(e) = server.run(listener, rx).await {
                tracing::error!(error = %e, "API server failed");
            }
        }));
    }

    let (watcher, mut updates) = ConfigWatcher::new(&args.config);
    let _watcher_guard = match watcher.run() {
        Ok(guard) => Some(guard),
        Err(e) => {
            tracing::warn!(error = %e, "Config hot reload disabled");
            None
        }
    };

    {
        let coordinator = coordinator.clone();
        let controller = controller.clone();
        let mut stop = shutdown.subscribe();
        let mut current = config.clone();
        tasks.push(tokio::spawn(async move {
            loop {
                tokio::select! {
                    update = updates.recv() => match update {
                        Some(next) => {
                            apply_live_config(&current, &next, &coordinator, &controller);
                            current = next;
                        }
                        None => break,
                    },
                    _ = stop.recv() => break,
                }
            }
        }));
    }

    wait_for_signal().await;
    tracing::info!("Shutting down");
    shutdown.drain(tasks, SHUTDOWN_GRACE).await;

    tracing::info!("Shutdown complete");
    Ok(())
}
