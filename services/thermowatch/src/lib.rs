//! Thermowatch - sensor fleet temperature aggregation and readiness service
//!
//! Polls remote sensor boxes, caches and archives a consensus temperature,
//! and reports readiness from fleet quorum or snapshot freshness.

pub mod aggregate;
pub mod archive;
pub mod cache;
pub mod clock;
pub mod config;
pub mod error;
pub mod freshness;
pub mod gateway;
pub mod health;
pub mod io;
pub mod metrics;
pub mod model;
pub mod readiness;
pub mod scheduler;
pub mod server;

pub use config::{load_config, Config};
pub use error::{Result, ThermowatchError};

use std::net::SocketAddr;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::archive::{DurableArchive, FsArchive, MemoryArchive};
use crate::cache::{MemoryCache, VolatileCache};
use crate::clock::{Clock, SystemClock};
use crate::config::ArchiveConfig;
use crate::freshness::FreshnessTracker;
use crate::gateway::{OpenSenseMapGateway, SensorGateway};
use crate::health::HealthEvaluator;
use crate::io::{HttpClient, ReqwestHttpClient};
use crate::metrics::Metrics;
use crate::readiness::ReadinessEvaluator;
use crate::scheduler::SnapshotScheduler;
use crate::server::AppState;

/// Construct every component and wire them together
pub fn build_app_state(
    config: &Config,
    http: Arc<dyn HttpClient>,
    clock: Arc<dyn Clock>,
) -> AppState {
    let metrics = Arc::new(Metrics::new());
    let gateway: Arc<dyn SensorGateway> = Arc::new(OpenSenseMapGateway::new(
        &config.sensor_api,
        http,
        Arc::clone(&clock),
    ));
    let cache: Arc<dyn VolatileCache> = Arc::new(MemoryCache::new(Arc::clone(&clock)));
    let archive: Arc<dyn DurableArchive> = match &config.storage.archive {
        ArchiveConfig::Filesystem { directory } => {
            tracing::debug!("Archiving snapshots under {:?}", directory);
            Arc::new(FsArchive::new(directory.clone()))
        }
        ArchiveConfig::Memory => Arc::new(MemoryArchive::new()),
    };

    let health = Arc::new(HealthEvaluator::new(
        config,
        Arc::clone(&gateway),
        Arc::clone(&cache),
        Arc::clone(&clock),
        Arc::clone(&metrics),
    ));
    let freshness = Arc::new(FreshnessTracker::new(
        config,
        Arc::clone(&cache),
        Arc::clone(&clock),
    ));
    let scheduler = Arc::new(SnapshotScheduler::new(
        config,
        gateway,
        Arc::clone(&cache),
        archive,
        clock,
        Arc::clone(&metrics),
    ));

    AppState {
        cache,
        readiness: Arc::new(ReadinessEvaluator::new(health, freshness)),
        scheduler,
        metrics,
        version: config.version.clone(),
        storage_timeout: config.storage.timeout,
    }
}

/// Run the thermowatch service with the given configuration
pub async fn run(config: Config) -> Result<()> {
    let sensors = config.configured_sensors();
    if sensors.is_empty() {
        tracing::warn!("No sensors configured; readiness will report not ready");
    }

    let http: Arc<dyn HttpClient> =
        Arc::new(ReqwestHttpClient::new(config.sensor_api.request_timeout)?);
    let state = build_app_state(&config, http, Arc::new(SystemClock));
    let cancel = CancellationToken::new();

    // Setup shutdown handler
    let cancel_for_signal = cancel.clone();
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for ctrl-c: {}", e);
            return;
        }
        tracing::info!("Shutdown signal received");
        cancel_for_signal.cancel();
    });

    let scheduler = Arc::clone(&state.scheduler);
    let cancel_for_scheduler = cancel.clone();
    let scheduler_task = tokio::spawn(async move {
        scheduler.run(cancel_for_scheduler).await;
    });

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(l) => l,
        Err(e) => {
            tracing::error!("Failed to bind to port {}: {}", config.server.port, e);
            cancel.cancel();
            let _ = scheduler_task.await;
            return Err(e.into());
        }
    };
    tracing::info!("Thermowatch listening on http://{}", addr);

    let router = server::build_router(state);
    let cancel_for_server = cancel.clone();
    axum::serve(listener, router)
        .with_graceful_shutdown(async move {
            cancel_for_server.cancelled().await;
        })
        .await?;

    cancel.cancel();
    if let Err(e) = scheduler_task.await {
        tracing::warn!("Snapshot scheduler task ended abnormally: {}", e);
    }
    tracing::info!("Thermowatch stopped");

    Ok(())
}
