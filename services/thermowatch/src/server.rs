//! HTTP surface: temperature, readiness, manual store, version and metrics

use std::sync::Arc;
use std::time::Duration;

use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use serde_json::json;
use tower_http::trace::TraceLayer;

use crate::cache::{self, VolatileCache, LATEST_SNAPSHOT_KEY};
use crate::metrics::Metrics;
use crate::model::{Snapshot, TemperatureStatus};
use crate::readiness::ReadinessEvaluator;
use crate::scheduler::SnapshotScheduler;

/// Everything the handlers need, wired once at startup
#[derive(Clone)]
pub struct AppState {
    pub cache: Arc<dyn VolatileCache>,
    pub readiness: Arc<ReadinessEvaluator>,
    pub scheduler: Arc<SnapshotScheduler>,
    pub metrics: Arc<Metrics>,
    pub version: String,
    pub storage_timeout: Duration,
}

/// Build the service axum router
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/temperature", get(temperature_handler))
        .route("/readyz", get(readyz_handler))
        .route("/store", get(store_handler).post(store_handler))
        .route("/version", get(version_handler))
        .route("/metrics", get(metrics_handler))
        .route("/health", get(health_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Last committed snapshot; unreadable or malformed entries read as absent
async fn latest_snapshot(state: &AppState) -> Option<Snapshot> {
    let raw = cache::bounded(
        state.storage_timeout,
        "get latest_snapshot",
        state.cache.get(LATEST_SNAPSHOT_KEY),
    )
    .await;

    match raw {
        Ok(Some(raw)) => match serde_json::from_str(&raw) {
            Ok(snapshot) => Some(snapshot),
            Err(e) => {
                tracing::warn!("Cached snapshot is malformed: {}", e);
                None
            }
        },
        Ok(None) => None,
        Err(e) => {
            tracing::warn!("Reading cached snapshot failed: {}", e);
            None
        }
    }
}

async fn temperature_handler(State(state): State<AppState>) -> impl IntoResponse {
    let latest = latest_snapshot(&state)
        .await
        .and_then(|s| s.average.map(|average| (s.taken_at, average)));

    match latest {
        Some((taken_at, average)) => (
            StatusCode::OK,
            Json(json!({
                "temperature": average,
                "status": TemperatureStatus::from_average(average),
                "taken_at": taken_at,
            })),
        ),
        None => (
            StatusCode::NOT_FOUND,
            Json(json!({ "error": "No temperature data available" })),
        ),
    }
}

async fn readyz_handler(State(state): State<AppState>) -> impl IntoResponse {
    let verdict = state.readiness.evaluate().await;
    let (code, status) = if verdict.ready {
        (StatusCode::OK, "ready")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "not ready")
    };

    (
        code,
        Json(json!({
            "status": status,
            "ready": verdict.ready,
            "accessible": verdict.accessible,
            "total": verdict.total,
            "minimum_required": verdict.minimum_required,
            "cache_fresh": verdict.cache_fresh,
        })),
    )
}

async fn store_handler(State(state): State<AppState>) -> impl IntoResponse {
    match state.scheduler.store_now().await {
        Ok(snapshot) => (
            StatusCode::OK,
            Json(json!({
                "status": "stored",
                "taken_at": snapshot.taken_at,
                "average": snapshot.average,
                "readings": snapshot.readings.len(),
            })),
        ),
        Err(e) => {
            tracing::error!("Manual snapshot store failed: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": e.to_string() })),
            )
        }
    }
}

async fn version_handler(State(state): State<AppState>) -> impl IntoResponse {
    Json(json!({ "version": state.version }))
}

async fn metrics_handler(State(state): State<AppState>) -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}

async fn health_handler() -> impl IntoResponse {
    "OK"
}
