//! HTTP API for health checks, Prometheus metrics, and engine status

use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use monitor_lib::{
    alerts::{AlertDigest, SeverityCounts, SubscriptionAlertCounter},
    directory::ServerDirectory,
    health::{ComponentStatus, HealthRegistry},
    observability::EngineMetrics,
    stream::{StreamIngestor, StreamStatus},
    timeline::TimelineStore,
};
use prometheus::{Encoder, TextEncoder};
use serde::Serialize;
use std::sync::Arc;
use tracing::info;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub health_registry: HealthRegistry,
    pub metrics: EngineMetrics,
    pub store: Arc<TimelineStore>,
    pub ingestor: Arc<StreamIngestor>,
    pub counter: Arc<SubscriptionAlertCounter>,
    pub directory: Arc<ServerDirectory>,
}

/// Health check response - returns 200 if healthy, 503 if unhealthy
async fn healthz(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let health = state.health_registry.health().await;

    let status_code = match health.status {
        ComponentStatus::Healthy => StatusCode::OK,
        ComponentStatus::Degraded => StatusCode::OK, // Still operational
        ComponentStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
    };

    (status_code, Json(health))
}

/// Readiness check response - returns 200 if ready, 503 if not ready
async fn readyz(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let readiness = state.health_registry.readiness().await;

    let status_code = if readiness.ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (status_code, Json(readiness))
}

/// Prometheus metrics endpoint
async fn metrics() -> impl IntoResponse {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();

    encoder.encode(&metric_families, &mut buffer).unwrap();

    (
        StatusCode::OK,
        [("content-type", "text/plain; charset=utf-8")],
        buffer,
    )
}

/// Engine state summary for dashboards and debugging
#[derive(Serialize)]
struct StatusResponse {
    stream: StreamStatus,
    unread_alerts: u64,
    severity: SeverityCounts,
    recent_high: Vec<AlertDigest>,
    timeline_entries: usize,
    timeline_servers: usize,
    online_servers: usize,
}

async fn status(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(StatusResponse {
        stream: state.ingestor.status().await,
        unread_alerts: state.counter.unread(),
        severity: state.counter.severity_counts().await,
        recent_high: state.counter.recent_high().await,
        timeline_entries: state.store.total_len().await,
        timeline_servers: state.store.server_ids().await.len(),
        online_servers: state.directory.online_count().await,
    })
}

/// Create the API router
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .route("/metrics", get(metrics))
        .route("/status", get(status))
        .with_state(state)
}

/// Start the API server
pub async fn serve(port: u16, state: Arc<AppState>) -> anyhow::Result<()> {
    let app = create_router(state);

    let addr = format!("0.0.0.0:{}", port);
    info!(addr = %addr, "Starting API server");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
