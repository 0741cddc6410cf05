//! Integration tests for the monitor API endpoints

use axum::{
    body::Body,
    extract::State,
    http::{Request, StatusCode},
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use monitor_lib::{
    alerts::SubscriptionAlertCounter,
    directory::ServerDirectory,
    fetch::ApiClient,
    health::{components, ComponentHealth, ComponentStatus, HealthRegistry},
    models::SubscriptionScope,
    observability::EngineMetrics,
    stream::StreamIngestor,
    timeline::TimelineStore,
};
use prometheus::{Encoder, TextEncoder};
use serde::Serialize;
use std::sync::Arc;
use tower::ServiceExt;

#[derive(Clone)]
pub struct AppState {
    pub health_registry: HealthRegistry,
    pub metrics: EngineMetrics,
    pub store: Arc<TimelineStore>,
    pub ingestor: Arc<StreamIngestor>,
    pub counter: Arc<SubscriptionAlertCounter>,
    pub directory: Arc<ServerDirectory>,
}

async fn healthz(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let health = state.health_registry.health().await;
    let status_code = match health.status {
        ComponentStatus::Healthy => StatusCode::OK,
        ComponentStatus::Degraded => StatusCode::OK,
        ComponentStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
    };
    (status_code, Json(health))
}

async fn readyz(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let readiness = state.health_registry.readiness().await;
    let status_code = if readiness.ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (status_code, Json(readiness))
}

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

#[derive(Serialize)]
struct StatusResponse {
    stream: monitor_lib::stream::StreamStatus,
    unread_alerts: u64,
    timeline_entries: usize,
    timeline_servers: usize,
    online_servers: usize,
}

async fn status(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(StatusResponse {
        stream: state.ingestor.status().await,
        unread_alerts: state.counter.unread(),
        timeline_entries: state.store.total_len().await,
        timeline_servers: state.store.server_ids().await.len(),
        online_servers: state.directory.online_count().await,
    })
}

fn create_test_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .route("/metrics", get(metrics))
        .route("/status", get(status))
        .with_state(state)
}

async fn setup_test_app() -> (Router, Arc<AppState>) {
    let health_registry = HealthRegistry::new();
    health_registry.register(components::HISTORY_FETCHER).await;
    health_registry.register(components::STREAM_INGESTOR).await;

    // an inert client: none of the routes under test issue requests
    let api_client = Arc::new(ApiClient::new("http://localhost:1/api", "test-token").unwrap());
    let store = Arc::new(TimelineStore::new());
    let scope = Arc::new(SubscriptionScope::new());

    let state = Arc::new(AppState {
        health_registry: health_registry.clone(),
        metrics: EngineMetrics::new(),
        store: store.clone(),
        ingestor: Arc::new(StreamIngestor::new(
            "ws://localhost:1/ws",
            1,
            store.clone(),
            scope.clone(),
        )),
        counter: Arc::new(SubscriptionAlertCounter::new(
            api_client.clone(),
            scope.clone(),
            1,
        )),
        directory: Arc::new(ServerDirectory::new(api_client)),
    });
    let router = create_test_router(state.clone());

    (router, state)
}

#[tokio::test]
async fn test_healthz_returns_ok_when_healthy() {
    let (app, _state) = setup_test_app().await;

    let response = app
        .oneshot(
            Request::builder()
                .uri("/healthz")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_healthz_returns_503_when_unhealthy() {
    let (app, state) = setup_test_app().await;
    state
        .health_registry
        .set(
            components::HISTORY_FETCHER,
            ComponentHealth::unhealthy("backend unreachable"),
        )
        .await;

    let response = app
        .oneshot(
            Request::builder()
                .uri("/healthz")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn test_healthz_tolerates_degraded_components() {
    let (app, state) = setup_test_app().await;
    state
        .health_registry
        .set(
            components::STREAM_INGESTOR,
            ComponentHealth::degraded("reconnecting"),
        )
        .await;

    let response = app
        .oneshot(
            Request::builder()
                .uri("/healthz")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    // degraded still serves stale-but-available data
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_readyz_tracks_ready_flag() {
    let (app, state) = setup_test_app().await;

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/readyz")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

    state.health_registry.set_ready(true).await;
    let response = app
        .oneshot(
            Request::builder()
                .uri("/readyz")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_metrics_exposition() {
    let (app, state) = setup_test_app().await;
    state.metrics.set_unread_alerts(3);

    let response = app
        .oneshot(
            Request::builder()
                .uri("/metrics")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let text = String::from_utf8(body.to_vec()).unwrap();
    assert!(text.contains("fleet_monitor_unread_alerts"));
}

#[tokio::test]
async fn test_status_reports_engine_state() {
    let (app, state) = setup_test_app().await;
    state.counter.mark_all_read();

    let response = app
        .oneshot(
            Request::builder()
                .uri("/status")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let value: serde_json::Value = serde_json::from_slice(&body).unwrap();

    assert_eq!(value["unread_alerts"], 0);
    assert_eq!(value["timeline_entries"], 0);
    assert_eq!(value["stream"]["state"], "disconnected");
}
