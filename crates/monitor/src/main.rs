//! Fleet Monitor - live telemetry aggregation daemon
//!
//! Reconciles pushed live samples and polled history windows into one
//! deduplicated per-server timeline, scoped to the configured user's
//! subscriptions, and serves engine state over HTTP.

use anyhow::Result;
use monitor_lib::{
    alerts::SubscriptionAlertCounter,
    directory::ServerDirectory,
    fetch::{ApiClient, FetchOutcome, FetchScope, HistoryFetcher, MonitorApi, TimeRange},
    health::{components, ComponentHealth, HealthRegistry},
    models::SubscriptionScope,
    observability::{EngineMetrics, StructuredLogger},
    scheduler::{PollScheduler, TimerKey},
    stream::{ConnectionState, StreamIngestor},
    timeline::TimelineStore,
};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod api;
mod config;

const MONITOR_VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing with JSON output and env filter
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer().json())
        .init();

    info!("Starting fleet-monitor");

    let config = config::MonitorConfig::load()?;
    info!(user_id = config.user_id, api = %config.api_base_url, "Monitor configured");

    let health_registry = HealthRegistry::new();
    health_registry.register(components::HISTORY_FETCHER).await;
    health_registry.register(components::STREAM_INGESTOR).await;
    health_registry.register(components::ALERT_COUNTER).await;
    health_registry.register(components::SERVER_DIRECTORY).await;

    let metrics = EngineMetrics::new();
    let logger = StructuredLogger::new(config.user_id);
    logger.log_startup(MONITOR_VERSION);

    let api_client: Arc<dyn MonitorApi> = Arc::new(ApiClient::new(
        &config.api_base_url,
        config.auth_token.clone(),
    )?);
    let store = Arc::new(TimelineStore::with_retention(config.retention_per_server));
    let scope = Arc::new(SubscriptionScope::new());

    let counter = Arc::new(SubscriptionAlertCounter::new(
        api_client.clone(),
        scope.clone(),
        config.user_id,
    ));
    let directory = Arc::new(ServerDirectory::new(api_client.clone()));
    let fetcher = Arc::new(HistoryFetcher::new(
        api_client.clone(),
        store.clone(),
        scope.clone(),
    ));
    let ingestor = Arc::new(StreamIngestor::new(
        config.ws_url.clone(),
        config.user_id,
        store.clone(),
        scope.clone(),
    ));

    // Resolve the subscription scope and fleet snapshot before the first load
    counter.tick().await;
    directory.tick().await;
    metrics.set_unread_alerts(counter.unread() as i64);
    for digest in counter.recent_high().await {
        logger.log_severity(digest.server_id, &digest.severity.to_string(), &digest.summary);
    }

    let range = TimeRange::parse(&config.time_range).unwrap_or(TimeRange::Day1);

    // Initial bulk load; on failure the store keeps whatever it already has
    match fetcher.load_window(FetchScope::AllSubscribed, &range).await {
        Ok(FetchOutcome::Applied { fetched, merged }) => {
            logger.log_fetch(&range.label(), fetched, merged);
            metrics.add_samples_merged(merged as i64);
            metrics.add_duplicates((fetched - merged) as i64);
        }
        Ok(FetchOutcome::Superseded) => {}
        Err(e) => {
            warn!(error = %e, "initial history load failed");
            metrics.inc_fetch_errors();
            health_registry
                .set(components::HISTORY_FETCHER, ComponentHealth::degraded(e.to_string()))
                .await;
        }
    }

    let scheduler = Arc::new(PollScheduler::new());

    // History refresh, cadence per the selected window
    if let Some(period) = range.refresh_interval() {
        let fetcher = fetcher.clone();
        let metrics = metrics.clone();
        let registry = health_registry.clone();
        let logger = logger.clone();
        scheduler.schedule(TimerKey::new("history", range.label()), period, move || {
            let fetcher = fetcher.clone();
            let metrics = metrics.clone();
            let registry = registry.clone();
            let logger = logger.clone();
            async move {
                let started = Instant::now();
                match fetcher.load_window(FetchScope::AllSubscribed, &range).await {
                    Ok(FetchOutcome::Applied { fetched, merged }) => {
                        metrics.observe_fetch_latency(started.elapsed().as_secs_f64());
                        metrics.add_samples_merged(merged as i64);
                        metrics.add_duplicates((fetched - merged) as i64);
                        logger.log_fetch(&range.label(), fetched, merged);
                        registry
                            .set(components::HISTORY_FETCHER, ComponentHealth::healthy())
                            .await;
                    }
                    Ok(FetchOutcome::Superseded) => {}
                    Err(e) => {
                        metrics.inc_fetch_errors();
                        registry
                            .set(
                                components::HISTORY_FETCHER,
                                ComponentHealth::degraded(e.to_string()),
                            )
                            .await;
                    }
                }
            }
        });
    }

    // Alert recount (also refreshes the subscription scope)
    {
        let counter = counter.clone();
        let metrics = metrics.clone();
        let registry = health_registry.clone();
        scheduler.schedule(
            TimerKey::new("alert_counter", "all"),
            Duration::from_secs(config.alert_recount_secs.max(1)),
            move || {
                let counter = counter.clone();
                let metrics = metrics.clone();
                let registry = registry.clone();
                async move {
                    counter.tick().await;
                    metrics.set_unread_alerts(counter.unread() as i64);
                    match counter.last_error().await {
                        Some(e) => {
                            metrics.inc_fetch_errors();
                            registry
                                .set(components::ALERT_COUNTER, ComponentHealth::degraded(e))
                                .await;
                        }
                        None => {
                            registry
                                .set(components::ALERT_COUNTER, ComponentHealth::healthy())
                                .await;
                        }
                    }
                }
            },
        );
    }

    // Server-list refresh
    {
        let directory = directory.clone();
        scheduler.schedule(
            TimerKey::new("directory", "all"),
            Duration::from_secs(config.directory_refresh_secs.max(1)),
            move || {
                let directory = directory.clone();
                async move {
                    directory.tick().await;
                }
            },
        );
    }

    // Gauge probe: mirror engine state into Prometheus
    {
        let store = store.clone();
        let ingestor = ingestor.clone();
        let metrics = metrics.clone();
        scheduler.schedule(
            TimerKey::new("observability", "gauges"),
            Duration::from_secs(10),
            move || {
                let store = store.clone();
                let ingestor = ingestor.clone();
                let metrics = metrics.clone();
                async move {
                    let status = ingestor.status().await;
                    metrics.set_stream_connected(matches!(
                        status.state,
                        ConnectionState::Connected
                    ));
                    metrics.set_push_events_dropped(status.events_dropped as i64);
                    metrics.set_timeline_size(
                        store.total_len().await as i64,
                        store.server_ids().await.len() as i64,
                    );
                }
            },
        );
    }

    // Push channel with explicit reconnects and fixed backoff
    {
        let ingestor = ingestor.clone();
        let registry = health_registry.clone();
        let logger = logger.clone();
        let backoff = Duration::from_secs(config.reconnect_backoff_secs.max(1));
        tokio::spawn(async move {
            logger.log_stream_state("connecting");
            let mut result = ingestor.run_once().await;
            loop {
                if let Err(e) = &result {
                    registry
                        .set(
                            components::STREAM_INGESTOR,
                            ComponentHealth::degraded(e.to_string()),
                        )
                        .await;
                }
                logger.log_stream_state("disconnected");
                tokio::time::sleep(backoff).await;

                logger.log_stream_state("connecting");
                registry
                    .set(components::STREAM_INGESTOR, ComponentHealth::healthy())
                    .await;
                result = ingestor.reconnect().await;
            }
        });
    }

    // Shared state for the HTTP surface
    let app_state = Arc::new(api::AppState {
        health_registry: health_registry.clone(),
        metrics: metrics.clone(),
        store: store.clone(),
        ingestor: ingestor.clone(),
        counter: counter.clone(),
        directory: directory.clone(),
    });

    health_registry.set_ready(true).await;
    let api_handle = tokio::spawn(api::serve(config.api_port, app_state));

    // Wait for shutdown signal
    tokio::signal::ctrl_c().await?;
    logger.log_shutdown("SIGINT received");
    scheduler.shutdown();
    api_handle.abort();
    info!("Shutting down");

    Ok(())
}
