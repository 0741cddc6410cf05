//! Observability infrastructure for the engine
//!
//! Provides:
//! - Prometheus metrics (fetch latency, timeline size, merge/duplicate and
//!   error counters, stream connectivity, unread alerts)
//! - Structured event logging with tracing

use prometheus::{register_histogram, register_int_gauge, Histogram, IntGauge};
use std::sync::OnceLock;
use tracing::{info, warn};

/// Histogram buckets for history fetch latency (in seconds)
const FETCH_LATENCY_BUCKETS: &[f64] = &[
    0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
];

/// Global metrics instance (registered once)
static GLOBAL_METRICS: OnceLock<EngineMetricsInner> = OnceLock::new();

struct EngineMetricsInner {
    fetch_latency_seconds: Histogram,
    timeline_entries: IntGauge,
    timeline_servers: IntGauge,
    samples_merged_total: IntGauge,
    duplicate_samples_total: IntGauge,
    fetch_errors_total: IntGauge,
    push_events_dropped_total: IntGauge,
    stream_connected: IntGauge,
    unread_alerts: IntGauge,
}

impl EngineMetricsInner {
    fn new() -> Self {
        Self {
            fetch_latency_seconds: register_histogram!(
                "fleet_monitor_fetch_latency_seconds",
                "Time spent loading one history window",
                FETCH_LATENCY_BUCKETS.to_vec()
            )
            .expect("Failed to register fetch_latency_seconds"),

            timeline_entries: register_int_gauge!(
                "fleet_monitor_timeline_entries",
                "Samples currently held in the timeline store"
            )
            .expect("Failed to register timeline_entries"),

            timeline_servers: register_int_gauge!(
                "fleet_monitor_timeline_servers",
                "Servers with at least one stored sample"
            )
            .expect("Failed to register timeline_servers"),

            samples_merged_total: register_int_gauge!(
                "fleet_monitor_samples_merged_total",
                "Samples newly inserted into the timeline"
            )
            .expect("Failed to register samples_merged_total"),

            duplicate_samples_total: register_int_gauge!(
                "fleet_monitor_duplicate_samples_total",
                "Samples re-delivered with an already-present identity key"
            )
            .expect("Failed to register duplicate_samples_total"),

            fetch_errors_total: register_int_gauge!(
                "fleet_monitor_fetch_errors_total",
                "Failed history or alert queries"
            )
            .expect("Failed to register fetch_errors_total"),

            push_events_dropped_total: register_int_gauge!(
                "fleet_monitor_push_events_dropped_total",
                "Malformed push events dropped without a merge"
            )
            .expect("Failed to register push_events_dropped_total"),

            stream_connected: register_int_gauge!(
                "fleet_monitor_stream_connected",
                "Whether the push channel is currently connected"
            )
            .expect("Failed to register stream_connected"),

            unread_alerts: register_int_gauge!(
                "fleet_monitor_unread_alerts",
                "Unread alerts across the user's subscribed servers"
            )
            .expect("Failed to register unread_alerts"),
        }
    }
}

/// Engine metrics for Prometheus exposition
///
/// A lightweight handle to the global metrics instance; clones share the
/// same underlying metrics.
#[derive(Clone)]
pub struct EngineMetrics {
    _private: (),
}

impl Default for EngineMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl EngineMetrics {
    /// Create a new metrics handle (initializes global metrics if needed)
    pub fn new() -> Self {
        GLOBAL_METRICS.get_or_init(EngineMetricsInner::new);
        Self { _private: () }
    }

    fn inner(&self) -> &EngineMetricsInner {
        GLOBAL_METRICS.get().expect("Metrics not initialized")
    }

    pub fn observe_fetch_latency(&self, duration_secs: f64) {
        self.inner().fetch_latency_seconds.observe(duration_secs);
    }

    pub fn set_timeline_size(&self, entries: i64, servers: i64) {
        self.inner().timeline_entries.set(entries);
        self.inner().timeline_servers.set(servers);
    }

    pub fn add_samples_merged(&self, count: i64) {
        self.inner().samples_merged_total.add(count);
    }

    pub fn add_duplicates(&self, count: i64) {
        self.inner().duplicate_samples_total.add(count);
    }

    pub fn inc_fetch_errors(&self) {
        self.inner().fetch_errors_total.inc();
    }

    pub fn set_push_events_dropped(&self, count: i64) {
        self.inner().push_events_dropped_total.set(count);
    }

    pub fn set_stream_connected(&self, connected: bool) {
        self.inner().stream_connected.set(i64::from(connected));
    }

    pub fn set_unread_alerts(&self, count: i64) {
        self.inner().unread_alerts.set(count);
    }
}

/// Structured logger for engine events
///
/// Keeps significant events (startup, shutdown, fetches, stream transitions,
/// severity classifications) in a consistent machine-readable shape.
#[derive(Clone)]
pub struct StructuredLogger {
    user_id: i64,
}

impl StructuredLogger {
    pub fn new(user_id: i64) -> Self {
        Self { user_id }
    }

    pub fn log_startup(&self, version: &str) {
        info!(
            event = "startup",
            user_id = self.user_id,
            version = %version,
            "Fleet monitor starting"
        );
    }

    pub fn log_shutdown(&self, reason: &str) {
        info!(
            event = "shutdown",
            user_id = self.user_id,
            reason = %reason,
            "Fleet monitor shutting down"
        );
    }

    pub fn log_fetch(&self, window: &str, fetched: usize, merged: usize) {
        info!(
            event = "history_fetch",
            user_id = self.user_id,
            window = %window,
            fetched,
            merged,
            "History window applied"
        );
    }

    pub fn log_stream_state(&self, state: &str) {
        info!(
            event = "stream_state",
            user_id = self.user_id,
            state = %state,
            "Push channel state changed"
        );
    }

    pub fn log_severity(&self, server_id: i64, severity: &str, summary: &str) {
        match severity {
            "high" => warn!(
                event = "alert_classified",
                user_id = self.user_id,
                server_id,
                severity = %severity,
                summary = %summary,
                "High severity alert"
            ),
            _ => info!(
                event = "alert_classified",
                user_id = self.user_id,
                server_id,
                severity = %severity,
                summary = %summary,
                "Alert classified"
            ),
        }
    }
}
