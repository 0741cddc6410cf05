//! Subscription-scoped unread-alert counting
//!
//! Recomputed on a fixed cadence (and on demand): resolve the user's
//! subscribed servers, query alerts per server over the full historical
//! range, and sum the returned row counts. `mark_*` operations are purely
//! local and are overwritten by the next recomputation.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{NaiveDateTime, Utc};
use futures::future::join_all;
use serde::Serialize;
use tokio::sync::RwLock;
use tracing::{debug, warn};

use super::{alert_summary, classify, filter_alerts, PriorityFilter, Severity};
use crate::error::FetchError;
use crate::fetch::MonitorApi;
use crate::models::{ServerId, SubscriptionScope};

/// High-severity digests retained from the latest recount
const MAX_DIGESTS: usize = 20;

/// Valid-alert tallies per severity tier from the latest recount
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SeverityCounts {
    pub high: u64,
    pub medium: u64,
    pub low: u64,
}

/// Display-ready digest of one high-severity alert
#[derive(Debug, Clone, Serialize)]
pub struct AlertDigest {
    pub server_id: ServerId,
    #[serde(with = "crate::models::wire_time")]
    pub timestamp: NaiveDateTime,
    pub severity: Severity,
    pub summary: String,
}

/// Rolling unread-alert state for one user's subscriptions
pub struct SubscriptionAlertCounter {
    api: Arc<dyn MonitorApi>,
    scope: Arc<SubscriptionScope>,
    user_id: i64,
    unread: AtomicU64,
    severity_counts: RwLock<SeverityCounts>,
    recent_high: RwLock<Vec<AlertDigest>>,
    last_error: RwLock<Option<String>>,
}

impl SubscriptionAlertCounter {
    pub fn new(api: Arc<dyn MonitorApi>, scope: Arc<SubscriptionScope>, user_id: i64) -> Self {
        Self {
            api,
            scope,
            user_id,
            unread: AtomicU64::new(0),
            severity_counts: RwLock::new(SeverityCounts::default()),
            recent_high: RwLock::new(Vec::new()),
            last_error: RwLock::new(None),
        }
    }

    /// Recompute the unread count from the source of truth.
    ///
    /// Resolves subscriptions (also refreshing the shared scope used for
    /// stream admission), then queries every subscribed server in parallel
    /// over `epoch..now`. The unread total is the raw row count, not filtered
    /// by validity; severity tallies and digests cover valid records only.
    /// Any failed query fails the whole recount and keeps the previous count.
    pub async fn recount(&self) -> Result<u64, FetchError> {
        let subscriptions = self.api.subscriptions(self.user_id).await?;
        let server_ids: Vec<ServerId> = subscriptions.iter().map(|s| s.server_id).collect();
        self.scope.replace(server_ids.iter().copied());

        // 1970-01-01 00:00:00, so the badge reflects all history
        let start = NaiveDateTime::default();
        let end = Utc::now().naive_utc();

        let queries = server_ids.iter().map(|&id| self.api.alerts(id, start, end));
        let mut records = Vec::new();
        let mut total = 0u64;
        for result in join_all(queries).await {
            let rows = result?;
            total += rows.len() as u64;
            records.extend(rows);
        }

        let mut counts = SeverityCounts::default();
        for record in records.iter().filter(|r| r.is_valid_alert) {
            match classify(record) {
                Severity::High => counts.high += 1,
                Severity::Medium => counts.medium += 1,
                Severity::Low => counts.low += 1,
            }
        }

        let mut digests: Vec<AlertDigest> = filter_alerts(&records, PriorityFilter::High)
            .into_iter()
            .map(|record| AlertDigest {
                server_id: record.server_id,
                timestamp: record.timestamp,
                severity: classify(record),
                summary: alert_summary(record),
            })
            .collect();
        digests.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        digests.truncate(MAX_DIGESTS);

        self.unread.store(total, Ordering::SeqCst);
        *self.severity_counts.write().await = counts;
        *self.recent_high.write().await = digests;
        *self.last_error.write().await = None;

        debug!(
            user_id = self.user_id,
            servers = server_ids.len(),
            unread = total,
            high = counts.high,
            "alert recount complete"
        );
        Ok(total)
    }

    /// Scheduled entry point: a failed recount is recorded and the previous
    /// count survives until the next tick retries.
    pub async fn tick(&self) {
        if let Err(e) = self.recount().await {
            warn!(error = %e, "alert recount failed, keeping previous count");
            *self.last_error.write().await = Some(e.to_string());
        }
    }

    pub fn unread(&self) -> u64 {
        self.unread.load(Ordering::SeqCst)
    }

    pub async fn severity_counts(&self) -> SeverityCounts {
        *self.severity_counts.read().await
    }

    pub async fn recent_high(&self) -> Vec<AlertDigest> {
        self.recent_high.read().await.clone()
    }

    pub async fn last_error(&self) -> Option<String> {
        self.last_error.read().await.clone()
    }

    /// Zero the badge locally; the next recount restores the real total
    pub fn mark_all_read(&self) {
        self.unread.store(0, Ordering::SeqCst);
    }

    /// Decrement the badge locally, floored at zero
    pub fn mark_one_read(&self, alert_id: i64) {
        let _ = self
            .unread
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |count| {
                Some(count.saturating_sub(1))
            });
        debug!(alert_id, "alert marked read");
    }
}
