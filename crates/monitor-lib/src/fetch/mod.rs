//! Bounded history loading into the timeline
//!
//! This module provides:
//! - The REST client and the `MonitorApi` seam over it
//! - Time-window resolution with per-preset refresh cadences
//! - The history fetcher that bulk-loads windows into the shared store

mod api;
mod client;
mod window;

pub use api::MonitorApi;
pub use client::ApiClient;
pub use window::{format_timestamp, parse_timestamp, TimeRange};

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::Utc;
use futures::future::join_all;
use tracing::{debug, warn};

use crate::error::FetchError;
use crate::models::{ServerId, SubscriptionScope};
use crate::normalize::normalize_sample;
use crate::timeline::TimelineStore;

/// Which servers a history load covers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchScope {
    Server(ServerId),
    /// One fetch per server in the subscription scope, issued in parallel
    AllSubscribed,
}

/// What became of a completed fetch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchOutcome {
    /// Results were normalized and merged into the store
    Applied { fetched: usize, merged: usize },
    /// The selection changed while the fetch was in flight; results were
    /// discarded on arrival (last-applicable-result wins)
    Superseded,
}

/// Loads bounded history windows into the shared timeline.
///
/// Carries a selection generation: bump it whenever the displayed range or
/// server changes, and any fetch started under an older generation discards
/// its results instead of applying them late.
pub struct HistoryFetcher {
    api: Arc<dyn MonitorApi>,
    store: Arc<TimelineStore>,
    scope: Arc<SubscriptionScope>,
    generation: AtomicU64,
}

impl HistoryFetcher {
    pub fn new(
        api: Arc<dyn MonitorApi>,
        store: Arc<TimelineStore>,
        scope: Arc<SubscriptionScope>,
    ) -> Self {
        Self {
            api,
            store,
            scope,
            generation: AtomicU64::new(0),
        }
    }

    /// Invalidate in-flight fetches for the previous selection
    pub fn change_selection(&self) -> u64 {
        self.generation.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub fn current_generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    /// Fetch one window and merge it into the store.
    ///
    /// For `AllSubscribed`, per-server failures are logged and skipped so
    /// partial results still land; a single-server fetch propagates its
    /// error and the store keeps its last good contents.
    pub async fn load_window(
        &self,
        fetch_scope: FetchScope,
        range: &TimeRange,
    ) -> Result<FetchOutcome, FetchError> {
        let generation = self.generation.load(Ordering::SeqCst);
        let (start, end) = range.resolve(Utc::now().naive_utc());

        let raw = match fetch_scope {
            FetchScope::Server(server_id) => {
                self.api.performance_data(server_id, start, end).await?
            }
            FetchScope::AllSubscribed => {
                let server_ids = self.scope.snapshot();
                let fetches = server_ids
                    .iter()
                    .map(|&id| self.api.performance_data(id, start, end));

                let mut combined = Vec::new();
                for (server_id, result) in server_ids.iter().zip(join_all(fetches).await) {
                    match result {
                        Ok(samples) => combined.extend(samples),
                        Err(e) => warn!(
                            server_id,
                            error = %e,
                            "history fetch failed for one server, continuing with the rest"
                        ),
                    }
                }
                combined
            }
        };

        if self.generation.load(Ordering::SeqCst) != generation {
            debug!(
                window = %range.label(),
                "selection changed mid-fetch, discarding results"
            );
            return Ok(FetchOutcome::Superseded);
        }

        let fetched = raw.len();
        let mut canonical = Vec::with_capacity(fetched);
        for sample in &raw {
            match normalize_sample(sample) {
                Ok(c) => canonical.push(c),
                Err(e) => debug!(error = %e, "skipping unkeyed history sample"),
            }
        }

        let merged = self.store.merge_batch(canonical).await;
        debug!(window = %range.label(), fetched, merged, "history window applied");
        Ok(FetchOutcome::Applied { fetched, merged })
    }

    /// Last-24-hours convenience load for a single server
    pub async fn load_latest_day(&self, server_id: ServerId) -> Result<FetchOutcome, FetchError> {
        self.load_window(FetchScope::Server(server_id), &TimeRange::Day1).await
    }
}
