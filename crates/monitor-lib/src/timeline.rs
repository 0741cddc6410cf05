//! Shared per-server sample timeline
//!
//! Two uncoordinated writers deliver overlapping windows: the push ingestor
//! streams live samples while the history fetcher bulk-loads polled windows.
//! The store exposes only an idempotent merge keyed by
//! `(server_id, timestamp)`, so re-delivery of the same instant is a no-op
//! rather than a duplicate insert. Entirely in-memory; retention is a
//! per-server cap with oldest-first eviction.

use std::collections::{BTreeMap, HashMap};

use chrono::NaiveDateTime;
use tokio::sync::RwLock;
use tracing::debug;

use crate::models::ServerId;
use crate::normalize::CanonicalSample;

/// Default per-server retention cap
const DEFAULT_RETENTION: usize = 10_000;

/// Iteration order for window queries, selected per caller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryOrder {
    /// Newest samples first, for live-feed consumers
    NewestFirst,
    /// Oldest first, for chart consumers
    Chronological,
}

#[derive(Debug, Default)]
struct ServerTimeline {
    // One ordered map doubles as the duplicate-detection key set and the
    // time index; reverse iteration yields newest-first.
    samples: BTreeMap<NaiveDateTime, CanonicalSample>,
}

/// Ordered, deduplicated per-server sample collection
pub struct TimelineStore {
    servers: RwLock<HashMap<ServerId, ServerTimeline>>,
    retention: usize,
}

impl Default for TimelineStore {
    fn default() -> Self {
        Self::new()
    }
}

impl TimelineStore {
    pub fn new() -> Self {
        Self::with_retention(DEFAULT_RETENTION)
    }

    pub fn with_retention(retention: usize) -> Self {
        Self {
            servers: RwLock::new(HashMap::new()),
            retention: retention.max(1),
        }
    }

    /// Insert a sample unless its `(server_id, timestamp)` key is already
    /// present. Returns whether the sample was actually inserted; a present
    /// key never has its entry overwritten.
    pub async fn merge(&self, sample: CanonicalSample) -> bool {
        let mut servers = self.servers.write().await;
        let timeline = servers.entry(sample.server_id).or_default();

        if timeline.samples.contains_key(&sample.timestamp) {
            debug!(
                server_id = sample.server_id,
                timestamp = %sample.timestamp,
                "duplicate sample ignored"
            );
            return false;
        }

        timeline.samples.insert(sample.timestamp, sample);
        while timeline.samples.len() > self.retention {
            timeline.samples.pop_first();
        }
        true
    }

    /// Merge many samples, returning how many were newly inserted
    pub async fn merge_batch(&self, samples: Vec<CanonicalSample>) -> usize {
        let mut inserted = 0;
        for sample in samples {
            if self.merge(sample).await {
                inserted += 1;
            }
        }
        inserted
    }

    /// All samples for `server_id` with `start <= timestamp <= end`, in the
    /// caller-selected order
    pub async fn query_window(
        &self,
        server_id: ServerId,
        start: NaiveDateTime,
        end: NaiveDateTime,
        order: QueryOrder,
    ) -> Vec<CanonicalSample> {
        let servers = self.servers.read().await;
        let Some(timeline) = servers.get(&server_id) else {
            return Vec::new();
        };

        let range = timeline.samples.range(start..=end);
        match order {
            QueryOrder::Chronological => range.map(|(_, s)| s.clone()).collect(),
            QueryOrder::NewestFirst => range.rev().map(|(_, s)| s.clone()).collect(),
        }
    }

    /// Most recent sample for a server, if any
    pub async fn latest(&self, server_id: ServerId) -> Option<CanonicalSample> {
        let servers = self.servers.read().await;
        servers
            .get(&server_id)
            .and_then(|t| t.samples.values().next_back().cloned())
    }

    pub async fn len(&self, server_id: ServerId) -> usize {
        let servers = self.servers.read().await;
        servers.get(&server_id).map_or(0, |t| t.samples.len())
    }

    pub async fn total_len(&self) -> usize {
        let servers = self.servers.read().await;
        servers.values().map(|t| t.samples.len()).sum()
    }

    /// Sorted ids of every server with at least one stored sample
    pub async fn server_ids(&self) -> Vec<ServerId> {
        let servers = self.servers.read().await;
        let mut ids: Vec<ServerId> = servers
            .iter()
            .filter(|(_, t)| !t.samples.is_empty())
            .map(|(id, _)| *id)
            .collect();
        ids.sort_unstable();
        ids
    }

    /// Drop everything stored for one server
    pub async fn clear_server(&self, server_id: ServerId) {
        self.servers.write().await.remove(&server_id);
    }
}
