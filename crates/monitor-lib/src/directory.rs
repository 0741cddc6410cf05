//! In-memory snapshot of the server fleet
//!
//! Refreshed by a periodic server-list poll; a failed poll keeps the
//! previous snapshot (stale-but-available).

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::error::FetchError;
use crate::fetch::MonitorApi;
use crate::models::{ServerId, ServerIdentity, ServerStatus};

/// Latest known identity and reachability for each listed server
pub struct ServerDirectory {
    api: Arc<dyn MonitorApi>,
    servers: RwLock<HashMap<ServerId, ServerIdentity>>,
}

impl ServerDirectory {
    pub fn new(api: Arc<dyn MonitorApi>) -> Self {
        Self {
            api,
            servers: RwLock::new(HashMap::new()),
        }
    }

    /// Replace the snapshot with a fresh server list
    pub async fn refresh(&self) -> Result<usize, FetchError> {
        let listed = self.api.servers().await?;

        let mut servers = self.servers.write().await;
        servers.clear();
        for identity in listed {
            servers.insert(identity.id, identity);
        }
        debug!(servers = servers.len(), "server directory refreshed");
        Ok(servers.len())
    }

    /// Scheduled entry point; failures keep the previous snapshot
    pub async fn tick(&self) {
        if let Err(e) = self.refresh().await {
            warn!(error = %e, "server list refresh failed, keeping previous snapshot");
        }
    }

    pub async fn get(&self, id: ServerId) -> Option<ServerIdentity> {
        self.servers.read().await.get(&id).cloned()
    }

    /// Every known server, sorted by id
    pub async fn all(&self) -> Vec<ServerIdentity> {
        let servers = self.servers.read().await;
        let mut listed: Vec<ServerIdentity> = servers.values().cloned().collect();
        listed.sort_by_key(|s| s.id);
        listed
    }

    pub async fn online_count(&self) -> usize {
        self.servers
            .read()
            .await
            .values()
            .filter(|s| s.status == ServerStatus::Online)
            .count()
    }

    pub async fn len(&self) -> usize {
        self.servers.read().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AlertRecord, RawMetricSample, Subscription};
    use async_trait::async_trait;
    use chrono::NaiveDateTime;
    use std::sync::atomic::{AtomicBool, Ordering};

    struct FakeApi {
        fail: AtomicBool,
    }

    #[async_trait]
    impl MonitorApi for FakeApi {
        async fn servers(&self) -> Result<Vec<ServerIdentity>, FetchError> {
            if self.fail.load(Ordering::SeqCst) {
                return Err(FetchError::Status {
                    status: 502,
                    body: "bad gateway".to_string(),
                });
            }
            Ok(vec![
                ServerIdentity {
                    id: 1,
                    name: "web-01".to_string(),
                    ip: "10.0.0.5".to_string(),
                    platform: "Linux".to_string(),
                    status: ServerStatus::Online,
                    last_seen: None,
                },
                ServerIdentity {
                    id: 2,
                    name: "db-01".to_string(),
                    ip: "10.0.0.6".to_string(),
                    platform: "Linux".to_string(),
                    status: ServerStatus::Offline,
                    last_seen: None,
                },
            ])
        }

        async fn subscriptions(&self, _user_id: i64) -> Result<Vec<Subscription>, FetchError> {
            Ok(Vec::new())
        }

        async fn performance_data(
            &self,
            _server_id: ServerId,
            _start: NaiveDateTime,
            _end: NaiveDateTime,
        ) -> Result<Vec<RawMetricSample>, FetchError> {
            Ok(Vec::new())
        }

        async fn alerts(
            &self,
            _server_id: ServerId,
            _start: NaiveDateTime,
            _end: NaiveDateTime,
        ) -> Result<Vec<AlertRecord>, FetchError> {
            Ok(Vec::new())
        }
    }

    #[tokio::test]
    async fn test_refresh_replaces_snapshot() {
        let api = Arc::new(FakeApi {
            fail: AtomicBool::new(false),
        });
        let directory = ServerDirectory::new(api);

        assert_eq!(directory.refresh().await.unwrap(), 2);
        assert_eq!(directory.len().await, 2);
        assert_eq!(directory.online_count().await, 1);
        assert_eq!(directory.get(1).await.unwrap().name, "web-01");
        assert!(directory.get(9).await.is_none());
    }

    #[tokio::test]
    async fn test_failed_refresh_keeps_previous_snapshot() {
        let api = Arc::new(FakeApi {
            fail: AtomicBool::new(false),
        });
        let directory = ServerDirectory::new(api.clone());

        directory.tick().await;
        assert_eq!(directory.len().await, 2);

        api.fail.store(true, Ordering::SeqCst);
        directory.tick().await;
        assert_eq!(directory.len().await, 2);
    }
}
