//! Backend API seam

use async_trait::async_trait;
use chrono::NaiveDateTime;

use crate::error::FetchError;
use crate::models::{AlertRecord, RawMetricSample, ServerId, ServerIdentity, Subscription};

/// The slice of the backend REST surface this engine consumes.
///
/// [`ApiClient`](super::ApiClient) is the production implementation; tests
/// substitute in-memory fakes.
#[async_trait]
pub trait MonitorApi: Send + Sync {
    async fn servers(&self) -> Result<Vec<ServerIdentity>, FetchError>;

    async fn subscriptions(&self, user_id: i64) -> Result<Vec<Subscription>, FetchError>;

    async fn performance_data(
        &self,
        server_id: ServerId,
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> Result<Vec<RawMetricSample>, FetchError>;

    async fn alerts(
        &self,
        server_id: ServerId,
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> Result<Vec<AlertRecord>, FetchError>;
}
