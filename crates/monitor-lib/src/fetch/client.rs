//! HTTP client for the metrics/alerts backend

use async_trait::async_trait;
use chrono::NaiveDateTime;
use reqwest::Client;
use serde::{de::DeserializeOwned, Deserialize};
use url::Url;

use super::api::MonitorApi;
use super::window::format_timestamp;
use crate::error::FetchError;
use crate::models::{AlertRecord, RawMetricSample, ServerId, ServerIdentity, Subscription};

/// Response envelope for list endpoints: `{status, data: [...]}`
#[derive(Debug, Deserialize)]
struct DataEnvelope<T> {
    status: bool,
    #[serde(default)]
    message: Option<String>,
    #[serde(default = "Vec::new")]
    data: Vec<T>,
}

/// Subscriptions arrive under a `servers` key instead of `data`
#[derive(Debug, Deserialize)]
struct SubscriptionsEnvelope {
    status: bool,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    servers: Vec<Subscription>,
}

/// Bearer-authenticated client for the backend REST API
pub struct ApiClient {
    client: Client,
    base_url: Url,
    token: String,
}

impl ApiClient {
    /// `base_url` is the common API base path, e.g. `http://host:7777/api`
    pub fn new(base_url: &str, token: impl Into<String>) -> Result<Self, FetchError> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()?;

        // joined paths are relative, so the base must end with a slash
        let mut base = base_url.to_string();
        if !base.ends_with('/') {
            base.push('/');
        }
        let base_url = Url::parse(&base)?;

        Ok(Self {
            client,
            base_url,
            token: token.into(),
        })
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, FetchError> {
        let url = self.base_url.join(path)?;

        let response = self
            .client
            .get(url)
            .bearer_auth(&self.token)
            .query(query)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(FetchError::Status { status, body });
        }

        Ok(response.json().await?)
    }

    fn accept<T>(status: bool, message: Option<String>, data: T) -> Result<T, FetchError> {
        if status {
            Ok(data)
        } else {
            Err(FetchError::Rejected(
                message.unwrap_or_else(|| "request rejected".to_string()),
            ))
        }
    }
}

#[async_trait]
impl MonitorApi for ApiClient {
    async fn servers(&self) -> Result<Vec<ServerIdentity>, FetchError> {
        let envelope: DataEnvelope<ServerIdentity> = self.get_json("servers", &[]).await?;
        Self::accept(envelope.status, envelope.message, envelope.data)
    }

    async fn subscriptions(&self, user_id: i64) -> Result<Vec<Subscription>, FetchError> {
        let envelope: SubscriptionsEnvelope = self
            .get_json("subscriptions", &[("user_id", user_id.to_string())])
            .await?;
        Self::accept(envelope.status, envelope.message, envelope.servers)
    }

    async fn performance_data(
        &self,
        server_id: ServerId,
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> Result<Vec<RawMetricSample>, FetchError> {
        let envelope: DataEnvelope<RawMetricSample> = self
            .get_json(
                "performance-data",
                &[
                    ("server_id", server_id.to_string()),
                    ("start_time", format_timestamp(&start)),
                    ("end_time", format_timestamp(&end)),
                ],
            )
            .await?;
        Self::accept(envelope.status, envelope.message, envelope.data)
    }

    async fn alerts(
        &self,
        server_id: ServerId,
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> Result<Vec<AlertRecord>, FetchError> {
        let envelope: DataEnvelope<AlertRecord> = self
            .get_json(
                "alerts",
                &[
                    ("server_id", server_id.to_string()),
                    ("start_time", format_timestamp(&start)),
                    ("end_time", format_timestamp(&end)),
                ],
            )
            .await?;
        Self::accept(envelope.status, envelope.message, envelope.data)
    }
}
