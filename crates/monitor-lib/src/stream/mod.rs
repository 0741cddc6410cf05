//! Live sample ingestion over the push channel
//!
//! One long-lived WebSocket per authenticated user. On connect the ingestor
//! joins the user's room, then merges admitted samples into the timeline
//! until the connection ends. Disconnects surface as status; reconnection is
//! always explicit, never silent, and backoff policy belongs to the caller.
//! Missed events are not buffered: gaps in the live tail are backfilled by
//! the next history poll.

mod message;

pub use message::{decode_frame, JoinMessage, PushEvent};

use std::sync::Arc;

use chrono::{NaiveDateTime, Utc};
use futures::{SinkExt, StreamExt};
use serde::Serialize;
use tokio::sync::RwLock;
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{debug, info, warn};

use crate::error::ConnectionError;
use crate::models::SubscriptionScope;
use crate::normalize::normalize_sample;
use crate::timeline::TimelineStore;

/// Client-observable connection states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionState {
    Connecting,
    Connected,
    Disconnected,
}

/// Snapshot of the ingestor's state
#[derive(Debug, Clone, Serialize)]
pub struct StreamStatus {
    pub state: ConnectionState,
    pub last_error: Option<String>,
    #[serde(with = "crate::models::wire_time::option")]
    pub last_received: Option<NaiveDateTime>,
    pub samples_ingested: u64,
    pub events_dropped: u64,
}

impl Default for StreamStatus {
    fn default() -> Self {
        Self {
            state: ConnectionState::Disconnected,
            last_error: None,
            last_received: None,
            samples_ingested: 0,
            events_dropped: 0,
        }
    }
}

/// Consumes push events and merges admitted samples into the timeline
pub struct StreamIngestor {
    ws_url: String,
    user_id: i64,
    store: Arc<TimelineStore>,
    scope: Arc<SubscriptionScope>,
    status: RwLock<StreamStatus>,
}

impl StreamIngestor {
    pub fn new(
        ws_url: impl Into<String>,
        user_id: i64,
        store: Arc<TimelineStore>,
        scope: Arc<SubscriptionScope>,
    ) -> Self {
        Self {
            ws_url: ws_url.into(),
            user_id,
            store,
            scope,
            status: RwLock::new(StreamStatus::default()),
        }
    }

    pub async fn status(&self) -> StreamStatus {
        self.status.read().await.clone()
    }

    /// Connect, join the user's room, and ingest until the connection ends.
    ///
    /// Returns when the peer closes or the transport fails. No data is
    /// ingested while disconnected; call [`reconnect`](Self::reconnect) to
    /// resume.
    pub async fn run_once(&self) -> Result<(), ConnectionError> {
        {
            let mut status = self.status.write().await;
            status.state = ConnectionState::Connecting;
        }

        let url = format!("{}?user_id={}", self.ws_url, self.user_id);
        let (ws_stream, _response) = match connect_async(url.as_str()).await {
            Ok(ok) => ok,
            Err(e) => return Err(self.record_disconnect(ConnectionError::WebSocket(e)).await),
        };

        let (mut write, mut read) = ws_stream.split();
        let join = JoinMessage::for_user(self.user_id);
        if let Err(e) = write.send(Message::Text(join.to_text())).await {
            return Err(self.record_disconnect(ConnectionError::WebSocket(e)).await);
        }

        {
            let mut status = self.status.write().await;
            status.state = ConnectionState::Connected;
            status.last_error = None;
        }
        info!(user_id = self.user_id, "joined push channel room");

        while let Some(frame) = read.next().await {
            match frame {
                Ok(Message::Text(text)) => self.ingest_frame(&text).await,
                Ok(Message::Ping(payload)) => {
                    if write.send(Message::Pong(payload)).await.is_err() {
                        break;
                    }
                }
                Ok(Message::Close(_)) => break,
                Ok(_) => {}
                Err(e) => {
                    return Err(self.record_disconnect(ConnectionError::WebSocket(e)).await)
                }
            }
        }

        Err(self.record_disconnect(ConnectionError::Closed).await)
    }

    /// Deliberate re-entry point after a disconnect
    pub async fn reconnect(&self) -> Result<(), ConnectionError> {
        self.run_once().await
    }

    async fn ingest_frame(&self, text: &str) {
        match decode_frame(text) {
            Ok(PushEvent::ServerData(samples)) => {
                let mut admitted = 0u64;
                for raw in &samples {
                    let Ok(sample) = normalize_sample(raw) else {
                        debug!("skipping unkeyed live sample");
                        continue;
                    };
                    if !self.scope.contains(sample.server_id) {
                        debug!(
                            server_id = sample.server_id,
                            "live sample outside subscription scope"
                        );
                        continue;
                    }
                    if self.store.merge(sample).await {
                        admitted += 1;
                    }
                }

                let mut status = self.status.write().await;
                status.samples_ingested += admitted;
                status.last_received = Some(Utc::now().naive_utc());
            }
            Ok(PushEvent::Ignored) => {}
            Err(e) => {
                warn!(error = %e, "dropping malformed push event");
                self.status.write().await.events_dropped += 1;
            }
        }
    }

    async fn record_disconnect(&self, error: ConnectionError) -> ConnectionError {
        let mut status = self.status.write().await;
        status.state = ConnectionState::Disconnected;
        status.last_error = Some(error.to_string());
        warn!(error = %error, "push channel disconnected");
        error
    }
}
