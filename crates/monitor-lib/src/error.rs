//! Typed error outcomes, distinguished by origin so the consuming layer can
//! choose retry vs display policy. None of these terminate the process.

use thiserror::Error;

/// Failures while querying the metrics/alerts backend over HTTP
#[derive(Debug, Error)]
pub enum FetchError {
    /// Transport-level failure (connect, timeout, body read)
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The backend answered with a non-2xx status
    #[error("api returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    /// A 2xx response whose envelope carried `status: false`
    #[error("backend rejected request: {0}")]
    Rejected(String),

    /// The configured base URL or a joined path is not a valid URL
    #[error("invalid api url: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

/// Failures while decoding upstream payloads
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("malformed json: {0}")]
    Json(#[from] serde_json::Error),

    /// A push event whose `data` slot is missing or not an array; the whole
    /// event is dropped, no partial merge
    #[error("push payload has no `data` array")]
    MissingDataArray,

    /// A sample without a usable `(server_id, timestamp)` identity key
    #[error("sample is missing its identity key")]
    MissingIdentity,

    #[error("invalid timestamp `{0}`")]
    Timestamp(String),
}

/// Failures on the push channel
#[derive(Debug, Error)]
pub enum ConnectionError {
    #[error("websocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    #[error("connection closed by server")]
    Closed,
}
