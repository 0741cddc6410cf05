//! Monitor configuration

use anyhow::Result;
use serde::Deserialize;

/// Daemon configuration, read from `MONITOR_*` environment variables
#[derive(Debug, Clone, Deserialize)]
pub struct MonitorConfig {
    /// REST base path of the metrics/alerts backend
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,

    /// Push channel endpoint
    #[serde(default = "default_ws_url")]
    pub ws_url: String,

    /// User whose subscriptions scope the engine
    #[serde(default = "default_user_id")]
    pub user_id: i64,

    /// Bearer token for the backend API
    #[serde(default)]
    pub auth_token: String,

    /// Port for the health/metrics HTTP surface
    #[serde(default = "default_api_port")]
    pub api_port: u16,

    /// Named window preset for history loads
    #[serde(default = "default_time_range")]
    pub time_range: String,

    /// Per-server timeline retention cap
    #[serde(default = "default_retention")]
    pub retention_per_server: usize,

    /// Server-list poll cadence in seconds
    #[serde(default = "default_directory_refresh")]
    pub directory_refresh_secs: u64,

    /// Alert recount cadence in seconds
    #[serde(default = "default_alert_recount")]
    pub alert_recount_secs: u64,

    /// Delay before re-dialing a dropped push channel
    #[serde(default = "default_reconnect_backoff")]
    pub reconnect_backoff_secs: u64,
}

fn default_api_base_url() -> String {
    "http://localhost:7777/api".to_string()
}

fn default_ws_url() -> String {
    "ws://localhost:7777/ws".to_string()
}

fn default_user_id() -> i64 {
    1
}

fn default_api_port() -> u16 {
    8080
}

fn default_time_range() -> String {
    "1day".to_string()
}

fn default_retention() -> usize {
    10_000
}

fn default_directory_refresh() -> u64 {
    30
}

fn default_alert_recount() -> u64 {
    60
}

fn default_reconnect_backoff() -> u64 {
    5
}

impl MonitorConfig {
    /// Load configuration from the environment
    pub fn load() -> Result<Self> {
        let config = config::Config::builder()
            .add_source(config::Environment::with_prefix("MONITOR"))
            .build()?;

        Ok(config.try_deserialize().unwrap_or_else(|_| MonitorConfig {
            api_base_url: default_api_base_url(),
            ws_url: default_ws_url(),
            user_id: default_user_id(),
            auth_token: String::new(),
            api_port: default_api_port(),
            time_range: default_time_range(),
            retention_per_server: default_retention(),
            directory_refresh_secs: default_directory_refresh(),
            alert_recount_secs: default_alert_recount(),
            reconnect_backoff_secs: default_reconnect_backoff(),
        }))
    }
}
