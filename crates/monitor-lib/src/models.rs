//! Wire-level data models for the fleet monitoring backend

use std::collections::HashSet;
use std::sync::RwLock;

use chrono::NaiveDateTime;
use serde::{Deserialize, Deserializer, Serialize};

/// Backend server identifier
pub type ServerId = i64;

/// Serde adapter for the backend's `YYYY-MM-DD HH:MM:SS` timestamps
pub mod wire_time {
    use chrono::NaiveDateTime;
    use serde::{Deserialize, Deserializer, Serializer};

    pub const FORMAT: &str = "%Y-%m-%d %H:%M:%S";

    pub fn serialize<S>(ts: &NaiveDateTime, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&ts.format(FORMAT).to_string())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<NaiveDateTime, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        NaiveDateTime::parse_from_str(&s, FORMAT).map_err(serde::de::Error::custom)
    }

    pub mod option {
        use chrono::NaiveDateTime;
        use serde::{Deserialize, Deserializer, Serializer};

        use super::FORMAT;

        pub fn serialize<S>(ts: &Option<NaiveDateTime>, serializer: S) -> Result<S::Ok, S::Error>
        where
            S: Serializer,
        {
            match ts {
                Some(ts) => serializer.serialize_str(&ts.format(FORMAT).to_string()),
                None => serializer.serialize_none(),
            }
        }

        pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<NaiveDateTime>, D::Error>
        where
            D: Deserializer<'de>,
        {
            match Option::<String>::deserialize(deserializer)? {
                Some(s) if !s.is_empty() => NaiveDateTime::parse_from_str(&s, FORMAT)
                    .map(Some)
                    .map_err(serde::de::Error::custom),
                _ => Ok(None),
            }
        }
    }
}

/// The backend encodes boolean flags as either JSON booleans or 0/1 integers
fn de_lenient_bool<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Lenient {
        Bool(bool),
        Int(i64),
    }

    Ok(match Lenient::deserialize(deserializer)? {
        Lenient::Bool(b) => b,
        Lenient::Int(i) => i != 0,
    })
}

/// Reachability state reported by the server-list endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServerStatus {
    Online,
    Offline,
}

impl std::fmt::Display for ServerStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ServerStatus::Online => write!(f, "online"),
            ServerStatus::Offline => write!(f, "offline"),
        }
    }
}

/// One monitored host as listed by `GET /servers`
///
/// Immutable except `status` and `last_seen`, which the periodic server-list
/// poll refreshes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerIdentity {
    pub id: ServerId,
    pub name: String,
    pub ip: String,
    pub platform: String,
    pub status: ServerStatus,
    #[serde(default, with = "wire_time::option")]
    pub last_seen: Option<NaiveDateTime>,
}

/// A user's binding to a monitored server
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Subscription {
    pub id: i64,
    pub user_id: i64,
    pub server_id: ServerId,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub notes: String,
}

/// Threshold check result for one metric category
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MetricAlert {
    #[serde(default)]
    pub current_value: f64,
    #[serde(default)]
    pub threshold: f64,
    #[serde(default, deserialize_with = "de_lenient_bool")]
    pub alert: bool,
}

/// Threshold check result for network traffic, split by direction
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NetworkAlert {
    #[serde(default, deserialize_with = "de_lenient_bool")]
    pub download_alert: bool,
    #[serde(default, deserialize_with = "de_lenient_bool")]
    pub upload_alert: bool,
    #[serde(default)]
    pub current_download: f64,
    #[serde(default)]
    pub current_upload: f64,
    #[serde(default)]
    pub download_threshold: f64,
    #[serde(default)]
    pub upload_threshold: f64,
}

/// Backend-evaluated threshold check for one sample
///
/// Read-only to this engine; severity is derived from these fields on every
/// read, never stored back.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertRecord {
    pub id: i64,
    pub server_id: ServerId,
    #[serde(with = "wire_time")]
    pub timestamp: NaiveDateTime,
    #[serde(default)]
    pub cpu_alert: MetricAlert,
    #[serde(default)]
    pub memory_alert: MetricAlert,
    #[serde(default)]
    pub disk_alert: MetricAlert,
    #[serde(default)]
    pub network_alert: NetworkAlert,
    #[serde(default, deserialize_with = "de_lenient_bool")]
    pub is_valid_alert: bool,
}

/// Raw per-sample payload as delivered by the backend
///
/// The four metric sections arrive as JSON objects on the history path but as
/// JSON-encoded *strings* on the push path; both are held verbatim and decoded
/// leniently during normalization. Field aliases accept both naming schemes.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawMetricSample {
    #[serde(default)]
    pub server_id: ServerId,
    #[serde(default, with = "wire_time::option")]
    pub timestamp: Option<NaiveDateTime>,
    #[serde(default, alias = "cpu")]
    pub cpu_info: serde_json::Value,
    #[serde(default, alias = "memory")]
    pub memory_info: serde_json::Value,
    #[serde(default, alias = "disk")]
    pub disk_info: serde_json::Value,
    #[serde(default, alias = "network")]
    pub network_info: serde_json::Value,
}

/// Shared set of server ids the current user is subscribed to
///
/// Membership changes take effect immediately for stream admission; samples
/// already stored for removed servers are not evicted retroactively.
#[derive(Debug, Default)]
pub struct SubscriptionScope {
    ids: RwLock<HashSet<ServerId>>,
}

impl SubscriptionScope {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_ids(ids: impl IntoIterator<Item = ServerId>) -> Self {
        Self {
            ids: RwLock::new(ids.into_iter().collect()),
        }
    }

    /// Swap the whole membership set, e.g. after a subscription poll
    pub fn replace(&self, ids: impl IntoIterator<Item = ServerId>) {
        *self.ids.write().unwrap() = ids.into_iter().collect();
    }

    pub fn insert(&self, id: ServerId) -> bool {
        self.ids.write().unwrap().insert(id)
    }

    pub fn remove(&self, id: ServerId) -> bool {
        self.ids.write().unwrap().remove(&id)
    }

    pub fn contains(&self, id: ServerId) -> bool {
        self.ids.read().unwrap().contains(&id)
    }

    pub fn is_empty(&self) -> bool {
        self.ids.read().unwrap().is_empty()
    }

    /// Sorted copy of the membership for deterministic iteration
    pub fn snapshot(&self) -> Vec<ServerId> {
        let mut ids: Vec<ServerId> = self.ids.read().unwrap().iter().copied().collect();
        ids.sort_unstable();
        ids
    }
}
