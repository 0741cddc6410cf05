//! Normalization of raw backend payloads into canonical numeric records
//!
//! The backend delivers loosely-typed nested JSON; this module performs one
//! schema-validating pass at ingestion so every downstream consumer reads
//! only the canonical form. A corrupt metric field never discards an
//! otherwise-valid sample: it degrades to a zero-valued default.

mod format;
mod network;

pub use format::{format_bytes, format_percent, format_speed};
pub use network::{aggregate_interfaces, LOOPBACK_ADDR};

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ParseError;
use crate::models::{RawMetricSample, ServerId};

/// CPU section of a canonical sample
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CpuMetrics {
    pub percent_usage: f64,
}

/// Memory section of a canonical sample
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MemoryMetrics {
    pub total: u64,
    pub used: u64,
    pub percent: f64,
}

/// Disk section of a canonical sample; a single partition is reported
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiskMetrics {
    pub mountpoint: String,
    pub total: u64,
    pub used: u64,
    pub percent: f64,
}

impl Default for DiskMetrics {
    fn default() -> Self {
        Self {
            mountpoint: "/".to_string(),
            total: 0,
            used: 0,
            percent: 0.0,
        }
    }
}

/// Network totals summed across non-loopback interfaces
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NetworkTotals {
    pub upload_speed: f64,
    pub download_speed: f64,
    pub total_upload: u64,
    pub total_download: u64,
}

/// Canonical numeric record for one `(server_id, timestamp)` snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanonicalSample {
    pub server_id: ServerId,
    #[serde(with = "crate::models::wire_time")]
    pub timestamp: NaiveDateTime,
    pub cpu: CpuMetrics,
    pub memory: MemoryMetrics,
    pub disk: DiskMetrics,
    pub network: NetworkTotals,
}

/// Normalize one raw sample into its canonical form.
///
/// Fails only when the identity key is unusable; every metric section
/// degrades independently to zeroed defaults.
pub fn normalize_sample(raw: &RawMetricSample) -> Result<CanonicalSample, ParseError> {
    if raw.server_id <= 0 {
        return Err(ParseError::MissingIdentity);
    }
    let timestamp = raw.timestamp.ok_or(ParseError::MissingIdentity)?;

    let cpu_info = decode_section(&raw.cpu_info);
    let memory_info = decode_section(&raw.memory_info);
    let disk_info = decode_section(&raw.disk_info);
    let network_info = decode_section(&raw.network_info);

    Ok(CanonicalSample {
        server_id: raw.server_id,
        timestamp,
        cpu: normalize_cpu(&cpu_info),
        memory: normalize_memory(&memory_info),
        disk: normalize_disk(&disk_info),
        network: aggregate_interfaces(&network_info),
    })
}

/// Push-delivered samples wrap each section in a JSON string; history entries
/// carry objects. Either decodes to the same section value, and anything
/// undecodable collapses to null (and from there to defaults).
fn decode_section(value: &Value) -> Value {
    match value {
        Value::String(s) => serde_json::from_str(s).unwrap_or(Value::Null),
        other => other.clone(),
    }
}

fn normalize_cpu(section: &Value) -> CpuMetrics {
    CpuMetrics {
        percent_usage: num_f64(section.get("percent_usage")),
    }
}

fn normalize_memory(section: &Value) -> MemoryMetrics {
    MemoryMetrics {
        total: num_u64(section.get("total")),
        used: num_u64(section.get("used")),
        percent: num_f64(section.get("percent")),
    }
}

/// Report the root partition; without one, fall back to the first entry,
/// and without any entries to an all-zero `/` record.
fn normalize_disk(section: &Value) -> DiskMetrics {
    let Some(entries) = section.as_array() else {
        return DiskMetrics::default();
    };

    let chosen = entries
        .iter()
        .find(|entry| entry.get("mountpoint").and_then(Value::as_str) == Some("/"))
        .or_else(|| entries.first());

    match chosen {
        Some(entry) => DiskMetrics {
            mountpoint: entry
                .get("mountpoint")
                .and_then(Value::as_str)
                .unwrap_or("/")
                .to_string(),
            total: num_u64(entry.get("total")),
            used: num_u64(entry.get("used")),
            percent: num_f64(entry.get("percent")),
        },
        None => DiskMetrics::default(),
    }
}

pub(crate) fn num_f64(value: Option<&Value>) -> f64 {
    value.and_then(Value::as_f64).filter(|v| v.is_finite()).unwrap_or(0.0)
}

pub(crate) fn num_u64(value: Option<&Value>) -> u64 {
    match value.and_then(Value::as_u64) {
        Some(v) => v,
        // some agents report byte counts as floats
        None => value
            .and_then(Value::as_f64)
            .filter(|v| v.is_finite() && *v >= 0.0)
            .map(|v| v as u64)
            .unwrap_or(0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::wire_time;
    use serde_json::json;

    fn raw(value: serde_json::Value) -> RawMetricSample {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_normalize_complete_sample() {
        let sample = raw(json!({
            "server_id": 3,
            "timestamp": "2024-03-01 10:15:00",
            "cpu_info": {"percent_usage": 41.5},
            "memory_info": {"total": 8192, "used": 4096, "percent": 50.0},
            "disk_info": [
                {"mountpoint": "/boot", "total": 512, "used": 128, "percent": 25.0},
                {"mountpoint": "/", "total": 102400, "used": 51200, "percent": 50.0}
            ],
            "network_info": {
                "eth0": {
                    "addresses": [{"ip": "10.0.0.5"}],
                    "io_stats": {
                        "upload_speed": 100.0,
                        "download_speed": 200.0,
                        "total_upload": 1000,
                        "total_download": 2000
                    }
                }
            }
        }));

        let canonical = normalize_sample(&sample).unwrap();
        assert_eq!(canonical.cpu.percent_usage, 41.5);
        assert_eq!(canonical.memory.used, 4096);
        assert_eq!(canonical.disk.mountpoint, "/");
        assert_eq!(canonical.disk.percent, 50.0);
        assert_eq!(canonical.network.download_speed, 200.0);
    }

    #[test]
    fn test_corrupt_sections_degrade_to_defaults() {
        let sample = raw(json!({
            "server_id": 3,
            "timestamp": "2024-03-01 10:15:00",
            "cpu_info": "not json at all",
            "memory_info": {"total": "also wrong"},
            "disk_info": 42,
            "network_info": null
        }));

        let canonical = normalize_sample(&sample).unwrap();
        assert_eq!(canonical.cpu.percent_usage, 0.0);
        assert_eq!(canonical.memory.total, 0);
        assert_eq!(canonical.disk, DiskMetrics::default());
        assert_eq!(canonical.network, NetworkTotals::default());
    }

    #[test]
    fn test_push_path_string_sections_decode() {
        let sample = raw(json!({
            "server_id": 3,
            "timestamp": "2024-03-01 10:15:00",
            "cpu_info": "{\"percent_usage\": 77.0}",
            "memory_info": "{\"total\": 16, \"used\": 8, \"percent\": 50.0}"
        }));

        let canonical = normalize_sample(&sample).unwrap();
        assert_eq!(canonical.cpu.percent_usage, 77.0);
        assert_eq!(canonical.memory.total, 16);
    }

    #[test]
    fn test_disk_falls_back_to_first_entry() {
        let sample = raw(json!({
            "server_id": 3,
            "timestamp": "2024-03-01 10:15:00",
            "disk_info": [
                {"mountpoint": "/data", "total": 100, "used": 90, "percent": 90.0},
                {"mountpoint": "/var", "total": 100, "used": 10, "percent": 10.0}
            ]
        }));

        let disk = normalize_sample(&sample).unwrap().disk;
        assert_eq!(disk.mountpoint, "/data");
        assert_eq!(disk.percent, 90.0);
    }

    #[test]
    fn test_missing_identity_is_rejected() {
        let no_id = raw(json!({"timestamp": "2024-03-01 10:15:00"}));
        assert!(matches!(
            normalize_sample(&no_id),
            Err(ParseError::MissingIdentity)
        ));

        let no_ts = raw(json!({"server_id": 3}));
        assert!(matches!(
            normalize_sample(&no_ts),
            Err(ParseError::MissingIdentity)
        ));
    }

    #[test]
    fn test_canonical_sample_serializes_wire_timestamps() {
        let ts = NaiveDateTime::parse_from_str("2024-03-01 10:15:00", wire_time::FORMAT).unwrap();
        let sample = CanonicalSample {
            server_id: 1,
            timestamp: ts,
            cpu: CpuMetrics::default(),
            memory: MemoryMetrics::default(),
            disk: DiskMetrics::default(),
            network: NetworkTotals::default(),
        };

        let value = serde_json::to_value(&sample).unwrap();
        assert_eq!(value["timestamp"], "2024-03-01 10:15:00");
    }
}
