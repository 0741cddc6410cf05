//! Multi-interface network aggregation
//!
//! A sample reports per-interface statistics; the canonical record carries
//! fleet-meaningful totals. Loopback traffic is excluded because it would
//! inflate aggregate throughput without representing external load.

use serde_json::Value;
use tracing::trace;

use super::{num_f64, num_u64, NetworkTotals};

/// Interfaces carrying this address are loopback and never counted
pub const LOOPBACK_ADDR: &str = "127.0.0.1";

/// Sum throughput and cumulative counters across non-loopback interfaces.
///
/// An interface without `io_stats` contributes zero; a section that is not a
/// map of interfaces yields all-zero totals.
pub fn aggregate_interfaces(network_info: &Value) -> NetworkTotals {
    let Some(interfaces) = network_info.as_object() else {
        return NetworkTotals::default();
    };

    let mut totals = NetworkTotals::default();
    for (name, if_data) in interfaces {
        if is_loopback(if_data) {
            trace!(interface = %name, "skipping loopback interface");
            continue;
        }
        let Some(io_stats) = if_data.get("io_stats") else {
            continue;
        };
        totals.upload_speed += num_f64(io_stats.get("upload_speed"));
        totals.download_speed += num_f64(io_stats.get("download_speed"));
        totals.total_upload += num_u64(io_stats.get("total_upload"));
        totals.total_download += num_u64(io_stats.get("total_download"));
    }
    totals
}

fn is_loopback(if_data: &Value) -> bool {
    if_data
        .get("addresses")
        .and_then(Value::as_array)
        .map(|addresses| {
            addresses
                .iter()
                .any(|addr| addr.get("ip").and_then(Value::as_str) == Some(LOOPBACK_ADDR))
        })
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_sums_across_interfaces() {
        let info = json!({
            "eth0": {
                "addresses": [{"ip": "10.0.0.5"}],
                "io_stats": {
                    "upload_speed": 100.0,
                    "download_speed": 50.0,
                    "total_upload": 1000,
                    "total_download": 500
                }
            },
            "eth1": {
                "addresses": [{"ip": "10.0.0.6"}],
                "io_stats": {
                    "upload_speed": 25.0,
                    "download_speed": 75.0,
                    "total_upload": 250,
                    "total_download": 750
                }
            }
        });

        let totals = aggregate_interfaces(&info);
        assert_eq!(totals.upload_speed, 125.0);
        assert_eq!(totals.download_speed, 125.0);
        assert_eq!(totals.total_upload, 1250);
        assert_eq!(totals.total_download, 1250);
    }

    #[test]
    fn test_loopback_contributes_nothing() {
        let info = json!({
            "lo": {
                "addresses": [{"ip": "127.0.0.1"}],
                "io_stats": {
                    "upload_speed": 9999.0,
                    "download_speed": 9999.0,
                    "total_upload": 999_999,
                    "total_download": 999_999
                }
            },
            "eth0": {
                "addresses": [{"ip": "10.0.0.5"}],
                "io_stats": {
                    "upload_speed": 10.0,
                    "download_speed": 20.0,
                    "total_upload": 100,
                    "total_download": 200
                }
            }
        });

        let totals = aggregate_interfaces(&info);
        assert_eq!(totals.upload_speed, 10.0);
        assert_eq!(totals.download_speed, 20.0);
        assert_eq!(totals.total_upload, 100);
        assert_eq!(totals.total_download, 200);
    }

    #[test]
    fn test_interface_without_io_stats_contributes_zero() {
        let info = json!({
            "eth0": {"addresses": [{"ip": "10.0.0.5"}]}
        });

        assert_eq!(aggregate_interfaces(&info), NetworkTotals::default());
    }

    #[test]
    fn test_non_object_section_yields_zero_totals() {
        assert_eq!(aggregate_interfaces(&json!(null)), NetworkTotals::default());
        assert_eq!(aggregate_interfaces(&json!([1, 2])), NetworkTotals::default());
    }
}
