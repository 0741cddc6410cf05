//! Alert severity classification
//!
//! Severity is a pure function of an [`AlertRecord`]'s fields, recomputed on
//! every read. Callers that filter by tier use the same predicates that drive
//! classification, so filtering and labeling cannot diverge.

mod counter;

pub use counter::{AlertDigest, SeverityCounts, SubscriptionAlertCounter};

use serde::{Deserialize, Serialize};

use crate::models::AlertRecord;
use crate::normalize::{format_bytes, format_percent};

/// Fraction of a threshold above which a quiet metric counts as
/// near-threshold. The comparison is strictly greater-than: a value exactly
/// at 80% of its threshold stays low.
pub const NEAR_THRESHOLD_RATIO: f64 = 0.8;

/// Derived severity tier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    High,
    Medium,
    Low,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::High => write!(f, "high"),
            Severity::Medium => write!(f, "medium"),
            Severity::Low => write!(f, "low"),
        }
    }
}

/// True when any of the five metric flags fired
pub fn is_high(record: &AlertRecord) -> bool {
    record.cpu_alert.alert
        || record.memory_alert.alert
        || record.disk_alert.alert
        || record.network_alert.download_alert
        || record.network_alert.upload_alert
}

/// True when any metric sits above 80% of its threshold while its own flag
/// is still quiet
pub fn is_near_threshold(record: &AlertRecord) -> bool {
    let network = &record.network_alert;
    near(
        record.cpu_alert.current_value,
        record.cpu_alert.threshold,
        record.cpu_alert.alert,
    ) || near(
        record.memory_alert.current_value,
        record.memory_alert.threshold,
        record.memory_alert.alert,
    ) || near(
        record.disk_alert.current_value,
        record.disk_alert.threshold,
        record.disk_alert.alert,
    ) || near(
        network.current_download,
        network.download_threshold,
        network.download_alert,
    ) || near(
        network.current_upload,
        network.upload_threshold,
        network.upload_alert,
    )
}

fn near(current: f64, threshold: f64, alert: bool) -> bool {
    !alert && current > NEAR_THRESHOLD_RATIO * threshold
}

/// Classify one record.
///
/// Non-valid records never escalate; a fired flag takes precedence over the
/// near-threshold check.
pub fn classify(record: &AlertRecord) -> Severity {
    if !record.is_valid_alert {
        return Severity::Low;
    }
    if is_high(record) {
        Severity::High
    } else if is_near_threshold(record) {
        Severity::Medium
    } else {
        Severity::Low
    }
}

/// Caller-selected tier filter.
///
/// High and medium are re-derived from [`is_high`] / [`is_near_threshold`]
/// rather than a stored label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PriorityFilter {
    #[default]
    All,
    High,
    Medium,
    Low,
}

impl PriorityFilter {
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "all" => Some(Self::All),
            "high" => Some(Self::High),
            "medium" => Some(Self::Medium),
            "low" => Some(Self::Low),
            _ => None,
        }
    }

    pub fn matches(&self, record: &AlertRecord) -> bool {
        match self {
            PriorityFilter::All => true,
            PriorityFilter::High => is_high(record),
            PriorityFilter::Medium => is_near_threshold(record),
            PriorityFilter::Low => !is_high(record) && !is_near_threshold(record),
        }
    }
}

/// Keep only valid records matching the filter, preserving input order
pub fn filter_alerts(records: &[AlertRecord], filter: PriorityFilter) -> Vec<&AlertRecord> {
    records
        .iter()
        .filter(|record| record.is_valid_alert)
        .filter(|record| filter.matches(record))
        .collect()
}

/// Human-readable digest of the metrics that fired, `" | "`-joined
pub fn alert_summary(record: &AlertRecord) -> String {
    let mut issues = Vec::new();

    if record.cpu_alert.alert {
        issues.push(format!(
            "CPU above threshold at {}",
            format_percent(record.cpu_alert.current_value)
        ));
    }
    if record.memory_alert.alert {
        issues.push(format!(
            "memory above threshold at {}",
            format_percent(record.memory_alert.current_value)
        ));
    }
    if record.disk_alert.alert {
        issues.push(format!(
            "disk above threshold at {}",
            format_percent(record.disk_alert.current_value)
        ));
    }
    if record.network_alert.download_alert {
        issues.push(format!(
            "download traffic {} above threshold",
            format_bytes(record.network_alert.current_download)
        ));
    }
    if record.network_alert.upload_alert {
        issues.push(format!(
            "upload traffic {} above threshold",
            format_bytes(record.network_alert.current_upload)
        ));
    }

    issues.join(" | ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{MetricAlert, NetworkAlert};
    use chrono::NaiveDateTime;

    fn quiet_record() -> AlertRecord {
        AlertRecord {
            id: 1,
            server_id: 1,
            timestamp: NaiveDateTime::default(),
            cpu_alert: MetricAlert {
                current_value: 10.0,
                threshold: 90.0,
                alert: false,
            },
            memory_alert: MetricAlert {
                current_value: 10.0,
                threshold: 85.0,
                alert: false,
            },
            disk_alert: MetricAlert {
                current_value: 10.0,
                threshold: 90.0,
                alert: false,
            },
            network_alert: NetworkAlert {
                download_alert: false,
                upload_alert: false,
                current_download: 0.0,
                current_upload: 0.0,
                download_threshold: 1_000_000.0,
                upload_threshold: 1_000_000.0,
            },
            is_valid_alert: true,
        }
    }

    #[test]
    fn test_fired_flag_takes_precedence() {
        let mut record = quiet_record();
        record.cpu_alert.alert = true;
        // every other metric is far below 80% of its threshold
        assert_eq!(classify(&record), Severity::High);
    }

    #[test]
    fn test_invalid_record_never_escalates() {
        let mut record = quiet_record();
        record.cpu_alert.alert = true;
        record.is_valid_alert = false;
        assert_eq!(classify(&record), Severity::Low);
    }

    #[test]
    fn test_medium_boundary_is_strict() {
        let mut record = quiet_record();
        record.memory_alert.current_value = 0.8 * record.memory_alert.threshold;
        assert_eq!(classify(&record), Severity::Low);

        record.memory_alert.current_value = 0.80001 * record.memory_alert.threshold;
        assert_eq!(classify(&record), Severity::Medium);
    }

    #[test]
    fn test_network_directions_count_toward_medium() {
        let mut record = quiet_record();
        record.network_alert.current_upload = 900_000.0;
        assert_eq!(classify(&record), Severity::Medium);
    }

    #[test]
    fn test_filter_uses_predicates_not_labels() {
        let mut high = quiet_record();
        high.disk_alert.alert = true;

        let mut medium = quiet_record();
        medium.id = 2;
        medium.cpu_alert.current_value = 89.0;

        let mut invalid = quiet_record();
        invalid.id = 3;
        invalid.cpu_alert.alert = true;
        invalid.is_valid_alert = false;

        let records = vec![high, medium, invalid];

        let highs = filter_alerts(&records, PriorityFilter::High);
        assert_eq!(highs.len(), 1);
        assert_eq!(highs[0].id, 1);

        let mediums = filter_alerts(&records, PriorityFilter::Medium);
        assert_eq!(mediums.len(), 1);
        assert_eq!(mediums[0].id, 2);

        // invalid records are dropped before the tier filter runs
        assert_eq!(filter_alerts(&records, PriorityFilter::All).len(), 2);
        assert!(filter_alerts(&records, PriorityFilter::Low).is_empty());
    }

    #[test]
    fn test_summary_lists_fired_metrics() {
        let mut record = quiet_record();
        record.cpu_alert.alert = true;
        record.cpu_alert.current_value = 95.2;
        record.network_alert.download_alert = true;
        record.network_alert.current_download = 2_621_440.0;

        let summary = alert_summary(&record);
        assert_eq!(
            summary,
            "CPU above threshold at 95.2% | download traffic 2.5 MB above threshold"
        );
        assert!(alert_summary(&quiet_record()).is_empty());
    }

    #[test]
    fn test_severity_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&Severity::High).unwrap(), "\"high\"");
        assert_eq!(Severity::Medium.to_string(), "medium");
    }
}
