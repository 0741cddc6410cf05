//! Time-window resolution for bounded history queries

use std::time::Duration;

use chrono::{Duration as ChronoDuration, NaiveDate, NaiveDateTime, NaiveTime};

use crate::error::ParseError;
use crate::models::wire_time;

/// Render a timestamp in the backend's wire format
pub fn format_timestamp(ts: &NaiveDateTime) -> String {
    ts.format(wire_time::FORMAT).to_string()
}

pub fn parse_timestamp(s: &str) -> Result<NaiveDateTime, ParseError> {
    NaiveDateTime::parse_from_str(s, wire_time::FORMAT)
        .map_err(|_| ParseError::Timestamp(s.to_string()))
}

/// Named window presets plus explicit custom day ranges
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeRange {
    Hour1,
    Hours6,
    Hours12,
    Day1,
    Week1,
    Month1,
    /// Whole-day span: `start 00:00:00` through `end 23:59:59`
    Custom { start: NaiveDate, end: NaiveDate },
}

impl TimeRange {
    /// Accepts the preset names the dashboard uses; `1week`/`7days` and
    /// `1month`/`30days` are synonyms.
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "1hour" => Some(Self::Hour1),
            "6hours" => Some(Self::Hours6),
            "12hours" => Some(Self::Hours12),
            "1day" | "24hours" => Some(Self::Day1),
            "1week" | "7days" => Some(Self::Week1),
            "1month" | "30days" => Some(Self::Month1),
            _ => None,
        }
    }

    /// Resolve to an inclusive `[start, end]` pair. Presets span
    /// `now − duration` to `now`.
    pub fn resolve(&self, now: NaiveDateTime) -> (NaiveDateTime, NaiveDateTime) {
        match *self {
            TimeRange::Custom { start, end } => (day_start(start), day_end(end)),
            TimeRange::Hour1 => preset(now, ChronoDuration::hours(1)),
            TimeRange::Hours6 => preset(now, ChronoDuration::hours(6)),
            TimeRange::Hours12 => preset(now, ChronoDuration::hours(12)),
            TimeRange::Day1 => preset(now, ChronoDuration::days(1)),
            TimeRange::Week1 => preset(now, ChronoDuration::days(7)),
            TimeRange::Month1 => preset(now, ChronoDuration::days(30)),
        }
    }

    /// Auto-refresh cadence. Only the two narrowest presets poll; wider
    /// windows and custom ranges fetch once per explicit request to bound
    /// backend load.
    pub fn refresh_interval(&self) -> Option<Duration> {
        match self {
            TimeRange::Hour1 => Some(Duration::from_secs(30)),
            TimeRange::Hours6 => Some(Duration::from_secs(60)),
            _ => None,
        }
    }

    /// Stable identifier used for timer keys and logging
    pub fn label(&self) -> String {
        match self {
            TimeRange::Hour1 => "1hour".to_string(),
            TimeRange::Hours6 => "6hours".to_string(),
            TimeRange::Hours12 => "12hours".to_string(),
            TimeRange::Day1 => "1day".to_string(),
            TimeRange::Week1 => "1week".to_string(),
            TimeRange::Month1 => "1month".to_string(),
            TimeRange::Custom { start, end } => format!("{start}..{end}"),
        }
    }
}

fn preset(now: NaiveDateTime, window: ChronoDuration) -> (NaiveDateTime, NaiveDateTime) {
    (now - window, now)
}

fn day_start(day: NaiveDate) -> NaiveDateTime {
    day.and_time(NaiveTime::MIN)
}

fn day_end(day: NaiveDate) -> NaiveDateTime {
    day.and_time(NaiveTime::from_hms_opt(23, 59, 59).unwrap_or(NaiveTime::MIN))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ts(s: &str) -> NaiveDateTime {
        parse_timestamp(s).unwrap()
    }

    #[test]
    fn test_preset_windows_end_at_now() {
        let now = ts("2024-03-08 12:00:00");

        let (start, end) = TimeRange::Hour1.resolve(now);
        assert_eq!(start, ts("2024-03-08 11:00:00"));
        assert_eq!(end, now);

        let (start, _) = TimeRange::Week1.resolve(now);
        assert_eq!(start, ts("2024-03-01 12:00:00"));

        let (start, _) = TimeRange::Month1.resolve(now);
        assert_eq!(start, ts("2024-02-07 12:00:00"));
    }

    #[test]
    fn test_custom_range_spans_whole_days() {
        let range = TimeRange::Custom {
            start: NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
            end: NaiveDate::from_ymd_opt(2024, 3, 3).unwrap(),
        };
        let (start, end) = range.resolve(ts("2024-06-01 09:30:00"));
        assert_eq!(format_timestamp(&start), "2024-03-01 00:00:00");
        assert_eq!(format_timestamp(&end), "2024-03-03 23:59:59");
    }

    #[test]
    fn test_refresh_cadence() {
        assert_eq!(
            TimeRange::Hour1.refresh_interval(),
            Some(Duration::from_secs(30))
        );
        assert_eq!(
            TimeRange::Hours6.refresh_interval(),
            Some(Duration::from_secs(60))
        );
        assert_eq!(TimeRange::Hours12.refresh_interval(), None);
        assert_eq!(TimeRange::Month1.refresh_interval(), None);
        let custom = TimeRange::Custom {
            start: NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
            end: NaiveDate::from_ymd_opt(2024, 3, 3).unwrap(),
        };
        assert_eq!(custom.refresh_interval(), None);
    }

    #[test]
    fn test_parse_accepts_synonyms() {
        assert_eq!(TimeRange::parse("7days"), Some(TimeRange::Week1));
        assert_eq!(TimeRange::parse("1week"), Some(TimeRange::Week1));
        assert_eq!(TimeRange::parse("30days"), Some(TimeRange::Month1));
        assert_eq!(TimeRange::parse("yesterday"), None);
    }

    #[test]
    fn test_timestamp_roundtrip() {
        let original = "2024-03-08 12:34:56";
        assert_eq!(format_timestamp(&ts(original)), original);
        assert!(parse_timestamp("03/08/2024").is_err());
    }
}
