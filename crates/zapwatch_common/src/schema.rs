//! Error log schema
//!
//! Defines the records kept in the `error_logs` table.

use crate::error::StoreError;
use chrono::{DateTime, Datelike, NaiveDateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Timestamp layout used for storage, JSON and CSV
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Review status of an error log
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogStatus {
    /// Nobody has looked at it yet
    #[default]
    Unresolved,
    /// The underlying problem was fixed
    Resolved,
    /// Acknowledged and ignored
    Dismissed,
}

impl LogStatus {
    pub const ALL: [LogStatus; 3] = [
        LogStatus::Unresolved,
        LogStatus::Resolved,
        LogStatus::Dismissed,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            LogStatus::Unresolved => "unresolved",
            LogStatus::Resolved => "resolved",
            LogStatus::Dismissed => "dismissed",
        }
    }
}

impl fmt::Display for LogStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LogStatus {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "unresolved" => Ok(LogStatus::Unresolved),
            "resolved" => Ok(LogStatus::Resolved),
            "dismissed" => Ok(LogStatus::Dismissed),
            other => Err(StoreError::InvalidStatus(other.to_string())),
        }
    }
}

/// A stored error log
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorLogRecord {
    pub id: i64,
    /// Name of the zap that failed
    #[serde(rename = "zap_name")]
    pub source_name: String,
    pub error_message: String,
    pub explanation: Option<String>,
    /// UTC, second resolution
    #[serde(with = "timestamp_format")]
    pub timestamp: NaiveDateTime,
    pub status: LogStatus,
}

/// An error log waiting to be inserted
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewErrorLog {
    pub source_name: String,
    pub error_message: String,
    pub explanation: Option<String>,
}

impl NewErrorLog {
    pub fn new(source_name: impl Into<String>, error_message: impl Into<String>) -> Self {
        Self {
            source_name: source_name.into(),
            error_message: error_message.into(),
            explanation: None,
        }
    }

    pub fn with_explanation(mut self, explanation: impl Into<String>) -> Self {
        self.explanation = Some(explanation.into());
        self
    }
}

/// Current UTC time truncated to whole seconds, the dedup granularity
pub fn now_seconds() -> NaiveDateTime {
    Utc::now().naive_utc().trunc_subsecs(0)
}

/// True if `ts` has a four digit year, the only range SQLite date
/// functions read back
pub fn is_storable(ts: &NaiveDateTime) -> bool {
    (0..=9999).contains(&ts.year())
}

/// Parse a timestamp supplied by a webhook.
///
/// Accepts RFC 3339 (converted to UTC) or the storage layout. The result is
/// truncated to whole seconds; values outside years 0000-9999 are rejected.
pub fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    let parsed = match DateTime::parse_from_rfc3339(raw) {
        Ok(dt) => Some(dt.with_timezone(&Utc).naive_utc()),
        Err(_) => NaiveDateTime::parse_from_str(raw, TIMESTAMP_FORMAT).ok(),
    };
    parsed
        .map(|dt| dt.trunc_subsecs(0))
        .filter(is_storable)
}

/// Interpret unix seconds, rejecting values outside years 0000-9999
pub fn timestamp_from_unix(secs: i64) -> Option<NaiveDateTime> {
    DateTime::from_timestamp(secs, 0)
        .map(|dt| dt.naive_utc())
        .filter(is_storable)
}

pub fn format_timestamp(ts: &NaiveDateTime) -> String {
    ts.format(TIMESTAMP_FORMAT).to_string()
}

mod timestamp_format {
    use super::TIMESTAMP_FORMAT;
    use chrono::NaiveDateTime;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(ts: &NaiveDateTime, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(&ts.format(TIMESTAMP_FORMAT))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<NaiveDateTime, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        NaiveDateTime::parse_from_str(&raw, TIMESTAMP_FORMAT).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, Timelike};

    #[test]
    fn test_status_parse_is_strict() {
        assert_eq!("resolved".parse::<LogStatus>().unwrap(), LogStatus::Resolved);
        assert_eq!("dismissed".parse::<LogStatus>().unwrap(), LogStatus::Dismissed);
        assert!(matches!(
            "Resolved".parse::<LogStatus>(),
            Err(StoreError::InvalidStatus(_))
        ));
        assert!("bogus".parse::<LogStatus>().is_err());
    }

    #[test]
    fn test_status_default_is_unresolved() {
        assert_eq!(LogStatus::default(), LogStatus::Unresolved);
    }

    #[test]
    fn test_record_json_shape() {
        let record = ErrorLogRecord {
            id: 7,
            source_name: "Sync CRM".to_string(),
            error_message: "Rate limit hit".to_string(),
            explanation: None,
            timestamp: NaiveDate::from_ymd_opt(2024, 3, 9)
                .unwrap()
                .and_hms_opt(14, 5, 1)
                .unwrap(),
            status: LogStatus::Resolved,
        };

        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["zap_name"], "Sync CRM");
        assert_eq!(json["timestamp"], "2024-03-09 14:05:01");
        assert_eq!(json["status"], "resolved");
        assert!(json["explanation"].is_null());

        let back: ErrorLogRecord = serde_json::from_value(json).unwrap();
        assert_eq!(back, record);
    }

    #[test]
    fn test_parse_timestamp_formats() {
        let expected = NaiveDate::from_ymd_opt(2024, 3, 9)
            .unwrap()
            .and_hms_opt(12, 0, 30)
            .unwrap();

        assert_eq!(parse_timestamp("2024-03-09 12:00:30"), Some(expected));
        assert_eq!(parse_timestamp("2024-03-09T12:00:30.750Z"), Some(expected));
        assert_eq!(parse_timestamp("2024-03-09T14:00:30+02:00"), Some(expected));
        assert_eq!(parse_timestamp("yesterday"), None);
    }

    #[test]
    fn test_out_of_range_years_rejected() {
        // Offset pushes the UTC value into year 10000
        assert_eq!(parse_timestamp("9999-12-31T23:59:59-01:00"), None);
        assert!(parse_timestamp("9999-12-31 23:59:59").is_some());

        assert_eq!(timestamp_from_unix(999_999_999_999), None);
        assert_eq!(
            timestamp_from_unix(1_714_555_800),
            parse_timestamp("2024-05-01 09:30:00")
        );

        let far = NaiveDate::from_ymd_opt(10000, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        assert!(!is_storable(&far));
    }

    #[test]
    fn test_now_seconds_has_no_fraction() {
        assert_eq!(now_seconds().nanosecond(), 0);
    }
}
