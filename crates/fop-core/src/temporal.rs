//! # Temporal Types: UTC-Only Timestamps
//!
//! `Timestamp` is the receipt `ts` field. It is always UTC, rendered with a
//! `Z` suffix and microsecond precision:
//!
//! ```text
//! 2025-01-31T14:00:00.123456Z
//! ```
//!
//! The timestamp is part of the hashed envelope, so its string form must be
//! stable across a write/read cycle. Sub-microsecond precision is dropped at
//! construction so the rendered form is the whole value.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Timelike, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::StopRule;

/// A UTC-only timestamp, truncated to microseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    /// The current UTC time.
    pub fn now() -> Self {
        Self::from_utc(Utc::now())
    }

    /// Create a timestamp from a `chrono::DateTime<Utc>`, truncating below microseconds.
    pub fn from_utc(dt: DateTime<Utc>) -> Self {
        Self(truncate_to_micros(dt))
    }

    /// Parse a strict RFC 3339 timestamp, converting any offset to UTC.
    ///
    /// # Errors
    ///
    /// Returns an `INVALID_INPUT` stop rule if the string is not RFC 3339.
    pub fn parse(s: &str) -> Result<Self, StopRule> {
        DateTime::parse_from_rfc3339(s)
            .map(|dt| Self::from_utc(dt.with_timezone(&Utc)))
            .map_err(|e| StopRule::invalid_input(format!("Invalid RFC 3339 timestamp {s:?}: {e}")))
    }

    /// Parse any calendar timestamp a supplier is likely to send.
    ///
    /// Accepts, in order: RFC 3339 with offset or `Z`; a naive
    /// `YYYY-MM-DDTHH:MM:SS[.fraction]` (assumed UTC); a bare `YYYY-MM-DD`
    /// (midnight UTC).
    pub fn parse_calendar(s: &str) -> Result<Self, StopRule> {
        if let Ok(ts) = Self::parse(s) {
            return Ok(ts);
        }
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f") {
            return Ok(Self::from_utc(naive.and_utc()));
        }
        if let Some(naive) = NaiveDate::parse_from_str(s, "%Y-%m-%d")
            .ok()
            .and_then(|d| d.and_hms_opt(0, 0, 0))
        {
            return Ok(Self::from_utc(naive.and_utc()));
        }
        Err(StopRule::invalid_input(format!(
            "Invalid fill_date format (must be ISO8601): {s}"
        )))
    }

    /// Access the inner `DateTime<Utc>`.
    pub fn as_datetime(&self) -> &DateTime<Utc> {
        &self.0
    }

    /// Render as `YYYY-MM-DDTHH:MM:SS.ffffffZ`.
    pub fn to_iso8601(&self) -> String {
        self.0.format("%Y-%m-%dT%H:%M:%S%.6fZ").to_string()
    }
}

impl std::fmt::Display for Timestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_iso8601())
    }
}

impl Serialize for Timestamp {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_iso8601())
    }
}

impl<'de> Deserialize<'de> for Timestamp {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::parse(&s).map_err(serde::de::Error::custom)
    }
}

fn truncate_to_micros(dt: DateTime<Utc>) -> DateTime<Utc> {
    let micros = dt.nanosecond() / 1_000;
    dt.with_nanosecond(micros * 1_000).unwrap_or(dt)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn renders_with_z_and_micros() {
        let dt = Utc.with_ymd_and_hms(2025, 1, 31, 14, 0, 0).unwrap();
        assert_eq!(Timestamp::from_utc(dt).to_string(), "2025-01-31T14:00:00.000000Z");
    }

    #[test]
    fn truncates_nanoseconds() {
        let dt = Utc
            .with_ymd_and_hms(2025, 1, 31, 14, 0, 0)
            .unwrap()
            .with_nanosecond(123_456_789)
            .unwrap();
        assert_eq!(Timestamp::from_utc(dt).to_string(), "2025-01-31T14:00:00.123456Z");
    }

    #[test]
    fn serde_roundtrip_is_exact() {
        let ts = Timestamp::now();
        let json = serde_json::to_string(&ts).unwrap();
        let back: Timestamp = serde_json::from_str(&json).unwrap();
        assert_eq!(back, ts);
        assert_eq!(serde_json::to_string(&back).unwrap(), json);
    }

    #[test]
    fn parse_converts_offsets_to_utc() {
        let ts = Timestamp::parse("2025-01-31T19:30:00+05:30").unwrap();
        assert_eq!(ts.to_string(), "2025-01-31T14:00:00.000000Z");
    }

    #[test]
    fn parse_calendar_accepts_common_forms() {
        assert!(Timestamp::parse_calendar("2025-01-31T14:00:00Z").is_ok());
        assert!(Timestamp::parse_calendar("2025-01-31T14:00:00").is_ok());
        assert!(Timestamp::parse_calendar("2025-01-31T14:00:00.5").is_ok());
        let day = Timestamp::parse_calendar("2025-01-31").unwrap();
        assert_eq!(day.to_string(), "2025-01-31T00:00:00.000000Z");
    }

    #[test]
    fn parse_calendar_rejects_garbage() {
        let err = Timestamp::parse_calendar("not-a-date").unwrap_err();
        assert!(err.message.contains("Invalid fill_date format"));
        assert!(Timestamp::parse_calendar("2025-02-30").is_err());
        assert!(Timestamp::parse_calendar("31/01/2025").is_err());
    }
}
