//! Lenient ISO-8601 timestamp parsing
//!
//! All comparisons happen on `DateTime<Utc>`. Accepted forms:
//! - RFC 3339 with `Z` or a numeric offset, optional fractional seconds
//! - `YYYY-MM-DDTHH:MM:SS[.fff]` without offset, read as UTC
//! - `YYYY-MM-DD`, read as midnight UTC

use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, Utc};
use thiserror::Error;

/// Timestamp could not be parsed
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid timestamp: {0}")]
pub struct InvalidTimestamp(pub String);

const NAIVE_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];

/// Parse a timestamp into UTC
pub fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, InvalidTimestamp> {
    let s = raw.trim();

    if let Ok(ts) = DateTime::parse_from_rfc3339(s) {
        return Ok(ts.with_timezone(&Utc));
    }

    for format in NAIVE_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, format) {
            return Ok(naive.and_utc());
        }
    }

    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        if let Some(midnight) = date.and_hms_opt(0, 0, 0) {
            return Ok(midnight.and_utc());
        }
    }

    Err(InvalidTimestamp(raw.to_string()))
}

/// Format a timestamp as the canonical RFC 3339 UTC string used on the wire
pub fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Current server time, formatted for a sync response
pub fn server_time() -> String {
    format_timestamp(Utc::now())
}
