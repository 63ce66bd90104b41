//! Lenient date parsing for spreadsheet cells.
//!
//! Dates reach us as ISO dates (`2025-01-10`), ISO timestamps with a `T` or a
//! space separator (`2025-01-10T03:00:00.000Z`, `2025-01-10 14:03:22.123456`),
//! or Brazilian `DD/MM/YYYY`. Records keep the raw text; these helpers parse
//! on use and return `None` instead of failing.

use chrono::{DateTime, NaiveDate, NaiveDateTime};

const TIMESTAMP_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%d/%m/%Y %H:%M:%S",
    "%d/%m/%Y %H:%M",
];

/// Parse a calendar date from any supported cell format.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }
    if let Ok(d) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return Some(d);
    }
    if let Ok(d) = NaiveDate::parse_from_str(s, "%d/%m/%Y") {
        return Some(d);
    }
    parse_timestamp(s).map(|t| t.date())
}

/// Parse a wall-clock timestamp. Bare dates are read as midnight.
///
/// RFC 3339 values keep the wall-clock time of their own offset.
pub fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.naive_local());
    }
    for fmt in TIMESTAMP_FORMATS {
        if let Ok(t) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(t);
        }
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(s, "%d/%m/%Y"))
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}

/// Timestamp text in the shape the backend already stores for `updated_at`.
pub fn timestamp_text(t: NaiveDateTime) -> String {
    t.format("%Y-%m-%d %H:%M:%S%.6f").to_string()
}
