//! Timestamp conversion between the source API format and export format

use chrono::{DateTime, Utc};

/// The API's `created_at` layout, e.g. "Mon Jan 21 10:30:00 +0000 2019"
const SOURCE_FORMAT: &str = "%a %b %d %H:%M:%S %z %Y";

/// Layout used in CSV exports and checkpoint time strings
const EXPORT_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Parse a source `created_at` string. Timestamps are kept in UTC.
pub fn parse_created_at(s: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_str(s, SOURCE_FORMAT)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Render a timestamp in the export format.
pub fn fmt_export(dt: &DateTime<Utc>) -> String {
    dt.format(EXPORT_FORMAT).to_string()
}

/// Source `created_at` straight to the export format.
pub fn created_at_to_export(s: &str) -> Option<String> {
    parse_created_at(s).map(|dt| fmt_export(&dt))
}

/// Epoch seconds in the export format (reset times in logs and tables).
pub fn epoch_to_export(epoch: i64) -> String {
    match DateTime::<Utc>::from_timestamp(epoch, 0) {
        Some(dt) => fmt_export(&dt),
        None => format!("epoch {epoch}"),
    }
}
