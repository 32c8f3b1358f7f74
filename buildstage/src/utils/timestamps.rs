//! Timestamp helpers for log files, snapshots and changelog entries.

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};

/// Represents a timestamp that can be serialized/deserialized.
pub type Timestamp = DateTime<Utc>;

/// Format used for file and directory names (sortable, no separators that
/// need quoting on any platform).
pub const FILE_STAMP_FORMAT: &str = "%Y%m%d-%H%M%S";

/// Returns the current UTC time as an ISO 8601 formatted string.
///
/// # Examples
///
/// ```
/// use buildstage::utils::iso_timestamp;
///
/// let ts = iso_timestamp();
/// assert!(ts.contains('T'));
/// assert!(ts.ends_with("+00:00"));
/// ```
#[must_use]
pub fn iso_timestamp() -> String {
    format_iso8601(&Utc::now())
}

/// Returns the current UTC timestamp.
#[must_use]
pub fn now_utc() -> Timestamp {
    Utc::now()
}

/// Formats a timestamp as ISO 8601 string.
#[must_use]
pub fn format_iso8601(dt: &Timestamp) -> String {
    dt.format("%Y-%m-%dT%H:%M:%S%.6f+00:00").to_string()
}

/// Formats a timestamp for use in a file or directory name.
#[must_use]
pub fn file_stamp(dt: &Timestamp) -> String {
    dt.format(FILE_STAMP_FORMAT).to_string()
}

/// Parses a name produced by [`file_stamp`].
///
/// Returns `None` for names that are not snapshot stamps.
#[must_use]
pub fn parse_file_stamp(name: &str) -> Option<Timestamp> {
    NaiveDateTime::parse_from_str(name, FILE_STAMP_FORMAT)
        .ok()
        .map(|naive| Utc.from_utc_datetime(&naive))
}

/// Formats the date part of a timestamp (`YYYY-MM-DD`) for changelog headings.
#[must_use]
pub fn changelog_date(dt: &Timestamp) -> String {
    dt.format("%Y-%m-%d").to_string()
}
