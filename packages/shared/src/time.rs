//! Time helpers.

use chrono::{DateTime, Utc};

/// Current Unix timestamp in milliseconds (UTC).
pub fn current_timestamp() -> i64 {
    Utc::now().timestamp_millis()
}

/// Format a Unix millisecond timestamp as an RFC 3339 string (UTC).
///
/// Out-of-range values fall back to the raw number so formatting never
/// panics on corrupt data.
pub fn timestamp_to_rfc3339(timestamp_millis: i64) -> String {
    match DateTime::<Utc>::from_timestamp_millis(timestamp_millis) {
        Some(dt) => dt.to_rfc3339(),
        None => timestamp_millis.to_string(),
    }
}
