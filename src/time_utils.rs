//! Shared helpers for the app's epoch-millisecond instants.

use chrono::{DateTime, SecondsFormat, Utc};

/// One day in milliseconds.
pub const DAY_MS: i64 = 24 * 60 * 60 * 1000;

/// Current time as integer epoch milliseconds.
pub fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

/// Format an epoch-millisecond instant as RFC3339 with a `Z` suffix.
///
/// Returns `None` for instants outside the representable range.
pub fn format_millis_rfc3339(ms: i64) -> Option<String> {
    DateTime::<Utc>::from_timestamp_millis(ms)
        .map(|dt| dt.to_rfc3339_opts(SecondsFormat::Secs, true))
}
