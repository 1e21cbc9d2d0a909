//! Timestamp helpers.

use chrono::{DateTime, Utc};
use std::time::SystemTime;

/// Represents a timestamp that can be serialized/deserialized.
pub type Timestamp = DateTime<Utc>;

/// Returns the current UTC timestamp.
#[must_use]
pub fn now_utc() -> Timestamp {
    Utc::now()
}

/// Formats a timestamp as ISO 8601 string.
///
/// The format is `YYYY-MM-DDTHH:MM:SS.ffffff+00:00`.
#[must_use]
pub fn format_iso8601(dt: &Timestamp) -> String {
    dt.format("%Y-%m-%dT%H:%M:%S%.6f+00:00").to_string()
}

/// Converts a filesystem time into a UTC timestamp.
#[must_use]
pub fn from_system_time(time: SystemTime) -> Timestamp {
    DateTime::<Utc>::from(time)
}

/// Returns the number of seconds between two timestamps, never negative.
#[must_use]
pub fn seconds_between(start: &Timestamp, end: &Timestamp) -> f64 {
    let millis = (*end - *start).num_milliseconds().max(0);
    #[allow(clippy::cast_precision_loss)]
    let seconds = millis as f64 / 1000.0;
    seconds
}
