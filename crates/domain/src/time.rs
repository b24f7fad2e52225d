//! Time and duration helpers.

use std::time::Duration;

use chrono::{DateTime, Utc};

/// UTC timestamp used for `last_changed` and event times.
pub type Timestamp = DateTime<Utc>;

/// Return the current UTC time.
#[must_use]
pub fn now() -> Timestamp {
    Utc::now()
}

/// Convert a configured number of seconds into an optional duration.
///
/// Negative values mean "disabled" and yield `None`.
#[must_use]
pub fn optional_secs(secs: i64) -> Option<Duration> {
    u64::try_from(secs).ok().map(Duration::from_secs)
}
