//! Timestamp handling for runtime-reported times and staging file mtimes
//!
//! All timestamps held in memory are UTC instants. The container runtime
//! reports ISO-8601 strings where "never" is either absent or the zero
//! value `0001-01-01T00:00:00Z`; both parse to `None` here, as does any
//! malformed string.

use chrono::{DateTime, Datelike, Duration, Local, Utc};
use std::fs;

/// Parse a runtime-reported ISO-8601 timestamp.
///
/// Returns `None` for the runtime's zero value and for anything that does
/// not parse, both of which mean "never" to callers.
pub fn parse_runtime_time(value: &str) -> Option<DateTime<Utc>> {
    let parsed = DateTime::parse_from_rfc3339(value).ok()?;
    let utc = parsed.with_timezone(&Utc);
    if utc.year() <= 1 {
        return None;
    }
    Some(utc)
}

/// Seconds west of UTC for the host's current local time.
///
/// The offset is picked between the standard and daylight variants by
/// whatever is in effect right now, matching how staging file mtimes are
/// stamped by the local filesystem.
pub fn local_tz_offset_secs() -> i64 {
    let now = Local::now();
    -i64::from(now.offset().local_minus_utc())
}

/// Convert a file's mtime to a UTC instant, applying the local-timezone
/// offset captured at startup.
pub fn mtime_to_utc(metadata: &fs::Metadata, offset_secs: i64) -> Option<DateTime<Utc>> {
    let mtime = metadata.modified().ok()?;
    let utc: DateTime<Utc> = mtime.into();
    utc.checked_add_signed(Duration::seconds(offset_secs))
}
