//! Time utilities for oarlog
//!
//! Every timestamp handled by the engine and the store is UTC. The canonical
//! text form is ISO-8601 with millisecond precision and a `Z` suffix, e.g.
//! `2025-01-01T00:00:00.000Z`.
//!
//! # Mock Time for Development
//!
//! In debug builds, the `OARLOG_MOCK_TIME` environment variable can be set
//! to override the system time returned by [`now`]. The mock clock advances
//! at the same rate as the real one.
//!
//! Format: `YYYY-MM-DD HH:MM:SS`, interpreted as UTC.
//!
//! Example:
//! ```bash
//! OARLOG_MOCK_TIME="2025-06-01 07:30:00" oarlog sessions
//! ```

use chrono::{DateTime, Local, NaiveDateTime, SecondsFormat, TimeZone, Utc};
use std::sync::OnceLock;

/// Environment variable name for mock time (debug builds only)
pub const MOCK_TIME_ENV_VAR: &str = "OARLOG_MOCK_TIME";

/// Offset between the mock time and the real time when first queried.
static MOCK_TIME_OFFSET: OnceLock<Option<chrono::Duration>> = OnceLock::new();

#[allow(clippy::disallowed_methods)] // This is the internal implementation that wraps Utc::now()
fn get_mock_time_offset() -> Option<chrono::Duration> {
    *MOCK_TIME_OFFSET.get_or_init(|| {
        #[cfg(debug_assertions)]
        {
            if let Ok(mock_time_str) = std::env::var(MOCK_TIME_ENV_VAR) {
                match NaiveDateTime::parse_from_str(&mock_time_str, "%Y-%m-%d %H:%M:%S") {
                    Ok(naive_dt) => {
                        let offset = naive_dt.and_utc().signed_duration_since(Utc::now());
                        tracing::info!(
                            mock_time = %mock_time_str,
                            offset_secs = offset.num_seconds(),
                            "Mock time enabled"
                        );
                        return Some(offset);
                    }
                    Err(_) => {
                        tracing::warn!(
                            mock_time = %mock_time_str,
                            expected_format = "%Y-%m-%d %H:%M:%S",
                            "Invalid mock time format"
                        );
                    }
                }
            }
            None
        }
        #[cfg(not(debug_assertions))]
        {
            None
        }
    })
}

/// Returns whether mock time is currently active.
pub fn is_mock_time_active() -> bool {
    get_mock_time_offset().is_some()
}

/// Get the current UTC time, respecting mock time settings in debug builds.
#[allow(clippy::disallowed_methods)] // This is the wrapper that provides mock time support
pub fn now() -> DateTime<Utc> {
    let real_now = Utc::now();

    match get_mock_time_offset() {
        Some(offset) => real_now + offset,
        None => real_now,
    }
}

/// Format a timestamp as ISO-8601 UTC with millisecond precision.
pub fn to_iso(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Parse an ISO-8601 / RFC 3339 timestamp into UTC.
pub fn parse_iso(s: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
    DateTime::parse_from_rfc3339(s).map(|dt| dt.with_timezone(&Utc))
}

/// Parse a user-supplied date and time.
///
/// Accepts RFC 3339 (`2025-06-01T07:30:00Z`) or a local wall-clock time
/// (`2025-06-01 07:30`, `2025-06-01 07:30:00`), which is converted to UTC.
pub fn parse_user_datetime(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = parse_iso(s) {
        return Some(dt);
    }

    ["%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
        .and_then(|naive| Local.from_local_datetime(&naive).single())
        .map(|dt| dt.with_timezone(&Utc))
}

/// Format a timestamp for display in local time.
pub fn format_datetime_local(dt: &DateTime<Utc>) -> String {
    dt.with_timezone(&Local).format("%Y-%m-%d %H:%M").to_string()
}
