//! Relative timestamp formatting for conversation and notification lists.
//!
//! Pure functions of `(now, timestamp)`: callers inject `now`, nothing
//! here reads the system clock.

use crate::types::Timestamp;

const MINUTE: i64 = 60;
const HOUR: i64 = 60 * MINUTE;
const DAY: i64 = 24 * HOUR;

/// Render `ts` relative to `now`.
///
/// | Age           | Output        |
/// |---------------|---------------|
/// | `< 60s`       | `Just now`    |
/// | `< 1h`        | `{m}m ago`    |
/// | `< 24h`       | `{h}h ago`    |
/// | otherwise     | `YYYY-MM-DD`  |
///
/// Timestamps in the future (clock skew) render as `Just now`.
pub fn format_time_ago(now: Timestamp, ts: Timestamp) -> String {
    let seconds = (now - ts).num_seconds();

    if seconds < MINUTE {
        "Just now".to_string()
    } else if seconds < HOUR {
        format!("{}m ago", seconds / MINUTE)
    } else if seconds < DAY {
        format!("{}h ago", seconds / HOUR)
    } else {
        ts.format("%Y-%m-%d").to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};

    fn now() -> Timestamp {
        Utc.with_ymd_and_hms(2024, 3, 10, 12, 0, 0).unwrap()
    }

    #[test]
    fn under_a_minute_is_just_now() {
        assert_eq!(format_time_ago(now(), now() - Duration::seconds(30)), "Just now");
        assert_eq!(format_time_ago(now(), now()), "Just now");
    }

    #[test]
    fn minutes() {
        assert_eq!(format_time_ago(now(), now() - Duration::seconds(90)), "1m ago");
        assert_eq!(format_time_ago(now(), now() - Duration::seconds(3599)), "59m ago");
    }

    #[test]
    fn hours() {
        assert_eq!(format_time_ago(now(), now() - Duration::seconds(7200)), "2h ago");
        assert_eq!(format_time_ago(now(), now() - Duration::seconds(86399)), "23h ago");
    }

    #[test]
    fn older_than_a_day_is_a_calendar_date() {
        assert_eq!(format_time_ago(now(), now() - Duration::days(3)), "2024-03-07");
    }

    #[test]
    fn future_timestamps_are_just_now() {
        assert_eq!(format_time_ago(now(), now() + Duration::minutes(5)), "Just now");
    }
}
