use std::time::Duration;

use chrono::NaiveTime;

/// Parses human durations such as `"7 days"`, `"36h"` or `"1d 12h, 30m"`.
pub fn parse_duration(value: &str) -> Result<Duration, String> {
    let normalized = value.replace(',', " ");
    humantime::parse_duration(normalized.trim()).map_err(|e| format!("invalid duration {value:?}: {e}"))
}

/// Accepts `"5:00 PM"` as well as 24-hour `"17:00"`.
pub fn parse_time_of_day(value: &str) -> Result<NaiveTime, String> {
    let normalized = value.trim().to_ascii_uppercase();
    NaiveTime::parse_from_str(&normalized, "%I:%M %p")
        .or_else(|_| NaiveTime::parse_from_str(&normalized, "%I:%M%p"))
        .or_else(|_| NaiveTime::parse_from_str(&normalized, "%H:%M"))
        .map_err(|_| format!("{value:?} is not a valid time (expected e.g. \"5:00 PM\")"))
}
