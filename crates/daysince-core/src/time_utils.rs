use chrono::{DateTime, NaiveTime, Utc};

/// Number of seconds in one calendar day.
pub const SECONDS_PER_DAY: i64 = 86_400;

/// Returns the current Unix timestamp in seconds.
pub fn current_unix_timestamp() -> i64 {
    Utc::now().timestamp()
}

/// Truncates `unix_seconds` to the UTC midnight that starts its calendar day.
pub fn start_of_utc_day(unix_seconds: i64) -> i64 {
    match DateTime::<Utc>::from_timestamp(unix_seconds, 0) {
        Some(instant) => instant
            .date_naive()
            .and_time(NaiveTime::MIN)
            .and_utc()
            .timestamp(),
        // Out of chrono's range; plain floor arithmetic gives the same boundary.
        None => unix_seconds
            .div_euclid(SECONDS_PER_DAY)
            .saturating_mul(SECONDS_PER_DAY),
    }
}

/// Whole days between `since` and `today_midnight`, rounded down.
pub fn elapsed_whole_days(since: i64, today_midnight: i64) -> i64 {
    today_midnight
        .saturating_sub(since)
        .div_euclid(SECONDS_PER_DAY)
}
