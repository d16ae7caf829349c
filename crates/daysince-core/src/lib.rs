//! Foundational low-level utilities shared across daysince crates.
//!
//! Provides the wall clock and the calendar-day arithmetic used by the
//! incident store and the "days since" command.

pub mod time_utils;

pub use time_utils::{
    current_unix_timestamp, elapsed_whole_days, start_of_utc_day, SECONDS_PER_DAY,
};
