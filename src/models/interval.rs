//! Time and interval algebra.
//!
//! # Time Model
//! All schedule times are integer minutes relative to midnight of the
//! planning date. Values beyond 24:00 are legal (overtime running past
//! midnight). Input time-of-day values are converted with [`minute_of_day`].
//!
//! # Semantics
//! Intervals are half-open `[start, end)`. Two intervals that merely touch
//! (one ends exactly where the other starts) do not overlap.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use serde::{Deserialize, Serialize};

/// Minutes in one day.
pub const MINUTES_PER_DAY: i64 = 24 * 60;

/// Whether `[a_start, a_end)` and `[b_start, b_end)` overlap.
#[inline]
pub fn overlaps(a_start: i64, a_end: i64, b_start: i64, b_end: i64) -> bool {
    a_start < b_end && b_start < a_end
}

/// Minutes since midnight for a time of day (seconds are truncated).
#[inline]
pub fn minute_of_day(time: NaiveTime) -> i64 {
    i64::from(time.hour()) * 60 + i64::from(time.minute())
}

/// Minutes between `date`'s midnight and `timestamp`.
///
/// Negative for timestamps before the date, larger than a day for
/// timestamps after it.
pub fn minutes_from_midnight(date: NaiveDate, timestamp: NaiveDateTime) -> i64 {
    (timestamp - date.and_time(NaiveTime::MIN)).num_minutes()
}

/// Formats a minute offset as `HH:MM` (hours may exceed 23).
pub fn format_minute(minute: i64) -> String {
    let sign = if minute < 0 { "-" } else { "" };
    let m = minute.abs();
    format!("{sign}{:02}:{:02}", m / 60, m % 60)
}

/// A time interval [start, end) in minutes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TimeWindow {
    /// Interval start (minutes, inclusive).
    pub start: i64,
    /// Interval end (minutes, exclusive).
    pub end: i64,
}

impl TimeWindow {
    /// Creates a new time window.
    pub fn new(start: i64, end: i64) -> Self {
        Self { start, end }
    }

    /// Duration in minutes.
    #[inline]
    pub fn duration(&self) -> i64 {
        self.end - self.start
    }

    /// Whether a minute falls within this window.
    #[inline]
    pub fn contains(&self, minute: i64) -> bool {
        minute >= self.start && minute < self.end
    }

    /// Whether `other` lies entirely inside this window.
    #[inline]
    pub fn encloses(&self, other: &Self) -> bool {
        other.start >= self.start && other.end <= self.end
    }

    /// Whether two windows overlap.
    #[inline]
    pub fn overlaps(&self, other: &Self) -> bool {
        overlaps(self.start, self.end, other.start, other.end)
    }
}

impl std::fmt::Display for TimeWindow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}-{}", format_minute(self.start), format_minute(self.end))
    }
}
