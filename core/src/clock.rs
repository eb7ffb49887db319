//! Time source and timestamp encoding.
//!
//! Timestamps are local wall-clock times stored as fixed-width ISO-8601 text
//! (`2024-03-01T08:15:00.000000`), so string comparison in SQL matches
//! chronological order.

use std::sync::Mutex;

use chrono::{Local, NaiveDateTime, TimeDelta};

/// Storage format for every timestamp column.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.6f";

/// Source of the current time.
pub trait Clock: Send + Sync {
    /// Returns the current local time.
    fn now(&self) -> NaiveDateTime;
}

/// The system clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        Local::now().naive_local()
    }
}

/// A manually driven clock for tests and replay.
///
/// # Examples
///
/// ```
/// use chrono::{NaiveDate, TimeDelta};
/// use tower_inventory_core::{Clock, FixedClock};
///
/// let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap().and_hms_opt(8, 0, 0).unwrap();
/// let clock = FixedClock::new(start);
/// clock.advance(TimeDelta::minutes(5));
/// assert_eq!(clock.now(), start + TimeDelta::minutes(5));
/// ```
#[derive(Debug)]
pub struct FixedClock {
    now: Mutex<NaiveDateTime>,
}

impl FixedClock {
    pub fn new(now: NaiveDateTime) -> Self {
        Self {
            now: Mutex::new(now),
        }
    }

    /// Moves the clock forward by `delta`.
    pub fn advance(&self, delta: TimeDelta) {
        let mut now = self.now.lock().unwrap_or_else(|e| e.into_inner());
        *now += delta;
    }

    /// Sets the clock to `now`.
    pub fn set(&self, now: NaiveDateTime) {
        *self.now.lock().unwrap_or_else(|e| e.into_inner()) = now;
    }
}

impl Clock for FixedClock {
    fn now(&self) -> NaiveDateTime {
        *self.now.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Encodes a timestamp for storage.
pub fn format_timestamp(ts: &NaiveDateTime) -> String {
    ts.format(TIMESTAMP_FORMAT).to_string()
}

/// Decodes a stored timestamp.
///
/// Accepts the storage format as well as the shorter forms written by older
/// databases (no fractional seconds, or a space instead of `T`).
pub fn parse_timestamp(s: &str) -> Option<NaiveDateTime> {
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 5, 17)
            .unwrap()
            .and_hms_opt(h, m, 0)
            .unwrap()
    }

    #[test]
    fn test_format_is_fixed_width_and_sortable() {
        let early = format_timestamp(&at(9, 5));
        let late = format_timestamp(&at(10, 0));
        assert_eq!(early, "2024-05-17T09:05:00.000000");
        assert_eq!(early.len(), late.len());
        assert!(early < late);
    }

    #[test]
    fn test_parse_accepts_legacy_forms() {
        assert_eq!(parse_timestamp("2024-05-17T09:05:00"), Some(at(9, 5)));
        assert_eq!(parse_timestamp("2024-05-17 09:05:00"), Some(at(9, 5)));
        assert_eq!(
            parse_timestamp("2024-05-17T09:05:00.123456").map(|t| t.and_utc().timestamp_subsec_micros()),
            Some(123_456)
        );
        assert_eq!(parse_timestamp("yesterday"), None);
    }

    #[test]
    fn test_round_trip_through_storage_format() {
        let t = at(13, 45) + TimeDelta::microseconds(42);
        assert_eq!(parse_timestamp(&format_timestamp(&t)), Some(t));
    }
}
