//! Timestamp value object for immutable points in time.

use chrono::{DateTime, Months, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Immutable point in time, always UTC.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    /// Creates a timestamp for the current moment.
    pub fn now() -> Self {
        Self(Utc::now())
    }

    /// Creates a timestamp from a DateTime<Utc>.
    pub fn from_datetime(dt: DateTime<Utc>) -> Self {
        Self(dt)
    }

    /// Returns the inner DateTime.
    pub fn as_datetime(&self) -> &DateTime<Utc> {
        &self.0
    }

    /// Creates a timestamp from Unix seconds.
    ///
    /// Returns `None` when the value is outside chrono's representable range.
    pub fn from_unix_secs(secs: i64) -> Option<Self> {
        Utc.timestamp_opt(secs, 0).single().map(Self)
    }

    /// Creates a timestamp from Unix milliseconds, truncated to whole seconds.
    pub fn from_unix_millis(millis: i64) -> Option<Self> {
        Self::from_unix_secs(millis.div_euclid(1000))
    }

    /// Returns the timestamp as Unix seconds.
    pub fn as_unix_secs(&self) -> i64 {
        self.0.timestamp()
    }

    /// Adds calendar years, clamping Feb 29 to Feb 28 when needed.
    pub fn plus_years(&self, years: u32) -> Self {
        self.0
            .checked_add_months(Months::new(years.saturating_mul(12)))
            .map(Self)
            .unwrap_or(*self)
    }
}

impl Default for Timestamp {
    fn default() -> Self {
        Self::now()
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.to_rfc3339())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};

    #[test]
    fn timestamp_now_creates_current_time() {
        let before = Utc::now();
        let ts = Timestamp::now();
        let after = Utc::now();

        assert!(ts.as_datetime() >= &before);
        assert!(ts.as_datetime() <= &after);
    }

    #[test]
    fn timestamp_from_unix_secs_works() {
        // 2024-01-15T00:00:00Z
        let ts = Timestamp::from_unix_secs(1705276800).unwrap();
        assert_eq!(ts.as_datetime().year(), 2024);
        assert_eq!(ts.as_datetime().month(), 1);
        assert_eq!(ts.as_datetime().day(), 15);
        assert_eq!(ts.as_unix_secs(), 1705276800);
    }

    #[test]
    fn timestamp_from_unix_millis_truncates_to_seconds() {
        let ts = Timestamp::from_unix_millis(1705276800999).unwrap();
        assert_eq!(ts.as_unix_secs(), 1705276800);
        assert_eq!(ts.as_datetime().nanosecond(), 0);
    }

    #[test]
    fn timestamp_from_unix_secs_rejects_out_of_range() {
        assert!(Timestamp::from_unix_secs(i64::MAX).is_none());
    }

    #[test]
    fn plus_years_keeps_calendar_date() {
        let ts = Timestamp::from_unix_secs(1705276800).unwrap();
        let next = ts.plus_years(1);
        assert_eq!(next.as_datetime().year(), 2025);
        assert_eq!(next.as_datetime().month(), 1);
        assert_eq!(next.as_datetime().day(), 15);
    }

    #[test]
    fn plus_years_clamps_leap_day() {
        // 2024-02-29T00:00:00Z
        let ts = Timestamp::from_unix_secs(1709164800).unwrap();
        let next = ts.plus_years(1);
        assert_eq!(next.as_datetime().month(), 2);
        assert_eq!(next.as_datetime().day(), 28);
    }

    #[test]
    fn timestamp_serializes_to_json() {
        let ts = Timestamp::from_unix_secs(1705276800).unwrap();
        let json = serde_json::to_string(&ts).unwrap();
        assert!(json.contains("2024-01-15"));
    }

    #[test]
    fn timestamp_ordering_works() {
        let a = Timestamp::from_unix_secs(1000).unwrap();
        let b = Timestamp::from_unix_secs(2000).unwrap();
        assert!(a < b);
    }
}
