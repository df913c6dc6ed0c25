// Tick-based instants shared by the state machine and the persisted record
use chrono::{DateTime, TimeDelta, Utc};
use std::fmt;

/// Number of 100 ns ticks in one second.
pub const TICKS_PER_SECOND: i64 = 10_000_000;

/// Ticks between 0001-01-01T00:00:00Z and the Unix epoch.
const UNIX_EPOCH_TICKS: i64 = 621_355_968_000_000_000;

/// An instant counted in 100 ns ticks since 0001-01-01T00:00:00Z (UTC).
///
/// This is the resolution the persisted record carries, so all state
/// arithmetic happens in ticks and nothing is lost on a round trip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Timestamp(i64);

impl Timestamp {
    /// Sentinel for "no timestamp recorded yet". Earlier than any real sample.
    pub const UNSET: Timestamp = Timestamp(0);

    pub const fn from_ticks(ticks: i64) -> Self {
        Self(ticks)
    }

    pub const fn ticks(self) -> i64 {
        self.0
    }

    pub fn is_unset(self) -> bool {
        self == Self::UNSET
    }

    pub fn from_datetime(time: DateTime<Utc>) -> Self {
        let ticks = time
            .timestamp()
            .saturating_mul(TICKS_PER_SECOND)
            .saturating_add(i64::from(time.timestamp_subsec_nanos() / 100))
            .saturating_add(UNIX_EPOCH_TICKS);
        Self(ticks.max(0))
    }

    /// Converts back to a calendar instant. Every non-negative tick count is
    /// representable, so `None` only comes back for negative ticks.
    pub fn to_datetime(self) -> Option<DateTime<Utc>> {
        if self.0 < 0 {
            return None;
        }
        let since_epoch = self.0 - UNIX_EPOCH_TICKS;
        let secs = since_epoch.div_euclid(TICKS_PER_SECOND);
        let nanos = since_epoch.rem_euclid(TICKS_PER_SECOND) * 100;
        DateTime::from_timestamp(secs, nanos as u32)
    }

    /// Signed elapsed time from `earlier` to `self`.
    pub fn since(self, earlier: Timestamp) -> TimeDelta {
        ticks_to_delta(self.0.saturating_sub(earlier.0))
    }

    /// `self + delta`, or `None` when the result leaves the tick range.
    pub fn checked_add(self, delta: TimeDelta) -> Option<Timestamp> {
        let ticks = delta_to_ticks(delta)?;
        let sum = self.0.checked_add(ticks)?;
        (sum >= 0).then_some(Timestamp(sum))
    }
}

impl From<DateTime<Utc>> for Timestamp {
    fn from(time: DateTime<Utc>) -> Self {
        Self::from_datetime(time)
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.to_datetime() {
            Some(time) if !self.is_unset() => write!(f, "{}", time.to_rfc3339()),
            _ => write!(f, "unset({})", self.0),
        }
    }
}

fn ticks_to_delta(ticks: i64) -> TimeDelta {
    TimeDelta::seconds(ticks / TICKS_PER_SECOND)
        + TimeDelta::nanoseconds((ticks % TICKS_PER_SECOND) * 100)
}

fn delta_to_ticks(delta: TimeDelta) -> Option<i64> {
    delta
        .num_seconds()
        .checked_mul(TICKS_PER_SECOND)?
        .checked_add(i64::from(delta.subsec_nanos() / 100))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_unset_is_year_one() {
        let time = Timestamp::UNSET.to_datetime().expect("representable");
        assert_eq!(time, Utc.with_ymd_and_hms(1, 1, 1, 0, 0, 0).unwrap());
    }

    #[test]
    fn test_datetime_round_trip_keeps_ticks() {
        let time = Utc.with_ymd_and_hms(2024, 3, 1, 12, 30, 15).unwrap()
            + TimeDelta::nanoseconds(1_234_500);
        let ts = Timestamp::from_datetime(time);
        assert_eq!(ts.to_datetime(), Some(time));
        assert_eq!(ts.ticks(), 638_448_930_150_012_345);
    }

    #[test]
    fn test_since_is_signed() {
        let a = Timestamp::from_ticks(50 * TICKS_PER_SECOND);
        let b = Timestamp::from_ticks(80 * TICKS_PER_SECOND + 5);
        assert_eq!(b.since(a), TimeDelta::seconds(30) + TimeDelta::nanoseconds(500));
        assert_eq!(a.since(b), -(TimeDelta::seconds(30) + TimeDelta::nanoseconds(500)));
    }

    #[test]
    fn test_checked_add_overflow() {
        let late = Timestamp::from_ticks(i64::MAX - 5);
        assert_eq!(late.checked_add(TimeDelta::seconds(1)), None);
        assert_eq!(
            Timestamp::UNSET.checked_add(TimeDelta::seconds(60)),
            Some(Timestamp::from_ticks(60 * TICKS_PER_SECOND))
        );
    }
}
