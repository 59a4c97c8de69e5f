//! Time primitives for SkyMap
//!
//! All clocks in the workspace speak in [`Timestamp`]: signed milliseconds
//! since the Unix epoch. Time travel can go before 1970, so the value is
//! signed and every conversion tolerates negative instants.

use std::ops::{Add, Sub};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

pub const MILLIS_PER_SECOND: i64 = 1000;
pub const SECONDS_PER_SECOND: i64 = 1;
pub const SECONDS_PER_MINUTE: i64 = 60;
pub const SECONDS_PER_10_MINUTES: i64 = 600;
pub const SECONDS_PER_HOUR: i64 = 3600;
pub const SECONDS_PER_DAY: i64 = 24 * SECONDS_PER_HOUR;
pub const SECONDS_PER_WEEK: i64 = 7 * SECONDS_PER_DAY;
pub const MILLIS_PER_DAY: i64 = SECONDS_PER_DAY * MILLIS_PER_SECOND;

/// Julian day number of the Unix epoch.
pub const JULIAN_DAY_UNIX_EPOCH: f64 = 2_440_587.5;

/// Julian day number of J2000.0 (2000-01-01T12:00:00Z).
pub const JULIAN_DAY_J2000: f64 = 2_451_545.0;

/// First instant the RFC 3339 readout cannot express (10000-01-01T00:00:00Z)
const MAX_RFC3339_MILLIS: i64 = 253_402_300_800 * MILLIS_PER_SECOND;

/// Instant in time, milliseconds since the Unix epoch
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Timestamp(pub i64);

impl Timestamp {
    pub const EPOCH: Timestamp = Timestamp(0);

    /// 2000-01-01T12:00:00Z
    pub const J2000: Timestamp = Timestamp(946_728_000_000);

    #[inline]
    pub fn from_millis(millis: i64) -> Self {
        Timestamp(millis)
    }

    #[inline]
    pub fn from_secs(secs: i64) -> Self {
        Timestamp(secs.saturating_mul(MILLIS_PER_SECOND))
    }

    #[inline]
    pub fn as_millis(self) -> i64 {
        self.0
    }

    #[inline]
    pub fn as_secs_f64(self) -> f64 {
        self.0 as f64 / MILLIS_PER_SECOND as f64
    }

    /// Current wall-clock time
    pub fn now() -> Self {
        Self::from_system_time(SystemTime::now())
    }

    pub fn from_system_time(time: SystemTime) -> Self {
        match time.duration_since(UNIX_EPOCH) {
            Ok(after) => Timestamp(i64::try_from(after.as_millis()).unwrap_or(i64::MAX)),
            Err(before) => {
                Timestamp(i64::try_from(before.duration().as_millis()).map_or(i64::MIN, |ms| -ms))
            }
        }
    }

    /// Returns `None` when the instant is not representable by the platform.
    pub fn to_system_time(self) -> Option<SystemTime> {
        let magnitude = Duration::from_millis(self.0.unsigned_abs());
        if self.0 >= 0 {
            UNIX_EPOCH.checked_add(magnitude)
        } else {
            UNIX_EPOCH.checked_sub(magnitude)
        }
    }

    /// Julian day (UT) of this instant
    #[inline]
    pub fn julian_day(self) -> f64 {
        JULIAN_DAY_UNIX_EPOCH + self.0 as f64 / MILLIS_PER_DAY as f64
    }

    /// Fractional calendar year, good enough for secular-variation models
    #[inline]
    pub fn decimal_year(self) -> f64 {
        1970.0 + self.0 as f64 / (365.25 * MILLIS_PER_DAY as f64)
    }

    #[inline]
    pub fn saturating_add_millis(self, millis: i64) -> Self {
        Timestamp(self.0.saturating_add(millis))
    }

    /// Readout form used by the time display.
    ///
    /// RFC 3339 for instants from the epoch up to the end of year 9999; any
    /// other instant falls back to a plain millisecond count, which the
    /// formatter cannot express.
    pub fn to_rfc3339(self) -> String {
        match self.to_system_time() {
            Some(time) if (0..MAX_RFC3339_MILLIS).contains(&self.0) => {
                humantime::format_rfc3339_millis(time).to_string()
            }
            _ => format!("{}ms since epoch", self.0),
        }
    }
}

impl Add<Duration> for Timestamp {
    type Output = Timestamp;

    #[inline]
    fn add(self, rhs: Duration) -> Self::Output {
        self.saturating_add_millis(i64::try_from(rhs.as_millis()).unwrap_or(i64::MAX))
    }
}

impl Sub<Duration> for Timestamp {
    type Output = Timestamp;

    #[inline]
    fn sub(self, rhs: Duration) -> Self::Output {
        let millis = i64::try_from(rhs.as_millis()).unwrap_or(i64::MAX);
        Timestamp(self.0.saturating_sub(millis))
    }
}

impl Sub<Timestamp> for Timestamp {
    /// Signed difference in milliseconds, saturating at the `i64` range
    type Output = i64;

    #[inline]
    fn sub(self, rhs: Timestamp) -> Self::Output {
        self.0.saturating_sub(rhs.0)
    }
}

impl std::fmt::Debug for Timestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "t({}ms)", self.0)
    }
}

impl std::fmt::Display for Timestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_rfc3339())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_system_time_roundtrip_before_epoch() {
        let t = Timestamp::from_millis(-86_400_000);
        let sys = t.to_system_time().unwrap();
        assert_eq!(Timestamp::from_system_time(sys), t);
    }

    #[test]
    fn test_julian_day_at_j2000() {
        assert!((Timestamp::J2000.julian_day() - JULIAN_DAY_J2000).abs() < 1e-9);
        assert!((Timestamp::EPOCH.julian_day() - JULIAN_DAY_UNIX_EPOCH).abs() < 1e-9);
    }

    #[test]
    fn test_rfc3339_readout() {
        assert_eq!(Timestamp::J2000.to_rfc3339(), "2000-01-01T12:00:00.000Z");
        // Pre-epoch never panics
        assert_eq!(Timestamp(-5).to_rfc3339(), "-5ms since epoch");
    }

    #[test]
    fn test_rfc3339_readout_past_year_9999() {
        let last = Timestamp(MAX_RFC3339_MILLIS - 1);
        assert_eq!(last.to_rfc3339(), "9999-12-31T23:59:59.999Z");
        assert_eq!(
            Timestamp(MAX_RFC3339_MILLIS).to_rfc3339(),
            "253402300800000ms since epoch"
        );
        assert_eq!(
            Timestamp(i64::MAX).to_string(),
            format!("{}ms since epoch", i64::MAX)
        );
        assert_eq!(
            Timestamp(i64::MIN).to_string(),
            format!("{}ms since epoch", i64::MIN)
        );
    }

    #[test]
    fn test_arithmetic_saturates_at_extremes() {
        assert_eq!(Timestamp(i64::MAX) - Timestamp(i64::MIN), i64::MAX);
        assert_eq!(Timestamp(i64::MIN) - Timestamp(i64::MAX), i64::MIN);
        assert_eq!(Timestamp(i64::MAX) + Duration::from_secs(1), Timestamp(i64::MAX));
        assert_eq!(Timestamp(i64::MIN) - Duration::from_secs(1), Timestamp(i64::MIN));
        assert_eq!(Timestamp(0) + Duration::MAX, Timestamp(i64::MAX));
        assert_eq!(Timestamp::from_secs(i64::MAX), Timestamp(i64::MAX));
        assert_eq!(Timestamp::from_secs(i64::MIN), Timestamp(i64::MIN));
    }

    #[test]
    fn test_difference_is_signed() {
        let a = Timestamp::from_secs(10);
        let b = Timestamp::from_secs(4);
        assert_eq!(a - b, 6000);
        assert_eq!(b - a, -6000);
        assert_eq!(b + Duration::from_secs(6), a);
    }

    #[test]
    fn test_decimal_year() {
        let year = Timestamp::J2000.decimal_year();
        assert!((year - 2000.0).abs() < 0.01);
    }
}
