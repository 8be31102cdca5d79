use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// MJD of the Unix epoch (1970-01-01 00:00:00 UTC).
const MJD_UNIX_EPOCH: f64 = 40587.0;

/// Offset between Julian Date and Modified Julian Date.
const JD_MJD_OFFSET: f64 = 2_400_000.5;

/// Julian Date of the J2000.0 epoch.
const JD_J2000: f64 = 2_451_545.0;

const SECONDS_PER_DAY: f64 = 86_400.0;

/// Modified Julian Date representation.
/// MJD 0 = 1858-11-17 00:00:00 UTC
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
pub struct ModifiedJulianDate(qtty::Days);

impl ModifiedJulianDate {
    /// Create a new MJD value.
    pub fn new<V: Into<qtty::Days>>(v: V) -> Self {
        Self(v.into())
    }

    /// Raw MJD value as f64.
    pub fn value(&self) -> f64 {
        self.0.value()
    }

    /// Julian Date of the same instant.
    pub fn julian_date(&self) -> f64 {
        self.value() + JD_MJD_OFFSET
    }

    /// Convert to Unix timestamp (seconds since 1970-01-01 00:00:00 UTC).
    pub fn to_unix_timestamp(&self) -> f64 {
        (self.value() - MJD_UNIX_EPOCH) * SECONDS_PER_DAY
    }

    /// Create from Unix timestamp (seconds since 1970-01-01 00:00:00 UTC).
    pub fn from_unix_timestamp(timestamp: f64) -> Self {
        Self::new(timestamp / SECONDS_PER_DAY + MJD_UNIX_EPOCH)
    }

    /// Convert to chrono DateTime<Utc>, `None` when out of chrono's range.
    pub fn to_datetime(&self) -> Option<DateTime<Utc>> {
        let secs = self.to_unix_timestamp();
        if !secs.is_finite() {
            return None;
        }
        let secs_i64 = secs.floor() as i64;
        let nanos = ((secs - secs.floor()) * 1e9) as u32;
        DateTime::from_timestamp(secs_i64, nanos.min(999_999_999))
    }

    /// Create from chrono DateTime<Utc>.
    pub fn from_datetime(dt: DateTime<Utc>) -> Self {
        Self::from_unix_timestamp(
            dt.timestamp() as f64 + dt.timestamp_subsec_nanos() as f64 / 1e9,
        )
    }
}

impl From<f64> for ModifiedJulianDate {
    fn from(v: f64) -> Self {
        ModifiedJulianDate::new(v)
    }
}

/// Greenwich mean sidereal time in degrees, within `[0, 360)`.
///
/// Uses the linear IAU 1982 approximation, good to a fraction of a second of
/// time over several decades around J2000.
///
/// # Example
/// ```
/// use chrono::{TimeZone, Utc};
/// use gw_tiler::time::gmst_deg;
///
/// let j2000 = Utc.with_ymd_and_hms(2000, 1, 1, 12, 0, 0).unwrap();
/// assert!((gmst_deg(j2000) - 280.46061837).abs() < 1e-6);
/// ```
pub fn gmst_deg(time: DateTime<Utc>) -> f64 {
    let jd = ModifiedJulianDate::from_datetime(time).julian_date();
    (280.460_618_37 + 360.985_647_366_29 * (jd - JD_J2000)).rem_euclid(360.0)
}

/// Convert a minute quantity into a chrono duration, rounded to milliseconds.
pub fn minutes_to_duration(minutes: qtty::Minutes) -> Duration {
    let millis = (minutes.to::<qtty::Second>().value() * 1000.0).round();
    Duration::milliseconds(millis as i64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use chrono::TimeZone;

    #[test]
    fn test_mjd_unix_epoch() {
        let mjd = ModifiedJulianDate::new(40587.0);
        assert_eq!(mjd.to_unix_timestamp(), 0.0);
        assert_eq!(mjd.to_datetime(), Some(DateTime::UNIX_EPOCH));
    }

    #[test]
    fn test_mjd_datetime_round_trip() {
        let dt = Utc.with_ymd_and_hms(2017, 8, 17, 12, 41, 4).unwrap();
        let mjd = ModifiedJulianDate::from_datetime(dt);
        assert_abs_diff_eq!(mjd.value(), 57982.528518518, epsilon = 1e-6);

        let back = mjd.to_datetime().unwrap();
        assert!((back - dt).num_milliseconds().abs() <= 1);
    }

    #[test]
    fn test_mjd_julian_date() {
        let mjd = ModifiedJulianDate::new(51544.5);
        assert_eq!(mjd.julian_date(), 2451545.0);
    }

    #[test]
    fn test_mjd_out_of_range() {
        assert!(ModifiedJulianDate::new(f64::NAN).to_datetime().is_none());
    }

    #[test]
    fn test_gmst_advances_one_sidereal_day() {
        let t0 = Utc.with_ymd_and_hms(2019, 4, 25, 0, 0, 0).unwrap();
        let t1 = t0 + Duration::seconds(86_164);
        // One sidereal day later the sky is back where it started.
        let diff = (gmst_deg(t1) - gmst_deg(t0)).rem_euclid(360.0);
        assert!(diff < 0.01 || diff > 359.99, "diff = {}", diff);
    }

    #[test]
    fn test_gmst_range() {
        let mut t = Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap();
        for _ in 0..48 {
            let g = gmst_deg(t);
            assert!((0.0..360.0).contains(&g));
            t += Duration::minutes(30);
        }
    }

    #[test]
    fn test_minutes_to_duration() {
        assert_eq!(
            minutes_to_duration(qtty::Minutes::new(10.0)),
            Duration::minutes(10)
        );
        assert_eq!(
            minutes_to_duration(qtty::Minutes::new(0.5)),
            Duration::seconds(30)
        );
    }
}
