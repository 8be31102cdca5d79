//! Horizon geometry consumed by the scheduler.
//!
//! The scheduler never computes ephemerides itself. It asks a
//! [`HorizonService`] for the night bounds, for the zenith at the simulated
//! clock and for the RA/Dec rectangle observable around that zenith.
//!
//! Three implementations are provided:
//! - [`SiderealHorizon`]: zenith from mean sidereal time and the site
//!   coordinates, night bounds from configuration;
//! - [`FixedHorizon`]: a constant window, mostly for tests and dry runs;
//! - [`CachedHorizon`]: memoizes another service per clock bucket.

use std::collections::HashMap;

use chrono::{DateTime, NaiveDate, Utc};
use log::debug;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::config::SiteSettings;
use crate::core::domain::{ObservableWindow, SkyPoint};
use crate::core::geometry::normalize_ra;
use crate::error::{TilingError, TilingResult};
use crate::time::gmst_deg;

/// Sunset and the following sunrise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NightBounds {
    pub sunset: DateTime<Utc>,
    pub sunrise: DateTime<Utc>,
}

/// Source of night bounds and observable sky regions.
pub trait HorizonService: Send + Sync {
    /// Night bounds for the night starting on `date`.
    fn sunrise_sunset(&self, date: NaiveDate) -> TilingResult<NightBounds>;

    /// Equatorial position of the zenith at `time`.
    fn zenith_ra_dec(&self, time: DateTime<Utc>) -> TilingResult<SkyPoint>;

    /// RA/Dec rectangle above the altitude limit for a given zenith.
    fn observable_rectangle(&self, zenith: SkyPoint) -> TilingResult<ObservableWindow>;
}

/// Window of half-width `90° - min_altitude` around the zenith.
///
/// RA wraps through 0°/360°, Dec is clamped at the poles.
pub fn rectangle_around(zenith: SkyPoint, min_altitude_deg: f64) -> ObservableWindow {
    let half = 90.0 - min_altitude_deg;
    let (ra_min, ra_max) = if half >= 180.0 {
        (0.0, 360.0)
    } else {
        (normalize_ra(zenith.ra - half), normalize_ra(zenith.ra + half))
    };
    ObservableWindow {
        ra_min,
        ra_max,
        dec_min: (zenith.dec - half).max(-90.0),
        dec_max: (zenith.dec + half).min(90.0),
    }
}

/// Zenith tracking by Greenwich mean sidereal time.
#[derive(Debug, Clone, PartialEq)]
pub struct SiderealHorizon {
    pub longitude_deg: f64,
    pub latitude_deg: f64,
    pub min_altitude_deg: f64,
    pub night: NightBounds,
}

impl SiderealHorizon {
    pub fn from_site(site: &SiteSettings) -> Self {
        Self {
            longitude_deg: site.longitude,
            latitude_deg: site.latitude,
            min_altitude_deg: site.min_altitude,
            night: NightBounds {
                sunset: site.sunset,
                sunrise: site.sunrise,
            },
        }
    }
}

impl HorizonService for SiderealHorizon {
    fn sunrise_sunset(&self, _date: NaiveDate) -> TilingResult<NightBounds> {
        if self.night.sunrise <= self.night.sunset {
            return Err(TilingError::HorizonService(format!(
                "sunrise {} is not after sunset {}",
                self.night.sunrise, self.night.sunset
            )));
        }
        Ok(self.night)
    }

    fn zenith_ra_dec(&self, time: DateTime<Utc>) -> TilingResult<SkyPoint> {
        let ra = (gmst_deg(time) + self.longitude_deg).rem_euclid(360.0);
        if !ra.is_finite() || !self.latitude_deg.is_finite() {
            return Err(TilingError::HorizonService(format!(
                "cannot place zenith for longitude {} latitude {}",
                self.longitude_deg, self.latitude_deg
            )));
        }
        Ok(SkyPoint {
            ra: normalize_ra(ra),
            dec: self.latitude_deg,
        })
    }

    fn observable_rectangle(&self, zenith: SkyPoint) -> TilingResult<ObservableWindow> {
        Ok(rectangle_around(zenith, self.min_altitude_deg))
    }
}

/// Constant observable window and night.
#[derive(Debug, Clone, PartialEq)]
pub struct FixedHorizon {
    pub window: ObservableWindow,
    pub night: NightBounds,
}

impl FixedHorizon {
    pub fn new(window: ObservableWindow, sunset: DateTime<Utc>, sunrise: DateTime<Utc>) -> Self {
        Self {
            window,
            night: NightBounds { sunset, sunrise },
        }
    }

    /// The whole sky is observable all night.
    pub fn full_sky(sunset: DateTime<Utc>, sunrise: DateTime<Utc>) -> Self {
        Self::new(ObservableWindow::full_sky(), sunset, sunrise)
    }
}

impl HorizonService for FixedHorizon {
    fn sunrise_sunset(&self, _date: NaiveDate) -> TilingResult<NightBounds> {
        Ok(self.night)
    }

    fn zenith_ra_dec(&self, _time: DateTime<Utc>) -> TilingResult<SkyPoint> {
        Ok(SkyPoint {
            ra: 0.5 * (self.window.ra_min + self.window.ra_max),
            dec: 0.5 * (self.window.dec_min + self.window.dec_max),
        })
    }

    fn observable_rectangle(&self, _zenith: SkyPoint) -> TilingResult<ObservableWindow> {
        Ok(self.window)
    }
}

#[derive(Debug, Default)]
struct HorizonCache {
    nights: HashMap<NaiveDate, NightBounds>,
    zeniths: HashMap<i64, SkyPoint>,
    windows: HashMap<(u64, u64), ObservableWindow>,
    hits: usize,
    misses: usize,
}

/// Memoizing wrapper around another [`HorizonService`].
///
/// Zenith lookups are keyed on the clock truncated to `granularity_seconds`,
/// so every query inside one bucket sees the first answer of that bucket.
/// Errors are never cached.
pub struct CachedHorizon<H: HorizonService> {
    inner: H,
    granularity_seconds: i64,
    cache: Mutex<HorizonCache>,
}

impl<H: HorizonService> CachedHorizon<H> {
    pub fn new(inner: H, granularity_seconds: i64) -> Self {
        Self {
            inner,
            granularity_seconds: granularity_seconds.max(1),
            cache: Mutex::new(HorizonCache::default()),
        }
    }

    pub fn inner(&self) -> &H {
        &self.inner
    }

    /// `(hits, misses)` since construction.
    pub fn stats(&self) -> (usize, usize) {
        let cache = self.cache.lock();
        (cache.hits, cache.misses)
    }

    fn bucket(&self, time: DateTime<Utc>) -> i64 {
        time.timestamp().div_euclid(self.granularity_seconds)
    }
}

impl<H: HorizonService> HorizonService for CachedHorizon<H> {
    fn sunrise_sunset(&self, date: NaiveDate) -> TilingResult<NightBounds> {
        if let Some(night) = self.cache.lock().nights.get(&date).copied() {
            return Ok(night);
        }
        let night = self.inner.sunrise_sunset(date)?;
        self.cache.lock().nights.insert(date, night);
        Ok(night)
    }

    fn zenith_ra_dec(&self, time: DateTime<Utc>) -> TilingResult<SkyPoint> {
        let key = self.bucket(time);
        {
            let mut cache = self.cache.lock();
            if let Some(zenith) = cache.zeniths.get(&key).copied() {
                cache.hits += 1;
                return Ok(zenith);
            }
            cache.misses += 1;
        }
        // The inner service may be slow; do not hold the lock across the call.
        let zenith = self.inner.zenith_ra_dec(time)?;
        debug!("Horizon cache miss for bucket {}: zenith {:?}", key, zenith);
        self.cache.lock().zeniths.insert(key, zenith);
        Ok(zenith)
    }

    fn observable_rectangle(&self, zenith: SkyPoint) -> TilingResult<ObservableWindow> {
        let key = (zenith.ra.to_bits(), zenith.dec.to_bits());
        if let Some(window) = self.cache.lock().windows.get(&key).copied() {
            return Ok(window);
        }
        let window = self.inner.observable_rectangle(zenith)?;
        self.cache.lock().windows.insert(key, window);
        Ok(window)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn night() -> (DateTime<Utc>, DateTime<Utc>) {
        (
            Utc.with_ymd_and_hms(2019, 4, 25, 23, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2019, 4, 26, 10, 0, 0).unwrap(),
        )
    }

    fn sidereal() -> SiderealHorizon {
        let (sunset, sunrise) = night();
        SiderealHorizon {
            longitude_deg: -70.7,
            latitude_deg: -30.2,
            min_altitude_deg: 30.0,
            night: NightBounds { sunset, sunrise },
        }
    }

    #[test]
    fn test_rectangle_wraps_ra_and_clamps_dec() {
        let window = rectangle_around(SkyPoint { ra: 10.0, dec: -70.0 }, 30.0);
        assert_eq!(window.ra_min, 310.0);
        assert_eq!(window.ra_max, 70.0);
        assert!(window.straddles_zero());
        assert_eq!(window.dec_min, -90.0);
        assert_eq!(window.dec_max, -10.0);
    }

    #[test]
    fn test_rectangle_without_altitude_limit_is_hemisphere() {
        let window = rectangle_around(SkyPoint { ra: 180.0, dec: 0.0 }, 0.0);
        assert_eq!(window.ra_min, 90.0);
        assert_eq!(window.ra_max, 270.0);
        assert_eq!(window.dec_min, -90.0);
        assert_eq!(window.dec_max, 90.0);
    }

    #[test]
    fn test_sidereal_zenith_follows_the_sky() {
        let horizon = sidereal();
        let t0 = night().0;
        let z0 = horizon.zenith_ra_dec(t0).unwrap();
        let z1 = horizon.zenith_ra_dec(t0 + Duration::hours(1)).unwrap();

        assert_eq!(z0.dec, -30.2);
        assert!((0.0..360.0).contains(&z0.ra));
        // One hour of sidereal rotation is about 15.04 degrees.
        let step = (z1.ra - z0.ra).rem_euclid(360.0);
        assert!((step - 15.041).abs() < 0.01, "step = {}", step);
    }

    #[test]
    fn test_sidereal_night_from_configuration() {
        let horizon = sidereal();
        let bounds = horizon
            .sunrise_sunset(NaiveDate::from_ymd_opt(2019, 4, 25).unwrap())
            .unwrap();
        assert_eq!(bounds.sunset, night().0);
        assert_eq!(bounds.sunrise, night().1);
    }

    #[test]
    fn test_sidereal_rejects_inverted_night() {
        let mut horizon = sidereal();
        std::mem::swap(&mut horizon.night.sunset, &mut horizon.night.sunrise);
        let result = horizon.sunrise_sunset(NaiveDate::from_ymd_opt(2019, 4, 25).unwrap());
        assert!(matches!(result, Err(TilingError::HorizonService(_))));
    }

    #[test]
    fn test_fixed_horizon() {
        let (sunset, sunrise) = night();
        let horizon = FixedHorizon::full_sky(sunset, sunrise);
        let zenith = horizon.zenith_ra_dec(sunset).unwrap();
        assert_eq!(
            horizon.observable_rectangle(zenith).unwrap(),
            ObservableWindow::full_sky()
        );
    }

    #[test]
    fn test_cache_buckets_by_granularity() {
        let cached = CachedHorizon::new(sidereal(), 60);
        let t0 = Utc.with_ymd_and_hms(2019, 4, 26, 2, 0, 10).unwrap();

        let a = cached.zenith_ra_dec(t0).unwrap();
        let b = cached.zenith_ra_dec(t0 + Duration::seconds(40)).unwrap();
        let c = cached.zenith_ra_dec(t0 + Duration::seconds(60)).unwrap();

        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(cached.stats(), (1, 2));
    }

    #[test]
    fn test_cache_passes_through_windows() {
        let cached = CachedHorizon::new(sidereal(), 60);
        let zenith = SkyPoint { ra: 100.0, dec: -30.2 };
        let first = cached.observable_rectangle(zenith).unwrap();
        let second = cached.observable_rectangle(zenith).unwrap();
        assert_eq!(first, second);
        assert_eq!(first, rectangle_around(zenith, 30.0));
    }
}
