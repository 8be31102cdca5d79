//! HEALPix pixel lookup for probability skymaps.
//!
//! Only the pieces needed to look up a map value at a sky position are
//! implemented: resolution checks, pixel area and `ang2pix` in both RING and
//! NESTED orderings. The formulas follow the reference `healpix_base`
//! implementation, working from `z = cos θ` and `φ` in units of quarter turns.

use std::f64::consts::{FRAC_PI_2, PI};
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{TilingError, TilingResult};

/// Largest supported resolution parameter.
pub const MAX_NSIDE: u32 = 1 << 29;

/// Pixel numbering scheme of a map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PixelOrdering {
    #[default]
    Ring,
    #[serde(alias = "NEST")]
    Nested,
}

impl fmt::Display for PixelOrdering {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PixelOrdering::Ring => f.write_str("RING"),
            PixelOrdering::Nested => f.write_str("NESTED"),
        }
    }
}

impl FromStr for PixelOrdering {
    type Err = TilingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "RING" => Ok(PixelOrdering::Ring),
            "NESTED" | "NEST" => Ok(PixelOrdering::Nested),
            other => Err(TilingError::MapFormat(format!(
                "Unknown pixel ordering: {}",
                other
            ))),
        }
    }
}

/// Resolution of a HEALPix map with `12 · nside²` pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Healpix {
    nside: u32,
    order: u32,
}

impl Healpix {
    pub fn new(nside: u32) -> TilingResult<Self> {
        if nside == 0 || !nside.is_power_of_two() || nside > MAX_NSIDE {
            return Err(TilingError::InvalidResolution(format!(
                "nside={} is not a power of two in [1, 2^29]",
                nside
            )));
        }
        Ok(Self {
            nside,
            order: nside.trailing_zeros(),
        })
    }

    /// Derive the resolution from a pixel count.
    ///
    /// # Example
    /// ```
    /// use gw_tiler::skymap::healpix::Healpix;
    ///
    /// assert_eq!(Healpix::from_npix(12).unwrap().nside(), 1);
    /// assert_eq!(Healpix::from_npix(3072).unwrap().nside(), 16);
    /// assert!(Healpix::from_npix(13).is_err());
    /// assert!(Healpix::from_npix(108).is_err()); // nside = 3
    /// ```
    pub fn from_npix(npix: usize) -> TilingResult<Self> {
        if npix == 0 || npix % 12 != 0 {
            return Err(TilingError::InvalidResolution(format!(
                "npix={} is not of the form 12 * nside^2",
                npix
            )));
        }
        let nside_sq = (npix / 12) as u64;
        let nside = (nside_sq as f64).sqrt().round() as u64;
        if nside * nside != nside_sq || nside > MAX_NSIDE as u64 {
            return Err(TilingError::InvalidResolution(format!(
                "npix={} is not of the form 12 * nside^2",
                npix
            )));
        }
        Self::new(nside as u32)
    }

    pub fn nside(&self) -> u32 {
        self.nside
    }

    pub fn npix(&self) -> u64 {
        12 * (self.nside as u64) * (self.nside as u64)
    }

    /// Area of one pixel in steradians.
    pub fn pixel_area(&self) -> f64 {
        4.0 * PI / self.npix() as f64
    }

    /// Pixel containing the equatorial position `(ra, dec)` in degrees.
    pub fn ang2pix_radec(&self, ordering: PixelOrdering, ra_deg: f64, dec_deg: f64) -> u64 {
        let theta = FRAC_PI_2 - dec_deg.to_radians();
        self.ang2pix(ordering, theta, ra_deg.to_radians())
    }

    /// Pixel containing the colatitude `theta` and longitude `phi`, in radians.
    pub fn ang2pix(&self, ordering: PixelOrdering, theta: f64, phi: f64) -> u64 {
        let z = theta.cos().clamp(-1.0, 1.0);
        let tt = (phi / FRAC_PI_2).rem_euclid(4.0);
        match ordering {
            PixelOrdering::Ring => self.zphi2pix_ring(z, tt),
            PixelOrdering::Nested => self.zphi2pix_nest(z, tt),
        }
    }

    fn zphi2pix_ring(&self, z: f64, tt: f64) -> u64 {
        let nside = self.nside as i64;
        let nl4 = 4 * nside;
        let ncap = 2 * nside * (nside - 1);
        let npix = self.npix() as i64;
        let za = z.abs();

        let pix = if za <= 2.0 / 3.0 {
            // Equatorial belt
            let temp1 = nside as f64 * (0.5 + tt);
            let temp2 = nside as f64 * z * 0.75;
            let jp = (temp1 - temp2) as i64;
            let jm = (temp1 + temp2) as i64;
            let ir = nside + 1 + jp - jm;
            let kshift = 1 - (ir & 1);
            let ip = ((jp + jm - nside + kshift + 1) / 2).rem_euclid(nl4);
            ncap + (ir - 1) * nl4 + ip
        } else {
            // Polar caps
            let tp = tt - tt.floor();
            let tmp = nside as f64 * (3.0 * (1.0 - za)).sqrt();
            let jp = (tp * tmp) as i64;
            let jm = ((1.0 - tp) * tmp) as i64;
            let ir = jp + jm + 1;
            let ip = ((tt * ir as f64) as i64).rem_euclid(4 * ir);
            if z > 0.0 {
                2 * ir * (ir - 1) + ip
            } else {
                npix - 2 * ir * (ir + 1) + ip
            }
        };
        pix as u64
    }

    fn zphi2pix_nest(&self, z: f64, tt: f64) -> u64 {
        let nside = self.nside as i64;
        let za = z.abs();

        let (face, ix, iy) = if za <= 2.0 / 3.0 {
            let temp1 = nside as f64 * (0.5 + tt);
            let temp2 = nside as f64 * z * 0.75;
            let jp = (temp1 - temp2) as i64;
            let jm = (temp1 + temp2) as i64;
            let ifp = jp >> self.order;
            let ifm = jm >> self.order;
            let face = if ifp == ifm {
                ifp | 4
            } else if ifp < ifm {
                ifp
            } else {
                ifm + 8
            };
            let ix = jm & (nside - 1);
            let iy = nside - (jp & (nside - 1)) - 1;
            (face, ix, iy)
        } else {
            let ntt = (tt as i64).min(3);
            let tp = tt - ntt as f64;
            let tmp = nside as f64 * (3.0 * (1.0 - za)).sqrt();
            let jp = ((tp * tmp) as i64).min(nside - 1);
            let jm = (((1.0 - tp) * tmp) as i64).min(nside - 1);
            if z >= 0.0 {
                (ntt, nside - jm - 1, nside - jp - 1)
            } else {
                (ntt + 8, jp, jm)
            }
        };

        (face as u64) * (nside as u64) * (nside as u64)
            + spread_bits(ix as u64)
            + (spread_bits(iy as u64) << 1)
    }
}

/// Interleave zeros between the low 32 bits of `v`.
fn spread_bits(v: u64) -> u64 {
    let mut x = v & 0xFFFF_FFFF;
    x = (x | (x << 16)) & 0x0000_FFFF_0000_FFFF;
    x = (x | (x << 8)) & 0x00FF_00FF_00FF_00FF;
    x = (x | (x << 4)) & 0x0F0F_0F0F_0F0F_0F0F;
    x = (x | (x << 2)) & 0x3333_3333_3333_3333;
    x = (x | (x << 1)) & 0x5555_5555_5555_5555;
    x
}
