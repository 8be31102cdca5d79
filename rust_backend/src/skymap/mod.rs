//! Probability skymaps and candidate filtering.
//!
//! A [`SkyProbabilityMap`] holds the four co-indexed HEALPix layers produced
//! by low-latency localization pipelines: the 2D probability per pixel and the
//! per-pixel distance ansatz (`distmu`, `distsigma`, `distnorm`). Combining
//! them gives the probability density per unit volume at a galaxy's position,
//! which is what [`SkyProbabilityMap::filter_candidates`] ranks on.

pub mod cosmology;
pub mod healpix;

use std::f64::consts::PI;

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use crate::algorithms::statistics::nan_percentile;
use crate::catalog::GalaxyCatalog;
use crate::core::domain::{Candidate, DistanceProxy};
use crate::error::{TilingError, TilingResult};

pub use cosmology::{FlatLambdaCdm, WMAP9};
pub use healpix::{Healpix, PixelOrdering};

/// Default distance cut in Mpc.
pub const DEFAULT_DISTANCE_CUT_MPC: f64 = 50.0;

/// Default density percentile a candidate must reach.
pub const DEFAULT_PROBABILITY_PERCENTILE: f64 = 95.0;

/// Pixelized localization of one event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkyProbabilityMap {
    #[serde(default)]
    pub ordering: PixelOrdering,
    pub prob: Vec<f64>,
    pub distmu: Vec<f64>,
    pub distsigma: Vec<f64>,
    pub distnorm: Vec<f64>,
}

impl SkyProbabilityMap {
    /// Build a map after checking the layers are co-indexed and well sized.
    pub fn new(
        ordering: PixelOrdering,
        prob: Vec<f64>,
        distmu: Vec<f64>,
        distsigma: Vec<f64>,
        distnorm: Vec<f64>,
    ) -> TilingResult<Self> {
        let map = Self {
            ordering,
            prob,
            distmu,
            distsigma,
            distnorm,
        };
        map.resolution()?;
        Ok(map)
    }

    pub fn npix(&self) -> usize {
        self.prob.len()
    }

    /// Validate layer shapes and return the map resolution.
    pub fn resolution(&self) -> TilingResult<Healpix> {
        if self.prob.is_empty() {
            return Err(TilingError::MapFormat("skymap has no pixels".to_string()));
        }
        let npix = self.prob.len();
        for (name, len) in [
            ("distmu", self.distmu.len()),
            ("distsigma", self.distsigma.len()),
            ("distnorm", self.distnorm.len()),
        ] {
            if len != npix {
                return Err(TilingError::MapFormat(format!(
                    "layer {} has {} pixels, prob has {}",
                    name, len, npix
                )));
            }
        }
        Healpix::from_npix(npix)
    }

    /// Probability density per unit volume at `(ra, dec)` and distance `r`.
    pub fn density_at(&self, hp: &Healpix, ra_deg: f64, dec_deg: f64, r_mpc: f64) -> f64 {
        let pix = hp.ang2pix_radec(self.ordering, ra_deg, dec_deg) as usize;
        let (prob, mu, sigma, norm) = (
            self.prob[pix],
            self.distmu[pix],
            self.distsigma[pix],
            self.distnorm[pix],
        );
        prob * norm * normal_pdf(r_mpc, mu, sigma) / hp.pixel_area()
    }

    /// Keep the candidates most likely to host the event.
    ///
    /// A candidate survives when its density is finite, at least the
    /// `probability_percentile` of all candidate densities, and its distance is
    /// within `distance_cut_mpc`. Survivors keep their ids and carry their
    /// density. Candidates with a non-finite RA or a Dec outside [-90, 90] are
    /// dropped before any pixel lookup.
    pub fn filter_candidates(
        &self,
        catalog: &GalaxyCatalog,
        distance_cut_mpc: f64,
        probability_percentile: f64,
    ) -> TilingResult<GalaxyCatalog> {
        let hp = self.resolution()?;

        let scored: Vec<(Candidate, f64, f64)> = catalog
            .iter()
            .filter(|c| match check_position(c) {
                Ok(()) => true,
                Err(e) => {
                    warn!("Dropping candidate {} ({}): {}", c.id, c.name, e);
                    false
                }
            })
            .map(|c| {
                let r = candidate_distance_mpc(c);
                let density = self.density_at(&hp, c.ra_deg, c.dec_deg, r);
                (c.clone(), density, r)
            })
            .collect();

        let densities: Vec<f64> = scored.iter().map(|(_, d, _)| *d).collect();
        let Some(threshold) = nan_percentile(&densities, probability_percentile) else {
            info!(
                "No finite densities among {} candidates; nothing to tile",
                catalog.len()
            );
            return Ok(GalaxyCatalog::new(catalog.identifier(), Vec::new()));
        };
        debug!(
            "Density threshold at percentile {}: {:e} (nside={}, {})",
            probability_percentile,
            threshold,
            hp.nside(),
            self.ordering
        );

        let kept: Vec<Candidate> = scored
            .into_iter()
            .filter(|(_, density, r)| {
                density.is_finite() && *density >= threshold && *r <= distance_cut_mpc
            })
            .map(|(c, density, _)| c.with_density(density))
            .collect();

        info!(
            "Skymap filter kept {} of {} candidates",
            kept.len(),
            catalog.len()
        );
        Ok(GalaxyCatalog::new(catalog.identifier(), kept))
    }
}

/// Distance to a candidate in Mpc under the default cosmology.
pub fn candidate_distance_mpc(candidate: &Candidate) -> f64 {
    match candidate.distance {
        DistanceProxy::RecessionVelocity(cz) => WMAP9.distance_from_velocity_mpc(cz),
        DistanceProxy::LuminosityDistance(d) => d,
    }
}

fn check_position(candidate: &Candidate) -> TilingResult<()> {
    let (ra, dec) = (candidate.ra_deg, candidate.dec_deg);
    if !ra.is_finite() || !(-90.0..=90.0).contains(&dec) {
        return Err(TilingError::CandidateData(format!(
            "position ({}, {}) is not a valid RA/Dec",
            ra, dec
        )));
    }
    Ok(())
}

fn normal_pdf(x: f64, mu: f64, sigma: f64) -> f64 {
    if !(sigma > 0.0) {
        return f64::NAN;
    }
    let u = (x - mu) / sigma;
    (-0.5 * u * u).exp() / (sigma * (2.0 * PI).sqrt())
}
