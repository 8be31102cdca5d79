//! Tile footprint generation around a catalog candidate.
//!
//! Every candidate yields up to five pointings: one centered on it and four
//! offset so that the candidate sits just inside one corner of the field. RA
//! edges are expressed in corrected-RA space (`ra · cos(dec)`) so that tile
//! widths stay comparable to angular widths away from the equator.

use crate::core::domain::{
    BoundingBox, Candidate, FieldOfView, SkyPoint, Tile, TilePlacement,
};
use crate::core::geometry::{normalize_dec, normalize_ra, POLE_COS_EPSILON};
use crate::error::{TilingError, TilingResult};

/// Inset of the candidate from the near edges of a corner tile, in degrees.
pub const TILE_MARGIN_DEG: f64 = 0.005;

/// Build one tile per requested placement around `candidate`.
///
/// Tiles come back in generation order (centered, top-left, top-right,
/// bottom-left, bottom-right) regardless of the order of `placements`.
///
/// # Errors
/// Returns [`TilingError::CandidateData`] when the candidate has no name,
/// non-finite coordinates, a declination outside `[-90, 90]`, or sits so
/// close to a pole that `cos(dec)` collapses.
///
/// # Example
/// ```
/// use gw_tiler::algorithms::tile_builder::build_tiles;
/// use gw_tiler::core::domain::{
///     Candidate, CandidateId, DistanceProxy, FieldOfView, TilePlacement,
/// };
///
/// let candidate = Candidate::new(
///     CandidateId(0),
///     "A",
///     100.0,
///     -83.0,
///     DistanceProxy::RecessionVelocity(1000.0),
/// );
/// let tiles = build_tiles(&candidate, &FieldOfView::new(3.0, 2.0), &TilePlacement::ALL, "GW")
///     .unwrap();
///
/// assert_eq!(tiles.len(), 5);
/// assert_eq!(tiles[0].placement, TilePlacement::Centered);
/// assert_eq!(tiles[0].center.ra, 100.0 * (-83.0f64).to_radians().cos());
/// assert_eq!(tiles[0].center.dec, -83.0);
/// ```
pub fn build_tiles(
    candidate: &Candidate,
    fov: &FieldOfView,
    placements: &[TilePlacement],
    event_prefix: &str,
) -> TilingResult<Vec<Tile>> {
    let cos_dec = validate_candidate(candidate)?;

    let tiles = TilePlacement::ALL
        .iter()
        .filter(|p| placements.contains(p))
        .map(|&placement| build_tile(candidate, cos_dec, fov, placement, event_prefix))
        .collect();

    Ok(tiles)
}

fn validate_candidate(candidate: &Candidate) -> TilingResult<f64> {
    if candidate.name.trim().is_empty() {
        return Err(TilingError::CandidateData(format!(
            "candidate {} has no name",
            candidate.id
        )));
    }

    let (ra, dec) = (candidate.ra_deg, candidate.dec_deg);
    if !ra.is_finite() || !dec.is_finite() || dec.abs() > 90.0 {
        return Err(TilingError::CandidateData(format!(
            "{}: invalid position ({}, {})",
            candidate.name, ra, dec
        )));
    }

    let cos_dec = dec.to_radians().cos();
    if cos_dec < POLE_COS_EPSILON || !candidate.corrected_ra.is_finite() {
        return Err(TilingError::CandidateData(format!(
            "{}: declination {} is too close to a pole to tile",
            candidate.name, dec
        )));
    }

    Ok(cos_dec)
}

fn build_tile(
    candidate: &Candidate,
    cos_dec: f64,
    fov: &FieldOfView,
    placement: TilePlacement,
    event_prefix: &str,
) -> Tile {
    let (ra, dec) = (candidate.ra_deg, candidate.dec_deg);
    let (f_ra, f_dec) = (fov.ra_deg(), fov.dec_deg());
    let m = TILE_MARGIN_DEG;

    // Offsets relative to the candidate, before the cos(dec) scaling.
    let (ra_lo, ra_hi) = match placement {
        TilePlacement::Centered => (-f_ra / 2.0, f_ra / 2.0),
        TilePlacement::TopLeft | TilePlacement::BottomLeft => (-m, f_ra - m),
        TilePlacement::TopRight | TilePlacement::BottomRight => (-(f_ra - m), m),
    };
    let (dec_lo, dec_hi) = match placement {
        TilePlacement::Centered => (-f_dec / 2.0, f_dec / 2.0),
        TilePlacement::TopLeft | TilePlacement::TopRight => (-(f_dec - m), m),
        TilePlacement::BottomLeft | TilePlacement::BottomRight => (-m, f_dec - m),
    };

    let bounds = BoundingBox::from_edges(
        (ra + ra_lo) * cos_dec,
        (ra + ra_hi) * cos_dec,
        dec + dec_lo,
        dec + dec_hi,
    );

    let (center, sky_center) = if placement == TilePlacement::Centered {
        (
            SkyPoint {
                ra: normalize_ra(candidate.corrected_ra),
                dec: normalize_dec(dec),
            },
            SkyPoint {
                ra: normalize_ra(ra),
                dec: normalize_dec(dec),
            },
        )
    } else {
        let (mid_ra, mid_dec) = bounds.midpoint();
        (
            SkyPoint {
                ra: normalize_ra(mid_ra),
                dec: normalize_dec(mid_dec),
            },
            SkyPoint {
                ra: normalize_ra(mid_ra / cos_dec),
                dec: normalize_dec(mid_dec),
            },
        )
    };

    Tile {
        name: format!("{}_{}_{}", event_prefix, placement.label(), candidate.name),
        placement,
        source: candidate.id,
        bounds,
        center,
        sky_center,
    }
}
