//! Tile scoring against the working catalog.

use qtty::Minutes;
use serde::{Deserialize, Serialize};

use crate::catalog::GalaxyCatalog;
use crate::core::domain::{Candidate, FieldOfView, ScoredTile, Tile};
use crate::core::geometry::angular_separation_deg;

/// Baseline priority every tile starts from.
pub const BASE_SCORE: f64 = 1000.0;

/// How a tile decides whether it covers a candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Containment {
    /// Inclusive corrected-RA / Dec box test.
    #[default]
    BoundingBox,
    /// Great-circle distance from the tile's sky center within the radius of
    /// a circle with the same area as the field of view.
    AngularRadius,
}

/// Parameters shared by every scored tile of a run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScorerSettings {
    pub fov: FieldOfView,
    pub containment: Containment,
    /// Exposure charged per tile.
    pub exposure: Minutes,
}

impl Default for ScorerSettings {
    fn default() -> Self {
        Self {
            fov: FieldOfView::new(3.0, 2.0),
            containment: Containment::BoundingBox,
            exposure: Minutes::new(10.0),
        }
    }
}

/// Whether `tile` covers `candidate` under the configured containment rule.
pub fn covers(tile: &Tile, candidate: &Candidate, settings: &ScorerSettings) -> bool {
    match settings.containment {
        Containment::BoundingBox => tile.bounds.contains(candidate.corrected_ra, candidate.dec_deg),
        Containment::AngularRadius => {
            let sep = angular_separation_deg(
                tile.sky_center.ra,
                tile.sky_center.dec,
                candidate.ra_deg,
                candidate.dec_deg,
            );
            sep <= settings.fov.equal_area_radius_deg()
        }
    }
}

/// Score a tile by how many working-catalog candidates it covers.
///
/// Covered ids are listed in catalog order. The score is
/// [`BASE_SCORE`] plus the number of covered candidates.
pub fn score_tile(tile: &Tile, catalog: &GalaxyCatalog, settings: &ScorerSettings) -> ScoredTile {
    let covered: Vec<_> = catalog
        .iter()
        .filter(|c| covers(tile, c, settings))
        .map(|c| c.id)
        .collect();

    ScoredTile {
        tile: tile.clone(),
        score: BASE_SCORE + covered.len() as f64,
        covered,
        exposure: settings.exposure,
    }
}
