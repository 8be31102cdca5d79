//! Domain models for catalog candidates, tiles and scheduling outcomes.
//!
//! This module provides the value types that flow through the tiler: galaxy
//! candidates, tile footprints at their three stages (generated, scored and
//! scheduled), the per-iteration observable window and the selection
//! criteria that decide when a night's schedule is complete.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use qtty::{Degrees, Minutes};
use serde::{Deserialize, Serialize};

use crate::error::TilingError;

/// Stable identifier of a catalog row.
///
/// Assigned once when the catalog is loaded and never reused within a
/// scheduling run, so covered candidates can be tracked across iterations even
/// though the working catalog shrinks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CandidateId(pub usize);

impl fmt::Display for CandidateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Distance information carried by a catalog row.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum DistanceProxy {
    /// Recession velocity `cz` in km/s, converted through the cosmology.
    RecessionVelocity(f64),
    /// Luminosity distance already expressed in Mpc.
    LuminosityDistance(f64),
}

/// One galaxy-catalog row considered as a possible host of the transient.
///
/// # Examples
///
/// ```
/// use gw_tiler::core::domain::{Candidate, CandidateId, DistanceProxy};
///
/// let c = Candidate::new(
///     CandidateId(0),
///     "NGC 4993",
///     197.45,
///     -23.38,
///     DistanceProxy::RecessionVelocity(2953.0),
/// );
///
/// assert_eq!(c.id, CandidateId(0));
/// assert!((c.corrected_ra - 197.45 * (-23.38f64).to_radians().cos()).abs() < 1e-12);
/// assert!(c.density.is_none());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    pub id: CandidateId,
    pub name: String,
    pub ra_deg: f64,
    pub dec_deg: f64,
    /// `ra · cos(dec)`, computed once per catalog snapshot.
    pub corrected_ra: f64,
    pub distance: DistanceProxy,
    /// Probability density per unit volume assigned by the skymap filter.
    pub density: Option<f64>,
}

impl Candidate {
    /// Creates a candidate and precomputes its corrected right ascension.
    pub fn new(
        id: CandidateId,
        name: impl Into<String>,
        ra_deg: f64,
        dec_deg: f64,
        distance: DistanceProxy,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            ra_deg,
            dec_deg,
            corrected_ra: crate::core::geometry::corrected_ra(ra_deg, dec_deg),
            distance,
            density: None,
        }
    }

    /// Returns the candidate with its skymap density attached.
    pub fn with_density(mut self, density: f64) -> Self {
        self.density = Some(density);
        self
    }
}

/// Telescope field of view.
///
/// # Examples
///
/// ```
/// use gw_tiler::core::domain::FieldOfView;
///
/// let fov = FieldOfView::new(3.0, 2.0);
/// assert_eq!(fov.ra_deg(), 3.0);
/// assert_eq!(fov.dec_deg(), 2.0);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FieldOfView {
    pub ra: Degrees,
    pub dec: Degrees,
}

impl FieldOfView {
    pub fn new(ra_deg: f64, dec_deg: f64) -> Self {
        Self {
            ra: Degrees::new(ra_deg),
            dec: Degrees::new(dec_deg),
        }
    }

    pub fn ra_deg(&self) -> f64 {
        self.ra.value()
    }

    pub fn dec_deg(&self) -> f64 {
        self.dec.value()
    }

    /// Radius of the circle with the same area as the field, in degrees.
    pub fn equal_area_radius_deg(&self) -> f64 {
        (self.ra_deg() * self.dec_deg() / std::f64::consts::PI).sqrt()
    }
}

/// Placement of a tile relative to the candidate it is built around.
///
/// Corner placements put the candidate close to one edge of the tile so that
/// the four corners plus the centered tile oversample the neighbourhood of a
/// promising galaxy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TilePlacement {
    Centered,
    TopLeft,
    TopRight,
    BottomLeft,
    BottomRight,
}

impl TilePlacement {
    /// All placements, in generation order.
    pub const ALL: [TilePlacement; 5] = [
        TilePlacement::Centered,
        TilePlacement::TopLeft,
        TilePlacement::TopRight,
        TilePlacement::BottomLeft,
        TilePlacement::BottomRight,
    ];

    /// Short code used in configuration (`c`, `tl`, `tr`, `bl`, `br`).
    pub fn code(&self) -> &'static str {
        match self {
            TilePlacement::Centered => "c",
            TilePlacement::TopLeft => "tl",
            TilePlacement::TopRight => "tr",
            TilePlacement::BottomLeft => "bl",
            TilePlacement::BottomRight => "br",
        }
    }

    /// Human-readable label used in tile names.
    pub fn label(&self) -> &'static str {
        match self {
            TilePlacement::Centered => "Centered",
            TilePlacement::TopLeft => "Top_Left",
            TilePlacement::TopRight => "Top_Right",
            TilePlacement::BottomLeft => "Bottom_Left",
            TilePlacement::BottomRight => "Bottom_Right",
        }
    }

    /// Parse an underscore-separated code list such as `"c_tl_tr_bl_br"`.
    ///
    /// The result is always in generation order without duplicates.
    pub fn parse_list(codes: &str) -> Result<Vec<TilePlacement>, TilingError> {
        let mut requested = Vec::new();
        for code in codes.split('_').filter(|c| !c.is_empty()) {
            requested.push(code.parse::<TilePlacement>()?);
        }
        Ok(Self::ALL
            .into_iter()
            .filter(|p| requested.contains(p))
            .collect())
    }
}

impl FromStr for TilePlacement {
    type Err = TilingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "c" | "centered" => Ok(TilePlacement::Centered),
            "tl" | "top_left" => Ok(TilePlacement::TopLeft),
            "tr" | "top_right" => Ok(TilePlacement::TopRight),
            "bl" | "bottom_left" => Ok(TilePlacement::BottomLeft),
            "br" | "bottom_right" => Ok(TilePlacement::BottomRight),
            other => Err(TilingError::Configuration(format!(
                "Unknown tile placement: {}. Use c, tl, tr, bl or br",
                other
            ))),
        }
    }
}

/// Axis-aligned box in corrected-RA / Dec space, inclusive on all edges.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub ra_min: f64,
    pub ra_max: f64,
    pub dec_min: f64,
    pub dec_max: f64,
}

impl BoundingBox {
    /// Builds a box from two RA edges and two Dec edges given in any order.
    pub fn from_edges(ra_a: f64, ra_b: f64, dec_a: f64, dec_b: f64) -> Self {
        Self {
            ra_min: ra_a.min(ra_b),
            ra_max: ra_a.max(ra_b),
            dec_min: dec_a.min(dec_b),
            dec_max: dec_a.max(dec_b),
        }
    }

    pub fn contains(&self, corrected_ra: f64, dec: f64) -> bool {
        corrected_ra >= self.ra_min
            && corrected_ra <= self.ra_max
            && dec >= self.dec_min
            && dec <= self.dec_max
    }

    /// Midpoint of the box, before any normalization.
    pub fn midpoint(&self) -> (f64, f64) {
        (
            0.5 * (self.ra_min + self.ra_max),
            0.5 * (self.dec_min + self.dec_max),
        )
    }
}

/// A sky position in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SkyPoint {
    pub ra: f64,
    pub dec: f64,
}

/// A candidate telescope pointing generated around one catalog candidate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tile {
    pub name: String,
    pub placement: TilePlacement,
    /// Candidate the tile was generated around.
    pub source: CandidateId,
    pub bounds: BoundingBox,
    /// Normalized box midpoint in corrected-RA / Dec space.
    pub center: SkyPoint,
    /// Normalized pointing in plain RA / Dec, used for angular containment.
    pub sky_center: SkyPoint,
}

/// A tile together with the candidates it covers and its priority score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredTile {
    #[serde(flatten)]
    pub tile: Tile,
    pub covered: Vec<CandidateId>,
    pub score: f64,
    /// Estimated exposure duration.
    pub exposure: Minutes,
}

/// Exposure setup requested from the observatory for every tile.
///
/// # Examples
///
/// ```
/// use gw_tiler::core::domain::ObservationSetup;
///
/// let setup = ObservationSetup::default();
/// assert_eq!(setup.mode, "HDR");
/// assert_eq!((setup.min_nexp, setup.exp_set_size), (1, 1));
/// assert_eq!((setup.min_mag, setup.max_mag), (10.0, 21.0));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObservationSetup {
    /// Camera mode label.
    pub mode: String,
    /// Minimum number of exposures, a multiple of `exp_set_size`.
    pub min_nexp: u32,
    pub exp_set_size: u32,
    pub min_mag: f64,
    pub max_mag: f64,
}

impl Default for ObservationSetup {
    fn default() -> Self {
        Self {
            mode: "HDR".to_string(),
            min_nexp: 1,
            exp_set_size: 1,
            min_mag: 10.0,
            max_mag: 21.0,
        }
    }
}

/// A galaxy listed on an accepted tile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoveredGalaxy {
    pub id: CandidateId,
    pub name: String,
    /// Sexagesimal rendering of the galaxy position.
    pub position: String,
}

/// A tile accepted into the night's ordered schedule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduledTile {
    #[serde(flatten)]
    pub scored: ScoredTile,
    pub start_time: DateTime<Utc>,
    /// 1-based scheduler iteration that accepted the tile.
    pub iteration: usize,
    /// Priority handed to the consuming observatory scheduler.
    pub priority: f64,
    /// Sexagesimal rendering of the pointing.
    pub position: String,
    #[serde(flatten)]
    pub setup: ObservationSetup,
    /// Newly covered galaxies, in the same order as `covered`.
    pub galaxies: Vec<CoveredGalaxy>,
}

impl ScheduledTile {
    pub fn name(&self) -> &str {
        &self.scored.tile.name
    }

    /// Plain-text listing of the galaxies in the tile, one per line.
    pub fn galaxy_listing(&self) -> String {
        let mut text = format!("Galaxies in tile {}:\n", self.name());
        for galaxy in &self.galaxies {
            text.push_str(&format!("name: {}   coords: {}\n", galaxy.name, galaxy.position));
        }
        text
    }

    pub fn covered(&self) -> &[CandidateId] {
        &self.scored.covered
    }

    pub fn center(&self) -> SkyPoint {
        self.scored.tile.center
    }
}

/// The RA/Dec rectangle currently above the site's altitude limit.
///
/// When `ra_min > ra_max` the window straddles RA 0°/360° and containment
/// wraps around.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ObservableWindow {
    pub ra_min: f64,
    pub ra_max: f64,
    pub dec_min: f64,
    pub dec_max: f64,
}

impl ObservableWindow {
    /// The whole sky.
    pub fn full_sky() -> Self {
        Self {
            ra_min: 0.0,
            ra_max: 360.0,
            dec_min: -90.0,
            dec_max: 90.0,
        }
    }

    pub fn straddles_zero(&self) -> bool {
        self.ra_min > self.ra_max
    }

    pub fn contains(&self, ra_deg: f64, dec_deg: f64) -> bool {
        let ra_ok = if self.straddles_zero() {
            ra_deg >= self.ra_min || ra_deg <= self.ra_max
        } else {
            ra_deg >= self.ra_min && ra_deg <= self.ra_max
        };
        ra_ok && dec_deg >= self.dec_min && dec_deg <= self.dec_max
    }
}

/// Which rule ends the night's tiling loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectionKind {
    /// Keep tiling until the simulated clock passes sunrise.
    ObservableTonight,
    /// Keep tiling until the tile budget or the catalog runs out.
    MaxTiles,
    /// Run exactly one selection pass.
    OneLoop,
}

/// Configured stopping rule for one scheduling run.
///
/// # Examples
///
/// ```
/// use gw_tiler::core::domain::{SelectionCriteria, SelectionKind};
///
/// let crit = SelectionCriteria::new(SelectionKind::MaxTiles, 2);
/// assert!(crit.budget_allows(1));
/// assert!(!crit.budget_allows(2));
/// assert!(SelectionCriteria::new(SelectionKind::MaxTiles, -1).budget_allows(10_000));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectionCriteria {
    #[serde(rename = "type")]
    pub kind: SelectionKind,
    /// Maximum number of tiles, `-1` for no limit.
    #[serde(default = "default_max_tiles")]
    pub max_tiles: i64,
}

fn default_max_tiles() -> i64 {
    -1
}

impl SelectionCriteria {
    pub fn new(kind: SelectionKind, max_tiles: i64) -> Self {
        Self { kind, max_tiles }
    }

    pub fn is_unlimited(&self) -> bool {
        self.max_tiles < 0
    }

    /// Whether one more tile may be accepted when `accepted` are already taken.
    pub fn budget_allows(&self, accepted: usize) -> bool {
        self.is_unlimited() || (accepted as i64) < self.max_tiles
    }
}

impl Default for SelectionCriteria {
    fn default() -> Self {
        Self::new(SelectionKind::ObservableTonight, default_max_tiles())
    }
}

/// Terminal state of a scheduling run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    Sunrise,
    CatalogExhausted,
    Budget,
    SingleLoop,
    Cancelled,
    Failed,
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            StopReason::Sunrise => "STOPPED_SUNRISE",
            StopReason::CatalogExhausted => "STOPPED_CATALOG_EXHAUSTED",
            StopReason::Budget => "STOPPED_BUDGET",
            StopReason::SingleLoop => "STOPPED_SINGLE_LOOP",
            StopReason::Cancelled => "STOPPED_CANCELLED",
            StopReason::Failed => "STOPPED_FAILED",
        };
        f.write_str(s)
    }
}

/// Scheduler state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SchedulerState {
    Initializing,
    Iterating,
    Stopped(StopReason),
}
