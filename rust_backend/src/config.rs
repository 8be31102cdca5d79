//! Tiler configuration file support.
//!
//! This module reads the `gw-tiler.toml` file that describes one follow-up
//! run: the event and its skymap, the galaxy catalog and its column layout,
//! tiling parameters, the stopping rule, the observing site and the alert
//! destination.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::algorithms::selector::{ClockAdvance, OverlapScope, SelectorSettings};
use crate::algorithms::tile_scorer::{Containment, ScorerSettings};
use crate::core::domain::{FieldOfView, ObservationSetup, SelectionCriteria, TilePlacement};
use crate::error::{TilingError, TilingResult};
use crate::parsing::catalog_parser::{AngleUnit, CatalogSchema, CoordinateFrame, DistanceKind};
use crate::services::alerts::AlertSinkKind;

/// File name searched by [`TilingConfig::from_default_location`].
pub const DEFAULT_CONFIG_FILE: &str = "gw-tiler.toml";

/// Complete configuration of one tiling run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TilingConfig {
    pub event: EventSettings,
    pub catalog: CatalogSettings,
    #[serde(default)]
    pub tiling: TilingSettings,
    #[serde(default)]
    pub selection: SelectionCriteria,
    pub site: SiteSettings,
    #[serde(default)]
    pub alerts: AlertSettings,
}

/// Transient event settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventSettings {
    pub name: String,
    #[serde(default = "default_event_type")]
    pub event_type: String,
    pub skymap: PathBuf,
    /// Requested start of observations; the run never starts before sunset.
    #[serde(default)]
    pub start_time: Option<DateTime<Utc>>,
}

/// Galaxy catalog settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogSettings {
    #[serde(default = "default_catalog_identifier")]
    pub identifier: String,
    pub path: PathBuf,
    #[serde(default = "default_name_column")]
    pub name_column: String,
    #[serde(default = "default_ra_column")]
    pub ra_column: String,
    #[serde(default = "default_dec_column")]
    pub dec_column: String,
    #[serde(default = "default_distance_column")]
    pub distance_column: String,
    #[serde(default)]
    pub distance_kind: DistanceKind,
    #[serde(default = "default_frame")]
    pub frame: String,
    #[serde(default = "default_unit")]
    pub unit: String,
}

/// Tile generation, scoring and scheduling parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TilingSettings {
    #[serde(default = "default_fov_ra")]
    pub fov_ra: f64,
    #[serde(default = "default_fov_dec")]
    pub fov_dec: f64,
    #[serde(default = "default_distance_cut")]
    pub distance_cut_mpc: f64,
    #[serde(default = "default_probability_percentile")]
    pub probability_percentile: f64,
    #[serde(default = "default_top_tier_percentile")]
    pub top_tier_percentile: f64,
    /// Exposure per tile, in minutes.
    #[serde(default = "default_exposure_time")]
    pub exposure_time: f64,
    /// Clock step when nothing is observable or accepted, in minutes.
    #[serde(default = "default_idle_step")]
    pub idle_step: f64,
    #[serde(default = "default_placements")]
    pub placements: String,
    #[serde(default)]
    pub containment: Containment,
    #[serde(default)]
    pub overlap_scope: OverlapScope,
    #[serde(default)]
    pub clock_advance: ClockAdvance,
    /// Camera mode requested for every tile.
    #[serde(default = "default_mode")]
    pub mode: String,
    #[serde(default = "default_min_nexp")]
    pub min_nexp: u32,
    #[serde(default = "default_exp_set_size")]
    pub exp_set_size: u32,
    #[serde(default = "default_min_mag")]
    pub min_mag: f64,
    #[serde(default = "default_max_mag")]
    pub max_mag: f64,
}

/// Observing site and night bounds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiteSettings {
    pub longitude: f64,
    pub latitude: f64,
    #[serde(default = "default_min_altitude")]
    pub min_altitude: f64,
    pub sunset: DateTime<Utc>,
    pub sunrise: DateTime<Utc>,
    #[serde(default = "default_horizon_cache_seconds")]
    pub horizon_cache_seconds: i64,
}

/// Alert delivery settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertSettings {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub sink: AlertSinkKind,
    #[serde(default)]
    pub path: Option<PathBuf>,
}

fn default_event_type() -> String {
    "Initial".to_string()
}

fn default_catalog_identifier() -> String {
    "J/ApJS/199/26/table3".to_string()
}

fn default_name_column() -> String {
    "SimbadName".to_string()
}

fn default_ra_column() -> String {
    "_RAJ2000".to_string()
}

fn default_dec_column() -> String {
    "_DEJ2000".to_string()
}

fn default_distance_column() -> String {
    "cz".to_string()
}

fn default_frame() -> String {
    "fk5".to_string()
}

fn default_unit() -> String {
    "deg".to_string()
}

fn default_fov_ra() -> f64 {
    3.0
}

fn default_fov_dec() -> f64 {
    2.0
}

fn default_distance_cut() -> f64 {
    50.0
}

fn default_probability_percentile() -> f64 {
    95.0
}

fn default_top_tier_percentile() -> f64 {
    98.0
}

fn default_exposure_time() -> f64 {
    10.0
}

fn default_idle_step() -> f64 {
    1.0
}

fn default_placements() -> String {
    "c_tl_tr_bl_br".to_string()
}

fn default_mode() -> String {
    ObservationSetup::default().mode
}

fn default_min_nexp() -> u32 {
    ObservationSetup::default().min_nexp
}

fn default_exp_set_size() -> u32 {
    ObservationSetup::default().exp_set_size
}

fn default_min_mag() -> f64 {
    ObservationSetup::default().min_mag
}

fn default_max_mag() -> f64 {
    ObservationSetup::default().max_mag
}

fn default_min_altitude() -> f64 {
    30.0
}

fn default_horizon_cache_seconds() -> i64 {
    60
}

impl Default for TilingSettings {
    fn default() -> Self {
        Self {
            fov_ra: default_fov_ra(),
            fov_dec: default_fov_dec(),
            distance_cut_mpc: default_distance_cut(),
            probability_percentile: default_probability_percentile(),
            top_tier_percentile: default_top_tier_percentile(),
            exposure_time: default_exposure_time(),
            idle_step: default_idle_step(),
            placements: default_placements(),
            containment: Containment::default(),
            overlap_scope: OverlapScope::default(),
            clock_advance: ClockAdvance::default(),
            mode: default_mode(),
            min_nexp: default_min_nexp(),
            exp_set_size: default_exp_set_size(),
            min_mag: default_min_mag(),
            max_mag: default_max_mag(),
        }
    }
}

impl Default for AlertSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            sink: AlertSinkKind::default(),
            path: None,
        }
    }
}

impl TilingSettings {
    pub fn fov(&self) -> FieldOfView {
        FieldOfView::new(self.fov_ra, self.fov_dec)
    }

    pub fn placements(&self) -> TilingResult<Vec<TilePlacement>> {
        TilePlacement::parse_list(&self.placements)
    }

    pub fn scorer_settings(&self) -> ScorerSettings {
        ScorerSettings {
            fov: self.fov(),
            containment: self.containment,
            exposure: qtty::Minutes::new(self.exposure_time),
        }
    }

    pub fn observation_setup(&self) -> ObservationSetup {
        ObservationSetup {
            mode: self.mode.clone(),
            min_nexp: self.min_nexp,
            exp_set_size: self.exp_set_size,
            min_mag: self.min_mag,
            max_mag: self.max_mag,
        }
    }
}

impl CatalogSettings {
    /// Column layout and unit handling for the catalog parser.
    pub fn schema(&self) -> TilingResult<CatalogSchema> {
        // Only equatorial J2000 frames are accepted; the label is not used further.
        self.frame.parse::<CoordinateFrame>()?;
        Ok(CatalogSchema {
            name_column: self.name_column.clone(),
            ra_column: self.ra_column.clone(),
            dec_column: self.dec_column.clone(),
            distance_column: self.distance_column.clone(),
            distance_kind: self.distance_kind,
            unit: self.unit.parse::<AngleUnit>()?,
        })
    }
}

impl TilingConfig {
    /// Load tiler configuration from a TOML file.
    ///
    /// # Arguments
    /// * `path` - Path to the configuration file
    ///
    /// # Returns
    /// * `Ok(TilingConfig)` if the file is readable, parseable and valid
    /// * `Err(TilingError::Configuration)` otherwise
    pub fn from_file<P: AsRef<Path>>(path: P) -> TilingResult<Self> {
        let content = fs::read_to_string(path.as_ref()).map_err(|e| {
            TilingError::Configuration(format!("Failed to read config file: {}", e))
        })?;

        Self::from_toml_str(&content)
    }

    /// Parse and validate configuration from TOML text.
    pub fn from_toml_str(content: &str) -> TilingResult<Self> {
        let config: TilingConfig = toml::from_str(content).map_err(|e| {
            TilingError::Configuration(format!("Failed to parse config file: {}", e))
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Load tiler configuration from the default location.
    ///
    /// Searches for `gw-tiler.toml` in:
    /// 1. Current directory
    /// 2. `rust_backend/` directory
    /// 3. Parent directory
    pub fn from_default_location() -> TilingResult<Self> {
        let search_paths = vec![
            PathBuf::from(DEFAULT_CONFIG_FILE),
            PathBuf::from("rust_backend").join(DEFAULT_CONFIG_FILE),
            PathBuf::from("..").join(DEFAULT_CONFIG_FILE),
        ];

        for path in search_paths {
            if path.exists() {
                return Self::from_file(&path);
            }
        }

        Err(TilingError::Configuration(format!(
            "No {} found in standard locations",
            DEFAULT_CONFIG_FILE
        )))
    }

    /// Check value ranges that serde cannot express.
    pub fn validate(&self) -> TilingResult<()> {
        let t = &self.tiling;

        if !(t.fov_ra > 0.0 && t.fov_dec > 0.0) {
            return Err(TilingError::Configuration(format!(
                "Field of view must be positive, got ({}, {})",
                t.fov_ra, t.fov_dec
            )));
        }

        for (name, value) in [
            ("probability_percentile", t.probability_percentile),
            ("top_tier_percentile", t.top_tier_percentile),
        ] {
            if !(0.0..=100.0).contains(&value) {
                return Err(TilingError::Configuration(format!(
                    "tiling.{} must be within [0, 100], got {}",
                    name, value
                )));
            }
        }

        if !(t.exposure_time > 0.0) {
            return Err(TilingError::Configuration(format!(
                "tiling.exposure_time must be positive, got {}",
                t.exposure_time
            )));
        }

        if !(t.idle_step > 0.0) {
            return Err(TilingError::Configuration(format!(
                "tiling.idle_step must be positive, got {}",
                t.idle_step
            )));
        }

        if !(t.distance_cut_mpc > 0.0) {
            return Err(TilingError::Configuration(format!(
                "tiling.distance_cut_mpc must be positive, got {}",
                t.distance_cut_mpc
            )));
        }

        if t.mode.trim().is_empty() {
            return Err(TilingError::Configuration(
                "tiling.mode must not be empty".to_string(),
            ));
        }

        if t.exp_set_size == 0 || t.min_nexp % t.exp_set_size != 0 {
            return Err(TilingError::Configuration(format!(
                "tiling.min_nexp ({}) must be a multiple of a positive tiling.exp_set_size ({})",
                t.min_nexp, t.exp_set_size
            )));
        }

        if !(t.min_mag < t.max_mag) {
            return Err(TilingError::Configuration(format!(
                "tiling.min_mag ({}) must be below tiling.max_mag ({})",
                t.min_mag, t.max_mag
            )));
        }

        let placements = t.placements()?;
        if placements.is_empty() {
            return Err(TilingError::Configuration(
                "tiling.placements must name at least one placement".to_string(),
            ));
        }

        if self.selection.max_tiles < -1 {
            return Err(TilingError::Configuration(format!(
                "selection.max_tiles must be -1 or non-negative, got {}",
                self.selection.max_tiles
            )));
        }

        self.catalog.schema()?;

        if self.site.sunrise <= self.site.sunset {
            return Err(TilingError::Configuration(format!(
                "site.sunrise ({}) must be after site.sunset ({})",
                self.site.sunrise, self.site.sunset
            )));
        }

        if !(-90.0..=90.0).contains(&self.site.latitude) {
            return Err(TilingError::Configuration(format!(
                "site.latitude must be within [-90, 90], got {}",
                self.site.latitude
            )));
        }

        if !(0.0..90.0).contains(&self.site.min_altitude) {
            return Err(TilingError::Configuration(format!(
                "site.min_altitude must be within [0, 90), got {}",
                self.site.min_altitude
            )));
        }

        if self.site.horizon_cache_seconds <= 0 {
            return Err(TilingError::Configuration(format!(
                "site.horizon_cache_seconds must be positive, got {}",
                self.site.horizon_cache_seconds
            )));
        }

        if self.alerts.enabled
            && self.alerts.sink == AlertSinkKind::JsonLines
            && self.alerts.path.is_none()
        {
            return Err(TilingError::Configuration(
                "alerts.path is required for the json_lines sink".to_string(),
            ));
        }

        Ok(())
    }

    /// Scheduler settings derived from the `[tiling]` and `[selection]` sections.
    pub fn selector_settings(&self) -> TilingResult<SelectorSettings> {
        Ok(SelectorSettings {
            scorer: self.tiling.scorer_settings(),
            placements: self.tiling.placements()?,
            selection: self.selection,
            top_tier_percentile: self.tiling.top_tier_percentile,
            idle_step: qtty::Minutes::new(self.tiling.idle_step),
            overlap_scope: self.tiling.overlap_scope,
            clock_advance: self.tiling.clock_advance,
            event_prefix: self.event.name.clone(),
            event_type: self.event.event_type.clone(),
            observation: self.tiling.observation_setup(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::domain::SelectionKind;

    const MINIMAL: &str = r#"
[event]
name = "S190425z"
skymap = "skymap.json"

[catalog]
path = "galaxies.csv"

[site]
longitude = -70.7
latitude = -30.2
sunset = "2019-04-25T23:00:00Z"
sunrise = "2019-04-26T10:00:00Z"
"#;

    #[test]
    fn test_parse_minimal_config_applies_defaults() {
        let config = TilingConfig::from_toml_str(MINIMAL).unwrap();

        assert_eq!(config.event.event_type, "Initial");
        assert_eq!(config.catalog.name_column, "SimbadName");
        assert_eq!(config.catalog.ra_column, "_RAJ2000");
        assert_eq!(config.catalog.distance_column, "cz");
        assert_eq!(config.tiling.fov_ra, 3.0);
        assert_eq!(config.tiling.fov_dec, 2.0);
        assert_eq!(config.tiling.distance_cut_mpc, 50.0);
        assert_eq!(config.tiling.probability_percentile, 95.0);
        assert_eq!(config.tiling.top_tier_percentile, 98.0);
        assert_eq!(config.tiling.exposure_time, 10.0);
        assert_eq!(config.tiling.containment, Containment::BoundingBox);
        assert_eq!(config.tiling.overlap_scope, OverlapScope::Night);
        assert_eq!(config.tiling.clock_advance, ClockAdvance::LastAccepted);
        assert_eq!(config.tiling.observation_setup(), ObservationSetup::default());
        assert_eq!(config.selection.kind, SelectionKind::ObservableTonight);
        assert_eq!(config.selection.max_tiles, -1);
        assert_eq!(config.site.horizon_cache_seconds, 60);
        assert!(!config.alerts.enabled);
    }

    #[test]
    fn test_parse_full_config() {
        let toml_str = r#"
[event]
name = "GW170817"
event_type = "Update"
skymap = "bayestar.json"
start_time = "2017-08-17T22:00:00Z"

[catalog]
identifier = "GLADE"
path = "glade.json"
name_column = "GWGC"
distance_column = "dist"
distance_kind = "luminosity_distance"
frame = "icrs"
unit = "rad"

[tiling]
fov_ra = 4.0
fov_dec = 2.5
placements = "c_tl"
containment = "angular_radius"
overlap_scope = "iteration"
clock_advance = "sum"
mode = "LDR"
min_nexp = 4
exp_set_size = 2
min_mag = 12.5
max_mag = 19.0

[selection]
type = "max_tiles"
max_tiles = 16

[site]
longitude = 149.07
latitude = -31.27
min_altitude = 25.0
sunset = "2017-08-17T08:00:00Z"
sunrise = "2017-08-17T20:00:00Z"
horizon_cache_seconds = 120

[alerts]
enabled = true
sink = "json_lines"
path = "alerts.jsonl"
"#;
        let config = TilingConfig::from_toml_str(toml_str).unwrap();

        assert_eq!(config.catalog.distance_kind, DistanceKind::LuminosityDistance);
        assert_eq!(config.catalog.schema().unwrap().unit, AngleUnit::Radians);
        assert_eq!(config.tiling.containment, Containment::AngularRadius);
        assert_eq!(config.tiling.overlap_scope, OverlapScope::Iteration);
        assert_eq!(config.tiling.clock_advance, ClockAdvance::Sum);
        assert_eq!(config.selection.kind, SelectionKind::MaxTiles);
        assert_eq!(config.selection.max_tiles, 16);
        assert_eq!(config.alerts.sink, AlertSinkKind::JsonLines);

        let settings = config.selector_settings().unwrap();
        assert_eq!(settings.placements.len(), 2);
        assert_eq!(settings.event_prefix, "GW170817");
        assert_eq!(settings.observation.mode, "LDR");
        assert_eq!(settings.observation.min_nexp, 4);
        assert_eq!(settings.observation.exp_set_size, 2);
        assert_eq!(settings.observation.min_mag, 12.5);
        assert_eq!(settings.observation.max_mag, 19.0);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let cases = [
            ("[tiling]\nfov_ra = 0.0\n", "Field of view"),
            ("[tiling]\nprobability_percentile = 101.0\n", "probability_percentile"),
            ("[tiling]\nexposure_time = -1.0\n", "exposure_time"),
            ("[tiling]\nplacements = \"c_zz\"\n", "placement"),
            ("[selection]\ntype = \"max_tiles\"\nmax_tiles = -5\n", "max_tiles"),
            ("[tiling]\nmin_nexp = 3\nexp_set_size = 2\n", "min_nexp"),
            ("[tiling]\nexp_set_size = 0\n", "exp_set_size"),
            ("[tiling]\nmin_mag = 21.0\nmax_mag = 10.0\n", "min_mag"),
        ];

        for (extra, needle) in cases {
            let text = format!("{}\n{}", MINIMAL, extra);
            let err = TilingConfig::from_toml_str(&text).unwrap_err();
            assert!(
                matches!(err, TilingError::Configuration(ref msg) if msg.contains(needle)),
                "expected '{}' in {:?}",
                needle,
                err
            );
        }
    }

    #[test]
    fn test_validate_rejects_inverted_night() {
        let text = MINIMAL.replace("2019-04-26T10:00:00Z", "2019-04-25T22:00:00Z");
        let err = TilingConfig::from_toml_str(&text).unwrap_err();
        assert!(err.to_string().contains("sunrise"));
    }

    #[test]
    fn test_validate_rejects_unknown_frame() {
        let text = MINIMAL.replace("path = \"galaxies.csv\"", "path = \"galaxies.csv\"\nframe = \"galactic\"");
        assert!(TilingConfig::from_toml_str(&text).is_err());
    }

    #[test]
    fn test_from_file_reads_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(DEFAULT_CONFIG_FILE);
        std::fs::write(&path, MINIMAL).unwrap();

        let config = TilingConfig::from_file(&path).unwrap();
        assert_eq!(config.event.name, "S190425z");
    }

    #[test]
    fn test_from_file_missing() {
        let result = TilingConfig::from_file("/nonexistent/gw-tiler.toml");
        assert!(matches!(result, Err(TilingError::Configuration(_))));
    }
}
