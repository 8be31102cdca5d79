use serde::Deserialize;
use std::path::Path;

use crate::error::{TilingError, TilingResult};
use crate::skymap::{PixelOrdering, SkyProbabilityMap};

/// Raw JSON structure for a skymap; `null` pixels decode as NaN.
#[derive(Debug, Deserialize)]
struct RawSkymap {
    #[serde(default, alias = "ORDERING")]
    ordering: Option<PixelOrdering>,
    #[serde(alias = "PROB")]
    prob: Vec<Option<f64>>,
    #[serde(alias = "DISTMU")]
    distmu: Vec<Option<f64>>,
    #[serde(alias = "DISTSIGMA")]
    distsigma: Vec<Option<f64>>,
    #[serde(alias = "DISTNORM")]
    distnorm: Vec<Option<f64>>,
}

fn nan_for_null(values: Vec<Option<f64>>) -> Vec<f64> {
    values.into_iter().map(|v| v.unwrap_or(f64::NAN)).collect()
}

/// Parse a skymap JSON file
pub fn parse_skymap_json(json_path: &Path) -> TilingResult<SkyProbabilityMap> {
    let json_content = std::fs::read_to_string(json_path).map_err(|e| {
        TilingError::Io(format!(
            "Failed to read skymap file {}: {}",
            json_path.display(),
            e
        ))
    })?;

    parse_skymap_json_str(&json_content)
}

/// Parse a skymap from a JSON string.
///
/// Decoding errors name the offending JSON path, e.g. `distmu[3]`.
pub fn parse_skymap_json_str(json_str: &str) -> TilingResult<SkyProbabilityMap> {
    let deserializer = &mut serde_json::Deserializer::from_str(json_str);
    let raw: RawSkymap = serde_path_to_error::deserialize(deserializer).map_err(|e| {
        let path = e.path().to_string();
        TilingError::MapFormat(format!("{} (at '{}')", e.into_inner(), path))
    })?;

    SkyProbabilityMap::new(
        raw.ordering.unwrap_or_default(),
        nan_for_null(raw.prob),
        nan_for_null(raw.distmu),
        nan_for_null(raw.distsigma),
        nan_for_null(raw.distnorm),
    )
}
