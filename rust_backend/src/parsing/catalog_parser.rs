use std::fmt;
use std::io::Read;
use std::path::Path;
use std::str::FromStr;

use log::warn;
use serde::{Deserialize, Serialize};

use crate::catalog::GalaxyCatalog;
use crate::core::domain::{Candidate, CandidateId, DistanceProxy};
use crate::error::{TilingError, TilingResult};

/// What the catalog's distance column holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DistanceKind {
    /// Recession velocity `cz` in km/s.
    #[default]
    RecessionVelocity,
    /// Luminosity distance in Mpc.
    LuminosityDistance,
}

impl DistanceKind {
    fn proxy(&self, value: f64) -> DistanceProxy {
        match self {
            DistanceKind::RecessionVelocity => DistanceProxy::RecessionVelocity(value),
            DistanceKind::LuminosityDistance => DistanceProxy::LuminosityDistance(value),
        }
    }
}

/// Unit of the catalog's coordinate columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AngleUnit {
    #[default]
    Degrees,
    Radians,
}

impl AngleUnit {
    pub fn to_degrees(&self, value: f64) -> f64 {
        match self {
            AngleUnit::Degrees => value,
            AngleUnit::Radians => value.to_degrees(),
        }
    }
}

impl FromStr for AngleUnit {
    type Err = TilingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "deg" | "degree" | "degrees" => Ok(AngleUnit::Degrees),
            "rad" | "radian" | "radians" => Ok(AngleUnit::Radians),
            other => Err(TilingError::Configuration(format!(
                "Unknown coordinate unit: {}. Use 'deg' or 'rad'",
                other
            ))),
        }
    }
}

/// Equatorial frame of the catalog coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoordinateFrame {
    Fk5,
    Icrs,
}

impl FromStr for CoordinateFrame {
    type Err = TilingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "fk5" => Ok(CoordinateFrame::Fk5),
            "icrs" => Ok(CoordinateFrame::Icrs),
            other => Err(TilingError::Configuration(format!(
                "Unknown coordinate frame: {}. Use 'fk5' or 'icrs'",
                other
            ))),
        }
    }
}

/// Column layout of a galaxy catalog file.
#[derive(Debug, Clone, PartialEq)]
pub struct CatalogSchema {
    pub name_column: String,
    pub ra_column: String,
    pub dec_column: String,
    pub distance_column: String,
    pub distance_kind: DistanceKind,
    pub unit: AngleUnit,
}

impl Default for CatalogSchema {
    fn default() -> Self {
        Self {
            name_column: "SimbadName".to_string(),
            ra_column: "_RAJ2000".to_string(),
            dec_column: "_DEJ2000".to_string(),
            distance_column: "cz".to_string(),
            distance_kind: DistanceKind::RecessionVelocity,
            unit: AngleUnit::Degrees,
        }
    }
}

/// A catalog row that could not be turned into a candidate.
#[derive(Debug, Clone, PartialEq)]
pub struct SkippedRow {
    /// 1-based data row number, header excluded.
    pub row: usize,
    pub error: TilingError,
}

impl fmt::Display for SkippedRow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "row {}: {}", self.row, self.error)
    }
}

/// Result of parsing a catalog file
#[derive(Debug, Clone)]
pub struct CatalogParseResult {
    pub catalog: GalaxyCatalog,
    pub skipped: Vec<SkippedRow>,
}

/// Builds candidates from loosely typed rows, assigning ids in file order.
struct RowCollector<'a> {
    schema: &'a CatalogSchema,
    candidates: Vec<Candidate>,
    skipped: Vec<SkippedRow>,
}

impl<'a> RowCollector<'a> {
    fn new(schema: &'a CatalogSchema) -> Self {
        Self {
            schema,
            candidates: Vec::new(),
            skipped: Vec::new(),
        }
    }

    fn push(&mut self, row: usize, fields: TilingResult<RawRow>) {
        let id = CandidateId(self.candidates.len());
        match fields.and_then(|raw| raw.into_candidate(id, self.schema)) {
            Ok(candidate) => self.candidates.push(candidate),
            Err(error) => {
                warn!("Skipping catalog row {}: {}", row, error);
                self.skipped.push(SkippedRow { row, error });
            }
        }
    }

    fn finish(self, identifier: &str) -> CatalogParseResult {
        CatalogParseResult {
            catalog: GalaxyCatalog::new(identifier, self.candidates),
            skipped: self.skipped,
        }
    }
}

/// One row with the four columns of interest as text.
struct RawRow {
    name: String,
    ra: String,
    dec: String,
    distance: String,
}

impl RawRow {
    fn into_candidate(self, id: CandidateId, schema: &CatalogSchema) -> TilingResult<Candidate> {
        let name = self.name.trim().to_string();
        if name.is_empty() {
            return Err(TilingError::CandidateData("empty name".to_string()));
        }

        let ra = schema.unit.to_degrees(parse_number(&schema.ra_column, &self.ra)?);
        let dec = schema.unit.to_degrees(parse_number(&schema.dec_column, &self.dec)?);
        let distance = parse_number(&schema.distance_column, &self.distance)?;

        if dec.abs() > 90.0 {
            return Err(TilingError::CandidateData(format!(
                "{}: declination {} outside [-90, 90]",
                name, dec
            )));
        }

        Ok(Candidate::new(
            id,
            name,
            ra,
            dec,
            schema.distance_kind.proxy(distance),
        ))
    }
}

fn parse_number(column: &str, text: &str) -> TilingResult<f64> {
    let text = text.trim();
    if text.is_empty() {
        return Err(TilingError::CandidateData(format!(
            "missing value in column '{}'",
            column
        )));
    }
    let value: f64 = text.parse().map_err(|_| {
        TilingError::CandidateData(format!(
            "column '{}' is not a number: '{}'",
            column, text
        ))
    })?;
    if !value.is_finite() {
        return Err(TilingError::CandidateData(format!(
            "column '{}' is not finite: {}",
            column, value
        )));
    }
    Ok(value)
}

/// Parse a galaxy catalog CSV file with a header row.
pub fn parse_catalog_csv(
    csv_path: &Path,
    identifier: &str,
    schema: &CatalogSchema,
) -> TilingResult<CatalogParseResult> {
    let file = std::fs::File::open(csv_path).map_err(|e| {
        TilingError::Io(format!("Failed to open {}: {}", csv_path.display(), e))
    })?;
    parse_catalog_csv_reader(file, identifier, schema)
}

/// Parse a galaxy catalog CSV from any reader.
pub fn parse_catalog_csv_reader<R: Read>(
    reader: R,
    identifier: &str,
    schema: &CatalogSchema,
) -> TilingResult<CatalogParseResult> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(reader);

    let headers = rdr
        .headers()
        .map_err(|e| TilingError::Io(format!("Failed to read CSV header: {}", e)))?
        .clone();

    let column = |name: &str| -> TilingResult<usize> {
        headers.iter().position(|h| h == name).ok_or_else(|| {
            TilingError::Configuration(format!(
                "Catalog has no column '{}'. Found: {:?}",
                name,
                headers.iter().collect::<Vec<_>>()
            ))
        })
    };
    let name_idx = column(&schema.name_column)?;
    let ra_idx = column(&schema.ra_column)?;
    let dec_idx = column(&schema.dec_column)?;
    let dist_idx = column(&schema.distance_column)?;

    let mut collector = RowCollector::new(schema);
    for (i, record) in rdr.records().enumerate() {
        let row = i + 1;
        let fields = record
            .map_err(|e| TilingError::CandidateData(format!("undecodable record: {}", e)))
            .map(|record| {
                let get = |idx: usize| record.get(idx).unwrap_or("").to_string();
                RawRow {
                    name: get(name_idx),
                    ra: get(ra_idx),
                    dec: get(dec_idx),
                    distance: get(dist_idx),
                }
            });
        collector.push(row, fields);
    }

    Ok(collector.finish(identifier))
}

/// Parse a galaxy catalog JSON file holding an array of row objects.
pub fn parse_catalog_json(
    json_path: &Path,
    identifier: &str,
    schema: &CatalogSchema,
) -> TilingResult<CatalogParseResult> {
    let content = std::fs::read_to_string(json_path).map_err(|e| {
        TilingError::Io(format!("Failed to read {}: {}", json_path.display(), e))
    })?;
    parse_catalog_json_str(&content, identifier, schema)
}

/// Parse a galaxy catalog from a JSON array string.
pub fn parse_catalog_json_str(
    json_str: &str,
    identifier: &str,
    schema: &CatalogSchema,
) -> TilingResult<CatalogParseResult> {
    let rows: Vec<serde_json::Value> = serde_json::from_str(json_str).map_err(|e| {
        TilingError::Configuration(format!("Catalog JSON must be an array of objects: {}", e))
    })?;

    let mut collector = RowCollector::new(schema);
    for (i, value) in rows.iter().enumerate() {
        let fields = match value.as_object() {
            Some(obj) => {
                let get = |key: &str| match obj.get(key) {
                    Some(serde_json::Value::String(s)) => s.clone(),
                    Some(serde_json::Value::Null) | None => String::new(),
                    Some(other) => other.to_string(),
                };
                Ok(RawRow {
                    name: get(&schema.name_column),
                    ra: get(&schema.ra_column),
                    dec: get(&schema.dec_column),
                    distance: get(&schema.distance_column),
                })
            }
            None => Err(TilingError::CandidateData(format!(
                "row is not an object: {}",
                value
            ))),
        };
        collector.push(i + 1, fields);
    }

    Ok(collector.finish(identifier))
}
