use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;
use uuid::Uuid;

use crate::algorithms::selector::{IterationSummary, ScheduleOutcome};
use crate::catalog::GalaxyCatalog;
use crate::core::domain::{ScheduledTile, StopReason};
use crate::parsing::catalog_parser::{self, CatalogSchema, SkippedRow};
use crate::parsing::skymap_parser;
use crate::services::horizon::NightBounds;
use crate::skymap::SkyProbabilityMap;

/// Represents the source type of catalog data
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CatalogSourceType {
    Json,
    Csv,
}

/// Result of loading a galaxy catalog
#[derive(Debug)]
pub struct CatalogLoadResult {
    pub catalog: GalaxyCatalog,
    pub skipped: Vec<SkippedRow>,
    pub source_type: CatalogSourceType,
    pub num_candidates: usize,
}

impl CatalogLoadResult {
    fn new(parsed: catalog_parser::CatalogParseResult, source_type: CatalogSourceType) -> Self {
        let num_candidates = parsed.catalog.len();
        Self {
            catalog: parsed.catalog,
            skipped: parsed.skipped,
            source_type,
            num_candidates,
        }
    }
}

/// Unified interface for loading galaxy catalogs from CSV or JSON
pub struct CatalogLoader;

impl CatalogLoader {
    /// Load a catalog from a file (auto-detects JSON or CSV)
    pub fn load_from_file(
        path: &Path,
        identifier: &str,
        schema: &CatalogSchema,
    ) -> Result<CatalogLoadResult> {
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .context("File has no extension")?;

        match extension.to_lowercase().as_str() {
            "json" => Self::load_from_json(path, identifier, schema),
            "csv" => Self::load_from_csv(path, identifier, schema),
            _ => anyhow::bail!("Unsupported file format: {}", extension),
        }
    }

    /// Load a catalog from a CSV file
    pub fn load_from_csv(
        csv_path: &Path,
        identifier: &str,
        schema: &CatalogSchema,
    ) -> Result<CatalogLoadResult> {
        let parsed = catalog_parser::parse_catalog_csv(csv_path, identifier, schema)
            .context("Failed to parse CSV catalog")?;
        Ok(CatalogLoadResult::new(parsed, CatalogSourceType::Csv))
    }

    /// Load a catalog from a JSON file
    pub fn load_from_json(
        json_path: &Path,
        identifier: &str,
        schema: &CatalogSchema,
    ) -> Result<CatalogLoadResult> {
        let parsed = catalog_parser::parse_catalog_json(json_path, identifier, schema)
            .context("Failed to parse JSON catalog")?;
        Ok(CatalogLoadResult::new(parsed, CatalogSourceType::Json))
    }

    /// Load a catalog from a JSON string
    pub fn load_from_json_str(
        json_str: &str,
        identifier: &str,
        schema: &CatalogSchema,
    ) -> Result<CatalogLoadResult> {
        let parsed = catalog_parser::parse_catalog_json_str(json_str, identifier, schema)
            .context("Failed to parse JSON catalog string")?;
        Ok(CatalogLoadResult::new(parsed, CatalogSourceType::Json))
    }
}

/// Unified interface for loading localization skymaps
pub struct SkymapLoader;

impl SkymapLoader {
    pub fn load_from_file(path: &Path) -> Result<SkyProbabilityMap> {
        skymap_parser::parse_skymap_json(path)
            .with_context(|| format!("Failed to load skymap {}", path.display()))
    }

    pub fn load_from_str(json_str: &str) -> Result<SkyProbabilityMap> {
        skymap_parser::parse_skymap_json_str(json_str).context("Failed to parse skymap string")
    }
}

/// Event identification carried in the report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventInfo {
    pub name: String,
    pub event_type: String,
}

/// JSON document describing one tiling run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TilingReport {
    pub run_id: Uuid,
    pub generated_at: DateTime<Utc>,
    pub event: EventInfo,
    pub catalog_identifier: String,
    /// SHA-256 of the catalog snapshot the run started from.
    pub catalog_checksum: String,
    pub candidates_loaded: usize,
    pub candidates_skipped: usize,
    pub candidates_filtered: usize,
    pub stop_reason: StopReason,
    pub failure: Option<String>,
    pub night: Option<NightBounds>,
    pub iterations: Vec<IterationSummary>,
    pub tiles: Vec<ScheduledTile>,
}

impl TilingReport {
    /// Build a report from a finished run.
    ///
    /// `loaded` is the parsed catalog and `filtered` the snapshot handed to
    /// the scheduler; the checksum is taken over the latter.
    pub fn new(
        event: EventInfo,
        loaded: &CatalogLoadResult,
        filtered: &GalaxyCatalog,
        outcome: ScheduleOutcome,
    ) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            generated_at: Utc::now(),
            event,
            catalog_identifier: filtered.identifier().to_string(),
            catalog_checksum: filtered.checksum(),
            candidates_loaded: loaded.num_candidates,
            candidates_skipped: loaded.skipped.len() + outcome.skipped_candidates,
            candidates_filtered: filtered.len(),
            stop_reason: outcome.stop_reason,
            failure: outcome.failure.map(|e| e.to_string()),
            night: outcome.night,
            iterations: outcome.iterations,
            tiles: outcome.tiles,
        }
    }

    pub fn to_json_string(&self) -> Result<String> {
        serde_json::to_string_pretty(self).context("Failed to serialize tiling report")
    }

    /// Write the report as pretty JSON.
    pub fn write_to_file(&self, path: &Path) -> Result<()> {
        let json = self.to_json_string()?;
        std::fs::write(path, json)
            .with_context(|| format!("Failed to write report to {}", path.display()))
    }

    pub fn read_from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read report {}", path.display()))?;
        serde_json::from_str(&content).context("Failed to parse tiling report")
    }
}
