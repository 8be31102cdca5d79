//! High-level data loading utilities.
//!
//! This module provides convenient loaders that combine parsing logic with
//! error context, plus the JSON report written at the end of a run. Loaders
//! detect the input format from the file extension.
//!
//! # Example
//!
//! ```no_run
//! use gw_tiler::io::loaders::CatalogLoader;
//! use gw_tiler::parsing::CatalogSchema;
//! use std::path::Path;
//!
//! let result = CatalogLoader::load_from_file(
//!     Path::new("galaxies.csv"),
//!     "J/ApJS/199/26/table3",
//!     &CatalogSchema::default(),
//! )
//! .expect("Failed to load");
//! println!("Loaded {} candidates", result.num_candidates);
//! ```

pub mod loaders;

#[cfg(test)]
mod loaders_tests;

pub use loaders::{
    CatalogLoadResult, CatalogLoader, CatalogSourceType, EventInfo, SkymapLoader, TilingReport,
};
