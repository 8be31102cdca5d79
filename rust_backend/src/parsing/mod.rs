//! Parsers for skymap and galaxy catalog inputs.
//!
//! # Parsers
//!
//! - [`skymap_parser`]: Parse JSON-encoded HEALPix probability skymaps
//! - [`catalog_parser`]: Parse CSV or JSON galaxy catalogs with configurable columns
//!
//! # Example
//!
//! ```no_run
//! use gw_tiler::parsing::skymap_parser::parse_skymap_json;
//! use std::path::Path;
//!
//! let map = parse_skymap_json(Path::new("skymap.json"))
//!     .expect("Failed to parse skymap");
//! println!("{} pixels", map.npix());
//! ```

pub mod catalog_parser;
pub mod skymap_parser;

#[cfg(test)]
mod skymap_parser_tests;

pub use catalog_parser::{CatalogParseResult, CatalogSchema, DistanceKind};
