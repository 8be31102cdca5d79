//! gw-tiler - telescope tiling for transient follow-up.
//!
//! Filters a galaxy catalog by a HEALPix localization skymap and schedules
//! candidate-anchored pointings over one observing night.

pub mod algorithms;
pub mod catalog;
pub mod config;
pub mod core;
pub mod error;
pub mod io;
pub mod parsing;
pub mod services;
pub mod skymap;
pub mod time;

pub use error::{TilingError, TilingResult};
