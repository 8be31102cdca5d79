//! Tiling algorithms.
//!
//! # Components
//!
//! - [`tile_builder`]: Candidate-anchored pointing generation (five placements)
//! - [`tile_scorer`]: Coverage scoring against the working catalog
//! - [`statistics`]: NaN-aware percentiles used for tier thresholds
//! - [`selector`]: The night scheduling loop
//!
//! # Example
//!
//! ```ignore
//! use gw_tiler::algorithms::{SelectorSettings, TileSelector};
//! use gw_tiler::services::{FixedHorizon, NullAlertSink};
//!
//! # fn example(catalog: gw_tiler::catalog::GalaxyCatalog, horizon: FixedHorizon) {
//! let mut selector = TileSelector::new(SelectorSettings::default());
//! let outcome = selector.run(catalog, chrono::Utc::now(), &horizon, &NullAlertSink);
//! println!("{} tiles, stopped: {}", outcome.tiles.len(), outcome.stop_reason);
//! # }
//! ```

pub mod selector;
pub mod statistics;
pub mod tile_builder;
pub mod tile_scorer;

pub use selector::{
    CancellationToken, ClockAdvance, IterationSummary, OverlapScope, ScheduleOutcome,
    SelectorSettings, TileSelector,
};
pub use statistics::nan_percentile;
pub use tile_builder::{build_tiles, TILE_MARGIN_DEG};
pub use tile_scorer::{score_tile, Containment, ScorerSettings, BASE_SCORE};
