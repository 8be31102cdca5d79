//! gw-tiler command line entry point.
//!
//! Loads the configuration, the skymap and the galaxy catalog, schedules one
//! night of tiles and writes the JSON report.
//!
//! # Usage
//!
//! ```bash
//! gw-tiler [CONFIG] [OUTPUT]
//! ```
//!
//! `CONFIG` defaults to the first `gw-tiler.toml` found in the standard
//! locations; `OUTPUT` defaults to `tiles.json`.
//!
//! # Environment Variables
//!
//! - `RUST_LOG`: Log filter directives, e.g. `debug` or `gw_tiler=debug` (default: info)

use std::env;
use std::path::{Path, PathBuf};

use anyhow::Context;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use gw_tiler::algorithms::TileSelector;
use gw_tiler::config::TilingConfig;
use gw_tiler::io::{CatalogLoader, EventInfo, SkymapLoader, TilingReport};
use gw_tiler::services::{AlertSink, CachedHorizon, NullAlertSink, SiderealHorizon};

fn main() -> anyhow::Result<()> {
    FmtSubscriber::builder()
        .with_env_filter(log_filter())
        .with_target(true)
        .with_thread_ids(true)
        .init();

    let args: Vec<String> = env::args().collect();
    let config = match args.get(1) {
        Some(path) => TilingConfig::from_file(path),
        None => TilingConfig::from_default_location(),
    }
    .context("Failed to load configuration")?;
    let output = args
        .get(2)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("tiles.json"));

    info!("Planning tiles for {} ({})", config.event.name, config.event.event_type);

    let schema = config.catalog.schema()?;
    let loaded = CatalogLoader::load_from_file(&config.catalog.path, &config.catalog.identifier, &schema)?;
    if !loaded.skipped.is_empty() {
        warn!("{} catalog rows skipped", loaded.skipped.len());
    }
    info!("Loaded {} candidates from {}", loaded.num_candidates, config.catalog.path.display());

    let skymap = SkymapLoader::load_from_file(&config.event.skymap)?;
    let filtered = skymap
        .filter_candidates(
            &loaded.catalog,
            config.tiling.distance_cut_mpc,
            config.tiling.probability_percentile,
        )
        .context("Failed to filter candidates by skymap")?;

    let horizon = CachedHorizon::new(
        SiderealHorizon::from_site(&config.site),
        config.site.horizon_cache_seconds,
    );
    let alerts: Box<dyn AlertSink> = if config.alerts.enabled {
        config
            .alerts
            .sink
            .build(config.alerts.path.as_deref())?
    } else {
        Box::new(NullAlertSink)
    };

    let settings = config.selector_settings()?;
    let start = config.event.start_time.unwrap_or(config.site.sunset);
    let mut selector = TileSelector::new(settings);
    let outcome = selector.run(filtered.clone(), start, &horizon, alerts.as_ref());

    let (hits, misses) = horizon.stats();
    info!("Horizon cache: {} hits, {} misses", hits, misses);

    let failure = outcome.failure.clone();
    let report = TilingReport::new(
        EventInfo {
            name: config.event.name.clone(),
            event_type: config.event.event_type.clone(),
        },
        &loaded,
        &filtered,
        outcome,
    );
    write_report(&report, &output)?;

    match failure {
        Some(e) => Err(anyhow::Error::new(e).context("Tiling run failed; partial schedule written")),
        None => Ok(()),
    }
}

/// `RUST_LOG` directives, falling back to `info` when unset or invalid.
fn log_filter() -> EnvFilter {
    log_filter_from(env::var(EnvFilter::DEFAULT_ENV).ok().as_deref())
}

fn log_filter_from(directives: Option<&str>) -> EnvFilter {
    directives
        .and_then(|d| EnvFilter::try_new(d).ok())
        .unwrap_or_else(|| EnvFilter::new("info"))
}

fn write_report(report: &TilingReport, path: &Path) -> anyhow::Result<()> {
    report.write_to_file(path)?;
    info!(
        "Wrote {} tiles ({}) to {} [run {}]",
        report.tiles.len(),
        report.stop_reason,
        path.display(),
        report.run_id
    );
    Ok(())
}
