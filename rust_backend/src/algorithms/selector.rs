//! Night scheduling loop.
//!
//! [`TileSelector`] turns a filtered galaxy catalog into an ordered list of
//! pointings for one night. Each iteration looks at the sky observable at the
//! simulated clock, builds and scores tiles around every visible candidate,
//! greedily accepts the top tier that does not overlap earlier pointings,
//! removes the covered candidates and advances the clock by the exposure
//! spent. The loop ends in one of the [`StopReason`] states.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use qtty::Minutes;
#[cfg(feature = "parallel")]
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::algorithms::statistics::nan_percentile;
use crate::algorithms::tile_builder::build_tiles;
use crate::algorithms::tile_scorer::{score_tile, ScorerSettings, BASE_SCORE};
use crate::catalog::GalaxyCatalog;
use crate::core::domain::{
    Candidate, CandidateId, CoveredGalaxy, FieldOfView, ObservationSetup, ScheduledTile,
    SchedulerState, ScoredTile, SelectionCriteria, SelectionKind, SkyPoint, StopReason,
    TilePlacement,
};
use crate::core::geometry::format_hms_dms;
use crate::error::{TilingError, TilingResult};
use crate::services::alerts::AlertSink;
use crate::services::horizon::{HorizonService, NightBounds};
use crate::time::minutes_to_duration;

/// Which accepted tiles a new tile is checked against for overlap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverlapScope {
    /// Only tiles accepted in the same iteration.
    Iteration,
    /// Every tile accepted so far tonight.
    #[default]
    Night,
}

/// How far the clock moves after an iteration that accepted tiles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClockAdvance {
    /// Exposure of the last tile accepted in the iteration.
    #[default]
    LastAccepted,
    /// Longest exposure accepted in the iteration.
    Max,
    /// Sum of all exposures accepted in the iteration.
    Sum,
}

/// Everything the scheduling loop needs besides its collaborators.
#[derive(Debug, Clone, PartialEq)]
pub struct SelectorSettings {
    pub scorer: ScorerSettings,
    pub placements: Vec<TilePlacement>,
    pub selection: SelectionCriteria,
    pub top_tier_percentile: f64,
    /// Clock step when nothing is visible or nothing was accepted.
    pub idle_step: Minutes,
    pub overlap_scope: OverlapScope,
    pub clock_advance: ClockAdvance,
    /// Prefix of generated tile names, usually the event name.
    pub event_prefix: String,
    /// Event type passed to alert sinks.
    pub event_type: String,
    /// Exposure setup stamped on every accepted tile.
    pub observation: ObservationSetup,
}

impl Default for SelectorSettings {
    fn default() -> Self {
        Self {
            scorer: ScorerSettings::default(),
            placements: TilePlacement::ALL.to_vec(),
            selection: SelectionCriteria::default(),
            top_tier_percentile: 98.0,
            idle_step: Minutes::new(1.0),
            overlap_scope: OverlapScope::default(),
            clock_advance: ClockAdvance::default(),
            event_prefix: "GW".to_string(),
            event_type: "Initial".to_string(),
            observation: ObservationSetup::default(),
        }
    }
}

impl SelectorSettings {
    pub fn fov(&self) -> &FieldOfView {
        &self.scorer.fov
    }
}

/// Cooperative cancellation flag, checked at the top of every iteration.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    flag: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

/// Bookkeeping for one pass of the loop.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IterationSummary {
    pub iteration: usize,
    /// Simulated clock at the start of the iteration.
    pub clock: DateTime<Utc>,
    pub working_size: usize,
    pub observable_size: usize,
    pub generated_tiles: usize,
    pub accepted: usize,
    /// Candidates dropped without being covered (bad rows, overlap retirement).
    pub retired: usize,
}

/// Result of a scheduling run.
///
/// Tiles accepted before the run stopped are always returned, even when the
/// run ended on a failure.
#[derive(Debug, Clone)]
pub struct ScheduleOutcome {
    pub tiles: Vec<ScheduledTile>,
    pub stop_reason: StopReason,
    pub failure: Option<TilingError>,
    pub iterations: Vec<IterationSummary>,
    /// Number of candidate evaluations that failed and were skipped.
    pub skipped_candidates: usize,
    pub night: Option<NightBounds>,
    pub final_clock: DateTime<Utc>,
    /// Candidates still uncovered when the run stopped.
    pub remaining_candidates: usize,
}

impl ScheduleOutcome {
    pub fn is_failure(&self) -> bool {
        self.stop_reason == StopReason::Failed
    }

    /// Total number of candidates covered by accepted tiles.
    pub fn covered_count(&self) -> usize {
        self.tiles.iter().map(|t| t.covered().len()).sum()
    }
}

/// Mutable state of one run.
struct ScheduleRun {
    clock: DateTime<Utc>,
    working: GalaxyCatalog,
    tiles: Vec<ScheduledTile>,
    iterations: Vec<IterationSummary>,
    skipped_candidates: usize,
}

/// How one iteration ended.
enum IterationEnd {
    Continue,
    BudgetExhausted,
}

/// Greedy night scheduler.
pub struct TileSelector {
    settings: SelectorSettings,
    cancel: CancellationToken,
    state: SchedulerState,
}

impl TileSelector {
    pub fn new(settings: SelectorSettings) -> Self {
        Self {
            settings,
            cancel: CancellationToken::new(),
            state: SchedulerState::Initializing,
        }
    }

    /// Use an externally owned cancellation token.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn state(&self) -> SchedulerState {
        self.state
    }

    pub fn settings(&self) -> &SelectorSettings {
        &self.settings
    }

    /// Schedule tiles for the night starting at `requested_start`.
    ///
    /// The clock starts at the later of `requested_start` and sunset. The
    /// catalog is consumed as the working copy for this run.
    pub fn run(
        &mut self,
        catalog: GalaxyCatalog,
        requested_start: DateTime<Utc>,
        horizon: &dyn HorizonService,
        alerts: &dyn AlertSink,
    ) -> ScheduleOutcome {
        self.state = SchedulerState::Initializing;

        let mut run = ScheduleRun {
            clock: requested_start,
            working: catalog,
            tiles: Vec::new(),
            iterations: Vec::new(),
            skipped_candidates: 0,
        };

        let night = match horizon.sunrise_sunset(requested_start.date_naive()) {
            Ok(night) => night,
            Err(e) => return self.finish(run, None, StopReason::Failed, Some(e)),
        };
        run.clock = requested_start.max(night.sunset);

        info!(
            "Starting tiling run at {} (sunrise {}) with {} candidates, selection {:?}",
            run.clock,
            night.sunrise,
            run.working.len(),
            self.settings.selection
        );
        self.state = SchedulerState::Iterating;

        let (reason, failure) = loop {
            if self.cancel.is_cancelled() {
                break (StopReason::Cancelled, None);
            }

            let window = match horizon
                .zenith_ra_dec(run.clock)
                .and_then(|zenith| horizon.observable_rectangle(zenith))
            {
                Ok(window) => window,
                Err(e) => break (StopReason::Failed, Some(e)),
            };

            let loop_candidates = run.working.observable(&window);

            if let Some(reason) = self.stop_condition(&run, &loop_candidates, &night) {
                break (reason, None);
            }

            if loop_candidates.is_empty() {
                if run.clock > night.sunrise {
                    break (StopReason::Sunrise, None);
                }
                debug!("Nothing observable at {}; waiting", run.clock);
                run.iterations.push(IterationSummary {
                    iteration: run.iterations.len() + 1,
                    clock: run.clock,
                    working_size: run.working.len(),
                    observable_size: 0,
                    generated_tiles: 0,
                    accepted: 0,
                    retired: 0,
                });
                run.clock += minutes_to_duration(self.settings.idle_step);
                continue;
            }

            match self.iterate(&mut run, &loop_candidates, alerts) {
                IterationEnd::Continue => {}
                IterationEnd::BudgetExhausted => break (StopReason::Budget, None),
            }
        };

        self.finish(run, Some(night), reason, failure)
    }

    fn stop_condition(
        &self,
        run: &ScheduleRun,
        loop_candidates: &[Candidate],
        night: &NightBounds,
    ) -> Option<StopReason> {
        let selection = &self.settings.selection;

        if selection.kind == SelectionKind::ObservableTonight && run.clock > night.sunrise {
            return Some(StopReason::Sunrise);
        }
        if selection.is_unlimited() && loop_candidates.is_empty() {
            return Some(StopReason::CatalogExhausted);
        }
        if !selection.budget_allows(run.tiles.len()) {
            return Some(StopReason::Budget);
        }
        if run.working.is_empty() {
            return Some(StopReason::CatalogExhausted);
        }
        if selection.kind == SelectionKind::OneLoop && !run.iterations.is_empty() {
            return Some(StopReason::SingleLoop);
        }
        None
    }

    /// Build and score every tile for one candidate.
    fn evaluate(&self, candidate: &Candidate, working: &GalaxyCatalog) -> TilingResult<Vec<ScoredTile>> {
        let tiles = build_tiles(
            candidate,
            self.settings.fov(),
            &self.settings.placements,
            &self.settings.event_prefix,
        )?;
        Ok(tiles
            .iter()
            .map(|tile| score_tile(tile, working, &self.settings.scorer))
            .collect())
    }

    fn evaluate_all(
        &self,
        candidates: &[Candidate],
        working: &GalaxyCatalog,
    ) -> Vec<(CandidateId, TilingResult<Vec<ScoredTile>>)> {
        #[cfg(feature = "parallel")]
        let evaluations = candidates
            .par_iter()
            .map(|c| (c.id, self.evaluate(c, working)))
            .collect();

        #[cfg(not(feature = "parallel"))]
        let evaluations = candidates
            .iter()
            .map(|c| (c.id, self.evaluate(c, working)))
            .collect();

        evaluations
    }

    fn overlaps(&self, a: &SkyPoint, b: &SkyPoint) -> bool {
        let fov = self.settings.fov();
        (a.ra - b.ra).abs() < fov.ra_deg() && (a.dec - b.dec).abs() < fov.dec_deg()
    }

    fn iterate(
        &self,
        run: &mut ScheduleRun,
        loop_candidates: &[Candidate],
        alerts: &dyn AlertSink,
    ) -> IterationEnd {
        let iteration = run.iterations.len() + 1;
        let clock = run.clock;
        let working_size = run.working.len();

        let mut pool: Vec<ScoredTile> = Vec::new();
        let mut retire: HashSet<CandidateId> = HashSet::new();
        for (id, result) in self.evaluate_all(loop_candidates, &run.working) {
            match result {
                Ok(tiles) => pool.extend(tiles),
                Err(e) => {
                    warn!("Skipping candidate {}: {}", id, e);
                    run.skipped_candidates += 1;
                    // Tile generation is deterministic, so the row would fail again.
                    retire.insert(id);
                }
            }
        }
        let generated_tiles = pool.len();

        let scores: Vec<f64> = pool.iter().map(|t| t.score).collect();
        let threshold = nan_percentile(&scores, self.settings.top_tier_percentile);
        pool.sort_by(|a, b| b.score.total_cmp(&a.score));

        let scope_start = match self.settings.overlap_scope {
            OverlapScope::Iteration => run.tiles.len(),
            OverlapScope::Night => 0,
        };
        let mut claimed: HashSet<CandidateId> = HashSet::new();
        let mut accepted_sources: HashSet<CandidateId> = HashSet::new();
        let mut overlap_rejected: HashSet<CandidateId> = HashSet::new();
        let mut exposures: Vec<Minutes> = Vec::new();
        let mut budget_exhausted = false;

        if let Some(threshold) = threshold {
            for scored in pool {
                if scored.score < threshold {
                    break;
                }
                let source = scored.tile.source;
                let center = scored.tile.center;
                if run.tiles[scope_start..]
                    .iter()
                    .any(|t| self.overlaps(&t.center(), &center))
                {
                    overlap_rejected.insert(source);
                    continue;
                }
                if !self.settings.selection.budget_allows(run.tiles.len()) {
                    budget_exhausted = true;
                    break;
                }

                exposures.push(scored.exposure);
                let tile = self.schedule(scored, &run.working, &mut claimed, clock, iteration);
                info!(
                    "Accepted tile {} at {} (score {}, {} new candidates)",
                    tile.name(),
                    tile.position,
                    tile.priority,
                    tile.covered().len()
                );
                accepted_sources.insert(source);
                run.tiles.push(tile);

                if let Err(e) = alerts.notify(true, &self.settings.event_type, &run.tiles) {
                    warn!("Alert delivery failed for {}: {}", self.settings.event_type, e);
                }
            }
        }

        if self.settings.overlap_scope == OverlapScope::Night {
            retire.extend(overlap_rejected.difference(&accepted_sources).copied());
        }
        let retired = retire.iter().filter(|id| !claimed.contains(*id)).count();

        let mut removal = claimed;
        removal.extend(retire);
        run.working.remove_ids(&removal);

        let advance = if exposures.is_empty() {
            self.settings.idle_step
        } else {
            match self.settings.clock_advance {
                ClockAdvance::LastAccepted => exposures[exposures.len() - 1],
                ClockAdvance::Max => exposures
                    .iter()
                    .copied()
                    .fold(Minutes::new(0.0), |a, b| if b > a { b } else { a }),
                ClockAdvance::Sum => exposures
                    .iter()
                    .copied()
                    .fold(Minutes::new(0.0), |a, b| a + b),
            }
        };
        run.clock += minutes_to_duration(advance);

        let summary = IterationSummary {
            iteration,
            clock,
            working_size,
            observable_size: loop_candidates.len(),
            generated_tiles,
            accepted: exposures.len(),
            retired,
        };
        debug!("Iteration summary: {:?}", summary);
        run.iterations.push(summary);

        if budget_exhausted {
            IterationEnd::BudgetExhausted
        } else {
            IterationEnd::Continue
        }
    }

    /// Turn an accepted tile into a schedule entry.
    ///
    /// Ids already in `claimed` are dropped from the coverage and the score is
    /// recomputed from what remains; the rest are added to `claimed`.
    fn schedule(
        &self,
        scored: ScoredTile,
        working: &GalaxyCatalog,
        claimed: &mut HashSet<CandidateId>,
        clock: DateTime<Utc>,
        iteration: usize,
    ) -> ScheduledTile {
        let covered: Vec<CandidateId> = scored
            .covered
            .iter()
            .copied()
            .filter(|id| claimed.insert(*id))
            .collect();
        let galaxies = covered
            .iter()
            .filter_map(|id| working.get(*id))
            .map(|c| CoveredGalaxy {
                id: c.id,
                name: c.name.clone(),
                position: format_hms_dms(c.ra_deg, c.dec_deg),
            })
            .collect();
        let score = BASE_SCORE + covered.len() as f64;
        let position = format_hms_dms(scored.tile.sky_center.ra, scored.tile.sky_center.dec);

        ScheduledTile {
            scored: ScoredTile {
                covered,
                score,
                ..scored
            },
            start_time: clock,
            iteration,
            priority: score,
            position,
            setup: self.settings.observation.clone(),
            galaxies,
        }
    }

    fn finish(
        &mut self,
        run: ScheduleRun,
        night: Option<NightBounds>,
        reason: StopReason,
        failure: Option<TilingError>,
    ) -> ScheduleOutcome {
        self.state = SchedulerState::Stopped(reason);
        match &failure {
            Some(e) => warn!(
                "Tiling run {} after {} tiles: {}",
                reason,
                run.tiles.len(),
                e
            ),
            None => info!(
                "Tiling run {} with {} tiles after {} iterations",
                reason,
                run.tiles.len(),
                run.iterations.len()
            ),
        }

        ScheduleOutcome {
            stop_reason: reason,
            failure,
            skipped_candidates: run.skipped_candidates,
            night,
            final_clock: run.clock,
            remaining_candidates: run.working.len(),
            tiles: run.tiles,
            iterations: run.iterations,
        }
    }
}
