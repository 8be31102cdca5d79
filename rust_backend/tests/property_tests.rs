//! Property tests for geometry normalization and scheduler invariants.

use std::collections::HashSet;

use chrono::{Duration, TimeZone, Utc};
use proptest::prelude::*;

use gw_tiler::algorithms::{build_tiles, OverlapScope, SelectorSettings, TileSelector};
use gw_tiler::catalog::GalaxyCatalog;
use gw_tiler::core::domain::{
    Candidate, CandidateId, DistanceProxy, FieldOfView, SelectionCriteria, SelectionKind,
    TilePlacement,
};
use gw_tiler::core::geometry::{reflect_into, wrap_cyclic, wrap_to_range};
use gw_tiler::services::{FixedHorizon, NullAlertSink};

fn catalog(points: &[(f64, f64)]) -> GalaxyCatalog {
    let candidates = points
        .iter()
        .enumerate()
        .map(|(i, &(ra, dec))| {
            Candidate::new(
                CandidateId(i),
                format!("P{}", i),
                ra,
                dec,
                DistanceProxy::LuminosityDistance(20.0),
            )
        })
        .collect();
    GalaxyCatalog::new("prop", candidates)
}

proptest! {
    #[test]
    fn prop_cyclic_wrap_range(value in -360.0..720.0f64) {
        let wrapped = wrap_cyclic(value, 0.0, 360.0);
        prop_assert!(wrapped >= 0.0);
        prop_assert!(wrapped < 360.0);
    }

    #[test]
    fn prop_reflect_range(value in -270.0..270.0f64) {
        let wrapped = reflect_into(value, -90.0, 90.0);
        prop_assert!(wrapped >= -90.0);
        prop_assert!(wrapped <= 90.0);
    }

    #[test]
    fn prop_wrap_idempotent(value in -360.0..720.0f64) {
        let once = wrap_to_range(value, 0.0, 360.0);
        prop_assert_eq!(wrap_to_range(once, 0.0, 360.0), once);

        let dec = wrap_to_range(value / 4.0, -90.0, 90.0);
        prop_assert_eq!(wrap_to_range(dec, -90.0, 90.0), dec);
    }

    #[test]
    fn prop_tile_centers_normalized(
        ra in 0.0..360.0f64,
        dec in -89.0..89.0f64,
        fov_ra in 0.5..5.0f64,
        fov_dec in 0.5..5.0f64,
    ) {
        let c = Candidate::new(CandidateId(0), "X", ra, dec, DistanceProxy::LuminosityDistance(10.0));
        let tiles = build_tiles(&c, &FieldOfView::new(fov_ra, fov_dec), &TilePlacement::ALL, "E").unwrap();
        prop_assert_eq!(tiles.len(), 5);
        for tile in &tiles {
            for point in [tile.center, tile.sky_center] {
                prop_assert!((0.0..360.0).contains(&point.ra), "{} ra {}", tile.name, point.ra);
                prop_assert!((-90.0..=90.0).contains(&point.dec), "{} dec {}", tile.name, point.dec);
            }
            prop_assert!(tile.bounds.ra_min <= tile.bounds.ra_max);
            prop_assert!(tile.bounds.dec_min <= tile.bounds.dec_max);
        }
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn prop_schedule_invariants(
        points in prop::collection::vec((0.0..360.0f64, -80.0..80.0f64), 1..40),
        night_scope in any::<bool>(),
    ) {
        let sunset = Utc.with_ymd_and_hms(2020, 1, 10, 22, 0, 0).unwrap();
        let horizon = FixedHorizon::full_sky(sunset, sunset + Duration::hours(2));
        let mut selector = TileSelector::new(SelectorSettings {
            selection: SelectionCriteria::new(SelectionKind::ObservableTonight, -1),
            overlap_scope: if night_scope { OverlapScope::Night } else { OverlapScope::Iteration },
            ..SelectorSettings::default()
        });
        let outcome = selector.run(catalog(&points), sunset, &horizon, &NullAlertSink);

        let mut seen = HashSet::new();
        for tile in &outcome.tiles {
            for id in tile.covered() {
                prop_assert!(id.0 < points.len());
                prop_assert!(seen.insert(*id), "{} covered twice", id);
            }
        }
        for pair in outcome.iterations.windows(2) {
            prop_assert!(pair[1].clock >= pair[0].clock);
            prop_assert!(pair[1].working_size <= pair[0].working_size);
        }
        for pair in outcome.tiles.windows(2) {
            prop_assert!(pair[1].start_time >= pair[0].start_time);
        }
        prop_assert!(outcome.failure.is_none());
    }
}
