//! Timestep plan invariants.

use proptest::prelude::*;
use rf_schedule::{PhaseBoundaryTable, SegmentConfig, TimestepPlan, TimestepSegment};

#[test]
fn history_plus_forecast_scenario() {
    let config = SegmentConfig {
        history: TimestepSegment::new(365.0, 30.0),
        forecast: vec![TimestepSegment::new(2555.0, 365.0)],
        total_duration_days: 2920.0,
    };
    let phases = PhaseBoundaryTable::from_start_days(&[0.0, 365.0, 1460.0]).unwrap();
    let plan = TimestepPlan::build(&config, &phases).unwrap();

    assert_eq!(plan.len(), 20);
    let durations: Vec<f64> = plan.iter().map(|e| e.duration_days).collect();
    assert_eq!(&durations[..12], &[30.0; 12]);
    assert_eq!(durations[12], 5.0);
    assert_eq!(&durations[13..], &[365.0; 7]);
    assert_eq!(plan.total_days(), 2920.0);

    // History is phase 1, the first three forecast years phase 2, the rest phase 3.
    assert!(plan.iter().take(13).all(|e| e.control_period_id.get() == 1));
    let forecast: Vec<u32> = plan
        .iter()
        .skip(13)
        .map(|e| e.control_period_id.get())
        .collect();
    assert_eq!(forecast, vec![2, 2, 2, 3, 3, 3, 3]);

    assert_eq!(plan.start_day(13), 365.0);
    assert_eq!(plan.resolve(19).unwrap().get(), 3);
}

#[test]
fn phases_beyond_horizon_are_never_referenced() {
    let config = SegmentConfig {
        history: TimestepSegment::new(100.0, 10.0),
        forecast: vec![],
        total_duration_days: 100.0,
    };
    let phases = PhaseBoundaryTable::from_start_days(&[0.0, 50.0, 5000.0]).unwrap();
    let plan = TimestepPlan::build(&config, &phases).unwrap();
    assert_eq!(plan.last_period().unwrap().get(), 2);
    assert!(plan.check_periods(2).is_ok());
}

fn segment() -> impl Strategy<Value = TimestepSegment> {
    (1.0f64..4000.0, 0.5f64..400.0).prop_map(|(d, t)| TimestepSegment::new(d, t))
}

proptest! {
    #[test]
    fn plan_sum_matches_configured_total(
        history in segment(),
        forecast in proptest::collection::vec(segment(), 0..4),
    ) {
        let total: f64 = history.duration_days + forecast.iter().map(|s| s.duration_days).sum::<f64>();
        let config = SegmentConfig { history, forecast, total_duration_days: total };
        let plan = TimestepPlan::build(&config, &PhaseBoundaryTable::single()).unwrap();

        let sum: f64 = plan.iter().map(|e| e.duration_days).sum();
        prop_assert!((sum - total).abs() <= 1.0);
        prop_assert!(plan.iter().all(|e| e.duration_days > 0.0));
    }

    #[test]
    fn no_step_exceeds_its_segment_timestep(seg in segment()) {
        let steps = seg.step_durations();
        let expected = (seg.duration_days / seg.timestep_days - 1e-9).ceil().max(1.0) as usize;
        prop_assert_eq!(steps.len(), expected);
        for d in &steps[..steps.len() - 1] {
            prop_assert_eq!(*d, seg.timestep_days);
        }
        prop_assert!(*steps.last().unwrap() <= seg.timestep_days * (1.0 + 1e-6));
    }

    #[test]
    fn control_periods_are_monotonic(
        history in segment(),
        forecast in proptest::collection::vec(segment(), 0..4),
        mut starts in proptest::collection::vec(1.0f64..8000.0, 0..6),
    ) {
        starts.sort_by(f64::total_cmp);
        starts.dedup();
        let mut boundaries = vec![0.0];
        boundaries.extend(starts);
        let phases = PhaseBoundaryTable::from_start_days(&boundaries).unwrap();

        let total: f64 = history.duration_days + forecast.iter().map(|s| s.duration_days).sum::<f64>();
        let config = SegmentConfig { history, forecast, total_duration_days: total };
        let plan = TimestepPlan::build(&config, &phases).unwrap();

        for pair in plan.entries().windows(2) {
            prop_assert!(pair[0].control_period_id <= pair[1].control_period_id);
        }
        for i in 0..plan.len() {
            prop_assert!(plan.resolve(i).unwrap() <= phases.last_period());
        }
    }
}
