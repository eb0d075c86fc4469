//! Running cases through the service layer: caching, checkpoints and resume.

mod common;

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use common::{demo_project, fresh};
use rf_app::{
    CheckpointMode, Quantity, RunOptions, RunProgressEvent, RunRequest, RunStage,
    ensure_run, ensure_run_with_progress, extract_series, latest_checkpoint_step, list_runs,
    load_run, period_totals,
};
use rf_results::RunStatusRecord;

#[test]
fn primary_depletion_runs_and_is_cached() {
    let (_dir, path) = demo_project();
    let request = RunRequest {
        project_path: &path,
        case_id: "primary",
        options: fresh(CheckpointMode::Inline),
    };
    let response = ensure_run(&request).unwrap();
    assert!(!response.loaded_from_cache);
    assert_eq!(
        response.summary.status,
        RunStatusRecord::Completed {
            success_rate: 1.0,
            accepted: true
        }
    );
    assert_eq!(response.timing.steps_executed, 25);
    assert_eq!(response.summary.checkpoints_written, 2);

    let (manifest, summary, steps) = load_run(&path, &response.run_id).unwrap();
    assert_eq!(manifest.case_id, "primary");
    assert_eq!(manifest.total_steps, 25);
    assert_eq!(summary, response.summary);
    assert_eq!(steps.len(), 25);

    // Rate control at 300 rb/d; water starts at connate saturation and barely moves.
    assert_eq!(steps[0].water_rate, 0.0);
    for step in &steps {
        let bo_range = 300.0 / 1.26..300.0 / 1.22;
        assert!(bo_range.contains(&step.oil_rate), "oil rate {}", step.oil_rate);
        assert!(step.water_cut < 1e-3);
        assert!((step.gor - 0.55).abs() < 1e-9);
    }
    let pressures = extract_series(&steps, Quantity::AveragePressure);
    assert!(pressures.windows(2).all(|w| w[1].1 < w[0].1));
    assert!(pressures.last().unwrap().1 > 2500.0);

    let kpis = &summary.kpis;
    assert_eq!(kpis.simulated_days, 730.0);
    assert!((kpis.recovery_factor - kpis.ultimate_oil_recovery / 3.8e7).abs() < 1e-15);

    let cached = ensure_run(&RunRequest {
        project_path: &path,
        case_id: "primary",
        options: RunOptions::default(),
    })
    .unwrap();
    assert!(cached.loaded_from_cache);
    assert_eq!(cached.run_id, response.run_id);
    assert_eq!(cached.summary, response.summary);

    let runs = list_runs(&path, "primary").unwrap();
    assert_eq!(runs.len(), 1);
    assert!(list_runs(&path, "waterflood").unwrap().is_empty());
}

#[test]
fn waterflood_reports_progress_and_injects_water() {
    let (_dir, path) = demo_project();
    let request = RunRequest {
        project_path: &path,
        case_id: "waterflood",
        options: fresh(CheckpointMode::Background),
    };
    let mut events: Vec<RunProgressEvent> = Vec::new();
    let response =
        ensure_run_with_progress(&request, Some(&mut |event| events.push(event))).unwrap();

    assert!(matches!(
        response.summary.status,
        RunStatusRecord::Completed { accepted: true, .. }
    ));
    assert_eq!(response.summary.checkpoints_written, 4);
    assert_eq!(response.summary.checkpoint_failures, 0);
    assert_eq!(latest_checkpoint_step(&path, &response.run_id).unwrap(), Some(19));

    let stages: Vec<RunStage> = events.iter().map(|e| e.stage).collect();
    assert_eq!(stages.first(), Some(&RunStage::LoadingProject));
    assert_eq!(stages.last(), Some(&RunStage::Completed));
    assert!(stages.contains(&RunStage::CompilingCase));
    assert!(stages.contains(&RunStage::SavingResults));
    let step_events: Vec<usize> = events
        .iter()
        .filter_map(|e| e.step.as_ref().map(|s| s.step))
        .collect();
    assert_eq!(step_events, vec![4, 9, 14, 19]);

    let (_, _, steps) = load_run(&path, &response.run_id).unwrap();
    let totals = period_totals(&steps);
    assert_eq!(
        totals.iter().map(|t| t.control_period).collect::<Vec<_>>(),
        vec![1, 2, 3]
    );
    assert_eq!(totals[0].water_injected, 0.0);
    assert!(totals[1].water_injected > 0.0);
    assert!(totals[2].water_injected > totals[1].water_injected);
    assert_eq!(totals[0].end_day, 365.0);

    let kpis = &response.summary.kpis;
    assert!(kpis.recovery_factor > 0.0 && kpis.recovery_factor < 1.0);
    assert!(kpis.cumulative_water_injected > 0.0);
    // The infill phase has the highest offtake.
    assert!(kpis.peak_oil_day > 1460.0);
}

#[test]
fn stopped_run_resumes_from_checkpoint_and_matches_full_run() {
    let (_full_dir, full_path) = demo_project();
    let full = ensure_run(&RunRequest {
        project_path: &full_path,
        case_id: "waterflood",
        options: fresh(CheckpointMode::Inline),
    })
    .unwrap();

    let (_dir, path) = demo_project();
    let cancel = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&cancel);
    let mut stop_after_step_9 = |event: RunProgressEvent| {
        if event.step.is_some_and(|s| s.step == 9) {
            flag.store(true, Ordering::SeqCst);
        }
    };
    let stopped = ensure_run_with_progress(
        &RunRequest {
            project_path: &path,
            case_id: "waterflood",
            options: RunOptions {
                cancel: Some(Arc::clone(&cancel)),
                ..fresh(CheckpointMode::Inline)
            },
        },
        Some(&mut stop_after_step_9),
    )
    .unwrap();
    assert_eq!(stopped.summary.status, RunStatusRecord::Stopped { next_step: 10 });
    assert_eq!(stopped.run_id, full.run_id);

    let resumed = ensure_run(&RunRequest {
        project_path: &path,
        case_id: "waterflood",
        options: RunOptions {
            resume: true,
            checkpoints: CheckpointMode::Inline,
            ..RunOptions::default()
        },
    })
    .unwrap();
    assert!(!resumed.loaded_from_cache);
    assert_eq!(resumed.manifest.resumed_from_step, Some(9));
    assert_eq!(resumed.timing.steps_executed, 10);
    assert_eq!(resumed.summary.status, full.summary.status);
    assert_eq!(resumed.summary.kpis, full.summary.kpis);

    let (_, _, resumed_steps) = load_run(&path, &resumed.run_id).unwrap();
    let (_, _, full_steps) = load_run(&full_path, &full.run_id).unwrap();
    assert_eq!(resumed_steps, full_steps);
}
