//! Run execution and caching service.

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::time::Instant;

use rf_project::schema::CaseDef;
use rf_results::{
    BackgroundCheckpointer, CheckpointStore, FieldResults, RunManifest, RunStatusRecord,
    RunStore, RunSummary, StepRates,
};
use rf_sim::{CheckpointSink, ProgressEvent, RunHooks, RunOutcome, SimulationDriver};
use rf_solver::ImpesSolver;
use tracing::{info, warn};

use crate::case_compile::{self, CompiledCase};
use crate::error::AppResult;
use crate::progress::{RunProgressEvent, RunStage, StepProgress};
use crate::project_service;

/// Queue depth of the background checkpoint writer.
const CHECKPOINT_QUEUE: usize = 4;

/// How checkpoints are written while stepping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CheckpointMode {
    Off,
    /// On the stepping thread.
    Inline,
    #[default]
    Background,
}

/// Options for running simulations.
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub use_cache: bool,
    /// Continue from the newest intact checkpoint of this run, if any.
    pub resume: bool,
    pub checkpoints: CheckpointMode,
    /// Keep only this many checkpoint files.
    pub keep_checkpoints: Option<usize>,
    pub engine_version: String,
    pub cancel: Option<Arc<AtomicBool>>,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            use_cache: true,
            resume: false,
            checkpoints: CheckpointMode::default(),
            keep_checkpoints: None,
            engine_version: env!("CARGO_PKG_VERSION").to_string(),
            cancel: None,
        }
    }
}

/// Request to execute a run.
pub struct RunRequest<'a> {
    pub project_path: &'a Path,
    pub case_id: &'a str,
    pub options: RunOptions,
}

/// Timing and execution summary for a run.
#[derive(Debug, Clone, Default)]
pub struct RunTimingSummary {
    pub compile_time_s: f64,
    pub simulate_time_s: f64,
    pub save_time_s: f64,
    pub load_cache_time_s: f64,
    pub total_time_s: f64,
    pub steps_executed: usize,
    pub newton_iterations: usize,
    pub cutbacks: usize,
    pub convergence_failures: usize,
}

/// Response from a run execution.
#[derive(Debug, Clone)]
pub struct RunResponse {
    pub run_id: String,
    pub manifest: RunManifest,
    pub summary: RunSummary,
    pub loaded_from_cache: bool,
    pub timing: RunTimingSummary,
}

fn emit_progress(
    progress_cb: &mut Option<&mut dyn FnMut(RunProgressEvent)>,
    stage: RunStage,
    started: Instant,
    message: Option<String>,
    step: Option<StepProgress>,
) {
    if let Some(cb) = progress_cb.as_deref_mut() {
        cb(RunProgressEvent {
            stage,
            elapsed_wall_s: started.elapsed().as_secs_f64(),
            message,
            step,
        });
    }
}

/// Execute or load a run based on request.
pub fn ensure_run(request: &RunRequest) -> AppResult<RunResponse> {
    ensure_run_with_progress(request, None)
}

/// Execute or load a run and stream progress events.
///
/// A cached run is reused only if it completed; aborted or stopped runs are
/// executed again (from their latest checkpoint when `resume` is set).
pub fn ensure_run_with_progress(
    request: &RunRequest,
    mut progress_cb: Option<&mut dyn FnMut(RunProgressEvent)>,
) -> AppResult<RunResponse> {
    let started = Instant::now();
    let mut timing = RunTimingSummary::default();

    emit_progress(
        &mut progress_cb,
        RunStage::LoadingProject,
        started,
        Some("Loading project".to_string()),
        None,
    );
    let project = project_service::load_project(request.project_path)?;
    let case = project_service::get_case(&project, request.case_id)?;

    emit_progress(
        &mut progress_cb,
        RunStage::CheckingCache,
        started,
        Some("Checking run cache".to_string()),
        None,
    );
    let run_id = rf_results::compute_run_id(case, &request.options.engine_version)?;
    let store = RunStore::for_project(request.project_path)?;

    if request.options.use_cache && store.has_run(&run_id) {
        let load_started = Instant::now();
        let summary = store.load_summary(&run_id)?;
        if summary.status.is_completed() {
            emit_progress(
                &mut progress_cb,
                RunStage::LoadingCachedResult,
                started,
                Some("Loading cached run".to_string()),
                None,
            );
            let manifest = store.load_manifest(&run_id)?;
            timing.load_cache_time_s = load_started.elapsed().as_secs_f64();
            timing.total_time_s = started.elapsed().as_secs_f64();
            emit_progress(
                &mut progress_cb,
                RunStage::Completed,
                started,
                Some("Loaded cached run".to_string()),
                None,
            );
            return Ok(RunResponse {
                run_id,
                manifest,
                summary,
                loaded_from_cache: true,
                timing,
            });
        }
        info!(run_id = %run_id, "cached run did not complete; executing again");
    }

    emit_progress(
        &mut progress_cb,
        RunStage::CompilingCase,
        started,
        Some(format!("Compiling case '{}'", case.id)),
        None,
    );
    let compile_started = Instant::now();
    let compiled = case_compile::compile_case(case)?;
    timing.compile_time_s = compile_started.elapsed().as_secs_f64();

    let (manifest, summary) = execute_run(
        case,
        &compiled,
        &store,
        &run_id,
        &request.options,
        &mut progress_cb,
        started,
        &mut timing,
    )?;

    timing.total_time_s = started.elapsed().as_secs_f64();
    emit_progress(
        &mut progress_cb,
        RunStage::Completed,
        started,
        Some("Run finished".to_string()),
        None,
    );

    Ok(RunResponse {
        run_id,
        manifest,
        summary,
        loaded_from_cache: false,
        timing,
    })
}

#[allow(clippy::too_many_arguments)]
fn execute_run(
    case: &CaseDef,
    compiled: &CompiledCase,
    store: &RunStore,
    run_id: &str,
    options: &RunOptions,
    progress_cb: &mut Option<&mut dyn FnMut(RunProgressEvent)>,
    started: Instant,
    timing: &mut RunTimingSummary,
) -> AppResult<(RunManifest, RunSummary)> {
    let mut checkpoints = store.checkpoint_store(run_id)?;
    if let Some(keep) = options.keep_checkpoints {
        checkpoints = checkpoints.with_retention(keep);
    }

    let resume_from = if options.resume {
        checkpoints.latest()?
    } else {
        // Checkpoints of an earlier attempt must not mix with this one.
        checkpoints.prune(0)?;
        None
    };
    let resumed_from_step = resume_from.as_ref().map(|c| c.step_index);
    if let Some(step) = resumed_from_step {
        emit_progress(
            progress_cb,
            RunStage::ResumingFromCheckpoint,
            started,
            Some(format!("Resuming after step {step}")),
            None,
        );
    }

    emit_progress(
        progress_cb,
        RunStage::Stepping,
        started,
        Some(format!("Running {} steps", compiled.plan.len())),
        None,
    );

    let solver = ImpesSolver::new(compiled.solver.clone());
    let mut driver = SimulationDriver::new(
        &compiled.model,
        &compiled.plan,
        &solver,
        compiled.driver.clone(),
    )?;

    let simulate_started = Instant::now();
    let mut on_step = |event: ProgressEvent| {
        emit_progress(
            progress_cb,
            RunStage::Stepping,
            started,
            None,
            Some(StepProgress::from(&event)),
        );
    };

    let mut writer = match options.checkpoints {
        CheckpointMode::Background => Some(BackgroundCheckpointer::spawn(
            checkpoints.clone(),
            CHECKPOINT_QUEUE,
        )?),
        _ => None,
    };
    let mut inline = checkpoints.clone();

    let mut hooks = RunHooks::default().progress(&mut on_step);
    match (options.checkpoints, writer.as_mut()) {
        (CheckpointMode::Background, Some(writer)) => {
            hooks = hooks.checkpoints(writer as &mut dyn CheckpointSink);
        }
        (CheckpointMode::Inline, _) => hooks = hooks.checkpoints(&mut inline),
        _ => {}
    }
    if let Some(flag) = &options.cancel {
        hooks = hooks.cancel_flag(Arc::clone(flag));
    }

    let outcome = match resume_from {
        Some(checkpoint) => driver.resume(checkpoint, hooks)?,
        None => driver.run(compiled.initial.clone(), hooks)?,
    };

    let mut checkpoint_failures = outcome.checkpoint_failures;
    if let Some(writer) = writer {
        if let Err(err) = writer.finish() {
            warn!(run_id, error = %err, "background checkpoint writes failed");
            checkpoint_failures += 1;
        }
    }
    timing.simulate_time_s = simulate_started.elapsed().as_secs_f64();
    record_step_timing(timing, &outcome, resumed_from_step);

    emit_progress(
        progress_cb,
        RunStage::SavingResults,
        started,
        Some("Saving results".to_string()),
        None,
    );
    let save_started = Instant::now();
    let results: FieldResults = rf_results::aggregate(&compiled.model, &outcome.run, compiled.ooip_stb)?;

    let manifest = RunManifest {
        run_id: run_id.to_string(),
        case_id: case.id.clone(),
        timestamp: chrono::Utc::now(),
        engine_version: options.engine_version.clone(),
        total_steps: compiled.plan.len(),
        total_days: compiled.plan.total_days(),
        resumed_from_step,
    };
    let summary = RunSummary {
        status: RunStatusRecord::from(&outcome.status),
        kpis: results.kpis.clone(),
        wells: results.wells.clone(),
        checkpoints_written: outcome.checkpoints_written,
        checkpoint_failures,
        wall_time_s: outcome.wall_time_s,
    };
    store.save_run(&manifest, &results.steps, &summary)?;
    timing.save_time_s = save_started.elapsed().as_secs_f64();

    info!(
        run_id,
        case = %case.id,
        status = ?summary.status,
        recovery_factor = summary.kpis.recovery_factor,
        "run saved"
    );
    Ok((manifest, summary))
}

/// Fill per-step counters from the reports this invocation produced.
fn record_step_timing(
    timing: &mut RunTimingSummary,
    outcome: &RunOutcome,
    resumed_from_step: Option<usize>,
) {
    let first_new = resumed_from_step.map_or(0, |s| s + 1);
    let reports = outcome.run.reports();
    let new_reports = reports.get(first_new..).unwrap_or(&[]);
    timing.steps_executed = new_reports.len();
    timing.newton_iterations = new_reports.iter().map(|r| r.iteration_count).sum();
    timing.cutbacks = new_reports.iter().map(|r| r.cutbacks).sum();
    timing.convergence_failures = outcome.run.convergence_failures();
}

/// Saved runs of a case, newest first.
pub fn list_runs(project_path: &Path, case_id: &str) -> AppResult<Vec<RunManifest>> {
    let store = RunStore::for_project(project_path)?;
    Ok(store.list_runs(case_id)?)
}

/// A saved run: manifest, summary and field time series.
pub fn load_run(
    project_path: &Path,
    run_id: &str,
) -> AppResult<(RunManifest, RunSummary, Vec<StepRates>)> {
    let store = RunStore::for_project(project_path)?;
    let manifest = store.load_manifest(run_id)?;
    let summary = store.load_summary(run_id)?;
    let steps = store.load_timeseries(run_id)?;
    Ok((manifest, summary, steps))
}

/// Newest checkpoint of a run, without running anything.
pub fn latest_checkpoint_step(project_path: &Path, run_id: &str) -> AppResult<Option<usize>> {
    let store = RunStore::for_project(project_path)?;
    let checkpoints: CheckpointStore = store.checkpoint_store(run_id)?;
    Ok(checkpoints.list_steps()?.last().copied())
}
