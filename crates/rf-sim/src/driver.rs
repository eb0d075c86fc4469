//! The simulation driver: runs the timestep plan from start (or a checkpoint) to the end.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use rf_core::Timer;
use rf_model::{Model, ReservoirState};
use rf_schedule::TimestepPlan;
use rf_solver::{NonlinearSolver, SolverError};
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use crate::checkpoint::{Checkpoint, CheckpointSink};
use crate::error::{RunError, RunResult, StepError, ValidationFailure};
use crate::executor::{CutbackPolicy, StepExecutor};
use crate::report::{ProgressEvent, StepReport};

/// Driver policy knobs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DriverConfig {
    /// The run aborts once the failure count exceeds this.
    pub max_convergence_failures: usize,
    pub report_frequency: usize,
    pub checkpoint_frequency: usize,
    /// Minimum converged fraction for a completed run to be accepted.
    pub min_success_rate: f64,
    /// May tighten, never loosen, [`rf_core::SATURATION_SUM_TOL`].
    pub saturation_tolerance: f64,
    pub cutback: CutbackPolicy,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            max_convergence_failures: 5,
            report_frequency: 5,
            checkpoint_frequency: 10,
            min_success_rate: 0.90,
            saturation_tolerance: rf_core::SATURATION_SUM_TOL,
            cutback: CutbackPolicy::default(),
        }
    }
}

impl DriverConfig {
    pub fn validate(&self) -> RunResult<()> {
        if self.report_frequency == 0 {
            return Err(RunError::InvalidConfig {
                what: "report_frequency must be at least 1",
            });
        }
        if self.checkpoint_frequency == 0 {
            return Err(RunError::InvalidConfig {
                what: "checkpoint_frequency must be at least 1",
            });
        }
        if !(0.0..=1.0).contains(&self.min_success_rate) {
            return Err(RunError::InvalidConfig {
                what: "min_success_rate must lie in [0, 1]",
            });
        }
        if !(self.saturation_tolerance > 0.0
            && self.saturation_tolerance <= rf_core::SATURATION_SUM_TOL)
        {
            return Err(RunError::InvalidConfig {
                what: "saturation_tolerance must lie in (0, 1e-6]",
            });
        }
        self.cutback
            .validate()
            .map_err(|what| RunError::InvalidConfig { what })
    }
}

/// Lifecycle of a driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunPhase {
    Idle,
    Running,
    Completed,
    Aborted,
    Stopped,
}

/// Why a run was aborted.
#[derive(Debug, Clone, PartialEq)]
pub enum AbortReason {
    MaxConvergenceFailures {
        failures: usize,
        /// Solver error of the step that exceeded the budget.
        cause: SolverError,
    },
    Validation(ValidationFailure),
}

impl AbortReason {
    /// Underlying error, when there is one beyond the reason itself.
    pub fn detail(&self) -> Option<String> {
        match self {
            AbortReason::MaxConvergenceFailures { cause, .. } => Some(cause.to_string()),
            AbortReason::Validation(_) => None,
        }
    }
}

impl fmt::Display for AbortReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AbortReason::MaxConvergenceFailures { .. } => {
                write!(f, "max convergence failures exceeded")
            }
            AbortReason::Validation(failure) => write!(f, "{failure}"),
        }
    }
}

/// Terminal status of a run.
#[derive(Debug, Clone, PartialEq)]
pub enum RunStatus {
    /// Every planned step executed. Execution completion does not imply acceptance.
    Completed { success_rate: f64, accepted: bool },
    Aborted {
        reason: AbortReason,
        /// Step that triggered the abort.
        step_index: usize,
        /// 1-based number of the last converged step, 0 if none.
        last_good_step: usize,
    },
    /// Cancelled between steps; `next_step` has not been executed.
    Stopped { next_step: usize },
}

impl RunStatus {
    pub fn is_completed(&self) -> bool {
        matches!(self, RunStatus::Completed { .. })
    }

    pub fn is_accepted(&self) -> bool {
        matches!(self, RunStatus::Completed { accepted: true, .. })
    }
}

/// History of a run, threaded through the driver and handed over once at the end.
///
/// Invariant: `states.len() == reports.len() + 1`; `states[0]` is the initial state.
#[derive(Debug, Clone, PartialEq)]
pub struct RunState {
    states: Vec<Arc<ReservoirState>>,
    reports: Vec<StepReport>,
    convergence_failures: usize,
    elapsed_days: f64,
}

impl RunState {
    pub fn new(initial: ReservoirState) -> Self {
        Self {
            states: vec![Arc::new(initial)],
            reports: Vec::new(),
            convergence_failures: 0,
            elapsed_days: 0.0,
        }
    }

    pub fn from_checkpoint(checkpoint: Checkpoint) -> Self {
        Self {
            states: checkpoint.states,
            reports: checkpoint.reports,
            convergence_failures: checkpoint.convergence_failures,
            elapsed_days: checkpoint.elapsed_days,
        }
    }

    pub fn states(&self) -> &[Arc<ReservoirState>] {
        &self.states
    }

    pub fn reports(&self) -> &[StepReport] {
        &self.reports
    }

    pub fn convergence_failures(&self) -> usize {
        self.convergence_failures
    }

    pub fn elapsed_days(&self) -> f64 {
        self.elapsed_days
    }

    /// Index of the next step to execute.
    pub fn next_step(&self) -> usize {
        self.reports.len()
    }

    pub fn current_state(&self) -> &Arc<ReservoirState> {
        // `states` always holds at least the initial state.
        &self.states[self.states.len() - 1]
    }

    pub fn converged_steps(&self) -> usize {
        self.reports.iter().filter(|r| r.converged).count()
    }

    /// 1-based number of the last converged step, 0 if none converged.
    pub fn last_good_step(&self) -> usize {
        self.reports
            .iter()
            .rposition(|r| r.converged)
            .map_or(0, |i| i + 1)
    }

    /// Snapshot of the history so far. Shares states with the live run.
    ///
    /// Returns `None` before the first step.
    pub fn checkpoint(&self) -> Option<Checkpoint> {
        let step_index = self.reports.len().checked_sub(1)?;
        Some(Checkpoint {
            step_index,
            convergence_failures: self.convergence_failures,
            elapsed_days: self.elapsed_days,
            states: self.states.clone(),
            reports: self.reports.clone(),
        })
    }

    fn push(&mut self, state: Arc<ReservoirState>, report: StepReport, end_day: f64) {
        if !report.converged {
            self.convergence_failures += 1;
        }
        self.states.push(state);
        self.reports.push(report);
        self.elapsed_days = end_day;
    }
}

/// Result of a driver run.
#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub status: RunStatus,
    pub run: RunState,
    pub checkpoints_written: usize,
    pub checkpoint_failures: usize,
    pub wall_time_s: f64,
}

/// Optional observers of a run.
#[derive(Default)]
pub struct RunHooks<'h> {
    progress: Option<&'h mut dyn FnMut(ProgressEvent)>,
    checkpoints: Option<&'h mut dyn CheckpointSink>,
    cancel: Option<Arc<AtomicBool>>,
}

impl<'h> RunHooks<'h> {
    pub fn progress(mut self, callback: &'h mut dyn FnMut(ProgressEvent)) -> Self {
        self.progress = Some(callback);
        self
    }

    pub fn checkpoints(mut self, sink: &'h mut dyn CheckpointSink) -> Self {
        self.checkpoints = Some(sink);
        self
    }

    /// Stop between steps once `flag` is set.
    pub fn cancel_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancel = Some(flag);
        self
    }

    fn cancelled(&self) -> bool {
        self.cancel
            .as_ref()
            .is_some_and(|flag| flag.load(Ordering::Relaxed))
    }
}

/// Runs a timestep plan against a model.
pub struct SimulationDriver<'a, S> {
    plan: &'a TimestepPlan,
    executor: StepExecutor<'a, S>,
    config: DriverConfig,
    phase: RunPhase,
}

impl<'a, S: NonlinearSolver> SimulationDriver<'a, S> {
    /// Build a driver, checking the plan only refers to periods the model defines.
    pub fn new(
        model: &'a Model,
        plan: &'a TimestepPlan,
        solver: S,
        config: DriverConfig,
    ) -> RunResult<Self> {
        config.validate()?;
        plan.check_periods(model.period_count())?;
        let executor = StepExecutor::new(model, solver)
            .with_cutback(config.cutback)
            .with_saturation_tolerance(config.saturation_tolerance);
        Ok(Self {
            plan,
            executor,
            config,
            phase: RunPhase::Idle,
        })
    }

    pub fn phase(&self) -> RunPhase {
        self.phase
    }

    pub fn config(&self) -> &DriverConfig {
        &self.config
    }

    pub fn plan(&self) -> &TimestepPlan {
        self.plan
    }

    /// Run the whole plan from `initial`.
    pub fn run(&mut self, initial: ReservoirState, hooks: RunHooks<'_>) -> RunResult<RunOutcome> {
        self.ensure_idle()?;
        let model = self.executor.model();
        if initial.cell_count() != model.cell_count() {
            return Err(RunError::InitialState {
                what: format!(
                    "state has {} cells, model has {}",
                    initial.cell_count(),
                    model.cell_count()
                ),
            });
        }
        initial
            .check_physical(self.config.saturation_tolerance)
            .map_err(|v| RunError::InitialState {
                what: v.to_string(),
            })?;
        self.drive(RunState::new(initial), hooks)
    }

    /// Continue a run from `checkpoint` at `checkpoint.step_index + 1`.
    pub fn resume(&mut self, checkpoint: Checkpoint, hooks: RunHooks<'_>) -> RunResult<RunOutcome> {
        self.ensure_idle()?;
        checkpoint
            .check_consistency()
            .map_err(|what| RunError::CheckpointMismatch { what })?;
        if checkpoint.step_index >= self.plan.len() {
            return Err(RunError::CheckpointMismatch {
                what: format!(
                    "checkpoint step {} is beyond the {}-step plan",
                    checkpoint.step_index,
                    self.plan.len()
                ),
            });
        }
        let cells = self.executor.model().cell_count();
        if checkpoint.states.iter().any(|s| s.cell_count() != cells) {
            return Err(RunError::CheckpointMismatch {
                what: format!("stored states do not have {cells} cells"),
            });
        }
        for (report, entry) in checkpoint.reports.iter().zip(self.plan.iter()) {
            if report.control_period_id != entry.control_period_id
                || report.duration_days != entry.duration_days
            {
                return Err(RunError::CheckpointMismatch {
                    what: format!("step {} differs from the plan", report.step_index),
                });
            }
        }
        info!(
            resume_step = checkpoint.resume_step(),
            total_steps = self.plan.len(),
            "resuming from checkpoint"
        );
        self.drive(RunState::from_checkpoint(checkpoint), hooks)
    }

    fn ensure_idle(&self) -> RunResult<()> {
        if self.phase == RunPhase::Idle {
            Ok(())
        } else {
            Err(RunError::NotIdle)
        }
    }

    fn drive(&mut self, mut run: RunState, mut hooks: RunHooks<'_>) -> RunResult<RunOutcome> {
        let timer = Timer::start("run");
        let plan = self.plan;
        let total_steps = plan.len();
        let mut checkpoints_written = 0;
        let mut checkpoint_failures = 0;
        self.phase = RunPhase::Running;

        let mut status = None;
        for (step_index, entry) in plan.iter().enumerate().skip(run.next_step()) {
            if hooks.cancelled() {
                info!(next_step = step_index, "run stopped");
                self.phase = RunPhase::Stopped;
                status = Some(RunStatus::Stopped {
                    next_step: step_index,
                });
                break;
            }

            let elapsed_days = plan.start_day(step_index);
            let end_day = plan.end_day(step_index);
            let result = self
                .executor
                .execute(step_index, run.current_state(), entry, elapsed_days);

            match result {
                Ok(output) => run.push(Arc::new(output.state), output.report, end_day),
                Err(StepError::Convergence(failure)) => {
                    let failures = run.convergence_failures() + 1;
                    warn!(
                        step = step_index,
                        failures,
                        cutbacks = failure.cutbacks,
                        cause = %failure.cause,
                        "step failed to converge"
                    );
                    if failures > self.config.max_convergence_failures {
                        error!(step = step_index, failures, "aborting run");
                        self.phase = RunPhase::Aborted;
                        status = Some(RunStatus::Aborted {
                            reason: AbortReason::MaxConvergenceFailures {
                                failures,
                                cause: failure.cause,
                            },
                            step_index,
                            last_good_step: run.last_good_step(),
                        });
                        break;
                    }
                    let mut report = StepReport::substituted(
                        step_index,
                        entry.control_period_id,
                        entry.duration_days,
                        failure.wall_time_s,
                        failure.cause.to_string(),
                    );
                    report.cutbacks = failure.cutbacks;
                    let previous = Arc::clone(run.current_state());
                    run.push(previous, report, end_day);
                }
                Err(StepError::Validation(failure)) => {
                    error!(step = step_index, %failure, "aborting run");
                    self.phase = RunPhase::Aborted;
                    status = Some(RunStatus::Aborted {
                        reason: AbortReason::Validation(failure),
                        step_index,
                        last_good_step: run.last_good_step(),
                    });
                    break;
                }
            }

            let completed = step_index + 1;
            if completed % self.config.report_frequency == 0 {
                let report = &run.reports()[step_index];
                let event = ProgressEvent {
                    step_index,
                    total_steps,
                    control_period_id: entry.control_period_id,
                    elapsed_simulated_days: run.elapsed_days(),
                    wall_time_for_step_s: report.wall_time_s,
                    iteration_count: report.iteration_count,
                    convergence_failures: run.convergence_failures(),
                };
                info!(
                    step = completed,
                    total_steps,
                    elapsed_days = event.elapsed_simulated_days,
                    iterations = event.iteration_count,
                    failures = event.convergence_failures,
                    "progress"
                );
                if let Some(callback) = hooks.progress.as_deref_mut() {
                    callback(event);
                }
            }

            if completed % self.config.checkpoint_frequency == 0 {
                if let Some(sink) = hooks.checkpoints.as_deref_mut() {
                    if let Some(checkpoint) = run.checkpoint() {
                        match sink.save(&checkpoint) {
                            Ok(()) => checkpoints_written += 1,
                            Err(err) => {
                                checkpoint_failures += 1;
                                warn!(step = step_index, error = %err, "checkpoint failed; continuing");
                            }
                        }
                    }
                }
            }
        }

        let status = match status {
            Some(status) => status,
            None => {
                let success_rate = if total_steps == 0 {
                    1.0
                } else {
                    run.converged_steps() as f64 / total_steps as f64
                };
                let accepted = success_rate >= self.config.min_success_rate;
                self.phase = RunPhase::Completed;
                info!(success_rate, accepted, "run completed");
                RunStatus::Completed {
                    success_rate,
                    accepted,
                }
            }
        };

        Ok(RunOutcome {
            status,
            run,
            checkpoints_written,
            checkpoint_failures,
            wall_time_s: timer.stop(),
        })
    }
}
