//! Executes a single planned timestep.

use rf_core::{SATURATION_SUM_TOL, Timer};
use rf_model::{Model, ReservoirState, WellControl};
use rf_schedule::TimestepPlanEntry;
use rf_solver::{NonlinearSolver, SolveRequest, SolverError, WellRate};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{ConvergenceFailure, StepError, ValidationFailure};
use crate::report::StepReport;

/// Timestep cutting on convergence failure.
///
/// With `max_cuts = 0` a failed solve fails the step immediately. Otherwise
/// the step is retried as consecutive sub-steps of `duration * factor^k`
/// for `k = 1..=max_cuts`, each level restarting from the step's initial state.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CutbackPolicy {
    pub max_cuts: usize,
    pub factor: f64,
}

impl Default for CutbackPolicy {
    fn default() -> Self {
        Self {
            max_cuts: 0,
            factor: 0.5,
        }
    }
}

impl CutbackPolicy {
    pub fn validate(&self) -> Result<(), &'static str> {
        if self.max_cuts > 0 && !(self.factor > 0.0 && self.factor < 1.0) {
            return Err("cutback factor must lie in (0, 1)");
        }
        Ok(())
    }
}

/// New state and diagnostics of a converged step.
#[derive(Debug, Clone, PartialEq)]
pub struct StepOutput {
    pub state: ReservoirState,
    pub report: StepReport,
}

enum Attempt {
    Diverged(SolverError),
    Invalid(ValidationFailure),
}

struct Advance {
    state: ReservoirState,
    iterations: usize,
    well_rates: Vec<WellRate>,
}

/// Advances the reservoir over one plan entry with the wells of its control period.
#[derive(Debug, Clone)]
pub struct StepExecutor<'m, S> {
    model: &'m Model,
    solver: S,
    cutback: CutbackPolicy,
    saturation_tol: f64,
}

impl<'m, S: NonlinearSolver> StepExecutor<'m, S> {
    pub fn new(model: &'m Model, solver: S) -> Self {
        Self {
            model,
            solver,
            cutback: CutbackPolicy::default(),
            saturation_tol: SATURATION_SUM_TOL,
        }
    }

    pub fn with_cutback(mut self, cutback: CutbackPolicy) -> Self {
        self.cutback = cutback;
        self
    }

    /// Tighten the saturation-sum check. Values above [`SATURATION_SUM_TOL`] are ignored.
    pub fn with_saturation_tolerance(mut self, tol: f64) -> Self {
        self.saturation_tol = tol.min(SATURATION_SUM_TOL);
        self
    }

    pub fn model(&self) -> &'m Model {
        self.model
    }

    pub fn solver(&self) -> &S {
        &self.solver
    }

    /// Advance `state` over `entry`.
    ///
    /// Never touches run history: a convergence failure is returned to the
    /// caller, which decides whether to substitute or abort.
    pub fn execute(
        &self,
        step_index: usize,
        state: &ReservoirState,
        entry: &TimestepPlanEntry,
        elapsed_days: f64,
    ) -> Result<StepOutput, StepError> {
        let timer = Timer::start("step");
        let period = self.model.period(entry.control_period_id).ok_or_else(|| {
            StepError::Validation(ValidationFailure {
                step_index,
                cell: None,
                what: format!("control period {} is not defined", entry.control_period_id),
            })
        })?;
        let wells: Vec<&WellControl> = period.active_wells().collect();
        let duration = entry.duration_days;

        let mut cutbacks = 0;
        let mut result = self.advance(step_index, state, &wells, elapsed_days, duration, duration);
        while matches!(result, Err(Attempt::Diverged(_))) && cutbacks < self.cutback.max_cuts {
            cutbacks += 1;
            let sub_dt = duration * self.cutback.factor.powi(cutbacks as i32);
            debug!(step = step_index, cutbacks, sub_dt, "cutting timestep");
            result = self.advance(step_index, state, &wells, elapsed_days, duration, sub_dt);
        }

        match result {
            Ok(advance) => {
                let report = StepReport {
                    step_index,
                    control_period_id: entry.control_period_id,
                    duration_days: duration,
                    converged: true,
                    substituted: false,
                    iteration_count: advance.iterations,
                    cutbacks,
                    wall_time_s: timer.stop(),
                    failure_reason: None,
                    well_rates: advance.well_rates,
                };
                Ok(StepOutput {
                    state: advance.state,
                    report,
                })
            }
            Err(Attempt::Invalid(failure)) => Err(StepError::Validation(failure)),
            Err(Attempt::Diverged(cause)) => Err(StepError::Convergence(ConvergenceFailure {
                step_index,
                cutbacks,
                wall_time_s: timer.stop(),
                cause,
            })),
        }
    }

    /// Cover `duration` with consecutive solves of at most `sub_dt` days.
    fn advance(
        &self,
        step_index: usize,
        initial: &ReservoirState,
        wells: &[&WellControl],
        elapsed_days: f64,
        duration: f64,
        sub_dt: f64,
    ) -> Result<Advance, Attempt> {
        let mut current: Option<ReservoirState> = None;
        let mut parts: Vec<(f64, Vec<WellRate>)> = Vec::new();
        let mut iterations = 0;
        let mut done = 0.0;

        loop {
            let remaining = duration - done;
            let dt = if remaining - sub_dt <= 1e-9 * duration {
                remaining
            } else {
                sub_dt
            };
            let request = SolveRequest {
                step_index,
                elapsed_days: elapsed_days + done,
                dt_days: dt,
                wells,
                state: current.as_ref().unwrap_or(initial),
            };
            let outcome = self
                .solver
                .solve(self.model, &request)
                .map_err(Attempt::Diverged)?;
            self.validate(step_index, &outcome.state)
                .map_err(Attempt::Invalid)?;

            iterations += outcome.iterations;
            parts.push((dt, outcome.well_rates));
            current = Some(outcome.state);
            done += dt;
            if duration - done <= 1e-9 * duration {
                break;
            }
        }

        let state = current.ok_or_else(|| {
            Attempt::Invalid(ValidationFailure {
                step_index,
                cell: None,
                what: "no sub-step was executed".to_string(),
            })
        })?;
        Ok(Advance {
            state,
            iterations,
            well_rates: merge_rates(parts, duration),
        })
    }

    fn validate(&self, step_index: usize, state: &ReservoirState) -> Result<(), ValidationFailure> {
        if state.cell_count() != self.model.cell_count() {
            return Err(ValidationFailure {
                step_index,
                cell: None,
                what: format!(
                    "state has {} cells, model has {}",
                    state.cell_count(),
                    self.model.cell_count()
                ),
            });
        }
        state
            .check_physical(self.saturation_tol)
            .map_err(|violation| ValidationFailure {
                step_index,
                cell: Some(violation.cell),
                what: violation.to_string(),
            })
    }
}

/// Time-weighted average of sub-step rates over the full step.
fn merge_rates(mut parts: Vec<(f64, Vec<WellRate>)>, duration: f64) -> Vec<WellRate> {
    if parts.len() <= 1 {
        return parts.pop().map(|(_, rates)| rates).unwrap_or_default();
    }
    let mut merged: Vec<WellRate> = parts[0]
        .1
        .iter()
        .map(|r| WellRate {
            oil: 0.0,
            water: 0.0,
            gas: 0.0,
            bhp: 0.0,
            on_constraint: false,
            ..r.clone()
        })
        .collect();
    for (dt, rates) in &parts {
        let w = dt / duration;
        for (acc, rate) in merged.iter_mut().zip(rates) {
            acc.oil += rate.oil * w;
            acc.water += rate.water * w;
            acc.gas += rate.gas * w;
            acc.bhp += rate.bhp * w;
            acc.on_constraint |= rate.on_constraint;
        }
    }
    merged
}
