//! The nonlinear solver seam used by the step executor.

use rf_model::{Model, ReservoirState, WellControl, WellRole};
use serde::{Deserialize, Serialize};

use crate::error::SolverResult;

/// Everything a solver needs to advance the reservoir by one step.
#[derive(Debug, Clone, Copy)]
pub struct SolveRequest<'a> {
    pub step_index: usize,
    /// Simulated days elapsed when the step begins.
    pub elapsed_days: f64,
    pub dt_days: f64,
    /// Active wells, producers first. May be empty.
    pub wells: &'a [&'a WellControl],
    pub state: &'a ReservoirState,
}

/// Surface rates of one well over a step.
///
/// Sign convention: production is negative, injection positive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WellRate {
    pub well: String,
    pub role: WellRole,
    pub oil: f64,
    pub water: f64,
    pub gas: f64,
    /// Flowing bottom-hole pressure.
    pub bhp: f64,
    /// The well ran on its limiting constraint instead of its target.
    pub on_constraint: bool,
}

impl WellRate {
    pub fn is_producer(&self) -> bool {
        matches!(self.role, WellRole::Producer)
    }
}

/// Converged solution of one step.
#[derive(Debug, Clone, PartialEq)]
pub struct SolveOutcome {
    pub state: ReservoirState,
    pub iterations: usize,
    pub residual_norm: f64,
    pub well_rates: Vec<WellRate>,
}

/// Advances a reservoir state over one timestep.
///
/// Implementations must be deterministic: the same model and request always
/// yield the same outcome. Checkpoint resume relies on this.
pub trait NonlinearSolver {
    fn solve(&self, model: &Model, request: &SolveRequest<'_>) -> SolverResult<SolveOutcome>;
}

impl<S: NonlinearSolver + ?Sized> NonlinearSolver for &S {
    fn solve(&self, model: &Model, request: &SolveRequest<'_>) -> SolverResult<SolveOutcome> {
        (**self).solve(model, request)
    }
}

impl<S: NonlinearSolver + ?Sized> NonlinearSolver for Box<S> {
    fn solve(&self, model: &Model, request: &SolveRequest<'_>) -> SolverResult<SolveOutcome> {
        (**self).solve(model, request)
    }
}
