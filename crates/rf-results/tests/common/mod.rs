#![allow(dead_code)]

use std::sync::Arc;

use rf_core::{CellId, PeriodId};
use rf_model::{
    Completion, ControlMode, FluidModel, InjectedPhase, Model, ModelBuilder, ReservoirState,
    RockCell, WellControl, WellRole,
};
use rf_schedule::{TimestepPlan, TimestepPlanEntry};
use rf_sim::{Checkpoint, RunState, StepReport};
use rf_solver::{NonlinearSolver, SolveOutcome, SolveRequest, SolverError, SolverResult, WellRate};

pub const STEP_DAYS: f64 = 30.0;

/// Pressure falls one psi per day; fails on the listed steps.
pub struct DecliningSolver {
    pub fail_at: Vec<usize>,
}

impl NonlinearSolver for DecliningSolver {
    fn solve(&self, _model: &Model, request: &SolveRequest<'_>) -> SolverResult<SolveOutcome> {
        if self.fail_at.contains(&request.step_index) {
            return Err(SolverError::ConvergenceFailed {
                what: "scripted".to_string(),
            });
        }
        let old = request.state;
        let pressure = old.pressure().iter().map(|p| p - request.dt_days).collect();
        let state =
            ReservoirState::new(pressure, old.saturations().to_vec(), old.rs().to_vec())?;
        let well_rates = request
            .wells
            .iter()
            .map(|w| rate(w.name(), w.role(), 200.0, 20.0))
            .collect();
        Ok(SolveOutcome {
            state,
            iterations: 2,
            residual_norm: 1e-9,
            well_rates,
        })
    }
}

/// Producer rates are reported negative, water injection positive.
pub fn rate(name: &str, role: WellRole, oil: f64, water: f64) -> WellRate {
    let producer = matches!(role, WellRole::Producer);
    WellRate {
        well: name.to_string(),
        role,
        oil: if producer { -oil } else { 0.0 },
        water: if producer { -water } else { water },
        gas: if producer { -0.5 * oil } else { 0.0 },
        bhp: 2500.0,
        on_constraint: false,
    }
}

/// Two cells; period 1 produces from P1, period 2 adds injector I1, period 3 runs P2 alone.
pub fn model() -> Model {
    let mut builder = ModelBuilder::new(FluidModel::black_oil_default());
    let c0 = builder.add_cell(RockCell::new(0.2, [100.0, 100.0, 10.0], 1.0e6));
    let c1 = builder.add_cell(RockCell::new(0.2, [100.0, 100.0, 10.0], 3.0e6));
    builder.connect(c0, c1, 5.0);
    let producer = WellControl::new(
        "P1",
        WellRole::Producer,
        ControlMode::Rate,
        200.0,
        (500.0, 6000.0),
        2.0,
        vec![Completion::new(c1, 2.0)],
    )
    .unwrap();
    let injector = WellControl::new(
        "I1",
        WellRole::Injector {
            phase: InjectedPhase::Water,
        },
        ControlMode::Rate,
        20.0,
        (0.0, 6000.0),
        2.0,
        vec![Completion::new(CellId::from_index(0), 2.0)],
    )
    .unwrap();
    let infill = WellControl::new(
        "P2",
        WellRole::Producer,
        ControlMode::Rate,
        100.0,
        (500.0, 6000.0),
        1.0,
        vec![Completion::new(c0, 1.0)],
    )
    .unwrap();
    builder.add_period(vec![producer.clone()]);
    builder.add_period(vec![producer, injector]);
    // Only hand-built histories reach this period.
    builder.add_period(vec![infill]);
    builder.build().unwrap()
}

pub fn plan(steps: usize) -> TimestepPlan {
    let entries = (0..steps)
        .map(|i| TimestepPlanEntry {
            duration_days: STEP_DAYS,
            control_period_id: PeriodId::new(if i < steps / 2 { 1 } else { 2 }).unwrap(),
        })
        .collect();
    TimestepPlan::from_entries(entries, steps as f64 * STEP_DAYS).unwrap()
}

pub fn initial() -> ReservoirState {
    ReservoirState::uniform(2, 3000.0, [0.8, 0.2, 0.0], 0.5)
}

/// A history assembled by hand: one state per step with the given pressures.
pub fn history(pressures: &[[f64; 2]], reports: Vec<StepReport>) -> RunState {
    let mut states = vec![Arc::new(initial())];
    for p in pressures {
        states.push(Arc::new(
            ReservoirState::new(p.to_vec(), vec![[0.8, 0.2, 0.0]; 2], vec![0.5; 2]).unwrap(),
        ));
    }
    let convergence_failures = reports.iter().filter(|r| !r.converged).count();
    let elapsed_days = reports.iter().map(|r| r.duration_days).sum();
    RunState::from_checkpoint(Checkpoint {
        step_index: reports.len() - 1,
        convergence_failures,
        elapsed_days,
        states,
        reports,
    })
}

pub fn converged(step_index: usize, duration_days: f64, well_rates: Vec<WellRate>) -> StepReport {
    StepReport {
        step_index,
        control_period_id: PeriodId::FIRST,
        duration_days,
        converged: true,
        substituted: false,
        iteration_count: 3,
        cutbacks: 0,
        wall_time_s: 0.01,
        failure_reason: None,
        well_rates,
    }
}
