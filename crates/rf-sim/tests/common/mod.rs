#![allow(dead_code)]

use std::cell::Cell;

use rf_core::{CellId, PeriodId};
use rf_model::{
    Completion, ControlMode, FluidModel, InjectedPhase, Model, ModelBuilder, ReservoirState,
    RockCell, WellControl, WellRole,
};
use rf_schedule::{TimestepPlan, TimestepPlanEntry};
use rf_solver::{NonlinearSolver, SolveOutcome, SolveRequest, SolverError, SolverResult, WellRate};

pub const STEP_DAYS: f64 = 30.0;

/// Deterministic solver: pressure falls 0.5 psi per day, failures on request.
pub struct ScriptedSolver {
    pub fail_at: Vec<usize>,
    pub invalid_at: Option<usize>,
    /// Step whose result has zero pressure in cell 0.
    pub zero_pressure_at: Option<usize>,
    /// Fail any solve longer than this.
    pub max_dt: f64,
    pub calls: Cell<usize>,
}

impl ScriptedSolver {
    pub fn new() -> Self {
        Self {
            fail_at: Vec::new(),
            invalid_at: None,
            zero_pressure_at: None,
            max_dt: f64::INFINITY,
            calls: Cell::new(0),
        }
    }

    pub fn failing(steps: impl IntoIterator<Item = usize>) -> Self {
        Self {
            fail_at: steps.into_iter().collect(),
            ..Self::new()
        }
    }
}

impl NonlinearSolver for ScriptedSolver {
    fn solve(&self, _model: &Model, request: &SolveRequest<'_>) -> SolverResult<SolveOutcome> {
        self.calls.set(self.calls.get() + 1);
        if self.fail_at.contains(&request.step_index) || request.dt_days > self.max_dt {
            return Err(SolverError::ConvergenceFailed {
                what: format!("scripted failure at step {}", request.step_index),
            });
        }

        let old = request.state;
        let mut pressure: Vec<f64> = old
            .pressure()
            .iter()
            .map(|p| p - 0.5 * request.dt_days)
            .collect();
        if self.zero_pressure_at == Some(request.step_index) {
            pressure[0] = 0.0;
        }
        let mut saturations = old.saturations().to_vec();
        if self.invalid_at == Some(request.step_index) {
            saturations[0][1] += 0.1;
        }
        let state = ReservoirState::new(pressure, saturations, old.rs().to_vec())?;

        let well_rates = request
            .wells
            .iter()
            .map(|w| {
                let producer = w.is_producer();
                WellRate {
                    well: w.name().to_string(),
                    role: w.role(),
                    oil: if producer { -100.0 } else { 0.0 },
                    water: if producer { -10.0 } else { 120.0 },
                    gas: if producer { -50.0 } else { 0.0 },
                    bhp: 2000.0,
                    on_constraint: false,
                }
            })
            .collect();

        Ok(SolveOutcome {
            state,
            iterations: 1,
            residual_norm: 0.0,
            well_rates,
        })
    }
}

pub fn model() -> Model {
    let mut builder = ModelBuilder::new(FluidModel::black_oil_default());
    let c0 = builder.add_cell(RockCell::new(0.2, [100.0, 100.0, 10.0], 1.0e6));
    let producer = WellControl::new(
        "P1",
        WellRole::Producer,
        ControlMode::Rate,
        100.0,
        (500.0, 6000.0),
        2.0,
        vec![Completion::new(c0, 2.0)],
    )
    .unwrap();
    let injector = WellControl::new(
        "I1",
        WellRole::Injector {
            phase: InjectedPhase::Water,
        },
        ControlMode::Rate,
        120.0,
        (0.0, 6000.0),
        2.0,
        vec![Completion::new(CellId::from_index(0), 2.0)],
    )
    .unwrap();
    builder.add_period(vec![producer.clone()]);
    builder.add_period(vec![producer, injector]);
    builder.build().unwrap()
}

/// One cell and a single control period with no wells.
pub fn closed_model() -> Model {
    let mut builder = ModelBuilder::new(FluidModel::black_oil_default());
    builder.add_cell(RockCell::new(0.2, [100.0, 100.0, 10.0], 1.0e6));
    builder.add_period(vec![]);
    builder.build().unwrap()
}

/// `steps` entries of [`STEP_DAYS`]; the second half runs in period 2.
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
    ReservoirState::uniform(1, 3000.0, [0.8, 0.2, 0.0], 0.5)
}
