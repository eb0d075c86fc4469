//! Single-step behaviour of the reference IMPES solver.

use rf_core::CellId;
use rf_model::{
    Completion, ControlMode, FluidModel, InjectedPhase, Model, ModelBuilder, ReservoirState,
    RockCell, WellControl, WellRole,
};
use rf_solver::{ImpesConfig, ImpesSolver, NonlinearSolver, SolveRequest, SolverError};

const INITIAL_PRESSURE: f64 = 3000.0;

fn chain(cells: usize, pore_volume: f64) -> ModelBuilder {
    let mut builder = ModelBuilder::new(FluidModel::black_oil_default());
    let ids: Vec<CellId> = (0..cells)
        .map(|_| builder.add_cell(RockCell::new(0.2, [100.0, 100.0, 10.0], pore_volume)))
        .collect();
    for pair in ids.windows(2) {
        builder.connect(pair[0], pair[1], 5.0);
    }
    builder
}

fn producer(cell: u32, mode: ControlMode, target: f64, bounds: (f64, f64)) -> WellControl {
    WellControl::new(
        "P1",
        WellRole::Producer,
        mode,
        target,
        bounds,
        3.0,
        vec![Completion::new(CellId::from_index(cell), 3.0)],
    )
    .unwrap()
}

fn water_injector(cell: u32, rate: f64) -> WellControl {
    WellControl::new(
        "I1",
        WellRole::Injector {
            phase: InjectedPhase::Water,
        },
        ControlMode::Rate,
        rate,
        (0.0, 6000.0),
        3.0,
        vec![Completion::new(CellId::from_index(cell), 3.0)],
    )
    .unwrap()
}

fn initial(model: &Model) -> ReservoirState {
    ReservoirState::uniform(model.cell_count(), INITIAL_PRESSURE, [0.8, 0.2, 0.0], 0.55)
}

fn step<'a>(
    state: &'a ReservoirState,
    wells: &'a [&'a WellControl],
    dt_days: f64,
) -> SolveRequest<'a> {
    SolveRequest {
        step_index: 0,
        elapsed_days: 0.0,
        dt_days,
        wells,
        state,
    }
}

#[test]
fn closed_reservoir_at_equilibrium_is_unchanged() {
    let mut builder = chain(3, 2.0e5);
    builder.add_period(vec![]);
    let model = builder.build().unwrap();
    let state = initial(&model);

    let outcome = ImpesSolver::default()
        .solve(&model, &step(&state, &[], 30.0))
        .unwrap();

    assert_eq!(outcome.iterations, 0);
    assert!(outcome.well_rates.is_empty());
    assert_eq!(outcome.state.pressure(), state.pressure());
    for (new, old) in outcome.state.saturations().iter().zip(state.saturations()) {
        for phase in 0..3 {
            assert!((new[phase] - old[phase]).abs() < 1e-12);
        }
    }
}

#[test]
fn rate_producer_meets_target_and_depletes() {
    let mut builder = chain(3, 2.0e5);
    builder.add_period(vec![]);
    let model = builder.build().unwrap();
    let state = initial(&model);
    let p1 = producer(2, ControlMode::Rate, 800.0, (500.0, 6000.0));

    let outcome = ImpesSolver::default()
        .solve(&model, &step(&state, &[&p1], 1.0))
        .unwrap();

    assert!(outcome.iterations >= 1);
    let rate = &outcome.well_rates[0];
    assert_eq!(rate.well, "P1");
    assert!(rate.is_producer());
    assert!(!rate.on_constraint);

    // Water sits at connate saturation and there is no free gas, so only oil flows.
    let p_well_cell = outcome.state.pressure()[2];
    let bo = model.fluid().oil.bo(p_well_cell);
    assert!((rate.oil + 800.0 / bo).abs() < 1e-9);
    assert_eq!(rate.water, 0.0);
    assert!((rate.gas - rate.oil * 0.55).abs() < 1e-9);

    assert!(outcome.state.pressure().iter().all(|&p| p < INITIAL_PRESSURE));
    assert!(outcome.state.pressure()[2] < outcome.state.pressure()[0]);
    assert!(rate.bhp < p_well_cell);
    assert!(outcome.state.check_physical(1e-6).is_ok());
}

#[test]
fn producer_switches_to_bhp_limit() {
    let mut builder = chain(3, 2.0e5);
    builder.add_period(vec![]);
    let model = builder.build().unwrap();
    let state = initial(&model);
    let p1 = producer(2, ControlMode::Rate, 1.0e5, (2800.0, 6000.0));

    let outcome = ImpesSolver::default()
        .solve(&model, &step(&state, &[&p1], 1.0))
        .unwrap();

    let rate = &outcome.well_rates[0];
    assert!(rate.on_constraint);
    assert_eq!(rate.bhp, 2800.0);
    assert!(rate.oil < 0.0);
    assert!(-rate.oil < 1.0e5);
    assert!(outcome.state.pressure().iter().all(|&p| p > 2800.0));
}

#[test]
fn water_injection_raises_pressure_and_water_saturation() {
    let mut builder = chain(2, 2.0e5);
    builder.add_period(vec![]);
    let model = builder.build().unwrap();
    let state = initial(&model);
    let i1 = water_injector(0, 500.0);

    let outcome = ImpesSolver::default()
        .solve(&model, &step(&state, &[&i1], 1.0))
        .unwrap();

    let rate = &outcome.well_rates[0];
    assert!((rate.water - 500.0 / model.fluid().bw).abs() < 1e-9);
    assert_eq!(rate.oil, 0.0);
    assert!(rate.bhp > outcome.state.pressure()[0]);

    assert!(outcome.state.pressure()[0] > INITIAL_PRESSURE);
    assert!(outcome.state.saturations()[0][1] > 0.2);
    assert!(outcome.state.check_physical(1e-6).is_ok());
}

#[test]
fn large_saturation_jump_is_rejected() {
    let mut builder = chain(2, 1.0e4);
    builder.add_period(vec![]);
    let model = builder.build().unwrap();
    let state = initial(&model);
    let i1 = water_injector(0, 500.0);
    let p1 = producer(1, ControlMode::Rate, 500.0, (0.0, 6000.0));

    let solver = ImpesSolver::new(ImpesConfig {
        max_saturation_change: 0.2,
        ..ImpesConfig::default()
    });
    let err = solver
        .solve(&model, &step(&state, &[&p1, &i1], 10.0))
        .unwrap_err();
    assert!(matches!(err, SolverError::ConvergenceFailed { .. }));

    // A tenth of the step stays within the limit.
    assert!(solver.solve(&model, &step(&state, &[&p1, &i1], 1.0)).is_ok());
}

#[test]
fn mismatched_state_is_a_setup_error() {
    let mut builder = chain(3, 2.0e5);
    builder.add_period(vec![]);
    let model = builder.build().unwrap();
    let state = ReservoirState::uniform(2, INITIAL_PRESSURE, [0.8, 0.2, 0.0], 0.55);

    let err = ImpesSolver::default()
        .solve(&model, &step(&state, &[], 1.0))
        .unwrap_err();
    assert!(matches!(err, SolverError::ProblemSetup { .. }));
}

#[test]
fn solve_is_deterministic() {
    let mut builder = chain(4, 2.0e5);
    builder.add_period(vec![]);
    let model = builder.build().unwrap();
    let state = initial(&model);
    let p1 = producer(3, ControlMode::Bhp, 2500.0, (0.0, 1.0e4));
    let i1 = water_injector(0, 300.0);
    let wells = [&p1, &i1];

    let solver = ImpesSolver::default();
    let a = solver.solve(&model, &step(&state, &wells, 5.0)).unwrap();
    let b = solver.solve(&model, &step(&state, &wells, 5.0)).unwrap();
    assert_eq!(a, b);
}
