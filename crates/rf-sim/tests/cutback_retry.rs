//! Timestep cutting inside the step executor.

mod common;

use common::{ScriptedSolver, initial, model, plan};
use rf_sim::{CutbackPolicy, DriverConfig, RunHooks, SimulationDriver, StepError, StepExecutor};

#[test]
fn executor_cuts_back_until_sub_steps_converge() {
    let model = model();
    let plan = plan(2);
    // Anything longer than 10 days diverges: 30 -> 15 (fails) -> 7.5 (4 sub-steps).
    let solver = ScriptedSolver {
        max_dt: 10.0,
        ..ScriptedSolver::new()
    };
    let executor = StepExecutor::new(&model, &solver).with_cutback(CutbackPolicy {
        max_cuts: 3,
        factor: 0.5,
    });

    let entry = plan.entry(1).unwrap();
    let output = executor
        .execute(1, &initial(), entry, plan.start_day(1))
        .unwrap();

    assert_eq!(output.report.cutbacks, 2);
    assert_eq!(output.report.iteration_count, 4);
    assert_eq!(solver.calls.get(), 1 + 1 + 4);
    assert_eq!(output.report.duration_days, 30.0);
    // Pressure falls 0.5 psi/day regardless of how the step is split.
    assert_eq!(output.state.pressure()[0], 3000.0 - 15.0);

    let producer = &output.report.well_rates[0];
    assert_eq!(producer.well, "P1");
    assert!((producer.oil + 100.0).abs() < 1e-12);
    assert!((output.report.well_rates[1].water - 120.0).abs() < 1e-12);
}

#[test]
fn exhausted_cutbacks_report_convergence_failure() {
    let model = model();
    let plan = plan(1);
    let solver = ScriptedSolver {
        max_dt: 1.0,
        ..ScriptedSolver::new()
    };
    let executor = StepExecutor::new(&model, &solver).with_cutback(CutbackPolicy {
        max_cuts: 2,
        factor: 0.5,
    });

    let err = executor
        .execute(0, &initial(), plan.entry(0).unwrap(), 0.0)
        .unwrap_err();
    match err {
        StepError::Convergence(failure) => {
            assert_eq!(failure.step_index, 0);
            assert_eq!(failure.cutbacks, 2);
        }
        other => panic!("unexpected error {other:?}"),
    }
}

#[test]
fn without_cutback_the_driver_substitutes() {
    let model = model();
    let plan = plan(4);
    let solver = ScriptedSolver {
        max_dt: 10.0,
        fail_at: Vec::new(),
        ..ScriptedSolver::new()
    };

    let mut plain = SimulationDriver::new(&model, &plan, &solver, DriverConfig::default()).unwrap();
    let outcome = plain.run(initial(), RunHooks::default()).unwrap();
    assert_eq!(outcome.run.convergence_failures(), 4);
    assert!(!outcome.status.is_accepted());

    let config = DriverConfig {
        cutback: CutbackPolicy {
            max_cuts: 2,
            factor: 0.25,
        },
        ..DriverConfig::default()
    };
    let mut with_cutback = SimulationDriver::new(&model, &plan, &solver, config).unwrap();
    let outcome = with_cutback.run(initial(), RunHooks::default()).unwrap();
    assert!(outcome.status.is_accepted());
    assert!(outcome.run.reports().iter().all(|r| r.cutbacks == 1));
    assert_eq!(outcome.run.states()[4].pressure()[0], 3000.0 - 60.0);
}
