//! Integration tests for rf-model.

use rf_core::{CellId, PeriodId};
use rf_model::{
    Completion, ControlMode, FluidModel, InjectedPhase, ModelBuilder, ModelError, RockCell,
    WellControl, WellRole,
};

fn rock() -> RockCell {
    RockCell::new(0.25, [150.0, 150.0, 15.0], 2.0e5)
}

fn producer(name: &str, cell: CellId) -> WellControl {
    WellControl::new(
        name,
        WellRole::Producer,
        ControlMode::Rate,
        800.0,
        (500.0, 6000.0),
        3.0,
        vec![Completion::new(cell, 3.0)],
    )
    .unwrap()
}

fn injector(name: &str, cell: CellId) -> WellControl {
    WellControl::new(
        name,
        WellRole::Injector {
            phase: InjectedPhase::Water,
        },
        ControlMode::Bhp,
        4500.0,
        (0.0, 2000.0),
        2.0,
        vec![Completion::new(cell, 2.0)],
    )
    .unwrap()
}

#[test]
fn build_chain_with_adjacency() {
    // Build: C0 - C1 - C2
    let mut builder = ModelBuilder::new(FluidModel::black_oil_default());
    let c0 = builder.add_cell(rock());
    let c1 = builder.add_cell(rock());
    let c2 = builder.add_cell(rock());
    builder.connect(c0, c1, 4.0);
    builder.connect(c1, c2, 4.0);
    builder.add_period(vec![producer("P1", c2)]);

    let model = builder.build().unwrap();
    let grid = model.grid();

    assert_eq!(grid.cell_count(), 3);
    assert_eq!(grid.connections().len(), 2);
    assert_eq!(grid.cell_connections(c0).len(), 1);
    assert_eq!(grid.cell_connections(c1).len(), 2);
    assert_eq!(grid.cell_connections(c2).len(), 1);

    let conn = grid.connections()[grid.cell_connections(c0)[0]];
    assert_eq!(conn.other(c0), c1);
    assert!((grid.total_pore_volume() - 6.0e5).abs() < 1e-6);
}

#[test]
fn periods_get_contiguous_ids_and_wells_are_indexed() {
    let mut builder = ModelBuilder::new(FluidModel::black_oil_default());
    let c0 = builder.add_cell(rock());
    let c1 = builder.add_cell(rock());
    builder.connect(c0, c1, 1.0);

    let p1 = builder.add_period(vec![producer("P1", c0)]);
    let p2 = builder.add_period(vec![producer("P1", c0), injector("I1", c1)]);
    let p3 = builder.add_period(vec![]);

    assert_eq!(p1.get(), 1);
    assert_eq!(p2.get(), 2);
    assert_eq!(p3.get(), 3);

    let model = builder.build().unwrap();
    assert_eq!(model.period_count(), 3);

    let phase2 = model.period(p2).unwrap();
    assert_eq!(phase2.id(), p2);
    assert_eq!(phase2.producers().len(), 1);
    assert_eq!(phase2.injectors().len(), 1);
    assert_eq!(
        phase2.active_wells().map(|w| w.name()).collect::<Vec<_>>(),
        vec!["P1", "I1"]
    );

    assert!(model.period(p3).unwrap().is_shut_in());
    assert!(model.period(PeriodId::new(4).unwrap()).is_none());

    let p1_pos = model.well_position("P1").unwrap();
    let i1_pos = model.well_position("I1").unwrap();
    assert_eq!(p1_pos.index(), 0);
    assert_eq!(i1_pos.index(), 1);
    assert_eq!(model.well_name(i1_pos), Some("I1"));
    assert!(model.well_position("P9").is_none());
}

#[test]
fn rejects_model_without_periods() {
    let mut builder = ModelBuilder::new(FluidModel::black_oil_default());
    builder.add_cell(rock());
    assert_eq!(builder.build().unwrap_err(), ModelError::NoControlPeriods);
}

#[test]
fn rejects_completion_outside_grid() {
    let mut builder = ModelBuilder::new(FluidModel::black_oil_default());
    builder.add_cell(rock());
    builder.add_period(vec![producer("P1", CellId::from_index(7))]);
    let err = builder.build().unwrap_err();
    assert!(matches!(err, ModelError::CompletionOutOfRange { cell_count: 1, .. }));
}

#[test]
fn rejects_duplicate_well_in_period() {
    let mut builder = ModelBuilder::new(FluidModel::black_oil_default());
    let c0 = builder.add_cell(rock());
    builder.add_period(vec![producer("P1", c0), producer("P1", c0)]);
    let err = builder.build().unwrap_err();
    assert!(matches!(err, ModelError::DuplicateWell { .. }));
}

#[test]
fn rejects_self_connection_and_bad_rock() {
    let mut builder = ModelBuilder::new(FluidModel::black_oil_default());
    let c0 = builder.add_cell(rock());
    builder.connect(c0, c0, 1.0);
    builder.add_period(vec![]);
    assert!(matches!(
        builder.build().unwrap_err(),
        ModelError::InvalidConnection { index: 0, .. }
    ));

    let mut builder = ModelBuilder::new(FluidModel::black_oil_default());
    builder.add_cell(RockCell::new(0.0, [1.0, 1.0, 1.0], 1.0));
    builder.add_period(vec![]);
    assert!(matches!(
        builder.build().unwrap_err(),
        ModelError::InvalidCell { .. }
    ));
}
