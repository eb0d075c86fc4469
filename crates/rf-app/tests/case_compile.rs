mod common;

use common::demo_project;
use rf_app::{compile_case, get_case, list_cases, load_project};
use rf_core::PeriodId;
use rf_model::FluidModel;

#[test]
fn demo_waterflood_compiles_to_twenty_steps() {
    let (_dir, path) = demo_project();
    let project = load_project(&path).unwrap();
    let compiled = compile_case(get_case(&project, "waterflood").unwrap()).unwrap();

    assert_eq!(compiled.model.cell_count(), 5);
    assert_eq!(compiled.model.grid().connections().len(), 4);
    assert_eq!(compiled.model.period_count(), 3);
    assert_eq!(compiled.plan.len(), 20);
    assert_eq!(compiled.plan.total_days(), 2920.0);

    let periods: Vec<u32> = compiled
        .plan
        .iter()
        .map(|e| e.control_period_id.get())
        .collect();
    assert_eq!(&periods[..13], &[1; 13]);
    assert_eq!(&periods[13..], &[2, 2, 2, 3, 3, 3, 3]);

    let flood = compiled.model.period(PeriodId::new(2).unwrap()).unwrap();
    assert_eq!(flood.producers().len(), 1);
    assert_eq!(flood.injectors().len(), 1);
    assert_eq!(compiled.driver.checkpoint_frequency, 5);

    // 1e8 rb at So = 0.8 and Bo = 1.246 (interpolated at 3000 psi).
    let expected = 1.0e8 * 0.8 / compiled.model.fluid().oil.bo(3000.0);
    assert!((compiled.ooip_stb - expected).abs() < 1e-6 * expected);
    assert_eq!(compiled.initial.rs()[0], 0.55);
}

#[test]
fn explicit_ooip_is_used() {
    let (_dir, path) = demo_project();
    let project = load_project(&path).unwrap();
    let compiled = compile_case(get_case(&project, "primary").unwrap()).unwrap();
    assert_eq!(compiled.ooip_stb, 3.8e7);
    assert_eq!(compiled.plan.len(), 25);
    assert_eq!(compiled.plan.entry(24).unwrap().duration_days, 10.0);
}

#[test]
fn case_listing_and_lookup() {
    let (_dir, path) = demo_project();
    let project = load_project(&path).unwrap();
    let cases = list_cases(&project);
    assert_eq!(cases.len(), 2);
    assert_eq!(cases[0].id, "waterflood");
    assert_eq!(cases[0].well_count, 3);
    assert_eq!(cases[1].total_days, 730.0);
    assert!(matches!(
        get_case(&project, "nope").unwrap_err(),
        rf_app::AppError::CaseNotFound(_)
    ));
}

#[test]
fn wells_are_indexed_in_first_appearance_order() {
    let (_dir, path) = demo_project();
    let project = load_project(&path).unwrap();
    let compiled = compile_case(get_case(&project, "waterflood").unwrap()).unwrap();

    assert_eq!(compiled.model.well_names(), ["P1", "I1", "P2"]);
    let p2 = compiled.model.well_position("P2").unwrap();
    assert_eq!(p2.slot(), 2);
    assert_eq!(compiled.model.well_name(p2), Some("P2"));
    assert!(compiled.model.well_position("P3").is_none());
}

#[test]
fn unknown_well_in_a_phase_is_a_compile_error() {
    let (_dir, path) = demo_project();
    let project = load_project(&path).unwrap();
    let mut case = get_case(&project, "waterflood").unwrap().clone();
    case.phases[1].controls[1].well = "I9".to_string();

    let err = rf_app::case_compile::build_model(&case, FluidModel::black_oil_default()).unwrap_err();
    match err {
        rf_app::AppError::Compile(msg) => assert!(msg.contains("unknown well 'I9'"), "{msg}"),
        other => panic!("expected a compile error, got {other:?}"),
    }
}
