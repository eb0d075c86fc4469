use std::path::Path;

#[test]
fn demos_load_and_validate() {
    let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("../../demos/waterflood.yaml");
    let project = rf_project::load(&path).unwrap_or_else(|e| panic!("failed to load demo: {e}"));

    assert_eq!(project.cases.len(), 2);
    let case = project.case("waterflood").unwrap();
    assert_eq!(case.grid.cell_count(), 5);
    assert_eq!(case.phases.len(), 3);
    assert_eq!(case.well("I1").unwrap().kind, rf_project::WellKindDef::WaterInjector);
    assert_eq!(case.run.checkpoint_frequency, 5);
    // Unset run settings keep their defaults.
    assert_eq!(case.run.min_success_rate, 0.9);
    assert_eq!(project.case("primary").unwrap().run.ooip_stb, Some(3.8e7));
}
