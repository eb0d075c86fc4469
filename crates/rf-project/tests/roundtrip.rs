use rf_project::*;

fn case(id: &str) -> CaseDef {
    CaseDef {
        id: id.to_string(),
        name: "Test".to_string(),
        grid: GridDef {
            nx: 2,
            ny: 1,
            nz: 1,
            pore_volume_rb: 1.0e6,
            porosity: 0.2,
            permeability_md: [100.0, 100.0, 10.0],
            transmissibility: [5.0, 0.0, 0.0],
        },
        fluid: None,
        initial: InitialConditionsDef {
            pressure: 3000.0,
            so: 0.8,
            sw: 0.2,
            sg: 0.0,
            rs: Some(0.55),
        },
        wells: vec![WellDef {
            id: "P1".to_string(),
            kind: WellKindDef::Producer,
            well_index: 2.0,
            completions: vec![CompletionDef {
                ijk: [1, 0, 0],
                well_index: 2.0,
            }],
        }],
        phases: vec![PhaseDef {
            name: "primary".to_string(),
            start_day: 0.0,
            controls: vec![WellControlDef {
                well: "P1".to_string(),
                mode: ControlModeDef::Rate,
                target: 200.0,
                lower: 500.0,
                upper: 6000.0,
            }],
        }],
        schedule: ScheduleDef {
            history: SegmentDef {
                duration_days: 365.0,
                timestep_days: 30.0,
            },
            forecast: vec![],
            total_duration_days: 365.0,
        },
        run: RunSettingsDef::default(),
    }
}

fn project(cases: Vec<CaseDef>) -> Project {
    Project {
        version: SCHEMA_VERSION,
        name: "Roundtrip".to_string(),
        cases,
    }
}

#[test]
fn roundtrip_yaml_and_json() {
    let dir = tempfile::tempdir().unwrap();
    let project = project(vec![case("a"), case("b")]);

    let yaml = dir.path().join("field.yaml");
    save(&yaml, &project).unwrap();
    assert_eq!(load(&yaml).unwrap(), project);

    let json = dir.path().join("field.json");
    save(&json, &project).unwrap();
    let text = std::fs::read_to_string(&json).unwrap();
    assert_eq!(parse(&text, CaseFormat::Json).unwrap(), project);
}

#[test]
fn unknown_extension_is_rejected() {
    let err = load(std::path::Path::new("field.toml")).unwrap_err();
    assert!(matches!(err, ProjectError::UnknownFormat { .. }));
    assert_eq!(
        CaseFormat::from_path(std::path::Path::new("field.yml")).unwrap(),
        CaseFormat::Yaml
    );
}

#[test]
fn save_refuses_invalid_project() {
    let dir = tempfile::tempdir().unwrap();
    let project = project(vec![case("a"), case("a")]);
    let err = save(&dir.path().join("dup.yaml"), &project).unwrap_err();
    assert!(matches!(
        err,
        ProjectError::Validation(ValidationError::DuplicateId { .. })
    ));
    assert!(!dir.path().join("dup.yaml").exists());
}

#[test]
fn rejects_newer_schema_version() {
    let mut project = project(vec![]);
    project.version = SCHEMA_VERSION + 1;
    assert_eq!(
        validate_project(&project).unwrap_err(),
        ValidationError::UnsupportedVersion {
            version: SCHEMA_VERSION + 1
        }
    );
}
