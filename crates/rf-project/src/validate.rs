//! Case file validation.

use std::collections::HashSet;

use rf_core::{SATURATION_SUM_TOL, Tolerances, nearly_equal};

use crate::schema::{
    CaseDef, ControlModeDef, GridDef, InitialConditionsDef, PhaseDef, Project, RunSettingsDef,
    SCHEMA_VERSION, ScheduleDef, SegmentDef, WellDef,
};

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("Duplicate ID: {id} in {context}")]
    DuplicateId { id: String, context: String },

    #[error("Missing reference: {id} in {context}")]
    MissingReference { id: String, context: String },

    #[error("Invalid value: {field} = {value} ({reason})")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Unsupported version: {version}")]
    UnsupportedVersion { version: u32 },
}

fn invalid(field: impl Into<String>, value: impl ToString, reason: &str) -> ValidationError {
    ValidationError::InvalidValue {
        field: field.into(),
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

fn positive(field: impl Into<String>, value: f64) -> Result<(), ValidationError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(invalid(field, value, "must be positive"))
    }
}

pub fn validate_project(project: &Project) -> Result<(), ValidationError> {
    if project.version == 0 || project.version > SCHEMA_VERSION {
        return Err(ValidationError::UnsupportedVersion {
            version: project.version,
        });
    }

    let mut case_ids = HashSet::new();
    for case in &project.cases {
        if !case_ids.insert(&case.id) {
            return Err(ValidationError::DuplicateId {
                id: case.id.clone(),
                context: "cases".to_string(),
            });
        }
        validate_case(case)?;
    }
    Ok(())
}

pub fn validate_case(case: &CaseDef) -> Result<(), ValidationError> {
    let ctx = |field: &str| format!("case '{}' {field}", case.id);

    validate_grid(&case.grid, &ctx("grid"))?;
    validate_initial(&case.initial, &ctx("initial"))?;

    let mut well_ids = HashSet::new();
    for well in &case.wells {
        if !well_ids.insert(well.id.as_str()) {
            return Err(ValidationError::DuplicateId {
                id: well.id.clone(),
                context: ctx("wells"),
            });
        }
        validate_well(well, &case.grid, &ctx(&format!("well '{}'", well.id)))?;
    }

    validate_phases(&case.phases, &well_ids, &ctx("phases"))?;
    validate_schedule(&case.schedule, &ctx("schedule"))?;
    validate_run(&case.run, &ctx("run"))
}

fn validate_grid(grid: &GridDef, ctx: &str) -> Result<(), ValidationError> {
    for (name, n) in [("nx", grid.nx), ("ny", grid.ny), ("nz", grid.nz)] {
        if n == 0 {
            return Err(invalid(format!("{ctx}.{name}"), n, "must be at least 1"));
        }
    }
    positive(format!("{ctx}.pore_volume_rb"), grid.pore_volume_rb)?;
    if !(grid.porosity > 0.0 && grid.porosity <= 1.0) {
        return Err(invalid(format!("{ctx}.porosity"), grid.porosity, "must lie in (0, 1]"));
    }
    for k in grid.permeability_md {
        positive(format!("{ctx}.permeability_md"), k)?;
    }
    for t in grid.transmissibility {
        if !t.is_finite() || t < 0.0 {
            return Err(invalid(format!("{ctx}.transmissibility"), t, "must be non-negative"));
        }
    }
    Ok(())
}

fn validate_initial(initial: &InitialConditionsDef, ctx: &str) -> Result<(), ValidationError> {
    positive(format!("{ctx}.pressure"), initial.pressure)?;
    for (name, s) in [("so", initial.so), ("sw", initial.sw), ("sg", initial.sg)] {
        if !(0.0..=1.0).contains(&s) {
            return Err(invalid(format!("{ctx}.{name}"), s, "must lie in [0, 1]"));
        }
    }
    let sum = initial.so + initial.sw + initial.sg;
    if (sum - 1.0).abs() > SATURATION_SUM_TOL {
        return Err(invalid(format!("{ctx}.saturations"), sum, "must sum to 1"));
    }
    if let Some(rs) = initial.rs
        && (!rs.is_finite() || rs < 0.0)
    {
        return Err(invalid(format!("{ctx}.rs"), rs, "must be non-negative"));
    }
    Ok(())
}

fn validate_well(well: &WellDef, grid: &GridDef, ctx: &str) -> Result<(), ValidationError> {
    positive(format!("{ctx}.well_index"), well.well_index)?;
    if well.completions.is_empty() {
        return Err(invalid(format!("{ctx}.completions"), 0, "need at least one completion"));
    }
    let mut cells = HashSet::new();
    for completion in &well.completions {
        if !grid.contains(completion.ijk) {
            return Err(invalid(
                format!("{ctx}.completions"),
                format!("{:?}", completion.ijk),
                "outside the grid",
            ));
        }
        if !cells.insert(completion.ijk) {
            return Err(ValidationError::DuplicateId {
                id: format!("{:?}", completion.ijk),
                context: format!("{ctx} completions"),
            });
        }
        positive(format!("{ctx}.completions.well_index"), completion.well_index)?;
    }
    let sum: f64 = well.completions.iter().map(|c| c.well_index).sum();
    if !nearly_equal(sum, well.well_index, Tolerances::default()) {
        return Err(invalid(
            format!("{ctx}.completions.well_index"),
            sum,
            "completion well indices must sum to the well index",
        ));
    }
    Ok(())
}

fn validate_phases(
    phases: &[PhaseDef],
    well_ids: &HashSet<&str>,
    ctx: &str,
) -> Result<(), ValidationError> {
    let first = phases
        .first()
        .ok_or_else(|| invalid(ctx, 0, "need at least one phase"))?;
    if first.start_day != 0.0 {
        return Err(invalid(format!("{ctx}[0].start_day"), first.start_day, "must be 0"));
    }
    for (i, pair) in phases.windows(2).enumerate() {
        if !pair[1].start_day.is_finite() || pair[1].start_day <= pair[0].start_day {
            return Err(invalid(
                format!("{ctx}[{}].start_day", i + 1),
                pair[1].start_day,
                "must be later than the previous phase",
            ));
        }
    }

    for phase in phases {
        let pctx = format!("{ctx} '{}'", phase.name);
        let mut open = HashSet::new();
        for control in &phase.controls {
            if !well_ids.contains(control.well.as_str()) {
                return Err(ValidationError::MissingReference {
                    id: control.well.clone(),
                    context: pctx,
                });
            }
            if !open.insert(control.well.as_str()) {
                return Err(ValidationError::DuplicateId {
                    id: control.well.clone(),
                    context: pctx,
                });
            }
            let field = |name: &str| format!("{pctx}.{}.{name}", control.well);
            positive(field("target"), control.target)?;
            if !control.lower.is_finite() || !control.upper.is_finite() || control.lower < 0.0 {
                return Err(invalid(field("lower"), control.lower, "bounds must be finite and non-negative"));
            }
            if control.lower > control.upper {
                return Err(invalid(field("upper"), control.upper, "must not be below lower"));
            }
            if control.mode == ControlModeDef::Bhp && control.upper <= 0.0 {
                return Err(invalid(field("upper"), control.upper, "rate limit must be positive"));
            }
        }
    }
    Ok(())
}

fn validate_segment(segment: &SegmentDef, ctx: &str) -> Result<(), ValidationError> {
    positive(format!("{ctx}.duration_days"), segment.duration_days)?;
    positive(format!("{ctx}.timestep_days"), segment.timestep_days)
}

fn validate_schedule(schedule: &ScheduleDef, ctx: &str) -> Result<(), ValidationError> {
    validate_segment(&schedule.history, &format!("{ctx}.history"))?;
    for (i, segment) in schedule.forecast.iter().enumerate() {
        validate_segment(segment, &format!("{ctx}.forecast[{i}]"))?;
    }
    positive(format!("{ctx}.total_duration_days"), schedule.total_duration_days)
}

fn validate_run(run: &RunSettingsDef, ctx: &str) -> Result<(), ValidationError> {
    if run.report_frequency == 0 || run.checkpoint_frequency == 0 {
        return Err(invalid(format!("{ctx}.frequency"), 0, "must be at least 1"));
    }
    if !(0.0..=1.0).contains(&run.min_success_rate) {
        return Err(invalid(format!("{ctx}.min_success_rate"), run.min_success_rate, "must lie in [0, 1]"));
    }
    if run.max_cuts > 0 && !(run.cut_factor > 0.0 && run.cut_factor < 1.0) {
        return Err(invalid(format!("{ctx}.cut_factor"), run.cut_factor, "must lie in (0, 1)"));
    }
    if run.max_newton_iterations == 0 {
        return Err(invalid(format!("{ctx}.max_newton_iterations"), 0, "must be at least 1"));
    }
    positive(format!("{ctx}.newton_tolerance"), run.newton_tolerance)?;
    positive(format!("{ctx}.max_saturation_change"), run.max_saturation_change)?;
    if let Some(ooip) = run.ooip_stb {
        positive(format!("{ctx}.ooip_stb"), ooip)?;
    }
    Ok(())
}
