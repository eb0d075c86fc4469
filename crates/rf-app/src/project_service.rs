//! Project loading, saving, validation, and introspection.

use std::path::Path;

use rf_project::schema::{CaseDef, Project};

use crate::error::{AppError, AppResult};

/// Summary of a case for listing.
#[derive(Debug, Clone)]
pub struct CaseSummary {
    pub id: String,
    pub name: String,
    pub cell_count: usize,
    pub well_count: usize,
    pub phase_count: usize,
    pub total_days: f64,
}

/// Load and validate a project; YAML or JSON by extension.
pub fn load_project(path: &Path) -> AppResult<Project> {
    if !path.exists() {
        return Err(AppError::ProjectFileRead {
            path: path.to_path_buf(),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "no such file"),
        });
    }
    Ok(rf_project::load(path)?)
}

pub fn validate_project(project: &Project) -> AppResult<()> {
    if project.cases.is_empty() {
        return Err(AppError::Project(
            "Project must have at least one case".to_string(),
        ));
    }
    Ok(rf_project::validate_project(project).map_err(rf_project::ProjectError::from)?)
}

/// List all cases in the project with summaries.
pub fn list_cases(project: &Project) -> Vec<CaseSummary> {
    project
        .cases
        .iter()
        .map(|case| CaseSummary {
            id: case.id.clone(),
            name: case.name.clone(),
            cell_count: case.grid.cell_count(),
            well_count: case.wells.len(),
            phase_count: case.phases.len(),
            total_days: case.schedule.total_duration_days,
        })
        .collect()
}

pub fn get_case<'a>(project: &'a Project, case_id: &str) -> AppResult<&'a CaseDef> {
    project
        .case(case_id)
        .ok_or_else(|| AppError::CaseNotFound(case_id.to_string()))
}
