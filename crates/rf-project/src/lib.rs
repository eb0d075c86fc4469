//! rf-project: the case file format for resflow and its validation.
//!
//! A project file holds one or more simulation cases. It is read as YAML or
//! JSON depending on its extension and always validated before it is handed
//! out or written back.

use std::path::Path;

pub mod schema;
pub mod validate;

pub use schema::*;
pub use validate::{ValidationError, validate_case, validate_project};

pub type ProjectResult<T> = Result<T, ProjectError>;

#[derive(thiserror::Error, Debug)]
pub enum ProjectError {
    #[error("Invalid project: {0}")]
    Validation(#[from] ValidationError),

    #[error("Cannot access project file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Malformed YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Malformed JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Unrecognised project file extension: {path}")]
    UnknownFormat { path: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaseFormat {
    Yaml,
    Json,
}

impl CaseFormat {
    pub fn from_path(path: &Path) -> ProjectResult<Self> {
        match path.extension().and_then(|e| e.to_str()) {
            Some("json") => Ok(Self::Json),
            Some("yaml" | "yml") => Ok(Self::Yaml),
            _ => Err(ProjectError::UnknownFormat {
                path: path.display().to_string(),
            }),
        }
    }
}

/// Parse and validate a project held in memory.
pub fn parse(content: &str, format: CaseFormat) -> ProjectResult<Project> {
    let project: Project = match format {
        CaseFormat::Yaml => serde_yaml::from_str(content)?,
        CaseFormat::Json => serde_json::from_str(content)?,
    };
    validate_project(&project)?;
    Ok(project)
}

pub fn load(path: &Path) -> ProjectResult<Project> {
    let format = CaseFormat::from_path(path)?;
    parse(&std::fs::read_to_string(path)?, format)
}

/// Validate, then write in the format implied by the extension.
/// Nothing is written when validation fails.
pub fn save(path: &Path, project: &Project) -> ProjectResult<()> {
    let format = CaseFormat::from_path(path)?;
    validate_project(project)?;
    let content = match format {
        CaseFormat::Yaml => serde_yaml::to_string(project)?,
        CaseFormat::Json => serde_json::to_string_pretty(project)?,
    };
    std::fs::write(path, content)?;
    Ok(())
}
