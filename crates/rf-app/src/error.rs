//! Error types for the rf-app service layer.

use std::path::PathBuf;

/// Application error type that wraps errors from the engine crates
/// and gives the CLI one error surface.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Project error: {0}")]
    Project(String),

    #[error("Failed to read project file: {path}")]
    ProjectFileRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Case not found: {0}")]
    CaseNotFound(String),

    #[error("Case compilation failed: {0}")]
    Compile(String),

    #[error("Simulation error: {0}")]
    Simulation(String),

    #[error("Checkpoint error: {0}")]
    Checkpoint(String),

    #[error("Results error: {0}")]
    Results(String),

    #[error("Run not found: {0}")]
    RunNotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for rf-app operations.
pub type AppResult<T> = Result<T, AppError>;

impl From<rf_project::ProjectError> for AppError {
    fn from(err: rf_project::ProjectError) -> Self {
        AppError::Project(err.to_string())
    }
}

impl From<rf_model::ModelError> for AppError {
    fn from(err: rf_model::ModelError) -> Self {
        AppError::Compile(err.to_string())
    }
}

impl From<rf_schedule::ScheduleError> for AppError {
    fn from(err: rf_schedule::ScheduleError) -> Self {
        AppError::Compile(err.to_string())
    }
}

impl From<rf_sim::RunError> for AppError {
    fn from(err: rf_sim::RunError) -> Self {
        AppError::Simulation(err.to_string())
    }
}

impl From<rf_sim::CheckpointError> for AppError {
    fn from(err: rf_sim::CheckpointError) -> Self {
        AppError::Checkpoint(err.to_string())
    }
}

impl From<rf_results::ResultsError> for AppError {
    fn from(err: rf_results::ResultsError) -> Self {
        match err {
            rf_results::ResultsError::RunNotFound { run_id } => AppError::RunNotFound(run_id),
            other => AppError::Results(other.to_string()),
        }
    }
}
