//! Error types for step execution and simulation runs.

use std::fmt;

use rf_model::ModelError;
use rf_schedule::ScheduleError;
use rf_solver::SolverError;
use thiserror::Error;

/// The solver could not advance a step. Recoverable by substitution.
#[derive(Debug, Clone, PartialEq)]
pub struct ConvergenceFailure {
    pub step_index: usize,
    /// Cutback levels tried before giving up.
    pub cutbacks: usize,
    pub wall_time_s: f64,
    pub cause: SolverError,
}

impl fmt::Display for ConvergenceFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "step {} did not converge: {}", self.step_index, self.cause)
    }
}

/// The solver returned a non-physical state. Always fatal.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationFailure {
    pub step_index: usize,
    pub cell: Option<usize>,
    pub what: String,
}

impl fmt::Display for ValidationFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "step {} produced an invalid state: {}", self.step_index, self.what)
    }
}

/// Why a single step failed.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StepError {
    #[error("{0}")]
    Convergence(ConvergenceFailure),

    #[error("{0}")]
    Validation(ValidationFailure),
}

/// Errors that prevent a run from starting.
#[derive(Error, Debug)]
pub enum RunError {
    #[error("Invalid driver configuration: {what}")]
    InvalidConfig { what: &'static str },

    #[error("Schedule error: {0}")]
    Schedule(#[from] ScheduleError),

    #[error("Model error: {0}")]
    Model(#[from] ModelError),

    #[error("Invalid initial state: {what}")]
    InitialState { what: String },

    #[error("Checkpoint does not match this run: {what}")]
    CheckpointMismatch { what: String },

    #[error("Driver already used; create a new driver for each run")]
    NotIdle,
}

pub type RunResult<T> = Result<T, RunError>;

/// Errors raised while persisting or loading checkpoints.
#[derive(Error, Debug)]
pub enum CheckpointError {
    #[error("Checkpoint I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Checkpoint encoding error: {message}")]
    Encoding { message: String },

    #[error("Corrupt checkpoint {path}: {what}")]
    Corrupt { path: String, what: String },

    #[error("Unsupported checkpoint format version {found} (expected {expected})")]
    UnsupportedVersion { found: u32, expected: u32 },

    #[error("Checkpoint not found for step {step_index}")]
    NotFound { step_index: usize },

    #[error("Checkpoint writer stopped: {message}")]
    WriterStopped { message: String },
}
