use rf_model::ModelError;
use thiserror::Error;

/// Why a solver could not advance the reservoir over one step.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SolverError {
    /// The request itself is unusable: mismatched cell counts, bad timestep.
    #[error("Cannot set up step: {what}")]
    ProblemSetup { what: String },

    #[error("Did not converge: {what}")]
    ConvergenceFailed { what: String },

    /// The converged fields cannot be turned into a physical state.
    #[error("Unphysical result: {what}")]
    InvalidState { what: String },

    #[error(transparent)]
    Model(#[from] ModelError),

    #[error("Numerical breakdown: {what}")]
    Numeric { what: String },
}

pub type SolverResult<T> = Result<T, SolverError>;
