//! rf-results: checkpoints, field results and the run cache.

pub mod aggregate;
mod atomic;
pub mod background;
pub mod checkpoint_store;
pub mod hash;
pub mod store;
pub mod types;

pub use aggregate::{FieldKpis, FieldResults, StepRates, WellTotals, aggregate};
pub use background::BackgroundCheckpointer;
pub use checkpoint_store::{CHECKPOINT_FORMAT_VERSION, CheckpointStore};
pub use hash::compute_run_id;
pub use store::RunStore;
pub use types::*;

pub type ResultsResult<T> = Result<T, ResultsError>;

#[derive(thiserror::Error, Debug)]
pub enum ResultsError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Run not found: {run_id}")]
    RunNotFound { run_id: String },

    #[error("Invalid path: {message}")]
    InvalidPath { message: String },

    #[error("OOIP must be positive, got {ooip}")]
    InvalidOoip { ooip: f64 },

    #[error("Run history is inconsistent: {what}")]
    InconsistentHistory { what: String },

    #[error("Checkpoint error: {0}")]
    Checkpoint(#[from] rf_sim::CheckpointError),
}
