//! Shared application service layer for resflow.
//!
//! Centralizes the work behind the CLI: loading and validating case files,
//! compiling a case into an engine model and timestep plan, running it with
//! checkpointing, caching and resume, and querying saved results.

pub mod case_compile;
pub mod error;
pub mod progress;
pub mod project_service;
pub mod query;
pub mod run_service;

pub use case_compile::{CompiledCase, compile_case};
pub use error::{AppError, AppResult};
pub use progress::{RunProgressEvent, RunStage, StepProgress};
pub use project_service::{CaseSummary, get_case, list_cases, load_project, validate_project};
pub use query::{
    PeriodTotals, Quantity, SeriesSummary, extract_series, get_series_summary, period_totals,
};
pub use run_service::{
    CheckpointMode, RunOptions, RunRequest, RunResponse, RunTimingSummary, ensure_run,
    ensure_run_with_progress, latest_checkpoint_step, list_runs, load_run,
};
