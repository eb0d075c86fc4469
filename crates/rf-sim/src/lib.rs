//! Timestep execution for phased field-development runs.
//!
//! Provides:
//! - [`StepExecutor`]: one plan entry through the nonlinear solver, with
//!   physical validation and optional timestep cutting
//! - [`SimulationDriver`]: the step loop with bounded failure substitution,
//!   progress events, periodic checkpoints, cancellation and resume
//! - [`Checkpoint`] / [`CheckpointSink`]: the persistence contract

pub mod checkpoint;
pub mod driver;
pub mod error;
pub mod executor;
pub mod report;

pub use checkpoint::{Checkpoint, CheckpointSink};
pub use driver::{
    AbortReason, DriverConfig, RunHooks, RunOutcome, RunPhase, RunState, RunStatus,
    SimulationDriver,
};
pub use error::{
    CheckpointError, ConvergenceFailure, RunError, RunResult, StepError, ValidationFailure,
};
pub use executor::{CutbackPolicy, StepExecutor, StepOutput};
pub use report::{ProgressEvent, StepReport};
