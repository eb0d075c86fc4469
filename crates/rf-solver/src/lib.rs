//! Nonlinear solvers for one reservoir timestep.
//!
//! The step executor only sees the [`NonlinearSolver`] trait. This crate also
//! ships the Newton kernel and a reference IMPES black-oil solver built on it.

pub mod error;
pub mod impes;
pub mod newton;
pub mod solver;
pub(crate) mod wells;

pub use error::{SolverError, SolverResult};
pub use impes::{ImpesConfig, ImpesSolver};
pub use newton::{Linearization, NewtonConfig, NewtonResult, newton_solve};
pub use solver::{NonlinearSolver, SolveOutcome, SolveRequest, WellRate};
