//! Model construction and validation errors.

use rf_core::{CellId, PeriodId, RfError};
use thiserror::Error;

pub type ModelResult<T> = Result<T, ModelError>;

/// Errors raised while building or checking a reservoir model.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ModelError {
    #[error("Model has no cells")]
    EmptyGrid,

    #[error("Invalid cell {cell}: {what}")]
    InvalidCell { cell: CellId, what: &'static str },

    #[error("Invalid connection #{index}: {what}")]
    InvalidConnection { index: usize, what: &'static str },

    #[error("Invalid fluid description: {what}")]
    InvalidFluid { what: &'static str },

    #[error("Invalid fluid description: {0}")]
    FluidValue(#[from] RfError),

    #[error("Invalid well '{well}': {what}")]
    InvalidWell { well: String, what: &'static str },

    #[error("Well '{well}' completion weights sum to {weights_sum}, expected well index {well_index}")]
    WellIndexMismatch {
        well: String,
        well_index: f64,
        weights_sum: f64,
    },

    #[error("Well '{well}' completes in cell {cell} but the grid has {cell_count} cells")]
    CompletionOutOfRange {
        well: String,
        cell: CellId,
        cell_count: usize,
    },

    #[error("Well '{well}' appears twice in control period {period}")]
    DuplicateWell { well: String, period: PeriodId },

    #[error("Model defines no control periods")]
    NoControlPeriods,

    #[error("State shape mismatch for {what}: expected {expected}, got {actual}")]
    StateShape {
        what: &'static str,
        expected: usize,
        actual: usize,
    },
}
