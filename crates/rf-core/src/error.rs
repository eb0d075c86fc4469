//! Numeric argument errors shared by the engine crates.

use thiserror::Error;

pub type RfResult<T> = Result<T, RfError>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum RfError {
    #[error("{what} is not finite: {value}")]
    NonFinite { what: &'static str, value: f64 },

    #[error("{what} must be positive, got {value}")]
    NotPositive { what: &'static str, value: f64 },
}
