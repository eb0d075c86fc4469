//! Error types for timestep planning. All of them are build-time errors.

use rf_core::PeriodId;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ScheduleError {
    #[error("Invalid {segment} segment: {what}")]
    InvalidSegment { segment: String, what: &'static str },

    #[error("Phase boundary table is empty")]
    EmptyPhaseTable,

    #[error("Invalid phase boundary table: {what}")]
    InvalidPhaseTable { what: &'static str },

    #[error("Planned duration {planned} days differs from configured total {configured} days")]
    DurationMismatch { planned: f64, configured: f64 },

    #[error("Step {step_index} refers to control period {period} but only {available} are defined")]
    MissingControlPeriod {
        step_index: usize,
        period: PeriodId,
        available: usize,
    },

    #[error("Control period goes backward at step {step_index}")]
    NonMonotonicPeriods { step_index: usize },

    #[error("Invalid plan entry {step_index}: {what}")]
    InvalidEntry { step_index: usize, what: &'static str },

    #[error("Timestep plan has no entries")]
    EmptyPlan,
}

pub type ScheduleResult<T> = Result<T, ScheduleError>;
