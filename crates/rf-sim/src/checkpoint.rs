//! Resumable run snapshots and the sink that persists them.

use std::sync::Arc;

use rf_model::ReservoirState;
use serde::{Deserialize, Serialize};

use crate::error::CheckpointError;
use crate::report::StepReport;

/// Accumulated run history up to and including `step_index`.
///
/// States are shared with the live run through `Arc`, so taking a snapshot
/// copies pointers, not cell arrays. A resumed run continues at
/// `step_index + 1`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Checkpoint {
    pub step_index: usize,
    pub convergence_failures: usize,
    pub elapsed_days: f64,
    /// Initial state followed by the state after every step.
    pub states: Vec<Arc<ReservoirState>>,
    pub reports: Vec<StepReport>,
}

impl Checkpoint {
    /// First step a resumed run executes.
    pub fn resume_step(&self) -> usize {
        self.step_index + 1
    }

    /// Check the history prefixes line up with `step_index`.
    pub fn check_consistency(&self) -> Result<(), String> {
        if self.reports.len() != self.step_index + 1 {
            return Err(format!(
                "expected {} step reports, found {}",
                self.step_index + 1,
                self.reports.len()
            ));
        }
        if self.states.len() != self.reports.len() + 1 {
            return Err(format!(
                "expected {} states, found {}",
                self.reports.len() + 1,
                self.states.len()
            ));
        }
        if let Some((i, _)) = self
            .reports
            .iter()
            .enumerate()
            .find(|(i, r)| r.step_index != *i)
        {
            return Err(format!("report {i} is out of order"));
        }
        let failures = self.reports.iter().filter(|r| !r.converged).count();
        if failures != self.convergence_failures {
            return Err(format!(
                "failure counter {} disagrees with {} failed reports",
                self.convergence_failures, failures
            ));
        }
        Ok(())
    }
}

/// Destination for periodic checkpoints.
///
/// Implementations must not mutate the snapshot. An error is reported to
/// the driver, which logs it and keeps running.
pub trait CheckpointSink {
    fn save(&mut self, checkpoint: &Checkpoint) -> Result<(), CheckpointError>;
}

/// Keeps every checkpoint in memory.
impl CheckpointSink for Vec<Checkpoint> {
    fn save(&mut self, checkpoint: &Checkpoint) -> Result<(), CheckpointError> {
        self.push(checkpoint.clone());
        Ok(())
    }
}
