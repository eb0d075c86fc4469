//! Persisted run records.

use chrono::{DateTime, Utc};
use rf_sim::RunStatus;
use serde::{Deserialize, Serialize};

use crate::aggregate::{FieldKpis, WellTotals};

pub type RunId = String;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunManifest {
    pub run_id: RunId,
    pub case_id: String,
    pub timestamp: DateTime<Utc>,
    pub engine_version: String,
    pub total_steps: usize,
    pub total_days: f64,
    /// The run continued from a checkpoint.
    #[serde(default)]
    pub resumed_from_step: Option<usize>,
}

/// Terminal status as stored in `summary.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RunStatusRecord {
    Completed {
        success_rate: f64,
        accepted: bool,
    },
    Aborted {
        reason: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        detail: Option<String>,
        step_index: usize,
        last_good_step: usize,
    },
    Stopped {
        next_step: usize,
    },
}

impl RunStatusRecord {
    pub fn is_completed(&self) -> bool {
        matches!(self, RunStatusRecord::Completed { .. })
    }
}

impl From<&RunStatus> for RunStatusRecord {
    fn from(status: &RunStatus) -> Self {
        match status {
            RunStatus::Completed {
                success_rate,
                accepted,
            } => RunStatusRecord::Completed {
                success_rate: *success_rate,
                accepted: *accepted,
            },
            RunStatus::Aborted {
                reason,
                step_index,
                last_good_step,
            } => RunStatusRecord::Aborted {
                reason: reason.to_string(),
                detail: reason.detail(),
                step_index: *step_index,
                last_good_step: *last_good_step,
            },
            RunStatus::Stopped { next_step } => RunStatusRecord::Stopped {
                next_step: *next_step,
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub status: RunStatusRecord,
    pub kpis: FieldKpis,
    #[serde(default)]
    pub wells: Vec<WellTotals>,
    pub checkpoints_written: usize,
    pub checkpoint_failures: usize,
    pub wall_time_s: f64,
}
