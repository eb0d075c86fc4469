//! Per-step diagnostics and progress events.

use rf_core::PeriodId;
use rf_solver::WellRate;
use serde::{Deserialize, Serialize};

/// Diagnostics for one executed (or substituted) timestep.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepReport {
    pub step_index: usize,
    pub control_period_id: PeriodId,
    pub duration_days: f64,
    pub converged: bool,
    /// The previous state was carried forward because the step failed.
    pub substituted: bool,
    pub iteration_count: usize,
    pub cutbacks: usize,
    pub wall_time_s: f64,
    pub failure_reason: Option<String>,
    /// Per-well surface rates; empty for substituted steps.
    pub well_rates: Vec<WellRate>,
}

impl StepReport {
    /// Report for a failed step whose previous state was carried forward.
    pub fn substituted(
        step_index: usize,
        control_period_id: PeriodId,
        duration_days: f64,
        wall_time_s: f64,
        failure_reason: String,
    ) -> Self {
        Self {
            step_index,
            control_period_id,
            duration_days,
            converged: false,
            substituted: true,
            iteration_count: 0,
            cutbacks: 0,
            wall_time_s,
            failure_reason: Some(failure_reason),
            well_rates: Vec::new(),
        }
    }
}

/// Progress snapshot emitted every `report_frequency` steps.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProgressEvent {
    pub step_index: usize,
    pub total_steps: usize,
    pub control_period_id: PeriodId,
    pub elapsed_simulated_days: f64,
    pub wall_time_for_step_s: f64,
    pub iteration_count: usize,
    pub convergence_failures: usize,
}

impl ProgressEvent {
    /// Fraction of the plan completed after this step.
    pub fn fraction_complete(&self) -> f64 {
        if self.total_steps == 0 {
            1.0
        } else {
            (self.step_index + 1) as f64 / self.total_steps as f64
        }
    }
}
