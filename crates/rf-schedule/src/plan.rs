//! The timestep plan and control-period resolution.

use rf_core::{PLAN_DURATION_TOL_DAYS, PeriodId};
use serde::{Deserialize, Serialize};

use crate::error::{ScheduleError, ScheduleResult};
use crate::phases::PhaseBoundaryTable;
use crate::segment::SegmentConfig;

/// One timestep: how long it lasts and which development phase applies.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimestepPlanEntry {
    pub duration_days: f64,
    pub control_period_id: PeriodId,
}

/// Ordered, immutable timestep sequence covering the whole simulation horizon.
///
/// Cumulative elapsed days and control-period ids are precomputed at build
/// time, so every per-step query is O(1).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimestepPlan {
    entries: Vec<TimestepPlanEntry>,
    /// `end_days[i]` is the elapsed time at the end of step `i`.
    end_days: Vec<f64>,
}

impl TimestepPlan {
    /// Build a plan from segment configuration and the phase boundary table.
    ///
    /// Each entry's period is the phase active at the entry's midpoint.
    pub fn build(config: &SegmentConfig, phases: &PhaseBoundaryTable) -> ScheduleResult<Self> {
        config.validate()?;

        let mut entries = Vec::new();
        let mut elapsed = 0.0;
        for segment in config.segments() {
            for duration_days in segment.step_durations() {
                let midpoint = elapsed + 0.5 * duration_days;
                entries.push(TimestepPlanEntry {
                    duration_days,
                    control_period_id: phases.period_at(midpoint),
                });
                elapsed += duration_days;
            }
        }

        let plan = Self::from_entries(entries, config.total_duration_days)?;
        tracing::debug!(
            steps = plan.len(),
            total_days = plan.total_days(),
            phases = phases.phase_count(),
            "built timestep plan"
        );
        Ok(plan)
    }

    /// Accept a plan produced elsewhere, checking the same invariants as [`TimestepPlan::build`].
    pub fn from_entries(
        entries: Vec<TimestepPlanEntry>,
        total_duration_days: f64,
    ) -> ScheduleResult<Self> {
        if entries.is_empty() {
            return Err(ScheduleError::EmptyPlan);
        }

        let mut end_days = Vec::with_capacity(entries.len());
        let mut elapsed = 0.0;
        for (step_index, entry) in entries.iter().enumerate() {
            if !entry.duration_days.is_finite() || entry.duration_days <= 0.0 {
                return Err(ScheduleError::InvalidEntry {
                    step_index,
                    what: "duration must be positive",
                });
            }
            if step_index > 0 && entry.control_period_id < entries[step_index - 1].control_period_id {
                return Err(ScheduleError::NonMonotonicPeriods { step_index });
            }
            elapsed += entry.duration_days;
            end_days.push(elapsed);
        }

        if (elapsed - total_duration_days).abs() > PLAN_DURATION_TOL_DAYS {
            return Err(ScheduleError::DurationMismatch {
                planned: elapsed,
                configured: total_duration_days,
            });
        }

        Ok(Self { entries, end_days })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[TimestepPlanEntry] {
        &self.entries
    }

    pub fn entry(&self, step_index: usize) -> Option<&TimestepPlanEntry> {
        self.entries.get(step_index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &TimestepPlanEntry> {
        self.entries.iter()
    }

    /// Control period active during `step_index`.
    pub fn resolve(&self, step_index: usize) -> Option<PeriodId> {
        self.entries.get(step_index).map(|e| e.control_period_id)
    }

    /// Elapsed days when `step_index` begins.
    pub fn start_day(&self, step_index: usize) -> f64 {
        match step_index {
            0 => 0.0,
            i => self.end_days.get(i - 1).copied().unwrap_or_else(|| self.total_days()),
        }
    }

    /// Elapsed days when `step_index` ends.
    pub fn end_day(&self, step_index: usize) -> f64 {
        self.end_days
            .get(step_index)
            .copied()
            .unwrap_or_else(|| self.total_days())
    }

    pub fn total_days(&self) -> f64 {
        self.end_days.last().copied().unwrap_or(0.0)
    }

    /// Highest period id referenced by any step.
    pub fn last_period(&self) -> Option<PeriodId> {
        self.entries.last().map(|e| e.control_period_id)
    }

    /// Fail if any step refers to a period beyond `available`.
    pub fn check_periods(&self, available: usize) -> ScheduleResult<()> {
        match self
            .entries
            .iter()
            .position(|e| e.control_period_id.position() >= available)
        {
            Some(step_index) => Err(ScheduleError::MissingControlPeriod {
                step_index,
                period: self.entries[step_index].control_period_id,
                available,
            }),
            None => Ok(()),
        }
    }

    /// `(period, first_step, last_step)` for every period that owns at least one step.
    pub fn period_spans(&self) -> Vec<(PeriodId, usize, usize)> {
        let mut spans: Vec<(PeriodId, usize, usize)> = Vec::new();
        for (i, entry) in self.entries.iter().enumerate() {
            match spans.last_mut() {
                Some(span) if span.0 == entry.control_period_id => span.2 = i,
                _ => spans.push((entry.control_period_id, i, i)),
            }
        }
        spans
    }
}
