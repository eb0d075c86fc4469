//! Timestep segment configuration.

use serde::{Deserialize, Serialize};

use crate::error::{ScheduleError, ScheduleResult};

/// Upper bound on the steps a single segment may expand to.
pub const MAX_STEPS_PER_SEGMENT: usize = 1_000_000;

/// A span of simulated time advanced with a fixed nominal timestep.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimestepSegment {
    pub duration_days: f64,
    pub timestep_days: f64,
}

impl TimestepSegment {
    pub fn new(duration_days: f64, timestep_days: f64) -> Self {
        Self {
            duration_days,
            timestep_days,
        }
    }

    fn validate(&self, label: &str) -> ScheduleResult<()> {
        let invalid = |what| ScheduleError::InvalidSegment {
            segment: label.to_string(),
            what,
        };
        if !self.duration_days.is_finite() || self.duration_days <= 0.0 {
            return Err(invalid("duration_days must be positive"));
        }
        if !self.timestep_days.is_finite() || self.timestep_days <= 0.0 {
            return Err(invalid("timestep_days must be positive"));
        }
        if self.duration_days / self.timestep_days > MAX_STEPS_PER_SEGMENT as f64 {
            return Err(invalid("segment expands to too many steps"));
        }
        Ok(())
    }

    /// Step durations for this segment.
    ///
    /// Emits `ceil(duration / timestep)` steps; the last one is truncated so the
    /// segment ends exactly at `duration_days`.
    pub fn step_durations(&self) -> Vec<f64> {
        // Absorb float noise in ratios such as 0.3 / 0.1.
        let ratio = self.duration_days / self.timestep_days;
        let count = ((ratio - 1e-9).ceil() as usize).max(1);

        let mut steps = vec![self.timestep_days; count - 1];
        let used = self.timestep_days * (count - 1) as f64;
        steps.push(self.duration_days - used);
        steps
    }
}

/// History + forecast segments and the configured simulation horizon.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmentConfig {
    pub history: TimestepSegment,
    #[serde(default)]
    pub forecast: Vec<TimestepSegment>,
    pub total_duration_days: f64,
}

impl SegmentConfig {
    pub fn validate(&self) -> ScheduleResult<()> {
        self.history.validate("history")?;
        for (i, segment) in self.forecast.iter().enumerate() {
            segment.validate(&format!("forecast[{i}]"))?;
        }
        if !self.total_duration_days.is_finite() || self.total_duration_days <= 0.0 {
            return Err(ScheduleError::InvalidSegment {
                segment: "total".to_string(),
                what: "total_duration_days must be positive",
            });
        }
        Ok(())
    }

    /// Segments in declared order: history first.
    pub fn segments(&self) -> impl Iterator<Item = &TimestepSegment> {
        std::iter::once(&self.history).chain(self.forecast.iter())
    }
}
