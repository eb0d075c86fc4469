//! Development phase boundaries: a monotonic step function from elapsed days to phase id.

use rf_core::PeriodId;
use serde::{Deserialize, Serialize};

use crate::error::{ScheduleError, ScheduleResult};

/// Start of a development phase.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PhaseBoundary {
    pub start_day: f64,
    pub period: PeriodId,
}

/// Ordered phase boundaries.
///
/// The first phase starts at day 0, start days strictly increase, and period
/// ids run 1..N without gaps.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PhaseBoundaryTable {
    rows: Vec<PhaseBoundary>,
}

impl PhaseBoundaryTable {
    pub fn new(rows: Vec<PhaseBoundary>) -> ScheduleResult<Self> {
        let first = rows.first().ok_or(ScheduleError::EmptyPhaseTable)?;
        if first.start_day != 0.0 {
            return Err(ScheduleError::InvalidPhaseTable {
                what: "first phase must start at day 0",
            });
        }
        if first.period != PeriodId::FIRST {
            return Err(ScheduleError::InvalidPhaseTable {
                what: "first phase must be period 1",
            });
        }
        for pair in rows.windows(2) {
            if !pair[1].start_day.is_finite() || pair[1].start_day <= pair[0].start_day {
                return Err(ScheduleError::InvalidPhaseTable {
                    what: "phase start days must be strictly increasing",
                });
            }
            if pair[1].period != pair[0].period.next() {
                return Err(ScheduleError::InvalidPhaseTable {
                    what: "period ids must increase by one",
                });
            }
        }
        Ok(Self { rows })
    }

    /// Phases numbered 1..N in the order of `start_days`.
    pub fn from_start_days(start_days: &[f64]) -> ScheduleResult<Self> {
        let mut rows = Vec::with_capacity(start_days.len());
        let mut period = PeriodId::FIRST;
        for &start_day in start_days {
            rows.push(PhaseBoundary { start_day, period });
            period = period.next();
        }
        Self::new(rows)
    }

    /// A single phase covering the whole horizon.
    pub fn single() -> Self {
        Self {
            rows: vec![PhaseBoundary {
                start_day: 0.0,
                period: PeriodId::FIRST,
            }],
        }
    }

    pub fn rows(&self) -> &[PhaseBoundary] {
        &self.rows
    }

    pub fn phase_count(&self) -> usize {
        self.rows.len()
    }

    pub fn last_period(&self) -> PeriodId {
        self.rows
            .last()
            .map(|r| r.period)
            .unwrap_or(PeriodId::FIRST)
    }

    /// Phase active at `elapsed_days`; clamped to the last phase past the last boundary
    /// and to the first phase for negative input.
    pub fn period_at(&self, elapsed_days: f64) -> PeriodId {
        let idx = self.rows.partition_point(|r| r.start_day <= elapsed_days);
        if idx == 0 {
            PeriodId::FIRST
        } else {
            self.rows[idx - 1].period
        }
    }
}
