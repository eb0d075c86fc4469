//! Reservoir state: per-cell pressure, phase saturations and solution GOR.

use std::fmt;

use rf_core::Real;
use serde::{Deserialize, Serialize};

use crate::error::{ModelError, ModelResult};

/// Saturation slot of the oil phase.
pub const OIL: usize = 0;
/// Saturation slot of the water phase.
pub const WATER: usize = 1;
/// Saturation slot of the gas phase.
pub const GAS: usize = 2;

/// Snapshot of the reservoir at one instant.
///
/// Created by the solver from the previous state and never mutated once it
/// is stored in a run history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReservoirState {
    pressure: Vec<Real>,
    saturations: Vec<[Real; 3]>,
    rs: Vec<Real>,
}

impl ReservoirState {
    /// Build a state from per-cell arrays of equal length.
    pub fn new(pressure: Vec<Real>, saturations: Vec<[Real; 3]>, rs: Vec<Real>) -> ModelResult<Self> {
        let n = pressure.len();
        if saturations.len() != n {
            return Err(ModelError::StateShape {
                what: "saturations",
                expected: n,
                actual: saturations.len(),
            });
        }
        if rs.len() != n {
            return Err(ModelError::StateShape {
                what: "solution GOR",
                expected: n,
                actual: rs.len(),
            });
        }
        Ok(Self {
            pressure,
            saturations,
            rs,
        })
    }

    /// Same pressure, saturations and GOR in every cell.
    pub fn uniform(cell_count: usize, pressure: Real, saturation: [Real; 3], rs: Real) -> Self {
        Self {
            pressure: vec![pressure; cell_count],
            saturations: vec![saturation; cell_count],
            rs: vec![rs; cell_count],
        }
    }

    pub fn cell_count(&self) -> usize {
        self.pressure.len()
    }

    pub fn pressure(&self) -> &[Real] {
        &self.pressure
    }

    pub fn saturations(&self) -> &[[Real; 3]] {
        &self.saturations
    }

    pub fn rs(&self) -> &[Real] {
        &self.rs
    }

    /// Check every cell against the physical-validity policy:
    /// finite values, pressure strictly positive, saturations summing to one
    /// within `saturation_tol`.
    ///
    /// Returns the first offending cell.
    pub fn check_physical(&self, saturation_tol: Real) -> Result<(), StateViolation> {
        for (cell, ((&p, s), &rs)) in self
            .pressure
            .iter()
            .zip(&self.saturations)
            .zip(&self.rs)
            .enumerate()
        {
            if !p.is_finite() || !rs.is_finite() || s.iter().any(|v| !v.is_finite()) {
                return Err(StateViolation {
                    cell,
                    kind: ViolationKind::NonFinite,
                });
            }
            if p <= 0.0 {
                return Err(StateViolation {
                    cell,
                    kind: ViolationKind::NonPositivePressure { pressure: p },
                });
            }
            let sum = s[OIL] + s[WATER] + s[GAS];
            if (sum - 1.0).abs() > saturation_tol {
                return Err(StateViolation {
                    cell,
                    kind: ViolationKind::SaturationSum { sum },
                });
            }
        }
        Ok(())
    }
}

/// A cell that breaks the physical-validity policy.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StateViolation {
    pub cell: usize,
    pub kind: ViolationKind,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ViolationKind {
    NonFinite,
    NonPositivePressure { pressure: Real },
    SaturationSum { sum: Real },
}

impl fmt::Display for StateViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            ViolationKind::NonFinite => write!(f, "cell {} holds a non-finite value", self.cell),
            ViolationKind::NonPositivePressure { pressure } => {
                write!(f, "cell {} has non-positive pressure {}", self.cell, pressure)
            }
            ViolationKind::SaturationSum { sum } => {
                write!(f, "cell {} saturations sum to {}", self.cell, sum)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_rejects_mismatched_lengths() {
        let err = ReservoirState::new(vec![1.0, 2.0], vec![[1.0, 0.0, 0.0]], vec![0.0, 0.0])
            .unwrap_err();
        assert!(matches!(err, ModelError::StateShape { what: "saturations", .. }));
    }

    #[test]
    fn uniform_state_is_physical() {
        let state = ReservoirState::uniform(4, 3000.0, [0.8, 0.2, 0.0], 0.5);
        assert_eq!(state.cell_count(), 4);
        assert!(state.check_physical(1e-6).is_ok());
    }

    #[test]
    fn detects_saturation_sum_violation() {
        let state = ReservoirState::new(
            vec![3000.0, 3000.0],
            vec![[0.8, 0.2, 0.0], [0.8, 0.2, 0.01]],
            vec![0.5, 0.5],
        )
        .unwrap();
        let violation = state.check_physical(1e-6).unwrap_err();
        assert_eq!(violation.cell, 1);
        assert!(matches!(violation.kind, ViolationKind::SaturationSum { .. }));
    }

    #[test]
    fn detects_non_positive_pressure() {
        let state = ReservoirState::uniform(2, 0.0, [1.0, 0.0, 0.0], 0.0);
        let violation = state.check_physical(1e-6).unwrap_err();
        assert_eq!(violation.cell, 0);
        assert!(violation.to_string().contains("non-positive pressure"));
    }

    #[test]
    fn tiny_saturation_error_is_tolerated() {
        let state = ReservoirState::uniform(1, 100.0, [0.7, 0.3 + 5e-7, 0.0], 0.0);
        assert!(state.check_physical(1e-6).is_ok());
    }
}
