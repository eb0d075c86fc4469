//! Well controls.

use rf_core::{CellId, Real, Tolerances, nearly_equal};
use serde::{Deserialize, Serialize};

use crate::error::{ModelError, ModelResult};

/// Whether a well withdraws or injects fluid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WellRole {
    Producer,
    Injector { phase: InjectedPhase },
}

/// Phase pushed into the reservoir by an injector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InjectedPhase {
    Water,
    Gas,
}

/// What the well's target value means.
///
/// - `Rate`: target is a reservoir-volume rate; bounds are the allowed BHP window.
/// - `Bhp`: target is a bottom-hole pressure; bounds are the allowed rate window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ControlMode {
    Rate,
    Bhp,
}

/// One perforated cell and its share of the well index.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Completion {
    pub cell: CellId,
    pub weight: Real,
}

impl Completion {
    pub fn new(cell: CellId, weight: Real) -> Self {
        Self { cell, weight }
    }
}

/// Control of a single well during one control period.
///
/// Built once through [`WellControl::new`] and read-only afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct WellControl {
    name: String,
    role: WellRole,
    mode: ControlMode,
    target: Real,
    lower: Real,
    upper: Real,
    well_index: Real,
    completions: Vec<Completion>,
}

impl WellControl {
    /// Validate and build a well control.
    ///
    /// The completion weights must sum to `well_index`.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        name: impl Into<String>,
        role: WellRole,
        mode: ControlMode,
        target: Real,
        bounds: (Real, Real),
        well_index: Real,
        completions: Vec<Completion>,
    ) -> ModelResult<Self> {
        let name = name.into();
        let invalid = |what| ModelError::InvalidWell {
            well: name.clone(),
            what,
        };

        if name.trim().is_empty() {
            return Err(invalid("name must not be empty"));
        }
        if !target.is_finite() || target < 0.0 {
            return Err(invalid("target must be finite and non-negative"));
        }
        if mode == ControlMode::Bhp && target <= 0.0 {
            return Err(invalid("BHP target must be positive"));
        }
        let (lower, upper) = bounds;
        if !lower.is_finite() || !upper.is_finite() || lower < 0.0 || lower > upper {
            return Err(invalid("bounds must satisfy 0 <= lower <= upper"));
        }
        if !well_index.is_finite() || well_index <= 0.0 {
            return Err(invalid("well index must be positive"));
        }
        if completions.is_empty() {
            return Err(invalid("at least one completion is required"));
        }
        if completions
            .iter()
            .any(|c| !c.weight.is_finite() || c.weight <= 0.0)
        {
            return Err(invalid("completion weights must be positive"));
        }

        let weights_sum: Real = completions.iter().map(|c| c.weight).sum();
        if !nearly_equal(weights_sum, well_index, Tolerances::default()) {
            return Err(ModelError::WellIndexMismatch {
                well: name,
                well_index,
                weights_sum,
            });
        }

        Ok(Self {
            name,
            role,
            mode,
            target,
            lower,
            upper,
            well_index,
            completions,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn role(&self) -> WellRole {
        self.role
    }

    pub fn is_producer(&self) -> bool {
        matches!(self.role, WellRole::Producer)
    }

    pub fn mode(&self) -> ControlMode {
        self.mode
    }

    pub fn target(&self) -> Real {
        self.target
    }

    /// Lower bound (BHP for rate control, rate for BHP control).
    pub fn lower(&self) -> Real {
        self.lower
    }

    /// Upper bound (BHP for rate control, rate for BHP control).
    pub fn upper(&self) -> Real {
        self.upper
    }

    /// Total well index (sum of completion weights).
    pub fn well_index(&self) -> Real {
        self.well_index
    }

    pub fn completions(&self) -> &[Completion] {
        &self.completions
    }

    /// Fraction of the well's flow assigned to each completion.
    pub fn completion_fractions(&self) -> impl Iterator<Item = (CellId, Real)> + '_ {
        self.completions
            .iter()
            .map(|c| (c.cell, c.weight / self.well_index))
    }
}
