//! Reference black-oil solver: implicit pressure, explicit saturation (IMPES).
//!
//! The pressure equation is a total-volume balance per cell:
//!
//! ```text
//! (PV_i(p_i) - PV_i(p_i^n)) / dt + sum_j T_ij * lambda_up * (p_i - p_j) + q_i = 0
//! ```
//!
//! with mobilities frozen at the old level and upwinded on the old pressure
//! field. Wells start on their configured control and switch to their limit
//! when the converged pressure violates it. Saturations are then updated
//! explicitly from the converged fluxes, and gas is liberated wherever the
//! pressure falls below the bubble point.

use nalgebra::{DMatrix, DVector};
use rf_model::{FluidModel, GAS, InjectedPhase, Model, OIL, ReservoirState, WATER, WellRole};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{SolverError, SolverResult};
use crate::newton::{Linearization, NewtonConfig, newton_solve};
use crate::solver::{NonlinearSolver, SolveOutcome, SolveRequest, WellRate};
use crate::wells::WellTerm;

/// IMPES solver configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImpesConfig {
    pub newton: NewtonConfig,
    /// Largest saturation change any cell may see in one step before the
    /// step is rejected as unstable.
    pub max_saturation_change: f64,
}

impl Default for ImpesConfig {
    fn default() -> Self {
        Self {
            newton: NewtonConfig::default(),
            max_saturation_change: 0.5,
        }
    }
}

/// Reference [`NonlinearSolver`] for black-oil models.
#[derive(Debug, Clone, Default)]
pub struct ImpesSolver {
    config: ImpesConfig,
}

impl ImpesSolver {
    pub fn new(config: ImpesConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ImpesConfig {
        &self.config
    }
}

/// Quantities frozen at the start of the step.
struct OldLevel {
    /// Reference pore volume.
    pv_ref: Vec<f64>,
    /// Pore volume at the old pressure.
    pv_old: Vec<f64>,
    lambda: Vec<[f64; 3]>,
    lambda_t: Vec<f64>,
    /// Upwind cell and `T * lambda_t(upwind)` per connection.
    upwind: Vec<(usize, f64)>,
}

impl OldLevel {
    fn new(model: &Model, state: &ReservoirState) -> Self {
        let fluid = model.fluid();
        let grid = model.grid();
        let p = state.pressure();

        let pv_ref: Vec<f64> = grid.cells().iter().map(|c| c.pore_volume).collect();
        let pv_old = pv_ref
            .iter()
            .zip(p)
            .map(|(pv, &p)| pv * fluid.pv_multiplier(p))
            .collect();
        let lambda: Vec<[f64; 3]> = state
            .saturations()
            .iter()
            .zip(p)
            .map(|(&s, &p)| fluid.mobilities(s, p))
            .collect();
        let lambda_t: Vec<f64> = lambda.iter().map(|l| l.iter().sum()).collect();
        let upwind = grid
            .connections()
            .iter()
            .map(|conn| {
                let (a, b) = (conn.a.slot(), conn.b.slot());
                let up = if p[a] >= p[b] { a } else { b };
                (up, conn.transmissibility * lambda_t[up])
            })
            .collect();

        Self {
            pv_ref,
            pv_old,
            lambda,
            lambda_t,
            upwind,
        }
    }

    fn fractional_flow(&self, cell: usize) -> [f64; 3] {
        let total = self.lambda_t[cell];
        if total > 0.0 {
            self.lambda[cell].map(|l| l / total)
        } else {
            [0.0; 3]
        }
    }
}

struct PressureSystem<'a> {
    model: &'a Model,
    old: &'a OldLevel,
    wells: &'a [WellTerm<'a>],
    dt: f64,
}

impl Linearization for PressureSystem<'_> {
    fn residual(&self, p: &DVector<f64>) -> DVector<f64> {
        let fluid = self.model.fluid();
        let mut r = DVector::zeros(p.len());
        for i in 0..p.len() {
            r[i] = (self.old.pv_ref[i] * fluid.pv_multiplier(p[i]) - self.old.pv_old[i]) / self.dt;
        }
        for (conn, &(_, t)) in self.model.grid().connections().iter().zip(&self.old.upwind) {
            let (a, b) = (conn.a.slot(), conn.b.slot());
            let flux = t * (p[a] - p[b]);
            r[a] += flux;
            r[b] -= flux;
        }
        for well in self.wells {
            for (cell, q, _) in well.completion_flows(p) {
                r[cell] += q;
            }
        }
        r
    }

    fn jacobian(&self, p: &DVector<f64>) -> DMatrix<f64> {
        let fluid = self.model.fluid();
        let n = p.len();
        let mut j = DMatrix::zeros(n, n);
        for i in 0..n {
            j[(i, i)] = self.old.pv_ref[i] * fluid.compressibility * fluid.pv_multiplier(p[i]) / self.dt;
        }
        for (conn, &(_, t)) in self.model.grid().connections().iter().zip(&self.old.upwind) {
            let (a, b) = (conn.a.slot(), conn.b.slot());
            j[(a, a)] += t;
            j[(b, b)] += t;
            j[(a, b)] -= t;
            j[(b, a)] -= t;
        }
        for well in self.wells {
            for (cell, _, dq) in well.completion_flows(p) {
                j[(cell, cell)] += dq;
            }
        }
        j
    }
}

impl NonlinearSolver for ImpesSolver {
    fn solve(&self, model: &Model, request: &SolveRequest<'_>) -> SolverResult<SolveOutcome> {
        let state = request.state;
        let dt = request.dt_days;
        if state.cell_count() != model.cell_count() {
            return Err(SolverError::ProblemSetup {
                what: format!(
                    "state has {} cells, model has {}",
                    state.cell_count(),
                    model.cell_count()
                ),
            });
        }
        if !dt.is_finite() || dt <= 0.0 {
            return Err(SolverError::ProblemSetup {
                what: format!("timestep must be positive, got {dt}"),
            });
        }

        let old = OldLevel::new(model, state);
        let mut wells: Vec<WellTerm<'_>> = request
            .wells
            .iter()
            .map(|w| WellTerm::new(w, &old.lambda_t))
            .collect();

        // Wells that cannot meet their target even at the old pressures start on their limit.
        let mut x = DVector::from_column_slice(state.pressure());
        enforce_limits(&mut wells, &x, request.step_index);

        let mut iterations = 0;
        let residual_norm = loop {
            let system = PressureSystem {
                model,
                old: &old,
                wells: &wells,
                dt,
            };
            let result = newton_solve(&system, x, &self.config.newton)?;
            iterations += result.iterations;
            x = result.x;

            if !enforce_limits(&mut wells, &x, request.step_index) {
                break result.residual_norm;
            }
        };

        let flows: Vec<Vec<(usize, f64, f64)>> =
            wells.iter().map(|w| w.completion_flows(&x)).collect();
        let (saturations, rs) = self.transport(model, &old, state, &x, &wells, &flows, dt)?;

        let well_rates = wells
            .iter()
            .zip(&flows)
            .map(|(term, flows)| surface_rates(model.fluid(), &old, state, &x, term, flows))
            .collect();

        debug!(
            step = request.step_index,
            iterations,
            residual_norm,
            "pressure solve converged"
        );

        let pressure: Vec<f64> = x.iter().copied().collect();
        Ok(SolveOutcome {
            state: ReservoirState::new(pressure, saturations, rs)?,
            iterations,
            residual_norm,
            well_rates,
        })
    }
}

impl ImpesSolver {
    #[allow(clippy::too_many_arguments)]
    fn transport(
        &self,
        model: &Model,
        old: &OldLevel,
        state: &ReservoirState,
        p: &DVector<f64>,
        wells: &[WellTerm<'_>],
        flows: &[Vec<(usize, f64, f64)>],
        dt: f64,
    ) -> SolverResult<(Vec<[f64; 3]>, Vec<f64>)> {
        let fluid = model.fluid();
        let n = state.cell_count();

        let mut volume: Vec<[f64; 3]> = state
            .saturations()
            .iter()
            .zip(&old.pv_old)
            .map(|(s, pv)| s.map(|s| s * pv))
            .collect();

        for (conn, &(up, t)) in model.grid().connections().iter().zip(&old.upwind) {
            let (a, b) = (conn.a.slot(), conn.b.slot());
            let moved = t * (p[a] - p[b]) * dt;
            let f = old.fractional_flow(up);
            for phase in 0..3 {
                volume[a][phase] -= moved * f[phase];
                volume[b][phase] += moved * f[phase];
            }
        }

        for (term, flows) in wells.iter().zip(flows) {
            for &(cell, q, _) in flows {
                let split = match term.well.role() {
                    WellRole::Producer => old.fractional_flow(cell),
                    WellRole::Injector { phase } => injected_split(phase),
                };
                for phase in 0..3 {
                    volume[cell][phase] -= q * dt * split[phase];
                }
            }
        }

        let mut saturations = Vec::with_capacity(n);
        let mut rs = Vec::with_capacity(n);
        for i in 0..n {
            let pv_new = old.pv_ref[i] * fluid.pv_multiplier(p[i]);
            let mut s = volume[i].map(|v| v / pv_new);
            if s.iter().any(|v| !v.is_finite()) {
                return Err(SolverError::InvalidState {
                    what: format!("non-finite saturation in cell {i}"),
                });
            }

            let old_s = state.saturations()[i];
            let change = (0..3)
                .map(|phase| (s[phase] - old_s[phase]).abs())
                .fold(0.0, f64::max);
            if change > self.config.max_saturation_change {
                return Err(SolverError::ConvergenceFailed {
                    what: format!(
                        "saturation change {change:.3} in cell {i} exceeds {}",
                        self.config.max_saturation_change
                    ),
                });
            }

            let rs_old = state.rs()[i];
            let rs_new = rs_old.min(fluid.oil.rs_sat(p[i]));
            if rs_new < rs_old {
                s[GAS] += (rs_old - rs_new) * s[OIL].max(0.0) / fluid.oil.bo(p[i]) * fluid.bg;
            }

            saturations.push(normalize(s).ok_or_else(|| SolverError::InvalidState {
                what: format!("cell {i} emptied of all phases"),
            })?);
            rs.push(rs_new);
        }
        Ok((saturations, rs))
    }
}

/// Returns true if any well switched control.
fn enforce_limits(wells: &mut [WellTerm<'_>], p: &DVector<f64>, step_index: usize) -> bool {
    let mut switched = false;
    for well in wells.iter_mut() {
        if well.enforce_limits(p) {
            debug!(
                step = step_index,
                well = well.well.name(),
                control = ?well.control,
                "well switched to its limit"
            );
            switched = true;
        }
    }
    switched
}

fn injected_split(phase: InjectedPhase) -> [f64; 3] {
    let mut split = [0.0; 3];
    match phase {
        InjectedPhase::Water => split[WATER] = 1.0,
        InjectedPhase::Gas => split[GAS] = 1.0,
    }
    split
}

/// Clamp negative saturations to zero and rescale to a unit sum.
fn normalize(s: [f64; 3]) -> Option<[f64; 3]> {
    let s = s.map(|v| v.max(0.0));
    let sum: f64 = s.iter().sum();
    (sum > 0.0).then(|| s.map(|v| v / sum))
}

fn surface_rates(
    fluid: &FluidModel,
    old: &OldLevel,
    state: &ReservoirState,
    p: &DVector<f64>,
    term: &WellTerm<'_>,
    flows: &[(usize, f64, f64)],
) -> WellRate {
    let (mut oil, mut water, mut gas) = (0.0, 0.0, 0.0);
    for &(cell, q, _) in flows {
        match term.well.role() {
            WellRole::Producer => {
                let f = old.fractional_flow(cell);
                let stock_tank_oil = q * f[OIL] / fluid.oil.bo(p[cell]);
                oil -= stock_tank_oil;
                water -= q * f[WATER] / fluid.bw;
                gas -= stock_tank_oil * state.rs()[cell] + q * f[GAS] / fluid.bg;
            }
            WellRole::Injector {
                phase: InjectedPhase::Water,
            } => water -= q / fluid.bw,
            WellRole::Injector {
                phase: InjectedPhase::Gas,
            } => gas -= q / fluid.bg,
        }
    }

    let bhp = term.bottom_hole_pressure(p);
    WellRate {
        well: term.well.name().to_string(),
        role: term.well.role(),
        oil,
        water,
        gas,
        bhp: if bhp.is_finite() {
            bhp
        } else {
            term.mean_completed_pressure(p)
        },
        on_constraint: term.on_constraint,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_clamps_and_rescales() {
        assert_eq!(normalize([0.5, -0.1, 0.5]), Some([0.5, 0.0, 0.5]));
        assert_eq!(normalize([0.0, -1.0, 0.0]), None);
    }

    #[test]
    fn injected_phase_split() {
        assert_eq!(injected_split(InjectedPhase::Water), [0.0, 1.0, 0.0]);
        assert_eq!(injected_split(InjectedPhase::Gas), [0.0, 0.0, 1.0]);
    }
}
