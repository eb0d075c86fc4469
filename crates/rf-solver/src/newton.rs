//! Damped Newton iteration for the cell pressure system.

use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};

use crate::error::{SolverError, SolverResult};

/// A nonlinear system `R(p) = 0` that can be linearised around any pressure field.
pub trait Linearization {
    fn residual(&self, p: &DVector<f64>) -> DVector<f64>;

    fn jacobian(&self, p: &DVector<f64>) -> DMatrix<f64>;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NewtonConfig {
    pub max_iterations: usize,
    /// Converged once the residual 2-norm drops below this.
    pub tolerance: f64,
    /// Or once it drops below this fraction of the initial residual.
    pub relative_tolerance: f64,
    /// Lowest pressure any iterate may reach (psia).
    pub min_pressure: f64,
    /// Largest pressure change applied to any cell in one update (psi).
    pub max_pressure_change: f64,
    /// Damping applied each time a trial update is rejected.
    pub backtrack_factor: f64,
    pub max_backtracks: usize,
}

impl Default for NewtonConfig {
    fn default() -> Self {
        Self {
            max_iterations: 25,
            tolerance: 1e-6,
            relative_tolerance: 1e-10,
            min_pressure: 1.0,
            max_pressure_change: 1000.0,
            backtrack_factor: 0.5,
            max_backtracks: 20,
        }
    }
}

#[derive(Debug, Clone)]
pub struct NewtonResult {
    pub x: DVector<f64>,
    pub residual_norm: f64,
    /// Number of accepted updates.
    pub iterations: usize,
}

/// Solve `system` starting from `p0`.
///
/// Each update is first chopped so no cell moves by more than
/// `max_pressure_change`, then damped until the trial field stays above
/// `min_pressure` and reduces the residual. An update that cannot be damped
/// into acceptance, or an exhausted iteration budget, is a convergence failure.
pub fn newton_solve<S>(system: &S, p0: DVector<f64>, config: &NewtonConfig) -> SolverResult<NewtonResult>
where
    S: Linearization + ?Sized,
{
    let mut p = p0;
    let mut r = system.residual(&p);
    let mut r_norm = r.norm();
    let target = config.tolerance.max(config.relative_tolerance * r_norm);

    for iter in 0..config.max_iterations {
        if !r_norm.is_finite() {
            return Err(SolverError::Numeric {
                what: format!("residual became non-finite at iteration {iter}"),
            });
        }
        if r_norm < target {
            return Ok(NewtonResult {
                x: p,
                residual_norm: r_norm,
                iterations: iter,
            });
        }

        let mut dp = system
            .jacobian(&p)
            .lu()
            .solve(&(-&r))
            .ok_or_else(|| SolverError::Numeric {
                what: format!("singular pressure Jacobian at iteration {iter}"),
            })?;
        let largest = dp.amax();
        if largest > config.max_pressure_change {
            dp *= config.max_pressure_change / largest;
        }

        let mut damping = 1.0;
        let mut accepted = None;
        for _ in 0..=config.max_backtracks {
            let trial = &p + damping * &dp;
            if trial.iter().all(|v| v.is_finite() && *v >= config.min_pressure) {
                let r_trial = system.residual(&trial);
                let trial_norm = r_trial.norm();
                if trial_norm < r_norm {
                    accepted = Some((trial, r_trial, trial_norm));
                    break;
                }
            }
            damping *= config.backtrack_factor;
        }

        let Some((p_next, r_next, norm_next)) = accepted else {
            return Err(SolverError::ConvergenceFailed {
                what: format!("no acceptable update at iteration {iter} (residual {r_norm:e})"),
            });
        };
        tracing::trace!(iter, damping, residual = norm_next, "pressure update");

        p = p_next;
        r = r_next;
        r_norm = norm_next;
    }

    if r_norm < target {
        Ok(NewtonResult {
            x: p,
            residual_norm: r_norm,
            iterations: config.max_iterations,
        })
    } else {
        Err(SolverError::ConvergenceFailed {
            what: format!(
                "residual {r_norm:e} above tolerance after {} iterations",
                config.max_iterations
            ),
        })
    }
}
