use crate::RfError;

/// Floating point type used throughout system
pub type Real = f64;

/// Maximum allowed deviation of a cell's saturation sum from one.
pub const SATURATION_SUM_TOL: Real = 1e-6;

/// Allowed mismatch (days) between a built plan and the configured horizon.
pub const PLAN_DURATION_TOL_DAYS: Real = 1.0;

/// One tolerance for everything
#[derive(Clone, Copy, Debug)]
pub struct Tolerances {
    pub abs: Real,
    pub rel: Real,
}

impl Default for Tolerances {
    fn default() -> Self {
        Self {
            abs: 1e-12,
            rel: 1e-9,
        }
    }
}

pub fn nearly_equal(a: Real, b: Real, tol: Tolerances) -> bool {
    let diff = (a - b).abs();
    if diff <= tol.abs {
        return true;
    }
    diff <= tol.rel * a.abs().max(b.abs())
}

pub fn ensure_finite(v: Real, what: &'static str) -> Result<Real, RfError> {
    if v.is_finite() {
        Ok(v)
    } else {
        Err(RfError::NonFinite { what, value: v })
    }
}

/// Finite and strictly positive.
pub fn ensure_positive(v: Real, what: &'static str) -> Result<Real, RfError> {
    let v = ensure_finite(v, what)?;
    if v > 0.0 {
        Ok(v)
    } else {
        Err(RfError::NotPositive { what, value: v })
    }
}

/// Linear interpolation in a table with strictly increasing `xs`, clamped at both ends.
pub fn interp_clamped(xs: &[Real], ys: &[Real], x: Real) -> Real {
    debug_assert_eq!(xs.len(), ys.len());
    match xs.len() {
        0 => 0.0,
        1 => ys[0],
        n => {
            if x <= xs[0] {
                return ys[0];
            }
            if x >= xs[n - 1] {
                return ys[n - 1];
            }
            let hi = xs.partition_point(|&v| v <= x);
            let lo = hi - 1;
            let w = (x - xs[lo]) / (xs[hi] - xs[lo]);
            ys[lo] + w * (ys[hi] - ys[lo])
        }
    }
}
