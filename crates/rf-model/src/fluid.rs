//! Fluid description: black-oil PVT table, water/gas constants, relative permeability.

use rf_core::{Real, ensure_finite, ensure_positive, interp_clamped};

use crate::error::{ModelError, ModelResult};

/// Saturated oil PVT table, tabulated against pressure.
#[derive(Debug, Clone, PartialEq)]
pub struct PvtTable {
    pressure: Vec<Real>,
    bo: Vec<Real>,
    rs: Vec<Real>,
    mu_o: Vec<Real>,
}

impl PvtTable {
    /// Build a table; pressures must be strictly increasing and every value positive
    /// (solution GOR may be zero).
    pub fn new(pressure: Vec<Real>, bo: Vec<Real>, rs: Vec<Real>, mu_o: Vec<Real>) -> ModelResult<Self> {
        let n = pressure.len();
        if n == 0 {
            return Err(ModelError::InvalidFluid {
                what: "PVT table is empty",
            });
        }
        if bo.len() != n || rs.len() != n || mu_o.len() != n {
            return Err(ModelError::InvalidFluid {
                what: "PVT columns differ in length",
            });
        }
        if pressure.windows(2).any(|w| w[1] <= w[0]) {
            return Err(ModelError::InvalidFluid {
                what: "PVT pressures must be strictly increasing",
            });
        }
        let positive = |v: &[Real]| v.iter().all(|x| x.is_finite() && *x > 0.0);
        if !positive(&pressure) || !positive(&bo) || !positive(&mu_o) {
            return Err(ModelError::InvalidFluid {
                what: "PVT pressure, Bo and viscosity must be positive",
            });
        }
        if rs.iter().any(|x| !x.is_finite() || *x < 0.0) {
            return Err(ModelError::InvalidFluid {
                what: "PVT solution GOR must be non-negative",
            });
        }
        Ok(Self {
            pressure,
            bo,
            rs,
            mu_o,
        })
    }

    /// Oil formation volume factor.
    pub fn bo(&self, p: Real) -> Real {
        interp_clamped(&self.pressure, &self.bo, p)
    }

    /// Saturated solution gas-oil ratio.
    pub fn rs_sat(&self, p: Real) -> Real {
        interp_clamped(&self.pressure, &self.rs, p)
    }

    /// Oil viscosity.
    pub fn mu_o(&self, p: Real) -> Real {
        interp_clamped(&self.pressure, &self.mu_o, p)
    }
}

/// Corey-type relative permeability.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RelPerm {
    /// Connate water saturation.
    pub swc: Real,
    /// Residual oil saturation.
    pub sor: Real,
    pub n_oil: Real,
    pub n_water: Real,
    pub n_gas: Real,
}

impl RelPerm {
    fn movable(&self) -> Real {
        (1.0 - self.swc - self.sor).max(1e-12)
    }

    pub fn krw(&self, sw: Real) -> Real {
        ((sw - self.swc) / self.movable()).clamp(0.0, 1.0).powf(self.n_water)
    }

    pub fn kro(&self, so: Real) -> Real {
        ((so - self.sor) / self.movable()).clamp(0.0, 1.0).powf(self.n_oil)
    }

    pub fn krg(&self, sg: Real) -> Real {
        sg.clamp(0.0, 1.0).powf(self.n_gas)
    }
}

/// Everything the solver needs to know about the fluids.
#[derive(Debug, Clone, PartialEq)]
pub struct FluidModel {
    pub oil: PvtTable,
    pub bw: Real,
    pub mu_w: Real,
    pub bg: Real,
    pub mu_g: Real,
    /// Total (rock + fluid) compressibility used for pore volume.
    pub compressibility: Real,
    /// Pressure at which rock pore volumes are quoted.
    pub reference_pressure: Real,
    pub relperm: RelPerm,
}

impl FluidModel {
    /// A light black oil with a 2500 psi bubble point, used by examples and tests.
    pub fn black_oil_default() -> Self {
        Self {
            oil: PvtTable {
                pressure: vec![14.7, 1000.0, 2500.0, 5000.0],
                bo: vec![1.05, 1.15, 1.25, 1.23],
                rs: vec![0.0, 0.25, 0.55, 0.55],
                mu_o: vec![2.5, 1.6, 1.2, 1.3],
            },
            bw: 1.01,
            mu_w: 0.5,
            bg: 0.005,
            mu_g: 0.02,
            compressibility: 1.0e-5,
            reference_pressure: 3000.0,
            relperm: RelPerm {
                swc: 0.2,
                sor: 0.2,
                n_oil: 2.0,
                n_water: 2.0,
                n_gas: 2.0,
            },
        }
    }

    /// Pore volume multiplier at pressure `p`.
    pub fn pv_multiplier(&self, p: Real) -> Real {
        (self.compressibility * (p - self.reference_pressure)).exp()
    }

    /// Phase mobilities `[oil, water, gas]` for saturation `s` at pressure `p`.
    pub fn mobilities(&self, s: [Real; 3], p: Real) -> [Real; 3] {
        [
            self.relperm.kro(s[0]) / self.oil.mu_o(p),
            self.relperm.krw(s[1]) / self.mu_w,
            self.relperm.krg(s[2]) / self.mu_g,
        ]
    }

    pub(crate) fn validate(&self) -> ModelResult<()> {
        ensure_positive(self.bw, "bw")?;
        ensure_positive(self.mu_w, "water viscosity")?;
        ensure_positive(self.bg, "bg")?;
        ensure_positive(self.mu_g, "gas viscosity")?;
        ensure_positive(self.reference_pressure, "reference pressure")?;
        if ensure_finite(self.compressibility, "compressibility")? < 0.0 {
            return Err(ModelError::InvalidFluid {
                what: "compressibility must be non-negative",
            });
        }
        let rp = &self.relperm;
        if rp.swc < 0.0 || rp.sor < 0.0 || rp.swc + rp.sor >= 1.0 {
            return Err(ModelError::InvalidFluid {
                what: "end points must satisfy swc + sor < 1",
            });
        }
        if [rp.n_oil, rp.n_water, rp.n_gas].iter().any(|n| *n < 1.0) {
            return Err(ModelError::InvalidFluid {
                what: "Corey exponents must be >= 1",
            });
        }
        Ok(())
    }
}
