//! Well terms of the pressure equation and control switching.

use nalgebra::DVector;
use rf_model::{ControlMode, WellControl};

/// Control a well is operating under during the current solve.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum ActiveControl {
    /// Reservoir-volume rate magnitude; direction follows the well role.
    Rate(f64),
    Bhp(f64),
}

#[derive(Debug, Clone)]
pub(crate) struct WellTerm<'a> {
    pub well: &'a WellControl,
    pub control: ActiveControl,
    /// `(cell slot, completion weight * total mobility)` per completion.
    conns: Vec<(usize, f64)>,
    /// Set once the well has switched to its limiting constraint.
    pub on_constraint: bool,
}

impl<'a> WellTerm<'a> {
    pub fn new(well: &'a WellControl, lambda_t: &[f64]) -> Self {
        let control = match well.mode() {
            ControlMode::Rate => ActiveControl::Rate(well.target()),
            ControlMode::Bhp => ActiveControl::Bhp(well.target()),
        };
        let conns = well
            .completions()
            .iter()
            .map(|c| {
                let slot = c.cell.slot();
                (slot, c.weight * lambda_t[slot])
            })
            .collect();
        Self {
            well,
            control,
            conns,
            on_constraint: false,
        }
    }

    /// +1 for producers (flow leaves the reservoir), -1 for injectors.
    fn direction(&self) -> f64 {
        if self.well.is_producer() { 1.0 } else { -1.0 }
    }

    fn connectivity(&self) -> f64 {
        self.conns.iter().map(|(_, cw)| cw).sum()
    }

    /// `(cell, outflow, d outflow / d p_cell)` per completion.
    ///
    /// Outflow is reservoir volume per day leaving the reservoir, so it is
    /// negative for injection. Rate targets are split in proportion to each
    /// completion's connectivity. Pressure-controlled completions never crossflow.
    pub fn completion_flows(&self, p: &DVector<f64>) -> Vec<(usize, f64, f64)> {
        let dir = self.direction();
        match self.control {
            ActiveControl::Rate(q) => {
                let total = self.connectivity();
                self.conns
                    .iter()
                    .map(|&(cell, cw)| {
                        let share = if total > 0.0 { cw / total } else { 0.0 };
                        (cell, dir * q * share, 0.0)
                    })
                    .collect()
            }
            ActiveControl::Bhp(bhp) => self
                .conns
                .iter()
                .map(|&(cell, cw)| {
                    let q = cw * (p[cell] - bhp);
                    if q * dir > 0.0 { (cell, q, cw) } else { (cell, 0.0, 0.0) }
                })
                .collect(),
        }
    }

    /// Total rate magnitude (withdrawal for producers, injection for injectors).
    pub fn total_rate(&self, p: &DVector<f64>) -> f64 {
        self.direction()
            * self
                .completion_flows(p)
                .iter()
                .map(|(_, q, _)| q)
                .sum::<f64>()
    }

    /// Bottom-hole pressure implied by the current control.
    ///
    /// Infinite when a nonzero rate is requested from completions with no mobility.
    pub fn bottom_hole_pressure(&self, p: &DVector<f64>) -> f64 {
        match self.control {
            ActiveControl::Bhp(bhp) => bhp,
            ActiveControl::Rate(q) => {
                let total = self.connectivity();
                if total > 0.0 {
                    let weighted: f64 = self.conns.iter().map(|&(cell, cw)| cw * p[cell]).sum();
                    (weighted - self.direction() * q) / total
                } else if q == 0.0 {
                    self.mean_completed_pressure(p)
                } else {
                    f64::INFINITY * -self.direction()
                }
            }
        }
    }

    pub fn mean_completed_pressure(&self, p: &DVector<f64>) -> f64 {
        let sum: f64 = self.conns.iter().map(|&(cell, _)| p[cell]).sum();
        sum / self.conns.len().max(1) as f64
    }

    /// Switch to the limiting constraint if the solution at `p` violates it.
    ///
    /// Each well switches at most once per solve. Returns true on a switch.
    pub fn enforce_limits(&mut self, p: &DVector<f64>) -> bool {
        if self.on_constraint {
            return false;
        }
        let well = self.well;
        let switch_to = match well.mode() {
            ControlMode::Rate if well.is_producer() => {
                (self.bottom_hole_pressure(p) < well.lower()).then_some(ActiveControl::Bhp(well.lower()))
            }
            ControlMode::Rate => {
                (self.bottom_hole_pressure(p) > well.upper()).then_some(ActiveControl::Bhp(well.upper()))
            }
            ControlMode::Bhp => {
                (self.total_rate(p) > well.upper()).then_some(ActiveControl::Rate(well.upper()))
            }
        };
        match switch_to {
            Some(control) => {
                self.control = control;
                self.on_constraint = true;
                true
            }
            None => false,
        }
    }
}
