//! Field-level rates, cumulatives and KPIs from a run history.

use rf_core::PeriodId;
use rf_model::Model;
use rf_sim::RunState;
use rf_solver::WellRate;
use serde::{Deserialize, Serialize};

use crate::{ResultsError, ResultsResult};

/// Field totals for one step, in surface volumes per day.
///
/// Water and gas are split by flow direction into produced and injected
/// series. Oil is the net produced rate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepRates {
    pub step_index: usize,
    pub control_period_id: PeriodId,
    pub start_day: f64,
    pub end_day: f64,
    pub duration_days: f64,
    pub converged: bool,
    pub oil_rate: f64,
    pub water_rate: f64,
    pub gas_rate: f64,
    pub water_injection_rate: f64,
    pub gas_injection_rate: f64,
    pub cumulative_oil: f64,
    pub cumulative_water: f64,
    pub cumulative_gas: f64,
    pub cumulative_water_injected: f64,
    pub cumulative_gas_injected: f64,
    /// Pore-volume weighted pressure at the end of the step.
    pub average_pressure: f64,
    pub water_cut: f64,
    pub gor: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FieldKpis {
    pub peak_oil_rate: f64,
    /// Elapsed day at the end of the first step reaching the peak.
    pub peak_oil_day: f64,
    pub average_oil_rate: f64,
    pub ultimate_oil_recovery: f64,
    pub recovery_factor: f64,
    pub cumulative_water_produced: f64,
    pub cumulative_gas_produced: f64,
    pub cumulative_water_injected: f64,
    pub cumulative_gas_injected: f64,
    pub simulated_days: f64,
    pub steps: usize,
    pub converged_steps: usize,
    pub success_rate: f64,
}

/// Cumulative surface volumes of one well over the whole run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WellTotals {
    pub well: String,
    pub oil_produced: f64,
    pub water_produced: f64,
    pub gas_produced: f64,
    pub water_injected: f64,
    pub gas_injected: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldResults {
    pub ooip: f64,
    pub steps: Vec<StepRates>,
    pub kpis: FieldKpis,
    /// Ordered by the model's well positions.
    pub wells: Vec<WellTotals>,
}

#[derive(Debug, Clone, Copy, Default)]
struct Totals {
    oil: f64,
    water: f64,
    gas: f64,
    water_injected: f64,
    gas_injected: f64,
}

impl Totals {
    /// Sign-correct one well: negative flow is produced, positive injected.
    fn from_rate(well: &WellRate) -> Self {
        let (water, water_injected) = split(well.water);
        let (gas, gas_injected) = split(well.gas);
        Self {
            oil: -well.oil,
            water,
            gas,
            water_injected,
            gas_injected,
        }
    }

    fn add(&mut self, other: &Totals, scale: f64) {
        self.oil += other.oil * scale;
        self.water += other.water * scale;
        self.gas += other.gas * scale;
        self.water_injected += other.water_injected * scale;
        self.gas_injected += other.gas_injected * scale;
    }
}

/// `(produced, injected)` for a signed rate.
fn split(rate: f64) -> (f64, f64) {
    if rate < 0.0 { (-rate, 0.0) } else { (0.0, rate) }
}

/// Sum well rates into field series and compute KPIs.
///
/// Cumulatives are step-wise: `cum[i] = cum[i-1] + rate[i] * duration[i]`.
/// Substituted steps carry no well rates and so contribute zero flow.
pub fn aggregate(model: &Model, run: &RunState, ooip: f64) -> ResultsResult<FieldResults> {
    if !ooip.is_finite() || ooip <= 0.0 {
        return Err(ResultsError::InvalidOoip { ooip });
    }
    let reports = run.reports();
    let states = run.states();
    if states.len() != reports.len() + 1 {
        return Err(ResultsError::InconsistentHistory {
            what: format!("{} states for {} reports", states.len(), reports.len()),
        });
    }

    let pore_volumes: Vec<f64> = model.grid().cells().iter().map(|c| c.pore_volume).collect();
    let total_pv: f64 = pore_volumes.iter().sum();

    let mut steps = Vec::with_capacity(reports.len());
    let mut cum = Totals::default();
    let mut per_well = vec![Totals::default(); model.well_names().len()];
    let mut elapsed = 0.0;

    for (i, report) in reports.iter().enumerate() {
        if report.step_index != i {
            return Err(ResultsError::InconsistentHistory {
                what: format!("report {i} is labelled step {}", report.step_index),
            });
        }

        let dt = report.duration_days;
        let mut rate = Totals::default();
        for well in &report.well_rates {
            let position = model.well_position(&well.well).ok_or_else(|| {
                ResultsError::InconsistentHistory {
                    what: format!("step {i} reports unknown well '{}'", well.well),
                }
            })?;
            let flow = Totals::from_rate(well);
            rate.add(&flow, 1.0);
            per_well[position.slot()].add(&flow, dt);
        }
        cum.add(&rate, dt);

        let state = &states[i + 1];
        let average_pressure = if total_pv > 0.0 {
            state
                .pressure()
                .iter()
                .zip(&pore_volumes)
                .map(|(p, pv)| p * pv)
                .sum::<f64>()
                / total_pv
        } else {
            0.0
        };

        let liquid = rate.oil + rate.water;
        steps.push(StepRates {
            step_index: i,
            control_period_id: report.control_period_id,
            start_day: elapsed,
            end_day: elapsed + dt,
            duration_days: dt,
            converged: report.converged,
            oil_rate: rate.oil,
            water_rate: rate.water,
            gas_rate: rate.gas,
            water_injection_rate: rate.water_injected,
            gas_injection_rate: rate.gas_injected,
            cumulative_oil: cum.oil,
            cumulative_water: cum.water,
            cumulative_gas: cum.gas,
            cumulative_water_injected: cum.water_injected,
            cumulative_gas_injected: cum.gas_injected,
            average_pressure,
            water_cut: if liquid > 0.0 { rate.water / liquid } else { 0.0 },
            gor: if rate.oil > 0.0 { rate.gas / rate.oil } else { 0.0 },
        });
        elapsed += dt;
    }

    let kpis = kpis(&steps, ooip);
    let wells = model
        .well_names()
        .iter()
        .zip(per_well)
        .map(|(name, t)| WellTotals {
            well: name.clone(),
            oil_produced: t.oil,
            water_produced: t.water,
            gas_produced: t.gas,
            water_injected: t.water_injected,
            gas_injected: t.gas_injected,
        })
        .collect();
    Ok(FieldResults {
        ooip,
        steps,
        kpis,
        wells,
    })
}

fn kpis(steps: &[StepRates], ooip: f64) -> FieldKpis {
    let Some(last) = steps.last() else {
        return FieldKpis::default();
    };

    let mut peak_oil_rate = 0.0;
    let mut peak_oil_day = 0.0;
    for step in steps {
        if step.oil_rate > peak_oil_rate {
            peak_oil_rate = step.oil_rate;
            peak_oil_day = step.end_day;
        }
    }

    let simulated_days = last.end_day;
    let converged_steps = steps.iter().filter(|s| s.converged).count();
    FieldKpis {
        peak_oil_rate,
        peak_oil_day,
        average_oil_rate: if simulated_days > 0.0 {
            last.cumulative_oil / simulated_days
        } else {
            0.0
        },
        ultimate_oil_recovery: last.cumulative_oil,
        recovery_factor: last.cumulative_oil / ooip,
        cumulative_water_produced: last.cumulative_water,
        cumulative_gas_produced: last.cumulative_gas,
        cumulative_water_injected: last.cumulative_water_injected,
        cumulative_gas_injected: last.cumulative_gas_injected,
        simulated_days,
        steps: steps.len(),
        converged_steps,
        success_rate: converged_steps as f64 / steps.len() as f64,
    }
}
