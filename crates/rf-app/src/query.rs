//! Query helpers for extracting data from loaded runs.

use std::str::FromStr;

use rf_results::StepRates;

use crate::error::{AppError, AppResult};

/// Summary of a run's time range and data.
#[derive(Debug, Clone)]
pub struct SeriesSummary {
    pub time_range: (f64, f64),
    pub step_count: usize,
    pub converged_steps: usize,
    pub control_periods: Vec<u32>,
}

/// A field quantity that can be plotted against time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Quantity {
    OilRate,
    WaterRate,
    GasRate,
    WaterInjectionRate,
    GasInjectionRate,
    CumulativeOil,
    CumulativeWater,
    CumulativeGas,
    AveragePressure,
    WaterCut,
    Gor,
}

impl Quantity {
    pub const ALL: [Quantity; 11] = [
        Quantity::OilRate,
        Quantity::WaterRate,
        Quantity::GasRate,
        Quantity::WaterInjectionRate,
        Quantity::GasInjectionRate,
        Quantity::CumulativeOil,
        Quantity::CumulativeWater,
        Quantity::CumulativeGas,
        Quantity::AveragePressure,
        Quantity::WaterCut,
        Quantity::Gor,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Quantity::OilRate => "oil_rate",
            Quantity::WaterRate => "water_rate",
            Quantity::GasRate => "gas_rate",
            Quantity::WaterInjectionRate => "water_injection_rate",
            Quantity::GasInjectionRate => "gas_injection_rate",
            Quantity::CumulativeOil => "cumulative_oil",
            Quantity::CumulativeWater => "cumulative_water",
            Quantity::CumulativeGas => "cumulative_gas",
            Quantity::AveragePressure => "average_pressure",
            Quantity::WaterCut => "water_cut",
            Quantity::Gor => "gor",
        }
    }

    fn value(self, step: &StepRates) -> f64 {
        match self {
            Quantity::OilRate => step.oil_rate,
            Quantity::WaterRate => step.water_rate,
            Quantity::GasRate => step.gas_rate,
            Quantity::WaterInjectionRate => step.water_injection_rate,
            Quantity::GasInjectionRate => step.gas_injection_rate,
            Quantity::CumulativeOil => step.cumulative_oil,
            Quantity::CumulativeWater => step.cumulative_water,
            Quantity::CumulativeGas => step.cumulative_gas,
            Quantity::AveragePressure => step.average_pressure,
            Quantity::WaterCut => step.water_cut,
            Quantity::Gor => step.gor,
        }
    }
}

impl FromStr for Quantity {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Quantity::ALL
            .into_iter()
            .find(|q| q.name() == s)
            .ok_or_else(|| AppError::InvalidInput(format!("unknown quantity '{s}'")))
    }
}

/// Field totals over one control period.
#[derive(Debug, Clone, PartialEq)]
pub struct PeriodTotals {
    pub control_period: u32,
    pub start_day: f64,
    pub end_day: f64,
    pub steps: usize,
    pub oil: f64,
    pub water: f64,
    pub gas: f64,
    pub water_injected: f64,
}

pub fn get_series_summary(steps: &[StepRates]) -> AppResult<SeriesSummary> {
    let (first, last) = match (steps.first(), steps.last()) {
        (Some(first), Some(last)) => (first, last),
        _ => return Err(AppError::InvalidInput("No steps in run".to_string())),
    };

    let mut control_periods: Vec<u32> = steps.iter().map(|s| s.control_period_id.get()).collect();
    control_periods.dedup();

    Ok(SeriesSummary {
        time_range: (first.start_day, last.end_day),
        step_count: steps.len(),
        converged_steps: steps.iter().filter(|s| s.converged).count(),
        control_periods,
    })
}

/// `(end_day, value)` for every step.
pub fn extract_series(steps: &[StepRates], quantity: Quantity) -> Vec<(f64, f64)> {
    steps.iter().map(|s| (s.end_day, quantity.value(s))).collect()
}

/// Produced and injected volumes per control period, in period order.
pub fn period_totals(steps: &[StepRates]) -> Vec<PeriodTotals> {
    let mut totals: Vec<PeriodTotals> = Vec::new();
    for step in steps {
        let period = step.control_period_id.get();
        let dt = step.duration_days;
        match totals.last_mut() {
            Some(t) if t.control_period == period => {
                t.end_day = step.end_day;
                t.steps += 1;
                t.oil += step.oil_rate * dt;
                t.water += step.water_rate * dt;
                t.gas += step.gas_rate * dt;
                t.water_injected += step.water_injection_rate * dt;
            }
            _ => totals.push(PeriodTotals {
                control_period: period,
                start_day: step.start_day,
                end_day: step.end_day,
                steps: 1,
                oil: step.oil_rate * dt,
                water: step.water_rate * dt,
                gas: step.gas_rate * dt,
                water_injected: step.water_injection_rate * dt,
            }),
        }
    }
    totals
}
