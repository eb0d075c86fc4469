//! The immutable reservoir model handed to the engine.

use std::collections::HashMap;

use rf_core::{PeriodId, WellId};

use crate::fluid::FluidModel;
use crate::grid::Grid;
use crate::period::ControlPeriod;

/// Grid, rock, fluid and the ordered development phases.
///
/// Built once by [`crate::ModelBuilder`]; the engine only reads it.
#[derive(Debug, Clone)]
pub struct Model {
    pub(crate) grid: Grid,
    pub(crate) fluid: FluidModel,
    pub(crate) periods: Vec<ControlPeriod>,

    /// Distinct well names across all periods, in first-seen order (index -> name).
    pub(crate) well_names: Vec<String>,
    /// Reverse lookup: name -> WellId.
    pub(crate) well_lookup: HashMap<String, WellId>,
}

impl Model {
    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    pub fn fluid(&self) -> &FluidModel {
        &self.fluid
    }

    pub fn cell_count(&self) -> usize {
        self.grid.cell_count()
    }

    pub fn periods(&self) -> &[ControlPeriod] {
        &self.periods
    }

    pub fn period_count(&self) -> usize {
        self.periods.len()
    }

    /// O(1) lookup: ids are contiguous from 1.
    pub fn period(&self, id: PeriodId) -> Option<&ControlPeriod> {
        self.periods.get(id.position())
    }

    /// Stable position of a well across all periods.
    pub fn well_position(&self, name: &str) -> Option<WellId> {
        self.well_lookup.get(name).copied()
    }

    pub fn well_name(&self, id: WellId) -> Option<&str> {
        self.well_names.get(id.slot()).map(String::as_str)
    }

    pub fn well_names(&self) -> &[String] {
        &self.well_names
    }
}
