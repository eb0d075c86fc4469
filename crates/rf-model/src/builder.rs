//! Incremental model builder.

use std::collections::HashMap;

use rf_core::{CellId, PeriodId, Real, WellId};

use crate::error::ModelResult;
use crate::fluid::FluidModel;
use crate::grid::{Connection, Grid, RockCell};
use crate::model::Model;
use crate::period::ControlPeriod;
use crate::validate;
use crate::well::WellControl;

/// Builder for constructing a model incrementally.
///
/// Use `add_cell`, `connect` and `add_period`, then call `build()` to validate
/// and freeze everything into an immutable `Model`. Period ids are assigned
/// in call order starting at 1, so they are always contiguous.
#[derive(Debug)]
pub struct ModelBuilder {
    fluid: FluidModel,
    cells: Vec<RockCell>,
    connections: Vec<Connection>,
    periods: Vec<Vec<WellControl>>,
}

impl ModelBuilder {
    pub fn new(fluid: FluidModel) -> Self {
        Self {
            fluid,
            cells: Vec::new(),
            connections: Vec::new(),
            periods: Vec::new(),
        }
    }

    /// Add a cell and return its ID.
    pub fn add_cell(&mut self, rock: RockCell) -> CellId {
        let id = CellId::from_index(self.cells.len() as u32);
        self.cells.push(rock);
        id
    }

    /// Connect two cells through a face. Checked in `build()`.
    pub fn connect(&mut self, a: CellId, b: CellId, transmissibility: Real) {
        self.connections.push(Connection {
            a,
            b,
            transmissibility,
        });
    }

    /// Append the next development phase and return its id.
    pub fn add_period(&mut self, wells: Vec<WellControl>) -> PeriodId {
        self.periods.push(wells);
        PeriodId::new(self.periods.len() as u32).unwrap_or(PeriodId::FIRST)
    }

    pub fn cell_count(&self) -> usize {
        self.cells.len()
    }

    /// Validate and freeze the model.
    pub fn build(self) -> ModelResult<Model> {
        validate::validate_cells(&self.cells)?;
        validate::validate_connections(&self.connections, self.cells.len())?;
        self.fluid.validate()?;
        validate::validate_periods(&self.periods, self.cells.len())?;

        let mut well_names: Vec<String> = Vec::new();
        let mut well_lookup: HashMap<String, WellId> = HashMap::new();
        for well in self.periods.iter().flatten() {
            if !well_lookup.contains_key(well.name()) {
                let id = WellId::from_index(well_names.len() as u32);
                well_lookup.insert(well.name().to_string(), id);
                well_names.push(well.name().to_string());
            }
        }

        let mut periods = Vec::with_capacity(self.periods.len());
        let mut id = PeriodId::FIRST;
        for wells in self.periods {
            periods.push(ControlPeriod::new(id, wells));
            id = id.next();
        }

        Ok(Model {
            grid: Grid::new(self.cells, self.connections),
            fluid: self.fluid,
            periods,
            well_names,
            well_lookup,
        })
    }
}
