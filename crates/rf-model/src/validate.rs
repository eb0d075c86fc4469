//! Model validation logic.

use std::collections::HashSet;

use rf_core::{CellId, PeriodId};

use crate::error::{ModelError, ModelResult};
use crate::grid::{Connection, RockCell};
use crate::well::WellControl;

pub(crate) fn validate_cells(cells: &[RockCell]) -> ModelResult<()> {
    if cells.is_empty() {
        return Err(ModelError::EmptyGrid);
    }
    for (i, cell) in cells.iter().enumerate() {
        let id = CellId::from_index(i as u32);
        if !(cell.porosity > 0.0 && cell.porosity <= 1.0) {
            return Err(ModelError::InvalidCell {
                cell: id,
                what: "porosity must be in (0, 1]",
            });
        }
        if !cell.pore_volume.is_finite() || cell.pore_volume <= 0.0 {
            return Err(ModelError::InvalidCell {
                cell: id,
                what: "pore volume must be positive",
            });
        }
        if cell
            .permeability
            .iter()
            .any(|k| !k.is_finite() || *k < 0.0)
        {
            return Err(ModelError::InvalidCell {
                cell: id,
                what: "permeability must be non-negative",
            });
        }
    }
    Ok(())
}

pub(crate) fn validate_connections(connections: &[Connection], cell_count: usize) -> ModelResult<()> {
    for (index, conn) in connections.iter().enumerate() {
        if conn.a.slot() >= cell_count || conn.b.slot() >= cell_count {
            return Err(ModelError::InvalidConnection {
                index,
                what: "refers to a non-existent cell",
            });
        }
        if conn.a == conn.b {
            return Err(ModelError::InvalidConnection {
                index,
                what: "connects a cell to itself",
            });
        }
        if !conn.transmissibility.is_finite() || conn.transmissibility < 0.0 {
            return Err(ModelError::InvalidConnection {
                index,
                what: "transmissibility must be non-negative",
            });
        }
    }
    Ok(())
}

pub(crate) fn validate_periods(periods: &[Vec<WellControl>], cell_count: usize) -> ModelResult<()> {
    if periods.is_empty() {
        return Err(ModelError::NoControlPeriods);
    }
    let mut period = PeriodId::FIRST;
    for wells in periods {
        let mut names = HashSet::new();
        for well in wells {
            if !names.insert(well.name()) {
                return Err(ModelError::DuplicateWell {
                    well: well.name().to_string(),
                    period,
                });
            }
            for completion in well.completions() {
                if completion.cell.slot() >= cell_count {
                    return Err(ModelError::CompletionOutOfRange {
                        well: well.name().to_string(),
                        cell: completion.cell,
                        cell_count,
                    });
                }
            }
        }
        period = period.next();
    }
    Ok(())
}
