//! Grid topology and rock properties.

use rf_core::{CellId, Real};

/// Rock properties of a single cell.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RockCell {
    pub porosity: Real,
    /// Diagonal permeability tensor (kx, ky, kz).
    pub permeability: [Real; 3],
    /// Pore volume at the fluid model's reference pressure.
    pub pore_volume: Real,
}

impl RockCell {
    pub fn new(porosity: Real, permeability: [Real; 3], pore_volume: Real) -> Self {
        Self {
            porosity,
            permeability,
            pore_volume,
        }
    }
}

/// Face between two cells.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Connection {
    pub a: CellId,
    pub b: CellId,
    pub transmissibility: Real,
}

impl Connection {
    /// The cell on the other side of this face from `cell`.
    pub fn other(&self, cell: CellId) -> CellId {
        if self.a == cell { self.b } else { self.a }
    }
}

/// Validated, immutable grid.
///
/// Stores:
/// - Rock properties for every cell (indexed by `CellId`).
/// - All connections.
/// - Compact adjacency: for each cell, the indices of its connections.
#[derive(Debug, Clone)]
pub struct Grid {
    pub(crate) cells: Vec<RockCell>,
    pub(crate) connections: Vec<Connection>,

    /// Cell i's connections are in cell_conns[cell_conn_offsets[i]..cell_conn_offsets[i+1]].
    pub(crate) cell_conn_offsets: Vec<usize>,
    pub(crate) cell_conns: Vec<usize>,
}

impl Grid {
    pub(crate) fn new(cells: Vec<RockCell>, connections: Vec<Connection>) -> Self {
        let (cell_conn_offsets, cell_conns) = build_adjacency(cells.len(), &connections);
        Self {
            cells,
            connections,
            cell_conn_offsets,
            cell_conns,
        }
    }

    pub fn cell_count(&self) -> usize {
        self.cells.len()
    }

    pub fn cells(&self) -> &[RockCell] {
        &self.cells
    }

    pub fn cell(&self, id: CellId) -> Option<&RockCell> {
        self.cells.get(id.slot())
    }

    pub fn connections(&self) -> &[Connection] {
        &self.connections
    }

    /// Indices (into `connections()`) of the faces touching `cell`.
    pub fn cell_connections(&self, cell: CellId) -> &[usize] {
        let i = cell.slot();
        if i + 1 >= self.cell_conn_offsets.len() {
            return &[];
        }
        &self.cell_conns[self.cell_conn_offsets[i]..self.cell_conn_offsets[i + 1]]
    }

    pub fn total_pore_volume(&self) -> Real {
        self.cells.iter().map(|c| c.pore_volume).sum()
    }
}

/// Build compact adjacency lists: for each cell, collect its incident connections.
fn build_adjacency(cell_count: usize, connections: &[Connection]) -> (Vec<usize>, Vec<usize>) {
    let mut counts = vec![0usize; cell_count];
    for conn in connections {
        counts[conn.a.slot()] += 1;
        counts[conn.b.slot()] += 1;
    }

    let mut offsets = Vec::with_capacity(cell_count + 1);
    offsets.push(0);
    for count in &counts {
        let last = offsets[offsets.len() - 1];
        offsets.push(last + count);
    }

    let mut fill = offsets.clone();
    let mut conns = vec![0usize; offsets[cell_count]];
    for (k, conn) in connections.iter().enumerate() {
        for cell in [conn.a, conn.b] {
            let slot = &mut fill[cell.slot()];
            conns[*slot] = k;
            *slot += 1;
        }
    }

    (offsets, conns)
}
