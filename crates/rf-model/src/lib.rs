//! rf-model: immutable reservoir model for resflow.
//!
//! Provides:
//! - Grid topology with per-cell rock properties and precomputed adjacency
//! - Fluid description (oil PVT table, water/gas constants, relative permeability)
//! - Well controls and development phases (control periods)
//! - Reservoir state (per-cell pressure, saturations, solution GOR)
//! - Incremental model builder with validation
//!
//! # Example
//!
//! ```
//! use rf_model::{
//!     Completion, ControlMode, FluidModel, ModelBuilder, RockCell, WellControl, WellRole,
//! };
//!
//! let mut builder = ModelBuilder::new(FluidModel::black_oil_default());
//! let c0 = builder.add_cell(RockCell::new(0.2, [100.0, 100.0, 10.0], 1.0e5));
//! let c1 = builder.add_cell(RockCell::new(0.2, [100.0, 100.0, 10.0], 1.0e5));
//! builder.connect(c0, c1, 5.0);
//!
//! let producer = WellControl::new(
//!     "P1",
//!     WellRole::Producer,
//!     ControlMode::Rate,
//!     500.0,
//!     (500.0, 5000.0),
//!     4.0,
//!     vec![Completion::new(c1, 4.0)],
//! )
//! .unwrap();
//! let phase = builder.add_period(vec![producer]);
//! let model = builder.build().unwrap();
//!
//! assert_eq!(model.cell_count(), 2);
//! assert_eq!(model.period(phase).unwrap().producers().len(), 1);
//! assert!(model.well_position("P1").is_some());
//! ```

pub mod builder;
pub mod error;
pub mod fluid;
pub mod grid;
pub mod model;
pub mod period;
pub mod state;
pub(crate) mod validate;
pub mod well;

// Re-exports for ergonomics
pub use builder::ModelBuilder;
pub use error::{ModelError, ModelResult};
pub use fluid::{FluidModel, PvtTable, RelPerm};
pub use grid::{Connection, Grid, RockCell};
pub use model::Model;
pub use period::ControlPeriod;
pub use state::{GAS, OIL, ReservoirState, StateViolation, ViolationKind, WATER};
pub use well::{Completion, ControlMode, InjectedPhase, WellControl, WellRole};
