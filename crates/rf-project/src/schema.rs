//! Case file schema definitions.
//!
//! Units are field units throughout: psi, days, reservoir barrels (rb) for
//! pore volume and well rate targets, stock-tank barrels for OOIP.

use serde::{Deserialize, Serialize};

/// Highest schema version this crate reads.
pub const SCHEMA_VERSION: u32 = 1;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Project {
    pub version: u32,
    pub name: String,
    #[serde(default)]
    pub cases: Vec<CaseDef>,
}

impl Project {
    pub fn case(&self, id: &str) -> Option<&CaseDef> {
        self.cases.iter().find(|c| c.id == id)
    }
}

/// One field-development scenario: reservoir, wells, phases and schedule.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CaseDef {
    pub id: String,
    pub name: String,
    pub grid: GridDef,
    /// Falls back to the built-in light black oil when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fluid: Option<FluidDef>,
    pub initial: InitialConditionsDef,
    #[serde(default)]
    pub wells: Vec<WellDef>,
    pub phases: Vec<PhaseDef>,
    pub schedule: ScheduleDef,
    #[serde(default)]
    pub run: RunSettingsDef,
}

impl CaseDef {
    pub fn well(&self, id: &str) -> Option<&WellDef> {
        self.wells.iter().find(|w| w.id == id)
    }
}

/// Uniform Cartesian grid. Cell `(i, j, k)` has index `i + nx * (j + ny * k)`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GridDef {
    pub nx: usize,
    pub ny: usize,
    pub nz: usize,
    pub pore_volume_rb: f64,
    pub porosity: f64,
    /// `[kx, ky, kz]` in millidarcy.
    pub permeability_md: [f64; 3],
    /// Face transmissibility per direction; a zero entry disconnects that direction.
    pub transmissibility: [f64; 3],
}

impl GridDef {
    pub fn cell_count(&self) -> usize {
        self.nx * self.ny * self.nz
    }

    pub fn contains(&self, ijk: [usize; 3]) -> bool {
        ijk[0] < self.nx && ijk[1] < self.ny && ijk[2] < self.nz
    }

    pub fn cell_index(&self, ijk: [usize; 3]) -> usize {
        ijk[0] + self.nx * (ijk[1] + self.ny * ijk[2])
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FluidDef {
    pub pvt: PvtDef,
    pub bw: f64,
    pub mu_w: f64,
    pub bg: f64,
    pub mu_g: f64,
    pub compressibility: f64,
    pub reference_pressure: f64,
    pub relperm: RelPermDef,
}

/// Saturated oil PVT table, one row per pressure.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PvtDef {
    pub pressure: Vec<f64>,
    pub bo: Vec<f64>,
    pub rs: Vec<f64>,
    pub mu_o: Vec<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RelPermDef {
    pub swc: f64,
    pub sor: f64,
    pub n_oil: f64,
    pub n_water: f64,
    pub n_gas: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InitialConditionsDef {
    pub pressure: f64,
    pub so: f64,
    pub sw: f64,
    #[serde(default)]
    pub sg: f64,
    /// Solution GOR; the saturated value at `pressure` when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rs: Option<f64>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum WellKindDef {
    Producer,
    WaterInjector,
    GasInjector,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WellDef {
    pub id: String,
    pub kind: WellKindDef,
    /// Total well index; completions split it by their own weights.
    pub well_index: f64,
    pub completions: Vec<CompletionDef>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CompletionDef {
    pub ijk: [usize; 3],
    pub well_index: f64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ControlModeDef {
    Rate,
    Bhp,
}

/// A development phase: from `start_day` on, exactly `controls` are open.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PhaseDef {
    pub name: String,
    pub start_day: f64,
    #[serde(default)]
    pub controls: Vec<WellControlDef>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WellControlDef {
    pub well: String,
    pub mode: ControlModeDef,
    pub target: f64,
    /// Lower bound (BHP for producers).
    pub lower: f64,
    /// Upper bound (BHP for injectors, rate for BHP-controlled wells).
    pub upper: f64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct SegmentDef {
    pub duration_days: f64,
    pub timestep_days: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScheduleDef {
    pub history: SegmentDef,
    #[serde(default)]
    pub forecast: Vec<SegmentDef>,
    pub total_duration_days: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RunSettingsDef {
    pub max_convergence_failures: usize,
    pub report_frequency: usize,
    pub checkpoint_frequency: usize,
    pub min_success_rate: f64,
    pub max_cuts: usize,
    pub cut_factor: f64,
    pub max_newton_iterations: usize,
    pub newton_tolerance: f64,
    pub max_saturation_change: f64,
    /// Original oil in place (stb). Computed from the initial state when absent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ooip_stb: Option<f64>,
}

impl Default for RunSettingsDef {
    fn default() -> Self {
        Self {
            max_convergence_failures: 5,
            report_frequency: 5,
            checkpoint_frequency: 10,
            min_success_rate: 0.9,
            max_cuts: 0,
            cut_factor: 0.5,
            max_newton_iterations: 25,
            newton_tolerance: 1.0e-6,
            max_saturation_change: 0.5,
            ooip_stb: None,
        }
    }
}
