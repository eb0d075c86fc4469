//! Compile a case definition into an engine model, timestep plan and initial state.

use std::collections::HashMap;

use rf_core::CellId;
use rf_model::{
    Completion, ControlMode, FluidModel, InjectedPhase, Model, ModelBuilder, PvtTable,
    RelPerm, ReservoirState, RockCell, WellControl, WellRole,
};
use rf_project::schema::{
    CaseDef, ControlModeDef, FluidDef, GridDef, PhaseDef, ScheduleDef, WellDef, WellKindDef,
};
use rf_schedule::{PhaseBoundaryTable, SegmentConfig, TimestepPlan, TimestepSegment};
use rf_sim::{CutbackPolicy, DriverConfig};
use rf_solver::{ImpesConfig, NewtonConfig};

use crate::error::{AppError, AppResult};

/// Everything the driver needs for one case.
#[derive(Debug, Clone)]
pub struct CompiledCase {
    pub model: Model,
    pub plan: TimestepPlan,
    pub initial: ReservoirState,
    pub driver: DriverConfig,
    pub solver: ImpesConfig,
    /// Supplied in the case file or computed from the initial state.
    pub ooip_stb: f64,
}

pub fn compile_case(case: &CaseDef) -> AppResult<CompiledCase> {
    rf_project::validate_case(case).map_err(|e| AppError::Project(e.to_string()))?;

    let fluid = match &case.fluid {
        Some(def) => build_fluid(def)?,
        None => FluidModel::black_oil_default(),
    };
    let model = build_model(case, fluid)?;
    let plan = build_plan(&case.schedule, &case.phases)?;
    plan.check_periods(model.period_count())?;
    let initial = initial_state(case, &model)?;

    let run = &case.run;
    let driver = DriverConfig {
        max_convergence_failures: run.max_convergence_failures,
        report_frequency: run.report_frequency,
        checkpoint_frequency: run.checkpoint_frequency,
        min_success_rate: run.min_success_rate,
        cutback: CutbackPolicy {
            max_cuts: run.max_cuts,
            factor: run.cut_factor,
        },
        ..DriverConfig::default()
    };
    let solver = ImpesConfig {
        newton: NewtonConfig {
            max_iterations: run.max_newton_iterations,
            tolerance: run.newton_tolerance,
            ..NewtonConfig::default()
        },
        max_saturation_change: run.max_saturation_change,
    };
    let ooip_stb = match run.ooip_stb {
        Some(ooip) => ooip,
        None => oil_in_place(&model, &initial),
    };

    tracing::debug!(
        case = %case.id,
        cells = model.cell_count(),
        periods = model.period_count(),
        steps = plan.len(),
        ooip_stb,
        "compiled case"
    );

    Ok(CompiledCase {
        model,
        plan,
        initial,
        driver,
        solver,
        ooip_stb,
    })
}

pub fn build_fluid(def: &FluidDef) -> AppResult<FluidModel> {
    let oil = PvtTable::new(
        def.pvt.pressure.clone(),
        def.pvt.bo.clone(),
        def.pvt.rs.clone(),
        def.pvt.mu_o.clone(),
    )?;
    Ok(FluidModel {
        oil,
        bw: def.bw,
        mu_w: def.mu_w,
        bg: def.bg,
        mu_g: def.mu_g,
        compressibility: def.compressibility,
        reference_pressure: def.reference_pressure,
        relperm: RelPerm {
            swc: def.relperm.swc,
            sor: def.relperm.sor,
            n_oil: def.relperm.n_oil,
            n_water: def.relperm.n_water,
            n_gas: def.relperm.n_gas,
        },
    })
}

/// Grid cells in index order, then one control period per phase.
pub fn build_model(case: &CaseDef, fluid: FluidModel) -> AppResult<Model> {
    let grid = &case.grid;
    let mut builder = ModelBuilder::new(fluid);
    let rock = RockCell::new(grid.porosity, grid.permeability_md, grid.pore_volume_rb);
    for _ in 0..grid.cell_count() {
        builder.add_cell(rock);
    }
    for (a, b, t) in grid_connections(grid) {
        builder.connect(CellId::from_index(a), CellId::from_index(b), t);
    }

    let well_defs: HashMap<&str, &WellDef> =
        case.wells.iter().map(|w| (w.id.as_str(), w)).collect();
    for phase in &case.phases {
        let wells = phase_wells(case, &well_defs, phase)?;
        builder.add_period(wells);
    }
    Ok(builder.build()?)
}

/// Neighbour pairs `(a, b, transmissibility)` along i, then j, then k.
fn grid_connections(grid: &GridDef) -> Vec<(u32, u32, f64)> {
    let mut connections = Vec::new();
    let index = |ijk: [usize; 3]| grid.cell_index(ijk) as u32;
    for k in 0..grid.nz {
        for j in 0..grid.ny {
            for i in 0..grid.nx {
                let here = index([i, j, k]);
                let neighbours = [[i + 1, j, k], [i, j + 1, k], [i, j, k + 1]];
                for (dir, next) in neighbours.into_iter().enumerate() {
                    let t = grid.transmissibility[dir];
                    if t > 0.0 && grid.contains(next) {
                        connections.push((here, index(next), t));
                    }
                }
            }
        }
    }
    connections
}

fn phase_wells(
    case: &CaseDef,
    well_defs: &HashMap<&str, &WellDef>,
    phase: &PhaseDef,
) -> AppResult<Vec<WellControl>> {
    let mut wells = Vec::with_capacity(phase.controls.len());
    for control in &phase.controls {
        let well = *well_defs.get(control.well.as_str()).ok_or_else(|| {
            AppError::Compile(format!(
                "phase '{}' controls unknown well '{}'",
                phase.name, control.well
            ))
        })?;
        let role = match well.kind {
            WellKindDef::Producer => WellRole::Producer,
            WellKindDef::WaterInjector => WellRole::Injector {
                phase: InjectedPhase::Water,
            },
            WellKindDef::GasInjector => WellRole::Injector {
                phase: InjectedPhase::Gas,
            },
        };
        let mode = match control.mode {
            ControlModeDef::Rate => ControlMode::Rate,
            ControlModeDef::Bhp => ControlMode::Bhp,
        };
        let completions = well
            .completions
            .iter()
            .map(|c| {
                Completion::new(
                    CellId::from_index(case.grid.cell_index(c.ijk) as u32),
                    c.well_index,
                )
            })
            .collect();
        wells.push(WellControl::new(
            well.id.clone(),
            role,
            mode,
            control.target,
            (control.lower, control.upper),
            well.well_index,
            completions,
        )?);
    }
    Ok(wells)
}

pub fn build_plan(schedule: &ScheduleDef, phases: &[PhaseDef]) -> AppResult<TimestepPlan> {
    let segment = |s: &rf_project::SegmentDef| TimestepSegment::new(s.duration_days, s.timestep_days);
    let config = SegmentConfig {
        history: segment(&schedule.history),
        forecast: schedule.forecast.iter().map(segment).collect(),
        total_duration_days: schedule.total_duration_days,
    };
    let start_days: Vec<f64> = phases.iter().map(|p| p.start_day).collect();
    let table = PhaseBoundaryTable::from_start_days(&start_days)?;
    Ok(TimestepPlan::build(&config, &table)?)
}

pub fn initial_state(case: &CaseDef, model: &Model) -> AppResult<ReservoirState> {
    let init = &case.initial;
    let rs = init
        .rs
        .unwrap_or_else(|| model.fluid().oil.rs_sat(init.pressure));
    Ok(ReservoirState::uniform(
        model.cell_count(),
        init.pressure,
        [init.so, init.sw, init.sg],
        rs,
    ))
}

/// Stock-tank oil in place: sum of `PV(p) * So / Bo(p)` over cells.
pub fn oil_in_place(model: &Model, state: &ReservoirState) -> f64 {
    let fluid = model.fluid();
    model
        .grid()
        .cells()
        .iter()
        .zip(state.pressure())
        .zip(state.saturations())
        .map(|((cell, &p), s)| cell.pore_volume * fluid.pv_multiplier(p) * s[0] / fluid.oil.bo(p))
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid(nx: usize, ny: usize, nz: usize, t: [f64; 3]) -> GridDef {
        GridDef {
            nx,
            ny,
            nz,
            pore_volume_rb: 1.0,
            porosity: 0.2,
            permeability_md: [1.0; 3],
            transmissibility: t,
        }
    }

    #[test]
    fn connections_follow_grid_directions() {
        let conns = grid_connections(&grid(3, 2, 1, [1.0, 2.0, 3.0]));
        // 2 rows of 2 i-faces, 3 j-faces, no k-faces.
        assert_eq!(conns.len(), 7);
        assert!(conns.contains(&(0, 1, 1.0)));
        assert!(conns.contains(&(2, 5, 2.0)));
        assert!(conns.iter().all(|&(_, _, t)| t != 3.0));
    }

    #[test]
    fn zero_transmissibility_disconnects_direction() {
        let conns = grid_connections(&grid(2, 2, 2, [1.0, 0.0, 1.0]));
        assert_eq!(conns.len(), 8);
        assert!(conns.iter().all(|&(a, b, _)| b - a != 2));
    }
}
