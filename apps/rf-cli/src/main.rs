use clap::{Parser, Subcommand, ValueEnum};
use rf_app::{
    AppError, AppResult, CheckpointMode, Quantity, RunOptions, RunProgressEvent, RunRequest,
    RunStage, RunTimingSummary, compile_case, project_service, query, run_service,
};
use rf_results::RunStatusRecord;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "resflow")]
#[command(about = "resflow - reservoir simulation timestep and well-control scheduler", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate a case file
    Validate {
        /// Path to the project YAML or JSON file
        project_path: PathBuf,
    },
    /// List cases in a project
    Cases {
        /// Path to the project YAML or JSON file
        project_path: PathBuf,
    },
    /// Show the timestep plan and development phases of a case
    Plan {
        /// Path to the project YAML or JSON file
        project_path: PathBuf,
        /// Case ID to compile
        case_id: String,
        /// Print every step instead of one line per phase
        #[arg(long)]
        steps: bool,
    },
    /// Run a case
    Run {
        /// Path to the project YAML or JSON file
        project_path: PathBuf,
        /// Case ID to simulate
        case_id: String,
        /// Skip cache and force re-run
        #[arg(long)]
        no_cache: bool,
        /// Continue from the newest intact checkpoint
        #[arg(long)]
        resume: bool,
        /// Checkpoint writing mode
        #[arg(long, value_enum, default_value_t = CheckpointArg::Background)]
        checkpoints: CheckpointArg,
        /// Keep only the newest N checkpoint files
        #[arg(long)]
        keep_checkpoints: Option<usize>,
        /// Request a stop once progress reaches this step
        #[arg(long)]
        stop_after: Option<usize>,
    },
    /// List saved runs of a case
    Runs {
        /// Path to the project YAML or JSON file
        project_path: PathBuf,
        /// Case ID to list runs for
        case_id: String,
    },
    /// Show details of a saved run
    ShowRun {
        /// Path to the project YAML or JSON file
        project_path: PathBuf,
        /// Run ID to display
        run_id: String,
        /// Print the summary as JSON
        #[arg(long)]
        json: bool,
    },
    /// Export one field quantity of a run as CSV
    ExportSeries {
        /// Path to the project YAML or JSON file
        project_path: PathBuf,
        /// Run ID
        run_id: String,
        /// Quantity name (e.g. oil_rate, water_cut, average_pressure)
        quantity: String,
        /// Output CSV file path (optional, defaults to stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum CheckpointArg {
    Off,
    Inline,
    Background,
}

impl From<CheckpointArg> for CheckpointMode {
    fn from(arg: CheckpointArg) -> Self {
        match arg {
            CheckpointArg::Off => CheckpointMode::Off,
            CheckpointArg::Inline => CheckpointMode::Inline,
            CheckpointArg::Background => CheckpointMode::Background,
        }
    }
}

fn main() -> AppResult<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Validate { project_path } => cmd_validate(&project_path),
        Commands::Cases { project_path } => cmd_cases(&project_path),
        Commands::Plan {
            project_path,
            case_id,
            steps,
        } => cmd_plan(&project_path, &case_id, steps),
        Commands::Run {
            project_path,
            case_id,
            no_cache,
            resume,
            checkpoints,
            keep_checkpoints,
            stop_after,
        } => {
            let options = RunOptions {
                use_cache: !no_cache,
                resume,
                checkpoints: checkpoints.into(),
                keep_checkpoints,
                ..RunOptions::default()
            };
            cmd_run(&project_path, &case_id, options, stop_after)
        }
        Commands::Runs {
            project_path,
            case_id,
        } => cmd_runs(&project_path, &case_id),
        Commands::ShowRun {
            project_path,
            run_id,
            json,
        } => cmd_show_run(&project_path, &run_id, json),
        Commands::ExportSeries {
            project_path,
            run_id,
            quantity,
            output,
        } => cmd_export_series(&project_path, &run_id, &quantity, output.as_deref()),
    }
}

fn cmd_validate(project_path: &Path) -> AppResult<()> {
    println!("Validating project: {}", project_path.display());
    let project = project_service::load_project(project_path)?;
    project_service::validate_project(&project)?;
    for case in &project.cases {
        compile_case(case)?;
    }
    println!("✓ Project is valid ({} cases)", project.cases.len());
    Ok(())
}

fn cmd_cases(project_path: &Path) -> AppResult<()> {
    let project = project_service::load_project(project_path)?;
    let cases = project_service::list_cases(&project);

    if cases.is_empty() {
        println!("No cases found in project");
    } else {
        println!("Cases in project:");
        for case in cases {
            println!(
                "  {} - {} ({} cells, {} wells, {} phases, {:.0} days)",
                case.id, case.name, case.cell_count, case.well_count, case.phase_count, case.total_days
            );
        }
    }
    Ok(())
}

fn cmd_plan(project_path: &Path, case_id: &str, every_step: bool) -> AppResult<()> {
    let project = project_service::load_project(project_path)?;
    project_service::validate_project(&project)?;
    let case = project_service::get_case(&project, case_id)?;
    let compiled = compile_case(case)?;
    let plan = &compiled.plan;

    println!(
        "Case '{}': {} steps over {:.1} days, OOIP {:.4e} STB",
        case_id,
        plan.len(),
        plan.total_days(),
        compiled.ooip_stb
    );

    println!("\nPhases:");
    for (period, first, last) in plan.period_spans() {
        let wells: Vec<String> = compiled
            .model
            .period(period)
            .map(|p| {
                p.active_wells()
                    .map(|w| format!("{} {:?} {:?} {}", w.name(), w.role(), w.mode(), w.target()))
                    .collect()
            })
            .unwrap_or_default();
        println!(
            "  {}  days {:.1} - {:.1}  steps {}-{}",
            period,
            plan.start_day(first),
            plan.end_day(last),
            first,
            last
        );
        if wells.is_empty() {
            println!("    (all wells shut in)");
        }
        for well in wells {
            println!("    {}", well);
        }
    }

    if every_step {
        println!("\nSteps:");
        for (i, entry) in plan.iter().enumerate() {
            println!(
                "  {:>4}  {:>8.1} -> {:>8.1}  dt={:.2}  {}",
                i,
                plan.start_day(i),
                plan.end_day(i),
                entry.duration_days,
                entry.control_period_id
            );
        }
    }
    Ok(())
}

fn cmd_run(
    project_path: &Path,
    case_id: &str,
    mut options: RunOptions,
    stop_after: Option<usize>,
) -> AppResult<()> {
    println!("Running case: {}", case_id);

    let cancel = Arc::new(AtomicBool::new(false));
    if stop_after.is_some() {
        options.cancel = Some(Arc::clone(&cancel));
    }
    let request = RunRequest {
        project_path,
        case_id,
        options,
    };

    let mut last_emit = Instant::now();
    let mut last_stage = None;
    let response = run_service::ensure_run_with_progress(
        &request,
        Some(&mut |event: RunProgressEvent| {
            if let (Some(limit), Some(step)) = (stop_after, &event.step) {
                if step.step >= limit && !cancel.swap(true, Ordering::Relaxed) {
                    tracing::debug!(step = step.step, limit, "stop-after reached, cancelling run");
                }
            }
            let emit_now = last_stage != Some(event.stage)
                || event.step.is_some()
                || last_emit.elapsed().as_millis() >= 100;
            if emit_now {
                render_cli_progress(&event);
                last_stage = Some(event.stage);
                last_emit = Instant::now();
            }
        }),
    )?;
    clear_progress_line();

    if response.loaded_from_cache {
        println!("✓ Loaded from cache: {}", response.run_id);
    } else {
        println!("✓ Run saved: {}", response.run_id);
    }
    if let Some(step) = response.manifest.resumed_from_step {
        println!("  Resumed after step {}", step);
    }
    print_status(&response.summary.status);
    print_timing_summary(&response.timing);

    let kpis = &response.summary.kpis;
    println!("\nField:");
    println!("  Steps:          {} ({} converged)", kpis.steps, kpis.converged_steps);
    println!("  Simulated days: {:.1}", kpis.simulated_days);
    println!("  Cumulative oil: {:.4e} STB", kpis.ultimate_oil_recovery);
    println!("  Recovery:       {:.2}%", 100.0 * kpis.recovery_factor);
    Ok(())
}

fn clear_progress_line() {
    print!("\r{}\r", " ".repeat(120));
    let _ = io::stdout().flush();
}

fn render_cli_progress(event: &RunProgressEvent) {
    match (&event.stage, &event.step) {
        (RunStage::Stepping, Some(s)) => {
            let width = 28usize;
            let filled = ((s.fraction_complete * width as f64).round() as usize).min(width);
            let bar = format!(
                "{}{}",
                "#".repeat(filled),
                "-".repeat(width.saturating_sub(filled))
            );
            print!(
                "\r[{}] {:>6.2}%  step={}/{}  phase={}  day={:.1}  iters={}  failures={}  elapsed={:.1}s",
                bar,
                s.fraction_complete * 100.0,
                s.step + 1,
                s.total_steps,
                s.control_period,
                s.elapsed_days,
                s.iterations,
                s.convergence_failures,
                event.elapsed_wall_s
            );
        }
        _ => {
            let spinner = ['|', '/', '-', '\\'];
            let spin_idx = ((event.elapsed_wall_s * 10.0) as usize) % spinner.len();
            let mut line = format!(
                "\r{} {}  elapsed={:.2}s",
                spinner[spin_idx],
                event.stage.label(),
                event.elapsed_wall_s
            );
            if let Some(msg) = &event.message {
                line.push_str(&format!("  {}", msg));
            }
            print!("{}", line);
        }
    }
    let _ = io::stdout().flush();
}

fn print_status(status: &RunStatusRecord) {
    match status {
        RunStatusRecord::Completed {
            success_rate,
            accepted,
        } => println!(
            "  Status: completed, success rate {:.1}%{}",
            100.0 * success_rate,
            if *accepted { "" } else { " (below acceptance threshold)" }
        ),
        RunStatusRecord::Aborted {
            reason,
            detail,
            step_index,
            last_good_step,
        } => {
            println!(
                "  Status: aborted at step {} ({}), last good step {}",
                step_index, reason, last_good_step
            );
            if let Some(detail) = detail {
                println!("  Cause: {}", detail);
            }
        }
        RunStatusRecord::Stopped { next_step } => {
            println!("  Status: stopped, resume with --resume at step {}", next_step)
        }
    }
}

fn print_timing_summary(timing: &RunTimingSummary) {
    let total = timing.total_time_s.max(1.0e-12);
    let compile_pct = 100.0 * timing.compile_time_s / total;
    let simulate_pct = 100.0 * timing.simulate_time_s / total;
    let save_pct = 100.0 * timing.save_time_s / total;

    println!("\nTiming summary:");
    println!(
        "  Compile:  {:.3}s ({:.1}%)",
        timing.compile_time_s, compile_pct
    );
    println!(
        "  Simulate: {:.3}s ({:.1}%)",
        timing.simulate_time_s, simulate_pct
    );
    println!("  Save:     {:.3}s ({:.1}%)", timing.save_time_s, save_pct);
    if timing.load_cache_time_s > 0.0 {
        println!("  Cache load: {:.3}s", timing.load_cache_time_s);
    }
    println!("  Total:    {:.3}s", timing.total_time_s);
    println!("  Steps executed:    {}", timing.steps_executed);
    println!("  Newton iterations: {}", timing.newton_iterations);
    println!("  Cutbacks:          {}", timing.cutbacks);
    println!("  Convergence failures: {}", timing.convergence_failures);
}

fn cmd_runs(project_path: &Path, case_id: &str) -> AppResult<()> {
    let runs = run_service::list_runs(project_path, case_id)?;

    if runs.is_empty() {
        println!("No saved runs found for case: {}", case_id);
    } else {
        println!("Saved runs for case '{}':", case_id);
        for manifest in runs {
            let checkpoint = run_service::latest_checkpoint_step(project_path, &manifest.run_id)?;
            print!(
                "  {} ({}, engine {}, {} steps)",
                manifest.run_id, manifest.timestamp, manifest.engine_version, manifest.total_steps
            );
            match checkpoint {
                Some(step) => println!("  checkpoint at step {}", step),
                None => println!(),
            }
        }
    }
    Ok(())
}

fn cmd_show_run(project_path: &Path, run_id: &str, json: bool) -> AppResult<()> {
    let (manifest, summary, steps) = run_service::load_run(project_path, run_id)?;

    if json {
        let text = serde_json::to_string_pretty(&summary)
            .map_err(|e| AppError::InvalidInput(e.to_string()))?;
        println!("{}", text);
        return Ok(());
    }

    println!("Run {} of case '{}'", manifest.run_id, manifest.case_id);
    println!("  Created: {}", manifest.timestamp);
    print_status(&summary.status);

    let series = query::get_series_summary(&steps)?;
    println!("\nTime series:");
    println!("  Steps: {} ({} converged)", series.step_count, series.converged_steps);
    println!(
        "  Time range: {:.1} - {:.1} days",
        series.time_range.0, series.time_range.1
    );

    let kpis = &summary.kpis;
    println!("\nKPIs:");
    println!(
        "  Peak oil rate:  {:.1} STB/d at day {:.1}",
        kpis.peak_oil_rate, kpis.peak_oil_day
    );
    println!("  Average oil:    {:.1} STB/d", kpis.average_oil_rate);
    println!("  Cumulative oil: {:.4e} STB", kpis.ultimate_oil_recovery);
    println!("  Recovery:       {:.2}%", 100.0 * kpis.recovery_factor);
    println!("  Water produced: {:.4e} STB", kpis.cumulative_water_produced);
    println!("  Water injected: {:.4e} STB", kpis.cumulative_water_injected);
    println!("  Gas produced:   {:.4e} Mscf", kpis.cumulative_gas_produced);
    println!("  Success rate:   {:.1}%", 100.0 * kpis.success_rate);

    println!("\nPhases:");
    for totals in query::period_totals(&steps) {
        println!(
            "  phase {}  days {:.1} - {:.1}  steps {}  oil {:.4e}  water {:.4e}  injected {:.4e}",
            totals.control_period,
            totals.start_day,
            totals.end_day,
            totals.steps,
            totals.oil,
            totals.water,
            totals.water_injected
        );
    }

    if !summary.wells.is_empty() {
        println!("\nWells:");
        for well in &summary.wells {
            println!(
                "  {:<8} oil {:.4e}  water {:.4e}  gas {:.4e}  water inj {:.4e}  gas inj {:.4e}",
                well.well,
                well.oil_produced,
                well.water_produced,
                well.gas_produced,
                well.water_injected,
                well.gas_injected
            );
        }
    }
    println!(
        "\nCheckpoints written: {} ({} failed)",
        summary.checkpoints_written, summary.checkpoint_failures
    );
    Ok(())
}

fn cmd_export_series(
    project_path: &Path,
    run_id: &str,
    quantity: &str,
    output: Option<&Path>,
) -> AppResult<()> {
    let quantity: Quantity = quantity.parse()?;
    let (_manifest, _summary, steps) = run_service::load_run(project_path, run_id)?;
    let series = query::extract_series(&steps, quantity);

    let mut csv = format!("day,{}\n", quantity.name());
    for (t, val) in &series {
        csv.push_str(&format!("{},{}\n", t, val));
    }

    if let Some(path) = output {
        std::fs::write(path, csv)?;
        println!(
            "✓ Exported {} data points to {}",
            series.len(),
            path.display()
        );
    } else {
        print!("{}", csv);
    }

    Ok(())
}
