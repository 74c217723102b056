use std::cell::RefCell;
use std::path::PathBuf;
use std::rc::Rc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, warn, Level};
use tracing_subscriber::EnvFilter;

use rtsim::config::SimulationConfig;
use rtsim::engine::Engine;
use rtsim::feasibility;
use rtsim::monitor::{CompositeMonitor, EventLog, Monitor, TracingMonitor};
use rtsim::report::Report;

#[derive(Parser)]
#[command(name = "rtsim")]
#[command(about = "Discrete-event simulator for hard real-time multiprocessor scheduling")]
#[command(version = env!("CARGO_PKG_VERSION"))]
struct Cli {
    /// Task-set / scheduler configuration (TOML or JSON)
    config: PathBuf,

    /// Log verbosity: error, warn, info, debug, trace
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Write the JSON report to this path instead of stdout
    #[arg(short, long)]
    out: Option<PathBuf>,

    /// Skip the pre-run feasibility check
    #[arg(long)]
    no_feasibility: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level: Level = cli.log_level.parse().unwrap_or(Level::INFO);
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(level.to_string()))
        .init();

    let config = SimulationConfig::from_file(&cli.config)
        .with_context(|| format!("loading config from {}", cli.config.display()))?;
    let built = config.build()?;

    if !cli.no_feasibility {
        run_feasibility_check(&built.tasks, built.cycles_per_ms, &config.scheduler);
    }

    let log = Rc::new(RefCell::new(EventLog::default()));
    let monitor: Box<dyn Monitor> = Box::new(CompositeMonitor {
        sinks: vec![Box::new(TracingMonitor), Box::new(log.clone())],
    });

    let mut engine = Engine::new(
        built.tasks,
        built.processors,
        built.etm,
        built.scheduler,
        monitor,
        built.cycles_per_ms,
        built.horizon_ms,
    );

    info!(horizon_ms = built.horizon_ms, "starting simulation");
    engine.run()?;

    let report = Report::build(
        engine.jobs(),
        engine.tasks(),
        &log.borrow(),
        engine.cycles_per_ms(),
        built.horizon_ms,
    );

    match &cli.out {
        Some(path) => std::fs::write(path, report.to_json()?)?,
        None => println!("{}", report.to_text_table()),
    }

    Ok(())
}

fn run_feasibility_check(
    tasks: &rtsim::task::TaskSet,
    cycles_per_ms: u64,
    scheduler: &rtsim::config::SchedulerConfig,
) {
    use rtsim::config::SchedulerConfig::*;
    match scheduler {
        Rm => {
            if let Err((task, r)) = feasibility::rm_response_time_analysis(tasks, cycles_per_ms) {
                warn!(task, response_time_cycles = r, "RM feasibility check failed; simulating anyway");
            }
        }
        Edf | EdfVd => {
            let horizon = rtsim::time::ms_to_cycles_ceil(10_000.0, cycles_per_ms);
            if let Err(at) = feasibility::edf_processor_demand_bound(tasks, horizon, cycles_per_ms) {
                warn!(at, "EDF processor-demand bound check failed; simulating anyway");
            }
        }
    }
}
