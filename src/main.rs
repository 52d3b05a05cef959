use std::path::{Path, PathBuf};

use anyhow::Context;
use auv_roll::{run, RollConfig, SolverMethod};
use clap::{Parser, ValueEnum};
use tracing_subscriber::EnvFilter;

const DEFAULT_RK4_SUBSTEPS: usize = 8;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum SolverArg {
    StateTransition,
    Rk4,
}

#[derive(Debug, Parser)]
#[command(author, version, about = "AUV roll-stability transient response sweeps")]
struct Cli {
    /// JSON configuration file (defaults to ./config.json when present)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Output base directory
    #[arg(long)]
    output: Option<PathBuf>,

    /// Number of time samples
    #[arg(long)]
    samples: Option<usize>,

    /// Final simulation time in seconds
    #[arg(long)]
    t_final: Option<f64>,

    /// Response solver
    #[arg(long, value_enum)]
    solver: Option<SolverArg>,

    /// RK4 substeps per sample interval (defaults to the configured value, else 8)
    #[arg(long)]
    rk4_substeps: Option<usize>,

    /// Plot every experiment in model units (no radians-to-degrees conversion)
    #[arg(long)]
    consistent_units: bool,

    /// Skip PNG rendering
    #[arg(long)]
    no_plots: bool,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();

    let mut cfg = load_config(cli.config.as_deref())?;
    if let Some(v) = cli.output {
        cfg.output_dir = v;
    }
    if let Some(v) = cli.samples {
        cfg.time.samples = v;
    }
    if let Some(v) = cli.t_final {
        cfg.time.end = v;
    }
    cfg.solver = resolve_solver(cfg.solver, cli.solver, cli.rk4_substeps);
    if cli.consistent_units {
        cfg = cfg.with_consistent_units();
    }
    if cli.no_plots {
        cfg.render_plots = false;
    }

    let output_base = cfg.output_dir.clone();
    let summary = run(&cfg, &output_base).context("roll response run failed")?;

    println!("Run directory: {}", summary.outputs.output_dir.display());
    println!("CSV: {}", summary.outputs.csv_path.display());
    println!("Summary: {}", summary.outputs.summary_path.display());
    for path in &summary.outputs.plot_paths {
        println!("Plot: {}", path.display());
    }

    for experiment in &summary.experiments {
        for curve in &experiment.curves {
            println!(
                "{:<20} {:<16} overshoot {:>8.3} | freq {:>6.3} Hz | zeta {:>6.4}",
                experiment.name,
                curve.label,
                curve.metrics.peak_overshoot,
                curve.metrics.oscillation_frequency_hz.unwrap_or(0.0),
                curve.damping_ratio.unwrap_or(f64::NAN),
            );
        }
    }

    Ok(())
}

fn resolve_solver(
    configured: SolverMethod,
    solver: Option<SolverArg>,
    rk4_substeps: Option<usize>,
) -> SolverMethod {
    let configured_substeps = match configured {
        SolverMethod::Rk4 { substeps } => Some(substeps),
        SolverMethod::StateTransition => None,
    };

    match (solver, configured) {
        (Some(SolverArg::StateTransition), _) => SolverMethod::StateTransition,
        (Some(SolverArg::Rk4), _) | (None, SolverMethod::Rk4 { .. }) => SolverMethod::Rk4 {
            substeps: rk4_substeps
                .or(configured_substeps)
                .unwrap_or(DEFAULT_RK4_SUBSTEPS),
        },
        (None, SolverMethod::StateTransition) => SolverMethod::StateTransition,
    }
}

fn load_config(path: Option<&Path>) -> anyhow::Result<RollConfig> {
    if let Some(path) = path {
        return RollConfig::load(path)
            .with_context(|| format!("failed to load config {}", path.display()));
    }

    let cwd_config = PathBuf::from("config.json");
    if cwd_config.exists() {
        return RollConfig::load(&cwd_config).context("failed to load ./config.json");
    }

    Ok(RollConfig::default())
}
