//! AUV roll stability
//!
//! Models the roll motion of an underwater vehicle as the second-order linear
//! system `Jp * theta'' + Dp * theta' + (m g MH) * theta = 0` and sweeps the
//! free response from a nonzero initial roll across metacentric height and
//! damping.

pub mod analysis;
pub mod config;
pub mod model;
pub mod output;
pub mod solver;
pub mod sweep;

use std::path::Path;

use thiserror::Error;
use tracing::{info, warn};

pub use analysis::ResponseMetrics;
pub use config::{Conversion, ExperimentConfig, RollConfig, SweptParameter};
pub use model::RollModel;
pub use output::{OutputFiles, RunSummary};
pub use solver::{simulate, simulate_with, SolverError, SolverMethod};
pub use sweep::{run_experiment, ExperimentResult, ResponseCurve};

#[derive(Debug, Error)]
pub enum RollError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("solver error: {0}")]
    Solver(#[from] SolverError),
    #[error("plot error: {0}")]
    Plot(String),
}

/// Runs every configured experiment without touching the filesystem.
pub fn run_experiments(config: &RollConfig) -> Result<Vec<ExperimentResult>, RollError> {
    config.validate()?;
    if config.has_mixed_units() {
        warn!(
            "experiments present the same roll angle with different unit conversions; \
             pass --consistent-units to plot every figure in model units"
        );
    }

    let time_grid = config.time.grid();
    let mut results = Vec::with_capacity(config.experiments.len());
    for experiment in &config.experiments {
        results.push(run_experiment(config, experiment, &time_grid)?);
    }
    Ok(results)
}

/// Runs the experiments and writes curves, summary and figures into a fresh
/// timestamped directory below `output_base`.
pub fn run(config: &RollConfig, output_base: &Path) -> Result<RunSummary, RollError> {
    let experiments = run_experiments(config)?;
    let output_dir = output::create_timestamped_run_dir(output_base)?;
    let summary = write_artifacts(config, experiments, &output_dir)?;

    info!(
        output_dir = %summary.outputs.output_dir.display(),
        experiments = summary.experiments.len(),
        "run complete"
    );
    Ok(summary)
}

/// Writes figures, curves and summary for finished experiments into
/// `output_dir`. Figures are rendered first so a plotting failure leaves no
/// partial data files behind.
pub fn write_artifacts(
    config: &RollConfig,
    experiments: Vec<ExperimentResult>,
    output_dir: &Path,
) -> Result<RunSummary, RollError> {
    let files = OutputFiles::in_dir(output_dir, &experiments, config.render_plots);

    if config.render_plots {
        output::make_plots(&experiments, &files)?;
    }
    output::write_curves_csv(&files.csv_path, &experiments)?;

    let summary = RunSummary {
        config: config.clone(),
        samples: config.time.samples,
        mixed_units: config.has_mixed_units(),
        experiments,
        outputs: files,
    };
    output::write_summary(&summary.outputs.summary_path, &summary)?;
    Ok(summary)
}
