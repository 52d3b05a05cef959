use serde::Serialize;
use tracing::{debug, info};

use crate::analysis::ResponseMetrics;
use crate::config::{Conversion, ExperimentConfig, RollConfig, SweptParameter};
use crate::model::{Pole, RollModel};
use crate::solver::{simulate_with, SolverError};

/// One labelled response curve of an experiment.
#[derive(Debug, Clone, Serialize)]
pub struct ResponseCurve {
    pub label: String,
    pub swept_value: f64,
    pub model: RollModel,
    pub poles: [Pole; 2],
    pub natural_frequency_rad_s: f64,
    pub damping_ratio: Option<f64>,
    pub metrics: ResponseMetrics,
    /// Response after the experiment's conversion, one value per grid sample.
    #[serde(skip_serializing)]
    pub values: Vec<f64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ExperimentResult {
    pub name: String,
    pub title: String,
    pub swept: SweptParameter,
    pub conversion: Conversion,
    #[serde(skip_serializing)]
    pub time: Vec<f64>,
    pub curves: Vec<ResponseCurve>,
}

impl ExperimentResult {
    pub fn y_label(&self) -> &'static str {
        self.conversion.axis_label()
    }

    /// `(min, max)` over every curve, `None` when there are no samples.
    pub fn value_range(&self) -> Option<(f64, f64)> {
        self.curves
            .iter()
            .flat_map(|c| c.values.iter().copied())
            .fold(None, |acc, v| match acc {
                None => Some((v, v)),
                Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
            })
    }
}

/// Model used for one swept value of `experiment`.
pub fn model_for(
    config: &RollConfig,
    experiment: &ExperimentConfig,
    value: f64,
) -> Result<RollModel, SolverError> {
    let (damping, metacentric_height) = experiment.parameters_at(value);
    let restoring = RollModel::restoring_from(config.buoyancy(), metacentric_height);
    RollModel::new(config.inertia, damping, restoring)
}

/// Solves every swept value of `experiment` on the shared `time_grid`.
pub fn run_experiment(
    config: &RollConfig,
    experiment: &ExperimentConfig,
    time_grid: &[f64],
) -> Result<ExperimentResult, SolverError> {
    info!(
        experiment = %experiment.name,
        swept = ?experiment.swept,
        curves = experiment.values.len(),
        "running sweep"
    );

    let mut curves = Vec::with_capacity(experiment.values.len());
    for &value in &experiment.values {
        let model = model_for(config, experiment, value)?;
        let raw = simulate_with(
            config.solver,
            model.denominator(),
            config.initial_state(),
            time_grid,
        )?;
        let values: Vec<f64> = raw.iter().map(|v| experiment.conversion.apply(*v)).collect();
        let metrics = ResponseMetrics::from_curve(time_grid, &values);
        let poles = model.poles();

        debug!(
            label = %experiment.swept.label(value),
            ?poles,
            natural_frequency = model.natural_frequency(),
            damping_ratio = ?model.damping_ratio(),
            peak_overshoot = metrics.peak_overshoot,
            settling_time = ?metrics.settling_time_s,
            "curve solved"
        );

        curves.push(ResponseCurve {
            label: experiment.swept.label(value),
            swept_value: value,
            model,
            poles,
            natural_frequency_rad_s: model.natural_frequency(),
            damping_ratio: model.damping_ratio(),
            metrics,
            values,
        });
    }

    Ok(ExperimentResult {
        name: experiment.name.clone(),
        title: experiment.title.clone(),
        swept: experiment.swept,
        conversion: experiment.conversion,
        time: time_grid.to_vec(),
        curves,
    })
}
