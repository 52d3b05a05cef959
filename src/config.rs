use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::solver::SolverMethod;
use crate::RollError;

/// Exact radians-to-degrees factor.
pub const RAD_TO_DEG: f64 = 180.0 / std::f64::consts::PI;

/// Physical parameter varied across the curves of one experiment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SweptParameter {
    MetacentricHeight,
    Damping,
}

impl SweptParameter {
    pub fn label(&self, value: f64) -> String {
        match self {
            Self::MetacentricHeight => format!("MH = {} m", trim_value(value)),
            Self::Damping => format!("Dp = {} N·m·s", trim_value(value)),
        }
    }
}

fn trim_value(value: f64) -> String {
    let text = format!("{value:.4}");
    text.trim_end_matches('0').trim_end_matches('.').to_string()
}

/// Conversion applied to the solver output before it is plotted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Conversion {
    Identity,
    RadiansToDegrees,
}

impl Conversion {
    pub fn apply(&self, value: f64) -> f64 {
        match self {
            Self::Identity => value,
            Self::RadiansToDegrees => value * RAD_TO_DEG,
        }
    }

    pub fn axis_label(&self) -> &'static str {
        match self {
            Self::Identity => "Roll (deg)",
            Self::RadiansToDegrees => "Roll (deg, converted from rad)",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeGridConfig {
    /// First sample instant [s]
    pub start: f64,
    /// Last sample instant [s]
    pub end: f64,
    /// Number of evenly spaced samples, end points included
    pub samples: usize,
}

impl Default for TimeGridConfig {
    fn default() -> Self {
        Self {
            start: 0.0,
            end: 40.0,
            samples: 400,
        }
    }
}

impl TimeGridConfig {
    pub fn grid(&self) -> Vec<f64> {
        linspace(self.start, self.end, self.samples)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExperimentConfig {
    /// Short identifier used in file names
    pub name: String,
    /// Figure title
    pub title: String,
    pub swept: SweptParameter,
    pub values: Vec<f64>,
    /// Damping used when damping is not the swept parameter [N m s]
    pub damping: f64,
    /// Metacentric height used when it is not the swept parameter [m]
    pub metacentric_height: f64,
    pub conversion: Conversion,
}

impl ExperimentConfig {
    /// Metacentric-height sweep with constant damping, plotted in native units.
    pub fn metacentric_height_sweep() -> Self {
        Self {
            name: "metacentric_height".to_string(),
            title: "Impulse response of roll motion: metacentric height".to_string(),
            swept: SweptParameter::MetacentricHeight,
            values: linspace(0.1, 0.3, 3),
            damping: 10.0,
            metacentric_height: 0.2,
            conversion: Conversion::Identity,
        }
    }

    /// Damping sweep with constant metacentric height, converted to degrees.
    pub fn damping_sweep() -> Self {
        Self {
            name: "damping".to_string(),
            title: "Impulse response of roll motion: damping".to_string(),
            swept: SweptParameter::Damping,
            values: linspace(10.0, 100.0, 3),
            damping: 10.0,
            metacentric_height: 0.2,
            conversion: Conversion::RadiansToDegrees,
        }
    }

    /// `(damping, metacentric_height)` for one swept value.
    pub fn parameters_at(&self, value: f64) -> (f64, f64) {
        match self.swept {
            SweptParameter::MetacentricHeight => (self.damping, value),
            SweptParameter::Damping => (value, self.metacentric_height),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RollConfig {
    /// Roll moment of inertia [kg m^2]
    pub inertia: f64,
    /// Vehicle mass [kg]
    pub mass: f64,
    /// Gravitational acceleration [m/s^2]
    pub gravity: f64,
    /// Initial roll angle
    pub initial_angle: f64,
    /// Initial roll rate
    pub initial_rate: f64,
    pub time: TimeGridConfig,
    pub solver: SolverMethod,
    pub experiments: Vec<ExperimentConfig>,
    /// Base directory for run artefacts
    pub output_dir: PathBuf,
    pub render_plots: bool,
}

impl Default for RollConfig {
    fn default() -> Self {
        Self {
            inertia: 100.0,
            mass: 500.0,
            gravity: 9.81,
            initial_angle: 20.0,
            initial_rate: 0.0,
            time: TimeGridConfig::default(),
            solver: SolverMethod::StateTransition,
            experiments: vec![
                ExperimentConfig::metacentric_height_sweep(),
                ExperimentConfig::damping_sweep(),
            ],
            output_dir: PathBuf::from("output-auv-roll"),
            render_plots: true,
        }
    }
}

impl RollConfig {
    /// Buoyant force `mass * g` [N].
    pub fn buoyancy(&self) -> f64 {
        self.mass * self.gravity
    }

    pub fn initial_state(&self) -> (f64, f64) {
        (self.initial_angle, self.initial_rate)
    }

    /// Presents every experiment in the native model unit.
    pub fn with_consistent_units(mut self) -> Self {
        for experiment in &mut self.experiments {
            experiment.conversion = Conversion::Identity;
        }
        self
    }

    pub fn has_mixed_units(&self) -> bool {
        self.experiments
            .windows(2)
            .any(|pair| pair[0].conversion != pair[1].conversion)
    }

    pub fn validate(&self) -> Result<(), RollError> {
        ensure_positive("inertia", self.inertia)?;
        ensure_positive("mass", self.mass)?;
        ensure_positive("gravity", self.gravity)?;
        ensure_finite("initial_angle", self.initial_angle)?;
        ensure_finite("initial_rate", self.initial_rate)?;

        ensure_finite("time.start", self.time.start)?;
        ensure_finite("time.end", self.time.end)?;
        if self.time.end <= self.time.start {
            return Err(invalid("time.end must be greater than time.start"));
        }
        if self.time.samples < 2 {
            return Err(invalid("time.samples must be at least 2"));
        }

        if let SolverMethod::Rk4 { substeps } = self.solver {
            if substeps == 0 {
                return Err(invalid("solver.substeps must be greater than zero"));
            }
        }

        if self.experiments.is_empty() {
            return Err(invalid("at least one experiment must be configured"));
        }

        for experiment in &self.experiments {
            if experiment.name.trim().is_empty() {
                return Err(invalid("experiment name must not be empty"));
            }
            if experiment.values.is_empty() {
                return Err(RollError::InvalidConfig(format!(
                    "experiment '{}' has no swept values",
                    experiment.name
                )));
            }
            if experiment.values.iter().any(|v| !v.is_finite()) {
                return Err(RollError::InvalidConfig(format!(
                    "experiment '{}' has non-finite swept values",
                    experiment.name
                )));
            }
            ensure_finite("experiment.damping", experiment.damping)?;
            ensure_finite("experiment.metacentric_height", experiment.metacentric_height)?;
        }

        let mut names: Vec<&str> = self.experiments.iter().map(|e| e.name.as_str()).collect();
        names.sort_unstable();
        if names.windows(2).any(|pair| pair[0] == pair[1]) {
            return Err(invalid("experiment names must be unique"));
        }

        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self, RollError> {
        let raw = fs::read_to_string(path)?;
        let config: RollConfig = serde_json::from_str(&raw)?;
        Ok(config)
    }
}

/// `samples` evenly spaced values from `start` to `end`, both included.
pub fn linspace(start: f64, end: f64, samples: usize) -> Vec<f64> {
    match samples {
        0 => Vec::new(),
        1 => vec![start],
        _ => {
            let span = end - start;
            let denom = (samples - 1) as f64;
            (0..samples)
                .map(|idx| start + span * idx as f64 / denom)
                .collect()
        }
    }
}

fn invalid(message: &str) -> RollError {
    RollError::InvalidConfig(message.to_string())
}

fn ensure_finite(name: &str, value: f64) -> Result<(), RollError> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(RollError::InvalidConfig(format!("{name} must be finite")))
    }
}

fn ensure_positive(name: &str, value: f64) -> Result<(), RollError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(RollError::InvalidConfig(format!("{name} must be > 0")))
    }
}
