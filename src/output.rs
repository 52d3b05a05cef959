use std::fs;
use std::path::{Path, PathBuf};

use chrono::Utc;
use plotters::prelude::*;
use serde::Serialize;

use crate::config::RollConfig;
use crate::sweep::ExperimentResult;
use crate::RollError;

#[derive(Debug, Clone, Serialize)]
pub struct CurveRecord<'a> {
    pub experiment: &'a str,
    pub label: &'a str,
    pub swept_value: f64,
    pub time_s: f64,
    pub value: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct OutputFiles {
    pub output_dir: PathBuf,
    pub csv_path: PathBuf,
    pub summary_path: PathBuf,
    pub plot_paths: Vec<PathBuf>,
}

impl OutputFiles {
    pub fn in_dir(output_dir: &Path, experiments: &[ExperimentResult], render_plots: bool) -> Self {
        let plot_paths = if render_plots {
            experiments
                .iter()
                .map(|e| output_dir.join(format!("experiment_{}.png", e.name)))
                .collect()
        } else {
            Vec::new()
        };

        Self {
            output_dir: output_dir.to_path_buf(),
            csv_path: output_dir.join("curves.csv"),
            summary_path: output_dir.join("summary.json"),
            plot_paths,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub config: RollConfig,
    pub samples: usize,
    pub mixed_units: bool,
    pub experiments: Vec<ExperimentResult>,
    pub outputs: OutputFiles,
}

pub fn create_timestamped_run_dir(base_dir: &Path) -> Result<PathBuf, RollError> {
    fs::create_dir_all(base_dir)?;

    let timestamp = Utc::now().format("%Y%m%d-%H%M%S").to_string();
    let mut run_dir = base_dir.join(&timestamp);
    let mut counter: usize = 1;

    while run_dir.exists() {
        run_dir = base_dir.join(format!("{timestamp}-{counter:02}"));
        counter += 1;
    }

    fs::create_dir_all(&run_dir)?;
    Ok(run_dir)
}

pub fn write_curves_csv(path: &Path, experiments: &[ExperimentResult]) -> Result<(), RollError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let mut writer = csv::Writer::from_path(path)?;
    for experiment in experiments {
        for curve in &experiment.curves {
            for (t, v) in experiment.time.iter().zip(&curve.values) {
                writer.serialize(CurveRecord {
                    experiment: &experiment.name,
                    label: &curve.label,
                    swept_value: curve.swept_value,
                    time_s: *t,
                    value: *v,
                })?;
            }
        }
    }

    writer.flush()?;
    Ok(())
}

pub fn write_summary(path: &Path, summary: &RunSummary) -> Result<(), RollError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let data = serde_json::to_string_pretty(summary)?;
    fs::write(path, data)?;
    Ok(())
}

pub fn make_plots(experiments: &[ExperimentResult], files: &OutputFiles) -> Result<(), RollError> {
    for (experiment, path) in experiments.iter().zip(&files.plot_paths) {
        plot_experiment(experiment, path)
            .map_err(|e| RollError::Plot(format!("{}: {e}", path.display())))?;
    }
    Ok(())
}

fn plot_experiment(
    experiment: &ExperimentResult,
    path: &Path,
) -> Result<(), Box<dyn std::error::Error>> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let root = BitMapBackend::new(path, (1280, 720)).into_drawing_area();
    root.fill(&WHITE)?;

    let t_min = experiment.time.first().copied().unwrap_or(0.0);
    let t_max = experiment.time.last().copied().unwrap_or(1.0).max(t_min + 1.0e-9);
    let (lo, hi) = experiment.value_range().unwrap_or((-1.0, 1.0));
    let pad = ((hi - lo) * 0.05).max(1.0e-9);

    let mut chart = ChartBuilder::on(&root)
        .caption(&experiment.title, ("sans-serif", 30).into_font())
        .margin(20)
        .x_label_area_size(50)
        .y_label_area_size(80)
        .build_cartesian_2d(t_min..t_max, (lo - pad)..(hi + pad))?;

    chart
        .configure_mesh()
        .x_desc("Time (s)")
        .y_desc(experiment.y_label())
        .draw()?;

    for (idx, curve) in experiment.curves.iter().enumerate() {
        let color = Palette99::pick(idx).to_rgba();
        chart
            .draw_series(LineSeries::new(
                experiment.time.iter().copied().zip(curve.values.iter().copied()),
                color.stroke_width(2),
            ))?
            .label(curve.label.as_str())
            .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 25, y)], color.stroke_width(3)));
    }

    chart
        .configure_series_labels()
        .position(SeriesLabelPosition::UpperRight)
        .border_style(BLACK)
        .background_style(WHITE.mix(0.7))
        .draw()?;

    root.present()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sweep::run_experiment;

    fn experiments(cfg: &RollConfig) -> Vec<ExperimentResult> {
        let grid = cfg.time.grid();
        cfg.experiments
            .iter()
            .map(|e| run_experiment(cfg, e, &grid).unwrap())
            .collect()
    }

    #[test]
    fn run_dirs_do_not_collide() {
        let tmp = tempfile::tempdir().unwrap();
        let first = create_timestamped_run_dir(tmp.path()).unwrap();
        let second = create_timestamped_run_dir(tmp.path()).unwrap();
        assert_ne!(first, second);
        assert!(first.is_dir() && second.is_dir());
    }

    #[test]
    fn csv_has_one_row_per_sample() {
        let mut cfg = RollConfig::default();
        cfg.time.samples = 25;
        let results = experiments(&cfg);

        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("curves.csv");
        write_curves_csv(&path, &results).unwrap();

        let mut reader = csv::Reader::from_path(&path).unwrap();
        let headers = reader.headers().unwrap().clone();
        assert_eq!(
            headers.iter().collect::<Vec<_>>(),
            vec!["experiment", "label", "swept_value", "time_s", "value"]
        );
        assert_eq!(reader.records().count(), 2 * 3 * 25);
    }

    #[test]
    fn figures_are_rendered_for_every_experiment() {
        let cfg = RollConfig::default();
        let results = experiments(&cfg);

        let tmp = tempfile::tempdir().unwrap();
        let files = OutputFiles::in_dir(tmp.path(), &results, true);
        make_plots(&results, &files).unwrap();

        assert_eq!(files.plot_paths.len(), 2);
        for path in &files.plot_paths {
            let len = fs::metadata(path).unwrap().len();
            assert!(len > 0, "{} is empty", path.display());
        }
    }

    #[test]
    fn plot_paths_follow_experiment_names() {
        let cfg = RollConfig::default();
        let results = experiments(&cfg);
        let files = OutputFiles::in_dir(Path::new("out"), &results, true);
        assert_eq!(
            files.plot_paths,
            vec![
                PathBuf::from("out/experiment_metacentric_height.png"),
                PathBuf::from("out/experiment_damping.png"),
            ]
        );
        assert!(OutputFiles::in_dir(Path::new("out"), &results, false)
            .plot_paths
            .is_empty());
    }
}
