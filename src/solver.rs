//! Zero-input response of a second-order transfer function.
//!
//! The system is `1 / (a s^2 + b s + c)` realised in physical coordinates
//! `x = [theta, theta']`, so the output is the first state and the first
//! sample of every response equals the initial angle.

use nalgebra::{Matrix2, Vector2};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::RollModel;

/// Relative tolerance used to decide whether two grid intervals share a
/// transition matrix.
const STEP_REUSE_TOL: f64 = 1.0e-12;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SolverError {
    #[error("denominator coefficient {index} is not finite: {value}")]
    NonFiniteCoefficient { index: usize, value: f64 },
    #[error("leading coefficient must be positive for a proper second-order system, got {0}")]
    ImproperSystem(f64),
    #[error("initial state must be finite, got ({angle}, {rate})")]
    NonFiniteInitialState { angle: f64, rate: f64 },
    #[error("time grid is empty")]
    EmptyTimeGrid,
    #[error("time grid must be finite and non-decreasing (offending index {index})")]
    InvalidTimeGrid { index: usize },
    #[error("rk4 needs at least one substep per grid interval")]
    InvalidSubsteps,
}

/// Integration scheme used by [`simulate_with`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "method", rename_all = "snake_case")]
pub enum SolverMethod {
    /// Exact propagation with the matrix exponential of the state matrix.
    StateTransition,
    /// Classical fourth-order Runge-Kutta with a fixed number of substeps
    /// per grid interval.
    Rk4 { substeps: usize },
}

impl Default for SolverMethod {
    fn default() -> Self {
        Self::StateTransition
    }
}

/// Free response of `1 / (den[0] s^2 + den[1] s + den[2])` sampled on
/// `time_grid`, starting from `(angle, rate)` at `time_grid[0]`.
pub fn simulate(
    denominator: [f64; 3],
    initial_state: (f64, f64),
    time_grid: &[f64],
) -> Result<Vec<f64>, SolverError> {
    simulate_with(SolverMethod::default(), denominator, initial_state, time_grid)
}

pub fn simulate_with(
    method: SolverMethod,
    denominator: [f64; 3],
    initial_state: (f64, f64),
    time_grid: &[f64],
) -> Result<Vec<f64>, SolverError> {
    let model = RollModel::from_denominator(denominator)?;
    let (angle, rate) = initial_state;
    if !(angle.is_finite() && rate.is_finite()) {
        return Err(SolverError::NonFiniteInitialState { angle, rate });
    }
    validate_time_grid(time_grid)?;

    let a = model.state_matrix();
    let x0 = Vector2::new(angle, rate);

    match method {
        SolverMethod::StateTransition => Ok(propagate_exact(&a, x0, time_grid)),
        SolverMethod::Rk4 { substeps } => {
            if substeps == 0 {
                return Err(SolverError::InvalidSubsteps);
            }
            Ok(propagate_rk4(&a, x0, time_grid, substeps))
        }
    }
}

fn validate_time_grid(time_grid: &[f64]) -> Result<(), SolverError> {
    let first = time_grid.first().ok_or(SolverError::EmptyTimeGrid)?;
    if !first.is_finite() {
        return Err(SolverError::InvalidTimeGrid { index: 0 });
    }

    for (idx, pair) in time_grid.windows(2).enumerate() {
        if !pair[1].is_finite() || pair[1] < pair[0] {
            return Err(SolverError::InvalidTimeGrid { index: idx + 1 });
        }
    }

    Ok(())
}

fn propagate_exact(a: &Matrix2<f64>, x0: Vector2<f64>, time_grid: &[f64]) -> Vec<f64> {
    let mut out = Vec::with_capacity(time_grid.len());
    let mut x = x0;
    out.push(x.x);

    let mut cached: Option<(f64, Matrix2<f64>)> = None;
    for pair in time_grid.windows(2) {
        let dt = pair[1] - pair[0];
        if dt == 0.0 {
            out.push(x.x);
            continue;
        }
        let phi = match cached {
            Some((h, phi)) if (h - dt).abs() <= STEP_REUSE_TOL * h.abs().max(1.0) => phi,
            _ => {
                let phi = (a * dt).exp();
                cached = Some((dt, phi));
                phi
            }
        };
        x = phi * x;
        out.push(x.x);
    }

    out
}

fn propagate_rk4(
    a: &Matrix2<f64>,
    x0: Vector2<f64>,
    time_grid: &[f64],
    substeps: usize,
) -> Vec<f64> {
    let mut out = Vec::with_capacity(time_grid.len());
    let mut x = x0;
    out.push(x.x);

    for pair in time_grid.windows(2) {
        let h = (pair[1] - pair[0]) / substeps as f64;
        for _ in 0..substeps {
            x = rk4_step(a, &x, h);
        }
        out.push(x.x);
    }

    out
}

fn rk4_step(a: &Matrix2<f64>, x: &Vector2<f64>, h: f64) -> Vector2<f64> {
    let k1 = a * x;
    let k2 = a * (x + k1 * (0.5 * h));
    let k3 = a * (x + k2 * (0.5 * h));
    let k4 = a * (x + k3 * h);

    x + (k1 + k2 * 2.0 + k3 * 2.0 + k4) * (h / 6.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::linspace;
    use approx::assert_relative_eq;

    const SCENARIO: [f64; 3] = [100.0, 10.0, 490.5];

    #[test]
    fn first_sample_is_initial_angle() {
        let grid = linspace(0.0, 40.0, 400);
        let y = simulate(SCENARIO, (20.0, 0.0), &grid).unwrap();
        assert_eq!(y.len(), 400);
        assert_eq!(y[0], 20.0);
    }

    #[test]
    fn scenario_decays_by_end_of_horizon() {
        let grid = linspace(0.0, 40.0, 400);
        let y = simulate(SCENARIO, (20.0, 0.0), &grid).unwrap();

        let tail_peak = y[360..].iter().fold(0.0_f64, |acc, v| acc.max(v.abs()));
        assert!(tail_peak < 4.0, "tail peak {tail_peak}");

        let head_peak = y[..40].iter().fold(0.0_f64, |acc, v| acc.max(v.abs()));
        assert!(tail_peak < head_peak);
    }

    #[test]
    fn matches_closed_form_underdamped_response() {
        let [a, b, c] = SCENARIO;
        let sigma = b / (2.0 * a);
        let wd = (c / a - sigma * sigma).sqrt();
        let grid = linspace(0.0, 10.0, 101);
        let y = simulate(SCENARIO, (20.0, 0.0), &grid).unwrap();

        for (t, v) in grid.iter().zip(&y) {
            let exact = 20.0 * (-sigma * t).exp() * ((wd * t).cos() + sigma / wd * (wd * t).sin());
            assert_relative_eq!(*v, exact, epsilon = 1.0e-9);
        }
    }

    #[test]
    fn initial_rate_moves_the_response() {
        let grid = linspace(0.0, 1.0, 11);
        let y = simulate(SCENARIO, (0.0, 1.0), &grid).unwrap();
        assert_eq!(y[0], 0.0);
        assert!(y[1] > 0.0);
    }

    #[test]
    fn rk4_agrees_with_state_transition() {
        let grid = linspace(0.0, 40.0, 400);
        let exact = simulate(SCENARIO, (20.0, 0.0), &grid).unwrap();
        let rk4 = simulate_with(SolverMethod::Rk4 { substeps: 32 }, SCENARIO, (20.0, 0.0), &grid)
            .unwrap();

        for (e, r) in exact.iter().zip(&rk4) {
            assert_relative_eq!(*e, *r, epsilon = 1.0e-6);
        }
    }

    #[test]
    fn overdamped_response_decays_without_crossing_zero() {
        let grid = linspace(0.0, 40.0, 400);
        let y = simulate([1.0, 10.0, 1.0], (20.0, 0.0), &grid).unwrap();

        assert_eq!(y[0], 20.0);
        assert!(y.iter().all(|v| *v >= 0.0));
        assert!(y.windows(2).all(|p| p[1] <= p[0]));
        assert!(y[399] < 1.0, "final value {}", y[399]);
    }

    #[test]
    fn critically_damped_matches_closed_form() {
        // repeated pole at -1: theta(t) = (x0 + (v0 + x0) t) e^{-t}
        let grid = linspace(0.0, 40.0, 400);
        let (x0, v0) = (20.0, 0.0);
        let y = simulate([1.0, 2.0, 1.0], (x0, v0), &grid).unwrap();

        for (t, v) in grid.iter().zip(&y) {
            let exact = (x0 + (v0 + x0) * t) * (-t).exp();
            assert_relative_eq!(*v, exact, epsilon = 1.0e-9);
        }
        assert!(y[399].abs() < 1.0e-9);
    }

    #[test]
    fn non_uniform_grid_is_supported() {
        let grid = [0.0, 0.05, 0.3, 0.3, 1.0, 2.5];
        let y = simulate(SCENARIO, (20.0, 0.0), &grid).unwrap();
        let dense = simulate(SCENARIO, (20.0, 0.0), &linspace(0.0, 2.5, 51)).unwrap();
        assert_eq!(y[2], y[3]);
        assert_relative_eq!(y[5], dense[50], epsilon = 1.0e-9);
    }

    #[test]
    fn rejects_improper_system() {
        let grid = linspace(0.0, 1.0, 10);
        assert_eq!(
            simulate([0.0, 10.0, 490.5], (20.0, 0.0), &grid),
            Err(SolverError::ImproperSystem(0.0))
        );
        assert!(matches!(
            simulate([-1.0, 10.0, 490.5], (20.0, 0.0), &grid),
            Err(SolverError::ImproperSystem(_))
        ));
    }

    #[test]
    fn rejects_malformed_inputs() {
        let grid = linspace(0.0, 1.0, 10);
        assert!(matches!(
            simulate([100.0, f64::NAN, 1.0], (20.0, 0.0), &grid),
            Err(SolverError::NonFiniteCoefficient { index: 1, .. })
        ));
        assert!(matches!(
            simulate(SCENARIO, (f64::INFINITY, 0.0), &grid),
            Err(SolverError::NonFiniteInitialState { .. })
        ));
        assert_eq!(
            simulate(SCENARIO, (20.0, 0.0), &[]),
            Err(SolverError::EmptyTimeGrid)
        );
        assert_eq!(
            simulate(SCENARIO, (20.0, 0.0), &[0.0, 1.0, 0.5]),
            Err(SolverError::InvalidTimeGrid { index: 2 })
        );
        assert_eq!(
            simulate_with(SolverMethod::Rk4 { substeps: 0 }, SCENARIO, (20.0, 0.0), &grid),
            Err(SolverError::InvalidSubsteps)
        );
    }
}
