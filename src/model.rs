use nalgebra::Matrix2;
use serde::Serialize;

use crate::solver::SolverError;

/// Second-order roll model `inertia * theta'' + damping * theta' + restoring * theta = 0`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RollModel {
    /// Roll moment of inertia [kg m^2]
    pub inertia: f64,
    /// Roll damping coefficient [N m s]
    pub damping: f64,
    /// Buoyant restoring torque per unit roll angle, `mass * g * MH` [N m]
    pub restoring: f64,
}

/// Root of the characteristic polynomial.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Pole {
    pub re: f64,
    pub im: f64,
}

impl RollModel {
    pub fn new(inertia: f64, damping: f64, restoring: f64) -> Result<Self, SolverError> {
        Self::from_denominator([inertia, damping, restoring])
    }

    /// Builds the model from transfer-function denominator coefficients,
    /// highest power first.
    pub fn from_denominator(denominator: [f64; 3]) -> Result<Self, SolverError> {
        for (index, value) in denominator.iter().copied().enumerate() {
            if !value.is_finite() {
                return Err(SolverError::NonFiniteCoefficient { index, value });
            }
        }
        if denominator[0] <= 0.0 {
            return Err(SolverError::ImproperSystem(denominator[0]));
        }

        Ok(Self {
            inertia: denominator[0],
            damping: denominator[1],
            restoring: denominator[2],
        })
    }

    /// Restoring coefficient for a given buoyancy force `mass * g` and
    /// metacentric height.
    pub fn restoring_from(buoyancy: f64, metacentric_height: f64) -> f64 {
        buoyancy * metacentric_height
    }

    pub fn denominator(&self) -> [f64; 3] {
        [self.inertia, self.damping, self.restoring]
    }

    /// State matrix for `x = [theta, theta']`.
    pub fn state_matrix(&self) -> Matrix2<f64> {
        Matrix2::new(
            0.0,
            1.0,
            -self.restoring / self.inertia,
            -self.damping / self.inertia,
        )
    }

    pub fn poles(&self) -> [Pole; 2] {
        let a = self.inertia;
        let b = self.damping;
        let c = self.restoring;
        let disc = b * b - 4.0 * a * c;

        if disc >= 0.0 {
            let root = disc.sqrt();
            [
                Pole { re: (-b + root) / (2.0 * a), im: 0.0 },
                Pole { re: (-b - root) / (2.0 * a), im: 0.0 },
            ]
        } else {
            let re = -b / (2.0 * a);
            let im = (-disc).sqrt() / (2.0 * a);
            [Pole { re, im }, Pole { re, im: -im }]
        }
    }

    /// Undamped natural frequency [rad/s]. Zero when there is no positive
    /// restoring stiffness.
    pub fn natural_frequency(&self) -> f64 {
        (self.restoring / self.inertia).max(0.0).sqrt()
    }

    /// Dimensionless damping ratio, `None` without positive stiffness.
    pub fn damping_ratio(&self) -> Option<f64> {
        if self.restoring <= 0.0 {
            return None;
        }
        Some(self.damping / (2.0 * (self.inertia * self.restoring).sqrt()))
    }

    pub fn is_stable(&self) -> bool {
        self.poles().iter().all(|p| p.re < 0.0)
    }
}
