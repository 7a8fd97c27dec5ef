//! # Kepler equation and anomaly conversions
//!
//! Elliptic Kepler equation `M = E − e·sin(E)` solved with Newton–Raphson, plus the
//! closed-form maps between eccentric, true and mean anomalies.
//!
//! The solver never panics and never raises on its own: it returns a
//! [`KeplerSolution`] that records whether the tolerance was met. Turning an
//! unconverged solution into an error is the caller's decision, see
//! [`KeplerSolution::into_result`].
use std::f64::consts::PI;

use serde::{Deserialize, Serialize};

use crate::{constants::DPI, meeprop_errors::MeePropError};

/// Returns the principal value of an angle in radians, in [0, 2π).
pub fn principal_angle(a: f64) -> f64 {
    a.rem_euclid(DPI)
}

/// Returns the principal difference between two angles, in [-π, π].
pub fn angle_diff(a: f64, b: f64) -> f64 {
    let mut diff = principal_angle(a) - principal_angle(b);

    if diff > PI {
        diff -= DPI;
    } else if diff < -PI {
        diff += DPI;
    }

    diff
}

/// Newton–Raphson settings for the elliptic Kepler equation.
///
/// Defaults: `tolerance = 1e-5` rad on the Newton correction, `max_iterations = 10`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct KeplerSolver {
    pub tolerance: f64,
    pub max_iterations: usize,
}

impl Default for KeplerSolver {
    fn default() -> Self {
        KeplerSolver {
            tolerance: 1e-5,
            max_iterations: 10,
        }
    }
}

/// Outcome of [`KeplerSolver::mean_to_eccentric`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KeplerSolution {
    /// Best estimate of the eccentric anomaly (rad).
    pub eccentric_anomaly: f64,
    /// Number of Newton updates performed.
    pub iterations: usize,
    /// Magnitude of the last Newton correction `|δ|`.
    pub last_correction: f64,
    /// `true` when the loop stopped on `|δ| ≤ tolerance`.
    pub converged: bool,
    mean_anomaly: f64,
    eccentricity: f64,
}

impl KeplerSolution {
    /// Residual of Kepler's equation `E − e·sin(E) − M` at the returned estimate.
    pub fn residual(&self) -> f64 {
        self.eccentric_anomaly - self.eccentricity * self.eccentric_anomaly.sin()
            - self.mean_anomaly
    }

    /// Strict view of the solution: an unconverged estimate becomes
    /// [`MeePropError::KeplerNotConverged`].
    pub fn into_result(self) -> Result<f64, MeePropError> {
        if self.converged {
            Ok(self.eccentric_anomaly)
        } else {
            Err(MeePropError::KeplerNotConverged {
                mean_anomaly: self.mean_anomaly,
                eccentricity: self.eccentricity,
                iterations: self.iterations,
                last_correction: self.last_correction,
            })
        }
    }
}

/// What to do with a [`KeplerSolution`] that ran out of iterations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum KeplerPolicy {
    /// Unconverged solutions become [`MeePropError::KeplerNotConverged`].
    #[default]
    Strict,
    /// Keep the best estimate and emit a `log::warn!`.
    Warn,
}

impl KeplerPolicy {
    pub fn resolve(self, solution: KeplerSolution) -> Result<f64, MeePropError> {
        match self {
            KeplerPolicy::Strict => solution.into_result(),
            KeplerPolicy::Warn => {
                if !solution.converged {
                    log::warn!(
                        "Kepler solver stopped after {} iterations (|δ| = {:e}) for M = {}, e = {}; \
                         continuing with the best estimate",
                        solution.iterations,
                        solution.last_correction,
                        solution.mean_anomaly,
                        solution.eccentricity
                    );
                }
                Ok(solution.eccentric_anomaly)
            }
        }
    }
}

impl KeplerSolver {
    pub fn new(tolerance: f64, max_iterations: usize) -> Self {
        KeplerSolver {
            tolerance,
            max_iterations,
        }
    }

    /// Solve `M = E − e·sin(E)` for the eccentric anomaly.
    ///
    /// Arguments
    /// ---------
    /// * `mean_anomaly` – `M` in radians, any real value (typically [0, 2π)).
    /// * `eccentricity` – `e ∈ [0, 1)`.
    ///
    /// Return
    /// ------
    /// * A [`KeplerSolution`]; when the iteration budget runs out before
    ///   `|δ| ≤ tolerance`, the last estimate is returned with `converged == false`.
    ///
    /// Errors
    /// ------
    /// * [`MeePropError::DegenerateGeometry`] if `e` is outside [0, 1) or not finite.
    pub fn mean_to_eccentric(
        &self,
        mean_anomaly: f64,
        eccentricity: f64,
    ) -> Result<KeplerSolution, MeePropError> {
        check_elliptic(eccentricity)?;
        if !mean_anomaly.is_finite() {
            return Err(MeePropError::DegenerateGeometry(format!(
                "mean anomaly must be finite, got {mean_anomaly}"
            )));
        }

        // start half an eccentricity toward the expected correction
        let mut ecc_anom = if mean_anomaly < PI {
            mean_anomaly + eccentricity / 2.0
        } else {
            mean_anomaly - eccentricity / 2.0
        };

        let mut iterations = 0;
        let mut last_correction = f64::INFINITY;
        let mut converged = false;

        while iterations < self.max_iterations {
            let delta = (ecc_anom - eccentricity * ecc_anom.sin() - mean_anomaly)
                / (1.0 - eccentricity * ecc_anom.cos());
            ecc_anom -= delta;
            iterations += 1;
            last_correction = delta.abs();

            if last_correction <= self.tolerance {
                converged = true;
                break;
            }
        }

        Ok(KeplerSolution {
            eccentric_anomaly: ecc_anom,
            iterations,
            last_correction,
            converged,
            mean_anomaly,
            eccentricity,
        })
    }
}

/// Eccentric anomaly → true anomaly.
///
/// Same value as `2·atan(√((1+e)/(1−e))·tan(E/2))`, written with `atan2` so that
/// `E = π` is well defined. For `E ∈ [0, 2π)` the result lies in [0, 2π); other
/// inputs give the same angle modulo 2π, somewhere in (−2π, 2π].
pub fn eccentric_to_true(eccentric_anomaly: f64, eccentricity: f64) -> Result<f64, MeePropError> {
    check_elliptic(eccentricity)?;
    let half = 0.5 * eccentric_anomaly;
    Ok(2.0
        * ((1.0 + eccentricity).sqrt() * half.sin())
            .atan2((1.0 - eccentricity).sqrt() * half.cos()))
}

/// True anomaly → eccentric anomaly (inverse of [`eccentric_to_true`]).
pub fn true_to_eccentric(true_anomaly: f64, eccentricity: f64) -> Result<f64, MeePropError> {
    check_elliptic(eccentricity)?;
    let half = 0.5 * true_anomaly;
    Ok(2.0
        * ((1.0 - eccentricity).sqrt() * half.sin())
            .atan2((1.0 + eccentricity).sqrt() * half.cos()))
}

/// Eccentric anomaly → mean anomaly, `M = E − e·sin(E)`.
pub fn eccentric_to_mean(eccentric_anomaly: f64, eccentricity: f64) -> f64 {
    eccentric_anomaly - eccentricity * eccentric_anomaly.sin()
}

pub(crate) fn check_elliptic(eccentricity: f64) -> Result<(), MeePropError> {
    if !(0.0..1.0).contains(&eccentricity) {
        return Err(MeePropError::DegenerateGeometry(format!(
            "eccentricity must lie in [0, 1), got {eccentricity}"
        )));
    }
    Ok(())
}
