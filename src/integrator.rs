//! # Numerical integration service
//!
//! The propagator only needs "given a derivative function and an initial state,
//! produce the states at these times". That contract is the [`Integrator`] trait;
//! [`DormandPrince54`] is the implementation shipped with the crate.
//!
//! ## Contract
//!
//! * The right-hand side is `FnMut(t, &y) -> Result<dy/dt, MeePropError>`; an error
//!   returned by it aborts the run and is handed back unchanged.
//! * Output times must be finite, sorted and not earlier than `t0`. One state is
//!   returned per requested time, in order.
//! * Step-size collapse, an exhausted step budget or a non-finite state end the run
//!   with [`MeePropError::IntegrationFailure`]; no partial output is returned.
//!
//! ## Dormand–Prince 5(4)
//!
//! Seven-stage embedded pair with FSAL, error estimated as the RMS of the local
//! error scaled by `atol + rtol·max(|yᵢ|, |yᵢ₊₁|)` (Hairer, Nørsett & Wanner,
//! *Solving ODEs I*, §II.4). Steps are shortened to land exactly on each output
//! time, so no interpolation is involved.
use nalgebra::SVector;
use serde::{Deserialize, Serialize};

use crate::meeprop_errors::{IntegrationFailureReason, MeePropError};

/// Error tolerances of an adaptive integrator.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Tolerances {
    pub relative: f64,
    pub absolute: f64,
}

impl Default for Tolerances {
    fn default() -> Self {
        Tolerances {
            relative: 1e-10,
            absolute: 1e-12,
        }
    }
}

impl Tolerances {
    pub fn new(relative: f64, absolute: f64) -> Self {
        Tolerances { relative, absolute }
    }

    pub fn validate(&self) -> Result<(), MeePropError> {
        let valid = self.relative >= 0.0
            && self.absolute >= 0.0
            && self.relative.is_finite()
            && self.absolute.is_finite()
            && self.relative + self.absolute > 0.0;
        if !valid {
            return Err(MeePropError::InvalidConfiguration(format!(
                "tolerances must be non-negative and not both zero, got rtol = {}, atol = {}",
                self.relative, self.absolute
            )));
        }
        Ok(())
    }

    fn scale(&self, y: f64, y_new: f64) -> f64 {
        self.absolute + self.relative * y.abs().max(y_new.abs())
    }
}

/// Work counters of one integration run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct IntegrationStats {
    pub accepted_steps: usize,
    pub rejected_steps: usize,
    pub rhs_evaluations: usize,
}

/// States sampled at the requested output times.
#[derive(Debug, Clone, PartialEq)]
pub struct IntegrationOutput<const N: usize> {
    pub states: Vec<SVector<f64, N>>,
    pub stats: IntegrationStats,
}

/// Initial value problem solver.
pub trait Integrator {
    /// Integrate `dy/dt = rhs(t, y)` from `(t0, y0)` and sample `y` at every time of `t_out`.
    fn integrate<const N: usize, F>(
        &self,
        rhs: F,
        t0: f64,
        y0: &SVector<f64, N>,
        t_out: &[f64],
    ) -> Result<IntegrationOutput<N>, MeePropError>
    where
        F: FnMut(f64, &SVector<f64, N>) -> Result<SVector<f64, N>, MeePropError>;

    /// Error tolerances driving the step control, when the method has any.
    fn tolerances(&self) -> Option<Tolerances> {
        None
    }
}

/// Butcher tableau of the Dormand–Prince 5(4) pair.
mod dopri5 {
    pub const C2: f64 = 1.0 / 5.0;
    pub const C3: f64 = 3.0 / 10.0;
    pub const C4: f64 = 4.0 / 5.0;
    pub const C5: f64 = 8.0 / 9.0;

    pub const A21: f64 = 1.0 / 5.0;
    pub const A31: f64 = 3.0 / 40.0;
    pub const A32: f64 = 9.0 / 40.0;
    pub const A41: f64 = 44.0 / 45.0;
    pub const A42: f64 = -56.0 / 15.0;
    pub const A43: f64 = 32.0 / 9.0;
    pub const A51: f64 = 19372.0 / 6561.0;
    pub const A52: f64 = -25360.0 / 2187.0;
    pub const A53: f64 = 64448.0 / 6561.0;
    pub const A54: f64 = -212.0 / 729.0;
    pub const A61: f64 = 9017.0 / 3168.0;
    pub const A62: f64 = -355.0 / 33.0;
    pub const A63: f64 = 46732.0 / 5247.0;
    pub const A64: f64 = 49.0 / 176.0;
    pub const A65: f64 = -5103.0 / 18656.0;

    // 5th order weights, also the last row of A (FSAL)
    pub const B1: f64 = 35.0 / 384.0;
    pub const B3: f64 = 500.0 / 1113.0;
    pub const B4: f64 = 125.0 / 192.0;
    pub const B5: f64 = -2187.0 / 6784.0;
    pub const B6: f64 = 11.0 / 84.0;

    // difference between 5th and 4th order weights
    pub const E1: f64 = 71.0 / 57600.0;
    pub const E3: f64 = -71.0 / 16695.0;
    pub const E4: f64 = 71.0 / 1920.0;
    pub const E5: f64 = -17253.0 / 339200.0;
    pub const E6: f64 = 22.0 / 525.0;
    pub const E7: f64 = -1.0 / 40.0;
}

/// Adaptive embedded Runge–Kutta 5(4) integrator (Dormand & Prince, 1980).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DormandPrince54 {
    pub tolerances: Tolerances,
    /// First trial step (s); estimated from the problem when `None`.
    pub initial_step: Option<f64>,
    /// Smallest step the controller may ask for before giving up (s).
    pub min_step: f64,
    /// Largest step allowed (s).
    pub max_step: f64,
    /// Accepted plus rejected steps allowed for one run.
    pub max_steps: usize,
    /// Safety factor applied to the optimal step.
    pub safety: f64,
    /// Bounds of the step change ratio.
    pub min_factor: f64,
    pub max_factor: f64,
}

impl Default for DormandPrince54 {
    fn default() -> Self {
        DormandPrince54 {
            tolerances: Tolerances::default(),
            initial_step: None,
            min_step: 1e-8,
            max_step: f64::INFINITY,
            max_steps: 5_000_000,
            safety: 0.9,
            min_factor: 0.2,
            max_factor: 10.0,
        }
    }
}

impl DormandPrince54 {
    pub fn new(tolerances: Tolerances) -> Self {
        DormandPrince54 {
            tolerances,
            ..Self::default()
        }
    }

    pub fn with_initial_step(mut self, step: f64) -> Self {
        self.initial_step = Some(step);
        self
    }

    pub fn with_step_bounds(mut self, min_step: f64, max_step: f64) -> Self {
        self.min_step = min_step;
        self.max_step = max_step;
        self
    }

    pub fn with_max_steps(mut self, max_steps: usize) -> Self {
        self.max_steps = max_steps;
        self
    }

    fn rms_norm<const N: usize>(&self, v: &SVector<f64, N>, y: &SVector<f64, N>, y_new: &SVector<f64, N>) -> f64 {
        let sum: f64 = (0..N)
            .map(|i| (v[i] / self.tolerances.scale(y[i], y_new[i])).powi(2))
            .sum();
        (sum / N as f64).sqrt()
    }

    /// Starting step from Hairer, Nørsett & Wanner (II.4): one explicit Euler probe.
    fn initial_step_guess<const N: usize, F>(
        &self,
        rhs: &mut F,
        t0: f64,
        y0: &SVector<f64, N>,
        f0: &SVector<f64, N>,
        stats: &mut IntegrationStats,
    ) -> Result<f64, MeePropError>
    where
        F: FnMut(f64, &SVector<f64, N>) -> Result<SVector<f64, N>, MeePropError>,
    {
        let d0 = self.rms_norm(y0, y0, y0);
        let d1 = self.rms_norm(f0, y0, y0);
        let h0 = if d0 < 1e-5 || d1 < 1e-5 {
            1e-6
        } else {
            0.01 * d0 / d1
        };

        let y1 = y0 + f0 * h0;
        let f1 = rhs(t0 + h0, &y1)?;
        stats.rhs_evaluations += 1;

        let d2 = self.rms_norm(&(f1 - f0), y0, y0) / h0;
        let dmax = d1.max(d2);
        let h1 = if dmax <= 1e-15 {
            (h0 * 1e-3).max(1e-6)
        } else {
            (0.01 / dmax).powf(1.0 / 5.0)
        };

        Ok((100.0 * h0).min(h1).min(self.max_step))
    }
}

fn check_output_times(t0: f64, t_out: &[f64]) -> Result<(), MeePropError> {
    if !t0.is_finite() {
        return Err(MeePropError::InvalidSampling(format!(
            "initial time must be finite, got {t0}"
        )));
    }
    let mut previous = t0;
    for &t in t_out {
        if !t.is_finite() || t < previous {
            return Err(MeePropError::InvalidSampling(format!(
                "output times must be finite, sorted and not before t0 = {t0} (got {t} after {previous})"
            )));
        }
        previous = t;
    }
    Ok(())
}

impl Integrator for DormandPrince54 {
    fn tolerances(&self) -> Option<Tolerances> {
        Some(self.tolerances)
    }

    fn integrate<const N: usize, F>(
        &self,
        mut rhs: F,
        t0: f64,
        y0: &SVector<f64, N>,
        t_out: &[f64],
    ) -> Result<IntegrationOutput<N>, MeePropError>
    where
        F: FnMut(f64, &SVector<f64, N>) -> Result<SVector<f64, N>, MeePropError>,
    {
        use dopri5::*;

        self.tolerances.validate()?;
        check_output_times(t0, t_out)?;

        let mut stats = IntegrationStats::default();
        let mut states = Vec::with_capacity(t_out.len());
        let mut next = 0;

        let mut t = t0;
        let mut y = *y0;
        while next < t_out.len() && t_out[next] <= t {
            states.push(y);
            next += 1;
        }
        if next == t_out.len() {
            return Ok(IntegrationOutput { states, stats });
        }

        let mut k1 = rhs(t, &y)?;
        stats.rhs_evaluations += 1;

        let mut h = match self.initial_step {
            Some(step) => step.min(self.max_step),
            None => self.initial_step_guess(&mut rhs, t, &y, &k1, &mut stats)?,
        };
        let mut last_rejected = false;

        while next < t_out.len() {
            if stats.accepted_steps + stats.rejected_steps >= self.max_steps {
                return Err(MeePropError::IntegrationFailure {
                    time: t,
                    reason: IntegrationFailureReason::MaxStepsExceeded {
                        steps: self.max_steps,
                    },
                });
            }

            let target = t_out[next];
            let landing = h >= target - t;
            let step = if landing { target - t } else { h };

            let k2 = rhs(t + C2 * step, &(y + (k1 * A21) * step))?;
            let k3 = rhs(t + C3 * step, &(y + (k1 * A31 + k2 * A32) * step))?;
            let k4 = rhs(
                t + C4 * step,
                &(y + (k1 * A41 + k2 * A42 + k3 * A43) * step),
            )?;
            let k5 = rhs(
                t + C5 * step,
                &(y + (k1 * A51 + k2 * A52 + k3 * A53 + k4 * A54) * step),
            )?;
            let k6 = rhs(
                t + step,
                &(y + (k1 * A61 + k2 * A62 + k3 * A63 + k4 * A64 + k5 * A65) * step),
            )?;
            let y_new = y + (k1 * B1 + k3 * B3 + k4 * B4 + k5 * B5 + k6 * B6) * step;
            if !y_new.iter().all(|x| x.is_finite()) {
                return Err(MeePropError::IntegrationFailure {
                    time: t,
                    reason: IntegrationFailureReason::NonFiniteState,
                });
            }
            let k7 = rhs(t + step, &y_new)?;
            stats.rhs_evaluations += 6;

            let local_error =
                (k1 * E1 + k3 * E3 + k4 * E4 + k5 * E5 + k6 * E6 + k7 * E7) * step;
            let err = self.rms_norm(&local_error, &y, &y_new);

            let optimal = if err == 0.0 {
                self.max_factor
            } else {
                self.safety * err.powf(-0.2)
            };

            if err <= 1.0 {
                t = if landing { target } else { t + step };
                y = y_new;
                k1 = k7;
                stats.accepted_steps += 1;

                while next < t_out.len() && t_out[next] <= t {
                    states.push(y);
                    next += 1;
                }

                // no growth right after a rejection
                let max_factor = if last_rejected { 1.0 } else { self.max_factor };
                let proposal = h;
                h = (step * optimal.clamp(self.min_factor, max_factor)).min(self.max_step);
                // a step shortened to hit an output time says nothing about the next one
                if landing && step < proposal {
                    h = h.max(proposal);
                }
                last_rejected = false;
            } else {
                stats.rejected_steps += 1;
                h = step * optimal.clamp(self.min_factor, 1.0);
                last_rejected = true;
                log::trace!("rejected step at t = {t} (err = {err:.3e}), retrying with h = {h:e}");
            }

            if h < self.min_step && next < t_out.len() {
                return Err(MeePropError::IntegrationFailure {
                    time: t,
                    reason: IntegrationFailureReason::StepSizeCollapse { step: h },
                });
            }
        }

        Ok(IntegrationOutput { states, stats })
    }
}
