//! # J2-perturbed equations of motion in modified equinoctial elements
//!
//! The time derivative of `(p, f, g, h, k, L)` is split into
//!
//! ```text
//! dx/dt = b(x) + A(x) · Δ
//! ```
//!
//! * `b(x)` – two-body part, zero except `dL/dt = √(μp)·(W/p)²`;
//! * `A(x)` – 6×3 Gauss variational matrix mapping a radial / transverse / normal
//!   acceleration onto the element rates;
//! * `Δ` – J2 acceleration expressed in that R-T-N frame.
//!
//! Notation used below: `W = 1 + f·cos L + g·sin L`, `s² = 1 + h² + k²`,
//! `r = p / W`, `χ = h·sin L − k·cos L` and `q = √(p/μ)`.
//!
//! References: Walker, Ireland & Owens (1985), *A set of modified equinoctial orbit
//! elements*; Betts, *Practical Methods for Optimal Control* (2010), §6.3.
use nalgebra::{Matrix6x3, Vector3};
use serde::{Deserialize, Serialize};

use crate::{
    constants::{MeeVector, J2_EARTH, MU_EARTH, R_EARTH},
    meeprop_errors::MeePropError,
    orbit_type::keplerian_element::KeplerianElements,
};

/// Gravity field parameters of the central body.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CentralBody {
    /// Gravitational parameter μ (km³/s²)
    pub mu: f64,
    /// Second zonal harmonic (unitless)
    pub j2: f64,
    /// Reference equatorial radius (km)
    pub radius: f64,
}

impl Default for CentralBody {
    fn default() -> Self {
        CentralBody::earth()
    }
}

impl CentralBody {
    pub fn earth() -> Self {
        CentralBody {
            mu: MU_EARTH,
            j2: J2_EARTH,
            radius: R_EARTH,
        }
    }

    /// Same body with the J2 term switched off.
    pub fn point_mass(self) -> Self {
        CentralBody { j2: 0.0, ..self }
    }

    pub fn validate(&self) -> Result<(), MeePropError> {
        if !(self.mu > 0.0 && self.mu.is_finite()) {
            return Err(MeePropError::InvalidConfiguration(format!(
                "gravitational parameter must be positive, got {}",
                self.mu
            )));
        }
        if !(self.radius > 0.0 && self.radius.is_finite()) {
            return Err(MeePropError::InvalidConfiguration(format!(
                "reference radius must be positive, got {}",
                self.radius
            )));
        }
        if !self.j2.is_finite() {
            return Err(MeePropError::InvalidConfiguration(format!(
                "J2 must be finite, got {}",
                self.j2
            )));
        }
        Ok(())
    }
}

/// First-order secular J2 rates of a mean orbit.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SecularRates {
    /// Keplerian mean motion `n` (rad/s)
    pub mean_motion: f64,
    /// `dΩ/dt = −(3/2)·n·J2·(R/p)²·cos i` (rad/s)
    pub node_rate: f64,
    /// `dω/dt = (3/4)·n·J2·(R/p)²·(5cos²i − 1)` (rad/s)
    pub periapsis_rate: f64,
}

/// Trigonometric quantities shared by the Gauss matrix and the J2 acceleration.
struct OrbitGeometry {
    p: f64,
    f: f64,
    g: f64,
    h: f64,
    k: f64,
    sin_l: f64,
    cos_l: f64,
    w: f64,
    s2: f64,
    r: f64,
    chi: f64,
}

impl OrbitGeometry {
    fn new(state: &MeeVector) -> Result<Self, MeePropError> {
        let (p, f, g, h, k, l) = (state[0], state[1], state[2], state[3], state[4], state[5]);
        let (sin_l, cos_l) = l.sin_cos();
        let w = 1.0 + f * cos_l + g * sin_l;

        // NaN compares false, so this also rejects non-finite states
        if !(p > 0.0 && w > 0.0 && state.iter().all(|x| x.is_finite())) {
            return Err(MeePropError::DegenerateGeometry(format!(
                "equations of motion undefined for p = {p}, W = {w} (state {:?})",
                state.as_slice()
            )));
        }

        Ok(OrbitGeometry {
            p,
            f,
            g,
            h,
            k,
            sin_l,
            cos_l,
            w,
            s2: 1.0 + h * h + k * k,
            r: p / w,
            chi: h * sin_l - k * cos_l,
        })
    }
}

/// Two-body plus J2 dynamics in modified equinoctial elements.
///
/// Stateless apart from the immutable [`CentralBody`]; it is `Copy`, `Send` and
/// `Sync`, so independent propagations can share or clone it freely.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct J2Dynamics {
    pub body: CentralBody,
}

impl J2Dynamics {
    pub fn new(body: CentralBody) -> Self {
        J2Dynamics { body }
    }

    /// Right-hand side `d(p, f, g, h, k, L)/dt` handed to the integrator.
    ///
    /// Arguments
    /// ---------
    /// * `_t` – time (s); the model is autonomous.
    /// * `state` – equinoctial state `(p, f, g, h, k, L)`.
    ///
    /// Return
    /// ------
    /// * The state rate in (km/s, 1/s, 1/s, 1/s, 1/s, rad/s).
    ///
    /// Errors
    /// ------
    /// * [`MeePropError::DegenerateGeometry`] when `p ≤ 0`, `W ≤ 0` or the state is not
    ///   finite, so that no NaN reaches the integrator.
    pub fn derivative(&self, _t: f64, state: &MeeVector) -> Result<MeeVector, MeePropError> {
        let geom = OrbitGeometry::new(state)?;

        let mut rate = self.gauss_matrix_from(&geom) * self.j2_acceleration_from(&geom);
        rate[5] += self.two_body_longitude_rate(&geom);
        Ok(rate)
    }

    /// Gauss variational matrix (rows p, f, g, h, k, L; columns R, T, N).
    pub fn gauss_matrix(&self, state: &MeeVector) -> Result<Matrix6x3<f64>, MeePropError> {
        Ok(self.gauss_matrix_from(&OrbitGeometry::new(state)?))
    }

    /// J2 perturbing acceleration in the R-T-N frame (km/s²).
    pub fn j2_acceleration_rtn(&self, state: &MeeVector) -> Result<Vector3<f64>, MeePropError> {
        Ok(self.j2_acceleration_from(&OrbitGeometry::new(state)?))
    }

    fn two_body_longitude_rate(&self, geom: &OrbitGeometry) -> f64 {
        (self.body.mu * geom.p).sqrt() * (geom.w / geom.p).powi(2)
    }

    fn gauss_matrix_from(&self, geom: &OrbitGeometry) -> Matrix6x3<f64> {
        let OrbitGeometry {
            p,
            f,
            g,
            sin_l,
            cos_l,
            w,
            s2,
            chi,
            ..
        } = *geom;

        let q = (p / self.body.mu).sqrt();
        let q_w = q / w;
        let node_term = q * s2 / (2.0 * w);

        #[rustfmt::skip]
        let matrix = Matrix6x3::new(
            0.0,         2.0 * p * q_w,                    0.0,
            q * sin_l,   q_w * ((w + 1.0) * cos_l + f),    -q_w * g * chi,
            -q * cos_l,  q_w * ((w + 1.0) * sin_l + g),    q_w * f * chi,
            0.0,         0.0,                              node_term * cos_l,
            0.0,         0.0,                              node_term * sin_l,
            0.0,         0.0,                              q_w * chi,
        );
        matrix
    }

    fn j2_acceleration_from(&self, geom: &OrbitGeometry) -> Vector3<f64> {
        let OrbitGeometry {
            h,
            k,
            sin_l,
            cos_l,
            s2,
            r,
            chi,
            ..
        } = *geom;

        let CentralBody { mu, j2, radius } = self.body;
        let scale = mu * j2 * radius * radius / r.powi(4);
        let s4 = s2 * s2;

        Vector3::new(
            -1.5 * scale * (1.0 - 12.0 * chi * chi / s4),
            -12.0 * scale * chi * (h * cos_l + k * sin_l) / s4,
            -6.0 * scale * (1.0 - h * h - k * k) * chi / s4,
        )
    }

    /// Analytical first-order secular rates for the given (mean) elements.
    pub fn secular_rates(&self, kep: &KeplerianElements) -> SecularRates {
        let n = kep.mean_motion(self.body.mu);
        let factor = n * self.body.j2 * (self.body.radius / kep.semi_latus_rectum()).powi(2);
        let cos_i = kep.inclination.cos();

        SecularRates {
            mean_motion: n,
            node_rate: -1.5 * factor * cos_i,
            periapsis_rate: 0.75 * factor * (5.0 * cos_i * cos_i - 1.0),
        }
    }
}
