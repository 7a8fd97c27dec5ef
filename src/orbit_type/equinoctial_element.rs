//! # Modified equinoctial elements
//!
//! Singularity-free state `(p, f, g, h, k, L)` integrated by the propagator:
//!
//! | symbol | field                     | definition               |
//! |--------|---------------------------|--------------------------|
//! | p      | `semi_latus_rectum`       | `a(1 − e²)` (km)         |
//! | f      | `ecc_cos_lon`             | `e·cos(ω + Ω)`           |
//! | g      | `ecc_sin_lon`             | `e·sin(ω + Ω)`           |
//! | h      | `tan_half_incl_cos_node`  | `tan(i/2)·cos(Ω)`        |
//! | k      | `tan_half_incl_sin_node`  | `tan(i/2)·sin(Ω)`        |
//! | L      | `true_longitude`          | `Ω + ω + ν` (rad)        |
//!
//! The true longitude is never wrapped: it grows by 2π per revolution so the
//! integrator always sees a continuous, monotonic phase.
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{
    constants::MeeVector,
    kepler::{KeplerPolicy, KeplerSolver},
    meeprop_errors::MeePropError,
    orbit_type::keplerian_element::KeplerianElements,
};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EquinoctialElements {
    pub semi_latus_rectum: f64,      // p = a(1 - e²)
    pub ecc_cos_lon: f64,            // f = e * cos(ω + Ω)
    pub ecc_sin_lon: f64,            // g = e * sin(ω + Ω)
    pub tan_half_incl_cos_node: f64, // h = tan(i/2) * cos(Ω)
    pub tan_half_incl_sin_node: f64, // k = tan(i/2) * sin(Ω)
    pub true_longitude: f64,         // L = Ω + ω + ν
}

impl EquinoctialElements {
    /// Forward mapping `(a, e, i, Ω, ω, anomaly)` → `(p, f, g, h, k, L)`.
    ///
    /// A mean anomaly is first converted to an eccentric then a true anomaly with
    /// `solver`; `policy` decides whether an unconverged solve is an error.
    ///
    /// Arguments
    /// ---------
    /// * `kep` – Classical elements, elliptic (`e < 1`).
    /// * `solver` – Kepler equation settings.
    /// * `policy` – Handling of an unconverged Kepler solve.
    ///
    /// Return
    /// ------
    /// * The equinoctial state; `L = Ω + ω + ν` is left unwrapped.
    ///
    /// Errors
    /// ------
    /// * [`MeePropError::DegenerateGeometry`] for elements outside the elliptic domain.
    /// * [`MeePropError::KeplerNotConverged`] under [`KeplerPolicy::Strict`].
    pub fn from_keplerian(
        kep: &KeplerianElements,
        solver: &KeplerSolver,
        policy: KeplerPolicy,
    ) -> Result<Self, MeePropError> {
        kep.validate()?;
        let true_anomaly = kep.true_anomaly_with(solver, policy)?;

        let node = kep.ascending_node_longitude;
        let lon_peri = kep.periapsis_argument + node;
        let tan_half_incl = (0.5 * kep.inclination).tan();

        Ok(EquinoctialElements {
            semi_latus_rectum: kep.semi_latus_rectum(),
            ecc_cos_lon: kep.eccentricity * lon_peri.cos(),
            ecc_sin_lon: kep.eccentricity * lon_peri.sin(),
            tan_half_incl_cos_node: tan_half_incl * node.cos(),
            tan_half_incl_sin_node: tan_half_incl * node.sin(),
            true_longitude: lon_peri + true_anomaly,
        })
    }

    pub fn from_vector(state: &MeeVector) -> Self {
        EquinoctialElements {
            semi_latus_rectum: state[0],
            ecc_cos_lon: state[1],
            ecc_sin_lon: state[2],
            tan_half_incl_cos_node: state[3],
            tan_half_incl_sin_node: state[4],
            true_longitude: state[5],
        }
    }

    pub fn to_vector(&self) -> MeeVector {
        MeeVector::new(
            self.semi_latus_rectum,
            self.ecc_cos_lon,
            self.ecc_sin_lon,
            self.tan_half_incl_cos_node,
            self.tan_half_incl_sin_node,
            self.true_longitude,
        )
    }

    /// `e = √(f² + g²)`
    pub fn eccentricity(&self) -> f64 {
        self.ecc_cos_lon.hypot(self.ecc_sin_lon)
    }

    /// `W = 1 + f·cos(L) + g·sin(L)`, equal to `p / r`.
    pub fn w_factor(&self) -> f64 {
        let (sin_l, cos_l) = self.true_longitude.sin_cos();
        1.0 + self.ecc_cos_lon * cos_l + self.ecc_sin_lon * sin_l
    }

    /// Orbital radius `r = p / W` (km).
    pub fn radius(&self) -> f64 {
        self.semi_latus_rectum / self.w_factor()
    }

    /// Check that the state describes a bound, non-degenerate orbit:
    /// finite components, `p > 0`, `f² + g² < 1` and `W > 0`.
    pub fn validate(&self) -> Result<(), MeePropError> {
        if !self.to_vector().iter().all(|x| x.is_finite()) {
            return Err(MeePropError::DegenerateGeometry(format!(
                "non-finite equinoctial state {:?}",
                self.to_vector().as_slice()
            )));
        }
        if self.semi_latus_rectum <= 0.0 {
            return Err(MeePropError::DegenerateGeometry(format!(
                "semi-latus rectum must be positive, got {}",
                self.semi_latus_rectum
            )));
        }
        let ecc = self.eccentricity();
        if ecc >= 1.0 {
            return Err(MeePropError::DegenerateGeometry(format!(
                "eccentricity must be below 1, got {ecc}"
            )));
        }
        // W ≥ 1 - e, only reachable through rounding as e → 1
        let w = self.w_factor();
        if w <= 0.0 {
            return Err(MeePropError::DegenerateGeometry(format!(
                "W = 1 + f cos L + g sin L must be positive, got {w}"
            )));
        }
        Ok(())
    }
}

impl TryFrom<&KeplerianElements> for EquinoctialElements {
    type Error = MeePropError;

    /// Forward conversion with the default [`KeplerSolver`] and [`KeplerPolicy::Strict`].
    fn try_from(kep: &KeplerianElements) -> Result<Self, Self::Error> {
        EquinoctialElements::from_keplerian(kep, &KeplerSolver::default(), KeplerPolicy::Strict)
    }
}

impl TryFrom<KeplerianElements> for EquinoctialElements {
    type Error = MeePropError;

    fn try_from(kep: KeplerianElements) -> Result<Self, Self::Error> {
        EquinoctialElements::try_from(&kep)
    }
}

impl fmt::Display for EquinoctialElements {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Modified Equinoctial Elements")?;
        writeln!(f, "-------------------------------------------")?;
        writeln!(f, "  p   (semi-latus rectum)     = {:.6} km", self.semi_latus_rectum)?;
        writeln!(f, "  f   (e·cos ϖ)               = {:.9}", self.ecc_cos_lon)?;
        writeln!(f, "  g   (e·sin ϖ)               = {:.9}", self.ecc_sin_lon)?;
        writeln!(f, "  h   (tan(i/2)·cos Ω)        = {:.9}", self.tan_half_incl_cos_node)?;
        writeln!(f, "  k   (tan(i/2)·sin Ω)        = {:.9}", self.tan_half_incl_sin_node)?;
        writeln!(f, "  L   (true longitude)        = {:.9} rad", self.true_longitude)
    }
}
