//! # Keplerian orbital elements
//!
//! This module defines the [`KeplerianElements`] struct, the **classical orbital
//! element representation** used for initial conditions and for reporting.
//!
//! ## What are Keplerian elements?
//!
//! 1. **a** – Semi-major axis (km)
//! 2. **e** – Eccentricity (unitless, elliptic only: `0 ≤ e < 1`)
//! 3. **i** – Inclination (radians, `[0, π]`)
//! 4. **Ω** – Right ascension of the ascending node (radians)
//! 5. **ω** – Argument of periapsis (radians)
//! 6. **ν / E / M** – An anomaly, see [`Anomaly`]
//!
//! ## Degeneracies
//!
//! - **Circular orbits (`e → 0`)**: ω is undefined, conventionally `0.0`.
//! - **Equatorial orbits (`i → 0`)**: Ω is undefined, conventionally `0.0`.
//!
//! The reverse conversion from
//! [`EquinoctialElements`](crate::orbit_type::equinoctial_element::EquinoctialElements)
//! applies these conventions; see `TryFrom<&EquinoctialElements>` below.
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{
    constants::RADEG,
    kepler::{
        check_elliptic, eccentric_to_mean, eccentric_to_true, principal_angle, true_to_eccentric,
        KeplerPolicy, KeplerSolver,
    },
    meeprop_errors::MeePropError,
    orbit_type::equinoctial_element::EquinoctialElements,
};

/// Position of the body along its orbit.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Anomaly {
    /// Mean anomaly M (rad)
    Mean(f64),
    /// Eccentric anomaly E (rad)
    Eccentric(f64),
    /// True anomaly ν (rad)
    True(f64),
}

/// Keplerian orbital elements (osculating).
///
/// Units
/// -----
/// * `semi_major_axis`: km.
/// * `eccentricity`: unitless.
/// * `inclination`, `ascending_node_longitude`, `periapsis_argument`: radians.
/// * `anomaly`: radians, tagged by kind.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct KeplerianElements {
    pub semi_major_axis: f64,
    pub eccentricity: f64,
    pub inclination: f64,
    pub ascending_node_longitude: f64,
    pub periapsis_argument: f64,
    pub anomaly: Anomaly,
}

impl KeplerianElements {
    /// Build elements from angles given in degrees.
    pub fn from_degrees(
        semi_major_axis: f64,
        eccentricity: f64,
        inclination_deg: f64,
        node_deg: f64,
        periapsis_deg: f64,
        anomaly: Anomaly,
    ) -> Self {
        let anomaly = match anomaly {
            Anomaly::Mean(x) => Anomaly::Mean(x * RADEG),
            Anomaly::Eccentric(x) => Anomaly::Eccentric(x * RADEG),
            Anomaly::True(x) => Anomaly::True(x * RADEG),
        };
        KeplerianElements {
            semi_major_axis,
            eccentricity,
            inclination: inclination_deg * RADEG,
            ascending_node_longitude: node_deg * RADEG,
            periapsis_argument: periapsis_deg * RADEG,
            anomaly,
        }
    }

    /// Check the elliptic-orbit domain: `a > 0`, `0 ≤ e < 1`, `0 ≤ i ≤ π`, finite angles.
    pub fn validate(&self) -> Result<(), MeePropError> {
        check_elliptic(self.eccentricity)?;
        if !(self.semi_major_axis > 0.0 && self.semi_major_axis.is_finite()) {
            return Err(MeePropError::DegenerateGeometry(format!(
                "semi-major axis must be positive, got {}",
                self.semi_major_axis
            )));
        }
        if !(0.0..=std::f64::consts::PI).contains(&self.inclination) {
            return Err(MeePropError::DegenerateGeometry(format!(
                "inclination must lie in [0, π], got {}",
                self.inclination
            )));
        }
        let angle = match self.anomaly {
            Anomaly::Mean(x) | Anomaly::Eccentric(x) | Anomaly::True(x) => x,
        };
        if !(self.ascending_node_longitude.is_finite()
            && self.periapsis_argument.is_finite()
            && angle.is_finite())
        {
            return Err(MeePropError::DegenerateGeometry(
                "angular elements must be finite".into(),
            ));
        }
        Ok(())
    }

    /// Semi-latus rectum `p = a(1 − e²)` (km).
    pub fn semi_latus_rectum(&self) -> f64 {
        self.semi_major_axis * (1.0 - self.eccentricity.powi(2))
    }

    /// Keplerian mean motion `n = √(μ/a³)` (rad/s).
    pub fn mean_motion(&self, mu: f64) -> f64 {
        (mu / self.semi_major_axis.powi(3)).sqrt()
    }

    /// Keplerian period (s).
    pub fn period(&self, mu: f64) -> f64 {
        std::f64::consts::TAU / self.mean_motion(mu)
    }

    /// True anomaly, solving Kepler's equation when the elements carry a mean anomaly.
    ///
    /// Arguments
    /// ---------
    /// * `solver` – Newton–Raphson settings used for `Anomaly::Mean`.
    /// * `policy` – what to do when the solver exhausts its iterations.
    pub fn true_anomaly_with(
        &self,
        solver: &KeplerSolver,
        policy: KeplerPolicy,
    ) -> Result<f64, MeePropError> {
        match self.anomaly {
            Anomaly::True(nu) => Ok(nu),
            Anomaly::Eccentric(ecc_anom) => eccentric_to_true(ecc_anom, self.eccentricity),
            Anomaly::Mean(mean_anom) => {
                let solution = solver.mean_to_eccentric(mean_anom, self.eccentricity)?;
                let ecc_anom = policy.resolve(solution)?;
                eccentric_to_true(ecc_anom, self.eccentricity)
            }
        }
    }

    /// True anomaly with the default solver and [`KeplerPolicy::Strict`].
    pub fn true_anomaly(&self) -> Result<f64, MeePropError> {
        self.true_anomaly_with(&KeplerSolver::default(), KeplerPolicy::Strict)
    }

    /// Mean anomaly in [0, 2π), using the closed-form inverse chain ν → E → M.
    pub fn mean_anomaly(&self) -> Result<f64, MeePropError> {
        let ecc_anom = match self.anomaly {
            Anomaly::Mean(m) => return Ok(principal_angle(m)),
            Anomaly::Eccentric(ecc_anom) => ecc_anom,
            Anomaly::True(nu) => true_to_eccentric(nu, self.eccentricity)?,
        };
        Ok(principal_angle(eccentric_to_mean(
            ecc_anom,
            self.eccentricity,
        )))
    }
}

impl TryFrom<&EquinoctialElements> for KeplerianElements {
    type Error = MeePropError;

    /// Reverse mapping `(p, f, g, h, k, L)` → `(a, e, i, Ω, ω, ν)`.
    ///
    /// Every angle goes through `atan2`, so `i = 0` and `i = π` are regular points:
    ///
    /// * `a = p / (1 − f² − g²)`, `e = √(f² + g²)`
    /// * `i = atan2(2√(h² + k²), 1 − h² − k²)`
    /// * `Ω = atan2(k, h)`
    /// * `ω = atan2(g·h − f·k, f·h + g·k)`
    /// * `ν = L − Ω − ω`
    ///
    /// Degenerate cases follow `atan2(0, 0) = 0`: Ω = 0 for an equatorial orbit and
    /// ω = 0 for a circular one. For an equatorial orbit with `e > 0` the ω formula
    /// collapses, so ω is taken as the longitude of periapsis `atan2(g, f)`.
    /// Ω, ω and ν are returned in [0, 2π); `L ≡ Ω + ω + ν (mod 2π)`.
    ///
    /// Errors
    /// ------
    /// * [`MeePropError::DegenerateGeometry`] if `p ≤ 0`, `e ≥ 1` or a component is not finite.
    fn try_from(equ: &EquinoctialElements) -> Result<Self, Self::Error> {
        equ.validate()?;

        let EquinoctialElements {
            semi_latus_rectum: p,
            ecc_cos_lon: f,
            ecc_sin_lon: g,
            tan_half_incl_cos_node: h,
            tan_half_incl_sin_node: k,
            true_longitude,
        } = *equ;

        let ecc2 = f * f + g * g;
        let t2 = h * h + k * k;

        let inclination = (2.0 * t2.sqrt()).atan2(1.0 - t2);

        // signed zeros would turn atan2(0, -0) into π
        let node = if t2 > 0.0 { k.atan2(h) } else { 0.0 };
        let periapsis = if ecc2 == 0.0 {
            0.0
        } else if t2 > 0.0 {
            (g * h - f * k).atan2(f * h + g * k)
        } else {
            g.atan2(f)
        };

        Ok(KeplerianElements {
            semi_major_axis: p / (1.0 - ecc2),
            eccentricity: ecc2.sqrt(),
            inclination,
            ascending_node_longitude: principal_angle(node),
            periapsis_argument: principal_angle(periapsis),
            anomaly: Anomaly::True(principal_angle(true_longitude - node - periapsis)),
        })
    }
}

impl TryFrom<EquinoctialElements> for KeplerianElements {
    type Error = MeePropError;

    fn try_from(equ: EquinoctialElements) -> Result<Self, Self::Error> {
        KeplerianElements::try_from(&equ)
    }
}

impl fmt::Display for KeplerianElements {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rad_to_deg = 180.0 / std::f64::consts::PI;
        writeln!(f, "Keplerian Elements")?;
        writeln!(f, "-------------------------------------------")?;
        writeln!(
            f,
            "  a   (semi-major axis)       = {:.6} km",
            self.semi_major_axis
        )?;
        writeln!(
            f,
            "  e   (eccentricity)          = {:.6}",
            self.eccentricity
        )?;
        writeln!(
            f,
            "  i   (inclination)           = {:.6} rad ({:.6}°)",
            self.inclination,
            self.inclination * rad_to_deg
        )?;
        writeln!(
            f,
            "  Ω   (longitude of node)     = {:.6} rad ({:.6}°)",
            self.ascending_node_longitude,
            self.ascending_node_longitude * rad_to_deg
        )?;
        writeln!(
            f,
            "  ω   (argument of periapsis) = {:.6} rad ({:.6}°)",
            self.periapsis_argument,
            self.periapsis_argument * rad_to_deg
        )?;
        let (label, value) = match self.anomaly {
            Anomaly::Mean(x) => ("M   (mean anomaly)         ", x),
            Anomaly::Eccentric(x) => ("E   (eccentric anomaly)    ", x),
            Anomaly::True(x) => ("ν   (true anomaly)         ", x),
        };
        writeln!(
            f,
            "  {label} = {:.6} rad ({:.6}°)",
            value,
            value * rad_to_deg
        )
    }
}
