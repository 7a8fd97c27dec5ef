//! # Orbital element representations
//!
//! - [`keplerian_element`](crate::orbit_type::keplerian_element): classical elements
//!   `(a, e, i, Ω, ω, anomaly)`, used for initial conditions and reporting.
//! - [`equinoctial_element`](crate::orbit_type::equinoctial_element): modified
//!   equinoctial elements `(p, f, g, h, k, L)`, the **non-singular** state integrated
//!   by the propagator.
//!
//! Both directions are pure functions and exact for elliptic orbits
//! (`0 ≤ e < 1`, `0 ≤ i ≤ π`).
//!
//! ## Typical workflow
//!
//! ```rust
//! use meeprop::orbit_type::{
//!     equinoctial_element::EquinoctialElements,
//!     keplerian_element::{Anomaly, KeplerianElements},
//! };
//!
//! let kep = KeplerianElements::from_degrees(7000.0, 0.01, 51.6, 10.0, 20.0, Anomaly::Mean(30.0));
//! let mee = EquinoctialElements::try_from(&kep).unwrap();
//! let back = KeplerianElements::try_from(&mee).unwrap();
//! assert!((back.semi_major_axis - 7000.0).abs() < 1e-6);
//! ```

/// Modified equinoctial elements and the forward conversion.
pub mod equinoctial_element;

/// Classical Keplerian elements and the reverse conversion.
pub mod keplerian_element;

#[cfg(test)]
pub(crate) mod orbit_type_test {
    use super::{
        equinoctial_element::EquinoctialElements,
        keplerian_element::{Anomaly, KeplerianElements},
    };
    use crate::kepler::{KeplerPolicy, KeplerSolver};
    use approx::assert_abs_diff_eq;
    use rand::{rngs::StdRng, Rng, SeedableRng};
    use std::f64::consts::PI;

    /// Compare two angles modulo 2π with an absolute epsilon.
    pub(crate) fn assert_angle_eq(a: f64, b: f64, eps: f64) {
        let d = (a - b + PI).rem_euclid(2.0 * PI) - PI;
        assert_abs_diff_eq!(d, 0.0, epsilon = eps);
    }

    fn true_anomaly_of(kep: &KeplerianElements) -> f64 {
        match kep.anomaly {
            Anomaly::True(nu) => nu,
            other => panic!("reverse conversion must yield a true anomaly, got {other:?}"),
        }
    }

    // ---------- round trips ----------

    #[test]
    fn round_trip_random_elliptic_orbits() {
        let mut rng = StdRng::seed_from_u64(0xC0FFEE);

        for _ in 0..2_000 {
            let kep = KeplerianElements {
                semi_major_axis: rng.random_range(6_600.0..50_000.0),
                eccentricity: rng.random_range(0.0..0.99),
                inclination: rng.random_range(0.01..(PI - 0.01)),
                ascending_node_longitude: rng.random_range(0.0..2.0 * PI),
                periapsis_argument: rng.random_range(0.0..2.0 * PI),
                anomaly: Anomaly::True(rng.random_range(0.0..2.0 * PI)),
            };

            let mee = EquinoctialElements::try_from(&kep).unwrap();
            let back = KeplerianElements::try_from(&mee).unwrap();

            assert_abs_diff_eq!(
                back.semi_major_axis,
                kep.semi_major_axis,
                epsilon = 1e-9 * kep.semi_major_axis
            );
            assert_abs_diff_eq!(back.eccentricity, kep.eccentricity, epsilon = 1e-9);
            assert_abs_diff_eq!(back.inclination, kep.inclination, epsilon = 1e-9);
            assert_angle_eq(
                back.ascending_node_longitude,
                kep.ascending_node_longitude,
                1e-9,
            );
            // ω is only defined up to the conditioning of atan2 near e = 0
            if kep.eccentricity > 1e-6 {
                assert_angle_eq(back.periapsis_argument, kep.periapsis_argument, 1e-9);
                assert_angle_eq(true_anomaly_of(&back), true_anomaly_of(&kep), 1e-9);
            }
            assert_angle_eq(
                back.ascending_node_longitude + back.periapsis_argument + true_anomaly_of(&back),
                mee.true_longitude,
                1e-9,
            );
        }
    }

    #[test]
    fn round_trip_from_mean_anomaly() {
        let kep = KeplerianElements {
            semi_major_axis: 26_600.0,
            eccentricity: 0.74,
            inclination: 1.10654,
            ascending_node_longitude: PI / 2.0,
            periapsis_argument: 5.0 * PI / 180.0,
            anomaly: Anomaly::Mean(10.0 * PI / 180.0),
        };
        let solver = KeplerSolver::new(1e-14, 50);
        let mee = EquinoctialElements::from_keplerian(&kep, &solver, KeplerPolicy::Strict).unwrap();
        let back = KeplerianElements::try_from(&mee).unwrap();

        assert_abs_diff_eq!(back.semi_major_axis, 26_600.0, epsilon = 1e-8);
        assert_abs_diff_eq!(back.eccentricity, 0.74, epsilon = 1e-12);
        assert_abs_diff_eq!(back.inclination, 1.10654, epsilon = 1e-12);
        assert_angle_eq(back.ascending_node_longitude, PI / 2.0, 1e-12);
        assert_angle_eq(back.periapsis_argument, 5.0 * PI / 180.0, 1e-12);
        assert_angle_eq(back.mean_anomaly().unwrap(), 10.0 * PI / 180.0, 1e-10);
    }

    // ---------- singular geometries ----------

    #[test]
    fn equatorial_prograde_orbit_is_regular() {
        let kep = KeplerianElements {
            semi_major_axis: 42_164.0,
            eccentricity: 0.2,
            inclination: 0.0,
            ascending_node_longitude: 1.0,
            periapsis_argument: 0.5,
            anomaly: Anomaly::True(0.25),
        };
        let mee = EquinoctialElements::try_from(&kep).unwrap();
        assert_eq!(mee.tan_half_incl_cos_node, 0.0);
        assert_eq!(mee.tan_half_incl_sin_node, 0.0);

        let back = KeplerianElements::try_from(&mee).unwrap();
        assert_eq!(back.inclination, 0.0);
        // node undefined: Ω = 0 and ω carries the longitude of periapsis
        assert_eq!(back.ascending_node_longitude, 0.0);
        assert_angle_eq(back.periapsis_argument, 1.5, 1e-12);
        assert_angle_eq(true_anomaly_of(&back), 0.25, 1e-12);
        assert_abs_diff_eq!(back.semi_major_axis, 42_164.0, epsilon = 1e-8);
    }

    #[test]
    fn equatorial_retrograde_orbit_is_regular() {
        let kep = KeplerianElements {
            semi_major_axis: 8_000.0,
            eccentricity: 0.05,
            inclination: PI,
            ascending_node_longitude: 0.7,
            periapsis_argument: 0.2,
            anomaly: Anomaly::True(1.0),
        };
        let mee = EquinoctialElements::try_from(&kep).unwrap();
        let back = KeplerianElements::try_from(&mee).unwrap();

        assert!(back.inclination.is_finite());
        assert_abs_diff_eq!(back.inclination, PI, epsilon = 1e-9);
        assert!(back.ascending_node_longitude.is_finite());
        assert!(back.periapsis_argument.is_finite());
        assert!(true_anomaly_of(&back).is_finite());
        assert_abs_diff_eq!(back.eccentricity, 0.05, epsilon = 1e-12);
        assert_angle_eq(
            back.ascending_node_longitude + back.periapsis_argument + true_anomaly_of(&back),
            mee.true_longitude,
            1e-9,
        );
    }

    #[test]
    fn circular_orbit_keeps_true_longitude() {
        let kep = KeplerianElements {
            semi_major_axis: 7_000.0,
            eccentricity: 0.0,
            inclination: 0.9,
            ascending_node_longitude: 2.0,
            periapsis_argument: 1.0,
            anomaly: Anomaly::True(0.5),
        };
        let mee = EquinoctialElements::try_from(&kep).unwrap();
        let back = KeplerianElements::try_from(&mee).unwrap();

        assert_eq!(back.eccentricity, 0.0);
        assert_eq!(back.periapsis_argument, 0.0);
        assert_angle_eq(back.ascending_node_longitude, 2.0, 1e-12);
        // ω and ν are individually undefined, their sum is not
        assert_angle_eq(true_anomaly_of(&back), 1.5, 1e-12);
    }

    #[test]
    fn reverse_conversion_rejects_degenerate_states() {
        let open = EquinoctialElements {
            semi_latus_rectum: 7_000.0,
            ecc_cos_lon: 0.8,
            ecc_sin_lon: 0.8,
            tan_half_incl_cos_node: 0.1,
            tan_half_incl_sin_node: 0.1,
            true_longitude: 0.0,
        };
        assert!(KeplerianElements::try_from(&open).is_err());

        let collapsed = EquinoctialElements {
            semi_latus_rectum: -1.0,
            ecc_cos_lon: 0.0,
            ecc_sin_lon: 0.0,
            ..open
        };
        assert!(KeplerianElements::try_from(collapsed).is_err());
    }
}
