#![allow(dead_code)]

use std::f64::consts::PI;

use approx::assert_abs_diff_eq;
use meeprop::orbit_type::keplerian_element::{Anomaly, KeplerianElements};

/// Highly eccentric Molniya-type orbit used by the J2 regression scenario.
pub fn molniya() -> KeplerianElements {
    KeplerianElements {
        semi_major_axis: 26_600.0,
        eccentricity: 0.74,
        inclination: 1.10654,
        ascending_node_longitude: PI / 2.0,
        periapsis_argument: 5.0 * PI / 180.0,
        anomaly: Anomaly::Mean(10.0 * PI / 180.0),
    }
}

/// Low Earth orbit, slightly eccentric.
pub fn leo() -> KeplerianElements {
    KeplerianElements::from_degrees(7_000.0, 0.01, 51.6, 30.0, 40.0, Anomaly::Mean(0.0))
}

/// Wrap an angle difference into (−π, π].
pub fn wrap_angle(angle: f64) -> f64 {
    let wrapped = (angle + PI).rem_euclid(2.0 * PI) - PI;
    if wrapped == -PI {
        PI
    } else {
        wrapped
    }
}

pub fn assert_angle_close(actual: f64, expected: f64, epsilon: f64) {
    assert_abs_diff_eq!(wrap_angle(actual - expected), 0.0, epsilon = epsilon);
}

pub fn assert_orbit_close(actual: &KeplerianElements, expected: &KeplerianElements, epsilon: f64) {
    assert_abs_diff_eq!(
        actual.semi_major_axis,
        expected.semi_major_axis,
        epsilon = epsilon * expected.semi_major_axis
    );
    assert_abs_diff_eq!(actual.eccentricity, expected.eccentricity, epsilon = epsilon);
    assert_abs_diff_eq!(actual.inclination, expected.inclination, epsilon = epsilon);
    assert_angle_close(
        actual.ascending_node_longitude,
        expected.ascending_node_longitude,
        epsilon,
    );
    assert_angle_close(actual.periapsis_argument, expected.periapsis_argument, epsilon);
}
