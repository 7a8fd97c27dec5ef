//! # Constants and type definitions for meeprop
//!
//! This module centralizes the **physical constants**, **conversion factors** and
//! **type aliases** used throughout the crate.
//!
//! ## Overview
//!
//! - Earth gravity model defaults (μ, J2, equatorial radius)
//! - Unit conversions (degrees ↔ radians, days ↔ seconds)
//! - Core type aliases used across the crate
//!
//! Units follow the convention of the propagator: kilometers, seconds and radians.

// -------------------------------------------------------------------------------------------------
// Physical constants and unit conversions
// -------------------------------------------------------------------------------------------------

/// 2π, useful for trigonometric conversions
pub const DPI: f64 = 2. * std::f64::consts::PI;

/// Number of seconds in a day
pub const SECONDS_PER_DAY: f64 = 86_400.0;

/// Degrees → radians
pub const RADEG: f64 = std::f64::consts::PI / 180.0;

/// Earth gravitational parameter μ in km³/s²
pub const MU_EARTH: f64 = 398_600.0;

/// Earth second zonal harmonic J2 (unitless)
pub const J2_EARTH: f64 = 0.001_082_63;

/// Earth reference (equatorial) radius in km used with [`J2_EARTH`]
pub const R_EARTH: f64 = 6_370.0;

// -------------------------------------------------------------------------------------------------
// Type aliases
// -------------------------------------------------------------------------------------------------

/// Time in seconds since the propagation epoch
pub type Seconds = f64;

/// Equinoctial state `(p, f, g, h, k, L)` as handed to the integrator.
pub type MeeVector = nalgebra::Vector6<f64>;
