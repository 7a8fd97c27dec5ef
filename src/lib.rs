pub mod constants;
pub mod integrator;
pub mod j2_dynamics;
pub mod kepler;
pub mod meeprop_errors;
pub mod orbit_type;
pub mod propagator;
pub mod trajectory;
