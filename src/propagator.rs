//! # J2 propagation driver
//!
//! [`Propagator`] turns an initial orbit, a span and a [`Sampling`] request into a
//! [`Trajectory`]:
//!
//! 1. the initial classical elements are mapped to equinoctial elements (the
//!    Kepler equation is solved when the anomaly is given as mean anomaly);
//! 2. the equinoctial state is integrated with [`J2Dynamics::derivative`] as
//!    right-hand side, sampled at the requested output times;
//! 3. the samples are wrapped into a [`Trajectory`]; classical elements are derived
//!    from it on demand.
//!
//! All physical constants and numerical settings live in an immutable
//! [`PropagationConfig`]. A propagator holds no mutable state, so one instance can
//! serve any number of runs, from any number of threads.
//!
//! ## Example
//!
//! ```rust,no_run
//! use hifitime::Duration;
//! use meeprop::{
//!     orbit_type::keplerian_element::{Anomaly, KeplerianElements},
//!     propagator::{PropagationConfig, Propagator, Sampling},
//! };
//!
//! let molniya = KeplerianElements::from_degrees(26_600.0, 0.74, 63.4, 90.0, 5.0, Anomaly::Mean(10.0));
//! let propagator = Propagator::new(PropagationConfig::default()).unwrap();
//! let traj = propagator
//!     .propagate(&molniya, Duration::from_days(1.0), &Sampling::Interval(Duration::from_seconds(60.0)))
//!     .unwrap();
//! assert_eq!(traj.len(), 1441);
//! ```
use hifitime::Duration;
use log::debug;
use serde::{Deserialize, Serialize};

use crate::{
    constants::Seconds,
    integrator::{DormandPrince54, Integrator, Tolerances},
    j2_dynamics::{CentralBody, J2Dynamics},
    kepler::{KeplerPolicy, KeplerSolver},
    meeprop_errors::MeePropError,
    orbit_type::{
        equinoctial_element::EquinoctialElements, keplerian_element::KeplerianElements,
    },
    trajectory::{Trajectory, TrajectorySample},
};

/// Immutable settings of a propagation run.
///
/// `Default` is the Earth model (μ = 398600 km³/s², J2 = 1.08263e-3, R = 6370 km),
/// integrator tolerances `rtol = 1e-10`, `atol = 1e-12`, a Kepler solver with
/// tolerance 1e-5 and 10 iterations, and [`KeplerPolicy::Strict`].
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PropagationConfig {
    pub body: CentralBody,
    pub tolerances: Tolerances,
    pub kepler: KeplerSolver,
    pub kepler_policy: KeplerPolicy,
}

impl PropagationConfig {
    pub fn with_body(mut self, body: CentralBody) -> Self {
        self.body = body;
        self
    }

    pub fn with_tolerances(mut self, tolerances: Tolerances) -> Self {
        self.tolerances = tolerances;
        self
    }

    pub fn with_kepler_solver(mut self, kepler: KeplerSolver) -> Self {
        self.kepler = kepler;
        self
    }

    pub fn with_kepler_policy(mut self, policy: KeplerPolicy) -> Self {
        self.kepler_policy = policy;
        self
    }

    pub fn validate(&self) -> Result<(), MeePropError> {
        self.body.validate()?;
        self.tolerances.validate()?;
        if !(self.kepler.tolerance > 0.0 && self.kepler.tolerance.is_finite()) {
            return Err(MeePropError::InvalidConfiguration(format!(
                "Kepler tolerance must be positive and finite, got {}",
                self.kepler.tolerance
            )));
        }
        if self.kepler.max_iterations == 0 {
            return Err(MeePropError::InvalidConfiguration(
                "Kepler solver needs at least one iteration".into(),
            ));
        }
        Ok(())
    }
}

/// Upper bound on the number of generated output times.
pub const MAX_SAMPLES: usize = 10_000_000;

/// Relative slack, in units of the sampling interval, below which a trailing
/// remainder of the span does not produce an extra sample.
const SPAN_ROUNDING: f64 = 1e-9;

/// Which output times a run should produce, relative to the propagation epoch.
///
/// Every variant yields sorted times inside `[0, T]`. `Interval` and `Count`
/// always include both ends of the span.
#[derive(Debug, Clone, PartialEq)]
pub enum Sampling {
    /// Fixed spacing; the last interval is shortened to end exactly at `T`, or
    /// stretched when `T` overshoots a multiple of the step by less than 1e-9 step.
    Interval(Duration),
    /// `n ≥ 2` evenly spaced samples from 0 to `T`.
    Count(usize),
    /// Explicit times in seconds.
    Times(Vec<Seconds>),
}

impl Sampling {
    /// Output times (s) for a span of `span` seconds.
    pub fn output_times(&self, span: Seconds) -> Result<Vec<Seconds>, MeePropError> {
        if !(span >= 0.0 && span.is_finite()) {
            return Err(MeePropError::InvalidSampling(format!(
                "propagation span must be finite and non-negative, got {span} s"
            )));
        }

        match self {
            Sampling::Interval(step) => {
                let step = step.to_seconds();
                if !(step > 0.0 && step.is_finite()) {
                    return Err(MeePropError::InvalidSampling(format!(
                        "sampling interval must be positive, got {step} s"
                    )));
                }
                let intervals = (span / step + SPAN_ROUNDING).floor();
                if intervals >= MAX_SAMPLES as f64 {
                    return Err(MeePropError::InvalidSampling(format!(
                        "a {step} s interval over {span} s needs more than {MAX_SAMPLES} samples"
                    )));
                }
                let n = intervals as usize;

                // multiples of the step rather than a running sum, no drift
                let mut times: Vec<f64> = (0..=n).map(|i| (i as f64 * step).min(span)).collect();
                if span - n as f64 * step > SPAN_ROUNDING * step {
                    times.push(span);
                } else if let Some(last) = times.last_mut() {
                    // a sliver shorter than the rounding slack is folded into the last sample
                    *last = span;
                }
                Ok(times)
            }
            Sampling::Count(count) => {
                if *count < 2 {
                    return Err(MeePropError::InvalidSampling(format!(
                        "at least two samples are needed to cover the span, got {count}"
                    )));
                }
                if *count > MAX_SAMPLES {
                    return Err(MeePropError::InvalidSampling(format!(
                        "{count} samples requested, at most {MAX_SAMPLES} are supported"
                    )));
                }
                let last = (count - 1) as f64;
                Ok((0..*count)
                    .map(|i| if i == count - 1 { span } else { span * i as f64 / last })
                    .collect())
            }
            Sampling::Times(times) => {
                if let Some(bad) = times.iter().find(|t| !(**t >= 0.0 && **t <= span)) {
                    return Err(MeePropError::InvalidSampling(format!(
                        "sample time {bad} s is outside the span [0, {span}] s"
                    )));
                }
                if times.windows(2).any(|w| w[1] < w[0]) {
                    return Err(MeePropError::InvalidSampling(
                        "sample times must be sorted in increasing order".into(),
                    ));
                }
                Ok(times.clone())
            }
        }
    }
}

/// J2 propagator in modified equinoctial elements.
///
/// Generic over the [`Integrator`] so that another solver can be plugged in;
/// [`Propagator::new`] uses [`DormandPrince54`] with the configured tolerances.
#[derive(Debug, Clone, PartialEq)]
pub struct Propagator<I: Integrator = DormandPrince54> {
    config: PropagationConfig,
    dynamics: J2Dynamics,
    integrator: I,
}

impl Propagator<DormandPrince54> {
    pub fn new(config: PropagationConfig) -> Result<Self, MeePropError> {
        Propagator::with_integrator(config, DormandPrince54::new(config.tolerances))
    }
}

impl<I: Integrator> Propagator<I> {
    /// Build a propagator around a caller-supplied integrator.
    ///
    /// The integrator keeps its own step control settings: `config.tolerances` is
    /// validated but not pushed into `integrator`.
    pub fn with_integrator(config: PropagationConfig, integrator: I) -> Result<Self, MeePropError> {
        config.validate()?;
        if let Some(own) = integrator.tolerances() {
            if own != config.tolerances {
                debug!(
                    "integrator tolerances (rtol = {:e}, atol = {:e}) override the configured ones (rtol = {:e}, atol = {:e})",
                    own.relative, own.absolute, config.tolerances.relative, config.tolerances.absolute
                );
            }
        }
        Ok(Propagator {
            config,
            dynamics: J2Dynamics::new(config.body),
            integrator,
        })
    }

    pub fn config(&self) -> &PropagationConfig {
        &self.config
    }

    pub fn dynamics(&self) -> &J2Dynamics {
        &self.dynamics
    }

    pub fn integrator(&self) -> &I {
        &self.integrator
    }

    /// Equinoctial state at the epoch, using the configured Kepler solver and policy.
    pub fn initial_state(
        &self,
        initial: &KeplerianElements,
    ) -> Result<EquinoctialElements, MeePropError> {
        EquinoctialElements::from_keplerian(initial, &self.config.kepler, self.config.kepler_policy)
    }

    /// Propagate classical initial elements over `duration`.
    ///
    /// Arguments
    /// ---------
    /// * `initial` – elements at the epoch; any anomaly kind is accepted.
    /// * `duration` – propagation span, must be non-negative.
    /// * `sampling` – output times, relative to the epoch.
    ///
    /// Return
    /// ------
    /// * A [`Trajectory`] with one sample per requested time, in order.
    ///
    /// Errors
    /// ------
    /// * [`MeePropError::KeplerNotConverged`] under [`KeplerPolicy::Strict`].
    /// * [`MeePropError::DegenerateGeometry`] for a non-elliptic or singular state.
    /// * [`MeePropError::InvalidSampling`] for an unusable sampling request.
    /// * [`MeePropError::IntegrationFailure`] if the integrator gives up; no partial
    ///   trajectory is returned.
    pub fn propagate(
        &self,
        initial: &KeplerianElements,
        duration: Duration,
        sampling: &Sampling,
    ) -> Result<Trajectory, MeePropError> {
        let state = self.initial_state(initial)?;
        self.propagate_equinoctial(&state, duration, sampling)
    }

    /// Propagate from an equinoctial state, e.g. an equatorial or circular orbit
    /// whose classical angles are not defined.
    pub fn propagate_equinoctial(
        &self,
        initial: &EquinoctialElements,
        duration: Duration,
        sampling: &Sampling,
    ) -> Result<Trajectory, MeePropError> {
        initial.validate()?;
        let span = duration.to_seconds();
        let times = sampling.output_times(span)?;

        debug!(
            "propagating {initial} over {span} s, {} output samples, J2 = {}",
            times.len(),
            self.config.body.j2
        );

        let dynamics = self.dynamics;
        let output = self.integrator.integrate(
            |t, y| dynamics.derivative(t, y),
            0.0,
            &initial.to_vector(),
            &times,
        )?;

        debug!(
            "propagation done: {} accepted steps, {} rejected, {} derivative evaluations",
            output.stats.accepted_steps, output.stats.rejected_steps, output.stats.rhs_evaluations
        );

        let samples = times
            .iter()
            .zip(output.states.iter())
            .map(|(&time, state)| TrajectorySample {
                time,
                state: EquinoctialElements::from_vector(state),
            })
            .collect();

        Ok(Trajectory::new(samples, output.stats))
    }
}

#[cfg(test)]
mod propagator_test {
    use super::*;
    use crate::{
        meeprop_errors::IntegrationFailureReason, orbit_type::keplerian_element::Anomaly,
    };
    use approx::assert_abs_diff_eq;
    use std::f64::consts::PI;

    fn leo() -> KeplerianElements {
        KeplerianElements {
            semi_major_axis: 7_000.0,
            eccentricity: 0.01,
            inclination: 0.9,
            ascending_node_longitude: 0.3,
            periapsis_argument: 0.2,
            anomaly: Anomaly::Mean(0.1),
        }
    }

    #[test]
    fn test_interval_sampling_includes_span_end() {
        let times = Sampling::Interval(Duration::from_seconds(60.0))
            .output_times(150.0)
            .unwrap();
        assert_eq!(times, vec![0.0, 60.0, 120.0, 150.0]);

        let exact = Sampling::Interval(Duration::from_seconds(0.1))
            .output_times(1.0)
            .unwrap();
        assert_eq!(exact.len(), 11);
        assert_eq!(*exact.last().unwrap(), 1.0);
    }

    #[test]
    fn test_interval_sampling_folds_rounding_remainder() {
        let times = Sampling::Interval(Duration::from_seconds(1.0))
            .output_times(3.000_000_000_1)
            .unwrap();
        assert_eq!(times.len(), 4);
        assert_eq!(times[2], 2.0);
        assert_eq!(*times.last().unwrap(), 3.000_000_000_1);

        let single = Sampling::Interval(Duration::from_seconds(60.0))
            .output_times(0.0)
            .unwrap();
        assert_eq!(single, vec![0.0]);
    }

    #[test]
    fn test_sampling_size_is_bounded() {
        let dense = Sampling::Interval(Duration::from_seconds(1e-9)).output_times(86_400.0);
        assert!(matches!(dense, Err(MeePropError::InvalidSampling(_))));

        let many = Sampling::Count(MAX_SAMPLES + 1).output_times(86_400.0);
        assert!(matches!(many, Err(MeePropError::InvalidSampling(_))));
    }

    #[test]
    fn test_supplied_integrator_keeps_its_tolerances() {
        let config = PropagationConfig::default();
        let loose = Tolerances::new(1e-6, 1e-8);
        let propagator =
            Propagator::with_integrator(config, DormandPrince54::new(loose)).unwrap();

        assert_eq!(propagator.config().tolerances, Tolerances::default());
        assert_eq!(propagator.integrator().tolerances(), Some(loose));

        let default = Propagator::new(config.with_tolerances(loose)).unwrap();
        assert_eq!(default.integrator().tolerances(), Some(loose));
    }

    #[test]
    fn test_count_sampling() {
        let times = Sampling::Count(5).output_times(100.0).unwrap();
        assert_eq!(times, vec![0.0, 25.0, 50.0, 75.0, 100.0]);

        assert!(matches!(
            Sampling::Count(1).output_times(100.0),
            Err(MeePropError::InvalidSampling(_))
        ));
    }

    #[test]
    fn test_explicit_sampling_is_checked() {
        let ok = Sampling::Times(vec![0.0, 10.0, 10.0, 99.0]).output_times(100.0);
        assert_eq!(ok.unwrap().len(), 4);

        let unsorted = Sampling::Times(vec![10.0, 5.0]).output_times(100.0);
        assert!(matches!(unsorted, Err(MeePropError::InvalidSampling(_))));

        let outside = Sampling::Times(vec![0.0, 101.0]).output_times(100.0);
        assert!(matches!(outside, Err(MeePropError::InvalidSampling(_))));

        let negative_span = Sampling::Count(3).output_times(-1.0);
        assert!(matches!(negative_span, Err(MeePropError::InvalidSampling(_))));
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let config = PropagationConfig::default().with_tolerances(Tolerances::new(-1.0, 1e-12));
        assert!(matches!(
            Propagator::new(config),
            Err(MeePropError::InvalidConfiguration(_))
        ));

        let config = PropagationConfig::default().with_kepler_solver(KeplerSolver::new(1e-10, 0));
        assert!(matches!(
            Propagator::new(config),
            Err(MeePropError::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn test_zero_span_returns_initial_state() {
        let propagator = Propagator::new(PropagationConfig::default()).unwrap();
        let traj = propagator
            .propagate(&leo(), Duration::ZERO, &Sampling::Times(vec![0.0]))
            .unwrap();

        assert_eq!(traj.len(), 1);
        let expected = propagator.initial_state(&leo()).unwrap();
        assert_eq!(traj.samples()[0].state, expected);
        assert_eq!(traj.stats().accepted_steps, 0);
    }

    #[test]
    fn test_one_orbit_two_body() {
        let config = PropagationConfig::default()
            .with_body(CentralBody::earth().point_mass())
            .with_kepler_solver(KeplerSolver::new(1e-14, 50));
        let propagator = Propagator::new(config).unwrap();
        let period = leo().period(config.body.mu);

        let traj = propagator
            .propagate(
                &leo(),
                Duration::from_seconds(period),
                &Sampling::Count(2),
            )
            .unwrap();

        let start = traj.first().unwrap().state;
        let end = traj.last().unwrap().state;
        assert_abs_diff_eq!(end.semi_latus_rectum, start.semi_latus_rectum, epsilon = 1e-9);
        assert_abs_diff_eq!(end.true_longitude, start.true_longitude + 2.0 * PI, epsilon = 1e-7);
    }

    #[test]
    fn test_unconverged_kepler_solve() {
        let hard = KeplerianElements {
            eccentricity: 0.999,
            anomaly: Anomaly::Mean(0.01),
            ..leo()
        };
        let strict = PropagationConfig::default().with_kepler_solver(KeplerSolver::new(1e-12, 3));
        let propagator = Propagator::new(strict).unwrap();
        let res = propagator.propagate(&hard, Duration::from_seconds(60.0), &Sampling::Count(2));
        assert!(matches!(res, Err(MeePropError::KeplerNotConverged { .. })));

        let lenient = strict.with_kepler_policy(KeplerPolicy::Warn);
        let propagator = Propagator::new(lenient).unwrap();
        assert!(propagator.initial_state(&hard).is_ok());
    }

    #[test]
    fn test_integration_failure_is_surfaced() {
        let config = PropagationConfig::default();
        let integrator = DormandPrince54::new(config.tolerances).with_max_steps(10);
        let propagator = Propagator::with_integrator(config, integrator).unwrap();

        let res = propagator.propagate(&leo(), Duration::from_days(1.0), &Sampling::Count(2));
        match res {
            Err(MeePropError::IntegrationFailure { reason, .. }) => {
                assert_eq!(reason, IntegrationFailureReason::MaxStepsExceeded { steps: 10 })
            }
            other => panic!("expected an integration failure, got {other:?}"),
        }
    }

    #[test]
    fn test_degenerate_initial_state() {
        let hyperbolic = KeplerianElements {
            eccentricity: 1.2,
            ..leo()
        };
        let propagator = Propagator::new(PropagationConfig::default()).unwrap();
        let res = propagator.propagate(&hyperbolic, Duration::from_seconds(60.0), &Sampling::Count(2));
        assert!(matches!(res, Err(MeePropError::DegenerateGeometry(_))));
    }
}
