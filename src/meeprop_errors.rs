use std::fmt;

use thiserror::Error;

/// Reason reported by an [`Integrator`](crate::integrator::Integrator) when it
/// gives up on a run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum IntegrationFailureReason {
    /// The controller asked for a step smaller than the configured minimum.
    StepSizeCollapse { step: f64 },
    /// The step budget was exhausted before reaching the final output time.
    MaxStepsExceeded { steps: usize },
    /// A stage produced a NaN or infinite component.
    NonFiniteState,
}

impl fmt::Display for IntegrationFailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IntegrationFailureReason::StepSizeCollapse { step } => {
                write!(f, "step size collapsed to {step:e} s")
            }
            IntegrationFailureReason::MaxStepsExceeded { steps } => {
                write!(f, "maximum number of steps ({steps}) exceeded")
            }
            IntegrationFailureReason::NonFiniteState => write!(f, "non-finite state encountered"),
        }
    }
}

#[derive(Error, Debug)]
pub enum MeePropError {
    #[error(
        "Kepler equation did not converge for M = {mean_anomaly}, e = {eccentricity} \
         after {iterations} iterations (last correction {last_correction:e})"
    )]
    KeplerNotConverged {
        mean_anomaly: f64,
        eccentricity: f64,
        iterations: usize,
        last_correction: f64,
    },

    #[error("Degenerate orbit geometry: {0}")]
    DegenerateGeometry(String),

    #[error("Integration failed at t = {time} s: {reason}")]
    IntegrationFailure {
        time: f64,
        reason: IntegrationFailureReason,
    },

    #[error("Invalid sampling request: {0}")]
    InvalidSampling(String),

    #[error("Invalid propagation configuration: {0}")]
    InvalidConfiguration(String),

    #[error("Unable to write trajectory as CSV: {0}")]
    Csv(#[from] csv::Error),

    #[error("Unable to perform file operation: {0}")]
    IoError(#[from] std::io::Error),
}

impl PartialEq for MeePropError {
    fn eq(&self, other: &Self) -> bool {
        use MeePropError::*;
        match (self, other) {
            (
                KeplerNotConverged {
                    mean_anomaly: m1,
                    eccentricity: e1,
                    iterations: n1,
                    last_correction: d1,
                },
                KeplerNotConverged {
                    mean_anomaly: m2,
                    eccentricity: e2,
                    iterations: n2,
                    last_correction: d2,
                },
            ) => m1 == m2 && e1 == e2 && n1 == n2 && d1 == d2,
            (DegenerateGeometry(a), DegenerateGeometry(b)) => a == b,
            (
                IntegrationFailure {
                    time: t1,
                    reason: r1,
                },
                IntegrationFailure {
                    time: t2,
                    reason: r2,
                },
            ) => t1 == t2 && r1 == r2,
            (InvalidSampling(a), InvalidSampling(b)) => a == b,
            (InvalidConfiguration(a), InvalidConfiguration(b)) => a == b,

            // not comparable, same variant is enough
            (Csv(_), Csv(_)) => true,
            (IoError(_), IoError(_)) => true,

            _ => false,
        }
    }
}
