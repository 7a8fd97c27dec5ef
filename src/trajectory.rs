//! # Propagated trajectories
//!
//! A [`Trajectory`] owns the equinoctial samples produced by the integrator.
//! Classical elements are derived on demand, never stored next to the samples.
//!
//! Trajectories can be written as CSV (one row per sample, equinoctial state
//! followed by the derived classical elements) for plotting or further analysis.
use std::{fs::File, io, path::Path};

use serde::Serialize;

use crate::{
    constants::Seconds,
    integrator::IntegrationStats,
    meeprop_errors::MeePropError,
    orbit_type::{
        equinoctial_element::EquinoctialElements,
        keplerian_element::{Anomaly, KeplerianElements},
    },
};

/// Equinoctial state at a given time (s since the propagation epoch).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrajectorySample {
    pub time: Seconds,
    pub state: EquinoctialElements,
}

impl TrajectorySample {
    /// Classical elements of this sample (true anomaly).
    pub fn classical(&self) -> Result<KeplerianElements, MeePropError> {
        KeplerianElements::try_from(&self.state)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Trajectory {
    samples: Vec<TrajectorySample>,
    stats: IntegrationStats,
}

/// CSV row layout.
#[derive(Debug, Serialize)]
struct TrajectoryRecord {
    time_s: f64,
    p_km: f64,
    f: f64,
    g: f64,
    h: f64,
    k: f64,
    true_longitude_rad: f64,
    a_km: f64,
    e: f64,
    i_rad: f64,
    raan_rad: f64,
    argp_rad: f64,
    true_anomaly_rad: f64,
}

impl TrajectoryRecord {
    fn new(sample: &TrajectorySample) -> Result<Self, MeePropError> {
        let kep = sample.classical()?;
        let true_anomaly = match kep.anomaly {
            Anomaly::True(nu) => nu,
            _ => kep.true_anomaly()?,
        };
        let state = &sample.state;

        Ok(TrajectoryRecord {
            time_s: sample.time,
            p_km: state.semi_latus_rectum,
            f: state.ecc_cos_lon,
            g: state.ecc_sin_lon,
            h: state.tan_half_incl_cos_node,
            k: state.tan_half_incl_sin_node,
            true_longitude_rad: state.true_longitude,
            a_km: kep.semi_major_axis,
            e: kep.eccentricity,
            i_rad: kep.inclination,
            raan_rad: kep.ascending_node_longitude,
            argp_rad: kep.periapsis_argument,
            true_anomaly_rad: true_anomaly,
        })
    }
}

impl Trajectory {
    pub fn new(samples: Vec<TrajectorySample>, stats: IntegrationStats) -> Self {
        Trajectory { samples, stats }
    }

    pub fn samples(&self) -> &[TrajectorySample] {
        &self.samples
    }

    pub fn iter(&self) -> std::slice::Iter<'_, TrajectorySample> {
        self.samples.iter()
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn first(&self) -> Option<&TrajectorySample> {
        self.samples.first()
    }

    pub fn last(&self) -> Option<&TrajectorySample> {
        self.samples.last()
    }

    /// Integrator work counters for the run that produced this trajectory.
    pub fn stats(&self) -> IntegrationStats {
        self.stats
    }

    /// Sample times (s).
    pub fn times(&self) -> Vec<Seconds> {
        self.samples.iter().map(|s| s.time).collect()
    }

    /// Classical elements for every sample, in order.
    pub fn classical_series(&self) -> Result<Vec<(Seconds, KeplerianElements)>, MeePropError> {
        self.samples
            .iter()
            .map(|s| Ok((s.time, s.classical()?)))
            .collect()
    }

    /// Write the trajectory as CSV with a header row.
    pub fn write_csv<W: io::Write>(&self, writer: W) -> Result<(), MeePropError> {
        let mut wtr = csv::Writer::from_writer(writer);
        for sample in &self.samples {
            wtr.serialize(TrajectoryRecord::new(sample)?)?;
        }
        wtr.flush()?;
        Ok(())
    }

    pub fn write_csv_file<P: AsRef<Path>>(&self, path: P) -> Result<(), MeePropError> {
        self.write_csv(File::create(path)?)
    }
}

impl<'a> IntoIterator for &'a Trajectory {
    type Item = &'a TrajectorySample;
    type IntoIter = std::slice::Iter<'a, TrajectorySample>;

    fn into_iter(self) -> Self::IntoIter {
        self.samples.iter()
    }
}
