use std::io::{Error, ErrorKind};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::StandardNormal;

use crate::core::observation::Observation;
use crate::streams::stream::Stream;

/// Independent Gaussian features with optional linear drift and injected
/// anomalies.
///
/// Every observation is labeled: `is_anomaly` is `Some(true)` for rows that
/// were shifted by `anomaly_shift` standard deviations, `Some(false)` otherwise.
#[derive(Debug)]
pub struct GaussianGenerator {
    seed: u64,
    rng: StdRng,
    means: Vec<f64>,
    std_devs: Vec<f64>,
    drift: Vec<f64>,
    anomaly_percentage: u32,
    anomaly_shift: f64,
    max_instances: Option<usize>,
    produced: usize,
}

impl GaussianGenerator {
    pub fn new(
        means: Vec<f64>,
        std_devs: Vec<f64>,
        max_instances: Option<usize>,
        seed: u64,
    ) -> Result<Self, Error> {
        if means.is_empty() {
            return Err(Error::new(
                ErrorKind::InvalidInput,
                "At least one feature is required",
            ));
        }
        if means.len() != std_devs.len() {
            return Err(Error::new(
                ErrorKind::InvalidInput,
                "Means and standard deviations must have the same length",
            ));
        }
        if means.iter().any(|m| !m.is_finite()) {
            return Err(Error::new(
                ErrorKind::InvalidInput,
                "Means must be finite",
            ));
        }
        if std_devs.iter().any(|s| !(s.is_finite() && *s >= 0.0)) {
            return Err(Error::new(
                ErrorKind::InvalidInput,
                "Standard deviations must be finite and non-negative",
            ));
        }

        let p = means.len();
        Ok(Self {
            seed,
            rng: StdRng::seed_from_u64(seed),
            means,
            std_devs,
            drift: vec![0.0; p],
            anomaly_percentage: 0,
            anomaly_shift: 0.0,
            max_instances,
            produced: 0,
        })
    }

    /// Standard normal features of width `p`.
    pub fn standard(p: usize, max_instances: Option<usize>, seed: u64) -> Result<Self, Error> {
        Self::new(vec![0.0; p], vec![1.0; p], max_instances, seed)
    }

    /// Adds `drift[j] · k` to feature `j` of the `k`-th observation.
    pub fn with_drift(mut self, drift: Vec<f64>) -> Result<Self, Error> {
        if drift.len() != self.means.len() {
            return Err(Error::new(
                ErrorKind::InvalidInput,
                "Drift must have one entry per feature",
            ));
        }
        if drift.iter().any(|d| !d.is_finite()) {
            return Err(Error::new(ErrorKind::InvalidInput, "Drift must be finite"));
        }
        self.drift = drift;
        Ok(self)
    }

    /// Shifts `percentage`% of observations by `shift` standard deviations
    /// (random sign per feature).
    pub fn with_anomalies(mut self, percentage: u32, shift: f64) -> Result<Self, Error> {
        if percentage > 100 {
            return Err(Error::new(
                ErrorKind::InvalidInput,
                "Anomaly percentage must be in [0, 100]",
            ));
        }
        if !shift.is_finite() {
            return Err(Error::new(
                ErrorKind::InvalidInput,
                "Anomaly shift must be finite",
            ));
        }
        self.anomaly_percentage = percentage;
        self.anomaly_shift = shift;
        Ok(self)
    }

    #[inline]
    fn standard_normal(&mut self) -> f64 {
        self.rng.sample(StandardNormal)
    }

    #[inline]
    fn roll_anomaly(&mut self) -> bool {
        let roll: u32 = self.rng.random_range(1..=100);
        roll <= self.anomaly_percentage
    }
}

impl Stream for GaussianGenerator {
    fn dimensions(&self) -> usize {
        self.means.len()
    }

    fn has_more_instances(&self) -> bool {
        self.max_instances.map_or(true, |max| self.produced < max)
    }

    fn next_instance(&mut self) -> Option<Observation> {
        if !self.has_more_instances() {
            return None;
        }

        let step = self.produced as f64;
        let mut values = Vec::with_capacity(self.means.len());
        for j in 0..self.means.len() {
            let z = self.standard_normal();
            values.push(self.means[j] + self.drift[j] * step + self.std_devs[j] * z);
        }

        let is_anomaly = self.roll_anomaly();
        if is_anomaly {
            for j in 0..values.len() {
                let sign = if self.rng.random::<bool>() { 1.0 } else { -1.0 };
                values[j] += sign * self.anomaly_shift * self.std_devs[j];
            }
        }

        self.produced += 1;
        Some(Observation::labeled(values, is_anomaly))
    }

    fn restart(&mut self) -> Result<(), Error> {
        self.rng = StdRng::seed_from_u64(self.seed);
        self.produced = 0;
        Ok(())
    }
}
