use nalgebra::{DMatrix, DVector};
use strum_macros::{Display, EnumIter, IntoStaticStr};

/// Running first and second moments of the clipped observations.
///
/// `Uninitialized` stands in for "no observation absorbed yet"; the feature
/// width is only known once the first batch arrives.
#[derive(Debug, Clone, PartialEq)]
pub enum Statistics {
    Uninitialized,
    Accumulating {
        mean: DVector<f64>,
        covariance: DMatrix<f64>,
    },
}

impl Statistics {
    pub fn dimensions(&self) -> Option<usize> {
        match self {
            Self::Uninitialized => None,
            Self::Accumulating { mean, .. } => Some(mean.len()),
        }
    }

    /// Mean and covariance, with zeros standing in for an uninitialized state
    /// of width `p`.
    pub fn moments_or_zero(&self, p: usize) -> (DVector<f64>, DMatrix<f64>) {
        match self {
            Self::Uninitialized => (DVector::zeros(p), DMatrix::zeros(p, p)),
            Self::Accumulating { mean, covariance } => (mean.clone(), covariance.clone()),
        }
    }
}

/// Per-feature clamp interval, `mean ± k·stdev`.
#[derive(Debug, Clone, PartialEq)]
pub struct ClipBounds {
    pub lower: DVector<f64>,
    pub upper: DVector<f64>,
}

impl ClipBounds {
    pub fn dimensions(&self) -> usize {
        self.lower.len()
    }
}

/// Lifecycle stage, driven only by the observation count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, IntoStaticStr, EnumIter)]
#[strum(serialize_all = "kebab-case")]
pub enum DetectorPhase {
    Cold,
    Warming,
    ClippingActive,
}

impl DetectorPhase {
    pub fn from_count(observation_count: u64, start_clip: u64) -> Self {
        if observation_count == 0 {
            Self::Cold
        } else if observation_count <= start_clip {
            Self::Warming
        } else {
            Self::ClippingActive
        }
    }
}

/// Mutable statistics of one detector instance.
#[derive(Debug, Clone, PartialEq)]
pub struct EstimatorState {
    pub statistics: Statistics,
    pub observation_count: u64,
    pub clip_bounds: Option<ClipBounds>,
}

impl EstimatorState {
    pub fn new() -> Self {
        Self {
            statistics: Statistics::Uninitialized,
            observation_count: 0,
            clip_bounds: None,
        }
    }

    /// Count used inside the update weights: the true count, frozen at
    /// `cap` once it is reached.
    pub fn effective_count(&self, cap: Option<u64>) -> u64 {
        match cap {
            Some(cap) if cap > 0 => self.observation_count.min(cap),
            _ => self.observation_count,
        }
    }

    pub fn dimensions(&self) -> Option<usize> {
        self.statistics.dimensions()
    }
}

impl Default for EstimatorState {
    fn default() -> Self {
        Self::new()
    }
}
