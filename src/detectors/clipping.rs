use nalgebra::{DMatrix, DVector};

use crate::core::state::ClipBounds;

/// Winsorizes incoming rows to `mean ± k·stdev` once the warm-up is over.
///
/// Activation depends only on the observation count seen *before* the batch;
/// bounds are refreshed from the moments *after* the batch, so every call
/// clamps against the previous call's estimate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClippingPolicy {
    std_clip: f64,
    start_clip: u64,
}

impl ClippingPolicy {
    pub fn new(std_clip: f64, start_clip: u64) -> Self {
        Self {
            std_clip,
            start_clip,
        }
    }

    pub fn is_active(&self, observation_count: u64) -> bool {
        observation_count > 0 && observation_count > self.start_clip
    }

    pub fn bounds(&self, mean: &DVector<f64>, covariance: &DMatrix<f64>) -> ClipBounds {
        let width = covariance.diagonal().map(|v| v.max(0.0).sqrt() * self.std_clip);
        ClipBounds {
            lower: mean - &width,
            upper: mean + &width,
        }
    }

    /// Bounds to carry into the next call, or `None` while still warming up.
    pub fn refresh(
        &self,
        observation_count: u64,
        mean: &DVector<f64>,
        covariance: &DMatrix<f64>,
    ) -> Option<ClipBounds> {
        self.is_active(observation_count)
            .then(|| self.bounds(mean, covariance))
    }

    pub fn clamp(bounds: &ClipBounds, row: &DVector<f64>) -> DVector<f64> {
        DVector::from_fn(row.len(), |j, _| {
            row[j].max(bounds.lower[j]).min(bounds.upper[j])
        })
    }

    /// Clamped copies of `rows` when clipping is active, plain copies otherwise.
    pub fn apply(
        &self,
        observation_count: u64,
        bounds: Option<&ClipBounds>,
        rows: &[DVector<f64>],
    ) -> Vec<DVector<f64>> {
        match bounds {
            Some(bounds) if self.is_active(observation_count) => {
                rows.iter().map(|row| Self::clamp(bounds, row)).collect()
            }
            _ => rows.to_vec(),
        }
    }
}
