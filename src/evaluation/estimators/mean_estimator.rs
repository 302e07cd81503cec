use crate::evaluation::estimators::Estimator;

/// Streaming arithmetic mean. `NaN` inputs are ignored.
#[derive(Debug, Default, Clone, Copy)]
pub struct MeanEstimator {
    count: u64,
    sum: f64,
}

impl Estimator for MeanEstimator {
    #[inline]
    fn add(&mut self, v: f64) {
        if v.is_nan() {
            return;
        }
        self.count += 1;
        self.sum += v;
    }

    #[inline]
    fn estimation(&self) -> f64 {
        if self.count > 0 {
            self.sum / self.count as f64
        } else {
            f64::NAN
        }
    }

    fn count(&self) -> u64 {
        self.count
    }
}
