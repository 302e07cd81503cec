use std::sync::Arc;

use parking_lot::RwLock;

use crate::core::error::DetectorError;
use crate::core::state::EstimatorState;
use crate::detectors::mahalanobis::MahalanobisDetector;
use crate::detectors::scoring::BatchResult;
use crate::detectors::snapshot::DetectorSnapshot;

/// Cloneable handle that lets several threads share one detector.
///
/// `process` holds the write lock for the whole score-and-update call, so
/// batches are applied one at a time. Readers get owned copies taken under
/// the read lock and never see a half-updated mean/covariance pair.
#[derive(Debug, Clone)]
pub struct SharedDetector {
    inner: Arc<RwLock<MahalanobisDetector>>,
}

impl SharedDetector {
    pub fn new(detector: MahalanobisDetector) -> Self {
        Self {
            inner: Arc::new(RwLock::new(detector)),
        }
    }

    pub fn process<R: AsRef<[f64]>>(&self, batch: &[R]) -> Result<BatchResult, DetectorError> {
        self.inner.write().process(batch)
    }

    pub fn state(&self) -> EstimatorState {
        self.inner.read().state().clone()
    }

    pub fn snapshot(&self) -> DetectorSnapshot {
        self.inner.read().snapshot()
    }

    pub fn observation_count(&self) -> u64 {
        self.inner.read().observation_count()
    }

    /// Runs `f` against the detector under the read lock.
    pub fn inspect<T>(&self, f: impl FnOnce(&MahalanobisDetector) -> T) -> T {
        f(&self.inner.read())
    }

    /// Replaces the detector with one rebuilt from `snapshot`.
    pub fn restore(&self, snapshot: DetectorSnapshot) -> Result<(), DetectorError> {
        let detector = MahalanobisDetector::restore(snapshot)?;
        *self.inner.write() = detector;
        Ok(())
    }
}
