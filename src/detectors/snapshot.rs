use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};

use crate::config::MahalanobisParams;
use crate::core::error::DetectorError;
use crate::core::state::{ClipBounds, EstimatorState, Statistics};
use crate::detectors::mahalanobis::MahalanobisDetector;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotBounds {
    pub lower: Vec<f64>,
    pub upper: Vec<f64>,
}

/// Serializable copy of a detector: configuration plus running statistics.
///
/// `covariance` is stored row-major. Durability is up to the caller; this
/// type only guarantees that [`MahalanobisDetector::restore`] rebuilds an
/// equivalent detector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectorSnapshot {
    pub params: MahalanobisParams,
    pub observation_count: u64,
    pub mean: Option<Vec<f64>>,
    pub covariance: Option<Vec<Vec<f64>>>,
    pub clip_bounds: Option<SnapshotBounds>,
}

impl DetectorSnapshot {
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn from_json(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(raw)
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let raw = serde_json::to_string_pretty(self).context("serializing detector snapshot")?;
        fs::write(path, raw).with_context(|| format!("writing snapshot to {}", path.display()))
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path)
            .with_context(|| format!("reading snapshot from {}", path.display()))?;
        Self::from_json(&raw).with_context(|| format!("parsing snapshot {}", path.display()))
    }
}

impl MahalanobisDetector {
    pub fn snapshot(&self) -> DetectorSnapshot {
        let state = self.state();
        let (mean, covariance) = match &state.statistics {
            Statistics::Uninitialized => (None, None),
            Statistics::Accumulating { mean, covariance } => (
                Some(mean.iter().copied().collect()),
                Some(
                    covariance
                        .row_iter()
                        .map(|row| row.iter().copied().collect())
                        .collect(),
                ),
            ),
        };
        DetectorSnapshot {
            params: self.params().clone(),
            observation_count: state.observation_count,
            mean,
            covariance,
            clip_bounds: state.clip_bounds.as_ref().map(|b| SnapshotBounds {
                lower: b.lower.iter().copied().collect(),
                upper: b.upper.iter().copied().collect(),
            }),
        }
    }

    /// Rebuilds a detector, re-checking every state invariant.
    pub fn restore(snapshot: DetectorSnapshot) -> Result<Self, DetectorError> {
        let DetectorSnapshot {
            params,
            observation_count,
            mean,
            covariance,
            clip_bounds,
        } = snapshot;

        let statistics = match (mean, covariance) {
            (None, None) => {
                if observation_count != 0 {
                    return Err(invalid("statistics missing for a non-empty detector"));
                }
                Statistics::Uninitialized
            }
            (Some(mean), Some(rows)) => {
                if observation_count == 0 {
                    return Err(invalid("statistics present but observation count is 0"));
                }
                restore_moments(mean, rows)?
            }
            _ => return Err(invalid("mean and covariance must be both present or both absent")),
        };

        let p = statistics.dimensions().unwrap_or(0);
        let clip_bounds = match clip_bounds {
            None => None,
            Some(bounds) => {
                if bounds.lower.len() != p || bounds.upper.len() != p {
                    return Err(invalid("clip bounds width differs from the mean"));
                }
                if !bounds.lower.iter().chain(&bounds.upper).all(|v| v.is_finite()) {
                    return Err(invalid("clip bounds contain non-finite values"));
                }
                Some(ClipBounds {
                    lower: DVector::from_vec(bounds.lower),
                    upper: DVector::from_vec(bounds.upper),
                })
            }
        };
        if clip_bounds.is_some() != (observation_count > params.start_clip) {
            return Err(invalid(
                "clip bounds must be present exactly when the count exceeds start_clip",
            ));
        }

        Self::from_parts(
            params,
            EstimatorState {
                statistics,
                observation_count,
                clip_bounds,
            },
        )
    }
}

fn restore_moments(mean: Vec<f64>, rows: Vec<Vec<f64>>) -> Result<Statistics, DetectorError> {
    let p = mean.len();
    if p == 0 {
        return Err(invalid("mean has no features"));
    }
    if rows.len() != p || rows.iter().any(|row| row.len() != p) {
        return Err(invalid("covariance is not a square matrix matching the mean"));
    }
    if !mean.iter().chain(rows.iter().flatten()).all(|v| v.is_finite()) {
        return Err(invalid("statistics contain non-finite values"));
    }

    let covariance = DMatrix::from_fn(p, p, |r, c| rows[r][c]);
    if covariance != covariance.transpose() {
        return Err(invalid("covariance is not symmetric"));
    }

    Ok(Statistics::Accumulating {
        mean: DVector::from_vec(mean),
        covariance,
    })
}

fn invalid(reason: &str) -> DetectorError {
    DetectorError::InvalidSnapshot(reason.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::streams::Stream;
    use crate::streams::generators::GaussianGenerator;
    use tempfile::NamedTempFile;

    fn warmed_detector() -> (MahalanobisDetector, GaussianGenerator) {
        let mut generator = GaussianGenerator::standard(3, None, 41).unwrap();
        let mut detector = MahalanobisDetector::new(9.0, 2, 3.0, 20, Some(500)).unwrap();
        for _ in 0..5 {
            let batch: Vec<Vec<f64>> = generator
                .next_batch(10)
                .into_iter()
                .map(|o| o.values)
                .collect();
            detector.process(&batch).unwrap();
        }
        (detector, generator)
    }

    #[test]
    fn cold_detector_round_trips() {
        let detector = MahalanobisDetector::new(9.0, 2, 3.0, 20, None).unwrap();
        let snapshot = detector.snapshot();
        assert!(snapshot.mean.is_none());
        let restored = MahalanobisDetector::restore(snapshot).unwrap();
        assert_eq!(restored.state(), detector.state());
    }

    #[test]
    fn restored_detector_scores_identically() {
        let (mut detector, mut generator) = warmed_detector();
        let json = detector.snapshot().to_json().unwrap();
        let mut restored =
            MahalanobisDetector::restore(DetectorSnapshot::from_json(&json).unwrap()).unwrap();
        assert_eq!(restored.params(), detector.params());
        assert_eq!(restored.state(), detector.state());

        let batch: Vec<Vec<f64>> = generator
            .next_batch(15)
            .into_iter()
            .map(|o| o.values)
            .collect();
        assert_eq!(
            restored.process(&batch).unwrap(),
            detector.process(&batch).unwrap()
        );
        assert_eq!(restored.state(), detector.state());
    }

    #[test]
    fn save_and_load_through_a_file() {
        let (detector, _) = warmed_detector();
        let tf = NamedTempFile::new().unwrap();
        detector.snapshot().save(tf.path()).unwrap();
        let loaded = DetectorSnapshot::load(tf.path()).unwrap();
        assert_eq!(loaded, detector.snapshot());
    }

    #[test]
    fn load_reports_the_path_on_failure() {
        let tf = NamedTempFile::new().unwrap();
        std::fs::write(tf.path(), "not json").unwrap();
        let err = DetectorSnapshot::load(tf.path()).unwrap_err();
        assert!(format!("{err:#}").contains("parsing snapshot"));
    }

    #[test]
    fn inconsistent_snapshots_are_rejected() {
        let (detector, _) = warmed_detector();
        let good = detector.snapshot();

        let mut s = good.clone();
        s.covariance = None;
        assert!(matches!(
            MahalanobisDetector::restore(s),
            Err(DetectorError::InvalidSnapshot(_))
        ));

        let mut s = good.clone();
        if let Some(rows) = s.covariance.as_mut() {
            rows[0][1] += 1.0;
        }
        assert!(matches!(
            MahalanobisDetector::restore(s),
            Err(DetectorError::InvalidSnapshot(_))
        ));

        let mut s = good.clone();
        s.clip_bounds = None;
        assert!(matches!(
            MahalanobisDetector::restore(s),
            Err(DetectorError::InvalidSnapshot(_))
        ));

        let mut s = good.clone();
        s.mean = Some(vec![0.0; 2]);
        assert!(matches!(
            MahalanobisDetector::restore(s),
            Err(DetectorError::InvalidSnapshot(_))
        ));

        let mut s = good.clone();
        s.observation_count = 0;
        assert!(MahalanobisDetector::restore(s).is_err());

        let mut s = good;
        s.params.n_components = 0;
        assert!(matches!(
            MahalanobisDetector::restore(s),
            Err(DetectorError::Configuration(_))
        ));
    }
}
