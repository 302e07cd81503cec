use nalgebra::{DMatrix, DVector};
use tracing::{debug, info, warn};

use crate::config::MahalanobisParams;
use crate::core::error::DetectorError;
use crate::core::observation::validate_batch;
use crate::core::state::{ClipBounds, DetectorPhase, EstimatorState, Statistics};
use crate::detectors::clipping::ClippingPolicy;
use crate::detectors::inverse::IncrementalInverseCovariance;
use crate::detectors::moments::MomentTracker;
use crate::detectors::projection::SubspaceProjector;
use crate::detectors::scoring::{BatchResult, ScoringEngine};

/// Online Mahalanobis outlier detector.
///
/// Each call to [`process`](Self::process) scores a batch against the
/// distribution estimated from everything absorbed *before* the batch, then
/// folds the batch into that estimate:
///
/// 1. rows are clipped to the bounds left by the previous call (once the
///    warm-up of `start_clip` observations is over);
/// 2. running mean and covariance are advanced over the clipped rows;
/// 3. raw rows, clipped rows, per-row running means and the pre-batch
///    covariance are projected onto the top `n_components` principal axes of
///    the pre-batch covariance;
/// 4. the projected covariance inverse is carried row by row with rank-one
///    updates, so row `i` is scored against the estimate that existed just
///    before it;
/// 5. the new moments and clip bounds are committed.
///
/// A call either commits completely or returns an error and leaves the
/// detector untouched.
#[derive(Debug, Clone)]
pub struct MahalanobisDetector {
    params: MahalanobisParams,
    clipping: ClippingPolicy,
    scoring: ScoringEngine,
    state: EstimatorState,
}

impl MahalanobisDetector {
    /// Builds a cold detector from validated parameters.
    pub fn configure(params: MahalanobisParams) -> Result<Self, DetectorError> {
        Self::from_parts(params, EstimatorState::new())
    }

    pub fn new(
        threshold: f64,
        n_components: usize,
        std_clip: f64,
        start_clip: u64,
        max_n: Option<u64>,
    ) -> Result<Self, DetectorError> {
        Self::configure(MahalanobisParams {
            threshold,
            n_components,
            std_clip,
            start_clip,
            max_n,
        })
    }

    pub(crate) fn from_parts(
        params: MahalanobisParams,
        state: EstimatorState,
    ) -> Result<Self, DetectorError> {
        params.validate()?;
        Ok(Self {
            clipping: ClippingPolicy::new(params.std_clip, params.start_clip),
            scoring: ScoringEngine::new(params.threshold),
            params,
            state,
        })
    }

    /// Scores every row of `batch` and absorbs the batch.
    ///
    /// Rows keep their input order in the result. An empty batch is a no-op.
    pub fn process<R: AsRef<[f64]>>(&mut self, batch: &[R]) -> Result<BatchResult, DetectorError> {
        let (result, next) = self.evaluate(batch).inspect_err(|err| {
            if err.is_numerical() {
                warn!(rows = batch.len(), error = %err, "batch rejected");
            }
        })?;

        let Some(next) = next else {
            return Ok(result);
        };

        let phase_before = self.phase();
        let count_before = self.state.observation_count;
        self.state = next;
        let phase_after = self.phase();

        debug!(
            rows = result.len(),
            scored = result.scored_count(),
            outliers = result.outlier_count(),
            observations = self.state.observation_count,
            effective_n = self.effective_count(),
            threshold = self.scoring.threshold(),
            "processed batch"
        );
        if phase_before != phase_after {
            info!(
                from = %phase_before,
                to = %phase_after,
                observations = self.state.observation_count,
                "detector phase changed"
            );
        }
        if let Some(cap) = self.params.max_n {
            if count_before < cap && self.state.observation_count >= cap {
                info!(cap, "effective sample size capped, tracking recent data");
            }
        }

        Ok(result)
    }

    /// Runs the whole pipeline without touching `self.state`; returns the
    /// scores and the state to commit (`None` for an empty batch).
    fn evaluate<R: AsRef<[f64]>>(
        &self,
        batch: &[R],
    ) -> Result<(BatchResult, Option<EstimatorState>), DetectorError> {
        let Some(p) = validate_batch(batch, self.state.dimensions())? else {
            return Ok((BatchResult::default(), None));
        };

        let rows: Vec<DVector<f64>> = batch
            .iter()
            .map(|row| DVector::from_column_slice(row.as_ref()))
            .collect();

        let count = self.state.observation_count;
        let n = self.effective_count();
        let clipped = self
            .clipping
            .apply(count, self.state.clip_bounds.as_ref(), &rows);

        let (mean, covariance) = self.state.statistics.moments_or_zero(p);
        let moments = MomentTracker::new(&mean, &covariance, n).absorb(&clipped);
        if !all_finite(moments.mean.iter()) || !all_finite(moments.covariance.iter()) {
            return Err(DetectorError::NonFinite {
                what: "updated mean/covariance".into(),
            });
        }

        let reference = match &self.state.statistics {
            Statistics::Uninitialized => None,
            Statistics::Accumulating { covariance, .. } => Some(covariance),
        };
        let projector = SubspaceProjector::fit(reference, p, self.params.n_components)?;

        let projected_raw = projector.project_all(&rows);
        let projected_means = projector.project_all(&moments.means_before);
        let deviations: Vec<DVector<f64>> = projector
            .project_all(&clipped)
            .into_iter()
            .zip(&projected_means)
            .map(|(x, m)| x - m)
            .collect();

        let inverses = IncrementalInverseCovariance::inverses(
            projector.project_matrix(&covariance),
            n,
            &deviations,
        );
        let result = self
            .scoring
            .score_batch(&projected_raw, &projected_means, &inverses);
        if !all_finite(result.iter().filter_map(|r| r.score.as_ref())) {
            return Err(DetectorError::NonFinite {
                what: "projected scores".into(),
            });
        }

        let observation_count = count + batch.len() as u64;
        let clip_bounds = self
            .clipping
            .refresh(observation_count, &moments.mean, &moments.covariance);
        let next = EstimatorState {
            statistics: Statistics::Accumulating {
                mean: moments.mean,
                covariance: moments.covariance,
            },
            observation_count,
            clip_bounds,
        };

        Ok((result, Some(next)))
    }

    pub fn params(&self) -> &MahalanobisParams {
        &self.params
    }

    pub fn state(&self) -> &EstimatorState {
        &self.state
    }

    pub fn observation_count(&self) -> u64 {
        self.state.observation_count
    }

    /// Count used inside the update weights.
    pub fn effective_count(&self) -> u64 {
        self.state.effective_count(self.params.max_n)
    }

    /// Feature width, fixed by the first non-empty batch.
    pub fn dimensions(&self) -> Option<usize> {
        self.state.dimensions()
    }

    pub fn mean(&self) -> Option<&DVector<f64>> {
        match &self.state.statistics {
            Statistics::Accumulating { mean, .. } => Some(mean),
            Statistics::Uninitialized => None,
        }
    }

    pub fn covariance(&self) -> Option<&DMatrix<f64>> {
        match &self.state.statistics {
            Statistics::Accumulating { covariance, .. } => Some(covariance),
            Statistics::Uninitialized => None,
        }
    }

    pub fn clip_bounds(&self) -> Option<&ClipBounds> {
        self.state.clip_bounds.as_ref()
    }

    pub fn phase(&self) -> DetectorPhase {
        DetectorPhase::from_count(self.state.observation_count, self.params.start_clip)
    }

    /// Whether the effective count is frozen at `max_n`.
    pub fn is_non_stationary(&self) -> bool {
        self.params
            .max_n
            .is_some_and(|cap| self.state.observation_count >= cap)
    }
}

fn all_finite<'a>(mut values: impl Iterator<Item = &'a f64>) -> bool {
    values.all(|v| v.is_finite())
}
