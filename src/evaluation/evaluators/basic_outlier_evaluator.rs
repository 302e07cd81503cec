use crate::core::observation::Observation;
use crate::detectors::RowScore;
use crate::evaluation::{Estimator, Measurement, OutlierEvaluator};

/// Basic online evaluator for an outlier detector.
///
/// Tracks:
/// - `coverage`: share of rows that received a defined score;
/// - `mean_score`: mean Mahalanobis score over scored rows;
/// - `outlier_rate`: share of scored rows labeled outliers;
/// - `precision` / `recall` of the outlier label, over scored rows that
///   carry ground truth (`NaN` until such rows arrive).
pub struct BasicOutlierEvaluator<E: Estimator + Default> {
    coverage: E,
    mean_score: E,
    outlier_rate: E,
    precision: E,
    recall: E,
}

impl<E: Estimator + Default> BasicOutlierEvaluator<E> {
    pub fn new() -> Self {
        Self {
            coverage: E::default(),
            mean_score: E::default(),
            outlier_rate: E::default(),
            precision: E::default(),
            recall: E::default(),
        }
    }

    #[inline]
    fn indicator(flag: bool) -> f64 {
        if flag { 1.0 } else { 0.0 }
    }
}

impl<E: Estimator + Default> Default for BasicOutlierEvaluator<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: Estimator + Default> OutlierEvaluator for BasicOutlierEvaluator<E> {
    fn reset(&mut self) {
        *self = Self::new();
    }

    fn add_result(&mut self, example: &Observation, result: &RowScore) {
        self.coverage.add(Self::indicator(result.score.is_some()));
        let Some(score) = result.score else {
            return;
        };

        self.mean_score.add(score);
        self.outlier_rate.add(Self::indicator(result.is_outlier));

        if let Some(truth) = example.is_anomaly {
            if result.is_outlier {
                self.precision.add(Self::indicator(truth));
            }
            if truth {
                self.recall.add(Self::indicator(result.is_outlier));
            }
        }
    }

    fn performance(&self) -> Vec<Measurement> {
        vec![
            Measurement::new("coverage", self.coverage.estimation()),
            Measurement::new("mean_score", self.mean_score.estimation()),
            Measurement::new("outlier_rate", self.outlier_rate.estimation()),
            Measurement::new("precision", self.precision.estimation()),
            Measurement::new("recall", self.recall.estimation()),
        ]
    }
}
