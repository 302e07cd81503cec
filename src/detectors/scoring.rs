use nalgebra::{DMatrix, DVector};

/// Outcome for one input row.
///
/// `score` is `None` for rows that arrived before the projected covariance
/// became invertible; such rows are never labeled outliers.
#[derive(Debug, Clone, PartialEq)]
pub struct RowScore {
    pub projection: Vec<f64>,
    pub score: Option<f64>,
    pub is_outlier: bool,
}

/// Per-row results of one `process` call, in input order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchResult {
    pub rows: Vec<RowScore>,
}

impl BatchResult {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, RowScore> {
        self.rows.iter()
    }

    /// Scores with undefined rows reported as `0.0`.
    pub fn scores(&self) -> Vec<f64> {
        self.rows.iter().map(|r| r.score.unwrap_or(0.0)).collect()
    }

    pub fn labels(&self) -> Vec<bool> {
        self.rows.iter().map(|r| r.is_outlier).collect()
    }

    pub fn outlier_count(&self) -> usize {
        self.rows.iter().filter(|r| r.is_outlier).count()
    }

    pub fn scored_count(&self) -> usize {
        self.rows.iter().filter(|r| r.score.is_some()).count()
    }
}

impl IntoIterator for BatchResult {
    type Item = RowScore;
    type IntoIter = std::vec::IntoIter<RowScore>;

    fn into_iter(self) -> Self::IntoIter {
        self.rows.into_iter()
    }
}

/// Mahalanobis distance against a threshold. Stateless.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoringEngine {
    threshold: f64,
}

impl ScoringEngine {
    pub fn new(threshold: f64) -> Self {
        Self { threshold }
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// `(x − μ)ᵗ · C⁻¹ · (x − μ)`, floored at zero against rounding.
    pub fn mahalanobis(x: &DVector<f64>, mean: &DVector<f64>, inverse: &DMatrix<f64>) -> f64 {
        let d = x - mean;
        d.dot(&(inverse * &d)).max(0.0)
    }

    /// Strictly greater than the threshold.
    pub fn is_outlier(&self, score: f64) -> bool {
        score > self.threshold
    }

    pub fn score_row(
        &self,
        x: &DVector<f64>,
        mean: &DVector<f64>,
        inverse: Option<&DMatrix<f64>>,
    ) -> RowScore {
        let score = inverse.map(|inverse| Self::mahalanobis(x, mean, inverse));
        RowScore {
            projection: x.iter().copied().collect(),
            score,
            is_outlier: score.is_some_and(|s| self.is_outlier(s)),
        }
    }

    pub fn score_batch(
        &self,
        projected: &[DVector<f64>],
        means: &[DVector<f64>],
        inverses: &[Option<DMatrix<f64>>],
    ) -> BatchResult {
        let rows = projected
            .iter()
            .zip(means)
            .zip(inverses)
            .map(|((x, mean), inverse)| self.score_row(x, mean, inverse.as_ref()))
            .collect();
        BatchResult { rows }
    }
}
