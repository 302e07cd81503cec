use std::fmt::{Display, Formatter, Result};

use serde::Serialize;

#[derive(Debug, Copy, Clone, PartialEq, Serialize)]
pub struct Snapshot {
    pub instances_seen: u64,
    pub coverage: f64,
    pub mean_score: f64,
    pub outlier_rate: f64,
    pub precision: f64,
    pub recall: f64,
    pub seconds: f64,
}

impl Display for Snapshot {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        write!(
            f,
            "seen={}, coverage={:.4}, score={:.4}, outliers={:.4}, precision={:.4}, recall={:.4}, t={:.3}s",
            self.instances_seen,
            self.coverage,
            self.mean_score,
            self.outlier_rate,
            self.precision,
            self.recall,
            self.seconds
        )
    }
}
