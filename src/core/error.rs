use thiserror::Error;

/// Failures surfaced by the detector.
///
/// Configuration and dimension errors are raised before any state is
/// touched. Numerical errors (`NonFinite`, `Eigen`) abort the whole batch,
/// so a failed call never leaves a partially absorbed batch behind.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DetectorError {
    #[error("invalid configuration: {0}")]
    Configuration(String),

    #[error("dimension mismatch at row {row}: expected {expected} features, found {found}")]
    DimensionMismatch {
        expected: usize,
        found: usize,
        row: usize,
    },

    #[error("observation at row {row} has no features")]
    EmptyObservation { row: usize },

    #[error("non-finite value in {what}")]
    NonFinite { what: String },

    #[error("eigendecomposition failed: {0}")]
    Eigen(String),

    #[error("invalid snapshot: {0}")]
    InvalidSnapshot(String),
}

impl DetectorError {
    /// True for the numerical failure class (non-finite data or a failed
    /// decomposition), as opposed to caller contract violations.
    pub fn is_numerical(&self) -> bool {
        matches!(self, Self::NonFinite { .. } | Self::Eigen(_))
    }
}
