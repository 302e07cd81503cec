use crate::core::error::DetectorError;

/// One feature vector drawn from a stream.
///
/// `is_anomaly` carries ground truth when the source knows it (synthetic
/// generators do); it is never read by the detector itself.
#[derive(Debug, Clone, PartialEq)]
pub struct Observation {
    pub values: Vec<f64>,
    pub is_anomaly: Option<bool>,
}

impl Observation {
    pub fn new(values: Vec<f64>) -> Self {
        Self {
            values,
            is_anomaly: None,
        }
    }

    pub fn labeled(values: Vec<f64>, is_anomaly: bool) -> Self {
        Self {
            values,
            is_anomaly: Some(is_anomaly),
        }
    }

    pub fn dimensions(&self) -> usize {
        self.values.len()
    }
}

impl AsRef<[f64]> for Observation {
    fn as_ref(&self) -> &[f64] {
        &self.values
    }
}

impl From<Vec<f64>> for Observation {
    fn from(values: Vec<f64>) -> Self {
        Self::new(values)
    }
}

/// Checks that every row of `batch` has the same, non-zero width and only
/// finite values. When `expected` is set, the width must match it.
///
/// Returns the batch width, or `None` for an empty batch.
pub fn validate_batch<R: AsRef<[f64]>>(
    batch: &[R],
    expected: Option<usize>,
) -> Result<Option<usize>, DetectorError> {
    let Some(first) = batch.first() else {
        return Ok(None);
    };
    let width = expected.unwrap_or(first.as_ref().len());

    for (row, values) in batch.iter().enumerate() {
        let values = values.as_ref();
        if values.is_empty() {
            return Err(DetectorError::EmptyObservation { row });
        }
        if values.len() != width {
            return Err(DetectorError::DimensionMismatch {
                expected: width,
                found: values.len(),
                row,
            });
        }
        if let Some(col) = values.iter().position(|v| !v.is_finite()) {
            return Err(DetectorError::NonFinite {
                what: format!("observation row {row}, feature {col}"),
            });
        }
    }

    Ok(Some(width))
}
