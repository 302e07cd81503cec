use thiserror::Error;

use crate::core::error::DetectorError;

#[derive(Debug, Error)]
pub enum BuildError {
    #[error(transparent)]
    Detector(#[from] DetectorError),

    #[error("malformed parameters: {0}")]
    Json(#[from] serde_json::Error),
}
