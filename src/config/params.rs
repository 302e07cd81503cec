use schemars::{JsonSchema, Schema, schema_for};
use serde::{Deserialize, Serialize};

use crate::config::error::BuildError;
use crate::core::error::DetectorError;
use crate::detectors::MahalanobisDetector;

fn default_n_components() -> usize {
    3
}
fn default_std_clip() -> f64 {
    3.0
}
fn default_start_clip() -> u64 {
    100
}

/// Hyperparameters of a [`MahalanobisDetector`]. Immutable once the detector
/// is built.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct MahalanobisParams {
    #[schemars(
        title = "Threshold",
        description = "Scores strictly above this value are labeled outliers."
    )]
    pub threshold: f64,

    #[serde(default = "default_n_components")]
    #[schemars(
        title = "Principal components",
        description = "Number of top principal components scores are computed in. Clamped to the feature count."
    )]
    pub n_components: usize,

    #[serde(default = "default_std_clip")]
    #[schemars(
        title = "Clip width",
        description = "Features are clipped to mean ± std_clip standard deviations once clipping starts."
    )]
    pub std_clip: f64,

    #[serde(default = "default_start_clip")]
    #[schemars(
        title = "Clipping warm-up",
        description = "Number of observations absorbed before clipping is applied."
    )]
    pub start_clip: u64,

    #[serde(default)]
    #[schemars(
        title = "Effective sample cap",
        description = "When set, the count used to weight updates never exceeds this value, so recent batches keep a fixed share of the estimate."
    )]
    pub max_n: Option<u64>,
}

impl MahalanobisParams {
    pub fn new(threshold: f64) -> Self {
        Self {
            threshold,
            n_components: default_n_components(),
            std_clip: default_std_clip(),
            start_clip: default_start_clip(),
            max_n: None,
        }
    }

    pub fn with_components(mut self, n_components: usize) -> Self {
        self.n_components = n_components;
        self
    }

    pub fn with_clipping(mut self, std_clip: f64, start_clip: u64) -> Self {
        self.std_clip = std_clip;
        self.start_clip = start_clip;
        self
    }

    pub fn with_max_n(mut self, max_n: Option<u64>) -> Self {
        self.max_n = max_n;
        self
    }

    pub fn from_json(raw: &str) -> Result<Self, BuildError> {
        Ok(serde_json::from_str(raw)?)
    }

    pub fn to_json(&self) -> Result<String, BuildError> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn validate(&self) -> Result<(), DetectorError> {
        if !self.threshold.is_finite() {
            return Err(DetectorError::Configuration(
                "threshold must be finite".into(),
            ));
        }
        if self.n_components == 0 {
            return Err(DetectorError::Configuration(
                "n_components must be >= 1".into(),
            ));
        }
        if !(self.std_clip.is_finite() && self.std_clip > 0.0) {
            return Err(DetectorError::Configuration(
                "std_clip must be a positive finite number".into(),
            ));
        }
        if self.max_n == Some(0) {
            return Err(DetectorError::Configuration(
                "max_n must be unset or >= 1".into(),
            ));
        }
        Ok(())
    }

    pub fn build(self) -> Result<MahalanobisDetector, BuildError> {
        Ok(MahalanobisDetector::configure(self)?)
    }
}

/// JSON schema of [`MahalanobisParams`], for callers that validate or render
/// detector settings.
pub fn params_schema() -> Schema {
    schema_for!(MahalanobisParams)
}
