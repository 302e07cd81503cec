mod estimators;
mod evaluators;
mod measurement;
mod preview;

pub use estimators::{Estimator, MeanEstimator};
pub use evaluators::{BasicOutlierEvaluator, OutlierEvaluator, OutlierEvaluatorExt};
pub use measurement::Measurement;
pub use preview::{CurveFormat, ScoringCurve, Snapshot};
