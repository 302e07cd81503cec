mod basic_outlier_evaluator;
mod outlier_evaluator;

pub use basic_outlier_evaluator::BasicOutlierEvaluator;
pub use outlier_evaluator::{OutlierEvaluator, OutlierEvaluatorExt};
