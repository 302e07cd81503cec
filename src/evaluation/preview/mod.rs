mod scoring_curve;
mod snapshot;

pub use scoring_curve::{CurveFormat, ScoringCurve};
pub use snapshot::Snapshot;
