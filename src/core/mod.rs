pub mod error;
pub mod observation;
pub mod state;

pub use error::DetectorError;
pub use observation::{Observation, validate_batch};
pub use state::{ClipBounds, DetectorPhase, EstimatorState, Statistics};
