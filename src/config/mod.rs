mod error;
mod params;

pub use error::BuildError;
pub use params::{MahalanobisParams, params_schema};
