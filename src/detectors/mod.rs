pub mod clipping;
pub mod inverse;
pub mod mahalanobis;
pub mod moments;
pub mod projection;
pub mod scoring;
pub mod shared;
pub mod snapshot;

pub use clipping::ClippingPolicy;
pub use inverse::IncrementalInverseCovariance;
pub use mahalanobis::MahalanobisDetector;
pub use moments::{MomentTracker, MomentUpdate};
pub use projection::SubspaceProjector;
pub use scoring::{BatchResult, RowScore, ScoringEngine};
pub use shared::SharedDetector;
pub use snapshot::{DetectorSnapshot, SnapshotBounds};
