//! Online Mahalanobis outlier scoring.
//!
//! A [`MahalanobisDetector`](detectors::MahalanobisDetector) consumes batches
//! of feature vectors, scores each row against the distribution estimated
//! from everything seen before it, and then folds the batch into that
//! estimate. Scores are computed in the subspace of the top principal
//! components and compared against a fixed threshold.
//!
//! ```
//! use mahalanobis_stream::config::MahalanobisParams;
//!
//! let mut detector = MahalanobisParams::new(9.0)
//!     .with_components(2)
//!     .build()
//!     .unwrap();
//!
//! let warmup: Vec<Vec<f64>> = (0..50)
//!     .map(|i| {
//!         let t = i as f64;
//!         vec![t.sin(), (1.7 * t).cos()]
//!     })
//!     .collect();
//! detector.process(&warmup).unwrap();
//!
//! let result = detector.process(&[vec![8.0, -8.0]]).unwrap();
//! assert!(result.rows[0].is_outlier);
//! ```

pub mod config;
pub mod core;
pub mod detectors;
pub mod evaluation;
pub mod streams;
pub mod tasks;

#[cfg(any(test, feature = "test-support"))]
pub mod testing;
