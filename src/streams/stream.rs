use crate::core::observation::Observation;
use std::io::Error;

/// Pull-based source of feature vectors.
///
/// Implementations may be finite (recorded data) or unbounded generators.
/// Every observation has the width reported by [`dimensions`] for the
/// lifetime of the stream.
pub trait Stream {
    /// Number of features per observation.
    fn dimensions(&self) -> usize;

    /// Whether the stream *may* produce more observations.
    ///
    /// Finite streams return `false` once exhausted, after which
    /// [`next_instance`] must return `None`.
    fn has_more_instances(&self) -> bool;

    /// Produces the next observation, or `None` when exhausted.
    fn next_instance(&mut self) -> Option<Observation>;

    /// Up to `size` observations; shorter only when the stream runs out.
    fn next_batch(&mut self, size: usize) -> Vec<Observation> {
        let mut batch = Vec::with_capacity(size);
        while batch.len() < size {
            let Some(observation) = self.next_instance() else {
                break;
            };
            batch.push(observation);
        }
        batch
    }

    /// Resets the stream to its initial state.
    ///
    /// Generators re-seed their RNG so the same sequence is produced again.
    fn restart(&mut self) -> Result<(), Error>;
}
