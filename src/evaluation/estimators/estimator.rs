/// Online scalar estimator (e.g., streaming mean).
///
/// Values arrive one at a time through [`add`]; [`estimation`] is the
/// current estimate, `NaN` before anything has been added.
pub trait Estimator {
    fn add(&mut self, v: f64);

    fn estimation(&self) -> f64;

    /// Number of values that contributed to the estimate.
    fn count(&self) -> u64;
}
