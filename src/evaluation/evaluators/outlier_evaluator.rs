use std::collections::HashMap;

use crate::core::observation::Observation;
use crate::detectors::RowScore;
use crate::evaluation::Measurement;

/// Online evaluator of detector output.
///
/// Consumes each observation together with the detector's verdict on it and
/// exposes aggregated metrics via [`performance`].
pub trait OutlierEvaluator {
    /// Clears accumulated metrics.
    fn reset(&mut self);

    /// Feeds one observation and its score. Rows without a defined score
    /// only count towards coverage.
    fn add_result(&mut self, example: &Observation, result: &RowScore);

    /// Current metrics.
    fn performance(&self) -> Vec<Measurement>;
}

pub trait OutlierEvaluatorExt {
    /// Returns `(name, Some(value)|None)` for each requested metric, in order.
    fn metrics<'a, I>(&self, names: I) -> Vec<(String, Option<f64>)>
    where
        I: IntoIterator<Item = &'a str>;

    fn metric(&self, name: &str) -> Option<f64> {
        self.metrics([name]).into_iter().next().and_then(|(_, v)| v)
    }
}

impl<T: OutlierEvaluator + ?Sized> OutlierEvaluatorExt for T {
    fn metrics<'a, I>(&self, names: I) -> Vec<(String, Option<f64>)>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let map: HashMap<_, _> = self
            .performance()
            .into_iter()
            .map(|m| (m.name, m.value))
            .collect();
        names
            .into_iter()
            .map(|n| (n.to_string(), map.get(n).copied()))
            .collect()
    }
}
