use std::fmt::{Display, Formatter, Result};

/// Named scalar metric produced by an evaluator, e.g. `"mean_score"`.
#[derive(Debug, Clone, PartialEq)]
pub struct Measurement {
    pub name: &'static str,
    pub value: f64,
}

impl Measurement {
    #[inline]
    pub fn new(name: &'static str, value: f64) -> Self {
        Self { name, value }
    }
}

impl Display for Measurement {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        write!(f, "{}={:.6}", self.name, self.value)
    }
}
