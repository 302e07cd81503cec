use crate::core::observation::Observation;
use crate::streams::Stream;
use std::io::Error;

/// Finite stream over fixed rows, unlabeled.
pub struct VecStream {
    rows: Vec<Vec<f64>>,
    idx: usize,
}

impl VecStream {
    pub fn new(rows: Vec<Vec<f64>>) -> Self {
        Self { rows, idx: 0 }
    }
}

impl Stream for VecStream {
    fn dimensions(&self) -> usize {
        self.rows.first().map_or(0, Vec::len)
    }

    fn has_more_instances(&self) -> bool {
        self.idx < self.rows.len()
    }

    fn next_instance(&mut self) -> Option<Observation> {
        let row = self.rows.get(self.idx)?.clone();
        self.idx += 1;
        Some(Observation::new(row))
    }

    fn restart(&mut self) -> Result<(), Error> {
        self.idx = 0;
        Ok(())
    }
}
