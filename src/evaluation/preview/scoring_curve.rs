use std::fs::File;
use std::io::{BufWriter, Error, Write};
use std::path::Path;

use crate::evaluation::Snapshot;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CurveFormat {
    Csv,
    Tsv,
    Json,
}

/// Metrics sampled over the lifetime of a scoring run.
#[derive(Debug, Clone, Default)]
pub struct ScoringCurve {
    entries: Vec<Snapshot>,
}

impl ScoringCurve {
    pub fn push(&mut self, snapshot: Snapshot) {
        self.entries.push(snapshot)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn latest(&self) -> Option<Snapshot> {
        self.entries.last().copied()
    }

    pub fn entries(&self) -> &[Snapshot] {
        &self.entries
    }

    pub fn export<P: AsRef<Path>>(&self, path: P, fmt: CurveFormat) -> Result<(), Error> {
        match fmt {
            CurveFormat::Csv => self.export_with_delimiter(path, ','),
            CurveFormat::Tsv => self.export_with_delimiter(path, '\t'),
            CurveFormat::Json => self.export_json(path),
        }
    }

    fn export_with_delimiter<P: AsRef<Path>>(&self, path: P, delimiter: char) -> Result<(), Error> {
        let mut w = BufWriter::new(File::create(path)?);
        writeln!(
            w,
            "instances_seen{d}coverage{d}mean_score{d}outlier_rate{d}precision{d}recall{d}seconds",
            d = delimiter
        )?;
        for s in &self.entries {
            writeln!(
                w,
                "{}{d}{:.6}{d}{:.6}{d}{:.6}{d}{:.6}{d}{:.6}{d}{:.3}",
                s.instances_seen,
                s.coverage,
                s.mean_score,
                s.outlier_rate,
                s.precision,
                s.recall,
                s.seconds,
                d = delimiter
            )?;
        }
        w.flush()
    }

    fn export_json<P: AsRef<Path>>(&self, path: P) -> Result<(), Error> {
        let mut w = BufWriter::new(File::create(path)?);
        serde_json::to_writer_pretty(&mut w, &self.entries)?;
        writeln!(w)?;
        w.flush()
    }
}
