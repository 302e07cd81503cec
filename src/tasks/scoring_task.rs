use std::io::{Error, ErrorKind};
use std::sync::mpsc::Sender;
use std::time::Instant;

use tracing::debug;

use crate::core::error::DetectorError;
use crate::detectors::MahalanobisDetector;
use crate::evaluation::{OutlierEvaluator, OutlierEvaluatorExt, ScoringCurve, Snapshot};
use crate::streams::Stream;

/// Drives a detector over a stream: pull a batch, score it, feed the verdicts
/// to the evaluator, sample the metrics every `sample_frequency` rows.
pub struct ScoringTask {
    detector: MahalanobisDetector,
    stream: Box<dyn Stream>,
    evaluator: Box<dyn OutlierEvaluator>,

    curve: ScoringCurve,

    batch_size: usize,
    max_instances: Option<u64>,
    sample_frequency: u64,

    processed: u64,
    start_time: Instant,

    progress_tx: Option<Sender<Snapshot>>,
}

impl ScoringTask {
    pub fn new(
        detector: MahalanobisDetector,
        stream: Box<dyn Stream>,
        evaluator: Box<dyn OutlierEvaluator>,
        batch_size: usize,
        max_instances: Option<u64>,
        sample_frequency: u64,
    ) -> Result<Self, Error> {
        if batch_size == 0 {
            return Err(Error::new(ErrorKind::InvalidInput, "batch_size must be > 0"));
        }
        if sample_frequency == 0 {
            return Err(Error::new(
                ErrorKind::InvalidInput,
                "sample_frequency must be > 0",
            ));
        }
        if let Some(p) = detector.dimensions() {
            if p != stream.dimensions() {
                return Err(Error::new(
                    ErrorKind::InvalidInput,
                    "stream width differs from the detector's",
                ));
            }
        }

        Ok(Self {
            detector,
            stream,
            evaluator,
            curve: ScoringCurve::default(),
            batch_size,
            max_instances,
            sample_frequency,
            processed: 0,
            start_time: Instant::now(),
            progress_tx: None,
        })
    }

    pub fn with_progress(mut self, tx: Sender<Snapshot>) -> Self {
        self.progress_tx = Some(tx);
        self
    }

    /// Runs until the stream or `max_instances` is exhausted. A detector
    /// error stops the run; rows scored so far stay in the curve.
    pub fn run(&mut self) -> Result<(), DetectorError> {
        self.start_time = Instant::now();

        while self.stream.has_more_instances() {
            let mut size = self.batch_size;
            if let Some(max) = self.max_instances {
                let left = max.saturating_sub(self.processed);
                if left == 0 {
                    break;
                }
                size = size.min(usize::try_from(left).unwrap_or(usize::MAX));
            }

            let batch = self.stream.next_batch(size);
            if batch.is_empty() {
                break;
            }

            let result = self.detector.process(&batch)?;
            for (observation, row) in batch.iter().zip(result.iter()) {
                self.evaluator.add_result(observation, row);
            }

            let before = self.processed;
            self.processed += batch.len() as u64;
            if self.processed / self.sample_frequency > before / self.sample_frequency {
                self.push_snapshot();
            }
        }

        self.push_snapshot();
        debug!(processed = self.processed, samples = self.curve.len(), "scoring run finished");
        Ok(())
    }

    pub fn curve(&self) -> &ScoringCurve {
        &self.curve
    }

    pub fn detector(&self) -> &MahalanobisDetector {
        &self.detector
    }

    pub fn into_detector(self) -> MahalanobisDetector {
        self.detector
    }

    fn push_snapshot(&mut self) {
        let metric = |name| self.evaluator.metric(name).unwrap_or(f64::NAN);
        let snapshot = Snapshot {
            instances_seen: self.processed,
            coverage: metric("coverage"),
            mean_score: metric("mean_score"),
            outlier_rate: metric("outlier_rate"),
            precision: metric("precision"),
            recall: metric("recall"),
            seconds: self.start_time.elapsed().as_secs_f64(),
        };

        if let Some(tx) = &self.progress_tx {
            let _ = tx.send(snapshot);
        }
        self.curve.push(snapshot);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evaluation::{BasicOutlierEvaluator, MeanEstimator};
    use crate::streams::generators::GaussianGenerator;
    use crate::testing::VecStream;
    use std::sync::mpsc;

    fn evaluator() -> Box<dyn OutlierEvaluator> {
        Box::new(BasicOutlierEvaluator::<MeanEstimator>::new())
    }

    fn detector() -> MahalanobisDetector {
        MahalanobisDetector::new(25.0, 2, 3.0, 100, None).unwrap()
    }

    #[test]
    fn ctor_guards() {
        let s: Box<dyn Stream> = Box::new(GaussianGenerator::standard(2, Some(10), 1).unwrap());
        let err = ScoringTask::new(detector(), s, evaluator(), 0, None, 5)
            .err()
            .unwrap();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);

        let s: Box<dyn Stream> = Box::new(GaussianGenerator::standard(2, Some(10), 1).unwrap());
        let err = ScoringTask::new(detector(), s, evaluator(), 5, None, 0)
            .err()
            .unwrap();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);

        let mut warmed = detector();
        warmed.process(&[vec![0.0, 1.0, 2.0]]).unwrap();
        let s: Box<dyn Stream> = Box::new(GaussianGenerator::standard(2, Some(10), 1).unwrap());
        let err = ScoringTask::new(warmed, s, evaluator(), 5, None, 5)
            .err()
            .unwrap();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
    }

    #[test]
    fn periodic_and_final_snapshots() {
        let s: Box<dyn Stream> = Box::new(GaussianGenerator::standard(2, Some(1000), 3).unwrap());
        let mut task = ScoringTask::new(detector(), s, evaluator(), 50, None, 100).unwrap();
        task.run().unwrap();

        assert_eq!(task.curve().len(), 11);
        let last = task.curve().latest().unwrap();
        assert_eq!(last.instances_seen, 1000);
        assert!(last.coverage > 0.99 && last.coverage < 1.0);
        assert!(last.mean_score.is_finite() && last.mean_score > 1.5, "{last}");
        assert!(last.outlier_rate < 0.02, "{last}");
        assert_eq!(task.detector().observation_count(), 1000);
    }

    #[test]
    fn stops_at_max_instances_mid_batch() {
        let s: Box<dyn Stream> = Box::new(GaussianGenerator::standard(2, None, 5).unwrap());
        let mut task = ScoringTask::new(detector(), s, evaluator(), 20, Some(55), 10).unwrap();
        task.run().unwrap();

        assert_eq!(task.curve().latest().unwrap().instances_seen, 55);
        assert_eq!(task.into_detector().observation_count(), 55);
    }

    #[test]
    fn injected_anomalies_are_recalled() {
        let stream = GaussianGenerator::standard(3, Some(3000), 8)
            .unwrap()
            .with_anomalies(2, 12.0)
            .unwrap();
        let detector = MahalanobisDetector::new(16.0, 3, 3.0, 200, None).unwrap();
        let mut task =
            ScoringTask::new(detector, Box::new(stream), evaluator(), 100, None, 1000).unwrap();
        task.run().unwrap();

        let last = task.curve().latest().unwrap();
        assert!(last.recall > 0.9, "{last}");
        assert!(last.precision > 0.5, "{last}");
    }

    #[test]
    fn progress_channel_receives_every_snapshot() {
        let (tx, rx) = mpsc::channel();
        let s: Box<dyn Stream> = Box::new(VecStream::new(vec![vec![1.0, 0.0]; 12]));
        let mut task = ScoringTask::new(detector(), s, evaluator(), 4, None, 5)
            .unwrap()
            .with_progress(tx);
        task.run().unwrap();
        drop(task);

        let seen: Vec<u64> = rx.iter().map(|s| s.instances_seen).collect();
        assert_eq!(seen, vec![8, 12, 12]);
    }

    #[test]
    fn detector_errors_stop_the_run() {
        let rows = vec![vec![1.0, 0.0], vec![0.0, 1.0], vec![f64::NAN, 0.0]];
        let s: Box<dyn Stream> = Box::new(VecStream::new(rows));
        let mut task = ScoringTask::new(detector(), s, evaluator(), 2, None, 10).unwrap();
        let err = task.run().unwrap_err();
        assert!(err.is_numerical());
        assert_eq!(task.detector().observation_count(), 2);
    }
}
