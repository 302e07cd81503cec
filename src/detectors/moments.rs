use nalgebra::{DMatrix, DVector};

/// Result of absorbing one batch into the running moments.
#[derive(Debug, Clone)]
pub struct MomentUpdate {
    /// Mean after every row of the batch.
    pub mean: DVector<f64>,
    /// Sample covariance after every row of the batch.
    pub covariance: DMatrix<f64>,
    /// `means_before[i]` is the running mean just before row `i` was absorbed.
    pub means_before: Vec<DVector<f64>>,
}

/// Incremental mean/covariance over a batch of (already clipped) rows.
///
/// The tracker only sees the pre-batch moments and the effective count `n`;
/// it never revisits history, so a batch costs `O(b·p²)`. The blended mean
/// comes from prefix sums over the batch:
///
/// `mean_{n+i+1} = mean_n + (i+1)/(n+i+1) · (local_mean_i − mean_n)`
///
/// and the covariance adds one rank-one scatter term per row, built from the
/// deviation against the mean just before that row:
///
/// `C_{n+b} = ((n−1)·C_n + Σ (n+i)/(n+i+1) · d_i d_iᵗ) / max(1, n+b−1)`
///
/// The result does not depend on how the stream is split into batches.
pub struct MomentTracker<'a> {
    mean: &'a DVector<f64>,
    covariance: &'a DMatrix<f64>,
    n: u64,
}

impl<'a> MomentTracker<'a> {
    pub fn new(mean: &'a DVector<f64>, covariance: &'a DMatrix<f64>, n: u64) -> Self {
        Self {
            mean,
            covariance,
            n,
        }
    }

    pub fn absorb(&self, batch: &[DVector<f64>]) -> MomentUpdate {
        let p = self.mean.len();
        let n = self.n as f64;

        let mut prefix = DVector::zeros(p);
        let mut scatter = DMatrix::zeros(p, p);
        let mut current = self.mean.clone();
        let mut means_before = Vec::with_capacity(batch.len());

        for (i, x) in batch.iter().enumerate() {
            let seen = n + i as f64;
            let deviation = x - &current;
            add_scaled_outer(&mut scatter, &deviation, seen / (seen + 1.0));
            means_before.push(current);

            prefix += x;
            let rows = i as f64 + 1.0;
            let local_mean = &prefix / rows;
            current = self.mean + (local_mean - self.mean) * (rows / (seen + 1.0));
        }

        let denominator = (n + batch.len() as f64 - 1.0).max(1.0);
        let covariance = self.covariance * ((n - 1.0).max(0.0) / denominator) + scatter / denominator;

        MomentUpdate {
            mean: current,
            covariance,
            means_before,
        }
    }
}

/// `target += weight · v vᵗ`, writing both triangles from one product so a
/// symmetric `target` stays exactly symmetric.
pub(crate) fn add_scaled_outer(target: &mut DMatrix<f64>, v: &DVector<f64>, weight: f64) {
    for r in 0..v.len() {
        for c in 0..=r {
            let value = weight * (v[r] * v[c]);
            target[(r, c)] += value;
            if r != c {
                target[(c, r)] += value;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn sample_rows(count: usize, p: usize, seed: u64) -> Vec<DVector<f64>> {
        let mut rng = StdRng::seed_from_u64(seed);
        (0..count)
            .map(|_| DVector::from_fn(p, |j, _| rng.random_range(-3.0..3.0) + j as f64))
            .collect()
    }

    fn direct_moments(rows: &[DVector<f64>]) -> (DVector<f64>, DMatrix<f64>) {
        let p = rows[0].len();
        let count = rows.len() as f64;
        let mean = rows.iter().fold(DVector::zeros(p), |acc, r| acc + r) / count;
        let mut cov = DMatrix::zeros(p, p);
        for r in rows {
            let d = r - &mean;
            cov += &d * d.transpose();
        }
        (mean, cov / (count - 1.0))
    }

    fn feed(rows: &[DVector<f64>], chunk: usize) -> (DVector<f64>, DMatrix<f64>) {
        let p = rows[0].len();
        let mut mean = DVector::zeros(p);
        let mut cov = DMatrix::zeros(p, p);
        let mut n = 0u64;
        for batch in rows.chunks(chunk) {
            let update = MomentTracker::new(&mean, &cov, n).absorb(batch);
            mean = update.mean;
            cov = update.covariance;
            n += batch.len() as u64;
        }
        (mean, cov)
    }

    #[test]
    fn single_row_on_empty_state_has_zero_covariance() {
        let mean = DVector::zeros(2);
        let cov = DMatrix::zeros(2, 2);
        let row = DVector::from_vec(vec![3.0, -1.0]);
        let update = MomentTracker::new(&mean, &cov, 0).absorb(&[row.clone()]);
        assert_eq!(update.mean, row);
        assert_eq!(update.covariance, DMatrix::zeros(2, 2));
        assert_eq!(update.means_before, vec![DVector::zeros(2)]);
    }

    #[test]
    fn mean_one_at_a_time_matches_direct_mean() {
        let rows = sample_rows(500, 3, 11);
        let (mean, _) = feed(&rows, 1);
        let (expected, _) = direct_moments(&rows);
        assert_relative_eq!(mean, expected, epsilon = 1e-10);
    }

    #[test]
    fn covariance_matches_two_pass_estimate() {
        let rows = sample_rows(200, 4, 5);
        let (_, cov) = feed(&rows, 7);
        let (_, expected) = direct_moments(&rows);
        assert_relative_eq!(cov, expected, epsilon = 1e-9);
    }

    #[test]
    fn covariance_is_invariant_to_batching() {
        let rows = sample_rows(100, 3, 42);
        let (mean_a, cov_a) = feed(&rows, 100);
        let (mean_b, cov_b) = feed(&rows, 10);
        let (mean_c, cov_c) = feed(&rows, 1);
        assert_relative_eq!(cov_a, cov_b, epsilon = 1e-10);
        assert_relative_eq!(cov_a, cov_c, epsilon = 1e-10);
        assert_relative_eq!(mean_a, mean_b, epsilon = 1e-12);
        assert_relative_eq!(mean_a, mean_c, epsilon = 1e-12);
    }

    #[test]
    fn covariance_is_exactly_symmetric() {
        let rows = sample_rows(64, 5, 3);
        let (_, cov) = feed(&rows, 9);
        assert_eq!(cov, cov.transpose());
    }

    #[test]
    fn covariance_is_positive_semi_definite() {
        let rows = sample_rows(120, 4, 21);
        let (_, cov) = feed(&rows, 7);
        let smallest = nalgebra::SymmetricEigen::new(cov)
            .eigenvalues
            .iter()
            .copied()
            .fold(f64::INFINITY, f64::min);
        assert!(smallest >= -1e-12, "smallest eigenvalue {smallest}");

        let (_, pair) = feed(&rows[..2], 7);
        let smallest = nalgebra::SymmetricEigen::new(pair)
            .eigenvalues
            .iter()
            .copied()
            .fold(f64::INFINITY, f64::min);
        assert!(smallest >= -1e-12, "smallest eigenvalue {smallest}");
    }

    #[test]
    fn means_before_track_each_prefix() {
        let rows = sample_rows(6, 2, 9);
        let mean = DVector::zeros(2);
        let cov = DMatrix::zeros(2, 2);
        let update = MomentTracker::new(&mean, &cov, 0).absorb(&rows);

        assert_eq!(update.means_before.len(), rows.len());
        for i in 1..rows.len() {
            let (expected, _) = direct_moments(&rows[..i]);
            assert_relative_eq!(update.means_before[i], expected, epsilon = 1e-12);
        }
    }

    #[test]
    fn scaled_outer_writes_both_triangles() {
        let mut m = DMatrix::zeros(3, 3);
        let v = DVector::from_vec(vec![1.0, 2.0, -3.0]);
        add_scaled_outer(&mut m, &v, 0.5);
        assert_relative_eq!(m, (&v * v.transpose()) * 0.5, epsilon = 1e-15);
        assert_eq!(m, m.transpose());
    }
}
