use nalgebra::{DMatrix, DVector};

use crate::detectors::moments::add_scaled_outer;

/// Below this absolute determinant the projected covariance is treated as
/// singular and not inverted.
pub const SINGULAR_DETERMINANT: f64 = 1e-8;

#[derive(Debug, Clone)]
enum InverseState {
    NoInverseYet,
    HaveInverse(DMatrix<f64>),
}

/// Inverse of the projected covariance, carried row by row through a batch.
///
/// Absorbing a row with deviation `d` (against the mean just before it) and
/// `m` prior observations moves the covariance to
///
/// `C' = ((m−1)/m)·C + d dᵗ/(m+1)`
///
/// which is a rescaled rank-one update, so the inverse follows from the
/// Sherman–Morrison identity in `O(k²)` instead of a fresh `O(k³)` inversion.
/// Until the covariance is well conditioned the rows are only folded into the
/// covariance, and a direct inversion is attempted after each one.
#[derive(Debug, Clone)]
pub struct IncrementalInverseCovariance {
    covariance: DMatrix<f64>,
    seen: u64,
    state: InverseState,
}

impl IncrementalInverseCovariance {
    /// Seeds the tracker with the projected covariance built from `seen`
    /// observations.
    pub fn new(covariance: DMatrix<f64>, seen: u64) -> Self {
        let state = match invert_if_regular(&covariance) {
            Some(inverse) => InverseState::HaveInverse(inverse),
            None => InverseState::NoInverseYet,
        };
        Self {
            covariance,
            seen,
            state,
        }
    }

    /// Inverse of the covariance as it stands before the next row, if it is
    /// invertible.
    pub fn current(&self) -> Option<&DMatrix<f64>> {
        match &self.state {
            InverseState::HaveInverse(inverse) => Some(inverse),
            InverseState::NoInverseYet => None,
        }
    }

    pub fn covariance(&self) -> &DMatrix<f64> {
        &self.covariance
    }

    /// Advances past one row whose deviation from the running mean is `deviation`.
    pub fn absorb(&mut self, deviation: &DVector<f64>) {
        let m = self.seen as f64;
        self.seen += 1;

        if self.seen == 1 {
            self.covariance = DMatrix::zeros(deviation.len(), deviation.len());
            self.state = InverseState::NoInverseYet;
            return;
        }

        let shrink = (m - 1.0) / m;
        let weight = 1.0 / (m + 1.0);
        let mut covariance = &self.covariance * shrink;
        add_scaled_outer(&mut covariance, deviation, weight);

        let previous = std::mem::replace(&mut self.state, InverseState::NoInverseYet);
        let updated = match previous {
            InverseState::HaveInverse(inverse) if m >= 2.0 => {
                sherman_morrison(&inverse, deviation, weight / shrink)
                    .map(|inverse| inverse * (m / (m - 1.0)))
            }
            _ => None,
        };

        self.state = match updated.or_else(|| invert_if_regular(&covariance)) {
            Some(inverse) => InverseState::HaveInverse(inverse),
            None => InverseState::NoInverseYet,
        };
        self.covariance = covariance;
    }

    /// For each row, the inverse in effect just before that row arrived.
    pub fn inverses(
        covariance: DMatrix<f64>,
        seen: u64,
        deviations: &[DVector<f64>],
    ) -> Vec<Option<DMatrix<f64>>> {
        let mut tracker = Self::new(covariance, seen);
        deviations
            .iter()
            .map(|deviation| {
                let inverse = tracker.current().cloned();
                tracker.absorb(deviation);
                inverse
            })
            .collect()
    }
}

fn invert_if_regular(m: &DMatrix<f64>) -> Option<DMatrix<f64>> {
    if m.nrows() == 0 || m.iter().any(|v| !v.is_finite()) {
        return None;
    }
    if m.determinant().abs() <= SINGULAR_DETERMINANT {
        return None;
    }
    let mut inverse = m.clone().try_inverse()?;
    // LU does not return a bitwise-symmetric inverse; average the triangles.
    for r in 0..inverse.nrows() {
        for c in (r + 1)..inverse.ncols() {
            let value = 0.5 * (inverse[(r, c)] + inverse[(c, r)]);
            inverse[(r, c)] = value;
            inverse[(c, r)] = value;
        }
    }
    Some(inverse)
}

/// `(A + c·u uᵗ)⁻¹` from `A⁻¹`, for symmetric `A`.
fn sherman_morrison(inverse: &DMatrix<f64>, u: &DVector<f64>, c: f64) -> Option<DMatrix<f64>> {
    let hu = inverse * u;
    let denominator = 1.0 + c * u.dot(&hu);
    if !denominator.is_finite() || denominator <= f64::EPSILON {
        return None;
    }
    let mut out = inverse.clone();
    add_scaled_outer(&mut out, &hu, -c / denominator);
    Some(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn deviations(count: usize, k: usize, seed: u64) -> Vec<DVector<f64>> {
        let mut rng = StdRng::seed_from_u64(seed);
        (0..count)
            .map(|_| DVector::from_fn(k, |_, _| rng.random_range(-2.0..2.0)))
            .collect()
    }

    fn covariance_sequence(
        start: &DMatrix<f64>,
        seen: u64,
        deviations: &[DVector<f64>],
    ) -> Vec<DMatrix<f64>> {
        let mut out = Vec::with_capacity(deviations.len());
        let mut cov = start.clone();
        for (i, d) in deviations.iter().enumerate() {
            out.push(cov.clone());
            let m = (seen + i as u64) as f64;
            cov = if m < 1.0 {
                DMatrix::zeros(d.len(), d.len())
            } else {
                &cov * ((m - 1.0) / m) + (d * d.transpose()) / (m + 1.0)
            };
        }
        out
    }

    #[test]
    fn rank_one_updates_match_direct_inversion() {
        let start = DMatrix::from_row_slice(3, 3, &[2.0, 0.3, 0.1, 0.3, 1.5, -0.2, 0.1, -0.2, 1.0]);
        let devs = deviations(40, 3, 17);
        let inverses = IncrementalInverseCovariance::inverses(start.clone(), 10, &devs);
        let expected = covariance_sequence(&start, 10, &devs);

        for (got, cov) in inverses.iter().zip(expected) {
            let direct = cov.try_inverse().unwrap();
            assert_relative_eq!(got.as_ref().unwrap(), &direct, epsilon = 1e-6);
        }
    }

    #[test]
    fn singular_start_defers_until_well_conditioned() {
        let devs = deviations(6, 2, 3);
        let inverses = IncrementalInverseCovariance::inverses(DMatrix::zeros(2, 2), 0, &devs);
        let expected = covariance_sequence(&DMatrix::zeros(2, 2), 0, &devs);

        assert!(inverses[0].is_none());
        assert!(inverses[1].is_none());
        assert!(inverses[2].is_none());
        for (got, cov) in inverses.iter().zip(expected).skip(3) {
            let direct = cov.try_inverse().unwrap();
            assert_relative_eq!(got.as_ref().unwrap(), &direct, epsilon = 1e-6);
        }
    }

    #[test]
    fn seed_is_inverted_when_regular() {
        let tracker = IncrementalInverseCovariance::new(DMatrix::identity(2, 2) * 4.0, 5);
        assert_relative_eq!(
            tracker.current().unwrap(),
            &(DMatrix::identity(2, 2) * 0.25),
            epsilon = 1e-12
        );
    }

    #[test]
    fn near_singular_seed_is_not_inverted() {
        let tiny = DMatrix::identity(2, 2) * 1e-5;
        let tracker = IncrementalInverseCovariance::new(tiny, 5);
        assert!(tracker.current().is_none());
    }

    #[test]
    fn inverse_stays_symmetric() {
        let start = DMatrix::from_row_slice(2, 2, &[1.0, 0.4, 0.4, 2.0]);
        let mut tracker = IncrementalInverseCovariance::new(start, 20);
        for d in deviations(25, 2, 8) {
            tracker.absorb(&d);
        }
        let inverse = tracker.current().unwrap();
        assert_eq!(inverse, &inverse.transpose());
        assert_eq!(tracker.covariance(), &tracker.covariance().transpose());
    }
}
