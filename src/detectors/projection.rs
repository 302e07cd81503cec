use nalgebra::{DMatrix, DVector, SymmetricEigen};

use crate::core::error::DetectorError;

/// Principal-component basis of a covariance matrix.
///
/// Columns of `basis` are the eigenvectors with the largest eigenvalues, in
/// descending eigenvalue order.
#[derive(Debug, Clone)]
pub struct SubspaceProjector {
    basis: DMatrix<f64>,
    eigenvalues: DVector<f64>,
}

impl SubspaceProjector {
    /// Top-`components` eigenvectors of `covariance`.
    ///
    /// `None` stands for an empty (all-zero) covariance, whose eigenbasis is
    /// the identity; the first `components` standard basis vectors are used.
    pub fn fit(covariance: Option<&DMatrix<f64>>, p: usize, components: usize) -> Result<Self, DetectorError> {
        let components = components.clamp(1, p.max(1));

        let Some(covariance) = covariance else {
            return Ok(Self {
                basis: DMatrix::identity(p, components),
                eigenvalues: DVector::zeros(components),
            });
        };

        if covariance.iter().any(|v| !v.is_finite()) {
            return Err(DetectorError::NonFinite {
                what: "covariance matrix".into(),
            });
        }

        let eigen = SymmetricEigen::try_new(covariance.clone(), f64::EPSILON, 0)
            .ok_or_else(|| DetectorError::Eigen("symmetric eigensolver did not converge".into()))?;

        let mut order: Vec<usize> = (0..eigen.eigenvalues.len()).collect();
        order.sort_by(|&a, &b| eigen.eigenvalues[b].total_cmp(&eigen.eigenvalues[a]));
        order.truncate(components);

        let columns: Vec<DVector<f64>> = order
            .iter()
            .map(|&i| eigen.eigenvectors.column(i).into_owned())
            .collect();

        Ok(Self {
            basis: DMatrix::from_columns(&columns),
            eigenvalues: DVector::from_iterator(
                order.len(),
                order.iter().map(|&i| eigen.eigenvalues[i]),
            ),
        })
    }

    pub fn components(&self) -> usize {
        self.basis.ncols()
    }

    pub fn basis(&self) -> &DMatrix<f64> {
        &self.basis
    }

    pub fn eigenvalues(&self) -> &DVector<f64> {
        &self.eigenvalues
    }

    pub fn project(&self, v: &DVector<f64>) -> DVector<f64> {
        self.basis.tr_mul(v)
    }

    pub fn project_all(&self, rows: &[DVector<f64>]) -> Vec<DVector<f64>> {
        rows.iter().map(|row| self.project(row)).collect()
    }

    /// `Vᵗ M V`, filled from the upper triangle so the result is exactly
    /// symmetric.
    pub fn project_matrix(&self, m: &DMatrix<f64>) -> DMatrix<f64> {
        let k = self.components();
        let mv = m * &self.basis;
        let mut out = DMatrix::zeros(k, k);
        for r in 0..k {
            for c in r..k {
                let value = self.basis.column(r).dot(&mv.column(c));
                out[(r, c)] = value;
                out[(c, r)] = value;
            }
        }
        out
    }
}
