//! Symmetric eigendecomposition.
//!
//! Wrapper around faer's self-adjoint eigensolver. The evolution-strategy
//! optimizer decomposes its covariance matrix C = B diag(D^2) B' once per
//! generation.

use crate::dense::DenseMatrix;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LinalgError {
    #[error("Dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch { expected: usize, got: usize },

    #[error("Matrix contains non-finite entries")]
    NonFinite,
}

/// Eigenpairs of a symmetric matrix.
#[derive(Debug, Clone)]
pub struct SymmetricEigen {
    /// Eigenvalues in ascending order.
    pub values: Vec<f64>,
    /// Eigenvectors stored column-wise, matching `values`.
    pub vectors: DenseMatrix,
}

impl SymmetricEigen {
    /// Decompose a symmetric matrix, reading only its lower triangle.
    pub fn new(a: &DenseMatrix) -> Result<Self, LinalgError> {
        let n = a.nrows();
        if n != a.ncols() {
            return Err(LinalgError::DimensionMismatch {
                expected: n,
                got: a.ncols(),
            });
        }
        if !a.is_finite() {
            return Err(LinalgError::NonFinite);
        }

        let eig = a.as_faer().selfadjoint_eigendecomposition(faer::Side::Lower);
        let s = eig.s();
        let values: Vec<f64> = (0..n).map(|i| s.column_vector().read(i)).collect();
        let u = eig.u();
        let vectors = DenseMatrix::from_faer(faer::Mat::from_fn(n, n, |i, j| u.read(i, j)));

        Ok(Self { values, vectors })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_eigenvalues() {
        // [[2, 1], [1, 2]] has eigenvalues 3 and 1
        let a = DenseMatrix::from_row_major(2, 2, &[2.0, 1.0, 1.0, 2.0]);
        let eig = SymmetricEigen::new(&a).unwrap();
        // ascending
        assert!((eig.values[0] - 1.0).abs() < 1e-10);
        assert!((eig.values[1] - 3.0).abs() < 1e-10);
    }

    #[test]
    fn test_reconstruction() {
        let a = DenseMatrix::from_row_major(
            3,
            3,
            &[4.0, 1.0, 0.5, 1.0, 3.0, 0.2, 0.5, 0.2, 2.0],
        );
        let eig = SymmetricEigen::new(&a).unwrap();
        // B diag(values) B' should give back A
        for i in 0..3 {
            for j in 0..3 {
                let mut s = 0.0;
                for k in 0..3 {
                    s += eig.vectors.get(i, k) * eig.values[k] * eig.vectors.get(j, k);
                }
                assert!((s - a.get(i, j)).abs() < 1e-10, "mismatch at ({i}, {j})");
            }
        }
        assert!(eig.values.windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn test_identity_eigen() {
        let eig = SymmetricEigen::new(&DenseMatrix::identity(4)).unwrap();
        assert!(eig.values.iter().all(|&v| (v - 1.0).abs() < 1e-12));
    }

    #[test]
    fn test_non_square() {
        let a = DenseMatrix::zeros(2, 3);
        assert!(matches!(
            SymmetricEigen::new(&a),
            Err(LinalgError::DimensionMismatch { expected: 2, got: 3 })
        ));
    }

    #[test]
    fn test_non_finite() {
        let mut a = DenseMatrix::identity(2);
        a.set(1, 1, f64::NAN);
        assert!(matches!(SymmetricEigen::new(&a), Err(LinalgError::NonFinite)));
    }
}
