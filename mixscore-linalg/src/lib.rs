//! mixscore-linalg: Linear algebra wrappers for mixscore
//!
//! Provides the small dense matrix type and the symmetric
//! eigendecomposition used by the covariance-adaptation search
//! in the likelihood optimizers.

pub mod dense;
pub mod decomposition;

pub use decomposition::{LinalgError, SymmetricEigen};
pub use dense::DenseMatrix;
