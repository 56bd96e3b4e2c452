// ==============================================================================
// engine/cholesky.rs - Cross-Product Factorization
// ==============================================================================
// Description: Cholesky (LLT) factor of XᵀX / XᵀWX for solves and covariances
// Author: Matt Barham
// Created: 2026-09-19
// Modified: 2026-10-18
// Version: 2.0.0
// ==============================================================================

use faer::linalg::solvers::{Llt, Solve};
use faer::{Mat, Side};
use ndarray::{Array1, Array2};

use super::EngineError;

/// Squared pivot, relative to the largest diagonal entry, below which the
/// matrix is treated as singular
const SINGULAR_TOLERANCE: f64 = 1e-12;

/// Cholesky factor of a symmetric positive definite p x p matrix
pub struct CrossProductFactor {
    llt: Llt<f64>,
    dim: usize,
}

impl CrossProductFactor {
    pub fn new(matrix: &Array2<f64>) -> Result<Self, EngineError> {
        let dim = matrix.nrows();
        if dim != matrix.ncols() {
            return Err(EngineError::InvalidConfig(format!(
                "cannot factor a {}x{} matrix",
                dim,
                matrix.ncols()
            )));
        }

        let scale = matrix.diag().iter().fold(0.0_f64, |acc, v| acc.max(v.abs()));
        if scale == 0.0 || !scale.is_finite() {
            return Err(EngineError::SingularMatrix);
        }

        let m = Mat::<f64>::from_fn(dim, dim, |i, j| matrix[[i, j]]);
        let llt = Llt::new(m.as_ref(), Side::Lower).map_err(|_| EngineError::SingularMatrix)?;

        // Rank-deficient inputs can still factor through rounding
        let l = llt.L();
        for i in 0..dim {
            let pivot = l[(i, i)];
            if pivot.is_nan() || pivot * pivot <= SINGULAR_TOLERANCE * scale {
                return Err(EngineError::SingularMatrix);
            }
        }

        Ok(Self { llt, dim })
    }

    /// Solve `A x = rhs`
    pub fn solve(&self, rhs: &Array1<f64>) -> Array1<f64> {
        let rf = Mat::<f64>::from_fn(self.dim, 1, |i, _| rhs[i]);
        let sol = self.llt.solve(rf.as_ref());
        Array1::from_iter((0..self.dim).map(|i| sol[(i, 0)]))
    }

    /// `A⁻¹`, obtained by solving against the identity
    pub fn inverse(&self) -> Array2<f64> {
        let identity = Mat::<f64>::from_fn(self.dim, self.dim, |i, j| if i == j { 1.0 } else { 0.0 });
        let sol = self.llt.solve(identity.as_ref());
        Array2::from_shape_fn((self.dim, self.dim), |(i, j)| sol[(i, j)])
    }
}
