//! Direct linear solvers.
//!
//! Dense inversion for the small projected systems (deflation Gram matrices) and a
//! cached sparse LU used to apply preconditioner inverses.

use faer::prelude::*;
use faer::sparse::linalg::solvers::Lu;
use nalgebra::DMatrix;
use num_complex::Complex64 as C64;

use crate::error::{Error, Result};
use crate::operator::ComplexOperator;
use crate::sparse_operator::SparseOperator;

/// Inverse of a small dense matrix. An empty matrix is its own inverse.
pub fn invert_dense(a: &DMatrix<C64>) -> Result<DMatrix<C64>> {
    if a.nrows() != a.ncols() {
        return Err(Error::DimensionMismatch {
            expected: a.nrows(),
            actual: a.ncols(),
        });
    }
    if a.nrows() == 0 {
        return Ok(DMatrix::zeros(0, 0));
    }
    a.clone().try_inverse().ok_or(Error::SingularMatrix)
}

/// Sparse LU factorization, computed once and applied many times.
///
/// Implements [`ComplexOperator`] as the action of `A^{-1}`, which is how a
/// preconditioner inverse is handed to MINRES.
pub struct SparseLu {
    n: usize,
    lu: Lu<usize, c64>,
}

impl SparseLu {
    /// Factorize a sparse operator.
    pub fn factorize(op: &SparseOperator) -> Result<Self> {
        let n = op.dim();
        let lu = op.matrix().sp_lu().map_err(|_| Error::SingularMatrix)?;
        Ok(Self { n, lu })
    }

    /// Assemble from `(row, col, value)` triplets and factorize.
    pub fn from_triplets(size: usize, triplets: &[(usize, usize, C64)]) -> Result<Self> {
        let op = SparseOperator::from_triplets(size, triplets).ok_or(Error::SingularMatrix)?;
        Self::factorize(&op)
    }

    /// Solve `A x = rhs`.
    pub fn solve(&self, rhs: &[C64]) -> Vec<C64> {
        let faer_rhs = Col::<c64>::from_fn(self.n, |i| c64::new(rhs[i].re, rhs[i].im));
        let faer_x = self.lu.solve(&faer_rhs);
        (0..self.n)
            .map(|i| C64::new(faer_x[i].re, faer_x[i].im))
            .collect()
    }
}

impl ComplexOperator for SparseLu {
    fn dim(&self) -> usize {
        self.n
    }

    fn apply(&self, x: &[C64], y: &mut [C64]) {
        y.copy_from_slice(&self.solve(x));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn c(re: f64, im: f64) -> C64 {
        C64::new(re, im)
    }

    #[test]
    fn test_invert_dense() {
        let a = DMatrix::from_row_slice(2, 2, &[c(2.0, 0.0), c(0.0, 0.0), c(0.0, 0.0), c(0.0, 4.0)]);
        let inv = invert_dense(&a).unwrap();
        assert!((inv[(0, 0)] - c(0.5, 0.0)).norm() < 1e-14);
        assert!((inv[(1, 1)] - c(0.0, -0.25)).norm() < 1e-14);
        assert_eq!(invert_dense(&DMatrix::zeros(0, 0)).unwrap().nrows(), 0);
    }

    #[test]
    fn test_invert_dense_singular() {
        let a = DMatrix::from_element(2, 2, c(1.0, 0.0));
        assert_eq!(invert_dense(&a), Err(Error::SingularMatrix));
        assert!(matches!(
            invert_dense(&DMatrix::zeros(2, 3)),
            Err(Error::DimensionMismatch { expected: 2, actual: 3 })
        ));
    }

    #[test]
    fn test_sparse_lu_inverse_operator() {
        // [ 4  -1 ]
        // [-1   4 ]
        let triplets = vec![
            (0, 0, c(4.0, 0.0)),
            (0, 1, c(-1.0, 0.0)),
            (1, 0, c(-1.0, 0.0)),
            (1, 1, c(4.0, 0.0)),
        ];
        let lu = SparseLu::from_triplets(2, &triplets).unwrap();
        let a = SparseOperator::from_triplets(2, &triplets).unwrap();

        let x = vec![c(1.0, 2.0), c(-3.0, 0.5)];
        let y = lu.matvec(&a.matvec(&x));
        for (xi, yi) in x.iter().zip(y.iter()) {
            assert!((xi - yi).norm() < 1e-12);
        }
    }
}
