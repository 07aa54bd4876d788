//! Linear operators consumed by the Krylov solvers.
//!
//! [`ComplexOperator`] is the single seam every solver applies: the system
//! operator, preconditioners and deflation projectors all implement it.
//! [`LinearOperator`] is the closed set of concrete representations a model
//! evaluator can hand out.

use std::fmt;

use nalgebra::{DMatrix, DVector};
use num_complex::Complex64 as C64;

use crate::error::{Error, Result};
use crate::sparse_operator::SparseOperator;
use crate::vector::zeros;

/// Complex-valued square linear operator `y = A x`.
pub trait ComplexOperator {
    /// Dimension of the operator (number of rows = number of columns).
    fn dim(&self) -> usize;

    /// Apply the operator: `y = A * x`. `y` is overwritten.
    fn apply(&self, x: &[C64], y: &mut [C64]);

    /// Apply the operator into a freshly allocated vector.
    fn matvec(&self, x: &[C64]) -> Vec<C64> {
        let mut y = zeros(self.dim());
        self.apply(x, &mut y);
        y
    }
}

/// Closure signature accepted by [`LinearOperator::Functional`].
pub type ApplyFn = dyn Fn(&[C64], &mut [C64]);

/// Concrete operator representations.
pub enum LinearOperator {
    /// The identity on `C^n`.
    Identity(usize),
    /// Dense square matrix.
    Dense(DMatrix<C64>),
    /// Sparse square matrix in CSC storage.
    Sparse(SparseOperator),
    /// Matrix-free operator given by its action.
    Functional { dim: usize, apply: Box<ApplyFn> },
}

impl LinearOperator {
    pub fn identity(n: usize) -> Self {
        Self::Identity(n)
    }

    /// Wrap a dense matrix. Rectangular matrices are rejected.
    pub fn from_dense(matrix: DMatrix<C64>) -> Result<Self> {
        if matrix.nrows() != matrix.ncols() {
            return Err(Error::UnsupportedOperatorKind(format!(
                "dense matrix must be square, got {}x{}",
                matrix.nrows(),
                matrix.ncols()
            )));
        }
        Ok(Self::Dense(matrix))
    }

    /// Diagonal matrix with the given entries.
    pub fn from_diagonal(diag: &[C64]) -> Self {
        Self::Dense(DMatrix::from_diagonal(&DVector::from_column_slice(diag)))
    }

    /// Sparse matrix from `(row, col, value)` triplets; duplicates are summed.
    pub fn from_triplets(size: usize, triplets: &[(usize, usize, C64)]) -> Result<Self> {
        SparseOperator::from_triplets(size, triplets)
            .map(Self::Sparse)
            .ok_or_else(|| {
                Error::UnsupportedOperatorKind(format!(
                    "invalid sparse triplets for a {size}x{size} matrix"
                ))
            })
    }

    /// Matrix-free operator. `apply(x, y)` must overwrite `y` with `A x`.
    pub fn from_fn(dim: usize, apply: impl Fn(&[C64], &mut [C64]) + 'static) -> Self {
        Self::Functional {
            dim,
            apply: Box::new(apply),
        }
    }

    /// Apply the operator to each column of a block.
    pub fn apply_block(&self, x: &[Vec<C64>]) -> Vec<Vec<C64>> {
        x.iter().map(|col| self.matvec(col)).collect()
    }
}

impl ComplexOperator for LinearOperator {
    fn dim(&self) -> usize {
        match self {
            Self::Identity(n) => *n,
            Self::Dense(m) => m.nrows(),
            Self::Sparse(s) => s.dim(),
            Self::Functional { dim, .. } => *dim,
        }
    }

    fn apply(&self, x: &[C64], y: &mut [C64]) {
        match self {
            Self::Identity(_) => y.copy_from_slice(x),
            Self::Dense(m) => {
                debug_assert_eq!(x.len(), m.ncols());
                for (i, yi) in y.iter_mut().enumerate() {
                    *yi = m.row(i).iter().zip(x.iter()).map(|(a, b)| a * b).sum();
                }
            }
            Self::Sparse(s) => s.apply(x, y),
            Self::Functional { apply, .. } => apply(x, y),
        }
    }
}

impl fmt::Debug for LinearOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Identity(n) => write!(f, "Identity({n})"),
            Self::Dense(m) => write!(f, "Dense({}x{})", m.nrows(), m.ncols()),
            Self::Sparse(s) => write!(f, "Sparse({}x{}, nnz={})", s.dim(), s.dim(), s.nnz()),
            Self::Functional { dim, .. } => write!(f, "Functional({dim})"),
        }
    }
}

/// `A x`, or `x` itself when the operator is absent.
pub fn apply(op: Option<&dyn ComplexOperator>, x: &[C64]) -> Vec<C64> {
    match op {
        Some(op) => op.matvec(x),
        None => x.to_vec(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn c(re: f64, im: f64) -> C64 {
        C64::new(re, im)
    }

    #[test]
    fn absent_operator_is_identity() {
        let x = vec![c(1.0, 2.0), c(3.0, 4.0)];
        assert_eq!(apply(None, &x), x);
        assert_eq!(LinearOperator::identity(2).matvec(&x), x);
    }

    #[test]
    fn dense_matvec() {
        let a = DMatrix::from_row_slice(2, 2, &[c(1.0, 0.0), c(2.0, 0.0), c(0.0, 1.0), c(1.0, 0.0)]);
        let op = LinearOperator::from_dense(a).unwrap();
        let y = op.matvec(&[c(1.0, 0.0), c(1.0, 0.0)]);
        assert_eq!(y, vec![c(3.0, 0.0), c(1.0, 1.0)]);
    }

    #[test]
    fn rectangular_dense_is_rejected() {
        let a = DMatrix::<C64>::zeros(2, 3);
        assert!(matches!(
            LinearOperator::from_dense(a),
            Err(Error::UnsupportedOperatorKind(_))
        ));
    }

    #[test]
    fn out_of_range_triplet_is_rejected() {
        let trips = vec![(0, 5, c(1.0, 0.0))];
        assert!(matches!(
            LinearOperator::from_triplets(2, &trips),
            Err(Error::UnsupportedOperatorKind(_))
        ));
    }

    #[test]
    fn functional_operator() {
        let op = LinearOperator::from_fn(2, |x, y| {
            y[0] = x[1];
            y[1] = x[0];
        });
        let op_ref: &dyn ComplexOperator = &op;
        assert_eq!(op_ref.dim(), 2);
        assert_eq!(apply(Some(op_ref), &[c(1.0, 0.0), c(2.0, 0.0)]), vec![c(2.0, 0.0), c(1.0, 0.0)]);
        assert_eq!(format!("{op:?}"), "Functional(2)");
    }
}
