//! Sparse matrix operator wrapper for the iterative solvers.
//!
//! Wraps faer's sparse column matrices and implements [`ComplexOperator`] so
//! assembled Jacobians and preconditioners can be handed to MINRES or GMRES.

use crate::operator::ComplexOperator;
use faer::prelude::*;
use faer::sparse::{SparseColMat, Triplet};
use num_complex::Complex64 as C64;

/// Sparse complex-valued operator.
///
/// Wraps a faer `SparseColMat<usize, c64>`.
pub struct SparseOperator {
    matrix: SparseColMat<usize, c64>,
}

impl SparseOperator {
    /// Create from an existing sparse matrix.
    pub fn from_matrix(matrix: SparseColMat<usize, c64>) -> Self {
        Self { matrix }
    }

    /// Create from triplets (row, col, value).
    ///
    /// Duplicate entries at the same position are summed. Returns `None` if a
    /// triplet lies outside the `size x size` pattern.
    pub fn from_triplets(size: usize, triplets: &[(usize, usize, C64)]) -> Option<Self> {
        let faer_triplets: Vec<_> = triplets
            .iter()
            .map(|&(r, c, v)| Triplet::new(r, c, c64::new(v.re, v.im)))
            .collect();

        SparseColMat::<usize, c64>::try_new_from_triplets(size, size, &faer_triplets)
            .ok()
            .map(|matrix| Self { matrix })
    }

    /// Get a reference to the underlying matrix.
    pub fn matrix(&self) -> &SparseColMat<usize, c64> {
        &self.matrix
    }

    /// Number of stored entries.
    pub fn nnz(&self) -> usize {
        self.matrix.as_ref().val().len()
    }
}

impl ComplexOperator for SparseOperator {
    fn dim(&self) -> usize {
        self.matrix.nrows()
    }

    fn apply(&self, x: &[C64], y: &mut [C64]) {
        let n = self.matrix.nrows();
        debug_assert_eq!(x.len(), n);
        debug_assert_eq!(y.len(), n);

        y.iter_mut().for_each(|yi| *yi = C64::new(0.0, 0.0));

        // CSC: for each column j, add A[:, j] * x[j] to y
        let mat_ref = self.matrix.as_ref();
        let col_ptrs = mat_ref.col_ptr();
        let row_indices = mat_ref.row_idx();
        let values = mat_ref.val();

        for (j, &xj) in x.iter().enumerate().take(n) {
            for idx in col_ptrs[j]..col_ptrs[j + 1] {
                let aij = values[idx];
                y[row_indices[idx]] += C64::new(aij.re, aij.im) * xj;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sparse_identity() {
        let triplets = vec![(0, 0, C64::new(1.0, 0.0)), (1, 1, C64::new(1.0, 0.0))];
        let op = SparseOperator::from_triplets(2, &triplets).unwrap();

        assert_eq!(op.dim(), 2);
        assert_eq!(op.nnz(), 2);

        let x = vec![C64::new(1.0, 2.0), C64::new(3.0, 4.0)];
        let y = op.matvec(&x);

        assert!((y[0] - x[0]).norm() < 1e-15);
        assert!((y[1] - x[1]).norm() < 1e-15);
    }

    #[test]
    fn sparse_hermitian_tridiagonal() {
        // [ 2   -i   0 ]
        // [ i    2  -i ]
        // [ 0    i   2 ]
        let i = C64::new(0.0, 1.0);
        let two = C64::new(2.0, 0.0);
        let triplets = vec![
            (0, 0, two),
            (0, 1, -i),
            (1, 0, i),
            (1, 1, two),
            (1, 2, -i),
            (2, 1, i),
            (2, 2, two),
        ];
        let op = SparseOperator::from_triplets(3, &triplets).unwrap();

        let x = vec![C64::new(1.0, 0.0); 3];
        let y = op.matvec(&x);

        assert!((y[0] - C64::new(2.0, -1.0)).norm() < 1e-15);
        assert!((y[1] - C64::new(2.0, 0.0)).norm() < 1e-15);
        assert!((y[2] - C64::new(2.0, 1.0)).norm() < 1e-15);
    }

    #[test]
    fn duplicate_triplets_are_summed() {
        let triplets = vec![(0, 0, C64::new(1.0, 0.0)), (0, 0, C64::new(0.0, 1.0))];
        let op = SparseOperator::from_triplets(1, &triplets).unwrap();
        let y = op.matvec(&[C64::new(1.0, 0.0)]);
        assert!((y[0] - C64::new(1.0, 1.0)).norm() < 1e-15);
    }

    #[test]
    fn sparse_as_trait_object() {
        let triplets = vec![(0, 0, C64::new(2.0, 0.0)), (1, 1, C64::new(3.0, 0.0))];
        let op = SparseOperator::from_triplets(2, &triplets).unwrap();
        let op_ref: &dyn ComplexOperator = &op;

        let x = vec![C64::new(5.0, 0.0), C64::new(7.0, 0.0)];
        let mut y = vec![C64::new(0.0, 0.0); 2];
        op_ref.apply(&x, &mut y);

        assert!((y[0] - C64::new(10.0, 0.0)).norm() < 1e-15);
        assert!((y[1] - C64::new(21.0, 0.0)).norm() < 1e-15);
    }
}
