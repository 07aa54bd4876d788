//! Small dense vector kernels shared by the solvers.
//!
//! Vectors are plain `Vec<C64>` / `&[C64]`; blocks of vectors (deflation
//! bases, Krylov bases) are `Vec<Vec<C64>>` stored column by column.

use nalgebra::DVector;
use num_complex::Complex64 as C64;
use num_traits::Zero;

/// A zero vector of length `n`.
pub fn zeros(n: usize) -> Vec<C64> {
    vec![C64::zero(); n]
}

/// y += alpha * x
pub fn axpy(alpha: C64, x: &[C64], y: &mut [C64]) {
    debug_assert_eq!(x.len(), y.len());
    for (yi, &xi) in y.iter_mut().zip(x.iter()) {
        *yi += alpha * xi;
    }
}

/// Returns x / alpha for a real, nonzero alpha.
pub fn scaled(x: &[C64], inv: f64) -> Vec<C64> {
    x.iter().map(|&xi| xi / inv).collect()
}

/// Returns a - b.
pub fn sub(a: &[C64], b: &[C64]) -> Vec<C64> {
    debug_assert_eq!(a.len(), b.len());
    a.iter().zip(b.iter()).map(|(&ai, &bi)| ai - bi).collect()
}

/// Returns a + b.
pub fn add(a: &[C64], b: &[C64]) -> Vec<C64> {
    debug_assert_eq!(a.len(), b.len());
    a.iter().zip(b.iter()).map(|(&ai, &bi)| ai + bi).collect()
}

/// Linear combination sum_j coeffs[j] * columns[j].
///
/// `n` is the vector length, needed when `columns` is empty.
pub fn combine(columns: &[Vec<C64>], coeffs: &[C64], n: usize) -> Vec<C64> {
    debug_assert_eq!(columns.len(), coeffs.len());
    let mut out = zeros(n);
    for (col, &c) in columns.iter().zip(coeffs.iter()) {
        axpy(c, col, &mut out);
    }
    out
}

/// Same as [`combine`] with the coefficients taken from a nalgebra column.
pub fn combine_dvec(columns: &[Vec<C64>], coeffs: &DVector<C64>, n: usize) -> Vec<C64> {
    combine(columns, coeffs.as_slice(), n)
}
