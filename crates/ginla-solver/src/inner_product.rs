//! Inner products and induced norms on complex column vectors.
//!
//! Every solver in this crate measures orthogonality and residuals through an
//! [`InnerProduct`], which is conjugate-linear in its first argument. The
//! default is the Euclidean product `x^H y`; Ginzburg-Landau type problems use
//! a weighted product whose real part turns `C^N` into a real Hilbert space.

use nalgebra::{DMatrix, DVector};
use num_complex::Complex64 as C64;

use crate::error::{Error, Result};
use crate::operator::ComplexOperator;

/// Relative bound on the imaginary part of a quadratic form `<x, Mx>`.
pub const QUADRATIC_FORM_IMAG_TOL: f64 = 1e-10;

/// A Hermitian form on `C^N`.
pub trait InnerProduct {
    /// `<x, y>`, conjugate-linear in `x`.
    fn dot(&self, x: &[C64], y: &[C64]) -> C64;

    /// Gram matrix `G[i, j] = <x_i, y_j>` of two blocks of column vectors.
    fn gram(&self, x: &[Vec<C64>], y: &[Vec<C64>]) -> DMatrix<C64> {
        DMatrix::from_fn(x.len(), y.len(), |i, j| self.dot(&x[i], &y[j]))
    }

    /// Coefficient vector `c[i] = <x_i, y>` of a single vector against a block.
    fn coefficients(&self, x: &[Vec<C64>], y: &[C64]) -> DVector<C64> {
        DVector::from_fn(x.len(), |i, _| self.dot(&x[i], y))
    }
}

/// Standard product `x^H y`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Euclidean;

impl InnerProduct for Euclidean {
    fn dot(&self, x: &[C64], y: &[C64]) -> C64 {
        debug_assert_eq!(x.len(), y.len());
        x.iter().zip(y.iter()).map(|(a, b)| a.conj() * b).sum()
    }
}

/// Diagonally weighted product `sum_i w_i conj(x_i) y_i`.
///
/// The weights are typically control volumes of a finite-volume mesh and must
/// be positive.
#[derive(Debug, Clone)]
pub struct Weighted {
    weights: Vec<f64>,
}

impl Weighted {
    pub fn new(weights: Vec<f64>) -> Self {
        Self { weights }
    }

    pub fn weights(&self) -> &[f64] {
        &self.weights
    }
}

impl InnerProduct for Weighted {
    fn dot(&self, x: &[C64], y: &[C64]) -> C64 {
        debug_assert_eq!(x.len(), self.weights.len());
        debug_assert_eq!(y.len(), self.weights.len());
        self.weights
            .iter()
            .zip(x.iter().zip(y.iter()))
            .map(|(&w, (a, b))| a.conj() * b * w)
            .sum()
    }
}

/// Real part of another inner product.
///
/// Identifies `C^N` with `R^{2N}`, which makes R-linear operators such as the
/// Ginzburg-Landau Jacobian (containing `conj(phi)` terms) self-adjoint.
#[derive(Debug, Clone, Default)]
pub struct RealPart<I> {
    inner: I,
}

impl<I: InnerProduct> RealPart<I> {
    pub fn new(inner: I) -> Self {
        Self { inner }
    }

    pub fn inner(&self) -> &I {
        &self.inner
    }
}

impl<I: InnerProduct> InnerProduct for RealPart<I> {
    fn dot(&self, x: &[C64], y: &[C64]) -> C64 {
        C64::new(self.inner.dot(x, y).re, 0.0)
    }
}

/// The M-inner product `<M x, y>` for a self-adjoint positive-definite `M`.
///
/// With `m == None` this is the base product itself.
pub struct Preconditioned<'a> {
    base: &'a dyn InnerProduct,
    m: Option<&'a dyn ComplexOperator>,
}

impl<'a> Preconditioned<'a> {
    pub fn new(base: &'a dyn InnerProduct, m: Option<&'a dyn ComplexOperator>) -> Self {
        Self { base, m }
    }
}

impl InnerProduct for Preconditioned<'_> {
    fn dot(&self, x: &[C64], y: &[C64]) -> C64 {
        match self.m {
            Some(m) => self.base.dot(&m.matvec(x), y),
            None => self.base.dot(x, y),
        }
    }
}

/// `<x, Mx>` (or `<x, x>` when `mx` is `None`), checked to be real and
/// non-negative.
///
/// Fails with [`Error::NotPositiveDefinite`] when the imaginary part exceeds
/// `1e-10 * |rho|` or the real part is negative.
pub fn norm_squared(ip: &dyn InnerProduct, x: &[C64], mx: Option<&[C64]>) -> Result<f64> {
    let rho = match mx {
        Some(mx) => ip.dot(x, mx),
        None => ip.dot(x, x),
    };

    if rho.im.abs() > rho.norm() * QUADRATIC_FORM_IMAG_TOL || rho.re < 0.0 {
        return Err(Error::NotPositiveDefinite {
            re: rho.re,
            im: rho.im,
        });
    }

    Ok(rho.re)
}

/// Norm induced by `ip` (optionally through the preconditioned vector `mx`).
pub fn norm(ip: &dyn InnerProduct, x: &[C64], mx: Option<&[C64]>) -> Result<f64> {
    norm_squared(ip, x, mx).map(f64::sqrt)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operator::LinearOperator;

    fn c(re: f64, im: f64) -> C64 {
        C64::new(re, im)
    }

    #[test]
    fn euclidean_is_conjugate_linear_in_first_argument() {
        let x = vec![c(0.0, 1.0)];
        let y = vec![c(1.0, 0.0)];
        // conj(i) * 1 = -i
        assert_eq!(Euclidean.dot(&x, &y), c(0.0, -1.0));
        assert_eq!(Euclidean.dot(&y, &x), c(0.0, 1.0));
    }

    #[test]
    fn weighted_and_real_part() {
        let ip = RealPart::new(Weighted::new(vec![2.0, 0.5]));
        let x = vec![c(1.0, 1.0), c(0.0, 2.0)];
        // 2 * |1+i|^2 + 0.5 * |2i|^2 = 4 + 2
        assert!((ip.dot(&x, &x) - c(6.0, 0.0)).norm() < 1e-14);

        // Re(conj(i) * 1) = 0
        let y = vec![c(0.0, 1.0), c(0.0, 0.0)];
        let z = vec![c(1.0, 0.0), c(0.0, 0.0)];
        assert_eq!(ip.dot(&y, &z), c(0.0, 0.0));
    }

    #[test]
    fn gram_matrix() {
        let x = vec![vec![c(1.0, 0.0), c(0.0, 0.0)], vec![c(0.0, 0.0), c(1.0, 0.0)]];
        let g = Euclidean.gram(&x, &x);
        assert_eq!(g, DMatrix::identity(2, 2));
    }

    #[test]
    fn preconditioned_uses_forward_operator() {
        let m = LinearOperator::from_diagonal(&[c(2.0, 0.0), c(3.0, 0.0)]);
        let ip = Preconditioned::new(&Euclidean, Some(&m));
        let x = vec![c(1.0, 0.0), c(1.0, 0.0)];
        assert!((ip.dot(&x, &x) - c(5.0, 0.0)).norm() < 1e-14);
    }

    #[test]
    fn norm_of_vector() {
        let x = vec![c(3.0, 0.0), c(0.0, 4.0)];
        assert!((norm(&Euclidean, &x, None).unwrap() - 5.0).abs() < 1e-14);
    }

    #[test]
    fn negative_quadratic_form_is_rejected() {
        let x = vec![c(1.0, 0.0)];
        let mx = vec![c(-1.0, 0.0)];
        let err = norm(&Euclidean, &x, Some(&mx)).unwrap_err();
        assert!(matches!(err, Error::NotPositiveDefinite { re, .. } if re < 0.0));
    }

    #[test]
    fn imaginary_quadratic_form_is_rejected() {
        let x = vec![c(1.0, 0.0)];
        let mx = vec![c(1.0, 1e-3)];
        assert!(matches!(
            norm_squared(&Euclidean, &x, Some(&mx)),
            Err(Error::NotPositiveDefinite { .. })
        ));

        // Below the relative threshold the imaginary part is ignored.
        let mx = vec![c(1.0, 1e-12)];
        assert!((norm_squared(&Euclidean, &x, Some(&mx)).unwrap() - 1.0).abs() < 1e-14);
    }
}
