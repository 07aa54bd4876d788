//! Deflation projector for recycled Krylov subspaces.
//!
//! For a basis `W` of (approximately) invariant directions of a self-adjoint
//! `A` and `AW = A W`, the projector
//!
//! ```text
//! P x = x - W E^-1 <AW, x>,   E = <W, AW>
//! ```
//!
//! used as the right preconditioner `Mr` makes `A P` self-adjoint on the
//! complement of `span(W)`, removing those directions from the Krylov
//! iteration.

use nalgebra::DMatrix;
use num_complex::Complex64 as C64;

use crate::error::{Error, Result};
use crate::inner_product::InnerProduct;
use crate::linear::invert_dense;
use crate::operator::ComplexOperator;
use crate::vector::{add, combine_dvec, sub};

pub struct DeflationProjector<'a> {
    w: &'a [Vec<C64>],
    aw: &'a [Vec<C64>],
    e: DMatrix<C64>,
    e_inv: DMatrix<C64>,
    ip: &'a dyn InnerProduct,
    n: usize,
}

impl<'a> DeflationProjector<'a> {
    /// Build the projector. Fails with [`Error::SingularMatrix`] if `E` is
    /// singular.
    pub fn new(w: &'a [Vec<C64>], aw: &'a [Vec<C64>], ip: &'a dyn InnerProduct) -> Result<Self> {
        if w.len() != aw.len() {
            return Err(Error::DimensionMismatch {
                expected: w.len(),
                actual: aw.len(),
            });
        }
        let n = w.first().map_or(0, Vec::len);
        if let Some(bad) = w.iter().chain(aw.iter()).find(|c| c.len() != n) {
            return Err(Error::DimensionMismatch {
                expected: n,
                actual: bad.len(),
            });
        }

        let e = ip.gram(w, aw);
        let e_inv = invert_dense(&e)?;
        Ok(Self {
            w,
            aw,
            e,
            e_inv,
            ip,
            n,
        })
    }

    /// Deflation dimension.
    pub fn rank(&self) -> usize {
        self.w.len()
    }

    /// `E = <W, AW>`.
    pub fn gram(&self) -> &DMatrix<C64> {
        &self.e
    }

    pub fn gram_inverse(&self) -> &DMatrix<C64> {
        &self.e_inv
    }

    /// `x - W E^-1 <AW, x>`
    pub fn project(&self, x: &[C64]) -> Vec<C64> {
        let coeffs = &self.e_inv * self.ip.coefficients(self.aw, x);
        sub(x, &combine_dvec(self.w, &coeffs, x.len()))
    }

    /// Initial guess `P x0 + W E^-1 <W, b>` for the deflated solve.
    ///
    /// Its residual has no component along `span(W)` as seen through `A`,
    /// so the deflated iteration cannot break down on it.
    pub fn initial_guess(&self, b: &[C64], x0: &[C64]) -> Vec<C64> {
        let coeffs = &self.e_inv * self.ip.coefficients(self.w, b);
        add(&self.project(x0), &combine_dvec(self.w, &coeffs, b.len()))
    }
}

impl ComplexOperator for DeflationProjector<'_> {
    fn dim(&self) -> usize {
        self.n
    }

    fn apply(&self, x: &[C64], y: &mut [C64]) {
        y.copy_from_slice(&self.project(x));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inner_product::{Euclidean, RealPart, Weighted};
    use crate::krylov::{KrylovConfig, minres};
    use crate::operator::LinearOperator;

    fn c(re: f64, im: f64) -> C64 {
        C64::new(re, im)
    }

    fn hermitian_operator() -> LinearOperator {
        let a = DMatrix::from_row_slice(
            3,
            3,
            &[
                c(2.0, 0.0), c(1.0, -1.0), c(0.0, 0.0),
                c(1.0, 1.0), c(3.0, 0.0), c(0.0, 0.5),
                c(0.0, 0.0), c(0.0, -0.5), c(-1.0, 0.0),
            ],
        );
        LinearOperator::from_dense(a).unwrap()
    }

    #[test]
    fn projected_vectors_are_a_orthogonal_to_w() {
        let a = hermitian_operator();
        let w = vec![vec![c(1.0, 0.0), c(0.0, 1.0), c(0.5, 0.0)]];
        let aw = a.apply_block(&w);
        let proj = DeflationProjector::new(&w, &aw, &Euclidean).unwrap();
        assert_eq!(proj.rank(), 1);

        for x in [
            vec![c(1.0, 2.0), c(-1.0, 0.0), c(3.0, 1.0)],
            vec![c(0.0, 0.0), c(0.0, 1.0), c(1.0, 0.0)],
        ] {
            let px = proj.matvec(&x);
            assert!(Euclidean.coefficients(&aw, &px).norm() < 1e-12);
        }
    }

    #[test]
    fn projector_is_idempotent() {
        let a = hermitian_operator();
        let w = vec![
            vec![c(1.0, 0.0), c(0.0, 0.0), c(0.0, 0.0)],
            vec![c(0.0, 0.0), c(1.0, 0.0), c(1.0, 0.0)],
        ];
        let aw = a.apply_block(&w);
        let proj = DeflationProjector::new(&w, &aw, &Euclidean).unwrap();
        let x = vec![c(1.0, 1.0), c(2.0, -1.0), c(0.5, 0.0)];
        let px = proj.project(&x);
        let ppx = proj.project(&px);
        for (a, b) in px.iter().zip(ppx.iter()) {
            assert!((a - b).norm() < 1e-12);
        }
    }

    #[test]
    fn initial_guess_residual_is_w_orthogonal() {
        let a = hermitian_operator();
        let w = vec![vec![c(0.0, 1.0), c(1.0, 0.0), c(0.0, 0.0)]];
        let aw = a.apply_block(&w);
        let proj = DeflationProjector::new(&w, &aw, &Euclidean).unwrap();

        let b = vec![c(1.0, 0.0), c(2.0, 0.0), c(3.0, 0.0)];
        let x0 = vec![c(0.5, 0.0), c(0.0, 0.0), c(-1.0, 0.0)];
        let x = proj.initial_guess(&b, &x0);
        let r = sub(&b, &a.matvec(&x));
        assert!(Euclidean.coefficients(&w, &r).norm() < 1e-12);
    }

    #[test]
    fn singular_gram_matrix_is_rejected() {
        // A w = 0
        let a = LinearOperator::from_diagonal(&[c(0.0, 0.0), c(1.0, 0.0)]);
        let w = vec![vec![c(1.0, 0.0), c(0.0, 0.0)]];
        let aw = a.apply_block(&w);
        assert!(matches!(
            DeflationProjector::new(&w, &aw, &Euclidean),
            Err(Error::SingularMatrix)
        ));
    }

    #[test]
    fn deflated_minres_skips_deflated_eigenvalue() {
        let diag: Vec<C64> = [1.0, 2.0, 3.0, 4.0].iter().map(|&v| c(v, 0.0)).collect();
        let a = LinearOperator::from_diagonal(&diag);
        let b = vec![c(1.0, 0.0); 4];
        let ip = RealPart::new(Weighted::new(vec![1.0; 4]));
        let config = KrylovConfig::default().with_tol(1e-12).with_inner_product(&ip);

        let plain = minres(&a, &b, &vec![c(0.0, 0.0); 4], &config).unwrap();
        assert_eq!(plain.iterations, 4);

        let w = vec![vec![c(1.0, 0.0), c(0.0, 0.0), c(0.0, 0.0), c(0.0, 0.0)]];
        let aw = a.apply_block(&w);
        let proj = DeflationProjector::new(&w, &aw, &ip).unwrap();
        let x0 = proj.initial_guess(&b, &vec![c(0.0, 0.0); 4]);
        let deflated = minres(&a, &b, &x0, &config.with_right_preconditioner(Some(&proj))).unwrap();

        assert!(deflated.converged);
        assert_eq!(deflated.iterations, 3);
        for (xi, di) in deflated.x.iter().zip(diag.iter()) {
            assert!((xi * di - c(1.0, 0.0)).norm() < 1e-10);
        }
    }
}
