//! Gram-Schmidt orthogonalization under an arbitrary inner product.

use num_complex::Complex64 as C64;

use crate::inner_product::InnerProduct;
use crate::vector::{axpy, scaled};
use crate::warning::{SolverWarning, emit};
use nalgebra::DMatrix;

/// Squared DGKS ratio below which a second Gram-Schmidt pass is made
/// (kappa = 0.25, kappa^2 = 0.0625).
pub const REORTHO_THRESHOLD: f64 = 0.0625;

fn mod_gram_schmidt(v: &mut [C64], basis: &[Vec<C64>], ip: &dyn InnerProduct) {
    for w in basis {
        let h = ip.dot(w, v);
        axpy(-h, w, v);
    }
}

/// Orthogonalize `v` against the orthonormal set `basis`.
///
/// One modified Gram-Schmidt pass; a second pass is made when the pass
/// removed most of `v` (Daniel, Gragg, Kaufman and Stewart, 1976).
pub fn orthogonalize(mut v: Vec<C64>, basis: &[Vec<C64>], ip: &dyn InnerProduct) -> Vec<C64> {
    let tau = ip.dot(&v, &v).re;
    mod_gram_schmidt(&mut v, basis, ip);
    if tau > 0.0 && ip.dot(&v, &v).re / tau < REORTHO_THRESHOLD {
        mod_gram_schmidt(&mut v, basis, ip);
    }
    v
}

/// `W = Q R` with `<Q, Q> = I` under the given inner product.
#[derive(Debug, Clone)]
pub struct QrFactorization {
    pub q: Vec<Vec<C64>>,
    pub r: DMatrix<C64>,
    pub warnings: Vec<SolverWarning>,
}

/// Column-by-column Gram-Schmidt QR factorization.
///
/// Diagonal entries `<q_i, q_i>` that are not real non-negative are logged
/// and their modulus is used.
pub fn qr(w: &[Vec<C64>], ip: &dyn InnerProduct) -> QrFactorization {
    let n = w.len();
    let mut q: Vec<Vec<C64>> = Vec::with_capacity(n);
    let mut r = DMatrix::zeros(n, n);
    let mut warnings = Vec::new();

    for (i, wi) in w.iter().enumerate() {
        let mut qi = wi.clone();
        for (j, qj) in q.iter().enumerate() {
            let rji = ip.dot(qj, &qi);
            r[(j, i)] = rji;
            axpy(-rji, qj, &mut qi);
        }

        let rii = ip.dot(&qi, &qi);
        if rii.im > 1e-10 {
            emit(&mut warnings, SolverWarning::QrDiagonalImaginary { column: i, imag: rii.im });
        }
        if rii.re < -1e-14 {
            emit(&mut warnings, SolverWarning::QrDiagonalNegative { column: i, value: rii.re });
        }
        let rii = rii.norm().sqrt();
        r[(i, i)] = C64::new(rii, 0.0);
        q.push(scaled(&qi, rii));
    }

    QrFactorization { q, r, warnings }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inner_product::{Euclidean, RealPart, Weighted};
    use crate::vector::combine;

    fn c(re: f64, im: f64) -> C64 {
        C64::new(re, im)
    }

    fn sample_block() -> Vec<Vec<C64>> {
        vec![
            vec![c(1.0, 0.0), c(1.0, 1.0), c(0.0, 2.0), c(-1.0, 0.5)],
            vec![c(0.0, 1.0), c(2.0, 0.0), c(1.0, -1.0), c(0.5, 0.5)],
            vec![c(3.0, 0.0), c(0.0, 0.0), c(1.0, 1.0), c(0.0, -2.0)],
        ]
    }

    #[test]
    fn qr_reproduces_block_and_is_orthonormal() {
        let ip = Weighted::new(vec![1.0, 2.0, 0.5, 1.5]);
        let w = sample_block();
        let QrFactorization { q, r, warnings } = qr(&w, &ip);
        assert!(warnings.is_empty());

        let g = ip.gram(&q, &q);
        assert!((g - DMatrix::<C64>::identity(3, 3)).norm() < 1e-10);

        for (i, wi) in w.iter().enumerate() {
            let coeffs: Vec<C64> = (0..3).map(|j| r[(j, i)]).collect();
            let rebuilt = combine(&q, &coeffs, 4);
            for (a, b) in rebuilt.iter().zip(wi.iter()) {
                assert!((a - b).norm() < 1e-10);
            }
        }
    }

    #[test]
    fn qr_under_real_part_product() {
        let ip = RealPart::new(Euclidean);
        let x = vec![c(1.0, 0.0), c(0.0, 0.0)];
        // i*x is orthogonal to x in the real inner product
        let w = vec![x.clone(), vec![c(0.0, 1.0), c(0.0, 0.0)]];
        let f = qr(&w, &ip);
        assert!(f.r[(0, 1)].norm() < 1e-15);
        assert!((f.q[1][0] - c(0.0, 1.0)).norm() < 1e-15);
    }

    #[test]
    fn qr_of_empty_block() {
        let f = qr(&[], &Euclidean);
        assert!(f.q.is_empty());
        assert_eq!(f.r.nrows(), 0);
    }

    #[test]
    fn orthogonalize_removes_components() {
        let basis = vec![vec![c(1.0, 0.0), c(0.0, 0.0), c(0.0, 0.0)]];
        let v = vec![c(2.0, 1.0), c(1.0, 0.0), c(0.0, 0.0)];
        let v = orthogonalize(v, &basis, &Euclidean);
        assert!(v[0].norm() < 1e-15);
        assert_eq!(v[1], c(1.0, 0.0));
    }

    #[test]
    fn orthogonalize_nearly_parallel_vector() {
        // Almost all of v lies in span(basis): the second pass kicks in.
        let s = 1.0 / 2f64.sqrt();
        let basis = vec![vec![c(s, 0.0), c(s, 0.0), c(0.0, 0.0)]];
        let v = vec![c(1.0, 0.0), c(1.0, 0.0), c(1e-9, 0.0)];
        let v = orthogonalize(v, &basis, &Euclidean);
        assert!(Euclidean.dot(&basis[0], &v).norm() < 1e-20);
        assert!((v[2] - c(1e-9, 0.0)).norm() < 1e-20);
    }
}
