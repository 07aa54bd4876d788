//! Ritz pairs from a (possibly deflated) Lanczos run, for subspace recycling.
//!
//! Requirements on the inputs:
//!
//! - `AW = A W`, with `W` orthonormal in the `M^-1` inner product,
//! - `M A Mr V[..n] = V H` where `Mr` is the deflation projector built from
//!   `W` and `AW`, i.e. `V` and `H` come from MINRES with `return_basis`,
//! - `[W, V]` is orthonormal in the `M^-1` inner product.
//!
//! The Ritz pairs of `M A` on `span([W, V[..n]])` are then obtained from an
//! ordinary Hermitian eigenproblem on the stacked matrix
//!
//! ```text
//! [ E     B                  ]
//! [ B^H   H[..n, :] + B^H E^-1 B ]
//! ```
//!
//! with `E = <W, AW>` and `B = <AW, V[..n]>`. Residual norms come from a
//! block Gram matrix and do not need another application of `A`; only `M`
//! is applied to `AW`. Below about 1e-8 they lose accuracy.

use nalgebra::{DMatrix, DVector, SymmetricEigen};
use num_complex::Complex64 as C64;
use num_traits::Zero;

use crate::error::{Error, Result};
use crate::inner_product::InnerProduct;
use crate::krylov::KrylovBasis;
use crate::linear::invert_dense;
use crate::operator::{ComplexOperator, apply};
use crate::vector::{axpy, zeros};
use crate::warning::{SolverWarning, emit};

/// Residual norm below which a Ritz value is reported as converged.
pub const RITZ_CONVERGED: f64 = 1e-8;

/// An approximate eigenpair of `M A`.
#[derive(Debug, Clone)]
pub struct RitzPair {
    pub value: f64,
    /// Orthonormal in the `M^-1` inner product.
    pub vector: Vec<C64>,
    /// `M^-1`-norm of `M A u - value * u`.
    pub residual_norm: f64,
}

#[derive(Debug, Clone)]
pub struct RitzResult {
    /// Sorted by ascending residual norm.
    pub pairs: Vec<RitzPair>,
    pub warnings: Vec<SolverWarning>,
}

impl RitzResult {
    pub fn values(&self) -> Vec<f64> {
        self.pairs.iter().map(|p| p.value).collect()
    }

    pub fn residual_norms(&self) -> Vec<f64> {
        self.pairs.iter().map(|p| p.residual_norm).collect()
    }

    /// The first `k` Ritz vectors (those with the smallest residuals).
    pub fn leading_vectors(&self, k: usize) -> Vec<Vec<C64>> {
        self.pairs.iter().take(k).map(|p| p.vector.clone()).collect()
    }
}

/// Copy `block` into `target` with its top-left corner at `(row, col)`.
fn set_block(target: &mut DMatrix<C64>, row: usize, col: usize, block: &DMatrix<C64>) {
    if block.nrows() > 0 && block.ncols() > 0 {
        target
            .view_mut((row, col), (block.nrows(), block.ncols()))
            .copy_from(block);
    }
}

/// Compute the `k + n` Ritz pairs of a deflated MINRES or GMRES run.
///
/// `m` is the preconditioner that was passed to the solver as `M`. Only the
/// lower triangle of the projected matrix enters the eigenproblem.
pub fn ritz(
    w: &[Vec<C64>],
    aw: &[Vec<C64>],
    basis: &KrylovBasis,
    m: Option<&dyn ComplexOperator>,
    ip: &dyn InnerProduct,
) -> Result<RitzResult> {
    let nw = w.len();
    let nv = basis.v.len();
    if nv == 0 || basis.h.shape() != (nv, nv - 1) {
        return Err(Error::DimensionMismatch {
            expected: nv.saturating_sub(1),
            actual: basis.h.ncols(),
        });
    }
    let n = nv - 1;
    let dim = basis.v[0].len();
    let mut warnings = Vec::new();

    let e = ip.gram(w, aw);
    let b1 = ip.gram(aw, &basis.v);
    let b = b1.columns(0, n).into_owned();
    let e_inv = invert_dense(&e)?;
    let maw: Vec<Vec<C64>> = aw.iter().map(|c| apply(m, c)).collect();

    // [E, B; B^H, H[..n, :] + B^H E^-1 B]
    let bh = b.adjoint();
    let lower = basis.h.rows(0, n).into_owned() + &bh * &e_inv * &b;
    let mut ritzmat = DMatrix::<C64>::zeros(nw + n, nw + n);
    set_block(&mut ritzmat, 0, 0, &e);
    set_block(&mut ritzmat, 0, nw, &b);
    set_block(&mut ritzmat, nw, 0, &bh);
    set_block(&mut ritzmat, nw, nw, &lower);

    let eig = SymmetricEigen::try_new(ritzmat, f64::EPSILON, 0).ok_or_else(|| {
        Error::EigenDecomposition(format!("Ritz matrix of size {}", nw + n))
    })?;

    // [I, E, 0; E^H, D, B1; 0, B1^H, I] with D = <AW, M AW>. Only positive
    // definite if the preconditioner was applied exactly.
    let d = ip.gram(aw, &maw);
    let mut cc = DMatrix::<C64>::zeros(2 * nw + nv, 2 * nw + nv);
    set_block(&mut cc, 0, 0, &DMatrix::identity(nw, nw));
    set_block(&mut cc, 0, nw, &e);
    set_block(&mut cc, nw, 0, &e.adjoint());
    set_block(&mut cc, nw, nw, &d);
    set_block(&mut cc, nw, 2 * nw, &b1);
    set_block(&mut cc, 2 * nw, nw, &b1.adjoint());
    set_block(&mut cc, 2 * nw, 2 * nw, &DMatrix::identity(nv, nv));

    let mut pairs = Vec::with_capacity(nw + n);
    for i in 0..nw + n {
        let u = eig.eigenvectors.column(i);
        let mu = eig.eigenvalues[i];
        let uw = u.rows(0, nw).into_owned();
        let uv = u.rows(nw, n).into_owned();

        // z = [-mu w; w + E^-1 B v; H v - [mu v; 0]]
        let hv = &basis.h * &uv;
        let ebv = &e_inv * (&b * &uv);
        let z = DVector::from_fn(2 * nw + nv, |r, _| {
            if r < nw {
                -uw[r] * mu
            } else if r < 2 * nw {
                uw[r - nw] + ebv[r - nw]
            } else {
                let j = r - 2 * nw;
                let shift = if j < n { uv[j] * mu } else { C64::zero() };
                hv[j] - shift
            }
        });
        let res_ip = z.dotc(&(&cc * &z));
        if res_ip.im > 1e-13 {
            emit(&mut warnings, SolverWarning::RitzResidualImaginary { index: i, imag: res_ip.im });
        }
        if res_ip.re < -1e-10 {
            emit(&mut warnings, SolverWarning::RitzResidualNegative { index: i, value: res_ip.re });
        }
        let residual_norm = res_ip.norm().sqrt();
        if residual_norm < RITZ_CONVERGED {
            log::info!("Ritz value {mu} converged with residual {residual_norm:e}");
        }

        let mut vector = zeros(dim);
        for (col, &coeff) in w.iter().zip(uw.iter()) {
            axpy(coeff, col, &mut vector);
        }
        for (col, &coeff) in basis.v[..n].iter().zip(uv.iter()) {
            axpy(coeff, col, &mut vector);
        }

        pairs.push(RitzPair {
            value: mu,
            vector,
            residual_norm,
        });
    }

    pairs.sort_by(|a, b| a.residual_norm.total_cmp(&b.residual_norm));

    Ok(RitzResult { pairs, warnings })
}
