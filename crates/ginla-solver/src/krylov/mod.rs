//! Krylov subspace solvers: CG, MINRES and GMRES.
//!
//! All three solve `A x = b` from an initial guess `x0` under a pluggable
//! inner product. MINRES and GMRES accept a positive-definite preconditioner
//! `M` together with left/right preconditioners `Ml`/`Mr` and solve
//!
//! ```text
//! M Ml A Mr y = M Ml b,   x = x0 + Mr y
//! ```
//!
//! stopping when `||M Ml (b - A x)||_{M^-1} / ||M Ml b||_{M^-1} <= tol`.
//!
//! # Usage
//!
//! ```ignore
//! use ginla_solver::krylov::{minres, KrylovConfig};
//!
//! let config = KrylovConfig::default().with_tol(1e-10).with_return_basis(true);
//! let result = minres(&operator, &rhs, &x0, &config)?;
//! assert_eq!(result.info_code(), 0);
//! ```
//!
//! Non-convergence within the iteration budget is reported through
//! [`KrylovResult::converged`], never as an error.

pub mod cg;
pub mod gmres;
pub mod minres;

pub use cg::cg;
pub use gmres::gmres;
pub use minres::minres;

use std::fmt;

use nalgebra::DMatrix;
use num_complex::Complex64 as C64;

use crate::error::{Error, Result};
use crate::inner_product::{Euclidean, InnerProduct};
use crate::operator::ComplexOperator;
use crate::timing::{NullTimer, TimingSink};
use crate::warning::SolverWarning;

/// Krylov solver configuration.
#[derive(Clone, Copy)]
pub struct KrylovConfig<'a> {
    /// Relative residual tolerance.
    pub tol: f64,
    /// Iteration cap; `None` means the problem dimension.
    pub max_iter: Option<usize>,
    /// Self-adjoint positive-definite preconditioner.
    pub m: Option<&'a dyn ComplexOperator>,
    /// Left preconditioner (MINRES/GMRES only).
    pub ml: Option<&'a dyn ComplexOperator>,
    /// Right preconditioner (MINRES/GMRES only), e.g. a deflation projector.
    pub mr: Option<&'a dyn ComplexOperator>,
    pub inner_product: &'a dyn InnerProduct,
    /// Recompute the residual explicitly in every iteration.
    pub explicit_residual: bool,
    /// Keep the full Krylov basis and projected matrix for Ritz extraction.
    pub return_basis: bool,
    /// Reorthogonalize every Lanczos vector against the full basis (MINRES).
    pub full_reortho: bool,
    /// Known solution; enables the error-norm history.
    pub exact_solution: Option<&'a [C64]>,
    pub timer: &'a dyn TimingSink,
}

impl Default for KrylovConfig<'_> {
    fn default() -> Self {
        Self {
            tol: 1e-5,
            max_iter: None,
            m: None,
            ml: None,
            mr: None,
            inner_product: &Euclidean,
            explicit_residual: false,
            return_basis: false,
            full_reortho: false,
            exact_solution: None,
            timer: &NullTimer,
        }
    }
}

impl<'a> KrylovConfig<'a> {
    pub fn with_tol(mut self, tol: f64) -> Self {
        self.tol = tol;
        self
    }

    pub fn with_max_iter(mut self, max_iter: usize) -> Self {
        self.max_iter = Some(max_iter);
        self
    }

    pub fn with_preconditioner(mut self, m: Option<&'a dyn ComplexOperator>) -> Self {
        self.m = m;
        self
    }

    pub fn with_left_preconditioner(mut self, ml: Option<&'a dyn ComplexOperator>) -> Self {
        self.ml = ml;
        self
    }

    pub fn with_right_preconditioner(mut self, mr: Option<&'a dyn ComplexOperator>) -> Self {
        self.mr = mr;
        self
    }

    pub fn with_inner_product(mut self, ip: &'a dyn InnerProduct) -> Self {
        self.inner_product = ip;
        self
    }

    pub fn with_explicit_residual(mut self, explicit: bool) -> Self {
        self.explicit_residual = explicit;
        self
    }

    pub fn with_return_basis(mut self, return_basis: bool) -> Self {
        self.return_basis = return_basis;
        self
    }

    pub fn with_full_reortho(mut self, full_reortho: bool) -> Self {
        self.full_reortho = full_reortho;
        self
    }

    pub fn with_exact_solution(mut self, x: &'a [C64]) -> Self {
        self.exact_solution = Some(x);
        self
    }

    pub fn with_timer(mut self, timer: &'a dyn TimingSink) -> Self {
        self.timer = timer;
        self
    }

    fn max_iter_for(&self, n: usize) -> usize {
        self.max_iter.unwrap_or(n)
    }
}

impl fmt::Debug for KrylovConfig<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KrylovConfig")
            .field("tol", &self.tol)
            .field("max_iter", &self.max_iter)
            .field("m", &self.m.map(|m| m.dim()))
            .field("ml", &self.ml.map(|m| m.dim()))
            .field("mr", &self.mr.map(|m| m.dim()))
            .field("explicit_residual", &self.explicit_residual)
            .field("return_basis", &self.return_basis)
            .field("full_reortho", &self.full_reortho)
            .finish_non_exhaustive()
    }
}

/// Full Krylov basis retained with `return_basis`.
///
/// `v` holds `n + 1` basis vectors, `h` is the `(n + 1) x n` projected
/// matrix with `M Ml A Mr V[..n] = V H`. `p` holds the unpreconditioned
/// vectors (`V = M P`) when a preconditioner was used.
#[derive(Debug, Clone)]
pub struct KrylovBasis {
    pub v: Vec<Vec<C64>>,
    pub p: Option<Vec<Vec<C64>>>,
    pub h: DMatrix<C64>,
}

/// Outcome of a Krylov solve.
#[derive(Debug, Clone)]
pub struct KrylovResult {
    pub x: Vec<C64>,
    pub converged: bool,
    pub iterations: usize,
    /// Relative residual norms, starting with the initial residual.
    pub relres_history: Vec<f64>,
    /// Last implicitly updated residual estimate, when one was replaced by an
    /// explicit recomputation.
    pub updated_residual: Option<f64>,
    /// Error norms against the exact solution, if one was supplied.
    pub error_history: Option<Vec<f64>>,
    pub basis: Option<KrylovBasis>,
    pub warnings: Vec<SolverWarning>,
}

impl KrylovResult {
    /// 0 when converged, 1 when the iteration budget ran out.
    pub fn info_code(&self) -> i32 {
        if self.converged { 0 } else { 1 }
    }

    pub fn final_relres(&self) -> f64 {
        self.relres_history.last().copied().unwrap_or(0.0)
    }

    /// Result for a zero right-hand side: `x = 0` solves exactly.
    fn zero_rhs(n: usize) -> Self {
        Self {
            x: crate::vector::zeros(n),
            converged: true,
            iterations: 0,
            relres_history: vec![0.0],
            updated_residual: None,
            error_history: None,
            basis: None,
            warnings: Vec::new(),
        }
    }
}

fn check_dimensions(a: &dyn ComplexOperator, b: &[C64], x0: &[C64]) -> Result<usize> {
    let n = a.dim();
    for len in [b.len(), x0.len()] {
        if len != n {
            return Err(Error::DimensionMismatch {
                expected: n,
                actual: len,
            });
        }
    }
    Ok(n)
}
