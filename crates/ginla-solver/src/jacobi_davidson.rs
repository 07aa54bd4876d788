//! Jacobi-Davidson iteration for the largest-magnitude eigenpair of a
//! self-adjoint operator.
//!
//! The search space is expanded by an approximate solution of the
//! correction equation
//!
//! ```text
//! (I - u u*)(A - theta I)(I - u u*) t = -r,   t orthogonal to u
//! ```
//!
//! computed with MINRES.

use nalgebra::{DMatrix, SymmetricEigen};
use num_complex::Complex64 as C64;

use crate::error::{Error, Result};
use crate::inner_product::{Euclidean, InnerProduct, norm};
use crate::krylov::{KrylovConfig, minres};
use crate::operator::ComplexOperator;
use crate::orthogonalize::orthogonalize;
use crate::vector::{axpy, combine, scaled, zeros};
use crate::warning::{SolverWarning, emit};

/// Norms below this count as zero.
const BREAKDOWN_TOL: f64 = 1e-10;

#[derive(Clone, Copy)]
pub struct JacobiDavidsonConfig<'a> {
    /// Stop when the eigen-residual norm drops below this.
    pub tol: f64,
    /// Maximal search space dimension; `None` means the problem dimension.
    pub max_iter: Option<usize>,
    /// Preconditioner for the correction equation.
    pub m: Option<&'a dyn ComplexOperator>,
    pub inner_product: &'a dyn InnerProduct,
    /// Relative tolerance of the inner MINRES solve.
    pub inner_tol: f64,
}

impl Default for JacobiDavidsonConfig<'_> {
    fn default() -> Self {
        Self {
            tol: 1e-5,
            max_iter: None,
            m: None,
            inner_product: &Euclidean,
            inner_tol: 1e-8,
        }
    }
}

impl<'a> JacobiDavidsonConfig<'a> {
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

    pub fn with_inner_product(mut self, ip: &'a dyn InnerProduct) -> Self {
        self.inner_product = ip;
        self
    }
}

#[derive(Debug, Clone)]
pub struct JacobiDavidsonResult {
    pub value: f64,
    /// Normalized eigenvector approximation.
    pub vector: Vec<C64>,
    pub converged: bool,
    /// Eigen-residual norm `||A u - theta u||` per iteration.
    pub residual_history: Vec<f64>,
    pub warnings: Vec<SolverWarning>,
}

/// `(I - u u*)(A - theta I)(I - u u*)`
struct ShiftedProjectedOperator<'a> {
    a: &'a dyn ComplexOperator,
    u: &'a [C64],
    theta: f64,
    ip: &'a dyn InnerProduct,
}

impl ShiftedProjectedOperator<'_> {
    fn project(&self, phi: &[C64]) -> Vec<C64> {
        let mut out = phi.to_vec();
        axpy(-self.ip.dot(self.u, phi), self.u, &mut out);
        out
    }
}

impl ComplexOperator for ShiftedProjectedOperator<'_> {
    fn dim(&self) -> usize {
        self.u.len()
    }

    fn apply(&self, x: &[C64], y: &mut [C64]) {
        let px = self.project(x);
        let mut z = self.a.matvec(&px);
        axpy(C64::new(-self.theta, 0.0), &px, &mut z);
        y.copy_from_slice(&self.project(&z));
    }
}

/// Largest-magnitude eigenpair of the self-adjoint `a`, starting from `v0`.
///
/// Fails with [`Error::Breakdown`] if the expansion vector vanishes after
/// orthogonalization or the inner MINRES solve does not converge.
pub fn jacobi_davidson(
    a: &dyn ComplexOperator,
    v0: &[C64],
    config: &JacobiDavidsonConfig,
) -> Result<JacobiDavidsonResult> {
    let n = a.dim();
    if v0.len() != n {
        return Err(Error::DimensionMismatch {
            expected: n,
            actual: v0.len(),
        });
    }
    let ip = config.inner_product;
    let max_iter = config.max_iter.unwrap_or(n);

    let mut v: Vec<Vec<C64>> = Vec::with_capacity(max_iter);
    let mut av: Vec<Vec<C64>> = Vec::with_capacity(max_iter);
    let mut b = DMatrix::<f64>::zeros(max_iter, max_iter);
    let mut residual_history = Vec::new();
    let mut warnings = Vec::new();

    let mut t = v0.to_vec();
    let mut theta = 0.0;
    let mut u = zeros(n);

    for m in 0..max_iter {
        let t_orth = orthogonalize(t, &v, ip);
        let norm_t = norm(ip, &t_orth, None)?;
        if norm_t <= BREAKDOWN_TOL {
            return Err(Error::Breakdown {
                iteration: m,
                reason: format!("||t|| = {norm_t:e}"),
            });
        }
        let vm = scaled(&t_orth, norm_t);
        av.push(a.matvec(&vm));
        v.push(vm);

        // B = <V, AV>, real for self-adjoint A
        for i in 0..=m {
            let alpha = ip.dot(&v[i], &av[m]);
            if alpha.im.abs() >= BREAKDOWN_TOL {
                emit(
                    &mut warnings,
                    SolverWarning::SelfAdjointness {
                        iteration: m,
                        imag: alpha.im,
                    },
                );
            }
            b[(m, i)] = alpha.re;
            b[(i, m)] = alpha.re;
        }

        let eig = SymmetricEigen::try_new(
            b.view((0, 0), (m + 1, m + 1)).into_owned(),
            f64::EPSILON,
            0,
        )
        .ok_or_else(|| Error::EigenDecomposition(format!("projected matrix of size {}", m + 1)))?;

        let index = eig
            .eigenvalues
            .iter()
            .enumerate()
            .max_by(|(_, x), (_, y)| x.abs().total_cmp(&y.abs()))
            .map_or(0, |(i, _)| i);
        theta = eig.eigenvalues[index];
        let s = eig.eigenvectors.column(index);
        let norm_s = s.norm();
        if norm_s <= BREAKDOWN_TOL {
            return Err(Error::Breakdown {
                iteration: m,
                reason: format!("||s|| = {norm_s:e}"),
            });
        }
        let coeffs: Vec<C64> = s.iter().map(|&c| C64::new(c / norm_s, 0.0)).collect();

        u = combine(&v, &coeffs, n);
        let au = combine(&av, &coeffs, n);
        let mut res = au;
        axpy(C64::new(-theta, 0.0), &u, &mut res);
        let res_norm = norm(ip, &res, None)?;
        residual_history.push(res_norm);
        log::debug!("Jacobi-Davidson iter {m}: theta = {theta}, ||r|| = {res_norm:e}");

        if res_norm < config.tol {
            return Ok(JacobiDavidsonResult {
                value: theta,
                vector: u,
                converged: true,
                residual_history,
                warnings,
            });
        }

        let op = ShiftedProjectedOperator {
            a,
            u: &u,
            theta,
            ip,
        };
        let rhs: Vec<C64> = res.iter().map(|r| -r).collect();
        let inner = KrylovConfig::default()
            .with_tol(config.inner_tol)
            .with_max_iter(n)
            .with_preconditioner(config.m)
            .with_inner_product(ip);
        let out = minres(&op, &rhs, &zeros(n), &inner)?;
        warnings.extend(out.warnings);
        if !out.converged {
            return Err(Error::Breakdown {
                iteration: m,
                reason: format!(
                    "correction equation not solved, relres = {:e}",
                    out.relres_history.last().copied().unwrap_or(f64::NAN)
                ),
            });
        }
        t = out.x;
    }

    log::warn!(
        "Jacobi-Davidson did not converge in {max_iter} iterations, ||r|| = {:e}",
        residual_history.last().copied().unwrap_or(f64::NAN)
    );
    Ok(JacobiDavidsonResult {
        value: theta,
        vector: u,
        converged: false,
        residual_history,
        warnings,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operator::LinearOperator;

    fn c(re: f64) -> C64 {
        C64::new(re, 0.0)
    }

    #[test]
    fn largest_eigenvalue_of_diagonal() {
        let a = LinearOperator::from_diagonal(&[c(1.0), c(2.0), c(5.0)]);
        let result = jacobi_davidson(&a, &[c(1.0); 3], &JacobiDavidsonConfig::default()).unwrap();

        assert!(result.converged);
        assert!((result.value - 5.0).abs() < 1e-8);
        assert!(result.vector[2].norm() > 1.0 - 1e-8);
        assert!(*result.residual_history.last().unwrap() < 1e-5);
        assert!(result.residual_history.len() <= 3);
    }

    #[test]
    fn largest_magnitude_may_be_negative() {
        let a = LinearOperator::from_diagonal(&[c(-7.0), c(1.0), c(3.0), c(2.0)]);
        let v0 = [c(1.0), c(0.5), c(0.25), c(0.125)];
        let result = jacobi_davidson(&a, &v0, &JacobiDavidsonConfig::default()).unwrap();

        assert!(result.converged);
        assert!((result.value + 7.0).abs() < 1e-8);
    }

    #[test]
    fn hermitian_operator() {
        let m = DMatrix::from_row_slice(
            2,
            2,
            &[c(2.0), C64::new(0.0, -1.0), C64::new(0.0, 1.0), c(2.0)],
        );
        // eigenvalues 1 and 3
        let a = LinearOperator::from_dense(m).unwrap();
        let v0 = [c(1.0), C64::new(0.0, 0.3)];
        let result = jacobi_davidson(&a, &v0, &JacobiDavidsonConfig::default()).unwrap();
        assert!((result.value - 3.0).abs() < 1e-8);
        assert!(result.warnings.is_empty());
    }

    #[test]
    fn zero_start_vector_breaks_down() {
        let a = LinearOperator::from_diagonal(&[c(1.0), c(2.0)]);
        let err = jacobi_davidson(&a, &[c(0.0); 2], &JacobiDavidsonConfig::default()).unwrap_err();
        assert!(matches!(err, Error::Breakdown { iteration: 0, .. }));
    }

    #[test]
    fn dimension_mismatch() {
        let a = LinearOperator::identity(3);
        assert!(matches!(
            jacobi_davidson(&a, &[c(1.0)], &JacobiDavidsonConfig::default()),
            Err(Error::DimensionMismatch { .. })
        ));
    }
}
