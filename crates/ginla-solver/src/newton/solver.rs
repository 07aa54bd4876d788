//! Inexact Newton iteration with deflated inner solves.

use num_complex::Complex64 as C64;

use crate::deflation::DeflationProjector;
use crate::dispatch::LinearSolver;
use crate::error::{Error, Result};
use crate::inner_product::{InnerProduct, Preconditioned, norm};
use crate::krylov::KrylovConfig;
use crate::operator::{ComplexOperator, LinearOperator, apply};
use crate::orthogonalize::{orthogonalize, qr};
use crate::ritz::ritz;
use crate::vector::{axpy, scaled, zeros};
use crate::warning::{SolverWarning, emit};

use super::result::{NewtonResult, NewtonStatus};
use super::types::{NewtonConfig, SYMMETRY_DROP_TOL, SymmetryGenerator};

/// The nonlinear problem `F(x) = 0` seen by the Newton driver.
pub trait ModelEvaluator {
    /// `F(x)`.
    fn compute_residual(&self, x: &[C64]) -> Vec<C64>;

    /// Jacobian `F'(x)`, self-adjoint under [`inner_product`](Self::inner_product)
    /// when MINRES or CG is used.
    fn jacobian(&self, x: &[C64]) -> Result<LinearOperator>;

    /// Preconditioner `M(x)` approximating the Jacobian.
    fn preconditioner(&self, _x: &[C64]) -> Result<Option<LinearOperator>> {
        Ok(None)
    }

    /// Inverse of [`preconditioner`](Self::preconditioner); this is what the
    /// Krylov solver applies.
    fn preconditioner_inverse(&self, _x: &[C64]) -> Result<Option<LinearOperator>> {
        Ok(None)
    }

    /// Inner product of the state space.
    fn inner_product(&self) -> &dyn InnerProduct;

    /// Free energy of a state, for diagnostics.
    fn energy(&self, x: &[C64]) -> f64;

    /// Set the model's continuation parameter.
    fn set_parameter(&mut self, value: f64);
}

/// Symmetry direction at `x`, normalized and orthogonalized against `w`
/// under `m_inner`. `None` if it lies (numerically) in `span(W)`.
fn symmetry_direction(
    generator: &SymmetryGenerator,
    x: &[C64],
    w: &[Vec<C64>],
    ip: &dyn InnerProduct,
    m: Option<&dyn ComplexOperator>,
    m_inner: &dyn InnerProduct,
) -> Result<Option<Vec<C64>>> {
    let u = generator.generate(x);
    let nrm = norm(ip, &u, Some(&apply(m, &u)))?;
    if nrm == 0.0 {
        return Ok(None);
    }
    let u = orthogonalize(scaled(&u, nrm), w, m_inner);
    let nrm = norm(ip, &u, Some(&apply(m, &u)))?;
    if nrm > SYMMETRY_DROP_TOL {
        Ok(Some(scaled(&u, nrm)))
    } else {
        Ok(None)
    }
}

/// Solve `F(x) = 0` by inexact Newton, starting from `x0`.
///
/// Each step solves `J dx = -F(x)` to the relative tolerance given by the
/// forcing term. With a symmetry generator or `recycle_dimension > 0` the
/// inner solve is deflated: the basis `W` (recycled Ritz vectors plus the
/// symmetry direction) is orthonormalized in the preconditioner inner
/// product and installed through a [`DeflationProjector`] as the right
/// preconditioner. Ritz vectors are recycled from MINRES and GMRES runs;
/// CG keeps no basis and sees the deflation space only through the adapted
/// initial guess.
///
/// Not reaching `nonlinear_tol` within `max_iter` steps is reported through
/// [`NewtonResult::status`], not as an error.
pub fn newton(
    x0: &[C64],
    model: &dyn ModelEvaluator,
    config: &NewtonConfig,
) -> Result<NewtonResult> {
    let n = x0.len();
    let ip = model.inner_product();
    let recycle = config.recycle_dimension > 0 && config.solver.supports_basis();
    if config.recycle_dimension > 0 && !recycle {
        log::warn!(
            "{} keeps no Krylov basis, running without subspace recycling",
            config.solver
        );
    }
    let linear_max_iter = config.linear_iteration_cap(n);

    let mut x = x0.to_vec();
    let mut fx = model.compute_residual(&x);
    if fx.len() != n {
        return Err(Error::DimensionMismatch {
            expected: n,
            actual: fx.len(),
        });
    }
    let mut residual_norms = vec![norm(ip, &fx, None)?];
    let mut linear_residual_histories = Vec::new();
    let mut forcing_terms = Vec::new();
    let mut deflation_dimensions = Vec::new();
    let mut warnings = Vec::new();

    let mut eta_prev = None;
    let mut last_linear_relres = None;
    let mut recycled: Vec<Vec<C64>> = Vec::new();
    let mut k = 0;

    log::debug!("Newton step 0: ||F|| = {:e}", residual_norms[0]);

    while k < config.max_iter && residual_norms[k] > config.nonlinear_tol {
        let eta = config
            .forcing
            .eta(eta_prev, &residual_norms, last_linear_relres);
        eta_prev = Some(eta);
        forcing_terms.push(eta);

        let jacobian = model.jacobian(&x)?;
        let (m, m_inv) = if config.use_preconditioner {
            (model.preconditioner(&x)?, model.preconditioner_inverse(&x)?)
        } else {
            (None, None)
        };
        let m_ref = m.as_ref().map(|op| op as &dyn ComplexOperator);
        let m_inv_ref = m_inv.as_ref().map(|op| op as &dyn ComplexOperator);
        let m_inner = Preconditioned::new(ip, m_ref);

        // Deflation space for this step
        let factorization = qr(&recycled, &m_inner);
        warnings.extend(factorization.warnings);
        let mut w = factorization.q;
        if let Some(generator) = &config.symmetry_generator {
            if let Some(u) = symmetry_direction(generator, &x, &w, ip, m_ref, &m_inner)? {
                w.push(u);
            }
        }
        let aw = jacobian.apply_block(&w);

        let projector = if w.is_empty() {
            None
        } else {
            match DeflationProjector::new(&w, &aw, ip) {
                Ok(projector) => Some(projector),
                Err(Error::SingularMatrix) => {
                    emit(
                        &mut warnings,
                        SolverWarning::SingularDeflationSpace { newton_step: k },
                    );
                    None
                }
                Err(e) => return Err(e),
            }
        };
        deflation_dimensions.push(projector.as_ref().map_or(0, DeflationProjector::rank));
        if projector.is_some() && config.solver == LinearSolver::Cg {
            log::debug!("Newton step {k}: CG uses the deflation space for the initial guess only");
        }

        let rhs: Vec<C64> = fx.iter().map(|v| -v).collect();
        let x_init = match &projector {
            Some(p) => p.initial_guess(&rhs, &zeros(n)),
            None => zeros(n),
        };

        let krylov = KrylovConfig::default()
            .with_tol(eta)
            .with_max_iter(linear_max_iter)
            .with_preconditioner(m_inv_ref)
            .with_right_preconditioner(projector.as_ref().map(|p| p as &dyn ComplexOperator))
            .with_inner_product(ip)
            .with_return_basis(recycle)
            .with_full_reortho(config.full_reortho);
        let out = config.solver.solve(&jacobian, &rhs, &x_init, &krylov)?;
        warnings.extend(out.warnings.iter().cloned());
        if !out.converged {
            emit(
                &mut warnings,
                SolverWarning::LinearSolverNotConverged {
                    newton_step: k,
                    info: out.info_code(),
                },
            );
        }

        recycled = match (&out.basis, recycle) {
            (Some(basis), true) => {
                let empty: &[Vec<C64>] = &[];
                let (rw, raw) = if projector.is_some() {
                    (&w[..], &aw[..])
                } else {
                    (empty, empty)
                };
                let pairs = ritz(rw, raw, basis, m_inv_ref, ip)?;
                warnings.extend(pairs.warnings.iter().cloned());
                pairs.leading_vectors(config.recycle_dimension)
            }
            _ => Vec::new(),
        };

        axpy(C64::new(1.0, 0.0), &out.x, &mut x);
        fx = model.compute_residual(&x);
        residual_norms.push(norm(ip, &fx, None)?);
        last_linear_relres = Some(out.final_relres());
        k += 1;

        log::debug!(
            "Newton step {k}: ||F|| = {:e}, eta = {eta:e}, {} {} iterations, deflation dimension {}, energy {:e}",
            residual_norms[k],
            out.iterations,
            config.solver,
            deflation_dimensions[k - 1],
            model.energy(&x)
        );
        linear_residual_histories.push(out.relres_history);
    }

    let status = if residual_norms[k] <= config.nonlinear_tol {
        log::info!(
            "Newton converged in {k} steps, ||F|| = {:e}",
            residual_norms[k]
        );
        NewtonStatus::Converged
    } else {
        log::warn!(
            "Newton did not converge in {k} steps, ||F|| = {:e} > {:e}",
            residual_norms[k],
            config.nonlinear_tol
        );
        NewtonStatus::MaxIterReached
    };

    Ok(NewtonResult {
        x,
        status,
        iterations: k,
        residual_norms,
        linear_residual_histories,
        forcing_terms,
        deflation_dimensions,
        warnings,
    })
}
