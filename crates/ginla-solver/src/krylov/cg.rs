//! Preconditioned conjugate gradients.

use num_complex::Complex64 as C64;

use super::{KrylovConfig, KrylovResult, check_dimensions};
use crate::error::Result;
use crate::inner_product::{norm, norm_squared};
use crate::operator::{ComplexOperator, apply};
use crate::vector::{axpy, sub};
use crate::warning::{SolverWarning, emit};

/// Solve `A x = b` with CG for `A` self-adjoint positive-definite under
/// `config.inner_product`.
///
/// Only the preconditioner `config.m` is used; `ml`, `mr` and
/// `return_basis` do not apply to CG.
pub fn cg(
    a: &dyn ComplexOperator,
    b: &[C64],
    x0: &[C64],
    config: &KrylovConfig,
) -> Result<KrylovResult> {
    let n = check_dimensions(a, b, x0)?;
    let ip = config.inner_product;
    let max_iter = config.max_iter_for(n);

    let mb = apply(config.m, b);
    let rho0 = norm_squared(ip, b, Some(&mb))?;
    if rho0 == 0.0 {
        return Ok(KrylovResult::zero_rhs(n));
    }

    let mut x = x0.to_vec();
    let mut r = sub(b, &a.matvec(&x));
    let mut mr = apply(config.m, &r);
    let mut rho_old = norm_squared(ip, &r, Some(&mr))?;
    let mut rho_new = rho_old;
    let mut p = mr.clone();

    let mut relres = Vec::with_capacity(max_iter + 1);
    relres.push((rho_old / rho0).sqrt());

    let mut errors = match config.exact_solution {
        Some(xe) => Some(vec![norm(ip, &sub(&x, xe), None)?]),
        None => None,
    };

    let mut updated_residual = None;
    let mut k = 0;
    while relres[k] > config.tol && k < max_iter {
        if k > 0 {
            // new search direction
            let beta = rho_new / rho_old;
            p = p
                .iter()
                .zip(mr.iter())
                .map(|(&pi, &mri)| mri + pi * beta)
                .collect();
            rho_old = rho_new;
        }

        let ap = a.matvec(&p);
        let alpha = C64::new(rho_old, 0.0) / ip.dot(&p, &ap);
        axpy(alpha, &p, &mut x);

        if let (Some(errors), Some(xe)) = (errors.as_mut(), config.exact_solution) {
            errors.push(norm(ip, &sub(&x, xe), None)?);
        }

        if config.explicit_residual {
            r = sub(b, &a.matvec(&x));
        } else {
            axpy(-alpha, &ap, &mut r);
        }

        mr = apply(config.m, &r);
        rho_new = norm_squared(ip, &r, Some(&mr))?;
        relres.push((rho_new / rho0).sqrt());

        if !config.explicit_residual && relres[k + 1] < config.tol {
            updated_residual = Some(relres[k + 1]);
            r = sub(b, &a.matvec(&x));
            mr = apply(config.m, &r);
            rho_new = norm_squared(ip, &r, Some(&mr))?;
            relres[k + 1] = (rho_new / rho0).sqrt();
        }

        k += 1;
    }

    let mut warnings = Vec::new();
    let converged = relres[k] <= config.tol;
    if !converged {
        emit(
            &mut warnings,
            SolverWarning::NoConvergence {
                iteration: k,
                explicit: relres[k],
                updated: updated_residual.unwrap_or(relres[k]),
                tol: config.tol,
            },
        );
    }

    Ok(KrylovResult {
        x,
        converged,
        iterations: k,
        relres_history: relres,
        updated_residual,
        error_history: errors,
        basis: None,
        warnings,
    })
}
