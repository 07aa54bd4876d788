//! Preconditioned GMRES (full Arnoldi, no restarts).
//!
//! Solves `M Ml A Mr y = M Ml b`, `x = x0 + Mr y` for general `A`. The
//! Arnoldi basis is orthogonalized with modified Gram-Schmidt against every
//! previous vector under the inner product `<M^-1 x, y>`, and the Hessenberg
//! matrix is reduced to triangular form with one new Givens rotation per
//! step.
//!
//! Memory grows by one basis vector per iteration, two when `M` is given.

use nalgebra::DMatrix;
use num_complex::Complex64 as C64;
use num_traits::Zero;

use super::{KrylovBasis, KrylovConfig, KrylovResult, check_dimensions};
use crate::error::Result;
use crate::givens::{Givens, givens};
use crate::inner_product::norm;
use crate::operator::{ComplexOperator, apply};
use crate::vector::{add, axpy, combine, scaled, sub, zeros};
use crate::warning::{SolverWarning, emit};

/// Back substitution on the leading `k x k` triangle of the rotated
/// Hessenberg matrix, then `x0 + Mr V[..k] y`.
fn explicit_xk(
    h: &[Vec<C64>],
    v: &[Vec<C64>],
    g: &[C64],
    k: usize,
    x0: &[C64],
    mr: Option<&dyn ComplexOperator>,
) -> Vec<C64> {
    let mut y = vec![C64::zero(); k];
    for i in (0..k).rev() {
        let mut sum = g[i];
        for j in (i + 1)..k {
            sum -= h[j][i] * y[j];
        }
        if h[i][i].norm() > 1e-30 {
            y[i] = sum / h[i][i];
        }
    }
    let u = combine(&v[..k], &y, x0.len());
    add(x0, &apply(mr, &u))
}

/// Solve `A x = b` with GMRES.
pub fn gmres(
    a: &dyn ComplexOperator,
    b: &[C64],
    x0: &[C64],
    config: &KrylovConfig,
) -> Result<KrylovResult> {
    let n = check_dimensions(a, b, x0)?;
    let ip = config.inner_product;
    let tol = config.tol;
    let max_iter = config.max_iter_for(n);
    let mut warnings = Vec::new();

    let mlb = apply(config.ml, b);
    let mmlb = apply(config.m, &mlb);
    let norm_mmlb = norm(ip, &mlb, Some(&mmlb))?;
    if norm_mmlb == 0.0 {
        return Ok(KrylovResult::zero_rhs(n));
    }

    // A zero initial guess reuses M*Ml*b.
    let norm_x0 = norm(ip, x0, None)?;
    let (x0, mlr0, mmlr0, norm_mmlr0) = if norm_x0 > f64::EPSILON {
        let r0 = sub(b, &a.matvec(x0));
        let mlr0 = apply(config.ml, &r0);
        let mmlr0 = apply(config.m, &mlr0);
        let nrm = norm(ip, &mlr0, Some(&mmlr0))?;
        (x0.to_vec(), mlr0, mmlr0, nrm)
    } else {
        (zeros(n), mlb, mmlb, norm_mmlb)
    };

    let mut relres = Vec::with_capacity(max_iter + 1);
    relres.push(norm_mmlr0 / norm_mmlb);

    let mut errors = match config.exact_solution {
        Some(xe) => Some(vec![norm(ip, &sub(&x0, xe), None)?]),
        None => None,
    };

    if norm_mmlr0 == 0.0 {
        return Ok(KrylovResult {
            x: x0,
            converged: true,
            iterations: 0,
            relres_history: relres,
            updated_residual: None,
            error_history: errors,
            basis: None,
            warnings,
        });
    }

    // Arnoldi basis V = M * P.
    let mut v: Vec<Vec<C64>> = vec![scaled(&mmlr0, norm_mmlr0)];
    let mut p: Option<Vec<Vec<C64>>> = config.m.map(|_| vec![scaled(&mlr0, norm_mmlr0)]);
    // Columns of the (rotated) Hessenberg matrix.
    let mut h: Vec<Vec<C64>> = Vec::with_capacity(max_iter);
    let mut h_orig: Vec<Vec<C64>> = Vec::new();
    // Right-hand side of the projected least-squares problem.
    let mut g = vec![C64::zero(); max_iter + 1];
    g[0] = C64::new(norm_mmlr0, 0.0);
    let mut rotations: Vec<Givens> = Vec::with_capacity(max_iter);

    let explicit_residual = |xk: &[C64]| -> Result<f64> {
        let rk = apply(config.ml, &sub(b, &a.matvec(xk)));
        let mrk = apply(config.m, &rk);
        norm(ip, &rk, Some(&mrk))
    };

    let mut updated_residual = None;
    let mut k = 0;
    while relres[k] > tol && k < max_iter {
        let mut z = apply(config.ml, &a.matvec(&apply(config.mr, &v[k])));

        // Modified Gram-Schmidt
        let mut col = vec![C64::zero(); k + 2];
        for i in 0..=k {
            col[i] = ip.dot(&v[i], &z);
            let pi = p.as_ref().map_or(&v[i], |p| &p[i]);
            axpy(-col[i], pi, &mut z);
        }
        let mz = apply(config.m, &z);
        let h_next = norm(ip, &z, Some(&mz))?;
        col[k + 1] = C64::new(h_next, 0.0);
        if h_next > 0.0 {
            if let Some(p) = p.as_mut() {
                p.push(scaled(&z, h_next));
            }
            v.push(scaled(&mz, h_next));
        } else {
            // Invariant subspace found.
            if let Some(p) = p.as_mut() {
                p.push(zeros(n));
            }
            v.push(zeros(n));
        }
        if config.return_basis {
            h_orig.push(col.clone());
        }

        // Apply previous Givens rotations.
        for (i, rot) in rotations.iter().enumerate() {
            (col[i], col[i + 1]) = rot.apply(col[i], col[i + 1]);
        }

        // Compute and apply the new rotation.
        let rot = givens(col[k], col[k + 1]);
        (col[k], col[k + 1]) = rot.apply(col[k], col[k + 1]);
        (g[k], g[k + 1]) = rot.apply(g[k], g[k + 1]);
        rotations.push(rot);
        h.push(col);

        if config.explicit_residual {
            let xk = explicit_xk(&h, &v, &g, k + 1, &x0, config.mr);
            relres.push(explicit_residual(&xk)? / norm_mmlb);
        } else {
            relres.push(g[k + 1].norm() / norm_mmlb);
        }

        if let (Some(errors), Some(xe)) = (errors.as_mut(), config.exact_solution) {
            let xk = explicit_xk(&h, &v, &g, k + 1, &x0, config.mr);
            errors.push(norm(ip, &sub(&xk, xe), None)?);
        }

        if relres[k + 1] <= tol || k + 1 == max_iter {
            let norm_ur = relres[k + 1];
            if !config.explicit_residual {
                let xk = explicit_xk(&h, &v, &g, k + 1, &x0, config.mr);
                relres[k + 1] = explicit_residual(&xk)? / norm_mmlb;
                updated_residual = Some(norm_ur);
            }
            if relres[k + 1] > tol {
                if k + 1 == max_iter {
                    emit(
                        &mut warnings,
                        SolverWarning::NoConvergence {
                            iteration: k + 1,
                            explicit: relres[k + 1],
                            updated: norm_ur,
                            tol,
                        },
                    );
                } else {
                    emit(
                        &mut warnings,
                        SolverWarning::ResidualMismatch {
                            iteration: k + 1,
                            explicit: relres[k + 1],
                            updated: norm_ur,
                            tol,
                        },
                    );
                }
            }
        }

        k += 1;
    }

    let converged = relres[k] <= tol;
    if k == 0 && !converged {
        emit(
            &mut warnings,
            SolverWarning::NoConvergence {
                iteration: 0,
                explicit: relres[0],
                updated: relres[0],
                tol,
            },
        );
    }

    let x = explicit_xk(&h, &v, &g, k, &x0, config.mr);

    let basis = config.return_basis.then(|| {
        let hm = DMatrix::from_fn(k + 1, k, |i, j| {
            h_orig[j].get(i).copied().unwrap_or_else(C64::zero)
        });
        KrylovBasis { v, p, h: hm }
    });

    log::debug!(
        "GMRES: {k} iterations, relres = {:e}",
        relres.last().copied().unwrap_or(0.0)
    );

    Ok(KrylovResult {
        x,
        converged,
        iterations: k,
        relres_history: relres,
        updated_residual,
        error_history: errors,
        basis,
        warnings,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inner_product::{Euclidean, InnerProduct};
    use crate::operator::LinearOperator;

    fn c(re: f64, im: f64) -> C64 {
        C64::new(re, im)
    }

    #[test]
    fn gmres_rotation_plus_scaling() {
        // 2 * rotation by 60 degrees
        let (s, co) = (std::f64::consts::FRAC_PI_3.sin(), std::f64::consts::FRAC_PI_3.cos());
        let a = DMatrix::from_row_slice(2, 2, &[c(2.0 * co, 0.0), c(-2.0 * s, 0.0), c(2.0 * s, 0.0), c(2.0 * co, 0.0)]);
        let a = LinearOperator::from_dense(a).unwrap();
        let b = vec![c(1.0, 0.0), c(0.5, 0.0)];
        let x0 = vec![c(0.0, 0.0); 2];
        let config = KrylovConfig::default().with_tol(1e-12);

        let result = gmres(&a, &b, &x0, &config).unwrap();
        assert!(result.converged);
        assert!(result.iterations <= 2);

        let r = sub(&b, &a.matvec(&result.x));
        assert!(Euclidean.dot(&r, &r).re.sqrt() < 1e-10);
    }

    #[test]
    fn gmres_nonsymmetric_complex() {
        let a = DMatrix::from_row_slice(
            3,
            3,
            &[
                c(4.0, 1.0), c(1.0, 0.0), c(0.0, 0.0),
                c(0.0, 0.0), c(3.0, 0.0), c(2.0, -1.0),
                c(1.0, 0.0), c(0.0, 0.0), c(5.0, 0.0),
            ],
        );
        let a = LinearOperator::from_dense(a).unwrap();
        let x_true = vec![c(1.0, 0.0), c(0.0, 1.0), c(-1.0, 2.0)];
        let b = a.matvec(&x_true);
        let x0 = vec![c(0.0, 0.0); 3];
        let config = KrylovConfig::default()
            .with_tol(1e-12)
            .with_exact_solution(&x_true);

        let result = gmres(&a, &b, &x0, &config).unwrap();
        assert!(result.converged);
        assert!(result.iterations <= 3);
        for (xi, ti) in result.x.iter().zip(x_true.iter()) {
            assert!((xi - ti).norm() < 1e-10);
        }
        let errors = result.error_history.unwrap();
        assert_eq!(errors.len(), result.relres_history.len());
    }

    #[test]
    fn gmres_implicit_and_explicit_residuals_agree() {
        let n = 15;
        let trips: Vec<_> = (0..n)
            .flat_map(|i| {
                let mut t = vec![(i, i, c(3.0, 0.0))];
                if i + 1 < n {
                    t.push((i, i + 1, c(-1.0, 0.0)));
                    t.push((i + 1, i, c(-0.5, 0.0)));
                }
                t
            })
            .collect();
        let a = LinearOperator::from_triplets(n, &trips).unwrap();
        let b = vec![c(1.0, 0.0); n];
        let x0 = vec![c(0.1, 0.0); n];
        let tol = 1e-9;
        let result = gmres(&a, &b, &x0, &KrylovConfig::default().with_tol(tol)).unwrap();

        assert!(result.converged);
        let updated = result.updated_residual.unwrap();
        assert!((updated - result.final_relres()).abs() <= tol);
    }

    #[test]
    fn gmres_with_preconditioner_returns_basis() {
        let d = [c(2.0, 0.0), c(3.0, 0.0), c(5.0, 0.0), c(7.0, 0.0)];
        let mut a = DMatrix::from_diagonal(&nalgebra::DVector::from_column_slice(&d));
        a[(0, 3)] = c(1.0, 0.0);
        let a = LinearOperator::from_dense(a).unwrap();
        let m = LinearOperator::from_diagonal(&[c(0.5, 0.0), c(1.0, 0.0), c(1.0, 0.0), c(1.0, 0.0)]);
        let b = vec![c(1.0, 0.0); 4];
        let x0 = vec![c(0.0, 0.0); 4];
        let config = KrylovConfig::default()
            .with_tol(1e-12)
            .with_preconditioner(Some(&m))
            .with_return_basis(true);

        let result = gmres(&a, &b, &x0, &config).unwrap();
        assert!(result.converged);

        let r = sub(&b, &a.matvec(&result.x));
        assert!(Euclidean.dot(&r, &r).re.sqrt() < 1e-10);

        let basis = result.basis.unwrap();
        let k = result.iterations;
        assert_eq!(basis.v.len(), k + 1);
        assert_eq!(basis.p.as_ref().map(Vec::len), Some(k + 1));
        assert_eq!(basis.h.shape(), (k + 1, k));

        // M A V[..k] = V H
        for j in 0..k {
            let mav = m.matvec(&a.matvec(&basis.v[j]));
            let mut vh = zeros(4);
            for i in 0..=k {
                axpy(basis.h[(i, j)], &basis.v[i], &mut vh);
            }
            for (x, y) in mav.iter().zip(vh.iter()) {
                assert!((x - y).norm() < 1e-10);
            }
        }
    }

    #[test]
    fn gmres_budget_exhausted() {
        let a = LinearOperator::from_diagonal(&[c(1.0, 0.0), c(2.0, 0.0), c(3.0, 0.0), c(4.0, 0.0)]);
        let b = vec![c(1.0, 0.0); 4];
        let x0 = vec![c(0.0, 0.0); 4];
        let config = KrylovConfig::default().with_tol(1e-12).with_max_iter(2);
        let result = gmres(&a, &b, &x0, &config).unwrap();
        assert!(!result.converged);
        assert_eq!(result.info_code(), 1);
        assert_eq!(result.relres_history.len(), 3);
    }
}
