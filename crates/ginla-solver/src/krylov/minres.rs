//! Preconditioned MINRES.
//!
//! Solves `M Ml A Mr y = M Ml b`, `x = x0 + Mr y`, where `Ml A Mr` is
//! self-adjoint under the inner product and `M` is self-adjoint positive
//! definite. The Lanczos process runs with the operator `M Ml A Mr` and the
//! inner product `<M^-1 x, y>`; its start vector is `M Ml (b - A x0)` (`Mr`
//! is not applied to it).
//!
//! The tridiagonal Lanczos matrix is QR-factorized on the fly with two
//! rolling Givens rotations, so only the last two Lanczos vectors and two
//! search directions are kept unless `return_basis` or `full_reortho` asks
//! for the whole basis.

use std::time::Instant;

use nalgebra::DMatrix;
use num_complex::Complex64 as C64;
use num_traits::Zero;

use super::{KrylovBasis, KrylovConfig, KrylovResult, check_dimensions};
use crate::error::Result;
use crate::givens::{Givens, givens};
use crate::inner_product::norm;
use crate::operator::{ComplexOperator, apply};
use crate::timing::Phase;
use crate::vector::{add, axpy, scaled, sub, zeros};
use crate::warning::{SolverWarning, emit};

/// Overlap with a stored Lanczos vector that signals loss of orthogonality.
const REORTHO_WARN: f64 = 1e-9;
/// Bound on imaginary parts of quantities that must be real.
const IMAG_WARN: f64 = 1e-12;

/// Solve `A x = b` with MINRES for `Ml A Mr` self-adjoint.
pub fn minres(
    a: &dyn ComplexOperator,
    b: &[C64],
    x0: &[C64],
    config: &KrylovConfig,
) -> Result<KrylovResult> {
    let start = Instant::now();
    let n = check_dimensions(a, b, x0)?;
    let ip = config.inner_product;
    let tol = config.tol;
    let max_iter = config.max_iter_for(n);
    let keep_basis = config.return_basis || config.full_reortho;
    let mut warnings = Vec::new();

    // M-norm of M*Ml*b
    let mlb = apply(config.ml, b);
    let mmlb = apply(config.m, &mlb);
    let norm_mmlb = norm(ip, &mlb, Some(&mmlb))?;
    if norm_mmlb == 0.0 {
        return Ok(KrylovResult::zero_rhs(n));
    }

    let r0 = sub(b, &a.matvec(x0));
    let mlr0 = apply(config.ml, &r0);
    let mmlr0 = apply(config.m, &mlr0);
    let norm_mmlr0 = norm(ip, &mlr0, Some(&mmlr0))?;

    let mut relres = Vec::with_capacity(max_iter + 1);
    relres.push(norm_mmlr0 / norm_mmlb);

    let mut errors = match config.exact_solution {
        Some(xe) => Some(vec![norm(ip, &sub(xe, x0), None)?]),
        None => None,
    };

    if norm_mmlr0 == 0.0 {
        return Ok(KrylovResult {
            x: x0.to_vec(),
            converged: true,
            iterations: 0,
            relres_history: relres,
            updated_residual: None,
            error_history: errors,
            basis: None,
            warnings,
        });
    }

    let v0 = scaled(&mmlr0, norm_mmlr0);
    let p0 = scaled(&mlr0, norm_mmlr0);

    let mut v_full: Vec<Vec<C64>> = Vec::new();
    let mut p_full: Vec<Vec<C64>> = Vec::new();
    let mut diag: Vec<f64> = Vec::new();
    let mut offdiag: Vec<f64> = Vec::new();
    if keep_basis {
        v_full.push(v0.clone());
        p_full.push(p0.clone());
    }

    // Current Lanczos vector, and the last one of P, with V = M * P.
    let mut v_cur = v0;
    let mut p_prev = zeros(n);
    let mut p_cur = p0;
    // Search directions for the update of y_k.
    let mut w_prev = zeros(n);
    let mut w_cur = zeros(n);

    // Off-diagonal entry of the previous step (zero before the first step).
    let mut ts = 0.0_f64;
    // First entry is the updated residual.
    let mut y = [C64::new(norm_mmlr0, 0.0), C64::zero()];
    let mut g_old = Givens::identity();
    let mut g_cur = Givens::identity();

    let mut yk = zeros(n);
    let mut xk = x0.to_vec();
    let mut updated_residual = None;

    config.timer.record(Phase::Setup, start.elapsed());

    let mut k = 0;
    while relres[k] > tol && k < max_iter {
        // Lanczos
        let start = Instant::now();
        let ts_old = ts;
        let mut z = apply(config.ml, &a.matvec(&apply(config.mr, &v_cur)));
        config.timer.record(Phase::ApplyOperator, start.elapsed());

        let start = Instant::now();
        axpy(C64::new(-ts_old, 0.0), &p_prev, &mut z);
        let td = ip.dot(&v_cur, &z);
        if td.im.abs() > IMAG_WARN {
            emit(
                &mut warnings,
                SolverWarning::SelfAdjointness {
                    iteration: k + 1,
                    imag: td.im.abs(),
                },
            );
        }
        let td = td.re;
        axpy(C64::new(-td, 0.0), &p_cur, &mut z);
        config.timer.record(Phase::Lanczos, start.elapsed());

        let start = Instant::now();
        if config.full_reortho {
            for _ in 0..2 {
                for (vi, pi) in v_full.iter().zip(p_full.iter()) {
                    let h = ip.dot(vi, &z);
                    if h.norm() > REORTHO_WARN {
                        emit(
                            &mut warnings,
                            SolverWarning::OrthogonalityLoss {
                                iteration: k + 1,
                                overlap: h.norm(),
                            },
                        );
                    }
                    axpy(-h, pi, &mut z);
                }
            }
        }
        config.timer.record(Phase::Reorthogonalize, start.elapsed());

        // Previous rotation applied to the new column [0, ts_old, td, ts]
        let (r0, r1) = g_old.apply(C64::zero(), C64::new(ts_old, 0.0));
        let mut col = [r0, r1, C64::zero(), C64::zero()];

        // Apply the preconditioner.
        let start = Instant::now();
        let v = apply(config.m, &z);
        let alpha = ip.dot(&z, &v);
        if alpha.im.abs() > IMAG_WARN {
            emit(
                &mut warnings,
                SolverWarning::SelfAdjointness {
                    iteration: k + 1,
                    imag: alpha.im.abs(),
                },
            );
        }
        let mut alpha = alpha.re;
        if alpha < 0.0 {
            emit(
                &mut warnings,
                SolverWarning::NegativeQuadraticForm {
                    iteration: k + 1,
                    value: alpha,
                },
            );
            alpha = 0.0;
        }
        ts = alpha.sqrt();
        config.timer.record(Phase::ApplyPreconditioner, start.elapsed());

        let start = Instant::now();
        let (p_next, v_next) = if ts > 0.0 {
            (scaled(&z, ts), scaled(&v, ts))
        } else {
            (zeros(n), zeros(n))
        };
        p_prev = std::mem::replace(&mut p_cur, p_next);
        let v_prev = std::mem::replace(&mut v_cur, v_next);
        config.timer.record(Phase::ExtendBasis, start.elapsed());

        let start = Instant::now();
        if keep_basis {
            v_full.push(v_cur.clone());
            p_full.push(p_cur.clone());
            diag.push(td);
            offdiag.push(ts);
        }
        config.timer.record(Phase::StoreBasis, start.elapsed());

        // Implicit update of the QR factorization of the Lanczos matrix.
        let start = Instant::now();
        col[2] = C64::new(td, 0.0);
        col[3] = C64::new(ts, 0.0);
        (col[1], col[2]) = g_cur.apply(col[1], col[2]);
        g_old = g_cur;
        g_cur = givens(col[2], col[3]);
        col[2] = C64::new(g_cur.r, 0.0);
        col[3] = C64::zero();
        (y[0], y[1]) = g_cur.apply(y[0], y[1]);
        config.timer.record(Phase::ImplicitQr, start.elapsed());

        // Update the solution.
        let start = Instant::now();
        let mut d = v_prev;
        axpy(-col[0], &w_prev, &mut d);
        axpy(-col[1], &w_cur, &mut d);
        for di in d.iter_mut() {
            *di /= col[2];
        }
        axpy(y[0], &d, &mut yk);
        w_prev = std::mem::replace(&mut w_cur, d);
        y = [y[1], C64::zero()];
        config.timer.record(Phase::UpdateSolution, start.elapsed());

        // Update the residual.
        let start = Instant::now();
        let explicit_norm = |yk: &[C64]| -> Result<(Vec<C64>, f64)> {
            let xk = add(x0, &apply(config.mr, yk));
            let r = apply(config.ml, &sub(b, &a.matvec(&xk)));
            // Normalize before applying the preconditioner so the norm
            // cannot underflow to an exact zero.
            let r = scaled(&r, norm_mmlb);
            let mr = apply(config.m, &r);
            let nrm = norm(ip, &r, Some(&mr))?;
            Ok((xk, nrm))
        };

        if let (Some(errors), Some(xe)) = (errors.as_mut(), config.exact_solution) {
            xk = add(x0, &apply(config.mr, &yk));
            errors.push(norm(ip, &sub(xe, &xk), None)?);
        }

        if config.explicit_residual {
            let (x_new, nrm) = explicit_norm(&yk)?;
            xk = x_new;
            relres.push(nrm);
        } else {
            relres.push(y[0].norm() / norm_mmlb);
        }

        if relres[k + 1] <= tol || k + 1 == max_iter {
            let norm_r_upd = relres[k + 1];
            if !config.explicit_residual {
                let (x_new, nrm) = explicit_norm(&yk)?;
                xk = x_new;
                relres[k + 1] = nrm;
                updated_residual = Some(norm_r_upd);
            }
            if relres[k + 1] > tol {
                if k + 1 == max_iter {
                    emit(
                        &mut warnings,
                        SolverWarning::NoConvergence {
                            iteration: k + 1,
                            explicit: relres[k + 1],
                            updated: norm_r_upd,
                            tol,
                        },
                    );
                } else {
                    emit(
                        &mut warnings,
                        SolverWarning::ResidualMismatch {
                            iteration: k + 1,
                            explicit: relres[k + 1],
                            updated: norm_r_upd,
                            tol,
                        },
                    );
                }
            }
        }
        config.timer.record(Phase::UpdateResidual, start.elapsed());

        // An exact zero is an artifact; floor at machine precision.
        relres[k + 1] = relres[k + 1].max(f64::EPSILON);
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

    let basis = config.return_basis.then(|| {
        let h = DMatrix::from_fn(k + 1, k, |i, j| {
            if i == j {
                C64::new(diag[j], 0.0)
            } else if i == j + 1 {
                C64::new(offdiag[j], 0.0)
            } else if j == i + 1 {
                C64::new(offdiag[i], 0.0)
            } else {
                C64::zero()
            }
        });
        v_full.truncate(k + 1);
        p_full.truncate(k + 1);
        KrylovBasis {
            v: v_full,
            p: Some(p_full),
            h,
        }
    });

    log::debug!(
        "MINRES: {k} iterations, relres = {:e}",
        relres.last().copied().unwrap_or(0.0)
    );

    Ok(KrylovResult {
        x: xk,
        converged,
        iterations: k,
        relres_history: relres,
        updated_residual,
        error_history: errors,
        basis,
        warnings,
    })
}
