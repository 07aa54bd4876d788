//! Non-fatal numerical diagnostics.
//!
//! Loss of orthogonality, slightly indefinite quadratic forms and residual
//! mismatches reduce accuracy but do not invalidate a result. They are logged
//! through the `log` facade and collected as [`SolverWarning`] values in every
//! result struct.

use std::fmt;

/// A non-fatal condition detected during a solve.
#[derive(Debug, Clone, PartialEq)]
pub enum SolverWarning {
    /// A new basis vector overlapped a stored one by more than the reorthogonalization threshold.
    OrthogonalityLoss { iteration: usize, overlap: f64 },
    /// A quantity that must be real under a self-adjoint operator had an imaginary part.
    SelfAdjointness { iteration: usize, imag: f64 },
    /// `<z, Mz>` was negative and was clamped to zero.
    NegativeQuadraticForm { iteration: usize, value: f64 },
    /// The updated residual dropped below tolerance but the explicit one did not.
    ResidualMismatch { iteration: usize, explicit: f64, updated: f64, tol: f64 },
    /// The iteration budget was exhausted above tolerance.
    NoConvergence { iteration: usize, explicit: f64, updated: f64, tol: f64 },
    /// A QR diagonal entry `<q, q>` had a significant imaginary part.
    QrDiagonalImaginary { column: usize, imag: f64 },
    /// A QR diagonal entry `<q, q>` was negative.
    QrDiagonalNegative { column: usize, value: f64 },
    /// A Ritz residual quadratic form had an imaginary part.
    RitzResidualImaginary { index: usize, imag: f64 },
    /// A Ritz residual quadratic form was negative.
    RitzResidualNegative { index: usize, value: f64 },
    /// The linear solve inside a Newton step did not reach its tolerance.
    LinearSolverNotConverged { newton_step: usize, info: i32 },
    /// The deflation Gram matrix was singular; the step ran without deflation.
    SingularDeflationSpace { newton_step: usize },
}

impl fmt::Display for SolverWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OrthogonalityLoss { iteration, overlap } => write!(
                f,
                "iter {iteration}: |<v_i, z>| = {overlap:e} > 1e-9, the Krylov basis has become linearly dependent"
            ),
            Self::SelfAdjointness { iteration, imag } => {
                write!(f, "iter {iteration}: imaginary part {imag:e} of a self-adjoint quantity")
            }
            Self::NegativeQuadraticForm { iteration, value } => {
                write!(f, "iter {iteration}: <z, Mz> = {value:e} < 0, clamped to 0")
            }
            Self::ResidualMismatch { iteration, explicit, updated, tol } => write!(
                f,
                "iter {iteration}: updated residual is below tolerance, explicit residual is not \
                 (explicit = {explicit:e} > tol = {tol:e} >= updated = {updated:e})"
            ),
            Self::NoConvergence { iteration, explicit, updated, tol } => write!(
                f,
                "iter {iteration}: no convergence, explicit residual = {explicit:e} >= tol = {tol:e} \
                 in last iteration (updated residual = {updated:e})"
            ),
            Self::QrDiagonalImaginary { column, imag } => {
                write!(f, "qr: R[{column},{column}].imag = {imag:e} > 1e-10")
            }
            Self::QrDiagonalNegative { column, value } => {
                write!(f, "qr: R[{column},{column}].real = {value:e} < -1e-14")
            }
            Self::RitzResidualImaginary { index, imag } => write!(
                f,
                "ritz pair {index}: residual form has imaginary part {imag:e} > 1e-13, \
                 is the preconditioner solved exactly enough?"
            ),
            Self::RitzResidualNegative { index, value } => write!(
                f,
                "ritz pair {index}: residual form = {value:e} < -1e-10, \
                 is the preconditioner solved exactly enough?"
            ),
            Self::LinearSolverNotConverged { newton_step, info } => {
                write!(f, "newton step {newton_step}: linear solver returned info = {info}")
            }
            Self::SingularDeflationSpace { newton_step } => write!(
                f,
                "newton step {newton_step}: singular deflation matrix, solving without deflation"
            ),
        }
    }
}

/// Log a warning and record it.
pub(crate) fn emit(warnings: &mut Vec<SolverWarning>, warning: SolverWarning) {
    log::warn!("{warning}");
    warnings.push(warning);
}
