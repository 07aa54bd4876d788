//! Error types for the Newton-Krylov solvers.
//!
//! Only conditions that indicate a wrong mathematical setup are errors.
//! Slow or failed convergence is reported through the result structs
//! (`converged`, `info_code()`, `error_code()`) and never through [`Error`].

use thiserror::Error;

/// Errors that abort a solve.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    /// A quadratic form <x, Mx> was negative or had a significant imaginary part.
    #[error("<x,Mx> = {re} + {im}i: M not positive definite?")]
    NotPositiveDefinite { re: f64, im: f64 },

    /// An operator representation that cannot be applied as a square linear map.
    #[error("Unsupported operator: {0}")]
    UnsupportedOperatorKind(String),

    /// Vector or operator dimensions do not agree.
    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// A small dense or sparse system could not be factorized.
    #[error("Singular matrix")]
    SingularMatrix,

    /// Forcing term policy name not recognized.
    #[error("Unknown forcing term '{0}'")]
    UnknownForcingTerm(String),

    /// Linear solver name not recognized.
    #[error("Unknown linear solver '{0}'")]
    UnknownLinearSolver(String),

    /// The Hermitian eigensolver did not converge.
    #[error("Eigendecomposition failed: {0}")]
    EigenDecomposition(String),

    /// The search subspace collapsed.
    #[error("Breakdown at iteration {iteration}: {reason}")]
    Breakdown { iteration: usize, reason: String },
}

/// Result type for solver operations.
pub type Result<T> = std::result::Result<T, Error>;
