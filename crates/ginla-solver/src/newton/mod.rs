//! Inexact Newton driver with deflated Krylov inner solves.
//!
//! Each Newton step solves the correction equation `J(x) dx = -F(x)` only
//! as accurately as the forcing term asks for. Known near-null directions
//! of the Jacobian (the generator of a continuous symmetry) and Ritz vectors
//! recycled from the previous step are deflated out of the inner MINRES
//! iteration.
//!
//! # Module Structure
//!
//! - [`types`] - Configuration and symmetry generators
//! - [`forcing`] - Forcing term policies
//! - [`result`] - Result types
//! - [`solver`] - The model evaluator trait and the Newton loop

pub mod forcing;
pub mod result;
pub mod solver;
pub mod types;

// Re-export main types and functions
pub use forcing::{Forcing, ForcingTerm, GOLDEN_RATIO};
pub use result::{NewtonResult, NewtonStatus};
pub use solver::{ModelEvaluator, newton};
pub use types::{DEFAULT_MAX_BASIS_BYTES, NewtonConfig, SYMMETRY_DROP_TOL, SymmetryGenerator};
