//! Newton-Krylov solver with deflation for complex-valued nonlinear
//! problems such as discretized Ginzburg-Landau equations.
//!
//! The crate provides:
//!
//! - Inner products and operators over complex vectors ([`inner_product`],
//!   [`operator`], [`sparse_operator`], [`linear`])
//! - Krylov solvers with preconditioning and basis retention ([`krylov`]:
//!   CG, MINRES, GMRES) and a name-based selector ([`dispatch`])
//! - Deflation ([`deflation`]) and Ritz extraction ([`ritz`]) for recycling
//!   Krylov information across solves
//! - The inexact Newton driver ([`newton`])
//! - A Jacobi-Davidson eigensolver ([`jacobi_davidson`])
//!
//! Numerical trouble that does not invalidate a result is reported as
//! [`SolverWarning`] values and through the `log` facade.

pub mod deflation;
pub mod dispatch;
pub mod error;
pub mod givens;
pub mod inner_product;
pub mod jacobi_davidson;
pub mod krylov;
pub mod linear;
pub mod newton;
pub mod operator;
pub mod orthogonalize;
pub mod ritz;
pub mod sparse_operator;
pub mod timing;
pub mod vector;
pub mod warning;

pub use num_complex::Complex64 as C64;

pub use deflation::DeflationProjector;
pub use dispatch::LinearSolver;
pub use error::{Error, Result};
pub use inner_product::{Euclidean, InnerProduct, Preconditioned, RealPart, Weighted, norm};
pub use jacobi_davidson::{JacobiDavidsonConfig, JacobiDavidsonResult, jacobi_davidson};
pub use krylov::{KrylovBasis, KrylovConfig, KrylovResult, cg, gmres, minres};
pub use linear::SparseLu;
pub use newton::{
    Forcing, ForcingTerm, ModelEvaluator, NewtonConfig, NewtonResult, NewtonStatus,
    SymmetryGenerator, newton,
};
pub use operator::{ComplexOperator, LinearOperator};
pub use orthogonalize::{QrFactorization, orthogonalize, qr};
pub use ritz::{RitzPair, RitzResult, ritz};
pub use sparse_operator::SparseOperator;
pub use timing::{NullTimer, Phase, PhaseTimer, TimingSink};
pub use warning::SolverWarning;
