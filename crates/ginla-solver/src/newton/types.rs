//! Configuration types for the Newton driver.

use std::fmt;

use num_complex::Complex64 as C64;

use super::forcing::{Forcing, ForcingTerm};
use crate::dispatch::LinearSolver;

/// Memory ceiling for the retained Krylov bases `V` and `P` (0.5 GiB).
pub const DEFAULT_MAX_BASIS_BYTES: usize = 1 << 29;

/// Bytes per stored complex scalar.
pub const SCALAR_BYTES: usize = 16;

/// A symmetry-generated direction whose M-norm after orthogonalization is
/// below this is considered redundant and is not added to the deflation space.
pub const SYMMETRY_DROP_TOL: f64 = 1e-10;

/// Generator of a known near-null direction of the Jacobian.
#[derive(Clone, Copy)]
pub enum SymmetryGenerator {
    /// `x -> i x`, the generator of a U(1) phase invariance.
    Phase,
    /// Any other generator.
    Custom(fn(&[C64]) -> Vec<C64>),
}

impl SymmetryGenerator {
    pub fn generate(&self, x: &[C64]) -> Vec<C64> {
        match self {
            Self::Phase => x.iter().map(|v| C64::i() * v).collect(),
            Self::Custom(f) => f(x),
        }
    }
}

impl fmt::Debug for SymmetryGenerator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Phase => f.write_str("Phase"),
            Self::Custom(_) => f.write_str("Custom"),
        }
    }
}

/// Newton driver configuration.
#[derive(Debug, Clone)]
pub struct NewtonConfig {
    /// Stop when `||F(x)|| <= nonlinear_tol`.
    pub nonlinear_tol: f64,
    /// Outer iteration budget.
    pub max_iter: usize,
    pub solver: LinearSolver,
    /// Inner iteration cap; `None` means the problem dimension.
    pub linear_max_iter: Option<usize>,
    pub forcing: Forcing,
    /// Use the model's preconditioner (and its inverse) in the inner solve.
    pub use_preconditioner: bool,
    pub symmetry_generator: Option<SymmetryGenerator>,
    /// Number of Ritz vectors recycled into the next step; 0 disables recycling.
    pub recycle_dimension: usize,
    /// Memory ceiling for retained Krylov bases while recycling.
    pub max_basis_bytes: usize,
    pub full_reortho: bool,
}

impl Default for NewtonConfig {
    fn default() -> Self {
        Self {
            nonlinear_tol: 1e-10,
            max_iter: 20,
            solver: LinearSolver::Minres,
            linear_max_iter: None,
            forcing: Forcing::default(),
            use_preconditioner: false,
            symmetry_generator: None,
            recycle_dimension: 0,
            max_basis_bytes: DEFAULT_MAX_BASIS_BYTES,
            full_reortho: false,
        }
    }
}

impl NewtonConfig {
    pub fn with_tol(mut self, tol: f64) -> Self {
        self.nonlinear_tol = tol;
        self
    }

    pub fn with_max_iter(mut self, max_iter: usize) -> Self {
        self.max_iter = max_iter;
        self
    }

    pub fn with_solver(mut self, solver: LinearSolver) -> Self {
        self.solver = solver;
        self
    }

    pub fn with_linear_max_iter(mut self, max_iter: usize) -> Self {
        self.linear_max_iter = Some(max_iter);
        self
    }

    pub fn with_forcing(mut self, forcing: Forcing) -> Self {
        self.forcing = forcing;
        self
    }

    pub fn with_forcing_term(mut self, policy: ForcingTerm) -> Self {
        self.forcing.policy = policy;
        self
    }

    pub fn with_preconditioner(mut self, use_preconditioner: bool) -> Self {
        self.use_preconditioner = use_preconditioner;
        self
    }

    pub fn with_symmetry_generator(mut self, generator: SymmetryGenerator) -> Self {
        self.symmetry_generator = Some(generator);
        self
    }

    pub fn with_recycle_dimension(mut self, k: usize) -> Self {
        self.recycle_dimension = k;
        self
    }

    /// Inner iteration cap for a problem of dimension `n`.
    ///
    /// While recycling, the two retained bases of `max_iter` vectors each
    /// must fit in `max_basis_bytes`.
    pub fn linear_iteration_cap(&self, n: usize) -> usize {
        let cap = self.linear_max_iter.unwrap_or(n);
        if self.recycle_dimension > 0 && n > 0 {
            let by_memory = self.max_basis_bytes / (2 * SCALAR_BYTES * n);
            cap.min(by_memory.max(1))
        } else {
            cap
        }
    }
}
