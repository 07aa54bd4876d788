//! Linear solver selection.
//!
//! The Newton driver picks its inner solver by [`LinearSolver`]; the CLI
//! parses it from a name.

use std::fmt;
use std::str::FromStr;

use num_complex::Complex64 as C64;

use crate::error::{Error, Result};
use crate::krylov::{KrylovConfig, KrylovResult, cg, gmres, minres};
use crate::operator::ComplexOperator;

/// Krylov method used for the Newton correction equation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LinearSolver {
    /// Conjugate gradients: self-adjoint positive-definite operators only.
    Cg,
    /// MINRES: self-adjoint, possibly indefinite operators.
    #[default]
    Minres,
    /// GMRES: general operators.
    Gmres,
}

impl LinearSolver {
    /// Parse a solver name (case-insensitive).
    pub fn from_name(name: &str) -> Result<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "cg" => Ok(Self::Cg),
            "minres" => Ok(Self::Minres),
            "gmres" => Ok(Self::Gmres),
            _ => Err(Error::UnknownLinearSolver(name.to_string())),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Cg => "CG",
            Self::Minres => "MINRES",
            Self::Gmres => "GMRES",
        }
    }

    /// Whether the method keeps a Krylov basis usable for Ritz extraction.
    pub fn supports_basis(self) -> bool {
        !matches!(self, Self::Cg)
    }

    /// Run the selected solver.
    pub fn solve(
        self,
        a: &dyn ComplexOperator,
        b: &[C64],
        x0: &[C64],
        config: &KrylovConfig,
    ) -> Result<KrylovResult> {
        match self {
            Self::Cg => cg(a, b, x0, config),
            Self::Minres => minres(a, b, x0, config),
            Self::Gmres => gmres(a, b, x0, config),
        }
    }
}

impl fmt::Display for LinearSolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for LinearSolver {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_name(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operator::LinearOperator;
    use crate::warning::SolverWarning;

    #[test]
    fn parse_solver_names() {
        assert_eq!(LinearSolver::from_name("cg").unwrap(), LinearSolver::Cg);
        assert_eq!(LinearSolver::from_name("MINRES").unwrap(), LinearSolver::Minres);
        assert_eq!("GMRes".parse::<LinearSolver>().unwrap(), LinearSolver::Gmres);
        assert_eq!(
            LinearSolver::from_name("bicgstab"),
            Err(Error::UnknownLinearSolver("bicgstab".into()))
        );
    }

    #[test]
    fn default_is_minres() {
        assert_eq!(LinearSolver::default(), LinearSolver::Minres);
        assert_eq!(LinearSolver::default().to_string(), "MINRES");
        assert!(!LinearSolver::Cg.supports_basis());
    }

    #[test]
    fn zero_iteration_budget_is_not_convergence() {
        let diag: Vec<C64> = [1.0, 2.0, 3.0].iter().map(|&v| C64::new(v, 0.0)).collect();
        let a = LinearOperator::from_diagonal(&diag);
        let b = vec![C64::new(1.0, 0.0); 3];
        let x0 = vec![C64::new(0.0, 0.0); 3];
        let config = KrylovConfig::default().with_tol(1e-10).with_max_iter(0);

        for solver in [LinearSolver::Cg, LinearSolver::Minres, LinearSolver::Gmres] {
            let result = solver.solve(&a, &b, &x0, &config).unwrap();
            assert!(!result.converged, "{solver}");
            assert_eq!(result.info_code(), 1, "{solver}");
            assert_eq!(result.iterations, 0);
            assert_eq!(result.relres_history, vec![1.0]);
            assert_eq!(result.x, x0);
            assert!(
                result
                    .warnings
                    .iter()
                    .any(|w| matches!(w, SolverWarning::NoConvergence { iteration: 0, .. })),
                "{solver}"
            );
        }
    }

    #[test]
    fn all_solvers_agree_on_spd_system() {
        let d = [2.0, 3.0, 4.0, 6.0];
        let diag: Vec<C64> = d.iter().map(|&v| C64::new(v, 0.0)).collect();
        let a = LinearOperator::from_diagonal(&diag);
        let b = vec![C64::new(1.0, 0.0); 4];
        let x0 = vec![C64::new(0.0, 0.0); 4];
        let config = KrylovConfig::default().with_tol(1e-12);

        for solver in [LinearSolver::Cg, LinearSolver::Minres, LinearSolver::Gmres] {
            let result = solver.solve(&a, &b, &x0, &config).unwrap();
            assert!(result.converged, "{solver} did not converge");
            for (xi, di) in result.x.iter().zip(d) {
                assert!((xi - C64::new(1.0 / di, 0.0)).norm() < 1e-10, "{solver}");
            }
        }
    }
}
