//! Result types for the Newton driver.

use num_complex::Complex64 as C64;

use crate::warning::SolverWarning;

/// Why the Newton iteration stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NewtonStatus {
    /// `||F(x)|| <= nonlinear_tol`.
    Converged,
    /// The outer iteration budget ran out first.
    MaxIterReached,
}

/// Result of a Newton solve.
#[derive(Debug, Clone)]
pub struct NewtonResult {
    /// Final iterate.
    pub x: Vec<C64>,
    pub status: NewtonStatus,
    /// Number of Newton steps taken.
    pub iterations: usize,
    /// `||F(x_k)||` for `k = 0..=iterations`.
    pub residual_norms: Vec<f64>,
    /// Relative residual history of each inner linear solve.
    pub linear_residual_histories: Vec<Vec<f64>>,
    /// Forcing term `eta_k` used in each step.
    pub forcing_terms: Vec<f64>,
    /// Deflation dimension of each step's inner solve.
    pub deflation_dimensions: Vec<usize>,
    /// Warnings from the Newton loop and all inner solves.
    pub warnings: Vec<SolverWarning>,
}

impl NewtonResult {
    pub fn converged(&self) -> bool {
        self.status == NewtonStatus::Converged
    }

    /// 0 if the final residual norm meets the tolerance, 1 otherwise.
    pub fn error_code(&self) -> i32 {
        match self.status {
            NewtonStatus::Converged => 0,
            NewtonStatus::MaxIterReached => 1,
        }
    }

    /// `||F(x)||` at the final iterate.
    pub fn final_residual(&self) -> f64 {
        self.residual_norms.last().copied().unwrap_or(f64::NAN)
    }

    /// Inner iteration count of each Newton step.
    pub fn linear_iterations(&self) -> Vec<usize> {
        self.linear_residual_histories
            .iter()
            .map(|h| h.len().saturating_sub(1))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(status: NewtonStatus) -> NewtonResult {
        NewtonResult {
            x: vec![C64::new(1.0, 0.0)],
            status,
            iterations: 2,
            residual_norms: vec![1.0, 1e-3, 1e-12],
            linear_residual_histories: vec![vec![1.0, 0.5, 0.05], vec![1.0, 0.01]],
            forcing_terms: vec![0.1, 0.1],
            deflation_dimensions: vec![0, 0],
            warnings: Vec::new(),
        }
    }

    #[test]
    fn accessors() {
        let r = result(NewtonStatus::Converged);
        assert!(r.converged());
        assert_eq!(r.error_code(), 0);
        assert_eq!(r.final_residual(), 1e-12);
        assert_eq!(r.linear_iterations(), vec![2, 1]);

        let r = result(NewtonStatus::MaxIterReached);
        assert!(!r.converged());
        assert_eq!(r.error_code(), 1);
    }
}
