//! Run reports: text summary and JSON.

use std::fmt::Write;

use ginla_solver::NewtonResult;
use serde::Serialize;

/// Problem description echoed in the report.
#[derive(Debug, Clone, Serialize)]
pub struct RunInfo {
    pub nodes: usize,
    pub length: f64,
    pub field: f64,
    pub solver: String,
    pub forcing: String,
    pub preconditioned: bool,
    pub deflate_phase: bool,
    pub recycle: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct Report {
    #[serde(flatten)]
    pub info: RunInfo,
    pub converged: bool,
    pub error_code: i32,
    pub newton_steps: usize,
    pub residual_norms: Vec<f64>,
    pub forcing_terms: Vec<f64>,
    pub linear_iterations: Vec<usize>,
    pub deflation_dimensions: Vec<usize>,
    pub linear_residual_histories: Vec<Vec<f64>>,
    pub energy: f64,
    pub warnings: Vec<String>,
}

impl Report {
    pub fn new(info: RunInfo, result: &NewtonResult, energy: f64) -> Self {
        Self {
            info,
            converged: result.converged(),
            error_code: result.error_code(),
            newton_steps: result.iterations,
            residual_norms: result.residual_norms.clone(),
            forcing_terms: result.forcing_terms.clone(),
            linear_iterations: result.linear_iterations(),
            deflation_dimensions: result.deflation_dimensions.clone(),
            linear_residual_histories: result.linear_residual_histories.clone(),
            energy,
            warnings: result.warnings.iter().map(ToString::to_string).collect(),
        }
    }

    pub fn to_text(&self) -> String {
        let info = &self.info;
        let mut out = String::new();
        let _ = writeln!(
            out,
            "Ginzburg-Landau ring (N = {}, L = {}, field = {})",
            info.nodes, info.length, info.field
        );
        let _ = writeln!(
            out,
            "Newton-{} with {} forcing{}{}{}",
            info.solver,
            info.forcing,
            if info.preconditioned { ", preconditioned" } else { "" },
            if info.deflate_phase { ", phase deflation" } else { "" },
            if info.recycle > 0 {
                format!(", recycling {} Ritz vectors", info.recycle)
            } else {
                String::new()
            }
        );
        let _ = writeln!(out, "==========================================");
        let _ = writeln!(
            out,
            "{:>5}  {:>12}  {:>10}  {:>6}  {:>9}",
            "step", "||F||", "eta", "iters", "deflation"
        );
        for (k, norm) in self.residual_norms.iter().enumerate() {
            if k == 0 {
                let _ = writeln!(out, "{k:>5}  {norm:>12.4e}");
            } else {
                let _ = writeln!(
                    out,
                    "{k:>5}  {norm:>12.4e}  {:>10.2e}  {:>6}  {:>9}",
                    self.forcing_terms[k - 1],
                    self.linear_iterations[k - 1],
                    self.deflation_dimensions[k - 1]
                );
            }
        }
        let _ = writeln!(out);
        if self.converged {
            let _ = writeln!(out, "Converged in {} Newton steps.", self.newton_steps);
        } else {
            let _ = writeln!(
                out,
                "Not converged after {} Newton steps (error code {}).",
                self.newton_steps, self.error_code
            );
        }
        let _ = writeln!(out, "Energy: {:.10}", self.energy);
        if !self.warnings.is_empty() {
            let _ = writeln!(out, "{} warnings:", self.warnings.len());
            for warning in &self.warnings {
                let _ = writeln!(out, "  {warning}");
            }
        }
        out
    }
}
