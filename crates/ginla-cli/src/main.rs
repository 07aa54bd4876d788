//! ginla CLI.
//!
//! Solves the Ginzburg-Landau equation on a periodic ring with the
//! Newton-Krylov solver and prints the convergence history.

mod output;
mod ring;

use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use ginla_solver::{
    Forcing, ForcingTerm, LinearSolver, ModelEvaluator, NewtonConfig, SymmetryGenerator, newton,
};

use crate::output::{Report, RunInfo};
use crate::ring::RingModel;

#[derive(Parser)]
#[command(name = "ginla")]
#[command(about = "Newton-Krylov solver for the Ginzburg-Landau equation on a ring")]
#[command(version)]
struct Cli {
    /// Number of nodes on the ring
    #[arg(long, default_value_t = 64)]
    nodes: usize,

    /// Circumference of the ring
    #[arg(long, default_value_t = 10.0)]
    length: f64,

    /// Magnitude of the tangential vector potential
    #[arg(long, default_value_t = 0.0)]
    field: f64,

    /// Linear solver: cg, minres or gmres
    #[arg(long, default_value = "minres")]
    solver: LinearSolver,

    /// Forcing term: constant, type1 or type2
    #[arg(long, default_value = "constant")]
    forcing: ForcingTerm,

    /// Initial (constant) forcing term
    #[arg(long, default_value_t = 0.1)]
    eta0: f64,

    /// Nonlinear tolerance on ||F(psi)||
    #[arg(long, default_value_t = 1e-10)]
    tol: f64,

    /// Maximum number of Newton steps
    #[arg(long, default_value_t = 20)]
    max_newton: usize,

    /// Maximum number of linear iterations per step
    #[arg(long)]
    linear_max_iter: Option<usize>,

    /// Precondition with K + 2|psi|^2
    #[arg(long)]
    precondition: bool,

    /// Deflate the phase direction i*psi
    #[arg(long)]
    deflate_phase: bool,

    /// Number of Ritz vectors to recycle between Newton steps
    #[arg(long, default_value_t = 0)]
    recycle: usize,

    /// Output results as JSON
    #[arg(long)]
    json: bool,
}

fn run(cli: &Cli) -> anyhow::Result<Report> {
    let mut model = RingModel::new(cli.nodes, cli.length, 0.0)?;
    model.set_parameter(cli.field);

    let mut config = NewtonConfig::default()
        .with_tol(cli.tol)
        .with_max_iter(cli.max_newton)
        .with_solver(cli.solver)
        .with_forcing(Forcing::constant(cli.eta0).with_policy(cli.forcing))
        .with_preconditioner(cli.precondition)
        .with_recycle_dimension(cli.recycle);
    if let Some(max_iter) = cli.linear_max_iter {
        config = config.with_linear_max_iter(max_iter);
    }
    if cli.deflate_phase {
        config = config.with_symmetry_generator(SymmetryGenerator::Phase);
    }

    log::info!(
        "Solving ring with N = {}, L = {}, field = {} ({} / {} forcing)",
        cli.nodes,
        cli.length,
        cli.field,
        cli.solver,
        cli.forcing
    );
    let result = newton(&model.initial_guess(), &model, &config).context("Newton solve failed")?;
    let energy = model.energy(&result.x);

    let info = RunInfo {
        nodes: cli.nodes,
        length: cli.length,
        field: model.field(),
        solver: cli.solver.to_string(),
        forcing: cli.forcing.to_string(),
        preconditioned: cli.precondition,
        deflate_phase: cli.deflate_phase,
        recycle: cli.recycle,
    };
    Ok(Report::new(info, &result, energy))
}

fn main() -> ExitCode {
    let env = env_logger::Env::default().default_filter_or("info");
    if let Err(e) = env_logger::Builder::from_env(env).try_init() {
        eprintln!("Failed to initialize logger: {e}");
        return ExitCode::FAILURE;
    }

    let cli = Cli::parse();
    let report = match run(&cli) {
        Ok(report) => report,
        Err(e) => {
            eprintln!("Error: {e:#}");
            return ExitCode::FAILURE;
        }
    };

    if cli.json {
        match serde_json::to_string_pretty(&report) {
            Ok(s) => println!("{s}"),
            Err(e) => {
                eprintln!("Error serializing report: {e}");
                return ExitCode::FAILURE;
            }
        }
    } else {
        print!("{}", report.to_text());
    }

    if report.converged {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}
