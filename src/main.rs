mod config;
mod report;
mod search;
mod solver;
mod watchdog;

use clap::Parser;
use config::DriverConfig;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

/// Find the minimal width at which an external balanced decomposer
/// certifies a hypergraph layout: race each attempt against a
/// wall-clock deadline, narrow on the solver's self-reported width,
/// stop at the first refusal or timeout.
#[derive(Parser, Debug)]
#[command(name = "widthseek", version, about)]
pub struct Cli {
    /// Hypergraph file to decompose
    #[arg(value_name = "GRAPH")]
    graph: PathBuf,

    /// Config file path
    #[arg(short, long, default_value = "widthseek.toml")]
    config: PathBuf,

    /// Solver command (overrides config)
    #[arg(long)]
    solver: Option<String>,

    /// Deadline budget in ticks (overrides config)
    #[arg(long)]
    budget_ticks: Option<u64>,

    /// Iteration cap (overrides config)
    #[arg(long)]
    max_iterations: Option<u32>,

    /// Extra logging (per-attempt evaluation, watchdog bookkeeping)
    #[arg(short, long)]
    verbose: bool,

    /// Errors only
    #[arg(short, long)]
    quiet: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let default_level = if cli.verbose {
        "debug"
    } else if cli.quiet {
        "error"
    } else {
        "warn"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        // stdout carries only the final answer
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    tracing::debug!(?cli, "parsed CLI arguments");

    let mut config = match DriverConfig::load(&cli.config) {
        Ok(config) => config,
        Err(e) => {
            tracing::error!(error = %e, "invalid configuration");
            return ExitCode::FAILURE;
        }
    };
    if let Some(solver) = cli.solver {
        config.solver.command = solver;
    }
    if let Some(budget) = cli.budget_ticks {
        config.watchdog.budget_ticks = budget;
    }
    if let Some(cap) = cli.max_iterations {
        config.search.max_iterations = cap;
    }

    match search::run_search(&config, &cli.graph).await {
        Ok(outcome) => {
            tracing::info!(
                width = outcome.width,
                reason = ?outcome.reason,
                iterations = outcome.iterations,
                "search finished"
            );
            println!("{}", outcome.width);
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!(error = %e, "search aborted");
            ExitCode::FAILURE
        }
    }
}
