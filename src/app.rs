//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - loads `.env` defaults and installs logging
//! - parses CLI arguments
//! - runs the analysis pipeline or the simulator
//! - prints reports and writes optional exports

use std::fs::File;

use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::cli::{Command, FitArgs, SimulateArgs};
use crate::data::{SimulationSpec, simulate_scores};
use crate::error::{AppError, CopulaError};

pub mod pipeline;

/// Entry point for the `cgof` binary.
pub fn run() -> Result<(), AppError> {
    dotenvy::dotenv().ok();
    init_logging();

    let cli = crate::cli::Cli::parse();
    match cli.command {
        Command::Fit(args) => handle_fit(args, OutputMode::Full),
        Command::Rank(args) => handle_fit(args, OutputMode::RankOnly),
        Command::Simulate(args) => handle_simulate(args),
    }
}

/// Logs go to stderr so stdout carries only the report.
fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    // A subscriber may already be installed when embedded; keep that one.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OutputMode {
    Full,
    RankOnly,
}

fn handle_fit(args: FitArgs, mode: OutputMode) -> Result<(), AppError> {
    let config = args.to_config(mode == OutputMode::Full);
    let exports = pipeline::Exports {
        records_csv: args.export.clone(),
        report_json: args.export_json.clone(),
    };
    let run = pipeline::run_analysis(
        &args.input,
        args.x_col.as_deref(),
        args.y_col.as_deref(),
        &config,
        &exports,
    )?;

    if !run.data.row_errors.is_empty() {
        eprintln!(
            "Skipped {} of {} rows with missing or invalid values.",
            run.data.row_errors.len(),
            run.data.rows_read
        );
    }

    if mode == OutputMode::Full {
        print!("{}", crate::report::format_run_summary(&run.report, &config));
        println!("{}", crate::report::format_family_table(&run.report.records()));
    }
    print!("{}", crate::report::format_ranking(&run.report.ranking));

    Ok(())
}

fn handle_simulate(args: SimulateArgs) -> Result<(), AppError> {
    let spec = SimulationSpec {
        family: args.family,
        params: args.params,
        n: args.n,
        seed: args.seed,
        levels: args.levels,
    };
    let (x, y) = simulate_scores(&spec)?;
    write_pairs(&args.output, &x, &y)?;
    info!(path = %args.output.display(), n = x.len(), family = %spec.family, "simulated pairs written");
    Ok(())
}

fn write_pairs(path: &std::path::Path, x: &[f64], y: &[f64]) -> Result<(), CopulaError> {
    let mut writer = csv::Writer::from_writer(File::create(path)?);
    writer.write_record(["x", "y"])?;
    for (a, b) in x.iter().zip(y) {
        writer.write_record([a.to_string(), b.to_string()])?;
    }
    writer.flush()?;
    Ok(())
}
