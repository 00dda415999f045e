//! Command-line parsing for the copula selection and GoF tool.
//!
//! The goal of this module is to keep **argument parsing** and **command dispatch**
//! separate from the modeling/math code.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::domain::{AnalysisConfig, CopulaFamily, StatisticKind};

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(name = "cgof", version, about = "Bivariate copula selection and bootstrap goodness-of-fit")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Fit copula families to a two-column CSV, rank by AIC and run bootstrap GoF.
    Fit(FitArgs),
    /// Print the AIC ranking only (no bootstrap).
    Rank(FitArgs),
    /// Generate paired scores from a known copula.
    Simulate(SimulateArgs),
}

/// Options for fitting and ranking.
#[derive(Debug, Args, Clone)]
pub struct FitArgs {
    /// Headered CSV with the paired scores.
    #[arg(short = 'i', long, value_name = "CSV")]
    pub input: PathBuf,

    /// Column holding X (default: first column).
    #[arg(long = "x-col")]
    pub x_col: Option<String>,

    /// Column holding Y (default: second column).
    #[arg(long = "y-col")]
    pub y_col: Option<String>,

    /// Families to fit (repeatable; default: gaussian, t, clayton, gumbel, frank, comonotonic).
    #[arg(short = 'f', long = "family", value_enum)]
    pub families: Vec<CopulaFamily>,

    /// Bootstrap replicates per family.
    #[arg(short = 'b', long, env = "CGOF_BOOTSTRAP", default_value_t = 100)]
    pub bootstrap: usize,

    /// Worker threads (0 = all cores).
    #[arg(short = 'w', long, env = "CGOF_WORKERS", default_value_t = 0)]
    pub workers: usize,

    /// Root seed for bootstrap replicates (default: fresh entropy, reported).
    #[arg(long, env = "CGOF_SEED")]
    pub seed: Option<u64>,

    /// GoF statistic.
    #[arg(long, value_enum, default_value_t = StatisticKind::Empirical)]
    pub statistic: StatisticKind,

    /// Minimum sample size for an analysis.
    #[arg(long, default_value_t = 100)]
    pub min_n: usize,

    /// Replicate drop rate above which a warning is attached.
    #[arg(long, default_value_t = 0.10)]
    pub max_drop_rate: f64,

    /// Abort the bootstrap after this many seconds.
    #[arg(long)]
    pub timeout: Option<u64>,

    /// Export per-family records to CSV.
    #[arg(long)]
    pub export: Option<PathBuf>,

    /// Export the full report to JSON.
    #[arg(long = "export-json")]
    pub export_json: Option<PathBuf>,
}

impl FitArgs {
    /// Resolve arguments into an analysis configuration.
    pub fn to_config(&self, gof: bool) -> AnalysisConfig {
        let defaults = AnalysisConfig::default();
        AnalysisConfig {
            families: if self.families.is_empty() {
                defaults.families
            } else {
                self.families.clone()
            },
            n_bootstrap: self.bootstrap,
            workers: self.workers,
            seed: self.seed,
            statistic: self.statistic,
            min_sample_size: self.min_n,
            max_drop_rate: self.max_drop_rate,
            gof,
            timeout_secs: self.timeout,
        }
    }
}

/// Options for synthetic data generation.
#[derive(Debug, Args, Clone)]
pub struct SimulateArgs {
    #[arg(short = 'f', long, value_enum)]
    pub family: CopulaFamily,

    /// Family parameter (repeatable, e.g. `--param 0.75 --param 47` for t).
    #[arg(short = 'p', long = "param", allow_negative_numbers = true)]
    pub params: Vec<f64>,

    #[arg(short = 'n', long, default_value_t = 1000)]
    pub n: usize,

    #[arg(long, env = "CGOF_SEED", default_value_t = 42)]
    pub seed: u64,

    /// Discretize each margin onto this many integer score levels.
    #[arg(long)]
    pub levels: Option<usize>,

    /// Output CSV (columns `x,y`).
    #[arg(short = 'o', long, value_name = "CSV")]
    pub output: PathBuf,
}
