//! Shared "analysis pipeline" logic behind the `fit` and `rank` commands.
//!
//! CSV ingest -> engine (fit / select / GoF) -> optional exports
//!
//! Front-ends only decide what to print.

use std::path::{Path, PathBuf};

use crate::domain::{AnalysisConfig, ConditionReport};
use crate::engine::analyze;
use crate::error::CopulaResult;
use crate::io::{PairData, read_pairs_csv, write_records_csv, write_report_json};

/// Where (if anywhere) to write results.
#[derive(Debug, Clone, Default)]
pub struct Exports {
    pub records_csv: Option<PathBuf>,
    pub report_json: Option<PathBuf>,
}

/// All computed outputs of a single `cgof fit` run.
#[derive(Debug, Clone)]
pub struct RunOutput {
    pub data: PairData,
    pub report: ConditionReport,
}

/// Execute the full pipeline on a CSV file.
pub fn run_analysis(
    input: &Path,
    x_col: Option<&str>,
    y_col: Option<&str>,
    config: &AnalysisConfig,
    exports: &Exports,
) -> CopulaResult<RunOutput> {
    let data = read_pairs_csv(input, x_col, y_col)?;
    let report = analyze(&data.x, &data.y, config)?;

    if let Some(path) = &exports.records_csv {
        write_records_csv(path, &report.records())?;
    }
    if let Some(path) = &exports.report_json {
        write_report_json(path, &report, config)?;
    }

    Ok(RunOutput { data, report })
}
