//! Export per-family results to CSV and the full report to JSON.
//!
//! The CSV is one row per requested family (failures included) and is meant
//! to be easy to consume in spreadsheets or downstream scripts.

use std::fs::File;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{AnalysisConfig, ConditionReport, CopulaFamily, FamilyRecord, RankEntry};
use crate::error::CopulaResult;

/// Flat CSV row; parameters are joined with `;`.
#[derive(Debug, Serialize)]
struct CsvRow<'a> {
    family: &'a str,
    fit_success: bool,
    parameters: String,
    log_lik: Option<f64>,
    aic: Option<f64>,
    bic: Option<f64>,
    tau: Option<f64>,
    tail_dependence_lower: Option<f64>,
    tail_dependence_upper: Option<f64>,
    gof_statistic: Option<f64>,
    gof_p_value: Option<f64>,
    gof_method: Option<&'a str>,
    error_message: Option<&'a str>,
}

impl<'a> From<&'a FamilyRecord> for CsvRow<'a> {
    fn from(r: &'a FamilyRecord) -> Self {
        CsvRow {
            family: r.family.name(),
            fit_success: r.fit_success,
            parameters: r
                .parameters
                .iter()
                .map(|p| format!("{p:.10}"))
                .collect::<Vec<_>>()
                .join(";"),
            log_lik: r.log_lik,
            aic: r.aic,
            bic: r.bic,
            tau: r.tau,
            tail_dependence_lower: r.tail_dependence_lower,
            tail_dependence_upper: r.tail_dependence_upper,
            gof_statistic: r.gof_statistic,
            gof_p_value: r.gof_p_value,
            gof_method: r.gof_method.as_deref(),
            error_message: r.error_message.as_deref(),
        }
    }
}

/// Write one row per family record.
pub fn write_records_csv(path: &Path, records: &[FamilyRecord]) -> CopulaResult<()> {
    let mut writer = csv::Writer::from_path(path)?;
    for record in records {
        writer.serialize(CsvRow::from(record))?;
    }
    writer.flush()?;
    Ok(())
}

/// Portable JSON representation of one analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportFile {
    pub tool: String,
    pub generated_at: DateTime<Utc>,
    pub config: AnalysisConfig,
    pub n: usize,
    pub unique_x: usize,
    pub unique_y: usize,
    pub seed: u64,
    pub best_family: CopulaFamily,
    pub ranking: Vec<RankEntry>,
    pub records: Vec<FamilyRecord>,
}

impl ReportFile {
    pub fn new(report: &ConditionReport, config: &AnalysisConfig) -> Self {
        Self {
            tool: "cgof".to_string(),
            generated_at: Utc::now(),
            config: config.clone(),
            n: report.n,
            unique_x: report.unique_x,
            unique_y: report.unique_y,
            seed: report.seed,
            best_family: report.best_family,
            ranking: report.ranking.clone(),
            records: report.records(),
        }
    }
}

pub fn write_report_json(path: &Path, report: &ConditionReport, config: &AnalysisConfig) -> CopulaResult<()> {
    let file = File::create(path)?;
    serde_json::to_writer_pretty(file, &ReportFile::new(report, config))?;
    Ok(())
}

pub fn read_report_json(path: &Path) -> CopulaResult<ReportFile> {
    let file = File::open(path)?;
    Ok(serde_json::from_reader(file)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{FamilyOutcome, FamilyReport, FittedCopula, TailDependence};

    fn report() -> ConditionReport {
        let fitted = FamilyReport {
            outcome: FamilyOutcome::Fitted(FittedCopula {
                family: CopulaFamily::Clayton,
                parameters: vec![2.0],
                log_likelihood: Some(120.0),
                aic: Some(-238.0),
                bic: Some(-234.0),
                tau: 0.5,
                tail: TailDependence {
                    lower: Some(0.7071),
                    upper: Some(0.0),
                },
                n: 300,
            }),
            gof: None,
            gof_error: None,
        };
        let failed = FamilyReport {
            outcome: FamilyOutcome::Failed {
                family: CopulaFamily::Gumbel,
                error_message: "Parameter estimate for gumbel at search boundary".to_string(),
            },
            gof: None,
            gof_error: None,
        };
        ConditionReport {
            n: 300,
            unique_x: 300,
            unique_y: 300,
            seed: 9,
            families: vec![fitted, failed],
            ranking: vec![RankEntry {
                family: CopulaFamily::Clayton,
                free_params: 1,
                aic: Some(-238.0),
                bic: Some(-234.0),
                delta_aic: Some(0.0),
            }],
            best_family: CopulaFamily::Clayton,
        }
    }

    #[test]
    fn csv_lists_failures_with_their_message() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("records.csv");
        write_records_csv(&path, &report().records()).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<_> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("family,fit_success,parameters"));
        assert!(lines[1].starts_with("clayton,true,2.0000000000"));
        assert!(lines[2].starts_with("gumbel,false,"));
        assert!(lines[2].contains("search boundary"));
    }

    #[test]
    fn json_report_reads_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.json");
        let config = AnalysisConfig::default();
        write_report_json(&path, &report(), &config).unwrap();

        let back = read_report_json(&path).unwrap();
        assert_eq!(back.best_family, CopulaFamily::Clayton);
        assert_eq!(back.records.len(), 2);
        assert!(!back.records[1].fit_success);
        assert_eq!(back.config, config);
    }
}
