//! Formatted terminal output.
//!
//! We keep formatting code in one place so:
//! - the fitting and bootstrap code stays clean and testable
//! - output changes are localized

use crate::domain::{AnalysisConfig, ConditionReport, FamilyRecord, RankEntry};

/// Header block: sample diagnostics and run settings.
pub fn format_run_summary(report: &ConditionReport, config: &AnalysisConfig) -> String {
    let mut out = String::new();

    out.push_str("=== cgof - Copula Selection & Goodness of Fit ===\n");
    out.push_str(&format!(
        "Sample: n={} | unique X={} | unique Y={}\n",
        report.n, report.unique_x, report.unique_y
    ));
    let gof = if config.gof {
        format!("{} bootstrap N={}", config.statistic.label(), config.n_bootstrap)
    } else {
        "off".to_string()
    };
    out.push_str(&format!("GoF: {gof} | seed={}\n", report.seed));
    out.push_str(&format!("Best by AIC: {}\n", report.best_family));
    out.push('\n');

    out
}

/// One row per requested family, failures included.
pub fn format_family_table(records: &[FamilyRecord]) -> String {
    let mut out = String::new();
    push_row(
        &mut out,
        format!(
            "{:<12} {:<4} {:<22} {:>10} {:>10} {:>7} {:>7} {:>7} {:>9} {:>7}",
            "family", "ok", "parameters", "AIC", "BIC", "tau", "lambdaL", "lambdaU", "stat", "p"
        ),
    );
    push_row(
        &mut out,
        format!(
            "{:-<12} {:-<4} {:-<22} {:-<10} {:-<10} {:-<7} {:-<7} {:-<7} {:-<9} {:-<7}",
            "", "", "", "", "", "", "", "", "", ""
        ),
    );

    for r in records {
        push_row(
            &mut out,
            format!(
                "{:<12} {:<4} {:<22} {:>10} {:>10} {:>7} {:>7} {:>7} {:>9} {:>7}",
                r.family.name(),
                if r.fit_success { "yes" } else { "no" },
                truncate(&fmt_vec(&r.parameters), 22),
                fmt_opt(r.aic, 2),
                fmt_opt(r.bic, 2),
                fmt_opt(r.tau, 3),
                fmt_opt(r.tail_dependence_lower, 3),
                fmt_opt(r.tail_dependence_upper, 3),
                fmt_opt(r.gof_statistic, 4),
                fmt_opt(r.gof_p_value, 3),
            ),
        );
    }

    let notes: Vec<&FamilyRecord> = records.iter().filter(|r| r.error_message.is_some()).collect();
    if !notes.is_empty() {
        out.push('\n');
        for r in notes {
            out.push_str(&format!(
                "  ({}) {}\n",
                r.family.name(),
                r.error_message.as_deref().unwrap_or("")
            ));
        }
    }

    out
}

/// AIC ranking with ΔAIC from the best family.
pub fn format_ranking(ranking: &[RankEntry]) -> String {
    let mut out = String::new();
    out.push_str("AIC ranking:\n");
    for (i, e) in ranking.iter().enumerate() {
        push_row(
            &mut out,
            format!(
                "{:>2}. {:<12} k={} AIC={:>10} dAIC={:>9}",
                i + 1,
                e.family.name(),
                e.free_params,
                fmt_opt(e.aic, 2),
                fmt_opt(e.delta_aic, 2)
            ),
        );
    }
    out
}

fn push_row(out: &mut String, row: String) {
    out.push_str(row.trim_end());
    out.push('\n');
}

fn fmt_opt(v: Option<f64>, decimals: usize) -> String {
    match v {
        Some(x) if x.is_finite() => format!("{x:.decimals$}"),
        _ => "NA".to_string(),
    }
}

fn fmt_vec(v: &[f64]) -> String {
    let parts: Vec<String> = v.iter().map(|x| format!("{x:.4}")).collect();
    format!("[{}]", parts.join(", "))
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let mut out: String = s.chars().take(max.saturating_sub(1)).collect();
    out.push('.');
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::CopulaFamily;

    fn record(family: CopulaFamily, ok: bool) -> FamilyRecord {
        FamilyRecord {
            family,
            parameters: if ok { vec![0.5] } else { vec![] },
            log_lik: ok.then_some(50.0),
            aic: ok.then_some(-98.0),
            bic: ok.then_some(-94.0),
            tau: ok.then_some(0.33),
            tail_dependence_lower: ok.then_some(0.0),
            tail_dependence_upper: ok.then_some(0.0),
            gof_statistic: ok.then_some(0.05),
            gof_p_value: ok.then_some(0.42),
            gof_method: ok.then(|| "bootstrap_N=100".to_string()),
            fit_success: ok,
            error_message: (!ok).then(|| "did not converge".to_string()),
        }
    }

    #[test]
    fn family_table_lists_failures_and_missing_values() {
        let table = format_family_table(&[
            record(CopulaFamily::Gaussian, true),
            record(CopulaFamily::Clayton, false),
        ]);
        let lines: Vec<&str> = table.lines().collect();
        assert!(lines[2].starts_with("gaussian"));
        assert!(lines[2].contains("0.420"));
        assert!(lines[3].starts_with("clayton      no"));
        assert!(lines[3].contains("NA"));
        assert!(table.contains("(clayton) did not converge"));
    }

    #[test]
    fn truncate_marks_cut_strings() {
        assert_eq!(truncate("abcdef", 4), "abc.");
        assert_eq!(truncate("abc", 4), "abc");
    }
}
