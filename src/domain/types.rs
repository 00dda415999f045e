//! Shared domain types.
//!
//! These types are intentionally kept lightweight and serializable so they can be:
//!
//! - used in-memory during fitting and bootstrapping
//! - exported to JSON/CSV by the reporting collaborators
//! - compared across runs

use std::fmt;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// Parametric bivariate copula family.
///
/// `TDf5` / `TDf10` / `TDf15` are Student-t copulas with ν held fixed; they
/// are fitted and bootstrapped exactly like the free `T` family but carry a
/// single free parameter (ρ).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, ValueEnum)]
pub enum CopulaFamily {
    #[serde(rename = "gaussian")]
    #[value(name = "gaussian")]
    Gaussian,
    #[serde(rename = "t")]
    #[value(name = "t")]
    T,
    #[serde(rename = "t_df5")]
    #[value(name = "t_df5")]
    TDf5,
    #[serde(rename = "t_df10")]
    #[value(name = "t_df10")]
    TDf10,
    #[serde(rename = "t_df15")]
    #[value(name = "t_df15")]
    TDf15,
    #[serde(rename = "clayton")]
    #[value(name = "clayton")]
    Clayton,
    #[serde(rename = "gumbel")]
    #[value(name = "gumbel")]
    Gumbel,
    #[serde(rename = "frank")]
    #[value(name = "frank")]
    Frank,
    #[serde(rename = "comonotonic")]
    #[value(name = "comonotonic")]
    Comonotonic,
}

impl CopulaFamily {
    /// The six families fitted when the caller does not choose.
    pub const DEFAULT_SET: [CopulaFamily; 6] = [
        CopulaFamily::Gaussian,
        CopulaFamily::T,
        CopulaFamily::Clayton,
        CopulaFamily::Gumbel,
        CopulaFamily::Frank,
        CopulaFamily::Comonotonic,
    ];

    pub const ALL: [CopulaFamily; 9] = [
        CopulaFamily::Gaussian,
        CopulaFamily::T,
        CopulaFamily::TDf5,
        CopulaFamily::TDf10,
        CopulaFamily::TDf15,
        CopulaFamily::Clayton,
        CopulaFamily::Gumbel,
        CopulaFamily::Frank,
        CopulaFamily::Comonotonic,
    ];

    /// Stable lowercase tag used in reports and exports.
    pub fn name(self) -> &'static str {
        match self {
            CopulaFamily::Gaussian => "gaussian",
            CopulaFamily::T => "t",
            CopulaFamily::TDf5 => "t_df5",
            CopulaFamily::TDf10 => "t_df10",
            CopulaFamily::TDf15 => "t_df15",
            CopulaFamily::Clayton => "clayton",
            CopulaFamily::Gumbel => "gumbel",
            CopulaFamily::Frank => "frank",
            CopulaFamily::Comonotonic => "comonotonic",
        }
    }

    pub fn parse(tag: &str) -> Option<CopulaFamily> {
        let tag = tag.trim().to_ascii_lowercase();
        CopulaFamily::ALL.into_iter().find(|f| f.name() == tag)
    }

    /// Number of estimated parameters (the `k` in AIC/BIC).
    pub fn free_param_count(self) -> usize {
        match self {
            CopulaFamily::T => 2,
            CopulaFamily::Comonotonic => 0,
            _ => 1,
        }
    }

    /// Degrees of freedom for the fixed-ν Student-t variants.
    pub fn fixed_df(self) -> Option<f64> {
        match self {
            CopulaFamily::TDf5 => Some(5.0),
            CopulaFamily::TDf10 => Some(10.0),
            CopulaFamily::TDf15 => Some(15.0),
            _ => None,
        }
    }

    /// Position in `ALL`; feeds per-family random substream derivation.
    pub fn index(self) -> u64 {
        CopulaFamily::ALL
            .iter()
            .position(|f| *f == self)
            .map(|i| i as u64)
            .unwrap_or(u64::MAX)
    }
}

impl fmt::Display for CopulaFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Which Cramér–von Mises statistic the GoF engine computes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum StatisticKind {
    /// CvM distance between the empirical copula and the model cdf, evaluated
    /// at the sample's own tie-block corners.
    #[default]
    Empirical,
    /// CvM distance between empirical and model Kendall distribution functions.
    /// Valid for tied data.
    Kendall,
    /// CvM distance of the Rosenblatt-transformed sample from independence.
    Rosenblatt,
}

impl StatisticKind {
    pub fn label(self) -> &'static str {
        match self {
            StatisticKind::Empirical => "empirical_cvm",
            StatisticKind::Kendall => "kendall_cvm",
            StatisticKind::Rosenblatt => "rosenblatt_cvm",
        }
    }
}

/// Rank-based pseudo-observations, one `(u_i, v_i)` per score pair.
///
/// Always strictly inside the unit square.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PseudoObservations {
    pub u: Vec<f64>,
    pub v: Vec<f64>,
}

impl PseudoObservations {
    pub fn len(&self) -> usize {
        self.u.len()
    }

    pub fn is_empty(&self) -> bool {
        self.u.is_empty()
    }

    pub fn pairs(&self) -> impl Iterator<Item = (f64, f64)> + '_ {
        self.u.iter().copied().zip(self.v.iter().copied())
    }
}

/// Lower/upper tail-dependence coefficients. `None` means the value could not
/// be evaluated to a finite number (reported as NA).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TailDependence {
    pub lower: Option<f64>,
    pub upper: Option<f64>,
}

impl TailDependence {
    pub fn symmetric(value: Option<f64>) -> Self {
        Self {
            lower: value,
            upper: value,
        }
    }

    pub fn none() -> Self {
        Self {
            lower: Some(0.0),
            upper: Some(0.0),
        }
    }
}

/// A successfully fitted copula and its derived quantities.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FittedCopula {
    pub family: CopulaFamily,
    /// Full parameter vector. Student-t variants always carry `[ρ, ν]`, even
    /// when ν is fixed.
    pub parameters: Vec<f64>,
    /// Absent for Comonotonic, which has no density.
    pub log_likelihood: Option<f64>,
    pub aic: Option<f64>,
    pub bic: Option<f64>,
    pub tau: f64,
    pub tail: TailDependence,
    pub n: usize,
}

/// Per-family fit outcome: either the full set of fields or just the failure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum FamilyOutcome {
    Fitted(FittedCopula),
    Failed {
        family: CopulaFamily,
        error_message: String,
    },
}

impl FamilyOutcome {
    pub fn family(&self) -> CopulaFamily {
        match self {
            FamilyOutcome::Fitted(fit) => fit.family,
            FamilyOutcome::Failed { family, .. } => *family,
        }
    }

    pub fn fitted(&self) -> Option<&FittedCopula> {
        match self {
            FamilyOutcome::Fitted(fit) => Some(fit),
            FamilyOutcome::Failed { .. } => None,
        }
    }
}

/// Goodness-of-fit result for one family.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GofResult {
    pub family: CopulaFamily,
    pub statistic: f64,
    /// Statistics of the replicates that completed (unordered).
    pub replicate_statistics: Vec<f64>,
    pub replicates_requested: usize,
    pub replicates_failed: usize,
    /// `(1 + #{boot ≥ observed}) / (used + 1)`; `None` for Comonotonic or when
    /// no replicate completed.
    pub p_value: Option<f64>,
    /// `"bootstrap_N=<N>"` or `"comonotonic_observed_only"`.
    pub method: String,
    pub statistic_kind: String,
    pub warning: Option<String>,
}

impl GofResult {
    pub fn replicates_used(&self) -> usize {
        self.replicate_statistics.len()
    }
}

/// One entry of the AIC ranking.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankEntry {
    pub family: CopulaFamily,
    pub free_params: usize,
    pub aic: Option<f64>,
    pub bic: Option<f64>,
    pub delta_aic: Option<f64>,
}

/// Everything computed for one family: the fit outcome plus optional GoF.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FamilyReport {
    pub outcome: FamilyOutcome,
    pub gof: Option<GofResult>,
    /// Why GoF is missing for a fitted family whose test was requested.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gof_error: Option<String>,
}

/// The flat record handed to reporting/persistence collaborators.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FamilyRecord {
    pub family: CopulaFamily,
    pub parameters: Vec<f64>,
    pub log_lik: Option<f64>,
    pub aic: Option<f64>,
    pub bic: Option<f64>,
    pub tau: Option<f64>,
    pub tail_dependence_lower: Option<f64>,
    pub tail_dependence_upper: Option<f64>,
    pub gof_statistic: Option<f64>,
    pub gof_p_value: Option<f64>,
    pub gof_method: Option<String>,
    pub fit_success: bool,
    pub error_message: Option<String>,
}

impl From<&FamilyReport> for FamilyRecord {
    fn from(report: &FamilyReport) -> Self {
        let gof = report.gof.as_ref();
        match &report.outcome {
            FamilyOutcome::Fitted(fit) => FamilyRecord {
                family: fit.family,
                parameters: fit.parameters.clone(),
                log_lik: fit.log_likelihood,
                aic: fit.aic,
                bic: fit.bic,
                tau: Some(fit.tau),
                tail_dependence_lower: fit.tail.lower,
                tail_dependence_upper: fit.tail.upper,
                gof_statistic: gof.map(|g| g.statistic),
                gof_p_value: gof.and_then(|g| g.p_value),
                gof_method: gof.map(|g| g.method.clone()),
                fit_success: true,
                error_message: report
                    .gof_error
                    .clone()
                    .or_else(|| gof.and_then(|g| g.warning.clone())),
            },
            FamilyOutcome::Failed {
                family,
                error_message,
            } => FamilyRecord {
                family: *family,
                parameters: Vec::new(),
                log_lik: None,
                aic: None,
                bic: None,
                tau: None,
                tail_dependence_lower: None,
                tail_dependence_upper: None,
                gof_statistic: None,
                gof_p_value: None,
                gof_method: None,
                fit_success: false,
                error_message: Some(error_message.clone()),
            },
        }
    }
}

/// Full result for one analysis condition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConditionReport {
    pub n: usize,
    /// Unique values in X and Y (a tie-heaviness diagnostic).
    pub unique_x: usize,
    pub unique_y: usize,
    /// Root seed the bootstrap substreams were derived from.
    pub seed: u64,
    /// One entry per requested family, in request order.
    pub families: Vec<FamilyReport>,
    pub ranking: Vec<RankEntry>,
    pub best_family: CopulaFamily,
}

impl ConditionReport {
    pub fn records(&self) -> Vec<FamilyRecord> {
        self.families.iter().map(FamilyRecord::from).collect()
    }

    pub fn report_for(&self, family: CopulaFamily) -> Option<&FamilyReport> {
        self.families.iter().find(|r| r.outcome.family() == family)
    }
}

/// Configuration for one analysis condition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisConfig {
    pub families: Vec<CopulaFamily>,
    /// Bootstrap replicates per family (`N`).
    pub n_bootstrap: usize,
    /// Worker threads (0 = all available cores).
    pub workers: usize,
    /// Root seed. `None` draws a fresh one per run (it is logged and reported).
    pub seed: Option<u64>,
    pub statistic: StatisticKind,
    pub min_sample_size: usize,
    /// Replicate drop rate above which the GoF result carries a warning.
    pub max_drop_rate: f64,
    /// Skip GoF entirely (fit + selection only).
    pub gof: bool,
    pub timeout_secs: Option<u64>,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            families: CopulaFamily::DEFAULT_SET.to_vec(),
            n_bootstrap: 100,
            workers: 0,
            seed: None,
            statistic: StatisticKind::Empirical,
            min_sample_size: 100,
            max_drop_rate: 0.10,
            gof: true,
            timeout_secs: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn family_tags_round_trip_through_parse() {
        for family in CopulaFamily::ALL {
            assert_eq!(CopulaFamily::parse(family.name()), Some(family));
        }
        assert_eq!(CopulaFamily::parse(" T_DF10 "), Some(CopulaFamily::TDf10));
        assert_eq!(CopulaFamily::parse("joe"), None);
    }

    #[test]
    fn parameter_counts_match_family_definitions() {
        assert_eq!(CopulaFamily::Gaussian.free_param_count(), 1);
        assert_eq!(CopulaFamily::T.free_param_count(), 2);
        assert_eq!(CopulaFamily::TDf5.free_param_count(), 1);
        assert_eq!(CopulaFamily::Clayton.free_param_count(), 1);
        assert_eq!(CopulaFamily::Comonotonic.free_param_count(), 0);
    }

    #[test]
    fn failed_outcome_flattens_without_fit_fields() {
        let report = FamilyReport {
            outcome: FamilyOutcome::Failed {
                family: CopulaFamily::Clayton,
                error_message: "boundary".to_string(),
            },
            gof: None,
            gof_error: None,
        };
        let record = FamilyRecord::from(&report);
        assert!(!record.fit_success);
        assert!(record.parameters.is_empty());
        assert!(record.aic.is_none());
        assert!(record.gof_p_value.is_none());
        assert_eq!(record.error_message.as_deref(), Some("boundary"));
    }

    #[test]
    fn gof_failure_reaches_the_record() {
        let report = FamilyReport {
            outcome: FamilyOutcome::Fitted(FittedCopula {
                family: CopulaFamily::T,
                parameters: vec![0.5, 6.0],
                log_likelihood: Some(40.0),
                aic: Some(-76.0),
                bic: Some(-70.0),
                tau: 0.25,
                tail: TailDependence::symmetric(Some(0.125)),
                n: 150,
            }),
            gof: None,
            gof_error: Some("t: non-finite empirical_cvm statistic".to_string()),
        };
        let record = FamilyRecord::from(&report);
        assert!(record.fit_success);
        assert!(record.gof_statistic.is_none());
        assert_eq!(record.error_message.as_deref(), Some("t: non-finite empirical_cvm statistic"));

        let json = serde_json::to_string(&report).unwrap();
        let back: FamilyReport = serde_json::from_str(&json).unwrap();
        assert_eq!(back, report);
    }

    #[test]
    fn family_serializes_with_lowercase_tag() {
        let json = serde_json::to_string(&CopulaFamily::TDf15).unwrap();
        assert_eq!(json, "\"t_df15\"");
    }
}
