//! Analysis engine: one condition (one bivariate sample) end to end.
//!
//! pseudo-observations -> fit every family -> AIC selection -> bootstrap GoF
//!
//! Families are fitted in parallel. GoF runs family by family with the
//! replicates of each family spread across the pool, so a slow family does
//! not hold a worker hostage while others sit idle.

use std::time::Duration;

use rayon::prelude::*;
use tracing::{info, warn};

use crate::domain::{
    AnalysisConfig, ConditionReport, CopulaFamily, FamilyOutcome, FamilyReport, FittedCopula, GofResult,
};
use crate::error::{CopulaError, CopulaResult};
use crate::fit::{fit_family, select};
use crate::gof::{BootstrapConfig, CancelToken, bootstrap_gof};
use crate::math::{EmpiricalMargins, count_unique, pseudo_observations};

/// Analyze one bivariate sample under `config`.
///
/// Only condition-level failures leave this function: invalid input,
/// insufficient sample size, all families failing, or cancellation.
pub fn analyze(x: &[f64], y: &[f64], config: &AnalysisConfig) -> CopulaResult<ConditionReport> {
    let cancel = match config.timeout_secs {
        Some(secs) => CancelToken::with_timeout(Duration::from_secs(secs)),
        None => CancelToken::new(),
    };
    analyze_with_cancel(x, y, config, &cancel)
}

/// `analyze` with a caller-owned cancellation token.
pub fn analyze_with_cancel(
    x: &[f64],
    y: &[f64],
    config: &AnalysisConfig,
    cancel: &CancelToken,
) -> CopulaResult<ConditionReport> {
    if x.len() != y.len() {
        return Err(CopulaError::InvalidInput(format!(
            "X has {} values, Y has {}",
            x.len(),
            y.len()
        )));
    }
    let n = x.len();
    if n < config.min_sample_size {
        return Err(CopulaError::InsufficientSampleSize {
            n,
            min: config.min_sample_size,
        });
    }
    let families = dedup_families(&config.families);
    if families.is_empty() {
        return Err(CopulaError::InvalidInput("no copula families requested".to_string()));
    }

    let obs = pseudo_observations(x, y)?;
    let margins = EmpiricalMargins::from_samples(x, y)?;
    let unique_x = count_unique(x);
    let unique_y = count_unique(y);

    let seed = config.seed.unwrap_or_else(rand::random);
    info!(n, unique_x, unique_y, seed, families = families.len(), "analyzing condition");

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(config.workers)
        .build()
        .map_err(|e| CopulaError::InvalidInput(format!("thread pool: {e}")))?;

    pool.install(|| {
        let outcomes: Vec<FamilyOutcome> = families.par_iter().map(|&f| fit_family(f, &obs)).collect();
        let selection = select(&outcomes)?;

        let boot = BootstrapConfig {
            n_bootstrap: config.n_bootstrap,
            root_seed: seed,
            statistic: config.statistic,
            max_drop_rate: config.max_drop_rate,
        };

        let mut reports = Vec::with_capacity(outcomes.len());
        for outcome in outcomes {
            let report = if config.gof {
                family_report(outcome, |fit| bootstrap_gof(fit, &obs, &margins, &boot, cancel))?
            } else {
                FamilyReport {
                    outcome,
                    gof: None,
                    gof_error: None,
                }
            };
            reports.push(report);
        }

        info!(best = %selection.best, "condition complete");
        Ok(ConditionReport {
            n,
            unique_x,
            unique_y,
            seed,
            families: reports,
            ranking: selection.ranking,
            best_family: selection.best,
        })
    })
}

/// Attach GoF to a fitted outcome. Only cancellation aborts the condition;
/// any other GoF failure is kept on the report.
fn family_report<F>(outcome: FamilyOutcome, run_gof: F) -> CopulaResult<FamilyReport>
where
    F: FnOnce(&FittedCopula) -> CopulaResult<GofResult>,
{
    let FamilyOutcome::Fitted(fit) = &outcome else {
        return Ok(FamilyReport {
            outcome,
            gof: None,
            gof_error: None,
        });
    };
    match run_gof(fit) {
        Ok(gof) => Ok(FamilyReport {
            outcome,
            gof: Some(gof),
            gof_error: None,
        }),
        Err(CopulaError::Cancelled) => Err(CopulaError::Cancelled),
        Err(err) => {
            warn!(family = %fit.family, error = %err, "goodness-of-fit unavailable");
            Ok(FamilyReport {
                outcome,
                gof: None,
                gof_error: Some(format!("goodness-of-fit failed: {err}")),
            })
        }
    }
}

fn dedup_families(requested: &[CopulaFamily]) -> Vec<CopulaFamily> {
    let mut out: Vec<CopulaFamily> = Vec::with_capacity(requested.len());
    for &family in requested {
        if !out.contains(&family) {
            out.push(family);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    use crate::domain::FamilyRecord;
    use crate::fit::fit_copula;
    use crate::models::copula;

    fn sample(family: CopulaFamily, params: &[f64], n: usize) -> (Vec<f64>, Vec<f64>) {
        let mut rng = StdRng::seed_from_u64(99);
        let draw = copula(family).sample(params, n, &mut rng);
        (draw.u, draw.v)
    }

    #[test]
    fn small_samples_are_rejected_before_fitting() {
        let (x, y) = sample(CopulaFamily::Gaussian, &[0.5], 50);
        let err = analyze(&x, &y, &AnalysisConfig::default()).unwrap_err();
        assert!(matches!(err, CopulaError::InsufficientSampleSize { n: 50, min: 100 }));
    }

    #[test]
    fn every_requested_family_is_reported_in_order() {
        let (x, y) = sample(CopulaFamily::Frank, &[-5.0], 300);
        let config = AnalysisConfig {
            gof: false,
            seed: Some(1),
            ..AnalysisConfig::default()
        };
        let report = analyze(&x, &y, &config).unwrap();
        let listed: Vec<_> = report.families.iter().map(|r| r.outcome.family()).collect();
        assert_eq!(listed, CopulaFamily::DEFAULT_SET.to_vec());
        // Negative dependence: Clayton and Gumbel sit at their lower bound.
        assert!(report.report_for(CopulaFamily::Clayton).unwrap().outcome.fitted().is_none());
        assert!(report.report_for(CopulaFamily::Gumbel).unwrap().outcome.fitted().is_none());
        assert_ne!(report.best_family, CopulaFamily::Comonotonic);
        assert_eq!(report.ranking.last().map(|e| e.family), Some(CopulaFamily::Comonotonic));
    }

    #[test]
    fn fixed_seed_reproduces_across_worker_counts() {
        let (x, y) = sample(CopulaFamily::Clayton, &[2.0], 200);
        let run = |workers| {
            let config = AnalysisConfig {
                families: vec![CopulaFamily::Clayton, CopulaFamily::Frank],
                n_bootstrap: 6,
                workers,
                seed: Some(5),
                ..AnalysisConfig::default()
            };
            analyze(&x, &y, &config).unwrap()
        };
        assert_eq!(run(1), run(3));
    }

    #[test]
    fn expired_timeout_cancels_the_condition() {
        let (x, y) = sample(CopulaFamily::Gaussian, &[0.3], 150);
        let config = AnalysisConfig {
            families: vec![CopulaFamily::Gaussian],
            n_bootstrap: 10,
            seed: Some(3),
            timeout_secs: Some(0),
            ..AnalysisConfig::default()
        };
        assert!(matches!(analyze(&x, &y, &config), Err(CopulaError::Cancelled)));
    }

    fn fitted_gaussian() -> FamilyOutcome {
        let (x, y) = sample(CopulaFamily::Gaussian, &[0.5], 150);
        let obs = pseudo_observations(&x, &y).unwrap();
        FamilyOutcome::Fitted(fit_copula(CopulaFamily::Gaussian, &obs).unwrap())
    }

    #[test]
    fn gof_failure_is_kept_on_the_record() {
        let report = family_report(fitted_gaussian(), |fit| {
            Err(CopulaError::OptimizerNonConvergence {
                family: fit.family,
                message: "non-finite empirical_cvm statistic".to_string(),
            })
        })
        .unwrap();
        assert!(report.gof.is_none());

        let record = FamilyRecord::from(&report);
        assert!(record.fit_success);
        assert!(record.gof_p_value.is_none());
        let message = record.error_message.unwrap();
        assert!(message.starts_with("goodness-of-fit failed"), "{message}");
        assert!(message.contains("non-finite empirical_cvm statistic"), "{message}");
    }

    #[test]
    fn cancelled_gof_aborts_instead_of_recording() {
        let result = family_report(fitted_gaussian(), |_| Err(CopulaError::Cancelled));
        assert!(matches!(result, Err(CopulaError::Cancelled)));
    }
}
