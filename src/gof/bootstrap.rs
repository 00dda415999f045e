//! Bootstrap GoF Tester (parametric bootstrap).
//!
//! For a fitted family with parameters θ̂ and observed statistic `S_obs`:
//!
//! 1. draw `n` pairs from the fitted copula
//! 2. push them through the empirical margins and re-rank (synthetic data
//!    carries the observed tie structure)
//! 3. refit the same family and recompute the statistic, giving `S_b`
//! 4. `p = (1 + #{S_b ≥ S_obs}) / (N_used + 1)`
//!
//! Replicates are independent: replicate `b` of family `f` draws from a
//! stream seeded by `hash(root, f, b)`, so families never share draws and the
//! result is identical for any worker count. A replicate whose refit or
//! statistic fails is dropped from both numerator and denominator.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use rand::SeedableRng;
use rand::rngs::StdRng;
use rayon::prelude::*;
use tracing::{debug, warn};

use super::cancel::CancelToken;
use super::statistic::comonotonic_statistic;
use crate::domain::{CopulaFamily, FittedCopula, GofResult, PseudoObservations, StatisticKind};
use crate::error::{CopulaError, CopulaResult};
use crate::fit::fit_copula;
use crate::math::EmpiricalMargins;
use crate::models::copula;

pub const COMONOTONIC_METHOD: &str = "comonotonic_observed_only";

#[derive(Debug, Clone, PartialEq)]
pub struct BootstrapConfig {
    pub n_bootstrap: usize,
    pub root_seed: u64,
    pub statistic: StatisticKind,
    /// Fraction of dropped replicates above which a warning is attached.
    pub max_drop_rate: f64,
}

/// `(1 + exceed) / (used + 1)`; `None` when no replicate completed.
///
/// The `+1` terms count the observed sample as one of the draws, which keeps
/// the p-value strictly inside `(0, 1]`.
pub fn p_value(exceed: usize, used: usize) -> Option<f64> {
    if used == 0 {
        return None;
    }
    Some((1 + exceed.min(used)) as f64 / (used + 1) as f64)
}

/// Seed for replicate `replicate` of `family` under `root`.
pub fn replicate_seed(root: u64, family: CopulaFamily, replicate: usize) -> u64 {
    let mut hasher = DefaultHasher::new();
    root.hash(&mut hasher);
    family.index().hash(&mut hasher);
    replicate.hash(&mut hasher);
    hasher.finish()
}

enum Replicate {
    Done(f64),
    Failed(String),
    Skipped,
}

fn run_replicate(
    fit: &FittedCopula,
    margins: &EmpiricalMargins,
    config: &BootstrapConfig,
    replicate: usize,
) -> Result<f64, String> {
    let mut rng = StdRng::seed_from_u64(replicate_seed(config.root_seed, fit.family, replicate));
    let draw = copula(fit.family).sample(&fit.parameters, margins.len(), &mut rng);
    let synthetic = margins.resample(&draw).map_err(|e| e.to_string())?;
    let refit = fit_copula(fit.family, &synthetic).map_err(|e| e.to_string())?;
    config.statistic.compute(&refit, &synthetic)
}

/// Run the parametric bootstrap for one fitted family.
///
/// Runs on the current rayon pool. Returns `Cancelled` (and no partial
/// counts) if `cancel` fires before every replicate has been attempted.
pub fn bootstrap_gof(
    fit: &FittedCopula,
    obs: &PseudoObservations,
    margins: &EmpiricalMargins,
    config: &BootstrapConfig,
    cancel: &CancelToken,
) -> CopulaResult<GofResult> {
    if margins.len() != obs.len() {
        return Err(CopulaError::InvalidInput(format!(
            "margins hold {} observations, sample has {}",
            margins.len(),
            obs.len()
        )));
    }

    if fit.family == CopulaFamily::Comonotonic {
        return Ok(GofResult {
            family: fit.family,
            statistic: comonotonic_statistic(obs),
            replicate_statistics: Vec::new(),
            replicates_requested: 0,
            replicates_failed: 0,
            p_value: None,
            method: COMONOTONIC_METHOD.to_string(),
            statistic_kind: StatisticKind::Empirical.label().to_string(),
            warning: None,
        });
    }

    let observed = config
        .statistic
        .compute(fit, obs)
        .map_err(|message| CopulaError::OptimizerNonConvergence {
            family: fit.family,
            message,
        })?;

    let outcomes: Vec<Replicate> = (0..config.n_bootstrap)
        .into_par_iter()
        .map(|b| {
            if cancel.is_cancelled() {
                return Replicate::Skipped;
            }
            match run_replicate(fit, margins, config, b) {
                Ok(s) => Replicate::Done(s),
                Err(message) => Replicate::Failed(message),
            }
        })
        .collect();

    if outcomes.iter().any(|r| matches!(r, Replicate::Skipped)) {
        warn!(family = %fit.family, "bootstrap cancelled; partial replicates discarded");
        return Err(CopulaError::Cancelled);
    }

    let mut replicate_statistics = Vec::with_capacity(config.n_bootstrap);
    let mut replicates_failed = 0;
    for outcome in outcomes {
        match outcome {
            Replicate::Done(s) => replicate_statistics.push(s),
            Replicate::Failed(message) => {
                replicates_failed += 1;
                debug!(family = %fit.family, %message, "bootstrap replicate dropped");
            }
            Replicate::Skipped => {}
        }
    }

    let used = replicate_statistics.len();
    let exceed = replicate_statistics.iter().filter(|&&s| s >= observed).count();
    let p = p_value(exceed, used);

    let drop_rate = if config.n_bootstrap == 0 {
        0.0
    } else {
        replicates_failed as f64 / config.n_bootstrap as f64
    };
    let warning = if used == 0 && config.n_bootstrap > 0 {
        Some(format!("all {} bootstrap replicates failed", config.n_bootstrap))
    } else if drop_rate > config.max_drop_rate {
        Some(format!(
            "{replicates_failed} of {} bootstrap replicates dropped ({:.1}%)",
            config.n_bootstrap,
            100.0 * drop_rate
        ))
    } else {
        None
    };
    if let Some(w) = &warning {
        warn!(family = %fit.family, warning = %w, "bootstrap drop rate high");
    }

    debug!(
        family = %fit.family,
        statistic = observed,
        used,
        exceed,
        p_value = ?p,
        "bootstrap complete"
    );

    Ok(GofResult {
        family: fit.family,
        statistic: observed,
        replicate_statistics,
        replicates_requested: config.n_bootstrap,
        replicates_failed,
        p_value: p,
        method: format!("bootstrap_N={}", config.n_bootstrap),
        statistic_kind: config.statistic.label().to_string(),
        warning,
    })
}
