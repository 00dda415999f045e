//! Model Selector: rank successfully fitted families by AIC.
//!
//! Selection rules:
//! 1. Only families with a successful fit take part
//! 2. Rank ascending by AIC (BIC and ΔAIC-from-best recorded alongside)
//! 3. AIC values within `AIC_TIE_TOL` of each other count as tied; ties
//!    prefer fewer free parameters
//! 4. Families without a likelihood (Comonotonic) rank after all others

use std::cmp::Ordering;

use tracing::info;

use crate::domain::{CopulaFamily, FamilyOutcome, RankEntry};
use crate::error::{CopulaError, CopulaResult};

/// AIC differences at or below this are treated as ties.
pub const AIC_TIE_TOL: f64 = 1e-6;

/// Output of model selection.
#[derive(Debug, Clone, PartialEq)]
pub struct Selection {
    pub ranking: Vec<RankEntry>,
    pub best: CopulaFamily,
}

/// Rank the successful fits; `AllFamiliesFailed` if there are none.
pub fn select(outcomes: &[FamilyOutcome]) -> CopulaResult<Selection> {
    let mut scored: Vec<RankEntry> = Vec::new();
    let mut unscored: Vec<RankEntry> = Vec::new();

    for fit in outcomes.iter().filter_map(FamilyOutcome::fitted) {
        let entry = RankEntry {
            family: fit.family,
            free_params: fit.family.free_param_count(),
            aic: fit.aic.filter(|v| v.is_finite()),
            bic: fit.bic.filter(|v| v.is_finite()),
            delta_aic: None,
        };
        if entry.aic.is_some() {
            scored.push(entry);
        } else {
            unscored.push(entry);
        }
    }

    if scored.is_empty() && unscored.is_empty() {
        return Err(CopulaError::AllFamiliesFailed);
    }

    let aic = |e: &RankEntry| e.aic.unwrap_or(f64::INFINITY);
    scored.sort_by(|a, b| aic(a).total_cmp(&aic(b)).then_with(|| a.family.cmp(&b.family)));

    // Within each run of AIC-tied entries, order by parameter count.
    let mut start = 0;
    while start < scored.len() {
        let anchor = aic(&scored[start]);
        let mut end = start + 1;
        while end < scored.len() && aic(&scored[end]) - anchor <= AIC_TIE_TOL {
            end += 1;
        }
        scored[start..end].sort_by(|a, b| match a.free_params.cmp(&b.free_params) {
            Ordering::Equal => aic(a).total_cmp(&aic(b)),
            other => other,
        });
        start = end;
    }

    if let Some(best_aic) = scored.first().and_then(|e| e.aic) {
        for entry in &mut scored {
            entry.delta_aic = entry.aic.map(|a| a - best_aic);
        }
    }

    unscored.sort_by(|a, b| a.family.cmp(&b.family));
    scored.extend(unscored);

    let best = scored[0].family;
    info!(best = %best, candidates = scored.len(), "model selection complete");
    Ok(Selection { ranking: scored, best })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{FittedCopula, TailDependence};

    fn fitted(family: CopulaFamily, aic: Option<f64>) -> FamilyOutcome {
        FamilyOutcome::Fitted(FittedCopula {
            family,
            parameters: vec![],
            log_likelihood: aic.map(|a| -a / 2.0),
            aic,
            bic: aic,
            tau: 0.5,
            tail: TailDependence::none(),
            n: 500,
        })
    }

    #[test]
    fn ranks_ascending_by_aic_with_deltas() {
        let outcomes = vec![
            fitted(CopulaFamily::Gaussian, Some(-100.0)),
            fitted(CopulaFamily::Clayton, Some(-80.0)),
            fitted(CopulaFamily::T, Some(-120.0)),
        ];
        let sel = select(&outcomes).unwrap();
        assert_eq!(sel.best, CopulaFamily::T);
        let order: Vec<_> = sel.ranking.iter().map(|e| e.family).collect();
        assert_eq!(order, vec![CopulaFamily::T, CopulaFamily::Gaussian, CopulaFamily::Clayton]);
        assert_eq!(sel.ranking[0].delta_aic, Some(0.0));
        assert_eq!(sel.ranking[2].delta_aic, Some(40.0));
    }

    #[test]
    fn near_tie_prefers_fewer_parameters() {
        let outcomes = vec![
            fitted(CopulaFamily::T, Some(-100.0)),
            fitted(CopulaFamily::Gaussian, Some(-100.0 + 5e-7)),
        ];
        let sel = select(&outcomes).unwrap();
        assert_eq!(sel.best, CopulaFamily::Gaussian);
    }

    #[test]
    fn failures_are_excluded_and_comonotonic_ranks_last() {
        let outcomes = vec![
            fitted(CopulaFamily::Comonotonic, None),
            FamilyOutcome::Failed {
                family: CopulaFamily::Gumbel,
                error_message: "boundary".to_string(),
            },
            fitted(CopulaFamily::Frank, Some(-10.0)),
        ];
        let sel = select(&outcomes).unwrap();
        let order: Vec<_> = sel.ranking.iter().map(|e| e.family).collect();
        assert_eq!(order, vec![CopulaFamily::Frank, CopulaFamily::Comonotonic]);
        assert_eq!(sel.ranking[1].delta_aic, None);
    }

    #[test]
    fn all_failed_is_a_condition_level_error() {
        let outcomes = vec![FamilyOutcome::Failed {
            family: CopulaFamily::Clayton,
            error_message: "did not converge".to_string(),
        }];
        assert!(matches!(select(&outcomes), Err(CopulaError::AllFamiliesFailed)));
        assert!(matches!(select(&[]), Err(CopulaError::AllFamiliesFailed)));
    }
}
