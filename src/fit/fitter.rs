//! Family Fitter: one copula family on one set of pseudo-observations.
//!
//! Given:
//! - pseudo-observations `(u_i, v_i)`
//! - a family tag
//!
//! we run the family's parameter search and derive:
//! - log-likelihood, AIC = −2ℓ + 2k, BIC = −2ℓ + k·ln(n)
//! - Kendall's τ and tail-dependence coefficients (closed forms)
//!
//! Non-convergence and boundary estimates are family-level failures: they are
//! returned as `FamilyOutcome::Failed` and never abort the other families.

use tracing::{debug, warn};

use crate::domain::{CopulaFamily, FamilyOutcome, FittedCopula, PseudoObservations};
use crate::error::{CopulaError, CopulaResult};
use crate::models::{FitFailure, copula};

/// Fit one family, propagating failures as typed errors.
///
/// The bootstrap uses this directly for replicate refits.
pub fn fit_copula(family: CopulaFamily, obs: &PseudoObservations) -> CopulaResult<FittedCopula> {
    let model = copula(family);
    let estimate = model.fit(obs).map_err(|failure| match failure {
        FitFailure::NonConvergence(message) => CopulaError::OptimizerNonConvergence { family, message },
        FitFailure::Boundary(message) => CopulaError::DegenerateParameterBoundary { family, message },
    })?;

    let n = obs.len();
    let k = family.free_param_count() as f64;
    let (aic, bic) = match estimate.log_likelihood {
        Some(ll) => (Some(-2.0 * ll + 2.0 * k), Some(-2.0 * ll + k * (n as f64).ln())),
        None => (None, None),
    };

    let tau = model.kendall_tau(&estimate.parameters);
    if !tau.is_finite() {
        return Err(CopulaError::OptimizerNonConvergence {
            family,
            message: format!("non-finite Kendall's tau for parameters {:?}", estimate.parameters),
        });
    }

    Ok(FittedCopula {
        family,
        tail: model.tail_dependence(&estimate.parameters),
        parameters: estimate.parameters,
        log_likelihood: estimate.log_likelihood,
        aic,
        bic,
        tau,
        n,
    })
}

/// Fit one family and capture any failure as data.
pub fn fit_family(family: CopulaFamily, obs: &PseudoObservations) -> FamilyOutcome {
    match fit_copula(family, obs) {
        Ok(fit) => {
            debug!(
                family = %family,
                params = ?fit.parameters,
                log_lik = ?fit.log_likelihood,
                tau = fit.tau,
                "family fitted"
            );
            FamilyOutcome::Fitted(fit)
        }
        Err(err) => {
            warn!(family = %family, error = %err, "family fit failed");
            FamilyOutcome::Failed {
                family,
                error_message: err.to_string(),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn draw(family: CopulaFamily, params: &[f64], n: usize) -> PseudoObservations {
        let mut rng = StdRng::seed_from_u64(31);
        copula(family).sample(params, n, &mut rng)
    }

    #[test]
    fn information_criteria_follow_parameter_count() {
        let obs = draw(CopulaFamily::T, &[0.5, 6.0], 800);
        let fit = fit_copula(CopulaFamily::T, &obs).unwrap();
        let ll = fit.log_likelihood.unwrap();
        assert!((fit.aic.unwrap() - (-2.0 * ll + 4.0)).abs() < 1e-9);
        assert!((fit.bic.unwrap() - (-2.0 * ll + 2.0 * 800f64.ln())).abs() < 1e-9);
        assert_eq!(fit.parameters.len(), 2);
    }

    #[test]
    fn comonotonic_fit_has_no_likelihood_and_unit_tau() {
        let obs = draw(CopulaFamily::Gaussian, &[0.4], 200);
        let fit = fit_copula(CopulaFamily::Comonotonic, &obs).unwrap();
        assert!(fit.parameters.is_empty());
        assert!(fit.log_likelihood.is_none() && fit.aic.is_none() && fit.bic.is_none());
        assert!((fit.tau - 1.0).abs() < 1e-10);
        assert_eq!(fit.tail.lower, Some(1.0));
        assert_eq!(fit.tail.upper, Some(1.0));
    }

    #[test]
    fn boundary_estimate_is_captured_as_failure() {
        let obs = draw(CopulaFamily::Frank, &[-6.0], 600);
        match fit_family(CopulaFamily::Gumbel, &obs) {
            FamilyOutcome::Failed { family, error_message } => {
                assert_eq!(family, CopulaFamily::Gumbel);
                assert!(error_message.contains("boundary"), "{error_message}");
            }
            other => panic!("expected failure, got {other:?}"),
        }
    }
}
