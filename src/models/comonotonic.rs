//! The comonotonic copula `M(u, v) = min(u, v)`.
//!
//! Upper Fréchet–Hoeffding bound: zero parameters, τ = 1 and both tail
//! coefficients equal to 1 by construction. It has no density, so there is no
//! likelihood to maximize and "fitting" only records these facts.

use rand::Rng;
use rand::rngs::StdRng;
use rand_distr::Open01;

use super::{Copula, Estimate, FitFailure};
use crate::domain::{CopulaFamily, PseudoObservations, TailDependence};

#[derive(Debug, Clone, Copy, Default)]
pub struct Comonotonic;

impl Copula for Comonotonic {
    fn family(&self) -> CopulaFamily {
        CopulaFamily::Comonotonic
    }

    fn fit(&self, _obs: &PseudoObservations) -> Result<Estimate, FitFailure> {
        Ok(Estimate {
            parameters: Vec::new(),
            log_likelihood: None,
        })
    }

    fn log_likelihood(&self, _params: &[f64], _obs: &PseudoObservations) -> Option<f64> {
        None
    }

    fn kendall_tau(&self, _params: &[f64]) -> f64 {
        1.0
    }

    fn tail_dependence(&self, _params: &[f64]) -> TailDependence {
        TailDependence::symmetric(Some(1.0))
    }

    fn sample(&self, _params: &[f64], n: usize, rng: &mut StdRng) -> PseudoObservations {
        let u: Vec<f64> = (0..n).map(|_| rng.sample(Open01)).collect();
        PseudoObservations { v: u.clone(), u }
    }

    fn conditional_cdf(&self, _params: &[f64], obs: &PseudoObservations) -> Vec<f64> {
        obs.pairs().map(|(u, v)| if v >= u { 1.0 } else { 0.0 }).collect()
    }

    fn cdf(&self, _params: &[f64], u: f64, v: f64) -> Option<f64> {
        Some(u.min(v).clamp(0.0, 1.0))
    }

    /// `C(U, U) = U` is uniform, so `K(w) = w`.
    fn kendall_function(&self, _params: &[f64], w: f64) -> Option<f64> {
        Some(w.clamp(0.0, 1.0))
    }
}
