//! Copula family implementations.
//!
//! Every family implements the same `Copula` trait; calling code dispatches
//! through `copula(family)` and never special-cases a family by name.
//! Comonotonic implements the trait with its degenerate behavior (no
//! parameters, no density).

use rand::rngs::StdRng;

use crate::domain::{PseudoObservations, TailDependence};

pub use crate::domain::CopulaFamily;

pub mod archimedean;
pub mod comonotonic;
pub mod elliptical;

pub use archimedean::{Clayton, Frank, Gumbel};
pub use comonotonic::Comonotonic;
pub use elliptical::{Gaussian, StudentT};

/// Result of a successful parameter search.
#[derive(Debug, Clone, PartialEq)]
pub struct Estimate {
    pub parameters: Vec<f64>,
    pub log_likelihood: Option<f64>,
}

/// Why a parameter search did not produce a usable estimate.
#[derive(Debug, Clone, PartialEq)]
pub enum FitFailure {
    NonConvergence(String),
    Boundary(String),
}

/// Uniform interface over bivariate copula families.
pub trait Copula: Send + Sync {
    fn family(&self) -> CopulaFamily;

    /// Estimate parameters from pseudo-observations.
    fn fit(&self, obs: &PseudoObservations) -> Result<Estimate, FitFailure>;

    /// Log-likelihood of the sample; `None` when undefined or non-finite.
    fn log_likelihood(&self, params: &[f64], obs: &PseudoObservations) -> Option<f64>;

    /// Kendall's τ in closed form.
    fn kendall_tau(&self, params: &[f64]) -> f64;

    fn tail_dependence(&self, params: &[f64]) -> TailDependence;

    /// Draw `n` pairs from the copula.
    fn sample(&self, params: &[f64], n: usize, rng: &mut StdRng) -> PseudoObservations;

    /// `h(v_i | u_i) = ∂C/∂u` evaluated for every pair (second Rosenblatt coordinate).
    fn conditional_cdf(&self, params: &[f64], obs: &PseudoObservations) -> Vec<f64>;

    /// Copula cdf `C(u, v)` when available in closed form.
    fn cdf(&self, _params: &[f64], _u: f64, _v: f64) -> Option<f64> {
        None
    }

    /// Kendall distribution `K(w) = P(C(U,V) ≤ w)` when available in closed form.
    fn kendall_function(&self, _params: &[f64], _w: f64) -> Option<f64> {
        None
    }
}

static GAUSSIAN: Gaussian = Gaussian;
static T_FREE: StudentT = StudentT::free();
static T_DF5: StudentT = StudentT::fixed(CopulaFamily::TDf5, 5.0);
static T_DF10: StudentT = StudentT::fixed(CopulaFamily::TDf10, 10.0);
static T_DF15: StudentT = StudentT::fixed(CopulaFamily::TDf15, 15.0);
static CLAYTON: Clayton = Clayton;
static GUMBEL: Gumbel = Gumbel;
static FRANK: Frank = Frank;
static COMONOTONIC: Comonotonic = Comonotonic;

/// The implementation behind a family tag.
pub fn copula(family: CopulaFamily) -> &'static dyn Copula {
    match family {
        CopulaFamily::Gaussian => &GAUSSIAN,
        CopulaFamily::T => &T_FREE,
        CopulaFamily::TDf5 => &T_DF5,
        CopulaFamily::TDf10 => &T_DF10,
        CopulaFamily::TDf15 => &T_DF15,
        CopulaFamily::Clayton => &CLAYTON,
        CopulaFamily::Gumbel => &GUMBEL,
        CopulaFamily::Frank => &FRANK,
        CopulaFamily::Comonotonic => &COMONOTONIC,
    }
}

impl CopulaFamily {
    /// Shorthand for `copula(self)`.
    pub fn model(self) -> &'static dyn Copula {
        copula(self)
    }
}

/// Clamp a probability into the open unit interval.
pub(crate) fn open_unit(p: f64) -> f64 {
    p.clamp(crate::math::P_EPS, 1.0 - crate::math::P_EPS)
}

/// Sum per-pair log-densities; `None` if any term is non-finite.
pub(crate) fn sum_log_density<F>(obs: &PseudoObservations, log_density: F) -> Option<f64>
where
    F: Fn(f64, f64) -> f64,
{
    let mut total = 0.0;
    for (u, v) in obs.pairs() {
        let ld = log_density(u, v);
        if !ld.is_finite() {
            return None;
        }
        total += ld;
    }
    Some(total)
}

/// Clamp a cdf value into the Fréchet–Hoeffding bounds.
pub(crate) fn frechet_clamp(c: f64, u: f64, v: f64) -> f64 {
    c.clamp((u + v - 1.0).max(0.0), u.min(v))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn dispatch_returns_matching_family() {
        for family in CopulaFamily::ALL {
            assert_eq!(copula(family).family(), family);
            assert_eq!(family.model().family(), family);
        }
    }

    #[rstest]
    #[case(CopulaFamily::Clayton, vec![2.5])]
    #[case(CopulaFamily::Gumbel, vec![1.7])]
    #[case(CopulaFamily::Frank, vec![7.0])]
    #[case(CopulaFamily::Frank, vec![-5.0])]
    fn closed_form_cdf_integrates_the_conditional_cdf(#[case] family: CopulaFamily, #[case] params: Vec<f64>) {
        let model = copula(family);
        let m = 4000;
        for (a, b) in [(0.3, 0.6), (0.5, 0.5), (0.8, 0.2)] {
            let u: Vec<f64> = (0..m).map(|k| a * (k as f64 + 0.5) / m as f64).collect();
            let obs = PseudoObservations { v: vec![b; m], u };
            let integral = a * model.conditional_cdf(&params, &obs).iter().sum::<f64>() / m as f64;
            let c = model.cdf(&params, a, b).unwrap();
            assert!((c - integral).abs() < 1e-3, "{family}: C({a}, {b})={c} vs {integral}");
        }
        assert!((model.cdf(&params, 0.4, 1.0).unwrap() - 0.4).abs() < 1e-12);
        assert!((model.cdf(&params, 1.0, 0.7).unwrap() - 0.7).abs() < 1e-12);
    }

    #[test]
    fn elliptical_families_have_no_closed_form_cdf() {
        assert!(copula(CopulaFamily::Gaussian).cdf(&[0.5], 0.3, 0.3).is_none());
        assert!(copula(CopulaFamily::T).cdf(&[0.5, 4.0], 0.3, 0.3).is_none());
        assert_eq!(copula(CopulaFamily::Comonotonic).cdf(&[], 0.3, 0.6), Some(0.3));
    }
}
