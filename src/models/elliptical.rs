//! Elliptical copulas: Gaussian and Student-t.
//!
//! Both are fitted on marginal scores (`Φ⁻¹(u)` or `t_ν⁻¹(u)`) computed once per
//! candidate ν, so the inner ρ search only touches cheap arithmetic.
//!
//! Student-t uses maximum pseudo-likelihood as a profile: for each ν the best ρ
//! is found, and ν is searched on a log scale. Joint Newton-type estimation
//! of (ρ, ν) is not attempted.

use nalgebra::{Matrix2, Vector2};
use rand::Rng;
use rand::rngs::StdRng;
use rand_distr::{ChiSquared, Distribution, StandardNormal};

use super::{Copula, Estimate, FitFailure, open_unit};
use crate::domain::{CopulaFamily, PseudoObservations, TailDependence};
use crate::math::{
    Maximum, SearchOptions, ln_gamma, maximize_bounded, normal_cdf, normal_quantile, student_t,
    student_t_cdf, student_t_quantiles,
};
use statrs::distribution::ContinuousCDF;

/// Search bounds for the correlation parameter.
pub const RHO_MIN: f64 = -0.999;
pub const RHO_MAX: f64 = 0.999;

/// Search bounds for the degrees of freedom.
///
/// Hitting `DF_MAX` is an acceptable estimate (the t copula has become
/// practically Gaussian); hitting `DF_MIN` is reported as a boundary fit.
pub const DF_MIN: f64 = 1.0;
pub const DF_MAX: f64 = 200.0;

/// Within this distance of ±1 the tail coefficient is taken at its limit.
const RHO_LIMIT_EPS: f64 = 1e-12;

fn rho_search() -> SearchOptions {
    SearchOptions::default()
}

fn df_search() -> SearchOptions {
    SearchOptions {
        grid_points: 12,
        tol: 1e-4,
        max_iter: 200,
    }
}

/// Kendall's τ shared by every elliptical copula.
fn elliptical_tau(rho: f64) -> f64 {
    std::f64::consts::FRAC_2_PI * rho.clamp(-1.0, 1.0).asin()
}

fn check_rho(family: CopulaFamily, best: &Maximum) -> Result<(), FitFailure> {
    if best.at_boundary {
        return Err(FitFailure::Boundary(format!(
            "{family}: rho={:.6} at search bound [{RHO_MIN}, {RHO_MAX}]",
            best.x
        )));
    }
    Ok(())
}

/// Lower-triangular Cholesky factor of the 2×2 correlation matrix.
fn correlation_factor(rho: f64) -> Matrix2<f64> {
    let rho = rho.clamp(-0.999_999, 0.999_999);
    Matrix2::new(1.0, rho, rho, 1.0)
        .cholesky()
        .map(|c| c.l())
        .unwrap_or_else(Matrix2::identity)
}

fn correlated_normals(rho: f64, n: usize, rng: &mut StdRng) -> Vec<Vector2<f64>> {
    let l = correlation_factor(rho);
    (0..n)
        .map(|_| {
            let z = Vector2::new(rng.sample::<f64, _>(StandardNormal), rng.sample::<f64, _>(StandardNormal));
            l * z
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Gaussian
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default)]
pub struct Gaussian;

/// Sufficient statistics for the Gaussian copula likelihood.
struct NormalScores {
    n: f64,
    sum_sq: f64,
    sum_xy: f64,
}

impl NormalScores {
    fn new(obs: &PseudoObservations) -> Self {
        let mut sum_sq = 0.0;
        let mut sum_xy = 0.0;
        for (u, v) in obs.pairs() {
            let x = normal_quantile(u);
            let y = normal_quantile(v);
            sum_sq += x * x + y * y;
            sum_xy += x * y;
        }
        Self {
            n: obs.len() as f64,
            sum_sq,
            sum_xy,
        }
    }

    fn log_likelihood(&self, rho: f64) -> f64 {
        let one_m = 1.0 - rho * rho;
        if one_m <= 0.0 {
            return f64::NEG_INFINITY;
        }
        -0.5 * self.n * one_m.ln() - (rho * rho * self.sum_sq - 2.0 * rho * self.sum_xy) / (2.0 * one_m)
    }
}

impl Copula for Gaussian {
    fn family(&self) -> CopulaFamily {
        CopulaFamily::Gaussian
    }

    fn fit(&self, obs: &PseudoObservations) -> Result<Estimate, FitFailure> {
        let scores = NormalScores::new(obs);
        let best = maximize_bounded(|rho| scores.log_likelihood(rho), RHO_MIN, RHO_MAX, &rho_search())
            .ok_or_else(|| FitFailure::NonConvergence("gaussian: rho search failed".to_string()))?;
        check_rho(CopulaFamily::Gaussian, &best)?;
        Ok(Estimate {
            parameters: vec![best.x],
            log_likelihood: Some(best.value),
        })
    }

    fn log_likelihood(&self, params: &[f64], obs: &PseudoObservations) -> Option<f64> {
        let ll = NormalScores::new(obs).log_likelihood(params[0]);
        ll.is_finite().then_some(ll)
    }

    fn kendall_tau(&self, params: &[f64]) -> f64 {
        elliptical_tau(params[0])
    }

    fn tail_dependence(&self, params: &[f64]) -> TailDependence {
        if params[0] >= 1.0 - RHO_LIMIT_EPS {
            TailDependence::symmetric(Some(1.0))
        } else {
            TailDependence::none()
        }
    }

    fn sample(&self, params: &[f64], n: usize, rng: &mut StdRng) -> PseudoObservations {
        let z = correlated_normals(params[0], n, rng);
        PseudoObservations {
            u: z.iter().map(|p| open_unit(normal_cdf(p[0]))).collect(),
            v: z.iter().map(|p| open_unit(normal_cdf(p[1]))).collect(),
        }
    }

    fn conditional_cdf(&self, params: &[f64], obs: &PseudoObservations) -> Vec<f64> {
        let rho = params[0];
        let scale = (1.0 - rho * rho).max(1e-12).sqrt();
        obs.pairs()
            .map(|(u, v)| normal_cdf((normal_quantile(v) - rho * normal_quantile(u)) / scale))
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Student-t
// ---------------------------------------------------------------------------

/// Student-t copula with free (`T`) or fixed (`t_df5` / `t_df10` / `t_df15`) ν.
///
/// Parameters are always `[ρ, ν]`.
#[derive(Debug, Clone, Copy)]
pub struct StudentT {
    family: CopulaFamily,
    fixed_df: Option<f64>,
}

impl StudentT {
    pub const fn free() -> Self {
        Self {
            family: CopulaFamily::T,
            fixed_df: None,
        }
    }

    pub const fn fixed(family: CopulaFamily, df: f64) -> Self {
        Self {
            family,
            fixed_df: Some(df),
        }
    }

    /// Best ρ for a fixed ν, and the corresponding log-likelihood.
    fn profile(&self, obs: &PseudoObservations, df: f64) -> Option<Maximum> {
        let scores = TScores::new(obs, df)?;
        maximize_bounded(|rho| scores.log_likelihood(rho), RHO_MIN, RHO_MAX, &rho_search())
    }
}

/// Marginal t-scores at one ν plus the ρ-independent part of the likelihood.
struct TScores {
    df: f64,
    x: Vec<f64>,
    y: Vec<f64>,
    constant: f64,
}

impl TScores {
    fn new(obs: &PseudoObservations, df: f64) -> Option<Self> {
        let x = student_t_quantiles(&obs.u, df)?;
        let y = student_t_quantiles(&obs.v, df)?;
        let n = obs.len() as f64;
        let norm = ln_gamma((df + 2.0) / 2.0) + ln_gamma(df / 2.0) - 2.0 * ln_gamma((df + 1.0) / 2.0);
        let marginal: f64 = x
            .iter()
            .zip(y.iter())
            .map(|(&a, &b)| (a * a / df).ln_1p() + (b * b / df).ln_1p())
            .sum();
        let constant = n * norm + 0.5 * (df + 1.0) * marginal;
        constant.is_finite().then_some(Self { df, x, y, constant })
    }

    fn log_likelihood(&self, rho: f64) -> f64 {
        let one_m = 1.0 - rho * rho;
        if one_m <= 0.0 {
            return f64::NEG_INFINITY;
        }
        let n = self.x.len() as f64;
        let scale = self.df * one_m;
        let quad: f64 = self
            .x
            .iter()
            .zip(self.y.iter())
            .map(|(&a, &b)| ((a * a + b * b - 2.0 * rho * a * b) / scale).ln_1p())
            .sum();
        self.constant - 0.5 * n * one_m.ln() - 0.5 * (self.df + 2.0) * quad
    }
}

/// `λ = 2·t_{ν+1}(−√((ν+1)(1−ρ)/(1+ρ)))`, with explicit branches at the
/// ρ = ±1 limits instead of letting the square root produce NaN.
pub fn t_tail_coefficient(rho: f64, df: f64) -> Option<f64> {
    if !(rho.is_finite() && df.is_finite() && df > 0.0) {
        return None;
    }
    if rho >= 1.0 - RHO_LIMIT_EPS {
        return Some(1.0);
    }
    if rho <= -1.0 + RHO_LIMIT_EPS {
        return Some(0.0);
    }
    let arg = -((df + 1.0) * (1.0 - rho) / (1.0 + rho)).sqrt();
    let lambda = 2.0 * student_t_cdf(arg, df + 1.0)?;
    lambda.is_finite().then(|| lambda.clamp(0.0, 1.0))
}

impl Copula for StudentT {
    fn family(&self) -> CopulaFamily {
        self.family
    }

    fn fit(&self, obs: &PseudoObservations) -> Result<Estimate, FitFailure> {
        let family = self.family;
        if let Some(df) = self.fixed_df {
            let best = self
                .profile(obs, df)
                .ok_or_else(|| FitFailure::NonConvergence(format!("{family}: rho search failed at df={df}")))?;
            check_rho(family, &best)?;
            return Ok(Estimate {
                parameters: vec![best.x, df],
                log_likelihood: Some(best.value),
            });
        }

        let profile_ll = |ln_df: f64| self.profile(obs, ln_df.exp()).map_or(f64::NEG_INFINITY, |m| m.value);
        let best_df = maximize_bounded(profile_ll, DF_MIN.ln(), DF_MAX.ln(), &df_search())
            .ok_or_else(|| FitFailure::NonConvergence(format!("{family}: df profile search failed")))?;
        let df = best_df.x.exp();
        if best_df.at_boundary && df < DF_MIN * 1.01 {
            return Err(FitFailure::Boundary(format!(
                "{family}: df={df:.4} at lower search bound {DF_MIN}"
            )));
        }

        let best_rho = self
            .profile(obs, df)
            .ok_or_else(|| FitFailure::NonConvergence(format!("{family}: rho search failed at df={df:.4}")))?;
        check_rho(family, &best_rho)?;
        Ok(Estimate {
            parameters: vec![best_rho.x, df],
            log_likelihood: Some(best_rho.value),
        })
    }

    fn log_likelihood(&self, params: &[f64], obs: &PseudoObservations) -> Option<f64> {
        let ll = TScores::new(obs, params[1])?.log_likelihood(params[0]);
        ll.is_finite().then_some(ll)
    }

    fn kendall_tau(&self, params: &[f64]) -> f64 {
        elliptical_tau(params[0])
    }

    fn tail_dependence(&self, params: &[f64]) -> TailDependence {
        TailDependence::symmetric(t_tail_coefficient(params[0], params[1]))
    }

    fn sample(&self, params: &[f64], n: usize, rng: &mut StdRng) -> PseudoObservations {
        let (rho, df) = (params[0], params[1]);
        let z = correlated_normals(rho, n, rng);
        let (Some(dist), Ok(chi)) = (student_t(df), ChiSquared::new(df)) else {
            // Invalid ν: the normal limit is the only sensible draw.
            return PseudoObservations {
                u: z.iter().map(|p| open_unit(normal_cdf(p[0]))).collect(),
                v: z.iter().map(|p| open_unit(normal_cdf(p[1]))).collect(),
            };
        };

        let mut u = Vec::with_capacity(n);
        let mut v = Vec::with_capacity(n);
        for p in &z {
            let w: f64 = chi.sample(rng) / df;
            let s = w.max(f64::MIN_POSITIVE).sqrt();
            u.push(open_unit(dist.cdf(p[0] / s)));
            v.push(open_unit(dist.cdf(p[1] / s)));
        }
        PseudoObservations { u, v }
    }

    fn conditional_cdf(&self, params: &[f64], obs: &PseudoObservations) -> Vec<f64> {
        let (rho, df) = (params[0], params[1]);
        let (Some(x), Some(y), Some(cond)) = (
            student_t_quantiles(&obs.u, df),
            student_t_quantiles(&obs.v, df),
            student_t(df + 1.0),
        ) else {
            return vec![f64::NAN; obs.len()];
        };
        let one_m = (1.0 - rho * rho).max(1e-12);
        x.iter()
            .zip(y.iter())
            .map(|(&a, &b)| {
                let scale = ((df + a * a) * one_m / (df + 1.0)).sqrt();
                cond.cdf((b - rho * a) / scale)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    fn sample_obs(model: &dyn Copula, params: &[f64], n: usize, seed: u64) -> PseudoObservations {
        let mut rng = StdRng::seed_from_u64(seed);
        model.sample(params, n, &mut rng)
    }

    #[test]
    fn gaussian_fit_recovers_rho() {
        let obs = sample_obs(&Gaussian, &[0.6], 3000, 7);
        let est = Gaussian.fit(&obs).unwrap();
        assert!((est.parameters[0] - 0.6).abs() < 0.05, "rho={}", est.parameters[0]);
        assert!(est.log_likelihood.unwrap() > 0.0);
    }

    #[test]
    fn fixed_df_t_keeps_df_and_recovers_rho() {
        let model = StudentT::fixed(CopulaFamily::TDf5, 5.0);
        let obs = sample_obs(&model, &[0.5, 5.0], 2000, 11);
        let est = model.fit(&obs).unwrap();
        assert_eq!(est.parameters[1], 5.0);
        assert!((est.parameters[0] - 0.5).abs() < 0.06);
    }

    #[test]
    fn free_t_fit_detects_heavy_tails() {
        let model = StudentT::free();
        let obs = sample_obs(&model, &[0.7, 4.0], 3000, 3);
        let est = model.fit(&obs).unwrap();
        assert!((est.parameters[0] - 0.7).abs() < 0.05);
        assert!(est.parameters[1] > 2.0 && est.parameters[1] < 10.0, "df={}", est.parameters[1]);
    }

    #[test]
    fn log_likelihood_matches_fit_value() {
        let obs = sample_obs(&Gaussian, &[0.3], 500, 1);
        let est = Gaussian.fit(&obs).unwrap();
        let ll = Gaussian.log_likelihood(&est.parameters, &obs).unwrap();
        assert!((ll - est.log_likelihood.unwrap()).abs() < 1e-9);
    }

    #[test]
    fn t_tail_coefficient_is_guarded_at_limits() {
        assert_eq!(t_tail_coefficient(1.0, 4.0), Some(1.0));
        assert_eq!(t_tail_coefficient(-1.0, 4.0), Some(0.0));
        assert_eq!(t_tail_coefficient(0.5, f64::NAN), None);
        assert_eq!(t_tail_coefficient(0.5, 0.0), None);
        let mid = t_tail_coefficient(0.5, 4.0).unwrap();
        // Known value for rho=0.5, nu=4: ~0.2532
        assert!((mid - 0.2532).abs() < 1e-3, "lambda={mid}");
    }

    #[test]
    fn near_perfect_correlation_is_a_boundary_fit() {
        let u: Vec<f64> = (1..=200).map(|i| i as f64 / 201.0).collect();
        let obs = PseudoObservations { u: u.clone(), v: u };
        assert!(matches!(Gaussian.fit(&obs), Err(FitFailure::Boundary(_))));
    }

    #[test]
    fn conditional_cdf_is_a_probability() {
        let obs = sample_obs(&StudentT::free(), &[0.4, 6.0], 200, 5);
        let h = StudentT::free().conditional_cdf(&[0.4, 6.0], &obs);
        assert!(h.iter().all(|&p| (0.0..=1.0).contains(&p)));
    }
}
