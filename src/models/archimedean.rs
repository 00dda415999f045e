//! One-parameter Archimedean copulas: Clayton, Gumbel, Frank.
//!
//! All three share the same fitting routine (bounded ML over θ) and have
//! closed forms for τ, tail dependence and the Kendall distribution
//! `K(w) = w − φ(w)/φ'(w)`.

use rand::Rng;
use rand::rngs::StdRng;
use rand_distr::{Exp1, Open01};

use super::{Copula, Estimate, FitFailure, frechet_clamp, open_unit, sum_log_density};
use crate::domain::{CopulaFamily, PseudoObservations, TailDependence};
use crate::math::{SearchOptions, debye1, maximize_bounded, safe_ln};

/// Frank's θ below this magnitude is treated as independence.
const FRANK_INDEPENDENCE_EPS: f64 = 1e-8;

/// Gumbel's θ − 1 below this is treated as independence.
const GUMBEL_INDEPENDENCE_EPS: f64 = 1e-9;

fn fit_theta<C: Copula>(model: &C, obs: &PseudoObservations, lo: f64, hi: f64) -> Result<Estimate, FitFailure> {
    let family = model.family();
    let objective = |theta: f64| model.log_likelihood(&[theta], obs).unwrap_or(f64::NEG_INFINITY);
    let best = maximize_bounded(objective, lo, hi, &SearchOptions::default())
        .ok_or_else(|| FitFailure::NonConvergence(format!("{family}: theta search failed")))?;
    if best.at_boundary {
        return Err(FitFailure::Boundary(format!(
            "{family}: theta={:.6} at search bound [{lo}, {hi}]",
            best.x
        )));
    }
    Ok(Estimate {
        parameters: vec![best.x],
        log_likelihood: Some(best.value),
    })
}

/// `ln(e^a + e^b − 1)` for `a, b ≥ 0` without overflow.
fn ln_sum_exp_minus_one(a: f64, b: f64) -> f64 {
    let m = a.max(b);
    m + ((a - m).exp() + (b - m).exp() - (-m).exp()).ln()
}

/// `C(u, v)` on the boundary of the unit square, where every copula agrees.
fn cdf_edge(u: f64, v: f64) -> Option<f64> {
    if u <= 0.0 || v <= 0.0 {
        Some(0.0)
    } else if u >= 1.0 {
        Some(v.min(1.0))
    } else if v >= 1.0 {
        Some(u)
    } else {
        None
    }
}

fn independence_kendall(w: f64) -> f64 {
    if w <= 0.0 { 0.0 } else { w - w * w.ln() }
}

// ---------------------------------------------------------------------------
// Clayton
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default)]
pub struct Clayton;

impl Clayton {
    pub const THETA_MIN: f64 = 1e-4;
    pub const THETA_MAX: f64 = 40.0;

    fn log_density(theta: f64, u: f64, v: f64) -> f64 {
        let (lu, lv) = (u.ln(), v.ln());
        let l = ln_sum_exp_minus_one(-theta * lu, -theta * lv);
        (1.0 + theta).ln() - (1.0 + theta) * (lu + lv) - (2.0 + 1.0 / theta) * l
    }
}

impl Copula for Clayton {
    fn family(&self) -> CopulaFamily {
        CopulaFamily::Clayton
    }

    fn fit(&self, obs: &PseudoObservations) -> Result<Estimate, FitFailure> {
        fit_theta(self, obs, Self::THETA_MIN, Self::THETA_MAX)
    }

    fn log_likelihood(&self, params: &[f64], obs: &PseudoObservations) -> Option<f64> {
        let theta = params[0];
        if !(theta > 0.0) {
            return None;
        }
        sum_log_density(obs, |u, v| Self::log_density(theta, u, v))
    }

    fn kendall_tau(&self, params: &[f64]) -> f64 {
        params[0] / (params[0] + 2.0)
    }

    fn tail_dependence(&self, params: &[f64]) -> TailDependence {
        let lower = 2f64.powf(-1.0 / params[0]);
        TailDependence {
            lower: lower.is_finite().then_some(lower),
            upper: Some(0.0),
        }
    }

    fn sample(&self, params: &[f64], n: usize, rng: &mut StdRng) -> PseudoObservations {
        let theta = params[0];
        let mut u = Vec::with_capacity(n);
        let mut v = Vec::with_capacity(n);
        for _ in 0..n {
            let ui: f64 = rng.sample(Open01);
            let t: f64 = rng.sample(Open01);
            let inner = ui.powf(-theta) * (t.powf(-theta / (1.0 + theta)) - 1.0) + 1.0;
            u.push(ui);
            v.push(open_unit(inner.powf(-1.0 / theta)));
        }
        PseudoObservations { u, v }
    }

    fn conditional_cdf(&self, params: &[f64], obs: &PseudoObservations) -> Vec<f64> {
        let theta = params[0];
        obs.pairs()
            .map(|(u, v)| {
                let l = ln_sum_exp_minus_one(-theta * u.ln(), -theta * v.ln());
                ((-theta - 1.0) * u.ln() + (-1.0 / theta - 1.0) * l).exp().clamp(0.0, 1.0)
            })
            .collect()
    }

    fn cdf(&self, params: &[f64], u: f64, v: f64) -> Option<f64> {
        if let Some(edge) = cdf_edge(u, v) {
            return Some(edge);
        }
        let theta = params[0];
        let c = (-ln_sum_exp_minus_one(-theta * u.ln(), -theta * v.ln()) / theta).exp();
        c.is_finite().then(|| frechet_clamp(c, u, v))
    }

    fn kendall_function(&self, params: &[f64], w: f64) -> Option<f64> {
        let theta = params[0];
        if w <= 0.0 {
            return Some(0.0);
        }
        if w >= 1.0 {
            return Some(1.0);
        }
        let k = w + (w - w.powf(theta + 1.0)) / theta;
        k.is_finite().then(|| k.clamp(0.0, 1.0))
    }
}

// ---------------------------------------------------------------------------
// Gumbel
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default)]
pub struct Gumbel;

impl Gumbel {
    pub const THETA_MIN: f64 = 1.0001;
    pub const THETA_MAX: f64 = 40.0;

    fn log_density(theta: f64, u: f64, v: f64) -> f64 {
        let (x, y) = (-u.ln(), -v.ln());
        let s = x.powf(theta) + y.powf(theta);
        let a = s.powf(1.0 / theta);
        -a + x + y + (theta - 1.0) * (x.ln() + y.ln()) + (1.0 / theta - 2.0) * s.ln() + safe_ln(a + theta - 1.0)
    }
}

impl Copula for Gumbel {
    fn family(&self) -> CopulaFamily {
        CopulaFamily::Gumbel
    }

    fn fit(&self, obs: &PseudoObservations) -> Result<Estimate, FitFailure> {
        fit_theta(self, obs, Self::THETA_MIN, Self::THETA_MAX)
    }

    fn log_likelihood(&self, params: &[f64], obs: &PseudoObservations) -> Option<f64> {
        let theta = params[0];
        if !(theta >= 1.0) {
            return None;
        }
        sum_log_density(obs, |u, v| Self::log_density(theta, u, v))
    }

    fn kendall_tau(&self, params: &[f64]) -> f64 {
        1.0 - 1.0 / params[0]
    }

    fn tail_dependence(&self, params: &[f64]) -> TailDependence {
        let upper = 2.0 - 2f64.powf(1.0 / params[0]);
        TailDependence {
            lower: Some(0.0),
            upper: upper.is_finite().then(|| upper.clamp(0.0, 1.0)),
        }
    }

    /// Marshall–Olkin: a positive stable frailty with index `1/θ`
    /// (Kanter's representation), then `u = exp(−(E/S)^{1/θ})`.
    fn sample(&self, params: &[f64], n: usize, rng: &mut StdRng) -> PseudoObservations {
        let theta = params[0];
        let mut u = Vec::with_capacity(n);
        let mut v = Vec::with_capacity(n);
        if theta - 1.0 < GUMBEL_INDEPENDENCE_EPS {
            for _ in 0..n {
                u.push(rng.sample(Open01));
                v.push(rng.sample(Open01));
            }
            return PseudoObservations { u, v };
        }

        let alpha = 1.0 / theta;
        for _ in 0..n {
            let phase: f64 = std::f64::consts::PI * rng.sample::<f64, _>(Open01);
            let w: f64 = rng.sample(Exp1);
            let s = ((alpha * phase).sin() / phase.sin().powf(1.0 / alpha))
                * (((1.0 - alpha) * phase).sin() / w).powf((1.0 - alpha) / alpha);
            let e1: f64 = rng.sample(Exp1);
            let e2: f64 = rng.sample(Exp1);
            u.push(open_unit((-(e1 / s).powf(alpha)).exp()));
            v.push(open_unit((-(e2 / s).powf(alpha)).exp()));
        }
        PseudoObservations { u, v }
    }

    fn conditional_cdf(&self, params: &[f64], obs: &PseudoObservations) -> Vec<f64> {
        let theta = params[0];
        obs.pairs()
            .map(|(u, v)| {
                let (x, y) = (-u.ln(), -v.ln());
                let s = x.powf(theta) + y.powf(theta);
                let ln_h = -s.powf(1.0 / theta) + (1.0 / theta - 1.0) * s.ln() + (theta - 1.0) * x.ln() + x;
                ln_h.exp().clamp(0.0, 1.0)
            })
            .collect()
    }

    fn cdf(&self, params: &[f64], u: f64, v: f64) -> Option<f64> {
        if let Some(edge) = cdf_edge(u, v) {
            return Some(edge);
        }
        let theta = params[0];
        let s = (-u.ln()).powf(theta) + (-v.ln()).powf(theta);
        let c = (-s.powf(1.0 / theta)).exp();
        c.is_finite().then(|| frechet_clamp(c, u, v))
    }

    fn kendall_function(&self, params: &[f64], w: f64) -> Option<f64> {
        if w <= 0.0 {
            return Some(0.0);
        }
        if w >= 1.0 {
            return Some(1.0);
        }
        let k = w - w * w.ln() / params[0];
        k.is_finite().then(|| k.clamp(0.0, 1.0))
    }
}

// ---------------------------------------------------------------------------
// Frank
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default)]
pub struct Frank;

impl Frank {
    pub const THETA_MIN: f64 = -60.0;
    pub const THETA_MAX: f64 = 60.0;

    /// `(1 − e^{−θ}) − (1 − e^{−θu})(1 − e^{−θv})`, written as two terms of
    /// the same sign so large |θ| does not cancel to zero.
    fn denominator(theta: f64, u: f64, v: f64) -> f64 {
        (-theta * u).exp() * -(-theta * v).exp_m1() + (-theta * v).exp() * -(-theta * (1.0 - v)).exp_m1()
    }

    fn log_density(theta: f64, u: f64, v: f64) -> f64 {
        if theta.abs() < FRANK_INDEPENDENCE_EPS {
            return 0.0;
        }
        let denom = Self::denominator(theta, u, v);
        (theta * -(-theta).exp_m1()).ln() - theta * (u + v) - 2.0 * denom.abs().ln()
    }
}

impl Copula for Frank {
    fn family(&self) -> CopulaFamily {
        CopulaFamily::Frank
    }

    fn fit(&self, obs: &PseudoObservations) -> Result<Estimate, FitFailure> {
        fit_theta(self, obs, Self::THETA_MIN, Self::THETA_MAX)
    }

    fn log_likelihood(&self, params: &[f64], obs: &PseudoObservations) -> Option<f64> {
        let theta = params[0];
        if !theta.is_finite() {
            return None;
        }
        sum_log_density(obs, |u, v| Self::log_density(theta, u, v))
    }

    fn kendall_tau(&self, params: &[f64]) -> f64 {
        let theta = params[0];
        if theta.abs() < 1e-6 {
            return theta / 9.0;
        }
        1.0 - 4.0 / theta * (1.0 - debye1(theta))
    }

    fn tail_dependence(&self, _params: &[f64]) -> TailDependence {
        TailDependence::none()
    }

    fn sample(&self, params: &[f64], n: usize, rng: &mut StdRng) -> PseudoObservations {
        let theta = params[0];
        let mut u = Vec::with_capacity(n);
        let mut v = Vec::with_capacity(n);
        for _ in 0..n {
            let ui: f64 = rng.sample(Open01);
            let t: f64 = rng.sample(Open01);
            let vi = if theta.abs() < FRANK_INDEPENDENCE_EPS {
                t
            } else {
                let ratio = t * (-theta).exp_m1() / (t + (1.0 - t) * (-theta * ui).exp());
                -ratio.ln_1p() / theta
            };
            u.push(ui);
            v.push(open_unit(vi));
        }
        PseudoObservations { u, v }
    }

    fn conditional_cdf(&self, params: &[f64], obs: &PseudoObservations) -> Vec<f64> {
        let theta = params[0];
        obs.pairs()
            .map(|(u, v)| {
                if theta.abs() < FRANK_INDEPENDENCE_EPS {
                    return v;
                }
                let num = (-theta * u).exp() * -(-theta * v).exp_m1();
                (num / Self::denominator(theta, u, v)).clamp(0.0, 1.0)
            })
            .collect()
    }

    /// `C = m − ln(r)/θ` with `m = min(u, v)`, `M = max(u, v)` and
    /// `r = (1 + e^{−θ(M−m)} − e^{−θM} − e^{−θ(1−m)}) / (1 − e^{−θ})`.
    fn cdf(&self, params: &[f64], u: f64, v: f64) -> Option<f64> {
        if let Some(edge) = cdf_edge(u, v) {
            return Some(edge);
        }
        let theta = params[0];
        if theta.abs() < FRANK_INDEPENDENCE_EPS {
            return Some(u * v);
        }
        let (lo, hi) = (u.min(v), u.max(v));
        let r = (1.0 + (-theta * (hi - lo)).exp() - (-theta * hi).exp() - (-theta * (1.0 - lo)).exp())
            / -(-theta).exp_m1();
        let c = lo - r.ln() / theta;
        c.is_finite().then(|| frechet_clamp(c, u, v))
    }

    fn kendall_function(&self, params: &[f64], w: f64) -> Option<f64> {
        let theta = params[0];
        if w <= 0.0 {
            return Some(0.0);
        }
        if w >= 1.0 {
            return Some(1.0);
        }
        if theta.abs() < FRANK_INDEPENDENCE_EPS {
            return Some(independence_kendall(w));
        }
        let ratio = (-theta * w).exp_m1() / (-theta).exp_m1();
        let k = w - ratio.ln() * (theta * w).exp_m1() / theta;
        k.is_finite().then(|| k.clamp(0.0, 1.0))
    }
}
