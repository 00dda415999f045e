//! GoF Statistic Engine.
//!
//! Three Cramér–von Mises statistics are available:
//!
//! - **Empirical** (default): `S = Σ_k (C_θ(F_n(a_k), G_n(b_k)) − C_n(a_k, b_k))²`
//!   over the sample points and the paired order statistics `(u_(k), v_(k))`.
//!   `F_n`, `G_n` and `C_n` count weak dominance, so every corner sits on a
//!   tie-block boundary and the statistic is well-defined for tied data.
//! - **Kendall**: `S = n ∫ (K_n(w) − K_θ(w))² dK_θ(w)`, where `K_n` is the
//!   empirical distribution of the Kendall pseudo-values and `K_θ` the model's
//!   Kendall distribution.
//! - **Rosenblatt**: CvM distance of `(u, h(v | u))` from the independence
//!   copula. Fragile when the data are heavily tied; use only after checking
//!   it on the data at hand.
//!
//! Comonotonic has no density; whatever the kind, its statistic is the
//! empirical distance with `C_θ = min`. `C_n ≤ min(F_n, G_n)` everywhere, with
//! equality on the order-statistic corners only for comonotone samples.
//!
//! Every statistic is deterministic given identical inputs; the Monte Carlo
//! approximations of `C_θ` and `K_θ` for elliptical families are seeded from
//! the family and its parameters.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use rand::SeedableRng;
use rand::rngs::StdRng;
use rayon::prelude::*;

use crate::domain::{CopulaFamily, FittedCopula, PseudoObservations, StatisticKind};
use crate::math::{dominated_counts, kendall_pseudo_values};
use crate::models::copula;

/// Monte Carlo size for families without a closed-form cdf or Kendall
/// distribution is `MODEL_SIM_FACTOR · n`, clamped to this range.
pub const MODEL_SIM_MIN: usize = 5_000;
pub const MODEL_SIM_MAX: usize = 50_000;
pub const MODEL_SIM_FACTOR: usize = 10;

impl StatisticKind {
    /// Discrepancy between `fit` and `obs` (≥ 0).
    pub fn compute(self, fit: &FittedCopula, obs: &PseudoObservations) -> Result<f64, String> {
        if fit.family == CopulaFamily::Comonotonic {
            return Ok(comonotonic_statistic(obs));
        }
        let value = match self {
            StatisticKind::Empirical => empirical_statistic(fit, obs)?,
            StatisticKind::Kendall => kendall_statistic(fit, obs)?,
            StatisticKind::Rosenblatt => rosenblatt_statistic(fit, obs)?,
        };
        if value.is_finite() {
            Ok(value.max(0.0))
        } else {
            Err(format!("{}: non-finite {} statistic", fit.family, self.label()))
        }
    }
}

/// Empirical-copula distance from `M(u, v) = min(u, v)`; zero only for a
/// comonotone sample.
pub fn comonotonic_statistic(obs: &PseudoObservations) -> f64 {
    let corners = EmpiricalCorners::new(obs);
    let model: Vec<f64> = corners.f.iter().zip(&corners.g).map(|(&a, &b)| a.min(b)).collect();
    corners.distance(&model)
}

/// Evaluation corners of the empirical copula: the sample points followed by
/// the paired order statistics, with margins and joint cdf at each.
struct EmpiricalCorners {
    f: Vec<f64>,
    g: Vec<f64>,
    joint: Vec<f64>,
}

impl EmpiricalCorners {
    fn new(obs: &PseudoObservations) -> Self {
        let n = obs.len();
        let mut u_sorted = obs.u.clone();
        u_sorted.sort_by(f64::total_cmp);
        let mut v_sorted = obs.v.clone();
        v_sorted.sort_by(f64::total_cmp);

        let a: Vec<f64> = obs.u.iter().chain(&u_sorted).copied().collect();
        let b: Vec<f64> = obs.v.iter().chain(&v_sorted).copied().collect();

        let nf = n.max(1) as f64;
        let margin = |sorted: &[f64], x: f64| sorted.partition_point(|&s| s <= x) as f64 / nf;
        let f = a.iter().map(|&x| margin(&u_sorted, x)).collect();
        let g = b.iter().map(|&y| margin(&v_sorted, y)).collect();
        let joint = dominated_counts(&obs.u, &obs.v, &a, &b)
            .into_iter()
            .map(|c| c as f64 / nf)
            .collect();
        Self { f, g, joint }
    }

    fn distance(&self, model: &[f64]) -> f64 {
        model
            .iter()
            .zip(&self.joint)
            .map(|(c, h)| (c - h) * (c - h))
            .sum()
    }
}

fn simulation_seed(fit: &FittedCopula, n: usize) -> u64 {
    let mut hasher = DefaultHasher::new();
    fit.family.hash(&mut hasher);
    for p in &fit.parameters {
        p.to_bits().hash(&mut hasher);
    }
    n.hash(&mut hasher);
    hasher.finish()
}

/// Seeded draw of the fitted model, sized for a sample of `n`.
fn simulate_model(fit: &FittedCopula, n: usize) -> PseudoObservations {
    let m = (MODEL_SIM_FACTOR * n).clamp(MODEL_SIM_MIN, MODEL_SIM_MAX);
    let mut rng = StdRng::seed_from_u64(simulation_seed(fit, n));
    copula(fit.family).sample(&fit.parameters, m, &mut rng)
}

/// `C_θ` at every corner: closed form where the family has one, otherwise the
/// empirical cdf of a simulated sample.
fn model_cdf(fit: &FittedCopula, f: &[f64], g: &[f64], n: usize) -> Vec<f64> {
    let model = copula(fit.family);
    if model.cdf(&fit.parameters, 0.5, 0.5).is_some() {
        return f
            .iter()
            .zip(g)
            .map(|(&a, &b)| model.cdf(&fit.parameters, a, b).unwrap_or(f64::NAN))
            .collect();
    }
    let draw = simulate_model(fit, n);
    let m = draw.len() as f64;
    dominated_counts(&draw.u, &draw.v, f, g)
        .into_iter()
        .map(|c| c as f64 / m)
        .collect()
}

/// Empirical-copula CvM statistic.
pub fn empirical_statistic(fit: &FittedCopula, obs: &PseudoObservations) -> Result<f64, String> {
    let n = obs.len();
    if n < 2 {
        return Err("empirical statistic needs n >= 2".to_string());
    }
    let corners = EmpiricalCorners::new(obs);
    let model = model_cdf(fit, &corners.f, &corners.g, n);
    if model.iter().any(|c| !c.is_finite()) {
        return Err(format!("{}: copula cdf not evaluable at {:?}", fit.family, fit.parameters));
    }
    Ok(corners.distance(&model))
}

/// Model Kendall distribution: closed form where the family has one,
/// otherwise the empirical distribution of simulated pseudo-values.
enum KendallModel<'a> {
    Closed(&'a FittedCopula),
    Simulated(Vec<f64>),
}

impl KendallModel<'_> {
    fn eval(&self, w: f64) -> f64 {
        match self {
            KendallModel::Closed(fit) => copula(fit.family)
                .kendall_function(&fit.parameters, w)
                .unwrap_or(f64::NAN),
            KendallModel::Simulated(sorted) => {
                let below = sorted.partition_point(|&e| e <= w);
                below as f64 / sorted.len() as f64
            }
        }
    }
}

fn kendall_model(fit: &FittedCopula, n: usize) -> KendallModel<'_> {
    let model = copula(fit.family);
    if model.kendall_function(&fit.parameters, 0.5).is_some() {
        return KendallModel::Closed(fit);
    }
    let draw = simulate_model(fit, n);
    let mut e = kendall_pseudo_values(&draw.u, &draw.v);
    e.sort_by(f64::total_cmp);
    KendallModel::Simulated(e)
}

/// Kendall-transform CvM statistic.
pub fn kendall_statistic(fit: &FittedCopula, obs: &PseudoObservations) -> Result<f64, String> {
    let n = obs.len();
    if n < 2 {
        return Err("kendall statistic needs n >= 2".to_string());
    }
    let mut e = kendall_pseudo_values(&obs.u, &obs.v);
    e.sort_by(f64::total_cmp);
    let model = kendall_model(fit, n);

    // K_n is a step function: value `level` on [a, b). Over such an interval
    // ∫ (level − K)² dK = ((K(b) − level)³ − (K(a) − level)³) / 3.
    let piece = |a: f64, b: f64, level: f64| {
        let ka = model.eval(a) - level;
        let kb = model.eval(b) - level;
        (kb.powi(3) - ka.powi(3)) / 3.0
    };

    let nf = n as f64;
    let mut total = 0.0;
    let mut left = 0.0;
    let mut level = 0.0;
    let mut i = 0;
    while i < n {
        let t = e[i];
        let mut j = i;
        while j < n && e[j] == t {
            j += 1;
        }
        if t > left {
            total += piece(left, t, level);
        }
        left = t;
        level = j as f64 / nf;
        i = j;
    }
    if left < 1.0 {
        total += piece(left, 1.0, level);
    }

    let value = nf * total;
    if value.is_finite() {
        Ok(value)
    } else {
        Err(format!("{}: Kendall distribution not evaluable at {:?}", fit.family, fit.parameters))
    }
}

/// Rosenblatt-transform CvM statistic against the independence copula
/// (Genest, Rémillard & Beaudoin's `S_n^(B)`), `O(n²)`.
pub fn rosenblatt_statistic(fit: &FittedCopula, obs: &PseudoObservations) -> Result<f64, String> {
    let n = obs.len();
    if n < 2 {
        return Err("rosenblatt statistic needs n >= 2".to_string());
    }
    let e1 = &obs.u;
    let e2 = copula(fit.family).conditional_cdf(&fit.parameters, obs);
    if e2.iter().any(|h| !h.is_finite()) {
        return Err(format!("{}: non-finite conditional cdf", fit.family));
    }

    let nf = n as f64;
    let single: f64 = e1
        .iter()
        .zip(e2.iter())
        .map(|(&a, &b)| (1.0 - a * a) * (1.0 - b * b))
        .sum();
    // Row sums are collected in order so the total does not depend on the pool size.
    let rows: Vec<f64> = (0..n)
        .into_par_iter()
        .map(|i| {
            (0..n)
                .map(|j| (1.0 - e1[i].max(e1[j])) * (1.0 - e2[i].max(e2[j])))
                .sum::<f64>()
        })
        .collect();
    let double: f64 = rows.iter().sum();

    Ok(nf / 9.0 - 0.5 * single + double / nf)
}
