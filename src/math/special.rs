//! Numerically careful special functions.
//!
//! Normal and Student-t cdf/quantiles come from `statrs`; this module wraps
//! them so callers never have to handle construction errors for
//! well-formed arguments, and adds the Debye function needed by Frank's τ.

use statrs::distribution::{ContinuousCDF, StudentsT};
use statrs::function::erf::{erfc, erfc_inv};

pub use statrs::function::gamma::ln_gamma;

/// Probabilities are clamped into `[P_EPS, 1 - P_EPS]` before any quantile call.
pub const P_EPS: f64 = 1e-15;

/// Below this |θ| the Debye series is used instead of quadrature.
const DEBYE_SMALL_X: f64 = 1e-4;

/// Simpson intervals for the Debye integral (must be even).
const DEBYE_INTERVALS: usize = 512;

/// Standard normal cdf `Φ(x)`.
pub fn normal_cdf(x: f64) -> f64 {
    0.5 * erfc(-x / std::f64::consts::SQRT_2)
}

/// Standard normal quantile `Φ⁻¹(p)`.
pub fn normal_quantile(p: f64) -> f64 {
    let p = p.clamp(P_EPS, 1.0 - P_EPS);
    -std::f64::consts::SQRT_2 * erfc_inv(2.0 * p)
}

/// Standard Student-t distribution with `df` degrees of freedom.
pub fn student_t(df: f64) -> Option<StudentsT> {
    if !(df.is_finite() && df > 0.0) {
        return None;
    }
    StudentsT::new(0.0, 1.0, df).ok()
}

/// Student-t cdf; `None` for invalid df or a non-finite result.
pub fn student_t_cdf(x: f64, df: f64) -> Option<f64> {
    let dist = student_t(df)?;
    let p = dist.cdf(x);
    p.is_finite().then_some(p)
}

/// Student-t quantiles for a whole slice (the distribution is built once).
pub fn student_t_quantiles(p: &[f64], df: f64) -> Option<Vec<f64>> {
    let dist = student_t(df)?;
    let out: Vec<f64> = p
        .iter()
        .map(|&pi| dist.inverse_cdf(pi.clamp(P_EPS, 1.0 - P_EPS)))
        .collect();
    out.iter().all(|v| v.is_finite()).then_some(out)
}

/// Debye function of order one: `D₁(x) = (1/x) ∫₀ˣ t/(eᵗ − 1) dt`.
///
/// Negative arguments use `D₁(−x) = D₁(x) + x/2`.
pub fn debye1(x: f64) -> f64 {
    if x < 0.0 {
        return debye1(-x) - x / 2.0;
    }
    if x < DEBYE_SMALL_X {
        // 1 - x/4 + x²/36
        return 1.0 - x / 4.0 + x * x / 36.0;
    }

    let integrand = |t: f64| if t == 0.0 { 1.0 } else { t / t.exp_m1() };
    let h = x / DEBYE_INTERVALS as f64;
    let mut sum = integrand(0.0) + integrand(x);
    for i in 1..DEBYE_INTERVALS {
        let weight = if i % 2 == 1 { 4.0 } else { 2.0 };
        sum += weight * integrand(i as f64 * h);
    }
    (sum * h / 3.0) / x
}

/// `ln(x)` with non-positive arguments mapped to `-∞` instead of NaN.
pub fn safe_ln(x: f64) -> f64 {
    if x > 0.0 { x.ln() } else { f64::NEG_INFINITY }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normal_quantile_inverts_cdf() {
        for &p in &[0.001, 0.1, 0.5, 0.9, 0.999] {
            let x = normal_quantile(p);
            assert!((normal_cdf(x) - p).abs() < 1e-10, "p={p}");
        }
        assert!(normal_quantile(0.5).abs() < 1e-12);
    }

    #[test]
    fn student_t_quantiles_are_symmetric() {
        let q = student_t_quantiles(&[0.1, 0.5, 0.9], 7.0).unwrap();
        assert!(q[1].abs() < 1e-8);
        assert!((q[0] + q[2]).abs() < 1e-8);
        assert!(student_t_quantiles(&[0.5], -1.0).is_none());
    }

    #[test]
    fn debye_matches_known_values() {
        // D1(1) = 0.777504634112248...
        assert!((debye1(1.0) - 0.777_504_634_112_248).abs() < 1e-9);
        assert!((debye1(1e-6) - 1.0).abs() < 1e-6);
        // Reflection identity.
        assert!((debye1(-2.0) - (debye1(2.0) + 1.0)).abs() < 1e-12);
    }

    #[test]
    fn safe_ln_never_returns_nan() {
        assert_eq!(safe_ln(0.0), f64::NEG_INFINITY);
        assert_eq!(safe_ln(-1.0), f64::NEG_INFINITY);
        assert!((safe_ln(std::f64::consts::E) - 1.0).abs() < 1e-15);
    }
}
