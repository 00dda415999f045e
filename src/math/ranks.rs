//! Rank transform and empirical margins.
//!
//! Pseudo-observations are `u_i = rank(x_i) / (n + 1)` with tied values
//! sharing the average of the ranks they occupy. The `n + 1` denominator keeps
//! every value strictly inside `(0, 1)`, so log-densities never see a boundary.
//!
//! Ties are kept as ties. Heavily discretized score scales are handled by
//! tie-valid GoF statistics and by resampling through the observed margins
//! (`EmpiricalMargins`), never by perturbing the raw scores.

use std::cmp::Ordering;

use crate::domain::PseudoObservations;
use crate::error::{CopulaError, CopulaResult};

/// 1-based ranks with ties resolved by the average-rank method.
///
/// Callers are expected to pass finite values; NaNs compare as equal to
/// everything and end up in an arbitrary tie group.
pub fn average_ranks(values: &[f64]) -> Vec<f64> {
    let n = values.len();
    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&a, &b| values[a].partial_cmp(&values[b]).unwrap_or(Ordering::Equal));

    let mut ranks = vec![0.0; n];
    let mut start = 0;
    while start < n {
        let mut end = start + 1;
        while end < n && values[order[end]] == values[order[start]] {
            end += 1;
        }
        // Positions start..end (0-based) hold ranks start+1..=end.
        let avg = (start + 1 + end) as f64 / 2.0;
        for &idx in &order[start..end] {
            ranks[idx] = avg;
        }
        start = end;
    }
    ranks
}

/// Convert paired raw scores into pseudo-observations in `(0,1)²`.
pub fn pseudo_observations(x: &[f64], y: &[f64]) -> CopulaResult<PseudoObservations> {
    if x.len() != y.len() {
        return Err(CopulaError::InvalidInput(format!(
            "score vectors differ in length: |X|={}, |Y|={}",
            x.len(),
            y.len()
        )));
    }
    if x.len() < 2 {
        return Err(CopulaError::InvalidInput(format!(
            "rank transform needs n >= 2, got n={}",
            x.len()
        )));
    }
    if x.iter().chain(y.iter()).any(|v| !v.is_finite()) {
        return Err(CopulaError::InvalidInput(
            "score vectors contain non-finite values".to_string(),
        ));
    }

    let denom = x.len() as f64 + 1.0;
    let u = average_ranks(x).into_iter().map(|r| r / denom).collect();
    let v = average_ranks(y).into_iter().map(|r| r / denom).collect();
    Ok(PseudoObservations { u, v })
}

/// Number of distinct values in a sample.
pub fn count_unique(values: &[f64]) -> usize {
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));
    sorted.dedup();
    sorted.len()
}

/// Sorted copies of the observed margins.
///
/// Used to push copula draws back onto the observed score scales, so that a
/// synthetic sample carries the same tie structure as the data it mimics.
#[derive(Debug, Clone)]
pub struct EmpiricalMargins {
    x_sorted: Vec<f64>,
    y_sorted: Vec<f64>,
}

impl EmpiricalMargins {
    pub fn from_samples(x: &[f64], y: &[f64]) -> CopulaResult<Self> {
        if x.len() != y.len() || x.is_empty() {
            return Err(CopulaError::InvalidInput(
                "margins need two non-empty samples of equal length".to_string(),
            ));
        }
        let mut x_sorted = x.to_vec();
        let mut y_sorted = y.to_vec();
        x_sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));
        y_sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));
        Ok(Self { x_sorted, y_sorted })
    }

    pub fn len(&self) -> usize {
        self.x_sorted.len()
    }

    pub fn is_empty(&self) -> bool {
        self.x_sorted.is_empty()
    }

    /// Couple a copula draw to the observed margins by rank and re-rank.
    ///
    /// The draw's `k`-th smallest `u` takes the `k`-th smallest observed `x`
    /// (likewise `v` and `y`), so each synthetic margin is a permutation of the
    /// observed one. Ties appear exactly where the data have them; continuous
    /// data give the same pseudo-observations as ranking the draw itself.
    pub fn resample(&self, draw: &PseudoObservations) -> CopulaResult<PseudoObservations> {
        if draw.u.len() != self.len() || draw.v.len() != self.len() {
            return Err(CopulaError::InvalidInput(format!(
                "draw of size {} does not match margins of size {}",
                draw.len(),
                self.len()
            )));
        }
        let x = assign_by_rank(&self.x_sorted, &draw.u);
        let y = assign_by_rank(&self.y_sorted, &draw.v);
        pseudo_observations(&x, &y)
    }
}

/// `out[i] = sorted[rank(draw[i]) - 1]`; equal draws keep index order.
fn assign_by_rank(sorted: &[f64], draw: &[f64]) -> Vec<f64> {
    let mut order: Vec<usize> = (0..draw.len()).collect();
    order.sort_by(|&a, &b| draw[a].total_cmp(&draw[b]));
    let mut out = vec![0.0; draw.len()];
    for (&idx, &value) in order.iter().zip(sorted) {
        out[idx] = value;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn ties_share_average_rank() {
        let ranks = average_ranks(&[10.0, 20.0, 20.0, 30.0, 20.0]);
        assert_eq!(ranks, vec![1.0, 3.0, 3.0, 5.0, 3.0]);
    }

    #[test]
    fn all_equal_values_get_mid_rank() {
        let ranks = average_ranks(&[7.0; 4]);
        assert!(ranks.iter().all(|&r| (r - 2.5).abs() < 1e-12));
    }

    #[test]
    fn pseudo_observations_stay_inside_unit_interval() {
        let x = [1.0, 2.0, 3.0];
        let y = [3.0, 1.0, 2.0];
        let obs = pseudo_observations(&x, &y).unwrap();
        assert_eq!(obs.u, vec![0.25, 0.5, 0.75]);
        assert_eq!(obs.v, vec![0.75, 0.25, 0.5]);
        assert!(obs.pairs().all(|(u, v)| u > 0.0 && u < 1.0 && v > 0.0 && v < 1.0));
    }

    #[test]
    fn short_or_mismatched_input_is_rejected() {
        assert!(matches!(
            pseudo_observations(&[1.0], &[2.0]),
            Err(CopulaError::InvalidInput(_))
        ));
        assert!(matches!(
            pseudo_observations(&[1.0, 2.0], &[2.0]),
            Err(CopulaError::InvalidInput(_))
        ));
        assert!(pseudo_observations(&[1.0, f64::NAN], &[2.0, 3.0]).is_err());
    }

    #[test]
    fn resampling_reproduces_observed_tie_structure() {
        let x = [1.0, 1.0, 2.0, 2.0, 3.0, 3.0];
        let y = [5.0, 6.0, 5.0, 6.0, 5.0, 6.0];
        let margins = EmpiricalMargins::from_samples(&x, &y).unwrap();
        let draw = PseudoObservations {
            u: vec![0.05, 0.2, 0.4, 0.6, 0.8, 0.95],
            v: vec![0.95, 0.8, 0.6, 0.4, 0.2, 0.05],
        };
        let resampled = margins.resample(&draw).unwrap();
        assert_eq!(count_unique(&resampled.u), 3);
        assert_eq!(count_unique(&resampled.v), 2);

        // Each margin is a permutation of the observed one.
        let observed = pseudo_observations(&x, &y).unwrap();
        let sorted = |values: &[f64]| {
            let mut s = values.to_vec();
            s.sort_by(f64::total_cmp);
            s
        };
        assert_eq!(sorted(&resampled.u), sorted(&observed.u));
        assert_eq!(sorted(&resampled.v), sorted(&observed.v));
        // The draw's order survives: u ascends, v descends.
        assert!(resampled.u.windows(2).all(|w| w[0] <= w[1]));
        assert!(resampled.v.windows(2).all(|w| w[0] >= w[1]));
    }

    #[test]
    fn resampling_continuous_margins_adds_no_ties() {
        use crate::domain::CopulaFamily;
        use rand::SeedableRng;
        use rand::rngs::StdRng;

        let n = 1000;
        let x: Vec<f64> = (0..n).map(|i| (i as f64 * 0.731).sin() * 100.0 + i as f64).collect();
        let y: Vec<f64> = (0..n).map(|i| (i as f64 * 1.37).cos() * 40.0 - i as f64 * 0.5).collect();
        assert_eq!(count_unique(&x), n);
        assert_eq!(count_unique(&y), n);
        let margins = EmpiricalMargins::from_samples(&x, &y).unwrap();

        let mut rng = StdRng::seed_from_u64(3);
        let draw = CopulaFamily::Gaussian.model().sample(&[0.6], n, &mut rng);
        let resampled = margins.resample(&draw).unwrap();
        assert_eq!(count_unique(&resampled.u), n);
        assert_eq!(count_unique(&resampled.v), n);
        assert_eq!(resampled, pseudo_observations(&draw.u, &draw.v).unwrap());
    }

    #[test]
    fn resampling_rejects_a_draw_of_the_wrong_size() {
        let margins = EmpiricalMargins::from_samples(&[1.0, 2.0, 3.0], &[3.0, 2.0, 1.0]).unwrap();
        let draw = PseudoObservations {
            u: vec![0.3, 0.6],
            v: vec![0.6, 0.3],
        };
        assert!(matches!(margins.resample(&draw), Err(CopulaError::InvalidInput(_))));
    }

    proptest! {
        #[test]
        fn rank_transform_is_invariant_under_increasing_maps(
            pairs in prop::collection::vec((-50i32..50, -50i32..50), 2..60)
        ) {
            let x: Vec<f64> = pairs.iter().map(|p| p.0 as f64).collect();
            let y: Vec<f64> = pairs.iter().map(|p| p.1 as f64).collect();
            let fx: Vec<f64> = x.iter().map(|v| (v / 10.0).exp() + 3.0 * v).collect();
            let fy: Vec<f64> = y.iter().map(|v| v.powi(3) + v).collect();

            let base = pseudo_observations(&x, &y).unwrap();
            let mapped = pseudo_observations(&fx, &fy).unwrap();
            prop_assert_eq!(base, mapped);
        }
    }
}
