//! Bounded one-dimensional maximization.
//!
//! Every copula parameter search in this crate is reduced to maximizing a
//! scalar objective over an interval:
//!
//! 1. evaluate the objective on a coarse grid (in parallel), pick the best
//!    point deterministically (ties broken by grid index)
//! 2. refine inside the bracket around that point with golden-section search
//!
//! The coarse pass makes the search robust to flat or multi-modal likelihood
//! surfaces; the refinement gives the final precision.

use rayon::prelude::*;

const INV_PHI: f64 = 0.618_033_988_749_894_9;

/// Outcome of a bounded maximization.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Maximum {
    pub x: f64,
    pub value: f64,
    /// The maximizer sits within `tol` of either search bound.
    pub at_boundary: bool,
}

/// Search settings.
#[derive(Debug, Clone, Copy)]
pub struct SearchOptions {
    pub grid_points: usize,
    pub tol: f64,
    pub max_iter: usize,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            grid_points: 24,
            tol: 1e-7,
            max_iter: 200,
        }
    }
}

/// `steps` evenly spaced points between `min` and `max` (inclusive).
pub fn linspace(min: f64, max: f64, steps: usize) -> Vec<f64> {
    if steps < 2 {
        return vec![min];
    }
    let step = (max - min) / (steps as f64 - 1.0);
    (0..steps).map(|i| min + step * i as f64).collect()
}

/// Maximize `f` over `[lo, hi]`.
///
/// Returns `None` when the objective is non-finite on the whole grid or the
/// refinement fails to reach `tol` within `max_iter` iterations.
pub fn maximize_bounded<F>(f: F, lo: f64, hi: f64, opts: &SearchOptions) -> Option<Maximum>
where
    F: Fn(f64) -> f64 + Sync,
{
    if !(lo.is_finite() && hi.is_finite() && hi > lo) {
        return None;
    }

    let grid = linspace(lo, hi, opts.grid_points.max(3));
    let values: Vec<f64> = grid.par_iter().map(|&x| f(x)).collect();

    let mut best: Option<usize> = None;
    for (i, v) in values.iter().enumerate() {
        if !v.is_finite() {
            continue;
        }
        match best {
            Some(b) if values[b] >= *v => {}
            _ => best = Some(i),
        }
    }
    let best = best?;

    let a = grid[best.saturating_sub(1)];
    let b = grid[(best + 1).min(grid.len() - 1)];
    let refined = golden_section_max(&f, a, b, opts.tol, opts.max_iter)?;

    // Keep the grid point if refinement somehow landed lower.
    let (x, value) = if refined.1 >= values[best] {
        refined
    } else {
        (grid[best], values[best])
    };

    let edge_tol = (opts.tol * 10.0).max((hi - lo) * 1e-6);
    Some(Maximum {
        x,
        value,
        at_boundary: (x - lo).abs() <= edge_tol || (hi - x).abs() <= edge_tol,
    })
}

/// Golden-section search for the maximum of a unimodal `f` on `[a, b]`.
pub fn golden_section_max<F>(f: &F, mut a: f64, mut b: f64, tol: f64, max_iter: usize) -> Option<(f64, f64)>
where
    F: Fn(f64) -> f64,
{
    let score = |x: f64| {
        let v = f(x);
        if v.is_finite() { v } else { f64::NEG_INFINITY }
    };

    let mut c = b - INV_PHI * (b - a);
    let mut d = a + INV_PHI * (b - a);
    let mut fc = score(c);
    let mut fd = score(d);

    for _ in 0..max_iter {
        if (b - a).abs() <= tol {
            let x = 0.5 * (a + b);
            let fx = score(x);
            let (x, fx) = [(x, fx), (c, fc), (d, fd)]
                .into_iter()
                .fold((x, fx), |acc, cand| if cand.1 > acc.1 { cand } else { acc });
            return fx.is_finite().then_some((x, fx));
        }
        if fc >= fd {
            b = d;
            d = c;
            fd = fc;
            c = b - INV_PHI * (b - a);
            fc = score(c);
        } else {
            a = c;
            c = d;
            fc = fd;
            d = a + INV_PHI * (b - a);
            fd = score(d);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_interior_maximum_of_a_parabola() {
        let m = maximize_bounded(|x| -(x - 0.3).powi(2), -1.0, 1.0, &SearchOptions::default()).unwrap();
        assert!((m.x - 0.3).abs() < 1e-5);
        assert!(!m.at_boundary);
    }

    #[test]
    fn flags_boundary_maximum() {
        let m = maximize_bounded(|x| x, 0.0, 2.0, &SearchOptions::default()).unwrap();
        assert!((m.x - 2.0).abs() < 1e-5);
        assert!(m.at_boundary);
    }

    #[test]
    fn grid_pass_escapes_a_local_maximum() {
        // Local bump near -0.8, global peak at 0.6.
        let f = |x: f64| 0.5 * (-(x + 0.8).powi(2) * 200.0).exp() + (-(x - 0.6).powi(2) * 50.0).exp();
        let m = maximize_bounded(f, -1.0, 1.0, &SearchOptions::default()).unwrap();
        assert!((m.x - 0.6).abs() < 1e-4);
    }

    #[test]
    fn non_finite_objective_yields_none() {
        assert!(maximize_bounded(|_| f64::NAN, 0.0, 1.0, &SearchOptions::default()).is_none());
        assert!(maximize_bounded(|x| x, 1.0, 1.0, &SearchOptions::default()).is_none());
    }
}
