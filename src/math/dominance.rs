//! 2-D dominance counting: Kendall pseudo-values and empirical bivariate cdfs.
//!
//! For each point, count the *other* points that are weakly dominated by it:
//!
//! ```text
//! e_i = #{ j ≠ i : u_j ≤ u_i and v_j ≤ v_i } / (n - 1)
//! ```
//!
//! Counting is `O(n log n)`: sweep points in increasing `u` (a whole tie group
//! at a time, so equal `u` values count each other) and keep a Fenwick tree
//! over dense `v` ranks. `dominated_counts` runs the same sweep for an
//! arbitrary set of query corners.

use std::cmp::Ordering;

struct Fenwick {
    tree: Vec<u32>,
}

impl Fenwick {
    fn new(n: usize) -> Self {
        Self { tree: vec![0; n + 1] }
    }

    fn add(&mut self, idx: usize) {
        let mut i = idx + 1;
        while i < self.tree.len() {
            self.tree[i] += 1;
            i += i & i.wrapping_neg();
        }
    }

    /// Number of inserted indices `<= idx`.
    fn prefix(&self, idx: usize) -> u32 {
        let mut i = idx + 1;
        let mut sum = 0;
        while i > 0 {
            sum += self.tree[i];
            i -= i & i.wrapping_neg();
        }
        sum
    }
}

/// Dense 0-based ranks: equal values share an index, no gaps.
fn dense_ranks(values: &[f64]) -> (Vec<usize>, usize) {
    let mut order: Vec<usize> = (0..values.len()).collect();
    order.sort_by(|&a, &b| values[a].partial_cmp(&values[b]).unwrap_or(Ordering::Equal));
    let mut ranks = vec![0; values.len()];
    let mut current = 0;
    for (pos, &idx) in order.iter().enumerate() {
        if pos > 0 && values[idx] != values[order[pos - 1]] {
            current += 1;
        }
        ranks[idx] = current;
    }
    let distinct = if values.is_empty() { 0 } else { current + 1 };
    (ranks, distinct)
}

/// Kendall pseudo-values `e_i ∈ [0, 1]` for every point.
pub fn kendall_pseudo_values(u: &[f64], v: &[f64]) -> Vec<f64> {
    let n = u.len().min(v.len());
    if n < 2 {
        return vec![0.0; n];
    }

    let (v_rank, distinct) = dense_ranks(&v[..n]);
    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&a, &b| u[a].partial_cmp(&u[b]).unwrap_or(Ordering::Equal));

    let mut tree = Fenwick::new(distinct);
    let mut counts = vec![0u32; n];
    let mut start = 0;
    while start < n {
        let mut end = start + 1;
        while end < n && u[order[end]] == u[order[start]] {
            end += 1;
        }
        for &idx in &order[start..end] {
            tree.add(v_rank[idx]);
        }
        for &idx in &order[start..end] {
            // Subtract the point itself.
            counts[idx] = tree.prefix(v_rank[idx]) - 1;
        }
        start = end;
    }

    let denom = (n - 1) as f64;
    counts.into_iter().map(|c| c as f64 / denom).collect()
}

/// For every query corner `(a_k, b_k)`, the number of points with
/// `u_j ≤ a_k` and `v_j ≤ b_k`.
pub fn dominated_counts(u: &[f64], v: &[f64], a: &[f64], b: &[f64]) -> Vec<usize> {
    let n = u.len().min(v.len());
    let q = a.len().min(b.len());

    let mut levels: Vec<f64> = v[..n].iter().chain(&b[..q]).copied().collect();
    levels.sort_by(f64::total_cmp);
    levels.dedup();
    let level = |y: f64| levels.partition_point(|&l| l < y);

    let mut points: Vec<usize> = (0..n).collect();
    points.sort_by(|&i, &j| u[i].total_cmp(&u[j]));
    let mut queries: Vec<usize> = (0..q).collect();
    queries.sort_by(|&i, &j| a[i].total_cmp(&a[j]));

    let mut tree = Fenwick::new(levels.len());
    let mut counts = vec![0; q];
    let mut next = 0;
    for &k in &queries {
        while next < n && u[points[next]] <= a[k] {
            tree.add(level(v[points[next]]));
            next += 1;
        }
        counts[k] = tree.prefix(level(b[k])) as usize;
    }
    counts
}

#[cfg(test)]
mod tests {
    use super::*;

    fn brute_force(u: &[f64], v: &[f64]) -> Vec<f64> {
        let n = u.len();
        (0..n)
            .map(|i| {
                let c = (0..n).filter(|&j| j != i && u[j] <= u[i] && v[j] <= v[i]).count();
                c as f64 / (n - 1) as f64
            })
            .collect()
    }

    #[test]
    fn matches_brute_force_without_ties() {
        let u = [0.1, 0.5, 0.3, 0.9, 0.7];
        let v = [0.2, 0.4, 0.8, 0.6, 0.1];
        assert_eq!(kendall_pseudo_values(&u, &v), brute_force(&u, &v));
    }

    #[test]
    fn matches_brute_force_with_heavy_ties() {
        let u = [0.2, 0.2, 0.2, 0.6, 0.6, 0.9, 0.9, 0.2];
        let v = [0.5, 0.5, 0.1, 0.5, 0.9, 0.1, 0.5, 0.9];
        assert_eq!(kendall_pseudo_values(&u, &v), brute_force(&u, &v));
    }

    #[test]
    fn corner_counts_match_brute_force() {
        let u = [0.2, 0.2, 0.2, 0.6, 0.6, 0.9, 0.9, 0.2];
        let v = [0.5, 0.5, 0.1, 0.5, 0.9, 0.1, 0.5, 0.9];
        let a = [0.2, 0.6, 1.0, 0.0, 0.65, 0.9];
        let b = [0.5, 0.3, 1.0, 1.0, 0.9, 0.1];
        let expected: Vec<usize> = a
            .iter()
            .zip(&b)
            .map(|(&x, &y)| (0..u.len()).filter(|&j| u[j] <= x && v[j] <= y).count())
            .collect();
        assert_eq!(dominated_counts(&u, &v, &a, &b), expected);
        assert_eq!(expected, vec![3, 1, 8, 0, 6, 2]);
    }

    #[test]
    fn comonotonic_points_are_evenly_spread() {
        let u = [0.1, 0.2, 0.3, 0.4, 0.5];
        let e = kendall_pseudo_values(&u, &u);
        assert_eq!(e, vec![0.0, 0.25, 0.5, 0.75, 1.0]);
    }
}
