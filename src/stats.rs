use std::f64;

use statrs::statistics::{Data, OrderStatistics, Statistics};

use crate::constants::{MIN_BANDWIDTH, N_BANDWIDTHS};

/// Calculate log(sum(exp(xs))) of a real vector xs.
/// NaN values are ignored.
pub fn log_sum_exp(xs: &[f64]) -> f64 {
    // find maximum value
    let mut x_max = f64::NAN;
    for &x in xs.iter() {
        if x > x_max || x_max.is_nan() {
            x_max = x;
        }
    }

    if x_max.is_nan() {
        return f64::NAN;
    } else if x_max.is_infinite() {
        return x_max;
    }

    // sum the differences
    let mut sum = 0.0;
    for &x in xs.iter() {
        if !x.is_nan() {
            sum += (x - x_max).exp();
        }
    }

    x_max + sum.ln()
}

/// Shannon entropy (log2) of a vector of non-negative weights.
/// Weights are scaled to a probability distribution first.
pub fn shannon_entropy(weights: &[f64]) -> f64 {
    let s: f64 = weights.iter().sum();
    if s <= 0.0 {
        return 0.0;
    }
    let mut h = 0.0;
    for &w in weights.iter() {
        if w > 0.0 {
            let p = w / s;
            h -= p * p.log2();
        }
    }
    // avoid reporting -0.0
    if h > 0.0 { h } else { 0.0 }
}

/// Shannon entropy (log2) of a vector of counts.
/// The result does not depend on the order of `counts`.
pub fn count_entropy(counts: &[usize]) -> f64 {
    let mut counts = counts.to_vec();
    counts.sort_unstable();
    let weights: Vec<f64> = counts.iter().map(|&c| c as f64).collect();
    shannon_entropy(&weights)
}

/// Unnormalized Gaussian kernel density at `x`.
#[inline]
fn kernel_sum(points: &[f64], x: f64, bandwidth: f64) -> f64 {
    let denom = 2.0 * bandwidth * bandwidth;
    points.iter().map(|&p| (-(x - p) * (x - p) / denom).exp()).sum()
}

/// Entropy of a Gaussian kernel density estimate evaluated at the grid 1, 2, ..., n.
///
/// The density values on the grid are normalized to a probability distribution.
pub fn kde_entropy(points: &[f64], n: usize, bandwidth: f64) -> f64 {
    if points.is_empty() || n == 0 || bandwidth <= 0.0 {
        return 0.0;
    }
    let density: Vec<f64> = (1 ..= n).map(|x| kernel_sum(points, x as f64, bandwidth)).collect();
    shannon_entropy(&density)
}

/// Bandwidth selection rule for the kernel density estimate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Bandwidth {
    /// Use the given bandwidth
    Fixed(f64),
    /// Maximize the leave-one-out log-likelihood over a grid of bandwidths
    CrossValidated,
    /// Silverman's rule of thumb
    Silverman,
}

/// Candidate bandwidths: geometric grid from `MIN_BANDWIDTH` to max(1, n / 4).
pub fn bandwidth_grid(n: usize) -> Vec<f64> {
    let lo = MIN_BANDWIDTH;
    let hi = (n as f64 / 4.0).max(1.0);
    let k = N_BANDWIDTHS;
    let ratio = (hi / lo).powf(1.0 / (k - 1) as f64);
    (0 .. k).map(|i| lo * ratio.powi(i as i32)).collect()
}

/// Leave-one-out log-likelihood of a Gaussian kernel density estimate.
pub fn loo_log_likelihood(points: &[f64], bandwidth: f64) -> f64 {
    let n = points.len();
    if n < 2 {
        return f64::NAN;
    }
    let denom = 2.0 * bandwidth * bandwidth;
    let log_norm = ((n - 1) as f64 * bandwidth * (2.0 * f64::consts::PI).sqrt()).ln();
    let mut terms = Vec::with_capacity(n - 1);
    let mut ll = 0.0;
    for (i, &x) in points.iter().enumerate() {
        terms.clear();
        for (j, &y) in points.iter().enumerate() {
            if i != j {
                terms.push(-(x - y) * (x - y) / denom);
            }
        }
        ll += log_sum_exp(&terms) - log_norm;
    }
    ll
}

/// Bandwidth maximizing the leave-one-out log-likelihood over `grid`.
/// Ties are broken in favour of the smaller bandwidth.
pub fn cross_validated_bandwidth(points: &[f64], grid: &[f64]) -> f64 {
    let mut best = grid.first().cloned().unwrap_or(MIN_BANDWIDTH);
    if points.len() < 2 {
        return best;
    }
    let mut best_ll = f64::NEG_INFINITY;
    for &h in grid.iter() {
        let ll = loo_log_likelihood(points, h);
        if ll > best_ll {
            best_ll = ll;
            best = h;
        }
    }
    best
}

/// Silverman's rule of thumb: 0.9 * min(sd, IQR / 1.34) * n^(-1/5),
/// bounded below by `MIN_BANDWIDTH`.
pub fn silverman_bandwidth(points: &[f64]) -> f64 {
    if points.len() < 2 {
        return MIN_BANDWIDTH;
    }
    let sd = points.iter().std_dev();
    let iqr = Data::new(points.to_vec()).interquartile_range();
    let spread = if iqr > 0.0 { sd.min(iqr / 1.34) } else { sd };
    let h = 0.9 * spread * (points.len() as f64).powf(-0.2);
    if h.is_finite() { h.max(MIN_BANDWIDTH) } else { MIN_BANDWIDTH }
}

/// Select a bandwidth for points lying on the grid 1, 2, ..., n.
pub fn select_bandwidth(points: &[f64], n: usize, method: Bandwidth) -> f64 {
    match method {
        Bandwidth::Fixed(h) => h,
        Bandwidth::CrossValidated => cross_validated_bandwidth(points, &bandwidth_grid(n)),
        Bandwidth::Silverman => silverman_bandwidth(points),
    }
}

/// Which tail of the null distribution counts as extreme.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tail {
    /// null >= observed
    Upper,
    /// null <= observed
    Lower,
}

impl Tail {
    #[inline]
    pub fn is_extreme<T: PartialOrd>(&self, null: T, observed: T) -> bool {
        match *self {
            Tail::Upper => null >= observed,
            Tail::Lower => null <= observed,
        }
    }
}

/// Fraction of null values at least as extreme as the observed value.
/// Returns `None` for an empty null distribution.
pub fn empirical_p_value<T: PartialOrd + Copy>(nulls: &[T], observed: T, tail: Tail) -> Option<f64> {
    if nulls.is_empty() {
        return None;
    }
    let n_extreme = nulls.iter().filter(|&&x| tail.is_extreme(x, observed)).count();
    Some(n_extreme as f64 / nulls.len() as f64)
}

/// Benjamini-Hochberg adjusted p-values, in the input order.
pub fn benjamini_hochberg(p_values: &[f64]) -> Vec<f64> {
    let n = p_values.len();
    if n == 0 {
        return Vec::new();
    }

    let mut idx: Vec<usize> = (0 .. n).collect();
    idx.sort_by(|&a, &b| p_values[a].total_cmp(&p_values[b]));

    let n_f = n as f64;
    let mut adjusted = vec![0.0; n];

    // enforce monotonicity from the largest p-value down
    let mut prev = 1.0f64;
    for i in (0 .. n).rev() {
        let rank = (i + 1) as f64;
        let adj = (p_values[idx[i]] * n_f / rank).min(prev);
        adjusted[idx[i]] = adj;
        prev = adj;
    }

    adjusted
}

/// Benjamini-Hochberg adjustment over the defined p-values only.
/// Undefined p-values stay undefined and do not count towards the number of tests.
pub fn bh_fdr(p_values: &[Option<f64>]) -> Vec<Option<f64>> {
    let defined: Vec<f64> = p_values.iter().filter_map(|&p| p).collect();
    let mut adjusted = benjamini_hochberg(&defined).into_iter();
    p_values.iter()
        .map(|p| p.and_then(|_| adjusted.next()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1.0e-6;

    #[test]
    fn test_log_sum_exp() {
        assert!((log_sum_exp(&vec![0.2, 0.3, 0.9, 1.2]) - 2.122379).abs() < EPS);
        assert!((log_sum_exp(&vec![0.0, 1.0, -5.0]) - 1.315072).abs() < EPS);
        assert!((log_sum_exp(&vec![0.0, 1.0, f64::NAN]) - 1.313262).abs() < EPS);
        assert!(log_sum_exp(&vec![0.0, f64::NEG_INFINITY]) == 0.0);
        assert!(log_sum_exp(&vec![0.0, f64::INFINITY]).is_infinite());
    }

    #[test]
    fn test_count_entropy() {
        assert_eq!(count_entropy(&[10]), 0.0);
        assert!((count_entropy(&[1; 10]) - 10f64.log2()).abs() < EPS);
        assert!((count_entropy(&[2, 2]) - 1.0).abs() < EPS);
        assert_eq!(count_entropy(&[]), 0.0);
        assert!(count_entropy(&[9, 1]) < count_entropy(&[5, 5]));
        assert_eq!(count_entropy(&[3, 1, 1, 2]).to_bits(), count_entropy(&[1, 1, 2, 3]).to_bits());
        assert_eq!(count_entropy(&[2, 3, 1, 1]).to_bits(), count_entropy(&[1, 1, 2, 3]).to_bits());
    }

    #[test]
    fn test_kde_entropy() {
        let clustered = vec![10.0; 10];
        let spread: Vec<f64> = (1 ..= 10).map(|x| x as f64 * 10.0).collect();
        let h_clustered = kde_entropy(&clustered, 100, 1.0);
        let h_spread = kde_entropy(&spread, 100, 1.0);
        assert!(h_clustered < h_spread);
        assert!(h_spread <= 100f64.log2() + EPS);
        assert_eq!(kde_entropy(&[], 100, 1.0), 0.0);
        // wider kernels smooth the density out
        assert!(kde_entropy(&clustered, 100, 5.0) > h_clustered);
    }

    #[test]
    fn test_bandwidth_grid() {
        let grid = bandwidth_grid(400);
        assert_eq!(grid.len(), N_BANDWIDTHS);
        assert!((grid[0] - MIN_BANDWIDTH).abs() < EPS);
        assert!((grid[N_BANDWIDTHS - 1] - 100.0).abs() < 1.0e-6);
        assert!(grid.windows(2).all(|w| w[0] < w[1]));
        assert!((bandwidth_grid(2)[N_BANDWIDTHS - 1] - 1.0).abs() < EPS);
    }

    #[test]
    fn test_cross_validated_bandwidth() {
        let grid = bandwidth_grid(400);
        // identical points favour the narrowest kernel
        assert_eq!(cross_validated_bandwidth(&[5.0, 5.0, 5.0], &grid), grid[0]);
        assert_eq!(cross_validated_bandwidth(&[5.0], &grid), grid[0]);
        // spread out points need a wider kernel than tight clusters
        let tight = cross_validated_bandwidth(&[100.0, 101.0, 102.0, 101.0, 100.0], &grid);
        let wide = cross_validated_bandwidth(&[10.0, 60.0, 120.0, 200.0, 310.0], &grid);
        assert!(tight < wide);
    }

    #[test]
    fn test_silverman_bandwidth() {
        assert_eq!(silverman_bandwidth(&[3.0]), MIN_BANDWIDTH);
        assert_eq!(silverman_bandwidth(&[3.0, 3.0, 3.0]), MIN_BANDWIDTH);
        let h = silverman_bandwidth(&[10.0, 20.0, 30.0, 40.0, 50.0]);
        assert!(h > MIN_BANDWIDTH);
    }

    #[test]
    fn test_empirical_p_value() {
        // 100 fixed null draws, observed equal to the 50th largest
        let nulls: Vec<usize> = (1 ..= 100).collect();
        assert_eq!(empirical_p_value(&nulls, 51, Tail::Upper), Some(0.50));
        assert_eq!(empirical_p_value(&nulls, 50, Tail::Lower), Some(0.50));
        assert_eq!(empirical_p_value(&nulls, 101, Tail::Upper), Some(0.0));
        assert_eq!(empirical_p_value(&nulls, 0, Tail::Upper), Some(1.0));
        assert_eq!(empirical_p_value::<usize>(&[], 0, Tail::Upper), None);
    }

    #[test]
    fn test_benjamini_hochberg() {
        let p = [0.01, 0.04, 0.03, 0.005];
        let q = benjamini_hochberg(&p);
        assert!((q[3] - 0.02).abs() < EPS);
        assert!((q[0] - 0.02).abs() < EPS);
        assert!((q[2] - 0.04).abs() < EPS);
        assert!((q[1] - 0.04).abs() < EPS);
    }

    #[test]
    fn test_benjamini_hochberg_monotone() {
        let p = [0.1, 0.001, 0.05, 0.01, 0.5, 0.5, 0.9, 0.0];
        let q = benjamini_hochberg(&p);
        let mut pairs: Vec<(f64, f64)> = p.iter().cloned().zip(q.iter().cloned()).collect();
        pairs.sort_by(|a, b| a.0.total_cmp(&b.0));
        for w in pairs.windows(2) {
            assert!(w[1].1 >= w[0].1 - EPS);
        }
        for (p, q) in pairs.iter() {
            assert!(q >= p);
            assert!(*q <= 1.0);
        }
    }

    #[test]
    fn test_bh_fdr_skips_undefined() {
        let p = [Some(0.01), None, Some(0.04), None, Some(0.03), Some(0.005)];
        let q = bh_fdr(&p);
        assert_eq!(q[1], None);
        assert_eq!(q[3], None);
        assert!((q[0].unwrap() - 0.02).abs() < EPS);
        assert!((q[2].unwrap() - 0.04).abs() < EPS);
        assert!((q[4].unwrap() - 0.04).abs() < EPS);
        assert!((q[5].unwrap() - 0.02).abs() < EPS);
        assert!(bh_fdr(&[None, None]).iter().all(|q| q.is_none()));
    }
}
