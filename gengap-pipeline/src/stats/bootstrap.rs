//! Bootstrap estimation of P(female)
//!
//! Resamples a set of per-author P(female) values with replacement to
//! characterize the variability of their mean. The reported mean is
//! the empirical mean of the input; resampling exists only to produce
//! the interval bounds. Grouping is the caller's responsibility; the
//! estimator is invoked once per group and knows nothing about keys.

use rand::Rng;
use serde::Serialize;

/// Default resampling iteration count
pub const DEFAULT_ITERATIONS: usize = 1000;

/// Point estimate with a 95% percentile confidence interval.
/// All value fields are absent for an empty input group.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BootstrapEstimate {
    pub mean: Option<f64>,
    pub ci_lower: Option<f64>,
    pub ci_upper: Option<f64>,
    pub n: usize,
}

impl BootstrapEstimate {
    /// Returned for groups with no usable probabilities; reported as
    /// "insufficient data", never an error.
    pub fn insufficient() -> Self {
        Self {
            mean: None,
            ci_lower: None,
            ci_upper: None,
            n: 0,
        }
    }

    pub fn is_insufficient(&self) -> bool {
        self.n == 0
    }
}

/// Bootstrap a collection of P(female) values. The caller has already
/// excluded unresolved (null) probabilities.
pub fn bootstrap_p_female<R: Rng>(
    values: &[f64],
    iterations: usize,
    rng: &mut R,
) -> BootstrapEstimate {
    if values.is_empty() {
        return BootstrapEstimate::insufficient();
    }

    let n = values.len();
    let empirical_mean = values.iter().sum::<f64>() / n as f64;

    let mut means = Vec::with_capacity(iterations);
    for _ in 0..iterations {
        let mut total = 0.0;
        for _ in 0..n {
            total += values[rng.gen_range(0..n)];
        }
        means.push(total / n as f64);
    }

    means.sort_by(|a, b| a.total_cmp(b));

    BootstrapEstimate {
        mean: Some(empirical_mean),
        ci_lower: Some(percentile(&means, 2.5)),
        ci_upper: Some(percentile(&means, 97.5)),
        n,
    }
}

/// Percentile of a sorted sample with linear interpolation between
/// order statistics.
fn percentile(sorted: &[f64], q: f64) -> f64 {
    debug_assert!(!sorted.is_empty());
    let rank = q / 100.0 * (sorted.len() - 1) as f64;
    let lower = rank.floor() as usize;
    let upper = rank.ceil() as usize;
    if lower == upper {
        sorted[lower]
    } else {
        let weight = rank - lower as f64;
        sorted[lower] + weight * (sorted[upper] - sorted[lower])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn empty_input_is_insufficient_not_a_panic() {
        let mut rng = StdRng::seed_from_u64(7);
        let estimate = bootstrap_p_female(&[], DEFAULT_ITERATIONS, &mut rng);
        assert_eq!(estimate, BootstrapEstimate::insufficient());
        assert!(estimate.is_insufficient());
    }

    #[test]
    fn mean_is_empirical_not_mean_of_means() {
        let mut rng = StdRng::seed_from_u64(7);
        let estimate = bootstrap_p_female(&[0.0, 0.0, 0.0, 1.0], 100, &mut rng);
        // Exactly the input mean, unaffected by resampling noise
        assert_eq!(estimate.mean, Some(0.25));
        assert_eq!(estimate.n, 4);
    }

    #[test]
    fn degenerate_input_yields_zero_width_interval() {
        let mut rng = StdRng::seed_from_u64(7);
        let values = vec![0.75; 50];
        let estimate = bootstrap_p_female(&values, 200, &mut rng);
        assert_eq!(estimate.mean, Some(0.75));
        assert_eq!(estimate.ci_lower, Some(0.75));
        assert_eq!(estimate.ci_upper, Some(0.75));
    }

    #[test]
    fn interval_contains_known_ground_truth() {
        // 1000 ones and 1000 zeros: the mean is exactly 0.5 and the
        // 95% interval is narrow around it
        let mut values = vec![1.0; 1000];
        values.extend(vec![0.0; 1000]);

        let mut rng = StdRng::seed_from_u64(42);
        let estimate = bootstrap_p_female(&values, DEFAULT_ITERATIONS, &mut rng);

        assert_eq!(estimate.mean, Some(0.5));
        assert_eq!(estimate.n, 2000);

        let lower = estimate.ci_lower.unwrap();
        let upper = estimate.ci_upper.unwrap();
        assert!(lower < 0.5 && upper > 0.5);
        assert!(lower > 0.45, "lower bound {} too loose", lower);
        assert!(upper < 0.55, "upper bound {} too loose", upper);
        assert!(upper - lower < 0.06, "interval [{}, {}] too wide", lower, upper);
    }

    #[test]
    fn interval_bounds_stay_in_unit_range() {
        let mut rng = StdRng::seed_from_u64(3);
        let values = vec![0.1, 0.9, 0.5, 0.3, 0.7];
        let estimate = bootstrap_p_female(&values, 500, &mut rng);
        let lower = estimate.ci_lower.unwrap();
        let upper = estimate.ci_upper.unwrap();
        assert!((0.0..=1.0).contains(&lower));
        assert!((0.0..=1.0).contains(&upper));
        assert!(lower <= upper);
    }

    #[test]
    fn percentile_interpolates_linearly() {
        let sorted = vec![0.0, 1.0, 2.0, 3.0, 4.0];
        assert_eq!(percentile(&sorted, 0.0), 0.0);
        assert_eq!(percentile(&sorted, 50.0), 2.0);
        assert_eq!(percentile(&sorted, 100.0), 4.0);
        assert!((percentile(&sorted, 62.5) - 2.5).abs() < 1e-12);
    }
}
