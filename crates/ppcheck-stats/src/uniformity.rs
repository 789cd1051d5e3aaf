//! KS test of pooled fractional ranks against the uniform distribution.
//!
//! Under a correctly calibrated estimator the fractional rank of the true
//! value is U(0, 1) distributed across independent injections (probability
//! integral transform), so a small p-value flags a biased, overconfident or
//! underconfident posterior for that parameter.

use serde::{Deserialize, Serialize};

use crate::kolmogorov::{KsStatistic, PValueMethod, ks_statistic, ks_two_sided_pvalue};

/// Tests on fewer points than this are flagged degenerate.
pub const DEGENERATE_BELOW: usize = 2;

/// Outcome of one uniformity test.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct UniformityTest {
    pub statistic: KsStatistic,
    /// `P(D_n >= D)` under uniformity, in `[0, 1]`.
    pub p_value: f64,
    pub method: PValueMethod,
}

impl UniformityTest {
    /// Number of ranks that entered the test.
    #[must_use]
    pub fn count(&self) -> usize {
        self.statistic.n
    }

    #[must_use]
    pub fn is_degenerate(&self) -> bool {
        self.count() < DEGENERATE_BELOW
    }

    /// `true` when the test does not reject uniformity at `significance`.
    #[must_use]
    pub fn is_calibrated(&self, significance: f64) -> bool {
        self.p_value >= significance
    }
}

/// Two-sided one-sample KS test of `ranks` against U(0, 1).
///
/// Returns `None` for empty input or any non-finite rank.
#[must_use]
pub fn test_uniformity(ranks: &[f64]) -> Option<UniformityTest> {
    let statistic = ks_statistic(ranks, |x| x.clamp(0.0, 1.0))?;
    let (p_value, method) = ks_two_sided_pvalue(statistic.n, statistic.d);
    Some(UniformityTest {
        statistic,
        p_value,
        method,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn three_fixed_ranks() {
        let test = test_uniformity(&[0.25, 0.75, 0.5]).unwrap();
        assert_eq!(test.count(), 3);
        assert!(!test.is_degenerate());
        assert!((test.statistic.d - 0.25).abs() < 1e-12);
        assert!((test.p_value - 0.972_222_222_222_222_2).abs() < 1e-9);
        assert!(test.is_calibrated(0.01));
    }

    #[test]
    fn single_rank_is_degenerate() {
        let test = test_uniformity(&[0.3]).unwrap();
        assert!(test.is_degenerate());
        assert!((test.p_value - 0.6).abs() < 1e-9);
    }

    #[test]
    fn empty_has_no_test() {
        assert!(test_uniformity(&[]).is_none());
    }

    #[test]
    fn piled_up_ranks_are_rejected() {
        // An overconfident, biased posterior puts every truth above all samples.
        let ranks = vec![1.0; 40];
        let test = test_uniformity(&ranks).unwrap();
        assert!(test.p_value < 1e-10, "p={}", test.p_value);
        assert!(!test.is_calibrated(0.01));
    }

    #[test]
    fn evenly_spread_ranks_are_accepted() {
        let ranks: Vec<f64> = (0..20).map(|i| f64::from(i) / 20.0 + 0.025).collect();
        let test = test_uniformity(&ranks).unwrap();
        assert!((test.p_value - 1.0).abs() < 1e-12);
    }

    #[test]
    fn p_value_in_unit_interval() {
        let ranks = [0.1, 0.2, 0.3, 0.9, 0.95];
        let test = test_uniformity(&ranks).unwrap();
        assert!((0.0..=1.0).contains(&test.p_value));
        assert!((test.p_value - 0.664).abs() < 1e-9);
    }
}
