//! Fractional rank (empirical CDF at the true value).

/// Fraction of `samples` strictly below `true_value`.
///
/// Returns `None` for an empty sample set or a NaN true value; otherwise the
/// result lies in `[0, 1]` and depends only on the multiset of samples.
/// NaN samples never compare below anything and so count as "not below".
#[must_use]
pub fn fractional_rank(true_value: f64, samples: &[f64]) -> Option<f64> {
    if samples.is_empty() || true_value.is_nan() {
        return None;
    }
    let below = samples.iter().filter(|&&s| s < true_value).count();
    Some(below as f64 / samples.len() as f64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn empty_samples_have_no_rank() {
        assert_eq!(fractional_rank(1.0, &[]), None);
    }

    #[test]
    fn nan_truth_has_no_rank() {
        assert_eq!(fractional_rank(f64::NAN, &[1.0, 2.0]), None);
    }

    #[test]
    fn below_all_samples_is_zero() {
        assert_eq!(fractional_rank(-5.0, &[0.0, 1.0, 2.0]), Some(0.0));
    }

    #[test]
    fn above_all_samples_is_one() {
        assert_eq!(fractional_rank(5.0, &[0.0, 1.0, 2.0]), Some(1.0));
    }

    #[test]
    fn ties_are_not_counted_as_below() {
        // strictly-less: the two samples equal to 2.0 do not count
        assert_eq!(fractional_rank(2.0, &[1.0, 2.0, 2.0, 3.0]), Some(0.25));
    }

    #[test]
    fn quarter_rank() {
        let samples = [0.5, 1.5, 2.5, 3.5];
        assert_eq!(fractional_rank(1.0, &samples), Some(0.25));
        assert_eq!(fractional_rank(3.0, &samples), Some(0.75));
    }

    proptest! {
        #[test]
        fn rank_is_in_unit_interval(
            samples in prop::collection::vec(-1.0e6_f64..1.0e6, 1..256),
            truth in -1.0e6_f64..1.0e6,
        ) {
            let rank = fractional_rank(truth, &samples).unwrap();
            prop_assert!((0.0..=1.0).contains(&rank));
        }

        #[test]
        fn rank_ignores_sample_order(
            samples in prop::collection::vec(-100.0_f64..100.0, 1..128),
            truth in -100.0_f64..100.0,
        ) {
            let forward = fractional_rank(truth, &samples);
            let mut reversed = samples.clone();
            reversed.reverse();
            let mut sorted = samples.clone();
            sorted.sort_by(f64::total_cmp);
            prop_assert_eq!(forward, fractional_rank(truth, &reversed));
            prop_assert_eq!(forward, fractional_rank(truth, &sorted));
        }

        #[test]
        fn rank_extremes(samples in prop::collection::vec(-50.0_f64..50.0, 1..64)) {
            let lo = samples.iter().copied().fold(f64::INFINITY, f64::min);
            let hi = samples.iter().copied().fold(f64::NEG_INFINITY, f64::max);
            prop_assert_eq!(fractional_rank(lo - 1.0, &samples), Some(0.0));
            prop_assert_eq!(fractional_rank(hi + 1.0, &samples), Some(1.0));
        }
    }
}
