use ppcheck_stats::{PpCurve, fractional_rank, test_uniformity};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

const SEED: u64 = 0x5eed_0001;
const TRIALS: usize = 200;
const SAMPLES_PER_TRIAL: usize = 500;

fn standard_normal(rng: &mut StdRng) -> f64 {
    // Box-Muller; 1 - u keeps the log argument away from zero.
    let u1: f64 = 1.0 - rng.gen_range(0.0..1.0);
    let u2: f64 = rng.gen_range(0.0..1.0);
    (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos()
}

/// Ranks of truths drawn from the same N(mu, sigma) the samples come from,
/// optionally shifting the truth by `bias` (a miscalibrated estimator).
fn simulate_ranks(rng: &mut StdRng, trials: usize, bias: f64, width_scale: f64) -> Vec<f64> {
    (0..trials)
        .map(|_| {
            let mu = rng.gen_range(-10.0..10.0);
            let sigma = rng.gen_range(0.5..3.0);
            let truth = standard_normal(rng).mul_add(sigma, mu) + bias * sigma;
            let samples: Vec<f64> = (0..SAMPLES_PER_TRIAL)
                .map(|_| standard_normal(rng).mul_add(sigma * width_scale, mu))
                .collect();
            fractional_rank(truth, &samples).expect("non-empty samples")
        })
        .collect()
}

#[test]
fn calibrated_ensembles_pass_on_average() {
    let mut rng = StdRng::seed_from_u64(SEED);
    let repeats = 20;
    let mut p_sum = 0.0;
    let mut rejections = 0;
    for _ in 0..repeats {
        let ranks = simulate_ranks(&mut rng, TRIALS, 0.0, 1.0);
        assert!(ranks.iter().all(|r| (0.0..=1.0).contains(r)));
        let test = test_uniformity(&ranks).expect("test runs");
        p_sum += test.p_value;
        if test.p_value < 0.01 {
            rejections += 1;
        }
    }
    let mean_p = p_sum / f64::from(repeats);
    assert!(mean_p > 0.1, "mean p-value too small for a calibrated estimator: {mean_p}");
    assert!(rejections <= 3, "too many rejections at 1%: {rejections}/{repeats}");
}

#[test]
fn biased_estimator_is_detected() {
    let mut rng = StdRng::seed_from_u64(SEED ^ 0xb1a5);
    let ranks = simulate_ranks(&mut rng, TRIALS, 1.0, 1.0);
    let test = test_uniformity(&ranks).expect("test runs");
    assert!(test.p_value < 1e-6, "bias went unnoticed: p={}", test.p_value);
}

#[test]
fn overconfident_estimator_is_detected() {
    let mut rng = StdRng::seed_from_u64(SEED ^ 0x0c0f);
    // Posterior four times too narrow: truths pile up at ranks 0 and 1.
    let ranks = simulate_ranks(&mut rng, TRIALS, 0.0, 0.25);
    let test = test_uniformity(&ranks).expect("test runs");
    assert!(test.p_value < 1e-4, "overconfidence went unnoticed: p={}", test.p_value);
}

#[test]
fn pp_curve_of_calibrated_ensemble_hugs_the_diagonal() {
    let mut rng = StdRng::seed_from_u64(SEED ^ 0xd1a9);
    let ranks = simulate_ranks(&mut rng, TRIALS, 0.0, 1.0);
    let curve = PpCurve::from_ranks(&ranks);
    let test = test_uniformity(&ranks).expect("test runs");
    // Every vertex of the step curve sits within D of the diagonal.
    for (x, y) in curve.x.iter().zip(&curve.y) {
        assert!((x - y).abs() <= test.statistic.d + 1e-12);
    }
}
