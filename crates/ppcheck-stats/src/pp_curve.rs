//! p-p curve coordinates.
//!
//! The curve is the empirical CDF of the pooled ranks drawn against the
//! uniform CDF; a calibrated parameter tracks the diagonal. Rendering is left
//! to the consumer, only the coordinates are produced here.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PpCurve {
    /// `[0, sorted ranks..., 1]`.
    pub x: Vec<f64>,
    /// `[0, 1/n, 2/n, ..., 1, 1]`.
    pub y: Vec<f64>,
}

impl PpCurve {
    /// Step coordinates for `ranks`; ordering of the input is irrelevant.
    #[must_use]
    pub fn from_ranks(ranks: &[f64]) -> Self {
        let n = ranks.len();
        let mut sorted = ranks.to_vec();
        sorted.sort_by(f64::total_cmp);

        let mut x = Vec::with_capacity(n + 2);
        x.push(0.0);
        x.extend_from_slice(&sorted);
        x.push(1.0);

        let mut y = Vec::with_capacity(n + 2);
        if n == 0 {
            y.push(0.0);
        } else {
            y.extend((0..=n).map(|i| i as f64 / n as f64));
        }
        y.push(1.0);

        Self { x, y }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.x.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.x.is_empty()
    }
}

/// `count` p-p curves of `n` exactly-uniform draws each, seeded for
/// reproducibility. These give the spread a calibrated ensemble of the same
/// size would show.
#[must_use]
pub fn synthetic_reference_curves(n: usize, count: usize, seed: u64) -> Vec<PpCurve> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..count)
        .map(|_| {
            let draws: Vec<f64> = (0..n).map(|_| rng.gen_range(0.0..1.0)).collect();
            PpCurve::from_ranks(&draws)
        })
        .collect()
}
