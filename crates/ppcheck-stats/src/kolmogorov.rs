//! One-sample Kolmogorov–Smirnov statistic and the distribution of the
//! two-sided statistic `D_n`.
//!
//! # Distribution
//!
//! For `n <= EXACT_MAX_N` the CDF `P(D_n < d)` is evaluated exactly with the
//! matrix method of Marsaglia, Tsang & Wang, "Evaluating Kolmogorov's
//! Distribution", J. Stat. Softw. 8(18), 2003, including its published
//! shortcut for the far tail (`n·d² > 7.24`, or `> 3.76` when `n > 99`).
//! Two closed forms bracket the support:
//!
//! - `d <= 1/(2n)`: `P(D_n >= d) = 1`,
//! - `d >= max(1 - 1/n, 1/2)`: `P(D_n >= d) = 2 (1 - d)^n`.
//!
//! Above `EXACT_MAX_N` the limiting Kolmogorov distribution of `sqrt(n)·D_n`
//! is used.

use std::f64::consts::PI;

use serde::{Deserialize, Serialize};

/// Largest ensemble size evaluated with the exact matrix method.
pub const EXACT_MAX_N: usize = 10_000;

const SCALE_THRESHOLD: f64 = 1e140;
const SCALE_DOWN: f64 = 1e-140;
const SCALE_EXPONENT: i32 = 140;

/// How a p-value was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PValueMethod {
    /// Exact finite-`n` distribution (matrix method or closed form).
    Exact,
    /// Marsaglia–Tsang–Wang far-tail approximation; the p-value is tiny.
    TailApproximation,
    /// Limiting Kolmogorov distribution of `sqrt(n)·D_n`.
    Asymptotic,
}

impl std::fmt::Display for PValueMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Exact => f.write_str("exact"),
            Self::TailApproximation => f.write_str("tail_approximation"),
            Self::Asymptotic => f.write_str("asymptotic"),
        }
    }
}

/// Two-sided KS statistic and its one-sided components.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct KsStatistic {
    /// `max(d_plus, d_minus)`.
    pub d: f64,
    /// `max_i (i/n - F(x_(i)))`.
    pub d_plus: f64,
    /// `max_i (F(x_(i)) - (i-1)/n)`.
    pub d_minus: f64,
    /// Number of points.
    pub n: usize,
}

/// KS statistic of `values` against the reference CDF `cdf`.
///
/// Returns `None` for empty input or when any value is not finite.
pub fn ks_statistic<F>(values: &[f64], cdf: F) -> Option<KsStatistic>
where
    F: Fn(f64) -> f64,
{
    if values.is_empty() || values.iter().any(|v| !v.is_finite()) {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);

    let n = sorted.len();
    let n_f64 = n as f64;
    let mut d_plus = f64::NEG_INFINITY;
    let mut d_minus = f64::NEG_INFINITY;
    for (i, &x) in sorted.iter().enumerate() {
        let f = cdf(x);
        d_plus = d_plus.max((i as f64 + 1.0) / n_f64 - f);
        d_minus = d_minus.max(f - i as f64 / n_f64);
    }
    Some(KsStatistic {
        d: d_plus.max(d_minus),
        d_plus,
        d_minus,
        n,
    })
}

/// Two-sided p-value `P(D_n >= d)`, with the method used.
#[must_use]
pub fn ks_two_sided_pvalue(n: usize, d: f64) -> (f64, PValueMethod) {
    if n == 0 || d.is_nan() {
        return (f64::NAN, PValueMethod::Exact);
    }
    let n_f64 = n as f64;
    if d <= 0.5 / n_f64 {
        return (1.0, PValueMethod::Exact);
    }
    if d >= 1.0 {
        return (0.0, PValueMethod::Exact);
    }
    if d >= (1.0 - 1.0 / n_f64).max(0.5) {
        return (2.0 * (1.0 - d).powi(n as i32), PValueMethod::Exact);
    }
    if n > EXACT_MAX_N {
        return (
            kolmogorov_sf_asymptotic(n_f64.sqrt() * d),
            PValueMethod::Asymptotic,
        );
    }
    if in_far_tail(n, d) {
        return (
            2.0 * (-(tail_rate(n_f64) * d * d * n_f64)).exp(),
            PValueMethod::TailApproximation,
        );
    }
    let cdf = kolmogorov_cdf(n, d);
    ((1.0 - cdf).clamp(0.0, 1.0), PValueMethod::Exact)
}

/// `P(D_n < d)` for the two-sided statistic.
///
/// Uses the closed forms at the edges of the support, the far-tail shortcut,
/// and the exact matrix method otherwise (for any `n`; callers that care
/// about cost should go through [`ks_two_sided_pvalue`]).
#[must_use]
pub fn kolmogorov_cdf(n: usize, d: f64) -> f64 {
    if n == 0 {
        return 1.0;
    }
    if d.is_nan() {
        return f64::NAN;
    }
    let n_f64 = n as f64;
    if d <= 0.5 / n_f64 {
        return 0.0;
    }
    if d >= 1.0 {
        return 1.0;
    }
    if in_far_tail(n, d) {
        return 1.0 - 2.0 * (-(tail_rate(n_f64) * d * d * n_f64)).exp();
    }
    exact_cdf(n, d)
}

/// Limiting survival function `Q_KS(λ) = 2 Σ (-1)^(k-1) exp(-2 k² λ²)`.
#[must_use]
pub fn kolmogorov_sf_asymptotic(lambda: f64) -> f64 {
    const MAX_TERMS: usize = 100;
    const EPS: f64 = 1e-17;

    if lambda.is_nan() {
        return f64::NAN;
    }
    if lambda <= 0.0 {
        return 1.0;
    }
    if lambda < 1.18 {
        // Jacobi theta form of the CDF; the alternating series converges
        // slowly for small lambda.
        let w = PI * PI / (8.0 * lambda * lambda);
        let mut cdf = 0.0;
        for k in 1..=MAX_TERMS {
            let odd = (2 * k - 1) as f64;
            let term = (-odd * odd * w).exp();
            cdf += term;
            if term < EPS {
                break;
            }
        }
        let cdf = cdf * (2.0 * PI).sqrt() / lambda;
        return (1.0 - cdf).clamp(0.0, 1.0);
    }

    let mut sum = 0.0;
    let mut sign = 1.0;
    for k in 1..=MAX_TERMS {
        let k_f64 = k as f64;
        let term = (-2.0 * k_f64 * k_f64 * lambda * lambda).exp();
        sum += sign * term;
        if term < EPS {
            break;
        }
        sign = -sign;
    }
    (2.0 * sum).clamp(0.0, 1.0)
}

fn in_far_tail(n: usize, d: f64) -> bool {
    let s = d * d * n as f64;
    s > 7.24 || (s > 3.76 && n > 99)
}

fn tail_rate(n_f64: f64) -> f64 {
    2.000071 + 0.331 / n_f64.sqrt() + 1.409 / n_f64
}

// ---------------------------------------------------------------------------
// Marsaglia–Tsang–Wang matrix method
// ---------------------------------------------------------------------------

fn exact_cdf(n: usize, d: f64) -> f64 {
    let n_f64 = n as f64;
    let k = (n_f64 * d) as usize + 1;
    let m = 2 * k - 1;
    let h = k as f64 - n_f64 * d;

    let mut hm = vec![0.0_f64; m * m];
    for i in 0..m {
        for j in 0..m {
            if i + 1 >= j {
                hm[i * m + j] = 1.0;
            }
        }
    }
    for i in 0..m {
        hm[i * m] -= h.powi(i as i32 + 1);
        hm[(m - 1) * m + i] -= h.powi((m - i) as i32);
    }
    if 2.0 * h - 1.0 > 0.0 {
        hm[(m - 1) * m] += (2.0 * h - 1.0).powi(m as i32);
    }
    for i in 0..m {
        for j in 0..m {
            if i + 1 > j {
                for g in 1..=(i + 1 - j) {
                    hm[i * m + j] /= g as f64;
                }
            }
        }
    }

    let (q, mut exponent) = matrix_power(&hm, m, n);
    let mut s = q[(k - 1) * m + (k - 1)];
    for i in 1..=n {
        s = s * i as f64 / n_f64;
        if s < SCALE_DOWN {
            s *= SCALE_THRESHOLD;
            exponent -= SCALE_EXPONENT;
        }
    }
    (s * 10.0_f64.powi(exponent)).clamp(0.0, 1.0)
}

/// `a^n` for an `m×m` row-major matrix, returned as `(mantissa matrix,
/// decimal exponent)`; the matrix is rescaled whenever its centre element
/// exceeds `1e140`.
fn matrix_power(a: &[f64], m: usize, n: usize) -> (Vec<f64>, i32) {
    if n == 1 {
        return (a.to_vec(), 0);
    }
    let (half, half_exponent) = matrix_power(a, m, n / 2);
    let squared = matrix_multiply(&half, &half, m);
    let mut exponent = 2 * half_exponent;
    let mut v = if n % 2 == 0 {
        squared
    } else {
        matrix_multiply(a, &squared, m)
    };
    let centre = (m / 2) * m + m / 2;
    if v[centre] > SCALE_THRESHOLD {
        for value in &mut v {
            *value *= SCALE_DOWN;
        }
        exponent += SCALE_EXPONENT;
    }
    (v, exponent)
}

fn matrix_multiply(a: &[f64], b: &[f64], m: usize) -> Vec<f64> {
    let mut c = vec![0.0_f64; m * m];
    for i in 0..m {
        for l in 0..m {
            let a_il = a[i * m + l];
            if a_il == 0.0 {
                continue;
            }
            let b_row = &b[l * m..(l + 1) * m];
            let c_row = &mut c[i * m..(i + 1) * m];
            for (c_ij, &b_lj) in c_row.iter_mut().zip(b_row) {
                *c_ij += a_il * b_lj;
            }
        }
    }
    c
}
