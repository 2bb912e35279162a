//! Standard normal CDF
//!
//! `erf` is odd by construction, so `standard_normal_cdf(0.0)` is exactly 0.5.

use std::f64::consts::{FRAC_1_SQRT_2, PI};

/// Below this the Maclaurin series is used, above it the continued fraction
const SERIES_LIMIT: f64 = 3.0;

const CONTINUED_FRACTION_TERMS: usize = 60;

pub fn erf(x: f64) -> f64 {
    if x.is_nan() {
        return f64::NAN;
    }
    if x < 0.0 {
        return -erf(-x);
    }
    if x < SERIES_LIMIT {
        erf_series(x)
    } else {
        1.0 - erfc_continued_fraction(x)
    }
}

// erf(x) = 2/√π Σ (-1)^n x^(2n+1) / (n! (2n+1))
fn erf_series(x: f64) -> f64 {
    let x2 = x * x;
    let mut power = x; // (-1)^n x^(2n+1) / n!
    let mut sum = x;
    for n in 1..200 {
        power *= -x2 / n as f64;
        let term = power / (2 * n + 1) as f64;
        sum += term;
        if term.abs() < 1e-17 * sum.abs() {
            break;
        }
    }
    sum * 2.0 / PI.sqrt()
}

// erfc(x) = e^{-x²}/√π · 1/(x + (1/2)/(x + 1/(x + (3/2)/(x + ...))))
fn erfc_continued_fraction(x: f64) -> f64 {
    let mut tail = x;
    for k in (1..=CONTINUED_FRACTION_TERMS).rev() {
        tail = x + (k as f64 * 0.5) / tail;
    }
    (-x * x).exp() / (PI.sqrt() * tail)
}

/// Φ(x) for the standard normal distribution
pub fn standard_normal_cdf(x: f64) -> f64 {
    0.5 * (1.0 + erf(x * FRAC_1_SQRT_2))
}
