//! Guest price sensitivity
//!
//! Acceptance probability is `1 - Φ(ρ (price / nominal - 1))`: one half at the
//! nominal price, and with the default ρ close to 1 at half price and close
//! to 0 at one and a half times the nominal price.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::normal::standard_normal_cdf;

/// Calibrated so a ±50% deviation from nominal gives ≈1% / ≈99% acceptance
pub const DEFAULT_RHO: f64 = 4.66;

pub struct AcceptanceModel {
    nominal_price: f64,
    rho: f64,
    rng: StdRng,
}

impl AcceptanceModel {
    pub fn new(nominal_price: f64, rho: f64, seed: u64) -> Self {
        AcceptanceModel {
            nominal_price,
            rho,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn probability(&self, price: f64) -> f64 {
        acceptance_probability(price, self.nominal_price, self.rho)
    }

    /// One Bernoulli draw: does the guest take the room at `price`?
    pub fn decision(&mut self, price: f64) -> bool {
        let p = self.probability(price);
        self.rng.random_bool(p)
    }
}

pub fn acceptance_probability(price: f64, nominal_price: f64, rho: f64) -> f64 {
    (1.0 - standard_normal_cdf(rho * (price / nominal_price - 1.0))).clamp(0.0, 1.0)
}
