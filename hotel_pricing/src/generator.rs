//! Request generator
//!
//! Daily arrivals are Poisson; stay length, party size and lead time follow
//! empirical weights measured on real booking data. A quarter of bookings
//! cancel, and the cancellation day is skewed towards arrival: 40% of them
//! cancel on the arrival day itself.

use std::collections::VecDeque;

use rand::distr::weighted::WeightedIndex;
use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Bernoulli, Distribution, Poisson};

use crate::error::ConfigError;
use crate::request::Request;

/// Longest lead time the depth distribution produces
pub const MAX_DEPTH: usize = 30;

pub const CANCELLATION_PROBABILITY: f64 = 0.25;

/// Share of cancellations landing on the arrival day
pub const ARRIVAL_DAY_CANCELLATION_SHARE: f64 = 0.4;

/// Length of stay 1..=8 nights
pub const LOS_WEIGHTS: [f64; 8] = [
    0.382844, 0.217141, 0.153037, 0.100752, 0.059283, 0.038609, 0.033461, 0.014873,
];

/// Party size 1..=5 persons
pub const PERSONS_WEIGHTS: [f64; 5] = [0.607341, 0.326343, 0.053066, 0.011490, 0.001760];

/// Booking depth 0..=30 days
pub const DEPTH_WEIGHTS: [f64; MAX_DEPTH + 1] = [
    0.215860, 0.119922, 0.081003, 0.063378, 0.049164, 0.040811, 0.035930, 0.030865, 0.028687,
    0.027782, 0.023071, 0.021199, 0.020164, 0.018959, 0.019762, 0.017536, 0.017516, 0.016372,
    0.015004, 0.013438, 0.014983, 0.012648, 0.012206, 0.012499, 0.011484, 0.010770, 0.010136,
    0.010729, 0.009490, 0.009517, 0.009115,
];

/// Probability mass of cancelling `i` days before arrival, for `i` in `0..=depth`
///
/// `w(i) = ((d+1-i)/(d+1))^α - ((d-i)/(d+1))^α` with α chosen so that
/// `w(0)` equals [`ARRIVAL_DAY_CANCELLATION_SHARE`]. The sum telescopes to 1.
pub fn cancellation_offset_weights(depth: usize) -> Vec<f64> {
    assert!(depth > 0, "zero-depth bookings never cancel");
    let d = depth as f64;
    let alpha = (1.0 - ARRIVAL_DAY_CANCELLATION_SHARE).ln() / (d / (d + 1.0)).ln();
    (0..=depth)
        .map(|i| {
            let i = i as f64;
            ((d + 1.0 - i) / (d + 1.0)).powf(alpha) - ((d - i) / (d + 1.0)).powf(alpha)
        })
        .collect()
}

fn weighted(name: &'static str, weights: &[f64]) -> Result<WeightedIndex<f64>, ConfigError> {
    WeightedIndex::new(weights.iter().copied()).map_err(|e| ConfigError::Distribution {
        name,
        reason: e.to_string(),
    })
}

/// The five request distributions, validated once and shared by every trajectory
#[derive(Debug, Clone)]
pub struct RequestDistributions {
    arrivals: Poisson<f64>,
    los: WeightedIndex<f64>,
    persons: WeightedIndex<f64>,
    depth: WeightedIndex<f64>,
    cancellation: Bernoulli,
    /// Indexed by `depth - 1`
    cancellation_offset: Vec<WeightedIndex<f64>>,
}

impl RequestDistributions {
    pub fn new(arrival_rate: f64) -> Result<Self, ConfigError> {
        if !(arrival_rate.is_finite() && arrival_rate > 0.0) {
            return Err(ConfigError::invalid(
                "arrival_rate",
                format!("must be a positive finite rate, got {arrival_rate}"),
            ));
        }
        let arrivals = Poisson::new(arrival_rate).map_err(|e| ConfigError::Distribution {
            name: "arrivals",
            reason: e.to_string(),
        })?;
        let cancellation =
            Bernoulli::new(CANCELLATION_PROBABILITY).map_err(|e| ConfigError::Distribution {
                name: "cancellation",
                reason: e.to_string(),
            })?;
        let cancellation_offset = (1..=MAX_DEPTH)
            .map(|depth| weighted("cancellation_offset", &cancellation_offset_weights(depth)))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(RequestDistributions {
            arrivals,
            los: weighted("los", &LOS_WEIGHTS)?,
            persons: weighted("persons", &PERSONS_WEIGHTS)?,
            depth: weighted("depth", &DEPTH_WEIGHTS)?,
            cancellation,
            cancellation_offset,
        })
    }
}

/// Anything that hands the front desk a day's batch of unfilled requests
pub trait RequestSource {
    fn generate_requests(&mut self) -> Vec<Request>;
}

/// Stochastic request source
pub struct RequestGenerator {
    distributions: RequestDistributions,
    rng: StdRng,
}

impl RequestGenerator {
    pub fn new(distributions: RequestDistributions, seed: u64) -> Self {
        RequestGenerator {
            distributions,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    fn generate_cancellation(&mut self, depth: usize) -> Option<usize> {
        if !self.distributions.cancellation.sample(&mut self.rng) || depth == 0 {
            return None;
        }
        Some(self.distributions.cancellation_offset[depth - 1].sample(&mut self.rng))
    }

    pub fn generate_one_request(&mut self) -> Request {
        let los = self.distributions.los.sample(&mut self.rng) + 1;
        let persons = self.distributions.persons.sample(&mut self.rng) + 1;
        let depth = self.distributions.depth.sample(&mut self.rng);
        let cancellation_offset = self.generate_cancellation(depth);
        Request::new(los, persons, depth, cancellation_offset)
    }
}

impl RequestSource for RequestGenerator {
    fn generate_requests(&mut self) -> Vec<Request> {
        let count = self.distributions.arrivals.sample(&mut self.rng) as usize;
        (0..count).map(|_| self.generate_one_request()).collect()
    }
}

/// Replays fixed batches, one per day, then stays quiet
#[derive(Debug, Clone, Default)]
pub struct ScriptedRequests {
    days: VecDeque<Vec<Request>>,
}

impl ScriptedRequests {
    pub fn new(days: Vec<Vec<Request>>) -> Self {
        ScriptedRequests { days: days.into() }
    }
}

impl RequestSource for ScriptedRequests {
    fn generate_requests(&mut self) -> Vec<Request> {
        self.days.pop_front().unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn cancellation_weights_sum_to_one() {
        for depth in 1..=MAX_DEPTH {
            let weights = cancellation_offset_weights(depth);
            assert_eq!(weights.len(), depth + 1);
            assert_abs_diff_eq!(weights.iter().sum::<f64>(), 1.0, epsilon = 1e-12);
            assert!(weights.iter().all(|w| *w >= 0.0));
        }
    }

    #[test]
    fn forty_percent_cancel_on_arrival_day() {
        for depth in [1, 2, 7, 30] {
            let weights = cancellation_offset_weights(depth);
            assert_abs_diff_eq!(weights[0], 0.4, epsilon = 1e-12);
        }
    }

    #[test]
    fn rejects_non_positive_rate() {
        assert!(RequestDistributions::new(0.0).is_err());
        assert!(RequestDistributions::new(-3.0).is_err());
        assert!(RequestDistributions::new(f64::NAN).is_err());
    }

    #[test]
    fn samples_stay_within_supports() {
        let mut generator = RequestGenerator::new(RequestDistributions::new(30.0).unwrap(), 7);

        for _ in 0..5000 {
            let request = generator.generate_one_request();
            assert!((1..=8).contains(&request.los));
            assert!((1..=5).contains(&request.persons));
            assert!(request.depth <= MAX_DEPTH);
            if let Some(offset) = request.cancellation_offset {
                assert!(request.depth > 0, "zero-depth request cancelled");
                assert!(offset <= request.depth);
            }
        }
    }

    #[test]
    fn daily_batch_size_tracks_arrival_rate() {
        let mut generator = RequestGenerator::new(RequestDistributions::new(30.0).unwrap(), 11);
        let days = 2000;
        let total: usize = (0..days).map(|_| generator.generate_requests().len()).sum();
        let mean = total as f64 / days as f64;

        // Poisson(30): standard error of the mean over 2000 days ≈ 0.12
        assert!((mean - 30.0).abs() < 0.6, "mean batch {mean}");
    }

    #[test]
    fn cancellation_rate_among_deep_bookings() {
        let mut generator = RequestGenerator::new(RequestDistributions::new(30.0).unwrap(), 3);
        let requests: Vec<Request> = (0..20000)
            .map(|_| generator.generate_one_request())
            .filter(|r| r.depth > 0)
            .collect();
        let cancelled = requests
            .iter()
            .filter(|r| r.cancellation_offset.is_some())
            .count();
        let rate = cancelled as f64 / requests.len() as f64;

        assert!((rate - CANCELLATION_PROBABILITY).abs() < 0.02, "rate {rate}");
    }

    #[test]
    fn same_seed_same_requests() {
        let distributions = RequestDistributions::new(12.0).unwrap();
        let mut a = RequestGenerator::new(distributions.clone(), 99);
        let mut b = RequestGenerator::new(distributions, 99);
        for _ in 0..20 {
            assert_eq!(a.generate_requests(), b.generate_requests());
        }
    }

    #[test]
    fn scripted_source_replays_then_goes_quiet() {
        let mut source = ScriptedRequests::new(vec![
            vec![Request::new(1, 1, 0, None)],
            vec![],
            vec![Request::new(2, 2, 1, None), Request::new(1, 1, 3, Some(1))],
        ]);

        assert_eq!(source.generate_requests().len(), 1);
        assert!(source.generate_requests().is_empty());
        assert_eq!(source.generate_requests().len(), 2);
        assert!(source.generate_requests().is_empty());
    }
}
