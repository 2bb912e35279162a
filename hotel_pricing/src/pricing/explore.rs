//! Explore/exploit pricing
//!
//! Cold start: offer uniformly random grid prices until the history holds
//! `explore_count` observations beyond one per grid price.
//!
//! After that, every observed price gets an optimistic acceptance score
//!
//! ```text
//! score = (p + sqrt(p (1 - p) / n)) × rest
//! ```
//!
//! where `p` and `n` are its empirical acceptance rate and sample size, and
//! `rest` is the forecast demand at this lead time per vacant room on the
//! arrival day. The forecast is the 7-day request count over depths up to the
//! request's depth.
//!
//! The four variants differ in how `rest` is formed and how the price is
//! picked from the scores:
//!
//! | variant | same-day requests deducted | no vacancy        | score above threshold | otherwise           |
//! |---------|----------------------------|-------------------|-----------------------|---------------------|
//! | v1      | no                         | RackRate          | lowest such price     | max score           |
//! | v2      | yes                        | RackRate          | highest such price    | max score           |
//! | v3      | yes                        | RackRate          | highest such price    | max score × price   |
//! | v4      | yes                        | one-room floor    | highest such price    | max score × price   |

use std::fmt;
use std::str::FromStr;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::hotel::Hotel;
use crate::request::Request;

use super::learning::{AcceptanceHistory, DemandWindow, DepthCounts};
use super::{PolicySnapshot, PriceGrid, PricingContext, PricingPolicy};

/// Observations beyond one per grid price before exploitation starts
pub const DEFAULT_EXPLORE_COUNT: usize = 500;

/// Largest exploration budget a configuration may ask for
pub const MAX_EXPLORE_COUNT: usize = 1_000_000_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Variant {
    V1,
    V2,
    V3,
    V4,
}

/// Which qualifying price wins
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Qualifying {
    Lowest,
    Highest,
}

/// How to pick when no score clears the threshold
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fallback {
    MaxScore,
    MaxRevenue,
}

impl Variant {
    pub const ALL: [Variant; 4] = [Variant::V1, Variant::V2, Variant::V3, Variant::V4];

    pub fn deducts_same_day(self) -> bool {
        !matches!(self, Variant::V1)
    }

    pub fn qualifying(self) -> Qualifying {
        match self {
            Variant::V1 => Qualifying::Lowest,
            _ => Qualifying::Highest,
        }
    }

    pub fn fallback(self) -> Fallback {
        match self {
            Variant::V1 | Variant::V2 => Fallback::MaxScore,
            Variant::V3 | Variant::V4 => Fallback::MaxRevenue,
        }
    }

    /// v4 divides by at least one room instead of bailing out at RackRate
    pub fn floors_vacancy(self) -> bool {
        matches!(self, Variant::V4)
    }
}

impl fmt::Display for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Variant::V1 => write!(f, "v1"),
            Variant::V2 => write!(f, "v2"),
            Variant::V3 => write!(f, "v3"),
            Variant::V4 => write!(f, "v4"),
        }
    }
}

impl FromStr for Variant {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "v1" | "1" | "pricingsomemethod" => Ok(Variant::V1),
            "v2" | "2" | "pricingsomemethodv2" => Ok(Variant::V2),
            "v3" | "3" | "pricingsomemethodv3" => Ok(Variant::V3),
            "v4" | "4" | "pricingsomemethodv4" => Ok(Variant::V4),
            _ => Err(ConfigError::UnknownVariant(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoredPrice {
    pub price: f64,
    pub score: f64,
}

/// Optimistic acceptance score before scaling by `rest`
pub fn upper_acceptance(rate: f64, trials: u32) -> f64 {
    rate + (rate * (1.0 - rate) / trials as f64).sqrt()
}

pub struct ExploreExploit {
    variant: Variant,
    threshold: f64,
    explore_count: usize,
    history: AcceptanceHistory,
    window: DemandWindow,
    rng: StdRng,
}

impl ExploreExploit {
    pub fn new(
        variant: Variant,
        nominal_price: f64,
        threshold: f64,
        explore_count: usize,
        seed: u64,
    ) -> Self {
        ExploreExploit {
            variant,
            threshold,
            explore_count,
            history: AcceptanceHistory::new(PriceGrid::new(nominal_price)),
            window: DemandWindow::new(),
            rng: StdRng::seed_from_u64(seed),
        }
    }

    fn grid(&self) -> &PriceGrid {
        self.history.grid()
    }

    pub fn is_exploring(&self) -> bool {
        self.history.observations() < self.explore_count.saturating_add(self.grid().len())
    }

    /// Forecast demand per vacant room, `None` when v1-v3 find no vacancy
    pub fn rest(&self, hotel: &Hotel, request: &Request, context: &PricingContext) -> Option<f64> {
        let mut forecast = self.window.orders_up_to(request.depth) as f64;
        if self.variant.deducts_same_day() {
            forecast = (forecast - context.requests_today as f64).max(0.0);
        }

        let vacant = hotel
            .number_of_rooms()
            .saturating_sub(hotel.get_loading(request.start_day()));
        if vacant == 0 {
            if !self.variant.floors_vacancy() {
                return None;
            }
            return Some(forecast);
        }
        Some(forecast / vacant as f64)
    }

    /// Scores of every price observed so far, cheapest first
    pub fn scores(&self, rest: f64) -> Vec<ScoredPrice> {
        self.history
            .estimates()
            .map(|estimate| ScoredPrice {
                price: estimate.price,
                score: upper_acceptance(estimate.rate, estimate.trials) * rest,
            })
            .collect()
    }

    /// Pick a price from the current history for a given `rest`
    pub fn select_price(&self, rest: f64) -> f64 {
        let scores = self.scores(rest);
        let qualifying = scores.iter().filter(|s| s.score > self.threshold);
        let chosen = match self.variant.qualifying() {
            Qualifying::Lowest => qualifying.min_by(|a, b| a.price.total_cmp(&b.price)),
            Qualifying::Highest => qualifying.max_by(|a, b| a.price.total_cmp(&b.price)),
        };
        if let Some(chosen) = chosen {
            return chosen.price;
        }

        // ties go to the dearer price: scores are cheapest first and
        // max_by keeps the last maximum
        let fallback = match self.variant.fallback() {
            Fallback::MaxScore => scores.iter().max_by(|a, b| a.score.total_cmp(&b.score)),
            Fallback::MaxRevenue => scores
                .iter()
                .max_by(|a, b| (a.score * a.price).total_cmp(&(b.score * b.price))),
        };
        fallback.map_or(self.grid().rack_rate(), |s| s.price)
    }

    fn explore(&mut self) -> f64 {
        let len = self.grid().len();
        let index = self.rng.random_range(0..len);
        self.grid().price(index)
    }
}

impl PricingPolicy for ExploreExploit {
    fn name(&self) -> String {
        format!("explore_exploit_{}", self.variant)
    }

    fn set_price(&mut self, hotel: &Hotel, request: &Request, context: &PricingContext) -> f64 {
        if self.is_exploring() {
            return self.explore();
        }

        let Some(rest) = self.rest(hotel, request, context) else {
            tracing::trace!(depth = request.depth, "no vacancy on arrival day, quoting rack rate");
            return self.grid().rack_rate();
        };
        let price = self.select_price(rest);
        tracing::trace!(depth = request.depth, rest, price, "exploit");
        price
    }

    fn update_history(&mut self, price: f64, accepted: bool) {
        self.history.record(price, accepted);
    }

    fn update_queue(&mut self, counts: &DepthCounts) {
        self.window.push_day(counts);
    }

    fn snapshot(&self) -> PolicySnapshot {
        PolicySnapshot {
            policy: self.name(),
            threshold: Some(self.threshold),
            explore_count: Some(self.explore_count),
            observations: self.history.observations(),
            exploiting: !self.is_exploring(),
            price_stats: self.history.price_stats(),
            demand_window: self.window.totals(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use std::collections::HashMap;

    fn policy(variant: Variant, threshold: f64) -> ExploreExploit {
        ExploreExploit::new(variant, 1000.0, threshold, 0, 1)
    }

    fn feed(policy: &mut ExploreExploit, price: f64, accepted: bool, times: usize) {
        for _ in 0..times {
            policy.update_history(price, accepted);
        }
    }

    #[test]
    fn variant_parses_class_style_names() {
        assert_eq!("PricingSomeMethod".parse::<Variant>().unwrap(), Variant::V1);
        assert_eq!("PricingSomeMethodv3".parse::<Variant>().unwrap(), Variant::V3);
        assert_eq!("V4".parse::<Variant>().unwrap(), Variant::V4);
        assert!("v5".parse::<Variant>().is_err());
    }

    #[test]
    fn upper_acceptance_is_exact_for_degenerate_rates() {
        assert_eq!(upper_acceptance(1.0, 10), 1.0);
        assert_eq!(upper_acceptance(0.0, 10), 0.0);
        assert_abs_diff_eq!(upper_acceptance(0.5, 4), 0.75, epsilon = 1e-12);
    }

    #[test]
    fn clear_winner_is_chosen_by_every_variant() {
        for variant in Variant::ALL {
            let mut policy = policy(variant, 0.05);
            feed(&mut policy, 500.0, true, 10);
            feed(&mut policy, 600.0, false, 10);

            let scores = policy.scores(1.0);
            assert_eq!(scores.len(), 2);
            assert_eq!(scores[0], ScoredPrice { price: 500.0, score: 1.0 });
            assert_eq!(scores[1], ScoredPrice { price: 600.0, score: 0.0 });
            assert_eq!(policy.select_price(1.0), 500.0, "{variant}");
        }
    }

    fn two_qualifying(variant: Variant) -> ExploreExploit {
        let mut policy = policy(variant, 0.3);
        feed(&mut policy, 700.0, true, 9);
        feed(&mut policy, 700.0, false, 1);
        feed(&mut policy, 900.0, true, 6);
        feed(&mut policy, 900.0, false, 4);
        feed(&mut policy, 1300.0, false, 10);
        policy
    }

    #[test]
    fn v1_takes_lowest_qualifying_price() {
        assert_eq!(two_qualifying(Variant::V1).select_price(1.0), 700.0);
    }

    #[test]
    fn later_variants_take_highest_qualifying_price() {
        for variant in [Variant::V2, Variant::V3, Variant::V4] {
            assert_eq!(two_qualifying(variant).select_price(1.0), 900.0, "{variant}");
        }
    }

    fn none_qualifying(variant: Variant) -> ExploreExploit {
        // scores at rest 1: 600 -> 0.8 + 0.1265, 1400 -> 0.5 + 0.1581
        let mut policy = policy(variant, 5.0);
        feed(&mut policy, 600.0, true, 8);
        feed(&mut policy, 600.0, false, 2);
        feed(&mut policy, 1400.0, true, 5);
        feed(&mut policy, 1400.0, false, 5);
        policy
    }

    #[test]
    fn max_score_fallback() {
        assert_eq!(none_qualifying(Variant::V1).select_price(1.0), 600.0);
        assert_eq!(none_qualifying(Variant::V2).select_price(1.0), 600.0);
    }

    #[test]
    fn revenue_weighted_fallback() {
        assert_eq!(none_qualifying(Variant::V3).select_price(1.0), 1400.0);
        assert_eq!(none_qualifying(Variant::V4).select_price(1.0), 1400.0);
    }

    #[test]
    fn score_ties_go_to_the_dearer_price() {
        let mut policy = policy(Variant::V2, 5.0);
        feed(&mut policy, 800.0, true, 3);
        feed(&mut policy, 1100.0, true, 3);
        assert_eq!(policy.select_price(1.0), 1100.0);
    }

    #[test]
    fn threshold_scales_with_rest() {
        let mut policy = policy(Variant::V2, 1.5);
        feed(&mut policy, 1000.0, true, 10);
        feed(&mut policy, 1200.0, true, 5);
        feed(&mut policy, 1200.0, false, 5);

        // rest 1: nothing clears 1.5, max score is 1000
        assert_eq!(policy.select_price(1.0), 1000.0);
        // rest 3: 1200 scores ≈ 1.97 and qualifies
        assert_eq!(policy.select_price(3.0), 1200.0);
    }

    #[test]
    fn no_history_falls_back_to_rack_rate() {
        assert_eq!(policy(Variant::V3, 1.0).select_price(1.0), 1500.0);
    }

    #[test]
    fn explores_until_budget_is_spent() {
        let mut policy = ExploreExploit::new(Variant::V2, 1000.0, 1.0, 10, 3);
        let hotel = Hotel::new(1, 10);
        let request = Request::new(1, 1, 0, None).filled(0);

        for _ in 0..(10 + 41 - 1) {
            assert!(policy.is_exploring());
            let price = policy.set_price(&hotel, &request, &PricingContext::default());
            policy.update_history(price, false);
        }
        assert!(policy.is_exploring());
        policy.update_history(1000.0, false);
        assert!(!policy.is_exploring());
    }

    #[test]
    fn unbounded_budget_never_stops_exploring() {
        let mut policy = ExploreExploit::new(Variant::V2, 1000.0, 1.0, usize::MAX, 1);
        let hotel = Hotel::new(1, 10);
        let request = Request::new(1, 1, 0, None).filled(0);

        for _ in 0..100 {
            let price = policy.set_price(&hotel, &request, &PricingContext::default());
            assert!((500.0..=1500.0).contains(&price));
            policy.update_history(price, true);
        }
        assert!(policy.is_exploring());
        assert!(!policy.snapshot().exploiting);
    }

    #[test]
    fn exploration_covers_grid_uniformly() {
        let mut policy = ExploreExploit::new(Variant::V1, 1000.0, 1.0, MAX_EXPLORE_COUNT, 2024);
        let hotel = Hotel::new(1, 10);
        let request = Request::new(1, 1, 0, None).filled(0);

        let draws = 41 * 500;
        let mut counts: HashMap<u64, usize> = HashMap::new();
        for _ in 0..draws {
            let price = policy.set_price(&hotel, &request, &PricingContext::default());
            *counts.entry(price.to_bits()).or_default() += 1;
        }

        assert_eq!(counts.len(), 41);
        // expected 500 per price, sd ≈ 22
        for (&bits, &count) in &counts {
            assert!(
                (400..=600).contains(&count),
                "price {} drawn {count} times",
                f64::from_bits(bits)
            );
        }
    }

    fn booked_hotel(rooms: usize, occupied: usize) -> Hotel {
        let mut hotel = Hotel::new(rooms, 10);
        for room in 0..occupied {
            let stay = Request::new(1, 1, 2, None).filled(0);
            hotel.booking(&stay, &[room], crate::hotel::BookingId(room as u64 + 1), 1000.0);
        }
        hotel
    }

    fn window_with(policy: &mut ExploreExploit, pairs: &[(usize, u32)]) {
        let mut counts = DepthCounts::new();
        for &(depth, n) in pairs {
            for _ in 0..n {
                counts.record(depth);
            }
        }
        policy.update_queue(&counts);
    }

    #[test]
    fn rest_divides_forecast_by_vacant_rooms() {
        let hotel = booked_hotel(5, 1);
        let request = Request::new(1, 1, 2, None).filled(0);
        let context = PricingContext { requests_today: 3 };

        let mut v1 = policy(Variant::V1, 1.0);
        window_with(&mut v1, &[(0, 4), (2, 4), (5, 10)]);
        assert_eq!(v1.rest(&hotel, &request, &context), Some(8.0 / 4.0));

        let mut v2 = policy(Variant::V2, 1.0);
        window_with(&mut v2, &[(0, 4), (2, 4), (5, 10)]);
        assert_eq!(v2.rest(&hotel, &request, &context), Some(5.0 / 4.0));
    }

    #[test]
    fn same_day_deduction_clamps_at_zero() {
        let hotel = booked_hotel(5, 0);
        let request = Request::new(1, 1, 0, None).filled(0);
        let mut policy = policy(Variant::V3, 1.0);
        window_with(&mut policy, &[(0, 2)]);

        let context = PricingContext { requests_today: 9 };
        assert_eq!(policy.rest(&hotel, &request, &context), Some(0.0));
    }

    #[test]
    fn full_arrival_day_quotes_rack_rate_except_v4() {
        let hotel = booked_hotel(2, 2);
        let request = Request::new(1, 1, 2, None).filled(0);
        let context = PricingContext::default();

        for variant in [Variant::V1, Variant::V2, Variant::V3] {
            let mut policy = policy(variant, 1.0);
            feed(&mut policy, 500.0, true, 41);
            assert_eq!(policy.rest(&hotel, &request, &context), None);
            assert_eq!(policy.set_price(&hotel, &request, &context), 1500.0);
        }

        let mut v4 = policy(Variant::V4, 0.5);
        window_with(&mut v4, &[(1, 3)]);
        feed(&mut v4, 500.0, true, 41);
        assert_eq!(v4.rest(&hotel, &request, &context), Some(3.0));
        assert_eq!(v4.set_price(&hotel, &request, &context), 500.0);
    }

    #[test]
    fn snapshot_reports_learning_state() {
        let mut policy = policy(Variant::V2, 2.0);
        feed(&mut policy, 500.0, true, 30);
        feed(&mut policy, 750.0, false, 11);
        window_with(&mut policy, &[(3, 2)]);

        let snapshot = policy.snapshot();
        assert_eq!(snapshot.policy, "explore_exploit_v2");
        assert_eq!(snapshot.observations, 41);
        assert!(snapshot.exploiting);
        assert_eq!(snapshot.price_stats.len(), 2);
        assert_eq!(snapshot.demand_window[3], 2);
        assert_eq!(snapshot.threshold, Some(2.0));
    }
}
