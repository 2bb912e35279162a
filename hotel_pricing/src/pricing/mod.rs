//! Pricing policies
//!
//! Every policy answers one question: what price per person to offer for a
//! request, given the hotel as it stands. Adaptive policies also learn from
//! what happened to earlier offers, through `update_history` after each
//! priced request and `update_queue` once per closed day. Static policies
//! ignore both.

pub mod explore;
pub mod learning;
pub mod table;

use std::sync::Arc;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;

use crate::hotel::Hotel;
use crate::request::Request;

pub use explore::{DEFAULT_EXPLORE_COUNT, ExploreExploit, MAX_EXPLORE_COUNT, Variant};
pub use learning::{AcceptanceHistory, DemandWindow, DepthCounts};
pub use table::PercentileTable;

/// Number of intervals between Netto and RackRate; the grid has one more price
pub const PRICE_STEPS: usize = 40;

/// Per-request facts the hotel state alone does not carry
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PricingContext {
    /// Requests of the current day handled before this one, fitted or not
    pub requests_today: usize,
}

pub trait PricingPolicy {
    fn name(&self) -> String;

    fn set_price(&mut self, hotel: &Hotel, request: &Request, context: &PricingContext) -> f64;

    fn update_history(&mut self, _price: f64, _accepted: bool) {}

    fn update_queue(&mut self, _counts: &DepthCounts) {}

    fn snapshot(&self) -> PolicySnapshot;
}

/// Evenly spaced prices from Netto (½ nominal) to RackRate (1½ nominal)
#[derive(Debug, Clone, PartialEq)]
pub struct PriceGrid {
    nominal: f64,
    step: f64,
    prices: Vec<f64>,
}

impl PriceGrid {
    pub fn new(nominal: f64) -> Self {
        let netto = 0.5 * nominal;
        let rack_rate = 1.5 * nominal;
        let step = (rack_rate - netto) / PRICE_STEPS as f64;
        let prices = (0..=PRICE_STEPS).map(|k| netto + k as f64 * step).collect();
        PriceGrid {
            nominal,
            step,
            prices,
        }
    }

    pub fn nominal(&self) -> f64 {
        self.nominal
    }

    pub fn netto(&self) -> f64 {
        self.prices[0]
    }

    pub fn rack_rate(&self) -> f64 {
        self.prices[PRICE_STEPS]
    }

    pub fn prices(&self) -> &[f64] {
        &self.prices
    }

    pub fn len(&self) -> usize {
        self.prices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.prices.is_empty()
    }

    pub fn price(&self, index: usize) -> f64 {
        self.prices[index]
    }

    /// Grid slot of `price`, if it sits on the grid
    pub fn index_of(&self, price: f64) -> Option<usize> {
        let offset = (price - self.netto()) / self.step;
        let index = offset.round();
        if index < 0.0 || index > PRICE_STEPS as f64 || (offset - index).abs() > 1e-6 {
            return None;
        }
        Some(index as usize)
    }
}

/// Acceptance statistics for one grid price
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PriceStat {
    pub price: f64,
    pub trials: u32,
    pub accepted: u32,
}

/// What a policy looks like at the end of a trajectory
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PolicySnapshot {
    pub policy: String,
    pub threshold: Option<f64>,
    pub explore_count: Option<usize>,
    pub observations: usize,
    pub exploiting: bool,
    pub price_stats: Vec<PriceStat>,
    /// Requests per depth currently held in the 7-day window
    pub demand_window: Vec<u32>,
}

impl PolicySnapshot {
    fn fixed(policy: String) -> Self {
        PolicySnapshot {
            policy,
            ..PolicySnapshot::default()
        }
    }
}

/// Always the same price
pub struct ConstantPricing {
    price: f64,
}

impl ConstantPricing {
    pub fn new(price: f64) -> Self {
        ConstantPricing { price }
    }
}

impl PricingPolicy for ConstantPricing {
    fn name(&self) -> String {
        "constant".to_string()
    }

    fn set_price(&mut self, _hotel: &Hotel, _request: &Request, _context: &PricingContext) -> f64 {
        self.price
    }

    fn snapshot(&self) -> PolicySnapshot {
        PolicySnapshot::fixed(self.name())
    }
}

/// A uniformly random grid price for every request
pub struct RandomPricing {
    grid: PriceGrid,
    rng: StdRng,
}

impl RandomPricing {
    pub fn new(nominal_price: f64, seed: u64) -> Self {
        RandomPricing {
            grid: PriceGrid::new(nominal_price),
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl PricingPolicy for RandomPricing {
    fn name(&self) -> String {
        "random".to_string()
    }

    fn set_price(&mut self, _hotel: &Hotel, _request: &Request, _context: &PricingContext) -> f64 {
        let index = self.rng.random_range(0..self.grid.len());
        self.grid.price(index)
    }

    fn snapshot(&self) -> PolicySnapshot {
        PolicySnapshot::fixed(self.name())
    }
}

/// Round up to the next even number, with zero going up to two
pub fn ceil_to_even(value: usize) -> usize {
    if value == 0 {
        return 2;
    }
    value.div_ceil(2) * 2
}

/// Occupancy percentage of `rooms` with `occupied` taken, bucketed like the table
pub fn load_bucket(occupied: usize, rooms: usize) -> usize {
    if occupied == 0 {
        return 2;
    }
    (occupied * 100).div_ceil(2 * rooms) * 2
}

/// Table-driven baseline: the table's percentile for the arrival day's
/// occupancy and the booking depth moves the price from RackRate towards Netto
pub struct TablePricing {
    grid: PriceGrid,
    table: Arc<PercentileTable>,
}

impl TablePricing {
    pub fn new(nominal_price: f64, table: Arc<PercentileTable>) -> Self {
        TablePricing {
            grid: PriceGrid::new(nominal_price),
            table,
        }
    }
}

impl PricingPolicy for TablePricing {
    fn name(&self) -> String {
        "default".to_string()
    }

    fn set_price(&mut self, hotel: &Hotel, request: &Request, _context: &PricingContext) -> f64 {
        let load = load_bucket(
            hotel.get_loading(request.start_day()),
            hotel.number_of_rooms(),
        );
        let depth = ceil_to_even(request.depth).min(table::MAX_DEPTH_BUCKET);
        let value = self.table.percentile(load, depth) / 100.0;
        let rack_rate = self.grid.rack_rate();
        rack_rate - (rack_rate - self.grid.netto()) * value
    }

    fn snapshot(&self) -> PolicySnapshot {
        PolicySnapshot::fixed(self.name())
    }
}
