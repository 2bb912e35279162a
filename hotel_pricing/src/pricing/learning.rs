//! What the adaptive policies remember
//!
//! - `AcceptanceHistory`: how often each grid price was offered and taken.
//!   Per-price counts are all the estimator needs, so the raw sequence of
//!   observations is not kept.
//! - `DemandWindow`: requests per booking depth over the last seven days.

use std::collections::VecDeque;

use crate::generator::MAX_DEPTH;

use super::{PriceGrid, PriceStat};

/// Days of request counts the demand forecast looks back over
pub const WINDOW_DAYS: usize = 7;

/// One day's request count per depth bucket
///
/// Depths beyond the last bucket are counted in it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DepthCounts {
    counts: [u32; MAX_DEPTH + 1],
}

impl DepthCounts {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, depth: usize) {
        self.counts[depth.min(MAX_DEPTH)] += 1;
    }

    pub fn get(&self, depth: usize) -> u32 {
        self.counts[depth.min(MAX_DEPTH)]
    }

    pub fn total(&self) -> u32 {
        self.counts.iter().sum()
    }
}

/// Sliding window of daily request counts per depth
#[derive(Debug, Clone, PartialEq)]
pub struct DemandWindow {
    queues: Vec<VecDeque<u32>>,
}

impl Default for DemandWindow {
    fn default() -> Self {
        Self::new()
    }
}

impl DemandWindow {
    /// Every depth starts with a single empty day
    pub fn new() -> Self {
        let queues = (0..=MAX_DEPTH)
            .map(|_| {
                let mut queue = VecDeque::with_capacity(WINDOW_DAYS);
                queue.push_back(0);
                queue
            })
            .collect();
        DemandWindow { queues }
    }

    /// Append a closed day; the oldest day drops out once seven are held
    pub fn push_day(&mut self, counts: &DepthCounts) {
        for (depth, queue) in self.queues.iter_mut().enumerate() {
            if queue.len() == WINDOW_DAYS {
                queue.pop_front();
            }
            queue.push_back(counts.get(depth));
        }
    }

    pub fn days_held(&self, depth: usize) -> usize {
        self.queues[depth.min(MAX_DEPTH)].len()
    }

    /// Requests in the window at `depth` alone
    pub fn total_at(&self, depth: usize) -> u32 {
        self.queues[depth.min(MAX_DEPTH)].iter().sum()
    }

    /// Requests in the window over all depths `0..=depth`
    pub fn orders_up_to(&self, depth: usize) -> u32 {
        self.queues[..=depth.min(MAX_DEPTH)]
            .iter()
            .map(|queue| queue.iter().sum::<u32>())
            .sum()
    }

    pub fn totals(&self) -> Vec<u32> {
        (0..=MAX_DEPTH).map(|depth| self.total_at(depth)).collect()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct Tally {
    trials: u32,
    accepted: u32,
}

/// Empirical acceptance rate and sample size for an offered price
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Estimate {
    pub index: usize,
    pub price: f64,
    pub rate: f64,
    pub trials: u32,
}

/// Offer/acceptance counts per grid price
#[derive(Debug, Clone, PartialEq)]
pub struct AcceptanceHistory {
    grid: PriceGrid,
    tallies: Vec<Tally>,
    observations: usize,
}

impl AcceptanceHistory {
    pub fn new(grid: PriceGrid) -> Self {
        let tallies = vec![Tally::default(); grid.len()];
        AcceptanceHistory {
            grid,
            tallies,
            observations: 0,
        }
    }

    pub fn grid(&self) -> &PriceGrid {
        &self.grid
    }

    /// Every observation counts towards the exploration budget; only grid
    /// prices feed the estimates
    pub fn record(&mut self, price: f64, accepted: bool) {
        self.observations += 1;
        match self.grid.index_of(price) {
            Some(index) => {
                let tally = &mut self.tallies[index];
                tally.trials += 1;
                tally.accepted += u32::from(accepted);
            }
            None => tracing::warn!(price, "observation off the price grid ignored"),
        }
    }

    pub fn observations(&self) -> usize {
        self.observations
    }

    /// Estimates for every price offered at least once, cheapest first
    pub fn estimates(&self) -> impl Iterator<Item = Estimate> + '_ {
        self.tallies
            .iter()
            .enumerate()
            .filter(|(_, tally)| tally.trials > 0)
            .map(|(index, tally)| Estimate {
                index,
                price: self.grid.price(index),
                rate: tally.accepted as f64 / tally.trials as f64,
                trials: tally.trials,
            })
    }

    pub fn price_stats(&self) -> Vec<PriceStat> {
        self.tallies
            .iter()
            .enumerate()
            .filter(|(_, tally)| tally.trials > 0)
            .map(|(index, tally)| PriceStat {
                price: self.grid.price(index),
                trials: tally.trials,
                accepted: tally.accepted,
            })
            .collect()
    }
}
