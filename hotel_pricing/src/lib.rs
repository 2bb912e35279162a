//! Hotel dynamic-pricing simulator
//!
//! A single hotel sells rooms day by day to a stream of stochastic booking
//! requests. Each request is priced by a pluggable policy, and the guest accepts or
//! walks away with a price-sensitive probability. Bookings may cancel before
//! arrival, and revenue for a whole stay is realised on its arrival day.
//!
//! Key agents:
//! - FrontDesk: owns the hotel, the request source, the acceptance model and
//!   the pricing policy; works through one day's batch per `DayStart`
//! - RevenueLedger: collects every closed day into revenue totals and series
//!
//! Many independent trajectories are run in parallel by `montecarlo` to
//! compare policies on mean and spread of revenue and vacancy.

pub mod acceptance;
pub mod desk;
pub mod error;
pub mod generator;
pub mod hotel;
pub mod ledger;
pub mod montecarlo;
pub mod normal;
pub mod output;
pub mod pricing;
pub mod request;
pub mod scenario;

use serde::Serialize;

use pricing::PolicySnapshot;

pub use error::ConfigError;
pub use scenario::{PolicySpec, Scenario, TrajectoryConfig, TrajectoryOutcome, run_trajectory};

/// All events in a trajectory
#[derive(Debug, Clone)]
pub enum Event {
    /// Open the books for `day`; the front desk handles that day's requests
    DayStart { day: usize },

    /// The front desk has finished a day
    DayClosed(DaySummary),
}

/// Everything that happened on one simulated day
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DaySummary {
    pub day: usize,
    pub requests: usize,
    /// Requests with no room free for the whole stay; never priced
    pub no_vacancy: usize,
    pub rejected: usize,
    pub bookings: usize,
    pub cancellations: usize,
    /// Rooms occupied on this day once its cancellations are reversed
    pub occupied: usize,
    /// Revenue of stays arriving today
    pub revenue: f64,
}

impl DaySummary {
    pub fn new(day: usize) -> Self {
        DaySummary {
            day,
            ..DaySummary::default()
        }
    }

    pub fn offers(&self) -> usize {
        self.bookings + self.rejected
    }
}

/// Observable state of the front desk at the end of a trajectory
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeskStats {
    pub number_of_rooms: usize,
    pub number_of_days: usize,
    pub days_open: usize,
    pub requests: usize,
    pub no_vacancy: usize,
    pub offers: usize,
    pub bookings: usize,
    pub cancellations: usize,
    pub vacancy_ratio: f64,
    pub occupancy_ratio: f64,
    pub policy: PolicySnapshot,
}

/// Revenue as collected from closed days
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LedgerStats {
    pub total_revenue: f64,
    pub days: Vec<DaySummary>,
}

impl LedgerStats {
    pub fn revenue_series(&self) -> Vec<f64> {
        self.days.iter().map(|d| d.revenue).collect()
    }
}

/// Unified stats enum for all agents
#[derive(Debug, Clone)]
pub enum Stats {
    Desk(DeskStats),
    Ledger(LedgerStats),
}

/// Install the `tracing` subscriber used by the binaries
///
/// `RUST_LOG` overrides the default of `hotel_pricing=info`.
pub fn init_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("hotel_pricing=info")),
        )
        .with_writer(std::io::stderr)
        .init();
}
