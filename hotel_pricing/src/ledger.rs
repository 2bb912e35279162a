//! Revenue ledger agent
//!
//! Listens for `DayClosed` and keeps the running revenue total together with
//! the per-day series.

use des::{Agent, Response};

use crate::{Event, LedgerStats, Stats};

#[derive(Debug, Default)]
pub struct RevenueLedger {
    stats: LedgerStats,
}

impl RevenueLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn total_revenue(&self) -> f64 {
        self.stats.total_revenue
    }
}

impl Agent<Event, Stats> for RevenueLedger {
    fn act(&mut self, _current_day: usize, data: &Event) -> Response<Event, Stats> {
        if let Event::DayClosed(summary) = data {
            self.stats.total_revenue += summary.revenue;
            self.stats.days.push(summary.clone());
        }
        Response::new()
    }

    fn stats(&self) -> Stats {
        Stats::Ledger(self.stats.clone())
    }
}
