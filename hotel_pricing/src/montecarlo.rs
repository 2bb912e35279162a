//! Monte-Carlo comparison of pricing policies
//!
//! Runs `num_runs` independent trajectories of a `Scenario` in parallel.
//! Trajectory `i` uses seed `base_seed + i`, so results do not depend on the
//! thread count. A trajectory that panics is counted as failed and left out
//! of the statistics.

use std::time::Instant;

use des::parallel::{ParallelRunner, simple_progress_reporter};
use serde::Serialize;

use crate::scenario::{Scenario, TrajectoryOutcome};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MeanStd {
    pub mean: f64,
    pub std: f64,
    pub min: f64,
    pub max: f64,
}

/// Population mean and standard deviation, with range; all zero when empty
pub fn compute_mean_std(values: &[f64]) -> MeanStd {
    if values.is_empty() {
        return MeanStd {
            mean: 0.0,
            std: 0.0,
            min: 0.0,
            max: 0.0,
        };
    }

    let mean = values.iter().sum::<f64>() / values.len() as f64;
    let variance = values.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / values.len() as f64;
    let std = variance.sqrt();
    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);

    MeanStd {
        mean,
        std,
        min,
        max,
    }
}

/// Aggregate statistics over the trajectories of one configuration
#[derive(Debug, Clone, Serialize)]
pub struct MonteCarloSummary {
    pub policy: String,
    pub threshold: Option<f64>,
    pub explore_count: Option<usize>,
    pub num_runs: usize,
    pub successful_runs: usize,
    pub failed_runs: usize,
    pub revenue: MeanStd,
    pub vacancy_ratio: MeanStd,
    pub occupancy_ratio: MeanStd,
    pub seconds_per_run: f64,
}

#[derive(Debug, Clone)]
pub struct MonteCarloResult {
    pub outcomes: Vec<TrajectoryOutcome>,
    pub failures: Vec<String>,
    pub summary: MonteCarloSummary,
}

pub struct MonteCarlo<'a> {
    scenario: &'a Scenario,
    num_runs: usize,
    base_seed: u64,
    num_threads: Option<usize>,
    progress_interval: Option<usize>,
}

impl<'a> MonteCarlo<'a> {
    pub fn new(scenario: &'a Scenario, num_runs: usize, base_seed: u64) -> Self {
        MonteCarlo {
            scenario,
            num_runs,
            base_seed,
            num_threads: None,
            progress_interval: None,
        }
    }

    pub fn num_threads(mut self, n: usize) -> Self {
        self.num_threads = Some(n);
        self
    }

    /// Print progress every `interval` completed trajectories
    pub fn progress(mut self, interval: usize) -> Self {
        self.progress_interval = Some(interval);
        self
    }

    fn seed(&self, trajectory_id: usize) -> u64 {
        self.base_seed.wrapping_add(trajectory_id as u64)
    }

    pub fn run(self) -> MonteCarloResult {
        let start = Instant::now();
        let scenario = self.scenario;

        let mut runner = ParallelRunner::new(self.num_runs);
        if let Some(n) = self.num_threads {
            runner = runner.num_threads(n);
        }
        if let Some(interval) = self.progress_interval {
            runner = runner.progress(simple_progress_reporter(interval));
        }
        let results = runner.run(scenario.horizon(), |trajectory_id| {
            scenario.event_loop(self.seed(trajectory_id))
        });

        let mut outcomes = Vec::with_capacity(results.len());
        let mut failures = Vec::new();
        for (trajectory_id, result) in results.into_iter().enumerate() {
            match result {
                Ok(stats) => {
                    let seed = self.seed(trajectory_id);
                    outcomes.push(TrajectoryOutcome::from_stats(seed, stats));
                }
                Err(aborted) => {
                    tracing::warn!(trajectory_id, message = %aborted.message, "trajectory failed");
                    failures.push(aborted.to_string());
                }
            }
        }

        let elapsed = start.elapsed().as_secs_f64();
        let summary = summarize(scenario, &outcomes, failures.len(), elapsed);
        tracing::info!(
            policy = %summary.policy,
            runs = summary.num_runs,
            failed = summary.failed_runs,
            revenue_mean = summary.revenue.mean,
            revenue_std = summary.revenue.std,
            "monte carlo complete"
        );

        MonteCarloResult {
            outcomes,
            failures,
            summary,
        }
    }
}

fn summarize(
    scenario: &Scenario,
    outcomes: &[TrajectoryOutcome],
    failed_runs: usize,
    elapsed_seconds: f64,
) -> MonteCarloSummary {
    let revenues: Vec<f64> = outcomes.iter().map(|o| o.total_revenue).collect();
    let vacancy: Vec<f64> = outcomes.iter().map(|o| o.vacancy_ratio).collect();
    let occupancy: Vec<f64> = outcomes.iter().map(|o| o.occupancy_ratio).collect();
    let num_runs = outcomes.len() + failed_runs;
    let policy = &scenario.config().policy;

    MonteCarloSummary {
        policy: policy.name(),
        threshold: policy.threshold(),
        explore_count: policy.explore_count(),
        num_runs,
        successful_runs: outcomes.len(),
        failed_runs,
        revenue: compute_mean_std(&revenues),
        vacancy_ratio: compute_mean_std(&vacancy),
        occupancy_ratio: compute_mean_std(&occupancy),
        seconds_per_run: if num_runs == 0 {
            0.0
        } else {
            elapsed_seconds / num_runs as f64
        },
    }
}
