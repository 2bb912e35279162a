//! Export of experiment results
//!
//! Per run CSV, per day CSV, a JSON summary with metadata, and a plain-text
//! report block appended to a running log file.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::Path;

use serde::Serialize;

use crate::montecarlo::{MonteCarloResult, MonteCarloSummary};
use crate::scenario::{Scenario, TrajectoryOutcome};

/// Point of a parameter sweep an output belongs to
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SweepPoint {
    pub parameter: String,
    pub value: f64,
}

/// Metadata for reproducibility
#[derive(Debug, Clone, Serialize)]
pub struct ExperimentMetadata {
    pub experiment: String,
    pub description: String,
    pub base_seed: u64,
    pub number_of_days: usize,
    pub number_of_rooms: usize,
    pub nominal_price: f64,
    pub arrival_rate: f64,
    pub rho: f64,
    pub sweep: Option<SweepPoint>,
    pub timestamp: String,
}

/// One row per trajectory
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunRecord {
    pub seed: u64,
    pub total_revenue: f64,
    pub vacancy_ratio: f64,
    pub occupancy_ratio: f64,
    pub requests: usize,
    pub no_vacancy: usize,
    pub offers: usize,
    pub bookings: usize,
    pub cancellations: usize,
}

impl From<&TrajectoryOutcome> for RunRecord {
    fn from(outcome: &TrajectoryOutcome) -> Self {
        RunRecord {
            seed: outcome.seed,
            total_revenue: outcome.total_revenue,
            vacancy_ratio: outcome.vacancy_ratio,
            occupancy_ratio: outcome.occupancy_ratio,
            requests: outcome.requests,
            no_vacancy: outcome.no_vacancy,
            offers: outcome.offers,
            bookings: outcome.bookings,
            cancellations: outcome.cancellations,
        }
    }
}

/// Top-level container for one configuration's results
#[derive(Debug, Clone, Serialize)]
pub struct ExperimentOutput {
    pub metadata: ExperimentMetadata,
    pub summary: MonteCarloSummary,
    pub failures: Vec<String>,
    pub runs: Vec<RunRecord>,
}

impl ExperimentOutput {
    pub fn new(
        experiment: &str,
        description: &str,
        scenario: &Scenario,
        base_seed: u64,
        sweep: Option<SweepPoint>,
        result: &MonteCarloResult,
    ) -> Self {
        let config = scenario.config();
        ExperimentOutput {
            metadata: ExperimentMetadata {
                experiment: experiment.to_string(),
                description: description.to_string(),
                base_seed,
                number_of_days: config.number_of_days,
                number_of_rooms: config.number_of_rooms,
                nominal_price: config.nominal_price,
                arrival_rate: config.arrival_rate,
                rho: config.rho,
                sweep,
                timestamp: chrono::Utc::now().to_rfc3339(),
            },
            summary: result.summary.clone(),
            failures: result.failures.clone(),
            runs: result.outcomes.iter().map(RunRecord::from).collect(),
        }
    }

    /// Write one row per trajectory to CSV
    pub fn write_runs_csv<P: AsRef<Path>>(
        &self,
        path: P,
    ) -> Result<(), Box<dyn std::error::Error>> {
        let mut wtr = csv::Writer::from_path(path)?;
        for run in &self.runs {
            wtr.serialize(run)?;
        }
        wtr.flush()?;
        Ok(())
    }

    pub fn write_summary_json<P: AsRef<Path>>(
        &self,
        path: P,
    ) -> Result<(), Box<dyn std::error::Error>> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }

    /// Plain-text report block, one `key: value` per line
    pub fn text_log_block(&self) -> String {
        let summary = &self.summary;
        let mut block = String::new();
        block.push_str(&format!("{}\n", self.metadata.timestamp));
        block.push_str(&format!("{}\n", summary.policy));
        if let Some(sweep) = &self.metadata.sweep {
            block.push_str(&format!("{}: {}\n", sweep.parameter, sweep.value));
        }
        if let Some(threshold) = summary.threshold {
            block.push_str(&format!("threshold: {threshold}\n"));
        }
        block.push_str(&format!("iter_counts: {}\n", summary.num_runs));
        if let Some(explore_count) = summary.explore_count {
            block.push_str(&format!("explore_count: {explore_count}\n"));
        }
        block.push_str(&format!("failed_runs: {}\n", summary.failed_runs));
        block.push_str(&format!("revenue_mean: {:.0}\n", summary.revenue.mean));
        block.push_str(&format!("revenue_std: {:.0}\n", summary.revenue.std));
        block.push_str(&format!("vacancy_mean: {:.4}\n", summary.vacancy_ratio.mean));
        block.push_str(&format!("vacancy_std: {:.4}\n", summary.vacancy_ratio.std));
        block.push_str(&format!("time per loop, s: {:.2}\n", summary.seconds_per_run));
        block.push_str("\n\n");
        block
    }

    /// Append the report block to `path`, creating the file if needed
    pub fn append_text_log<P: AsRef<Path>>(
        &self,
        path: P,
    ) -> Result<(), Box<dyn std::error::Error>> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut file = OpenOptions::new().create(true).append(true).open(path)?;
        file.write_all(self.text_log_block().as_bytes())?;
        Ok(())
    }

    /// Write all outputs to a directory
    ///
    /// Creates:
    /// - runs.csv
    /// - summary.json
    pub fn write_all<P: AsRef<Path>>(&self, dir: P) -> Result<(), Box<dyn std::error::Error>> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir)?;

        self.write_runs_csv(dir.join("runs.csv"))?;
        self.write_summary_json(dir.join("summary.json"))?;

        Ok(())
    }
}

/// Write the per-day series of one trajectory to CSV
pub fn write_daily_csv<P: AsRef<Path>>(
    outcome: &TrajectoryOutcome,
    path: P,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut wtr = csv::Writer::from_path(path)?;
    for day in &outcome.days {
        wtr.serialize(day)?;
    }
    wtr.flush()?;
    Ok(())
}
