//! Percentile table for the baseline policy
//!
//! Keys are even occupancy percentages 0..=100 and even booking depths
//! 0..=30; values are percentiles 0..=100. The table is supplied from outside
//! (a CSV with `load,depth,percentile` columns) and checked for coverage when
//! it is loaded, so a lookup during a trajectory cannot miss.

use std::io::Read;
use std::path::Path;

use serde::Deserialize;

use crate::error::ConfigError;

pub const MAX_LOAD_BUCKET: usize = 100;
pub const MAX_DEPTH_BUCKET: usize = 30;

const LOAD_SLOTS: usize = MAX_LOAD_BUCKET / 2 + 1;
const DEPTH_SLOTS: usize = MAX_DEPTH_BUCKET / 2 + 1;

#[derive(Debug, Deserialize)]
struct Row {
    load: u32,
    depth: u32,
    percentile: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PercentileTable {
    values: Vec<Option<f64>>,
}

impl PercentileTable {
    fn empty() -> Self {
        PercentileTable {
            values: vec![None; LOAD_SLOTS * DEPTH_SLOTS],
        }
    }

    fn slot(load: usize, depth: usize) -> usize {
        (load / 2) * DEPTH_SLOTS + depth / 2
    }

    fn insert(&mut self, load: u32, depth: u32, value: f64) -> Result<(), ConfigError> {
        let on_grid = load % 2 == 0 && depth % 2 == 0;
        if !on_grid || load as usize > MAX_LOAD_BUCKET || depth as usize > MAX_DEPTH_BUCKET {
            return Err(ConfigError::invalid(
                "percentile table",
                format!("key ({load}, {depth}) is not an even load 0..=100 and even depth 0..=30"),
            ));
        }
        if !(0.0..=100.0).contains(&value) {
            return Err(ConfigError::TableValue { load, depth, value });
        }
        self.values[Self::slot(load as usize, depth as usize)] = Some(value);
        Ok(())
    }

    /// Every key the baseline policy can look up must be present
    fn validate(self) -> Result<Self, ConfigError> {
        for load in (2..=MAX_LOAD_BUCKET).step_by(2) {
            for depth in (2..=MAX_DEPTH_BUCKET).step_by(2) {
                if self.values[Self::slot(load, depth)].is_none() {
                    return Err(ConfigError::TableGap {
                        load: load as u32,
                        depth: depth as u32,
                    });
                }
            }
        }
        Ok(self)
    }

    /// Build a table from a function of `(load, depth)` over all even keys
    pub fn from_fn<F>(f: F) -> Result<Self, ConfigError>
    where
        F: Fn(u32, u32) -> f64,
    {
        let mut table = Self::empty();
        for load in (0..=MAX_LOAD_BUCKET as u32).step_by(2) {
            for depth in (0..=MAX_DEPTH_BUCKET as u32).step_by(2) {
                table.insert(load, depth, f(load, depth))?;
            }
        }
        table.validate()
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self, ConfigError> {
        let mut table = Self::empty();
        let mut csv_reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
        for row in csv_reader.deserialize() {
            let row: Row = row?;
            table.insert(row.load, row.depth, row.percentile)?;
        }
        table.validate()
    }

    pub fn from_csv_path<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let file = std::fs::File::open(path)?;
        Self::from_reader(file)
    }

    /// Percentile for a bucketed key
    ///
    /// # Panics
    ///
    /// On a key outside the validated domain.
    pub fn percentile(&self, load: usize, depth: usize) -> f64 {
        assert!(
            load <= MAX_LOAD_BUCKET && depth <= MAX_DEPTH_BUCKET,
            "table key ({load}, {depth}) out of range"
        );
        self.values[Self::slot(load, depth)]
            .unwrap_or_else(|| panic!("table key ({load}, {depth}) missing"))
    }
}
