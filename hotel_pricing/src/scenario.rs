//! Trajectory configuration and assembly
//!
//! `Scenario::new` validates a `TrajectoryConfig` and builds the request
//! distributions once; after that, building and running a trajectory for any
//! seed cannot fail.

use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;

use des::{Agent, EventLoop};
use serde::{Deserialize, Serialize};

use crate::acceptance::{AcceptanceModel, DEFAULT_RHO};
use crate::desk::FrontDesk;
use crate::error::ConfigError;
use crate::generator::{RequestDistributions, RequestGenerator, RequestSource};
use crate::hotel::Hotel;
use crate::ledger::RevenueLedger;
use crate::pricing::{
    ConstantPricing, DEFAULT_EXPLORE_COUNT, ExploreExploit, MAX_EXPLORE_COUNT, PercentileTable,
    PolicySnapshot, PricingPolicy, RandomPricing, TablePricing, Variant,
};
use crate::{DaySummary, Event, Stats};

/// Per-component offsets added to the trajectory seed
pub const GENERATOR_SEED_OFFSET: u64 = 0;
pub const ACCEPTANCE_SEED_OFFSET: u64 = 1000;
pub const POLICY_SEED_OFFSET: u64 = 2000;

/// Which pricing policy a trajectory runs, with its parameters
#[derive(Debug, Clone)]
pub enum PolicySpec {
    /// Percentile-table baseline
    Table(Arc<PercentileTable>),
    Constant {
        price: f64,
    },
    Random,
    ExploreExploit {
        variant: Variant,
        threshold: f64,
        explore_count: usize,
    },
}

impl PolicySpec {
    pub fn name(&self) -> String {
        match self {
            PolicySpec::Table(_) => "default".to_string(),
            PolicySpec::Constant { .. } => "constant".to_string(),
            PolicySpec::Random => "random".to_string(),
            PolicySpec::ExploreExploit { variant, .. } => format!("explore_exploit_{variant}"),
        }
    }

    pub fn threshold(&self) -> Option<f64> {
        match self {
            PolicySpec::ExploreExploit { threshold, .. } => Some(*threshold),
            _ => None,
        }
    }

    pub fn explore_count(&self) -> Option<usize> {
        match self {
            PolicySpec::ExploreExploit { explore_count, .. } => Some(*explore_count),
            _ => None,
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        match self {
            PolicySpec::Constant { price } if !(price.is_finite() && *price > 0.0) => Err(
                ConfigError::invalid("price", format!("must be positive, got {price}")),
            ),
            PolicySpec::ExploreExploit { threshold, .. } if !threshold.is_finite() => Err(
                ConfigError::invalid("threshold", format!("must be finite, got {threshold}")),
            ),
            PolicySpec::ExploreExploit { explore_count, .. }
                if *explore_count > MAX_EXPLORE_COUNT =>
            {
                Err(ConfigError::invalid(
                    "explore_count",
                    format!("must be at most {MAX_EXPLORE_COUNT}, got {explore_count}"),
                ))
            }
            _ => Ok(()),
        }
    }

    pub fn build(&self, nominal_price: f64, seed: u64) -> Box<dyn PricingPolicy> {
        match self {
            PolicySpec::Table(table) => {
                Box::new(TablePricing::new(nominal_price, Arc::clone(table)))
            }
            PolicySpec::Constant { price } => Box::new(ConstantPricing::new(*price)),
            PolicySpec::Random => Box::new(RandomPricing::new(nominal_price, seed)),
            PolicySpec::ExploreExploit {
                variant,
                threshold,
                explore_count,
            } => Box::new(ExploreExploit::new(
                *variant,
                nominal_price,
                *threshold,
                *explore_count,
                seed,
            )),
        }
    }
}

/// Everything one trajectory needs
#[derive(Debug, Clone)]
pub struct TrajectoryConfig {
    pub number_of_days: usize,
    pub number_of_rooms: usize,
    pub nominal_price: f64,
    /// Mean requests per day
    pub arrival_rate: f64,
    /// Price sensitivity of the acceptance model
    pub rho: f64,
    pub policy: PolicySpec,
    pub seed: u64,
}

impl TrajectoryConfig {
    /// One year, 15 rooms, 1000 per person-night, 30 requests a day
    pub fn baseline() -> Self {
        TrajectoryConfig {
            number_of_days: 365,
            number_of_rooms: 15,
            nominal_price: 1000.0,
            arrival_rate: 30.0,
            rho: DEFAULT_RHO,
            policy: PolicySpec::ExploreExploit {
                variant: Variant::V2,
                threshold: 2.0,
                explore_count: DEFAULT_EXPLORE_COUNT,
            },
            seed: 42,
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.number_of_days == 0 {
            return Err(ConfigError::invalid("number_of_days", "must be at least 1"));
        }
        if self.number_of_rooms == 0 {
            return Err(ConfigError::invalid("number_of_rooms", "must be at least 1"));
        }
        if !(self.nominal_price.is_finite() && self.nominal_price > 0.0) {
            return Err(ConfigError::invalid(
                "nominal_price",
                format!("must be positive, got {}", self.nominal_price),
            ));
        }
        if !(self.rho.is_finite() && self.rho >= 0.0) {
            return Err(ConfigError::invalid(
                "rho",
                format!("must be non-negative, got {}", self.rho),
            ));
        }
        self.policy.validate()
    }

    /// Set one swept parameter: `threshold`, `explore_count` or `arrival_rate`
    pub fn apply_sweep_value(&mut self, parameter: &str, value: f64) -> Result<(), ConfigError> {
        match (parameter, &mut self.policy) {
            ("arrival_rate", _) => self.arrival_rate = value,
            ("threshold", PolicySpec::ExploreExploit { threshold, .. }) => *threshold = value,
            ("explore_count", PolicySpec::ExploreExploit { explore_count, .. }) => {
                if !(value.is_finite() && value >= 0.0 && value.fract() == 0.0) {
                    return Err(ConfigError::invalid(
                        "explore_count",
                        format!("must be a whole number, got {value}"),
                    ));
                }
                if value > MAX_EXPLORE_COUNT as f64 {
                    return Err(ConfigError::invalid(
                        "explore_count",
                        format!("must be at most {MAX_EXPLORE_COUNT}, got {value}"),
                    ));
                }
                *explore_count = value as usize;
            }
            ("threshold", _) => {
                return Err(ConfigError::invalid(
                    "threshold",
                    "applies to explore_exploit policies only",
                ));
            }
            ("explore_count", _) => {
                return Err(ConfigError::invalid(
                    "explore_count",
                    "applies to explore_exploit policies only",
                ));
            }
            _ => return Err(ConfigError::UnknownSweepParameter(parameter.to_string())),
        }
        Ok(())
    }
}

/// `[model]` overrides on top of the baseline
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ModelSettings {
    pub number_of_days: Option<usize>,
    pub number_of_rooms: Option<usize>,
    pub nominal_price: Option<f64>,
    pub arrival_rate: Option<f64>,
    pub rho: Option<f64>,
}

impl ModelSettings {
    pub fn apply(&self, config: &mut TrajectoryConfig) {
        if let Some(days) = self.number_of_days {
            config.number_of_days = days;
        }
        if let Some(rooms) = self.number_of_rooms {
            config.number_of_rooms = rooms;
        }
        if let Some(price) = self.nominal_price {
            config.nominal_price = price;
        }
        if let Some(rate) = self.arrival_rate {
            config.arrival_rate = rate;
        }
        if let Some(rho) = self.rho {
            config.rho = rho;
        }
    }
}

/// `[policy]` section as written in an experiment file
#[derive(Debug, Clone, Deserialize)]
pub struct PolicySettings {
    pub kind: String,
    pub price: Option<f64>,
    pub variant: Option<String>,
    pub threshold: Option<f64>,
    pub explore_count: Option<usize>,
    pub table_path: Option<PathBuf>,
}

impl PolicySettings {
    /// Take a missing base threshold from the first value of a sweep over it
    pub fn fill_from_sweep(&mut self, parameter: &str, values: &[f64]) {
        if parameter == "threshold" && self.threshold.is_none() {
            self.threshold = values.first().copied();
        }
    }

    /// Resolve the policy, loading the percentile table if one is needed
    pub fn to_spec(&self) -> Result<PolicySpec, ConfigError> {
        match self.kind.to_ascii_lowercase().as_str() {
            "default" | "table" => {
                let path = self.table_path.as_ref().ok_or(ConfigError::MissingParameter {
                    policy: "default",
                    parameter: "table_path",
                })?;
                let table = PercentileTable::from_csv_path(path)?;
                Ok(PolicySpec::Table(Arc::new(table)))
            }
            "constant" => {
                let price = self.price.ok_or(ConfigError::MissingParameter {
                    policy: "constant",
                    parameter: "price",
                })?;
                Ok(PolicySpec::Constant { price })
            }
            "random" => Ok(PolicySpec::Random),
            "explore_exploit" => {
                let variant = self.variant.as_deref().ok_or(ConfigError::MissingParameter {
                    policy: "explore_exploit",
                    parameter: "variant",
                })?;
                self.explore_exploit(Variant::from_str(variant)?)
            }
            kind if kind.starts_with("pricingsomemethod") => {
                self.explore_exploit(Variant::from_str(kind)?)
            }
            _ => Err(ConfigError::UnknownPolicy(self.kind.clone())),
        }
    }

    fn explore_exploit(&self, variant: Variant) -> Result<PolicySpec, ConfigError> {
        let threshold = self.threshold.ok_or(ConfigError::MissingParameter {
            policy: "explore_exploit",
            parameter: "threshold",
        })?;
        Ok(PolicySpec::ExploreExploit {
            variant,
            threshold,
            explore_count: self.explore_count.unwrap_or(DEFAULT_EXPLORE_COUNT),
        })
    }
}

/// Result of one trajectory
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrajectoryOutcome {
    pub seed: u64,
    pub total_revenue: f64,
    pub vacancy_ratio: f64,
    pub occupancy_ratio: f64,
    pub requests: usize,
    pub no_vacancy: usize,
    pub offers: usize,
    pub bookings: usize,
    pub cancellations: usize,
    pub policy: PolicySnapshot,
    pub days: Vec<DaySummary>,
}

impl TrajectoryOutcome {
    /// Collect the outcome from the agents' final stats
    ///
    /// # Panics
    ///
    /// If the stats lack the desk or the ledger, which `Scenario` always adds.
    pub fn from_stats(seed: u64, all_stats: Vec<Stats>) -> Self {
        let mut desk = None;
        let mut ledger = None;
        for stats in all_stats {
            match stats {
                Stats::Desk(s) => desk = Some(s),
                Stats::Ledger(s) => ledger = Some(s),
            }
        }
        let desk = desk.expect("trajectory has no front desk");
        let ledger = ledger.expect("trajectory has no revenue ledger");

        TrajectoryOutcome {
            seed,
            total_revenue: ledger.total_revenue,
            vacancy_ratio: desk.vacancy_ratio,
            occupancy_ratio: desk.occupancy_ratio,
            requests: desk.requests,
            no_vacancy: desk.no_vacancy,
            offers: desk.offers,
            bookings: desk.bookings,
            cancellations: desk.cancellations,
            policy: desk.policy,
            days: ledger.days,
        }
    }
}

/// A validated configuration, ready to run for any seed
#[derive(Debug, Clone)]
pub struct Scenario {
    config: TrajectoryConfig,
    distributions: RequestDistributions,
}

impl Scenario {
    pub fn new(config: TrajectoryConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let distributions = RequestDistributions::new(config.arrival_rate)?;
        Ok(Scenario {
            config,
            distributions,
        })
    }

    pub fn config(&self) -> &TrajectoryConfig {
        &self.config
    }

    /// Last day on the calendar
    pub fn horizon(&self) -> usize {
        self.config.number_of_days - 1
    }

    /// A fresh trajectory drawing its requests from the configured distributions
    pub fn event_loop(&self, seed: u64) -> EventLoop<Event, Stats> {
        let generator = RequestGenerator::new(
            self.distributions.clone(),
            seed.wrapping_add(GENERATOR_SEED_OFFSET),
        );
        self.event_loop_with_source(seed, Box::new(generator))
    }

    /// A fresh trajectory fed by `requests` instead of the generator
    pub fn event_loop_with_source(
        &self,
        seed: u64,
        requests: Box<dyn RequestSource>,
    ) -> EventLoop<Event, Stats> {
        let config = &self.config;
        let desk = FrontDesk::new(
            Hotel::new(config.number_of_rooms, config.number_of_days),
            requests,
            AcceptanceModel::new(
                config.nominal_price,
                config.rho,
                seed.wrapping_add(ACCEPTANCE_SEED_OFFSET),
            ),
            config
                .policy
                .build(config.nominal_price, seed.wrapping_add(POLICY_SEED_OFFSET)),
        );

        let agents: Vec<Box<dyn Agent<Event, Stats>>> =
            vec![Box::new(desk), Box::new(RevenueLedger::new())];
        let events = (0..config.number_of_days)
            .map(|day| (day, Event::DayStart { day }))
            .collect();
        EventLoop::new(events, agents)
    }

    pub fn run(&self, seed: u64) -> TrajectoryOutcome {
        let mut event_loop = self.event_loop(seed);
        event_loop.run(self.horizon());
        let outcome = TrajectoryOutcome::from_stats(seed, event_loop.stats());
        tracing::info!(
            seed,
            policy = %self.config.policy.name(),
            revenue = outcome.total_revenue,
            vacancy = outcome.vacancy_ratio,
            "trajectory complete"
        );
        outcome
    }
}

/// Validate `config` and run one trajectory with its seed
pub fn run_trajectory(config: TrajectoryConfig) -> Result<TrajectoryOutcome, ConfigError> {
    let seed = config.seed;
    Ok(Scenario::new(config)?.run(seed))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small(policy: PolicySpec) -> TrajectoryConfig {
        TrajectoryConfig {
            number_of_days: 40,
            number_of_rooms: 5,
            arrival_rate: 6.0,
            policy,
            ..TrajectoryConfig::baseline()
        }
    }

    fn settings(kind: &str) -> PolicySettings {
        PolicySettings {
            kind: kind.to_string(),
            price: None,
            variant: None,
            threshold: None,
            explore_count: None,
            table_path: None,
        }
    }

    #[test]
    fn baseline_is_valid() {
        assert!(TrajectoryConfig::baseline().validate().is_ok());
    }

    #[test]
    fn bad_parameters_are_rejected_before_running() {
        let mut config = TrajectoryConfig::baseline();
        config.number_of_rooms = 0;
        assert!(matches!(
            run_trajectory(config),
            Err(ConfigError::InvalidParameter { name: "number_of_rooms", .. })
        ));

        let mut config = TrajectoryConfig::baseline();
        config.arrival_rate = -1.0;
        assert!(Scenario::new(config).is_err());

        let config = small(PolicySpec::Constant { price: f64::NAN });
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidParameter { name: "price", .. })
        ));
    }

    #[test]
    fn policy_settings_resolve_names() {
        let mut constant = settings("constant");
        assert!(matches!(
            constant.to_spec(),
            Err(ConfigError::MissingParameter { parameter: "price", .. })
        ));
        constant.price = Some(900.0);
        assert!(matches!(constant.to_spec(), Ok(PolicySpec::Constant { price }) if price == 900.0));

        assert!(matches!(settings("random").to_spec(), Ok(PolicySpec::Random)));
        assert!(matches!(
            settings("fancy").to_spec(),
            Err(ConfigError::UnknownPolicy(_))
        ));
        assert!(matches!(
            settings("default").to_spec(),
            Err(ConfigError::MissingParameter { parameter: "table_path", .. })
        ));

        let mut alias = settings("PricingSomeMethodv3");
        alias.threshold = Some(1.4);
        let spec = alias.to_spec().unwrap();
        assert_eq!(spec.name(), "explore_exploit_v3");
        assert_eq!(spec.threshold(), Some(1.4));
        assert_eq!(spec.explore_count(), Some(DEFAULT_EXPLORE_COUNT));

        let mut explicit = settings("explore_exploit");
        explicit.threshold = Some(2.0);
        assert!(matches!(
            explicit.to_spec(),
            Err(ConfigError::MissingParameter { parameter: "variant", .. })
        ));
        explicit.variant = Some("v9".to_string());
        assert!(matches!(explicit.to_spec(), Err(ConfigError::UnknownVariant(_))));
    }

    #[test]
    fn oversized_exploration_budget_is_rejected() {
        let config = small(PolicySpec::ExploreExploit {
            variant: Variant::V2,
            threshold: 1.0,
            explore_count: usize::MAX,
        });
        assert!(matches!(
            Scenario::new(config),
            Err(ConfigError::InvalidParameter { name: "explore_count", .. })
        ));
    }

    #[test]
    fn sweep_values_are_checked_before_they_are_applied() {
        let mut config = TrajectoryConfig::baseline();

        config.apply_sweep_value("explore_count", 250.0).unwrap();
        assert_eq!(config.policy.explore_count(), Some(250));
        config.apply_sweep_value("threshold", 3.4).unwrap();
        assert_eq!(config.policy.threshold(), Some(3.4));
        config.apply_sweep_value("arrival_rate", 12.0).unwrap();
        assert_eq!(config.arrival_rate, 12.0);

        for bad in [1e20, f64::INFINITY, f64::NAN, -1.0, 2.5] {
            assert!(
                matches!(
                    config.apply_sweep_value("explore_count", bad),
                    Err(ConfigError::InvalidParameter { name: "explore_count", .. })
                ),
                "{bad}"
            );
        }
        assert_eq!(config.policy.explore_count(), Some(250));

        assert!(matches!(
            config.apply_sweep_value("rooms", 3.0),
            Err(ConfigError::UnknownSweepParameter(_))
        ));

        let mut constant = small(PolicySpec::Constant { price: 900.0 });
        assert!(matches!(
            constant.apply_sweep_value("threshold", 2.0),
            Err(ConfigError::InvalidParameter { name: "threshold", .. })
        ));
    }

    #[test]
    fn threshold_sweep_supplies_a_missing_base_threshold() {
        let mut swept = settings("explore_exploit");
        swept.variant = Some("v2".to_string());
        assert!(matches!(
            swept.to_spec(),
            Err(ConfigError::MissingParameter { parameter: "threshold", .. })
        ));

        swept.fill_from_sweep("arrival_rate", &[10.0]);
        assert!(swept.to_spec().is_err());

        swept.fill_from_sweep("threshold", &[1.0, 1.2]);
        assert_eq!(swept.to_spec().unwrap().threshold(), Some(1.0));

        let mut fixed = settings("pricingsomemethodv2");
        fixed.threshold = Some(2.5);
        fixed.fill_from_sweep("threshold", &[1.0]);
        assert_eq!(fixed.threshold, Some(2.5));
    }

    #[test]
    fn model_settings_override_only_what_is_given() {
        let mut config = TrajectoryConfig::baseline();
        ModelSettings {
            number_of_rooms: Some(20),
            arrival_rate: Some(12.5),
            ..ModelSettings::default()
        }
        .apply(&mut config);
        assert_eq!(config.number_of_rooms, 20);
        assert_eq!(config.arrival_rate, 12.5);
        assert_eq!(config.number_of_days, 365);
    }

    #[test]
    fn every_day_is_closed_once() {
        let outcome = run_trajectory(small(PolicySpec::Random)).unwrap();
        assert_eq!(outcome.days.len(), 40);
        for (i, day) in outcome.days.iter().enumerate() {
            assert_eq!(day.day, i);
        }
        let total: f64 = outcome.days.iter().map(|d| d.revenue).sum();
        assert_eq!(outcome.total_revenue, total);
        assert_eq!(outcome.requests, outcome.days.iter().map(|d| d.requests).sum::<usize>());
    }

    #[test]
    fn same_seed_same_trajectory() {
        let spec = PolicySpec::ExploreExploit {
            variant: Variant::V4,
            threshold: 1.0,
            explore_count: 20,
        };
        let scenario = Scenario::new(small(spec)).unwrap();
        assert_eq!(scenario.run(9), scenario.run(9));
        assert_ne!(scenario.run(9).days, scenario.run(10).days);
    }
}
