//! Batch Experiment Runner
//!
//! Executes Monte-Carlo runs of one pricing policy based on a TOML
//! configuration file, optionally sweeping a parameter.
//!
//! Usage:
//!   cargo run --release --bin run_experiment -- experiments/threshold_sweep_v2.toml

use hotel_pricing::montecarlo::{MonteCarlo, MonteCarloResult, MonteCarloSummary};
use hotel_pricing::output::{ExperimentOutput, SweepPoint, write_daily_csv};
use hotel_pricing::scenario::{ModelSettings, PolicySettings};
use hotel_pricing::{Scenario, TrajectoryConfig, init_logging};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

/// Top-level experiment configuration
#[derive(Debug, Clone, Deserialize)]
struct ExperimentConfig {
    experiment: ExperimentMetadata,
    #[serde(default)]
    model: ModelSettings,
    policy: PolicySettings,
    #[serde(default)]
    output: OutputSettings,
    sweep: Option<SweepConfig>,
}

#[derive(Debug, Clone, Deserialize)]
struct ExperimentMetadata {
    name: String,
    #[serde(default)]
    description: String,
    num_runs: usize,
    base_seed: u64,
    threads: Option<usize>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
struct OutputSettings {
    directory: PathBuf,
    save_runs: bool,
    save_summary: bool,
    /// Per-day series of the first trajectory
    save_daily: bool,
    log_file: Option<PathBuf>,
    progress_interval: Option<usize>,
}

impl Default for OutputSettings {
    fn default() -> Self {
        OutputSettings {
            directory: PathBuf::from("results"),
            save_runs: true,
            save_summary: true,
            save_daily: false,
            log_file: None,
            progress_interval: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
struct SweepConfig {
    parameter: String,
    values: Vec<f64>,
}

#[derive(Debug, Clone, Serialize)]
struct SweepRecord {
    parameter: String,
    value: f64,
    summary: MonteCarloSummary,
}

fn main() {
    init_logging();

    let args: Vec<String> = env::args().collect();
    if args.len() != 2 {
        eprintln!("Usage: {} <experiment_config.toml>", args[0]);
        eprintln!("Example: {} experiments/threshold_sweep_v2.toml", args[0]);
        std::process::exit(1);
    }

    let config_path = &args[1];
    println!("=== Hotel Pricing Experiment Runner ===\n");
    println!("Loading experiment config: {}\n", config_path);

    let config_str = fs::read_to_string(config_path).unwrap_or_else(|e| {
        eprintln!("Error reading config file: {}", e);
        std::process::exit(1);
    });

    let exp_config: ExperimentConfig = toml::from_str(&config_str).unwrap_or_else(|e| {
        eprintln!("Error parsing TOML config: {}", e);
        std::process::exit(1);
    });

    let mut policy_settings = exp_config.policy.clone();
    if let Some(sweep) = &exp_config.sweep {
        policy_settings.fill_from_sweep(&sweep.parameter, &sweep.values);
    }
    let policy = policy_settings.to_spec().unwrap_or_else(|e| {
        eprintln!("Error in [policy]: {}", e);
        std::process::exit(1);
    });

    let mut base_config = TrajectoryConfig {
        policy,
        seed: exp_config.experiment.base_seed,
        ..TrajectoryConfig::baseline()
    };
    exp_config.model.apply(&mut base_config);

    println!("Experiment: {}", exp_config.experiment.name);
    println!("Description: {}", exp_config.experiment.description);
    println!("Policy: {}", base_config.policy.name());
    println!(
        "Configuration: {} runs × {} days, {} rooms\n",
        exp_config.experiment.num_runs, base_config.number_of_days, base_config.number_of_rooms
    );

    let output_base = exp_config.output.directory.join(&exp_config.experiment.name);
    fs::create_dir_all(&output_base).unwrap_or_else(|e| {
        eprintln!("Error creating output directory: {}", e);
        std::process::exit(1);
    });

    if let Some(sweep) = &exp_config.sweep {
        run_parameter_sweep(&exp_config, &base_config, sweep, &output_base);
    } else {
        run_simple_experiment(&exp_config, base_config, &output_base);
    }
}

fn scenario_or_exit(config: TrajectoryConfig) -> Scenario {
    Scenario::new(config).unwrap_or_else(|e| {
        eprintln!("Error in configuration: {}", e);
        std::process::exit(1);
    })
}

fn run_monte_carlo(exp_config: &ExperimentConfig, scenario: &Scenario) -> MonteCarloResult {
    let mut monte_carlo = MonteCarlo::new(
        scenario,
        exp_config.experiment.num_runs,
        exp_config.experiment.base_seed,
    );
    if let Some(n) = exp_config.experiment.threads {
        monte_carlo = monte_carlo.num_threads(n);
    }
    if let Some(interval) = exp_config.output.progress_interval {
        monte_carlo = monte_carlo.progress(interval);
    }
    monte_carlo.run()
}

/// Run simple experiment (no parameter sweep)
fn run_simple_experiment(
    exp_config: &ExperimentConfig,
    config: TrajectoryConfig,
    output_dir: &Path,
) {
    let start_time = Instant::now();
    let scenario = scenario_or_exit(config);

    println!(
        "Running {} Monte Carlo simulations...\n",
        exp_config.experiment.num_runs
    );
    let result = run_monte_carlo(exp_config, &scenario);
    let output = ExperimentOutput::new(
        &exp_config.experiment.name,
        &exp_config.experiment.description,
        &scenario,
        exp_config.experiment.base_seed,
        None,
        &result,
    );
    save_output(exp_config, &output, &result, output_dir);

    print_summary(&result.summary);
    println!(
        "\n✓ Experiment complete in {:.1}s",
        start_time.elapsed().as_secs_f64()
    );
    println!("Results saved to: {}", output_dir.display());
}

/// Run parameter sweep experiment
///
/// Every sweep point reuses the same seeds, so points differ only by the
/// swept parameter.
fn run_parameter_sweep(
    exp_config: &ExperimentConfig,
    base_config: &TrajectoryConfig,
    sweep: &SweepConfig,
    output_dir: &Path,
) {
    let start_time = Instant::now();
    let total = sweep.values.len() * exp_config.experiment.num_runs;

    println!("Parameter sweep: {} ∈ {:?}", sweep.parameter, sweep.values);
    println!(
        "Total simulations: {} parameter values × {} runs = {}\n",
        sweep.values.len(),
        exp_config.experiment.num_runs,
        total
    );

    let mut records = Vec::with_capacity(sweep.values.len());
    for (param_idx, &param_value) in sweep.values.iter().enumerate() {
        println!(
            "--- {}={:.3} ({}/{}) ---",
            sweep.parameter,
            param_value,
            param_idx + 1,
            sweep.values.len()
        );

        let mut config = base_config.clone();
        config.apply_sweep_value(&sweep.parameter, param_value).unwrap_or_else(|e| {
            eprintln!("Error in [sweep]: {}", e);
            std::process::exit(1);
        });
        let scenario = scenario_or_exit(config);
        let result = run_monte_carlo(exp_config, &scenario);

        let point = SweepPoint {
            parameter: sweep.parameter.clone(),
            value: param_value,
        };
        let output = ExperimentOutput::new(
            &exp_config.experiment.name,
            &exp_config.experiment.description,
            &scenario,
            exp_config.experiment.base_seed,
            Some(point),
            &result,
        );
        let param_dir = output_dir.join(format!("{}_{:.3}", sweep.parameter, param_value));
        save_output(exp_config, &output, &result, &param_dir);

        println!(
            "  → revenue {:.0} ± {:.0}, vacancy {:.4}\n",
            result.summary.revenue.mean,
            result.summary.revenue.std,
            result.summary.vacancy_ratio.mean
        );
        records.push(SweepRecord {
            parameter: sweep.parameter.clone(),
            value: param_value,
            summary: result.summary,
        });
    }

    let sweep_json = serde_json::to_string_pretty(&records).unwrap_or_else(|e| {
        eprintln!("Error serializing sweep summary: {}", e);
        std::process::exit(1);
    });
    if let Err(e) = fs::write(output_dir.join("sweep_summary.json"), sweep_json) {
        eprintln!("Error writing sweep summary: {}", e);
    }

    let total_elapsed = start_time.elapsed();
    println!(
        "✓ Parameter sweep complete in {:.1}s ({:.3}s per run)",
        total_elapsed.as_secs_f64(),
        total_elapsed.as_secs_f64() / total.max(1) as f64
    );
    println!("Results saved to: {}", output_dir.display());
}

fn save_output(
    exp_config: &ExperimentConfig,
    output: &ExperimentOutput,
    result: &MonteCarloResult,
    dir: &Path,
) {
    let settings = &exp_config.output;
    if let Err(e) = fs::create_dir_all(dir) {
        eprintln!("Error creating {}: {}", dir.display(), e);
        return;
    }

    if settings.save_runs {
        if let Err(e) = output.write_runs_csv(dir.join("runs.csv")) {
            eprintln!("Error writing runs.csv: {}", e);
        }
    }
    if settings.save_summary {
        if let Err(e) = output.write_summary_json(dir.join("summary.json")) {
            eprintln!("Error writing summary.json: {}", e);
        }
    }
    if settings.save_daily {
        if let Some(first) = result.outcomes.first() {
            if let Err(e) = write_daily_csv(first, dir.join(format!("daily_{}.csv", first.seed))) {
                eprintln!("Error writing daily series: {}", e);
            }
        }
    }
    if let Some(log_file) = &settings.log_file {
        if let Err(e) = output.append_text_log(log_file) {
            eprintln!("Error appending to {}: {}", log_file.display(), e);
        }
    }
}

fn print_summary(summary: &MonteCarloSummary) {
    println!("=== Summary: {} ===\n", summary.policy);
    if let Some(threshold) = summary.threshold {
        println!("Threshold: {}", threshold);
    }
    if let Some(explore_count) = summary.explore_count {
        println!("Explore count: {}", explore_count);
    }
    println!(
        "Runs: {} ({} failed)",
        summary.num_runs, summary.failed_runs
    );
    println!(
        "Revenue: {:.0} ± {:.0} (min {:.0}, max {:.0})",
        summary.revenue.mean, summary.revenue.std, summary.revenue.min, summary.revenue.max
    );
    println!(
        "Vacancy: {:.4} ± {:.4}",
        summary.vacancy_ratio.mean, summary.vacancy_ratio.std
    );
    println!("Time per run: {:.3}s", summary.seconds_per_run);
}
