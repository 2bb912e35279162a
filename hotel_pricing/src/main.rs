//! Hotel Dynamic Pricing - Demonstration Run
//!
//! One year of the baseline hotel under each pricing policy with the same
//! seed, followed by a short Monte-Carlo comparison of the adaptive variants.

use hotel_pricing::montecarlo::MonteCarlo;
use hotel_pricing::pricing::{DEFAULT_EXPLORE_COUNT, Variant};
use hotel_pricing::{PolicySpec, Scenario, TrajectoryConfig, init_logging};

fn main() {
    init_logging();

    println!("=== Hotel Dynamic Pricing Simulator ===\n");

    let baseline = TrajectoryConfig::baseline();
    println!("Configuration:");
    println!("  Rooms: {}", baseline.number_of_rooms);
    println!("  Days: {}", baseline.number_of_days);
    println!("  Nominal price: {}", baseline.nominal_price);
    println!("  Requests per day (μ): {}", baseline.arrival_rate);
    println!("  Price sensitivity (ρ): {}", baseline.rho);
    println!("  Seed: {}\n", baseline.seed);

    let mut policies = vec![
        PolicySpec::Constant {
            price: baseline.nominal_price,
        },
        PolicySpec::Random,
    ];
    for variant in Variant::ALL {
        policies.push(PolicySpec::ExploreExploit {
            variant,
            threshold: 2.0,
            explore_count: DEFAULT_EXPLORE_COUNT,
        });
    }

    println!("=== Single trajectory ===\n");
    println!(
        "{:<20} {:>12} {:>9} {:>9} {:>9} {:>9}",
        "policy", "revenue", "vacancy", "requests", "bookings", "cancels"
    );
    let mut scenarios = Vec::new();
    for policy in policies {
        let config = TrajectoryConfig {
            policy,
            ..baseline.clone()
        };
        let scenario = match Scenario::new(config) {
            Ok(scenario) => scenario,
            Err(e) => {
                eprintln!("Error: {e}");
                std::process::exit(1);
            }
        };
        let outcome = scenario.run(baseline.seed);
        println!(
            "{:<20} {:>12.0} {:>9.4} {:>9} {:>9} {:>9}",
            scenario.config().policy.name(),
            outcome.total_revenue,
            outcome.vacancy_ratio,
            outcome.requests,
            outcome.bookings,
            outcome.cancellations
        );
        scenarios.push(scenario);
    }

    let num_runs = 20;
    println!("\n=== Monte Carlo ({num_runs} runs each) ===\n");
    println!(
        "{:<20} {:>12} {:>10} {:>9} {:>9}",
        "policy", "revenue μ", "revenue σ", "vacancy μ", "s/run"
    );
    for scenario in &scenarios {
        let result = MonteCarlo::new(scenario, num_runs, baseline.seed).run();
        let summary = &result.summary;
        println!(
            "{:<20} {:>12.0} {:>10.0} {:>9.4} {:>9.3}",
            summary.policy,
            summary.revenue.mean,
            summary.revenue.std,
            summary.vacancy_ratio.mean,
            summary.seconds_per_run
        );
        if summary.failed_runs > 0 {
            println!("  ⚠ {} trajectories failed", summary.failed_runs);
        }
    }

    println!("\nSimulation complete!");
}
