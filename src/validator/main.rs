//! Standalone validator for reviewer pool files.
//!
//! Checks a pools JSON file for structural problems and can simulate a
//! run of fair picks to show how selections spread across reviewers.

use std::process::ExitCode;

use clap::Parser;
use serde::Serialize;

use entropick::config::PoolsConfig;
use entropick::pool::{FairnessStats, PoolRegistry, Selector};

/// Reviewer pools validator.
#[derive(Parser, Debug)]
#[command(name = "validate_pools")]
#[command(about = "Validates reviewer pool files for the EntroPick Slack bot")]
#[command(version)]
struct Args {
    /// Path to the JSON pools file to validate.
    #[arg(short, long, default_value = "pools.json")]
    file: String,

    /// Generate an example pools file at the specified path.
    #[arg(long)]
    generate_example: Option<String>,

    /// Show every reviewer in each pool.
    #[arg(short, long)]
    verbose: bool,

    /// Simulate this many single picks per pool and print fairness stats.
    #[arg(long)]
    simulate: Option<u32>,

    /// RNG seed for the simulation.
    #[arg(long)]
    seed: Option<u64>,

    /// Print the simulation report as JSON.
    #[arg(long, requires = "simulate")]
    json: bool,
}

/// Result of a fairness simulation.
#[derive(Debug, Serialize)]
struct SimulationReport {
    seed: Option<u64>,
    rounds: u32,
    pools: Vec<PoolReport>,
}

#[derive(Debug, Serialize)]
struct PoolReport {
    pool: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    reviewers: Vec<FairnessStats>,
}

fn main() -> ExitCode {
    let args = Args::parse();

    if let Some(output_path) = args.generate_example {
        return generate_example(&output_path);
    }

    let Some(config) = validate_config(&args.file, args.verbose, args.json) else {
        return ExitCode::FAILURE;
    };

    if let Some(rounds) = args.simulate {
        let report = simulate(&config, rounds, args.seed);
        if args.json {
            return print_json(&report);
        }
        print_report(&report);
    }

    ExitCode::SUCCESS
}

fn generate_example(output_path: &str) -> ExitCode {
    let example = PoolsConfig::example();

    match example.save_to_file(output_path) {
        Ok(()) => {
            println!("✓ Example configuration written to: {output_path}");
            println!(
                "\nThe file contains {} pools with {} reviewers.",
                example.len(),
                example.reviewer_count()
            );
            println!("Replace the example slack_id values with real Slack user IDs.");
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("✗ Failed to write example file: {e}");
            ExitCode::FAILURE
        }
    }
}

fn validate_config(path: &str, verbose: bool, quiet: bool) -> Option<PoolsConfig> {
    if !quiet {
        println!("Validating: {path}\n");
    }

    let config = match PoolsConfig::load_from_file(path) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("✗ Failed to load configuration: {e}");
            return None;
        }
    };

    if !quiet {
        print_pools(&config, verbose);
    }

    let errors = config.validate_all();
    if errors.is_empty() {
        if !quiet {
            println!(
                "\n✓ {} pools with {} reviewers are valid!",
                config.len(),
                config.reviewer_count()
            );
        }
        Some(config)
    } else {
        for e in &errors {
            eprintln!("  ✗ Error: {e}");
        }
        eprintln!("✗ Validation failed: {} error(s)", errors.len());
        None
    }
}

fn print_pools(config: &PoolsConfig, verbose: bool) {
    for pool in &config.pools {
        let available = pool.reviewers.iter().filter(|r| r.is_available).count();
        let marker = if pool.name.eq_ignore_ascii_case(&config.default_pool) {
            " (default)"
        } else {
            ""
        };
        println!(
            "[{}]{marker} {} reviewers, {available} available",
            pool.name,
            pool.reviewers.len()
        );

        if pool.reviewers.is_empty() {
            println!("  ⚠ Warning: pool is empty, picks from it will fail");
        }

        if verbose {
            for reviewer in &pool.reviewers {
                let status = if reviewer.is_available { "" } else { " (away)" };
                println!("  - {} <{}>{status}", reviewer.name, reviewer.slack_id);
            }
        }
    }
}

fn simulate(config: &PoolsConfig, rounds: u32, seed: Option<u64>) -> SimulationReport {
    let mut registry = PoolRegistry::from_config(config);
    let mut selector = Selector::new(seed);
    let mut pools = Vec::new();

    for pool in &config.pools {
        let Ok(roster) = registry.get_mut(Some(&pool.name)) else {
            continue;
        };

        let mut error = None;
        for _ in 0..rounds {
            if let Err(e) = roster.pick(1, &mut selector) {
                error = Some(e.to_string());
                break;
            }
        }

        pools.push(PoolReport {
            pool: roster.name().to_owned(),
            error,
            reviewers: roster.fairness_summary(),
        });
    }

    SimulationReport {
        seed: selector.seed(),
        rounds,
        pools,
    }
}

fn print_json(report: &SimulationReport) -> ExitCode {
    match serde_json::to_string_pretty(report) {
        Ok(json) => {
            println!("{json}");
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("✗ Failed to encode report: {e}");
            ExitCode::FAILURE
        }
    }
}

fn print_report(report: &SimulationReport) {
    println!("\nSimulating {} picks per pool", report.rounds);
    if let Some(seed) = report.seed {
        println!("Seed: {seed}");
    }

    for pool in &report.pools {
        println!("\n[{}]", pool.pool);
        if let Some(error) = &pool.error {
            println!("  ✗ {error}");
        }

        println!(
            "  {:<16} {:>8} {:>9} {:>8} {:>7}",
            "reviewer", "selected", "expected", "deficit", "weight"
        );
        for stats in &pool.reviewers {
            println!(
                "  {:<16} {:>8} {:>9.2} {:>8.2} {:>7.2}",
                truncate(&stats.name, 16),
                stats.times_selected,
                stats.expected_selections,
                stats.deficit,
                stats.current_weight
            );
        }
    }
}

/// Truncates a string for display.
fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_owned()
    } else {
        format!("{}...", s.chars().take(max_len - 3).collect::<String>())
    }
}
