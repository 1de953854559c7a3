//! Scenario runner for the dated IRS virtual AMM

use anyhow::{Context, Result};
use clap::Parser;
use config::{init_tracing, GlobalSettings, VammSettings};
use irs_e2e_tests::{
    all_scenarios, OracleHistoryScenario, OverlappingRangesScenario, Scenario, ScenarioResult,
    ScenarioRunner, TestConfig, UniformRangeScenario,
};
use rust_decimal::Decimal;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::{error, info};
use vamm::{AccountId, CallContext, FixedRateIndex, OpenGate, VammPool};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Scenario to run: uniform_range, overlapping_ranges, oracle_history or all
    #[arg(short, long, default_value = "all")]
    scenario: String,

    /// Settings file; its markets are created in a pool before the scenarios run
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Environment override name, e.g. `staging`
    #[arg(short, long)]
    env: Option<String>,

    /// Oracle capacity for the oracle history scenario
    #[arg(long, default_value_t = 8)]
    cardinality: u16,

    /// Output results to file
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Stop at the first failing scenario
    #[arg(long)]
    fail_fast: bool,

    /// Skip invariant validation after each scenario
    #[arg(long)]
    no_validate: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let settings = match &args.config {
        Some(path) => Some(VammSettings::load(Some(path), args.env.as_deref())?),
        None => None,
    };
    let mut global = settings
        .as_ref()
        .map(|s| s.global.clone())
        .unwrap_or_else(GlobalSettings::default);
    if args.verbose {
        global.log_level = "debug".to_string();
    }
    init_tracing(&global)?;

    info!("Starting VAMM scenario runner");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    if let Some(settings) = &settings {
        create_configured_markets(settings)?;
    }

    let scenarios: Vec<Box<dyn Scenario>> = match args.scenario.as_str() {
        "uniform_range" | "a" => vec![Box::new(UniformRangeScenario::default())],
        "overlapping_ranges" | "b" => vec![Box::new(OverlappingRangesScenario::default())],
        "oracle_history" | "c" => vec![Box::new(OracleHistoryScenario::new(args.cardinality))],
        "all" => all_scenarios(),
        other => {
            error!("Unknown scenario: {}", other);
            std::process::exit(2);
        }
    };

    let runner = ScenarioRunner::new(TestConfig {
        validate_invariants: !args.no_validate,
        fail_fast: args.fail_fast,
    });
    let results = runner.run_all(&scenarios);

    print_results_summary(&results);

    if let Some(output_path) = &args.output {
        save_results_to_file(&results, output_path)?;
        info!("Results saved to: {}", output_path.display());
    }

    if !results.iter().all(|r| r.success) {
        error!("Some scenarios failed");
        std::process::exit(1);
    }

    info!("All scenarios passed");
    Ok(())
}

/// Smoke-check configured markets by initializing each one
fn create_configured_markets(settings: &VammSettings) -> Result<()> {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .context("System clock before epoch")?
        .as_secs();
    let gate = OpenGate;
    let index = FixedRateIndex(Decimal::ONE);
    let ctx = CallContext::new(now, AccountId::new(1), &gate, &index);

    let pool = VammPool::new();
    for market in &settings.markets {
        let (id, maturity) = (&market.market_id, market.maturity_timestamp);
        pool.create_from_settings(&ctx, market)
            .with_context(|| format!("Failed to create {} at {}", id, maturity))?;
    }
    info!(markets = pool.len(), "Created configured markets");
    Ok(())
}

fn print_results_summary(results: &[ScenarioResult]) {
    println!("\n═══════════════════════════════════════");
    println!("        SCENARIO RESULTS SUMMARY");
    println!("═══════════════════════════════════════");

    let total = results.len();
    let passed = results.iter().filter(|r| r.success).count();

    println!("Total:  {}", total);
    println!("Passed: {} ✓", passed);
    println!("Failed: {} ✗", total - passed);
    println!();

    for result in results {
        let status = if result.success { "✓ PASS" } else { "✗ FAIL" };
        println!(
            "{} {} ({} µs)",
            status,
            result.scenario_name,
            result.duration.as_micros()
        );

        if let Some(error) = &result.error_message {
            println!("      Error: {}", error);
        }
        for (name, value) in &result.metrics {
            println!("      {}: {}", name, value);
        }
        for validation in result.validation_results.iter().filter(|v| !v.passed) {
            println!(
                "      Validation failure {}: {}",
                validation.validator, validation.message
            );
        }
        println!();
    }

    println!("═══════════════════════════════════════");
}

fn save_results_to_file(results: &[ScenarioResult], path: &Path) -> Result<()> {
    let json_output = serde_json::json!({
        "run": {
            "version": env!("CARGO_PKG_VERSION"),
            "total": results.len(),
            "passed": results.iter().filter(|r| r.success).count(),
            "failed": results.iter().filter(|r| !r.success).count(),
        },
        "results": results
    });

    std::fs::write(path, serde_json::to_string_pretty(&json_output)?)
        .with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(())
}
