//! Turnwise Simulator CLI
//!
//! Run scenarios against the turn scheduler and report pass/fail.

use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{error, info, Level};
use tracing_subscriber::{EnvFilter, FmtSubscriber};
use turnwise_core::RuntimeConfig;
use turnwise_sim::{RunExport, ScenarioId, ScenarioResult, ScenarioRunner};

/// Turnwise scenario runner
#[derive(Parser, Debug)]
#[command(name = "turnwise-sim")]
#[command(about = "Run turn-based multi-agent scenarios", long_about = None)]
struct Args {
    /// Master seed for determinism (0 = random from time)
    #[arg(short, long, default_value = "42")]
    seed: u64,

    /// Number of agents
    #[arg(short, long, default_value = "6")]
    agents: usize,

    /// Scenario to run (broadcast, synchronous, stragglers, ping_pong, departure, all)
    #[arg(short = 'S', long, default_value = "all")]
    scenario: String,

    /// Iterations (overrides --config)
    #[arg(short, long)]
    iterations: Option<usize>,

    /// Turns per iteration (overrides --config)
    #[arg(short, long)]
    turns: Option<usize>,

    /// Per-turn barrier timeout in milliseconds (overrides --config)
    #[arg(long)]
    timeout_ms: Option<u64>,

    /// Per-sender asynchronous messages per turn (overrides --config)
    #[arg(short, long)]
    bandwidth: Option<usize>,

    /// JSON runtime configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,

    /// JSON output for CI parsing
    #[arg(long)]
    json: bool,

    /// Export the turn reports of a single scenario to a JSON file
    #[arg(long)]
    export: Option<String>,
}

fn load_config(args: &Args) -> Result<RuntimeConfig, String> {
    let mut config = match &args.config {
        Some(path) => {
            let json = std::fs::read_to_string(path)
                .map_err(|e| format!("Failed to read {}: {}", path.display(), e))?;
            RuntimeConfig::from_json(&json).map_err(|e| e.to_string())?
        }
        None => RuntimeConfig::default()
            .with_turns(3)
            .with_turn_timeout(Duration::from_millis(200)),
    };

    if let Some(iterations) = args.iterations {
        config.iterations = iterations;
    }
    if let Some(turns) = args.turns {
        config.turns = turns;
    }
    if let Some(ms) = args.timeout_ms {
        config.turn_timeout = Duration::from_millis(ms);
    }
    if let Some(ceiling) = args.bandwidth {
        config.bandwidth = Some(ceiling);
    }

    config.validate().map_err(|e| e.to_string())?;
    Ok(config)
}

fn main() {
    let args = Args::parse();

    // Initialize logging; RUST_LOG wins over --verbose
    let level = if args.verbose { Level::DEBUG } else { Level::INFO };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.as_str()));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .expect("Failed to set tracing subscriber");

    if !args.json {
        info!("Turnwise Simulator v{}", env!("CARGO_PKG_VERSION"));
        info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    }

    let config = load_config(&args).unwrap_or_else(|e| {
        eprintln!("Error: {}", e);
        std::process::exit(2);
    });

    // Parse scenarios
    let scenarios: Vec<ScenarioId> = if args.scenario == "all" {
        ScenarioId::all()
    } else {
        vec![args.scenario.parse().unwrap_or_else(|e| {
            eprintln!("Error: {}", e);
            eprintln!("Available scenarios: broadcast, synchronous, stragglers, ping_pong, departure, all");
            std::process::exit(2);
        })]
    };

    if args.export.is_some() && scenarios.len() > 1 {
        eprintln!("Error: --export only supports a single scenario, not 'all'");
        std::process::exit(2);
    }

    // Determine seed
    let seed = if args.seed == 0 {
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_nanos() as u64)
            .unwrap_or(42)
    } else {
        args.seed
    };

    let runner = ScenarioRunner::new(seed, args.agents).with_config(config);

    let mut all_results: Vec<ScenarioResult> = Vec::new();
    for scenario in &scenarios {
        if !args.json {
            info!("▶ {} - {}", scenario.name(), scenario.description());
        }

        let result = runner.run(*scenario);

        if !args.json {
            if result.passed {
                info!(
                    "✓ {} (seed={}) PASSED - {} turns, {} sent, {} dropped, {} timed out",
                    scenario.name(),
                    seed,
                    result.summary.len(),
                    result.summary.total_sent(),
                    result.summary.total_dropped(),
                    result.summary.timed_out_turns(),
                );
            } else {
                error!(
                    "✗ {} (seed={}) FAILED: {}",
                    scenario.name(),
                    seed,
                    result.failure_reason.as_deref().unwrap_or("unknown")
                );
            }
        }

        if let Some(path) = &args.export {
            match RunExport::from_result(&result).write_to_file(path) {
                Ok(()) => info!("Exported {} turn reports to {}", result.summary.len(), path),
                Err(e) => error!("Failed to write export: {}", e),
            }
        }

        all_results.push(result);
    }

    // Summary
    let total = all_results.len();
    let failed_count = all_results.iter().filter(|r| !r.passed).count();
    let passed = total - failed_count;

    if args.json {
        // JSON output for CI parsing
        let summary = serde_json::json!({
            "total": total,
            "passed": passed,
            "failed": failed_count,
            "results": all_results.iter().map(|r| {
                serde_json::json!({
                    "scenario": r.scenario.name(),
                    "seed": r.seed,
                    "passed": r.passed,
                    "turns": r.summary.len(),
                    "sent": r.summary.total_sent(),
                    "succeeded": r.summary.total_succeeded(),
                    "dropped": r.summary.total_dropped(),
                    "timed_out_turns": r.summary.timed_out_turns(),
                    "failure_reason": r.failure_reason,
                })
            }).collect::<Vec<_>>(),
        });
        match serde_json::to_string_pretty(&summary) {
            Ok(json) => println!("{}", json),
            Err(e) => error!("Failed to encode summary: {}", e),
        }
    } else {
        info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

        if failed_count == 0 {
            info!("✅ All {} scenario runs passed!", total);
        } else {
            error!("❌ {}/{} scenario runs failed!", failed_count, total);
            for result in all_results.iter().filter(|r| !r.passed) {
                error!(
                    "  - {} seed={}: {}",
                    result.scenario.name(),
                    result.seed,
                    result.failure_reason.as_deref().unwrap_or("unknown")
                );
            }
        }
    }

    // Exit with proper code for CI
    if failed_count > 0 {
        std::process::exit(1);
    }
}
