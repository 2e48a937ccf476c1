use std::path::PathBuf;

use clap::Parser;

use wscalc_cli::config::ScenarioConfig;
use wscalc_cli::logging::init_logging;
use wscalc_cli::runner::{RunRequest, run};

/// Exact damage-check odds for one attacking turn.
#[derive(Debug, Parser)]
#[command(
    name = "wscalc",
    author,
    version,
    about = "Exact damage-check probability calculator"
)]
struct Cli {
    /// Path to the YAML scenario file.
    #[arg(short, long, value_name = "FILE", default_value = "scenarios/demo.yaml")]
    scenario: PathBuf,

    /// Override the scenario's kill threshold.
    #[arg(long, value_name = "DAMAGE")]
    threshold: Option<u32>,

    /// Search operator-group orderings instead of resolving the sequence.
    #[arg(long)]
    solve: bool,

    /// Also write the report as JSON to this path.
    #[arg(long, value_name = "FILE")]
    report: Option<PathBuf>,

    /// Write structured JSONL logs to this path instead of stderr.
    #[arg(long, value_name = "FILE")]
    log_json: Option<PathBuf>,

    /// Log at debug level (RUST_LOG still takes precedence).
    #[arg(short, long)]
    verbose: bool,

    /// Exit after validating the scenario (nothing is computed).
    #[arg(long)]
    validate_only: bool,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = ScenarioConfig::from_path(&cli.scenario)?;
    let mut scenario = config.to_scenario()?;
    if let Some(threshold) = cli.threshold {
        scenario.kill_threshold = threshold;
    }

    if cli.validate_only {
        println!(
            "Scenario '{}' is valid ({} operators, {} groups).",
            config.name,
            scenario.operators.len(),
            scenario.groups.len()
        );
        return Ok(());
    }

    let _logging_guard = init_logging(cli.verbose, cli.log_json.as_deref())?;

    let report = run(&RunRequest {
        name: &config.name,
        scenario: &scenario,
        solve: cli.solve,
    })?;
    print!("{}", report.render_text());

    if let Some(path) = &cli.report {
        report.write_json(path)?;
        println!("Report written to {}", path.display());
    }
    Ok(())
}
