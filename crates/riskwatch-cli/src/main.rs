//! Riskwatch CLI - run windowed scoring scenarios
//!
//! - `run`: load a scenario's source, score it, write `scored.csv`,
//!   `alerts.csv` and `report.md`
//! - `validate`: check the effective configuration without running
//! - `scenarios`: list the built-in scenarios

use std::path::PathBuf;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use riskwatch_pipeline::{PipelineError, Scenario};
use riskwatch_sink::{DirectorySink, ALERTS_FILE, REPORT_FILE, SCORED_FILE};
use riskwatch_source::SeriesSource;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod settings;

use settings::{LoggingConfig, Settings};

/// Riskwatch CLI application
#[derive(Parser)]
#[command(name = "riskwatch")]
#[command(about = "Riskwatch - windowed scoring, segmentation and action pipelines", long_about = None)]
#[command(version)]
struct Cli {
    /// Configuration file (TOML, JSON or YAML)
    #[arg(short, long, global = true, env = "RISKWATCH_CONFIG")]
    config: Option<String>,

    /// Debug logging unless RUST_LOG is set
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Log as JSON lines
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct ScenarioArgs {
    /// Scenario name or alias (see `riskwatch scenarios`)
    #[arg(short, long, default_value = "event-early-warning")]
    scenario: Scenario,

    /// Override the source seed
    #[arg(long)]
    seed: Option<u64>,
}

/// Available commands
#[derive(Subcommand)]
enum Commands {
    /// Run a scenario and write its artifacts
    Run {
        #[command(flatten)]
        scenario: ScenarioArgs,

        /// Output directory
        #[arg(short, long, default_value = "out")]
        out: PathBuf,
    },

    /// Validate the effective configuration of a scenario
    Validate {
        #[command(flatten)]
        scenario: ScenarioArgs,
    },

    /// List built-in scenarios
    Scenarios,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Scenarios => {
            for scenario in Scenario::all() {
                println!("{:<22}{}", scenario.name(), scenario.description());
            }
            Ok(())
        }
        Commands::Validate { ref scenario } => {
            let settings = load(&cli, scenario)?;
            let pipeline = settings
                .pipeline
                .validate()
                .map_err(PipelineError::from)
                .with_context(|| format!("scenario {} is not valid", scenario.scenario))?;
            let config = pipeline.config();
            println!("{}: configuration ok", scenario.scenario);
            println!("  features:     {}", config.features.len());
            println!("  calibration:  {}", config.calibration.style());
            println!("  segments:     {}", config.segments.len());
            println!("  alert floor:  {}", pipeline.alert_floor());
            println!("  columns:      {}", pipeline.required_columns().join(", "));
            Ok(())
        }
        Commands::Run {
            ref scenario,
            ref out,
        } => {
            let settings = load(&cli, scenario)?;
            let pipeline = settings
                .pipeline
                .validate()
                .map_err(PipelineError::from)
                .with_context(|| format!("scenario {} is not valid", scenario.scenario))?;
            let source = settings.source.build();
            let sink = DirectorySink::new(out);

            info!(
                scenario = %scenario.scenario,
                source = source.name(),
                seed = settings.source.seed(),
                out = %out.display(),
                "starting run"
            );
            let output = pipeline
                .execute(source.as_ref(), &sink)
                .with_context(|| format!("scenario {} failed", scenario.scenario))?;

            let stats = output.stats;
            println!("{}: {} records, {} entities", scenario.scenario, stats.records, stats.entities);
            println!("  scored:   {}", stats.scored);
            println!("  alerts:   {}", stats.alerts);
            if stats.duplicates_dropped > 0 {
                println!("  duplicates dropped: {}", stats.duplicates_dropped);
            }
            for name in [SCORED_FILE, ALERTS_FILE, REPORT_FILE] {
                println!("  wrote {}", out.join(name).display());
            }
            println!("  digest:   {}", output.artifacts.scored_digest());
            Ok(())
        }
    }
}

/// Effective settings for a scenario command, with tracing installed.
fn load(cli: &Cli, args: &ScenarioArgs) -> anyhow::Result<Settings> {
    let mut settings = Settings::load(args.scenario, cli.config.as_deref())
        .with_context(|| match &cli.config {
            Some(path) => format!("failed to load configuration from {path}"),
            None => "failed to load configuration".to_string(),
        })?;
    if let Some(seed) = args.seed {
        settings.source = settings.source.with_seed(seed);
    }
    if cli.json {
        settings.logging.json = true;
    }
    init_tracing(&settings.logging, cli.verbose);
    Ok(settings)
}

fn init_tracing(logging: &LoggingConfig, verbose: bool) {
    let default = if verbose { "debug" } else { logging.level.as_str() };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| default.into());
    let registry = tracing_subscriber::registry().with(filter);
    let layer = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);

    if logging.json {
        registry.with(layer.json()).init();
    } else if logging.timestamps {
        registry.with(layer).init();
    } else {
        registry.with(layer.without_time()).init();
    }
}
