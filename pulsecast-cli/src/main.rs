//! Pulsecast CLI: predictions, rebound checks and batch regeneration over a
//! JSON market fixture.
//!
//! Commands:
//! - `predict`: cache-fronted prediction for one symbol (one or all horizons)
//! - `rebound`: rebound detection, regenerating on a positive event
//! - `regenerate`: batch regeneration of the fixture's stocks
//! - `config check`: validate a calibration file
//! - `config show`: print the effective calibration and engine settings
//!
//! Results go to stdout as JSON; logs go to stderr (`RUST_LOG`, `LOG_FORMAT`).

mod fixture;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{anyhow, bail, Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};

use pulsecast_core::domain::Horizon;
use pulsecast_core::CalibrationConfig;
use pulsecast_runner::export::{write_rebounds_csv, write_summary_csv};
use pulsecast_runner::{
    init_logging, EngineSettings, LogConfig, MemoryStore, PredictionService,
    RegenerationOrchestrator,
};

use crate::fixture::Fixture;

#[derive(Parser)]
#[command(
    name = "pulsecast",
    about = "Pulsecast: regional-market stock predictions and rebound detection"
)]
struct Cli {
    /// Calibration TOML (may carry an `[engine]` table). Defaults apply when omitted.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Predict one symbol.
    Predict {
        symbol: String,

        /// Market fixture (JSON).
        #[arg(long)]
        fixture: PathBuf,

        /// today, tomorrow, week, month, or all.
        #[arg(long, default_value = "today")]
        horizon: String,
    },
    /// Check one symbol for a rebound; a positive event regenerates its forecast.
    Rebound {
        symbol: String,

        /// Market fixture (JSON).
        #[arg(long)]
        fixture: PathBuf,

        /// Detection date (YYYY-MM-DD). Defaults to today (UTC).
        #[arg(long)]
        date: Option<String>,

        /// Also write recorded rebound events to this CSV file.
        #[arg(long)]
        csv: Option<PathBuf>,
    },
    /// Regenerate predictions for every stock in the fixture, or a subset.
    Regenerate {
        /// Market fixture (JSON).
        #[arg(long)]
        fixture: PathBuf,

        /// Restrict to these symbols.
        #[arg(long, value_delimiter = ',')]
        symbols: Vec<String>,

        /// Also write the batch summary to this CSV file.
        #[arg(long)]
        csv: Option<PathBuf>,
    },
    /// Configuration commands.
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Validate the calibration and engine settings.
    Check,
    /// Print the effective configuration as TOML.
    Show,
}

fn main() -> Result<()> {
    init_logging(LogConfig::from_env()).map_err(|e| anyhow!(e))?;
    let cli = Cli::parse();
    let config_path = cli.config.as_deref();

    match cli.command {
        Commands::Predict {
            symbol,
            fixture,
            horizon,
        } => run_predict(config_path, &fixture, &symbol, &horizon),
        Commands::Rebound {
            symbol,
            fixture,
            date,
            csv,
        } => run_rebound(config_path, &fixture, &symbol, date.as_deref(), csv.as_deref()),
        Commands::Regenerate {
            fixture,
            symbols,
            csv,
        } => run_regenerate(config_path, &fixture, symbols, csv.as_deref()),
        Commands::Config { action } => match action {
            ConfigAction::Check => run_config_check(config_path),
            ConfigAction::Show => run_config_show(config_path),
        },
    }
}

fn load_settings(path: Option<&Path>) -> Result<(CalibrationConfig, EngineSettings)> {
    match path {
        Some(path) => Ok((
            CalibrationConfig::from_file(path)?,
            EngineSettings::from_file(path)?,
        )),
        None => Ok((CalibrationConfig::default(), EngineSettings::default())),
    }
}

fn build(config_path: Option<&Path>, fixture_path: &Path) -> Result<(RegenerationOrchestrator, Fixture)> {
    let (config, settings) = load_settings(config_path)?;
    tracing::debug!(fingerprint = %config.fingerprint(), workers = settings.workers, "configuration loaded");
    let fixture = Fixture::load(fixture_path)?;
    let providers = fixture.providers(&config.local, &config.correction);
    let service = PredictionService::new(config, settings, Arc::new(MemoryStore::new()), providers)
        .context("invalid configuration")?;
    Ok((RegenerationOrchestrator::new(Arc::new(service)), fixture))
}

fn run_predict(config_path: Option<&Path>, fixture: &Path, symbol: &str, horizon: &str) -> Result<()> {
    let (orchestrator, _) = build(config_path, fixture)?;
    let horizons: Vec<Horizon> = if horizon.eq_ignore_ascii_case("all") {
        Horizon::ALL.to_vec()
    } else {
        vec![horizon.parse::<Horizon>().map_err(|e| anyhow!(e))?]
    };

    let mut results = Vec::with_capacity(horizons.len());
    for h in horizons {
        results.push(orchestrator.service().get_prediction(symbol, h)?);
    }
    println!("{}", serde_json::to_string_pretty(&results)?);
    Ok(())
}

fn run_rebound(
    config_path: Option<&Path>,
    fixture: &Path,
    symbol: &str,
    date: Option<&str>,
    csv: Option<&Path>,
) -> Result<()> {
    let (orchestrator, _) = build(config_path, fixture)?;
    let event = match date {
        Some(d) => {
            let date = NaiveDate::parse_from_str(d, "%Y-%m-%d")
                .with_context(|| format!("invalid --date '{d}'"))?;
            orchestrator.check_rebound_on(symbol, date)?
        }
        None => orchestrator.check_rebound(symbol)?,
    };

    match &event {
        Some(event) => {
            println!("{}", serde_json::to_string_pretty(event)?);
            let today = orchestrator.service().get_prediction(symbol, Horizon::Today)?;
            println!("{}", serde_json::to_string_pretty(&today)?);
        }
        None => println!("No rebound detected for {}", symbol.to_ascii_uppercase()),
    }

    if let Some(path) = csv {
        write_rebounds_csv(&orchestrator.rebound_events(), path)?;
        eprintln!("Rebound events written to {}", path.display());
    }
    Ok(())
}

fn run_regenerate(
    config_path: Option<&Path>,
    fixture_path: &Path,
    symbols: Vec<String>,
    csv: Option<&Path>,
) -> Result<()> {
    let (orchestrator, fixture) = build(config_path, fixture_path)?;
    let universe = if symbols.is_empty() {
        fixture.symbols()
    } else {
        symbols
    };
    if universe.is_empty() {
        bail!("no symbols to regenerate: the fixture lists no stocks");
    }

    let summary = orchestrator.regenerate_all(&universe);
    println!("{}", serde_json::to_string_pretty(&summary)?);

    if let Some(path) = csv {
        write_summary_csv(&summary, path)?;
        eprintln!("Summary written to {}", path.display());
    }

    if !summary.is_clean() {
        for failure in &summary.failed {
            eprintln!(
                "Error for {} after {} attempts: {}",
                failure.symbol, failure.attempts, failure.error
            );
        }
        std::process::exit(1);
    }
    Ok(())
}

fn run_config_check(config_path: Option<&Path>) -> Result<()> {
    let (config, settings) = load_settings(config_path)?;
    config.validate().context("calibration")?;
    settings.validate().context("engine settings")?;
    println!("Configuration OK (fingerprint {})", config.fingerprint());
    Ok(())
}

fn run_config_show(config_path: Option<&Path>) -> Result<()> {
    let (config, settings) = load_settings(config_path)?;
    println!("{}", config.to_toml()?);
    println!("{}", settings.to_toml()?);
    Ok(())
}
