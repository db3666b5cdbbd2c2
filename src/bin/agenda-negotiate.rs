//! # Agenda Negotiation Runner
//!
//! Command-line tool that runs one negotiation session against an in-memory
//! calendar loaded from a JSON fixture and prints the session response.

use agenda_core::calendar::{CalendarFixture, InMemoryCalendar};
use agenda_core::config::ConfigManager;
use agenda_core::models::SchedulingRequestPayload;
use agenda_core::orchestration::NegotiationOrchestrator;
use agenda_core::selection::{Clock, FixedClock, SystemClock};
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser)]
#[command(name = "agenda-negotiate")]
#[command(about = "Negotiate and book a meeting slot")]
#[command(version = env!("CARGO_PKG_VERSION"))]
pub struct Cli {
    /// Configuration directory (default: $AGENDA_CONFIG_DIR or ./config)
    #[arg(short, long)]
    config_dir: Option<PathBuf>,

    /// Configuration environment (default: $AGENDA_ENV, $APP_ENV or development)
    #[arg(short, long)]
    environment: Option<String>,

    /// Verbose output level (use multiple times for more verbosity)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run one negotiation session
    Run {
        /// Scheduling request payload (JSON)
        #[arg(short, long)]
        request: PathBuf,

        /// Calendar fixture (JSON); an empty calendar when omitted
        #[arg(long)]
        calendar: Option<PathBuf>,

        /// Pin "now" to an RFC 3339 instant instead of the wall clock
        #[arg(long)]
        now: Option<DateTime<Utc>>,

        /// Pretty-print the response
        #[arg(long)]
        pretty: bool,
    },

    /// Print the effective configuration
    Config,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("failed to install tracing subscriber")?;

    let environment = cli
        .environment
        .clone()
        .unwrap_or_else(ConfigManager::detect_environment);
    let manager = ConfigManager::load_from_directory_with_env(cli.config_dir.clone(), &environment)
        .context("failed to load configuration")?;

    match cli.command {
        Commands::Config => {
            println!("{}", serde_json::to_string_pretty(manager.config())?);
        }
        Commands::Run {
            request,
            calendar,
            now,
            pretty,
        } => {
            let payload: SchedulingRequestPayload = read_json(&request)?;
            let fixture: CalendarFixture = match calendar {
                Some(path) => read_json(&path)?,
                None => CalendarFixture::default(),
            };
            let clock: Arc<dyn Clock> = match now {
                Some(instant) => Arc::new(FixedClock::new(instant)),
                None => Arc::new(SystemClock),
            };

            let orchestrator = NegotiationOrchestrator::new(
                manager.config().clone(),
                Arc::new(InMemoryCalendar::from_fixture(fixture)),
                clock,
            )?;
            info!(environment = %manager.environment(), "Running negotiation");

            let response = orchestrator.negotiate(&payload).await?;
            let output = if pretty {
                serde_json::to_string_pretty(&response)?
            } else {
                serde_json::to_string(&response)?
            };
            println!("{output}");
        }
    }

    Ok(())
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("failed to parse {}", path.display()))
}
