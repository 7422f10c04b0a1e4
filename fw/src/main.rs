//! feedwatch - fanout feed subscriber
//!
//! CLI entry point: loads config, sets up logging, wires the ingestion task
//! to the interactive console.

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use colored::*;
use eyre::{Context, Result};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use feedwatch::cli::{Cli, Command};
use feedwatch::config::{Config, load_dotenv};
use feedwatch::events::{EventBus, spawn_notifier};
use feedwatch::feed::{AmqpFeed, Feed, ReplayFeed};
use feedwatch::ingest::IngestLoop;
use feedwatch::remote::LastItemClient;
use feedwatch::repl;
use feedwatch::store::{Store, StoreOptions};

/// How long to wait for the ingestion task after shutdown is signalled
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

fn setup_logging(cli_log_level: Option<&str>, config_log_level: Option<&str>) -> Result<()> {
    // The terminal belongs to the console, so logs go to a file
    let log_dir = dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("feedwatch")
        .join("logs");

    fs::create_dir_all(&log_dir).context("Failed to create log directory")?;

    // Priority: CLI --log-level > config file > default (INFO)
    let level = match cli_log_level.or(config_log_level).map(|s| s.to_uppercase()) {
        Some(s) => match s.as_str() {
            "TRACE" => tracing::Level::TRACE,
            "DEBUG" => tracing::Level::DEBUG,
            "INFO" => tracing::Level::INFO,
            "WARN" | "WARNING" => tracing::Level::WARN,
            "ERROR" => tracing::Level::ERROR,
            _ => {
                eprintln!("Warning: Unknown log-level '{}', defaulting to INFO", s);
                tracing::Level::INFO
            }
        },
        None => tracing::Level::INFO,
    };

    let log_file = fs::File::create(log_dir.join("feedwatch.log")).context("Failed to create log file")?;

    tracing_subscriber::fmt()
        .with_writer(log_file)
        .with_ansi(false)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .init();

    info!("Logging initialized (level: {:?})", level);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config_log_level = Config::load_log_level(cli.config.as_ref());
    setup_logging(cli.log_level.as_deref(), config_log_level.as_deref()).context("Failed to setup logging")?;

    if let Some(path) = load_dotenv(None)? {
        info!("Loaded environment from: {}", path.display());
    }

    let mut config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;

    debug!(command = ?cli.command, "main: dispatching command");
    match cli.command.unwrap_or(Command::Watch {
        url: None,
        exchange: None,
    }) {
        Command::Watch { url, exchange } => {
            if let Some(url) = url {
                config.amqp.url = url;
            }
            if let Some(exchange) = exchange {
                config.amqp.exchange = exchange;
            }
            let feed = AmqpFeed::subscribe(&config.amqp)
                .await
                .context("Failed to subscribe to broker")?;
            run_console(&config, feed).await
        }
        Command::Replay { file, interval_ms } => {
            let feed = ReplayFeed::open(&file, interval_ms.map(Duration::from_millis))
                .await
                .context(format!("Failed to open replay file {}", file.display()))?;
            run_console(&config, feed).await
        }
        Command::Fetch => cmd_fetch(&config).await,
    }
}

/// Run ingestion in the background and the console in the foreground
async fn run_console(config: &Config, feed: impl Feed + 'static) -> Result<()> {
    let store = Arc::new(Store::new(StoreOptions::from(&config.store)));
    let bus = EventBus::default();
    let notifier = spawn_notifier(&bus);

    let source = feed.describe();
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let ingest = IngestLoop::new(feed, Arc::clone(&store), bus).spawn(shutdown_rx);

    let remote = match LastItemClient::from_config(&config.remote) {
        Ok(client) => Some(client),
        Err(e) => {
            info!(error = %e, "Remote lookup disabled");
            None
        }
    };

    let result = repl::run_interactive(store, remote, &source).await;

    debug!("run_console: signalling ingestion shutdown");
    let _ = shutdown_tx.send(true);
    match tokio::time::timeout(SHUTDOWN_TIMEOUT, ingest).await {
        Ok(Ok((summary, reason))) => info!(?summary, ?reason, "Ingestion finished"),
        Ok(Err(e)) => warn!(error = %e, "Ingestion task failed"),
        Err(_) => warn!("Ingestion task did not stop in time"),
    }
    notifier.abort();

    let end = result?;
    info!(?end, "Console closed");
    Ok(())
}

/// One-shot remote lookup
async fn cmd_fetch(config: &Config) -> Result<()> {
    let client = LastItemClient::from_config(&config.remote)?;
    let record = client
        .fetch_last()
        .await
        .context(format!("Remote lookup against {} failed", client.url()))?;

    println!("{}", "Last record:".bright_cyan());
    println!("{}", record);
    Ok(())
}
