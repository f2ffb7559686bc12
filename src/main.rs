use anyhow::{bail, Result};
use clap::Parser;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::interval;
use tracing::{error, info, warn};

use price_monitor::config::{Config, HistoryBackend, DEFAULT_CONFIG_PATH};
use price_monitor::discord::DiscordNotifier;
use price_monitor::fetchers::FetcherRegistry;
use price_monitor::notifier::{LogNotifier, Notifier};
use price_monitor::storage::{HistoryStore, JsonFileStore, SqliteStore};
use price_monitor::tracking::load_items;
use price_monitor::utils::http::create_client;
use price_monitor::{Monitor, RunSummary};

#[derive(Parser, Debug)]
#[command(name = "price-monitor", version, about = "Track product prices and alert on changes")]
struct Cli {
    /// Configuration file (TOML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Run a single check even if an interval is configured
    #[arg(long)]
    once: bool,

    /// Emit logs as JSON
    #[arg(long)]
    json_logs: bool,

    /// Merge a JSON history file into the SQLite history before running
    #[arg(long, value_name = "PATH")]
    import_history: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = tracing_subscriber::EnvFilter::from_default_env()
        .add_directive("price_monitor=info".parse()?);
    if cli.json_logs {
        tracing_subscriber::fmt().with_env_filter(filter).json().init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }

    info!("Starting Price Monitor");

    // Load configuration
    let env: HashMap<String, String> = std::env::vars().collect();
    let (config_path, required) = match &cli.config {
        Some(path) => (path.clone(), true),
        None => (PathBuf::from(DEFAULT_CONFIG_PATH), false),
    };
    let config = Config::load(&config_path, required, &env)?;

    // Initialize storage
    let store: Arc<dyn HistoryStore> = match config.history_backend {
        HistoryBackend::Json => {
            if cli.import_history.is_some() {
                bail!("--import-history requires history_backend = \"sqlite\"");
            }
            Arc::new(
                JsonFileStore::new(&config.history_path)
                    .with_preserved_query_params(config.preserved_query_params.clone()),
            )
        }
        HistoryBackend::Sqlite => {
            let store = SqliteStore::open(&config.history_path)?;
            if let Some(path) = &cli.import_history {
                let legacy = JsonFileStore::new(path)
                    .with_preserved_query_params(config.preserved_query_params.clone());
                store.import_json(&legacy).await?;
            }
            Arc::new(store)
        }
    };

    // Initialize HTTP client with connection pooling
    let client = create_client(&config.user_agent, config.request_timeout())?;

    let mut registry = FetcherRegistry::with_defaults(client.clone(), config.fetch_attempts)?;
    registry.alias_hosts(&config.site_aliases);

    let notifier: Arc<dyn Notifier> = match &config.webhook_url {
        Some(webhook) => Arc::new(DiscordNotifier::new(client.clone(), webhook.clone())),
        None => {
            warn!("No webhook configured, alerts will only be logged");
            Arc::new(LogNotifier)
        }
    };

    let monitor = Monitor::new(registry, store, notifier)
        .with_fetch_concurrency(config.fetch_concurrency)
        .with_notify_delay(config.notify_delay());

    let Some(seconds) = config.check_interval_seconds.filter(|_| !cli.once) else {
        run_cycle(&monitor, &config).await?;
        return Ok(());
    };

    // Main monitoring loop
    let mut interval = interval(Duration::from_secs(seconds.max(1)));

    loop {
        interval.tick().await;

        if let Err(e) = run_cycle(&monitor, &config).await {
            error!("Check cycle failed: {:#}", e);
        }

        info!("Check cycle completed, waiting {} seconds", seconds);
    }
}

/// Re-read the tracking list and check every item once.
async fn run_cycle(monitor: &Monitor, config: &Config) -> Result<RunSummary> {
    let items = load_items(
        &config.items,
        config.tracking_path.as_deref(),
        &config.preserved_query_params,
    )
    .await?;

    Ok(monitor.run_once(&items).await?)
}
