//! Fetch one product page and print what the monitor would see.

use anyhow::Result;
use clap::Parser;
use std::collections::HashMap;
use std::path::PathBuf;

use price_monitor::config::{Config, DEFAULT_CONFIG_PATH};
use price_monitor::fetchers::FetcherRegistry;
use price_monitor::models::TrackedItem;
use price_monitor::utils::http::create_client;

#[derive(Parser, Debug)]
#[command(name = "probe", about = "Show the site, identity and price detected for a URL")]
struct Args {
    /// Product URL
    url: String,

    /// Configuration file (TOML)
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let env: HashMap<String, String> = std::env::vars().collect();
    let config = match &args.config {
        Some(path) => Config::load(path, true, &env)?,
        None => Config::load(&PathBuf::from(DEFAULT_CONFIG_PATH), false, &env)?,
    };

    let client = create_client(&config.user_agent, config.request_timeout())?;
    let mut registry = FetcherRegistry::with_defaults(client, config.fetch_attempts)?;
    registry.alias_hosts(&config.site_aliases);

    let item = TrackedItem::new(Some(args.url.as_str()), None, &config.preserved_query_params)?;
    println!("Identity: {}", item.identity);

    let Some((site, fetcher)) = registry.resolve(&item.source_url) else {
        println!("No parser for {}", item.source_url);
        return Ok(());
    };
    println!("Site: {}", site);

    match fetcher.fetch_price(&item.source_url).await {
        Ok(Some(price)) => println!("Price: {}", price),
        Ok(None) => println!("No price found on page"),
        Err(e) => println!("Fetch failed: {}", e),
    }

    Ok(())
}
