use async_trait::async_trait;
use reqwest::Client;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::warn;
use url::Url;

use crate::error::FetchError;
use crate::models::{Price, Site};

mod json_ld;
mod selector;

pub use json_ld::JsonLdFetcher;
pub use selector::SelectorFetcher;

/// Reads the current price of one product page.
#[async_trait]
pub trait PriceFetcher: Send + Sync {
    /// `Ok(None)` when the page loaded but carried no recognizable price.
    async fn fetch_price(&self, url: &Url) -> Result<Option<Price>, FetchError>;
}

/// Maps shops to their fetcher, selected by the host of a product URL.
#[derive(Default, Clone)]
pub struct FetcherRegistry {
    fetchers: HashMap<Site, Arc<dyn PriceFetcher>>,
    aliases: HashMap<String, Site>,
}

impl FetcherRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with a fetcher for every known shop.
    pub fn with_defaults(client: Client, attempts: u32) -> Result<Self, FetchError> {
        let mut registry = Self::new();
        registry.register(Site::Ebay, Arc::new(SelectorFetcher::ebay(client.clone(), attempts)?));
        registry.register(
            Site::ToScrape,
            Arc::new(SelectorFetcher::toscrape(client.clone(), attempts)?),
        );
        registry.register(
            Site::Aritzia,
            Arc::new(SelectorFetcher::aritzia(client.clone(), attempts)?),
        );
        registry.register(Site::Zara, Arc::new(JsonLdFetcher::new(client, attempts)));
        Ok(registry)
    }

    pub fn register(&mut self, site: Site, fetcher: Arc<dyn PriceFetcher>) {
        self.fetchers.insert(site, fetcher);
    }

    /// Route an exact host to a shop, e.g. a regional domain the label
    /// match does not cover.
    pub fn alias(&mut self, host: &str, site: Site) {
        self.aliases.insert(host.to_ascii_lowercase(), site);
    }

    /// Apply `host -> site key` aliases from configuration. Unknown site keys
    /// are skipped with a warning.
    pub fn alias_hosts(&mut self, aliases: &HashMap<String, String>) {
        for (host, key) in aliases {
            match Site::from_key(key) {
                Some(site) => self.alias(host, site),
                None => warn!("Ignoring alias {} -> {}: unknown site", host, key),
            }
        }
    }

    pub fn site_for(&self, url: &Url) -> Option<Site> {
        let host = url.host_str()?.to_ascii_lowercase();
        self.aliases
            .get(&host)
            .copied()
            .or_else(|| Site::from_host(&host))
    }

    pub fn resolve(&self, url: &Url) -> Option<(Site, Arc<dyn PriceFetcher>)> {
        let site = self.site_for(url)?;
        self.fetchers.get(&site).map(|f| (site, f.clone()))
    }
}
