use chrono::Utc;
use futures::stream::{self, StreamExt};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

use crate::engine::reconcile;
use crate::error::MonitorError;
use crate::fetchers::FetcherRegistry;
use crate::models::{AlertEvent, Identity, PriceObservation, TrackedItem};
use crate::notifier::Notifier;
use crate::storage::HistoryStore;

const DEFAULT_FETCH_CONCURRENCY: usize = 4;
const DEFAULT_NOTIFY_DELAY: Duration = Duration::from_secs(1);

/// Counts for one run.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub checked: usize,
    pub resolved: usize,
    pub unresolved: Vec<Identity>,
    pub first_sightings: usize,
    pub unchanged: usize,
    pub duplicates: usize,
    pub alerts_sent: usize,
    pub alerts_failed: usize,
}

/// Runs price checks: fetch, reconcile, save, then notify.
pub struct Monitor {
    registry: FetcherRegistry,
    store: Arc<dyn HistoryStore>,
    notifier: Arc<dyn Notifier>,
    fetch_concurrency: usize,
    notify_delay: Duration,
}

impl Monitor {
    pub fn new(
        registry: FetcherRegistry,
        store: Arc<dyn HistoryStore>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            registry,
            store,
            notifier,
            fetch_concurrency: DEFAULT_FETCH_CONCURRENCY,
            notify_delay: DEFAULT_NOTIFY_DELAY,
        }
    }

    pub fn with_fetch_concurrency(mut self, fetch_concurrency: usize) -> Self {
        self.fetch_concurrency = fetch_concurrency.max(1);
        self
    }

    /// Pause between consecutive alert deliveries.
    pub fn with_notify_delay(mut self, notify_delay: Duration) -> Self {
        self.notify_delay = notify_delay;
        self
    }

    /// Check every item once.
    ///
    /// The history is loaded before any fetch and saved exactly once, before
    /// the first alert is delivered, so a delivery failure can never cause
    /// the same change to be alerted again. Persistence failures abort the
    /// run without notifying.
    pub async fn run_once(&self, items: &[TrackedItem]) -> Result<RunSummary, MonitorError> {
        info!("--- Starting price check of {} items ---", items.len());

        let mut history = self.store.load().await?;

        let observations: Vec<PriceObservation> = stream::iter(items)
            .map(|item| self.observe(item))
            .buffered(self.fetch_concurrency)
            .collect()
            .await;

        let outcome = reconcile(&observations, &mut history)?;
        self.store.save(&history).await?;

        let (alerts_sent, alerts_failed) = self.deliver(&outcome.alerts).await;

        let summary = RunSummary {
            checked: items.len(),
            resolved: items.len() - outcome.unresolved.len(),
            unresolved: outcome.unresolved,
            first_sightings: outcome.first_sightings.len(),
            unchanged: outcome.unchanged.len(),
            duplicates: outcome.duplicates.len(),
            alerts_sent,
            alerts_failed,
        };

        info!(
            "--- Run complete: {} checked, {} unresolved, {} new, {} alerts sent, {} failed ---",
            summary.checked,
            summary.unresolved.len(),
            summary.first_sightings,
            summary.alerts_sent,
            summary.alerts_failed
        );

        Ok(summary)
    }

    /// Price one item. Every failure becomes an absent observation.
    pub async fn observe(&self, item: &TrackedItem) -> PriceObservation {
        let Some((site, fetcher)) = self.registry.resolve(&item.source_url) else {
            warn!("No parser for {}", item.source_url);
            return PriceObservation::absent(item, Utc::now());
        };

        info!("Checking {} on {}", item.label, site);

        match fetcher.fetch_price(&item.source_url).await {
            Ok(Some(price)) => {
                info!("Price for {}: {}", item.label, price);
                PriceObservation::resolved(item, price, Utc::now())
            }
            Ok(None) => {
                warn!("No price found for {} ({})", item.label, item.source_url);
                PriceObservation::absent(item, Utc::now())
            }
            Err(e) => {
                warn!("Failed to get price for {}: {}", item.label, e);
                PriceObservation::absent(item, Utc::now())
            }
        }
    }

    async fn deliver(&self, alerts: &[AlertEvent]) -> (usize, usize) {
        let mut sent = 0;
        let mut failed = 0;

        for (index, event) in alerts.iter().enumerate() {
            if index > 0 && !self.notify_delay.is_zero() {
                tokio::time::sleep(self.notify_delay).await;
            }

            match self.notifier.notify(event).await {
                Ok(()) => sent += 1,
                Err(e) => {
                    error!("Failed to deliver alert for {}: {}", event.identity, e);
                    failed += 1;
                }
            }
        }

        (sent, failed)
    }
}
