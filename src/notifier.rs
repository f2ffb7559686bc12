use async_trait::async_trait;
use tracing::info;

use crate::error::NotificationError;
use crate::models::AlertEvent;

/// Delivers alert events to an external channel.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, event: &AlertEvent) -> Result<(), NotificationError>;
}

/// Writes alerts to the log; used when no webhook is configured.
#[derive(Debug, Default, Clone)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(&self, event: &AlertEvent) -> Result<(), NotificationError> {
        info!("{}", event.message());
        Ok(())
    }
}
