pub mod embed;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;
use tracing::{error, info};

use crate::error::NotificationError;
use crate::models::AlertEvent;
use crate::notifier::Notifier;
use embed::create_embed;

/// Posts alerts to a Discord webhook.
pub struct DiscordNotifier {
    client: Client,
    webhook_url: String,
}

impl DiscordNotifier {
    pub fn new(client: Client, webhook_url: impl Into<String>) -> Self {
        Self {
            client,
            webhook_url: webhook_url.into(),
        }
    }
}

#[async_trait]
impl Notifier for DiscordNotifier {
    async fn notify(&self, event: &AlertEvent) -> Result<(), NotificationError> {
        let payload = json!({
            "content": event.message(),
            "embeds": [create_embed(event)]
        });

        let response = self
            .client
            .post(&self.webhook_url)
            .json(&payload)
            .send()
            .await?;

        if response.status().is_success() {
            info!("Sent Discord alert for {}", event.label);
            Ok(())
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_else(|_| "Unknown error".to_string());
            error!("Discord webhook failed with status {}: {}", status, body);
            Err(NotificationError::Rejected { status, body })
        }
    }
}
