use reqwest::{Client, ClientBuilder};
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, warn};

use crate::error::FetchError;

pub fn create_client(user_agent: &str, timeout: Duration) -> Result<Client, FetchError> {
    let client = ClientBuilder::new()
        .user_agent(user_agent)
        .timeout(timeout)
        .cookie_store(true)
        .pool_max_idle_per_host(6)
        .build()?;

    Ok(client)
}

/// Longest pause between two attempts.
const MAX_BACKOFF: Duration = Duration::from_secs(60);

fn backoff(attempt: u32) -> Duration {
    2u64.checked_pow(attempt)
        .map(Duration::from_secs)
        .map_or(MAX_BACKOFF, |d| d.min(MAX_BACKOFF))
}

/// GET a page body, trying up to `attempts` times with exponential backoff.
pub async fn fetch_page(client: &Client, url: &str, attempts: u32) -> Result<String, FetchError> {
    let attempts = attempts.max(1);
    let mut attempt = 0;

    loop {
        attempt += 1;
        debug!("GET {} (attempt {}/{})", url, attempt, attempts);

        let error = match client.get(url).send().await {
            Ok(response) if response.status().is_success() => {
                return Ok(response.text().await?);
            }
            Ok(response) => FetchError::Status {
                url: url.to_string(),
                status: response.status(),
            },
            Err(e) => FetchError::from(e),
        };

        if attempt >= attempts {
            return Err(error);
        }

        let delay = backoff(attempt);
        warn!("{}; retrying in {:?} (attempt {}/{})", error, delay, attempt + 1, attempts);
        sleep(delay).await;
    }
}
