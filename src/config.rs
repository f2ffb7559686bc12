use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Prefix of environment overrides, e.g. `PRICE_MONITOR__WEBHOOK_URL`.
pub const ENV_PREFIX: &str = "PRICE_MONITOR";

/// Webhook variable read by earlier versions of the monitor.
pub const LEGACY_WEBHOOK_VAR: &str = "DISCORD_URL";

pub const DEFAULT_CONFIG_PATH: &str = "price_monitor.toml";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HistoryBackend {
    #[default]
    Json,
    Sqlite,
}

/// One tracked product as written in configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemConfig {
    pub url: Option<String>,
    #[serde(alias = "note")]
    pub label: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub history_path: PathBuf,
    pub history_backend: HistoryBackend,
    pub tracking_path: Option<PathBuf>,
    pub webhook_url: Option<String>,
    /// Run forever at this interval; `None` runs once.
    pub check_interval_seconds: Option<u64>,
    pub user_agent: String,
    pub request_timeout_seconds: u64,
    pub fetch_attempts: u32,
    pub fetch_concurrency: usize,
    pub notify_delay_ms: u64,
    /// Query parameters that identify a product and survive canonicalization.
    pub preserved_query_params: Vec<String>,
    /// Exact host -> site key routes, e.g. `"www.ebay.co.uk" = "ebay"`.
    pub site_aliases: HashMap<String, String>,
    pub items: Vec<ItemConfig>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            history_path: PathBuf::from("price_history.json"),
            history_backend: HistoryBackend::Json,
            tracking_path: Some(PathBuf::from("tracking_list.json")),
            webhook_url: None,
            check_interval_seconds: None,
            user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36".to_string(),
            request_timeout_seconds: 30,
            fetch_attempts: 1,
            fetch_concurrency: 4,
            notify_delay_ms: 1000,
            preserved_query_params: Vec::new(),
            site_aliases: HashMap::new(),
            items: Vec::new(),
        }
    }
}

impl Config {
    /// Layer built-in defaults, the TOML file at `path` and `PRICE_MONITOR__*`
    /// variables from `env`. The file is optional unless `required`.
    pub fn load(path: &Path, required: bool, env: &HashMap<String, String>) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::from(path.to_path_buf()).required(required))
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true)
                    .source(Some(env.clone())),
            )
            .build()
            .with_context(|| format!("Failed to read configuration from {}", path.display()))?;

        let mut config: Config = settings
            .try_deserialize()
            .context("Invalid configuration")?;

        if config.webhook_url.as_deref().map_or(true, |w| w.trim().is_empty()) {
            config.webhook_url = env
                .get(LEGACY_WEBHOOK_VAR)
                .map(|w| w.trim().to_string())
                .filter(|w| !w.is_empty());
        }

        config.fetch_attempts = config.fetch_attempts.max(1);
        config.fetch_concurrency = config.fetch_concurrency.max(1);

        Ok(config)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_seconds)
    }

    pub fn notify_delay(&self) -> Duration {
        Duration::from_millis(self.notify_delay_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::tempdir;

    fn env(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn missing_optional_file_gives_defaults() {
        let dir = tempdir().unwrap();
        let config = Config::load(&dir.path().join("absent.toml"), false, &env(&[])).unwrap();

        assert_eq!(config.history_path, PathBuf::from("price_history.json"));
        assert_eq!(config.history_backend, HistoryBackend::Json);
        assert_eq!(config.fetch_attempts, 1);
        assert_eq!(config.check_interval_seconds, None);
        assert!(config.webhook_url.is_none());
    }

    #[test]
    fn missing_required_file_is_an_error() {
        let dir = tempdir().unwrap();
        assert!(Config::load(&dir.path().join("absent.toml"), true, &env(&[])).is_err());
    }

    #[test]
    fn file_then_environment() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("price_monitor.toml");
        std::fs::write(
            &path,
            r#"
history_path = "state/history.db"
history_backend = "sqlite"
check_interval_seconds = 3600
fetch_concurrency = 0
preserved_query_params = ["var"]

[site_aliases]
"www.ebay.co.uk" = "ebay"

[[items]]
url = "https://books.toscrape.com/catalogue/a-light-in-the-attic_1000/index.html"
note = "Attic"
"#,
        )
        .unwrap();

        let config = Config::load(
            &path,
            true,
            &env(&[
                ("PRICE_MONITOR__FETCH_ATTEMPTS", "3"),
                ("PRICE_MONITOR__WEBHOOK_URL", "https://discord.example/hook"),
            ]),
        )
        .unwrap();

        assert_eq!(config.history_path, PathBuf::from("state/history.db"));
        assert_eq!(config.history_backend, HistoryBackend::Sqlite);
        assert_eq!(config.check_interval_seconds, Some(3600));
        assert_eq!(config.fetch_concurrency, 1);
        assert_eq!(config.fetch_attempts, 3);
        assert_eq!(config.preserved_query_params, vec!["var".to_string()]);
        assert_eq!(config.site_aliases["www.ebay.co.uk"], "ebay");
        assert_eq!(config.items[0].label.as_deref(), Some("Attic"));
        assert_eq!(config.webhook_url.as_deref(), Some("https://discord.example/hook"));
    }

    #[test]
    fn legacy_webhook_variable_is_a_fallback() {
        let dir = tempdir().unwrap();
        let config = Config::load(
            &dir.path().join("absent.toml"),
            false,
            &env(&[(LEGACY_WEBHOOK_VAR, "https://discord.example/legacy")]),
        )
        .unwrap();
        assert_eq!(config.webhook_url.as_deref(), Some("https://discord.example/legacy"));
    }
}
