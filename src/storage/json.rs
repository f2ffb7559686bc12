use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{info, warn};

use crate::error::PersistenceError;
use crate::models::{canonical_url, parse_http_url, History, HistoryRecord, Identity, Price};
use crate::storage::HistoryStore;

#[derive(Debug, Serialize, Deserialize)]
struct StoredRecord {
    last_price: Price,
    last_seen: DateTime<Utc>,
}

/// History kept in one JSON document keyed by identity.
///
/// Saving writes `<file>.tmp` next to the target and renames it over the
/// target, so an interrupted run leaves either the old or the new history.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
    preserved_params: Vec<String>,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            preserved_params: Vec::new(),
        }
    }

    /// Query parameters kept when legacy keys are canonicalized on load.
    pub fn with_preserved_query_params(mut self, preserved_params: Vec<String>) -> Self {
        self.preserved_params = preserved_params;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "history.json".into());
        name.push(".tmp");
        self.path.with_file_name(name)
    }

    fn write_error(&self, source: std::io::Error) -> PersistenceError {
        PersistenceError::Write {
            path: self.path.clone(),
            source,
        }
    }
}

#[async_trait]
impl HistoryStore for JsonFileStore {
    async fn load(&self) -> Result<History, PersistenceError> {
        let text = match fs::read_to_string(&self.path).await {
            Ok(text) => text,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                info!("No history at {}, starting empty", self.path.display());
                return Ok(History::new());
            }
            Err(source) => {
                return Err(PersistenceError::Read {
                    path: self.path.clone(),
                    source,
                })
            }
        };

        if text.trim().is_empty() {
            warn!("History file {} is empty, starting empty", self.path.display());
            return Ok(History::new());
        }

        parse_document(&self.path, &text, &self.preserved_params)
    }

    async fn save(&self, history: &History) -> Result<(), PersistenceError> {
        let body = render_document(history).map_err(|source| PersistenceError::Corrupt {
            path: self.path.clone(),
            source,
        })?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| self.write_error(e))?;
        }

        let temp = self.temp_path();
        if let Err(e) = write_then_rename(&temp, &self.path, body.as_bytes()).await {
            if let Err(cleanup) = fs::remove_file(&temp).await {
                if cleanup.kind() != ErrorKind::NotFound {
                    warn!("Failed to remove {}: {}", temp.display(), cleanup);
                }
            }
            return Err(self.write_error(e));
        }

        info!("Saved {} history records to {}", history.len(), self.path.display());
        Ok(())
    }
}

async fn write_then_rename(temp: &Path, target: &Path, body: &[u8]) -> std::io::Result<()> {
    let mut file = fs::File::create(temp).await?;
    file.write_all(body).await?;
    file.sync_all().await?;
    drop(file);
    fs::rename(temp, target).await
}

/// Parse a history document. Besides the record form, the flat
/// `{"<url>": 10.0}` form with bare prices is accepted; such records get the
/// Unix epoch as `last_seen` and their keys are canonicalized with
/// `preserved_params`. When several keys land on one identity, a record-form
/// entry wins over legacy ones, and otherwise the first key in sorted order.
pub(crate) fn parse_document(
    path: &Path,
    text: &str,
    preserved_params: &[String],
) -> Result<History, PersistenceError> {
    let corrupt = |source: serde_json::Error| PersistenceError::Corrupt {
        path: path.to_path_buf(),
        source,
    };

    let entries: BTreeMap<String, Value> = serde_json::from_str(text).map_err(corrupt)?;
    let mut history = History::new();
    let mut legacy = Vec::new();

    for (key, value) in entries {
        let invalid = |value: &Value| PersistenceError::InvalidPrice {
            identity: key.clone(),
            value: value.to_string(),
        };

        let last_price: Price = match &value {
            Value::Object(_) => {
                let stored: StoredRecord = serde_json::from_value(value.clone()).map_err(corrupt)?;
                history.upsert(HistoryRecord {
                    identity: Identity(key),
                    last_price: stored.last_price,
                    last_seen: stored.last_seen,
                });
                continue;
            }
            Value::Number(n) => n.to_string().parse().map_err(|_| invalid(&value))?,
            Value::String(s) => s.parse().map_err(|_| invalid(&value))?,
            _ => return Err(invalid(&value)),
        };

        legacy.push((key, last_price));
    }

    for (key, last_price) in legacy {
        let identity = match parse_http_url(&key) {
            Ok(url) => Identity(canonical_url(&url, preserved_params).to_string()),
            Err(e) => {
                warn!("Keeping legacy history key as is: {}", e);
                Identity(key.clone())
            }
        };

        if history.contains(&identity) {
            warn!("Dropping legacy history entry {}, already recorded as {}", key, identity);
            continue;
        }

        history.upsert(HistoryRecord {
            identity,
            last_price,
            last_seen: DateTime::<Utc>::UNIX_EPOCH,
        });
    }

    Ok(history)
}

pub(crate) fn render_document(history: &History) -> Result<String, serde_json::Error> {
    let entries: BTreeMap<&str, StoredRecord> = history
        .iter()
        .map(|r| {
            (
                r.identity.as_str(),
                StoredRecord {
                    last_price: r.last_price,
                    last_seen: r.last_seen,
                },
            )
        })
        .collect();

    let mut body = serde_json::to_string_pretty(&entries)?;
    body.push('\n');
    Ok(body)
}
