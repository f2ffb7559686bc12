use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};
use std::path::Path;
use tokio::sync::Mutex;
use tracing::info;

use crate::error::PersistenceError;
use crate::models::{History, HistoryRecord, Identity};
use crate::storage::{HistoryStore, JsonFileStore};

/// History kept in an SQLite table. Prices are stored as decimal text so
/// their scale survives.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    pub fn open(db_path: impl AsRef<Path>) -> Result<Self, PersistenceError> {
        Self::with_connection(Connection::open(db_path)?)
    }

    pub fn in_memory() -> Result<Self, PersistenceError> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self, PersistenceError> {
        conn.execute(
            "CREATE TABLE IF NOT EXISTS price_history (
                identity TEXT PRIMARY KEY NOT NULL,
                last_price TEXT NOT NULL,
                last_seen TEXT NOT NULL
            )",
            [],
        )?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Merge a JSON history file into the database. Records already in the
    /// database win. Returns how many records were added.
    pub async fn import_json(&self, source: &JsonFileStore) -> Result<usize, PersistenceError> {
        let incoming = source.load().await?;
        let mut current = self.load().await?;

        let mut added = 0;
        for record in incoming.iter() {
            if !current.contains(&record.identity) {
                current.upsert(record.clone());
                added += 1;
            }
        }

        self.save(&current).await?;
        info!("Imported {} records from {}", added, source.path().display());
        Ok(added)
    }
}

#[async_trait]
impl HistoryStore for SqliteStore {
    async fn load(&self) -> Result<History, PersistenceError> {
        let conn = self.conn.lock().await;

        let mut stmt = conn.prepare(
            "SELECT identity, last_price, last_seen FROM price_history ORDER BY identity",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
            ))
        })?;

        let mut history = History::new();
        for row in rows {
            let (identity, price, seen) = row?;

            let last_price = price.parse().map_err(|_| PersistenceError::InvalidPrice {
                identity: identity.clone(),
                value: price.clone(),
            })?;
            let last_seen = DateTime::parse_from_rfc3339(&seen)
                .map_err(|_| PersistenceError::InvalidTimestamp {
                    identity: identity.clone(),
                    value: seen.clone(),
                })?
                .with_timezone(&Utc);

            history.upsert(HistoryRecord {
                identity: Identity(identity),
                last_price,
                last_seen,
            });
        }

        Ok(history)
    }

    async fn save(&self, history: &History) -> Result<(), PersistenceError> {
        let mut conn = self.conn.lock().await;
        let tx = conn.transaction()?;

        tx.execute("DELETE FROM price_history", [])?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO price_history (identity, last_price, last_seen) VALUES (?1, ?2, ?3)",
            )?;
            for record in history.iter() {
                stmt.execute(params![
                    record.identity.as_str(),
                    record.last_price.to_string(),
                    record.last_seen.to_rfc3339(),
                ])?;
            }
        }

        tx.commit()?;
        Ok(())
    }
}
