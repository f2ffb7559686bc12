use async_trait::async_trait;

use crate::error::PersistenceError;
use crate::models::History;

mod json;
mod sqlite;
pub use json::JsonFileStore;
pub use sqlite::SqliteStore;

/// Durable mapping from identity to last known price.
#[async_trait]
pub trait HistoryStore: Send + Sync {
    /// Missing storage is an empty history, not an error.
    async fn load(&self) -> Result<History, PersistenceError>;

    /// Replace the stored history as a whole.
    async fn save(&self, history: &History) -> Result<(), PersistenceError>;
}
