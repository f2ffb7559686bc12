pub mod config;
pub mod discord;
pub mod engine;
pub mod error;
pub mod fetchers;
pub mod models;
pub mod monitor;
pub mod notifier;
pub mod parsers;
pub mod storage;
pub mod tracking;
pub mod utils;

pub use engine::{reconcile, Reconciliation};
pub use error::{FetchError, MonitorError, NotificationError, PersistenceError, ValidationError};
pub use monitor::{Monitor, RunSummary};
