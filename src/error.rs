//! Error kinds for the monitor.
//!
//! Each kind maps to one recovery rule: fetch failures become absent
//! observations, validation failures skip one entry, persistence failures
//! abort the run and notification failures are only logged.

use std::path::PathBuf;
use thiserror::Error;

/// A single item could not be priced.
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("HTTP error {status} for {url}")]
    Status {
        url: String,
        status: reqwest::StatusCode,
    },

    #[error("invalid selector: {0}")]
    InvalidSelector(String),
}

/// A configuration entry or observation is malformed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("observation #{index} has no identity")]
    MissingIdentity { index: usize },

    #[error("tracked item {label:?} has no URL")]
    MissingUrl { label: String },

    #[error("invalid URL {url:?}: {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("unsupported URL scheme {scheme:?} in {url:?}")]
    UnsupportedScheme { url: String, scheme: String },

    #[error("duplicate tracked item {identity}")]
    DuplicateIdentity { identity: String },
}

/// The history could not be read or written.
#[derive(Error, Debug)]
pub enum PersistenceError {
    #[error("failed to read history from {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to write history to {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("history file {path} is corrupt: {source}")]
    Corrupt {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("invalid stored price {value:?} for {identity}")]
    InvalidPrice { identity: String, value: String },

    #[error("invalid stored timestamp {value:?} for {identity}")]
    InvalidTimestamp { identity: String, value: String },

    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),
}

/// An alert could not be delivered.
#[derive(Error, Debug)]
pub enum NotificationError {
    #[error("failed to send webhook: {0}")]
    Http(#[from] reqwest::Error),

    #[error("webhook rejected alert with status {status}: {body}")]
    Rejected {
        status: reqwest::StatusCode,
        body: String,
    },
}

/// Failures that end a run.
#[derive(Error, Debug)]
pub enum MonitorError {
    #[error(transparent)]
    Persistence(#[from] PersistenceError),

    #[error(transparent)]
    Validation(#[from] ValidationError),
}
