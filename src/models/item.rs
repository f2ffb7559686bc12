use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::btree_map::{self, BTreeMap};
use url::Url;

use super::{canonical_url, parse_http_url, Identity, Price, DEFAULT_LABEL, EMOJI_ALERT};
use crate::error::ValidationError;
use crate::parsers::clean_text;

/// A product to watch, built from one configuration entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackedItem {
    pub identity: Identity,
    pub source_url: Url,
    pub canonical_url: Url,
    pub label: String,
}

impl TrackedItem {
    pub fn new(
        raw_url: Option<&str>,
        label: Option<&str>,
        preserved_params: &[String],
    ) -> Result<Self, ValidationError> {
        let label = label
            .map(clean_text)
            .filter(|l| !l.is_empty())
            .unwrap_or_else(|| DEFAULT_LABEL.to_string());

        let raw_url = match raw_url.map(str::trim) {
            Some(u) if !u.is_empty() => u,
            _ => return Err(ValidationError::MissingUrl { label }),
        };

        let source_url = parse_http_url(raw_url)?;
        let canonical = canonical_url(&source_url, preserved_params);

        Ok(Self {
            identity: Identity(canonical.to_string()),
            source_url,
            canonical_url: canonical,
            label,
        })
    }
}

/// One price reading. `value == None` means the fetch failed, which is not
/// the same as a price of zero.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PriceObservation {
    pub identity: Identity,
    pub label: String,
    pub url: String,
    pub value: Option<Price>,
    pub observed_at: DateTime<Utc>,
}

impl PriceObservation {
    pub fn resolved(item: &TrackedItem, price: Price, observed_at: DateTime<Utc>) -> Self {
        Self::for_item(item, Some(price), observed_at)
    }

    pub fn absent(item: &TrackedItem, observed_at: DateTime<Utc>) -> Self {
        Self::for_item(item, None, observed_at)
    }

    fn for_item(item: &TrackedItem, value: Option<Price>, observed_at: DateTime<Utc>) -> Self {
        Self {
            identity: item.identity.clone(),
            label: item.label.clone(),
            url: item.canonical_url.to_string(),
            value,
            observed_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryRecord {
    pub identity: Identity,
    pub last_price: Price,
    pub last_seen: DateTime<Utc>,
}

/// Last known price per identity. Each identity appears at most once.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct History {
    records: BTreeMap<Identity, HistoryRecord>,
}

impl History {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, identity: &Identity) -> Option<&HistoryRecord> {
        self.records.get(identity)
    }

    /// Insert or replace the record for its identity.
    pub fn upsert(&mut self, record: HistoryRecord) {
        self.records.insert(record.identity.clone(), record);
    }

    pub fn contains(&self, identity: &Identity) -> bool {
        self.records.contains_key(identity)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Records in identity order.
    pub fn iter(&self) -> btree_map::Values<'_, Identity, HistoryRecord> {
        self.records.values()
    }
}

impl FromIterator<HistoryRecord> for History {
    fn from_iter<I: IntoIterator<Item = HistoryRecord>>(iter: I) -> Self {
        let mut history = History::new();
        for record in iter {
            history.upsert(record);
        }
        history
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Drop,
    Rise,
}

/// A detected price change, handed to a notifier and never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlertEvent {
    pub identity: Identity,
    pub label: String,
    pub old_price: Price,
    pub new_price: Price,
    pub url: String,
}

impl AlertEvent {
    pub fn direction(&self) -> Direction {
        if self.new_price < self.old_price {
            Direction::Drop
        } else {
            Direction::Rise
        }
    }

    pub fn message(&self) -> String {
        format!(
            "{} PRICE CHANGE: {} moved from {} to {}!\nLink: {}",
            EMOJI_ALERT, self.label, self.old_price, self.new_price, self.url
        )
    }
}
