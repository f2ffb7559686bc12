//! Input configuration: which products to watch.

use anyhow::{Context, Result};
use std::collections::HashSet;
use std::io::ErrorKind;
use std::path::Path;
use tracing::{info, warn};

use crate::config::ItemConfig;
use crate::error::ValidationError;
use crate::models::TrackedItem;

/// Read `[{"url": ..., "note": ...}]` entries from a JSON tracking file.
/// A missing file yields no entries. Entries of the wrong shape are skipped;
/// only a document that is not a JSON array is an error.
pub async fn read_tracking_file(path: &Path) -> Result<Vec<ItemConfig>> {
    let text = match tokio::fs::read_to_string(path).await {
        Ok(text) => text,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            warn!("{} not found", path.display());
            return Ok(Vec::new());
        }
        Err(e) => {
            return Err(e).with_context(|| format!("Failed to read {}", path.display()));
        }
    };

    let raw: Vec<serde_json::Value> = serde_json::from_str(&text)
        .with_context(|| format!("Invalid tracking list {}", path.display()))?;

    let entries = raw
        .into_iter()
        .enumerate()
        .filter_map(|(index, value)| match serde_json::from_value::<ItemConfig>(value) {
            Ok(entry) => Some(entry),
            Err(e) => {
                warn!("Skipping entry #{} of {}: {}", index, path.display(), e);
                None
            }
        })
        .collect();

    Ok(entries)
}

/// Validate entries into tracked items, in order.
///
/// Invalid entries and entries repeating an earlier identity are skipped
/// with a warning; the rest are kept.
pub fn build_items(entries: &[ItemConfig], preserved_params: &[String]) -> Vec<TrackedItem> {
    let mut seen = HashSet::new();
    let mut items = Vec::with_capacity(entries.len());

    for entry in entries {
        let item = match TrackedItem::new(
            entry.url.as_deref(),
            entry.label.as_deref(),
            preserved_params,
        ) {
            Ok(item) => item,
            Err(e) => {
                warn!("Skipping tracked item: {}", e);
                continue;
            }
        };

        if !seen.insert(item.identity.clone()) {
            let e = ValidationError::DuplicateIdentity {
                identity: item.identity.to_string(),
            };
            warn!("Skipping tracked item: {}", e);
            continue;
        }

        items.push(item);
    }

    info!("Tracking {} items", items.len());
    items
}

/// Inline `items` followed by the tracking file, validated.
pub async fn load_items(
    inline: &[ItemConfig],
    tracking_path: Option<&Path>,
    preserved_params: &[String],
) -> Result<Vec<TrackedItem>> {
    let mut entries = inline.to_vec();
    if let Some(path) = tracking_path {
        entries.extend(read_tracking_file(path).await?);
    }
    Ok(build_items(&entries, preserved_params))
}
