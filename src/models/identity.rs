use serde::{Deserialize, Serialize};
use std::fmt;
use url::Url;

use crate::error::ValidationError;

// NewType pattern for type safety
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Identity(pub String);

impl Identity {
    /// Identity of a product URL: the canonical URL rendered as a string.
    pub fn from_url(url: &Url, preserved_params: &[String]) -> Self {
        Identity(canonical_url(url, preserved_params).to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for Identity {
    fn from(value: &str) -> Self {
        Identity(value.to_string())
    }
}

/// Parse a configured URL, accepting only http and https.
pub fn parse_http_url(raw: &str) -> Result<Url, ValidationError> {
    let trimmed = raw.trim();
    let url = Url::parse(trimmed).map_err(|e| ValidationError::InvalidUrl {
        url: trimmed.to_string(),
        reason: e.to_string(),
    })?;

    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(ValidationError::UnsupportedScheme {
            url: trimmed.to_string(),
            scheme: other.to_string(),
        }),
    }
}

/// Strip the volatile parts of a product URL.
///
/// Referral links append tracking parameters (`?ref=...`, `?_trkparms=...`)
/// that change between visits, so the fragment and every query parameter
/// not listed in `preserved_params` are dropped. Preserved parameters are
/// sorted so their order in the source link does not matter. A trailing
/// slash on a non-root path is removed. Host case and default ports are
/// already normalized by the URL parser.
pub fn canonical_url(url: &Url, preserved_params: &[String]) -> Url {
    let mut canonical = url.clone();
    canonical.set_fragment(None);

    let mut kept: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(key, _)| preserved_params.iter().any(|p| p == key.as_ref()))
        .map(|(key, value)| (key.into_owned(), value.into_owned()))
        .collect();
    kept.sort();

    if kept.is_empty() {
        canonical.set_query(None);
    } else {
        canonical.query_pairs_mut().clear().extend_pairs(&kept);
    }

    let path = canonical.path().to_string();
    if path.len() > 1 && path.ends_with('/') {
        canonical.set_path(path.trim_end_matches('/'));
    }

    canonical
}
