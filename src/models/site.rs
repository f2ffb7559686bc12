use serde::{Deserialize, Serialize};
use std::fmt;

/// Shops with a dedicated price fetcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Site {
    Ebay,
    ToScrape,
    Aritzia,
    Zara,
}

impl Site {
    pub const ALL: [Site; 4] = [Site::Ebay, Site::ToScrape, Site::Aritzia, Site::Zara];

    pub fn key(&self) -> &'static str {
        match self {
            Site::Ebay => "ebay",
            Site::ToScrape => "toscrape",
            Site::Aritzia => "aritzia",
            Site::Zara => "zara",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        match key {
            "ebay" => Some(Site::Ebay),
            "toscrape" => Some(Site::ToScrape),
            "aritzia" => Some(Site::Aritzia),
            "zara" => Some(Site::Zara),
            _ => None,
        }
    }

    /// Detect the shop from a host name by its labels, so `www.ebay.ca` and
    /// `ebay.co.uk` match while `notebay.com` does not.
    pub fn from_host(host: &str) -> Option<Self> {
        host.to_ascii_lowercase()
            .split('.')
            .find_map(Site::from_key)
    }
}

impl fmt::Display for Site {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}
