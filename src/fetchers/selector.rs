use async_trait::async_trait;
use reqwest::Client;
use scraper::{Html, Selector};
use tracing::debug;
use url::Url;

use crate::error::FetchError;
use crate::fetchers::PriceFetcher;
use crate::models::Price;
use crate::parsers::{clean_text, parse_price};
use crate::utils::http::fetch_page;

const EBAY_SELECTORS: &[&str] = &[
    "div.x-price-primary",
    "span#prcIsum",
    "div.main-price-with-shipping",
];

const TOSCRAPE_SELECTORS: &[&str] = &["p.price_color"];

const ARITZIA_SELECTORS: &[&str] = &[
    r#"[data-testid="product-list-price-text"]"#,
    r#"[data-testid="product-price-text"]"#,
];

/// Reads the price from the first element matched by an ordered list of CSS
/// selectors.
pub struct SelectorFetcher {
    client: Client,
    attempts: u32,
    selectors: Vec<Selector>,
    strip_query: bool,
}

impl SelectorFetcher {
    pub fn new(client: Client, attempts: u32, selectors: &[&str]) -> Result<Self, FetchError> {
        let selectors = selectors
            .iter()
            .map(|s| {
                Selector::parse(s)
                    .map_err(|e| FetchError::InvalidSelector(format!("{}: {:?}", s, e)))
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            client,
            attempts,
            selectors,
            strip_query: false,
        })
    }

    /// Fetch the page without its query string.
    pub fn strip_query(mut self) -> Self {
        self.strip_query = true;
        self
    }

    pub fn ebay(client: Client, attempts: u32) -> Result<Self, FetchError> {
        Self::new(client, attempts, EBAY_SELECTORS).map(Self::strip_query)
    }

    pub fn toscrape(client: Client, attempts: u32) -> Result<Self, FetchError> {
        Self::new(client, attempts, TOSCRAPE_SELECTORS)
    }

    pub fn aritzia(client: Client, attempts: u32) -> Result<Self, FetchError> {
        Self::new(client, attempts, ARITZIA_SELECTORS)
    }

    pub fn extract_price(&self, html: &str) -> Option<Price> {
        let document = Html::parse_document(html);

        let element = self
            .selectors
            .iter()
            .find_map(|selector| document.select(selector).next())?;

        let text = clean_text(&element.text().collect::<String>());
        debug!("Found raw price text: {}", text);
        parse_price(&text)
    }
}

#[async_trait]
impl PriceFetcher for SelectorFetcher {
    async fn fetch_price(&self, url: &Url) -> Result<Option<Price>, FetchError> {
        let mut target = url.clone();
        if self.strip_query {
            target.set_query(None);
        }

        let html = fetch_page(&self.client, target.as_str(), self.attempts).await?;
        Ok(self.extract_price(&html))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn price(fetcher: &SelectorFetcher, html: &str) -> Option<String> {
        fetcher.extract_price(html).map(|p| p.to_string())
    }

    #[test]
    fn ebay_falls_back_through_selectors() {
        let fetcher = SelectorFetcher::ebay(Client::new(), 1).unwrap();
        let primary = r#"<div class="x-price-primary"><span>C $1,020.50/ea</span></div>"#;
        let legacy = r#"<span id="prcIsum">US $12.99</span>"#;
        let shipping = r#"<div class="main-price-with-shipping">C $20.00 Approx US $14.60</div>"#;

        assert_eq!(price(&fetcher, primary), Some("1020.50".into()));
        assert_eq!(price(&fetcher, legacy), Some("12.99".into()));
        assert_eq!(price(&fetcher, shipping), Some("14.60".into()));
        assert_eq!(price(&fetcher, "<p>gone</p>"), None);
    }

    #[test]
    fn toscrape_price_color() {
        let fetcher = SelectorFetcher::toscrape(Client::new(), 1).unwrap();
        let html = r#"<div class="product_main"><h1>A Light in the Attic</h1>
            <p class="price_color">£51.77</p></div>"#;
        assert_eq!(price(&fetcher, html), Some("51.77".into()));
    }

    #[test]
    fn aritzia_prefers_list_price() {
        let fetcher = SelectorFetcher::aritzia(Client::new(), 1).unwrap();
        let html = r#"
            <span data-testid="product-price-text">$148</span>
            <span data-testid="product-list-price-text">$98 - $148</span>"#;
        assert_eq!(price(&fetcher, html), Some("98".into()));
    }

    #[test]
    fn invalid_selector_is_rejected() {
        assert!(matches!(
            SelectorFetcher::new(Client::new(), 1, &["p[["]),
            Err(FetchError::InvalidSelector(_))
        ));
    }
}
