use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::Client;
use scraper::{Html, Selector};
use serde_json::Value;
use url::Url;

use crate::error::FetchError;
use crate::fetchers::PriceFetcher;
use crate::models::Price;
use crate::parsers::parse_price;
use crate::utils::http::fetch_page;

static LD_JSON_SELECTOR: Lazy<Selector> = Lazy::new(|| {
    Selector::parse(r#"script[type="application/ld+json"]"#)
        .expect("Invalid ld+json selector")
});

static PRICE_FIELD_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#""price"\s*:\s*"?(\d+(?:\.\d+)?)"#)
        .expect("Invalid price field regex")
});

/// Reads the price from structured data embedded in the page: schema.org
/// `offers` in `application/ld+json` blocks, then any `"price": ...` field
/// in inline scripts.
pub struct JsonLdFetcher {
    client: Client,
    attempts: u32,
}

impl JsonLdFetcher {
    pub fn new(client: Client, attempts: u32) -> Self {
        Self { client, attempts }
    }

    pub fn extract_price(html: &str) -> Option<Price> {
        let document = Html::parse_document(html);

        let structured = document
            .select(&LD_JSON_SELECTOR)
            .filter_map(|script| serde_json::from_str::<Value>(&script.text().collect::<String>()).ok())
            .find_map(|value| find_offer_price(&value));

        structured.or_else(|| {
            PRICE_FIELD_REGEX
                .captures(html)
                .and_then(|c| c.get(1))
                .and_then(|m| m.as_str().parse().ok())
        })
    }
}

#[async_trait]
impl PriceFetcher for JsonLdFetcher {
    async fn fetch_price(&self, url: &Url) -> Result<Option<Price>, FetchError> {
        let html = fetch_page(&self.client, url.as_str(), self.attempts).await?;
        Ok(Self::extract_price(&html))
    }
}

fn find_offer_price(value: &Value) -> Option<Price> {
    match value {
        Value::Object(map) => map
            .get("offers")
            .and_then(offer_price)
            .or_else(|| map.values().find_map(find_offer_price)),
        Value::Array(items) => items.iter().find_map(find_offer_price),
        _ => None,
    }
}

fn offer_price(offers: &Value) -> Option<Price> {
    match offers {
        Value::Array(list) => list.iter().find_map(offer_price),
        Value::Object(map) => map
            .get("price")
            .or_else(|| map.get("lowPrice"))
            .and_then(json_price),
        _ => None,
    }
}

fn json_price(value: &Value) -> Option<Price> {
    match value {
        Value::String(s) => parse_price(s),
        Value::Number(n) => n.to_string().parse().ok(),
        _ => None,
    }
}
