use once_cell::sync::Lazy;
use regex::Regex;

use super::clean_text;
use crate::models::Price;

static PRICE_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\d[\d.,]*\d|\d")
        .expect("Invalid price regex")
});

/// Extract a price from scraped text such as `"C $1,299.99"`, `"£51.77"`,
/// `"$98 - $148"` or `"C $20.00 Approx US $14.60"`.
///
/// Text after `Approx` wins (eBay's converted price), ranges keep their lower
/// bound and currency markers are ignored. Both `1,299.99` and `1.299,99`
/// digit groupings are understood.
pub fn parse_price(text: &str) -> Option<Price> {
    let text = clean_text(text);

    let text = match text.split_once("Approx") {
        Some((_, converted)) => converted,
        None => text.as_str(),
    };

    // Ranges keep their lower bound
    let lower = text.split(['-', '–']).next()?;

    let raw = PRICE_REGEX.find(lower)?.as_str();
    normalize_number(raw).parse().ok()
}

/// Turn a grouped number into a plain decimal literal.
fn normalize_number(raw: &str) -> String {
    match raw.rfind([',', '.']) {
        Some(pos) if raw[pos..].starts_with(',') && raw.len() - pos - 1 <= 2 => {
            raw.replace('.', "").replace(',', ".")
        }
        Some(pos) if raw[pos..].starts_with('.') && raw.matches('.').count() > 1 => {
            // 1.299.000 style grouping without decimals
            raw.replace(['.', ','], "")
        }
        _ => raw.replace(',', ""),
    }
}
