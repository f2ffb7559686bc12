use chrono::Utc;
use serde_json::{json, Value};

use crate::models::{AlertEvent, Direction, EMOJI_DROP, EMOJI_LINK, EMOJI_PRICE, EMOJI_RISE};

const COLOR_DROP: u32 = 0x2E_CC_71;
const COLOR_RISE: u32 = 0xE7_4C_3C;

/// Discord embeds reject titles longer than this.
const MAX_TITLE_LEN: usize = 256;

pub fn create_embed(event: &AlertEvent) -> Value {
    let (emoji, color) = match event.direction() {
        Direction::Drop => (EMOJI_DROP, COLOR_DROP),
        Direction::Rise => (EMOJI_RISE, COLOR_RISE),
    };

    json!({
        "title": truncate_title(&event.label),
        "url": event.url,
        "color": color,
        "fields": [
            {
                "name": format!("{} Old price:", EMOJI_PRICE),
                "value": format!("~~{}~~", event.old_price),
                "inline": true
            },
            {
                "name": format!("{} New price:", EMOJI_PRICE),
                "value": format!("**{}**", event.new_price),
                "inline": true
            },
            {
                "name": format!("{} Change:", emoji),
                "value": format_change(event),
                "inline": true
            },
            {
                "name": format!("{} Link:", EMOJI_LINK),
                "value": event.url,
                "inline": false
            }
        ],
        "footer": {
            "text": format!("Detected: {}", Utc::now().format("%Y-%m-%d %H:%M:%S UTC"))
        }
    })
}

fn format_change(event: &AlertEvent) -> String {
    let Some(delta) = event.old_price.delta_to(&event.new_price) else {
        return format!("{} -> {}", event.old_price, event.new_price);
    };
    let sign = if delta.is_sign_positive() && !delta.is_zero() { "+" } else { "" };

    match event.old_price.percent_change_to(&event.new_price) {
        Some(percent) => format!("{}{} ({}{:.2}%)", sign, delta, sign, percent),
        None => format!("{}{}", sign, delta),
    }
}

fn truncate_title(label: &str) -> String {
    if label.chars().count() <= MAX_TITLE_LEN {
        return label.to_string();
    }
    let cut: String = label.chars().take(MAX_TITLE_LEN - 3).collect();
    format!("{}...", cut)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Identity, Price};
    use rust_decimal::Decimal;
    use pretty_assertions::assert_eq;

    fn event(old: &str, new: &str) -> AlertEvent {
        AlertEvent {
            identity: Identity::from("https://www.ebay.ca/itm/1"),
            label: "Vintage jacket".into(),
            old_price: old.parse().unwrap(),
            new_price: new.parse().unwrap(),
            url: "https://www.ebay.ca/itm/1".into(),
        }
    }

    #[test]
    fn drop_embed_fields() {
        let embed = create_embed(&event("10.00", "8.50"));

        assert_eq!(embed["title"], "Vintage jacket");
        assert_eq!(embed["url"], "https://www.ebay.ca/itm/1");
        assert_eq!(embed["color"], COLOR_DROP);
        assert_eq!(embed["fields"][0]["value"], "~~10.00~~");
        assert_eq!(embed["fields"][1]["value"], "**8.50**");
        assert_eq!(embed["fields"][2]["value"], "-1.50 (-15.00%)");
    }

    #[test]
    fn rise_embed_has_sign_and_color() {
        let embed = create_embed(&event("20", "25"));
        assert_eq!(embed["color"], COLOR_RISE);
        assert_eq!(embed["fields"][2]["value"], "+5 (+25.00%)");
    }

    #[test]
    fn rise_from_zero_has_no_percentage() {
        let embed = create_embed(&event("0", "4.99"));
        assert_eq!(embed["fields"][2]["value"], "+4.99");
    }

    #[test]
    fn out_of_range_change_still_renders() {
        let embed = create_embed(&event("0.0000000001", "79000000000000000000"));
        let change = embed["fields"][2]["value"].as_str().unwrap();
        assert!(change.starts_with("+7"));
        assert!(!change.contains('%'));

        let mut extreme = event("1", "2");
        extreme.old_price = Price(Decimal::MIN);
        extreme.new_price = Price(Decimal::MAX);
        let embed = create_embed(&extreme);
        assert_eq!(
            embed["fields"][2]["value"],
            format!("{} -> {}", Decimal::MIN, Decimal::MAX)
        );
    }

    #[test]
    fn long_titles_are_truncated() {
        let title = truncate_title(&"x".repeat(300));
        assert_eq!(title.chars().count(), MAX_TITLE_LEN);
        assert!(title.ends_with("..."));
    }
}
