pub mod identity;
pub mod item;
pub mod price;
pub mod site;

pub use identity::*;
pub use item::*;
pub use price::*;
pub use site::*;

// Emoji used in alert messages
pub const EMOJI_ALERT: &str = "🚨";
pub const EMOJI_PRICE: &str = "💰";
pub const EMOJI_DROP: &str = "📉";
pub const EMOJI_RISE: &str = "📈";
pub const EMOJI_LINK: &str = "🔗";

/// Label used when a tracked item has none.
pub const DEFAULT_LABEL: &str = "Unknown Item";
