use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A price in the currency of the page it was read from.
///
/// Equality is numeric: `10.0` equals `10.00`. Display keeps the scale the
/// price was parsed or stored with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Price(#[serde(with = "rust_decimal::serde::str")] pub Decimal);

impl Price {
    pub fn value(&self) -> Decimal {
        self.0
    }

    /// Difference `new - self`, or `None` if it does not fit a `Decimal`.
    pub fn delta_to(&self, new: &Price) -> Option<Decimal> {
        new.0.checked_sub(self.0)
    }

    /// Percentage change from `self` to `new`. `None` when `self` is zero or
    /// the result overflows.
    pub fn percent_change_to(&self, new: &Price) -> Option<Decimal> {
        if self.0.is_zero() {
            return None;
        }
        self.delta_to(new)?
            .checked_div(self.0)?
            .checked_mul(Decimal::ONE_HUNDRED)
            .map(|p| p.round_dp(2))
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Decimal> for Price {
    fn from(value: Decimal) -> Self {
        Price(value)
    }
}

impl FromStr for Price {
    type Err = rust_decimal::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Decimal::from_str(s.trim())
            .or_else(|_| Decimal::from_scientific(s.trim()))
            .map(Price)
    }
}
