//! Side (Buy / Sell) of an order.

use std::fmt;

/// Order side: Buy or Sell.
///
/// On the wire (tag 54) these are `'1'` and `'2'`.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Side {
    Buy,
    Sell,
}

impl Side {
    /// FIX code for this side.
    pub fn code(self) -> &'static str {
        match self {
            Side::Buy => "1",
            Side::Sell => "2",
        }
    }

    /// Parse a FIX side code (`"1"` / `"2"`).
    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "1" => Some(Side::Buy),
            "2" => Some(Side::Sell),
            _ => None,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Buy => f.write_str("Buy"),
            Side::Sell => f.write_str("Sell"),
        }
    }
}
