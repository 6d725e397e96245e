//! Identifier types for tradable instruments
//!
//! A market is named by its currency pair. Exchanges disagree on the
//! separator, so both `BASE/QUOTE` and the dash form `BTC-LTC` are accepted.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::errors::TypeError;

const SEPARATORS: [char; 2] = ['/', '-'];

/// Unique identifier for a market (currency pair)
///
/// Format: two currency codes joined by `/` or `-` (e.g., "BTC/USDT", "BTC-LTC")
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct MarketId(String);

impl MarketId {
    /// Create a new MarketId from a string
    ///
    /// # Panics
    /// Panics if the format is invalid (must contain a separator)
    pub fn new(symbol: impl Into<String>) -> Self {
        let s = symbol.into();
        assert!(is_pair(&s), "MarketId must be a currency pair");
        Self(s)
    }

    /// Try to create a MarketId, rejecting anything that is not a pair
    pub fn try_new(symbol: impl Into<String>) -> Result<Self, TypeError> {
        let s = symbol.into();
        if is_pair(&s) {
            Ok(Self(s))
        } else {
            Err(TypeError::InvalidMarket { symbol: s })
        }
    }

    /// Get the symbol string
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Split into the two currency codes, in the order they are written
    pub fn currencies(&self) -> (&str, &str) {
        // is_pair guarantees exactly one separator with text on both sides
        self.0
            .split_once(&SEPARATORS[..])
            .unwrap_or((self.0.as_str(), ""))
    }
}

fn is_pair(s: &str) -> bool {
    match s.split_once(&SEPARATORS[..]) {
        Some((left, right)) => {
            !left.is_empty() && !right.is_empty() && !right.contains(&SEPARATORS[..])
        }
        None => false,
    }
}

impl fmt::Display for MarketId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<String> for MarketId {
    type Error = TypeError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::try_new(s)
    }
}

impl From<MarketId> for String {
    fn from(id: MarketId) -> Self {
        id.0
    }
}

impl From<&str> for MarketId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_market_id_creation() {
        let market = MarketId::new("BTC/USDT");
        assert_eq!(market.as_str(), "BTC/USDT");
        assert_eq!(market.currencies(), ("BTC", "USDT"));
    }

    #[test]
    fn test_market_id_dash_separator() {
        let market = MarketId::new("BTC-LTC");
        assert_eq!(market.currencies(), ("BTC", "LTC"));
    }

    #[test]
    fn test_market_id_try_new() {
        assert!(MarketId::try_new("BTC/USDT").is_ok());
        assert!(MarketId::try_new("INVALID").is_err());
        assert!(MarketId::try_new("BTC-").is_err());
        assert!(MarketId::try_new("A-B-C").is_err());
    }

    #[test]
    #[should_panic(expected = "MarketId must be a currency pair")]
    fn test_market_id_invalid_format() {
        MarketId::new("INVALID");
    }

    #[test]
    fn test_market_id_serialization() {
        let market = MarketId::new("ETH/USDC");
        let json = serde_json::to_string(&market).unwrap();
        assert_eq!(json, "\"ETH/USDC\"");

        let deserialized: MarketId = serde_json::from_str(&json).unwrap();
        assert_eq!(market, deserialized);

        assert!(serde_json::from_str::<MarketId>("\"ETHUSDC\"").is_err());
    }
}
