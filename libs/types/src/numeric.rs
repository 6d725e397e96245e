//! Fixed-point decimal types for prices and quantities
//!
//! Uses rust_decimal for deterministic arithmetic (no floating-point errors).
//! Both types hash and compare by numeric value, so `1.50` and `1.5` name the
//! same price level.

use std::fmt;
use std::ops::Add;
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::errors::TypeError;

/// A strictly positive price (exchange "rate")
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "Decimal", into = "Decimal")]
pub struct Price(Decimal);

impl Price {
    /// Create a price, rejecting zero and negative values
    pub fn try_new(value: Decimal) -> Result<Self, TypeError> {
        if value > Decimal::ZERO {
            Ok(Self(value.normalize()))
        } else {
            Err(TypeError::InvalidPrice(value.to_string()))
        }
    }

    /// Create a price from a whole number
    ///
    /// # Panics
    /// Panics on zero
    pub fn from_u64(value: u64) -> Self {
        assert!(value > 0, "Price must be positive");
        Self(Decimal::from(value))
    }

    /// Get the inner decimal value
    pub fn as_decimal(&self) -> Decimal {
        self.0
    }
}

impl FromStr for Price {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value = Decimal::from_str(s).map_err(|e| TypeError::InvalidPrice(e.to_string()))?;
        Self::try_new(value)
    }
}

impl TryFrom<Decimal> for Price {
    type Error = TypeError;

    fn try_from(value: Decimal) -> Result<Self, Self::Error> {
        Self::try_new(value)
    }
}

impl From<Price> for Decimal {
    fn from(price: Price) -> Self {
        price.0
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A non-negative quantity
///
/// Zero is a legal value: upstream feeds occasionally report a level at zero
/// without removing it, and the book keeps what it is told.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "Decimal", into = "Decimal")]
pub struct Quantity(Decimal);

impl Quantity {
    pub const ZERO: Quantity = Quantity(Decimal::ZERO);

    /// Create a quantity, rejecting negative values
    pub fn try_new(value: Decimal) -> Result<Self, TypeError> {
        if value >= Decimal::ZERO {
            Ok(Self(value.normalize()))
        } else {
            Err(TypeError::InvalidQuantity(value.to_string()))
        }
    }

    /// Create a quantity from a whole number
    pub fn from_u64(value: u64) -> Self {
        Self(Decimal::from(value))
    }

    /// Get the inner decimal value
    pub fn as_decimal(&self) -> Decimal {
        self.0
    }

    /// Check whether the quantity is zero
    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }
}

impl Add for Quantity {
    type Output = Quantity;

    fn add(self, rhs: Quantity) -> Quantity {
        // Sum of two non-negative values stays non-negative
        Quantity(self.0 + rhs.0)
    }
}

impl FromStr for Quantity {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value =
            Decimal::from_str(s).map_err(|e| TypeError::InvalidQuantity(e.to_string()))?;
        Self::try_new(value)
    }
}

impl TryFrom<Decimal> for Quantity {
    type Error = TypeError;

    fn try_from(value: Decimal) -> Result<Self, Self::Error> {
        Self::try_new(value)
    }
}

impl From<Quantity> for Decimal {
    fn from(quantity: Quantity) -> Self {
        quantity.0
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_price_rejects_non_positive() {
        assert!(Price::try_new(Decimal::ZERO).is_err());
        assert!(Price::try_new(Decimal::from(-1)).is_err());
        assert!(Price::try_new(Decimal::from(1)).is_ok());
    }

    #[test]
    fn test_price_equal_by_value() {
        let a = Price::from_str("0.0500").unwrap();
        let b = Price::from_str("0.05").unwrap();
        assert_eq!(a, b);
        assert_eq!(a.to_string(), "0.05");
    }

    #[test]
    fn test_quantity_allows_zero() {
        let q = Quantity::from_str("0").unwrap();
        assert!(q.is_zero());
        assert!(Quantity::from_str("-0.1").is_err());
    }

    #[test]
    fn test_quantity_add() {
        let total = Quantity::from_str("1.25").unwrap() + Quantity::from_u64(2);
        assert_eq!(total, Quantity::from_str("3.25").unwrap());
    }

    #[test]
    fn test_deserialize_from_number_and_string() {
        let p: Price = serde_json::from_str("0.01234").unwrap();
        assert_eq!(p, Price::from_str("0.01234").unwrap());

        let q: Quantity = serde_json::from_str("\"12.5\"").unwrap();
        assert_eq!(q, Quantity::from_str("12.5").unwrap());

        assert!(serde_json::from_str::<Price>("0").is_err());
        assert!(serde_json::from_str::<Quantity>("-3").is_err());
    }

    proptest! {
        #[test]
        fn prop_price_order_matches_decimal(a in 1u64..1_000_000, b in 1u64..1_000_000) {
            let pa = Price::from_u64(a);
            let pb = Price::from_u64(b);
            prop_assert_eq!(pa.cmp(&pb), a.cmp(&b));
        }
    }
}
