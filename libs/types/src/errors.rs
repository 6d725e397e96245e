//! Error types for shared value types
//!
//! Validation failures raised when constructing prices, quantities and
//! market identifiers from untrusted input.

use thiserror::Error;

/// Value construction errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TypeError {
    #[error("Invalid price: {0}")]
    InvalidPrice(String),

    #[error("Invalid quantity: {0}")]
    InvalidQuantity(String),

    #[error("Invalid market: {symbol}")]
    InvalidMarket { symbol: String },
}
