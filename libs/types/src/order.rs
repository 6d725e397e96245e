//! Order type of an executed fill
//!
//! Fills on an exchange feed carry the taker's order type. The wire
//! representation is the upper-case word used by the exchange.

use serde::{Deserialize, Serialize};

/// Order side (buyer or seller)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Side {
    /// Buy order (lifts an ask)
    BUY,
    /// Sell order (hits a bid)
    SELL,
}
