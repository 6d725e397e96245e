//! Events produced by a synchronized market
//!
//! Downstream consumers see three things: a one-time `Ready`, a payload-free
//! `BookUpdated` whenever levels changed, and non-empty batches of `Fill`s in
//! the canonical outbound shape.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use types::numeric::{Price, Quantity};
use types::order::Side;

use crate::messages::FillRecord;

/// A trade execution as published to subscribers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Fill {
    pub order_type: Side,
    pub quantity: Quantity,
    pub rate: Price,
    pub date_time: DateTime<Utc>,
}

impl From<&FillRecord> for Fill {
    fn from(record: &FillRecord) -> Self {
        Self {
            order_type: record.order_type,
            quantity: record.quantity,
            rate: record.rate,
            date_time: record.timestamp,
        }
    }
}

/// Event emitted by a `Market`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "camelCase")]
pub enum MarketEvent {
    /// The first snapshot has been applied. Emitted once per market.
    Ready,
    /// At least one level changed.
    BookUpdated,
    /// Fills in arrival order; never empty.
    Fills(Vec<Fill>),
}

impl MarketEvent {
    /// Get the event type as a string label for logging.
    pub fn label(&self) -> &'static str {
        match self {
            MarketEvent::Ready => "ready",
            MarketEvent::BookUpdated => "orderbookUpdated",
            MarketEvent::Fills(_) => "fills",
        }
    }
}
