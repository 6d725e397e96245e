//! Upstream message shapes
//!
//! Snapshots and deltas arrive as JSON using the exchange's field names
//! (`Nounce`, `Buys`, `Sells`, `Fills`). They are decoded straight into the
//! typed values used by the book:
//!
//! - level entries become a tagged `LevelUpdate` (wire `Type == 1` is a
//!   removal, anything else an upsert);
//! - fill records accept the price under either `Rate` (streamed fills) or
//!   `Price` (historical fills in a snapshot);
//! - timestamps without an offset are read as UTC.
//!
//! A message missing `Buys` or `Sells` decodes with `None` there and is
//! treated as malformed by the book.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use types::numeric::{Price, Quantity};
use types::order::Side;

use crate::error::SyncError;

/// Wire value of `Type` marking a removal.
const ENTRY_TYPE_REMOVE: u8 = 1;
const ENTRY_TYPE_ADD: u8 = 0;

/// A single change to one price level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawLevelUpdate", into = "RawLevelUpdate")]
pub enum LevelUpdate {
    Upsert { rate: Price, quantity: Quantity },
    Remove { rate: Price },
}

impl LevelUpdate {
    pub fn upsert(rate: Price, quantity: Quantity) -> Self {
        LevelUpdate::Upsert { rate, quantity }
    }

    pub fn remove(rate: Price) -> Self {
        LevelUpdate::Remove { rate }
    }

    pub fn rate(&self) -> Price {
        match self {
            LevelUpdate::Upsert { rate, .. } | LevelUpdate::Remove { rate } => *rate,
        }
    }

    pub fn is_removal(&self) -> bool {
        matches!(self, LevelUpdate::Remove { .. })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct RawLevelUpdate {
    #[serde(rename = "Type", default)]
    kind: u8,
    #[serde(rename = "Rate")]
    rate: Price,
    #[serde(rename = "Quantity", default)]
    quantity: Option<Quantity>,
}

impl TryFrom<RawLevelUpdate> for LevelUpdate {
    type Error = String;

    fn try_from(raw: RawLevelUpdate) -> Result<Self, Self::Error> {
        if raw.kind == ENTRY_TYPE_REMOVE {
            return Ok(LevelUpdate::Remove { rate: raw.rate });
        }
        match raw.quantity {
            Some(quantity) => Ok(LevelUpdate::Upsert {
                rate: raw.rate,
                quantity,
            }),
            None => Err(format!("entry at rate {} has no quantity", raw.rate)),
        }
    }
}

impl From<LevelUpdate> for RawLevelUpdate {
    fn from(update: LevelUpdate) -> Self {
        match update {
            LevelUpdate::Upsert { rate, quantity } => RawLevelUpdate {
                kind: ENTRY_TYPE_ADD,
                rate,
                quantity: Some(quantity),
            },
            LevelUpdate::Remove { rate } => RawLevelUpdate {
                kind: ENTRY_TYPE_REMOVE,
                rate,
                quantity: Some(Quantity::ZERO),
            },
        }
    }
}

/// A fill as reported by the exchange, streamed or historical.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FillRecord {
    #[serde(rename = "OrderType")]
    pub order_type: Side,
    #[serde(rename = "Quantity")]
    pub quantity: Quantity,
    #[serde(rename = "Rate", alias = "Price")]
    pub rate: Price,
    #[serde(rename = "TimeStamp", with = "exchange_time")]
    pub timestamp: DateTime<Utc>,
}

impl FillRecord {
    pub fn new(order_type: Side, quantity: Quantity, rate: Price, timestamp: DateTime<Utc>) -> Self {
        Self {
            order_type,
            quantity,
            rate,
            timestamp,
        }
    }
}

/// Incremental book update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeltaMessage {
    #[serde(rename = "MarketName", default, skip_serializing_if = "Option::is_none")]
    pub market_name: Option<String>,
    #[serde(rename = "Nounce")]
    pub sequence: u64,
    #[serde(rename = "Buys")]
    pub buys: Option<Vec<LevelUpdate>>,
    #[serde(rename = "Sells")]
    pub sells: Option<Vec<LevelUpdate>>,
    #[serde(rename = "Fills", default)]
    pub fills: Vec<FillRecord>,
}

impl DeltaMessage {
    pub fn new(
        sequence: u64,
        buys: Vec<LevelUpdate>,
        sells: Vec<LevelUpdate>,
        fills: Vec<FillRecord>,
    ) -> Self {
        Self {
            market_name: None,
            sequence,
            buys: Some(buys),
            sells: Some(sells),
            fills,
        }
    }

    pub fn from_json(json: &str) -> Result<Self, SyncError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Both entry collections present.
    pub fn is_well_formed(&self) -> bool {
        self.buys.is_some() && self.sells.is_some()
    }

    /// Total buy and sell entries.
    pub fn entry_count(&self) -> usize {
        self.buys.as_ref().map_or(0, Vec::len) + self.sells.as_ref().map_or(0, Vec::len)
    }
}

/// Full book state with recent fill history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarketSnapshot {
    #[serde(rename = "MarketName", default, skip_serializing_if = "Option::is_none")]
    pub market_name: Option<String>,
    #[serde(rename = "Nounce")]
    pub sequence: u64,
    #[serde(rename = "Buys")]
    pub buys: Option<Vec<LevelUpdate>>,
    #[serde(rename = "Sells")]
    pub sells: Option<Vec<LevelUpdate>>,
    #[serde(rename = "Fills", default)]
    pub fills: Vec<FillRecord>,
}

impl MarketSnapshot {
    pub fn new(
        sequence: u64,
        buys: Vec<LevelUpdate>,
        sells: Vec<LevelUpdate>,
        fills: Vec<FillRecord>,
    ) -> Self {
        Self {
            market_name: None,
            sequence,
            buys: Some(buys),
            sells: Some(sells),
            fills,
        }
    }

    pub fn from_json(json: &str) -> Result<Self, SyncError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn is_well_formed(&self) -> bool {
        self.buys.is_some() && self.sells.is_some()
    }
}

/// Exchange timestamps: RFC 3339, or naive ISO 8601 meaning UTC.
pub(crate) mod exchange_time {
    use chrono::{DateTime, NaiveDateTime, SecondsFormat, TimeZone, Utc};
    use serde::{de, Deserialize, Deserializer, Serializer};

    const NAIVE_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f";

    pub fn parse(s: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
        match DateTime::parse_from_rfc3339(s) {
            Ok(dt) => Ok(dt.with_timezone(&Utc)),
            Err(_) => {
                let naive = NaiveDateTime::parse_from_str(s, NAIVE_FORMAT)?;
                Ok(Utc.from_utc_datetime(&naive))
            }
        }
    }

    pub fn serialize<S>(value: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&value.to_rfc3339_opts(SecondsFormat::AutoSi, true))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        parse(&s).map_err(|e| de::Error::custom(format!("invalid timestamp {s:?}: {e}")))
    }
}
