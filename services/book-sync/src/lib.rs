//! Book Synchronization Service
//!
//! Keeps a local mirror of an exchange order book in step with the
//! exchange's snapshot + delta feed, and republishes trade fills without
//! gaps or duplicates across reconnects:
//! - Sorted bid/ask sides with O(1) lookup by rate
//! - Delta buffering until the first snapshot, with sequence-based replay
//! - Fill watermark and missed-fill reconciliation on resnapshot
//! - Live delivery or ordered replay queue for fills
//! - Checksummed depth views for comparing books
//!
//! # Architecture
//!
//! ```text
//!   Exchange feed (snapshot / delta)
//!        │
//!   ┌────▼────┐
//!   │ Market  │  ← buffers, replays, applies
//!   └─┬─────┬─┘
//!     │     │
//! ┌───▼──┐ ┌▼──────────┐
//! │Sides │ │FillTracker│
//! └──────┘ └─────┬─────┘
//!                │
//!        ┌───────▼────────┐
//!        │   Dispatcher   │  ← live or replay queue
//!        └───────┬────────┘
//!                ▼
//!           Subscribers
//! ```

pub mod book_side;
pub mod config;
pub mod depth;
pub mod dispatch;
pub mod error;
pub mod events;
pub mod fills;
pub mod market;
pub mod messages;

pub use book_side::{BookSide, OrderBookSide, PriceLevel};
pub use config::MarketConfig;
pub use dispatch::{OutputMode, Subscriber, SubscriptionId};
pub use error::{DeliveryError, SyncError};
pub use events::{Fill, MarketEvent};
pub use market::{DeltaOutcome, Market, SnapshotOutcome, SyncState, SyncStats};
pub use messages::{DeltaMessage, FillRecord, LevelUpdate, MarketSnapshot};

// Library version
pub const SERVICE_VERSION: &str = "0.1.0";
