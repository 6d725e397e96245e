//! Error taxonomy for the synchronization core
//!
//! Ordering and duplication anomalies in the feed (stale deltas, malformed
//! messages, removal of absent levels) are absorbed and counted, never
//! raised. Only conditions the caller must act on surface here.

use thiserror::Error;

use crate::book_side::BookSide;

/// A subscriber refused or failed to take an event.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("delivery to subscriber failed: {reason}")]
pub struct DeliveryError {
    pub reason: String,
}

impl DeliveryError {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

/// Errors surfaced by `Market` and its components.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SyncError {
    /// Deltas kept arriving while no snapshot was applied. The snapshot
    /// fetch is stuck and the caller has to resubscribe.
    #[error("pending delta queue full: capacity {capacity}, rejected sequence {sequence}")]
    PendingQueueOverflow { capacity: usize, sequence: u64 },

    #[error(transparent)]
    Delivery(#[from] DeliveryError),

    #[error("{side} book inconsistent: {detail}")]
    InvariantViolation { side: BookSide, detail: String },

    #[error("failed to decode message: {0}")]
    Decode(String),
}

impl From<serde_json::Error> for SyncError {
    fn from(err: serde_json::Error) -> Self {
        SyncError::Decode(err.to_string())
    }
}
