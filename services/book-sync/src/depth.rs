//! Checksummed depth views
//!
//! A `DepthView` is an owned copy of the top levels of both sides, tagged
//! with the sequence of the last message applied and a SHA-256 checksum of
//! its content. Two markets fed the same data produce the same checksum,
//! which makes it cheap to compare a resynchronized book against a reference
//! or against the exchange's own depth.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use types::ids::MarketId;

use crate::book_side::PriceLevel;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DepthView {
    pub market: MarketId,
    /// Bid levels in descending rate order (best first).
    pub bids: Vec<PriceLevel>,
    /// Ask levels in ascending rate order (best first).
    pub asks: Vec<PriceLevel>,
    /// Sequence of the last snapshot or delta applied.
    pub last_sequence: u64,
    pub checksum: String,
}

impl DepthView {
    pub fn new(
        market: MarketId,
        bids: Vec<PriceLevel>,
        asks: Vec<PriceLevel>,
        last_sequence: u64,
    ) -> Self {
        let checksum = compute_checksum(&bids, &asks, last_sequence);
        Self {
            market,
            bids,
            asks,
            last_sequence,
            checksum,
        }
    }

    /// Check that the checksum matches the content.
    pub fn verify(&self) -> bool {
        self.checksum == compute_checksum(&self.bids, &self.asks, self.last_sequence)
    }
}

/// SHA-256 over `rate:quantity|` per level, sides separated by `---`,
/// followed by the sequence in little-endian bytes.
pub fn compute_checksum(bids: &[PriceLevel], asks: &[PriceLevel], sequence: u64) -> String {
    let mut hasher = Sha256::new();

    for side in [bids, asks] {
        for level in side {
            hasher.update(level.rate.to_string().as_bytes());
            hasher.update(b":");
            hasher.update(level.quantity.to_string().as_bytes());
            hasher.update(b"|");
        }
        hasher.update(b"---");
    }

    hasher.update(sequence.to_le_bytes());

    format!("{:x}", hasher.finalize())
}
