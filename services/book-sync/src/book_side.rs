//! One side of the price book
//!
//! Keeps two structures per side:
//! - a `Vec<PriceLevel>` sorted best-first (ascending for asks, descending
//!   for bids), which is what readers consume;
//! - a `HashMap<Price, Quantity>` for O(1) membership and lookup.
//!
//! Every mutation goes through `upsert` or `remove`, which update both in
//! the same call. `check_invariants` verifies the correspondence.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use types::numeric::{Price, Quantity};

use crate::error::SyncError;
use crate::messages::LevelUpdate;

/// Which half of the book.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum BookSide {
    Bid,
    Ask,
}

impl BookSide {
    /// Order two rates best-first for this side.
    pub fn compare(&self, a: &Price, b: &Price) -> Ordering {
        match self {
            BookSide::Ask => a.cmp(b),
            BookSide::Bid => b.cmp(a),
        }
    }
}

impl fmt::Display for BookSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BookSide::Bid => f.write_str("BID"),
            BookSide::Ask => f.write_str("ASK"),
        }
    }
}

/// A resting (rate, quantity) pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceLevel {
    pub rate: Price,
    pub quantity: Quantity,
}

impl PriceLevel {
    pub fn new(rate: Price, quantity: Quantity) -> Self {
        Self { rate, quantity }
    }
}

/// Counts from one `apply_entries` call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ApplySummary {
    pub upserts: usize,
    pub removals: usize,
    /// Removal entries naming a rate that was not in the book.
    pub absent_removals: usize,
}

impl ApplySummary {
    pub fn merge(&mut self, other: ApplySummary) {
        self.upserts += other.upserts;
        self.removals += other.removals;
        self.absent_removals += other.absent_removals;
    }
}

/// Sorted price levels for a single side with a rate index.
#[derive(Debug, Clone)]
pub struct OrderBookSide {
    side: BookSide,
    levels: Vec<PriceLevel>,
    index: HashMap<Price, Quantity>,
}

impl OrderBookSide {
    pub fn new(side: BookSide) -> Self {
        Self {
            side,
            levels: Vec::new(),
            index: HashMap::new(),
        }
    }

    pub fn side(&self) -> BookSide {
        self.side
    }

    /// Binary search for `rate` using the side's ordering.
    ///
    /// `Ok(i)` when the level sits at `i`, `Err(i)` with the index where it
    /// would be inserted.
    pub fn locate(&self, rate: Price) -> Result<usize, usize> {
        self.levels
            .binary_search_by(|level| self.side.compare(&level.rate, &rate))
    }

    /// Insert a new level or replace the quantity of an existing one.
    ///
    /// A zero quantity is stored as given; only `remove` deletes a level.
    pub fn upsert(&mut self, rate: Price, quantity: Quantity) {
        let keyed = self.index.contains_key(&rate);
        match self.locate(rate) {
            Ok(i) => {
                debug_assert!(keyed, "rate {rate} in sequence but not in index");
                self.levels[i].quantity = quantity;
            }
            Err(i) => {
                debug_assert!(!keyed, "rate {rate} in index but not in sequence");
                self.levels.insert(i, PriceLevel::new(rate, quantity));
            }
        }
        self.index.insert(rate, quantity);
    }

    /// Remove the level at `rate`, returning its quantity.
    ///
    /// Removing an absent rate leaves the side untouched and returns `None`.
    pub fn remove(&mut self, rate: Price) -> Option<Quantity> {
        let quantity = self.index.remove(&rate)?;
        if let Ok(i) = self.locate(rate) {
            self.levels.remove(i);
        }
        Some(quantity)
    }

    /// Apply entries in arrival order.
    pub fn apply_entries(&mut self, entries: &[LevelUpdate]) -> ApplySummary {
        let mut summary = ApplySummary::default();
        for entry in entries {
            match *entry {
                LevelUpdate::Upsert { rate, quantity } => {
                    self.upsert(rate, quantity);
                    summary.upserts += 1;
                }
                LevelUpdate::Remove { rate } => match self.remove(rate) {
                    Some(_) => summary.removals += 1,
                    None => summary.absent_removals += 1,
                },
            }
        }
        summary
    }

    /// Drop every level.
    pub fn clear(&mut self) {
        self.levels.clear();
        self.index.clear();
    }

    /// All levels, best first.
    pub fn levels(&self) -> &[PriceLevel] {
        &self.levels
    }

    /// The best `n` levels (fewer if the side is shallower).
    pub fn depth(&self, n: usize) -> &[PriceLevel] {
        &self.levels[..n.min(self.levels.len())]
    }

    pub fn best(&self) -> Option<&PriceLevel> {
        self.levels.first()
    }

    pub fn quantity_at(&self, rate: Price) -> Option<Quantity> {
        self.index.get(&rate).copied()
    }

    pub fn contains(&self, rate: Price) -> bool {
        self.index.contains_key(&rate)
    }

    pub fn len(&self) -> usize {
        self.levels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }

    /// Sum of quantities across all levels.
    pub fn total_quantity(&self) -> Quantity {
        self.levels
            .iter()
            .fold(Quantity::ZERO, |acc, level| acc + level.quantity)
    }

    /// Verify ordering and sequence/index correspondence.
    pub fn check_invariants(&self) -> Result<(), SyncError> {
        for (i, pair) in self.levels.windows(2).enumerate() {
            if self.side.compare(&pair[0].rate, &pair[1].rate) != Ordering::Less {
                return Err(self.violation(format!(
                    "levels out of order at index {}: {} then {}",
                    i, pair[0].rate, pair[1].rate
                )));
            }
        }

        if self.levels.len() != self.index.len() {
            return Err(self.violation(format!(
                "{} levels but {} indexed rates",
                self.levels.len(),
                self.index.len()
            )));
        }

        for level in &self.levels {
            match self.index.get(&level.rate) {
                Some(q) if *q == level.quantity => {}
                Some(q) => {
                    return Err(self.violation(format!(
                        "rate {} holds {} but index says {}",
                        level.rate, level.quantity, q
                    )))
                }
                None => {
                    return Err(self.violation(format!("rate {} not indexed", level.rate)))
                }
            }
        }

        Ok(())
    }

    fn violation(&self, detail: String) -> SyncError {
        SyncError::InvariantViolation {
            side: self.side,
            detail,
        }
    }
}
