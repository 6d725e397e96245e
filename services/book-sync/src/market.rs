//! Market synchronization controller
//!
//! A `Market` owns the book for one instrument and keeps it in step with
//! the exchange feed:
//!
//! ```text
//!   on_delta ──► uninitialized? ──yes──► pending queue
//!                     │no                     │
//!                     ▼                       │ drained by on_snapshot
//!               apply to sides ◄──────────────┘ (stale ones dropped)
//!                     │
//!            BookUpdated + fills ──► Dispatcher ──► subscribers
//! ```
//!
//! The market starts uninitialized. The first snapshot initializes it for
//! good; later snapshots (after a reconnect) replace the book again and
//! replay any fills missed in between. `Ready` fires once, on the first
//! snapshot.
//!
//! Delivery failures never interrupt synchronization: the book is always
//! brought fully up to date and the first delivery error is returned once
//! the call has finished. A fill batch that failed to deliver does not move
//! the fill watermark, so the next snapshot offers it again.

use std::collections::VecDeque;

use rust_decimal::Decimal;
use serde::Serialize;
use tracing::{debug, error, info, warn};
use types::ids::MarketId;

use crate::book_side::{ApplySummary, BookSide, OrderBookSide, PriceLevel};
use crate::config::MarketConfig;
use crate::depth::DepthView;
use crate::dispatch::{Dispatcher, OutputMode, Subscriber, SubscriptionId};
use crate::error::SyncError;
use crate::events::{Fill, MarketEvent};
use crate::fills::FillReplayTracker;
use crate::messages::{DeltaMessage, LevelUpdate, MarketSnapshot};

/// Whether a snapshot has been applied yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SyncState {
    Uninitialized,
    Initialized,
}

/// What `on_delta` did with a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeltaOutcome {
    /// Applied to the book; `book_updated` is false for an entry-less message.
    Applied { book_updated: bool, fills: usize },
    /// Held until the first snapshot.
    Buffered { pending: usize },
    /// Missing its entry collections: book untouched, never buffered.
    /// Fills it carried are still published once the market is initialized.
    Malformed { fills: usize },
}

/// What `on_snapshot` did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SnapshotOutcome {
    /// Buffered deltas applied on top of the snapshot.
    pub replayed_deltas: usize,
    /// Buffered deltas dropped as older than the snapshot.
    pub stale_deltas: usize,
    /// Historical fills published because they were newer than the watermark.
    pub missed_fills: usize,
    /// This snapshot made the market ready.
    pub became_ready: bool,
}

/// Running counters for a market.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SyncStats {
    pub snapshots_applied: u64,
    pub deltas_applied: u64,
    pub deltas_buffered: u64,
    pub stale_deltas_discarded: u64,
    pub malformed_ignored: u64,
    pub absent_removals: u64,
    pub fills_published: u64,
}

/// Synchronized book for one instrument.
#[derive(Debug)]
pub struct Market {
    market: MarketId,
    config: MarketConfig,
    state: SyncState,
    ready: bool,
    bids: OrderBookSide,
    asks: OrderBookSide,
    pending: VecDeque<DeltaMessage>,
    fill_tracker: FillReplayTracker,
    dispatcher: Dispatcher,
    last_sequence: Option<u64>,
    stats: SyncStats,
}

impl Market {
    pub fn new(market: MarketId, config: MarketConfig) -> Self {
        info!(
            market = %market,
            output_mode = ?config.output_mode,
            max_pending_deltas = config.max_pending_deltas,
            "Market created"
        );

        Self {
            dispatcher: Dispatcher::new(market.clone(), config.output_mode),
            fill_tracker: FillReplayTracker::new(config.output_mode),
            market,
            state: SyncState::Uninitialized,
            ready: false,
            bids: OrderBookSide::new(BookSide::Bid),
            asks: OrderBookSide::new(BookSide::Ask),
            pending: VecDeque::new(),
            last_sequence: None,
            stats: SyncStats::default(),
            config,
        }
    }

    /// Create a market with default configuration.
    pub fn with_defaults(market: MarketId) -> Self {
        Self::new(market, MarketConfig::default())
    }

    /// Apply a full snapshot, replay buffered deltas and missed fills.
    pub fn on_snapshot(&mut self, snapshot: MarketSnapshot) -> Result<SnapshotOutcome, SyncError> {
        info!(
            market = %self.market,
            sequence = snapshot.sequence,
            pending = self.pending.len(),
            historical_fills = snapshot.fills.len(),
            "Applying snapshot"
        );

        let mut first_error = None;
        let mut outcome = SnapshotOutcome::default();

        match (&snapshot.buys, &snapshot.sells) {
            (Some(buys), Some(sells)) => {
                self.bids.clear();
                self.asks.clear();
                let updated = self.apply_levels(buys, sells);
                if updated {
                    keep_first(&mut first_error, self.emit(MarketEvent::BookUpdated));
                }
            }
            _ => {
                self.stats.malformed_ignored += 1;
                warn!(
                    market = %self.market,
                    sequence = snapshot.sequence,
                    "Snapshot without entry collections, book left unchanged"
                );
            }
        }

        self.state = SyncState::Initialized;
        self.last_sequence = Some(snapshot.sequence);
        self.stats.snapshots_applied += 1;

        for delta in std::mem::take(&mut self.pending) {
            if delta.sequence >= snapshot.sequence {
                outcome.replayed_deltas += 1;
                keep_first(&mut first_error, self.apply_delta(&delta));
            } else {
                outcome.stale_deltas += 1;
                self.stats.stale_deltas_discarded += 1;
                debug!(
                    market = %self.market,
                    sequence = delta.sequence,
                    snapshot_sequence = snapshot.sequence,
                    "Discarding stale buffered delta"
                );
            }
        }

        match self
            .fill_tracker
            .reconcile(&snapshot.fills, &mut self.dispatcher)
        {
            Ok(missed) => {
                outcome.missed_fills = missed;
                self.stats.fills_published += missed as u64;
            }
            Err(err) => keep_first(&mut first_error, Err::<(), _>(err)),
        }

        if !self.ready {
            self.ready = true;
            outcome.became_ready = true;
            info!(market = %self.market, sequence = snapshot.sequence, "Market ready");
            keep_first(&mut first_error, self.emit(MarketEvent::Ready));
        }

        match first_error {
            Some(err) => Err(err),
            None => Ok(outcome),
        }
    }

    /// Handle an incremental update.
    ///
    /// Buffers until the first snapshot; fails with `PendingQueueOverflow`
    /// when the buffer is full.
    pub fn on_delta(&mut self, delta: DeltaMessage) -> Result<DeltaOutcome, SyncError> {
        if !delta.is_well_formed() {
            self.stats.malformed_ignored += 1;
            debug!(
                market = %self.market,
                sequence = delta.sequence,
                "Delta without entry collections"
            );
            if self.state == SyncState::Uninitialized {
                return Ok(DeltaOutcome::Malformed { fills: 0 });
            }
            let fills = self.publish_fills(&delta)?;
            return Ok(DeltaOutcome::Malformed { fills });
        }

        match self.state {
            SyncState::Uninitialized => {
                let capacity = self.config.max_pending_deltas;
                if self.pending.len() >= capacity {
                    error!(
                        market = %self.market,
                        capacity,
                        sequence = delta.sequence,
                        "Pending delta queue full, snapshot never arrived"
                    );
                    return Err(SyncError::PendingQueueOverflow {
                        capacity,
                        sequence: delta.sequence,
                    });
                }

                self.pending.push_back(delta);
                self.stats.deltas_buffered += 1;
                debug!(
                    market = %self.market,
                    pending = self.pending.len(),
                    "Delta buffered until snapshot"
                );
                Ok(DeltaOutcome::Buffered {
                    pending: self.pending.len(),
                })
            }
            SyncState::Initialized => self.apply_delta(&delta),
        }
    }

    /// Apply a well-formed delta to an initialized book.
    fn apply_delta(&mut self, delta: &DeltaMessage) -> Result<DeltaOutcome, SyncError> {
        let buys = delta.buys.as_deref().unwrap_or_default();
        let sells = delta.sells.as_deref().unwrap_or_default();

        let book_updated = self.apply_levels(buys, sells);
        self.last_sequence = Some(delta.sequence);
        self.stats.deltas_applied += 1;

        let mut first_error = None;
        if book_updated {
            keep_first(&mut first_error, self.emit(MarketEvent::BookUpdated));
        }
        let fills = match self.publish_fills(delta) {
            Ok(n) => n,
            Err(err) => {
                keep_first(&mut first_error, Err::<(), _>(err));
                0
            }
        };

        match first_error {
            Some(err) => Err(err),
            None => Ok(DeltaOutcome::Applied {
                book_updated,
                fills,
            }),
        }
    }

    /// Apply entries to both sides; true if any entry was present.
    fn apply_levels(&mut self, buys: &[LevelUpdate], sells: &[LevelUpdate]) -> bool {
        let mut summary = self.bids.apply_entries(buys);
        summary.merge(self.asks.apply_entries(sells));
        self.record(summary);

        debug_assert!(self.bids.check_invariants().is_ok());
        debug_assert!(self.asks.check_invariants().is_ok());

        !buys.is_empty() || !sells.is_empty()
    }

    fn record(&mut self, summary: ApplySummary) {
        if summary.absent_removals > 0 {
            debug!(
                market = %self.market,
                absent = summary.absent_removals,
                "Ignored removal of absent levels"
            );
        }
        self.stats.absent_removals += summary.absent_removals as u64;
    }

    fn publish_fills(&mut self, delta: &DeltaMessage) -> Result<usize, SyncError> {
        let published = self
            .fill_tracker
            .publish(&delta.fills, &mut self.dispatcher)?;
        self.stats.fills_published += published as u64;
        Ok(published)
    }

    fn emit(&mut self, event: MarketEvent) -> Result<(), SyncError> {
        Ok(self.dispatcher.emit(event)?)
    }

    // ── Subscribers ────────────────────────────────────────────────

    pub fn subscribe(&mut self, subscriber: Box<dyn Subscriber>) -> SubscriptionId {
        self.dispatcher.subscribe(subscriber)
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.dispatcher.unsubscribe(id)
    }

    /// Take fill batches held while no subscriber was attached (replay mode).
    pub fn drain_replay(&mut self) -> Vec<Vec<Fill>> {
        self.dispatcher.drain_replay()
    }

    pub fn replay_queue_len(&self) -> usize {
        self.dispatcher.replay_queue_len()
    }

    // ── Book reads ─────────────────────────────────────────────────

    /// Bid levels, highest rate first.
    pub fn bids(&self) -> &[PriceLevel] {
        self.bids.levels()
    }

    /// Ask levels, lowest rate first.
    pub fn asks(&self) -> &[PriceLevel] {
        self.asks.levels()
    }

    pub fn side(&self, side: BookSide) -> &OrderBookSide {
        match side {
            BookSide::Bid => &self.bids,
            BookSide::Ask => &self.asks,
        }
    }

    pub fn best_bid(&self) -> Option<PriceLevel> {
        self.bids.best().copied()
    }

    pub fn best_ask(&self) -> Option<PriceLevel> {
        self.asks.best().copied()
    }

    /// Best ask minus best bid.
    pub fn spread(&self) -> Option<Decimal> {
        match (self.best_bid(), self.best_ask()) {
            (Some(bid), Some(ask)) => Some(ask.rate.as_decimal() - bid.rate.as_decimal()),
            _ => None,
        }
    }

    /// Average of best bid and best ask.
    pub fn mid_price(&self) -> Option<Decimal> {
        match (self.best_bid(), self.best_ask()) {
            (Some(bid), Some(ask)) => {
                Some((bid.rate.as_decimal() + ask.rate.as_decimal()) / Decimal::from(2))
            }
            _ => None,
        }
    }

    /// Top `checksum_depth` levels per side with a checksum.
    pub fn depth_view(&self) -> DepthView {
        let depth = self.config.checksum_depth;
        DepthView::new(
            self.market.clone(),
            self.bids.depth(depth).to_vec(),
            self.asks.depth(depth).to_vec(),
            self.last_sequence.unwrap_or(0),
        )
    }

    /// Verify both sides are sorted and index-consistent.
    pub fn check_invariants(&self) -> Result<(), SyncError> {
        self.bids.check_invariants()?;
        self.asks.check_invariants()
    }

    // ── State ──────────────────────────────────────────────────────

    pub fn market_id(&self) -> &MarketId {
        &self.market
    }

    pub fn config(&self) -> &MarketConfig {
        &self.config
    }

    pub fn output_mode(&self) -> OutputMode {
        self.dispatcher.mode()
    }

    pub fn state(&self) -> SyncState {
        self.state
    }

    pub fn is_initialized(&self) -> bool {
        self.state == SyncState::Initialized
    }

    pub fn is_ready(&self) -> bool {
        self.ready
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    pub fn last_sequence(&self) -> Option<u64> {
        self.last_sequence
    }

    pub fn last_fill_time(&self) -> Option<chrono::DateTime<chrono::Utc>> {
        self.fill_tracker.last_fill_time()
    }

    pub fn stats(&self) -> SyncStats {
        self.stats
    }
}

/// Remember the first error of a sequence of fallible steps.
fn keep_first<T>(slot: &mut Option<SyncError>, result: Result<T, SyncError>) {
    if let Err(err) = result {
        slot.get_or_insert(err);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DeliveryError;
    use crate::messages::FillRecord;
    use chrono::{DateTime, Duration, TimeZone, Utc};
    use std::cell::RefCell;
    use std::rc::Rc;
    use types::numeric::{Price, Quantity};
    use types::order::Side;

    type Log = Rc<RefCell<Vec<MarketEvent>>>;

    fn p(v: u64) -> Price {
        Price::from_u64(v)
    }

    fn q(v: u64) -> Quantity {
        Quantity::from_u64(v)
    }

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2021, 6, 1, 0, 0, 0).unwrap() + Duration::seconds(secs)
    }

    fn fill(rate: u64, secs: i64) -> FillRecord {
        FillRecord::new(Side::SELL, q(1), p(rate), at(secs))
    }

    fn market_with_log(config: MarketConfig) -> (Market, Log) {
        let log: Log = Default::default();
        let sink = Rc::clone(&log);
        let mut market = Market::new(MarketId::new("BTC-LTC"), config);
        market.subscribe(Box::new(
            move |_: &MarketId, event: &MarketEvent| -> Result<(), DeliveryError> {
                sink.borrow_mut().push(event.clone());
                Ok(())
            },
        ));
        (market, log)
    }

    fn snapshot(sequence: u64) -> MarketSnapshot {
        MarketSnapshot::new(
            sequence,
            vec![LevelUpdate::upsert(p(99), q(1))],
            vec![LevelUpdate::upsert(p(101), q(1))],
            vec![],
        )
    }

    /// Delta that sets the ask at `sequence + 1000` so its effect is visible.
    fn marker_delta(sequence: u64) -> DeltaMessage {
        DeltaMessage::new(
            sequence,
            vec![],
            vec![LevelUpdate::upsert(p(1000 + sequence), q(1))],
            vec![],
        )
    }

    fn count(log: &Log, label: &str) -> usize {
        log.borrow().iter().filter(|e| e.label() == label).count()
    }

    #[test]
    fn test_deltas_buffer_until_snapshot() {
        let (mut market, log) = market_with_log(MarketConfig::default());

        let outcome = market.on_delta(marker_delta(5)).unwrap();

        assert_eq!(outcome, DeltaOutcome::Buffered { pending: 1 });
        assert!(!market.is_initialized());
        assert!(market.asks().is_empty());
        assert!(log.borrow().is_empty());
    }

    #[test]
    fn test_snapshot_replay_boundary_is_inclusive() {
        let (mut market, _log) = market_with_log(MarketConfig::default());
        for seq in [9, 11, 10] {
            market.on_delta(marker_delta(seq)).unwrap();
        }

        let outcome = market.on_snapshot(snapshot(10)).unwrap();

        assert_eq!(outcome.replayed_deltas, 2);
        assert_eq!(outcome.stale_deltas, 1);
        assert_eq!(market.pending_len(), 0);
        assert!(market.side(BookSide::Ask).contains(p(1011)));
        assert!(market.side(BookSide::Ask).contains(p(1010)));
        assert!(!market.side(BookSide::Ask).contains(p(1009)));
        // Applied in arrival order: 11 then 10
        assert_eq!(market.last_sequence(), Some(10));
        assert_eq!(market.stats().stale_deltas_discarded, 1);
    }

    #[test]
    fn test_ready_emitted_once() {
        let (mut market, log) = market_with_log(MarketConfig::default());

        assert!(market.on_snapshot(snapshot(1)).unwrap().became_ready);
        assert!(!market.on_snapshot(snapshot(2)).unwrap().became_ready);

        assert!(market.is_ready());
        assert_eq!(count(&log, "ready"), 1);
    }

    #[test]
    fn test_snapshot_replaces_book() {
        let (mut market, _log) = market_with_log(MarketConfig::default());
        market.on_snapshot(snapshot(1)).unwrap();
        market.on_delta(marker_delta(2)).unwrap();

        market
            .on_snapshot(MarketSnapshot::new(
                3,
                vec![LevelUpdate::upsert(p(98), q(4))],
                vec![LevelUpdate::upsert(p(102), q(5))],
                vec![],
            ))
            .unwrap();

        assert_eq!(market.bids(), &[PriceLevel::new(p(98), q(4))]);
        assert_eq!(market.asks(), &[PriceLevel::new(p(102), q(5))]);
    }

    #[test]
    fn test_live_delta_updates_book_and_publishes_fills() {
        let (mut market, log) = market_with_log(MarketConfig::default());
        market.on_snapshot(snapshot(1)).unwrap();
        log.borrow_mut().clear();

        let outcome = market
            .on_delta(DeltaMessage::new(
                2,
                vec![LevelUpdate::remove(p(99)), LevelUpdate::upsert(p(100), q(2))],
                vec![],
                vec![fill(101, 1), fill(101, 2)],
            ))
            .unwrap();

        assert_eq!(
            outcome,
            DeltaOutcome::Applied {
                book_updated: true,
                fills: 2
            }
        );
        assert_eq!(market.bids(), &[PriceLevel::new(p(100), q(2))]);
        assert_eq!(market.last_fill_time(), Some(at(2)));
        assert_eq!(
            log.borrow().iter().map(|e| e.label()).collect::<Vec<_>>(),
            vec!["orderbookUpdated", "fills"]
        );
    }

    #[test]
    fn test_empty_delta_emits_nothing() {
        let (mut market, log) = market_with_log(MarketConfig::default());
        market.on_snapshot(snapshot(1)).unwrap();
        log.borrow_mut().clear();

        let outcome = market
            .on_delta(DeltaMessage::new(2, vec![], vec![], vec![]))
            .unwrap();

        assert_eq!(
            outcome,
            DeltaOutcome::Applied {
                book_updated: false,
                fills: 0
            }
        );
        assert!(log.borrow().is_empty());
    }

    #[test]
    fn test_malformed_delta_never_buffered() {
        let (mut market, _log) = market_with_log(MarketConfig::default());
        let mut delta = marker_delta(5);
        delta.sells = None;

        assert_eq!(
            market.on_delta(delta).unwrap(),
            DeltaOutcome::Malformed { fills: 0 }
        );
        assert_eq!(market.pending_len(), 0);

        market.on_snapshot(snapshot(1)).unwrap();
        assert_eq!(market.asks().len(), 1);
        assert_eq!(market.stats().malformed_ignored, 1);
    }

    #[test]
    fn test_malformed_delta_leaves_book_but_publishes_fills() {
        let (mut market, log) = market_with_log(MarketConfig::default());
        market.on_snapshot(snapshot(1)).unwrap();
        let before = market.depth_view();
        log.borrow_mut().clear();

        let mut delta = DeltaMessage::new(2, vec![], vec![], vec![fill(100, 3)]);
        delta.buys = None;
        delta.sells = None;

        assert_eq!(
            market.on_delta(delta).unwrap(),
            DeltaOutcome::Malformed { fills: 1 }
        );
        assert_eq!(market.depth_view(), before);
        assert_eq!(count(&log, "orderbookUpdated"), 0);
        assert_eq!(count(&log, "fills"), 1);
    }

    #[test]
    fn test_pending_queue_overflow() {
        let config = MarketConfig::default().with_max_pending_deltas(2);
        let (mut market, _log) = market_with_log(config);

        market.on_delta(marker_delta(1)).unwrap();
        market.on_delta(marker_delta(2)).unwrap();
        let err = market.on_delta(marker_delta(3)).unwrap_err();

        assert_eq!(
            err,
            SyncError::PendingQueueOverflow {
                capacity: 2,
                sequence: 3
            }
        );
        assert_eq!(market.pending_len(), 2);
    }

    #[test]
    fn test_reconnect_replays_only_missed_fills() {
        let (mut market, log) = market_with_log(MarketConfig::default());
        market.on_snapshot(snapshot(1)).unwrap();
        market
            .on_delta(DeltaMessage::new(2, vec![], vec![], vec![fill(100, 10)]))
            .unwrap();
        log.borrow_mut().clear();

        let mut reconnect = snapshot(50);
        reconnect.fills = vec![fill(103, 30), fill(102, 20), fill(100, 10), fill(99, 5)];
        let outcome = market.on_snapshot(reconnect).unwrap();

        assert_eq!(outcome.missed_fills, 2);
        let events = log.borrow();
        let replayed: Vec<Price> = events
            .iter()
            .find_map(|e| match e {
                MarketEvent::Fills(batch) => Some(batch.iter().map(|f| f.rate).collect()),
                _ => None,
            })
            .unwrap();
        assert_eq!(replayed, vec![p(103), p(102)]);
    }

    #[test]
    fn test_live_first_snapshot_does_not_replay_history() {
        let (mut market, log) = market_with_log(MarketConfig::default());
        let mut first = snapshot(1);
        first.fills = vec![fill(100, 1)];

        assert_eq!(market.on_snapshot(first).unwrap().missed_fills, 0);
        assert_eq!(count(&log, "fills"), 0);
    }

    #[test]
    fn test_replay_mode_delivers_history_to_attached_subscriber() {
        let config = MarketConfig::default().with_output_mode(OutputMode::Replay);
        let (mut market, log) = market_with_log(config);
        let mut first = snapshot(1);
        first.fills = vec![fill(100, 1), fill(101, 2)];

        let outcome = market.on_snapshot(first).unwrap();
        market
            .on_delta(DeltaMessage::new(2, vec![], vec![], vec![fill(102, 3)]))
            .unwrap();

        assert_eq!(outcome.missed_fills, 2);
        assert_eq!(count(&log, "fills"), 2);
        assert_eq!(market.replay_queue_len(), 0);
        assert_eq!(market.output_mode(), OutputMode::Replay);
    }

    #[test]
    fn test_replay_mode_late_subscriber_gets_held_history() {
        let config = MarketConfig::default().with_output_mode(OutputMode::Replay);
        let mut market = Market::new(MarketId::new("BTC-LTC"), config);
        let mut first = snapshot(1);
        first.fills = vec![fill(100, 1), fill(101, 2)];
        market.on_snapshot(first).unwrap();
        market
            .on_delta(DeltaMessage::new(2, vec![], vec![], vec![fill(102, 3)]))
            .unwrap();
        assert_eq!(market.replay_queue_len(), 2);

        let batches: Rc<RefCell<Vec<Vec<Fill>>>> = Default::default();
        let sink = Rc::clone(&batches);
        market.subscribe(Box::new(
            move |_: &MarketId, event: &MarketEvent| -> Result<(), DeliveryError> {
                if let MarketEvent::Fills(batch) = event {
                    sink.borrow_mut().push(batch.clone());
                }
                Ok(())
            },
        ));

        let rates: Vec<Vec<Price>> = batches
            .borrow()
            .iter()
            .map(|batch| batch.iter().map(|f| f.rate).collect())
            .collect();
        assert_eq!(rates, vec![vec![p(100), p(101)], vec![p(102)]]);
        assert_eq!(market.replay_queue_len(), 0);
        assert_eq!(market.last_fill_time(), Some(at(3)));
    }

    #[test]
    fn test_replay_mode_drain_without_subscriber() {
        let config = MarketConfig::default().with_output_mode(OutputMode::Replay);
        let mut market = Market::new(MarketId::new("BTC-LTC"), config);
        let mut first = snapshot(1);
        first.fills = vec![fill(100, 1), fill(101, 2)];
        market.on_snapshot(first).unwrap();

        let held = market.drain_replay();

        assert_eq!(held.len(), 1);
        assert_eq!(held[0].len(), 2);
        assert_eq!(market.replay_queue_len(), 0);
    }

    #[test]
    fn test_delivery_failure_still_syncs_book() {
        let mut market = Market::with_defaults(MarketId::new("BTC-LTC"));
        market.on_snapshot(snapshot(1)).unwrap();
        market.subscribe(Box::new(
            |_: &MarketId, _: &MarketEvent| -> Result<(), DeliveryError> {
                Err(DeliveryError::new("gone"))
            },
        ));

        let result = market.on_delta(DeltaMessage::new(
            2,
            vec![LevelUpdate::upsert(p(100), q(1))],
            vec![],
            vec![fill(100, 4)],
        ));

        assert!(matches!(result, Err(SyncError::Delivery(_))));
        assert_eq!(market.best_bid().map(|l| l.rate), Some(p(100)));
        assert_eq!(market.last_fill_time(), None);
    }

    #[test]
    fn test_top_of_book() {
        let (mut market, _log) = market_with_log(MarketConfig::default());
        assert!(market.spread().is_none());

        market.on_snapshot(snapshot(1)).unwrap();

        assert_eq!(market.spread(), Some(Decimal::from(2)));
        assert_eq!(market.mid_price(), Some(Decimal::from(100)));
        market.check_invariants().unwrap();
    }
}
