//! Event delivery for a market
//!
//! Subscribers register with a `Dispatcher` and receive every event for the
//! market they are attached to. The output mode is fixed when the dispatcher
//! is built:
//!
//! - `Live`: every event goes straight to the subscribers. With nobody
//!   attached, events are dropped.
//! - `Replay`: events go straight to the subscribers too, but fill batches
//!   emitted while nobody is attached are held in an ordered queue. The next
//!   subscriber receives the held batches oldest first as it registers, so a
//!   reconstructed history is never lost to a late consumer. `drain_replay`
//!   hands the held batches back instead.
//!
//! Every batch is offered to each subscriber once. A subscriber that fails
//! is reported to the caller; the batch is not queued again.

use std::collections::VecDeque;
use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use types::ids::MarketId;

use crate::error::DeliveryError;
use crate::events::{Fill, MarketEvent};

/// How fills leave the market.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputMode {
    #[default]
    Live,
    Replay,
}

/// Receives events from a market.
pub trait Subscriber {
    fn on_event(&mut self, market: &MarketId, event: &MarketEvent) -> Result<(), DeliveryError>;
}

impl<F> Subscriber for F
where
    F: FnMut(&MarketId, &MarketEvent) -> Result<(), DeliveryError>,
{
    fn on_event(&mut self, market: &MarketId, event: &MarketEvent) -> Result<(), DeliveryError> {
        self(market, event)
    }
}

/// Handle returned by `Dispatcher::subscribe`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

/// Routes events to subscribers according to the output mode.
pub struct Dispatcher {
    market: MarketId,
    mode: OutputMode,
    subscribers: Vec<(SubscriptionId, Box<dyn Subscriber>)>,
    next_id: u64,
    replay_queue: VecDeque<Vec<Fill>>,
}

impl Dispatcher {
    pub fn new(market: MarketId, mode: OutputMode) -> Self {
        Self {
            market,
            mode,
            subscribers: Vec::new(),
            next_id: 0,
            replay_queue: VecDeque::new(),
        }
    }

    pub fn mode(&self) -> OutputMode {
        self.mode
    }

    /// Register a subscriber.
    ///
    /// Fill batches held in replay mode are delivered to it first, oldest
    /// first. A failure there is logged and the batch is dropped.
    pub fn subscribe(&mut self, mut subscriber: Box<dyn Subscriber>) -> SubscriptionId {
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;

        if !self.replay_queue.is_empty() {
            debug!(
                market = %self.market,
                batches = self.replay_queue.len(),
                "Delivering held fill batches to new subscriber"
            );
        }
        for batch in self.replay_queue.drain(..) {
            let event = MarketEvent::Fills(batch);
            if let Err(err) = subscriber.on_event(&self.market, &event) {
                warn!(
                    market = %self.market,
                    subscription = id.0,
                    error = %err,
                    "Subscriber rejected held fill batch"
                );
            }
        }

        self.subscribers.push((id, subscriber));
        debug!(market = %self.market, subscribers = self.subscribers.len(), "Subscriber added");
        id
    }

    /// Returns false if the id was not registered.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.subscribers.len();
        self.subscribers.retain(|(sid, _)| *sid != id);
        before != self.subscribers.len()
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }

    /// Emit an event according to the output mode.
    ///
    /// In replay mode with no subscriber attached, fill batches are held and
    /// this cannot fail.
    pub fn emit(&mut self, event: MarketEvent) -> Result<(), DeliveryError> {
        match (self.mode, event) {
            (OutputMode::Replay, MarketEvent::Fills(batch)) if self.subscribers.is_empty() => {
                debug!(
                    market = %self.market,
                    fills = batch.len(),
                    held_batches = self.replay_queue.len() + 1,
                    "No subscriber, fill batch held for replay"
                );
                self.replay_queue.push_back(batch);
                Ok(())
            }
            (_, event) => self.deliver(&event),
        }
    }

    /// Take every held fill batch, oldest first.
    pub fn drain_replay(&mut self) -> Vec<Vec<Fill>> {
        self.replay_queue.drain(..).collect()
    }

    pub fn replay_queue_len(&self) -> usize {
        self.replay_queue.len()
    }

    /// Offer the event to every subscriber, reporting the first failure.
    fn deliver(&mut self, event: &MarketEvent) -> Result<(), DeliveryError> {
        let mut first_error = None;
        for (id, subscriber) in self.subscribers.iter_mut() {
            if let Err(err) = subscriber.on_event(&self.market, event) {
                warn!(
                    market = %self.market,
                    subscription = id.0,
                    event = event.label(),
                    error = %err,
                    "Subscriber rejected event"
                );
                first_error.get_or_insert(err);
            }
        }
        match first_error {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

impl fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatcher")
            .field("market", &self.market)
            .field("mode", &self.mode)
            .field("subscribers", &self.subscribers.len())
            .field("replay_queue", &self.replay_queue.len())
            .finish()
    }
}
