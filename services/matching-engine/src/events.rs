//! Event structures for matching engine
//!
//! Committed trades, price updates and cancel outcomes leave the engine as
//! [`MarketEvent`]s through an [`EventSink`]. Trade and price events are
//! published from inside the commit section, so a sink observes them in
//! commit order.

use crossbeam_channel::{Receiver, Sender};
use serde::{Deserialize, Serialize};
use types::ids::OrderId;
use types::numeric::Price;
use types::order::Order;
use types::trade::TradeRecord;

use crate::book::BookKind;

/// Everything the engine reports to the outside world
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum MarketEvent {
    Trade(TradeRecord),
    /// New current price, set by the trade with the same sequence number
    Price { sequence: u64, price: Price },
    Cancel(CancelOutcome),
}

/// Result of one cancel request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CancelOutcome {
    /// Id of the cancel request itself
    pub cancel_id: OrderId,
    pub target_id: OrderId,
    pub result: CancelResult,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status")]
pub enum CancelResult {
    /// The target was found in `book` and removed
    Canceled { book: BookKind, order: Order },
    /// No book held the target
    NotFound,
}

impl CancelOutcome {
    pub fn is_canceled(&self) -> bool {
        matches!(self.result, CancelResult::Canceled { .. })
    }
}

/// Consumer of market events
///
/// `publish` runs on the commit path and must not block for long;
/// buffering is the sink's responsibility.
pub trait EventSink: Send + Sync {
    fn publish(&self, event: MarketEvent);
}

/// Sink that discards everything
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl EventSink for NullSink {
    fn publish(&self, _event: MarketEvent) {}
}

/// Sink forwarding events over an unbounded channel
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: Sender<MarketEvent>,
}

impl ChannelSink {
    /// Create a sink and the receiver that drains it
    pub fn unbounded() -> (Self, Receiver<MarketEvent>) {
        let (tx, rx) = crossbeam_channel::unbounded();
        (Self { tx }, rx)
    }
}

impl EventSink for ChannelSink {
    fn publish(&self, event: MarketEvent) {
        // A dropped receiver means nobody is listening any more
        if self.tx.send(event).is_err() {
            tracing::trace!("event receiver dropped");
        }
    }
}
