//! Shared market state and the transaction-commit section
//!
//! The current price is the single serialization point across the
//! independently locked books. It lives behind one mutex; holding that
//! mutex is what "being inside the commit section" means. A thread inside
//! the section never acquires a book lock, so waiting for the section
//! while holding book locks cannot deadlock.

use std::sync::Arc;

use parking_lot::{Mutex, MutexGuard};
use types::clock::Clock;
use types::numeric::{Price, Volume};
use types::trade::{Participant, TradeRecord, TradeShape};

use crate::events::{EventSink, MarketEvent};

#[derive(Debug)]
struct Ledger {
    current_price: Price,
    next_sequence: u64,
}

/// Process-wide price and commit lock
pub struct MarketState {
    ledger: Mutex<Ledger>,
    clock: Clock,
    sink: Arc<dyn EventSink>,
}

impl MarketState {
    pub fn new(initial_price: Price, clock: Clock, sink: Arc<dyn EventSink>) -> Self {
        Self {
            ledger: Mutex::new(Ledger {
                current_price: initial_price,
                next_sequence: 0,
            }),
            clock,
            sink,
        }
    }

    /// Price set by the latest commit
    ///
    /// Only a snapshot: it may be stale by the time the caller acts on it.
    /// Decisions that depend on the price belong inside [`Self::begin_commit`].
    pub fn current_price(&self) -> Price {
        self.ledger.lock().current_price
    }

    /// Number of trades committed so far
    pub fn trades_committed(&self) -> u64 {
        self.ledger.lock().next_sequence
    }

    pub fn clock(&self) -> Clock {
        self.clock
    }

    /// Enter the commit section, waiting for any commit in flight
    pub fn begin_commit(&self) -> CommitSection<'_> {
        CommitSection {
            market: self,
            ledger: self.ledger.lock(),
        }
    }
}

impl std::fmt::Debug for MarketState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MarketState")
            .field("ledger", &self.ledger)
            .finish_non_exhaustive()
    }
}

/// Exclusive access to the price for the duration of one commit
pub struct CommitSection<'a> {
    market: &'a MarketState,
    ledger: MutexGuard<'a, Ledger>,
}

impl CommitSection<'_> {
    /// Price as of this commit
    pub fn price(&self) -> Price {
        self.ledger.current_price
    }

    /// Record a trade: move the price, stamp the record and publish it
    ///
    /// The trade and the price update reach the sink before the section
    /// is released, so sinks see them in commit order.
    pub fn record(
        &mut self,
        shape: TradeShape,
        price: Price,
        volume: Volume,
        first: Participant,
        second: Participant,
    ) -> TradeRecord {
        let sequence = self.ledger.next_sequence;
        self.ledger.next_sequence += 1;
        self.ledger.current_price = price;

        let trade = TradeRecord {
            sequence,
            timestamp: self.market.clock.now_millis(),
            price,
            volume,
            shape,
            first,
            second,
        };
        self.market.sink.publish(MarketEvent::Trade(trade));
        self.market.sink.publish(MarketEvent::Price { sequence, price });
        trade
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::ChannelSink;
    use types::ids::OrderId;
    use types::order::OrderKind;

    fn participant(id: u64, kind: OrderKind) -> Participant {
        Participant {
            order_id: OrderId::new(id),
            kind,
            remaining: Volume::ZERO,
        }
    }

    #[test]
    fn test_commit_updates_price_and_sequence() {
        let (sink, rx) = ChannelSink::unbounded();
        let market = MarketState::new(Price::from_tenths(1000), Clock::start(), Arc::new(sink));
        assert_eq!(market.current_price(), Price::from_tenths(1000));

        let trade = market.begin_commit().record(
            TradeShape::MarketLimit,
            Price::from_tenths(998),
            Volume::new(100),
            participant(4, OrderKind::Market),
            participant(2, OrderKind::Limit),
        );
        assert_eq!(trade.sequence, 0);
        assert_eq!(market.current_price(), Price::from_tenths(998));
        assert_eq!(market.trades_committed(), 1);

        let events: Vec<_> = rx.try_iter().collect();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0], MarketEvent::Trade(trade));
        assert_eq!(
            events[1],
            MarketEvent::Price {
                sequence: 0,
                price: Price::from_tenths(998)
            }
        );
    }

    #[test]
    fn test_sequence_is_gap_free() {
        let market = MarketState::new(
            Price::from_tenths(1000),
            Clock::start(),
            Arc::new(crate::events::NullSink),
        );
        for expected in 0..5 {
            let mut commit = market.begin_commit();
            let price = commit.price();
            let trade = commit.record(
                TradeShape::MarketMarket,
                price,
                Volume::new(100),
                participant(1, OrderKind::Market),
                participant(2, OrderKind::Market),
            );
            assert_eq!(trade.sequence, expected);
        }
        assert_eq!(market.trades_committed(), 5);
    }
}
