//! Trade execution logic
//!
//! Crosses the heads of two locked books inside the commit section:
//! prices the trade, executes the smaller of the two volumes, leaves the
//! larger order resting with its volume reduced and removes whichever
//! order was filled completely (both, on equal volumes).

use std::cmp::Ordering;

use tracing::debug;
use types::numeric::{Price, Volume};
use types::order::Order;
use types::trade::{Participant, TradeRecord, TradeShape};

use crate::book::{BookGuard, Container};
use crate::market::MarketState;
use crate::matching::crossing;

/// Match executor committing trades against the shared market state
#[derive(Debug, Clone, Copy)]
pub struct TransactionExecutor<'m> {
    market: &'m MarketState,
}

impl<'m> TransactionExecutor<'m> {
    pub fn new(market: &'m MarketState) -> Self {
        Self { market }
    }

    /// Trade the head of `first` against the head of `second`
    ///
    /// The caller holds both book locks. `admissible` sees both heads and
    /// the price as of this commit; it is evaluated inside the commit
    /// section so no other trade can move the price in between. Returns
    /// `None`, with both books untouched, if either book is empty or the
    /// trade is not admissible.
    pub fn try_execute<A, B, F>(
        &self,
        shape: TradeShape,
        first: &mut BookGuard<'_, A>,
        second: &mut BookGuard<'_, B>,
        admissible: F,
    ) -> Option<TradeRecord>
    where
        A: Container<Item = Order>,
        B: Container<Item = Order>,
        F: FnOnce(&Order, &Order, Price) -> bool,
    {
        let o1 = *first.peek()?;
        let o2 = *second.peek()?;

        let mut commit = self.market.begin_commit();
        let current = commit.price();
        if !admissible(&o1, &o2, current) {
            return None;
        }

        let price = crossing::trade_price(shape, &o1, &o2, current);
        let volume = o1.volume.min(o2.volume);

        let (first_left, second_left) = match o1.volume.cmp(&o2.volume) {
            Ordering::Greater => {
                fill_head(first, volume);
                remove_head(second, &o2);
                (o1.volume - volume, Volume::ZERO)
            }
            Ordering::Less => {
                remove_head(first, &o1);
                fill_head(second, volume);
                (Volume::ZERO, o2.volume - volume)
            }
            Ordering::Equal => {
                remove_head(first, &o1);
                remove_head(second, &o2);
                (Volume::ZERO, Volume::ZERO)
            }
        };
        // Two resting volumes can sum past u32
        let shares = |v: Volume| u64::from(v.shares());
        debug_assert_eq!(
            shares(o1.volume) + shares(o2.volume),
            2 * shares(volume) + shares(first_left) + shares(second_left)
        );

        let trade = commit.record(
            shape,
            price,
            volume,
            Participant {
                order_id: o1.id,
                kind: o1.kind,
                remaining: first_left,
            },
            Participant {
                order_id: o2.id,
                kind: o2.kind,
                remaining: second_left,
            },
        );
        drop(commit);

        debug!(
            sequence = trade.sequence,
            shape = shape.label(),
            price = %price,
            volume = %volume,
            first = %o1.id,
            second = %o2.id,
            "trade committed"
        );
        Some(trade)
    }
}

fn fill_head<C: Container<Item = Order>>(book: &mut BookGuard<'_, C>, executed: Volume) {
    if let Some(head) = book.head_mut() {
        head.fill(executed);
    }
}

fn remove_head<C: Container<Item = Order>>(book: &mut BookGuard<'_, C>, expected: &Order) {
    let removed = book.remove_head();
    debug_assert_eq!(removed.map(|o| o.id), Some(expected.id), "{} head changed under its lock", book.kind());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::book::OrderBooks;
    use crate::events::NullSink;
    use std::sync::Arc;
    use types::clock::Clock;
    use types::ids::OrderId;
    use types::order::Side;

    fn market_at(price: i64) -> MarketState {
        MarketState::new(Price::from_tenths(price), Clock::start(), Arc::new(NullSink))
    }

    fn always(_: &Order, _: &Order, _: Price) -> bool {
        true
    }

    #[test]
    fn test_limit_market_partial_fill() {
        let books = OrderBooks::new(16);
        let market = market_at(1000);
        books
            .buy_limit
            .put(Order::limit(OrderId::new(1), Side::Buy, Volume::new(200), Price::from_tenths(1005), 0))
            .unwrap();
        books
            .sell_market
            .put(Order::market(OrderId::new(2), Side::Sell, Volume::new(300), 0))
            .unwrap();

        let executor = TransactionExecutor::new(&market);
        let trade = {
            let mut own = books.buy_limit.lock();
            let mut other = books.sell_market.lock();
            executor
                .try_execute(TradeShape::LimitMarket, &mut own, &mut other, always)
                .unwrap()
        };

        assert_eq!(trade.price, Price::from_tenths(1005));
        assert_eq!(trade.volume, Volume::new(200));
        assert_eq!(trade.first.order_id, OrderId::new(1));
        assert_eq!(trade.second.order_id, OrderId::new(2));
        assert_eq!(trade.second.remaining, Volume::new(100));
        assert_eq!(market.current_price(), Price::from_tenths(1005));

        assert!(books.buy_limit.is_empty());
        let rest = books.sell_market.snapshot();
        assert_eq!(rest.len(), 1);
        assert_eq!(rest[0].id, OrderId::new(2));
        assert_eq!(rest[0].volume, Volume::new(100));
    }

    #[test]
    fn test_volumes_summing_past_u32_trade() {
        let books = OrderBooks::new(4);
        let market = market_at(1000);
        books
            .buy_market
            .put(Order::market(OrderId::new(1), Side::Buy, Volume::new(3_000_000_000), 0))
            .unwrap();
        books
            .sell_market
            .put(Order::market(OrderId::new(2), Side::Sell, Volume::new(2_000_000_000), 0))
            .unwrap();

        let executor = TransactionExecutor::new(&market);
        let mut own = books.buy_market.lock();
        let mut other = books.sell_market.lock();
        let trade = executor
            .try_execute(TradeShape::MarketMarket, &mut own, &mut other, always)
            .unwrap();

        assert_eq!(trade.volume, Volume::new(2_000_000_000));
        assert_eq!(trade.first.remaining, Volume::new(1_000_000_000));
        assert_eq!(trade.first_volume_before(), Volume::new(3_000_000_000));
        assert_eq!(own.peek().unwrap().volume, Volume::new(1_000_000_000));
        assert!(other.is_empty());
    }

    #[test]
    fn test_market_market_keeps_current_price() {
        let books = OrderBooks::new(16);
        let market = market_at(987);
        books
            .buy_market
            .put(Order::market(OrderId::new(1), Side::Buy, Volume::new(500), 0))
            .unwrap();
        books
            .sell_market
            .put(Order::market(OrderId::new(2), Side::Sell, Volume::new(200), 0))
            .unwrap();

        let executor = TransactionExecutor::new(&market);
        let mut own = books.buy_market.lock();
        let mut other = books.sell_market.lock();
        let trade = executor
            .try_execute(TradeShape::MarketMarket, &mut own, &mut other, always)
            .unwrap();

        assert_eq!(trade.price, Price::from_tenths(987));
        assert_eq!(trade.first.remaining, Volume::new(300));
        assert_eq!(own.peek().unwrap().volume, Volume::new(300));
        assert!(other.is_empty());
    }

    #[test]
    fn test_limit_limit_equal_volumes_remove_both() {
        let books = OrderBooks::new(16);
        let market = market_at(1000);
        books
            .buy_limit
            .put(Order::limit(OrderId::new(1), Side::Buy, Volume::new(100), Price::from_tenths(1003), 0))
            .unwrap();
        books
            .sell_limit
            .put(Order::limit(OrderId::new(2), Side::Sell, Volume::new(100), Price::from_tenths(1000), 0))
            .unwrap();

        let executor = TransactionExecutor::new(&market);
        let mut own = books.buy_limit.lock();
        let mut other = books.sell_limit.lock();
        let trade = executor
            .try_execute(TradeShape::LimitLimit, &mut own, &mut other, |bid, ask, _| {
                crossing::can_match(bid.price, ask.price)
            })
            .unwrap();

        assert_eq!(trade.price, Price::from_tenths(1001));
        assert_eq!(trade.first.remaining, Volume::ZERO);
        assert_eq!(trade.second.remaining, Volume::ZERO);
        assert!(own.is_empty());
        assert!(other.is_empty());
    }

    #[test]
    fn test_inadmissible_trade_leaves_books_untouched() {
        let books = OrderBooks::new(16);
        let market = market_at(1000);
        books
            .buy_market
            .put(Order::market(OrderId::new(1), Side::Buy, Volume::new(100), 0))
            .unwrap();
        books
            .sell_limit
            .put(Order::limit(OrderId::new(2), Side::Sell, Volume::new(100), Price::from_tenths(1002), 0))
            .unwrap();

        let executor = TransactionExecutor::new(&market);
        let mut own = books.buy_market.lock();
        let mut other = books.sell_limit.lock();
        let result = executor.try_execute(TradeShape::MarketLimit, &mut own, &mut other, |_, ask, current| {
            crossing::market_takes_limit(Side::Buy, ask.price, current)
        });

        assert!(result.is_none());
        assert_eq!(own.len(), 1);
        assert_eq!(other.len(), 1);
        assert_eq!(market.trades_committed(), 0);
    }

    #[test]
    fn test_empty_counterpart_is_no_trade() {
        let books = OrderBooks::new(16);
        let market = market_at(1000);
        books
            .buy_market
            .put(Order::market(OrderId::new(1), Side::Buy, Volume::new(100), 0))
            .unwrap();

        let executor = TransactionExecutor::new(&market);
        let mut own = books.buy_market.lock();
        let mut other = books.sell_market.lock();
        assert!(executor
            .try_execute(TradeShape::MarketMarket, &mut own, &mut other, always)
            .is_none());
        assert_eq!(own.len(), 1);
    }

    #[test]
    fn test_volume_is_conserved() {
        let books = OrderBooks::new(16);
        let market = market_at(1000);
        for (id, volume) in [(1, 700), (2, 300), (3, 900)] {
            books
                .buy_market
                .put(Order::market(OrderId::new(id), Side::Buy, Volume::new(volume), 0))
                .unwrap();
        }
        for (id, volume) in [(10, 500), (11, 500), (12, 200)] {
            books
                .sell_market
                .put(Order::market(OrderId::new(id), Side::Sell, Volume::new(volume), 0))
                .unwrap();
        }

        let executor = TransactionExecutor::new(&market);
        let mut own = books.buy_market.lock();
        let mut other = books.sell_market.lock();
        while let Some(trade) = executor.try_execute(TradeShape::MarketMarket, &mut own, &mut other, always) {
            assert_eq!(
                trade.volume,
                trade.first_volume_before().min(trade.second_volume_before())
            );
            assert!(trade.first.remaining.is_zero() || trade.second.remaining.is_zero());
        }
        // 1900 bought against 1200 sold
        assert!(other.is_empty());
        let left: u32 = own.items().iter().map(|o| o.volume.shares()).sum();
        assert_eq!(left, 700);
        assert_eq!(market.trades_committed(), 4);
    }
}
