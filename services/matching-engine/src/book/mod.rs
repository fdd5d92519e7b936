//! Order book infrastructure module
//!
//! Contains the two containers (FIFO ring buffer, price heap), the
//! lockable blocking wrapper around them, and the five-book set the
//! engine trades on.

pub mod blocking;
pub mod bounded_queue;
pub mod priority_heap;

use std::fmt;

use serde::{Deserialize, Serialize};
use types::ids::OrderId;
use types::order::{Order, Side};

pub use blocking::{Book, BookError, BookGuard, Container};
pub use bounded_queue::BoundedQueue;
pub use priority_heap::{Priced, PriorityHeap};

/// Capacity of every book unless configured otherwise
pub const DEFAULT_BOOK_CAPACITY: usize = 5000;

/// FIFO book of orders
pub type QueueBook = Book<BoundedQueue<Order>>;

/// Price-priority book of limit orders
pub type HeapBook = Book<PriorityHeap<Order>>;

/// Which book a container serves
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BookKind {
    BuyMarket,
    SellMarket,
    BuyLimit,
    SellLimit,
    Cancel,
    /// Orders waiting to be routed
    Incoming,
}

impl fmt::Display for BookKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            BookKind::BuyMarket => "buy-market",
            BookKind::SellMarket => "sell-market",
            BookKind::BuyLimit => "buy-limit",
            BookKind::SellLimit => "sell-limit",
            BookKind::Cancel => "cancel",
            BookKind::Incoming => "incoming",
        };
        f.write_str(name)
    }
}

/// The five books of the market
///
/// Each book is locked independently; nothing here takes two locks.
#[derive(Debug)]
pub struct OrderBooks {
    pub buy_market: QueueBook,
    pub sell_market: QueueBook,
    pub buy_limit: HeapBook,
    pub sell_limit: HeapBook,
    pub cancel: QueueBook,
}

impl OrderBooks {
    /// Allocate all five books with the same capacity
    pub fn new(capacity: usize) -> Self {
        Self {
            buy_market: Book::new(BookKind::BuyMarket, BoundedQueue::new(capacity)),
            sell_market: Book::new(BookKind::SellMarket, BoundedQueue::new(capacity)),
            buy_limit: Book::new(BookKind::BuyLimit, PriorityHeap::new(Side::Buy, capacity)),
            sell_limit: Book::new(BookKind::SellLimit, PriorityHeap::new(Side::Sell, capacity)),
            cancel: Book::new(BookKind::Cancel, BoundedQueue::new(capacity)),
        }
    }

    /// Close every book, waking all blocked workers
    pub fn close_all(&self) {
        self.buy_market.close();
        self.sell_market.close();
        self.buy_limit.close();
        self.sell_limit.close();
        self.cancel.close();
    }

    /// Copy of every book's contents, each book locked in turn
    pub fn snapshot(&self) -> BooksSnapshot {
        BooksSnapshot {
            buy_market: self.buy_market.snapshot(),
            sell_market: self.sell_market.snapshot(),
            buy_limit: self.buy_limit.snapshot(),
            sell_limit: self.sell_limit.snapshot(),
            cancel: self.cancel.snapshot(),
        }
    }
}

/// Point-in-time copy of the five books
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BooksSnapshot {
    pub buy_market: Vec<Order>,
    pub sell_market: Vec<Order>,
    pub buy_limit: Vec<Order>,
    pub sell_limit: Vec<Order>,
    pub cancel: Vec<Order>,
}

impl BooksSnapshot {
    /// Ids held by one book, in storage order
    pub fn ids(&self, kind: BookKind) -> Vec<OrderId> {
        self.orders(kind).iter().map(|o| o.id).collect()
    }

    /// Orders held by one book; the incoming queue is not part of the set
    pub fn orders(&self, kind: BookKind) -> &[Order] {
        match kind {
            BookKind::BuyMarket => &self.buy_market,
            BookKind::SellMarket => &self.sell_market,
            BookKind::BuyLimit => &self.buy_limit,
            BookKind::SellLimit => &self.sell_limit,
            BookKind::Cancel => &self.cancel,
            BookKind::Incoming => &[],
        }
    }

    /// Orders resting as liquidity (everything except cancel requests)
    pub fn resting(&self) -> impl Iterator<Item = &Order> + '_ {
        self.buy_market
            .iter()
            .chain(&self.sell_market)
            .chain(&self.buy_limit)
            .chain(&self.sell_limit)
    }
}
