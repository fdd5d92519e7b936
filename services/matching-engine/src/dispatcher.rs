//! Order dispatcher
//!
//! Pulls orders from a source, validates them and routes each one into
//! the book for its kind and side. Routing blocks while the destination
//! book is full; that is the only backpressure producers ever see.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};
use types::errors::OrderError;
use types::order::{Order, OrderKind, Side};

use crate::book::{BookError, BookKind, OrderBooks, QueueBook};

/// Routing failures
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DispatchError {
    #[error("rejected order: {0}")]
    Invalid(#[from] OrderError),

    #[error(transparent)]
    Closed(#[from] BookError),
}

/// Blocking pull source of orders
///
/// `None` ends the stream.
pub trait OrderSource {
    fn next_order(&mut self) -> Option<Order>;
}

impl<I> OrderSource for I
where
    I: Iterator<Item = Order>,
{
    fn next_order(&mut self) -> Option<Order> {
        self.next()
    }
}

/// The incoming order queue as a source
///
/// Blocks while the queue is empty; ends once it is closed and drained.
#[derive(Debug, Clone)]
pub struct IncomingOrders {
    queue: Arc<QueueBook>,
}

impl IncomingOrders {
    pub fn new(queue: Arc<QueueBook>) -> Self {
        Self { queue }
    }
}

impl OrderSource for IncomingOrders {
    fn next_order(&mut self) -> Option<Order> {
        self.queue.take().ok()
    }
}

/// Counters reported when the dispatcher stops
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatchStats {
    pub routed: u64,
    pub rejected: u64,
    /// Order taken from the source whose destination had already closed
    pub unrouted: Option<Order>,
}

/// Routes orders into the five books
#[derive(Debug, Clone)]
pub struct Dispatcher {
    books: Arc<OrderBooks>,
}

impl Dispatcher {
    pub fn new(books: Arc<OrderBooks>) -> Self {
        Self { books }
    }

    /// Validate one order and store it in its book
    ///
    /// Blocks while the destination is full. Returns the book the order
    /// went to.
    pub fn route(&self, order: Order) -> Result<BookKind, DispatchError> {
        order.validate()?;
        let books = &*self.books;
        let kind = match (order.kind, order.side) {
            (OrderKind::Market, Side::Buy) => {
                books.buy_market.put(order)?;
                BookKind::BuyMarket
            }
            (OrderKind::Market, Side::Sell) => {
                books.sell_market.put(order)?;
                BookKind::SellMarket
            }
            (OrderKind::Limit, Side::Buy) => {
                books.buy_limit.put(order)?;
                BookKind::BuyLimit
            }
            (OrderKind::Limit, Side::Sell) => {
                books.sell_limit.put(order)?;
                BookKind::SellLimit
            }
            (OrderKind::Cancel, _) => {
                books.cancel.put(order)?;
                BookKind::Cancel
            }
        };
        debug!(order = %order.id, book = %kind, "order routed");
        Ok(kind)
    }

    /// Route every order from `source` until it ends or a book closes
    pub fn run<S: OrderSource + ?Sized>(&self, source: &mut S) -> DispatchStats {
        info!("dispatcher started");
        let mut stats = DispatchStats::default();

        while let Some(order) = source.next_order() {
            match self.route(order) {
                Ok(_) => stats.routed += 1,
                Err(DispatchError::Invalid(error)) => {
                    warn!(order = %order.id, %error, "dropping invalid order");
                    stats.rejected += 1;
                }
                Err(DispatchError::Closed(error)) => {
                    warn!(order = %order.id, %error, "destination closed, order left unrouted");
                    stats.unrouted = Some(order);
                    break;
                }
            }
        }

        info!(routed = stats.routed, rejected = stats.rejected, "dispatcher stopped");
        stats
    }
}
