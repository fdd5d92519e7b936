//! Cancellation worker
//!
//! Takes cancel requests off the cancel book and withdraws the target
//! from whichever resting book holds it. Books are searched one at a time
//! in a fixed order (buy market, sell market, buy limit, sell limit), each
//! under its own lock, and at most one entry is removed per request.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use types::ids::OrderId;
use types::order::Order;

use crate::book::{Book, BookError, Container, OrderBooks};
use crate::events::{CancelOutcome, CancelResult, EventSink, MarketEvent};

/// Counters reported when the worker stops
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CancelStats {
    pub canceled: u64,
    pub not_found: u64,
}

/// Persistent worker draining the cancel book
pub struct CancelWorker {
    books: Arc<OrderBooks>,
    sink: Arc<dyn EventSink>,
}

impl CancelWorker {
    pub fn new(books: Arc<OrderBooks>, sink: Arc<dyn EventSink>) -> Self {
        Self { books, sink }
    }

    /// Process cancel requests until the cancel book is closed and drained
    pub fn run(&self) -> CancelStats {
        info!("cancel worker started");
        let mut stats = CancelStats::default();

        loop {
            let request = match self.books.cancel.take() {
                Ok(request) => request,
                Err(BookError::Closed(_)) => break,
            };
            if self.process(&request).is_canceled() {
                stats.canceled += 1;
            } else {
                stats.not_found += 1;
            }
        }

        info!(
            canceled = stats.canceled,
            not_found = stats.not_found,
            "cancel worker stopped"
        );
        stats
    }

    /// Withdraw the target of one cancel request and publish the outcome
    pub fn process(&self, request: &Order) -> CancelOutcome {
        let result = match request.target {
            Some(target) => self.withdraw(target),
            None => CancelResult::NotFound,
        };
        let outcome = CancelOutcome {
            cancel_id: request.id,
            target_id: request.target.unwrap_or(request.id),
            result,
        };

        match &outcome.result {
            CancelResult::Canceled { book, order } => {
                debug!(cancel = %request.id, target = %order.id, %book, volume = %order.volume, "order canceled")
            }
            CancelResult::NotFound => {
                debug!(cancel = %request.id, target = %outcome.target_id, "cancel target not found")
            }
        }
        self.sink.publish(MarketEvent::Cancel(outcome.clone()));
        outcome
    }

    fn withdraw(&self, target: OrderId) -> CancelResult {
        let books = &*self.books;
        remove_from(&books.buy_market, target)
            .or_else(|| remove_from(&books.sell_market, target))
            .or_else(|| remove_from(&books.buy_limit, target))
            .or_else(|| remove_from(&books.sell_limit, target))
            .unwrap_or(CancelResult::NotFound)
    }
}

/// Remove `target` from one book, holding only that book's lock
fn remove_from<C>(book: &Book<C>, target: OrderId) -> Option<CancelResult>
where
    C: Container<Item = Order>,
{
    let mut guard = book.lock();
    let index = guard.find(|order| order.id == target)?;
    let order = guard.remove_at(index)?;
    Some(CancelResult::Canceled {
        book: book.kind(),
        order,
    })
}
