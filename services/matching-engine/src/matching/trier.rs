//! Matching triers
//!
//! One persistent worker per resting book. Each round the trier locks its
//! own book, waits until it holds an order, and then tries two counterpart
//! books in a fixed preference order. Counterpart locks are only ever
//! *attempted*: if another thread holds one, that leg is skipped for this
//! round. A trier therefore never waits on a book lock while holding
//! another, which is what keeps the four triers free of deadlock without
//! a global lock order.
//!
//! | trier       | preferred leg                     | fallback leg                  |
//! |-------------|-----------------------------------|-------------------------------|
//! | buy market  | sell limit (ML) if ask < price    | sell market (MM)              |
//! | sell market | buy limit (ML) if bid > price     | buy market (MM)               |
//! | buy limit   | sell market (LM)                  | sell limit (LL) if bid >= ask |
//! | sell limit  | buy market (LM)                   | buy limit (LL) if bid >= ask  |

use std::fmt;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use types::numeric::Price;
use types::order::{Order, Side};
use types::trade::{TradeRecord, TradeShape};

use crate::book::{Book, BookError, BookGuard, Container, OrderBooks};
use crate::market::MarketState;
use crate::matching::crossing;
use crate::matching::executor::TransactionExecutor;

/// Which resting book a trier serves
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TrierKind {
    BuyMarket,
    SellMarket,
    BuyLimit,
    SellLimit,
}

impl TrierKind {
    pub const ALL: [TrierKind; 4] = [
        TrierKind::BuyMarket,
        TrierKind::SellMarket,
        TrierKind::BuyLimit,
        TrierKind::SellLimit,
    ];
}

impl fmt::Display for TrierKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TrierKind::BuyMarket => "buy-market",
            TrierKind::SellMarket => "sell-market",
            TrierKind::BuyLimit => "buy-limit",
            TrierKind::SellLimit => "sell-limit",
        };
        f.write_str(name)
    }
}

/// Outcome of one matching round
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Attempt {
    Traded(TradeRecord),
    /// No trade, and at least one counterpart lock was held elsewhere
    Contended,
    /// No trade: counterparts empty or not crossing
    Idle,
}

impl Attempt {
    /// Fall through to `next` unless this leg traded
    fn or_else<F: FnOnce() -> Attempt>(self, next: F) -> Attempt {
        match self {
            Attempt::Traded(_) => self,
            Attempt::Contended => match next() {
                Attempt::Idle => Attempt::Contended,
                other => other,
            },
            Attempt::Idle => next(),
        }
    }
}

/// Counters reported when a trier stops
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrierStats {
    pub kind: Option<TrierKind>,
    pub trades: u64,
    pub contended: u64,
    pub idle_rounds: u64,
}

/// Persistent matching worker for one resting book
pub struct MatchingTrier {
    kind: TrierKind,
    books: Arc<OrderBooks>,
    market: Arc<MarketState>,
    idle_backoff: Duration,
}

impl MatchingTrier {
    pub fn new(kind: TrierKind, books: Arc<OrderBooks>, market: Arc<MarketState>, idle_backoff: Duration) -> Self {
        Self {
            kind,
            books,
            market,
            idle_backoff,
        }
    }

    pub fn kind(&self) -> TrierKind {
        self.kind
    }

    /// Match until the own book is closed
    pub fn run(&self) -> TrierStats {
        info!(trier = %self.kind, "trier started");
        let mut stats = TrierStats {
            kind: Some(self.kind),
            ..TrierStats::default()
        };

        loop {
            match self.step() {
                Ok(Attempt::Traded(_)) => stats.trades += 1,
                Ok(Attempt::Contended) => {
                    stats.contended += 1;
                    self.back_off();
                }
                Ok(Attempt::Idle) => {
                    stats.idle_rounds += 1;
                    self.back_off();
                }
                Err(BookError::Closed(book)) => {
                    debug!(trier = %self.kind, %book, "book closed");
                    break;
                }
            }
        }

        info!(
            trier = %self.kind,
            trades = stats.trades,
            contended = stats.contended,
            idle_rounds = stats.idle_rounds,
            "trier stopped"
        );
        stats
    }

    /// One round: wait for an own order, then try both legs
    ///
    /// Blocks while the own book is empty. The own lock is released before
    /// this returns.
    pub fn step(&self) -> Result<Attempt, BookError> {
        let books = &*self.books;
        let executor = TransactionExecutor::new(&self.market);

        match self.kind {
            TrierKind::BuyMarket => round(&books.buy_market, |own| {
                attempt(&executor, own, &books.sell_limit, TradeShape::MarketLimit, |_, ask, current| {
                    crossing::market_takes_limit(Side::Buy, ask.price, current)
                })
                .or_else(|| attempt(&executor, own, &books.sell_market, TradeShape::MarketMarket, any_price))
            }),
            TrierKind::SellMarket => round(&books.sell_market, |own| {
                attempt(&executor, own, &books.buy_limit, TradeShape::MarketLimit, |_, bid, current| {
                    crossing::market_takes_limit(Side::Sell, bid.price, current)
                })
                .or_else(|| attempt(&executor, own, &books.buy_market, TradeShape::MarketMarket, any_price))
            }),
            TrierKind::BuyLimit => round(&books.buy_limit, |own| {
                attempt(&executor, own, &books.sell_market, TradeShape::LimitMarket, any_price).or_else(|| {
                    attempt(&executor, own, &books.sell_limit, TradeShape::LimitLimit, |bid, ask, _| {
                        crossing::can_match(bid.price, ask.price)
                    })
                })
            }),
            TrierKind::SellLimit => round(&books.sell_limit, |own| {
                attempt(&executor, own, &books.buy_market, TradeShape::LimitMarket, any_price).or_else(|| {
                    attempt(&executor, own, &books.buy_limit, TradeShape::LimitLimit, |ask, bid, _| {
                        crossing::can_match(bid.price, ask.price)
                    })
                })
            }),
        }
    }

    fn back_off(&self) {
        if self.idle_backoff.is_zero() {
            thread::yield_now();
        } else {
            thread::sleep(self.idle_backoff);
        }
    }
}

impl fmt::Debug for MatchingTrier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MatchingTrier")
            .field("kind", &self.kind)
            .field("idle_backoff", &self.idle_backoff)
            .finish_non_exhaustive()
    }
}

fn any_price(_: &Order, _: &Order, _: Price) -> bool {
    true
}

/// Lock the own book, wait for an order and run the legs
fn round<A, F>(own: &Book<A>, legs: F) -> Result<Attempt, BookError>
where
    A: Container<Item = Order>,
    F: FnOnce(&mut BookGuard<'_, A>) -> Attempt,
{
    let mut guard = own.lock();
    if own.is_closed() {
        return Err(BookError::Closed(own.kind()));
    }
    guard.wait_until_not_empty()?;
    Ok(legs(&mut guard))
}

/// One leg: attempt the counterpart lock and trade the two heads
fn attempt<A, B, F>(
    executor: &TransactionExecutor<'_>,
    own: &mut BookGuard<'_, A>,
    counterpart: &Book<B>,
    shape: TradeShape,
    admissible: F,
) -> Attempt
where
    A: Container<Item = Order>,
    B: Container<Item = Order>,
    F: FnOnce(&Order, &Order, Price) -> bool,
{
    let Some(mut other) = counterpart.try_lock() else {
        return Attempt::Contended;
    };
    match executor.try_execute(shape, own, &mut other, admissible) {
        Some(trade) => Attempt::Traded(trade),
        None => Attempt::Idle,
    }
}
