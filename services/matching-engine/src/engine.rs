//! Matching engine core
//!
//! Owns the books, the incoming queue and the market state, and wires the
//! persistent workers around them: one dispatcher, four triers and one
//! cancel worker, each on its own named thread.

use std::io;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{error, info, warn};
use types::clock::Clock;
use types::numeric::Price;
use types::order::Order;

use crate::book::{Book, BookKind, BooksSnapshot, BoundedQueue, OrderBooks, QueueBook};
use crate::cancel::{CancelStats, CancelWorker};
use crate::config::EngineConfig;
use crate::dispatcher::{DispatchStats, Dispatcher, IncomingOrders, OrderSource};
use crate::events::EventSink;
use crate::market::MarketState;
use crate::matching::{MatchingTrier, TrierKind, TrierStats};

/// Engine startup and shutdown errors
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("invalid engine configuration: {0}")]
    InvalidConfig(String),

    #[error("failed to spawn {name} thread")]
    Spawn {
        name: String,
        #[source]
        source: io::Error,
    },

    #[error("{0} thread panicked")]
    WorkerPanicked(String),
}

/// Main matching engine
pub struct MatchingEngine {
    config: EngineConfig,
    books: Arc<OrderBooks>,
    incoming: Arc<QueueBook>,
    market: Arc<MarketState>,
    sink: Arc<dyn EventSink>,
}

impl MatchingEngine {
    /// Allocate every book and the market state
    ///
    /// Fails on an invalid configuration; nothing is started.
    pub fn new(config: EngineConfig, sink: Arc<dyn EventSink>) -> Result<Self, EngineError> {
        config.validate()?;
        let books = Arc::new(OrderBooks::new(config.book_capacity));
        let incoming = Arc::new(Book::new(BookKind::Incoming, BoundedQueue::new(config.book_capacity)));
        let market = Arc::new(MarketState::new(config.initial_price, Clock::start(), Arc::clone(&sink)));
        Ok(Self {
            config,
            books,
            incoming,
            market,
            sink,
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn books(&self) -> &Arc<OrderBooks> {
        &self.books
    }

    pub fn market(&self) -> &Arc<MarketState> {
        &self.market
    }

    /// Queue producers push into; the dispatcher started by [`Self::start`]
    /// drains it
    pub fn incoming(&self) -> Arc<QueueBook> {
        Arc::clone(&self.incoming)
    }

    /// Clock shared with the market state, for stamping orders
    pub fn clock(&self) -> Clock {
        self.market.clock()
    }

    /// Start all workers, dispatching from the incoming queue
    pub fn start(&self) -> Result<EngineHandle, EngineError> {
        self.start_with(IncomingOrders::new(self.incoming()))
    }

    /// Start all workers, dispatching from `source`
    ///
    /// If any thread fails to spawn, the ones already running are stopped
    /// and joined before the error is returned.
    pub fn start_with<S>(&self, source: S) -> Result<EngineHandle, EngineError>
    where
        S: OrderSource + Send + 'static,
    {
        let mut handle = EngineHandle {
            books: Arc::clone(&self.books),
            incoming: Arc::clone(&self.incoming),
            market: Arc::clone(&self.market),
            dispatcher: None,
            dispatcher_done: None,
            drain_timeout: self.config.drain_timeout(),
            dispatch: None,
            triers: Vec::with_capacity(TrierKind::ALL.len()),
            cancel: None,
        };

        if let Err(error) = self.spawn_workers(&mut handle, source) {
            error!(%error, "engine startup failed");
            if let Err(shutdown_error) = handle.shutdown() {
                error!(error = %shutdown_error, "cleanup after failed startup");
            }
            return Err(error);
        }

        info!(
            capacity = self.config.book_capacity,
            initial_price = %self.config.initial_price,
            "matching engine started"
        );
        Ok(handle)
    }

    fn spawn_workers<S>(&self, handle: &mut EngineHandle, mut source: S) -> Result<(), EngineError>
    where
        S: OrderSource + Send + 'static,
    {
        for kind in TrierKind::ALL {
            let trier = MatchingTrier::new(
                kind,
                Arc::clone(&self.books),
                Arc::clone(&self.market),
                self.config.idle_backoff(),
            );
            handle.triers.push(spawn(format!("trier-{kind}"), move || trier.run())?);
        }

        let cancel = CancelWorker::new(Arc::clone(&self.books), Arc::clone(&self.sink));
        handle.cancel = Some(spawn("cancel-worker".to_string(), move || cancel.run())?);

        // Disconnects when the dispatcher thread ends, however it ends
        let (done, done_rx) = crossbeam_channel::bounded::<()>(0);
        let dispatcher = Dispatcher::new(Arc::clone(&self.books));
        handle.dispatcher = Some(spawn("dispatcher".to_string(), move || {
            let _done = done;
            dispatcher.run(&mut source)
        })?);
        handle.dispatcher_done = Some(done_rx);
        Ok(())
    }
}

fn spawn<T, F>(name: String, work: F) -> Result<JoinHandle<T>, EngineError>
where
    T: Send + 'static,
    F: FnOnce() -> T + Send + 'static,
{
    thread::Builder::new()
        .name(name.clone())
        .spawn(work)
        .map_err(|source| EngineError::Spawn { name, source })
}

fn join<T>(handle: JoinHandle<T>) -> Result<T, EngineError> {
    let name = handle.thread().name().unwrap_or("worker").to_string();
    handle.join().map_err(|_| EngineError::WorkerPanicked(name))
}

/// Everything the workers reported, plus the final market state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineReport {
    pub dispatch: DispatchStats,
    pub triers: Vec<TrierStats>,
    pub cancels: CancelStats,
    pub trades: u64,
    pub final_price: Price,
    /// Orders still resting when the engine stopped
    pub books: BooksSnapshot,
    /// Accepted orders that never reached a book: the order the dispatcher
    /// held when its destination closed, then what was left queued
    pub unrouted: Vec<Order>,
}

/// Running engine
///
/// Dropping the handle closes every book so the workers wind down, but
/// does not wait for them; use [`EngineHandle::shutdown`] for that.
pub struct EngineHandle {
    books: Arc<OrderBooks>,
    incoming: Arc<QueueBook>,
    market: Arc<MarketState>,
    dispatcher: Option<JoinHandle<DispatchStats>>,
    dispatcher_done: Option<Receiver<()>>,
    drain_timeout: Duration,
    dispatch: Option<DispatchStats>,
    triers: Vec<JoinHandle<TrierStats>>,
    cancel: Option<JoinHandle<CancelStats>>,
}

impl EngineHandle {
    pub fn books(&self) -> &Arc<OrderBooks> {
        &self.books
    }

    pub fn market(&self) -> &Arc<MarketState> {
        &self.market
    }

    /// Wait until the order source ends and the dispatcher has routed
    /// everything it produced
    ///
    /// With the incoming queue as source this only returns after shutdown.
    pub fn wait_for_source(&mut self) -> Result<DispatchStats, EngineError> {
        if let Some(dispatcher) = self.dispatcher.take() {
            self.dispatch = Some(join(dispatcher)?);
        }
        Ok(self.dispatch.unwrap_or_default())
    }

    /// Stop accepting orders, let the dispatcher route what is queued,
    /// then close every book, join every worker and report
    ///
    /// A dispatcher stuck on a full book is given the configured drain
    /// timeout; whatever it could not route is listed in
    /// [`EngineReport::unrouted`].
    pub fn shutdown(mut self) -> Result<EngineReport, EngineError> {
        info!("shutting down matching engine");
        self.incoming.close();
        self.drain_incoming();
        self.books.close_all();

        let dispatch = self.wait_for_source();
        let triers: Result<Vec<TrierStats>, EngineError> = self.triers.drain(..).map(join).collect();
        let cancels = self.cancel.take().map(join).transpose();

        let dispatch = dispatch?;
        let mut unrouted: Vec<Order> = dispatch.unrouted.into_iter().collect();
        unrouted.extend(self.incoming.snapshot());

        let report = EngineReport {
            dispatch,
            triers: triers?,
            cancels: cancels?.unwrap_or_default(),
            trades: self.market.trades_committed(),
            final_price: self.market.current_price(),
            books: self.books.snapshot(),
            unrouted,
        };
        if !report.unrouted.is_empty() {
            warn!(unrouted = report.unrouted.len(), "orders left unrouted at shutdown");
        }
        info!(
            trades = report.trades,
            final_price = %report.final_price,
            resting = report.books.resting().count(),
            "matching engine stopped"
        );
        Ok(report)
    }

    /// Wait for the dispatcher to finish the closed incoming queue
    fn drain_incoming(&mut self) {
        let Some(done) = self.dispatcher_done.take() else {
            return;
        };
        if let Err(RecvTimeoutError::Timeout) = done.recv_timeout(self.drain_timeout) {
            warn!(
                queued = self.incoming.len(),
                timeout_ms = self.drain_timeout.as_millis() as u64,
                "dispatcher did not finish routing before the drain timeout"
            );
        }
    }

    fn close(&self) {
        self.incoming.close();
        self.books.close_all();
    }
}

impl Drop for EngineHandle {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::{ChannelSink, MarketEvent, NullSink};
    use std::time::Duration;
    use types::ids::OrderId;
    use types::numeric::Volume;
    use types::order::{Order, Side};

    #[test]
    fn test_invalid_config_is_fatal() {
        let config = EngineConfig {
            book_capacity: 0,
            ..EngineConfig::default()
        };
        assert!(matches!(
            MatchingEngine::new(config, Arc::new(NullSink)),
            Err(EngineError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_start_and_shutdown_idle_engine() {
        let engine = MatchingEngine::new(EngineConfig::default(), Arc::new(NullSink)).unwrap();
        let handle = engine.start().unwrap();
        let report = handle.shutdown().unwrap();
        assert_eq!(report.trades, 0);
        assert_eq!(report.triers.len(), 4);
        assert_eq!(report.final_price, Price::from_tenths(1000));
    }

    #[test]
    fn test_orders_through_incoming_queue_trade() {
        let (sink, rx) = ChannelSink::unbounded();
        let engine = MatchingEngine::new(EngineConfig::default(), Arc::new(sink)).unwrap();
        let handle = engine.start().unwrap();

        let incoming = engine.incoming();
        incoming
            .put(Order::limit(OrderId::new(1), Side::Buy, Volume::new(200), Price::from_tenths(1005), 0))
            .unwrap();
        incoming
            .put(Order::market(OrderId::new(2), Side::Sell, Volume::new(300), 1))
            .unwrap();

        let trade = loop {
            match rx.recv_timeout(Duration::from_secs(5)).unwrap() {
                MarketEvent::Trade(trade) => break trade,
                _ => continue,
            }
        };
        assert_eq!(trade.price, Price::from_tenths(1005));
        assert_eq!(trade.volume, Volume::new(200));

        let report = handle.shutdown().unwrap();
        assert_eq!(report.trades, 1);
        assert_eq!(report.dispatch.routed, 2);
        assert_eq!(report.books.ids(BookKind::SellMarket), vec![OrderId::new(2)]);
        assert_eq!(report.books.sell_market[0].volume, Volume::new(100));
        assert!(report.unrouted.is_empty());
    }

    #[test]
    fn test_shutdown_routes_everything_queued() {
        let engine = MatchingEngine::new(EngineConfig::default(), Arc::new(NullSink)).unwrap();
        let incoming = engine.incoming();
        // Bids below asks: nothing trades, everything must come to rest
        for id in 0..2_000u64 {
            let (side, price) = if id % 2 == 0 { (Side::Buy, 990) } else { (Side::Sell, 1010) };
            incoming
                .put(Order::limit(OrderId::new(id), side, Volume::new(100), Price::from_tenths(price), id))
                .unwrap();
        }

        let report = engine.start().unwrap().shutdown().unwrap();
        assert_eq!(report.dispatch.routed, 2_000);
        assert_eq!(report.books.resting().count(), 2_000);
        assert!(report.unrouted.is_empty());
        assert!(incoming.is_empty());
        assert_eq!(report.trades, 0);
    }

    #[test]
    fn test_stalled_dispatcher_reports_unrouted_order() {
        let config = EngineConfig {
            book_capacity: 4,
            drain_timeout_ms: 50,
            ..EngineConfig::default()
        };
        let engine = MatchingEngine::new(config, Arc::new(NullSink)).unwrap();
        // No sellers: the buy-market book fills and the fifth order waits
        let orders: Vec<Order> = (0..10)
            .map(|id| Order::market(OrderId::new(id), Side::Buy, Volume::new(100), 0))
            .collect();
        let handle = engine.start_with(orders.into_iter()).unwrap();
        while handle.books().buy_market.len() < 4 {
            thread::yield_now();
        }

        let report = handle.shutdown().unwrap();
        assert_eq!(report.dispatch.routed, 4);
        assert_eq!(report.books.ids(BookKind::BuyMarket).len(), 4);
        let unrouted: Vec<OrderId> = report.unrouted.iter().map(|o| o.id).collect();
        assert_eq!(unrouted, vec![OrderId::new(4)]);
    }
}
