//! Order producer
//!
//! Pauses a random delay, draws an order anchored at the current market
//! price and pushes it into the engine's incoming queue, blocking while
//! the queue is full.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

use matching_engine::book::QueueBook;
use matching_engine::market::MarketState;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::generator::OrderGenerator;

/// Counters reported when the producer stops
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProducerStats {
    pub produced: u64,
    /// Times the incoming queue was found full
    pub backpressured: u64,
}

/// Pushes generated orders into the incoming queue
pub struct Producer {
    generator: OrderGenerator,
    incoming: Arc<QueueBook>,
    market: Arc<MarketState>,
    order_limit: Option<u64>,
    stop: Arc<AtomicBool>,
}

impl Producer {
    pub fn new(
        generator: OrderGenerator,
        incoming: Arc<QueueBook>,
        market: Arc<MarketState>,
        order_limit: Option<u64>,
    ) -> Self {
        Self {
            generator,
            incoming,
            market,
            order_limit,
            stop: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Flag that ends the run after the order in progress
    pub fn stop_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.stop)
    }

    /// Produce until the limit, the stop flag or a closed queue
    pub fn run(mut self) -> ProducerStats {
        info!(limit = ?self.order_limit, "producer started");
        let clock = self.market.clock();
        let mut stats = ProducerStats::default();

        while !self.stop.load(Ordering::Acquire) && self.order_limit.map_or(true, |limit| stats.produced < limit) {
            let delay = self.generator.next_delay();
            if !delay.is_zero() {
                thread::sleep(delay);
            }

            let order = self
                .generator
                .next_order(self.market.current_price(), clock.now_millis());

            let mut queue = self.incoming.lock();
            if queue.is_full() {
                stats.backpressured += 1;
                warn!(order = %order.id, "incoming order queue is full");
            }
            if queue.put(order).is_err() {
                break;
            }
            stats.produced += 1;
        }

        info!(
            produced = stats.produced,
            backpressured = stats.backpressured,
            "producer stopped"
        );
        stats
    }
}
