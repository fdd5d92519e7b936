//! Engine configuration

use std::time::Duration;

use serde::{Deserialize, Serialize};
use types::numeric::Price;

use crate::book::DEFAULT_BOOK_CAPACITY;
use crate::engine::EngineError;

/// Matching engine configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Capacity of every book, including the incoming queue
    pub book_capacity: usize,
    /// Market price before the first trade, in tenths
    pub initial_price: Price,
    /// Pause after a round without a trade; zero only yields
    pub idle_backoff_micros: u64,
    /// How long shutdown lets the dispatcher route queued orders before
    /// closing the books
    pub drain_timeout_ms: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            book_capacity: DEFAULT_BOOK_CAPACITY,
            initial_price: Price::from_tenths(1000),
            idle_backoff_micros: 50,
            drain_timeout_ms: 1_000,
        }
    }
}

impl EngineConfig {
    pub fn idle_backoff(&self) -> Duration {
        Duration::from_micros(self.idle_backoff_micros)
    }

    pub fn drain_timeout(&self) -> Duration {
        Duration::from_millis(self.drain_timeout_ms)
    }

    /// Reject configurations the engine cannot start with
    pub fn validate(&self) -> Result<(), EngineError> {
        if self.book_capacity == 0 {
            return Err(EngineError::InvalidConfig("book capacity must be positive".into()));
        }
        if !self.initial_price.is_positive() {
            return Err(EngineError::InvalidConfig(format!(
                "initial price must be positive, got {}",
                self.initial_price
            )));
        }
        Ok(())
    }
}
