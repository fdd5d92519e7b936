//! Matching Engine Service
//!
//! Continuous order matching over five independently locked, bounded,
//! blocking books (buy/sell market queues, buy/sell limit heaps and the
//! cancel queue). A dispatcher routes incoming orders, four triers cross
//! book heads, and a cancel worker withdraws resting orders.
//!
//! **Key Invariants:**
//! - At most one trade commit in flight; commits are totally ordered
//! - No thread waits on a book lock while holding another book lock
//! - Resting orders always carry positive volume
//! - Conservation of volume across every trade

pub mod book;
pub mod cancel;
pub mod config;
pub mod dispatcher;
pub mod engine;
pub mod events;
pub mod market;
pub mod matching;

pub use config::EngineConfig;
pub use engine::{EngineError, EngineHandle, EngineReport, MatchingEngine};
pub use events::{ChannelSink, EventSink, MarketEvent, NullSink};
