//! Matching logic module
//!
//! Crossing rules, the commit-side executor and the per-book triers

pub mod crossing;
pub mod executor;
pub mod trier;

pub use crossing::can_match;
pub use executor::TransactionExecutor;
pub use trier::{Attempt, MatchingTrier, TrierKind, TrierStats};
