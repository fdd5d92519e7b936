//! Types library for the continuous stock market
//!
//! Value types shared by the matching engine and the simulation tooling.
//! Everything here is plain data: no locks, no threads.
//!
//! # Modules
//! - `ids`: Order identifiers and the sequential id generator
//! - `numeric`: Fixed-point price (tenths) and share volume
//! - `order`: Order record, side and kind
//! - `trade`: Trade shapes and the committed trade record
//! - `clock`: Monotonic millisecond clock used for timestamps
//! - `errors`: Order validation errors

pub mod clock;
pub mod errors;
pub mod ids;
pub mod numeric;
pub mod order;
pub mod trade;
