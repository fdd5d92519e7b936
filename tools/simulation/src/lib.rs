//! Stock market simulation
//!
//! The collaborators around the matching engine: a seeded random order
//! generator, a producer feeding the engine's incoming queue, trace and
//! price file sinks, and the runner behind the `stock-market` binary.
//!
//! # Modules
//! - `config`: JSON run configuration
//! - `generator`: Random order stream with reproducible seeding
//! - `producer`: Thread pushing generated orders into the engine
//! - `trace`: Trade trace and share price files
//! - `runner`: End-to-end run with bounded or unbounded duration

pub mod config;
pub mod generator;
pub mod producer;
pub mod runner;
pub mod trace;

pub use config::{ConfigError, SimulationConfig};
pub use runner::{run, SimulationReport};

/// Crate version constant
pub const VERSION: &str = "1.0.0";
