//! Simulation runner
//!
//! Wires a producer, the matching engine and the trace writer together
//! and runs them until the configured bound: an order limit, a duration,
//! or (with neither) forever.

use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{anyhow, Context};
use matching_engine::{ChannelSink, EngineReport, MatchingEngine};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::config::SimulationConfig;
use crate::generator::OrderGenerator;
use crate::producer::{Producer, ProducerStats};
use crate::trace::{TraceSummary, TraceWriter};

const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Outcome of one run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationReport {
    pub producer: ProducerStats,
    pub engine: EngineReport,
    pub trace: TraceSummary,
}

/// Run one simulation to completion
pub fn run(config: &SimulationConfig) -> anyhow::Result<SimulationReport> {
    config.validate()?;

    let (sink, events) = ChannelSink::unbounded();
    let writer = TraceWriter::create(&config.trace_path, &config.price_path).with_context(|| {
        format!(
            "creating {} and {}",
            config.trace_path.display(),
            config.price_path.display()
        )
    })?;
    let writer = writer.spawn(events).context("spawning trace writer")?;

    let engine = MatchingEngine::new(config.engine.clone(), Arc::new(sink))?;
    let handle = engine.start()?;

    let producer = Producer::new(
        OrderGenerator::new(config.generator.clone()),
        engine.incoming(),
        Arc::clone(engine.market()),
        config.order_limit,
    );
    let stop = producer.stop_flag();
    let producer = thread::Builder::new()
        .name("producer".to_string())
        .spawn(move || producer.run())
        .context("spawning producer")?;

    info!(
        order_limit = ?config.order_limit,
        duration_secs = ?config.duration_secs,
        trace = %config.trace_path.display(),
        "market open"
    );
    if !config.is_bounded() {
        info!("no order limit or duration set, running until interrupted");
    }

    let deadline = config.duration().map(|d| Instant::now() + d);
    while !producer.is_finished() && deadline.map_or(true, |at| Instant::now() < at) {
        thread::sleep(POLL_INTERVAL);
    }
    stop.store(true, Ordering::Release);

    // Closing the incoming queue also releases a producer blocked on it
    let engine_report = handle.shutdown()?;
    let producer_stats = producer
        .join()
        .map_err(|_| anyhow!("producer thread panicked"))?;

    // The engine holds the last sender; once it is gone the writer finishes
    drop(engine);
    let trace = writer
        .join()
        .map_err(|_| anyhow!("trace writer thread panicked"))?
        .context("writing trace files")?;

    info!(
        produced = producer_stats.produced,
        trades = engine_report.trades,
        final_price = %engine_report.final_price,
        cancels_found = trace.cancels_found,
        "market closed"
    );
    Ok(SimulationReport {
        producer: producer_stats,
        engine: engine_report,
        trace,
    })
}
