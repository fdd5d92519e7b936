//! Trace and price file sinks
//!
//! The trace file gets one line per committed trade:
//!
//! ```text
//! 00001234  100.5   200  00000001  L  00000002  M
//! ```
//!
//! (timestamp in ms, price, volume, then id and kind of both orders) and
//! the price file one line per price update. Both are flushed after every
//! line so they can be tailed while the market runs. Cancel outcomes go to
//! the log only.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;
use std::thread::{self, JoinHandle};

use crossbeam_channel::Receiver;
use matching_engine::events::{CancelOutcome, CancelResult};
use matching_engine::MarketEvent;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use types::numeric::Price;
use types::trade::TradeRecord;

/// Counts of what the writer consumed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraceSummary {
    pub trades: u64,
    pub prices: u64,
    pub cancels_found: u64,
    pub cancels_missed: u64,
}

/// Line writer over the trace and price outputs
#[derive(Debug)]
pub struct TraceWriter<W: Write> {
    trace: W,
    prices: W,
    summary: TraceSummary,
}

impl TraceWriter<BufWriter<File>> {
    /// Create (truncating) both output files
    pub fn create(trace_path: &Path, price_path: &Path) -> io::Result<Self> {
        Ok(Self::new(
            BufWriter::new(File::create(trace_path)?),
            BufWriter::new(File::create(price_path)?),
        ))
    }
}

impl<W: Write> TraceWriter<W> {
    pub fn new(trace: W, prices: W) -> Self {
        Self {
            trace,
            prices,
            summary: TraceSummary::default(),
        }
    }

    pub fn write_trade(&mut self, trade: &TradeRecord) -> io::Result<()> {
        writeln!(self.trace, "{trade}")?;
        self.trace.flush()?;
        self.summary.trades += 1;
        Ok(())
    }

    pub fn write_price(&mut self, price: Price) -> io::Result<()> {
        writeln!(self.prices, "{price:>5}")?;
        self.prices.flush()?;
        self.summary.prices += 1;
        Ok(())
    }

    pub fn record_cancel(&mut self, outcome: &CancelOutcome) {
        match &outcome.result {
            CancelResult::Canceled { book, order } => {
                self.summary.cancels_found += 1;
                info!(
                    cancel = %outcome.cancel_id,
                    target = %outcome.target_id,
                    %book,
                    volume = %order.volume,
                    "order canceled"
                );
            }
            CancelResult::NotFound => {
                self.summary.cancels_missed += 1;
                debug!(cancel = %outcome.cancel_id, target = %outcome.target_id, "cancel target not found");
            }
        }
    }

    /// Route one engine event to its output
    pub fn handle(&mut self, event: &MarketEvent) -> io::Result<()> {
        match event {
            MarketEvent::Trade(trade) => self.write_trade(trade),
            MarketEvent::Price { price, .. } => self.write_price(*price),
            MarketEvent::Cancel(outcome) => {
                self.record_cancel(outcome);
                Ok(())
            }
        }
    }

    pub fn summary(&self) -> TraceSummary {
        self.summary
    }

    /// Consume events until every sender is gone
    pub fn drain(mut self, events: Receiver<MarketEvent>) -> io::Result<TraceSummary> {
        for event in events {
            self.handle(&event)?;
        }
        Ok(self.summary)
    }
}

impl<W: Write + Send + 'static> TraceWriter<W> {
    /// Drain `events` on a dedicated thread
    pub fn spawn(self, events: Receiver<MarketEvent>) -> io::Result<JoinHandle<io::Result<TraceSummary>>> {
        thread::Builder::new()
            .name("trace-writer".to_string())
            .spawn(move || self.drain(events))
    }
}
