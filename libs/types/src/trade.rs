//! Trade execution types
//!
//! A trade always crosses the head of one book with the head of another.
//! The shape names the kinds of the two books, trier's own book first.

use crate::ids::OrderId;
use crate::numeric::{Price, Volume};
use crate::order::OrderKind;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Kinds of the two orders crossed by a trade
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TradeShape {
    /// Market against market, executes at the current price
    MarketMarket,
    /// Market against resting limit, executes at the limit price
    MarketLimit,
    /// Limit against market, executes at the limit price
    LimitMarket,
    /// Limit against limit, executes at the floored mid of the two limits
    LimitLimit,
}

impl TradeShape {
    /// Two-letter label (`MM`, `ML`, `LM`, `LL`)
    pub fn label(&self) -> &'static str {
        match self {
            TradeShape::MarketMarket => "MM",
            TradeShape::MarketLimit => "ML",
            TradeShape::LimitMarket => "LM",
            TradeShape::LimitLimit => "LL",
        }
    }

    /// Kinds of the first and second participant
    pub fn kinds(&self) -> (OrderKind, OrderKind) {
        match self {
            TradeShape::MarketMarket => (OrderKind::Market, OrderKind::Market),
            TradeShape::MarketLimit => (OrderKind::Market, OrderKind::Limit),
            TradeShape::LimitMarket => (OrderKind::Limit, OrderKind::Market),
            TradeShape::LimitLimit => (OrderKind::Limit, OrderKind::Limit),
        }
    }
}

/// One side of a committed trade
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participant {
    pub order_id: OrderId,
    pub kind: OrderKind,
    /// Volume left resting after the trade; zero if the order was removed
    pub remaining: Volume,
}

/// Record of one committed trade, emitted in commit order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TradeRecord {
    /// Commit sequence number, gap-free from zero
    pub sequence: u64,
    /// Commit time in milliseconds since market open
    pub timestamp: u64,
    pub price: Price,
    pub volume: Volume,
    pub shape: TradeShape,
    pub first: Participant,
    pub second: Participant,
}

impl TradeRecord {
    /// Volume of the first participant before the trade; never exceeds
    /// the volume that order was created with
    pub fn first_volume_before(&self) -> Volume {
        self.volume + self.first.remaining
    }

    /// Volume of the second participant before the trade
    pub fn second_volume_before(&self) -> Volume {
        self.volume + self.second.remaining
    }
}

/// Trace-file line: timestamp, price, volume, then both participants.
impl fmt::Display for TradeRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:08}  {:>5}  {:>4}  {}  {}  {}  {}",
            self.timestamp,
            self.price,
            self.volume,
            self.first.order_id,
            self.first.kind.code(),
            self.second.order_id,
            self.second.kind.code()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record() -> TradeRecord {
        TradeRecord {
            sequence: 0,
            timestamp: 1234,
            price: Price::from_tenths(1005),
            volume: Volume::new(200),
            shape: TradeShape::LimitMarket,
            first: Participant {
                order_id: OrderId::new(1),
                kind: OrderKind::Limit,
                remaining: Volume::ZERO,
            },
            second: Participant {
                order_id: OrderId::new(2),
                kind: OrderKind::Market,
                remaining: Volume::new(100),
            },
        }
    }

    #[test]
    fn test_trace_line_format() {
        assert_eq!(
            record().to_string(),
            "00001234  100.5   200  00000001  L  00000002  M"
        );
    }

    #[test]
    fn test_volume_before() {
        let trade = record();
        assert_eq!(trade.first_volume_before(), Volume::new(200));
        assert_eq!(trade.second_volume_before(), Volume::new(300));
    }

    #[test]
    fn test_shape_kinds_match_labels() {
        for shape in [
            TradeShape::MarketMarket,
            TradeShape::MarketLimit,
            TradeShape::LimitMarket,
            TradeShape::LimitLimit,
        ] {
            let (a, b) = shape.kinds();
            let label: String = [a.code(), b.code()].iter().collect();
            assert_eq!(label, shape.label());
        }
    }
}
