//! Order record, side and kind
//!
//! An order is immutable after creation except for its volume, which
//! shrinks as the order is partially filled.

use crate::errors::OrderError;
use crate::ids::OrderId;
use crate::numeric::{Price, Volume};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Order side (buyer or seller)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Side {
    /// Buy order (bid)
    Buy,
    /// Sell order (ask)
    Sell,
}

impl Side {
    /// Whether price `a` has strictly higher priority than `b` on this side.
    ///
    /// The best bid is the highest price, the best ask the lowest.
    pub fn prefers(&self, a: Price, b: Price) -> bool {
        match self {
            Side::Buy => a > b,
            Side::Sell => a < b,
        }
    }

    /// Single-letter code used in logs and trace files
    pub fn code(&self) -> char {
        match self {
            Side::Buy => 'B',
            Side::Sell => 'S',
        }
    }
}

/// What the order asks the market to do
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OrderKind {
    /// Trade at whatever price the market offers
    Market,
    /// Trade only at the given price or better
    Limit,
    /// Withdraw a previously placed order
    Cancel,
}

impl OrderKind {
    /// Single-letter code used in logs and trace files
    pub fn code(&self) -> char {
        match self {
            OrderKind::Market => 'M',
            OrderKind::Limit => 'L',
            OrderKind::Cancel => 'C',
        }
    }
}

/// A single order flowing through the market
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    /// Order to withdraw; only set on cancel orders
    pub target: Option<OrderId>,
    /// Creation time in milliseconds since market open
    pub timestamp: u64,
    pub volume: Volume,
    /// Only meaningful for limit orders
    pub price: Price,
    pub side: Side,
    pub kind: OrderKind,
}

impl Order {
    /// Create a market order
    pub fn market(id: OrderId, side: Side, volume: Volume, timestamp: u64) -> Self {
        Self {
            id,
            target: None,
            timestamp,
            volume,
            price: Price::ZERO,
            side,
            kind: OrderKind::Market,
        }
    }

    /// Create a limit order
    pub fn limit(id: OrderId, side: Side, volume: Volume, price: Price, timestamp: u64) -> Self {
        Self {
            id,
            target: None,
            timestamp,
            volume,
            price,
            side,
            kind: OrderKind::Limit,
        }
    }

    /// Create a cancel request for `target`
    ///
    /// Cancel requests carry no volume; they never rest as liquidity.
    pub fn cancel(id: OrderId, side: Side, target: OrderId, timestamp: u64) -> Self {
        Self {
            id,
            target: Some(target),
            timestamp,
            volume: Volume::ZERO,
            price: Price::ZERO,
            side,
            kind: OrderKind::Cancel,
        }
    }

    /// Check that the order may enter a book
    pub fn validate(&self) -> Result<(), OrderError> {
        match self.kind {
            OrderKind::Cancel if self.target.is_none() => {
                Err(OrderError::MissingTarget { order_id: self.id })
            }
            OrderKind::Cancel => Ok(()),
            _ if self.volume.is_zero() => Err(OrderError::ZeroVolume { order_id: self.id }),
            OrderKind::Limit if !self.price.is_positive() => Err(OrderError::InvalidPrice {
                order_id: self.id,
                price_tenths: self.price.tenths(),
            }),
            OrderKind::Market | OrderKind::Limit => Ok(()),
        }
    }

    /// Reduce the resting volume by an executed amount
    ///
    /// # Panics
    /// Panics in debug builds if the fill exceeds or exhausts the volume;
    /// fully filled orders are removed from their book instead.
    pub fn fill(&mut self, executed: Volume) {
        debug_assert!(
            executed < self.volume,
            "partial fill of {} must leave volume on order {} (has {})",
            executed,
            self.id,
            self.volume
        );
        self.volume = self.volume - executed;
    }
}

impl fmt::Display for Order {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            OrderKind::Market => write!(
                f,
                "{} {:08} {} Market ({:>4})",
                self.id,
                self.timestamp,
                self.side.code(),
                self.volume
            ),
            OrderKind::Limit => write!(
                f,
                "{} {:08} {} Limit  ({:>4},{:>5})",
                self.id,
                self.timestamp,
                self.side.code(),
                self.volume,
                self.price
            ),
            OrderKind::Cancel => match self.target {
                Some(target) => write!(f, "{} {:08} * Cancel {}", self.id, self.timestamp, target),
                None => write!(f, "{} {:08} * Cancel ?", self.id, self.timestamp),
            },
        }
    }
}
