//! Random order generator
//!
//! Produces the synthetic order stream: buy or sell with equal odds, then
//! market, limit or cancel by configured ratio. Volumes are whole lots of
//! 100 shares; limit prices scatter uniformly around the current price;
//! cancels target a uniformly chosen id among those issued so far. Ids are
//! sequential from zero.
//!
//! With a seed the stream is fully reproducible.

use std::time::Duration;

use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use types::ids::{IdGenerator, OrderId};
use types::numeric::{Price, Volume};
use types::order::{Order, Side};

use crate::config::ConfigError;

/// Configuration for the order generator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    /// Probability that an order buys
    pub buy_probability: f64,
    /// Share of market orders
    pub market_ratio: f64,
    /// Share of limit orders; the remainder are cancels
    pub limit_ratio: f64,
    /// Inclusive range of lots per order
    pub min_lots: u32,
    pub max_lots: u32,
    /// Shares per lot
    pub lot_size: u32,
    /// Width of the limit price band around the current price, in tenths
    pub price_spread_tenths: u32,
    /// Upper bound of the random pause before each order
    pub max_delay_ms: u64,
    /// Fixed seed for a reproducible stream; entropy when absent
    pub seed: Option<u64>,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            buy_probability: 0.5,
            market_ratio: 0.4,
            limit_ratio: 0.5,
            min_lots: 1,
            max_lots: 50,
            lot_size: 100,
            price_spread_tenths: 10,
            max_delay_ms: 10,
            seed: None,
        }
    }
}

impl GeneratorConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let probability = |name: &str, p: f64| {
            if (0.0..=1.0).contains(&p) {
                Ok(())
            } else {
                Err(ConfigError::Invalid(format!("{name} must be within [0, 1], got {p}")))
            }
        };
        probability("buy_probability", self.buy_probability)?;
        probability("market_ratio", self.market_ratio)?;
        probability("limit_ratio", self.limit_ratio)?;
        probability("market_ratio + limit_ratio", self.market_ratio + self.limit_ratio)?;

        if self.min_lots == 0 || self.min_lots > self.max_lots {
            return Err(ConfigError::Invalid(format!(
                "lot range {}..={} must be non-empty and start above zero",
                self.min_lots, self.max_lots
            )));
        }
        if self.lot_size == 0 {
            return Err(ConfigError::Invalid("lot_size must be positive".into()));
        }
        if self.max_lots.checked_mul(self.lot_size).is_none() {
            return Err(ConfigError::Invalid("max_lots * lot_size overflows a volume".into()));
        }
        Ok(())
    }
}

/// Seeded random order source.
#[derive(Debug)]
pub struct OrderGenerator {
    config: GeneratorConfig,
    ids: IdGenerator,
    rng: ChaCha8Rng,
}

impl OrderGenerator {
    pub fn new(config: GeneratorConfig) -> Self {
        let rng = match config.seed {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed),
            None => ChaCha8Rng::from_entropy(),
        };
        Self {
            config,
            ids: IdGenerator::default(),
            rng,
        }
    }

    pub fn config(&self) -> &GeneratorConfig {
        &self.config
    }

    /// Number of ids handed out so far
    pub fn issued(&self) -> u64 {
        self.ids.issued()
    }

    /// Random pause to take before the next order
    pub fn next_delay(&mut self) -> Duration {
        Duration::from_millis(self.rng.gen_range(0..=self.config.max_delay_ms))
    }

    /// Draw the next order
    ///
    /// `current` anchors limit prices; `timestamp` is stamped unchanged.
    pub fn next_order(&mut self, current: Price, timestamp: u64) -> Order {
        let id = self.ids.next_id();
        let side = if self.rng.gen_bool(self.config.buy_probability) {
            Side::Buy
        } else {
            Side::Sell
        };

        let roll: f64 = self.rng.gen();
        if roll < self.config.market_ratio {
            Order::market(id, side, self.volume(), timestamp)
        } else if roll < self.config.market_ratio + self.config.limit_ratio {
            let volume = self.volume();
            Order::limit(id, side, volume, self.limit_price(current), timestamp)
        } else {
            Order::cancel(id, side, self.cancel_target(), timestamp)
        }
    }

    fn volume(&mut self) -> Volume {
        let lots = self.rng.gen_range(self.config.min_lots..=self.config.max_lots);
        Volume::new(lots * self.config.lot_size)
    }

    /// Uniform within half the spread either side of `current`, truncated
    /// toward zero, and never below one tenth
    fn limit_price(&mut self, current: Price) -> Price {
        let u: f64 = self.rng.gen();
        let offset = f64::from(self.config.price_spread_tenths) * (0.5 - u);
        let tenths = (current.tenths() as f64 + offset).trunc() as i64;
        Price::from_tenths(tenths.max(1))
    }

    /// Any id issued so far, this order's own included
    fn cancel_target(&mut self) -> OrderId {
        let u: f64 = self.rng.gen();
        OrderId::new((u * self.issued() as f64).trunc() as u64)
    }
}

impl Iterator for OrderGenerator {
    type Item = Order;

    /// Orders anchored at a fixed price of 100.0, stamped with their id
    fn next(&mut self) -> Option<Order> {
        let timestamp = self.issued();
        Some(self.next_order(Price::from_tenths(1000), timestamp))
    }
}
