//! Crossing detection and trade pricing
//!
//! Pure functions deciding whether two book heads may trade and at what
//! price. They never touch a book or the market state.

use types::numeric::Price;
use types::order::{Order, Side};
use types::trade::TradeShape;

/// Check if a bid and ask can match at given prices
///
/// For a buy order to match with a sell order the bid must be at or
/// above the ask.
pub fn can_match(bid_price: Price, ask_price: Price) -> bool {
    bid_price >= ask_price
}

/// Whether a market order on `side` should take a resting limit at
/// `limit_price` instead of waiting for a market counterpart
///
/// A buy market takes an ask strictly below the current price; a sell
/// market takes a bid strictly above it.
pub fn market_takes_limit(side: Side, limit_price: Price, current: Price) -> bool {
    match side {
        Side::Buy => limit_price < current,
        Side::Sell => limit_price > current,
    }
}

/// Execution price of a trade between `first` (the trier's own head) and
/// `second` (the counterpart head)
///
/// Market against market keeps the current price, a trade touching one
/// limit order executes at that limit, and limit against limit at the
/// floored mean of the two.
pub fn trade_price(shape: TradeShape, first: &Order, second: &Order, current: Price) -> Price {
    match shape {
        TradeShape::MarketMarket => current,
        TradeShape::MarketLimit => second.price,
        TradeShape::LimitMarket => first.price,
        TradeShape::LimitLimit => first.price.midpoint(second.price),
    }
}
