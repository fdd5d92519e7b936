//! Error types for order validation
//!
//! Orders that fail validation never reach a book.

use crate::ids::OrderId;
use thiserror::Error;

/// Order validation errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum OrderError {
    #[error("Order {order_id} has zero volume")]
    ZeroVolume { order_id: OrderId },

    #[error("Limit order {order_id} has non-positive price {price_tenths}")]
    InvalidPrice { order_id: OrderId, price_tenths: i64 },

    #[error("Cancel order {order_id} has no target")]
    MissingTarget { order_id: OrderId },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_order_error_display() {
        let err = OrderError::ZeroVolume {
            order_id: OrderId::new(3),
        };
        assert_eq!(err.to_string(), "Order 00000003 has zero volume");
    }

    #[test]
    fn test_invalid_price_display() {
        let err = OrderError::InvalidPrice {
            order_id: OrderId::new(9),
            price_tenths: -4,
        };
        assert!(err.to_string().contains("-4"));
    }
}
