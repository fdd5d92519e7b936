//! Fixed-point price and share volume
//!
//! Prices are integers counting tenths of a currency unit, so `1005` is
//! `100.5`. There is no finer precision anywhere in the system.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, Sub};

/// Price in tenths of a currency unit
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Price(i64);

impl Price {
    pub const ZERO: Price = Price(0);

    /// Create a price from a count of tenths
    pub const fn from_tenths(tenths: i64) -> Self {
        Self(tenths)
    }

    /// Raw count of tenths
    pub const fn tenths(&self) -> i64 {
        self.0
    }

    /// Mean of two prices, rounded toward negative infinity.
    ///
    /// `(1003 + 1000) / 2` is `1001`, never `1002`.
    pub fn midpoint(self, other: Price) -> Price {
        Price((self.0 + other.0).div_euclid(2))
    }

    pub fn is_positive(&self) -> bool {
        self.0 > 0
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        let text = format!("{}{}.{}", sign, abs / 10, abs % 10);
        // Honour width/alignment flags such as `{:>5}`
        f.pad(&text)
    }
}

/// Number of shares
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Volume(u32);

impl Volume {
    pub const ZERO: Volume = Volume(0);

    pub const fn new(shares: u32) -> Self {
        Self(shares)
    }

    pub const fn shares(&self) -> u32 {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }
}

impl Add for Volume {
    type Output = Volume;

    /// # Panics
    /// Panics in debug builds if the sum exceeds `u32::MAX`; widen through
    /// [`Volume::shares`] to total unrelated orders
    fn add(self, rhs: Volume) -> Volume {
        Volume(self.0 + rhs.0)
    }
}

impl Sub for Volume {
    type Output = Volume;

    /// # Panics
    /// Panics in debug builds if `rhs` exceeds `self`
    fn sub(self, rhs: Volume) -> Volume {
        debug_assert!(rhs.0 <= self.0, "volume underflow: {} - {}", self.0, rhs.0);
        Volume(self.0.saturating_sub(rhs.0))
    }
}

impl fmt::Display for Volume {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_price_display() {
        assert_eq!(Price::from_tenths(1005).to_string(), "100.5");
        assert_eq!(Price::from_tenths(7).to_string(), "0.7");
        assert_eq!(Price::from_tenths(-15).to_string(), "-1.5");
        assert_eq!(format!("{:>6}", Price::from_tenths(995)), "  99.5");
    }

    #[test]
    fn test_midpoint_floors() {
        let bid = Price::from_tenths(1003);
        let ask = Price::from_tenths(1000);
        assert_eq!(bid.midpoint(ask), Price::from_tenths(1001));
        assert_eq!(ask.midpoint(bid), Price::from_tenths(1001));
        assert_eq!(bid.midpoint(bid), bid);
    }

    #[test]
    fn test_midpoint_floors_negative() {
        assert_eq!(
            Price::from_tenths(-3).midpoint(Price::from_tenths(0)),
            Price::from_tenths(-2)
        );
    }

    #[test]
    fn test_volume_arithmetic() {
        let a = Volume::new(300);
        let b = Volume::new(200);
        assert_eq!(a - b, Volume::new(100));
        assert_eq!(a + b, Volume::new(500));
        assert_eq!(a.min(b), b);
        assert!((b - b).is_zero());
    }

    #[test]
    #[should_panic(expected = "volume underflow")]
    #[cfg(debug_assertions)]
    fn test_volume_underflow_panics_in_debug() {
        let _ = Volume::new(1) - Volume::new(2);
    }

    mod props {
        use super::super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn midpoint_lies_between_and_is_symmetric(a in 1i64..100_000, b in 1i64..100_000) {
                let (pa, pb) = (Price::from_tenths(a), Price::from_tenths(b));
                let mid = pa.midpoint(pb);
                prop_assert_eq!(mid, pb.midpoint(pa));
                prop_assert!(mid >= pa.min(pb) && mid <= pa.max(pb));
                prop_assert!(2 * mid.tenths() <= a + b && a + b - 2 * mid.tenths() <= 1);
            }
        }
    }
}
