//! Monotonic timestamps
//!
//! Every timestamp in the system is milliseconds elapsed since the market
//! opened, measured on a monotonic clock. Copies of a `Clock` share the
//! same origin, so order timestamps and trade timestamps are comparable.

use std::time::Instant;

/// Millisecond clock anchored at market open
#[derive(Debug, Clone, Copy)]
pub struct Clock {
    origin: Instant,
}

impl Clock {
    /// Start a clock at the current instant
    pub fn start() -> Self {
        Self {
            origin: Instant::now(),
        }
    }

    /// Milliseconds since the clock was started
    pub fn now_millis(&self) -> u64 {
        self.origin.elapsed().as_millis() as u64
    }
}

impl Default for Clock {
    fn default() -> Self {
        Self::start()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_clock_is_monotonic() {
        let clock = Clock::start();
        let a = clock.now_millis();
        std::thread::sleep(Duration::from_millis(3));
        let b = clock.now_millis();
        assert!(b >= a + 2);
    }

    #[test]
    fn test_copies_share_origin() {
        let clock = Clock::start();
        let copy = clock;
        std::thread::sleep(Duration::from_millis(2));
        assert!(copy.now_millis() >= 2);
        assert!(clock.now_millis() >= 2);
    }
}
