//! Simulated time sources.
//!
//! The executor reads time only through an injected [`Clock`], assigned once.
//! [`FixedClock`] is fully deterministic; [`ClockWithOffset`] follows system time
//! shifted by an adjustable offset (time travel in test scenarios).

use std::fmt;
use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

pub trait Clock: Send + Sync + fmt::Debug {
    /// Current time in unix milliseconds.
    fn now_ms(&self) -> u64;

    /// Current time in unix seconds, as passed to the oracle.
    fn now_secs(&self) -> u32 {
        u32::try_from(self.now_ms() / 1000).unwrap_or(u32::MAX)
    }
}

fn system_now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ms(&self) -> u64 {
        system_now_ms()
    }
}

/// System time plus an offset in milliseconds (may be negative).
#[derive(Debug, Default)]
pub struct ClockWithOffset {
    offset_ms: AtomicI64,
}

impl ClockWithOffset {
    pub fn new(offset_ms: i64) -> Self {
        Self {
            offset_ms: AtomicI64::new(offset_ms),
        }
    }

    pub fn offset_ms(&self) -> i64 {
        self.offset_ms.load(Ordering::SeqCst)
    }

    pub fn set_offset_ms(&self, offset_ms: i64) {
        self.offset_ms.store(offset_ms, Ordering::SeqCst);
    }
}

impl Clock for ClockWithOffset {
    fn now_ms(&self) -> u64 {
        let now = i128::from(system_now_ms()) + i128::from(self.offset_ms());
        now.clamp(0, i128::from(u64::MAX)) as u64
    }
}

/// Manually driven clock.
#[derive(Debug, Default)]
pub struct FixedClock {
    now_ms: AtomicU64,
}

impl FixedClock {
    pub fn new(now_ms: u64) -> Self {
        Self {
            now_ms: AtomicU64::new(now_ms),
        }
    }

    pub fn set_ms(&self, now_ms: u64) {
        self.now_ms.store(now_ms, Ordering::SeqCst);
    }

    pub fn advance_ms(&self, delta_ms: u64) {
        self.now_ms.fetch_add(delta_ms, Ordering::SeqCst);
    }
}

impl Clock for FixedClock {
    fn now_ms(&self) -> u64 {
        self.now_ms.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_clock() {
        let clock = FixedClock::new(1_500);
        assert_eq!(clock.now_ms(), 1_500);
        assert_eq!(clock.now_secs(), 1);
        clock.advance_ms(2_500);
        assert_eq!(clock.now_secs(), 4);
        clock.set_ms(0);
        assert_eq!(clock.now_ms(), 0);
    }

    #[test]
    fn test_offset_clock_moves_forward() {
        let clock = ClockWithOffset::new(0);
        let base = clock.now_ms();
        clock.set_offset_ms(3_600_000);
        assert!(clock.now_ms() >= base + 3_600_000);
        assert_eq!(clock.offset_ms(), 3_600_000);
    }

    #[test]
    fn test_offset_clock_never_negative() {
        let clock = ClockWithOffset::new(i64::MIN);
        assert_eq!(clock.now_ms(), 0);
    }

    #[test]
    fn test_secs_saturate() {
        let clock = FixedClock::new(u64::MAX);
        assert_eq!(clock.now_secs(), u32::MAX);
    }
}
