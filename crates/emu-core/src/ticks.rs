//! Cycle counting.

use serde::{Deserialize, Serialize};

/// A count of CPU clock cycles.
///
/// Cores keep a running total of every cycle they have consumed, including
/// idle cycles, so hosts can line up peripherals against CPU time.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
pub struct Ticks(pub u64);

impl Ticks {
    pub const ZERO: Self = Self(0);

    #[must_use]
    pub const fn new(count: u64) -> Self {
        Self(count)
    }

    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }

    /// Add `cycles` to the count.
    pub fn advance(&mut self, cycles: u32) {
        self.0 = self.0.wrapping_add(u64::from(cycles));
    }
}

impl core::ops::Add for Ticks {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self(self.0 + rhs.0)
    }
}

impl core::ops::AddAssign for Ticks {
    fn add_assign(&mut self, rhs: Self) {
        self.0 += rhs.0;
    }
}

impl core::ops::Sub for Ticks {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        Self(self.0.saturating_sub(rhs.0))
    }
}

/// Divides CPU cycles down to a peripheral clock.
///
/// On-chip timers run off a fixed fraction of the CPU clock. The divider
/// accumulates cycles and reports how many whole peripheral ticks elapsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TickDivider {
    divisor: u32,
    accumulated: u32,
}

impl TickDivider {
    /// Create a divider. A divisor of zero is treated as one.
    #[must_use]
    pub const fn new(divisor: u32) -> Self {
        Self {
            divisor: if divisor == 0 { 1 } else { divisor },
            accumulated: 0,
        }
    }

    /// Feed `cycles` in and return the number of whole ticks that elapsed.
    pub fn advance(&mut self, cycles: u32) -> u32 {
        let total = self.accumulated + cycles;
        self.accumulated = total % self.divisor;
        total / self.divisor
    }

    /// Cycles remaining until the next tick.
    #[must_use]
    pub const fn until_next(&self) -> u32 {
        self.divisor - self.accumulated
    }

    #[must_use]
    pub const fn divisor(&self) -> u32 {
        self.divisor
    }

    pub fn reset(&mut self) {
        self.accumulated = 0;
    }
}
