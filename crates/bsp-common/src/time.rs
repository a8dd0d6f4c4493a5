//! Fixed-width timestamps and tick unit conversions.
//!
//! One tick is one microsecond. Timestamps are 32-bit and wrap every
//! 2^32 ticks (about 4294.967 seconds); all arithmetic on them is wrapping.
//!
//! Comparing two timestamps is only meaningful while they are less than half
//! the rollover period apart (about 2147.483 seconds). Beyond that the signed
//! [`difference`] flips sign.

use std::fmt;

/// Ticks per microsecond.
pub const TICKS_PER_US: u32 = 1;
/// Ticks per millisecond.
pub const TICKS_PER_MS: u32 = 1_000;
/// Ticks per second.
pub const TICKS_PER_SEC: u32 = 1_000_000;

/// Counter rate the time base runs at.
pub const TICK_HZ: u32 = TICKS_PER_SEC;

/// Bits of the hardware counter.
pub const COUNTER_BITS: u32 = 16;

/// Bits of fine resolution dropped by the coarse view.
///
/// A coarse tick is 1024 fine ticks, i.e. 1.024 ms rather than an exact
/// millisecond.
pub const COARSE_SHIFT: u32 = 10;

/// Fine-resolution wide timestamp, `(wraps << 16) | counter`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Timestamp(pub u32);

/// Coarse timestamp, `(wraps << 6) | (counter >> 10)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct CoarseTick(pub u32);

impl Timestamp {
    /// Raw tick value.
    #[must_use]
    pub const fn ticks(self) -> u32 {
        self.0
    }

    /// Timestamp `ticks` later, wrapping at the rollover.
    #[must_use]
    pub const fn wrapping_add(self, ticks: u32) -> Self {
        Self(self.0.wrapping_add(ticks))
    }

    /// Unsigned distance from `earlier` to `self`.
    ///
    /// Valid for the whole rollover period as long as `earlier` really was
    /// taken first.
    #[must_use]
    pub const fn ticks_since(self, earlier: Timestamp) -> u32 {
        self.0.wrapping_sub(earlier.0)
    }

    /// Coarse view of this timestamp's low 32 bits.
    ///
    /// Only the 22 bits that survive the shift are carried; a coarse tick read
    /// directly from the time base also carries the wrap counter's upper bits.
    #[must_use]
    pub const fn to_coarse(self) -> CoarseTick {
        CoarseTick(self.0 >> COARSE_SHIFT)
    }
}

impl CoarseTick {
    /// Raw coarse tick value.
    #[must_use]
    pub const fn ticks(self) -> u32 {
        self.0
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}us", self.0)
    }
}

impl fmt::Display for CoarseTick {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}t", self.0)
    }
}

/// Signed tick delta `now - then`.
///
/// Computed as wrapping 32-bit subtraction reinterpreted as `i32`, so a `now`
/// that has rolled over past `then` still yields a small positive value.
/// Callers must not compare timestamps more than half the rollover period
/// apart.
#[must_use]
#[allow(clippy::cast_possible_wrap)]
pub const fn difference(then: Timestamp, now: Timestamp) -> i32 {
    now.0.wrapping_sub(then.0) as i32
}

/// Milliseconds to ticks, saturating at `u32::MAX`.
#[must_use]
pub const fn ms_to_ticks(ms: u32) -> u32 {
    ms.saturating_mul(TICKS_PER_MS)
}

/// Microseconds to ticks, saturating at `u32::MAX`.
#[must_use]
pub const fn us_to_ticks(us: u32) -> u32 {
    let ticks = us as u64 * TICKS_PER_MS as u64 / 1_000;
    if ticks > u32::MAX as u64 {
        u32::MAX
    } else {
        ticks as u32
    }
}

/// Ticks to whole milliseconds.
#[must_use]
pub const fn ticks_to_ms(ticks: u32) -> u32 {
    ticks / TICKS_PER_MS
}

/// Ticks to whole microseconds.
#[must_use]
pub const fn ticks_to_us(ticks: u32) -> u32 {
    ticks / TICKS_PER_US
}
