//! Lock-free reconstruction of the wide timestamp.
//!
//! The hardware counter and the wrap counter cannot be read together
//! atomically, and the wrap interrupt may fire between the two reads. The
//! reader samples counter, wrap count, counter again:
//!
//! - If the second counter sample is lower than the first, the counter
//!   wrapped in between. The wrap count read in the middle may or may not
//!   include that wrap, so it is read again and paired with the second
//!   sample.
//! - Otherwise nothing wrapped and the middle read pairs with the second
//!   sample.
//!
//! At most one wrap may happen between the first and last sample. Interrupt
//! latency for the wrap interrupt therefore has to stay below one counter
//! period (65.536 ms at 1 MHz).

use crate::wrap::WrapCounter;
use bsp_common::time::{CoarseTick, Timestamp, COARSE_SHIFT, COUNTER_BITS};

/// Wrap-counter bits kept in the coarse view below the 32-bit boundary.
const COARSE_WRAP_SHIFT: u32 = COUNTER_BITS - COARSE_SHIFT;

/// Counter bits that survive the coarse shift.
const COARSE_COUNTER_MASK: u32 = (1 << COARSE_WRAP_SHIFT) - 1;

/// A consistent pair of wrap count and counter value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawSample {
    /// Wrap count matching `lower`.
    pub upper: u32,
    /// Hardware counter value.
    pub lower: u16,
    /// Whether a wrap was seen mid-read and the wrap count re-read.
    pub resampled: bool,
}

impl RawSample {
    /// Fine view: `(upper << 16) | lower`, truncated to 32 bits.
    #[must_use]
    pub const fn fine(self) -> Timestamp {
        Timestamp((self.upper << COUNTER_BITS) | self.lower as u32)
    }

    /// Coarse view: `(upper << 6) | ((lower >> 10) & 0x3F)`.
    #[must_use]
    pub const fn coarse(self) -> CoarseTick {
        CoarseTick(
            (self.upper << COARSE_WRAP_SHIFT)
                | ((self.lower as u32 >> COARSE_SHIFT) & COARSE_COUNTER_MASK),
        )
    }
}

/// Take one consistent sample of `wraps` and the hardware counter.
///
/// `count` reads the hardware counter register. It is called exactly twice.
#[inline]
pub fn sample<C>(mut count: C, wraps: &WrapCounter) -> RawSample
where
    C: FnMut() -> u16,
{
    let lower1 = count();
    let upper1 = wraps.load();
    let lower2 = count();

    if lower2 < lower1 {
        // Wrapped mid-read; `upper1` may predate the wrap interrupt
        RawSample {
            upper: wraps.load(),
            lower: lower2,
            resampled: true,
        }
    } else {
        RawSample {
            upper: upper1,
            lower: lower2,
            resampled: false,
        }
    }
}
