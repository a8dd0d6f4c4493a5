//! Software extension of the hardware counter.

use crate::peripheral::UpdateHandler;
use std::sync::atomic::{AtomicU32, Ordering};

/// Number of hardware counter wraps since the time base started.
///
/// Written only by the wrap interrupt, read from any context. Never
/// decremented; wraps around itself after 2^32 increments.
#[derive(Debug, Default)]
pub struct WrapCounter(AtomicU32);

impl WrapCounter {
    /// Create a counter at zero.
    #[must_use]
    pub const fn new() -> Self {
        Self(AtomicU32::new(0))
    }

    /// Current wrap count.
    #[inline]
    pub fn load(&self) -> u32 {
        self.0.load(Ordering::Acquire)
    }

    /// Count one wrap.
    #[inline]
    pub fn increment(&self) {
        self.0.fetch_add(1, Ordering::Release);
    }
}

impl UpdateHandler for WrapCounter {
    #[inline]
    fn on_update(&self) {
        self.increment();
    }
}
