//! Elapsed-time queries and busy-wait delays.
//!
//! Delays spin on the fine clock; they never yield and cannot be cancelled.
//! A delay longer than one rollover period (about 71 minutes) is out of
//! contract.

use bsp_common::time::{difference, ms_to_ticks, us_to_ticks, Timestamp};
use crossbeam_utils::Backoff;

/// Source of fine-resolution timestamps.
pub trait TickSource {
    /// Current fine timestamp.
    fn raw_ticks(&self) -> Timestamp;

    /// Signed ticks since `since`.
    ///
    /// Only meaningful while `since` is less than half a rollover period
    /// (about 35 minutes) in the past.
    fn elapsed(&self, since: Timestamp) -> i32 {
        difference(since, self.raw_ticks())
    }

    /// Spin until at least `ticks` ticks have elapsed.
    fn delay_ticks(&self, ticks: u32) {
        if ticks == 0 {
            return;
        }

        let start = self.raw_ticks();
        let backoff = Backoff::new();
        // Unsigned distance so the whole rollover period is usable
        while self.raw_ticks().ticks_since(start) < ticks {
            backoff.spin();
        }
    }

    /// Spin for at least `ms` milliseconds.
    fn delay_ms(&self, ms: u32) {
        self.delay_ticks(ms_to_ticks(ms));
    }

    /// Spin for at least `us` microseconds.
    fn delay_us(&self, us: u32) {
        self.delay_ticks(us_to_ticks(us));
    }
}

impl<T: TickSource + ?Sized> TickSource for &T {
    fn raw_ticks(&self) -> Timestamp {
        (**self).raw_ticks()
    }
}

impl<T: TickSource + ?Sized> TickSource for std::sync::Arc<T> {
    fn raw_ticks(&self) -> Timestamp {
        (**self).raw_ticks()
    }
}
