//! Rollover behavior of the extended counter.
//!
//! Covers the 16-bit hardware wrap, the wrap interrupt landing between the
//! two counter samples, and the 32-bit rollover of both timestamp views.

use super::common::stepped_time_base;
use bsp_common::time::{difference, CoarseTick, Timestamp};
use bsp_timebase::TickSource;

#[test]
fn test_every_read_crossing_a_wrap_is_corrected() {
    // One tick per counter read: the two samples of a read straddle every
    // wrap boundary exactly once per period
    let tb = stepped_time_base(1);
    let mut resampled = 0u32;
    let mut last = tb.raw_ticks();

    for _ in 0..(4 * 65_536) {
        let s = tb.sample();
        if s.resampled {
            resampled += 1;
            assert_eq!(s.lower, 0, "wrap seen with lower={:#x}", s.lower);
        }
        let now = s.fine();
        assert_eq!(now.ticks_since(last), 2, "{last} -> {now}");
        last = now;
    }

    assert!(resampled >= 7, "only {resampled} wraps crossed mid-read");
}

#[test]
fn test_fine_rolls_over_at_32_bits() {
    let tb = stepped_time_base(0);
    tb.timer().advance(u64::from(u32::MAX) - 99);
    let before = tb.raw_ticks();
    assert_eq!(before, Timestamp(u32::MAX - 99));

    tb.timer().advance(200);
    let after = tb.raw_ticks();
    assert_eq!(after, Timestamp(100));
    assert_eq!(difference(before, after), 200);
    assert_eq!(tb.elapsed(before), 200);
}

#[test]
fn test_coarse_tracks_fine_through_rollover() {
    let tb = stepped_time_base(0);
    let step = 65_536 * 1_024 + 777;

    for _ in 0..70 {
        tb.timer().advance(step);
        let s = tb.sample();
        assert_eq!(
            s.coarse().ticks() & 0x3F_FFFF,
            s.fine().ticks() >> 10,
            "upper={} lower={:#x}",
            s.upper,
            s.lower
        );
    }

    // The coarse counter keeps counting past the fine rollover
    let s = tb.sample();
    assert!(s.upper > 65_536);
    assert_eq!(tb.tick_count(), CoarseTick((s.upper << 6) | (u32::from(s.lower) >> 10)));
}

#[test]
fn test_suspended_wrap_is_delivered_on_resume() {
    let tb = stepped_time_base(0);
    tb.timer().advance(0x8000);
    let before = tb.raw_ticks();

    tb.suspend().unwrap();
    tb.timer().advance(0x9000);
    assert!(tb.timer().update_pending());
    // Stale high word while the interrupt is held off
    assert!(difference(before, tb.raw_ticks()) < 0);

    tb.resume().unwrap();
    assert!(!tb.timer().update_pending());
    assert_eq!(tb.raw_ticks(), Timestamp(0x1_1000));
    assert_eq!(tb.elapsed(before), 0x9000);
}
