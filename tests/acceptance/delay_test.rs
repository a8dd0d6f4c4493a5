//! Delay and elapsed-time acceptance tests.

use super::common::{realtime_time_base, stepped_time_base};
use bsp_common::time::{difference, Timestamp};
use bsp_timebase::TickSource;
use std::time::{Duration, Instant};

#[test]
fn test_delay_ms_waits_at_least_requested_host_time() {
    let tb = realtime_time_base();

    for ms in [1u32, 5, 20] {
        let host_start = Instant::now();
        let start = tb.raw_ticks();
        tb.delay_ms(ms);
        let host = host_start.elapsed();

        let waited = tb.elapsed(start);
        assert!(waited >= i32::try_from(ms * 1_000).unwrap());
        assert!(
            host >= Duration::from_millis(u64::from(ms)) - Duration::from_micros(100),
            "delay_ms({ms}) returned after {host:?}"
        );
    }
}

#[test]
fn test_delay_us_on_stepped_clock() {
    let tb = stepped_time_base(3);
    let start = tb.raw_ticks();
    tb.delay_us(250);
    let waited = tb.elapsed(start);
    assert!(waited >= 250);
    // Bounded by one poll of the delay loop plus this read
    assert!(waited < 250 + 4 * 6, "waited {waited}");
}

#[test]
fn test_zero_delay_returns_immediately() {
    let tb = stepped_time_base(1);
    let start = tb.raw_ticks();
    tb.delay_ms(0);
    tb.delay_us(0);
    // Only this read advanced the clock
    assert_eq!(tb.elapsed(start), 2);
}

#[test]
fn test_delay_across_32_bit_rollover() {
    let tb = stepped_time_base(11);
    tb.timer().advance(u64::from(u32::MAX) - 40_000);
    let start = tb.raw_ticks();

    tb.delay_ms(100);
    let end = tb.raw_ticks();
    assert!(end.ticks() < start.ticks(), "clock should have rolled over");
    assert!(end.ticks_since(start) >= 100_000);
}

#[test]
fn test_elapsed_composes() {
    let tb = stepped_time_base(0);
    let a = tb.raw_ticks();
    tb.timer().advance(1_000_000);
    let b = tb.raw_ticks();
    tb.timer().advance(2_500_000);
    let c = tb.raw_ticks();

    assert_eq!(difference(a, b) + difference(b, c), difference(a, c));
    assert_eq!(tb.elapsed(a), 3_500_000);
    assert_eq!(difference(c, a), -3_500_000);
}

#[test]
fn test_elapsed_sign_flips_past_half_range() {
    let start = Timestamp(0);
    assert_eq!(difference(start, Timestamp(0x7FFF_FFFF)), i32::MAX);
    assert_eq!(difference(start, Timestamp(0x8000_0000)), i32::MIN);
}

#[test]
fn test_realtime_tracks_host_clock() {
    let tb = realtime_time_base();
    let host_start = Instant::now();
    let start = tb.raw_ticks();

    std::thread::sleep(Duration::from_millis(150));

    let host_us = i64::try_from(host_start.elapsed().as_micros()).unwrap();
    let tb_us = i64::from(tb.elapsed(start));
    assert!(
        (tb_us - host_us).abs() < 5_000,
        "time base {tb_us}us vs host {host_us}us"
    );
    // 150 ms is more than two counter periods
    assert!(tb.timer().interrupts_delivered() >= 2);
}
