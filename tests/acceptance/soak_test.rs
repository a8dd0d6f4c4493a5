//! Soak (long-duration stability) tests.
//!
//! A real-time time base is read continuously and compared against the host
//! monotonic clock. The run checks that reads never go backwards and that
//! accumulated time-base uptime stays close to host time across many
//! hardware wraps.
//!
//! # Acceptance Criteria
//!
//! - No backwards step between consecutive reads
//! - Drift against the host clock below 2 ms over the run
//! - The full-length run crosses the 32-bit fine rollover (about 71.6 minutes)

use super::common::{generate_report, realtime_time_base, DriftStats};
use bsp_common::time::difference;
use bsp_timebase::TickSource;
use std::time::{Duration, Instant};

/// Configuration for soak tests.
pub struct SoakConfig {
    /// Test duration.
    pub duration: Duration,
    /// Pause between reads.
    pub read_interval: Duration,
    /// How often to compare against host time.
    pub sample_interval: Duration,
    /// Maximum allowed drift in microseconds.
    pub tolerance_us: i64,
}

impl SoakConfig {
    /// A few seconds, enough for dozens of counter wraps.
    pub fn short() -> Self {
        Self {
            duration: Duration::from_secs(3),
            read_interval: Duration::from_micros(200),
            sample_interval: Duration::from_millis(50),
            tolerance_us: 2_000,
        }
    }

    /// Long enough to cross the 32-bit fine rollover.
    pub fn full_rollover() -> Self {
        Self {
            duration: Duration::from_secs(75 * 60),
            read_interval: Duration::from_millis(1),
            sample_interval: Duration::from_secs(1),
            tolerance_us: 2_000,
        }
    }
}

/// Run a soak test with the given configuration.
pub fn run_soak_test(config: &SoakConfig) -> DriftStats {
    let tb = realtime_time_base();
    let mut stats = DriftStats::default();

    let host_start = Instant::now();
    let mut last = tb.raw_ticks();
    let mut uptime_us = 0u64;
    let mut last_sample = Instant::now();

    while host_start.elapsed() < config.duration {
        std::thread::sleep(config.read_interval);

        let now = tb.raw_ticks();
        if difference(last, now) < 0 {
            stats.backwards += 1;
        }
        uptime_us += u64::from(now.ticks_since(last));
        last = now;

        if last_sample.elapsed() >= config.sample_interval {
            stats.record(uptime_us, host_start.elapsed());
            last_sample = Instant::now();
        }
    }

    stats.record(uptime_us, host_start.elapsed());
    stats
}

#[test]
fn test_soak_short() {
    let config = SoakConfig::short();
    let stats = run_soak_test(&config);

    let passed = stats.within(config.tolerance_us);
    println!(
        "{}",
        generate_report("soak_short", &stats, passed, "real-time simulated timer")
    );
    assert!(stats.samples >= 10);
    assert!(passed, "{stats:?}");
}

#[test]
#[ignore = "Runs for 75 minutes"]
fn test_soak_full_rollover() {
    let config = SoakConfig::full_rollover();
    let stats = run_soak_test(&config);

    let passed = stats.within(config.tolerance_us);
    println!(
        "{}",
        generate_report("soak_full_rollover", &stats, passed, "crosses 2^32 us")
    );
    assert!(passed, "{stats:?}");
}
