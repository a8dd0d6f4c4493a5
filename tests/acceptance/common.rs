//! Common utilities for acceptance tests.
//!
//! Provides helpers for:
//! - Building time bases on stepped or real-time simulated timers
//! - Collecting drift statistics against the host clock
//! - Generating test reports

#![allow(dead_code)]

use bsp_common::config::{ClockConfig, TimeBaseConfig};
use bsp_timebase::{SimulatedTimer, SimulationMode, TimeBase};
use std::time::Duration;

/// Time base on a stepped timer that advances `ticks_per_read` per counter read.
pub fn stepped_time_base(ticks_per_read: u32) -> TimeBase<SimulatedTimer> {
    TimeBase::init(
        SimulatedTimer::new(
            ClockConfig::default(),
            SimulationMode::Stepped { ticks_per_read },
        ),
        &TimeBaseConfig::default(),
    )
    .expect("stepped time base")
}

/// Time base following the host clock.
pub fn realtime_time_base() -> TimeBase<SimulatedTimer> {
    TimeBase::init(
        SimulatedTimer::realtime(ClockConfig::default()),
        &TimeBaseConfig::default(),
    )
    .expect("realtime time base")
}

/// Difference between time-base time and host time over a run.
#[derive(Debug, Clone, Default)]
pub struct DriftStats {
    /// Number of comparisons.
    pub samples: u64,
    /// Largest time-base lag behind the host, in microseconds.
    pub max_behind_us: i64,
    /// Largest time-base lead over the host, in microseconds.
    pub max_ahead_us: i64,
    /// Backwards steps observed between consecutive reads.
    pub backwards: u64,
}

impl DriftStats {
    /// Record one comparison of elapsed time-base ticks against host time.
    pub fn record(&mut self, timebase_us: u64, host: Duration) {
        let host_us = i64::try_from(host.as_micros()).unwrap_or(i64::MAX);
        let tb_us = i64::try_from(timebase_us).unwrap_or(i64::MAX);
        let drift = tb_us - host_us;
        self.samples += 1;
        if drift < 0 {
            self.max_behind_us = self.max_behind_us.max(-drift);
        } else {
            self.max_ahead_us = self.max_ahead_us.max(drift);
        }
    }

    /// Whether the run stayed within `tolerance_us` both ways and never went
    /// backwards.
    pub fn within(&self, tolerance_us: i64) -> bool {
        self.backwards == 0
            && self.max_behind_us <= tolerance_us
            && self.max_ahead_us <= tolerance_us
    }
}

/// Generate a JSON report from a drift run.
pub fn generate_report(test_name: &str, stats: &DriftStats, passed: bool, notes: &str) -> String {
    format!(
        r#"{{
  "test": "{test_name}",
  "passed": {passed},
  "drift": {{
    "samples": {},
    "max_behind_us": {},
    "max_ahead_us": {},
    "backwards": {}
  }},
  "notes": "{notes}"
}}"#,
        stats.samples, stats.max_behind_us, stats.max_ahead_us, stats.backwards,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_drift_stats_record() {
        let mut stats = DriftStats::default();
        stats.record(1_000, Duration::from_micros(1_200));
        stats.record(2_050, Duration::from_micros(2_000));
        assert_eq!(stats.samples, 2);
        assert_eq!(stats.max_behind_us, 200);
        assert_eq!(stats.max_ahead_us, 50);
        assert!(stats.within(200));
        assert!(!stats.within(100));
    }

    #[test]
    fn test_generate_report() {
        let stats = DriftStats {
            samples: 10,
            max_behind_us: 3,
            max_ahead_us: 1,
            backwards: 0,
        };
        let report = generate_report("drift", &stats, true, "ok");
        assert!(report.contains("\"test\": \"drift\""));
        assert!(report.contains("\"samples\": 10"));
        assert!(report.contains("\"passed\": true"));
    }
}
