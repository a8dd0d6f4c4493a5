//! Software model of the basic timer for host builds and tests.
//!
//! The model keeps a running total of counter ticks. The counter register is
//! `total % (auto_reload + 1)`; every multiple of the period is a wrap.
//!
//! Interrupt delivery is emulated synchronously: whenever the model observes
//! that the total crossed a period boundary (on a counter read, an
//! [`advance`](SimulatedTimer::advance), or when the update interrupt is
//! unmasked) it runs the bound [`UpdateHandler`] before returning. From the
//! caller's point of view the interrupt preempted it at that instruction
//! boundary, which is exactly what the wrap interrupt does on the target.
//!
//! While the update interrupt is masked, wraps only set the pending flag;
//! unmasking delivers one interrupt no matter how many wraps were missed.
//!
//! Two time sources are available:
//! - [`SimulationMode::Stepped`]: time moves only through `advance` and,
//!   optionally, a fixed number of ticks per counter read. Deterministic.
//! - [`SimulationMode::Realtime`]: time follows the host's monotonic clock at
//!   the configured counter rate.
//!
//! The model emulates one foreground context preempted by one interrupt. It
//! does not make host threads reading the counter concurrently behave like
//! preemption.

use crate::clock::timer_kernel_clock;
use crate::peripheral::{CounterSetup, TimerPeripheral, UpdateHandler};
use bsp_common::config::ClockConfig;
use bsp_common::error::{BspError, BspResult};
use std::sync::atomic::{AtomicBool, AtomicU16, AtomicU64, AtomicU8, Ordering};
use std::sync::{Arc, OnceLock};
use std::time::Instant;
use tracing::{debug, warn};

/// How simulated time advances.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SimulationMode {
    /// Explicit steps only. Each counter read additionally advances time by
    /// `ticks_per_read` while the counter runs.
    Stepped {
        /// Ticks consumed by every counter read.
        ticks_per_read: u32,
    },
    /// Follow the host monotonic clock.
    Realtime,
}

/// Simulated basic timer.
pub struct SimulatedTimer {
    clock: ClockConfig,
    mode: SimulationMode,
    origin: Instant,
    clock_enabled: AtomicBool,
    prescaler: AtomicU16,
    auto_reload: AtomicU16,
    running: AtomicBool,
    /// Ticks counted up to the last start (plus explicit advances).
    base_ticks: AtomicU64,
    /// Host time of the last start, nanoseconds since `origin`.
    started_ns: AtomicU64,
    /// Wraps already accounted for, delivered or pending.
    wraps_seen: AtomicU64,
    update_interrupt: AtomicBool,
    update_pending: AtomicBool,
    irq_enabled: AtomicBool,
    priority: AtomicU8,
    handler: OnceLock<Arc<dyn UpdateHandler>>,
    delivered: AtomicU64,
}

impl std::fmt::Debug for SimulatedTimer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SimulatedTimer")
            .field("mode", &self.mode)
            .field("running", &self.is_running())
            .field("total_ticks", &self.total_ticks())
            .field("interrupts_delivered", &self.interrupts_delivered())
            .finish_non_exhaustive()
    }
}

impl SimulatedTimer {
    /// Create a stopped timer fed by `clock`.
    #[must_use]
    pub fn new(clock: ClockConfig, mode: SimulationMode) -> Self {
        Self {
            clock,
            mode,
            origin: Instant::now(),
            clock_enabled: AtomicBool::new(false),
            prescaler: AtomicU16::new(0),
            auto_reload: AtomicU16::new(u16::MAX),
            running: AtomicBool::new(false),
            base_ticks: AtomicU64::new(0),
            started_ns: AtomicU64::new(0),
            wraps_seen: AtomicU64::new(0),
            update_interrupt: AtomicBool::new(false),
            update_pending: AtomicBool::new(false),
            irq_enabled: AtomicBool::new(false),
            priority: AtomicU8::new(0),
            handler: OnceLock::new(),
            delivered: AtomicU64::new(0),
        }
    }

    /// Deterministic timer that only moves through [`advance`](Self::advance).
    #[must_use]
    pub fn stepped(clock: ClockConfig) -> Self {
        Self::new(clock, SimulationMode::Stepped { ticks_per_read: 0 })
    }

    /// Timer that follows the host monotonic clock.
    #[must_use]
    pub fn realtime(clock: ClockConfig) -> Self {
        Self::new(clock, SimulationMode::Realtime)
    }

    /// Advance simulated time by `ticks` counter ticks, delivering any wrap
    /// interrupts on the way. Ignored while the counter is stopped.
    pub fn advance(&self, ticks: u64) {
        if !self.is_running() {
            return;
        }
        self.base_ticks.fetch_add(ticks, Ordering::AcqRel);
        self.service_interrupts(self.total_ticks());
    }

    /// Total counter ticks since the last configure.
    #[must_use]
    pub fn total_ticks(&self) -> u64 {
        let base = self.base_ticks.load(Ordering::Acquire);
        if !self.is_running() || self.mode != SimulationMode::Realtime {
            return base;
        }

        let started = self.started_ns.load(Ordering::Acquire);
        let elapsed_ns = self.host_ns().saturating_sub(started);
        base + self.ns_to_ticks(elapsed_ns)
    }

    /// Whether the counter is running.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Whether a wrap is waiting for the update interrupt to be unmasked.
    #[must_use]
    pub fn update_pending(&self) -> bool {
        self.update_pending.load(Ordering::Acquire)
    }

    /// Number of update interrupts delivered to the handler.
    #[must_use]
    pub fn interrupts_delivered(&self) -> u64 {
        self.delivered.load(Ordering::Acquire)
    }

    /// Programmed interrupt priority.
    #[must_use]
    pub fn priority(&self) -> u8 {
        self.priority.load(Ordering::Acquire)
    }

    /// Whether the interrupt line is enabled at the interrupt controller.
    #[must_use]
    pub fn irq_enabled(&self) -> bool {
        self.irq_enabled.load(Ordering::Acquire)
    }

    /// Programmed prescaler and auto-reload.
    #[must_use]
    pub fn setup(&self) -> CounterSetup {
        CounterSetup {
            prescaler: self.prescaler.load(Ordering::Acquire),
            auto_reload: self.auto_reload.load(Ordering::Acquire),
        }
    }

    /// Counter rate after the prescaler.
    #[must_use]
    pub fn counter_hz(&self) -> u64 {
        let kernel = timer_kernel_clock(&self.clock).unwrap_or(0);
        u64::from(kernel) / (u64::from(self.prescaler.load(Ordering::Acquire)) + 1)
    }

    fn period(&self) -> u64 {
        u64::from(self.auto_reload.load(Ordering::Acquire)) + 1
    }

    #[allow(clippy::cast_possible_truncation)]
    fn host_ns(&self) -> u64 {
        self.origin.elapsed().as_nanos() as u64
    }

    #[allow(clippy::cast_possible_truncation)]
    fn ns_to_ticks(&self, ns: u64) -> u64 {
        (u128::from(ns) * u128::from(self.counter_hz()) / 1_000_000_000) as u64
    }

    fn interrupt_live(&self) -> bool {
        self.update_interrupt.load(Ordering::Acquire) && self.irq_enabled.load(Ordering::Acquire)
    }

    /// Account for wraps up to `total` and run the handler for each one the
    /// interrupt would have fired for.
    fn service_interrupts(&self, total: u64) {
        let due = total / self.period();
        let seen = self.wraps_seen.fetch_max(due, Ordering::AcqRel);
        let fresh = due.saturating_sub(seen);

        if !self.interrupt_live() {
            if fresh > 0 {
                self.update_pending.store(true, Ordering::Release);
            }
            return;
        }

        let held = u64::from(self.update_pending.swap(false, Ordering::AcqRel));
        let Some(handler) = self.handler.get() else {
            return;
        };
        for _ in 0..fresh + held {
            handler.on_update();
            self.delivered.fetch_add(1, Ordering::AcqRel);
        }
    }
}

impl TimerPeripheral for SimulatedTimer {
    fn enable_clock(&self) -> Option<u32> {
        let hz = timer_kernel_clock(&self.clock)?;
        self.clock_enabled.store(true, Ordering::Release);
        Some(hz)
    }

    fn configure(&self, setup: CounterSetup) -> BspResult<()> {
        if !self.clock_enabled.load(Ordering::Acquire) {
            return Err(BspError::ClockUnavailable(
                "timer configured before its bus clock was enabled".into(),
            ));
        }
        if self.is_running() {
            return Err(BspError::Config(
                "timer must be stopped while it is configured".into(),
            ));
        }

        self.prescaler.store(setup.prescaler, Ordering::Release);
        self.auto_reload.store(setup.auto_reload, Ordering::Release);
        self.base_ticks.store(0, Ordering::Release);
        self.wraps_seen.store(0, Ordering::Release);
        self.update_pending.store(false, Ordering::Release);

        debug!(
            prescaler = setup.prescaler,
            auto_reload = setup.auto_reload,
            counter_hz = self.counter_hz(),
            "Simulated timer configured"
        );
        Ok(())
    }

    fn start(&self) {
        if self.is_running() {
            return;
        }
        self.started_ns.store(self.host_ns(), Ordering::Release);
        self.running.store(true, Ordering::Release);
    }

    fn stop(&self) {
        if !self.is_running() {
            return;
        }
        let total = self.total_ticks();
        self.service_interrupts(total);
        self.base_ticks.store(total, Ordering::Release);
        self.running.store(false, Ordering::Release);
    }

    #[allow(clippy::cast_possible_truncation)]
    fn count(&self) -> u16 {
        if let SimulationMode::Stepped { ticks_per_read } = self.mode {
            if ticks_per_read > 0 && self.is_running() {
                self.base_ticks
                    .fetch_add(u64::from(ticks_per_read), Ordering::AcqRel);
            }
        }

        let total = self.total_ticks();
        self.service_interrupts(total);
        (total % self.period()) as u16
    }

    fn enable_irq(&self, priority: u8, handler: Arc<dyn UpdateHandler>) {
        if self.handler.set(handler).is_err() {
            warn!("Simulated timer already has an update handler bound, keeping the first");
        }
        self.priority.store(priority, Ordering::Release);
        self.irq_enabled.store(true, Ordering::Release);
        self.service_interrupts(self.total_ticks());
    }

    fn disable_irq(&self) {
        self.irq_enabled.store(false, Ordering::Release);
    }

    fn set_update_interrupt(&self, enabled: bool) {
        self.update_interrupt.store(enabled, Ordering::Release);
        if enabled {
            // A wrap held pending while masked fires as soon as it is unmasked
            self.service_interrupts(self.total_ticks());
        }
    }
}
