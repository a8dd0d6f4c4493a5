//! The extended time base.
//!
//! [`TimeBase`] owns the timer peripheral and the wrap counter. It exposes
//! only reads, the suspend/resume switch, and teardown; the wrap counter is
//! never handed out for writing.
//!
//! On the target the timer's interrupt vector calls
//! [`TimeBase::on_update_interrupt`] (or the handler bound through
//! [`TimerPeripheral::enable_irq`], which is the same wrap counter).

use crate::clock::prescaler_for;
use crate::delay::TickSource;
use crate::peripheral::{CounterSetup, TimerPeripheral, UpdateHandler};
use crate::reader::{self, RawSample};
use crate::wrap::WrapCounter;
use bsp_common::config::TimeBaseConfig;
use bsp_common::error::{BspError, BspResult};
use bsp_common::state::{AtomicTimeBaseState, TimeBaseState};
use bsp_common::time::{CoarseTick, Timestamp, TICK_HZ};
use std::sync::Arc;
use tracing::{debug, error, info};

/// 32-bit microsecond clock built from a 16-bit timer and its wrap interrupt.
#[derive(Debug)]
pub struct TimeBase<P: TimerPeripheral> {
    timer: P,
    wraps: Arc<WrapCounter>,
    state: AtomicTimeBaseState,
    priority: u8,
}

impl<P: TimerPeripheral> TimeBase<P> {
    /// Configure `timer` as a free-running 1 MHz counter wrapping at 65535,
    /// bind the wrap interrupt at `config.tick_priority`, and start it.
    ///
    /// Everything is validated before the timer is touched, so a failed init
    /// leaves the counter stopped with its interrupt disabled.
    ///
    /// # Errors
    ///
    /// - [`BspError::InvalidPriority`] if the priority does not fit the
    ///   interrupt controller's priority bits.
    /// - [`BspError::ClockUnavailable`] if the timer kernel clock is not
    ///   running.
    /// - [`BspError::Prescaler`] if the kernel clock cannot be divided down
    ///   to exactly 1 MHz.
    pub fn init(timer: P, config: &TimeBaseConfig) -> BspResult<Self> {
        let levels = config.priority_levels();
        if u16::from(config.tick_priority) >= levels {
            error!(
                priority = config.tick_priority,
                levels, "Time base interrupt priority out of range"
            );
            return Err(BspError::InvalidPriority {
                priority: config.tick_priority,
                levels,
            });
        }

        let timer_clock_hz = timer.enable_clock().ok_or_else(|| {
            error!("Time base timer kernel clock unavailable");
            BspError::ClockUnavailable("timer kernel clock is not running".into())
        })?;
        let prescaler = prescaler_for(timer_clock_hz, TICK_HZ)?;

        timer.configure(CounterSetup {
            prescaler,
            auto_reload: u16::MAX,
        })?;

        let wraps = Arc::new(WrapCounter::new());
        let state = AtomicTimeBaseState::default();

        timer.set_update_interrupt(true);
        timer.enable_irq(
            config.tick_priority,
            Arc::clone(&wraps) as Arc<dyn UpdateHandler>,
        );
        timer.start();
        state.transition(TimeBaseState::Running)?;

        info!(
            timer_clock_hz,
            prescaler,
            priority = config.tick_priority,
            "Time base running at 1 MHz"
        );

        Ok(Self {
            timer,
            wraps,
            state,
            priority: config.tick_priority,
        })
    }

    /// Current fine timestamp in microseconds.
    ///
    /// Lock-free and safe to call from interrupt context.
    #[inline]
    pub fn raw_ticks(&self) -> Timestamp {
        self.sample().fine()
    }

    /// Current coarse tick, one unit per 1024 microseconds.
    ///
    /// This is the scheduling tick for the rest of the system. Each coarse
    /// unit is 1.024 ms, not 1 ms; the coarse counter rolls over after
    /// 2^32 units, driven by the same hardware wraps as [`raw_ticks`].
    ///
    /// [`raw_ticks`]: Self::raw_ticks
    #[inline]
    pub fn tick_count(&self) -> CoarseTick {
        self.sample().coarse()
    }

    /// One consistent (wrap count, counter) sample.
    #[inline]
    pub fn sample(&self) -> RawSample {
        reader::sample(|| self.timer.count(), &self.wraps)
    }

    /// Wrap interrupt entry point: counts one hardware counter wrap.
    #[inline]
    pub fn on_update_interrupt(&self) {
        self.wraps.on_update();
    }

    /// Stop wrap counting by masking the update interrupt.
    ///
    /// The hardware counter keeps running. One wrap that happens while
    /// suspended is delivered on resume; any further wraps are lost, so the
    /// suspension should stay below one counter period.
    ///
    /// # Errors
    ///
    /// Returns [`BspError::InvalidStateTransition`] unless running.
    pub fn suspend(&self) -> BspResult<()> {
        self.state.transition(TimeBaseState::Suspended)?;
        self.timer.set_update_interrupt(false);
        debug!("Time base suspended");
        Ok(())
    }

    /// Unmask the update interrupt after [`suspend`](Self::suspend).
    ///
    /// # Errors
    ///
    /// Returns [`BspError::InvalidStateTransition`] unless suspended.
    pub fn resume(&self) -> BspResult<()> {
        self.state.transition(TimeBaseState::Running)?;
        self.timer.set_update_interrupt(true);
        debug!("Time base resumed");
        Ok(())
    }

    /// Disable the wrap interrupt and stop the counter.
    ///
    /// Reads after teardown return the frozen last value.
    ///
    /// # Errors
    ///
    /// Returns [`BspError::InvalidStateTransition`] if already torn down.
    pub fn teardown(&self) -> BspResult<()> {
        self.state.transition(TimeBaseState::Stopped)?;
        self.timer.set_update_interrupt(false);
        self.timer.disable_irq();
        self.timer.stop();
        info!(final_ticks = self.raw_ticks().ticks(), "Time base stopped");
        Ok(())
    }

    /// Current lifecycle state.
    pub fn state(&self) -> TimeBaseState {
        self.state.load()
    }

    /// Configured wrap interrupt priority.
    pub fn priority(&self) -> u8 {
        self.priority
    }

    /// The underlying timer peripheral.
    pub fn timer(&self) -> &P {
        &self.timer
    }
}

impl<P: TimerPeripheral> TickSource for TimeBase<P> {
    #[inline]
    fn raw_ticks(&self) -> Timestamp {
        TimeBase::raw_ticks(self)
    }
}

impl<P: TimerPeripheral> Drop for TimeBase<P> {
    fn drop(&mut self) {
        if self.state.load().is_counting() {
            let _ = self.teardown();
        }
    }
}
