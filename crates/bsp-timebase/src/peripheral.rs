//! Timer peripheral abstraction.
//!
//! The time base only needs a free-running up-counter that wraps and signals
//! each wrap. This trait is the seam between the time base and either the
//! real basic timer (TIM6 on the reference board) or [`SimulatedTimer`].
//!
//! [`SimulatedTimer`]: crate::simulated::SimulatedTimer

use bsp_common::BspResult;
use std::sync::Arc;

/// Receiver for the timer's update (wrap) interrupt.
pub trait UpdateHandler: Send + Sync {
    /// Called once per counter wrap, from interrupt context.
    ///
    /// Must not block and must not fail.
    fn on_update(&self);
}

/// Counter register settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CounterSetup {
    /// Prescaler register value; the counter ticks at `clock / (prescaler + 1)`.
    pub prescaler: u16,
    /// Auto-reload value; the counter wraps to zero after reaching it.
    pub auto_reload: u16,
}

/// Hardware timer used as the time base source.
///
/// All methods take `&self`: the counter register is read from foreground
/// and interrupt context alike, and register writes are single stores.
pub trait TimerPeripheral: Send + Sync {
    /// Enable the peripheral's bus clock and report the timer kernel clock.
    ///
    /// Returns `None` when the kernel clock is not running.
    fn enable_clock(&self) -> Option<u32>;

    /// Program prescaler and auto-reload, counting up, and reset the counter.
    fn configure(&self, setup: CounterSetup) -> BspResult<()>;

    /// Start counting.
    fn start(&self);

    /// Stop counting. The counter register holds its value.
    fn stop(&self);

    /// Current counter register value.
    fn count(&self) -> u16;

    /// Set the interrupt priority, bind `handler`, and enable the interrupt
    /// line at the interrupt controller.
    fn enable_irq(&self, priority: u8, handler: Arc<dyn UpdateHandler>);

    /// Disable the interrupt line at the interrupt controller.
    fn disable_irq(&self);

    /// Unmask or mask the update (wrap) interrupt at the peripheral.
    ///
    /// A wrap that happens while masked stays pending and is delivered once
    /// when unmasked.
    fn set_update_interrupt(&self, enabled: bool);
}
