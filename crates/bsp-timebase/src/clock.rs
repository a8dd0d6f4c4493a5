//! Timer kernel clock and prescaler computation.
//!
//! Timers on APB1 run at PCLK1 when the bus is undivided and at twice PCLK1
//! otherwise, or four times PCLK1 for dividers above two when the timer
//! prescaler selection (TIMPRE) is set.

use bsp_common::config::{Apb1Divider, ClockConfig};
use bsp_common::error::{BspError, BspResult};

/// Timer kernel clock for the given clock tree, `None` if PCLK1 is not running.
#[must_use]
pub fn timer_kernel_clock(clock: &ClockConfig) -> Option<u32> {
    if clock.pclk1_hz == 0 {
        return None;
    }

    let multiplier = match clock.apb1_divider {
        Apb1Divider::Div1 => 1,
        Apb1Divider::Div2 => 2,
        _ if clock.timer_prescaler => 4,
        _ => 2,
    };

    clock.pclk1_hz.checked_mul(multiplier)
}

/// Prescaler register value that divides `timer_clock_hz` to exactly
/// `counter_hz`.
///
/// # Errors
///
/// Returns [`BspError::Prescaler`] if the division is not exact or the
/// result does not fit the 16-bit prescaler register.
pub fn prescaler_for(timer_clock_hz: u32, counter_hz: u32) -> BspResult<u16> {
    let err = || BspError::Prescaler {
        timer_clock_hz,
        counter_hz,
    };

    if counter_hz == 0 || timer_clock_hz < counter_hz || timer_clock_hz % counter_hz != 0 {
        return Err(err());
    }

    u16::try_from(timer_clock_hz / counter_hz - 1).map_err(|_| err())
}
