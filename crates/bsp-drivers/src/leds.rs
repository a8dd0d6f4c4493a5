//! The board's four user LEDs.

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;

/// Push-pull output pin.
pub trait OutputPin: Send {
    /// Drive the pin high.
    fn set_high(&mut self);

    /// Drive the pin low.
    fn set_low(&mut self);
}

/// One of the user LEDs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UserLed {
    /// LED 1.
    Led1,
    /// LED 2.
    Led2,
    /// LED 3.
    Led3,
    /// LED 4.
    Led4,
}

impl UserLed {
    /// All LEDs in board order.
    pub const ALL: [UserLed; 4] = [Self::Led1, Self::Led2, Self::Led3, Self::Led4];

    /// Zero-based position in [`ALL`](Self::ALL).
    pub const fn index(self) -> usize {
        match self {
            Self::Led1 => 0,
            Self::Led2 => 1,
            Self::Led3 => 2,
            Self::Led4 => 3,
        }
    }
}

impl fmt::Display for UserLed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "LED{}", self.index() + 1)
    }
}

/// The four user LEDs, each bound to its output pin.
#[derive(Debug)]
pub struct UserLeds<P: OutputPin> {
    pins: [P; 4],
}

impl<P: OutputPin> UserLeds<P> {
    /// Bind pins in [`UserLed::ALL`] order.
    pub fn new(pins: [P; 4]) -> Self {
        Self { pins }
    }

    /// Switch one LED on or off.
    pub fn set(&mut self, led: UserLed, on: bool) {
        let pin = &mut self.pins[led.index()];
        if on {
            pin.set_high();
        } else {
            pin.set_low();
        }
    }

    /// Switch every LED off.
    pub fn all_off(&mut self) {
        for led in UserLed::ALL {
            self.set(led, false);
        }
    }
}

/// Simulated pin. Clones share state, so a test can keep one handle while
/// the driver owns another.
#[derive(Debug, Clone, Default)]
pub struct SimulatedPin {
    level: Arc<AtomicBool>,
    writes: Arc<AtomicU32>,
}

impl SimulatedPin {
    /// Create a pin driven low.
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the pin is driven high.
    pub fn is_high(&self) -> bool {
        self.level.load(Ordering::Acquire)
    }

    /// Number of writes so far.
    pub fn writes(&self) -> u32 {
        self.writes.load(Ordering::Relaxed)
    }

    fn drive(&self, high: bool) {
        self.level.store(high, Ordering::Release);
        self.writes.fetch_add(1, Ordering::Relaxed);
    }
}

impl OutputPin for SimulatedPin {
    fn set_high(&mut self) {
        self.drive(true);
    }

    fn set_low(&mut self) {
        self.drive(false);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn board() -> (UserLeds<SimulatedPin>, [SimulatedPin; 4]) {
        let pins: [SimulatedPin; 4] = Default::default();
        (UserLeds::new(pins.clone()), pins)
    }

    #[test]
    fn test_set_drives_matching_pin() {
        let (mut leds, probes) = board();
        leds.set(UserLed::Led3, true);

        assert!(probes[2].is_high());
        assert!(!probes[0].is_high());
        assert!(!probes[1].is_high());
        assert!(!probes[3].is_high());

        leds.set(UserLed::Led3, false);
        assert!(!probes[2].is_high());
        assert_eq!(probes[2].writes(), 2);
    }

    #[test]
    fn test_all_off() {
        let (mut leds, probes) = board();
        for led in UserLed::ALL {
            leds.set(led, true);
        }
        leds.all_off();
        assert!(probes.iter().all(|p| !p.is_high()));
    }

    #[test]
    fn test_display() {
        assert_eq!(UserLed::Led1.to_string(), "LED1");
        assert_eq!(UserLed::Led4.to_string(), "LED4");
    }
}
