//! Board peripherals around the time base.
//!
//! This crate provides:
//! - [`xspi`] module with the [`XspiBus`] abstraction and a simulated bus
//! - [`psram`] module with the APS256 PSRAM bring-up
//! - [`leds`] module with the four user LEDs
//! - [`console`] module with the blocking debug console
//! - [`Board`] bundling them for startup

pub mod console;
pub mod leds;
pub mod psram;
pub mod xspi;

pub use console::{ByteSink, DebugConsole, SimulatedUart, StdoutSink, EOL};
pub use leds::{OutputPin, SimulatedPin, UserLed, UserLeds};
pub use psram::Aps256;
pub use xspi::{MemoryMappedConfig, RegularCommand, SimulatedXspi, XspiBus};

use bsp_common::config::PsramConfig;
use bsp_common::error::BspResult;
use tracing::info;

/// The board's peripherals outside the time base.
#[derive(Debug)]
pub struct Board<B: XspiBus, P: OutputPin, S: ByteSink> {
    /// External memory.
    pub psram: Aps256<B>,
    /// User LEDs.
    pub leds: UserLeds<P>,
    /// Debug console.
    pub console: DebugConsole<S>,
    psram_ready: bool,
}

impl<B: XspiBus, P: OutputPin, S: ByteSink> Board<B, P, S> {
    /// Assemble a board from its parts.
    pub fn new(bus: B, pins: [P; 4], sink: S) -> Self {
        Self {
            psram: Aps256::new(bus),
            leds: UserLeds::new(pins),
            console: DebugConsole::new(sink),
            psram_ready: false,
        }
    }

    /// Bring the board up: LEDs off, then PSRAM if enabled.
    ///
    /// # Errors
    ///
    /// PSRAM bring-up failures are returned unchanged.
    pub fn init(&mut self, psram: &PsramConfig) -> BspResult<()> {
        self.leds.all_off();
        if psram.enabled {
            self.psram.init(psram)?;
            self.psram_ready = true;
        } else {
            info!("PSRAM disabled, skipping bring-up");
        }
        Ok(())
    }

    /// Whether PSRAM is memory-mapped.
    pub fn psram_ready(&self) -> bool {
        self.psram_ready
    }
}

/// Board built entirely from simulated peripherals.
pub type SimulatedBoard = Board<SimulatedXspi, SimulatedPin, SimulatedUart>;

impl SimulatedBoard {
    /// Create a simulated board. Returns LED and UART handles for inspection.
    pub fn simulated() -> (Self, [SimulatedPin; 4], SimulatedUart) {
        let pins: [SimulatedPin; 4] = Default::default();
        let uart = SimulatedUart::new();
        let bus = SimulatedXspi::new(psram::WRITE_REG_CMD, psram::READ_REG_CMD);
        (Self::new(bus, pins.clone(), uart.clone()), pins, uart)
    }
}
