//! APS256 octal/hexadeca PSRAM bring-up.
//!
//! Mode registers are written and verified over indirect commands, then the
//! bus is switched into memory-mapped mode with 16 data lines.

use crate::xspi::{
    AddressWidth, Lines, MemoryMappedConfig, OperationType, RegularCommand, XspiBus,
};
use bsp_common::config::PsramConfig;
use bsp_common::error::{BspError, BspResult};
use tracing::{debug, error, info};

/// Memory array read.
pub const READ_CMD: u8 = 0x00;
/// Memory array write.
pub const WRITE_CMD: u8 = 0x80;
/// Mode register read.
pub const READ_REG_CMD: u8 = 0x40;
/// Mode register write.
pub const WRITE_REG_CMD: u8 = 0xC0;

/// Mode register 0.
pub const MR0: u32 = 0x0000_0000;
/// Mode register 1.
pub const MR1: u32 = 0x0000_0001;
/// Mode register 2.
pub const MR2: u32 = 0x0000_0002;
/// Mode register 3.
pub const MR3: u32 = 0x0000_0003;
/// Mode register 4: write latency and refresh.
pub const MR4: u32 = 0x0000_0004;
/// Mode register 8: bus width and burst length.
pub const MR8: u32 = 0x0000_0008;

/// Dummy cycles for memory-mapped reads.
pub const DUMMY_CLOCK_CYCLES_READ: u8 = 6;
/// Dummy cycles for memory-mapped writes.
pub const DUMMY_CLOCK_CYCLES_WRITE: u8 = 6;
/// Latency for mode register reads.
pub const READ_REG_LATENCY: u8 = 5;

/// Driver for an APS256 PSRAM on an XSPI bus.
#[derive(Debug)]
pub struct Aps256<B: XspiBus> {
    bus: B,
}

impl<B: XspiBus> Aps256<B> {
    /// Wrap a bus.
    pub fn new(bus: B) -> Self {
        Self { bus }
    }

    /// Write a two-byte mode register.
    ///
    /// # Errors
    ///
    /// Returns [`BspError::Bus`] if the command or data phase fails.
    pub fn write_reg(&mut self, address: u32, value: [u8; 2]) -> BspResult<()> {
        self.bus.command(&register_command(WRITE_REG_CMD, address, 0, false))?;
        self.bus.transmit(&value)
    }

    /// Read a two-byte mode register.
    ///
    /// # Errors
    ///
    /// Returns [`BspError::Bus`] if the command or data phase fails.
    pub fn read_reg(&mut self, address: u32) -> BspResult<[u8; 2]> {
        self.bus
            .command(&register_command(READ_REG_CMD, address, READ_REG_LATENCY, true))?;
        let mut value = [0u8; 2];
        self.bus.receive(&mut value)?;
        Ok(value)
    }

    /// Switch the device to 16-line mode and map it into memory.
    ///
    /// # Errors
    ///
    /// Any bus failure, or [`BspError::RegisterVerify`] if a mode register
    /// reads back a different first byte than was written. The bus is left
    /// in indirect mode on failure.
    pub fn init(&mut self, config: &PsramConfig) -> BspResult<()> {
        self.write_verified(MR8, config.mr8)?;
        self.write_verified(MR4, config.mr4)?;

        let write = RegularCommand {
            operation: OperationType::WriteConfig,
            instruction: WRITE_CMD,
            address: 0,
            data_lines: Lines::Sixteen,
            data_length: 0,
            dummy_cycles: DUMMY_CLOCK_CYCLES_WRITE,
            dqs: true,
            ..register_command(WRITE_CMD, 0, 0, false)
        };
        self.bus.command(&write)?;

        let read = RegularCommand {
            operation: OperationType::ReadConfig,
            instruction: READ_CMD,
            dummy_cycles: DUMMY_CLOCK_CYCLES_READ,
            ..write
        };
        self.bus.command(&read)?;

        self.bus.memory_mapped(&MemoryMappedConfig {
            timeout_enabled: true,
            timeout_cycles: config.mapped_timeout_cycles,
        })?;

        info!(
            mr8 = ?config.mr8,
            mr4 = ?config.mr4,
            "PSRAM memory-mapped in 16-line mode"
        );
        Ok(())
    }

    /// The underlying bus.
    pub fn bus(&self) -> &B {
        &self.bus
    }

    /// Release the bus.
    pub fn into_bus(self) -> B {
        self.bus
    }

    fn write_verified(&mut self, register: u32, value: [u8; 2]) -> BspResult<()> {
        self.write_reg(register, value)?;
        let read = self.read_reg(register)?;
        debug!(register, wrote = ?value, read = ?read, "PSRAM mode register");

        // Only the first byte is defined on readback
        if read[0] != value[0] {
            error!(register, "PSRAM mode register verify failed");
            return Err(BspError::RegisterVerify {
                register,
                wrote: value[0],
                read: read[0],
            });
        }
        Ok(())
    }
}

/// Common-config register access: 8-line instruction, 8-line DTR address and
/// data, two data bytes.
fn register_command(instruction: u8, address: u32, dummy_cycles: u8, dqs: bool) -> RegularCommand {
    RegularCommand {
        operation: OperationType::CommonConfig,
        instruction,
        instruction_lines: Lines::Eight,
        instruction_dtr: false,
        address,
        address_lines: Lines::Eight,
        address_width: AddressWidth::Bits32,
        address_dtr: true,
        data_lines: Lines::Eight,
        data_dtr: true,
        data_length: 2,
        dummy_cycles,
        dqs,
    }
}
