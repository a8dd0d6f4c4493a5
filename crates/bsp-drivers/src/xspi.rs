//! Extended SPI bus abstraction and an in-memory simulated bus.
//!
//! A transfer is a [`RegularCommand`] followed by a data phase
//! ([`XspiBus::transmit`] or [`XspiBus::receive`]). Write/read config
//! commands program the memory-mapped access sequences instead and have no
//! data phase.

use bsp_common::error::{BspError, BspResult};
use std::collections::HashMap;
use tracing::{debug, trace, warn};

/// Which command slot a regular command programs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OperationType {
    /// Indirect command, executed immediately.
    #[default]
    CommonConfig,
    /// Read sequence used in memory-mapped mode.
    ReadConfig,
    /// Write sequence used in memory-mapped mode.
    WriteConfig,
}

/// Number of bus lines used by a phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Lines {
    /// Phase skipped.
    #[default]
    None,
    /// Single line.
    One,
    /// Dual.
    Two,
    /// Quad.
    Four,
    /// Octal.
    Eight,
    /// Hexadeca.
    Sixteen,
}

/// Width of the address phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AddressWidth {
    /// 8-bit address.
    Bits8,
    /// 16-bit address.
    Bits16,
    /// 24-bit address.
    Bits24,
    /// 32-bit address.
    #[default]
    Bits32,
}

/// One command-phase description.
///
/// Instructions are always 8 bits wide; alternate bytes are never used.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RegularCommand {
    /// Command slot.
    pub operation: OperationType,
    /// Instruction opcode.
    pub instruction: u8,
    /// Lines for the instruction phase.
    pub instruction_lines: Lines,
    /// Double transfer rate for the instruction phase.
    pub instruction_dtr: bool,
    /// Address sent after the instruction.
    pub address: u32,
    /// Lines for the address phase.
    pub address_lines: Lines,
    /// Width of the address phase.
    pub address_width: AddressWidth,
    /// Double transfer rate for the address phase.
    pub address_dtr: bool,
    /// Lines for the data phase.
    pub data_lines: Lines,
    /// Double transfer rate for the data phase.
    pub data_dtr: bool,
    /// Bytes in the data phase; zero for memory-mapped configs.
    pub data_length: u32,
    /// Dummy cycles between address and data.
    pub dummy_cycles: u8,
    /// Use the data strobe for sampling.
    pub dqs: bool,
}

/// Memory-mapped mode settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemoryMappedConfig {
    /// Release chip select after an idle timeout.
    pub timeout_enabled: bool,
    /// Idle timeout in bus clock cycles.
    pub timeout_cycles: u8,
}

/// Blocking extended SPI controller.
pub trait XspiBus: Send {
    /// Issue a command phase.
    ///
    /// # Errors
    ///
    /// Returns [`BspError::Bus`] if the controller rejects the command.
    fn command(&mut self, cmd: &RegularCommand) -> BspResult<()>;

    /// Data phase of the last common-config command, host to device.
    ///
    /// # Errors
    ///
    /// Returns [`BspError::Bus`] if no command is pending or the transfer fails.
    fn transmit(&mut self, data: &[u8]) -> BspResult<()>;

    /// Data phase of the last common-config command, device to host.
    ///
    /// # Errors
    ///
    /// Returns [`BspError::Bus`] if no command is pending or the transfer fails.
    fn receive(&mut self, buf: &mut [u8]) -> BspResult<()>;

    /// Switch to memory-mapped mode using the programmed read/write configs.
    ///
    /// # Errors
    ///
    /// Returns [`BspError::Bus`] if the read or write config was never
    /// programmed or the bus is already mapped.
    fn memory_mapped(&mut self, config: &MemoryMappedConfig) -> BspResult<()>;
}

/// In-memory XSPI bus with a register-file device behind it.
///
/// Commands whose opcode matches `write_reg_cmd` store the transmitted
/// bytes at the command address; commands matching `read_reg_cmd` return
/// them. Every command is recorded for inspection.
#[derive(Debug)]
pub struct SimulatedXspi {
    write_reg_cmd: u8,
    read_reg_cmd: u8,
    registers: HashMap<u32, [u8; 2]>,
    /// Registers that silently ignore writes.
    read_only: Vec<u32>,
    pending: Option<RegularCommand>,
    commands: Vec<RegularCommand>,
    read_config: Option<RegularCommand>,
    write_config: Option<RegularCommand>,
    mapped: Option<MemoryMappedConfig>,
    fail_instruction: Option<u8>,
}

impl SimulatedXspi {
    /// Create a bus whose device decodes the given register opcodes.
    pub fn new(write_reg_cmd: u8, read_reg_cmd: u8) -> Self {
        Self {
            write_reg_cmd,
            read_reg_cmd,
            registers: HashMap::new(),
            read_only: Vec::new(),
            pending: None,
            commands: Vec::new(),
            read_config: None,
            write_config: None,
            mapped: None,
            fail_instruction: None,
        }
    }

    /// Make `register` ignore writes, so a verify after writing it fails.
    pub fn set_read_only(&mut self, register: u32) {
        self.read_only.push(register);
    }

    /// Fail every command carrying `instruction` (for testing).
    pub fn fail_on_instruction(&mut self, instruction: u8) {
        self.fail_instruction = Some(instruction);
    }

    /// Current value of a device register.
    pub fn register(&self, address: u32) -> Option<[u8; 2]> {
        self.registers.get(&address).copied()
    }

    /// Every command issued so far, in order.
    pub fn commands(&self) -> &[RegularCommand] {
        &self.commands
    }

    /// Programmed memory-mapped read sequence.
    pub fn read_config(&self) -> Option<&RegularCommand> {
        self.read_config.as_ref()
    }

    /// Programmed memory-mapped write sequence.
    pub fn write_config(&self) -> Option<&RegularCommand> {
        self.write_config.as_ref()
    }

    /// Memory-mapped settings, once the bus has been switched over.
    pub fn memory_mapped_config(&self) -> Option<MemoryMappedConfig> {
        self.mapped
    }

    /// Whether the bus is in memory-mapped mode.
    pub fn is_memory_mapped(&self) -> bool {
        self.mapped.is_some()
    }

    fn ensure_indirect(&self) -> BspResult<()> {
        if self.mapped.is_some() {
            return Err(BspError::Bus("bus is in memory-mapped mode".into()));
        }
        Ok(())
    }

    fn take_data_command(&mut self, len: usize) -> BspResult<RegularCommand> {
        let cmd = self
            .pending
            .take()
            .ok_or_else(|| BspError::Bus("data phase without a command".into()))?;
        if usize::try_from(cmd.data_length).ok() != Some(len) {
            return Err(BspError::Bus(format!(
                "data length mismatch: command {} bytes, buffer {len} bytes",
                cmd.data_length
            )));
        }
        Ok(cmd)
    }
}

impl XspiBus for SimulatedXspi {
    fn command(&mut self, cmd: &RegularCommand) -> BspResult<()> {
        self.ensure_indirect()?;
        if self.fail_instruction == Some(cmd.instruction) {
            warn!(instruction = cmd.instruction, "Simulated XSPI command failure");
            return Err(BspError::Bus(format!(
                "command {:#04x} rejected",
                cmd.instruction
            )));
        }

        trace!(
            instruction = cmd.instruction,
            address = cmd.address,
            operation = ?cmd.operation,
            "XSPI command"
        );
        self.commands.push(*cmd);

        match cmd.operation {
            OperationType::CommonConfig => self.pending = Some(*cmd),
            OperationType::ReadConfig => self.read_config = Some(*cmd),
            OperationType::WriteConfig => self.write_config = Some(*cmd),
        }
        Ok(())
    }

    fn transmit(&mut self, data: &[u8]) -> BspResult<()> {
        self.ensure_indirect()?;
        let cmd = self.take_data_command(data.len())?;
        if cmd.instruction != self.write_reg_cmd {
            return Err(BspError::Bus(format!(
                "transmit after non-write command {:#04x}",
                cmd.instruction
            )));
        }

        if self.read_only.contains(&cmd.address) {
            debug!(address = cmd.address, "Write to read-only register ignored");
            return Ok(());
        }

        let mut value = [0u8; 2];
        for (slot, byte) in value.iter_mut().zip(data) {
            *slot = *byte;
        }
        self.registers.insert(cmd.address, value);
        Ok(())
    }

    fn receive(&mut self, buf: &mut [u8]) -> BspResult<()> {
        self.ensure_indirect()?;
        let cmd = self.take_data_command(buf.len())?;
        if cmd.instruction != self.read_reg_cmd {
            return Err(BspError::Bus(format!(
                "receive after non-read command {:#04x}",
                cmd.instruction
            )));
        }

        let value = self.registers.get(&cmd.address).copied().unwrap_or_default();
        for (slot, byte) in buf.iter_mut().zip(value) {
            *slot = byte;
        }
        Ok(())
    }

    fn memory_mapped(&mut self, config: &MemoryMappedConfig) -> BspResult<()> {
        self.ensure_indirect()?;
        if self.read_config.is_none() || self.write_config.is_none() {
            return Err(BspError::Bus(
                "memory-mapped mode needs both read and write configs".into(),
            ));
        }
        debug!(
            timeout_cycles = config.timeout_cycles,
            "XSPI entering memory-mapped mode"
        );
        self.mapped = Some(*config);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reg_command(instruction: u8, address: u32) -> RegularCommand {
        RegularCommand {
            instruction,
            address,
            data_length: 2,
            ..RegularCommand::default()
        }
    }

    #[test]
    fn test_register_write_then_read() {
        let mut bus = SimulatedXspi::new(0xC0, 0x40);
        bus.command(&reg_command(0xC0, 8)).unwrap();
        bus.transmit(&[0x12, 0x34]).unwrap();
        assert_eq!(bus.register(8), Some([0x12, 0x34]));

        let mut buf = [0u8; 2];
        bus.command(&reg_command(0x40, 8)).unwrap();
        bus.receive(&mut buf).unwrap();
        assert_eq!(buf, [0x12, 0x34]);
        assert_eq!(bus.commands().len(), 2);
    }

    #[test]
    fn test_data_phase_needs_command() {
        let mut bus = SimulatedXspi::new(0xC0, 0x40);
        assert!(bus.transmit(&[0, 0]).is_err());

        bus.command(&reg_command(0xC0, 1)).unwrap();
        assert!(bus.transmit(&[0, 0, 0]).is_err());
    }

    #[test]
    fn test_memory_mapped_requires_configs() {
        let mut bus = SimulatedXspi::new(0xC0, 0x40);
        let mapped = MemoryMappedConfig {
            timeout_enabled: true,
            timeout_cycles: 0x34,
        };
        assert!(bus.memory_mapped(&mapped).is_err());

        bus.command(&RegularCommand {
            operation: OperationType::WriteConfig,
            ..RegularCommand::default()
        })
        .unwrap();
        bus.command(&RegularCommand {
            operation: OperationType::ReadConfig,
            ..RegularCommand::default()
        })
        .unwrap();
        bus.memory_mapped(&mapped).unwrap();
        assert!(bus.is_memory_mapped());

        // Indirect access is off once mapped
        assert!(bus.command(&reg_command(0x40, 0)).is_err());
    }

    #[test]
    fn test_fault_injection() {
        let mut bus = SimulatedXspi::new(0xC0, 0x40);
        bus.fail_on_instruction(0xC0);
        assert!(matches!(
            bus.command(&reg_command(0xC0, 0)),
            Err(BspError::Bus(_))
        ));
    }
}
