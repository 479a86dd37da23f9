//! Virtual preamp board
//!
//! A register-level model of one preamp unit. It accepts byte writes at its
//! bus address, keeps the register file, and decodes it back into per-zone
//! and per-source state so tests can check what the hardware would output.

use preamp_regs::registers::{self, Register, REGISTER_COUNT};
use preamp_regs::{BusError, InputType, RegisterBus, DEFAULT_UNIT_ADDRESS, SOURCE_COUNT, ZONE_COUNT};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// One accepted register write
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterWrite {
    /// Register address
    pub register: u8,
    /// Byte written
    pub value: u8,
}

/// Configuration for creating a virtual preamp
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VirtualPreampConfig {
    /// Display name/identifier
    pub id: String,
    /// Bus address the unit answers on
    pub address: u8,
    /// Register contents at power-on
    pub power_on_registers: [u8; REGISTER_COUNT],
}

impl Default for VirtualPreampConfig {
    fn default() -> Self {
        Self {
            id: "Virtual Preamp".to_string(),
            address: DEFAULT_UNIT_ADDRESS,
            power_on_registers: [0; REGISTER_COUNT],
        }
    }
}

/// Simulated preamp unit
#[derive(Debug)]
pub struct VirtualPreamp {
    /// Identifier for logging
    id: String,
    address: u8,
    registers: [u8; REGISTER_COUNT],
    /// Writes accepted (for test verification)
    write_log: Vec<RegisterWrite>,
    /// Number of upcoming writes to refuse
    fail_writes: usize,
    pass_writes: usize,
    /// Refuse every transfer while set
    offline: bool,
}

impl VirtualPreamp {
    /// Create a virtual preamp at the default address
    pub fn new(id: impl Into<String>) -> Self {
        Self::from_config(VirtualPreampConfig {
            id: id.into(),
            ..Default::default()
        })
    }

    /// Create a virtual preamp from a configuration
    pub fn from_config(config: VirtualPreampConfig) -> Self {
        Self {
            id: config.id,
            address: config.address,
            registers: config.power_on_registers,
            write_log: Vec::new(),
            fail_writes: 0,
            pass_writes: 0,
            offline: false,
        }
    }

    /// Get the identifier
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Get the bus address
    pub fn address(&self) -> u8 {
        self.address
    }

    /// Current value of a register
    pub fn register(&self, register: Register) -> u8 {
        self.registers[register.index()]
    }

    /// Refuse the next `count` writes with a NACK
    pub fn fail_next_writes(&mut self, count: usize) {
        self.fail_writes_after(0, count);
    }

    /// Accept the next `skip` writes, then refuse `count` writes with a NACK
    pub fn fail_writes_after(&mut self, skip: usize, count: usize) {
        self.pass_writes = skip;
        self.fail_writes = count;
    }

    /// Take the unit off the bus (or put it back)
    pub fn set_offline(&mut self, offline: bool) {
        self.offline = offline;
    }

    /// Whether the unit is off the bus
    pub fn is_offline(&self) -> bool {
        self.offline
    }

    /// Get all accepted writes (for test verification)
    pub fn write_log(&self) -> &[RegisterWrite] {
        &self.write_log
    }

    /// Clear the write log
    pub fn clear_write_log(&mut self) {
        self.write_log.clear();
    }

    /// Attenuation currently applied to a zone
    pub fn zone_attenuation(&self, zone: usize) -> Option<u8> {
        Register::attenuation(zone).map(|reg| self.register(reg))
    }

    /// Whether a zone's mute line is asserted
    pub fn zone_muted(&self, zone: usize) -> Option<bool> {
        (zone < ZONE_COUNT).then(|| registers::bit(self.register(Register::Mute), zone))
    }

    /// Whether a zone's standby line is asserted
    pub fn zone_standby(&self, zone: usize) -> Option<bool> {
        (zone < ZONE_COUNT).then(|| registers::bit(self.register(Register::Standby), zone))
    }

    /// Source routed to a zone
    pub fn zone_source(&self, zone: usize) -> Option<usize> {
        Register::source_route(zone)
            .map(|(reg, shift)| registers::source_at(self.register(reg), shift) as usize)
    }

    /// Input type selected for a source
    pub fn source_input(&self, source: usize) -> Option<InputType> {
        (source < SOURCE_COUNT)
            .then(|| InputType::from_bit(registers::bit(self.register(Register::SrcAd), source)))
    }

    /// Whether a zone is producing audio (neither muted nor in standby)
    pub fn zone_audible(&self, zone: usize) -> Option<bool> {
        Some(!self.zone_muted(zone)? && !self.zone_standby(zone)?)
    }

    /// Render the attenuation as a slider bar, loudest on the right
    fn volume_bar(attenuation: u8) -> String {
        const BAR_LEN: usize = 40;
        let max = preamp_regs::MAX_ATTENUATION as usize;
        let level = max - (attenuation as usize).min(max);
        let pos = level * (BAR_LEN - 1) / max;
        (0..BAR_LEN)
            .map(|i| if i == pos { '|' } else { '-' })
            .collect()
    }

    fn check_address(&self, address: u8, register: u8) -> Result<usize, BusError> {
        if self.offline || address != self.address {
            return Err(BusError::Nack { address, register });
        }
        Register::from_address(register)
            .map(Register::index)
            .ok_or(BusError::Nack { address, register })
    }
}

impl RegisterBus for VirtualPreamp {
    fn write_byte(&mut self, address: u8, register: u8, value: u8) -> Result<(), BusError> {
        let index = self.check_address(address, register)?;
        if self.pass_writes > 0 {
            self.pass_writes -= 1;
        } else if self.fail_writes > 0 {
            self.fail_writes -= 1;
            warn!(
                "{}: injected write failure at register 0x{:02X}",
                self.id, register
            );
            return Err(BusError::Nack { address, register });
        }

        self.registers[index] = value;
        self.write_log.push(RegisterWrite { register, value });
        debug!("{}: 0x{:02X} <- 0x{:02X}", self.id, register, value);
        Ok(())
    }

    fn read_byte(&mut self, address: u8, register: u8) -> Result<u8, BusError> {
        let index = self.check_address(address, register)?;
        Ok(self.registers[index])
    }
}

impl std::fmt::Display for VirtualPreamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "{} @ 0x{:02X}", self.id, self.address)?;
        for source in 0..SOURCE_COUNT {
            if let Some(input) = self.source_input(source) {
                writeln!(f, "  source {source}: {input}")?;
            }
        }
        for zone in 0..ZONE_COUNT {
            let (Some(src), Some(atten), Some(muted), Some(standby)) = (
                self.zone_source(zone),
                self.zone_attenuation(zone),
                self.zone_muted(zone),
                self.zone_standby(zone),
            ) else {
                continue;
            };
            let mut flags = Vec::new();
            if muted {
                flags.push("muted");
            }
            if standby {
                flags.push("in standby");
            }
            writeln!(
                f,
                "  source {src} --> zone {zone} vol [{}] -{atten}dB {}",
                Self::volume_bar(atten),
                flags.join(",")
            )?;
        }
        Ok(())
    }
}
