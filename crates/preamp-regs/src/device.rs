//! Device-access interface and its register-backed implementation

use tracing::debug;

use crate::error::{BusError, DeviceError};
use crate::registers::{self, Register, REGISTER_COUNT};
use crate::{InputType, DEFAULT_UNIT_ADDRESS, MAX_ATTENUATION, SOURCE_COUNT, ZONE_COUNT};

/// A single field update sent to the preamp
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceWrite {
    /// Zone attenuation (0 = loudest)
    Volume { zone: usize, attenuation: u8 },
    /// Zone mute line
    Mute { zone: usize, muted: bool },
    /// Mute line of every zone at once (bit n set mutes zone n)
    Mutes { mask: u8 },
    /// Which source feeds a zone
    SourceRoute { zone: usize, source: usize },
    /// Standby line of every zone at once
    Standby { standby: bool },
    /// Analog/digital switch of a source
    InputType { source: usize, input_type: InputType },
}

/// A field to read back from the preamp
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceField {
    /// Zone attenuation
    Volume { zone: usize },
    /// Zone mute line (1 = muted)
    Mute { zone: usize },
    /// Source feeding a zone
    SourceRoute { zone: usize },
    /// Packed standby bits of all zones
    Standby,
    /// Source input type (1 = digital)
    InputType { source: usize },
}

/// Field-level access to the preamp hardware
///
/// Writes are synchronous: when `write` returns `Ok` the hardware holds the
/// new value. Writing the same value twice has no further effect.
pub trait DeviceRegisters {
    /// Apply one field update
    fn write(&mut self, write: DeviceWrite) -> Result<(), DeviceError>;

    /// Read one field back from the hardware
    fn read(&mut self, field: DeviceField) -> Result<u8, DeviceError>;
}

/// Raw byte transport to a preamp unit (I2C or equivalent)
pub trait RegisterBus {
    /// Write one register of the unit at `address`
    fn write_byte(&mut self, address: u8, register: u8, value: u8) -> Result<(), BusError>;

    /// Read one register of the unit at `address`
    fn read_byte(&mut self, address: u8, register: u8) -> Result<u8, BusError>;
}

impl<B: RegisterBus + ?Sized> RegisterBus for &mut B {
    fn write_byte(&mut self, address: u8, register: u8, value: u8) -> Result<(), BusError> {
        (**self).write_byte(address, register, value)
    }

    fn read_byte(&mut self, address: u8, register: u8) -> Result<u8, BusError> {
        (**self).read_byte(address, register)
    }
}

fn check_zone(zone: usize) -> Result<(), DeviceError> {
    if zone < ZONE_COUNT {
        Ok(())
    } else {
        Err(DeviceError::InvalidValue {
            field: "zone",
            value: zone,
        })
    }
}

fn check_source(source: usize) -> Result<(), DeviceError> {
    if source < SOURCE_COUNT {
        Ok(())
    } else {
        Err(DeviceError::InvalidValue {
            field: "source",
            value: source,
        })
    }
}

/// Register-backed implementation of [`DeviceRegisters`]
///
/// Keeps a shadow copy of every register so a single-field write only needs
/// one bus transfer of the packed byte. The shadow is updated only after the
/// bus accepts the write.
///
/// The mute shadow starts with every zone muted, so a single-zone mute write
/// issued before the first full `Mutes` write never releases other zones.
pub struct RegisterDevice<B> {
    bus: B,
    address: u8,
    shadow: [u8; REGISTER_COUNT],
}

impl<B: RegisterBus> RegisterDevice<B> {
    /// Create a device for the unit at the default address
    pub fn new(bus: B) -> Self {
        Self::with_address(bus, DEFAULT_UNIT_ADDRESS)
    }

    /// Create a device for the unit at `address`
    pub fn with_address(bus: B, address: u8) -> Self {
        let mut shadow = [0; REGISTER_COUNT];
        shadow[Register::Mute.index()] = registers::all_zones_mask();
        Self {
            bus,
            address,
            shadow,
        }
    }

    /// Unit address on the bus
    pub fn address(&self) -> u8 {
        self.address
    }

    /// Last value successfully written to a register
    pub fn shadow_byte(&self, register: Register) -> u8 {
        self.shadow[register.index()]
    }

    /// Access the underlying bus
    pub fn bus(&self) -> &B {
        &self.bus
    }

    /// Mutable access to the underlying bus
    pub fn bus_mut(&mut self) -> &mut B {
        &mut self.bus
    }

    /// Consume the device and return the bus
    pub fn into_bus(self) -> B {
        self.bus
    }

    /// Compute the register and packed byte for a write
    fn encode(&self, write: DeviceWrite) -> Result<(Register, u8), DeviceError> {
        match write {
            DeviceWrite::Volume { zone, attenuation } => {
                check_zone(zone)?;
                if attenuation > MAX_ATTENUATION {
                    return Err(DeviceError::InvalidValue {
                        field: "attenuation",
                        value: attenuation as usize,
                    });
                }
                let register = Register::attenuation(zone).ok_or(DeviceError::InvalidValue {
                    field: "zone",
                    value: zone,
                })?;
                Ok((register, attenuation))
            }
            DeviceWrite::Mute { zone, muted } => {
                check_zone(zone)?;
                let byte = registers::with_bit(self.shadow_byte(Register::Mute), zone, muted);
                Ok((Register::Mute, byte))
            }
            DeviceWrite::Mutes { mask } => {
                if mask & !registers::all_zones_mask() != 0 {
                    return Err(DeviceError::InvalidValue {
                        field: "mute mask",
                        value: mask as usize,
                    });
                }
                Ok((Register::Mute, mask))
            }
            DeviceWrite::SourceRoute { zone, source } => {
                check_source(source)?;
                let (register, shift) =
                    Register::source_route(zone).ok_or(DeviceError::InvalidValue {
                        field: "zone",
                        value: zone,
                    })?;
                let byte = registers::with_source(self.shadow_byte(register), shift, source as u8);
                Ok((register, byte))
            }
            DeviceWrite::Standby { standby } => {
                let byte = if standby {
                    registers::all_zones_mask()
                } else {
                    0
                };
                Ok((Register::Standby, byte))
            }
            DeviceWrite::InputType { source, input_type } => {
                check_source(source)?;
                let byte = registers::with_bit(
                    self.shadow_byte(Register::SrcAd),
                    source,
                    input_type.is_digital(),
                );
                Ok((Register::SrcAd, byte))
            }
        }
    }
}

impl<B: RegisterBus> DeviceRegisters for RegisterDevice<B> {
    fn write(&mut self, write: DeviceWrite) -> Result<(), DeviceError> {
        let (register, value) = self.encode(write)?;
        self.bus
            .write_byte(self.address, register.address(), value)?;
        self.shadow[register.index()] = value;
        debug!(
            "Unit 0x{:02X}: {} <- 0x{:02X} ({:?})",
            self.address, register, value, write
        );
        Ok(())
    }

    fn read(&mut self, field: DeviceField) -> Result<u8, DeviceError> {
        match field {
            DeviceField::Volume { zone } => {
                check_zone(zone)?;
                let register = Register::attenuation(zone).ok_or(DeviceError::InvalidValue {
                    field: "zone",
                    value: zone,
                })?;
                Ok(self.bus.read_byte(self.address, register.address())?)
            }
            DeviceField::Mute { zone } => {
                check_zone(zone)?;
                let byte = self.bus.read_byte(self.address, Register::Mute.address())?;
                Ok(registers::bit(byte, zone) as u8)
            }
            DeviceField::SourceRoute { zone } => {
                let (register, shift) =
                    Register::source_route(zone).ok_or(DeviceError::InvalidValue {
                        field: "zone",
                        value: zone,
                    })?;
                let byte = self.bus.read_byte(self.address, register.address())?;
                Ok(registers::source_at(byte, shift))
            }
            DeviceField::Standby => {
                let byte = self
                    .bus
                    .read_byte(self.address, Register::Standby.address())?;
                Ok(byte & registers::all_zones_mask())
            }
            DeviceField::InputType { source } => {
                check_source(source)?;
                let byte = self.bus.read_byte(self.address, Register::SrcAd.address())?;
                Ok(registers::bit(byte, source) as u8)
            }
        }
    }
}

impl<B> std::fmt::Debug for RegisterDevice<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegisterDevice")
            .field("address", &format_args!("0x{:02X}", self.address))
            .field("shadow", &self.shadow)
            .field("bus", &"<bus>")
            .finish()
    }
}
