//! Preamp Register Library
//!
//! This crate describes the six-zone preamp board as seen from the
//! controller: fixed zone/source counts, the register map, and the
//! device-access interface the zone and source controllers write through.
//!
//! # Architecture
//!
//! There are two layers of device access:
//!
//! - [`DeviceRegisters`]: the field-level interface. Writes are keyed by zone
//!   or source index plus a field (volume, mute, source route, standby, input
//!   type). This is what the controllers consume.
//! - [`RegisterBus`]: the raw byte transport (`address`, `register`, `value`).
//!   [`RegisterDevice`] implements [`DeviceRegisters`] on top of any bus by
//!   packing field updates into shadow copies of the board's registers.
//!
//! # Volume polarity
//!
//! Zone volume is an *attenuation* in 1 dB steps: `0` is the loudest setting
//! (0 dB) and [`MAX_ATTENUATION`] is the quietest (−79 dB). The value is
//! written to the `CHn_ATTEN` registers unchanged.
//!
//! # Example
//!
//! ```rust
//! use preamp_regs::{DeviceRegisters, DeviceWrite, InputType, RegisterBus, RegisterDevice};
//! use preamp_regs::BusError;
//!
//! struct NullBus;
//!
//! impl RegisterBus for NullBus {
//!     fn write_byte(&mut self, _address: u8, _register: u8, _value: u8) -> Result<(), BusError> {
//!         Ok(())
//!     }
//!     fn read_byte(&mut self, _address: u8, _register: u8) -> Result<u8, BusError> {
//!         Ok(0)
//!     }
//! }
//!
//! let mut device = RegisterDevice::new(NullBus);
//! device.write(DeviceWrite::Mute { zone: 2, muted: false }).unwrap();
//! device.write(DeviceWrite::InputType { source: 1, input_type: InputType::Digital }).unwrap();
//! assert_eq!(device.shadow_byte(preamp_regs::Register::Mute), 0b0011_1011);
//! ```

pub mod device;
pub mod error;
pub mod registers;

pub use device::{DeviceField, DeviceRegisters, DeviceWrite, RegisterBus, RegisterDevice};
pub use error::{BusError, DeviceError, ParseInputTypeError};
pub use registers::Register;

/// Number of output zones on one preamp board
pub const ZONE_COUNT: usize = 6;

/// Number of input sources shared by all zones
pub const SOURCE_COUNT: usize = 4;

/// Largest attenuation the zone attenuators accept (quietest setting)
pub const MAX_ATTENUATION: u8 = 79;

/// Default bus address of the first preamp board
pub const DEFAULT_UNIT_ADDRESS: u8 = 0x08;

/// Bus addresses assigned to daisy-chained preamp units, in chain order
pub const UNIT_ADDRESSES: [u8; 15] = [
    0x08, 0x10, 0x18, 0x20, 0x28, 0x30, 0x38, 0x40, 0x48, 0x50, 0x58, 0x60, 0x68, 0x70, 0x78,
];

/// Which physical input path feeds a source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum InputType {
    /// Analog line input (RCA)
    #[default]
    Analog,
    /// Digital input through the source's DAC
    Digital,
}

impl InputType {
    /// Returns a human-readable name for the input type
    pub fn name(&self) -> &'static str {
        match self {
            InputType::Analog => "analog",
            InputType::Digital => "digital",
        }
    }

    /// Whether this input type sets the source's `SRC_AD` bit
    pub fn is_digital(&self) -> bool {
        matches!(self, InputType::Digital)
    }

    /// Decode from a `SRC_AD` bit
    pub fn from_bit(set: bool) -> Self {
        if set {
            InputType::Digital
        } else {
            InputType::Analog
        }
    }
}

impl std::fmt::Display for InputType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl std::str::FromStr for InputType {
    type Err = ParseInputTypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "analog" | "a" => Ok(InputType::Analog),
            "digital" | "d" => Ok(InputType::Digital),
            _ => Err(ParseInputTypeError(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_input_type_parse() {
        assert_eq!("digital".parse::<InputType>(), Ok(InputType::Digital));
        assert_eq!("A".parse::<InputType>(), Ok(InputType::Analog));
        assert_eq!(
            "optical".parse::<InputType>(),
            Err(ParseInputTypeError("optical".into()))
        );
        assert_eq!(
            ParseInputTypeError("optical".into()).to_string(),
            "unknown input type: optical"
        );
    }

    #[test]
    fn test_input_type_bit() {
        assert!(InputType::Digital.is_digital());
        assert_eq!(InputType::from_bit(false), InputType::Analog);
        assert_eq!(InputType::from_bit(true), InputType::Digital);
    }

    #[test]
    fn test_unit_addresses_start_at_default() {
        assert_eq!(UNIT_ADDRESSES[0], DEFAULT_UNIT_ADDRESS);
    }
}
