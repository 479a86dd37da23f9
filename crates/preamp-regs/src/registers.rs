//! Preamp register map and bit packing
//!
//! Every register is one byte wide. Several registers carry a field for
//! more than one zone or source, so a single-field update is a
//! read-modify-write of the packed byte:
//!
//! ```text
//! 0x00 SRC_AD     [ - - - - s3 s2 s1 s0 ]   1 = digital
//! 0x01 CH123_SRC  [ - - z2 z2 z1 z1 z0 z0 ] 2-bit source per zone
//! 0x02 CH456_SRC  [ - - z5 z5 z4 z4 z3 z3 ]
//! 0x03 MUTE       [ - - z5 z4 z3 z2 z1 z0 ] 1 = muted
//! 0x04 STANDBY    [ - - z5 z4 z3 z2 z1 z0 ] 1 = standby
//! 0x05..0x0A      CH1_ATTEN..CH6_ATTEN      attenuation 0..=79
//! ```

use crate::ZONE_COUNT;

/// Width of one zone's source field in `CH123_SRC`/`CH456_SRC`
const SOURCE_FIELD_BITS: u8 = 2;

/// Mask of one zone's source field
const SOURCE_FIELD_MASK: u8 = 0b11;

/// Zones packed into each source routing register
const ZONES_PER_SOURCE_REGISTER: usize = 3;

/// Number of registers on one preamp unit
pub const REGISTER_COUNT: usize = 11;

/// A preamp register
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Register {
    /// Analog/digital selection for each source
    SrcAd,
    /// Source routing for zones 1-3
    Ch123Src,
    /// Source routing for zones 4-6
    Ch456Src,
    /// Per-zone mute bits
    Mute,
    /// Per-zone standby bits
    Standby,
    /// Attenuation for zone 1
    Ch1Atten,
    /// Attenuation for zone 2
    Ch2Atten,
    /// Attenuation for zone 3
    Ch3Atten,
    /// Attenuation for zone 4
    Ch4Atten,
    /// Attenuation for zone 5
    Ch5Atten,
    /// Attenuation for zone 6
    Ch6Atten,
}

impl Register {
    /// All registers in address order
    pub const ALL: [Register; REGISTER_COUNT] = [
        Register::SrcAd,
        Register::Ch123Src,
        Register::Ch456Src,
        Register::Mute,
        Register::Standby,
        Register::Ch1Atten,
        Register::Ch2Atten,
        Register::Ch3Atten,
        Register::Ch4Atten,
        Register::Ch5Atten,
        Register::Ch6Atten,
    ];

    /// Register address on the unit
    pub fn address(self) -> u8 {
        match self {
            Register::SrcAd => 0x00,
            Register::Ch123Src => 0x01,
            Register::Ch456Src => 0x02,
            Register::Mute => 0x03,
            Register::Standby => 0x04,
            Register::Ch1Atten => 0x05,
            Register::Ch2Atten => 0x06,
            Register::Ch3Atten => 0x07,
            Register::Ch4Atten => 0x08,
            Register::Ch5Atten => 0x09,
            Register::Ch6Atten => 0x0A,
        }
    }

    /// Look up a register by address
    pub fn from_address(address: u8) -> Option<Register> {
        Self::ALL.get(address as usize).copied()
    }

    /// Index into a shadow register array
    pub fn index(self) -> usize {
        self.address() as usize
    }

    /// Register name as printed on the board documentation
    pub fn name(self) -> &'static str {
        match self {
            Register::SrcAd => "SRC_AD",
            Register::Ch123Src => "CH123_SRC",
            Register::Ch456Src => "CH456_SRC",
            Register::Mute => "MUTE",
            Register::Standby => "STANDBY",
            Register::Ch1Atten => "CH1_ATTEN",
            Register::Ch2Atten => "CH2_ATTEN",
            Register::Ch3Atten => "CH3_ATTEN",
            Register::Ch4Atten => "CH4_ATTEN",
            Register::Ch5Atten => "CH5_ATTEN",
            Register::Ch6Atten => "CH6_ATTEN",
        }
    }

    /// Attenuation register for a zone
    pub fn attenuation(zone: usize) -> Option<Register> {
        if zone >= ZONE_COUNT {
            return None;
        }
        Self::from_address(Register::Ch1Atten.address() + zone as u8)
    }

    /// Source routing register and bit shift for a zone
    pub fn source_route(zone: usize) -> Option<(Register, u8)> {
        if zone >= ZONE_COUNT {
            return None;
        }
        let register = if zone < ZONES_PER_SOURCE_REGISTER {
            Register::Ch123Src
        } else {
            Register::Ch456Src
        };
        let slot = (zone % ZONES_PER_SOURCE_REGISTER) as u8;
        Some((register, slot * SOURCE_FIELD_BITS))
    }
}

impl std::fmt::Display for Register {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} (0x{:02X})", self.name(), self.address())
    }
}

/// Set or clear one bit of a packed register byte
pub fn with_bit(byte: u8, bit: usize, set: bool) -> u8 {
    let mask = 1u8 << bit;
    if set {
        byte | mask
    } else {
        byte & !mask
    }
}

/// Read one bit of a packed register byte
pub fn bit(byte: u8, bit: usize) -> bool {
    byte & (1u8 << bit) != 0
}

/// Mask covering one bit per zone
pub fn all_zones_mask() -> u8 {
    ((1u16 << ZONE_COUNT) - 1) as u8
}

/// Replace one zone's 2-bit source field
pub fn with_source(byte: u8, shift: u8, source: u8) -> u8 {
    (byte & !(SOURCE_FIELD_MASK << shift)) | ((source & SOURCE_FIELD_MASK) << shift)
}

/// Extract one zone's 2-bit source field
pub fn source_at(byte: u8, shift: u8) -> u8 {
    (byte >> shift) & SOURCE_FIELD_MASK
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_addresses_match_index() {
        for (i, reg) in Register::ALL.iter().enumerate() {
            assert_eq!(reg.address() as usize, i);
            assert_eq!(Register::from_address(reg.address()), Some(*reg));
        }
        assert_eq!(Register::from_address(0x0B), None);
    }

    #[test]
    fn test_attenuation_registers() {
        assert_eq!(Register::attenuation(0), Some(Register::Ch1Atten));
        assert_eq!(Register::attenuation(5), Some(Register::Ch6Atten));
        assert_eq!(Register::attenuation(6), None);
    }

    #[test]
    fn test_source_route_layout() {
        assert_eq!(Register::source_route(0), Some((Register::Ch123Src, 0)));
        assert_eq!(Register::source_route(2), Some((Register::Ch123Src, 4)));
        assert_eq!(Register::source_route(3), Some((Register::Ch456Src, 0)));
        assert_eq!(Register::source_route(5), Some((Register::Ch456Src, 4)));
        assert_eq!(Register::source_route(6), None);
    }

    #[test]
    fn test_bits() {
        let b = with_bit(0, 3, true);
        assert_eq!(b, 0b1000);
        assert!(bit(b, 3));
        assert_eq!(with_bit(b, 3, false), 0);
        assert_eq!(all_zones_mask(), 0b0011_1111);
    }

    #[test]
    fn test_display() {
        assert_eq!(Register::Mute.to_string(), "MUTE (0x03)");
    }

    proptest! {
        #[test]
        fn source_field_update_preserves_neighbors(
            byte in 0u8..=0x3F,
            slot in 0u8..3,
            source in 0u8..4,
        ) {
            let shift = slot * 2;
            let updated = with_source(byte, shift, source);
            prop_assert_eq!(source_at(updated, shift), source);
            for other in (0u8..3).filter(|s| *s != slot) {
                prop_assert_eq!(source_at(updated, other * 2), source_at(byte, other * 2));
            }
        }
    }
}
