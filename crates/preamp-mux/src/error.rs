//! Error types for zone and source control

use preamp_regs::{DeviceError, MAX_ATTENUATION, SOURCE_COUNT, ZONE_COUNT};
use thiserror::Error;

/// Errors that can occur while controlling the preamp
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PreampError {
    /// Zone index outside the board's zones
    #[error("zone {zone} out of range (expected < {max})", max = ZONE_COUNT)]
    ZoneOutOfRange { zone: usize },

    /// Source index outside the board's sources
    #[error("source {src} out of range (expected < {max})", max = SOURCE_COUNT)]
    SourceOutOfRange { src: usize },

    /// Attenuation beyond the attenuator's range
    #[error("volume {volume} out of range (expected <= {max})", max = MAX_ATTENUATION)]
    VolumeOutOfRange { volume: u8 },

    /// Hardware write or read failed
    #[error("device error: {0}")]
    Device(#[from] DeviceError),

    /// Configuration rejected
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// The controller actor is no longer running
    #[error("preamp actor stopped")]
    ActorStopped,
}

/// Validate a zone index
pub(crate) fn check_zone(zone: usize) -> Result<(), PreampError> {
    if zone < ZONE_COUNT {
        Ok(())
    } else {
        Err(PreampError::ZoneOutOfRange { zone })
    }
}

/// Validate a source index
pub(crate) fn check_source(source: usize) -> Result<(), PreampError> {
    if source < SOURCE_COUNT {
        Ok(())
    } else {
        Err(PreampError::SourceOutOfRange { src: source })
    }
}
