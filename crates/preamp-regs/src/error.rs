//! Error types for preamp register access

use thiserror::Error;

/// Errors reported by a raw register transport
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BusError {
    /// The unit did not acknowledge the transfer
    #[error("no acknowledge from unit 0x{address:02X} at register 0x{register:02X}")]
    Nack { address: u8, register: u8 },

    /// Transport-level I/O failure
    #[error("bus I/O error: {0}")]
    Io(String),

    /// Transfer did not complete in time
    #[error("bus timeout after {0}ms")]
    Timeout(u64),
}

/// Errors reported by the field-level device interface
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DeviceError {
    /// Underlying bus transfer failed
    #[error("bus error: {0}")]
    Bus(#[from] BusError),

    /// A field value does not fit its register encoding
    #[error("invalid value {value} for {field}")]
    InvalidValue { field: &'static str, value: usize },
}

/// An input type name that is neither analog nor digital
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("unknown input type: {0}")]
pub struct ParseInputTypeError(pub String);
