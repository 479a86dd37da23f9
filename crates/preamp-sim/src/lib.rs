//! Preamp Simulation Library
//!
//! This crate provides a simulated preamp board for exercising the zone and
//! source controllers without physical hardware. It includes:
//!
//! - **VirtualPreamp**: a register-level model of one preamp unit that
//!   implements `RegisterBus`, logs every write, decodes register contents
//!   back into zone/source state, and can inject bus failures
//!
//! # Example
//!
//! ```rust
//! use preamp_regs::{DeviceRegisters, DeviceWrite, RegisterDevice};
//! use preamp_sim::VirtualPreamp;
//!
//! let mut device = RegisterDevice::new(VirtualPreamp::new("bench"));
//! device.write(DeviceWrite::Volume { zone: 1, attenuation: 20 }).unwrap();
//!
//! let board = device.bus();
//! assert_eq!(board.zone_attenuation(1), Some(20));
//! println!("{board}");
//! ```

pub mod preamp;

pub use preamp::{RegisterWrite, VirtualPreamp, VirtualPreampConfig};
