//! Preamp Zone/Source Engine
//!
//! This crate holds the logical state of a six-zone, four-source preamp and
//! keeps the board in step with it. Upper layers (network API, front panel,
//! power management) work in zones, sources, and attenuation; the engine
//! turns each change into field writes on a [`preamp_regs::DeviceRegisters`].
//!
//! # Architecture
//!
//! - [`ZoneController`] owns per-zone volume, mute, and routing plus the
//!   global standby flag.
//! - [`SourceController`] owns each source's analog/digital selection.
//! - [`Preamp`] combines both with the device handle and records a
//!   [`PreampEvent`] for every change.
//! - [`actor::run_preamp_actor`] serializes access when more than one task
//!   drives the same preamp.
//!
//! A zone is audible ("on") only when standby is off and the zone is not
//! muted. Every setter validates first and writes hardware before updating
//! state, so a rejected or failed call leaves the stored state as it was.
//!
//! # Features
//!
//! - `auto-mute`: mute a zone automatically when its volume leaves a
//!   configured band, and release that mute when it returns.
//!
//! # Example
//!
//! ```rust
//! use preamp_mux::Preamp;
//! use preamp_regs::RegisterDevice;
//! use preamp_sim::VirtualPreamp;
//!
//! let mut preamp = Preamp::new(RegisterDevice::new(VirtualPreamp::new("living-room")));
//! preamp.init().unwrap();
//!
//! preamp.set_zone_volume(0, 10).unwrap();
//! preamp.mute(0, false).unwrap();
//! assert!(preamp.is_on(0).unwrap());
//!
//! preamp.standby(true).unwrap();
//! assert!(!preamp.any_on());
//! ```

pub mod actor;
#[cfg(feature = "auto-mute")]
pub mod auto_mute;
pub mod engine;
pub mod error;
pub mod events;
pub mod sources;
pub mod state;
pub mod zones;

// Re-export actor types
pub use actor::{run_preamp_actor, PreampCommand, PreampHandle};

#[cfg(feature = "auto-mute")]
pub use auto_mute::{AutoMuteConfig, AutoMuteState};

// Re-export engine types
pub use engine::{FieldMismatch, Preamp, PreampConfig};
pub use error::PreampError;
pub use events::PreampEvent;
pub use sources::SourceController;
pub use state::{PreampStatus, ZoneState, ZoneStatus};
pub use zones::ZoneController;
