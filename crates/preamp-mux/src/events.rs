//! Preamp events
//!
//! State changes are recorded by the engine and drained by the actor, which
//! forwards them to every observer through one channel.

use preamp_regs::InputType;

/// A change in preamp state
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PreampEvent {
    // -------------------------------------------------------------------------
    // Lifecycle
    // -------------------------------------------------------------------------
    /// Zones were reset to their safe defaults
    ZonesInitialized,

    /// Sources were reset to their default input type
    SourcesInitialized,

    // -------------------------------------------------------------------------
    // Zone changes
    // -------------------------------------------------------------------------
    /// A zone's attenuation changed
    VolumeChanged {
        /// Zone index
        zone: usize,
        /// New attenuation
        volume: u8,
    },

    /// A zone's mute flag changed
    MuteChanged {
        /// Zone index
        zone: usize,
        /// New mute flag
        muted: bool,
        /// Set by the auto-mute thresholds rather than a caller
        auto: bool,
    },

    /// A zone was routed to a different source
    SourceChanged {
        /// Zone index
        zone: usize,
        /// New source
        source: usize,
    },

    /// Global standby changed
    StandbyChanged {
        /// New standby flag
        standby: bool,
    },

    // -------------------------------------------------------------------------
    // Source changes
    // -------------------------------------------------------------------------
    /// A source's input type changed
    InputTypeChanged {
        /// Source index
        source: usize,
        /// New input type
        input_type: InputType,
    },

    // -------------------------------------------------------------------------
    // Errors
    // -------------------------------------------------------------------------
    /// A command was rejected or failed at the hardware
    CommandFailed {
        /// Command name
        command: &'static str,
        /// Error message
        message: String,
    },
}

impl PreampEvent {
    /// Zone this event concerns, if any
    pub fn zone(&self) -> Option<usize> {
        match self {
            PreampEvent::VolumeChanged { zone, .. }
            | PreampEvent::MuteChanged { zone, .. }
            | PreampEvent::SourceChanged { zone, .. } => Some(*zone),
            _ => None,
        }
    }
}
