//! Zone and source state tracking

use preamp_regs::{InputType, MAX_ATTENUATION};
use serde::{Deserialize, Serialize};

/// Stored settings of one output zone
///
/// `volume` is an attenuation: 0 is loudest, `MAX_ATTENUATION` is quietest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ZoneState {
    /// Attenuation in dB steps
    pub volume: u8,
    /// Explicit or automatic mute
    pub muted: bool,
    /// Source feeding the zone
    pub source: usize,
}

impl ZoneState {
    /// Safe power-up state: muted, fully attenuated
    pub fn safe_default(source: usize) -> Self {
        Self {
            volume: MAX_ATTENUATION,
            muted: true,
            source,
        }
    }
}

impl Default for ZoneState {
    fn default() -> Self {
        Self::safe_default(0)
    }
}

/// Snapshot of one zone for upstream layers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ZoneStatus {
    /// Zone index
    pub zone: usize,
    /// Attenuation in dB steps
    pub volume: u8,
    /// Mute flag
    pub muted: bool,
    /// Source feeding the zone
    pub source: usize,
    /// Whether the zone is audible (not muted, not in standby)
    pub on: bool,
}

impl ZoneStatus {
    /// Volume as a gain in dB (0 or negative)
    pub fn gain_db(&self) -> i16 {
        -(self.volume as i16)
    }
}

/// Snapshot of the whole preamp
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreampStatus {
    /// Global standby flag
    pub standby: bool,
    /// Per-zone state in zone order
    pub zones: Vec<ZoneStatus>,
    /// Per-source input type in source order
    pub sources: Vec<InputType>,
}

impl PreampStatus {
    /// Whether any zone is audible
    pub fn any_on(&self) -> bool {
        self.zones.iter().any(|z| z.on)
    }
}

impl std::fmt::Display for PreampStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "standby: {}", if self.standby { "on" } else { "off" })?;
        for (source, input) in self.sources.iter().enumerate() {
            writeln!(f, "source {source}: {input}")?;
        }
        for zone in &self.zones {
            writeln!(
                f,
                "zone {}: source {} {:>4} dB {}{}",
                zone.zone,
                zone.source,
                zone.gain_db(),
                if zone.muted { "muted" } else { "unmuted" },
                if zone.on { " (on)" } else { "" }
            )?;
        }
        Ok(())
    }
}
