//! Zone controller
//!
//! Owns the per-zone volume, mute and source settings and the global standby
//! flag. Every setter validates its arguments, writes the hardware, and only
//! then stores the new value, so a rejected or failed call leaves the stored
//! state untouched.
//!
//! The mute line driven for a zone is `muted || standby`: the hardware never
//! plays a zone that is logically off.
//!
//! # Source switching
//!
//! `set_zone_source` does not mute around the switch. Callers that want a
//! pop-free change should mute the zone, switch, then unmute.

use preamp_regs::registers::all_zones_mask;
use preamp_regs::{DeviceRegisters, DeviceWrite, MAX_ATTENUATION, ZONE_COUNT};
use tracing::{debug, info, warn};

#[cfg(feature = "auto-mute")]
use crate::auto_mute::{AutoMuteConfig, AutoMuteCoordinator, AutoMuteState};
use crate::error::{check_source, check_zone, PreampError};
use crate::state::ZoneState;

/// Per-zone state and global standby
#[derive(Debug, Clone)]
pub struct ZoneController {
    zones: [ZoneState; ZONE_COUNT],
    standby: bool,
    default_source: usize,
    #[cfg(feature = "auto-mute")]
    auto_mute: AutoMuteCoordinator,
}

impl ZoneController {
    /// Create a controller with every zone in the safe default state
    ///
    /// Nothing is written to hardware until [`ZoneController::init_zones`].
    pub fn new(default_source: usize) -> Result<Self, PreampError> {
        check_source(default_source)?;
        Ok(Self {
            zones: [ZoneState::safe_default(default_source); ZONE_COUNT],
            default_source,
            ..Self::default()
        })
    }

    /// Create a controller with custom auto-mute thresholds
    #[cfg(feature = "auto-mute")]
    pub fn with_auto_mute(
        default_source: usize,
        config: AutoMuteConfig,
    ) -> Result<Self, PreampError> {
        config.validate()?;
        let mut controller = Self::new(default_source)?;
        controller.auto_mute = AutoMuteCoordinator::new(config);
        Ok(controller)
    }

    /// Reset every zone to the safe default and write it to the hardware
    ///
    /// Every mute line is asserted in one write before anything else, then
    /// attenuations, routing, and standby go out, so no zone becomes audible
    /// part way through. Safe to call again to recover.
    pub fn init_zones<D: DeviceRegisters>(&mut self, dev: &mut D) -> Result<(), PreampError> {
        self.zones = [ZoneState::safe_default(self.default_source); ZONE_COUNT];
        self.standby = false;
        #[cfg(feature = "auto-mute")]
        self.auto_mute.reset(MAX_ATTENUATION);

        dev.write(DeviceWrite::Mutes {
            mask: all_zones_mask(),
        })?;
        for (zone, state) in self.zones.iter().enumerate() {
            dev.write(DeviceWrite::Volume {
                zone,
                attenuation: state.volume,
            })?;
        }
        for (zone, state) in self.zones.iter().enumerate() {
            dev.write(DeviceWrite::SourceRoute {
                zone,
                source: state.source,
            })?;
        }
        dev.write(DeviceWrite::Standby { standby: false })?;

        info!(
            "Initialized {} zones (muted, -{}dB, source {})",
            ZONE_COUNT, MAX_ATTENUATION, self.default_source
        );
        Ok(())
    }

    /// Whether a zone is audible: not in standby and not muted
    pub fn is_on(&self, zone: usize) -> Result<bool, PreampError> {
        Ok(!self.standby && !self.muted(zone)?)
    }

    /// Whether any zone is audible
    pub fn any_on(&self) -> bool {
        !self.standby && self.zones.iter().any(|z| !z.muted)
    }

    /// Explicitly mute or unmute a zone
    ///
    /// Overrides any automatic mute in effect on the zone.
    pub fn mute<D: DeviceRegisters>(
        &mut self,
        dev: &mut D,
        zone: usize,
        mute: bool,
    ) -> Result<(), PreampError> {
        if let Err(e) = check_zone(zone) {
            warn!("Rejected mute: {}", e);
            return Err(e);
        }

        self.write_mute(dev, zone, mute)?;
        #[cfg(feature = "auto-mute")]
        self.auto_mute.clear(zone);

        debug!("Zone {} {}", zone, if mute { "muted" } else { "unmuted" });
        Ok(())
    }

    /// Mute flag of a zone
    pub fn muted(&self, zone: usize) -> Result<bool, PreampError> {
        self.zone(zone).map(|z| z.muted)
    }

    /// Enter or leave standby for every zone
    ///
    /// Entering asserts every zone's mute line in one write, then the standby
    /// lines. Leaving releases standby first and then restores each zone's own
    /// mute, again in one write. Stored zone settings are not changed.
    pub fn standby<D: DeviceRegisters>(
        &mut self,
        dev: &mut D,
        standby: bool,
    ) -> Result<(), PreampError> {
        if standby {
            dev.write(DeviceWrite::Mutes {
                mask: all_zones_mask(),
            })?;
            dev.write(DeviceWrite::Standby { standby: true })?;
            self.standby = true;
        } else {
            dev.write(DeviceWrite::Standby { standby: false })?;
            self.standby = false;
            dev.write(DeviceWrite::Mutes {
                mask: self.mute_mask(),
            })?;
        }

        info!("Standby {}", if standby { "entered" } else { "left" });
        Ok(())
    }

    /// Global standby flag
    pub fn in_standby(&self) -> bool {
        self.standby
    }

    /// Set a zone's attenuation
    #[cfg(not(feature = "auto-mute"))]
    pub fn set_zone_volume<D: DeviceRegisters>(
        &mut self,
        dev: &mut D,
        zone: usize,
        vol: u8,
    ) -> Result<(), PreampError> {
        self.write_volume(dev, zone, vol)
    }

    /// Set a zone's attenuation, then apply automatic mute
    ///
    /// Crossing out of the configured band mutes a zone the user has not
    /// muted; returning into the band releases a mute applied here.
    ///
    /// If the volume write succeeds but the mute write fails, the error is
    /// returned with the new volume stored and applied, the mute flag
    /// unchanged, and the crossing not recorded. Repeating the call retries
    /// the mute.
    #[cfg(feature = "auto-mute")]
    pub fn set_zone_volume<D: DeviceRegisters>(
        &mut self,
        dev: &mut D,
        zone: usize,
        vol: u8,
    ) -> Result<(), PreampError> {
        self.write_volume(dev, zone, vol)?;

        let plan = self.auto_mute.plan(zone, vol, self.zones[zone].muted);
        if let Some(mute) = plan.mute {
            self.write_mute(dev, zone, mute)?;
            info!(
                "Zone {} auto-{} at -{}dB",
                zone,
                if mute { "muted" } else { "unmuted" },
                vol
            );
        }
        self.auto_mute.commit(zone, plan);
        Ok(())
    }

    /// Attenuation of a zone
    pub fn get_zone_volume(&self, zone: usize) -> Result<u8, PreampError> {
        self.zone(zone).map(|z| z.volume)
    }

    /// Route a source to a zone
    pub fn set_zone_source<D: DeviceRegisters>(
        &mut self,
        dev: &mut D,
        zone: usize,
        src: usize,
    ) -> Result<(), PreampError> {
        if let Err(e) = check_zone(zone).and_then(|_| check_source(src)) {
            warn!("Rejected source change: {}", e);
            return Err(e);
        }

        dev.write(DeviceWrite::SourceRoute { zone, source: src })?;
        self.zones[zone].source = src;
        debug!("Zone {} source set to {}", zone, src);
        Ok(())
    }

    /// Source routed to a zone
    pub fn get_zone_source(&self, zone: usize) -> Result<usize, PreampError> {
        self.zone(zone).map(|z| z.source)
    }

    /// Stored state of a zone
    pub fn zone(&self, zone: usize) -> Result<&ZoneState, PreampError> {
        self.zones
            .get(zone)
            .ok_or(PreampError::ZoneOutOfRange { zone })
    }

    /// Stored state of every zone
    pub fn zones(&self) -> &[ZoneState; ZONE_COUNT] {
        &self.zones
    }

    /// Source zones are reset to
    pub fn default_source(&self) -> usize {
        self.default_source
    }

    /// Automatic mute state of a zone
    #[cfg(feature = "auto-mute")]
    pub fn auto_mute_state(&self, zone: usize) -> Result<AutoMuteState, PreampError> {
        self.auto_mute
            .state(zone)
            .ok_or(PreampError::ZoneOutOfRange { zone })
    }

    /// Packed mute lines for the stored flags (bit n set mutes zone n)
    fn mute_mask(&self) -> u8 {
        self.zones
            .iter()
            .enumerate()
            .filter(|(_, z)| z.muted)
            .fold(0, |mask, (zone, _)| mask | (1 << zone))
    }

    fn write_volume<D: DeviceRegisters>(
        &mut self,
        dev: &mut D,
        zone: usize,
        vol: u8,
    ) -> Result<(), PreampError> {
        let checked = check_zone(zone).and_then(|_| {
            if vol > MAX_ATTENUATION {
                Err(PreampError::VolumeOutOfRange { volume: vol })
            } else {
                Ok(())
            }
        });
        if let Err(e) = checked {
            warn!("Rejected volume change: {}", e);
            return Err(e);
        }

        dev.write(DeviceWrite::Volume {
            zone,
            attenuation: vol,
        })?;
        self.zones[zone].volume = vol;
        debug!("Zone {} volume set to -{}dB", zone, vol);
        Ok(())
    }

    /// Drive the zone's mute line and store the flag; zone must be valid
    fn write_mute<D: DeviceRegisters>(
        &mut self,
        dev: &mut D,
        zone: usize,
        mute: bool,
    ) -> Result<(), PreampError> {
        dev.write(DeviceWrite::Mute {
            zone,
            muted: mute || self.standby,
        })?;
        self.zones[zone].muted = mute;
        Ok(())
    }
}

impl Default for ZoneController {
    fn default() -> Self {
        Self {
            zones: [ZoneState::default(); ZONE_COUNT],
            standby: false,
            default_source: 0,
            #[cfg(feature = "auto-mute")]
            auto_mute: AutoMuteCoordinator::new(AutoMuteConfig::default()),
        }
    }
}
