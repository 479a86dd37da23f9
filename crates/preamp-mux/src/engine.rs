//! Preamp engine
//!
//! Owns the device handle together with the zone and source controllers and
//! exposes the complete control surface. Each successful change is recorded
//! as a [`PreampEvent`] for observers.

use preamp_regs::registers::all_zones_mask;
use preamp_regs::{
    DeviceField, DeviceRegisters, InputType, DEFAULT_UNIT_ADDRESS, SOURCE_COUNT, UNIT_ADDRESSES,
    ZONE_COUNT,
};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

#[cfg(feature = "auto-mute")]
use crate::auto_mute::{AutoMuteConfig, AutoMuteState};
use crate::error::PreampError;
use crate::events::PreampEvent;
use crate::sources::SourceController;
use crate::state::{PreampStatus, ZoneState, ZoneStatus};
use crate::zones::ZoneController;

/// Preamp configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PreampConfig {
    /// Bus address of the preamp unit
    pub unit_address: u8,
    /// Source every zone is routed to after init
    pub default_source: usize,
    /// Input type every source is set to after init
    pub default_input: InputType,
    /// Automatic mute thresholds
    #[cfg(feature = "auto-mute")]
    pub auto_mute: AutoMuteConfig,
}

impl Default for PreampConfig {
    fn default() -> Self {
        Self {
            unit_address: DEFAULT_UNIT_ADDRESS,
            default_source: 0,
            default_input: InputType::Analog,
            #[cfg(feature = "auto-mute")]
            auto_mute: AutoMuteConfig::default(),
        }
    }
}

impl PreampConfig {
    /// Check the configuration against the board's limits
    pub fn validate(&self) -> Result<(), PreampError> {
        if !UNIT_ADDRESSES.contains(&self.unit_address) {
            return Err(PreampError::InvalidConfig(format!(
                "unit address 0x{:02X} is not a preamp address (expected 0x08, 0x10 .. 0x78)",
                self.unit_address
            )));
        }
        if self.default_source >= SOURCE_COUNT {
            return Err(PreampError::InvalidConfig(format!(
                "default source {} out of range (expected < {})",
                self.default_source, SOURCE_COUNT
            )));
        }
        #[cfg(feature = "auto-mute")]
        self.auto_mute.validate()?;
        Ok(())
    }
}

/// A field whose hardware value differs from the controller's state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldMismatch {
    /// Field that was read back
    pub field: DeviceField,
    /// Value implied by the controller's state
    pub expected: u8,
    /// Value read from the device
    pub actual: u8,
}

/// The preamp engine
pub struct Preamp<D> {
    config: PreampConfig,
    device: D,
    zones: ZoneController,
    sources: SourceController,
    event_buffer: Vec<PreampEvent>,
}

impl<D: DeviceRegisters> Preamp<D> {
    /// Create a preamp with default configuration
    ///
    /// State starts at the safe defaults; call [`Preamp::init`] before use
    /// to push it to the hardware.
    pub fn new(device: D) -> Self {
        Self {
            config: PreampConfig::default(),
            device,
            zones: ZoneController::default(),
            sources: SourceController::default(),
            event_buffer: Vec::new(),
        }
    }

    /// Create with custom configuration
    pub fn with_config(device: D, config: PreampConfig) -> Result<Self, PreampError> {
        config.validate()?;

        #[cfg(not(feature = "auto-mute"))]
        let zones = ZoneController::new(config.default_source)?;
        #[cfg(feature = "auto-mute")]
        let zones = ZoneController::with_auto_mute(config.default_source, config.auto_mute)?;

        Ok(Self {
            sources: SourceController::new(config.default_input),
            zones,
            device,
            config,
            event_buffer: Vec::new(),
        })
    }

    /// Get the current configuration
    pub fn config(&self) -> &PreampConfig {
        &self.config
    }

    /// Access the device
    pub fn device(&self) -> &D {
        &self.device
    }

    /// Mutable access to the device
    ///
    /// Writing through this handle bypasses the controllers; use it for
    /// transport maintenance only.
    pub fn device_mut(&mut self) -> &mut D {
        &mut self.device
    }

    /// Consume the engine and return the device
    pub fn into_device(self) -> D {
        self.device
    }

    /// Initialize zones, then sources
    pub fn init(&mut self) -> Result<(), PreampError> {
        self.init_zones()?;
        self.init_sources()
    }

    /// Reset every zone to the safe default and write it out
    pub fn init_zones(&mut self) -> Result<(), PreampError> {
        self.zones.init_zones(&mut self.device)?;
        self.event_buffer.push(PreampEvent::ZonesInitialized);
        Ok(())
    }

    /// Reset every source to the default input type and write it out
    pub fn init_sources(&mut self) -> Result<(), PreampError> {
        self.sources.init_sources(&mut self.device)?;
        self.event_buffer.push(PreampEvent::SourcesInitialized);
        Ok(())
    }

    /// Whether a zone is audible
    pub fn is_on(&self, zone: usize) -> Result<bool, PreampError> {
        self.zones.is_on(zone)
    }

    /// Whether any zone is audible
    ///
    /// Amplifier power stages may be shut down while this is false.
    pub fn any_on(&self) -> bool {
        self.zones.any_on()
    }

    /// Explicitly mute or unmute a zone
    pub fn mute(&mut self, zone: usize, mute: bool) -> Result<(), PreampError> {
        let before = self.zones.zone(zone).copied().ok();
        let result = self.zones.mute(&mut self.device, zone, mute);
        self.record_zone_changes(zone, before, false);
        result
    }

    /// Mute flag of a zone
    pub fn muted(&self, zone: usize) -> Result<bool, PreampError> {
        self.zones.muted(zone)
    }

    /// Enter or leave standby
    pub fn standby(&mut self, standby: bool) -> Result<(), PreampError> {
        let before = self.zones.in_standby();
        self.zones.standby(&mut self.device, standby)?;
        if before != standby {
            self.event_buffer
                .push(PreampEvent::StandbyChanged { standby });
        }
        Ok(())
    }

    /// Global standby flag
    pub fn in_standby(&self) -> bool {
        self.zones.in_standby()
    }

    /// Set a zone's attenuation
    ///
    /// With the `auto-mute` feature a threshold crossing may also change the
    /// zone's mute flag; that change is reported with `auto: true`.
    pub fn set_zone_volume(&mut self, zone: usize, vol: u8) -> Result<(), PreampError> {
        let before = self.zones.zone(zone).copied().ok();
        let result = self.zones.set_zone_volume(&mut self.device, zone, vol);
        self.record_zone_changes(zone, before, true);
        result
    }

    /// Attenuation of a zone
    pub fn get_zone_volume(&self, zone: usize) -> Result<u8, PreampError> {
        self.zones.get_zone_volume(zone)
    }

    /// Route a source to a zone
    ///
    /// The zone is not muted around the switch; mute it first for a
    /// pop-free change.
    pub fn set_zone_source(&mut self, zone: usize, src: usize) -> Result<(), PreampError> {
        let before = self.zones.zone(zone).copied().ok();
        let result = self.zones.set_zone_source(&mut self.device, zone, src);
        self.record_zone_changes(zone, before, false);
        result
    }

    /// Source routed to a zone
    pub fn get_zone_source(&self, zone: usize) -> Result<usize, PreampError> {
        self.zones.get_zone_source(zone)
    }

    /// Select the input type of a source
    pub fn set_source_ad(&mut self, src: usize, input_type: InputType) -> Result<(), PreampError> {
        let before = self.sources.get_source_ad(src).ok();
        self.sources
            .set_source_ad(&mut self.device, src, input_type)?;
        if before != Some(input_type) {
            self.event_buffer.push(PreampEvent::InputTypeChanged {
                source: src,
                input_type,
            });
        }
        Ok(())
    }

    /// Input type of a source
    pub fn get_source_ad(&self, src: usize) -> Result<InputType, PreampError> {
        self.sources.get_source_ad(src)
    }

    /// Automatic mute state of a zone
    #[cfg(feature = "auto-mute")]
    pub fn auto_mute_state(&self, zone: usize) -> Result<AutoMuteState, PreampError> {
        self.zones.auto_mute_state(zone)
    }

    /// Snapshot of every zone and source
    pub fn snapshot(&self) -> PreampStatus {
        let standby = self.zones.in_standby();
        let zones = self
            .zones
            .zones()
            .iter()
            .enumerate()
            .map(|(zone, state)| ZoneStatus {
                zone,
                volume: state.volume,
                muted: state.muted,
                source: state.source,
                on: !standby && !state.muted,
            })
            .collect();

        PreampStatus {
            standby,
            zones,
            sources: self.sources.sources().to_vec(),
        }
    }

    /// Read every field back and compare it with the controller's state
    ///
    /// Returns the fields that differ. Useful after a device error, when
    /// hardware and state may have diverged.
    pub fn verify(&mut self) -> Result<Vec<FieldMismatch>, PreampError> {
        let mut mismatches = Vec::new();
        for (field, expected) in self.expected_fields() {
            let actual = self.device.read(field)?;
            if actual != expected {
                mismatches.push(FieldMismatch {
                    field,
                    expected,
                    actual,
                });
            }
        }

        if mismatches.is_empty() {
            info!("Hardware matches controller state");
        } else {
            warn!("{} field(s) differ from hardware", mismatches.len());
        }
        Ok(mismatches)
    }

    /// Drain pending events
    pub fn drain_events(&mut self) -> Vec<PreampEvent> {
        std::mem::take(&mut self.event_buffer)
    }

    /// Field values the hardware should hold for the current state
    fn expected_fields(&self) -> Vec<(DeviceField, u8)> {
        let standby = self.zones.in_standby();
        let mut fields = Vec::with_capacity(3 * ZONE_COUNT + SOURCE_COUNT + 1);

        for (zone, state) in self.zones.zones().iter().enumerate() {
            fields.push((DeviceField::Volume { zone }, state.volume));
            fields.push((DeviceField::Mute { zone }, (state.muted || standby) as u8));
            fields.push((DeviceField::SourceRoute { zone }, state.source as u8));
        }
        fields.push((
            DeviceField::Standby,
            if standby { all_zones_mask() } else { 0 },
        ));
        for (source, input) in self.sources.sources().iter().enumerate() {
            fields.push((DeviceField::InputType { source }, input.is_digital() as u8));
        }
        fields
    }

    /// Emit events for whatever changed on a zone since `before`
    ///
    /// A mute change during a volume set comes from the auto-mute thresholds.
    fn record_zone_changes(&mut self, zone: usize, before: Option<ZoneState>, mute_is_auto: bool) {
        let (Some(before), Ok(after)) = (before, self.zones.zone(zone).copied()) else {
            return;
        };

        if before.volume != after.volume {
            self.event_buffer.push(PreampEvent::VolumeChanged {
                zone,
                volume: after.volume,
            });
        }
        if before.muted != after.muted {
            self.event_buffer.push(PreampEvent::MuteChanged {
                zone,
                muted: after.muted,
                auto: mute_is_auto,
            });
        }
        if before.source != after.source {
            self.event_buffer.push(PreampEvent::SourceChanged {
                zone,
                source: after.source,
            });
        }
    }
}

impl<D> std::fmt::Debug for Preamp<D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Preamp")
            .field("config", &self.config)
            .field("zones", &self.zones)
            .field("sources", &self.sources)
            .field("device", &"<device>")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use preamp_regs::{DeviceError, DeviceWrite};

    /// Device backed by plain field storage
    #[derive(Default)]
    struct FieldDevice {
        mute: [bool; ZONE_COUNT],
        volume: [u8; ZONE_COUNT],
        route: [u8; ZONE_COUNT],
        standby: bool,
        digital: [bool; SOURCE_COUNT],
    }

    impl DeviceRegisters for FieldDevice {
        fn write(&mut self, write: DeviceWrite) -> Result<(), DeviceError> {
            match write {
                DeviceWrite::Volume { zone, attenuation } => self.volume[zone] = attenuation,
                DeviceWrite::Mute { zone, muted } => self.mute[zone] = muted,
                DeviceWrite::Mutes { mask } => {
                    for (zone, muted) in self.mute.iter_mut().enumerate() {
                        *muted = mask & (1 << zone) != 0;
                    }
                }
                DeviceWrite::SourceRoute { zone, source } => self.route[zone] = source as u8,
                DeviceWrite::Standby { standby } => self.standby = standby,
                DeviceWrite::InputType { source, input_type } => {
                    self.digital[source] = input_type.is_digital()
                }
            }
            Ok(())
        }

        fn read(&mut self, field: DeviceField) -> Result<u8, DeviceError> {
            Ok(match field {
                DeviceField::Volume { zone } => self.volume[zone],
                DeviceField::Mute { zone } => self.mute[zone] as u8,
                DeviceField::SourceRoute { zone } => self.route[zone],
                DeviceField::Standby => {
                    if self.standby {
                        all_zones_mask()
                    } else {
                        0
                    }
                }
                DeviceField::InputType { source } => self.digital[source] as u8,
            })
        }
    }

    fn preamp() -> Preamp<FieldDevice> {
        let mut preamp = Preamp::new(FieldDevice::default());
        preamp.init().unwrap();
        preamp.drain_events();
        preamp
    }

    #[test]
    fn test_init_events() {
        let mut preamp = Preamp::new(FieldDevice::default());
        preamp.init().unwrap();
        assert_eq!(
            preamp.drain_events(),
            vec![PreampEvent::ZonesInitialized, PreampEvent::SourcesInitialized]
        );
        assert!(!preamp.any_on());
    }

    #[test]
    fn test_change_events() {
        let mut preamp = preamp();
        preamp.set_zone_volume(1, 30).unwrap();
        preamp.mute(1, false).unwrap();
        preamp.set_zone_source(1, 2).unwrap();
        preamp.set_source_ad(2, InputType::Digital).unwrap();
        preamp.standby(true).unwrap();

        assert_eq!(
            preamp.drain_events(),
            vec![
                PreampEvent::VolumeChanged { zone: 1, volume: 30 },
                PreampEvent::MuteChanged {
                    zone: 1,
                    muted: false,
                    auto: false
                },
                PreampEvent::SourceChanged { zone: 1, source: 2 },
                PreampEvent::InputTypeChanged {
                    source: 2,
                    input_type: InputType::Digital
                },
                PreampEvent::StandbyChanged { standby: true },
            ]
        );
    }

    #[test]
    fn test_repeated_values_emit_nothing() {
        let mut preamp = preamp();
        preamp.mute(0, true).unwrap();
        preamp.standby(false).unwrap();
        preamp.set_source_ad(0, InputType::Analog).unwrap();
        assert!(preamp.drain_events().is_empty());
    }

    #[test]
    fn test_rejected_call_emits_nothing() {
        let mut preamp = preamp();
        assert!(preamp.set_zone_volume(9, 10).is_err());
        assert!(preamp.set_source_ad(9, InputType::Digital).is_err());
        assert!(preamp.drain_events().is_empty());
    }

    #[test]
    fn test_snapshot() {
        let mut preamp = preamp();
        preamp.mute(4, false).unwrap();
        preamp.set_zone_volume(4, 12).unwrap();

        let status = preamp.snapshot();
        assert!(!status.standby);
        assert_eq!(status.zones.len(), ZONE_COUNT);
        assert_eq!(status.sources.len(), SOURCE_COUNT);
        assert!(status.zones[4].on);
        assert_eq!(status.zones[4].volume, 12);
        assert!(!status.zones[3].on);
        assert!(status.any_on());
    }

    #[test]
    fn test_verify_clean_and_diverged() {
        let mut preamp = preamp();
        preamp.mute(2, false).unwrap();
        assert!(preamp.verify().unwrap().is_empty());

        preamp.device_mut().mute[2] = true;
        let mismatches = preamp.verify().unwrap();
        assert_eq!(
            mismatches,
            vec![FieldMismatch {
                field: DeviceField::Mute { zone: 2 },
                expected: 0,
                actual: 1
            }]
        );
    }

    #[test]
    fn test_config_validation() {
        let config = PreampConfig {
            default_source: SOURCE_COUNT,
            ..Default::default()
        };
        assert!(matches!(
            Preamp::with_config(FieldDevice::default(), config),
            Err(PreampError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_unit_address_validation() {
        for unit_address in [0x00, 0x09, 0x80] {
            let config = PreampConfig {
                unit_address,
                ..Default::default()
            };
            assert!(matches!(
                config.validate(),
                Err(PreampError::InvalidConfig(msg)) if msg.contains("unit address")
            ));
        }
        for &unit_address in UNIT_ADDRESSES.iter() {
            let config = PreampConfig {
                unit_address,
                ..Default::default()
            };
            assert!(config.validate().is_ok());
        }
    }

    #[test]
    fn test_configured_defaults() {
        let config = PreampConfig {
            default_source: 3,
            default_input: InputType::Digital,
            ..Default::default()
        };
        let mut preamp = Preamp::with_config(FieldDevice::default(), config).unwrap();
        preamp.init().unwrap();

        assert_eq!(preamp.get_zone_source(5), Ok(3));
        assert_eq!(preamp.get_source_ad(0), Ok(InputType::Digital));
        assert_eq!(preamp.device().route[5], 3);
    }

    #[test]
    fn test_config_serde_defaults() {
        let config: PreampConfig = serde_json::from_str(r#"{"default_source": 1}"#).unwrap();
        assert_eq!(config.default_source, 1);
        assert_eq!(config.unit_address, DEFAULT_UNIT_ADDRESS);
        assert_eq!(config.default_input, InputType::Analog);
    }
}
