//! Automatic mute on volume thresholds
//!
//! Each zone is either `Normal` or `AutoMuted`. The coordinator remembers on
//! which side of the configured band the zone's volume was last seen, so only
//! a *crossing* from in-band to out-of-band mutes the zone. Returning in band
//! unmutes it again, but only if the mute was applied here: an explicit user
//! mute (or unmute) clears the automatic marker and is never overridden.
//!
//! Volumes are attenuations, so the "dangerously loud" limit is a *low*
//! number and the "effectively silent" limit a *high* one.

use preamp_regs::{MAX_ATTENUATION, ZONE_COUNT};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::PreampError;

/// Threshold configuration for automatic mute
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AutoMuteConfig {
    /// Attenuation at or below which the zone is too loud
    pub loud_limit: Option<u8>,
    /// Attenuation at or above which the zone is effectively silent
    pub quiet_limit: Option<u8>,
    /// Steps back inside a limit before the zone counts as in band again
    pub hysteresis: u8,
}

impl Default for AutoMuteConfig {
    fn default() -> Self {
        Self {
            loud_limit: None,
            quiet_limit: Some(MAX_ATTENUATION),
            hysteresis: 0,
        }
    }
}

impl AutoMuteConfig {
    /// Check that the limits describe a non-empty band
    pub fn validate(&self) -> Result<(), PreampError> {
        for limit in [self.loud_limit, self.quiet_limit].into_iter().flatten() {
            if limit > MAX_ATTENUATION {
                return Err(PreampError::InvalidConfig(format!(
                    "auto-mute limit {limit} exceeds {MAX_ATTENUATION}"
                )));
            }
        }
        if let (Some(loud), Some(quiet)) = (self.loud_limit, self.quiet_limit) {
            let inner_loud = loud as u16 + self.hysteresis as u16;
            let inner_quiet = (quiet as u16).saturating_sub(self.hysteresis as u16);
            if inner_loud + 1 >= inner_quiet {
                return Err(PreampError::InvalidConfig(format!(
                    "auto-mute band is empty (loud {loud}, quiet {quiet}, hysteresis {})",
                    self.hysteresis
                )));
            }
        }
        Ok(())
    }
}

/// Automatic mute state of a zone
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum AutoMuteState {
    /// No automatic mute in effect
    #[default]
    Normal,
    /// The zone was muted by a threshold crossing
    AutoMuted,
}

/// Where a volume lies relative to the configured band
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Band {
    /// Normal operating range
    Inside,
    /// Too loud or effectively silent
    Outside,
}

/// Outcome of evaluating a volume change, applied with [`AutoMuteCoordinator::commit`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AutoMutePlan {
    /// Band the new volume lies in
    pub band: Band,
    /// Mute change to apply, if any
    pub mute: Option<bool>,
}

#[derive(Debug, Clone, Copy)]
struct ZoneTracking {
    state: AutoMuteState,
    band: Band,
}

/// Tracks automatic mute for every zone
#[derive(Debug, Clone)]
pub struct AutoMuteCoordinator {
    config: AutoMuteConfig,
    zones: [ZoneTracking; ZONE_COUNT],
}

impl AutoMuteCoordinator {
    /// Create a coordinator with all zones normal and in band
    pub fn new(config: AutoMuteConfig) -> Self {
        Self {
            config,
            zones: [ZoneTracking {
                state: AutoMuteState::Normal,
                band: Band::Inside,
            }; ZONE_COUNT],
        }
    }

    /// Get the threshold configuration
    pub fn config(&self) -> &AutoMuteConfig {
        &self.config
    }

    /// Forget every automatic mute and seed the band from `volume`
    pub fn reset(&mut self, volume: u8) {
        let band = self.classify(Band::Inside, volume);
        for zone in &mut self.zones {
            zone.state = AutoMuteState::Normal;
            zone.band = band;
        }
    }

    /// Automatic mute state of a zone
    pub fn state(&self, zone: usize) -> Option<AutoMuteState> {
        self.zones.get(zone).map(|z| z.state)
    }

    /// Classify a volume, applying hysteresis when leaving the outside band
    pub fn classify(&self, previous: Band, volume: u8) -> Band {
        let slack = match previous {
            Band::Inside => 0,
            Band::Outside => self.config.hysteresis,
        };
        let too_loud = self
            .config
            .loud_limit
            .is_some_and(|limit| volume <= limit.saturating_add(slack));
        let too_quiet = self
            .config
            .quiet_limit
            .is_some_and(|limit| volume >= limit.saturating_sub(slack));

        if too_loud || too_quiet {
            Band::Outside
        } else {
            Band::Inside
        }
    }

    /// Decide what a volume change on `zone` should do to its mute
    ///
    /// `muted` is the zone's current mute flag. Nothing is recorded until
    /// the plan is committed.
    pub fn plan(&self, zone: usize, volume: u8, muted: bool) -> AutoMutePlan {
        let Some(tracking) = self.zones.get(zone) else {
            return AutoMutePlan {
                band: Band::Inside,
                mute: None,
            };
        };

        let band = self.classify(tracking.band, volume);
        let mute = match (tracking.state, tracking.band, band) {
            (AutoMuteState::Normal, Band::Inside, Band::Outside) if !muted => Some(true),
            (AutoMuteState::AutoMuted, _, Band::Inside) => Some(false),
            _ => None,
        };

        AutoMutePlan { band, mute }
    }

    /// Record a plan after its mute change reached the hardware
    pub fn commit(&mut self, zone: usize, plan: AutoMutePlan) {
        let Some(tracking) = self.zones.get_mut(zone) else {
            return;
        };
        tracking.band = plan.band;
        match plan.mute {
            Some(true) => {
                tracking.state = AutoMuteState::AutoMuted;
                debug!("Zone {} auto-muted", zone);
            }
            Some(false) => {
                tracking.state = AutoMuteState::Normal;
                debug!("Zone {} auto-unmuted", zone);
            }
            None => {}
        }
    }

    /// An explicit mute call takes over the zone
    pub fn clear(&mut self, zone: usize) {
        if let Some(tracking) = self.zones.get_mut(zone) {
            tracking.state = AutoMuteState::Normal;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn loud_config() -> AutoMuteConfig {
        AutoMuteConfig {
            loud_limit: Some(10),
            quiet_limit: Some(70),
            hysteresis: 0,
        }
    }

    fn step(coord: &mut AutoMuteCoordinator, zone: usize, volume: u8, muted: bool) -> Option<bool> {
        let plan = coord.plan(zone, volume, muted);
        coord.commit(zone, plan);
        plan.mute
    }

    #[test]
    fn test_default_config_valid() {
        assert!(AutoMuteConfig::default().validate().is_ok());
        assert!(loud_config().validate().is_ok());
    }

    #[test]
    fn test_invalid_configs() {
        let too_high = AutoMuteConfig {
            quiet_limit: Some(80),
            ..Default::default()
        };
        assert!(too_high.validate().is_err());

        let empty = AutoMuteConfig {
            loud_limit: Some(40),
            quiet_limit: Some(45),
            hysteresis: 3,
        };
        assert!(empty.validate().is_err());
    }

    #[test]
    fn test_classify() {
        let coord = AutoMuteCoordinator::new(loud_config());
        assert_eq!(coord.classify(Band::Inside, 10), Band::Outside);
        assert_eq!(coord.classify(Band::Inside, 11), Band::Inside);
        assert_eq!(coord.classify(Band::Inside, 70), Band::Outside);
        assert_eq!(coord.classify(Band::Inside, 69), Band::Inside);
    }

    #[test]
    fn test_crossing_mutes_and_return_unmutes() {
        let mut coord = AutoMuteCoordinator::new(loud_config());

        assert_eq!(step(&mut coord, 0, 30, false), None);
        assert_eq!(step(&mut coord, 0, 5, false), Some(true));
        assert_eq!(coord.state(0), Some(AutoMuteState::AutoMuted));

        // Still outside: nothing more to do
        assert_eq!(step(&mut coord, 0, 3, true), None);

        assert_eq!(step(&mut coord, 0, 30, true), Some(false));
        assert_eq!(coord.state(0), Some(AutoMuteState::Normal));
    }

    #[test]
    fn test_user_muted_zone_not_auto_muted() {
        let mut coord = AutoMuteCoordinator::new(loud_config());
        assert_eq!(step(&mut coord, 1, 5, true), None);
        assert_eq!(coord.state(1), Some(AutoMuteState::Normal));

        // Back in band never unmutes a user mute
        assert_eq!(step(&mut coord, 1, 30, true), None);
    }

    #[test]
    fn test_clear_requires_new_crossing() {
        let mut coord = AutoMuteCoordinator::new(loud_config());
        step(&mut coord, 2, 30, false);
        assert_eq!(step(&mut coord, 2, 5, false), Some(true));

        coord.clear(2);
        assert_eq!(step(&mut coord, 2, 4, false), None);
        assert_eq!(step(&mut coord, 2, 30, false), None);
        assert_eq!(step(&mut coord, 2, 8, false), Some(true));
    }

    #[test]
    fn test_hysteresis() {
        let mut coord = AutoMuteCoordinator::new(AutoMuteConfig {
            loud_limit: Some(10),
            quiet_limit: None,
            hysteresis: 4,
        });
        step(&mut coord, 0, 30, false);
        assert_eq!(step(&mut coord, 0, 10, false), Some(true));
        assert_eq!(step(&mut coord, 0, 14, true), None);
        assert_eq!(step(&mut coord, 0, 15, true), Some(false));
    }

    #[test]
    fn test_uncommitted_plan_changes_nothing() {
        let mut coord = AutoMuteCoordinator::new(loud_config());
        step(&mut coord, 0, 30, false);

        let plan = coord.plan(0, 5, false);
        assert_eq!(plan.mute, Some(true));
        assert_eq!(coord.state(0), Some(AutoMuteState::Normal));

        // Same crossing is still pending after a failed apply
        assert_eq!(coord.plan(0, 5, false).mute, Some(true));
    }

    #[test]
    fn test_reset_seeds_band() {
        let mut coord = AutoMuteCoordinator::new(AutoMuteConfig::default());
        coord.reset(MAX_ATTENUATION);

        // Already outside after reset: staying at max is not a crossing
        assert_eq!(step(&mut coord, 0, MAX_ATTENUATION, false), None);
        assert_eq!(step(&mut coord, 0, 40, false), None);
        assert_eq!(step(&mut coord, 0, MAX_ATTENUATION, false), Some(true));
    }

    #[test]
    fn test_out_of_range_zone_ignored() {
        let mut coord = AutoMuteCoordinator::new(loud_config());
        assert_eq!(coord.plan(ZONE_COUNT, 5, false).mute, None);
        coord.clear(ZONE_COUNT);
        assert_eq!(coord.state(ZONE_COUNT), None);
    }
}
