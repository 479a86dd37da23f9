//! Preamp Actor
//!
//! The controllers are not reentrant and do no locking of their own. When
//! several clients (network API, front panel, power management) share one
//! preamp, this actor owns the [`Preamp`] and runs their commands one at a
//! time, in arrival order.
//!
//! # Architecture
//!
//! The actor receives commands through a channel and emits events through another.
//! Each command carries a `oneshot` sender for its result; state changes are
//! forwarded as [`PreampEvent`]s after the command completes.
//!
//! # Example
//!
//! ```rust,ignore
//! use preamp_mux::actor::{run_preamp_actor, PreampHandle};
//! use tokio::sync::mpsc;
//!
//! let (cmd_tx, cmd_rx) = mpsc::channel(64);
//! let (event_tx, mut event_rx) = mpsc::channel(256);
//!
//! // Spawn the actor
//! tokio::spawn(run_preamp_actor(preamp, cmd_rx, event_tx));
//!
//! let handle = PreampHandle::new(cmd_tx);
//! handle.init().await?;
//! handle.set_zone_volume(2, 30).await?;
//! ```

use preamp_regs::{DeviceRegisters, InputType};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

use crate::engine::{FieldMismatch, Preamp};
use crate::error::PreampError;
use crate::events::PreampEvent;
use crate::state::{PreampStatus, ZoneStatus};

/// Result sender for a command
pub type Reply<T> = oneshot::Sender<Result<T, PreampError>>;

/// Commands sent to the preamp actor
#[derive(Debug)]
pub enum PreampCommand {
    /// Initialize zones and sources
    Init { response: Reply<()> },

    /// Set a zone's attenuation
    SetZoneVolume {
        zone: usize,
        volume: u8,
        response: Reply<()>,
    },

    /// Mute or unmute a zone
    Mute {
        zone: usize,
        mute: bool,
        response: Reply<()>,
    },

    /// Route a source to a zone
    SetZoneSource {
        zone: usize,
        source: usize,
        response: Reply<()>,
    },

    /// Enter or leave standby
    Standby { standby: bool, response: Reply<()> },

    /// Select a source's input type
    SetSourceAd {
        source: usize,
        input_type: InputType,
        response: Reply<()>,
    },

    /// Query one zone
    QueryZone {
        zone: usize,
        response: Reply<ZoneStatus>,
    },

    /// Query every zone and source
    QueryStatus {
        response: oneshot::Sender<PreampStatus>,
    },

    /// Compare hardware contents with controller state
    Verify { response: Reply<Vec<FieldMismatch>> },

    /// Shutdown the actor
    Shutdown,
}

impl PreampCommand {
    /// Command name for logs and error events
    pub fn name(&self) -> &'static str {
        match self {
            PreampCommand::Init { .. } => "init",
            PreampCommand::SetZoneVolume { .. } => "set_zone_volume",
            PreampCommand::Mute { .. } => "mute",
            PreampCommand::SetZoneSource { .. } => "set_zone_source",
            PreampCommand::Standby { .. } => "standby",
            PreampCommand::SetSourceAd { .. } => "set_source_ad",
            PreampCommand::QueryZone { .. } => "query_zone",
            PreampCommand::QueryStatus { .. } => "query_status",
            PreampCommand::Verify { .. } => "verify",
            PreampCommand::Shutdown => "shutdown",
        }
    }
}

/// Send a result back and report failures on the event channel
async fn reply<T>(
    event_tx: &mpsc::Sender<PreampEvent>,
    command: &'static str,
    response: Reply<T>,
    result: Result<T, PreampError>,
) {
    if let Err(e) = &result {
        warn!("Command {} failed: {}", command, e);
        let _ = event_tx
            .send(PreampEvent::CommandFailed {
                command,
                message: e.to_string(),
            })
            .await;
    }
    let _ = response.send(result);
}

/// Run the preamp actor
///
/// Processes commands until `Shutdown` is received or every sender is
/// dropped, then returns the preamp so its device can be reused.
///
/// # Arguments
///
/// * `preamp` - The engine to own for the lifetime of the actor
/// * `cmd_rx` - Receiver for commands sent to the actor
/// * `event_tx` - Sender for events emitted by the actor
pub async fn run_preamp_actor<D: DeviceRegisters>(
    mut preamp: Preamp<D>,
    mut cmd_rx: mpsc::Receiver<PreampCommand>,
    event_tx: mpsc::Sender<PreampEvent>,
) -> Preamp<D> {
    info!("Preamp actor started");

    while let Some(cmd) = cmd_rx.recv().await {
        let name = cmd.name();
        debug!("Processing {}", name);

        match cmd {
            PreampCommand::Init { response } => {
                let result = preamp.init();
                reply(&event_tx, name, response, result).await;
            }

            PreampCommand::SetZoneVolume {
                zone,
                volume,
                response,
            } => {
                let result = preamp.set_zone_volume(zone, volume);
                reply(&event_tx, name, response, result).await;
            }

            PreampCommand::Mute {
                zone,
                mute,
                response,
            } => {
                let result = preamp.mute(zone, mute);
                reply(&event_tx, name, response, result).await;
            }

            PreampCommand::SetZoneSource {
                zone,
                source,
                response,
            } => {
                let result = preamp.set_zone_source(zone, source);
                reply(&event_tx, name, response, result).await;
            }

            PreampCommand::Standby { standby, response } => {
                let result = preamp.standby(standby);
                reply(&event_tx, name, response, result).await;
            }

            PreampCommand::SetSourceAd {
                source,
                input_type,
                response,
            } => {
                let result = preamp.set_source_ad(source, input_type);
                reply(&event_tx, name, response, result).await;
            }

            PreampCommand::QueryZone { zone, response } => {
                let result = preamp
                    .snapshot()
                    .zones
                    .get(zone)
                    .copied()
                    .ok_or(PreampError::ZoneOutOfRange { zone });
                reply(&event_tx, name, response, result).await;
            }

            PreampCommand::QueryStatus { response } => {
                let _ = response.send(preamp.snapshot());
            }

            PreampCommand::Verify { response } => {
                let result = preamp.verify();
                reply(&event_tx, name, response, result).await;
            }

            PreampCommand::Shutdown => {
                info!("Preamp actor shutting down");
                break;
            }
        }

        for event in preamp.drain_events() {
            let _ = event_tx.send(event).await;
        }
    }

    info!("Preamp actor stopped");
    preamp
}

/// Cloneable client for a running preamp actor
#[derive(Debug, Clone)]
pub struct PreampHandle {
    cmd_tx: mpsc::Sender<PreampCommand>,
}

impl PreampHandle {
    /// Wrap the actor's command sender
    pub fn new(cmd_tx: mpsc::Sender<PreampCommand>) -> Self {
        Self { cmd_tx }
    }

    async fn request<T>(
        &self,
        build: impl FnOnce(Reply<T>) -> PreampCommand,
    ) -> Result<T, PreampError> {
        let (tx, rx) = oneshot::channel();
        self.cmd_tx
            .send(build(tx))
            .await
            .map_err(|_| PreampError::ActorStopped)?;
        rx.await.map_err(|_| PreampError::ActorStopped)?
    }

    /// Initialize zones and sources
    pub async fn init(&self) -> Result<(), PreampError> {
        self.request(|response| PreampCommand::Init { response })
            .await
    }

    /// Set a zone's attenuation
    pub async fn set_zone_volume(&self, zone: usize, volume: u8) -> Result<(), PreampError> {
        self.request(|response| PreampCommand::SetZoneVolume {
            zone,
            volume,
            response,
        })
        .await
    }

    /// Mute or unmute a zone
    pub async fn mute(&self, zone: usize, mute: bool) -> Result<(), PreampError> {
        self.request(|response| PreampCommand::Mute {
            zone,
            mute,
            response,
        })
        .await
    }

    /// Route a source to a zone
    pub async fn set_zone_source(&self, zone: usize, source: usize) -> Result<(), PreampError> {
        self.request(|response| PreampCommand::SetZoneSource {
            zone,
            source,
            response,
        })
        .await
    }

    /// Enter or leave standby
    pub async fn standby(&self, standby: bool) -> Result<(), PreampError> {
        self.request(|response| PreampCommand::Standby { standby, response })
            .await
    }

    /// Select a source's input type
    pub async fn set_source_ad(
        &self,
        source: usize,
        input_type: InputType,
    ) -> Result<(), PreampError> {
        self.request(|response| PreampCommand::SetSourceAd {
            source,
            input_type,
            response,
        })
        .await
    }

    /// Query one zone
    pub async fn zone(&self, zone: usize) -> Result<ZoneStatus, PreampError> {
        self.request(|response| PreampCommand::QueryZone { zone, response })
            .await
    }

    /// Query every zone and source
    pub async fn status(&self) -> Result<PreampStatus, PreampError> {
        let (tx, rx) = oneshot::channel();
        self.cmd_tx
            .send(PreampCommand::QueryStatus { response: tx })
            .await
            .map_err(|_| PreampError::ActorStopped)?;
        rx.await.map_err(|_| PreampError::ActorStopped)
    }

    /// Compare hardware contents with controller state
    pub async fn verify(&self) -> Result<Vec<FieldMismatch>, PreampError> {
        self.request(|response| PreampCommand::Verify { response })
            .await
    }

    /// Ask the actor to stop
    pub async fn shutdown(&self) -> Result<(), PreampError> {
        self.cmd_tx
            .send(PreampCommand::Shutdown)
            .await
            .map_err(|_| PreampError::ActorStopped)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use preamp_regs::RegisterDevice;
    use preamp_sim::VirtualPreamp;

    fn spawn_actor() -> (
        PreampHandle,
        mpsc::Receiver<PreampEvent>,
        tokio::task::JoinHandle<Preamp<RegisterDevice<VirtualPreamp>>>,
    ) {
        let (cmd_tx, cmd_rx) = mpsc::channel(16);
        let (event_tx, event_rx) = mpsc::channel(64);
        let preamp = Preamp::new(RegisterDevice::new(VirtualPreamp::new("actor-test")));
        let actor = tokio::spawn(run_preamp_actor(preamp, cmd_rx, event_tx));
        (PreampHandle::new(cmd_tx), event_rx, actor)
    }

    #[tokio::test]
    async fn test_init_and_query() {
        let (handle, mut event_rx, actor) = spawn_actor();

        handle.init().await.unwrap();
        assert_eq!(event_rx.recv().await, Some(PreampEvent::ZonesInitialized));
        assert_eq!(event_rx.recv().await, Some(PreampEvent::SourcesInitialized));

        let status = handle.status().await.unwrap();
        assert!(!status.any_on());

        handle.shutdown().await.unwrap();
        let preamp = actor.await.unwrap();
        assert_eq!(preamp.device().bus().zone_muted(0), Some(true));
    }

    #[tokio::test]
    async fn test_state_change_events() {
        let (handle, mut event_rx, actor) = spawn_actor();
        handle.init().await.unwrap();
        let _ = event_rx.recv().await;
        let _ = event_rx.recv().await;

        handle.set_zone_volume(2, 20).await.unwrap();
        handle.mute(2, false).await.unwrap();

        assert_eq!(
            event_rx.recv().await,
            Some(PreampEvent::VolumeChanged { zone: 2, volume: 20 })
        );
        assert_eq!(
            event_rx.recv().await,
            Some(PreampEvent::MuteChanged {
                zone: 2,
                muted: false,
                auto: false
            })
        );

        let zone = handle.zone(2).await.unwrap();
        assert!(zone.on);
        assert_eq!(zone.volume, 20);

        handle.shutdown().await.unwrap();
        actor.await.unwrap();
    }

    #[tokio::test]
    async fn test_errors_are_returned_and_reported() {
        let (handle, mut event_rx, actor) = spawn_actor();

        let err = handle.set_zone_source(0, 7).await.unwrap_err();
        assert_eq!(err, PreampError::SourceOutOfRange { src: 7 });

        match event_rx.recv().await {
            Some(PreampEvent::CommandFailed { command, message }) => {
                assert_eq!(command, "set_zone_source");
                assert!(message.contains("source 7"));
            }
            other => panic!("unexpected event: {:?}", other),
        }

        assert!(handle.zone(6).await.is_err());

        handle.shutdown().await.unwrap();
        actor.await.unwrap();
    }

    #[tokio::test]
    async fn test_device_failure_and_verify() {
        let (cmd_tx, cmd_rx) = mpsc::channel(16);
        let (event_tx, _event_rx) = mpsc::channel(64);
        let mut board = VirtualPreamp::new("flaky");
        board.set_offline(true);
        let preamp = Preamp::new(RegisterDevice::new(board));
        let actor = tokio::spawn(run_preamp_actor(preamp, cmd_rx, event_tx));
        let handle = PreampHandle::new(cmd_tx);

        assert!(matches!(
            handle.standby(true).await,
            Err(PreampError::Device(_))
        ));
        assert!(matches!(handle.verify().await, Err(PreampError::Device(_))));
        assert!(!handle.status().await.unwrap().standby);

        handle.shutdown().await.unwrap();
        actor.await.unwrap();
    }

    #[tokio::test]
    async fn test_handle_after_shutdown() {
        let (handle, _event_rx, actor) = spawn_actor();
        handle.shutdown().await.unwrap();
        actor.await.unwrap();

        assert_eq!(handle.init().await, Err(PreampError::ActorStopped));
        assert_eq!(handle.status().await, Err(PreampError::ActorStopped));
    }

    #[tokio::test]
    async fn test_actor_stops_when_senders_dropped() {
        let (handle, _event_rx, actor) = spawn_actor();
        drop(handle);
        let preamp = actor.await.unwrap();
        assert!(!preamp.in_standby());
    }
}
