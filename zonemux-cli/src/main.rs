//! Zonemux Console
//!
//! Drives a six-zone preamp from a line-oriented console. The preamp runs on
//! a simulated board; commands go through the preamp actor exactly as a
//! network or front-panel client would send them.

mod console;
mod settings;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use preamp_mux::{run_preamp_actor, Preamp, PreampError, PreampEvent, PreampHandle};
use preamp_regs::RegisterDevice;
use preamp_sim::{VirtualPreamp, VirtualPreampConfig};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use console::{ConsoleCommand, HELP};
use settings::Settings;

/// Zonemux - six-zone preamp console
#[derive(Parser, Debug)]
#[command(name = "zonemux")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the settings file (JSON)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Print status as JSON
    #[arg(long)]
    json: bool,

    /// Simulated board name (overrides settings)
    #[arg(short, long)]
    board: Option<String>,

    /// Write the effective settings to the settings file and exit
    #[arg(long)]
    write_config: bool,
}

fn describe(event: &PreampEvent) -> String {
    match event {
        PreampEvent::ZonesInitialized => "zones initialized".to_string(),
        PreampEvent::SourcesInitialized => "sources initialized".to_string(),
        PreampEvent::VolumeChanged { zone, volume } => format!("zone {zone} volume -{volume}dB"),
        PreampEvent::MuteChanged { zone, muted, auto } => format!(
            "zone {zone} {}{}",
            if *muted { "muted" } else { "unmuted" },
            if *auto { " (auto)" } else { "" }
        ),
        PreampEvent::SourceChanged { zone, source } => format!("zone {zone} <- source {source}"),
        PreampEvent::StandbyChanged { standby } => {
            format!("standby {}", if *standby { "on" } else { "off" })
        }
        PreampEvent::InputTypeChanged { source, input_type } => {
            format!("source {source} input {input_type}")
        }
        PreampEvent::CommandFailed { command, message } => format!("{command} failed: {message}"),
    }
}

/// Run one command; returns false when the console should exit
async fn execute(handle: &PreampHandle, command: ConsoleCommand, json: bool) -> Result<bool> {
    let result: Result<(), PreampError> = match command {
        ConsoleCommand::Volume { zone, volume } => handle.set_zone_volume(zone, volume).await,
        ConsoleCommand::Mute { zone, mute } => handle.mute(zone, mute).await,
        ConsoleCommand::Source { zone, source } => handle.set_zone_source(zone, source).await,
        ConsoleCommand::Input { source, input_type } => {
            handle.set_source_ad(source, input_type).await
        }
        ConsoleCommand::Standby(standby) => handle.standby(standby).await,
        ConsoleCommand::Init => handle.init().await,
        ConsoleCommand::Status(None) => {
            let status = handle.status().await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&status)?);
            } else {
                print!("{status}");
            }
            Ok(())
        }
        ConsoleCommand::Status(Some(zone)) => handle.zone(zone).await.and_then(|z| {
            if json {
                match serde_json::to_string_pretty(&z) {
                    Ok(s) => println!("{s}"),
                    Err(e) => println!("error: {e}"),
                }
            } else {
                println!(
                    "zone {}: source {}, {} dB, {}{}",
                    z.zone,
                    z.source,
                    z.gain_db(),
                    if z.muted { "muted" } else { "unmuted" },
                    if z.on { ", on" } else { ", off" }
                );
            }
            Ok(())
        }),
        ConsoleCommand::Verify => handle.verify().await.map(|mismatches| {
            if mismatches.is_empty() {
                println!("hardware matches");
            }
            for m in mismatches {
                println!(
                    "{:?}: expected {}, hardware has {}",
                    m.field, m.expected, m.actual
                );
            }
        }),
        ConsoleCommand::Help => {
            println!("{HELP}");
            Ok(())
        }
        ConsoleCommand::Quit => return Ok(false),
    };

    match result {
        Ok(()) => {}
        Err(PreampError::ActorStopped) => return Err(PreampError::ActorStopped.into()),
        Err(e) => println!("error: {e}"),
    }
    Ok(true)
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Logs go to stderr so console output stays clean
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "zonemux=info,preamp_mux=info,preamp_regs=info,preamp_sim=info".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    tracing::info!("Zonemux v{}", env!("CARGO_PKG_VERSION"));

    let mut settings =
        Settings::load(args.config.as_deref()).context("Failed to load settings")?;
    if let Some(board) = args.board {
        settings.board_id = board;
    }

    if args.write_config {
        let path = settings.save(args.config.as_deref())?;
        println!("settings written to {}", path.display());
        return Ok(());
    }

    let address = settings.preamp.unit_address;
    let board = VirtualPreamp::from_config(VirtualPreampConfig {
        id: settings.board_id.clone(),
        address,
        ..Default::default()
    });
    let preamp = Preamp::with_config(
        RegisterDevice::with_address(board, address),
        settings.preamp.clone(),
    )
    .context("Failed to configure preamp")?;

    let (cmd_tx, cmd_rx) = mpsc::channel(64);
    let (event_tx, mut event_rx) = mpsc::channel(256);
    let actor = tokio::spawn(run_preamp_actor(preamp, cmd_rx, event_tx));
    let handle = PreampHandle::new(cmd_tx);

    let show_events = settings.show_events;
    let events = tokio::spawn(async move {
        while let Some(event) = event_rx.recv().await {
            if show_events {
                println!("* {}", describe(&event));
            }
        }
    });

    if settings.init_on_start {
        handle.init().await.context("Failed to initialize preamp")?;
    }

    println!("zonemux ready on '{}' (type 'help')", settings.board_id);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        match console::parse(&line) {
            Ok(command) => {
                if !execute(&handle, command, args.json).await? {
                    break;
                }
            }
            Err(e) => println!("error: {e}"),
        }
    }

    handle.shutdown().await?;
    let preamp = actor.await.context("Preamp actor panicked")?;
    drop(handle);
    events.await.context("Event task panicked")?;

    print!("{}", preamp.device().bus());
    Ok(())
}
