use std::path::PathBuf;

use anyhow::{bail, Result};
use board_core::SessionSnapshot;
use channel::LocalHub;
use clap::Parser;
use shared::domain::RoomId;
use tracing::info;
use tracing_subscriber::EnvFilter;

mod config;
mod scenario;

use config::load_settings;
use scenario::{peer_id, Room, Scenario};

/// Runs several board peers against an in-process channel and checks that
/// they end up with the same board.
#[derive(Parser, Debug)]
struct Args {
    #[arg(long)]
    room: Option<String>,
    #[arg(long)]
    peers: Option<usize>,
    #[arg(long)]
    config: Option<PathBuf>,
    #[arg(long, value_enum, default_value_t = Scenario::Basic)]
    scenario: Scenario,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();
    let args = Args::parse();

    let mut settings = load_settings(args.config.as_deref())?;
    if let Some(room) = args.room {
        settings.room_id = room;
    }
    if let Some(peers) = args.peers {
        settings.peers = peers;
    }
    if settings.peers < 2 {
        bail!("need at least two peers, got {}", settings.peers);
    }

    let hub = LocalHub::with_history_limit(settings.history_limit);
    let mut room = Room::new(
        hub,
        RoomId::new(settings.room_id.clone()),
        settings.session_config(),
    );
    for index in 0..settings.peers {
        room.join(peer_id(index)).await?;
    }
    info!(room = %settings.room_id, peers = settings.peers, scenario = ?args.scenario, "sim: room ready");

    scenario::run(&mut room, args.scenario).await?;
    let (converged, snapshots) = room.quiesce().await?;
    print_snapshots(&snapshots)?;
    room.shutdown().await;

    if !converged {
        bail!("peers diverged");
    }
    println!("converged: {} peers hold identical boards", snapshots.len());
    Ok(())
}

fn print_snapshots(snapshots: &[SessionSnapshot]) -> Result<()> {
    for snapshot in snapshots {
        println!(
            "{} (leader: {}, timer: {})",
            snapshot.client_id,
            snapshot.is_leader,
            board_core::timer::format_mm_ss(snapshot.timer.seconds)
        );
        println!("{}", serde_json::to_string_pretty(&snapshot.board)?);
    }
    Ok(())
}
