//! StarClash Headless Client
//!
//! Joins a game server without a renderer and keeps the mirrored world
//! alive: logs roster, score and star changes, and echoes the local
//! player's spawn transform every frame like a player standing still.

use std::time::Duration;

use anyhow::Context;
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use starclash_sync::{connection, ConnectionState, Session, SyncConfig, WorldEvent, VERSION};

/// Frame rate of the headless loop (Hz).
const FRAME_RATE: u64 = 60;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set tracing subscriber")?;

    let config = SyncConfig::from_env().context("Invalid configuration")?;

    info!("StarClash headless client v{}", VERSION);
    info!("Server: {}", config.server_url);
    info!("Send policy: {:?}", config.send_policy);

    let (handle, driver) = connection(&config);
    let network = tokio::spawn(driver.run());
    let mut session = Session::new(&config);

    let frame = Duration::from_millis(1000 / FRAME_RATE);
    let mut ticker = tokio::time::interval(frame);
    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = ticker.tick() => {}
            _ = &mut shutdown => {
                info!("Shutting down");
                handle.close();
                break;
            }
        }

        for event in handle.drain() {
            match session.handle(event) {
                Ok(changes) => changes.iter().for_each(log_change),
                Err(e) => {
                    error!("Fatal sync error: {}", e);
                    handle.close();
                }
            }
        }

        if let Some(local) = session.world().local().cloned() {
            session.update_local(frame, local.x, local.y, local.rotation);
        }

        for msg in session.drain_outbox() {
            if let Err(e) = handle.send(&msg) {
                warn!("Failed to queue message: {}", e);
            }
        }

        if handle.is_closed() && session.state() == ConnectionState::Disconnected {
            info!("Network task finished");
            break;
        }
    }

    network.await.context("Network task panicked")?;
    Ok(())
}

fn log_change(change: &WorldEvent) {
    match change {
        WorldEvent::LocalSpawned(avatar) => {
            info!("Joined as {} ({:?}) at ({:.1}, {:.1})", avatar.id, avatar.team, avatar.x, avatar.y);
        }
        WorldEvent::RemoteSpawned(avatar) => {
            info!("Player {} ({:?}) joined", avatar.id, avatar.team);
        }
        WorldEvent::RemoteDespawned(id) => info!("Player {} left", id),
        WorldEvent::ScoreChanged(scores) => info!("Blue: {} | Red: {}", scores.blue, scores.red),
        WorldEvent::StarPlaced(star) => info!("Star placed at ({:.1}, {:.1})", star.x, star.y),
        WorldEvent::LocalDespawned | WorldEvent::StarCleared | WorldEvent::RemoteMoved { .. } => {}
    }
}
