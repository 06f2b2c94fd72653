//! Network module - bridges the sync session into the Bevy world
//!
//! The WebSocket runs on the tokio runtime owned by `bevy-tokio-tasks`.
//! Its events are drained once per frame into the [`SyncSession`], which
//! is the only writer of mirrored state; the resulting world changes are
//! re-emitted as [`WorldChanged`] events for the scene.

mod client;

pub use client::*;

use bevy::prelude::*;
use starclash_sync::{ConfigError, Session, SyncConfig, WorldEvent};

use crate::{AppState, FrameSet};

pub struct NetworkPlugin;

impl Plugin for NetworkPlugin {
    fn build(&self, app: &mut App) {
        let settings = NetworkSettings {
            config: resolve_config(SyncConfig::from_env()),
        };
        info!(
            "Server: {} (send policy {:?}, reconnect {})",
            settings.config.server_url,
            settings.config.send_policy,
            if settings.config.reconnect.enabled { "on" } else { "off" }
        );
        let session = SyncSession(Session::new(&settings.config));

        app
            .insert_resource(settings)
            .insert_resource(session)
            .add_event::<WorldChanged>()
            .add_systems(Startup, connect_to_server)
            .add_systems(Update, receive_server_events.in_set(FrameSet::Receive))
            .add_systems(Update, send_queued_messages.in_set(FrameSet::Send))
            .add_systems(Update, watch_connection.run_if(in_state(AppState::Playing)));
    }
}

/// Connection settings, read from the environment when the plugin is built.
#[derive(Resource)]
pub struct NetworkSettings {
    pub config: SyncConfig,
}

/// A rejected environment is reported right away and replaced by defaults.
fn resolve_config(loaded: Result<SyncConfig, ConfigError>) -> SyncConfig {
    loaded.unwrap_or_else(|e| {
        error!("Invalid network configuration, using defaults: {}", e);
        SyncConfig::default()
    })
}

/// The mirrored world and its connection state machine.
#[derive(Resource, Deref, DerefMut)]
pub struct SyncSession(pub Session);

/// A change to the mirrored world, for the scene to act on.
#[derive(Event, Debug, Clone)]
pub struct WorldChanged(pub WorldEvent);
