//! WebSocket client systems

use bevy::prelude::*;
use bevy_tokio_tasks::TokioTasksRuntime;
use starclash_sync::{connection, ConnectionHandle, ConnectionState};

use super::{NetworkSettings, SyncSession, WorldChanged};
use crate::AppState;

/// Frame-loop side of the server connection.
#[derive(Resource, Clone)]
pub struct ServerConnection(pub ConnectionHandle);

/// Open the connection at startup. Frames queue up until the scene is
/// playing and starts draining them.
pub fn connect_to_server(
    runtime: Res<TokioTasksRuntime>,
    settings: Res<NetworkSettings>,
    mut commands: Commands,
) {
    info!("Initiating connection to server...");

    let (handle, driver) = connection(&settings.config);
    commands.insert_resource(ServerConnection(handle));

    runtime.spawn_background_task(move |_ctx| async move {
        driver.run().await;
    });
}

/// Apply everything the transport received since last frame, in order.
pub fn receive_server_events(
    connection: Option<Res<ServerConnection>>,
    mut session: ResMut<SyncSession>,
    mut changes: EventWriter<WorldChanged>,
    mut next_state: ResMut<NextState<AppState>>,
) {
    let Some(connection) = connection else {
        return;
    };

    for event in connection.0.drain() {
        match session.handle(event) {
            Ok(events) => {
                changes.send_batch(events.into_iter().map(WorldChanged));
            }
            Err(e) => {
                error!("Fatal sync error, disconnecting: {}", e);
                connection.0.close();
                next_state.set(AppState::Disconnected);
                return;
            }
        }
    }
}

/// Push queued outbound messages to the network task.
pub fn send_queued_messages(
    connection: Option<Res<ServerConnection>>,
    mut session: ResMut<SyncSession>,
) {
    let Some(connection) = connection else {
        return;
    };

    for msg in session.drain_outbox() {
        if let Err(e) = connection.0.send(&msg) {
            warn!("Failed to queue {:?}: {}", msg, e);
        }
    }
}

/// Leave the game once the network task has given up.
pub fn watch_connection(
    connection: Option<Res<ServerConnection>>,
    session: Res<SyncSession>,
    mut next_state: ResMut<NextState<AppState>>,
) {
    let Some(connection) = connection else {
        return;
    };

    if connection.0.is_closed() && session.state() == ConnectionState::Disconnected {
        info!("Connection closed for good");
        next_state.set(AppState::Disconnected);
    }
}
