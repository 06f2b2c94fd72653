//! World Events
//!
//! Changes produced by applying server messages to the world mirror.
//! The scene consumes these to spawn, move and despawn its visuals.

use crate::game::state::{Avatar, Star};
use crate::network::protocol::{PlayerId, Scores};

/// A single observable change to the mirrored world.
#[derive(Debug, Clone, PartialEq)]
pub enum WorldEvent {
    /// The local player was created (or replaced by a fresh snapshot).
    LocalSpawned(Avatar),

    /// The local player was dropped.
    LocalDespawned,

    /// A remote player was created, or replaced when its id was already known.
    RemoteSpawned(Avatar),

    /// A remote player's transform changed.
    RemoteMoved {
        /// Player that moved.
        player_id: PlayerId,
        /// New X position.
        x: f32,
        /// New Y position.
        y: f32,
        /// New rotation.
        rotation: f32,
    },

    /// A remote player was removed.
    RemoteDespawned(PlayerId),

    /// Both team counters were overwritten.
    ScoreChanged(Scores),

    /// The previous star (if any) is gone and this one replaces it.
    StarPlaced(Star),

    /// The star was dropped without a replacement.
    StarCleared,
}

impl WorldEvent {
    /// Player the event refers to, if any.
    pub fn player_id(&self) -> Option<&PlayerId> {
        match self {
            WorldEvent::LocalSpawned(avatar) | WorldEvent::RemoteSpawned(avatar) => Some(&avatar.id),
            WorldEvent::RemoteMoved { player_id, .. } => Some(player_id),
            WorldEvent::RemoteDespawned(player_id) => Some(player_id),
            _ => None,
        }
    }
}
