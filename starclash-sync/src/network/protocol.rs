//! Protocol Messages
//!
//! Wire format for client-server communication over WebSocket.
//! Every frame is a JSON text message tagged by a `type` field.
//! Coordinates are world pixels with the origin at the top-left corner
//! and `y` growing downward.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

// =============================================================================
// SHARED TYPES
// =============================================================================

/// Opaque, server-assigned player identifier.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlayerId(pub String);

impl PlayerId {
    /// Create a player id from anything string-like.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the raw id.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PlayerId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

/// The two fixed teams.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Team {
    /// Blue team.
    Blue,
    /// Red team.
    Red,
}

/// Transform and team of one player as carried in a roster snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlayerSnapshot {
    /// X position.
    pub x: f32,
    /// Y position.
    pub y: f32,
    /// Rotation in radians.
    #[serde(default)]
    pub rotation: f32,
    /// Team affiliation.
    pub team: Team,
}

/// A player announced individually (join notification).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerInfo {
    /// Player identifier.
    pub player_id: PlayerId,
    /// X position.
    pub x: f32,
    /// Y position.
    pub y: f32,
    /// Rotation in radians.
    #[serde(default)]
    pub rotation: f32,
    /// Team affiliation.
    pub team: Team,
}

impl PlayerInfo {
    /// Split into id and snapshot.
    pub fn into_parts(self) -> (PlayerId, PlayerSnapshot) {
        (
            self.player_id,
            PlayerSnapshot {
                x: self.x,
                y: self.y,
                rotation: self.rotation,
                team: self.team,
            },
        )
    }
}

/// Team score tally. Counters are unsigned on the wire, so a negative
/// value fails to decode.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scores {
    /// Blue team points.
    pub blue: u32,
    /// Red team points.
    pub red: u32,
}

// =============================================================================
// CLIENT -> SERVER MESSAGES
// =============================================================================

/// Messages sent from client to server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Local player transform, sent once per rendered frame.
    PlayerMovement {
        /// X position.
        x: f32,
        /// Y position.
        y: f32,
        /// Rotation in radians.
        rotation: f32,
    },

    /// The local avatar overlapped the star.
    StarCollected,
}

// =============================================================================
// SERVER -> CLIENT MESSAGES
// =============================================================================

/// Messages sent from server to client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Handshake naming this connection's player id.
    Welcome {
        /// Id the server assigned to this client.
        player_id: PlayerId,
    },

    /// Full roster, pushed right after the handshake.
    CurrentPlayers {
        /// Every connected player, including this client.
        players: BTreeMap<PlayerId, PlayerSnapshot>,
    },

    /// Another player joined.
    NewPlayer(PlayerInfo),

    /// A player left.
    PlayerDisconnected {
        /// Id of the departed player.
        player_id: PlayerId,
    },

    /// A remote player moved.
    PlayerMoved {
        /// Id of the moving player.
        player_id: PlayerId,
        /// X position.
        x: f32,
        /// Y position.
        y: f32,
        /// Rotation in radians.
        #[serde(default)]
        rotation: f32,
    },

    /// Score tally changed.
    ScoreUpdate(Scores),

    /// The star was (re)placed.
    StarLocation {
        /// X position.
        x: f32,
        /// Y position.
        y: f32,
    },
}

impl ServerMessage {
    /// Short name of the message kind, used in logs.
    pub fn kind(&self) -> &'static str {
        match self {
            ServerMessage::Welcome { .. } => "welcome",
            ServerMessage::CurrentPlayers { .. } => "current_players",
            ServerMessage::NewPlayer(_) => "new_player",
            ServerMessage::PlayerDisconnected { .. } => "player_disconnected",
            ServerMessage::PlayerMoved { .. } => "player_moved",
            ServerMessage::ScoreUpdate(_) => "score_update",
            ServerMessage::StarLocation { .. } => "star_location",
        }
    }
}

// =============================================================================
// SERIALIZATION HELPERS
// =============================================================================

impl ClientMessage {
    /// Serialize to JSON string.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Deserialize from JSON string.
    pub fn from_json(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }
}

impl ServerMessage {
    /// Serialize to JSON string.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Deserialize from JSON string.
    pub fn from_json(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }
}
