//! # StarClash Sync
//!
//! Realtime state-sync client for StarClash: mirrors the server-announced
//! roster, star and score, and pushes the local player's transform back.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    STARCLASH SYNC                            │
//! ├─────────────────────────────────────────────────────────────┤
//! │  game/            - World mirror (single writer)             │
//! │  ├── state.rs     - Local player, remote roster, star, score │
//! │  └── events.rs    - Spawn/move/despawn events for the scene  │
//! │                                                              │
//! │  network/         - Networking                               │
//! │  ├── protocol.rs  - Message types                            │
//! │  ├── session.rs   - Connection state machine                 │
//! │  └── transport.rs - WebSocket task + frame-loop queues       │
//! │                                                              │
//! │  config.rs        - Server URL, pacing, reconnect policy     │
//! │  error.rs         - Error kinds and dispositions             │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Consistency Model
//!
//! The server is the sole arbiter of truth. Inbound messages are applied
//! immediately and unconditionally, in arrival order:
//! - last write wins per player id for position and rotation
//! - the star is destroyed and recreated on every placement
//! - scores are overwritten wholesale
//!
//! No interpolation, prediction or reconciliation is performed.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod config;
pub mod error;
pub mod game;
pub mod network;

// Re-export commonly used types
pub use config::{ConfigError, ReconnectPolicy, SendPolicy, SyncConfig};
pub use error::{ErrorAction, ErrorKind, ErrorPolicy, SyncError};
pub use game::{Avatar, Star, SyncWorld, WorldEvent};
pub use network::{
    connection, ClientMessage, ConnectionDriver, ConnectionHandle, ConnectionState, PlayerId,
    Scores, ServerMessage, Session, Team, TransportEvent,
};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
