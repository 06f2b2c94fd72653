//! Sync Session
//!
//! Per-connection state machine wrapped around the world mirror.
//! Consumes transport events on the frame loop, applies decoded server
//! messages, routes errors through the configured policy, and queues the
//! client's outbound messages.
//!
//! ```text
//! Connecting --welcome--> Connected --closed--> Disconnected
//!      ^                                             |
//!      +-------------------opened--------------------+
//! ```
//!
//! A reopened socket starts a fresh session: the mirror is cleared and
//! rebuilt from the server's roster push.

use std::collections::VecDeque;
use std::time::Duration;

use tracing::{debug, info};

use crate::config::{SendPolicy, SyncConfig};
use crate::error::{ErrorPolicy, SyncError};
use crate::game::events::WorldEvent;
use crate::game::state::SyncWorld;
use crate::network::protocol::{ClientMessage, ServerMessage};
use crate::network::transport::TransportEvent;

/// Connection state of the current session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
    /// Socket opening or open, handshake not yet received.
    #[default]
    Connecting,
    /// Handshake received, roster expected.
    Connected,
    /// Socket closed. Terminal for this session.
    Disconnected,
}

/// Single-writer owner of the mirrored world.
#[derive(Debug)]
pub struct Session {
    state: ConnectionState,
    world: SyncWorld,
    outbox: VecDeque<ClientMessage>,
    send_policy: SendPolicy,
    errors: ErrorPolicy,
    last_sent: Option<(f32, f32, f32)>,
    since_last_send: Duration,
    reported_star: Option<u64>,
    connections: u32,
}

impl Session {
    /// Create a session in the `Connecting` state.
    pub fn new(config: &SyncConfig) -> Self {
        Self {
            state: ConnectionState::Connecting,
            world: SyncWorld::new(),
            outbox: VecDeque::new(),
            send_policy: config.send_policy,
            errors: config.errors,
            last_sent: None,
            since_last_send: Duration::ZERO,
            reported_star: None,
            connections: 0,
        }
    }

    /// Current connection state.
    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Whether the handshake has completed on the current socket.
    pub fn is_connected(&self) -> bool {
        self.state == ConnectionState::Connected
    }

    /// Read-only view of the mirrored world.
    pub fn world(&self) -> &SyncWorld {
        &self.world
    }

    /// Number of sockets opened so far.
    pub fn connections(&self) -> u32 {
        self.connections
    }

    /// Apply one transport event.
    ///
    /// Non-fatal errors are logged per policy and yield no events; fatal
    /// ones are returned.
    pub fn handle(&mut self, event: TransportEvent) -> Result<Vec<WorldEvent>, SyncError> {
        match event {
            TransportEvent::Opened => {
                self.connections += 1;
                self.state = ConnectionState::Connecting;
                self.outbox.clear();
                self.last_sent = None;
                self.since_last_send = Duration::ZERO;
                self.reported_star = None;

                let events = self.world.clear();
                info!("Socket opened (connection #{}), awaiting handshake", self.connections);
                Ok(events)
            }

            TransportEvent::Text(text) => {
                if self.state == ConnectionState::Disconnected {
                    debug!("Dropping frame received after close");
                    return Ok(Vec::new());
                }

                let msg = match ServerMessage::from_json(&text) {
                    Ok(msg) => msg,
                    Err(e) => {
                        self.errors.dispose(SyncError::malformed(format!("{e}: {text}")))?;
                        return Ok(Vec::new());
                    }
                };
                self.apply(msg)
            }

            TransportEvent::Closed { reason } => {
                let was = std::mem::replace(&mut self.state, ConnectionState::Disconnected);
                self.outbox.clear();
                if was != ConnectionState::Disconnected {
                    self.errors.dispose(SyncError::ConnectionLost { reason })?;
                }
                Ok(Vec::new())
            }
        }
    }

    /// Apply an already decoded server message.
    pub fn apply(&mut self, msg: ServerMessage) -> Result<Vec<WorldEvent>, SyncError> {
        if let ServerMessage::Welcome { player_id } = &msg {
            info!("Connected as {}", player_id);
            self.state = ConnectionState::Connected;
        }

        match self.world.apply(msg) {
            Ok(events) => Ok(events),
            Err(err) => {
                self.errors.dispose(err)?;
                Ok(Vec::new())
            }
        }
    }

    /// Record the local transform for this frame and queue a movement
    /// message per the send policy. The values are sent exactly as given.
    ///
    /// Returns true if a message was queued.
    pub fn update_local(&mut self, elapsed: Duration, x: f32, y: f32, rotation: f32) -> bool {
        if !self.world.set_local_transform(x, y, rotation) || !self.is_connected() {
            return false;
        }

        self.since_last_send += elapsed;
        let transform = (x, y, rotation);
        let due = match self.send_policy {
            SendPolicy::EveryFrame => true,
            SendPolicy::OnChange => self.last_sent != Some(transform),
            SendPolicy::Interval(interval) => {
                self.last_sent.is_none() || self.since_last_send >= interval
            }
        };

        if due {
            self.outbox.push_back(ClientMessage::PlayerMovement { x, y, rotation });
            self.last_sent = Some(transform);
            self.since_last_send = Duration::ZERO;
        }
        due
    }

    /// Report that the local avatar overlaps the star. Queues
    /// `star_collected` at most once per star placement.
    pub fn report_star_overlap(&mut self) -> bool {
        if !self.is_connected() || self.world.local().is_none() {
            return false;
        }
        let Some(star) = self.world.star() else {
            return false;
        };
        if self.reported_star == Some(star.generation) {
            return false;
        }

        self.reported_star = Some(star.generation);
        self.outbox.push_back(ClientMessage::StarCollected);
        true
    }

    /// Take every queued outbound message.
    pub fn drain_outbox(&mut self) -> impl Iterator<Item = ClientMessage> + '_ {
        self.outbox.drain(..)
    }
}
