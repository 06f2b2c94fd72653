//! Error handling
//!
//! Error kinds raised while mirroring server state, and the policy that
//! decides what happens to each of them.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::network::protocol::PlayerId;

/// Errors raised by the sync layer.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SyncError {
    /// An inbound frame could not be decoded or carried impossible data.
    #[error("Malformed message: {reason}")]
    MalformedMessage {
        /// What was wrong with it.
        reason: String,
    },

    /// A move or leave message named a player that is not in the roster.
    #[error("Unknown player {player_id} referenced by {message}")]
    UnknownPlayerReference {
        /// The id that was not found.
        player_id: PlayerId,
        /// Message kind that referenced it.
        message: &'static str,
    },

    /// The connection to the server closed or could not be opened.
    #[error("Connection lost: {reason}")]
    ConnectionLost {
        /// Transport-level reason.
        reason: String,
    },

    /// The outbound channel to the network task is gone.
    #[error("Outgoing channel closed")]
    ChannelClosed,
}

impl SyncError {
    /// Classify the error for policy lookup.
    pub fn kind(&self) -> ErrorKind {
        match self {
            SyncError::MalformedMessage { .. } => ErrorKind::MalformedMessage,
            SyncError::UnknownPlayerReference { .. } => ErrorKind::UnknownPlayerReference,
            SyncError::ConnectionLost { .. } | SyncError::ChannelClosed => ErrorKind::ConnectionLost,
        }
    }

    pub(crate) fn malformed(reason: impl Into<String>) -> Self {
        SyncError::MalformedMessage { reason: reason.into() }
    }
}

/// Policy-relevant classification of a [`SyncError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Undecodable or inconsistent frame.
    MalformedMessage,
    /// Reference to a player the roster does not hold.
    UnknownPlayerReference,
    /// Transport went away.
    ConnectionLost,
}

/// What to do with an error of a given kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorAction {
    /// Drop it, leaving a trace-level record.
    Ignore,
    /// Drop it with a warning.
    Log,
    /// Hand it back to the caller.
    Fatal,
}

/// Per-kind error dispositions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorPolicy {
    /// Action for malformed frames.
    pub malformed_message: ErrorAction,
    /// Action for unknown player references.
    pub unknown_player: ErrorAction,
    /// Action for a lost connection.
    pub connection_lost: ErrorAction,
}

impl Default for ErrorPolicy {
    fn default() -> Self {
        Self {
            malformed_message: ErrorAction::Log,
            unknown_player: ErrorAction::Ignore,
            connection_lost: ErrorAction::Log,
        }
    }
}

impl ErrorPolicy {
    /// Policy that hands every error back to the caller.
    pub fn strict() -> Self {
        Self {
            malformed_message: ErrorAction::Fatal,
            unknown_player: ErrorAction::Fatal,
            connection_lost: ErrorAction::Fatal,
        }
    }

    /// Action configured for `kind`.
    pub fn action(&self, kind: ErrorKind) -> ErrorAction {
        match kind {
            ErrorKind::MalformedMessage => self.malformed_message,
            ErrorKind::UnknownPlayerReference => self.unknown_player,
            ErrorKind::ConnectionLost => self.connection_lost,
        }
    }

    /// Apply the policy: non-fatal errors are logged and swallowed.
    pub fn dispose(&self, err: SyncError) -> Result<(), SyncError> {
        match self.action(err.kind()) {
            ErrorAction::Ignore => {
                tracing::trace!("Ignoring sync error: {}", err);
                Ok(())
            }
            ErrorAction::Log => {
                tracing::warn!("Sync error: {}", err);
                Ok(())
            }
            ErrorAction::Fatal => Err(err),
        }
    }
}
