//! Network Layer
//!
//! WebSocket transport, wire protocol and the per-connection session that
//! feeds decoded server messages into the world mirror.

pub mod protocol;
pub mod session;
pub mod transport;

pub use protocol::{ClientMessage, PlayerId, PlayerInfo, PlayerSnapshot, Scores, ServerMessage, Team};
pub use session::{ConnectionState, Session};
pub use transport::{connection, ConnectionDriver, ConnectionHandle, TransportEvent};
