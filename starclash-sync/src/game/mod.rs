//! Game State Module
//!
//! Client-side mirror of the shared world.
//!
//! ## Module Structure
//!
//! - `state`: Local player, remote roster, star and score mirror
//! - `events`: Changes emitted while applying server messages

pub mod events;
pub mod state;

// Re-export key types
pub use events::WorldEvent;
pub use state::{Avatar, Star, SyncWorld};
