//! World State
//!
//! Client-side mirror of everything the server announces: the local
//! player, the remote roster, the star and the score tally.
//! Uses BTreeMap for sorted, reproducible roster iteration.

use std::collections::BTreeMap;

use tracing::{debug, warn};

use crate::error::SyncError;
use crate::game::events::WorldEvent;
use crate::network::protocol::{PlayerId, PlayerSnapshot, Scores, ServerMessage, Team};

// =============================================================================
// ENTITIES
// =============================================================================

/// A player as mirrored on this client.
#[derive(Debug, Clone, PartialEq)]
pub struct Avatar {
    /// Server-assigned id.
    pub id: PlayerId,
    /// Team affiliation.
    pub team: Team,
    /// X position.
    pub x: f32,
    /// Y position.
    pub y: f32,
    /// Rotation in radians.
    pub rotation: f32,
}

impl Avatar {
    /// Build an avatar from a roster entry.
    pub fn from_snapshot(id: PlayerId, snapshot: PlayerSnapshot) -> Self {
        Self {
            id,
            team: snapshot.team,
            x: snapshot.x,
            y: snapshot.y,
            rotation: snapshot.rotation,
        }
    }
}

/// The single shared collectible.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Star {
    /// X position.
    pub x: f32,
    /// Y position.
    pub y: f32,
    /// Placement counter, bumped on every announced location.
    pub generation: u64,
}

// =============================================================================
// WORLD
// =============================================================================

/// Mirrored world state.
///
/// Invariants: the local player never appears in `remotes`, at most one
/// star exists, and the score counters are unsigned.
#[derive(Debug, Default)]
pub struct SyncWorld {
    self_id: Option<PlayerId>,
    local: Option<Avatar>,
    remotes: BTreeMap<PlayerId, Avatar>,
    star: Option<Star>,
    scores: Scores,
    star_generation: u64,
}

impl SyncWorld {
    /// Create an empty world.
    pub fn new() -> Self {
        Self::default()
    }

    /// Id this client was assigned, once known.
    pub fn self_id(&self) -> Option<&PlayerId> {
        self.self_id.as_ref()
    }

    /// The local player, if the roster has named it.
    pub fn local(&self) -> Option<&Avatar> {
        self.local.as_ref()
    }

    /// Look up one remote player.
    pub fn remote(&self, id: &PlayerId) -> Option<&Avatar> {
        self.remotes.get(id)
    }

    /// All remote players in id order.
    pub fn remotes(&self) -> impl Iterator<Item = &Avatar> {
        self.remotes.values()
    }

    /// Number of remote players.
    pub fn remote_count(&self) -> usize {
        self.remotes.len()
    }

    /// Current star, if one has been placed.
    pub fn star(&self) -> Option<&Star> {
        self.star.as_ref()
    }

    /// Current score tally.
    pub fn scores(&self) -> Scores {
        self.scores
    }

    fn is_self(&self, id: &PlayerId) -> bool {
        self.self_id.as_ref() == Some(id)
    }

    /// Record the local player's transform as produced by physics.
    /// Returns false when no local player exists yet.
    pub fn set_local_transform(&mut self, x: f32, y: f32, rotation: f32) -> bool {
        match self.local.as_mut() {
            Some(local) => {
                local.x = x;
                local.y = y;
                local.rotation = rotation;
                true
            }
            None => false,
        }
    }

    /// Apply one server message.
    ///
    /// Every message is applied immediately and unconditionally:
    /// last write wins per player id, and the star is replaced wholesale.
    pub fn apply(&mut self, msg: ServerMessage) -> Result<Vec<WorldEvent>, SyncError> {
        let kind = msg.kind();

        match msg {
            ServerMessage::Welcome { player_id } => {
                debug!("Assigned player id {}", player_id);
                let mut events = Vec::new();
                if self.remotes.remove(&player_id).is_some() {
                    debug!("Evicting {} from the remote roster", player_id);
                    events.push(WorldEvent::RemoteDespawned(player_id.clone()));
                }
                self.self_id = Some(player_id);
                Ok(events)
            }

            ServerMessage::CurrentPlayers { players } => Ok(self.apply_roster(players)),

            ServerMessage::NewPlayer(info) => {
                let (id, snapshot) = info.into_parts();
                if self.is_self(&id) {
                    return Err(SyncError::malformed(format!(
                        "{kind} announced the local player {id}"
                    )));
                }
                let avatar = Avatar::from_snapshot(id.clone(), snapshot);
                self.remotes.insert(id, avatar.clone());
                Ok(vec![WorldEvent::RemoteSpawned(avatar)])
            }

            ServerMessage::PlayerDisconnected { player_id } => {
                if self.remotes.remove(&player_id).is_some() {
                    return Ok(vec![WorldEvent::RemoteDespawned(player_id)]);
                }
                if self.is_self(&player_id) {
                    debug!("Server announced our own departure, ignoring");
                    return Ok(Vec::new());
                }
                Err(SyncError::UnknownPlayerReference { player_id, message: kind })
            }

            ServerMessage::PlayerMoved { player_id, x, y, rotation } => {
                if let Some(remote) = self.remotes.get_mut(&player_id) {
                    remote.x = x;
                    remote.y = y;
                    remote.rotation = rotation;
                    return Ok(vec![WorldEvent::RemoteMoved { player_id, x, y, rotation }]);
                }
                if self.is_self(&player_id) {
                    // Local physics owns our own transform.
                    return Ok(Vec::new());
                }
                Err(SyncError::UnknownPlayerReference { player_id, message: kind })
            }

            ServerMessage::ScoreUpdate(scores) => {
                self.scores = scores;
                Ok(vec![WorldEvent::ScoreChanged(scores)])
            }

            ServerMessage::StarLocation { x, y } => {
                self.star_generation += 1;
                let star = Star { x, y, generation: self.star_generation };
                self.star = Some(star);
                Ok(vec![WorldEvent::StarPlaced(star)])
            }
        }
    }

    /// Replace the roster with a snapshot. Remotes missing from the
    /// snapshot are despawned; every entry is (re)spawned.
    fn apply_roster(&mut self, players: BTreeMap<PlayerId, PlayerSnapshot>) -> Vec<WorldEvent> {
        if self.self_id.is_none() {
            warn!("Roster received before handshake, treating every player as remote");
        }

        let mut events = Vec::with_capacity(players.len());

        let stale: Vec<PlayerId> = self
            .remotes
            .keys()
            .filter(|id| !players.contains_key(*id))
            .cloned()
            .collect();
        for id in stale {
            self.remotes.remove(&id);
            events.push(WorldEvent::RemoteDespawned(id));
        }

        for (id, snapshot) in players {
            let avatar = Avatar::from_snapshot(id.clone(), snapshot);
            if self.is_self(&id) {
                if self.remotes.remove(&id).is_some() {
                    events.push(WorldEvent::RemoteDespawned(id.clone()));
                }
                self.local = Some(avatar.clone());
                events.push(WorldEvent::LocalSpawned(avatar));
            } else {
                self.remotes.insert(id, avatar.clone());
                events.push(WorldEvent::RemoteSpawned(avatar));
            }
        }

        events
    }

    /// Drop every mirrored entity and forget the assigned id.
    pub fn clear(&mut self) -> Vec<WorldEvent> {
        let mut events = Vec::new();

        if self.local.take().is_some() {
            events.push(WorldEvent::LocalDespawned);
        }
        for id in std::mem::take(&mut self.remotes).into_keys() {
            events.push(WorldEvent::RemoteDespawned(id));
        }
        if self.star.take().is_some() {
            events.push(WorldEvent::StarCleared);
        }
        if self.scores != Scores::default() {
            self.scores = Scores::default();
            events.push(WorldEvent::ScoreChanged(self.scores));
        }
        self.self_id = None;

        events
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::protocol::PlayerInfo;
    use proptest::prelude::*;
    use std::collections::BTreeSet;

    fn snapshot(x: f32, y: f32, team: Team) -> PlayerSnapshot {
        PlayerSnapshot { x, y, rotation: 0.0, team }
    }

    fn joined(id: &str, x: f32, y: f32) -> ServerMessage {
        ServerMessage::NewPlayer(PlayerInfo {
            player_id: PlayerId::new(id),
            x,
            y,
            rotation: 0.0,
            team: Team::Red,
        })
    }

    fn left(id: &str) -> ServerMessage {
        ServerMessage::PlayerDisconnected { player_id: PlayerId::new(id) }
    }

    fn welcomed(id: &str) -> SyncWorld {
        let mut world = SyncWorld::new();
        world.apply(ServerMessage::Welcome { player_id: PlayerId::new(id) }).unwrap();
        world
    }

    #[test]
    fn test_roster_scenario() {
        let mut world = welcomed("me");

        let mut players = BTreeMap::new();
        players.insert(PlayerId::new("me"), snapshot(100.0, 450.0, Team::Blue));
        players.insert(PlayerId::new("other"), snapshot(300.0, 200.0, Team::Red));
        world.apply(ServerMessage::CurrentPlayers { players }).unwrap();

        assert_eq!(world.local().map(|p| p.id.as_str()), Some("me"));
        assert_eq!(world.remote_count(), 1);
        assert!(world.remote(&PlayerId::new("me")).is_none());

        world.apply(left("other")).unwrap();
        assert_eq!(world.remote_count(), 0);

        world.apply(joined("newcomer", 64.0, 32.0)).unwrap();
        assert_eq!(world.remote_count(), 1);
        let newcomer = world.remote(&PlayerId::new("newcomer")).unwrap();
        assert_eq!((newcomer.x, newcomer.y, newcomer.team), (64.0, 32.0, Team::Red));
    }

    #[test]
    fn test_late_handshake_keeps_self_out_of_remotes() {
        let me = PlayerId::new("me");
        let mut world = SyncWorld::new();

        world.apply(joined("me", 5.0, 5.0)).unwrap();
        assert!(world.remote(&me).is_some());

        let events = world.apply(ServerMessage::Welcome { player_id: me.clone() }).unwrap();
        assert_eq!(events, vec![WorldEvent::RemoteDespawned(me.clone())]);
        assert!(world.remote(&me).is_none());

        let mut players = BTreeMap::new();
        players.insert(me.clone(), snapshot(1.0, 2.0, Team::Blue));
        world.apply(ServerMessage::CurrentPlayers { players }).unwrap();

        assert!(world.remote(&me).is_none());
        assert_eq!(world.local().map(|p| &p.id), Some(&me));
        assert_eq!(world.remote_count(), 0);
    }

    #[test]
    fn test_roster_moves_stray_self_entry_to_local() {
        let me = PlayerId::new("me");
        let mut world = SyncWorld::new();
        world.apply(joined("me", 5.0, 5.0)).unwrap();
        // Bypass the handshake eviction to reach the roster path directly.
        world.self_id = Some(me.clone());

        let mut players = BTreeMap::new();
        players.insert(me.clone(), snapshot(1.0, 2.0, Team::Blue));
        let events = world.apply(ServerMessage::CurrentPlayers { players }).unwrap();

        assert!(events.contains(&WorldEvent::RemoteDespawned(me.clone())));
        assert!(world.remote(&me).is_none());
        assert!(world.local().is_some());
    }

    #[test]
    fn test_roster_self_only_populates_local() {
        let mut world = welcomed("me");
        let mut players = BTreeMap::new();
        players.insert(PlayerId::new("me"), snapshot(1.0, 2.0, Team::Red));

        let events = world.apply(ServerMessage::CurrentPlayers { players }).unwrap();

        assert!(matches!(events.as_slice(), [WorldEvent::LocalSpawned(a)] if a.id.as_str() == "me"));
        assert_eq!(world.remote_count(), 0);
    }

    #[test]
    fn test_roster_replaces_stale_remotes() {
        let mut world = welcomed("me");
        world.apply(joined("gone", 0.0, 0.0)).unwrap();
        world.apply(joined("kept", 0.0, 0.0)).unwrap();

        let mut players = BTreeMap::new();
        players.insert(PlayerId::new("kept"), snapshot(5.0, 5.0, Team::Blue));
        let events = world.apply(ServerMessage::CurrentPlayers { players }).unwrap();

        assert_eq!(events[0], WorldEvent::RemoteDespawned(PlayerId::new("gone")));
        assert_eq!(world.remote_count(), 1);
        assert_eq!(world.remote(&PlayerId::new("kept")).unwrap().x, 5.0);
    }

    #[test]
    fn test_star_placed_twice_keeps_second() {
        let mut world = SyncWorld::new();
        world.apply(ServerMessage::StarLocation { x: 10.0, y: 20.0 }).unwrap();
        let events = world.apply(ServerMessage::StarLocation { x: 30.0, y: 40.0 }).unwrap();

        let star = world.star().unwrap();
        assert_eq!((star.x, star.y), (30.0, 40.0));
        assert_eq!(star.generation, 2);
        assert_eq!(events, vec![WorldEvent::StarPlaced(*star)]);
    }

    #[test]
    fn test_score_update_overwrites() {
        let mut world = SyncWorld::new();
        let scores = Scores { blue: 20, red: 10 };

        world.apply(ServerMessage::ScoreUpdate(scores)).unwrap();
        world.apply(ServerMessage::ScoreUpdate(scores)).unwrap();

        assert_eq!(world.scores(), scores);
    }

    #[test]
    fn test_move_updates_remote_last_write_wins() {
        let mut world = welcomed("me");
        world.apply(joined("p2", 0.0, 0.0)).unwrap();

        for (x, y) in [(1.0, 1.0), (7.0, 3.0)] {
            world
                .apply(ServerMessage::PlayerMoved {
                    player_id: PlayerId::new("p2"),
                    x,
                    y,
                    rotation: 0.5,
                })
                .unwrap();
        }

        let remote = world.remote(&PlayerId::new("p2")).unwrap();
        assert_eq!((remote.x, remote.y, remote.rotation), (7.0, 3.0, 0.5));
    }

    #[test]
    fn test_unknown_player_references() {
        let mut world = welcomed("me");

        let moved = world.apply(ServerMessage::PlayerMoved {
            player_id: PlayerId::new("ghost"),
            x: 0.0,
            y: 0.0,
            rotation: 0.0,
        });
        assert!(matches!(moved, Err(SyncError::UnknownPlayerReference { .. })));

        let gone = world.apply(left("ghost"));
        assert!(matches!(gone, Err(SyncError::UnknownPlayerReference { message: "player_disconnected", .. })));
        assert_eq!(world.remote_count(), 0);
    }

    #[test]
    fn test_self_references_never_reach_remotes() {
        let mut world = welcomed("me");

        assert!(matches!(world.apply(joined("me", 0.0, 0.0)), Err(SyncError::MalformedMessage { .. })));
        assert_eq!(world.apply(left("me")).unwrap(), Vec::new());
        assert_eq!(world.remote_count(), 0);
    }

    #[test]
    fn test_set_local_transform() {
        let mut world = welcomed("me");
        assert!(!world.set_local_transform(1.0, 2.0, 0.0));

        let mut players = BTreeMap::new();
        players.insert(PlayerId::new("me"), snapshot(0.0, 0.0, Team::Blue));
        world.apply(ServerMessage::CurrentPlayers { players }).unwrap();

        assert!(world.set_local_transform(1.0, 2.0, 0.3));
        let local = world.local().unwrap();
        assert_eq!((local.x, local.y, local.rotation), (1.0, 2.0, 0.3));
    }

    #[test]
    fn test_clear_emits_despawns() {
        let mut world = welcomed("me");
        let mut players = BTreeMap::new();
        players.insert(PlayerId::new("me"), snapshot(0.0, 0.0, Team::Blue));
        players.insert(PlayerId::new("p2"), snapshot(0.0, 0.0, Team::Red));
        world.apply(ServerMessage::CurrentPlayers { players }).unwrap();
        world.apply(ServerMessage::StarLocation { x: 1.0, y: 1.0 }).unwrap();
        world.apply(ServerMessage::ScoreUpdate(Scores { blue: 10, red: 0 })).unwrap();

        let events = world.clear();

        assert_eq!(
            events,
            vec![
                WorldEvent::LocalDespawned,
                WorldEvent::RemoteDespawned(PlayerId::new("p2")),
                WorldEvent::StarCleared,
                WorldEvent::ScoreChanged(Scores::default()),
            ]
        );
        assert!(world.self_id().is_none());
        assert!(world.star().is_none());
    }

    #[derive(Debug, Clone)]
    enum RosterOp {
        Join(u8),
        Leave(u8),
    }

    fn roster_op() -> impl Strategy<Value = RosterOp> {
        prop_oneof![
            (0u8..8).prop_map(RosterOp::Join),
            (0u8..8).prop_map(RosterOp::Leave),
        ]
    }

    proptest! {
        #[test]
        fn prop_roster_matches_joins_minus_leaves(ops in proptest::collection::vec(roster_op(), 0..64)) {
            let mut world = welcomed("me");
            let mut expected = BTreeSet::new();

            for op in ops {
                match op {
                    RosterOp::Join(n) => {
                        let id = format!("p{n}");
                        world.apply(joined(&id, f32::from(n), 0.0)).unwrap();
                        expected.insert(id);
                    }
                    RosterOp::Leave(n) => {
                        let id = format!("p{n}");
                        let result = world.apply(left(&id));
                        prop_assert_eq!(result.is_ok(), expected.remove(&id));
                    }
                }
            }

            let actual: BTreeSet<String> = world.remotes().map(|p| p.id.as_str().to_string()).collect();
            prop_assert_eq!(actual, expected);
        }
    }
}
