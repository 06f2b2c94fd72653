//! Player avatars: spawning from server state, keyboard steering, and
//! reporting the local transform back.

use bevy::prelude::*;
use starclash_sync::{Avatar, Team, WorldEvent};

use super::components::{AvatarEntities, Body, LocalAvatar, RemoteAvatar};
use super::coords::{world_to_scene, world_rotation, world_transform};
use super::{GameAssets, GameTuning};
use crate::network::{SyncSession, WorldChanged};

const LOCAL_AVATAR_Z: f32 = 10.0;
const REMOTE_AVATAR_Z: f32 = 9.0;

/// Sprite tint for a team.
pub fn team_color(team: Team) -> Color {
    match team {
        Team::Blue => Color::srgb(0.0, 0.0, 1.0),
        Team::Red => Color::srgb(1.0, 0.0, 0.0),
    }
}

// ============================================================================
// SPAWNING
// ============================================================================

fn avatar_sprite(image: &Handle<Image>, team: Team, tuning: &GameTuning) -> Sprite {
    Sprite {
        image: image.clone(),
        custom_size: Some(Vec2::splat(tuning.avatar_size)),
        color: team_color(team),
        ..default()
    }
}

pub fn spawn_local_avatar(
    commands: &mut Commands,
    assets: &GameAssets,
    tuning: &GameTuning,
    avatar: &Avatar,
) -> Entity {
    let position = Vec2::new(avatar.x, avatar.y);
    let mut body = Body::new(position, Vec2::splat(tuning.avatar_size), tuning.avatar_bounce);
    body.rotation = avatar.rotation;

    let entity = commands
        .spawn((
            LocalAvatar,
            Name::new(format!("Player {}", avatar.id)),
            avatar_sprite(&assets.player, avatar.team, tuning),
            world_transform(position, avatar.rotation, LOCAL_AVATAR_Z),
            body,
        ))
        .id();

    info!("Local player {} ({:?}) spawned at {:?}", avatar.id, avatar.team, position);
    entity
}

pub fn spawn_remote_avatar(
    commands: &mut Commands,
    assets: &GameAssets,
    tuning: &GameTuning,
    avatar: &Avatar,
) -> Entity {
    let position = Vec2::new(avatar.x, avatar.y);

    commands
        .spawn((
            RemoteAvatar,
            Name::new(format!("Remote {}", avatar.id)),
            avatar_sprite(&assets.other_player, avatar.team, tuning),
            world_transform(position, avatar.rotation, REMOTE_AVATAR_Z),
        ))
        .id()
}

/// Mirror roster changes into entities.
pub fn apply_avatar_changes(
    mut commands: Commands,
    mut changes: EventReader<WorldChanged>,
    mut entities: ResMut<AvatarEntities>,
    assets: Res<GameAssets>,
    tuning: Res<GameTuning>,
) {
    for WorldChanged(change) in changes.read() {
        match change {
            WorldEvent::LocalSpawned(avatar) => {
                if let Some(old) = entities.local.take() {
                    commands.entity(old).despawn_recursive();
                }
                entities.local = Some(spawn_local_avatar(&mut commands, &assets, &tuning, avatar));
            }
            WorldEvent::LocalDespawned => {
                if let Some(old) = entities.local.take() {
                    commands.entity(old).despawn_recursive();
                    info!("Local player despawned");
                }
            }
            WorldEvent::RemoteSpawned(avatar) => {
                if let Some(old) = entities.remotes.remove(&avatar.id) {
                    commands.entity(old).despawn_recursive();
                }
                let entity = spawn_remote_avatar(&mut commands, &assets, &tuning, avatar);
                entities.remotes.insert(avatar.id.clone(), entity);
            }
            WorldEvent::RemoteMoved { player_id, x, y, rotation } => {
                if let Some(&entity) = entities.remotes.get(player_id) {
                    commands
                        .entity(entity)
                        .insert(world_transform(Vec2::new(*x, *y), *rotation, REMOTE_AVATAR_Z));
                }
            }
            WorldEvent::RemoteDespawned(id) => {
                if let Some(entity) = entities.remotes.remove(id) {
                    commands.entity(entity).despawn_recursive();
                }
            }
            WorldEvent::ScoreChanged(_) | WorldEvent::StarPlaced(_) | WorldEvent::StarCleared => {}
        }
    }
}

// ============================================================================
// STEERING
// ============================================================================

/// Keys held this frame.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Controls {
    pub left: bool,
    pub right: bool,
    pub jump: bool,
}

impl Controls {
    pub fn from_keyboard(keyboard: &ButtonInput<KeyCode>) -> Self {
        Self {
            left: keyboard.pressed(KeyCode::ArrowLeft),
            right: keyboard.pressed(KeyCode::ArrowRight),
            jump: keyboard.pressed(KeyCode::Space),
        }
    }
}

/// Horizontal speed is reset every frame (left wins over right); jump
/// overrides the vertical speed while held.
pub fn steer(velocity: Vec2, controls: Controls, tuning: &GameTuning) -> Vec2 {
    let x = if controls.left {
        -tuning.run_speed
    } else if controls.right {
        tuning.run_speed
    } else {
        0.0
    };
    let y = if controls.jump { -tuning.jump_speed } else { velocity.y };
    Vec2::new(x, y)
}

pub fn steer_local_avatar(
    keyboard: Res<ButtonInput<KeyCode>>,
    tuning: Res<GameTuning>,
    mut avatars: Query<&mut Body, With<LocalAvatar>>,
) {
    let Ok(mut body) = avatars.get_single_mut() else {
        return;
    };
    body.velocity = steer(body.velocity, Controls::from_keyboard(&keyboard), &tuning);
}

// ============================================================================
// SYNC
// ============================================================================

/// Hand the local transform to the session, exactly as simulated.
pub fn report_local_transform(
    time: Res<Time>,
    mut session: ResMut<SyncSession>,
    avatars: Query<&Body, With<LocalAvatar>>,
) {
    let Ok(body) = avatars.get_single() else {
        return;
    };
    session.update_local(time.delta(), body.position.x, body.position.y, body.rotation);
}

/// Copy simulated bodies into their transforms.
pub fn sync_body_transforms(mut bodies: Query<(&Body, &mut Transform), Changed<Body>>) {
    for (body, mut transform) in &mut bodies {
        transform.translation = world_to_scene(body.position, transform.translation.z);
        transform.rotation = world_rotation(body.rotation);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn held(left: bool, right: bool, jump: bool) -> Controls {
        Controls { left, right, jump }
    }

    #[test]
    fn test_no_keys_stops_horizontal_motion() {
        let tuning = GameTuning::default();
        let velocity = steer(Vec2::new(150.0, 42.0), Controls::default(), &tuning);
        assert_eq!(velocity, Vec2::new(0.0, 42.0));
    }

    #[test]
    fn test_left_wins_over_right() {
        let tuning = GameTuning::default();
        assert_eq!(steer(Vec2::ZERO, held(true, true, false), &tuning).x, -150.0);
        assert_eq!(steer(Vec2::ZERO, held(false, true, false), &tuning).x, 150.0);
    }

    #[test]
    fn test_jump_sets_upward_speed() {
        let tuning = GameTuning::default();
        let velocity = steer(Vec2::new(0.0, 120.0), held(false, true, true), &tuning);
        assert_eq!(velocity, Vec2::new(150.0, -300.0));
    }

    #[test]
    fn test_team_tints() {
        assert_eq!(team_color(Team::Blue), Color::srgb(0.0, 0.0, 1.0));
        assert_eq!(team_color(Team::Red), Color::srgb(1.0, 0.0, 0.0));
    }
}
