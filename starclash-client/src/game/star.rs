//! The collectible star.

use bevy::prelude::*;
use starclash_sync::{Star, WorldEvent};

use super::components::{Body, LocalAvatar, StarPickup};
use super::coords::world_transform;
use super::{GameAssets, GameTuning};
use crate::network::{SyncSession, WorldChanged};

const STAR_Z: f32 = 8.0;

fn spawn_star(commands: &mut Commands, assets: &GameAssets, tuning: &GameTuning, star: &Star) -> Entity {
    let position = Vec2::new(star.x, star.y);

    commands
        .spawn((
            StarPickup { generation: star.generation },
            Name::new("Star"),
            Sprite {
                image: assets.star.clone(),
                custom_size: Some(Vec2::splat(tuning.star_size)),
                ..default()
            },
            world_transform(position, 0.0, STAR_Z),
            Body::new(position, Vec2::splat(tuning.star_size), 0.0),
        ))
        .id()
}

/// Destroy and recreate the star on every placement.
pub fn apply_star_changes(
    mut commands: Commands,
    mut changes: EventReader<WorldChanged>,
    mut current: Local<Option<Entity>>,
    assets: Res<GameAssets>,
    tuning: Res<GameTuning>,
) {
    for WorldChanged(change) in changes.read() {
        match change {
            WorldEvent::StarPlaced(star) => {
                if let Some(old) = current.take() {
                    commands.entity(old).despawn_recursive();
                }
                *current = Some(spawn_star(&mut commands, &assets, &tuning, star));
                debug!("Star {} placed at ({:.1}, {:.1})", star.generation, star.x, star.y);
            }
            WorldEvent::StarCleared => {
                if let Some(old) = current.take() {
                    commands.entity(old).despawn_recursive();
                }
            }
            _ => {}
        }
    }
}

/// Whether a spawned star still stands for the mirrored one. A star
/// replaced this frame lingers until its despawn command is applied.
pub fn is_current_star(pickup: &StarPickup, mirrored: Option<&Star>) -> bool {
    mirrored.is_some_and(|star| star.generation == pickup.generation)
}

/// Report the local avatar touching the star. The session deduplicates
/// per placement.
pub fn collect_star(
    mut session: ResMut<SyncSession>,
    avatars: Query<&Body, With<LocalAvatar>>,
    stars: Query<(&StarPickup, &Body)>,
) {
    let Ok(avatar) = avatars.get_single() else {
        return;
    };

    let touching = stars.iter().any(|(pickup, star)| {
        is_current_star(pickup, session.world().star()) && avatar.overlaps(star)
    });
    if touching && session.report_star_overlap() {
        info!("Star collected");
    }
}
