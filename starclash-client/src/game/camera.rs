//! Camera follow, clamped to the world.

use bevy::prelude::*;

use super::components::{Body, LocalAvatar};
use super::coords::{scene_to_world, world_to_scene};
use super::tilemap::TileGrid;
use super::GameTuning;

/// Current viewport size in pixels.
pub fn viewport(windows: &Query<&Window>, tuning: &GameTuning) -> Vec2 {
    windows
        .iter()
        .next()
        .map(|window| Vec2::new(window.width(), window.height()))
        .filter(|size| size.x > 0.0 && size.y > 0.0)
        .unwrap_or(tuning.viewport)
}

/// Keep the view inside the world. A world smaller than the viewport is
/// pinned to its top-left corner.
pub fn clamp_center(center: Vec2, viewport: Vec2, bounds: Vec2) -> Vec2 {
    let half = viewport / 2.0;
    let axis = |value: f32, half: f32, bound: f32| {
        if bound <= half * 2.0 {
            half
        } else {
            value.clamp(half, bound - half)
        }
    };
    Vec2::new(axis(center.x, half.x, bounds.x), axis(center.y, half.y, bounds.y))
}

/// Move `lerp` of the way from `current` to `target`, then clamp.
pub fn follow(current: Vec2, target: Vec2, lerp: f32, viewport: Vec2, bounds: Vec2) -> Vec2 {
    clamp_center(current + (target - current) * lerp, viewport, bounds)
}

/// Top-left corner of the view in world pixels.
pub fn scroll(center: Vec2, viewport: Vec2) -> Vec2 {
    center - viewport / 2.0
}

pub fn follow_local_avatar(
    tuning: Res<GameTuning>,
    grid: Option<Res<TileGrid>>,
    windows: Query<&Window>,
    avatars: Query<&Body, With<LocalAvatar>>,
    mut cameras: Query<&mut Transform, With<Camera2d>>,
) {
    let (Some(grid), Ok(body)) = (grid, avatars.get_single()) else {
        return;
    };
    let Ok(mut transform) = cameras.get_single_mut() else {
        return;
    };

    let current = scene_to_world(transform.translation);
    let center = follow(
        current,
        body.position,
        tuning.camera_lerp,
        viewport(&windows, &tuning),
        grid.size(),
    );
    transform.translation = world_to_scene(center, transform.translation.z);
}
