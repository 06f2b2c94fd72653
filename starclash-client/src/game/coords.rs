//! World/scene coordinate conversion.
//!
//! Game state and the wire use world pixels with a top-left origin and y
//! pointing down. Bevy's 2D scene has y pointing up, so positions are
//! flipped only when written into a `Transform`.

use bevy::prelude::*;

/// World pixel position to scene translation at depth `z`.
pub fn world_to_scene(world: Vec2, z: f32) -> Vec3 {
    Vec3::new(world.x, -world.y, z)
}

/// Scene translation back to a world pixel position.
pub fn scene_to_world(scene: Vec3) -> Vec2 {
    Vec2::new(scene.x, -scene.y)
}

/// World rotation (radians, clockwise on screen) to a scene rotation.
pub fn world_rotation(rotation: f32) -> Quat {
    Quat::from_rotation_z(-rotation)
}

/// Transform for an entity at a world position.
pub fn world_transform(world: Vec2, rotation: f32, z: f32) -> Transform {
    Transform::from_translation(world_to_scene(world, z)).with_rotation(world_rotation(rotation))
}
