//! Game module - the StarClash scene
//!
//! Preloads the sprites and the tile map, builds the world from the map,
//! and each frame turns the mirrored server state into entities, steers
//! and simulates the local player, and follows it with the camera.

pub mod assets;
pub mod camera;
pub mod components;
pub mod coords;
pub mod physics;
pub mod player;
pub mod star;
pub mod tilemap;

use bevy::prelude::*;
use bevy_common_assets::json::JsonAssetPlugin;

use crate::{AppState, FrameSet};

pub use assets::GameAssets;
pub use components::*;
pub use tilemap::{TileGrid, TiledMap};

// ============================================================================
// TUNING
// ============================================================================

/// Gameplay constants.
#[derive(Resource, Debug, Clone)]
pub struct GameTuning {
    /// Horizontal speed while an arrow key is held (px/s).
    pub run_speed: f32,
    /// Upward speed applied while jump is held (px/s).
    pub jump_speed: f32,
    /// Downward acceleration (px/s²).
    pub gravity: f32,
    /// Longest physics step; slower frames are simulated in slow motion.
    pub max_step: f32,
    pub avatar_size: f32,
    pub avatar_bounce: f32,
    pub star_size: f32,
    pub camera_lerp: f32,
    /// Used until the window reports its size.
    pub viewport: Vec2,
    pub blue_label_offset: Vec2,
    pub red_label_offset: Vec2,
    pub label_font_size: f32,
}

impl Default for GameTuning {
    fn default() -> Self {
        Self {
            run_speed: 150.0,
            jump_speed: 300.0,
            gravity: 500.0,
            max_step: 1.0 / 30.0,
            avatar_size: 50.0,
            avatar_bounce: 0.1,
            star_size: 24.0,
            camera_lerp: 0.1,
            viewport: Vec2::new(800.0, 600.0),
            blue_label_offset: Vec2::new(16.0, 16.0),
            red_label_offset: Vec2::new(584.0, 16.0),
            label_font_size: 32.0,
        }
    }
}

// ============================================================================
// PLUGIN
// ============================================================================

pub struct GamePlugin;

impl Plugin for GamePlugin {
    fn build(&self, app: &mut App) {
        app
            .add_plugins(JsonAssetPlugin::<TiledMap>::new(&["json"]))
            .init_resource::<GameTuning>()
            .init_resource::<AvatarEntities>()
            .add_systems(OnEnter(AppState::Loading), assets::load_assets)
            .add_systems(
                Update,
                assets::check_assets_loaded.run_if(in_state(AppState::Loading)),
            )
            .add_systems(OnEnter(AppState::Playing), setup_world)
            .add_systems(
                Update,
                (player::apply_avatar_changes, star::apply_star_changes).in_set(FrameSet::Apply),
            )
            .add_systems(
                Update,
                (
                    player::steer_local_avatar,
                    physics_system,
                    star::collect_star,
                    player::report_local_transform,
                )
                    .chain()
                    .in_set(FrameSet::Simulate),
            )
            .add_systems(
                Update,
                (player::sync_body_transforms, camera::follow_local_avatar)
                    .chain()
                    .in_set(FrameSet::Present),
            );
    }
}

// ============================================================================
// WORLD SETUP
// ============================================================================

/// Build the tile world and point the camera at its top-left corner.
fn setup_world(
    mut commands: Commands,
    assets: Res<GameAssets>,
    maps: Res<Assets<TiledMap>>,
    mut layouts: ResMut<Assets<TextureAtlasLayout>>,
    tuning: Res<GameTuning>,
    windows: Query<&Window>,
    mut cameras: Query<&mut Transform, With<Camera2d>>,
) {
    let Some(map) = maps.get(&assets.map) else {
        error!("Tile map missing after load, world not built");
        return;
    };

    for layer in ["sky", tilemap::TERRAIN_LAYER] {
        if map.layer(layer).is_none() {
            warn!("Tile map has no '{}' layer", layer);
        }
    }

    let grid = TileGrid::from_layer(map, map.layer(tilemap::TERRAIN_LAYER));
    let sprites = tilemap::spawn_tile_layers(&mut commands, map, &assets.tiles, &mut layouts);

    info!(
        "World built: {}x{} tiles ({:?} px), {} solid, {} sprites",
        map.width,
        map.height,
        map.pixel_size(),
        grid.solid_count(),
        sprites
    );

    let viewport = camera::viewport(&windows, &tuning);
    if let Ok(mut transform) = cameras.get_single_mut() {
        let center = camera::clamp_center(viewport / 2.0, viewport, grid.size());
        transform.translation = coords::world_to_scene(center, transform.translation.z);
    }

    commands.insert_resource(grid);
}

/// Step every body against the terrain.
fn physics_system(
    time: Res<Time>,
    tuning: Res<GameTuning>,
    grid: Option<Res<TileGrid>>,
    mut bodies: Query<&mut Body>,
) {
    let Some(grid) = grid else {
        return;
    };
    let dt = time.delta_secs().min(tuning.max_step);
    if dt <= 0.0 {
        return;
    }

    for mut body in &mut bodies {
        physics::step(&mut body, &grid, tuning.gravity, dt);
    }
}
