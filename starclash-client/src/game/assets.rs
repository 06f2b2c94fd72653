//! Asset preloading.

use bevy::asset::LoadState;
use bevy::prelude::*;

use super::tilemap::TiledMap;
use crate::AppState;

/// Handles for everything the scene draws.
#[derive(Resource)]
pub struct GameAssets {
    pub player: Handle<Image>,
    pub other_player: Handle<Image>,
    pub star: Handle<Image>,
    pub tiles: Handle<Image>,
    pub map: Handle<TiledMap>,
}

impl GameAssets {
    fn images(&self) -> [(&'static str, &Handle<Image>); 4] {
        [
            ("player", &self.player),
            ("otherPlayer", &self.other_player),
            ("star", &self.star),
            ("tiles", &self.tiles),
        ]
    }
}

pub fn load_assets(mut commands: Commands, asset_server: Res<AssetServer>) {
    commands.insert_resource(GameAssets {
        player: asset_server.load("sprites/player.png"),
        other_player: asset_server.load("sprites/enemy.png"),
        star: asset_server.load("sprites/star.png"),
        tiles: asset_server.load("maps/tilesheet.png"),
        map: asset_server.load("maps/map.json"),
    });
    info!("Loading assets...");
}

/// Enter `Playing` once the map and every image have settled. A missing
/// image only leaves its sprites untextured; a missing map keeps us here.
pub fn check_assets_loaded(
    asset_server: Res<AssetServer>,
    assets: Res<GameAssets>,
    mut next_state: ResMut<NextState<AppState>>,
    mut map_failed: Local<bool>,
) {
    match asset_server.load_state(assets.map.id()) {
        LoadState::Loaded => {}
        LoadState::Failed(err) => {
            if !*map_failed {
                error!("Failed to load tile map: {}", err);
                *map_failed = true;
            }
            return;
        }
        _ => return,
    }

    let mut failed = Vec::new();
    for (name, image) in assets.images() {
        match asset_server.load_state(image.id()) {
            LoadState::Loaded => {}
            LoadState::Failed(_) => failed.push(name),
            _ => return,
        }
    }

    if !failed.is_empty() {
        warn!("Images failed to load: {:?}", failed);
    }
    info!("Assets loaded");
    next_state.set(AppState::Playing);
}
