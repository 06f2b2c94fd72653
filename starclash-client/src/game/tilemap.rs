//! Tile map loading and collision grid
//!
//! Reads the subset of the Tiled JSON format the game uses (orthogonal
//! tile layers stored as CSV arrays) and derives the solid-tile grid the
//! physics step collides against.

use bevy::prelude::*;
use bevy::reflect::TypePath;
use serde::Deserialize;

use super::coords::world_to_scene;

/// Tiled stores flip flags in the top bits of every gid.
const GID_MASK: u32 = 0x0FFF_FFFF;

/// Gid of an empty cell.
pub const EMPTY_TILE: u32 = 0;

/// Name of the layer that blocks movement.
pub const TERRAIN_LAYER: &str = "terrain";

/// Tile map document, loaded through the JSON asset plugin.
#[derive(Asset, TypePath, Deserialize, Debug, Clone)]
pub struct TiledMap {
    /// Columns.
    pub width: u32,
    /// Rows.
    pub height: u32,
    pub tilewidth: u32,
    pub tileheight: u32,
    #[serde(default)]
    pub layers: Vec<TiledLayer>,
    #[serde(default)]
    pub tilesets: Vec<TiledTileset>,
}

#[derive(Deserialize, Debug, Clone)]
pub struct TiledLayer {
    pub name: String,
    #[serde(rename = "type", default = "default_layer_type")]
    pub kind: String,
    #[serde(default)]
    pub width: u32,
    #[serde(default)]
    pub data: Vec<u32>,
    #[serde(default = "default_visible")]
    pub visible: bool,
}

#[derive(Deserialize, Debug, Clone)]
pub struct TiledTileset {
    pub firstgid: u32,
    pub columns: u32,
    #[serde(default)]
    pub tilecount: u32,
    #[serde(default)]
    pub margin: u32,
    #[serde(default)]
    pub spacing: u32,
}

fn default_layer_type() -> String {
    "tilelayer".to_string()
}

fn default_visible() -> bool {
    true
}

impl TiledMap {
    /// Tile layers in draw order.
    pub fn tile_layers(&self) -> impl Iterator<Item = &TiledLayer> {
        self.layers.iter().filter(|layer| layer.kind == "tilelayer")
    }

    /// Look up a layer by name.
    pub fn layer(&self, name: &str) -> Option<&TiledLayer> {
        self.tile_layers().find(|layer| layer.name == name)
    }

    /// Size of one tile in pixels.
    pub fn tile_size(&self) -> Vec2 {
        Vec2::new(self.tilewidth as f32, self.tileheight as f32)
    }

    /// World size in pixels.
    pub fn pixel_size(&self) -> Vec2 {
        Vec2::new(
            (self.width * self.tilewidth) as f32,
            (self.height * self.tileheight) as f32,
        )
    }
}

/// Solid-tile grid in world space, top-left origin.
#[derive(Resource, Debug, Clone)]
pub struct TileGrid {
    columns: u32,
    rows: u32,
    tile_size: Vec2,
    solid: Vec<bool>,
}

impl TileGrid {
    /// Every non-empty cell of `layer` is solid. Missing data is empty.
    pub fn from_layer(map: &TiledMap, layer: Option<&TiledLayer>) -> Self {
        let cells = (map.width * map.height) as usize;
        let mut solid = vec![false; cells];

        if let Some(layer) = layer {
            for (cell, gid) in solid.iter_mut().zip(&layer.data) {
                *cell = gid & GID_MASK != EMPTY_TILE;
            }
        }

        Self {
            columns: map.width,
            rows: map.height,
            tile_size: map.tile_size(),
            solid,
        }
    }

    /// Size of one tile in pixels.
    pub fn tile_size(&self) -> Vec2 {
        self.tile_size
    }

    /// World bounds in pixels.
    pub fn size(&self) -> Vec2 {
        Vec2::new(
            self.columns as f32 * self.tile_size.x,
            self.rows as f32 * self.tile_size.y,
        )
    }

    /// Whether the tile at (column, row) blocks movement. Cells outside
    /// the grid are open.
    pub fn is_solid(&self, column: i32, row: i32) -> bool {
        if column < 0 || row < 0 || column >= self.columns as i32 || row >= self.rows as i32 {
            return false;
        }
        self.solid[(row as u32 * self.columns + column as u32) as usize]
    }

    /// Number of solid tiles.
    pub fn solid_count(&self) -> usize {
        self.solid.iter().filter(|solid| **solid).count()
    }
}

/// Spawn one sprite per non-empty cell of every visible tile layer.
pub fn spawn_tile_layers(
    commands: &mut Commands,
    map: &TiledMap,
    tiles: &Handle<Image>,
    layouts: &mut Assets<TextureAtlasLayout>,
) -> usize {
    let Some(tileset) = map.tilesets.first() else {
        warn!("Tile map has no tileset, skipping tile sprites");
        return 0;
    };

    let columns = tileset.columns.max(1);
    let rows = if tileset.tilecount > 0 {
        tileset.tilecount.div_ceil(columns)
    } else {
        columns
    };
    let layout = layouts.add(TextureAtlasLayout::from_grid(
        UVec2::new(map.tilewidth, map.tileheight),
        columns,
        rows,
        Some(UVec2::splat(tileset.spacing)),
        Some(UVec2::splat(tileset.margin)),
    ));

    let tile_size = map.tile_size();
    let mut spawned = 0;

    for (depth, layer) in map.tile_layers().filter(|layer| layer.visible).enumerate() {
        let layer_columns = if layer.width > 0 { layer.width } else { map.width };

        for (cell, raw_gid) in layer.data.iter().enumerate() {
            let gid = raw_gid & GID_MASK;
            if gid < tileset.firstgid {
                continue;
            }

            let column = cell as u32 % layer_columns;
            let row = cell as u32 / layer_columns;
            let center = Vec2::new(
                (column as f32 + 0.5) * tile_size.x,
                (row as f32 + 0.5) * tile_size.y,
            );

            commands.spawn((
                Sprite::from_atlas_image(
                    tiles.clone(),
                    TextureAtlas {
                        layout: layout.clone(),
                        index: (gid - tileset.firstgid) as usize,
                    },
                ),
                Transform::from_translation(world_to_scene(center, depth as f32)),
            ));
            spawned += 1;
        }
    }

    spawned
}

#[cfg(test)]
mod tests {
    use super::*;

    const MAP: &str = r#"{
        "width": 4, "height": 3, "tilewidth": 32, "tileheight": 32,
        "layers": [
            {"name": "sky", "type": "tilelayer", "width": 4, "height": 3,
             "data": [1,1,1,1, 1,1,1,1, 1,1,1,1]},
            {"name": "terrain", "type": "tilelayer", "width": 4, "height": 3,
             "data": [0,0,0,0, 0,0,0,5, 3,3,3,2147483651]},
            {"name": "spawns", "type": "objectgroup"}
        ],
        "tilesets": [{"firstgid": 1, "name": "tilesheet", "columns": 8, "tilecount": 64}]
    }"#;

    fn map() -> TiledMap {
        serde_json::from_str(MAP).unwrap()
    }

    #[test]
    fn test_parse_map() {
        let map = map();
        assert_eq!(map.tile_layers().count(), 2);
        assert!(map.layer("spawns").is_none());
        assert_eq!(map.pixel_size(), Vec2::new(128.0, 96.0));
    }

    #[test]
    fn test_terrain_collision_excludes_empty_tiles() {
        let map = map();
        let grid = TileGrid::from_layer(&map, map.layer(TERRAIN_LAYER));

        assert_eq!(grid.solid_count(), 5);
        assert!(!grid.is_solid(0, 0));
        assert!(grid.is_solid(3, 1));
        assert!(grid.is_solid(0, 2));
        // Flip flags still count as a tile.
        assert!(grid.is_solid(3, 2));
    }

    #[test]
    fn test_out_of_grid_is_open() {
        let map = map();
        let grid = TileGrid::from_layer(&map, map.layer(TERRAIN_LAYER));

        assert!(!grid.is_solid(-1, 2));
        assert!(!grid.is_solid(4, 2));
        assert!(!grid.is_solid(0, 3));
        assert_eq!(grid.size(), Vec2::new(128.0, 96.0));
    }

    #[test]
    fn test_bundled_map() {
        let map: TiledMap =
            serde_json::from_str(include_str!("../../assets/maps/map.json")).unwrap();
        assert!(map.layer("sky").is_some());

        let grid = TileGrid::from_layer(&map, map.layer(TERRAIN_LAYER));
        assert!(grid.solid_count() > 0);
        assert_eq!(grid.size(), Vec2::new(1600.0, 640.0));
    }

    #[test]
    fn test_missing_layer_is_all_open() {
        let map = map();
        let grid = TileGrid::from_layer(&map, None);
        assert_eq!(grid.solid_count(), 0);
    }
}
