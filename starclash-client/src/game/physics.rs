//! Arcade physics step
//!
//! Gravity, axis-separated collision against solid tiles, and a clamp to
//! the world bounds. Impacts reverse the velocity on that axis scaled by
//! the body's bounce.

use bevy::prelude::*;

use super::components::Body;
use super::tilemap::TileGrid;

/// Keeps a body resting exactly on a tile edge out of that tile's row.
const EDGE_EPSILON: f32 = 0.01;

/// Advance one body by `dt` seconds.
pub fn step(body: &mut Body, grid: &TileGrid, gravity: f32, dt: f32) {
    body.velocity.y += gravity * dt;

    body.position.x += body.velocity.x * dt;
    resolve_x(body, grid);

    body.position.y += body.velocity.y * dt;
    resolve_y(body, grid);

    clamp_to_bounds(body, grid.size());
}

/// Inclusive range of tile indices covered by `[min, max)` on one axis.
fn cells(min: f32, max: f32, tile: f32) -> (i32, i32) {
    let first = ((min + EDGE_EPSILON) / tile).floor() as i32;
    let last = ((max - EDGE_EPSILON) / tile).ceil() as i32 - 1;
    (first, last)
}

fn resolve_x(body: &mut Body, grid: &TileGrid) {
    if body.velocity.x == 0.0 {
        return;
    }
    let tile = grid.tile_size();
    let (min, max) = (body.min(), body.max());
    let (first_col, last_col) = cells(min.x, max.x, tile.x);
    let (first_row, last_row) = cells(min.y, max.y, tile.y);

    let solid_in = |col: i32| (first_row..=last_row).any(|row| grid.is_solid(col, row));

    if body.velocity.x > 0.0 {
        if let Some(col) = (first_col..=last_col).find(|col| solid_in(*col)) {
            body.position.x = col as f32 * tile.x - body.half_size.x;
            body.velocity.x = -body.velocity.x * body.bounce;
        }
    } else if let Some(col) = (first_col..=last_col).rev().find(|col| solid_in(*col)) {
        body.position.x = (col + 1) as f32 * tile.x + body.half_size.x;
        body.velocity.x = -body.velocity.x * body.bounce;
    }
}

fn resolve_y(body: &mut Body, grid: &TileGrid) {
    if body.velocity.y == 0.0 {
        return;
    }
    let tile = grid.tile_size();
    let (min, max) = (body.min(), body.max());
    let (first_col, last_col) = cells(min.x, max.x, tile.x);
    let (first_row, last_row) = cells(min.y, max.y, tile.y);

    let solid_in = |row: i32| (first_col..=last_col).any(|col| grid.is_solid(col, row));

    if body.velocity.y > 0.0 {
        if let Some(row) = (first_row..=last_row).find(|row| solid_in(*row)) {
            body.position.y = row as f32 * tile.y - body.half_size.y;
            body.velocity.y = -body.velocity.y * body.bounce;
        }
    } else if let Some(row) = (first_row..=last_row).rev().find(|row| solid_in(*row)) {
        body.position.y = (row + 1) as f32 * tile.y + body.half_size.y;
        body.velocity.y = -body.velocity.y * body.bounce;
    }
}

fn clamp_to_bounds(body: &mut Body, bounds: Vec2) {
    let (min, max) = (body.min(), body.max());

    if min.x < 0.0 {
        body.position.x = body.half_size.x;
        body.velocity.x = body.velocity.x.abs() * body.bounce;
    } else if max.x > bounds.x {
        body.position.x = bounds.x - body.half_size.x;
        body.velocity.x = -body.velocity.x.abs() * body.bounce;
    }

    if min.y < 0.0 {
        body.position.y = body.half_size.y;
        body.velocity.y = body.velocity.y.abs() * body.bounce;
    } else if max.y > bounds.y {
        body.position.y = bounds.y - body.half_size.y;
        body.velocity.y = -body.velocity.y.abs() * body.bounce;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::tilemap::{TiledMap, TERRAIN_LAYER};

    /// 8x6 tiles of 32px: a floor on the last row and a wall at column 6.
    fn grid() -> TileGrid {
        let mut terrain = vec![0u32; 8 * 6];
        for col in 0..8 {
            terrain[5 * 8 + col] = 1;
        }
        for row in 0..5 {
            terrain[row * 8 + 6] = 1;
        }
        let json = serde_json::json!({
            "width": 8, "height": 6, "tilewidth": 32, "tileheight": 32,
            "layers": [{"name": "terrain", "type": "tilelayer", "data": terrain}],
            "tilesets": [{"firstgid": 1, "columns": 4}]
        });
        let map: TiledMap = serde_json::from_value(json).unwrap();
        TileGrid::from_layer(&map, map.layer(TERRAIN_LAYER))
    }

    fn run(body: &mut Body, grid: &TileGrid, frames: usize) {
        for _ in 0..frames {
            step(body, grid, 500.0, 1.0 / 60.0);
        }
    }

    #[test]
    fn test_gravity_accelerates_downward() {
        let grid = grid();
        let mut body = Body::new(Vec2::new(64.0, 40.0), Vec2::splat(20.0), 0.0);

        step(&mut body, &grid, 500.0, 0.1);

        assert!((body.velocity.y - 50.0).abs() < 1e-4);
        assert!((body.position.y - 45.0).abs() < 1e-4);
        assert_eq!(body.position.x, 64.0);
    }

    #[test]
    fn test_falling_body_lands_on_floor() {
        let grid = grid();
        let mut body = Body::new(Vec2::new(64.0, 40.0), Vec2::splat(50.0), 0.1);

        run(&mut body, &grid, 180);

        // Floor top is 5 * 32 = 160.
        assert!((body.max().y - 160.0).abs() < 10.0);
        assert!(body.max().y <= 160.0 + 1e-3);
        assert!(body.velocity.y.abs() < 20.0);
    }

    #[test]
    fn test_impact_reverses_scaled_by_bounce() {
        let grid = grid();
        let mut body = Body::new(Vec2::new(64.0, 130.0), Vec2::splat(50.0), 0.1);
        body.velocity.y = 600.0;

        step(&mut body, &grid, 0.0, 1.0 / 60.0);

        assert_eq!(body.max().y, 160.0);
        assert!((body.velocity.y + 60.0).abs() < 1e-3);
    }

    #[test]
    fn test_wall_stops_horizontal_motion() {
        let grid = grid();
        // Resting on the floor, walking right into the wall at x = 192.
        let mut body = Body::new(Vec2::new(150.0, 135.0), Vec2::splat(50.0), 0.0);

        for _ in 0..120 {
            body.velocity.x = 150.0;
            step(&mut body, &grid, 500.0, 1.0 / 60.0);
        }

        assert_eq!(body.max().x, 192.0);
        assert!(body.max().y <= 160.0 + 1e-3);
    }

    #[test]
    fn test_walking_on_floor_is_not_blocked() {
        let grid = grid();
        let mut body = Body::new(Vec2::new(40.0, 135.0), Vec2::splat(50.0), 0.1);

        for _ in 0..10 {
            body.velocity.x = 150.0;
            step(&mut body, &grid, 500.0, 1.0 / 60.0);
        }

        assert!(body.position.x > 60.0);
    }

    #[test]
    fn test_world_bounds_clamp() {
        let grid = grid();
        let mut body = Body::new(Vec2::new(30.0, 40.0), Vec2::splat(50.0), 0.1);
        body.velocity = Vec2::new(-600.0, -600.0);

        step(&mut body, &grid, 0.0, 0.1);

        assert_eq!(body.min(), Vec2::ZERO);
        assert!((body.velocity.x - 60.0).abs() < 1e-4);
        assert!((body.velocity.y - 60.0).abs() < 1e-4);
    }
}
