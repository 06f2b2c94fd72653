//! Scene components for avatars, the star and the world.
//!
//! Positions in [`Body`] are world pixels (top-left origin, y down), the
//! same frame the server speaks. `Transform` is derived from them.

use std::collections::HashMap;

use bevy::prelude::*;
use starclash_sync::{PlayerId, Team};

// ============================================================================
// AVATARS
// ============================================================================

/// The player driven by this client's keyboard.
#[derive(Component)]
pub struct LocalAvatar;

/// Another player, positioned from server updates only.
#[derive(Component)]
pub struct RemoteAvatar;

/// Entities currently standing in for server-side players, keyed by the
/// server's ids.
#[derive(Resource, Default)]
pub struct AvatarEntities {
    pub local: Option<Entity>,
    pub remotes: HashMap<PlayerId, Entity>,
}

// ============================================================================
// STAR
// ============================================================================

/// The collectible star. `generation` matches the mirrored world's star.
#[derive(Component)]
pub struct StarPickup {
    pub generation: u64,
}

// ============================================================================
// PHYSICS
// ============================================================================

/// Axis-aligned body simulated against the terrain and world bounds.
#[derive(Component, Debug, Clone, Copy, PartialEq)]
pub struct Body {
    /// Center, world pixels.
    pub position: Vec2,
    /// Pixels per second.
    pub velocity: Vec2,
    pub half_size: Vec2,
    /// Fraction of velocity kept (and reversed) on impact.
    pub bounce: f32,
    /// Radians. Not simulated; carried for the transform and the wire.
    pub rotation: f32,
}

impl Body {
    pub fn new(position: Vec2, size: Vec2, bounce: f32) -> Self {
        Self {
            position,
            velocity: Vec2::ZERO,
            half_size: size / 2.0,
            bounce,
            rotation: 0.0,
        }
    }

    pub fn min(&self) -> Vec2 {
        self.position - self.half_size
    }

    pub fn max(&self) -> Vec2 {
        self.position + self.half_size
    }

    /// Whether two bodies intersect (touching edges do not count).
    pub fn overlaps(&self, other: &Body) -> bool {
        let delta = (self.position - other.position).abs();
        let reach = self.half_size + other.half_size;
        delta.x < reach.x && delta.y < reach.y
    }
}

// ============================================================================
// HUD
// ============================================================================

/// Score text for one team.
#[derive(Component)]
pub struct ScoreLabel {
    pub team: Team,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overlap() {
        let player = Body::new(Vec2::new(100.0, 100.0), Vec2::splat(50.0), 0.1);
        let near = Body::new(Vec2::new(130.0, 110.0), Vec2::splat(24.0), 0.0);
        let far = Body::new(Vec2::new(200.0, 100.0), Vec2::splat(24.0), 0.0);

        assert!(player.overlaps(&near));
        assert!(near.overlaps(&player));
        assert!(!player.overlaps(&far));
    }

    #[test]
    fn test_touching_edges_do_not_overlap() {
        let a = Body::new(Vec2::new(0.0, 0.0), Vec2::splat(10.0), 0.0);
        let b = Body::new(Vec2::new(10.0, 0.0), Vec2::splat(10.0), 0.0);
        assert!(!a.overlaps(&b));
    }
}
