//! UI module - score HUD and the disconnect notice
//!
//! The score labels live in the world and are moved every frame to stay
//! at a fixed offset from the camera's top-left corner.

use bevy::prelude::*;
use bevy::sprite::Anchor;
use starclash_sync::{Scores, Team, WorldEvent};

use crate::game::camera::{self, follow_local_avatar};
use crate::game::coords::{scene_to_world, world_to_scene};
use crate::game::{GameTuning, ScoreLabel};
use crate::network::WorldChanged;
use crate::{AppState, FrameSet};

const HUD_Z: f32 = 100.0;

pub struct HudPlugin;

impl Plugin for HudPlugin {
    fn build(&self, app: &mut App) {
        app
            .add_systems(OnEnter(AppState::Playing), setup_score_labels)
            .add_systems(OnEnter(AppState::Disconnected), setup_disconnected_ui)
            .add_systems(Update, update_score_labels.in_set(FrameSet::Apply))
            .add_systems(
                Update,
                pin_score_labels
                    .in_set(FrameSet::Present)
                    .after(follow_local_avatar),
            );
    }
}

/// Marker for the disconnect notice
#[derive(Component)]
struct DisconnectedUI;

// ============================================================================
// SCORE LABELS
// ============================================================================

/// Label text for one team.
pub fn score_text(team: Team, scores: Scores) -> String {
    match team {
        Team::Blue => format!("Blue: {}", scores.blue),
        Team::Red => format!("Red: {}", scores.red),
    }
}

/// Offset of a team's label from the view's top-left corner.
pub fn label_offset(team: Team, tuning: &GameTuning) -> Vec2 {
    match team {
        Team::Blue => tuning.blue_label_offset,
        Team::Red => tuning.red_label_offset,
    }
}

/// World position of a label given the camera scroll.
pub fn label_position(scroll: Vec2, offset: Vec2) -> Vec2 {
    scroll + offset
}

fn label_color(team: Team) -> Color {
    match team {
        Team::Blue => Color::srgb_u8(0x00, 0x00, 0xFF),
        Team::Red => Color::srgb_u8(0xFF, 0x00, 0x00),
    }
}

/// Both labels start empty until the first score update.
fn setup_score_labels(mut commands: Commands, tuning: Res<GameTuning>) {
    for team in [Team::Blue, Team::Red] {
        commands.spawn((
            ScoreLabel { team },
            Name::new(format!("{:?} score", team)),
            Text2d::new(""),
            TextFont {
                font_size: tuning.label_font_size,
                ..default()
            },
            TextColor(label_color(team)),
            Anchor::TopLeft,
            Transform::from_translation(world_to_scene(label_offset(team, &tuning), HUD_Z)),
        ));
    }
}

/// Overwrite both labels from the latest score update.
fn update_score_labels(
    mut changes: EventReader<WorldChanged>,
    mut labels: Query<(&ScoreLabel, &mut Text2d)>,
) {
    let latest = changes
        .read()
        .filter_map(|WorldChanged(change)| match change {
            WorldEvent::ScoreChanged(scores) => Some(*scores),
            _ => None,
        })
        .last();

    let Some(scores) = latest else {
        return;
    };
    for (label, mut text) in &mut labels {
        **text = score_text(label.team, scores);
    }
}

/// Keep the labels fixed relative to the viewport.
fn pin_score_labels(
    tuning: Res<GameTuning>,
    windows: Query<&Window>,
    cameras: Query<&Transform, (With<Camera2d>, Without<ScoreLabel>)>,
    mut labels: Query<(&ScoreLabel, &mut Transform), Without<Camera2d>>,
) {
    let Ok(camera_transform) = cameras.get_single() else {
        return;
    };
    let viewport = camera::viewport(&windows, &tuning);
    let scroll = camera::scroll(scene_to_world(camera_transform.translation), viewport);

    for (label, mut transform) in &mut labels {
        let position = label_position(scroll, label_offset(label.team, &tuning));
        transform.translation = world_to_scene(position, HUD_Z);
    }
}

// ============================================================================
// DISCONNECTED
// ============================================================================

fn setup_disconnected_ui(mut commands: Commands) {
    commands
        .spawn((
            Node {
                width: Val::Percent(100.0),
                height: Val::Percent(100.0),
                justify_content: JustifyContent::Center,
                align_items: AlignItems::Center,
                ..default()
            },
            BackgroundColor(Color::srgba(0.0, 0.0, 0.0, 0.6)),
            DisconnectedUI,
        ))
        .with_children(|parent| {
            parent.spawn((
                Text::new("Disconnected from server"),
                TextFont {
                    font_size: 40.0,
                    ..default()
                },
                TextColor(Color::WHITE),
            ));
        });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_score_text() {
        let scores = Scores { blue: 3, red: 12 };
        assert_eq!(score_text(Team::Blue, scores), "Blue: 3");
        assert_eq!(score_text(Team::Red, scores), "Red: 12");
    }

    #[test]
    fn test_labels_follow_camera_scroll() {
        let tuning = GameTuning::default();
        let scroll = Vec2::new(1200.0, 340.0);

        assert_eq!(
            label_position(scroll, label_offset(Team::Blue, &tuning)),
            Vec2::new(1216.0, 356.0)
        );
        assert_eq!(
            label_position(scroll, label_offset(Team::Red, &tuning)),
            Vec2::new(1784.0, 356.0)
        );
    }

    #[test]
    fn test_repeated_score_update_is_idempotent() {
        let mut app = App::new();
        app.add_event::<WorldChanged>()
            .add_systems(Update, update_score_labels);

        let blue = app
            .world_mut()
            .spawn((ScoreLabel { team: Team::Blue }, Text2d::default()))
            .id();
        let red = app
            .world_mut()
            .spawn((ScoreLabel { team: Team::Red }, Text2d::default()))
            .id();

        let scores = Scores { blue: 2, red: 5 };
        for _ in 0..2 {
            app.world_mut()
                .send_event(WorldChanged(WorldEvent::ScoreChanged(scores)));
            app.update();

            assert_eq!(app.world().get::<Text2d>(blue).unwrap().0, "Blue: 2");
            assert_eq!(app.world().get::<Text2d>(red).unwrap().0, "Red: 5");
        }
    }

    #[test]
    fn test_latest_score_wins_within_a_frame() {
        let mut app = App::new();
        app.add_event::<WorldChanged>()
            .add_systems(Update, update_score_labels);
        let blue = app
            .world_mut()
            .spawn((ScoreLabel { team: Team::Blue }, Text2d::default()))
            .id();

        for blue_score in [1, 4] {
            app.world_mut().send_event(WorldChanged(WorldEvent::ScoreChanged(Scores {
                blue: blue_score,
                red: 0,
            })));
        }
        app.update();

        assert_eq!(app.world().get::<Text2d>(blue).unwrap().0, "Blue: 4");
    }
}
