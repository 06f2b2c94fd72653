//! StarClash - two-team multiplayer platformer
//!
//! Players run and jump across a tile map, racing to grab the star. The
//! server owns the roster, the star and the score; this client mirrors
//! them and streams its own player's position back every frame.

mod game;
mod network;
mod ui;

use bevy::prelude::*;
use bevy::window::WindowMode;

use game::GamePlugin;
use network::NetworkPlugin;
use ui::HudPlugin;

/// Game states
#[derive(States, Debug, Clone, Copy, Eq, PartialEq, Hash, Default)]
pub enum AppState {
    #[default]
    Loading,
    Playing,
    Disconnected,
}

/// Per-frame order while playing: inbound sync, scene updates from it,
/// local simulation, drawing, then outbound sync.
#[derive(SystemSet, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FrameSet {
    Receive,
    Apply,
    Simulate,
    Present,
    Send,
}

fn main() {
    App::new()
        // Bevy defaults with custom window
        .add_plugins(DefaultPlugins.set(WindowPlugin {
            primary_window: Some(Window {
                title: "StarClash".into(),
                resolution: (800., 600.).into(),
                mode: WindowMode::Windowed,
                ..default()
            }),
            ..default()
        }))
        // Async runtime for networking
        .add_plugins(bevy_tokio_tasks::TokioTasksPlugin::default())
        // Game state
        .init_state::<AppState>()
        .configure_sets(
            Update,
            (
                FrameSet::Receive,
                FrameSet::Apply,
                FrameSet::Simulate,
                FrameSet::Present,
                FrameSet::Send,
            )
                .chain()
                .run_if(in_state(AppState::Playing)),
        )
        // Our plugins
        .add_plugins((NetworkPlugin, GamePlugin, HudPlugin))
        // Startup
        .insert_resource(ClearColor(Color::srgb(0.53, 0.81, 0.92)))
        .add_systems(Startup, setup_2d_camera)
        .run();
}

fn setup_2d_camera(mut commands: Commands) {
    commands.spawn(Camera2d);

    info!("StarClash client v{} initialized!", env!("CARGO_PKG_VERSION"));
}
