use bevy::prelude::*;
use bevy::window::WindowResolution;
use bevy_rapier2d::prelude::*;
use std::env;

use dustbot::config::{self, SimConfig};
use dustbot::effects::EffectsPlugin;
use dustbot::hud::HudPlugin;
use dustbot::level::{self, LevelLayout};
use dustbot::objectives::ObjectivesPlugin;
use dustbot::persistence::{Progress, TomlFileStore, PROGRESS_PATH};
use dustbot::robot::{KeyboardInputPlugin, RobotPlugin};
use dustbot::session::SessionPlugin;
use dustbot::upgrades::UpgradesPlugin;

/// The room is seen from above: no gravity.
fn setup_physics_config(mut config: Query<&mut RapierConfiguration>) {
    for mut cfg in config.iter_mut() {
        cfg.gravity = Vec2::ZERO;
    }
}

fn main() {
    // DUSTBOT_PROGRESS overrides the save file location.
    let progress_path = env::var("DUSTBOT_PROGRESS").unwrap_or_else(|_| PROGRESS_PATH.to_string());

    let mut app = App::new();

    app.add_plugins(DefaultPlugins.set(WindowPlugin {
        primary_window: Some(Window {
            title: "Dustbot".into(),
            resolution: WindowResolution::new(1000, 720),
            ..Default::default()
        }),
        ..Default::default()
    }))
    .insert_resource(ClearColor(Color::srgb(0.12, 0.12, 0.14)))
    // Compiled defaults; the PreStartup loaders overwrite them from assets/.
    .insert_resource(SimConfig::default())
    .insert_resource(LevelLayout::default())
    .insert_resource(Progress(Box::new(TomlFileStore::open_or_default(
        progress_path,
    ))))
    // pixels_per_meter(1.0): world units are metres; the camera does the scaling.
    .add_plugins(RapierPhysicsPlugin::<NoUserData>::pixels_per_meter(1.0))
    .add_plugins(RapierDebugRenderPlugin::default())
    .add_plugins((
        SessionPlugin,
        UpgradesPlugin,
        ObjectivesPlugin,
        RobotPlugin,
        KeyboardInputPlugin,
        EffectsPlugin,
        HudPlugin,
    ))
    .add_systems(
        PreStartup,
        (config::load_sim_config, level::load_level_layout),
    )
    .add_systems(Startup, setup_physics_config);

    app.run();
}
