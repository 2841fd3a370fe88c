//! The robot pipeline fed by a real Rapier step instead of injected contacts.
//!
//! Dust and trash are solid fixed colliders; only the robot's intake is a
//! sensor.  These tests check that Rapier reports that pairing at all.

use bevy::prelude::*;
use bevy::time::TimeUpdateStrategy;
use bevy_rapier2d::prelude::*;
use dustbot::config::SimConfig;
use dustbot::economy::EconomyLedger;
use dustbot::level::{spawn_dust, spawn_trash, LevelLayout};
use dustbot::objectives::{ObjectiveTracker, ObjectivesPlugin};
use dustbot::persistence::Progress;
use dustbot::robot::{spawn_robot, CollectionTank, Robot, RobotPlugin};
use dustbot::upgrades::UpgradeCatalog;
use std::time::Duration;

#[derive(Resource)]
struct Spawned {
    near_dust: Entity,
    far_dust: Entity,
    trash: Entity,
}

fn spawn_scene(
    mut commands: Commands,
    config: Res<SimConfig>,
    catalog: Res<UpgradeCatalog>,
    layout: Res<LevelLayout>,
) {
    spawn_robot(&mut commands, &config, &catalog, &layout);
    let start = layout.robot_start();
    // Inside the 0.8 intake reach but clear of the 0.5 body.
    let near_dust = spawn_dust(&mut commands, start + Vec2::new(1.0, 0.0), 0.3);
    let trash = spawn_trash(&mut commands, start + Vec2::new(-1.0, 0.0), 2);
    let far_dust = spawn_dust(&mut commands, start + Vec2::new(0.0, 4.0), 0.3);
    commands.insert_resource(Spawned {
        near_dust,
        far_dust,
        trash,
    });
}

fn no_gravity(mut q_config: Query<&mut RapierConfiguration>) {
    for mut cfg in &mut q_config {
        cfg.gravity = Vec2::ZERO;
    }
}

fn physics_app() -> App {
    let config = SimConfig::default();
    let mut app = App::new();
    app.add_plugins((
        MinimalPlugins,
        TransformPlugin,
        AssetPlugin::default(),
        bevy::scene::ScenePlugin,
    ));
    app.init_asset::<Mesh>();
    app.insert_resource(TimeUpdateStrategy::ManualDuration(Duration::from_millis(20)));
    app.add_plugins(RapierPhysicsPlugin::<NoUserData>::pixels_per_meter(1.0));
    app.add_plugins((ObjectivesPlugin, RobotPlugin));

    app.insert_resource(UpgradeCatalog::from_config(&config));
    app.insert_resource(LevelLayout::default());
    app.insert_resource(EconomyLedger::new(0));
    app.insert_resource(Progress::memory());
    app.insert_resource(ObjectiveTracker::new(2, 0));
    app.insert_resource(config);
    app.add_systems(Startup, spawn_scene);
    app.add_systems(PostStartup, no_gravity);
    app
}

fn run(app: &mut App, frames: usize) {
    for _ in 0..frames {
        app.update();
    }
}

#[test]
fn intake_sensor_sweeps_solid_dust_and_trash() {
    let mut app = physics_app();
    run(&mut app, 20);

    let spawned = app.world().resource::<Spawned>();
    let (near, far, trash) = (spawned.near_dust, spawned.far_dust, spawned.trash);
    assert!(app.world().get_entity(near).is_err(), "dust in reach was not swept");
    assert!(app.world().get_entity(trash).is_err(), "trash in reach was not swept");
    assert!(app.world().get_entity(far).is_ok());

    let world = app.world_mut();
    let level = world
        .query_filtered::<&CollectionTank, With<Robot>>()
        .single(world)
        .unwrap()
        .0
        .level();
    assert_eq!(level, 1.0);
    assert_eq!(world.resource::<EconomyLedger>().balance(), 2);
    assert_eq!(world.resource::<ObjectiveTracker>().collectibles_remaining(), 1);
}
