//! Robot module: the cleaning robot entity and every system that moves it.
//!
//! ## Sub-module layout
//!
//! | Module | Responsibility |
//! |--------|----------------|
//! | [`state`] | ECS components (`Robot`, `RobotParams`, `PowerCell`, `CollectionTank`, `RobotMode`), the `DriveIntent` resource and robot messages |
//! | [`contacts`] | Rapier collision events into `ZoneContact` / `SurfaceContact`, intake sensor sizing |
//! | [`control`] | Keyboard intent, wall response, autonomous and turbo modes, terrain, the locomotion step |
//! | [`tanks`] | Dock servicing, power drain, pickups, puddle absorption, return to base |
//!
//! All public items are re-exported at this level so the rest of the crate
//! can use flat `crate::robot::*` imports.

pub mod contacts;
pub mod control;
pub mod state;
pub mod tanks;

// ── Flat re-exports ───────────────────────────────────────────────────────────

pub use contacts::{
    box_normal, collision_event_translation_system, sync_intake_radius_system, ContactPhase,
    IntakeSensor, SurfaceContact, ZoneContact,
};
pub use control::{
    autonomous_toggle_system, drive_system, halt_on_level_complete_system, impact_response_system,
    keyboard_to_intent_system, surface_contact_system, terrain_resolve_system, turbo_mode_system,
};
pub use state::{
    AutonomousToggled, CollectionTank, DockState, DriveIntent, IntakeContacts, ObstacleContacts,
    PendingImpacts, PowerCell, Robot, RobotMode, RobotParams, TankChanged, TankKind, TurboChanged,
};
pub use tanks::{
    collection_service_system, dock_return_system, pickup_system, power_system,
    puddle_intake_system, zone_contact_system,
};

// ── Robot spawn ───────────────────────────────────────────────────────────────

use crate::config::SimConfig;
use crate::economy::CoinsEarned;
use crate::level::{LevelEntity, LevelLayout};
use crate::locomotion::{Kinematics, Pose};
use crate::objectives::{objective_event_system, LevelCompleted, ObjectiveEvent};
use crate::scanner::{scanner_system, PulseScanner};
use crate::traction::{TerrainChanged, TractionState};
use crate::upgrades::{robot_loadout, UpgradeCatalog};
use bevy::prelude::*;
use bevy_rapier2d::prelude::*;

/// Every simulation component of the robot, without physics colliders.
///
/// Parameters and tank capacities come from the purchased upgrade levels;
/// power starts full and collection empty.
pub fn robot_core(
    config: &SimConfig,
    catalog: &UpgradeCatalog,
    position: Vec2,
    heading: f32,
) -> impl Bundle {
    let (params, power, collection) = robot_loadout(config, catalog);
    let pose = Pose::new(position, heading);
    (
        Robot,
        (
            pose,
            Kinematics::default(),
            pose.to_transform(),
            params,
            RobotMode::default(),
        ),
        (
            PowerCell(power),
            CollectionTank(collection),
            DockState::default(),
            TractionState::default(),
        ),
        (
            ObstacleContacts::default(),
            PendingImpacts::default(),
            IntakeContacts::default(),
            PulseScanner::new(config),
        ),
    )
}

/// Spawn the robot on the dock of `layout`, with its kinematic body and
/// intake sensor.
///
/// The body is kinematic: Rapier only reports contacts, the pose is owned by
/// [`drive_system`].  `KINEMATIC_STATIC` is required for wall contacts to be
/// reported against fixed colliders.
pub fn spawn_robot(
    commands: &mut Commands,
    config: &SimConfig,
    catalog: &UpgradeCatalog,
    layout: &LevelLayout,
) -> Entity {
    let start = layout.robot_start();
    let intake_radius = robot_loadout(config, catalog).0.intake_radius;
    let robot = commands
        .spawn((
            robot_core(config, catalog, start, layout.robot_heading_deg.to_radians()),
            LevelEntity,
            RigidBody::KinematicPositionBased,
            Collider::ball(config.robot_radius),
            ActiveEvents::COLLISION_EVENTS,
            ActiveCollisionTypes::default() | ActiveCollisionTypes::KINEMATIC_STATIC,
            Visibility::default(),
        ))
        .with_children(|parent| {
            parent.spawn((
                IntakeSensor,
                Collider::ball(intake_radius),
                Sensor,
                ActiveEvents::COLLISION_EVENTS,
                ActiveCollisionTypes::default() | ActiveCollisionTypes::KINEMATIC_STATIC,
                Transform::default(),
            ));
        })
        .id();
    info!("[robot] spawned at ({:.2}, {:.2})", start.x, start.y);
    robot
}

/// Startup / reload system wrapper around [`spawn_robot`].
pub fn spawn_robot_system(
    mut commands: Commands,
    config: Res<SimConfig>,
    catalog: Res<UpgradeCatalog>,
    layout: Res<LevelLayout>,
) {
    spawn_robot(&mut commands, &config, &catalog, &layout);
}

/// Keyboard into [`DriveIntent`].  Kept apart from [`RobotPlugin`] so headless
/// apps can drive the robot by writing the intent directly.
pub struct KeyboardInputPlugin;

impl Plugin for KeyboardInputPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<DriveIntent>()
            .add_systems(Update, keyboard_to_intent_system);
    }
}

/// Registers robot messages and the fixed-step pipeline.
///
/// Order within `FixedUpdate`:
/// contacts → modes → terrain → drive → impact response → tanks → scanner →
/// objectives → halt.
pub struct RobotPlugin;

impl Plugin for RobotPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<DriveIntent>()
            .add_message::<CollisionEvent>()
            .add_message::<ZoneContact>()
            .add_message::<SurfaceContact>()
            .add_message::<TurboChanged>()
            .add_message::<AutonomousToggled>()
            .add_message::<TankChanged>()
            .add_message::<TerrainChanged>()
            .add_message::<ObjectiveEvent>()
            .add_message::<LevelCompleted>()
            .add_message::<CoinsEarned>()
            .add_systems(
                FixedUpdate,
                (
                    (
                        collision_event_translation_system,
                        sync_intake_radius_system,
                        zone_contact_system,
                        surface_contact_system,
                        autonomous_toggle_system,
                        turbo_mode_system,
                        terrain_resolve_system,
                        drive_system,
                        impact_response_system,
                    )
                        .chain(),
                    (
                        pickup_system,
                        power_system,
                        collection_service_system,
                        puddle_intake_system,
                        dock_return_system,
                        scanner_system,
                        objective_event_system,
                        halt_on_level_complete_system,
                    )
                        .chain(),
                )
                    .chain(),
            );
    }
}
