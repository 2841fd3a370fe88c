//! Session phases: shop, running level, level complete.
//!
//! ## States
//!
//! | State | Description |
//! |-------|-------------|
//! | `Shop` | Initial state; virtual time paused, upgrades bought with keys 1–7 |
//! | `Running` | Simulation steps; E on the dock reopens the shop |
//! | `LevelComplete` | Robot halted; Enter reloads the level into the shop |
//!
//! ## Systems (registered by `SessionPlugin`)
//!
//! | System | Schedule | Purpose |
//! |--------|----------|---------|
//! | `boot_progress_system` … `register_objectives_system` | `Startup` | economy, level, robot, objectives |
//! | `pause_virtual_time` / `resume_virtual_time` | `OnEnter` / `OnExit(Shop)` | time-scale 0 in the shop |
//! | `shop_input_system` | `Update / in Shop` | purchases, start, progress reset |
//! | `interact_system` | `Update / in Running` | E while docked opens the shop |
//! | `level_complete_system` | `Update / in Running` | switch to `LevelComplete` |
//! | `continue_input_system` | `Update / in LevelComplete` | Enter continues |
//! | reload chain | `OnExit(LevelComplete)` | despawn and respawn the level |

use crate::config::SimConfig;
use crate::economy::EconomyLedger;
use crate::level::{despawn_level_system, spawn_level_system};
use crate::objectives::{register_objectives_system, LevelCompleted};
use crate::persistence::{reset_progress, Progress};
use crate::robot::{
    spawn_robot_system, CollectionTank, DockState, DriveIntent, PowerCell, Robot, RobotParams,
};
use crate::upgrades::{robot_loadout, PurchaseRequest, UpgradeCatalog, UpgradeTrack};
use bevy::prelude::*;
use bevy_rapier2d::prelude::RapierConfiguration;

#[derive(States, Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SessionPhase {
    #[default]
    Shop,
    Running,
    LevelComplete,
}

// ── Startup ───────────────────────────────────────────────────────────────────

/// Load the ledger and upgrade catalog from the progress store.
pub fn boot_progress_system(
    mut commands: Commands,
    config: Res<SimConfig>,
    progress: Res<Progress>,
) {
    let ledger = EconomyLedger::load(progress.store(), config.starting_coins);
    let catalog = UpgradeCatalog::load(&config, progress.store());
    info!("[session] {} coins", ledger.balance());
    commands.insert_resource(ledger);
    commands.insert_resource(catalog);
}

/// Apply the configured simulation rate to the fixed clock.
pub fn apply_fixed_timestep_system(config: Res<SimConfig>, mut fixed: ResMut<Time<Fixed>>) {
    fixed.set_timestep_hz(config.fixed_hz);
}

// ── Shop ──────────────────────────────────────────────────────────────────────

/// Freeze both clocks and the Rapier pipeline while shopping.
pub fn pause_virtual_time(
    mut time: ResMut<Time<Virtual>>,
    mut rapier: Query<&mut RapierConfiguration>,
) {
    time.pause();
    for mut cfg in rapier.iter_mut() {
        cfg.physics_pipeline_active = false;
    }
}

pub fn resume_virtual_time(
    mut time: ResMut<Time<Virtual>>,
    mut rapier: Query<&mut RapierConfiguration>,
) {
    time.unpause();
    for mut cfg in rapier.iter_mut() {
        cfg.physics_pipeline_active = true;
    }
}

const SHOP_KEYS: [KeyCode; 7] = [
    KeyCode::Digit1,
    KeyCode::Digit2,
    KeyCode::Digit3,
    KeyCode::Digit4,
    KeyCode::Digit5,
    KeyCode::Digit6,
    KeyCode::Digit7,
];

/// Shop controls.
///
/// - **1–7** → buy the next level of the matching track
/// - **Enter / Space / E** → start (or resume) the level
/// - **Shift+R** → wipe saved progress
#[allow(clippy::too_many_arguments)]
pub fn shop_input_system(
    keys: Res<ButtonInput<KeyCode>>,
    mut intent: ResMut<DriveIntent>,
    mut requests: MessageWriter<PurchaseRequest>,
    mut next: ResMut<NextState<SessionPhase>>,
    config: Res<SimConfig>,
    mut progress: ResMut<Progress>,
    mut ledger: ResMut<EconomyLedger>,
    mut catalog: ResMut<UpgradeCatalog>,
    mut q_robot: Query<(&mut RobotParams, &mut PowerCell, &mut CollectionTank), With<Robot>>,
) {
    for (key, track) in SHOP_KEYS.iter().zip(UpgradeTrack::ALL) {
        if keys.just_pressed(*key) {
            requests.write(PurchaseRequest { track });
        }
    }

    let shift = keys.pressed(KeyCode::ShiftLeft) || keys.pressed(KeyCode::ShiftRight);
    if shift && keys.just_pressed(KeyCode::KeyR) {
        reset_progress(progress.store_mut());
        *ledger = EconomyLedger::load(progress.store(), config.starting_coins);
        *catalog = UpgradeCatalog::load(&config, progress.store());
        if let Ok((mut params, mut power, mut collection)) = q_robot.single_mut() {
            let (p, pw, c) = robot_loadout(&config, &catalog);
            *params = p;
            power.0 = pw;
            collection.0 = c;
        }
    }

    let interact = std::mem::take(&mut intent.interact);
    if keys.just_pressed(KeyCode::Enter) || keys.just_pressed(KeyCode::Space) || interact {
        next.set(SessionPhase::Running);
    }
}

// ── Running ───────────────────────────────────────────────────────────────────

/// Interact on the dock reopens the shop.
pub fn interact_system(
    mut intent: ResMut<DriveIntent>,
    q_robot: Query<&DockState, With<Robot>>,
    mut next: ResMut<NextState<SessionPhase>>,
) {
    if !std::mem::take(&mut intent.interact) {
        return;
    }
    if q_robot.single().is_ok_and(|dock| dock.docked()) {
        next.set(SessionPhase::Shop);
    }
}

pub fn level_complete_system(
    mut completed: MessageReader<LevelCompleted>,
    mut next: ResMut<NextState<SessionPhase>>,
) {
    if let Some(done) = completed.read().last() {
        info!("[session] level complete, {} coins", done.balance);
        next.set(SessionPhase::LevelComplete);
    }
}

pub fn continue_input_system(
    keys: Res<ButtonInput<KeyCode>>,
    mut next: ResMut<NextState<SessionPhase>>,
) {
    if keys.just_pressed(KeyCode::Enter) || keys.just_pressed(KeyCode::Space) {
        next.set(SessionPhase::Shop);
    }
}

fn clear_intent_system(mut intent: ResMut<DriveIntent>) {
    *intent = DriveIntent::default();
}

// ── Plugin ────────────────────────────────────────────────────────────────────

/// Registers `SessionPhase`, the startup chain and the phase transitions.
///
/// Expects `SimConfig` and `LevelLayout` to be final by `Startup` (load them
/// in `PreStartup`).  Keyboard systems require `ButtonInput<KeyCode>`.
pub struct SessionPlugin;

impl Plugin for SessionPlugin {
    fn build(&self, app: &mut App) {
        app.init_state::<SessionPhase>()
            .init_resource::<Progress>()
            .init_resource::<DriveIntent>()
            .add_message::<LevelCompleted>()
            .add_message::<PurchaseRequest>()
            .add_systems(
                Startup,
                (
                    apply_fixed_timestep_system,
                    boot_progress_system,
                    spawn_level_system,
                    spawn_robot_system,
                    register_objectives_system,
                )
                    .chain(),
            )
            .add_systems(OnEnter(SessionPhase::Shop), pause_virtual_time)
            .add_systems(OnExit(SessionPhase::Shop), resume_virtual_time)
            .add_systems(
                OnExit(SessionPhase::LevelComplete),
                (
                    clear_intent_system,
                    despawn_level_system,
                    spawn_level_system,
                    spawn_robot_system,
                    register_objectives_system,
                )
                    .chain(),
            )
            .add_systems(
                Update,
                (
                    shop_input_system.run_if(in_state(SessionPhase::Shop)),
                    (interact_system, level_complete_system)
                        .run_if(in_state(SessionPhase::Running)),
                    continue_input_system.run_if(in_state(SessionPhase::LevelComplete)),
                ),
            );
    }
}
