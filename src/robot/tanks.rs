//! Power cell, collection tank, pickups and puddles.
//!
//! ## Pipeline (fixed step, after locomotion)
//!
//! 1. [`zone_contact_system`]: liquid / dock / dust / trash enter and exit.
//! 2. [`pickup_system`]: coins for trash, one collection unit per dust tile.
//! 3. [`power_system`]: drain while moving, charge while docked.
//! 4. [`collection_service_system`]: empty the collection tank on the dock.
//! 5. [`puddle_intake_system`]: absorb puddles the robot stays in.
//! 6. [`dock_return_system`]: report the robot sitting on the dock centre.
//!
//! Every tank boundary crossing is reported as a [`TankChanged`] message.

use super::contacts::{ContactPhase, ZoneContact};
use super::state::{
    CollectionTank, DockState, DriveIntent, IntakeContacts, PowerCell, Robot, RobotMode,
    RobotParams, TankChanged, TankKind, TurboChanged,
};
use crate::config::SimConfig;
use crate::economy::{CoinSource, CoinsEarned, EconomyLedger};
use crate::error::TankError;
use crate::level::{ChargingDock, Collectible, Puddle, TrashPile, Zone, ZoneKind};
use crate::objectives::ObjectiveEvent;
use crate::persistence::Progress;
use crate::tank::{Crossings, ServiceTarget};
use crate::traction::TractionState;
use bevy::prelude::*;

fn report(out: &mut MessageWriter<TankChanged>, tank: TankKind, crossings: Crossings) {
    for transition in crossings.iter() {
        out.write(TankChanged { tank, transition });
    }
}

// ── Contacts ──────────────────────────────────────────────────────────────────

/// Apply zone enter/exit messages to the robot's counters and puddles.
///
/// Liquid exits from puddles that were already absorbed (and despawned) are
/// ignored; the absorption itself released that contact.
#[allow(clippy::type_complexity)]
pub fn zone_contact_system(
    mut contacts: MessageReader<ZoneContact>,
    config: Res<SimConfig>,
    mut q_robot: Query<
        (
            &mut TractionState,
            &mut DockState,
            &mut PowerCell,
            &mut CollectionTank,
            &mut IntakeContacts,
        ),
        With<Robot>,
    >,
    mut q_puddles: Query<&mut Puddle>,
    q_zones: Query<(), With<Zone>>,
) {
    let Ok((mut traction, mut dock, mut power, mut collection, mut intake)) = q_robot.single_mut()
    else {
        return;
    };

    for contact in contacts.read() {
        match (contact.kind, contact.phase) {
            (ZoneKind::Liquid, ContactPhase::Enter) => match q_puddles.get_mut(contact.zone) {
                Ok(mut puddle) => {
                    if !puddle.intake.in_contact() {
                        puddle.intake.begin_contact();
                        traction.enter_liquid();
                    }
                }
                Err(_) => traction.enter_liquid(),
            },
            (ZoneKind::Liquid, ContactPhase::Exit) => match q_puddles.get_mut(contact.zone) {
                Ok(mut puddle) => {
                    if puddle.intake.in_contact() {
                        puddle.intake.break_contact();
                        traction.exit_liquid();
                    }
                }
                Err(_) => {
                    if q_zones.contains(contact.zone) {
                        traction.exit_liquid();
                    }
                }
            },
            (ZoneKind::Dock, ContactPhase::Enter) => {
                dock.contacts += 1;
                if dock.contacts == 1 {
                    power
                        .0
                        .begin_service(ServiceTarget::Fill, config.power_charge_rate);
                    collection
                        .0
                        .begin_service(ServiceTarget::Drain, config.collection_drain_rate);
                    info!("[robot] docked");
                }
            }
            (ZoneKind::Dock, ContactPhase::Exit) => {
                let was_docked = dock.docked();
                dock.contacts = dock.contacts.saturating_sub(1);
                if was_docked && !dock.docked() {
                    power.0.end_service();
                    collection.0.end_service();
                    info!("[robot] undocked");
                }
            }
            (ZoneKind::Collectible | ZoneKind::Trash, ContactPhase::Enter) => {
                intake.add(contact.zone)
            }
            (ZoneKind::Collectible | ZoneKind::Trash, ContactPhase::Exit) => {
                intake.remove(contact.zone)
            }
        }
    }
}

// ── Pickups ───────────────────────────────────────────────────────────────────

/// Sweep up whatever sits under the intake.
///
/// Trash only pays coins: it takes no tank space and is swept up in any
/// mode.  Dust takes one collection unit and is refused while turbo is
/// active.  A full tank leaves dust in place; it is retried every step for
/// as long as it stays under the intake.
#[allow(clippy::too_many_arguments)]
pub fn pickup_system(
    mut commands: Commands,
    mut q_robot: Query<(&RobotMode, &mut CollectionTank, &mut IntakeContacts), With<Robot>>,
    q_dust: Query<(), With<Collectible>>,
    q_trash: Query<&TrashPile>,
    mut ledger: ResMut<EconomyLedger>,
    mut progress: ResMut<Progress>,
    mut tank_out: MessageWriter<TankChanged>,
    mut objective_out: MessageWriter<ObjectiveEvent>,
    mut coins_out: MessageWriter<CoinsEarned>,
) {
    let Ok((mode, mut collection, mut intake)) = q_robot.single_mut() else {
        return;
    };
    if intake.0.is_empty() {
        return;
    }

    let mut refused = mode.turbo_active;
    let pending = intake.0.clone();
    for entity in pending {
        if let Ok(trash) = q_trash.get(entity) {
            commands.entity(entity).despawn();
            intake.remove(entity);
            let balance = ledger.credit(trash.value, progress.store_mut());
            coins_out.write(CoinsEarned {
                amount: trash.value,
                source: CoinSource::Trash,
                balance,
            });
            continue;
        }
        if !q_dust.contains(entity) {
            intake.remove(entity);
            continue;
        }
        if refused {
            continue;
        }
        match collection.0.try_apply(1.0) {
            Ok(crossings) => {
                commands.entity(entity).despawn();
                intake.remove(entity);
                report(&mut tank_out, TankKind::Collection, crossings);
                objective_out.write(ObjectiveEvent::CollectibleCleared);
            }
            Err(e @ TankError::Full { .. }) => {
                debug!("[robot] pickup refused: {e}");
                refused = true;
            }
            Err(e) => {
                debug!("[robot] pickup ignored: {e}");
            }
        }
    }
}

// ── Power ─────────────────────────────────────────────────────────────────────

/// Charge on the dock; otherwise drain while moving.
///
/// Turbo multiplies the drain and switches off the step the cell runs dry.
pub fn power_system(
    time: Res<Time>,
    config: Res<SimConfig>,
    intent: Res<DriveIntent>,
    mut q_robot: Query<(&mut PowerCell, &mut RobotMode, &DockState), With<Robot>>,
    mut tank_out: MessageWriter<TankChanged>,
    mut turbo_out: MessageWriter<TurboChanged>,
) {
    let Ok((mut power, mut mode, dock)) = q_robot.single_mut() else {
        return;
    };
    let dt = time.delta_secs();

    let crossings = if dock.docked() {
        power.0.service(dt)
    } else {
        let eps = config.moving_input_epsilon;
        let moving = !mode.halted
            && (mode.autonomous || intent.forward.abs() > eps || intent.turn.abs() > eps);
        if moving {
            let multiplier = if mode.turbo_active {
                config.turbo_drain_multiplier
            } else {
                1.0
            };
            power.0.apply(-config.power_drain_rate * multiplier * dt)
        } else {
            Crossings::default()
        }
    };
    report(&mut tank_out, TankKind::Power, crossings);

    if power.is_dead() && mode.turbo_active {
        mode.turbo_active = false;
        turbo_out.write(TurboChanged { active: false });
        info!("[robot] battery dead, turbo off");
    }
}

/// Empty the collection tank while docked.
pub fn collection_service_system(
    time: Res<Time>,
    mut q_robot: Query<&mut CollectionTank, With<Robot>>,
    mut tank_out: MessageWriter<TankChanged>,
) {
    let Ok(mut collection) = q_robot.single_mut() else {
        return;
    };
    let crossings = collection.0.service(time.delta_secs());
    report(&mut tank_out, TankKind::Collection, crossings);
}

// ── Puddles ───────────────────────────────────────────────────────────────────

/// Advance absorption of every puddle in contact.
///
/// Progress stalls while the collection tank is full.  A finished puddle adds
/// one collection unit, is despawned and releases its liquid contact.
#[allow(clippy::too_many_arguments)]
pub fn puddle_intake_system(
    mut commands: Commands,
    time: Res<Time>,
    config: Res<SimConfig>,
    mut q_robot: Query<(&RobotParams, &mut CollectionTank, &mut TractionState), With<Robot>>,
    mut q_puddles: Query<(Entity, &mut Puddle)>,
    mut tank_out: MessageWriter<TankChanged>,
    mut objective_out: MessageWriter<ObjectiveEvent>,
) {
    let Ok((params, mut collection, mut traction)) = q_robot.single_mut() else {
        return;
    };
    let duration = config.puddle_duration(params.has_attachment);
    let delta = time.delta_secs() / duration.max(f32::EPSILON);

    for (entity, mut puddle) in &mut q_puddles {
        if !puddle.intake.in_contact() || collection.0.is_full() {
            continue;
        }
        if puddle.intake.advance(delta) {
            let crossings = collection.0.apply(1.0);
            report(&mut tank_out, TankKind::Collection, crossings);
            puddle.intake.break_contact();
            traction.exit_liquid();
            commands.entity(entity).despawn();
            objective_out.write(ObjectiveEvent::LiquidCleared);
            info!("[robot] puddle absorbed");
        }
    }
}

// ── Dock ──────────────────────────────────────────────────────────────────────

/// Emit `ReturnedToBase` every step the robot is docked near the dock centre.
pub fn dock_return_system(
    config: Res<SimConfig>,
    q_robot: Query<(&Transform, &DockState), With<Robot>>,
    q_dock: Query<&Transform, With<ChargingDock>>,
    mut objective_out: MessageWriter<ObjectiveEvent>,
) {
    let Ok((tf, dock)) = q_robot.single() else {
        return;
    };
    if !dock.docked() {
        return;
    }
    let pos = tf.translation.truncate();
    if q_dock
        .iter()
        .any(|d| d.translation.truncate().distance(pos) <= config.dock_center_distance)
    {
        objective_out.write(ObjectiveEvent::ReturnedToBase);
    }
}
