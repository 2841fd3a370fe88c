//! Robot input, modes and the locomotion step.
//!
//! ## Pipeline (fixed step)
//!
//! 1. [`surface_contact_system`]: wall contacts are tracked and new hits queued.
//! 2. [`autonomous_toggle_system`]: consumes the toggle latch.
//! 3. [`turbo_mode_system`]: turbo follows the held key unless forbidden.
//! 4. [`terrain_resolve_system`]: burden and terrain from tanks and contacts.
//! 5. [`drive_system`]: one [`locomotion::step`] and the `Transform` write.
//! 6. [`impact_response_system`]: queued hits deflect or bounce the robot.
//!
//! The response runs last because a dry step rebuilds velocity from input;
//! a deflection applied before it would be lost in the same step.
//!
//! [`keyboard_to_intent_system`] runs in `Update` and only fills
//! [`DriveIntent`], so tests drive the robot by writing the resource.

use super::contacts::{ContactPhase, SurfaceContact};
use super::state::{
    AutonomousToggled, CollectionTank, DockState, DriveIntent, ObstacleContacts, PendingImpacts,
    PowerCell, Robot, RobotMode, RobotParams, TurboChanged,
};
use crate::config::SimConfig;
use crate::level::SurfaceKind;
use crate::locomotion::{self, DriveInput, Kinematics, Pose, SpeedModifiers, StepParams};
use crate::objectives::LevelCompleted;
use crate::traction::{traction_for, BurdenInputs, TerrainChanged, TractionState, TractionTuning};
use bevy::prelude::*;

// ── Input ─────────────────────────────────────────────────────────────────────

/// Translate keys into [`DriveIntent`].
///
/// - **W / S** → `forward = ±1`
/// - **A / D** → `turn = ±1` (A turns left, counter-clockwise)
/// - **Left Shift** → turbo held
/// - **I** → latch the autonomous toggle
/// - **E** → latch interact
pub fn keyboard_to_intent_system(keys: Res<ButtonInput<KeyCode>>, mut intent: ResMut<DriveIntent>) {
    let axis = |pos: KeyCode, neg: KeyCode| -> f32 {
        let mut v = 0.0;
        if keys.pressed(pos) {
            v += 1.0;
        }
        if keys.pressed(neg) {
            v -= 1.0;
        }
        v
    };
    intent.forward = axis(KeyCode::KeyW, KeyCode::KeyS);
    intent.turn = axis(KeyCode::KeyA, KeyCode::KeyD);
    intent.turbo_held = keys.pressed(KeyCode::ShiftLeft);
    if keys.just_pressed(KeyCode::KeyI) {
        intent.toggle_autonomous = true;
    }
    if keys.just_pressed(KeyCode::KeyE) {
        intent.interact = true;
    }
}

// ── Collisions ────────────────────────────────────────────────────────────────

/// Track obstacle contacts and queue new hits for [`impact_response_system`].
///
/// Floor contacts are ignored.
pub fn surface_contact_system(
    mut contacts: MessageReader<SurfaceContact>,
    mut q_robot: Query<(&mut ObstacleContacts, &mut PendingImpacts), With<Robot>>,
) {
    let Ok((mut obstacles, mut pending)) = q_robot.single_mut() else {
        return;
    };

    for contact in contacts.read() {
        if contact.kind == SurfaceKind::Floor {
            continue;
        }
        match contact.phase {
            ContactPhase::Enter => {
                obstacles.insert(contact.surface, contact.normal);
                pending.0.push(contact.normal);
            }
            ContactPhase::Exit => obstacles.remove(contact.surface),
        }
    }
}

/// Apply the contact response to this step's hits, after the drive step so
/// the response is what the robot carries into the next step.
///
/// Manual mode deflects along each wall; autonomous mode bounces away once
/// by a random angle.
#[allow(clippy::type_complexity)]
pub fn impact_response_system(
    config: Res<SimConfig>,
    mut q_robot: Query<
        (
            &mut Pose,
            &mut Kinematics,
            &mut Transform,
            &RobotMode,
            &mut PendingImpacts,
        ),
        With<Robot>,
    >,
) {
    let Ok((mut pose, mut kin, mut transform, mode, mut pending)) = q_robot.single_mut() else {
        return;
    };
    if pending.0.is_empty() {
        return;
    }
    let impacts = std::mem::take(&mut pending.0);
    if mode.halted {
        return;
    }

    if mode.autonomous {
        let turn = locomotion::bounce(
            &mut pose,
            &mut kin,
            &mut rand::thread_rng(),
            config.bounce_min_deg,
            config.bounce_max_deg,
        );
        debug!("[robot] bounce {:.0}°", turn.to_degrees());
        *transform = pose.to_transform();
    } else {
        for normal in impacts {
            locomotion::deflect(&mut kin, normal, config.restitution_damping);
        }
    }
}

// ── Modes ─────────────────────────────────────────────────────────────────────

/// Flip autonomous mode on the latched toggle.
///
/// Either direction halts the robot and drops turbo.
pub fn autonomous_toggle_system(
    mut intent: ResMut<DriveIntent>,
    mut q_robot: Query<(&mut RobotMode, &mut Kinematics), With<Robot>>,
    mut turbo_out: MessageWriter<TurboChanged>,
    mut toggled_out: MessageWriter<AutonomousToggled>,
) {
    if !intent.toggle_autonomous {
        return;
    }
    intent.toggle_autonomous = false;
    let Ok((mut mode, mut kin)) = q_robot.single_mut() else {
        return;
    };
    if mode.halted {
        return;
    }

    mode.autonomous = !mode.autonomous;
    kin.halt();
    if mode.turbo_active {
        mode.turbo_active = false;
        turbo_out.write(TurboChanged { active: false });
    }
    toggled_out.write(AutonomousToggled {
        active: mode.autonomous,
    });
    info!(
        "[robot] autonomous mode {}",
        if mode.autonomous { "on" } else { "off" }
    );
}

/// Turbo is on exactly while it is held, power remains and the robot is
/// under manual control.
pub fn turbo_mode_system(
    intent: Res<DriveIntent>,
    mut q_robot: Query<(&mut RobotMode, &PowerCell), With<Robot>>,
    mut turbo_out: MessageWriter<TurboChanged>,
) {
    let Ok((mut mode, power)) = q_robot.single_mut() else {
        return;
    };
    let wanted = intent.turbo_held && !power.is_dead() && !mode.autonomous && !mode.halted;
    if wanted != mode.turbo_active {
        mode.turbo_active = wanted;
        turbo_out.write(TurboChanged { active: wanted });
    }
}

/// Recompute burden and terrain; report actual changes only.
pub fn terrain_resolve_system(
    mut q_robot: Query<
        (&mut TractionState, &RobotParams, &CollectionTank, &DockState),
        With<Robot>,
    >,
    mut terrain_out: MessageWriter<TerrainChanged>,
) {
    let Ok((mut traction, params, collection, dock)) = q_robot.single_mut() else {
        return;
    };
    let inputs = BurdenInputs {
        has_attachment: params.has_attachment,
        collection_full: collection.0.is_full(),
        docked: dock.docked(),
    };
    if let Some(change) = traction.resolve(inputs) {
        debug!(
            "[robot] terrain {} -> {}",
            change.from.label(),
            change.to.label()
        );
        terrain_out.write(change);
    }
}

// ── Drive ─────────────────────────────────────────────────────────────────────

/// Advance the robot pose one fixed step and mirror it to `Transform`.
#[allow(clippy::type_complexity)]
pub fn drive_system(
    time: Res<Time>,
    config: Res<SimConfig>,
    intent: Res<DriveIntent>,
    mut q_robot: Query<
        (
            &mut Pose,
            &mut Kinematics,
            &mut Transform,
            &RobotParams,
            &RobotMode,
            &TractionState,
            &PowerCell,
            &ObstacleContacts,
        ),
        With<Robot>,
    >,
) {
    let Ok((mut pose, mut kin, mut transform, params, mode, traction, power, obstacles)) =
        q_robot.single_mut()
    else {
        return;
    };

    if mode.halted {
        kin.halt();
        *transform = pose.to_transform();
        return;
    }

    let input = if mode.autonomous {
        DriveInput::new(1.0, 0.0)
    } else {
        DriveInput::new(intent.forward, intent.turn)
    };
    let speed = locomotion::input_speed(
        &params.speed_profile(),
        SpeedModifiers {
            autonomous: mode.autonomous,
            turbo: mode.turbo_active,
            battery_dead: power.is_dead(),
        },
    );
    let terrain = traction.terrain();
    let step = StepParams {
        traction: traction_for(terrain, &TractionTuning::from(&*config), params.resistance),
        speed,
        turn_rate: params.turn_rate,
        wet: terrain.is_wet(),
    };

    locomotion::step(
        &mut pose,
        &mut kin,
        input,
        &step,
        &obstacles.normals(),
        time.delta_secs(),
    );
    *transform = pose.to_transform();
}

/// Freeze the robot when the level completes.
pub fn halt_on_level_complete_system(
    mut completed: MessageReader<LevelCompleted>,
    mut q_robot: Query<(&mut RobotMode, &mut Kinematics), With<Robot>>,
    mut turbo_out: MessageWriter<TurboChanged>,
    mut toggled_out: MessageWriter<AutonomousToggled>,
) {
    if completed.read().count() == 0 {
        return;
    }
    let Ok((mut mode, mut kin)) = q_robot.single_mut() else {
        return;
    };
    mode.halted = true;
    kin.halt();
    if mode.turbo_active {
        mode.turbo_active = false;
        turbo_out.write(TurboChanged { active: false });
    }
    if mode.autonomous {
        mode.autonomous = false;
        toggled_out.write(AutonomousToggled { active: false });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::robot::robot_core;
    use crate::test_support::{manual_time_app, record, seen, tick};
    use crate::traction::TerrainState;
    use crate::upgrades::UpgradeCatalog;

    fn control_app() -> (App, Entity) {
        let mut app = manual_time_app();
        let config = SimConfig::default();
        let catalog = UpgradeCatalog::from_config(&config);
        record::<TurboChanged>(&mut app);
        record::<AutonomousToggled>(&mut app);
        record::<TerrainChanged>(&mut app);
        app.add_message::<SurfaceContact>();
        app.add_message::<LevelCompleted>();
        app.init_resource::<DriveIntent>();
        let robot = app
            .world_mut()
            .spawn(robot_core(&config, &catalog, Vec2::ZERO, 0.0))
            .id();
        app.insert_resource(config);
        app.add_systems(
            Update,
            (
                surface_contact_system,
                autonomous_toggle_system,
                turbo_mode_system,
                terrain_resolve_system,
                drive_system,
                impact_response_system,
                halt_on_level_complete_system,
            )
                .chain(),
        );
        (app, robot)
    }

    fn kin(app: &App, robot: Entity) -> Kinematics {
        *app.world().get::<Kinematics>(robot).unwrap()
    }

    fn pose(app: &App, robot: Entity) -> Pose {
        *app.world().get::<Pose>(robot).unwrap()
    }

    #[test]
    fn dry_forward_moves_at_base_speed() {
        let (mut app, robot) = control_app();
        app.world_mut().resource_mut::<DriveIntent>().forward = 1.0;
        tick(&mut app, 0.02);
        assert!((kin(&app, robot).speed() - 5.0).abs() < 1e-4);
        let t = app.world().get::<Transform>(robot).unwrap();
        assert!((t.translation.y - 0.1).abs() < 1e-4);
    }

    #[test]
    fn dead_battery_crawls_at_a_fifth() {
        let (mut app, robot) = control_app();
        app.world_mut()
            .get_mut::<PowerCell>(robot)
            .unwrap()
            .0
            .apply(-1000.0);
        app.world_mut().resource_mut::<DriveIntent>().forward = 1.0;
        tick(&mut app, 0.02);
        assert!((kin(&app, robot).speed() - 1.0).abs() < 1e-4);
    }

    #[test]
    fn turbo_follows_key_and_boosts_speed() {
        let (mut app, robot) = control_app();
        {
            let mut intent = app.world_mut().resource_mut::<DriveIntent>();
            intent.forward = 1.0;
            intent.turbo_held = true;
        }
        tick(&mut app, 0.02);
        assert!((kin(&app, robot).speed() - 12.5).abs() < 1e-3);
        assert!(app.world().get::<RobotMode>(robot).unwrap().turbo_active);

        app.world_mut().resource_mut::<DriveIntent>().turbo_held = false;
        tick(&mut app, 0.02);
        assert_eq!(
            seen::<TurboChanged>(&app),
            vec![
                TurboChanged { active: true },
                TurboChanged { active: false }
            ]
        );
    }

    #[test]
    fn turbo_is_unavailable_with_a_dead_battery() {
        let (mut app, robot) = control_app();
        app.world_mut()
            .get_mut::<PowerCell>(robot)
            .unwrap()
            .0
            .apply(-1000.0);
        app.world_mut().resource_mut::<DriveIntent>().turbo_held = true;
        tick(&mut app, 0.02);
        assert!(!app.world().get::<RobotMode>(robot).unwrap().turbo_active);
        assert!(seen::<TurboChanged>(&app).is_empty());
    }

    #[test]
    fn autonomous_toggle_halts_and_drops_turbo() {
        let (mut app, robot) = control_app();
        {
            let mut intent = app.world_mut().resource_mut::<DriveIntent>();
            intent.forward = 1.0;
            intent.turbo_held = true;
        }
        tick(&mut app, 0.02);
        app.world_mut().resource_mut::<DriveIntent>().toggle_autonomous = true;
        tick(&mut app, 0.02);

        let mode = *app.world().get::<RobotMode>(robot).unwrap();
        assert!(mode.autonomous);
        assert!(!mode.turbo_active);
        assert!(!app.world().resource::<DriveIntent>().toggle_autonomous);
        assert_eq!(
            seen::<AutonomousToggled>(&app),
            vec![AutonomousToggled { active: true }]
        );
        // Autonomous cruise ignores the held keys.
        assert!((kin(&app, robot).speed() - 2.0).abs() < 1e-4);
    }

    #[test]
    fn manual_wall_contact_deflects_with_damping() {
        let (mut app, robot) = control_app();
        let wall = app.world_mut().spawn_empty().id();
        app.world_mut().get_mut::<Kinematics>(robot).unwrap().velocity = Vec2::new(3.0, 4.0);
        app.world_mut().write_message(SurfaceContact {
            surface: wall,
            kind: SurfaceKind::Obstacle,
            normal: Vec2::NEG_Y,
            phase: ContactPhase::Enter,
        });
        // Hold forward into the wall; the contact normal keeps it out.
        app.world_mut().resource_mut::<DriveIntent>().forward = 1.0;
        let y0 = pose(&app, robot).position.y;
        tick(&mut app, 0.02);
        assert_eq!(
            app.world().get::<ObstacleContacts>(robot).unwrap().normals(),
            vec![Vec2::NEG_Y]
        );
        assert!(pose(&app, robot).position.y <= y0 + 1e-6);
    }

    #[test]
    fn dry_wall_hit_keeps_damped_tangential_velocity() {
        let (mut app, robot) = control_app();
        // Heading -45° points the robot up and to the right, into a wall
        // above it.
        app.world_mut().get_mut::<Pose>(robot).unwrap().heading = (-45.0f32).to_radians();
        {
            let mut intent = app.world_mut().resource_mut::<DriveIntent>();
            intent.forward = 1.0;
            intent.turn = 1.0;
        }
        let wall = app.world_mut().spawn_empty().id();
        app.world_mut().write_message(SurfaceContact {
            surface: wall,
            kind: SurfaceKind::Obstacle,
            normal: Vec2::NEG_Y,
            phase: ContactPhase::Enter,
        });
        tick(&mut app, 0.02);

        let k = kin(&app, robot);
        assert_eq!(k.yaw_rate, 0.0);
        let heading = pose(&app, robot).heading;
        let expected_x = 5.0 * locomotion::forward_dir(heading).x * 0.3;
        assert!((k.velocity.x - expected_x).abs() < 1e-4, "v {}", k.velocity);
        assert!(k.velocity.x > 0.9, "v {}", k.velocity);
        assert!(k.velocity.y.abs() < 1e-5, "v {}", k.velocity);
        assert!(app.world().get::<PendingImpacts>(robot).unwrap().0.is_empty());
    }

    #[test]
    fn floor_contacts_are_ignored() {
        let (mut app, robot) = control_app();
        let floor = app.world_mut().spawn_empty().id();
        app.world_mut().write_message(SurfaceContact {
            surface: floor,
            kind: SurfaceKind::Floor,
            normal: Vec2::Y,
            phase: ContactPhase::Enter,
        });
        tick(&mut app, 0.02);
        assert!(app.world().get::<ObstacleContacts>(robot).unwrap().0.is_empty());
    }

    #[test]
    fn autonomous_contact_bounces_within_range() {
        let (mut app, robot) = control_app();
        app.world_mut().get_mut::<RobotMode>(robot).unwrap().autonomous = true;
        let wall = app.world_mut().spawn_empty().id();
        app.world_mut().write_message(SurfaceContact {
            surface: wall,
            kind: SurfaceKind::Obstacle,
            normal: Vec2::NEG_Y,
            phase: ContactPhase::Enter,
        });
        let before = pose(&app, robot).heading;
        tick(&mut app, 0.02);
        let after = pose(&app, robot).heading;
        let turned = locomotion::wrap_angle(after - before).abs().to_degrees();
        assert!((90.0 - 1e-3..=180.0 + 1e-3).contains(&turned), "turned {turned}");
    }

    #[test]
    fn liquid_without_attachment_is_burdened() {
        let (mut app, robot) = control_app();
        app.world_mut()
            .get_mut::<TractionState>(robot)
            .unwrap()
            .enter_liquid();
        tick(&mut app, 0.02);
        assert_eq!(
            app.world().get::<TractionState>(robot).unwrap().terrain(),
            TerrainState::Burdened
        );
        tick(&mut app, 0.02);
        assert_eq!(
            seen::<TerrainChanged>(&app),
            vec![TerrainChanged {
                from: TerrainState::Dry,
                to: TerrainState::Burdened
            }]
        );
    }

    #[test]
    fn wet_terrain_keeps_momentum() {
        let (mut app, robot) = control_app();
        {
            let world = app.world_mut();
            world.get_mut::<RobotParams>(robot).unwrap().has_attachment = true;
            world.get_mut::<TractionState>(robot).unwrap().enter_liquid();
            world.get_mut::<Kinematics>(robot).unwrap().velocity = Vec2::new(0.0, 3.0);
        }
        tick(&mut app, 0.02);
        let v = kin(&app, robot).velocity;
        // Zero input: drag only, 3 · (1 − 0.5 · 0.02)
        assert!((v.y - 2.97).abs() < 1e-4, "v {v}");
    }

    #[test]
    fn level_completion_halts_for_good() {
        let (mut app, robot) = control_app();
        app.world_mut().get_mut::<RobotMode>(robot).unwrap().autonomous = true;
        app.world_mut().write_message(LevelCompleted {
            reward: 200,
            balance: 400,
        });
        tick(&mut app, 0.02);
        let mode = *app.world().get::<RobotMode>(robot).unwrap();
        assert!(mode.halted);
        assert!(!mode.autonomous);

        app.world_mut().resource_mut::<DriveIntent>().forward = 1.0;
        app.world_mut().resource_mut::<DriveIntent>().toggle_autonomous = true;
        let p = pose(&app, robot).position;
        tick(&mut app, 0.02);
        assert_eq!(kin(&app, robot), Kinematics::default());
        assert_eq!(pose(&app, robot).position, p);
        assert!(!app.world().get::<RobotMode>(robot).unwrap().autonomous);
    }
}
