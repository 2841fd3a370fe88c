//! Planar velocity-driven locomotion.
//!
//! The robot is not a rigid body.  Each fixed step [`step`] turns the
//! (slip-attenuated) drive input into a yaw change and a new velocity, then
//! advances the pose.  Dry floor snaps velocity to the commanded value;
//! wet terrain keeps velocity between steps, bleeds it through drag and
//! accelerates toward the commanded direction.
//!
//! Heading 0 faces world +Y and positive heading turns counter-clockwise,
//! matching `Transform::rotation` about Z.

use crate::traction::Traction;
use bevy::prelude::*;
use rand::Rng;

// ── Components ────────────────────────────────────────────────────────────────

#[derive(Component, Debug, Default, Clone, Copy, PartialEq)]
pub struct Pose {
    pub position: Vec2,
    /// Radians, wrapped to `(-π, π]`.
    pub heading: f32,
}

impl Pose {
    pub fn new(position: Vec2, heading: f32) -> Self {
        Self {
            position,
            heading: wrap_angle(heading),
        }
    }

    #[inline]
    pub fn forward(&self) -> Vec2 {
        forward_dir(self.heading)
    }

    pub fn to_transform(self) -> Transform {
        Transform::from_translation(self.position.extend(0.0))
            .with_rotation(Quat::from_rotation_z(self.heading))
    }
}

#[derive(Component, Debug, Default, Clone, Copy, PartialEq)]
pub struct Kinematics {
    pub velocity: Vec2,
    pub yaw_rate: f32,
}

impl Kinematics {
    pub fn halt(&mut self) {
        self.velocity = Vec2::ZERO;
        self.yaw_rate = 0.0;
    }

    #[inline]
    pub fn speed(&self) -> f32 {
        self.velocity.length()
    }
}

// ── Inputs ────────────────────────────────────────────────────────────────────

/// Drive input for one step, each axis in `[-1, 1]`.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct DriveInput {
    pub forward: f32,
    /// Positive turns counter-clockwise.
    pub turn: f32,
}

impl DriveInput {
    pub fn new(forward: f32, turn: f32) -> Self {
        Self {
            forward: forward.clamp(-1.0, 1.0),
            turn: turn.clamp(-1.0, 1.0),
        }
    }

    /// Input after terrain slip.
    pub fn attenuated(self, slip: f32) -> Self {
        let keep = 1.0 - slip.clamp(0.0, 1.0);
        Self {
            forward: self.forward * keep,
            turn: self.turn * keep,
        }
    }
}

/// Speed modifiers in effect this step.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct SpeedModifiers {
    pub autonomous: bool,
    pub turbo: bool,
    pub battery_dead: bool,
}

/// Speed limits that feed [`input_speed`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpeedProfile {
    pub base_speed: f32,
    pub idle_speed: f32,
    pub turbo_multiplier: f32,
    pub low_power_multiplier: f32,
}

/// Commanded top speed for this step.
///
/// Autonomous mode replaces the base speed with the idle speed and never
/// turbos; the dead-battery penalty applies on top of either.
pub fn input_speed(profile: &SpeedProfile, mods: SpeedModifiers) -> f32 {
    let mut speed = if mods.autonomous {
        profile.idle_speed
    } else {
        profile.base_speed
    };
    if mods.turbo && !mods.autonomous && !mods.battery_dead {
        speed *= profile.turbo_multiplier;
    }
    if mods.battery_dead {
        speed *= profile.low_power_multiplier;
    }
    speed
}

// ── Integration ───────────────────────────────────────────────────────────────

/// Unit vector the robot faces at `heading`.
#[inline]
pub fn forward_dir(heading: f32) -> Vec2 {
    Vec2::new(-heading.sin(), heading.cos())
}

/// Wrap to `(-π, π]`.
pub fn wrap_angle(angle: f32) -> f32 {
    use std::f32::consts::{PI, TAU};
    let mut a = angle.rem_euclid(TAU);
    if a > PI {
        a -= TAU;
    }
    a
}

/// Per-step parameters resolved from terrain, upgrades and modes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StepParams {
    pub traction: Traction,
    /// Commanded top speed, see [`input_speed`].
    pub speed: f32,
    /// Yaw rate at full turn input (rad/s).
    pub turn_rate: f32,
    /// Inertial integration (any terrain but dry floor).
    pub wet: bool,
}

/// Advance one fixed step.
///
/// `contact_normals` are the outward normals of obstacles currently touched;
/// velocity into any of them is removed before the pose moves, so the robot
/// slides along walls instead of passing through.
pub fn step(
    pose: &mut Pose,
    kin: &mut Kinematics,
    input: DriveInput,
    params: &StepParams,
    contact_normals: &[Vec2],
    dt: f32,
) {
    let input = input.attenuated(params.traction.slip);

    kin.yaw_rate = input.turn * params.turn_rate;
    pose.heading = wrap_angle(pose.heading + kin.yaw_rate * dt);

    let dir = forward_dir(pose.heading);
    if params.wet {
        kin.velocity *= (1.0 - params.traction.drag * dt).max(0.0);
        kin.velocity += dir * input.forward * params.speed * dt;
        kin.velocity = kin.velocity.clamp_length_max(params.speed.max(0.0));
    } else {
        kin.velocity = dir * input.forward * params.speed;
    }

    for n in contact_normals {
        let into = kin.velocity.dot(*n);
        if into < 0.0 {
            kin.velocity -= *n * into;
        }
    }

    pose.position += kin.velocity * dt;
}

// ── Collision response ────────────────────────────────────────────────────────

/// Response to a non-floor contact in manual mode: spin stops and velocity
/// keeps only a damped share of its wall-tangential component.
pub fn deflect(kin: &mut Kinematics, normal: Vec2, damping: f32) {
    kin.yaw_rate = 0.0;
    let n = normal.normalize_or_zero();
    let tangential = kin.velocity - n * kin.velocity.dot(n);
    kin.velocity = tangential * damping;
}

/// Response to a non-floor contact in autonomous mode: turn away by a random
/// angle in `±[min_deg, max_deg]` and stop.  Returns the signed turn applied.
pub fn bounce(
    pose: &mut Pose,
    kin: &mut Kinematics,
    rng: &mut impl Rng,
    min_deg: f32,
    max_deg: f32,
) -> f32 {
    let (lo, hi) = if min_deg <= max_deg {
        (min_deg, max_deg)
    } else {
        (max_deg, min_deg)
    };
    let magnitude = rng.gen_range(lo..=hi).to_radians();
    let turn = if rng.gen_bool(0.5) {
        magnitude
    } else {
        -magnitude
    };
    pose.heading = wrap_angle(pose.heading + turn);
    kin.halt();
    turn
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traction::{traction_for, TerrainState, TractionTuning};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    const DT: f32 = 0.02;

    fn profile() -> SpeedProfile {
        SpeedProfile {
            base_speed: 5.0,
            idle_speed: 2.0,
            turbo_multiplier: 2.5,
            low_power_multiplier: 0.2,
        }
    }

    fn run(pose: &mut Pose, kin: &mut Kinematics, input: DriveInput, terrain: TerrainState, speed: f32) {
        let params = StepParams {
            traction: traction_for(terrain, &TractionTuning::default(), 0),
            speed,
            turn_rate: 100f32.to_radians(),
            wet: terrain.is_wet(),
        };
        step(pose, kin, input, &params, &[], DT);
    }

    #[test]
    fn dead_battery_on_dry_floor_moves_at_penalised_speed() {
        let p = profile();
        let speed = input_speed(
            &p,
            SpeedModifiers {
                battery_dead: true,
                ..Default::default()
            },
        );
        let mut pose = Pose::default();
        let mut kin = Kinematics::default();
        run(&mut pose, &mut kin, DriveInput::new(1.0, 0.0), TerrainState::Dry, speed);
        assert!((kin.speed() - p.base_speed * p.low_power_multiplier).abs() < 1e-5);
    }

    #[test]
    fn turbo_multiplies_speed_but_not_in_autonomous_mode() {
        let p = profile();
        let turbo = input_speed(
            &p,
            SpeedModifiers {
                turbo: true,
                ..Default::default()
            },
        );
        assert!((turbo - 12.5).abs() < 1e-5);
        let auto = input_speed(
            &p,
            SpeedModifiers {
                turbo: true,
                autonomous: true,
                ..Default::default()
            },
        );
        assert!((auto - p.idle_speed).abs() < 1e-6);
    }

    #[test]
    fn dry_floor_halts_instantly_on_zero_input() {
        let mut pose = Pose::default();
        let mut kin = Kinematics {
            velocity: Vec2::new(0.0, 5.0),
            yaw_rate: 1.0,
        };
        run(&mut pose, &mut kin, DriveInput::default(), TerrainState::Dry, 5.0);
        assert_eq!(kin.velocity, Vec2::ZERO);
        assert_eq!(kin.yaw_rate, 0.0);
    }

    #[test]
    fn liquid_decelerates_under_drag_on_zero_input() {
        let mut pose = Pose::default();
        let mut kin = Kinematics {
            velocity: Vec2::new(0.0, 4.0),
            yaw_rate: 0.0,
        };
        run(&mut pose, &mut kin, DriveInput::default(), TerrainState::Liquid, 5.0);
        let expected = 4.0 * (1.0 - 0.5 * DT);
        assert!((kin.velocity.y - expected).abs() < 1e-5);
        assert!(pose.position.y > 0.0, "robot keeps coasting");
    }

    #[test]
    fn wet_velocity_is_clamped_to_input_speed() {
        let mut pose = Pose::default();
        let mut kin = Kinematics {
            velocity: Vec2::new(0.0, 50.0),
            yaw_rate: 0.0,
        };
        run(&mut pose, &mut kin, DriveInput::new(1.0, 0.0), TerrainState::Liquid, 5.0);
        assert!(kin.speed() <= 5.0 + 1e-5);
    }

    #[test]
    fn slip_attenuates_turning_in_liquid() {
        let mut dry_pose = Pose::default();
        let mut wet_pose = Pose::default();
        let mut kin = Kinematics::default();
        run(&mut dry_pose, &mut kin, DriveInput::new(0.0, 1.0), TerrainState::Dry, 5.0);
        run(&mut wet_pose, &mut kin, DriveInput::new(0.0, 1.0), TerrainState::Liquid, 5.0);
        assert!((wet_pose.heading - dry_pose.heading * 0.7).abs() < 1e-6);
    }

    #[test]
    fn contact_normal_blocks_motion_into_wall() {
        let mut pose = Pose::default();
        let mut kin = Kinematics::default();
        step(
            &mut pose,
            &mut kin,
            DriveInput::new(1.0, 0.0),
            &StepParams {
                traction: Traction::DRY,
                speed: 5.0,
                turn_rate: 1.0,
                wet: false,
            },
            &[Vec2::NEG_Y],
            DT,
        );
        assert!(kin.velocity.y.abs() < 1e-6);
        assert!(pose.position.y.abs() < 1e-6);
    }

    #[test]
    fn deflect_projects_onto_wall_plane_and_stops_spin() {
        let mut kin = Kinematics {
            velocity: Vec2::new(3.0, -4.0),
            yaw_rate: 2.0,
        };
        deflect(&mut kin, Vec2::Y, 0.3);
        assert_eq!(kin.yaw_rate, 0.0);
        assert!((kin.velocity - Vec2::new(0.9, 0.0)).length() < 1e-6);
    }

    #[test]
    fn bounce_turns_between_ninety_and_one_eighty_degrees() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..200 {
            let mut pose = Pose::new(Vec2::ZERO, 0.3);
            let mut kin = Kinematics {
                velocity: Vec2::ONE,
                yaw_rate: 1.0,
            };
            let turn = bounce(&mut pose, &mut kin, &mut rng, 90.0, 180.0);
            let deg = turn.abs().to_degrees();
            assert!((90.0 - 1e-3..=180.0 + 1e-3).contains(&deg), "{deg}");
            assert_eq!(kin, Kinematics::default());
        }
    }

    #[test]
    fn wrap_angle_stays_in_half_open_range() {
        use std::f32::consts::PI;
        for a in [-7.0, -PI, 0.0, PI, 3.5, 12.0] {
            let w = wrap_angle(a);
            assert!(w > -PI - 1e-6 && w <= PI + 1e-6, "{a} -> {w}");
        }
    }
}
