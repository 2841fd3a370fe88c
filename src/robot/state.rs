//! Robot components, resources and messages.
//!
//! All ECS components and Bevy resources that describe robot state live here.
//! Systems that mutate this state are in the sibling modules:
//! - [`super::contacts`]: Rapier collision events into domain contact messages
//! - [`super::control`]: modes, terrain resolution and the locomotion step
//! - [`super::tanks`]: power cell, collection tank, pickups and puddles

use crate::config::SimConfig;
use crate::locomotion::SpeedProfile;
use crate::tank::{Tank, TankTransition};
use bevy::prelude::*;

// ── Components ─────────────────────────────────────────────────────────────────

/// Marker component for the robot entity.
#[derive(Component)]
pub struct Robot;

/// Upgrade-adjusted parameters of the robot.
///
/// Built once at spawn from the purchased levels and afterwards changed only
/// by [`crate::upgrades::apply_track_effect`].
#[derive(Component, Debug, Clone, PartialEq)]
pub struct RobotParams {
    pub base_speed: f32,
    /// Yaw rate at full turn input (rad/s).
    pub turn_rate: f32,
    pub idle_speed: f32,
    pub turbo_multiplier: f32,
    pub low_power_multiplier: f32,
    pub intake_radius: f32,
    /// Burden resistance level.
    pub resistance: u32,
    pub has_attachment: bool,
    /// `None` while the scanner has not been bought.
    pub scanner_range: Option<f32>,
}

impl RobotParams {
    /// Level-0 parameters.
    pub fn base(config: &SimConfig) -> Self {
        Self {
            base_speed: config.base_speed,
            turn_rate: config.turn_rate(),
            idle_speed: config.idle_speed,
            turbo_multiplier: config.turbo_speed_multiplier,
            low_power_multiplier: config.low_power_multiplier,
            intake_radius: config.intake_radius,
            resistance: 0,
            has_attachment: false,
            scanner_range: None,
        }
    }

    pub fn speed_profile(&self) -> SpeedProfile {
        SpeedProfile {
            base_speed: self.base_speed,
            idle_speed: self.idle_speed,
            turbo_multiplier: self.turbo_multiplier,
            low_power_multiplier: self.low_power_multiplier,
        }
    }
}

/// Battery; drains while moving, charges on the dock.
#[derive(Component, Debug, Clone, PartialEq)]
pub struct PowerCell(pub Tank);

impl PowerCell {
    #[inline]
    pub fn is_dead(&self) -> bool {
        self.0.level() <= 0.0
    }
}

/// Dust and liquid store; fills from pickups, empties on the dock.
#[derive(Component, Debug, Clone, PartialEq)]
pub struct CollectionTank(pub Tank);

/// Behavioural modes of the robot.
///
/// `turbo_active` is only ever true while turbo is held, power remains and
/// the robot is under manual control.
#[derive(Component, Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RobotMode {
    pub autonomous: bool,
    pub turbo_active: bool,
    /// Set on level completion; no input is accepted afterwards.
    pub halted: bool,
}

/// Charging-dock overlap counter.
#[derive(Component, Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DockState {
    pub contacts: u32,
}

impl DockState {
    #[inline]
    pub fn docked(&self) -> bool {
        self.contacts > 0
    }
}

/// Obstacles currently touched and their outward normals.
#[derive(Component, Debug, Default, Clone, PartialEq)]
pub struct ObstacleContacts(pub Vec<(Entity, Vec2)>);

impl ObstacleContacts {
    pub fn insert(&mut self, entity: Entity, normal: Vec2) {
        match self.0.iter_mut().find(|(e, _)| *e == entity) {
            Some(slot) => slot.1 = normal,
            None => self.0.push((entity, normal)),
        }
    }

    pub fn remove(&mut self, entity: Entity) {
        self.0.retain(|(e, _)| *e != entity);
    }

    pub fn normals(&self) -> Vec<Vec2> {
        self.0.iter().map(|(_, n)| *n).collect()
    }
}

/// Outward normals of obstacles hit this step, awaiting the contact response.
#[derive(Component, Debug, Default, Clone, PartialEq)]
pub struct PendingImpacts(pub Vec<Vec2>);

/// Dust and trash currently overlapping the intake sensor, oldest first.
#[derive(Component, Debug, Default, Clone, PartialEq, Eq)]
pub struct IntakeContacts(pub Vec<Entity>);

impl IntakeContacts {
    pub fn add(&mut self, entity: Entity) {
        if !self.0.contains(&entity) {
            self.0.push(entity);
        }
    }

    pub fn remove(&mut self, entity: Entity) {
        self.0.retain(|e| *e != entity);
    }
}

// ── Input Abstraction ──────────────────────────────────────────────────────────

/// Aggregated driver intent, derived from the keyboard.
///
/// The keyboard system overwrites the axes every frame and latches the
/// one-shot buttons; the fixed-step systems consume the latches.  Tests can
/// populate this directly to drive the robot without a real input device.
#[derive(Resource, Default, Debug, Clone, Copy, PartialEq)]
pub struct DriveIntent {
    /// `-1.0` full reverse … `1.0` full forward.
    pub forward: f32,
    /// Positive turns counter-clockwise (left).
    pub turn: f32,
    pub turbo_held: bool,
    /// One-shot: flip autonomous mode.
    pub toggle_autonomous: bool,
    /// One-shot: the interact button.
    pub interact: bool,
}

// ── Messages ───────────────────────────────────────────────────────────────────

/// Turbo switched on or off.
#[derive(Message, Debug, Clone, Copy, PartialEq, Eq)]
pub struct TurboChanged {
    pub active: bool,
}

/// Autonomous mode switched on or off.
#[derive(Message, Debug, Clone, Copy, PartialEq, Eq)]
pub struct AutonomousToggled {
    pub active: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TankKind {
    Power,
    Collection,
}

/// A tank crossed a boundary.
#[derive(Message, Debug, Clone, Copy, PartialEq, Eq)]
pub struct TankChanged {
    pub tank: TankKind,
    pub transition: TankTransition,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_params_mirror_config() {
        let config = SimConfig::default();
        let params = RobotParams::base(&config);
        assert_eq!(params.base_speed, config.base_speed);
        assert!((params.turn_rate - config.turn_rate_deg.to_radians()).abs() < 1e-6);
        assert_eq!(params.scanner_range, None);
        assert!(!params.has_attachment);
    }

    #[test]
    fn obstacle_contacts_replace_and_remove_by_entity() {
        let mut world = World::new();
        let a = world.spawn_empty().id();
        let b = world.spawn_empty().id();
        let mut contacts = ObstacleContacts::default();
        contacts.insert(a, Vec2::X);
        contacts.insert(b, Vec2::Y);
        contacts.insert(a, Vec2::NEG_X);
        assert_eq!(contacts.normals(), vec![Vec2::NEG_X, Vec2::Y]);
        contacts.remove(a);
        assert_eq!(contacts.normals(), vec![Vec2::Y]);
    }
}
