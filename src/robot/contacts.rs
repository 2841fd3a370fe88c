//! Rapier collision events → domain contact messages.
//!
//! Rapier is only an event source here.  [`collision_event_translation_system`]
//! classifies each `CollisionEvent` by which robot collider took part and what
//! it touched:
//!
//! | Robot side | Other side | Message |
//! |------------|------------|---------|
//! | body | `Zone(Liquid)` / `Zone(Dock)` | [`ZoneContact`] |
//! | intake sensor | `Zone(Collectible)` / `Zone(Trash)` | [`ZoneContact`] |
//! | body | `Surface` | [`SurfaceContact`] with an outward normal |
//!
//! Every other pairing is ignored.  Tests inject the domain messages directly
//! and never need a physics pipeline.

use super::state::{Robot, RobotParams};
use crate::level::{Surface, SurfaceKind, Zone, ZoneKind};
use bevy::prelude::*;
use bevy_rapier2d::prelude::*;

/// Marker for the child sensor whose radius is the intake radius.
#[derive(Component)]
pub struct IntakeSensor;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContactPhase {
    Enter,
    Exit,
}

/// The robot entered or left a trigger volume.
#[derive(Message, Debug, Clone, Copy, PartialEq, Eq)]
pub struct ZoneContact {
    pub zone: Entity,
    pub kind: ZoneKind,
    pub phase: ContactPhase,
}

/// The robot body started or stopped touching a solid surface.
#[derive(Message, Debug, Clone, Copy, PartialEq)]
pub struct SurfaceContact {
    pub surface: Entity,
    pub kind: SurfaceKind,
    /// Unit normal pointing from the surface toward the robot.
    pub normal: Vec2,
    pub phase: ContactPhase,
}

/// Outward normal of an axis-aligned box at `center` as seen from `point`.
///
/// When `point` lies inside the box the face of least penetration wins.
pub fn box_normal(point: Vec2, center: Vec2, half_extents: Vec2) -> Vec2 {
    let closest = point.clamp(center - half_extents, center + half_extents);
    let d = point - closest;
    if d.length_squared() > 1e-8 {
        return d.normalize();
    }
    let offset = point - center;
    let pen_x = half_extents.x - offset.x.abs();
    let pen_y = half_extents.y - offset.y.abs();
    if pen_x < pen_y {
        Vec2::new(if offset.x < 0.0 { -1.0 } else { 1.0 }, 0.0)
    } else {
        Vec2::new(0.0, if offset.y < 0.0 { -1.0 } else { 1.0 })
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum RobotPart {
    Body,
    Intake,
}

/// Translate this frame's Rapier collision events into domain messages.
pub fn collision_event_translation_system(
    mut collisions: MessageReader<CollisionEvent>,
    mut zone_out: MessageWriter<ZoneContact>,
    mut surface_out: MessageWriter<SurfaceContact>,
    q_robot: Query<(Entity, &Transform), With<Robot>>,
    q_intake: Query<(), With<IntakeSensor>>,
    q_zones: Query<&Zone>,
    q_surfaces: Query<(&Surface, &Transform)>,
) {
    let Ok((robot, robot_tf)) = q_robot.single() else {
        return;
    };
    let robot_pos = robot_tf.translation.truncate();

    let part_of = |e: Entity| -> Option<RobotPart> {
        if e == robot {
            Some(RobotPart::Body)
        } else if q_intake.contains(e) {
            Some(RobotPart::Intake)
        } else {
            None
        }
    };

    for event in collisions.read() {
        let (e1, e2, phase) = match event {
            CollisionEvent::Started(e1, e2, _) => (*e1, *e2, ContactPhase::Enter),
            CollisionEvent::Stopped(e1, e2, _) => (*e1, *e2, ContactPhase::Exit),
        };
        let (part, other) = match (part_of(e1), part_of(e2)) {
            (Some(p), None) => (p, e2),
            (None, Some(p)) => (p, e1),
            _ => continue,
        };

        if let Ok(zone) = q_zones.get(other) {
            let wanted = match zone.0 {
                ZoneKind::Liquid | ZoneKind::Dock => RobotPart::Body,
                ZoneKind::Collectible | ZoneKind::Trash => RobotPart::Intake,
            };
            if part == wanted {
                zone_out.write(ZoneContact {
                    zone: other,
                    kind: zone.0,
                    phase,
                });
            }
            continue;
        }

        if part != RobotPart::Body {
            continue;
        }
        if let Ok((surface, tf)) = q_surfaces.get(other) {
            let normal = box_normal(robot_pos, tf.translation.truncate(), surface.half_extents);
            surface_out.write(SurfaceContact {
                surface: other,
                kind: surface.kind,
                normal,
                phase,
            });
        }
    }
}

/// Keep the intake sensor radius in step with the upgraded intake radius.
pub fn sync_intake_radius_system(
    q_robot: Query<(&RobotParams, &Children), (With<Robot>, Changed<RobotParams>)>,
    mut q_intake: Query<&mut Collider, With<IntakeSensor>>,
) {
    for (params, children) in &q_robot {
        for child in children.iter() {
            if let Ok(mut collider) = q_intake.get_mut(child) {
                *collider = Collider::ball(params.intake_radius);
            }
        }
    }
}
