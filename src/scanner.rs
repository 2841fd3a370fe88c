//! Pulse scanner: expanding rings that briefly highlight nearby collectibles.
//!
//! [`PulseScanner`] is plain state advanced by [`PulseScanner::update`]; it
//! knows nothing about the ECS beyond entity ids.  [`scanner_system`] feeds it
//! the robot position and collectible positions each fixed step and mirrors
//! its events onto the [`Highlighted`] marker.

use crate::config::SimConfig;
use crate::level::Collectible;
use crate::robot::{Robot, RobotParams};
use bevy::prelude::*;

/// Marker on collectibles currently lit by a pulse.
#[derive(Component, Debug, Default, Clone, Copy)]
pub struct Highlighted;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanEvent {
    PulseFired,
    Highlighted(Entity),
    HighlightExpired(Entity),
}

#[derive(Debug, Clone, PartialEq)]
struct Ring {
    radius: f32,
    /// Entities this ring has already lit.
    flagged: Vec<Entity>,
}

#[derive(Component, Debug, Clone, PartialEq)]
pub struct PulseScanner {
    range: Option<f32>,
    interval: f32,
    wave_speed: f32,
    ring_thickness: f32,
    highlight_duration: f32,
    /// Seconds until the next pulse; `0` fires on the next update.
    next_pulse_in: f32,
    rings: Vec<Ring>,
    highlights: Vec<(Entity, f32)>,
}

impl PulseScanner {
    /// An inactive scanner tuned from `config`.
    pub fn new(config: &SimConfig) -> Self {
        Self {
            range: None,
            interval: config.scan_interval,
            wave_speed: config.wave_speed,
            ring_thickness: config.ring_thickness,
            highlight_duration: config.highlight_duration,
            next_pulse_in: 0.0,
            rings: Vec::new(),
            highlights: Vec::new(),
        }
    }

    #[inline]
    pub fn range(&self) -> Option<f32> {
        self.range
    }

    #[inline]
    pub fn is_active(&self) -> bool {
        self.range.is_some()
    }

    /// Current ring radii, for drawing.
    pub fn ring_radii(&self) -> impl Iterator<Item = f32> + '_ {
        self.rings.iter().map(|r| r.radius)
    }

    pub fn is_highlighted(&self, entity: Entity) -> bool {
        self.highlights.iter().any(|(e, _)| *e == entity)
    }

    /// Seconds left on `entity`'s highlight, if it is lit.
    pub fn highlight_remaining(&self, entity: Entity) -> Option<f32> {
        self.highlights
            .iter()
            .find(|(e, _)| *e == entity)
            .map(|(_, t)| *t)
    }

    pub fn highlight_count(&self) -> usize {
        self.highlights.len()
    }

    /// Change the range.  Turning the scanner on schedules an immediate
    /// pulse; turning it off drops rings in flight.
    pub fn set_range(&mut self, range: Option<f32>) {
        match (self.range, range) {
            (None, Some(_)) => self.next_pulse_in = 0.0,
            (Some(_), None) => self.rings.clear(),
            _ => {}
        }
        self.range = range;
    }

    /// Drop any highlight on `entity` without reporting it.
    pub fn forget(&mut self, entity: Entity) {
        self.highlights.retain(|(e, _)| *e != entity);
    }

    /// Advance by `dt`.  `targets` are the candidate entities and positions.
    pub fn update(
        &mut self,
        dt: f32,
        origin: Vec2,
        targets: impl IntoIterator<Item = (Entity, Vec2)>,
    ) -> Vec<ScanEvent> {
        let mut events = Vec::new();

        // Expiry runs first so a refresh in the same step survives.
        self.highlights.retain_mut(|(e, t)| {
            *t -= dt;
            if *t <= 0.0 {
                events.push(ScanEvent::HighlightExpired(*e));
                false
            } else {
                true
            }
        });

        let Some(range) = self.range else {
            return events;
        };

        for ring in &mut self.rings {
            ring.radius += self.wave_speed * dt;
        }
        let thickness = self.ring_thickness;
        self.rings.retain(|r| r.radius <= range + thickness);

        if self.next_pulse_in <= 0.0 {
            self.rings.push(Ring {
                radius: 0.0,
                flagged: Vec::new(),
            });
            self.next_pulse_in += self.interval.max(f32::EPSILON);
            if self.next_pulse_in <= 0.0 {
                self.next_pulse_in = self.interval.max(f32::EPSILON);
            }
            events.push(ScanEvent::PulseFired);
        }
        self.next_pulse_in -= dt;

        if self.rings.is_empty() {
            return events;
        }
        for (entity, pos) in targets {
            let d = pos.distance(origin);
            if d > range + thickness {
                continue;
            }
            for ring in &mut self.rings {
                if (d - ring.radius).abs() <= thickness && !ring.flagged.contains(&entity) {
                    ring.flagged.push(entity);
                    // A re-hit restarts the full highlight.
                    match self.highlights.iter_mut().find(|(e, _)| *e == entity) {
                        Some(slot) => slot.1 = self.highlight_duration,
                        None => self.highlights.push((entity, self.highlight_duration)),
                    }
                    events.push(ScanEvent::Highlighted(entity));
                }
            }
        }
        events
    }
}

/// Advance the robot's scanner and mirror highlights onto collectibles.
pub fn scanner_system(
    mut commands: Commands,
    time: Res<Time>,
    mut q_robot: Query<(&Transform, &RobotParams, &mut PulseScanner), With<Robot>>,
    q_targets: Query<(Entity, &Transform), With<Collectible>>,
) {
    let Ok((tf, params, mut scanner)) = q_robot.single_mut() else {
        return;
    };
    if scanner.range() != params.scanner_range {
        scanner.set_range(params.scanner_range);
    }

    let origin = tf.translation.truncate();
    let targets = q_targets
        .iter()
        .map(|(e, t)| (e, t.translation.truncate()));
    for event in scanner.update(time.delta_secs(), origin, targets) {
        match event {
            ScanEvent::PulseFired => debug!("[scanner] pulse"),
            ScanEvent::Highlighted(e) => match commands.get_entity(e) {
                Ok(mut ec) => {
                    ec.try_insert(Highlighted);
                }
                Err(_) => scanner.forget(e),
            },
            ScanEvent::HighlightExpired(e) => {
                if let Ok(mut ec) = commands.get_entity(e) {
                    ec.try_remove::<Highlighted>();
                }
            }
        }
    }
}
