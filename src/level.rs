//! Level layout and the entities it spawns.
//!
//! The room is described by [`LevelLayout`], loaded from `assets/level.toml`
//! the same way [`crate::config::SimConfig`] is.  Spawning produces:
//!
//! | Entity | Components | Collider |
//! |--------|-----------|----------|
//! | wall / furniture | `Surface(Obstacle)` | fixed cuboid |
//! | dust tile | `Zone(Collectible)`, `Collectible` | fixed ball |
//! | trash pile | `Zone(Trash)`, `TrashPile { value }` | fixed ball |
//! | puddle | `Zone(Liquid)`, `Puddle` | sensor ball |
//! | charging dock | `Zone(Dock)`, `ChargingDock` | sensor cuboid |
//!
//! Dust and trash are solid fixed colliders rather than sensors: the robot's
//! intake is itself a sensor, and it is the sensor side of the pair that
//! reports the overlap.  The robot body is kinematic, so it is never pushed
//! by them.
//!
//! Everything carries [`LevelEntity`] so a reload can sweep it.

use crate::config::SimConfig;
use crate::tank::ContinuousIntake;
use bevy::prelude::*;
use bevy_rapier2d::prelude::*;
use rand::Rng;
use serde::Deserialize;

/// Default location of the level file.
pub const LEVEL_LAYOUT_PATH: &str = "assets/level.toml";

// ── Components ────────────────────────────────────────────────────────────────

/// Marker for everything owned by the current level.
#[derive(Component)]
pub struct LevelEntity;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ZoneKind {
    /// Open liquid; also a puddle to absorb.
    Liquid,
    /// Charging dock; services both tanks.
    Dock,
    /// Dust picked up by the intake into the collection tank.
    Collectible,
    /// Trash swept up by the intake; pays coins, takes no tank space.
    Trash,
}

/// Trigger volume the robot can be inside.
#[derive(Component, Debug, Clone, Copy, PartialEq, Eq)]
pub struct Zone(pub ZoneKind);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SurfaceKind {
    /// Ignored by the collision response.
    Floor,
    Obstacle,
}

/// Solid axis-aligned box.
#[derive(Component, Debug, Clone, Copy, PartialEq)]
pub struct Surface {
    pub kind: SurfaceKind,
    pub half_extents: Vec2,
}

/// A dust tile worth one collection unit.  Counted by the level objectives
/// and revealed by the scanner.
#[derive(Component, Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Collectible;

/// A trash pile worth `value` coins.
#[derive(Component, Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrashPile {
    pub value: u32,
}

/// A liquid volume absorbed by staying in it.
#[derive(Component, Debug, Default, Clone, Copy, PartialEq)]
pub struct Puddle {
    pub intake: ContinuousIntake,
    pub radius: f32,
}

#[derive(Component)]
pub struct ChargingDock;

// ── Layout ────────────────────────────────────────────────────────────────────

/// Axis-aligned box in world units.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct BoxSpec {
    pub center: [f32; 2],
    pub half_extents: [f32; 2],
}

impl BoxSpec {
    pub fn center(&self) -> Vec2 {
        Vec2::from(self.center)
    }

    pub fn half_extents(&self) -> Vec2 {
        Vec2::from(self.half_extents)
    }

    pub fn contains(&self, p: Vec2) -> bool {
        let d = (p - self.center()).abs();
        d.x <= self.half_extents[0] && d.y <= self.half_extents[1]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct PuddleSpec {
    pub center: [f32; 2],
    pub radius: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct DustGridSpec {
    pub center: [f32; 2],
    /// Tiles per side.
    pub size: u32,
    pub tile: f32,
}

impl Default for DustGridSpec {
    fn default() -> Self {
        Self {
            center: [0.0, 0.0],
            size: crate::constants::DUST_GRID_SIZE,
            tile: crate::constants::DUST_TILE_SIZE,
        }
    }
}

#[derive(Resource, Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct LevelLayout {
    /// Interior half-size of the room.
    pub room_half_extents: [f32; 2],
    pub wall_thickness: f32,
    /// Furniture inside the room.
    pub obstacles: Vec<BoxSpec>,
    pub dust_grid: DustGridSpec,
    pub trash_piles: u32,
    pub puddles: Vec<PuddleSpec>,
    pub dock: BoxSpec,
    pub robot_heading_deg: f32,
}

impl Default for LevelLayout {
    fn default() -> Self {
        Self {
            room_half_extents: [7.0, 7.5],
            wall_thickness: 0.5,
            obstacles: vec![BoxSpec {
                center: [5.5, -5.5],
                half_extents: [0.75, 0.75],
            }],
            dust_grid: DustGridSpec::default(),
            trash_piles: crate::constants::TRASH_PILE_COUNT,
            puddles: vec![
                PuddleSpec {
                    center: [3.5, 3.0],
                    radius: 1.0,
                },
                PuddleSpec {
                    center: [-4.0, 1.5],
                    radius: 0.8,
                },
            ],
            dock: BoxSpec {
                center: [0.0, -6.25],
                half_extents: [1.0, 0.75],
            },
            robot_heading_deg: 0.0,
        }
    }
}

impl LevelLayout {
    pub fn from_toml_str(contents: &str) -> Result<Self, String> {
        toml::from_str::<LevelLayout>(contents).map_err(|e| e.to_string())
    }

    /// The robot starts on the dock centre.
    pub fn robot_start(&self) -> Vec2 {
        self.dock.center()
    }

    /// The four room walls, outside the interior.
    pub fn walls(&self) -> [BoxSpec; 4] {
        let [hx, hy] = self.room_half_extents;
        let t = self.wall_thickness * 0.5;
        [
            BoxSpec {
                center: [0.0, hy + t],
                half_extents: [hx + 2.0 * t, t],
            },
            BoxSpec {
                center: [0.0, -hy - t],
                half_extents: [hx + 2.0 * t, t],
            },
            BoxSpec {
                center: [hx + t, 0.0],
                half_extents: [t, hy],
            },
            BoxSpec {
                center: [-hx - t, 0.0],
                half_extents: [t, hy],
            },
        ]
    }

    fn blocked(&self, p: Vec2, margin: f32) -> bool {
        let grow = |b: &BoxSpec| BoxSpec {
            center: b.center,
            half_extents: [b.half_extents[0] + margin, b.half_extents[1] + margin],
        };
        grow(&self.dock).contains(p)
            || self.obstacles.iter().any(|o| grow(o).contains(p))
            || self
                .puddles
                .iter()
                .any(|pd| p.distance(Vec2::from(pd.center)) <= pd.radius + margin)
    }

    /// Dust tile centres: the grid minus tiles on the dock, furniture or puddles.
    pub fn dust_positions(&self) -> Vec<Vec2> {
        let grid = &self.dust_grid;
        let origin = Vec2::from(grid.center) - Vec2::splat((grid.size as f32 - 1.0) * grid.tile * 0.5);
        let mut out = Vec::with_capacity((grid.size * grid.size) as usize);
        for ix in 0..grid.size {
            for iy in 0..grid.size {
                let p = origin + Vec2::new(ix as f32, iy as f32) * grid.tile;
                if !self.blocked(p, 0.0) {
                    out.push(p);
                }
            }
        }
        out
    }

    /// Random free floor position for a trash pile.
    pub fn scatter_position(&self, rng: &mut impl Rng) -> Vec2 {
        let [hx, hy] = self.room_half_extents;
        let margin = 0.75;
        let mut p = Vec2::ZERO;
        for _ in 0..32 {
            p = Vec2::new(
                rng.gen_range(-hx + margin..hx - margin),
                rng.gen_range(-hy + margin..hy - margin),
            );
            if !self.blocked(p, 0.5) {
                break;
            }
        }
        p
    }
}

/// Startup system: load `assets/level.toml` over the default layout.
pub fn load_level_layout(mut layout: ResMut<LevelLayout>) {
    let path = LEVEL_LAYOUT_PATH;
    match std::fs::read_to_string(path) {
        Ok(contents) => match LevelLayout::from_toml_str(&contents) {
            Ok(loaded) => {
                *layout = loaded;
                println!("✓ Loaded level layout from {path}");
            }
            Err(e) => {
                eprintln!("⚠ Failed to parse {path}: {e}; using default room");
            }
        },
        Err(_) => {
            println!("ℹ No {path} found; using default room");
        }
    }
}

// ── Spawning ──────────────────────────────────────────────────────────────────

fn spawn_obstacle(commands: &mut Commands, bounds: &BoxSpec) {
    let he = bounds.half_extents();
    commands.spawn((
        LevelEntity,
        Surface {
            kind: SurfaceKind::Obstacle,
            half_extents: he,
        },
        Transform::from_translation(bounds.center().extend(0.0)),
        RigidBody::Fixed,
        Collider::cuboid(he.x, he.y),
    ));
}

/// A dust tile at `pos`.
pub fn spawn_dust(commands: &mut Commands, pos: Vec2, radius: f32) -> Entity {
    commands
        .spawn((
            LevelEntity,
            Zone(ZoneKind::Collectible),
            Collectible,
            Transform::from_translation(pos.extend(0.1)),
            RigidBody::Fixed,
            Collider::ball(radius),
        ))
        .id()
}

/// A trash pile at `pos` paying `value` coins.
pub fn spawn_trash(commands: &mut Commands, pos: Vec2, value: u32) -> Entity {
    commands
        .spawn((
            LevelEntity,
            Zone(ZoneKind::Trash),
            TrashPile { value },
            Transform::from_translation(pos.extend(0.1)),
            RigidBody::Fixed,
            Collider::ball(0.3),
        ))
        .id()
}

/// Spawn the whole room described by `layout`.
pub fn spawn_level(
    commands: &mut Commands,
    layout: &LevelLayout,
    config: &SimConfig,
    rng: &mut impl Rng,
) {
    for wall in layout.walls().iter().chain(layout.obstacles.iter()) {
        spawn_obstacle(commands, wall);
    }

    let dust_radius = layout.dust_grid.tile * 0.25;
    let dust = layout.dust_positions();
    for p in &dust {
        spawn_dust(commands, *p, dust_radius);
    }
    for _ in 0..layout.trash_piles {
        let p = layout.scatter_position(rng);
        spawn_trash(commands, p, config.trash_value);
    }

    for puddle in &layout.puddles {
        commands.spawn((
            LevelEntity,
            Zone(ZoneKind::Liquid),
            Puddle {
                intake: ContinuousIntake::default(),
                radius: puddle.radius,
            },
            Transform::from_translation(Vec2::from(puddle.center).extend(0.05)),
            Collider::ball(puddle.radius),
            Sensor,
        ));
    }

    let he = layout.dock.half_extents();
    commands.spawn((
        LevelEntity,
        Zone(ZoneKind::Dock),
        ChargingDock,
        Transform::from_translation(layout.dock.center().extend(0.02)),
        Collider::cuboid(he.x, he.y),
        Sensor,
    ));

    info!(
        "[level] spawned {} dust tiles, {} trash piles, {} puddles",
        dust.len(),
        layout.trash_piles,
        layout.puddles.len()
    );
}

/// Startup / reload system wrapper around [`spawn_level`].
pub fn spawn_level_system(
    mut commands: Commands,
    layout: Res<LevelLayout>,
    config: Res<SimConfig>,
) {
    let mut rng = rand::thread_rng();
    spawn_level(&mut commands, &layout, &config, &mut rng);
}

/// Remove every level entity (including the robot).
pub fn despawn_level_system(mut commands: Commands, q: Query<Entity, With<LevelEntity>>) {
    for entity in &q {
        commands.entity(entity).despawn();
    }
}
