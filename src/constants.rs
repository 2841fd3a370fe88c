//! Centralised locomotion, tank, economy and scanner constants.
//!
//! All tuneable values live here so they can be found, reasoned-about, and
//! modified in one place without source-diving across multiple modules.
//! [`crate::config::SimConfig::default`] mirrors every value below, and
//! `assets/dustbot.toml` may override any subset at startup.
//!
//! ## Tuning guidance
//!
//! Each constant notes the observable consequence of changing it.  After
//! editing, run `cargo test` to confirm the traction and tank behaviour has
//! not regressed.

// ── Simulation Clock ──────────────────────────────────────────────────────────

/// Rate of the `FixedUpdate` schedule that drives every core state transition.
pub const FIXED_HZ: f64 = 50.0;

// ── Locomotion ────────────────────────────────────────────────────────────────

/// Top speed on dry floor at speed level 0 (world units / second).
pub const BASE_SPEED: f32 = 5.0;

/// Maximum yaw rate at full turn input (degrees / second).
pub const TURN_RATE_DEG: f32 = 100.0;

/// Forward speed used while autonomous mode drives the robot.
///
/// Deliberately slow so the random bounce pattern covers the room evenly.
pub const IDLE_SPEED: f32 = 2.0;

/// Speed multiplier while turbo is engaged.
pub const TURBO_SPEED_MULTIPLIER: f32 = 2.5;

/// Speed multiplier applied in every terrain once the power cell reads 0.
pub const LOW_POWER_MULTIPLIER: f32 = 0.2;

/// Inputs with an absolute value below this count as "not moving" for power drain.
pub const MOVING_INPUT_EPSILON: f32 = 0.01;

/// Collider radius of the robot body.
pub const ROBOT_RADIUS: f32 = 0.5;

// ── Traction ──────────────────────────────────────────────────────────────────

/// Input slip inside open liquid.
pub const SLIP_LIQUID: f32 = 0.3;

/// Velocity drag coefficient inside open liquid.
pub const DRAG_LIQUID: f32 = 0.5;

/// Input slip while burdened, before resistance upgrades.
///
/// Higher values make the burdened robot feel heavier to steer.
pub const SLIP_BURDEN: f32 = 0.45;

/// Velocity drag coefficient while burdened, before resistance upgrades.
pub const DRAG_BURDEN: f32 = 0.2;

/// Fraction each resistance level removes from burden slip.
///
/// Drag grows by twice this fraction per level, so higher levels both steer
/// better and coast less.
pub const RESISTANCE_STEP: f32 = 0.15;

// ── Collisions ────────────────────────────────────────────────────────────────

/// Fraction of the wall-tangential velocity kept after striking an obstacle.
pub const RESTITUTION_DAMPING: f32 = 0.3;

/// Smallest heading change (degrees) of an autonomous bounce.
pub const BOUNCE_MIN_DEG: f32 = 90.0;

/// Largest heading change (degrees) of an autonomous bounce.
pub const BOUNCE_MAX_DEG: f32 = 180.0;

// ── Power Cell ────────────────────────────────────────────────────────────────

/// Power capacity at battery level 0.
pub const POWER_CAPACITY: f32 = 100.0;

/// Power drained per second while the robot moves off the dock.
pub const POWER_DRAIN_RATE: f32 = 5.0;

/// Drain multiplier while turbo is engaged.
pub const TURBO_DRAIN_MULTIPLIER: f32 = 5.0;

/// Power restored per second while docked.
pub const POWER_CHARGE_RATE: f32 = 20.0;

/// Fraction of capacity under which the HUD flags the battery as low.
pub const LOW_POWER_FRACTION: f32 = 0.25;

// ── Collection Tank ───────────────────────────────────────────────────────────

/// Collection capacity at capacity level 0 (units).
pub const COLLECTION_CAPACITY: f32 = 10.0;

/// Units emptied per second while docked.
pub const COLLECTION_DRAIN_RATE: f32 = 5.0;

/// Seconds of contact needed to absorb a puddle with the liquid attachment.
pub const PUDDLE_DURATION_WITH_ATTACHMENT: f32 = 1.5;

/// Seconds of contact needed to absorb a puddle without the attachment.
pub const PUDDLE_DURATION_WITHOUT: f32 = 4.0;

/// Radius of the intake sensor at intake level 0.
pub const INTAKE_RADIUS: f32 = 0.8;

// ── Economy ───────────────────────────────────────────────────────────────────

/// Coin balance of a fresh save.
pub const STARTING_COINS: u32 = 200;

/// Coins paid once when a level is completed.
pub const LEVEL_REWARD: u32 = 200;

/// Coins earned per trash pile picked up.
pub const TRASH_VALUE: u32 = 2;

// ── Upgrades ──────────────────────────────────────────────────────────────────

/// Cost of levels 1..=3 on every table-priced track.
pub const UPGRADE_COST_TABLE: [u32; 3] = [100, 200, 300];

/// Base speed added per speed level.
pub const SPEED_PER_LEVEL: f32 = 2.0;

/// Power capacity added per battery level; also the top-up granted on purchase.
pub const BATTERY_PER_LEVEL: f32 = 50.0;

/// Intake radius added per intake level.
pub const INTAKE_RADIUS_PER_LEVEL: f32 = 0.2;

/// Collection capacity added per capacity level.
pub const CAPACITY_PER_LEVEL: f32 = 20.0;

/// Scanner range for scanner levels 1..=3.  Level 0 disables the scanner.
pub const SCANNER_RANGES: [f32; 3] = [5.0, 10.0, 15.0];

/// Highest purchasable resistance level.
pub const RESISTANCE_MAX_LEVEL: u32 = 5;

/// Price of the first resistance level.
pub const RESISTANCE_BASE_COST: u32 = 8;

/// Price increase after every resistance purchase.
pub const RESISTANCE_COST_STEP: u32 = 5;

/// Price of the liquid attachment (a single level).
pub const ATTACHMENT_COST: u32 = 10;

// ── Scanner ───────────────────────────────────────────────────────────────────

/// Seconds between pulses while the scanner is active.
pub const SCAN_INTERVAL: f32 = 2.0;

/// Ring expansion speed (world units / second).
pub const WAVE_SPEED: f32 = 20.0;

/// Half-width of the ring band that flags a collectible.
///
/// Must stay above `WAVE_SPEED / FIXED_HZ / 2` or fast rings skip objects
/// between two fixed steps.
pub const RING_THICKNESS: f32 = 0.5;

/// Seconds a highlighted collectible stays flagged.
pub const HIGHLIGHT_DURATION: f32 = 0.5;

// ── Objectives ────────────────────────────────────────────────────────────────

/// Maximum distance from the dock centre that counts as "returned to base".
pub const DOCK_CENTER_DISTANCE: f32 = 1.5;

// ── Effects ───────────────────────────────────────────────────────────────────

/// Motor hum volume at full speed.
pub const MOTOR_MAX_VOLUME: f32 = 0.5;

/// Volume units per second the motor hum moves toward its target.
pub const MOTOR_FADE_SPEED: f32 = 3.0;

/// Motor pitch while idle and at full speed.
pub const MOTOR_PITCH_MIN: f32 = 0.7;
pub const MOTOR_PITCH_MAX: f32 = 1.0;

/// Seconds the autonomous-mode music takes to fade in or out.
pub const MUSIC_FADE_SECS: f32 = 1.0;

/// Music volume once fully faded in.
pub const MUSIC_VOLUME: f32 = 0.5;

// ── Level ─────────────────────────────────────────────────────────────────────

/// Dust grid dimensions (tiles per side).
pub const DUST_GRID_SIZE: u32 = 10;

/// Spacing between dust tiles (world units).
pub const DUST_TILE_SIZE: f32 = 1.0;

/// Number of trash piles scattered over the floor.
pub const TRASH_PILE_COUNT: u32 = 6;

// ── Rendering ─────────────────────────────────────────────────────────────────

/// World units → screen pixels for the 2D camera.
pub const PIXELS_PER_UNIT: f32 = 40.0;

/// HUD font size.
pub const HUD_FONT_SIZE: f32 = 16.0;

/// Seconds a HUD notice (coins, tank alerts, purchases) stays on screen.
pub const NOTICE_SECS: f32 = 2.5;

/// Most notices shown at once; older ones drop off first.
pub const MAX_NOTICES: usize = 4;
