//! Runtime simulation configuration loaded from `assets/dustbot.toml`.
//!
//! [`SimConfig`] is a Bevy [`Resource`] that mirrors every constant in
//! [`crate::constants`].  At startup, [`load_sim_config`] reads
//! `assets/dustbot.toml` and overwrites the defaults with any values present in
//! the file.  Missing keys fall back to the compile-time defaults, so a minimal
//! TOML can override just the values you care about.
//!
//! ## Usage in systems
//!
//! Add `config: Res<SimConfig>` to any system parameter list and read values
//! with `config.base_speed`, `config.power_drain_rate`, etc.
//!
//! Keep `src/constants.rs` in sync: it remains the **authoritative default**
//! source used by `SimConfig::default()`.

use crate::constants::*;
use crate::error::{validate_fraction, validate_positive, SimError, SimResult};
use bevy::prelude::*;
use serde::Deserialize;

/// Default location of the runtime config file.
pub const SIM_CONFIG_PATH: &str = "assets/dustbot.toml";

/// Runtime-tunable locomotion, tank, economy and scanner configuration.
///
/// All fields default to the corresponding compile-time constant from
/// `src/constants.rs`.
#[derive(Resource, Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    // ── Simulation Clock ─────────────────────────────────────────────────────
    pub fixed_hz: f64,

    // ── Locomotion ────────────────────────────────────────────────────────────
    pub base_speed: f32,
    pub turn_rate_deg: f32,
    pub idle_speed: f32,
    pub turbo_speed_multiplier: f32,
    pub low_power_multiplier: f32,
    pub moving_input_epsilon: f32,
    pub robot_radius: f32,

    // ── Traction ──────────────────────────────────────────────────────────────
    pub slip_liquid: f32,
    pub drag_liquid: f32,
    pub slip_burden: f32,
    pub drag_burden: f32,
    pub resistance_step: f32,

    // ── Collisions ────────────────────────────────────────────────────────────
    pub restitution_damping: f32,
    pub bounce_min_deg: f32,
    pub bounce_max_deg: f32,

    // ── Power Cell ────────────────────────────────────────────────────────────
    pub power_capacity: f32,
    pub power_drain_rate: f32,
    pub turbo_drain_multiplier: f32,
    pub power_charge_rate: f32,
    pub low_power_fraction: f32,

    // ── Collection Tank ───────────────────────────────────────────────────────
    pub collection_capacity: f32,
    pub collection_drain_rate: f32,
    pub puddle_duration_with_attachment: f32,
    pub puddle_duration_without: f32,
    pub intake_radius: f32,

    // ── Economy ───────────────────────────────────────────────────────────────
    pub starting_coins: u32,
    pub level_reward: u32,
    pub trash_value: u32,

    // ── Upgrades ──────────────────────────────────────────────────────────────
    pub upgrade_cost_table: Vec<u32>,
    pub speed_per_level: f32,
    pub battery_per_level: f32,
    pub intake_radius_per_level: f32,
    pub capacity_per_level: f32,
    pub scanner_ranges: Vec<f32>,
    pub resistance_max_level: u32,
    pub resistance_base_cost: u32,
    pub resistance_cost_step: u32,
    pub attachment_cost: u32,

    // ── Scanner ───────────────────────────────────────────────────────────────
    pub scan_interval: f32,
    pub wave_speed: f32,
    pub ring_thickness: f32,
    pub highlight_duration: f32,

    // ── Objectives ────────────────────────────────────────────────────────────
    pub dock_center_distance: f32,

    // ── Effects ───────────────────────────────────────────────────────────────
    pub motor_max_volume: f32,
    pub motor_fade_speed: f32,
    pub motor_pitch_min: f32,
    pub motor_pitch_max: f32,
    pub music_fade_secs: f32,
    pub music_volume: f32,

    // ── Rendering ─────────────────────────────────────────────────────────────
    pub pixels_per_unit: f32,
    pub hud_font_size: f32,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            fixed_hz: FIXED_HZ,
            // Locomotion
            base_speed: BASE_SPEED,
            turn_rate_deg: TURN_RATE_DEG,
            idle_speed: IDLE_SPEED,
            turbo_speed_multiplier: TURBO_SPEED_MULTIPLIER,
            low_power_multiplier: LOW_POWER_MULTIPLIER,
            moving_input_epsilon: MOVING_INPUT_EPSILON,
            robot_radius: ROBOT_RADIUS,
            // Traction
            slip_liquid: SLIP_LIQUID,
            drag_liquid: DRAG_LIQUID,
            slip_burden: SLIP_BURDEN,
            drag_burden: DRAG_BURDEN,
            resistance_step: RESISTANCE_STEP,
            // Collisions
            restitution_damping: RESTITUTION_DAMPING,
            bounce_min_deg: BOUNCE_MIN_DEG,
            bounce_max_deg: BOUNCE_MAX_DEG,
            // Power Cell
            power_capacity: POWER_CAPACITY,
            power_drain_rate: POWER_DRAIN_RATE,
            turbo_drain_multiplier: TURBO_DRAIN_MULTIPLIER,
            power_charge_rate: POWER_CHARGE_RATE,
            low_power_fraction: LOW_POWER_FRACTION,
            // Collection Tank
            collection_capacity: COLLECTION_CAPACITY,
            collection_drain_rate: COLLECTION_DRAIN_RATE,
            puddle_duration_with_attachment: PUDDLE_DURATION_WITH_ATTACHMENT,
            puddle_duration_without: PUDDLE_DURATION_WITHOUT,
            intake_radius: INTAKE_RADIUS,
            // Economy
            starting_coins: STARTING_COINS,
            level_reward: LEVEL_REWARD,
            trash_value: TRASH_VALUE,
            // Upgrades
            upgrade_cost_table: UPGRADE_COST_TABLE.to_vec(),
            speed_per_level: SPEED_PER_LEVEL,
            battery_per_level: BATTERY_PER_LEVEL,
            intake_radius_per_level: INTAKE_RADIUS_PER_LEVEL,
            capacity_per_level: CAPACITY_PER_LEVEL,
            scanner_ranges: SCANNER_RANGES.to_vec(),
            resistance_max_level: RESISTANCE_MAX_LEVEL,
            resistance_base_cost: RESISTANCE_BASE_COST,
            resistance_cost_step: RESISTANCE_COST_STEP,
            attachment_cost: ATTACHMENT_COST,
            // Scanner
            scan_interval: SCAN_INTERVAL,
            wave_speed: WAVE_SPEED,
            ring_thickness: RING_THICKNESS,
            highlight_duration: HIGHLIGHT_DURATION,
            // Objectives
            dock_center_distance: DOCK_CENTER_DISTANCE,
            // Effects
            motor_max_volume: MOTOR_MAX_VOLUME,
            motor_fade_speed: MOTOR_FADE_SPEED,
            motor_pitch_min: MOTOR_PITCH_MIN,
            motor_pitch_max: MOTOR_PITCH_MAX,
            music_fade_secs: MUSIC_FADE_SECS,
            music_volume: MUSIC_VOLUME,
            // Rendering
            pixels_per_unit: PIXELS_PER_UNIT,
            hud_font_size: HUD_FONT_SIZE,
        }
    }
}

impl SimConfig {
    /// Parse a TOML document; keys that are absent keep their defaults.
    pub fn from_toml_str(contents: &str) -> SimResult<Self> {
        toml::from_str::<SimConfig>(contents).map_err(|e| SimError::Config {
            path: SIM_CONFIG_PATH.to_string(),
            message: e.to_string(),
        })
    }

    /// Reject values that would stall or invert the simulation.
    pub fn validate(&self) -> SimResult<()> {
        validate_positive("base_speed", self.base_speed)?;
        validate_positive("power_capacity", self.power_capacity)?;
        validate_positive("collection_capacity", self.collection_capacity)?;
        validate_positive("puddle_duration_with_attachment", self.puddle_duration_with_attachment)?;
        validate_positive("puddle_duration_without", self.puddle_duration_without)?;
        validate_positive("scan_interval", self.scan_interval)?;
        validate_positive("wave_speed", self.wave_speed)?;
        validate_fraction("slip_liquid", self.slip_liquid)?;
        validate_fraction("slip_burden", self.slip_burden)?;
        validate_fraction("restitution_damping", self.restitution_damping)?;
        Ok(())
    }

    /// Maximum yaw rate in radians per second.
    #[inline]
    pub fn turn_rate(&self) -> f32 {
        self.turn_rate_deg.to_radians()
    }

    /// Seconds of contact a puddle needs before it is absorbed.
    #[inline]
    pub fn puddle_duration(&self, has_attachment: bool) -> f32 {
        if has_attachment {
            self.puddle_duration_with_attachment
        } else {
            self.puddle_duration_without
        }
    }
}

/// Startup system: attempt to load `assets/dustbot.toml` and overwrite the
/// `SimConfig` resource with any values present in the file.
///
/// Missing keys retain their compiled defaults.  TOML parse errors are printed
/// to stderr but do not abort the simulation.  A missing file is silently
/// ignored (defaults are already in place from `insert_resource`).
pub fn load_sim_config(mut config: ResMut<SimConfig>) {
    let path = SIM_CONFIG_PATH;
    match std::fs::read_to_string(path) {
        Ok(contents) => match SimConfig::from_toml_str(&contents) {
            Ok(loaded) => match loaded.validate() {
                Ok(()) => {
                    *config = loaded;
                    println!("✓ Loaded simulation config from {path}");
                }
                Err(e) => eprintln!("⚠ Rejected {path}: {e}; using defaults"),
            },
            Err(e) => {
                eprintln!("⚠ {e}; using defaults");
            }
        },
        Err(_) => {
            println!("ℹ No {path} found; using compiled defaults");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_yields_defaults() {
        let config = SimConfig::from_toml_str("").unwrap();
        assert_eq!(config, SimConfig::default());
    }

    #[test]
    fn partial_document_overrides_only_named_keys() {
        let config = SimConfig::from_toml_str(
            "base_speed = 7.5\nupgrade_cost_table = [10, 20, 30]\n",
        )
        .unwrap();
        assert_eq!(config.base_speed, 7.5);
        assert_eq!(config.upgrade_cost_table, vec![10, 20, 30]);
        assert_eq!(config.power_capacity, POWER_CAPACITY);
    }

    #[test]
    fn malformed_document_reports_config_error() {
        let err = SimConfig::from_toml_str("base_speed = \"fast\"").unwrap_err();
        assert!(matches!(err, SimError::Config { .. }));
    }

    #[test]
    fn defaults_pass_validation() {
        assert!(SimConfig::default().validate().is_ok());
        let mut bad = SimConfig::default();
        bad.slip_burden = 1.5;
        assert!(bad.validate().is_err());
    }

    #[test]
    fn puddle_duration_depends_on_attachment() {
        let config = SimConfig::default();
        assert_eq!(config.puddle_duration(true), PUDDLE_DURATION_WITH_ATTACHMENT);
        assert_eq!(config.puddle_duration(false), PUDDLE_DURATION_WITHOUT);
    }
}
