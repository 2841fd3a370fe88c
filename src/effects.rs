//! Effect timers: motor hum and the autonomous-mode music fade.
//!
//! No audio is played.  These resources hold the volume and pitch an audio
//! backend would use, driven by robot state and cancelled deterministically
//! when the level completes.

use crate::config::SimConfig;
use crate::locomotion::Kinematics;
use crate::objectives::LevelCompleted;
use crate::robot::{AutonomousToggled, Robot, RobotMode};
use bevy::prelude::*;

/// Linear ramp from one value to another.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Fade {
    from: f32,
    to: f32,
    elapsed: f32,
    duration: f32,
}

impl Fade {
    pub fn new(from: f32, to: f32, duration: f32) -> Self {
        Self {
            from,
            to,
            elapsed: 0.0,
            duration: duration.max(0.0),
        }
    }

    pub fn value(&self) -> f32 {
        if self.duration <= 0.0 {
            return self.to;
        }
        let t = (self.elapsed / self.duration).clamp(0.0, 1.0);
        self.from + (self.to - self.from) * t
    }

    #[inline]
    pub fn target(&self) -> f32 {
        self.to
    }

    #[inline]
    pub fn finished(&self) -> bool {
        self.elapsed >= self.duration
    }

    /// Advance and return the new value.
    pub fn tick(&mut self, dt: f32) -> f32 {
        self.elapsed = (self.elapsed + dt).min(self.duration);
        self.value()
    }
}

// ── Motor hum ─────────────────────────────────────────────────────────────────

#[derive(Resource, Debug, Clone, Copy, PartialEq)]
pub struct MotorHum {
    pub volume: f32,
    pub pitch: f32,
}

impl Default for MotorHum {
    fn default() -> Self {
        Self {
            volume: 0.0,
            pitch: crate::constants::MOTOR_PITCH_MIN,
        }
    }
}

impl MotorHum {
    /// Ease toward the volume and pitch for `speed` out of `max_speed`.
    pub fn update(&mut self, speed: f32, max_speed: f32, dt: f32, config: &SimConfig) {
        let ratio = if max_speed > 0.0 {
            (speed / max_speed).clamp(0.0, 1.0)
        } else {
            0.0
        };
        let target = ratio * config.motor_max_volume;
        let step = config.motor_fade_speed * dt;
        self.volume += (target - self.volume).clamp(-step, step);
        self.pitch = config.motor_pitch_min + (config.motor_pitch_max - config.motor_pitch_min) * ratio;
    }

    pub fn silence(&mut self, config: &SimConfig) {
        self.volume = 0.0;
        self.pitch = config.motor_pitch_min;
    }
}

// ── Music ─────────────────────────────────────────────────────────────────────

/// Music that plays while autonomous mode is on.
#[derive(Resource, Debug, Default, Clone, Copy, PartialEq)]
pub struct MusicFade {
    pub volume: f32,
    fade: Option<Fade>,
}

impl MusicFade {
    #[inline]
    pub fn is_fading(&self) -> bool {
        self.fade.is_some()
    }

    /// Start a fade from the current volume to `target`, replacing any fade
    /// in progress.
    pub fn fade_to(&mut self, target: f32, duration: f32) {
        self.fade = Some(Fade::new(self.volume, target, duration));
    }

    pub fn tick(&mut self, dt: f32) {
        if let Some(fade) = &mut self.fade {
            self.volume = fade.tick(dt);
            if fade.finished() {
                self.fade = None;
            }
        }
    }

    /// Drop any fade and fall silent.
    pub fn cancel(&mut self) {
        self.fade = None;
        self.volume = 0.0;
    }
}

// ── Systems ───────────────────────────────────────────────────────────────────

pub fn motor_hum_system(
    time: Res<Time>,
    config: Res<SimConfig>,
    mut hum: ResMut<MotorHum>,
    q_robot: Query<(&Kinematics, &RobotMode), With<Robot>>,
) {
    let Ok((kin, mode)) = q_robot.single() else {
        return;
    };
    if mode.halted {
        return;
    }
    let max_speed = config.base_speed * config.turbo_speed_multiplier;
    hum.update(kin.speed(), max_speed, time.delta_secs(), &config);
}

/// Fade music in and out with autonomous mode.
pub fn music_fade_system(
    time: Res<Time>,
    config: Res<SimConfig>,
    mut toggles: MessageReader<AutonomousToggled>,
    mut music: ResMut<MusicFade>,
) {
    for toggle in toggles.read() {
        let target = if toggle.active { config.music_volume } else { 0.0 };
        music.fade_to(target, config.music_fade_secs);
    }
    music.tick(time.delta_secs());
}

/// Level completion cancels every effect timer.
pub fn cancel_effects_on_complete_system(
    mut completed: MessageReader<LevelCompleted>,
    config: Res<SimConfig>,
    mut hum: ResMut<MotorHum>,
    mut music: ResMut<MusicFade>,
) {
    if completed.read().count() > 0 {
        hum.silence(&config);
        music.cancel();
        debug!("[effects] cancelled");
    }
}

pub struct EffectsPlugin;

impl Plugin for EffectsPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<MotorHum>()
            .init_resource::<MusicFade>()
            .add_message::<AutonomousToggled>()
            .add_message::<LevelCompleted>()
            .add_systems(
                Update,
                (
                    motor_hum_system,
                    music_fade_system,
                    cancel_effects_on_complete_system,
                )
                    .chain(),
            );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{manual_time_app, tick};

    #[test]
    fn fade_ramps_linearly_and_finishes() {
        let mut fade = Fade::new(0.0, 1.0, 2.0);
        assert!((fade.tick(0.5) - 0.25).abs() < 1e-6);
        assert!((fade.tick(1.0) - 0.75).abs() < 1e-6);
        assert!(!fade.finished());
        assert_eq!(fade.tick(5.0), 1.0);
        assert!(fade.finished());
    }

    #[test]
    fn zero_length_fade_jumps_to_target() {
        let fade = Fade::new(0.3, 0.0, 0.0);
        assert_eq!(fade.value(), 0.0);
        assert!(fade.finished());
    }

    #[test]
    fn motor_hum_eases_toward_speed() {
        let config = SimConfig::default();
        let mut hum = MotorHum::default();
        hum.update(12.5, 12.5, 0.02, &config);
        assert!((hum.volume - 0.06).abs() < 1e-6);
        assert!((hum.pitch - config.motor_pitch_max).abs() < 1e-6);
        for _ in 0..100 {
            hum.update(12.5, 12.5, 0.02, &config);
        }
        assert!((hum.volume - config.motor_max_volume).abs() < 1e-6);
        for _ in 0..100 {
            hum.update(0.0, 12.5, 0.02, &config);
        }
        assert!(hum.volume.abs() < 1e-6);
    }

    #[test]
    fn toggle_off_midway_reverses_from_current_volume() {
        let mut music = MusicFade::default();
        music.fade_to(0.5, 1.0);
        music.tick(0.5);
        assert!((music.volume - 0.25).abs() < 1e-6);
        music.fade_to(0.0, 1.0);
        music.tick(0.5);
        assert!((music.volume - 0.125).abs() < 1e-6);
        music.tick(1.0);
        assert_eq!(music.volume, 0.0);
        assert!(!music.is_fading());
    }

    #[test]
    fn completion_cancels_fades() {
        let mut app = manual_time_app();
        app.add_plugins(EffectsPlugin);
        app.insert_resource(SimConfig::default());

        app.world_mut()
            .write_message(AutonomousToggled { active: true });
        tick(&mut app, 0.1);
        assert!(app.world().resource::<MusicFade>().is_fading());

        app.world_mut().write_message(LevelCompleted {
            reward: 200,
            balance: 200,
        });
        tick(&mut app, 0.1);
        let music = app.world().resource::<MusicFade>();
        assert!(!music.is_fading());
        assert_eq!(music.volume, 0.0);
    }
}
