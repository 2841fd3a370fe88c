//! Terrain resolution and the traction model.
//!
//! Terrain is derived, never set directly: the liquid contact counter,
//! dock contact and collection-tank fullness decide it every fixed step
//! through [`TractionState::resolve`].
//!
//! | Terrain | Slip | Drag |
//! |---------|------|------|
//! | `Dry` | 0 | 1 |
//! | `Liquid` | `slip_liquid` | `drag_liquid` |
//! | `Burdened` | `slip_burden · (1 − r·k)` | `drag_burden · (1 + 2·r·k)` |
//!
//! `r` is the purchased resistance level and `k` the per-level resistance step.

use crate::config::SimConfig;
use bevy::prelude::*;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TerrainState {
    #[default]
    Dry,
    Liquid,
    Burdened,
}

impl TerrainState {
    #[inline]
    pub fn label(self) -> &'static str {
        match self {
            TerrainState::Dry => "DRY",
            TerrainState::Liquid => "LIQUID",
            TerrainState::Burdened => "BURDENED",
        }
    }

    /// Whether velocity carries over between steps (inertial integration).
    #[inline]
    pub fn is_wet(self) -> bool {
        !matches!(self, TerrainState::Dry)
    }
}

/// Input attenuation and velocity drag for the current terrain.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Traction {
    pub slip: f32,
    pub drag: f32,
}

impl Traction {
    pub const DRY: Traction = Traction {
        slip: 0.0,
        drag: 1.0,
    };
}

/// Slip/drag tuning extracted from [`SimConfig`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TractionTuning {
    pub slip_liquid: f32,
    pub drag_liquid: f32,
    pub slip_burden: f32,
    pub drag_burden: f32,
    pub resistance_step: f32,
}

impl From<&SimConfig> for TractionTuning {
    fn from(config: &SimConfig) -> Self {
        Self {
            slip_liquid: config.slip_liquid,
            drag_liquid: config.drag_liquid,
            slip_burden: config.slip_burden,
            drag_burden: config.drag_burden,
            resistance_step: config.resistance_step,
        }
    }
}

impl Default for TractionTuning {
    fn default() -> Self {
        Self::from(&SimConfig::default())
    }
}

/// Slip and drag for `terrain` at resistance level `resistance`.
pub fn traction_for(terrain: TerrainState, tuning: &TractionTuning, resistance: u32) -> Traction {
    match terrain {
        TerrainState::Dry => Traction::DRY,
        TerrainState::Liquid => Traction {
            slip: tuning.slip_liquid,
            drag: tuning.drag_liquid,
        },
        TerrainState::Burdened => {
            let rk = resistance as f32 * tuning.resistance_step;
            Traction {
                slip: (tuning.slip_burden * (1.0 - rk)).clamp(0.0, 1.0),
                drag: tuning.drag_burden * (1.0 + 2.0 * rk),
            }
        }
    }
}

/// Everything besides liquid contact that decides the burden.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct BurdenInputs {
    pub has_attachment: bool,
    pub collection_full: bool,
    pub docked: bool,
}

/// Burden holds only inside liquid and off the dock: always without the
/// attachment, and with it only once the collection tank is full.
#[inline]
pub fn is_burdened(in_liquid: bool, inputs: BurdenInputs) -> bool {
    !inputs.docked && in_liquid && (!inputs.has_attachment || inputs.collection_full)
}

/// Emitted whenever the resolved terrain actually changes.
#[derive(Message, Debug, Clone, Copy, PartialEq, Eq)]
pub struct TerrainChanged {
    pub from: TerrainState,
    pub to: TerrainState,
}

/// Liquid contact counter and the derived terrain of the robot.
#[derive(Component, Debug, Default, Clone, PartialEq)]
pub struct TractionState {
    liquid_contacts: u32,
    burdened: bool,
    terrain: TerrainState,
}

impl TractionState {
    pub fn enter_liquid(&mut self) {
        self.liquid_contacts += 1;
    }

    /// Leave one liquid volume; never drops below 0.
    pub fn exit_liquid(&mut self) {
        self.liquid_contacts = self.liquid_contacts.saturating_sub(1);
    }

    #[inline]
    pub fn liquid_contacts(&self) -> u32 {
        self.liquid_contacts
    }

    #[inline]
    pub fn in_liquid(&self) -> bool {
        self.liquid_contacts > 0
    }

    #[inline]
    pub fn burdened(&self) -> bool {
        self.burdened
    }

    #[inline]
    pub fn terrain(&self) -> TerrainState {
        self.terrain
    }

    /// Recompute burden and terrain.  Returns the change, if any.
    pub fn resolve(&mut self, inputs: BurdenInputs) -> Option<TerrainChanged> {
        self.burdened = is_burdened(self.in_liquid(), inputs);
        let next = if self.burdened {
            TerrainState::Burdened
        } else if self.in_liquid() {
            TerrainState::Liquid
        } else {
            TerrainState::Dry
        };
        if next == self.terrain {
            return None;
        }
        let change = TerrainChanged {
            from: self.terrain,
            to: next,
        };
        self.terrain = next;
        Some(change)
    }

    /// Drop every contact and return to dry floor (level reload).
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
