//! Generic bounded tank used for both the power cell and the collection tank.
//!
//! ## States
//!
//! | State | Meaning |
//! |-------|---------|
//! | `Servicing` | a service zone is moving the level toward its target |
//! | `Full` | the level reached capacity and has not left it since |
//! | `Empty` | the level reached 0 and has not left it since |
//! | `Idle` | anywhere in between |
//!
//! The level only changes through [`Tank::apply`], which clamps to
//! `[0, capacity]` and reports each boundary crossing exactly once.  The
//! `full` / `empty` latches are what make the reports edge-triggered: a tank
//! that sits at capacity and receives more input reports nothing.

use crate::error::TankError;

/// A boundary crossing reported by [`Tank::apply`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TankTransition {
    /// Reached capacity from below.
    Filled,
    /// Left capacity.
    NoLongerFull,
    /// Reached 0 from above.
    Emptied,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TankState {
    Servicing,
    Full,
    Empty,
    Idle,
}

/// Which end of the range a service zone drives the level toward.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceTarget {
    Fill,
    Drain,
}

/// Transitions produced by one tank operation (at most two: a single large
/// drain can leave capacity and hit 0 in the same call).
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Crossings {
    items: [Option<TankTransition>; 2],
}

impl Crossings {
    fn push(&mut self, t: TankTransition) {
        if let Some(slot) = self.items.iter_mut().find(|s| s.is_none()) {
            *slot = Some(t);
        }
    }

    pub fn contains(&self, t: TankTransition) -> bool {
        self.items.contains(&Some(t))
    }

    pub fn is_empty(&self) -> bool {
        self.items.iter().all(Option::is_none)
    }

    pub fn iter(&self) -> impl Iterator<Item = TankTransition> + '_ {
        self.items.iter().flatten().copied()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Tank {
    level: f32,
    capacity: f32,
    full: bool,
    empty: bool,
    service: Option<(ServiceTarget, f32)>,
}

impl Tank {
    /// A tank holding `level` (clamped) out of `capacity`.
    pub fn new(capacity: f32, level: f32) -> Self {
        let capacity = capacity.max(0.0);
        let level = level.clamp(0.0, capacity);
        Self {
            level,
            capacity,
            full: capacity > 0.0 && level >= capacity,
            empty: level <= 0.0,
            service: None,
        }
    }

    pub fn full_of(capacity: f32) -> Self {
        Self::new(capacity, capacity)
    }

    pub fn empty_of(capacity: f32) -> Self {
        Self::new(capacity, 0.0)
    }

    #[inline]
    pub fn level(&self) -> f32 {
        self.level
    }

    #[inline]
    pub fn capacity(&self) -> f32 {
        self.capacity
    }

    /// Fill fraction in `[0, 1]`; a zero-capacity tank reads as empty.
    pub fn fraction(&self) -> f32 {
        if self.capacity > 0.0 {
            self.level / self.capacity
        } else {
            0.0
        }
    }

    #[inline]
    pub fn is_full(&self) -> bool {
        self.full
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.empty
    }

    #[inline]
    pub fn is_servicing(&self) -> bool {
        self.service.is_some()
    }

    pub fn state(&self) -> TankState {
        if self.is_servicing() {
            TankState::Servicing
        } else if self.full {
            TankState::Full
        } else if self.empty {
            TankState::Empty
        } else {
            TankState::Idle
        }
    }

    /// Move the level by `delta`, clamped to `[0, capacity]`.
    pub fn apply(&mut self, delta: f32) -> Crossings {
        if delta == 0.0 || !delta.is_finite() {
            return Crossings::default();
        }
        self.level = (self.level + delta).clamp(0.0, self.capacity);
        self.relatch()
    }

    /// Discrete variant of [`apply`](Self::apply) for single-unit pickups:
    /// adding to a full tank or draining an empty one is an error and
    /// leaves the tank untouched.
    pub fn try_apply(&mut self, delta: f32) -> Result<Crossings, TankError> {
        if delta > 0.0 && self.full {
            return Err(TankError::Full {
                capacity: self.capacity,
            });
        }
        if delta < 0.0 && self.empty {
            return Err(TankError::InvalidTransition {
                reason: "drain requested on an empty tank",
            });
        }
        Ok(self.apply(delta))
    }

    /// Add `amount` without exceeding capacity.
    pub fn top_up(&mut self, amount: f32) -> Crossings {
        self.apply(amount.max(0.0))
    }

    /// Change capacity; the level is clamped into the new range and the
    /// latches re-evaluated.
    pub fn set_capacity(&mut self, capacity: f32) -> Crossings {
        self.capacity = capacity.max(0.0);
        self.level = self.level.clamp(0.0, self.capacity);
        self.relatch()
    }

    /// Enter a service zone that moves the level toward `target` at `rate`
    /// units per second.
    pub fn begin_service(&mut self, target: ServiceTarget, rate: f32) {
        self.service = Some((target, rate.max(0.0)));
    }

    pub fn end_service(&mut self) {
        self.service = None;
    }

    /// Advance an active service by `dt` seconds.  No-op when not servicing.
    pub fn service(&mut self, dt: f32) -> Crossings {
        match self.service {
            Some((ServiceTarget::Fill, rate)) => self.apply(rate * dt),
            Some((ServiceTarget::Drain, rate)) => self.apply(-rate * dt),
            None => Crossings::default(),
        }
    }

    fn relatch(&mut self) -> Crossings {
        let mut out = Crossings::default();
        let at_cap = self.capacity > 0.0 && self.level >= self.capacity;
        if at_cap && !self.full {
            self.full = true;
            out.push(TankTransition::Filled);
        } else if !at_cap && self.full {
            self.full = false;
            out.push(TankTransition::NoLongerFull);
        }
        let at_zero = self.level <= 0.0;
        if at_zero && !self.empty {
            self.empty = true;
            out.push(TankTransition::Emptied);
        } else if !at_zero {
            self.empty = false;
        }
        out
    }
}

// ── Continuous intake ─────────────────────────────────────────────────────────

/// Fractional absorption progress for a puddle-like source.
///
/// Progress only advances while in contact and resets to 0 as soon as
/// contact breaks, so a source is absorbed in one uninterrupted pass.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct ContinuousIntake {
    progress: f32,
    in_contact: bool,
}

impl ContinuousIntake {
    #[inline]
    pub fn progress(&self) -> f32 {
        self.progress
    }

    #[inline]
    pub fn in_contact(&self) -> bool {
        self.in_contact
    }

    pub fn begin_contact(&mut self) {
        if !self.in_contact {
            self.in_contact = true;
            self.progress = 0.0;
        }
    }

    pub fn break_contact(&mut self) {
        self.in_contact = false;
        self.progress = 0.0;
    }

    /// Add `delta` progress.  Returns `true` when a whole unit completes,
    /// after which progress restarts at 0.
    pub fn advance(&mut self, delta: f32) -> bool {
        if !self.in_contact || !delta.is_finite() {
            return false;
        }
        self.progress = (self.progress + delta).clamp(0.0, 1.0);
        if self.progress >= 1.0 {
            self.progress = 0.0;
            true
        } else {
            false
        }
    }
}
