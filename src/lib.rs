//! Dustbot: a cleaning-robot simulation.
//!
//! A velocity-driven robot whose traction, power cell and collection tank
//! interact every fixed step, plus a persistent coin ledger and upgrade shop
//! that change its parameters between (and during) levels.
//!
//! Pure state machines (`tank`, `traction`, `locomotion`, `upgrades`,
//! `economy`, `scanner`, `objectives`) are usable without an `App`; the
//! `robot`, `session`, `effects` and `hud` modules wire them into Bevy.

pub mod config;
pub mod constants;
pub mod economy;
pub mod effects;
pub mod error;
pub mod hud;
pub mod level;
pub mod locomotion;
pub mod objectives;
pub mod persistence;
pub mod robot;
pub mod scanner;
pub mod session;
pub mod tank;
pub mod traction;
pub mod upgrades;

#[cfg(test)]
mod test_support;
