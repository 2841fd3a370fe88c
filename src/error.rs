//! Simulation-specific error types.
//!
//! Nothing in the simulation terminates on these errors.  Purchase and tank
//! errors leave state untouched and are reported to the caller; store errors
//! are masked by defaults and logged.
//!
//! ## Usage
//!
//! ```rust
//! use dustbot::error::{PurchaseError, SimResult};
//!
//! fn spend(balance: u32, cost: u32) -> SimResult<u32> {
//!     if balance < cost {
//!         return Err(PurchaseError::InsufficientFunds { cost, balance }.into());
//!     }
//!     Ok(balance - cost)
//! }
//! # assert!(spend(5, 10).is_err());
//! ```

use crate::upgrades::UpgradeTrack;
use std::fmt;
use std::path::PathBuf;

// ── Purchase ──────────────────────────────────────────────────────────────────

/// Why an upgrade purchase (or a ledger debit) was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PurchaseError {
    /// The balance does not cover the current cost.
    InsufficientFunds { cost: u32, balance: u32 },
    /// The track is already at its maximum level.
    TrackMaxed { track: UpgradeTrack },
}

impl fmt::Display for PurchaseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PurchaseError::InsufficientFunds { cost, balance } => write!(
                f,
                "insufficient funds: cost {} but balance is {}",
                cost, balance
            ),
            PurchaseError::TrackMaxed { track } => {
                write!(f, "upgrade track '{}' is already maxed", track.key())
            }
        }
    }
}

impl std::error::Error for PurchaseError {}

// ── Tank ──────────────────────────────────────────────────────────────────────

/// A discrete tank operation that could not be applied.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TankError {
    /// The tank is latched full; the inbound unit is refused.
    Full { capacity: f32 },
    /// The requested change makes no sense in the current state
    /// (for example draining an empty tank).
    InvalidTransition { reason: &'static str },
}

impl fmt::Display for TankError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TankError::Full { capacity } => write!(f, "tank is full ({} units)", capacity),
            TankError::InvalidTransition { reason } => {
                write!(f, "invalid tank transition: {}", reason)
            }
        }
    }
}

impl std::error::Error for TankError {}

// ── Store ─────────────────────────────────────────────────────────────────────

/// Failure reading or writing persisted progress.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// The backing file could not be read or written.
    Io { path: PathBuf, message: String },
    /// The backing file exists but is not a valid progress document.
    Parse { path: PathBuf, message: String },
    /// The in-memory values could not be encoded.
    Serialize { message: String },
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::Io { path, message } => {
                write!(f, "progress store I/O error at {}: {}", path.display(), message)
            }
            StoreError::Parse { path, message } => {
                write!(f, "corrupt progress file {}: {}", path.display(), message)
            }
            StoreError::Serialize { message } => {
                write!(f, "could not encode progress: {}", message)
            }
        }
    }
}

impl std::error::Error for StoreError {}

// ── Top level ─────────────────────────────────────────────────────────────────

/// Top-level error enum for the dustbot simulation.
#[derive(Debug, Clone, PartialEq)]
pub enum SimError {
    Purchase(PurchaseError),
    Tank(TankError),
    Store(StoreError),
    /// A TOML config document could not be parsed.
    Config { path: String, message: String },
    /// A config value is outside its usable range.
    UnsafeConstant {
        name: &'static str,
        value: f32,
        safe_range: &'static str,
    },
}

impl fmt::Display for SimError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SimError::Purchase(e) => write!(f, "{}", e),
            SimError::Tank(e) => write!(f, "{}", e),
            SimError::Store(e) => write!(f, "{}", e),
            SimError::Config { path, message } => {
                write!(f, "failed to parse {}: {}", path, message)
            }
            SimError::UnsafeConstant {
                name,
                value,
                safe_range,
            } => write!(
                f,
                "constant '{}' = {} is outside safe range {}",
                name, value, safe_range
            ),
        }
    }
}

impl std::error::Error for SimError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SimError::Purchase(e) => Some(e),
            SimError::Tank(e) => Some(e),
            SimError::Store(e) => Some(e),
            _ => None,
        }
    }
}

impl From<PurchaseError> for SimError {
    fn from(e: PurchaseError) -> Self {
        SimError::Purchase(e)
    }
}

impl From<TankError> for SimError {
    fn from(e: TankError) -> Self {
        SimError::Tank(e)
    }
}

impl From<StoreError> for SimError {
    fn from(e: StoreError) -> Self {
        SimError::Store(e)
    }
}

/// Convenience alias: a `Result` using `SimError` as the error type.
pub type SimResult<T> = Result<T, SimError>;

// ── Validation helpers ────────────────────────────────────────────────────────

/// Returns an error unless `value` is finite and strictly positive.
pub fn validate_positive(name: &'static str, value: f32) -> SimResult<()> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(SimError::UnsafeConstant {
            name,
            value,
            safe_range: "(0.0, ∞)",
        })
    }
}

/// Returns an error unless `value` lies in `[0, 1]`.
pub fn validate_fraction(name: &'static str, value: f32) -> SimResult<()> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(SimError::UnsafeConstant {
            name,
            value,
            safe_range: "[0.0, 1.0]",
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn purchase_error_message_names_cost_and_balance() {
        let e = PurchaseError::InsufficientFunds {
            cost: 100,
            balance: 40,
        };
        let text = e.to_string();
        assert!(text.contains("100") && text.contains("40"), "{text}");
    }

    #[test]
    fn sim_error_wraps_sources() {
        let e: SimError = TankError::Full { capacity: 10.0 }.into();
        assert!(std::error::Error::source(&e).is_some());
    }

    #[test]
    fn validators_reject_out_of_range_values() {
        assert!(validate_positive("base_speed", 5.0).is_ok());
        assert!(validate_positive("base_speed", 0.0).is_err());
        assert!(validate_positive("base_speed", f32::NAN).is_err());
        assert!(validate_fraction("slip_liquid", 0.3).is_ok());
        assert!(validate_fraction("slip_liquid", 1.2).is_err());
    }
}
