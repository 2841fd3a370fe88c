//! Coin ledger.
//!
//! A single non-negative balance that is written to the progress store
//! (and flushed) after every credit or debit.  Coins come from trash pickups
//! and the level-completion reward; they are spent in the upgrade shop.

use crate::error::PurchaseError;
use crate::persistence::{read_u32, write_and_flush, ProgressStore};
use bevy::prelude::*;

/// Store key for the balance.
pub const COINS_KEY: &str = "Coins";

/// Where a credit came from, for logging and the HUD.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoinSource {
    Trash,
    LevelReward,
}

/// Emitted after every credit.
#[derive(Message, Debug, Clone, Copy, PartialEq, Eq)]
pub struct CoinsEarned {
    pub amount: u32,
    pub source: CoinSource,
    pub balance: u32,
}

#[derive(Resource, Debug, Clone, Copy, PartialEq, Eq)]
pub struct EconomyLedger {
    balance: u32,
}

impl EconomyLedger {
    pub fn new(balance: u32) -> Self {
        Self { balance }
    }

    /// Load the persisted balance, or `starting` for a fresh save.
    pub fn load(store: &dyn ProgressStore, starting: u32) -> Self {
        Self::new(read_u32(store, COINS_KEY, starting))
    }

    #[inline]
    pub fn balance(&self) -> u32 {
        self.balance
    }

    #[inline]
    pub fn can_afford(&self, cost: u32) -> bool {
        self.balance >= cost
    }

    /// Add coins and persist.  Returns the new balance.
    pub fn credit(&mut self, amount: u32, store: &mut dyn ProgressStore) -> u32 {
        self.balance = self.balance.saturating_add(amount);
        write_and_flush(store, COINS_KEY, i64::from(self.balance));
        self.balance
    }

    /// Remove coins and persist.  An unaffordable debit changes nothing.
    pub fn debit(
        &mut self,
        amount: u32,
        store: &mut dyn ProgressStore,
    ) -> Result<u32, PurchaseError> {
        if !self.can_afford(amount) {
            return Err(PurchaseError::InsufficientFunds {
                cost: amount,
                balance: self.balance,
            });
        }
        self.balance -= amount;
        write_and_flush(store, COINS_KEY, i64::from(self.balance));
        Ok(self.balance)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persistence::MemoryStore;

    #[test]
    fn fresh_save_starts_with_default_balance() {
        let store = MemoryStore::new();
        assert_eq!(EconomyLedger::load(&store, 200).balance(), 200);
    }

    #[test]
    fn credit_persists_new_balance() {
        let mut store = MemoryStore::new();
        let mut ledger = EconomyLedger::new(10);
        assert_eq!(ledger.credit(2, &mut store), 12);
        assert_eq!(store.get_int(COINS_KEY, 0), 12);
        assert_eq!(store.flush_count(), 1);
    }

    #[test]
    fn credit_saturates_instead_of_wrapping() {
        let mut store = MemoryStore::new();
        let mut ledger = EconomyLedger::new(u32::MAX - 1);
        assert_eq!(ledger.credit(10, &mut store), u32::MAX);
    }

    #[test]
    fn rejected_debit_leaves_balance_and_store_untouched() {
        let mut store = MemoryStore::new();
        let mut ledger = EconomyLedger::new(40);
        let err = ledger.debit(100, &mut store).unwrap_err();
        assert_eq!(
            err,
            PurchaseError::InsufficientFunds {
                cost: 100,
                balance: 40
            }
        );
        assert_eq!(ledger.balance(), 40);
        assert!(store.entries().is_empty());
        assert_eq!(store.flush_count(), 0);
    }

    #[test]
    fn exact_debit_reaches_zero() {
        let mut store = MemoryStore::new();
        let mut ledger = EconomyLedger::new(100);
        assert_eq!(ledger.debit(100, &mut store), Ok(0));
        assert_eq!(store.get_int(COINS_KEY, -1), 0);
    }
}
