//! Level objectives: clear every dust tile and puddle, then return to base.
//!
//! Trash piles only pay coins and are not objectives.
//!
//! The tracker counts what is left to clear.  A level completes on the first
//! `ReturnedToBase` that arrives once both counts are zero; completion pays
//! the reward into the ledger exactly once and emits [`LevelCompleted`].

use crate::config::SimConfig;
use crate::economy::{CoinSource, CoinsEarned, EconomyLedger};
use crate::level::{Collectible, Puddle};
use crate::persistence::Progress;
use bevy::prelude::*;

#[derive(Message, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectiveEvent {
    CollectibleCleared,
    LiquidCleared,
    /// The robot sits on the dock centre.
    ReturnedToBase,
}

#[derive(Message, Debug, Clone, Copy, PartialEq, Eq)]
pub struct LevelCompleted {
    pub reward: u32,
    pub balance: u32,
}

#[derive(Resource, Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ObjectiveTracker {
    collectibles_remaining: u32,
    liquids_remaining: u32,
    completed: bool,
}

impl ObjectiveTracker {
    pub fn new(collectibles: u32, liquids: u32) -> Self {
        Self {
            collectibles_remaining: collectibles,
            liquids_remaining: liquids,
            completed: false,
        }
    }

    #[inline]
    pub fn collectibles_remaining(&self) -> u32 {
        self.collectibles_remaining
    }

    #[inline]
    pub fn liquids_remaining(&self) -> u32 {
        self.liquids_remaining
    }

    #[inline]
    pub fn all_cleared(&self) -> bool {
        self.collectibles_remaining == 0 && self.liquids_remaining == 0
    }

    #[inline]
    pub fn is_complete(&self) -> bool {
        self.completed
    }

    /// Apply one event.  Returns `true` only on the event that completes the level.
    pub fn apply(&mut self, event: ObjectiveEvent) -> bool {
        if self.completed {
            return false;
        }
        match event {
            ObjectiveEvent::CollectibleCleared => {
                self.collectibles_remaining = self.collectibles_remaining.saturating_sub(1);
                false
            }
            ObjectiveEvent::LiquidCleared => {
                self.liquids_remaining = self.liquids_remaining.saturating_sub(1);
                false
            }
            ObjectiveEvent::ReturnedToBase => {
                if self.all_cleared() {
                    self.completed = true;
                }
                self.completed
            }
        }
    }
}

/// Count the objectives of a freshly spawned level: dust tiles and puddles.
pub fn register_objectives_system(
    mut tracker: ResMut<ObjectiveTracker>,
    q_collectibles: Query<(), With<Collectible>>,
    q_puddles: Query<(), With<Puddle>>,
) {
    *tracker = ObjectiveTracker::new(
        q_collectibles.iter().count() as u32,
        q_puddles.iter().count() as u32,
    );
    info!(
        "[objectives] {} dust tiles, {} puddles to clear",
        tracker.collectibles_remaining, tracker.liquids_remaining
    );
}

/// Feed objective events to the tracker and pay out on completion.
pub fn objective_event_system(
    mut events: MessageReader<ObjectiveEvent>,
    mut completed: MessageWriter<LevelCompleted>,
    mut earned: MessageWriter<CoinsEarned>,
    mut tracker: ResMut<ObjectiveTracker>,
    mut ledger: ResMut<EconomyLedger>,
    mut progress: ResMut<Progress>,
    config: Res<SimConfig>,
) {
    for event in events.read() {
        if tracker.apply(*event) {
            let balance = ledger.credit(config.level_reward, progress.store_mut());
            info!(
                "[objectives] level complete: +{} coins ({} total)",
                config.level_reward, balance
            );
            earned.write(CoinsEarned {
                amount: config.level_reward,
                source: CoinSource::LevelReward,
                balance,
            });
            completed.write(LevelCompleted {
                reward: config.level_reward,
                balance,
            });
        }
    }
}

pub struct ObjectivesPlugin;

impl Plugin for ObjectivesPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<ObjectiveTracker>()
            .add_message::<ObjectiveEvent>()
            .add_message::<LevelCompleted>()
            .add_message::<CoinsEarned>();
    }
}
