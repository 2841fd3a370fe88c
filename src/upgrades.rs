//! Upgrade catalog: per-track levels, pricing, purchase and effects.
//!
//! ## Tracks
//!
//! | Track | Effect | Max | Pricing |
//! |-------|--------|-----|---------|
//! | `Speed` | `base_speed + level·speed_per_level` | 3 | cost table |
//! | `Battery` | `power_capacity + level·battery_per_level`, top-up on purchase | 3 | cost table |
//! | `IntakeRadius` | `intake_radius + level·intake_radius_per_level` | 3 | cost table |
//! | `Capacity` | `collection_capacity + level·capacity_per_level` | 3 | cost table |
//! | `Scanner` | `scanner_ranges[level − 1]`, off at level 0 | 3 | cost table |
//! | `Resistance` | burden resistance `r = level` | 5 | step (base, +increment) |
//! | `LiquidAttachment` | puddle attachment fitted | 1 | step |
//!
//! A purchase debits the ledger, bumps the level, persists both (each followed
//! by a flush) and then applies the track effect to the live robot.  A
//! rejected purchase touches nothing.

use crate::config::SimConfig;
use crate::economy::EconomyLedger;
use crate::error::PurchaseError;
use crate::persistence::{read_u32, write_and_flush, Progress, ProgressStore};
use crate::robot::state::{
    CollectionTank, PowerCell, Robot, RobotParams, TankChanged, TankKind,
};
use crate::tank::{Crossings, Tank};
use bevy::prelude::*;

// ── Tracks ────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum UpgradeTrack {
    Speed,
    Battery,
    IntakeRadius,
    Capacity,
    Scanner,
    Resistance,
    LiquidAttachment,
}

impl UpgradeTrack {
    /// Every track, in shop order.
    pub const ALL: [UpgradeTrack; 7] = [
        UpgradeTrack::Speed,
        UpgradeTrack::Battery,
        UpgradeTrack::IntakeRadius,
        UpgradeTrack::Capacity,
        UpgradeTrack::Scanner,
        UpgradeTrack::Resistance,
        UpgradeTrack::LiquidAttachment,
    ];

    /// Stable persistence prefix.
    #[inline]
    pub fn key(self) -> &'static str {
        match self {
            UpgradeTrack::Speed => "Speed",
            UpgradeTrack::Battery => "Battery",
            UpgradeTrack::IntakeRadius => "IntakeRadius",
            UpgradeTrack::Capacity => "Capacity",
            UpgradeTrack::Scanner => "Scanner",
            UpgradeTrack::Resistance => "Resistance",
            UpgradeTrack::LiquidAttachment => "LiquidAttachment",
        }
    }

    pub fn level_key(self) -> String {
        format!("{}Level", self.key())
    }

    pub fn cost_key(self) -> String {
        format!("{}Cost", self.key())
    }

    #[inline]
    pub fn label(self) -> &'static str {
        match self {
            UpgradeTrack::Speed => "SPEED",
            UpgradeTrack::Battery => "BATTERY",
            UpgradeTrack::IntakeRadius => "INTAKE",
            UpgradeTrack::Capacity => "CAPACITY",
            UpgradeTrack::Scanner => "SCANNER",
            UpgradeTrack::Resistance => "RESISTANCE",
            UpgradeTrack::LiquidAttachment => "ATTACHMENT",
        }
    }

    /// Position in [`UpgradeTrack::ALL`].
    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }
}

// ── Pricing ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CostPolicy {
    /// Price of level `n + 1` is `table[n]`.
    Table(Vec<u32>),
    /// Price starts at `base` and grows by `increment` after every purchase.
    Step { base: u32, increment: u32 },
}

impl CostPolicy {
    /// A table whose entries never decrease.
    pub fn monotonic_table(costs: &[u32]) -> Self {
        let mut running = 0;
        CostPolicy::Table(
            costs
                .iter()
                .map(|&c| {
                    running = running.max(c);
                    running
                })
                .collect(),
        )
    }
}

/// Level and price of one track.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackState {
    pub track: UpgradeTrack,
    pub level: u32,
    pub max_level: u32,
    pub policy: CostPolicy,
    /// Current price of a step-priced track; unused for tables.
    step_cost: u32,
}

impl TrackState {
    pub fn new(track: UpgradeTrack, max_level: u32, policy: CostPolicy) -> Self {
        let (max_level, step_cost) = match &policy {
            CostPolicy::Table(t) => (max_level.min(t.len() as u32), 0),
            CostPolicy::Step { base, .. } => (max_level, *base),
        };
        Self {
            track,
            level: 0,
            max_level,
            policy,
            step_cost,
        }
    }

    #[inline]
    pub fn is_maxed(&self) -> bool {
        self.level >= self.max_level
    }

    /// Price of the next level, or `None` once maxed.
    pub fn cost(&self) -> Option<u32> {
        if self.is_maxed() {
            return None;
        }
        match &self.policy {
            CostPolicy::Table(t) => t.get(self.level as usize).copied(),
            CostPolicy::Step { .. } => Some(self.step_cost),
        }
    }

    fn derived_step_cost(&self) -> u32 {
        match self.policy {
            CostPolicy::Step { base, increment } => {
                base.saturating_add(increment.saturating_mul(self.level))
            }
            CostPolicy::Table(_) => 0,
        }
    }
}

/// Successful purchase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PurchaseReceipt {
    pub track: UpgradeTrack,
    pub new_level: u32,
    pub cost_paid: u32,
    pub balance: u32,
}

// ── Catalog ───────────────────────────────────────────────────────────────────

/// All tracks with their levels and prices.
#[derive(Resource, Debug, Clone, PartialEq, Eq)]
pub struct UpgradeCatalog {
    tracks: Vec<TrackState>,
}

impl UpgradeCatalog {
    /// A fresh catalog (every level 0) priced from `config`.
    pub fn from_config(config: &SimConfig) -> Self {
        let table = CostPolicy::monotonic_table(&config.upgrade_cost_table);
        let table_max = config.upgrade_cost_table.len() as u32;
        let tracks = UpgradeTrack::ALL
            .iter()
            .map(|&track| match track {
                UpgradeTrack::Resistance => TrackState::new(
                    track,
                    config.resistance_max_level,
                    CostPolicy::Step {
                        base: config.resistance_base_cost,
                        increment: config.resistance_cost_step,
                    },
                ),
                UpgradeTrack::LiquidAttachment => TrackState::new(
                    track,
                    1,
                    CostPolicy::Step {
                        base: config.attachment_cost,
                        increment: 0,
                    },
                ),
                _ => TrackState::new(track, table_max, table.clone()),
            })
            .collect();
        Self { tracks }
    }

    /// Catalog priced from `config` with levels and step prices read from `store`.
    /// Out-of-range levels are clamped to the track maximum.
    pub fn load(config: &SimConfig, store: &dyn ProgressStore) -> Self {
        let mut catalog = Self::from_config(config);
        for state in &mut catalog.tracks {
            state.level = read_u32(store, &state.track.level_key(), 0).min(state.max_level);
            if let CostPolicy::Step { base, .. } = state.policy {
                let derived = state.derived_step_cost();
                state.step_cost = read_u32(store, &state.track.cost_key(), derived).max(base);
            }
        }
        catalog
    }

    pub fn track(&self, track: UpgradeTrack) -> &TrackState {
        &self.tracks[track.index()]
    }

    pub fn tracks(&self) -> &[TrackState] {
        &self.tracks
    }

    #[inline]
    pub fn level(&self, track: UpgradeTrack) -> u32 {
        self.track(track).level
    }

    #[inline]
    pub fn max_level(&self, track: UpgradeTrack) -> u32 {
        self.track(track).max_level
    }

    /// Price of the next level; the one accessor used by both the shop
    /// readout and [`purchase`](Self::purchase).
    #[inline]
    pub fn cost(&self, track: UpgradeTrack) -> Option<u32> {
        self.track(track).cost()
    }

    pub fn can_afford(&self, track: UpgradeTrack, balance: u32) -> bool {
        self.cost(track).is_some_and(|c| balance >= c)
    }

    /// Buy the next level of `track`.
    pub fn purchase(
        &mut self,
        track: UpgradeTrack,
        ledger: &mut EconomyLedger,
        store: &mut dyn ProgressStore,
    ) -> Result<PurchaseReceipt, PurchaseError> {
        let state = &mut self.tracks[track.index()];
        let cost = state.cost().ok_or(PurchaseError::TrackMaxed { track })?;
        let balance = ledger.debit(cost, store)?;

        state.level += 1;
        write_and_flush(store, &track.level_key(), i64::from(state.level));
        if let CostPolicy::Step { increment, .. } = state.policy {
            state.step_cost = state.step_cost.saturating_add(increment);
            write_and_flush(store, &track.cost_key(), i64::from(state.step_cost));
        }

        info!(
            "[shop] {} upgraded to level {} for {} coins ({} left)",
            track.key(),
            state.level,
            cost,
            balance
        );
        Ok(PurchaseReceipt {
            track,
            new_level: state.level,
            cost_paid: cost,
            balance,
        })
    }
}

// ── Effects ───────────────────────────────────────────────────────────────────

/// Live robot state an upgrade may change.
pub struct UpgradeTarget<'a> {
    pub params: &'a mut RobotParams,
    pub power: &'a mut Tank,
    pub collection: &'a mut Tank,
}

/// Tank crossings caused by a capacity change.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct EffectCrossings {
    pub power: Crossings,
    pub collection: Crossings,
}

/// Scanner range at `level`; `None` at level 0.  Levels past the table reuse
/// its last entry.
pub fn scanner_range_for(config: &SimConfig, level: u32) -> Option<f32> {
    if level == 0 {
        return None;
    }
    let idx = (level as usize - 1).min(config.scanner_ranges.len().saturating_sub(1));
    config.scanner_ranges.get(idx).copied()
}

/// Set the parameter governed by `track` to its value at `level`.
pub fn apply_track_effect(
    track: UpgradeTrack,
    level: u32,
    config: &SimConfig,
    target: &mut UpgradeTarget<'_>,
) -> EffectCrossings {
    let lvl = level as f32;
    let mut out = EffectCrossings::default();
    match track {
        UpgradeTrack::Speed => {
            target.params.base_speed = config.base_speed + lvl * config.speed_per_level;
        }
        UpgradeTrack::Battery => {
            out.power = target
                .power
                .set_capacity(config.power_capacity + lvl * config.battery_per_level);
        }
        UpgradeTrack::IntakeRadius => {
            target.params.intake_radius =
                config.intake_radius + lvl * config.intake_radius_per_level;
        }
        UpgradeTrack::Capacity => {
            out.collection = target
                .collection
                .set_capacity(config.collection_capacity + lvl * config.capacity_per_level);
        }
        UpgradeTrack::Scanner => {
            target.params.scanner_range = scanner_range_for(config, level);
        }
        UpgradeTrack::Resistance => {
            target.params.resistance = level;
        }
        UpgradeTrack::LiquidAttachment => {
            target.params.has_attachment = level >= 1;
        }
    }
    out
}

/// Effect of a fresh purchase: the level effect, plus a battery top-up.
pub fn apply_purchase_effect(
    receipt: &PurchaseReceipt,
    config: &SimConfig,
    target: &mut UpgradeTarget<'_>,
) -> EffectCrossings {
    let mut out = apply_track_effect(receipt.track, receipt.new_level, config, target);
    if receipt.track == UpgradeTrack::Battery {
        let topped = target.power.top_up(config.battery_per_level);
        if out.power.is_empty() {
            out.power = topped;
        }
    }
    out
}

/// Robot parameters and tanks for a level start: every purchased level
/// applied, power full and collection empty.
pub fn robot_loadout(config: &SimConfig, catalog: &UpgradeCatalog) -> (RobotParams, Tank, Tank) {
    let mut params = RobotParams::base(config);
    let mut power = Tank::full_of(config.power_capacity);
    let mut collection = Tank::empty_of(config.collection_capacity);
    {
        let mut target = UpgradeTarget {
            params: &mut params,
            power: &mut power,
            collection: &mut collection,
        };
        for state in catalog.tracks() {
            apply_track_effect(state.track, state.level, config, &mut target);
        }
    }
    let power = Tank::full_of(power.capacity());
    (params, power, collection)
}

// ── Bevy glue ─────────────────────────────────────────────────────────────────

/// Ask the shop to buy the next level of a track.
#[derive(Message, Debug, Clone, Copy, PartialEq, Eq)]
pub struct PurchaseRequest {
    pub track: UpgradeTrack,
}

/// Result of a [`PurchaseRequest`].
#[derive(Message, Debug, Clone, Copy, PartialEq, Eq)]
pub struct PurchaseOutcome {
    pub track: UpgradeTrack,
    pub result: Result<PurchaseReceipt, PurchaseError>,
}

/// Process purchase requests against the ledger and apply effects to the
/// live robot (if one is spawned).
#[allow(clippy::too_many_arguments)]
pub fn purchase_request_system(
    mut requests: MessageReader<PurchaseRequest>,
    mut outcomes: MessageWriter<PurchaseOutcome>,
    mut tank_events: MessageWriter<TankChanged>,
    config: Res<SimConfig>,
    mut catalog: ResMut<UpgradeCatalog>,
    mut ledger: ResMut<EconomyLedger>,
    mut progress: ResMut<Progress>,
    mut q_robot: Query<(&mut RobotParams, &mut PowerCell, &mut CollectionTank), With<Robot>>,
) {
    for req in requests.read() {
        let result = catalog.purchase(req.track, &mut ledger, progress.store_mut());
        match &result {
            Ok(receipt) => {
                if let Ok((mut params, mut power, mut collection)) = q_robot.single_mut() {
                    let mut target = UpgradeTarget {
                        params: &mut params,
                        power: &mut power.0,
                        collection: &mut collection.0,
                    };
                    let crossings = apply_purchase_effect(receipt, &config, &mut target);
                    for transition in crossings.power.iter() {
                        tank_events.write(TankChanged {
                            tank: TankKind::Power,
                            transition,
                        });
                    }
                    for transition in crossings.collection.iter() {
                        tank_events.write(TankChanged {
                            tank: TankKind::Collection,
                            transition,
                        });
                    }
                }
            }
            Err(e) => info!("[shop] purchase of {} rejected: {e}", req.track.key()),
        }
        outcomes.write(PurchaseOutcome {
            track: req.track,
            result,
        });
    }
}

pub struct UpgradesPlugin;

impl Plugin for UpgradesPlugin {
    fn build(&self, app: &mut App) {
        app.add_message::<PurchaseRequest>()
            .add_message::<PurchaseOutcome>()
            .add_message::<TankChanged>()
            .add_systems(Update, purchase_request_system);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::economy::COINS_KEY;
    use crate::persistence::MemoryStore;

    fn config() -> SimConfig {
        SimConfig::default()
    }

    #[test]
    fn affordable_purchase_debits_and_levels_up() {
        let config = config();
        let mut store = MemoryStore::new();
        let mut ledger = EconomyLedger::new(150);
        let mut catalog = UpgradeCatalog::from_config(&config);

        let receipt = catalog
            .purchase(UpgradeTrack::Speed, &mut ledger, &mut store)
            .unwrap();

        assert_eq!(receipt.cost_paid, 100);
        assert_eq!(ledger.balance(), 50);
        assert_eq!(catalog.level(UpgradeTrack::Speed), 1);
        assert_eq!(store.get_int(COINS_KEY, -1), 50);
        assert_eq!(store.get_int("SpeedLevel", -1), 1);
        assert_eq!(store.flush_count(), 2);

        let (mut params, mut power, mut collection) = robot_loadout(&config, &UpgradeCatalog::from_config(&config));
        let mut target = UpgradeTarget {
            params: &mut params,
            power: &mut power,
            collection: &mut collection,
        };
        apply_purchase_effect(&receipt, &config, &mut target);
        assert_eq!(params.base_speed, config.base_speed + config.speed_per_level);
    }

    #[test]
    fn rejected_purchase_changes_nothing() {
        let config = config();
        let mut store = MemoryStore::new();
        let mut ledger = EconomyLedger::new(40);
        let mut catalog = UpgradeCatalog::from_config(&config);
        let before = catalog.clone();

        let err = catalog
            .purchase(UpgradeTrack::Battery, &mut ledger, &mut store)
            .unwrap_err();

        assert_eq!(
            err,
            PurchaseError::InsufficientFunds {
                cost: 100,
                balance: 40
            }
        );
        assert_eq!(catalog, before);
        assert_eq!(ledger.balance(), 40);
        assert!(store.entries().is_empty());
    }

    #[test]
    fn maxed_track_is_rejected_with_track_maxed() {
        let config = config();
        let mut store = MemoryStore::new();
        let mut ledger = EconomyLedger::new(10_000);
        let mut catalog = UpgradeCatalog::from_config(&config);

        for _ in 0..3 {
            catalog
                .purchase(UpgradeTrack::Capacity, &mut ledger, &mut store)
                .unwrap();
        }
        let balance = ledger.balance();
        assert_eq!(catalog.cost(UpgradeTrack::Capacity), None);
        assert_eq!(
            catalog.purchase(UpgradeTrack::Capacity, &mut ledger, &mut store),
            Err(PurchaseError::TrackMaxed {
                track: UpgradeTrack::Capacity
            })
        );
        assert_eq!(ledger.balance(), balance);
    }

    #[test]
    fn successive_purchases_never_decrease_level_or_cost() {
        let config = config();
        let mut store = MemoryStore::new();
        let mut ledger = EconomyLedger::new(10_000);
        let mut catalog = UpgradeCatalog::from_config(&config);

        for track in UpgradeTrack::ALL {
            let mut last_level = catalog.level(track);
            let mut last_cost = 0;
            while let Some(cost) = catalog.cost(track) {
                assert!(cost >= last_cost, "{track:?} cost fell");
                catalog.purchase(track, &mut ledger, &mut store).unwrap();
                assert!(catalog.level(track) > last_level);
                last_level = catalog.level(track);
                last_cost = cost;
            }
            assert_eq!(catalog.level(track), catalog.max_level(track));
        }
    }

    #[test]
    fn step_track_cost_grows_and_is_persisted() {
        let config = config();
        let mut store = MemoryStore::new();
        let mut ledger = EconomyLedger::new(100);
        let mut catalog = UpgradeCatalog::from_config(&config);

        assert_eq!(catalog.cost(UpgradeTrack::Resistance), Some(8));
        catalog
            .purchase(UpgradeTrack::Resistance, &mut ledger, &mut store)
            .unwrap();
        assert_eq!(catalog.cost(UpgradeTrack::Resistance), Some(13));
        assert_eq!(store.get_int("ResistanceCost", 0), 13);

        let reloaded = UpgradeCatalog::load(&config, &store);
        assert_eq!(reloaded.level(UpgradeTrack::Resistance), 1);
        assert_eq!(reloaded.cost(UpgradeTrack::Resistance), Some(13));
    }

    #[test]
    fn load_clamps_corrupt_levels_to_max() {
        let config = config();
        let mut store = MemoryStore::new();
        store.set_int("SpeedLevel", 99);
        store.set_int("ScannerLevel", -4);
        let catalog = UpgradeCatalog::load(&config, &store);
        assert_eq!(catalog.level(UpgradeTrack::Speed), 3);
        assert_eq!(catalog.level(UpgradeTrack::Scanner), 0);
    }

    #[test]
    fn battery_purchase_raises_capacity_and_tops_up() {
        let config = config();
        let mut store = MemoryStore::new();
        let mut ledger = EconomyLedger::new(100);
        let mut catalog = UpgradeCatalog::from_config(&config);
        let (mut params, _, mut collection) = robot_loadout(&config, &catalog);
        let mut power = Tank::new(config.power_capacity, 30.0);

        let receipt = catalog
            .purchase(UpgradeTrack::Battery, &mut ledger, &mut store)
            .unwrap();
        let mut target = UpgradeTarget {
            params: &mut params,
            power: &mut power,
            collection: &mut collection,
        };
        apply_purchase_effect(&receipt, &config, &mut target);

        assert_eq!(power.capacity(), 150.0);
        assert_eq!(power.level(), 80.0);
    }

    #[test]
    fn loadout_applies_every_purchased_level() {
        let config = config();
        let mut store = MemoryStore::new();
        store.set_int("ScannerLevel", 2);
        store.set_int("CapacityLevel", 1);
        store.set_int("LiquidAttachmentLevel", 1);
        store.set_int("ResistanceLevel", 3);
        let catalog = UpgradeCatalog::load(&config, &store);

        let (params, power, collection) = robot_loadout(&config, &catalog);
        assert_eq!(params.scanner_range, Some(10.0));
        assert!(params.has_attachment);
        assert_eq!(params.resistance, 3);
        assert_eq!(collection.capacity(), 30.0);
        assert!(collection.is_empty());
        assert!(power.is_full());
    }

    #[test]
    fn scanner_off_at_level_zero() {
        assert_eq!(scanner_range_for(&config(), 0), None);
        assert_eq!(scanner_range_for(&config(), 1), Some(5.0));
        assert_eq!(scanner_range_for(&config(), 9), Some(15.0));
    }

    #[test]
    fn monotonic_table_never_decreases() {
        assert_eq!(
            CostPolicy::monotonic_table(&[100, 50, 300]),
            CostPolicy::Table(vec![100, 100, 300])
        );
    }
}
