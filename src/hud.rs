//! Presentation: read-only snapshots, the text HUD and gizmo overlays.
//!
//! [`RobotReadout`] and [`ShopRows`] are rebuilt every frame from simulation
//! state and are the only things the text HUD reads.  Both have pure builders
//! so the formatting can be tested without a window.
//!
//! [`Notices`] is the one event-fed piece: coin credits, tank alerts and
//! purchase results show up under the status line for [`NOTICE_SECS`].

use crate::config::SimConfig;
use crate::constants::{MAX_NOTICES, NOTICE_SECS};
use crate::economy::{CoinSource, CoinsEarned, EconomyLedger};
use crate::locomotion::Pose;
use crate::robot::{
    CollectionTank, DockState, PowerCell, Robot, RobotMode, TankChanged, TankKind,
};
use crate::scanner::{Highlighted, PulseScanner};
use crate::session::SessionPhase;
use crate::tank::TankTransition;
use crate::traction::{TerrainState, TractionState};
use crate::upgrades::{PurchaseOutcome, UpgradeCatalog, UpgradeTrack};
use bevy::prelude::*;

// ── Snapshots ─────────────────────────────────────────────────────────────────

#[derive(Resource, Debug, Default, Clone, Copy, PartialEq)]
pub struct RobotReadout {
    pub power: f32,
    pub power_capacity: f32,
    pub collection: f32,
    pub collection_capacity: f32,
    pub burdened: bool,
    pub turbo: bool,
    pub terrain: TerrainState,
    pub autonomous: bool,
    pub docked: bool,
    /// Power below the low-power warning fraction.
    pub low_power: bool,
}

impl RobotReadout {
    pub fn capture(
        power: &PowerCell,
        collection: &CollectionTank,
        traction: &TractionState,
        mode: &RobotMode,
        dock: &DockState,
        low_power_fraction: f32,
    ) -> Self {
        Self {
            power: power.0.level(),
            power_capacity: power.0.capacity(),
            collection: collection.0.level(),
            collection_capacity: collection.0.capacity(),
            burdened: traction.burdened(),
            turbo: mode.turbo_active,
            terrain: traction.terrain(),
            autonomous: mode.autonomous,
            docked: dock.docked(),
            low_power: power.0.fraction() < low_power_fraction,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShopRow {
    pub track: UpgradeTrack,
    pub label: &'static str,
    pub level: u32,
    pub max_level: u32,
    /// `None` once maxed.
    pub cost: Option<u32>,
    pub affordable: bool,
}

#[derive(Resource, Debug, Default, Clone, PartialEq, Eq)]
pub struct ShopRows(pub Vec<ShopRow>);

impl ShopRows {
    pub fn build(catalog: &UpgradeCatalog, balance: u32) -> Self {
        Self(
            UpgradeTrack::ALL
                .iter()
                .map(|&track| ShopRow {
                    track,
                    label: track.label(),
                    level: catalog.level(track),
                    max_level: catalog.max_level(track),
                    cost: catalog.cost(track),
                    affordable: catalog.can_afford(track, balance),
                })
                .collect(),
        )
    }
}

pub fn format_readout(r: &RobotReadout, balance: u32) -> String {
    let mut flags = Vec::new();
    if r.autonomous {
        flags.push("AUTO");
    }
    if r.turbo {
        flags.push("TURBO");
    }
    if r.burdened {
        flags.push("BURDENED");
    }
    if r.docked {
        flags.push("DOCKED");
    }
    if r.low_power {
        flags.push("LOW POWER");
    }
    format!(
        "Power {:.0}/{:.0}  Tank {:.0}/{:.0}  {}  Coins {}{}{}",
        r.power,
        r.power_capacity,
        r.collection,
        r.collection_capacity,
        r.terrain.label(),
        balance,
        if flags.is_empty() { "" } else { "  " },
        flags.join(" ")
    )
}

pub fn format_shop(rows: &ShopRows, balance: u32) -> String {
    let mut out = format!("SHOP  ({balance} coins)  Enter: start  Shift+R: reset\n");
    for (i, row) in rows.0.iter().enumerate() {
        let price = match row.cost {
            Some(cost) if row.affordable => format!("${cost}"),
            Some(cost) => format!("${cost} (need more)"),
            None => "MAX LEVEL".to_string(),
        };
        out.push_str(&format!(
            "{}. {}  {}/{}  {}\n",
            i + 1,
            row.label,
            row.level,
            row.max_level,
            price
        ));
    }
    out
}

// ── Notices ───────────────────────────────────────────────────────────────────

/// Short-lived HUD lines, newest last.
#[derive(Resource, Debug, Default, Clone, PartialEq)]
pub struct Notices {
    entries: Vec<(String, f32)>,
}

impl Notices {
    pub fn push(&mut self, text: impl Into<String>) {
        self.entries.push((text.into(), NOTICE_SECS));
        if self.entries.len() > MAX_NOTICES {
            let excess = self.entries.len() - MAX_NOTICES;
            self.entries.drain(..excess);
        }
    }

    /// Age every notice by `dt` and drop the expired ones.
    pub fn tick(&mut self, dt: f32) {
        for (_, remaining) in &mut self.entries {
            *remaining -= dt;
        }
        self.entries.retain(|(_, remaining)| *remaining > 0.0);
    }

    pub fn lines(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(text, _)| text.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

pub fn coin_notice(earned: &CoinsEarned) -> String {
    match earned.source {
        CoinSource::Trash => format!("+{} coins (trash)", earned.amount),
        CoinSource::LevelReward => format!("+{} coins (level reward)", earned.amount),
    }
}

/// Only the transitions a player needs to act on get a notice.
pub fn tank_notice(change: &TankChanged) -> Option<String> {
    let text = match (change.tank, change.transition) {
        (TankKind::Collection, TankTransition::Filled) => "TANK FULL: return to the dock",
        (TankKind::Collection, TankTransition::Emptied) => "Tank emptied",
        (TankKind::Power, TankTransition::Emptied) => "BATTERY EMPTY",
        (TankKind::Power, TankTransition::Filled) => "Battery charged",
        (_, TankTransition::NoLongerFull) => return None,
    };
    Some(text.to_string())
}

pub fn purchase_notice(outcome: &PurchaseOutcome) -> String {
    match &outcome.result {
        Ok(receipt) => format!(
            "Bought {} level {} for ${}",
            receipt.track.label(),
            receipt.new_level,
            receipt.cost_paid
        ),
        Err(err) => format!("{}: {}", outcome.track.label(), err),
    }
}

/// Feed [`Notices`] from gameplay messages and expire old lines.
///
/// Ages by real time so notices still fade while the shop pauses the
/// simulation clock.
pub fn notice_system(
    time: Res<Time<Real>>,
    mut notices: ResMut<Notices>,
    mut coins: MessageReader<CoinsEarned>,
    mut tanks: MessageReader<TankChanged>,
    mut purchases: MessageReader<PurchaseOutcome>,
) {
    notices.tick(time.delta_secs());
    for earned in coins.read() {
        notices.push(coin_notice(earned));
    }
    for change in tanks.read() {
        if let Some(text) = tank_notice(change) {
            notices.push(text);
        }
    }
    for outcome in purchases.read() {
        match &outcome.result {
            Ok(receipt) => info!(
                "[hud] purchased {} level {} (balance {})",
                receipt.track.key(),
                receipt.new_level,
                receipt.balance
            ),
            Err(err) => info!("[hud] purchase refused: {err}"),
        }
        notices.push(purchase_notice(outcome));
    }
}

// ── Snapshot systems ──────────────────────────────────────────────────────────

pub fn robot_readout_system(
    config: Res<SimConfig>,
    mut readout: ResMut<RobotReadout>,
    q_robot: Query<
        (&PowerCell, &CollectionTank, &TractionState, &RobotMode, &DockState),
        With<Robot>,
    >,
) {
    if let Ok((power, collection, traction, mode, dock)) = q_robot.single() {
        *readout = RobotReadout::capture(
            power,
            collection,
            traction,
            mode,
            dock,
            config.low_power_fraction,
        );
    }
}

pub fn shop_rows_system(
    catalog: Res<UpgradeCatalog>,
    ledger: Res<EconomyLedger>,
    mut rows: ResMut<ShopRows>,
) {
    *rows = ShopRows::build(&catalog, ledger.balance());
}

// ── Text HUD ──────────────────────────────────────────────────────────────────

#[derive(Component)]
pub struct HudStatusDisplay;

#[derive(Component)]
pub struct HudPanelDisplay;

/// Spawn the world camera, scaled so one world unit is `pixels_per_unit` px.
pub fn setup_camera(mut commands: Commands, config: Res<SimConfig>) {
    let scale = 1.0 / config.pixels_per_unit.max(1.0);
    commands.spawn((Camera2d, Transform::from_scale(Vec3::new(scale, scale, 1.0))));
}

pub fn setup_hud(mut commands: Commands, config: Res<SimConfig>) {
    commands
        .spawn((
            Node {
                position_type: PositionType::Absolute,
                left: Val::Px(10.0),
                top: Val::Px(10.0),
                ..default()
            },
            HudStatusDisplay,
        ))
        .with_children(|parent| {
            parent.spawn((
                Text::new(""),
                TextFont {
                    font_size: config.hud_font_size,
                    ..default()
                },
                TextColor(Color::srgb(0.95, 0.88, 0.45)),
            ));
        });

    commands
        .spawn((
            Node {
                position_type: PositionType::Absolute,
                left: Val::Px(10.0),
                top: Val::Px(10.0 + (config.hud_font_size + 4.0) * (MAX_NOTICES as f32 + 1.0) + 8.0),
                ..default()
            },
            HudPanelDisplay,
        ))
        .with_children(|parent| {
            parent.spawn((
                Text::new(""),
                TextFont {
                    font_size: config.hud_font_size,
                    ..default()
                },
                TextColor(Color::srgb(0.0, 1.0, 1.0)),
            ));
        });
}

fn set_child_text(children: &Children, text_query: &mut Query<&mut Text>, value: &str) {
    for child in children.iter() {
        if let Ok(mut text) = text_query.get_mut(child) {
            if text.0 != value {
                *text = Text::new(value);
            }
        }
    }
}

/// Refresh the status line and the phase panel.
pub fn hud_text_system(
    readout: Res<RobotReadout>,
    rows: Res<ShopRows>,
    notices: Res<Notices>,
    ledger: Res<EconomyLedger>,
    phase: Res<State<SessionPhase>>,
    q_status: Query<&Children, With<HudStatusDisplay>>,
    q_panel: Query<&Children, (With<HudPanelDisplay>, Without<HudStatusDisplay>)>,
    mut text_query: Query<&mut Text>,
) {
    let mut status = format_readout(&readout, ledger.balance());
    for line in notices.lines() {
        status.push('\n');
        status.push_str(line);
    }
    for children in &q_status {
        set_child_text(children, &mut text_query, &status);
    }

    let panel = match phase.get() {
        SessionPhase::Shop => format_shop(&rows, ledger.balance()),
        SessionPhase::Running => "W/S drive  A/D turn  Shift turbo  I autonomous  E shop (docked)".to_string(),
        SessionPhase::LevelComplete => "LEVEL COMPLETE  Enter: continue".to_string(),
    };
    for children in &q_panel {
        set_child_text(children, &mut text_query, &panel);
    }
}

// ── Gizmos ────────────────────────────────────────────────────────────────────

/// Heading line, scanner rings and highlight circles.
pub fn robot_gizmo_system(
    mut gizmos: Gizmos,
    config: Res<SimConfig>,
    q_robot: Query<(&Pose, &PulseScanner, &RobotMode), With<Robot>>,
    q_highlighted: Query<&Transform, With<Highlighted>>,
) {
    let Ok((pose, scanner, mode)) = q_robot.single() else {
        return;
    };
    let color = if mode.turbo_active {
        Color::srgb(1.0, 0.5, 0.0)
    } else if mode.autonomous {
        Color::srgb(0.3, 0.8, 1.0)
    } else {
        Color::WHITE
    };
    let nose = pose.position + pose.forward() * config.robot_radius * 1.5;
    gizmos.line_2d(pose.position, nose, color);

    for radius in scanner.ring_radii() {
        gizmos.circle_2d(pose.position, radius, Color::srgba(0.3, 1.0, 0.6, 0.5));
    }
    for tf in &q_highlighted {
        gizmos.circle_2d(tf.translation.truncate(), 0.35, Color::srgb(1.0, 1.0, 0.2));
    }
}

pub struct HudPlugin;

impl Plugin for HudPlugin {
    fn build(&self, app: &mut App) {
        app.add_message::<CoinsEarned>()
            .add_message::<TankChanged>()
            .add_message::<PurchaseOutcome>()
            .init_resource::<RobotReadout>()
            .init_resource::<ShopRows>()
            .init_resource::<Notices>()
            .add_systems(Startup, (setup_camera, setup_hud))
            .add_systems(
                Update,
                (
                    (robot_readout_system, shop_rows_system, notice_system),
                    hud_text_system,
                    robot_gizmo_system,
                )
                    .chain(),
            );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PurchaseError;
    use crate::tank::Tank;
    use crate::upgrades::PurchaseReceipt;

    #[test]
    fn readout_reflects_robot_state() {
        let traction = TractionState::default();
        let readout = RobotReadout::capture(
            &PowerCell(Tank::new(100.0, 20.0)),
            &CollectionTank(Tank::new(10.0, 3.0)),
            &traction,
            &RobotMode {
                autonomous: true,
                ..Default::default()
            },
            &DockState { contacts: 1 },
            0.25,
        );
        assert!(readout.low_power);
        assert!(readout.docked);
        assert!(readout.autonomous);
        assert_eq!(readout.terrain, TerrainState::Dry);
        let line = format_readout(&readout, 42);
        assert!(line.contains("Power 20/100"));
        assert!(line.contains("Tank 3/10"));
        assert!(line.contains("Coins 42"));
        assert!(line.contains("AUTO"));
        assert!(line.contains("LOW POWER"));
    }

    #[test]
    fn shop_rows_track_affordability_and_max() {
        let config = SimConfig::default();
        let catalog = UpgradeCatalog::from_config(&config);
        let rows = ShopRows::build(&catalog, 150);
        assert_eq!(rows.0.len(), UpgradeTrack::ALL.len());
        let speed = rows.0[0];
        assert_eq!(speed.track, UpgradeTrack::Speed);
        assert_eq!(speed.cost, Some(100));
        assert!(speed.affordable);
        let resistance = rows
            .0
            .iter()
            .find(|r| r.track == UpgradeTrack::Resistance)
            .unwrap();
        assert_eq!(resistance.cost, Some(8));
        assert_eq!(resistance.max_level, 5);

        let text = format_shop(&rows, 150);
        assert!(text.contains("1. "));
        assert!(text.contains("$100"));
    }

    #[test]
    fn poor_shop_marks_rows_unaffordable() {
        let config = SimConfig::default();
        let catalog = UpgradeCatalog::from_config(&config);
        let rows = ShopRows::build(&catalog, 5);
        assert!(rows.0.iter().all(|r| !r.affordable));
        assert!(format_shop(&rows, 5).contains("need more"));
    }

    #[test]
    fn notices_expire_and_cap() {
        let mut notices = Notices::default();
        notices.push("first");
        notices.tick(NOTICE_SECS - 0.5);
        notices.push("second");
        assert_eq!(notices.lines().collect::<Vec<_>>(), vec!["first", "second"]);

        notices.tick(1.0);
        assert_eq!(notices.lines().collect::<Vec<_>>(), vec!["second"]);
        notices.tick(NOTICE_SECS);
        assert!(notices.is_empty());

        for i in 0..MAX_NOTICES + 2 {
            notices.push(format!("n{i}"));
        }
        let lines: Vec<_> = notices.lines().collect();
        assert_eq!(lines.len(), MAX_NOTICES);
        assert_eq!(lines[0], "n2");
    }

    #[test]
    fn only_actionable_tank_transitions_are_announced() {
        let full = TankChanged {
            tank: TankKind::Collection,
            transition: TankTransition::Filled,
        };
        assert!(tank_notice(&full).unwrap().contains("TANK FULL"));
        let dead = TankChanged {
            tank: TankKind::Power,
            transition: TankTransition::Emptied,
        };
        assert_eq!(tank_notice(&dead).as_deref(), Some("BATTERY EMPTY"));
        let draining = TankChanged {
            tank: TankKind::Collection,
            transition: TankTransition::NoLongerFull,
        };
        assert_eq!(tank_notice(&draining), None);
    }

    #[test]
    fn notice_system_reads_gameplay_messages() {
        let mut app = App::new();
        app.init_resource::<Time<Real>>();
        app.init_resource::<Notices>();
        app.add_message::<CoinsEarned>();
        app.add_message::<TankChanged>();
        app.add_message::<PurchaseOutcome>();
        app.add_systems(Update, notice_system);

        app.world_mut().write_message(CoinsEarned {
            amount: 2,
            source: CoinSource::Trash,
            balance: 2,
        });
        app.world_mut().write_message(TankChanged {
            tank: TankKind::Collection,
            transition: TankTransition::Filled,
        });
        app.world_mut().write_message(PurchaseOutcome {
            track: UpgradeTrack::Speed,
            result: Ok(PurchaseReceipt {
                track: UpgradeTrack::Speed,
                new_level: 1,
                cost_paid: 100,
                balance: 100,
            }),
        });
        app.world_mut().write_message(PurchaseOutcome {
            track: UpgradeTrack::LiquidAttachment,
            result: Err(PurchaseError::TrackMaxed {
                track: UpgradeTrack::LiquidAttachment,
            }),
        });
        app.update();

        let notices = app.world().resource::<Notices>();
        let lines: Vec<_> = notices.lines().collect();
        assert_eq!(lines.len(), 4);
        assert_eq!(lines[0], "+2 coins (trash)");
        assert!(lines[1].starts_with("TANK FULL"));
        assert_eq!(lines[2], "Bought SPEED level 1 for $100");
        assert!(lines[3].contains("already maxed"), "{}", lines[3]);
    }
}
