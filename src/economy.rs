//! Economy & upgrade pipeline
//!
//! A single non-negative gold ledger (atomic check-then-debit), an
//! exponential cost curve per item level, weighted-without-replacement shop
//! offers, and the effect pipeline that mutates the live run state: player
//! stat copies, the per-run weapon book, and arsenal ammo. Kill credit flows
//! in through death events, scaled by the player's money multiplier.

use bevy::prelude::*;

use crate::attack::{Arsenal, WeaponBook};
use crate::combat::components::{CombatStats, GameRng, Health, PlayerPerks};
use crate::combat::events::{EntityDied, GoldChanged, ScoreChanged};
use crate::combat::log::{RunLog, RunLogEventType};
use crate::content::{
    PlayerStatKind, ShopConfig, ShopItemConfig, UpgradeEffect, WeaponBehavior, WeaponStatKind,
};
use crate::enemy::Enemy;
use crate::movement::MoveController;
use crate::player::Player;
use crate::schedule::SimSet;

/// Sentinel cost reported for an exhausted one-time item.
pub const EXHAUSTED_COST: i32 = 999_999;

/// Floor for cooldowns shrunk by upgrades.
const COOLDOWN_FLOOR: f32 = 0.05;

/// The run's gold balance. Never negative; all spending goes through
/// [`GoldLedger::try_spend`].
#[derive(Resource, Default, Debug)]
pub struct GoldLedger {
    balance: i32,
}

impl GoldLedger {
    pub fn balance(&self) -> i32 {
        self.balance
    }

    pub fn add(&mut self, amount: i32) -> i32 {
        self.balance += amount;
        self.balance
    }

    /// Atomic check-then-debit. No mutation on failure.
    pub fn try_spend(&mut self, amount: i32) -> bool {
        if self.balance >= amount {
            self.balance -= amount;
            true
        } else {
            false
        }
    }
}

/// Run totals surfaced in the summary.
#[derive(Resource, Default, Debug)]
pub struct Scoreboard {
    pub score: i32,
    pub kills: u32,
    pub survival_time: f32,
}

/// Per-run purchase counters, parallel to the shop item list. Level 0 means
/// never bought; one-time items cap at 1.
#[derive(Resource, Debug)]
pub struct ShopState {
    levels: Vec<u32>,
}

impl ShopState {
    pub fn new(item_count: usize) -> Self {
        Self { levels: vec![0; item_count] }
    }

    pub fn level(&self, index: usize) -> u32 {
        self.levels.get(index).copied().unwrap_or(0)
    }

    fn bump(&mut self, index: usize) {
        if let Some(level) = self.levels.get_mut(index) {
            *level += 1;
        }
    }

    pub fn is_exhausted(&self, item: &ShopItemConfig, index: usize) -> bool {
        item.one_time && self.level(index) > 0
    }
}

/// Price at a given owned level: `base × multiplier^level`, rounded.
/// Exhausted one-time items report the [`EXHAUSTED_COST`] sentinel.
pub fn item_cost(item: &ShopItemConfig, level: u32) -> i32 {
    if item.one_time && level > 0 {
        return EXHAUSTED_COST;
    }
    (item.base_cost as f32 * item.cost_multiplier.powi(level as i32)).round() as i32
}

/// Weighted-without-replacement offer roll: cumulative-weight roulette,
/// removing each drawn item, until `count` items are chosen or the eligible
/// pool runs dry. When the pool is no larger than the ask, the whole pool
/// comes back.
pub fn offer(shop: &ShopConfig, state: &ShopState, rng: &mut GameRng, count: usize) -> Vec<usize> {
    let mut eligible: Vec<usize> = shop
        .items
        .iter()
        .enumerate()
        .filter(|(index, item)| !state.is_exhausted(item, *index))
        .map(|(index, _)| index)
        .collect();

    if eligible.len() <= count {
        return eligible;
    }

    let mut selected = Vec::with_capacity(count);
    for _ in 0..count {
        if eligible.is_empty() {
            break;
        }
        let total: u32 = eligible.iter().map(|&i| shop.items[i].spawn_weight).sum();
        let roll = (rng.random_f32() * total as f32) as u32;

        let mut cursor = 0;
        let mut picked = eligible.len() - 1;
        for (slot, &index) in eligible.iter().enumerate() {
            cursor += shop.items[index].spawn_weight;
            if roll < cursor {
                picked = slot;
                break;
            }
        }

        selected.push(eligible.remove(picked));
    }
    selected
}

/// Everything an upgrade effect may touch, borrowed from the live player
/// entity and the run's resources.
pub struct EffectTarget<'a> {
    pub stats: &'a mut CombatStats,
    pub perks: &'a mut PlayerPerks,
    pub health: &'a mut Health,
    pub mover: &'a mut MoveController,
    pub arsenal: &'a mut Arsenal,
    pub book: &'a mut WeaponBook,
}

fn scaled_int(current: i32, amount: f32, percentage: bool) -> i32 {
    if percentage {
        (current as f32 * amount).round() as i32
    } else {
        amount.round() as i32
    }
}

fn scaled_f32(current: f32, amount: f32, percentage: bool) -> f32 {
    if percentage {
        current * amount
    } else {
        amount
    }
}

/// Apply one effect to the live run state.
pub fn apply_effect(effect: &UpgradeEffect, target: &mut EffectTarget) {
    match effect {
        UpgradeEffect::StatBuff { stat, amount, percentage } => {
            apply_stat_buff(*stat, *amount, *percentage, target)
        }
        UpgradeEffect::WeaponBuff { stat, amount, percentage, all_weapons } => {
            let weapons: Vec<_> = if *all_weapons {
                std::iter::once(target.arsenal.basic)
                    .chain(target.arsenal.specials.iter().copied())
                    .filter(|id| target.book.is_unlocked(*id))
                    .collect()
            } else {
                vec![target.arsenal.current_weapon()]
            };
            for id in weapons {
                apply_weapon_buff(target.book, id, *stat, *amount, *percentage);
            }
        }
        UpgradeEffect::UnlockWeapon { weapon } => {
            target.book.unlock(*weapon);
        }
        UpgradeEffect::RefillAmmo { fraction } => {
            target.arsenal.refill_all(target.book, *fraction);
        }
        UpgradeEffect::Heal { amount } => {
            if *amount >= 0 {
                target.health.heal(*amount);
            } else if !target.health.dead {
                // Sacrificial trade-off; never lethal.
                target.health.current = (target.health.current + amount).max(1);
            }
        }
    }
}

fn apply_stat_buff(stat: PlayerStatKind, amount: f32, percentage: bool, target: &mut EffectTarget) {
    let stats = &mut target.stats.0;
    match stat {
        PlayerStatKind::MaxHealth => {
            let increase = scaled_int(stats.max_health, amount, percentage);
            stats.max_health += increase;
            target.health.max = stats.max_health;
            target.health.heal(increase);
        }
        PlayerStatKind::Damage => {
            stats.damage += scaled_int(stats.damage, amount, percentage);
        }
        PlayerStatKind::MoveSpeed => {
            stats.move_speed += scaled_f32(stats.move_speed, amount, percentage);
            target.mover.move_speed = stats.move_speed;
        }
        PlayerStatKind::AttackCooldown => {
            // Less cooldown is the upgrade.
            let decrease = scaled_f32(stats.attack_cooldown, amount, percentage);
            stats.attack_cooldown = (stats.attack_cooldown - decrease).max(COOLDOWN_FLOOR);
        }
        // Probabilities and multipliers always move by flat amounts.
        PlayerStatKind::CritChance => target.perks.crit_chance += amount,
        PlayerStatKind::CritMultiplier => target.perks.crit_multiplier += amount,
        PlayerStatKind::MoneyMultiplier => target.perks.money_multiplier += amount,
        PlayerStatKind::MaxStamina => {
            stats.max_stamina += scaled_f32(stats.max_stamina, amount, percentage);
        }
        PlayerStatKind::StaminaRegen => {
            stats.stamina_regen_rate += scaled_f32(stats.stamina_regen_rate, amount, percentage);
        }
        PlayerStatKind::BlockDefense => {
            stats.block_defense += scaled_int(stats.block_defense, amount, percentage);
        }
        PlayerStatKind::BlockCost => {
            let decrease = scaled_f32(stats.block_stamina_cost, amount, percentage);
            stats.block_stamina_cost = (stats.block_stamina_cost - decrease).max(0.0);
        }
        PlayerStatKind::DashCost => {
            let decrease = scaled_f32(stats.dash_stamina_cost, amount, percentage);
            stats.dash_stamina_cost = (stats.dash_stamina_cost - decrease).max(0.0);
        }
        PlayerStatKind::PickupRange => target.perks.pickup_range += amount,
        PlayerStatKind::Revives => target.perks.revives += amount.round() as i32,
    }
}

fn apply_weapon_buff(
    book: &mut WeaponBook,
    id: crate::content::WeaponId,
    stat: WeaponStatKind,
    amount: f32,
    percentage: bool,
) {
    let spec = book.spec_mut(id);
    match stat {
        WeaponStatKind::Damage => {
            spec.damage += scaled_int(spec.damage, amount, percentage);
        }
        WeaponStatKind::Range => {
            spec.range += scaled_f32(spec.range, amount, percentage);
        }
        WeaponStatKind::Cooldown => {
            let decrease = scaled_f32(spec.cooldown, amount, percentage);
            spec.cooldown = (spec.cooldown - decrease).max(COOLDOWN_FLOOR);
        }
        WeaponStatKind::MaxAmmo => {
            if spec.use_ammo {
                spec.max_ammo += scaled_f32(spec.max_ammo, amount, percentage);
            }
        }
        WeaponStatKind::AmmoRegen => {
            if spec.use_ammo {
                spec.ammo_regen_rate += scaled_f32(spec.ammo_regen_rate, amount, percentage);
            }
        }
        WeaponStatKind::ProjectileSpeed => {
            if matches!(spec.behavior, WeaponBehavior::Projectile | WeaponBehavior::Lobbed) {
                spec.projectile_speed += scaled_f32(spec.projectile_speed, amount, percentage);
            }
        }
        WeaponStatKind::PierceCount => {
            if spec.behavior == WeaponBehavior::Projectile {
                spec.pierce_count += amount.round() as i32;
            }
        }
    }
}

/// Attempt a purchase: reject exhausted one-time items, debit atomically,
/// apply every effect in order, then bump the level counter.
pub fn try_purchase(
    shop: &ShopConfig,
    index: usize,
    state: &mut ShopState,
    ledger: &mut GoldLedger,
    target: &mut EffectTarget,
) -> bool {
    let Some(item) = shop.items.get(index) else {
        return false;
    };
    if state.is_exhausted(item, index) {
        return false;
    }

    let cost = item_cost(item, state.level(index));
    if !ledger.try_spend(cost) {
        return false;
    }

    for effect in &item.effects {
        apply_effect(effect, target);
    }
    state.bump(index);
    true
}

// ============================================================================
// Systems
// ============================================================================

/// Pay out kill rewards from enemy deaths.
pub fn credit_kills(
    mut deaths: EventReader<EntityDied>,
    enemies: Query<(), With<Enemy>>,
    players: Query<&PlayerPerks, With<Player>>,
    mut ledger: ResMut<GoldLedger>,
    mut scoreboard: ResMut<Scoreboard>,
    mut gold_changed: EventWriter<GoldChanged>,
    mut score_changed: EventWriter<ScoreChanged>,
    mut log: ResMut<RunLog>,
) {
    let money_multiplier = players.get_single().map_or(1.0, |perks| perks.money_multiplier);

    for death in deaths.read() {
        if enemies.get(death.entity).is_err() {
            continue;
        }

        scoreboard.kills += 1;
        if death.score != 0 {
            scoreboard.score += death.score;
            score_changed.send(ScoreChanged { score: scoreboard.score });
        }
        if death.gold != 0 {
            let payout = (death.gold as f32 * money_multiplier).round() as i32;
            let balance = ledger.add(payout);
            gold_changed.send(GoldChanged { balance });
            log.log(RunLogEventType::Economy, format!("+{} gold ({})", payout, balance));
        }
    }
}

/// Track run time for the scoreboard.
pub fn track_survival_time(time: Res<Time>, mut scoreboard: ResMut<Scoreboard>) {
    scoreboard.survival_time += time.delta_secs();
}

pub struct EconomyPlugin;

impl Plugin for EconomyPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<GoldLedger>().init_resource::<Scoreboard>().add_systems(
            Update,
            (credit_kills, track_survival_time)
                .chain()
                .in_set(SimSet::Flow)
                .after(crate::waves::watch_player_death),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::UpgradeEffect;

    fn item(base_cost: i32, multiplier: f32, weight: u32, one_time: bool) -> ShopItemConfig {
        ShopItemConfig {
            title: "item".to_string(),
            description: String::new(),
            base_cost,
            cost_multiplier: multiplier,
            spawn_weight: weight,
            one_time,
            effects: vec![UpgradeEffect::Heal { amount: 1 }],
        }
    }

    #[test]
    fn cost_curve_is_exponential_and_rounded() {
        let item = item(100, 1.2, 10, false);
        assert_eq!(item_cost(&item, 0), 100);
        assert_eq!(item_cost(&item, 1), 120);
        assert_eq!(item_cost(&item, 2), 144);
    }

    #[test]
    fn cost_curve_is_strictly_increasing() {
        let item = item(100, 1.2, 10, false);
        let mut previous = 0;
        for level in 0..10 {
            let cost = item_cost(&item, level);
            assert!(cost > previous, "level {} cost {} not > {}", level, cost, previous);
            previous = cost;
        }
    }

    #[test]
    fn one_time_items_report_the_sentinel_once_owned() {
        let item = item(250, 1.2, 10, true);
        assert_eq!(item_cost(&item, 0), 250);
        assert_eq!(item_cost(&item, 1), EXHAUSTED_COST);
        assert_eq!(item_cost(&item, 3), EXHAUSTED_COST);
    }

    #[test]
    fn ledger_spend_is_atomic() {
        let mut ledger = GoldLedger::default();
        ledger.add(50);
        assert!(!ledger.try_spend(60));
        assert_eq!(ledger.balance(), 50);
        assert!(ledger.try_spend(50));
        assert_eq!(ledger.balance(), 0);
    }

    #[test]
    fn offer_returns_all_when_pool_is_small() {
        let shop = ShopConfig { items: vec![item(10, 1.1, 5, false), item(20, 1.1, 5, false)] };
        let state = ShopState::new(shop.items.len());
        let mut rng = GameRng::from_seed(3);

        let picks = offer(&shop, &state, &mut rng, 5);
        assert_eq!(picks, vec![0, 1]);
    }

    #[test]
    fn offer_never_repeats_within_one_roll() {
        let shop = ShopConfig {
            items: (0..8).map(|i| item(10 + i, 1.1, 5 + i as u32, false)).collect(),
        };
        let state = ShopState::new(shop.items.len());

        for seed in 0..30 {
            let mut rng = GameRng::from_seed(seed);
            let picks = offer(&shop, &state, &mut rng, 3);
            assert_eq!(picks.len(), 3);
            let mut sorted = picks.clone();
            sorted.sort_unstable();
            sorted.dedup();
            assert_eq!(sorted.len(), 3, "duplicate draw with seed {}", seed);
        }
    }

    #[test]
    fn offer_skips_exhausted_one_time_items() {
        let shop = ShopConfig {
            items: vec![item(10, 1.1, 100, true), item(20, 1.1, 1, false)],
        };
        let mut state = ShopState::new(shop.items.len());
        state.bump(0);

        let mut rng = GameRng::from_seed(11);
        let picks = offer(&shop, &state, &mut rng, 2);
        assert_eq!(picks, vec![1]);
    }
}
