//! Upgrade pipeline tests
//!
//! Exercises `try_purchase` end to end against the authored shop: atomic
//! debit, effect application to the live player state and the per-run
//! weapon book, level bumps, and one-time exhaustion.

use gritwave::attack::{Arsenal, WeaponBook};
use gritwave::combat::components::{CombatStats, Health, PlayerPerks};
use gritwave::content::{GameContent, Locomotion, UpgradeEffect, WeaponId, WeaponStatKind};
use gritwave::economy::{
    item_cost, try_purchase, EffectTarget, GoldLedger, ShopState, EXHAUSTED_COST,
};
use gritwave::movement::MoveController;

struct Fixture {
    content: GameContent,
    book: WeaponBook,
    stats: CombatStats,
    perks: PlayerPerks,
    health: Health,
    mover: MoveController,
    arsenal: Arsenal,
    ledger: GoldLedger,
    shop: ShopState,
}

impl Fixture {
    fn new(gold: i32) -> Self {
        let content = GameContent::load_default().expect("content should load");
        let book = WeaponBook::from_content(&content);
        let stats = CombatStats(content.player.base.clone());
        let perks = PlayerPerks::from_stats(&content.player);
        let health = Health::new(stats.0.max_health);
        let mut mover = MoveController::new(Locomotion::Ground);
        mover.move_speed = stats.0.move_speed;
        let arsenal = Arsenal::new(
            WeaponId::Ripsaw,
            vec![WeaponId::Stinger, WeaponId::AcidFlask, WeaponId::Shockwave],
            &book,
        );
        let shop = ShopState::new(content.shop.items.len());
        let mut ledger = GoldLedger::default();
        ledger.add(gold);

        Self { content, book, stats, perks, health, mover, arsenal, ledger, shop }
    }

    fn buy(&mut self, index: usize) -> bool {
        let mut target = EffectTarget {
            stats: &mut self.stats,
            perks: &mut self.perks,
            health: &mut self.health,
            mover: &mut self.mover,
            arsenal: &mut self.arsenal,
            book: &mut self.book,
        };
        try_purchase(&self.content.shop, index, &mut self.shop, &mut self.ledger, &mut target)
    }

    fn index_of(&self, title: &str) -> usize {
        self.content
            .shop
            .items
            .iter()
            .position(|item| item.title == title)
            .unwrap_or_else(|| panic!("no shop item titled '{}'", title))
    }
}

#[test]
fn test_purchase_debits_and_bumps_level() {
    let mut fixture = Fixture::new(500);
    let index = fixture.index_of("Hardened Plating");

    assert!(fixture.buy(index));
    assert_eq!(fixture.ledger.balance(), 400);
    assert_eq!(fixture.shop.level(index), 1);

    // Next copy costs more (100 * 1.2 = 120).
    let item = &fixture.content.shop.items[index];
    assert_eq!(item_cost(item, fixture.shop.level(index)), 120);
}

#[test]
fn test_purchase_rejected_without_funds() {
    let mut fixture = Fixture::new(10);
    let index = fixture.index_of("Hardened Plating");

    assert!(!fixture.buy(index));
    // No mutation on failure.
    assert_eq!(fixture.ledger.balance(), 10);
    assert_eq!(fixture.shop.level(index), 0);
    assert_eq!(fixture.stats.0.max_health, 100);
}

#[test]
fn test_max_health_buff_grows_and_heals() {
    let mut fixture = Fixture::new(500);
    fixture.health.current = 60;

    assert!(fixture.buy(fixture.index_of("Hardened Plating")));
    assert_eq!(fixture.stats.0.max_health, 120);
    assert_eq!(fixture.health.max, 120);
    // The granted health arrives immediately.
    assert_eq!(fixture.health.current, 80);
}

#[test]
fn test_heal_clamps_to_max() {
    let mut fixture = Fixture::new(500);
    fixture.health.current = 90;

    assert!(fixture.buy(fixture.index_of("Field Rations")));
    assert_eq!(fixture.health.current, 100);
}

#[test]
fn test_move_speed_buff_reaches_the_controller() {
    let mut fixture = Fixture::new(500);

    assert!(fixture.buy(fixture.index_of("Sprint Tonic")));
    let expected = 6.0 * 1.1;
    assert!((fixture.stats.0.move_speed - expected).abs() < 1e-4);
    assert!((fixture.mover.move_speed - expected).abs() < 1e-4);
}

#[test]
fn test_crit_chance_buff_is_flat() {
    let mut fixture = Fixture::new(500);

    assert!(fixture.buy(fixture.index_of("Lucky Charm")));
    assert!((fixture.perks.crit_chance - 0.10).abs() < 1e-6);
}

#[test]
fn test_weapon_unlock_is_one_time() {
    let mut fixture = Fixture::new(1000);
    let index = fixture.index_of("Stinger SMG");

    assert!(!fixture.book.is_unlocked(WeaponId::Stinger));
    assert!(fixture.buy(index));
    assert!(fixture.book.is_unlocked(WeaponId::Stinger));
    assert_eq!(fixture.ledger.balance(), 800);

    // Owned: the sentinel cost and a rejected re-purchase.
    let item = &fixture.content.shop.items[index];
    assert_eq!(item_cost(item, fixture.shop.level(index)), EXHAUSTED_COST);
    assert!(!fixture.buy(index));
    assert_eq!(fixture.ledger.balance(), 800);
}

#[test]
fn test_weapon_buff_hits_all_unlocked_weapons_only() {
    let mut fixture = Fixture::new(1000);

    // Whetstone: +25% damage to every unlocked weapon. Only the basic
    // weapon is unlocked, so the locked specials keep their numbers.
    assert!(fixture.buy(fixture.index_of("Whetstone")));
    assert_eq!(fixture.book.spec(WeaponId::Ripsaw).damage, 10);
    assert_eq!(fixture.book.spec(WeaponId::Stinger).damage, 6);

    // Unlock the Stinger; the next Whetstone reaches it too.
    assert!(fixture.buy(fixture.index_of("Stinger SMG")));
    assert!(fixture.buy(fixture.index_of("Whetstone")));
    assert_eq!(fixture.book.spec(WeaponId::Ripsaw).damage, 13);
    assert_eq!(fixture.book.spec(WeaponId::Stinger).damage, 8);
}

#[test]
fn test_cooldown_buff_applies_to_equipped_weapon_with_floor() {
    let mut fixture = Fixture::new(100_000);
    let index = fixture.index_of("Greased Trigger");

    // Equipped weapon is the basic Ripsaw (cooldown 0.4).
    assert!(fixture.buy(index));
    let after_one = fixture.book.spec(WeaponId::Ripsaw).cooldown;
    assert!((after_one - 0.4 * 0.85).abs() < 1e-4);

    // Repeated purchases converge on the floor, never through it.
    for _ in 0..60 {
        if !fixture.buy(index) {
            break;
        }
    }
    assert!(fixture.book.spec(WeaponId::Ripsaw).cooldown >= 0.05);
}

#[test]
fn test_ammo_refill_effect() {
    let mut fixture = Fixture::new(500);
    fixture.book.unlock(WeaponId::Stinger);
    fixture.arsenal.try_consume_shot(WeaponId::Stinger, &fixture.book);
    assert_eq!(fixture.arsenal.ammo_of(WeaponId::Stinger), 90.0);

    assert!(fixture.buy(fixture.index_of("Coolant Flush")));
    assert_eq!(fixture.arsenal.ammo_of(WeaponId::Stinger), 100.0);
}

#[test]
fn test_effects_apply_in_list_order() {
    let fixture = Fixture::new(500);
    let index = fixture.index_of("Stinger SMG");
    let item = &fixture.content.shop.items[index];

    // The unlock precedes the refill in the authored list; a reversed order
    // would refill a locked pool and the bundle would misbehave.
    assert!(matches!(item.effects[0], UpgradeEffect::UnlockWeapon { .. }));
    assert!(matches!(item.effects[1], UpgradeEffect::RefillAmmo { .. }));
}

#[test]
fn test_pierce_buff_only_touches_projectiles() {
    let mut fixture = Fixture::new(500);
    let effect = UpgradeEffect::WeaponBuff {
        stat: WeaponStatKind::PierceCount,
        amount: 1.0,
        percentage: false,
        all_weapons: true,
    };
    fixture.book.unlock(WeaponId::Stinger);

    let mut target = EffectTarget {
        stats: &mut fixture.stats,
        perks: &mut fixture.perks,
        health: &mut fixture.health,
        mover: &mut fixture.mover,
        arsenal: &mut fixture.arsenal,
        book: &mut fixture.book,
    };
    gritwave::economy::apply_effect(&effect, &mut target);

    assert_eq!(fixture.book.spec(WeaponId::Stinger).pierce_count, 2);
    // Melee has no pierce to grow.
    assert_eq!(fixture.book.spec(WeaponId::Ripsaw).pierce_count, 0);
}
