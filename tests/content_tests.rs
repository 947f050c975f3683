//! Unit tests for content definitions
//!
//! These tests verify that:
//! - All weapon/enemy/wave/shop records load and validate
//! - Stat values are sane (non-negative ranges, positive health)
//! - Behavior-specific fields are present where the behavior needs them
//! - Cross-references (enemy weapons, unlock effects) resolve

use gritwave::content::{
    EnemyKind, GameContent, UpgradeEffect, WeaponBehavior, WeaponId,
};

/// Helper to load the authored content for tests.
fn load_content() -> GameContent {
    GameContent::load_default().expect("content should load and validate")
}

#[test]
fn test_content_loads_and_validates() {
    let content = load_content();
    assert!(content.validate().is_ok());
}

#[test]
fn test_all_weapons_are_defined() {
    let content = load_content();
    for id in WeaponId::ALL {
        let spec = content.weapon(id);
        assert!(!spec.name.is_empty(), "{:?} should have a name", id);
    }
}

#[test]
fn test_all_weapons_have_non_negative_numbers() {
    let content = load_content();
    for id in WeaponId::ALL {
        let spec = content.weapon(id);
        assert!(spec.damage >= 0, "{:?} damage", id);
        assert!(spec.range >= 0.0, "{:?} range", id);
        assert!(spec.cooldown >= 0.0, "{:?} cooldown", id);
        assert!(spec.pierce_count >= 0, "{:?} pierce", id);
    }
}

#[test]
fn test_ammo_gated_weapons_can_afford_shots() {
    let content = load_content();
    for id in WeaponId::ALL {
        let spec = content.weapon(id);
        if spec.use_ammo {
            assert!(
                spec.ammo_cost_per_shot <= spec.max_ammo,
                "{:?} should afford at least one shot",
                id
            );
            assert!(spec.ammo_regen_rate > 0.0, "{:?} should regenerate", id);
        }
    }
}

#[test]
fn test_carrier_weapons_have_speed_and_lifetime() {
    let content = load_content();
    for id in WeaponId::ALL {
        let spec = content.weapon(id);
        if matches!(spec.behavior, WeaponBehavior::Projectile | WeaponBehavior::Lobbed) {
            assert!(spec.projectile_speed > 0.0, "{:?} needs projectile speed", id);
            assert!(spec.projectile_lifetime > 0.0, "{:?} needs a lifetime", id);
        }
    }
}

#[test]
fn test_area_weapons_grow_to_a_size() {
    let content = load_content();
    for id in WeaponId::ALL {
        let spec = content.weapon(id);
        let has_area = matches!(spec.behavior, WeaponBehavior::Area | WeaponBehavior::Zone)
            || spec.explodes_into_zone;
        if has_area {
            assert!(spec.area_final_size > 0.0, "{:?} needs an area size", id);
            assert!(spec.area_growth_speed > 0.0, "{:?} needs a growth speed", id);
        }
    }
}

#[test]
fn test_zone_spawners_have_zone_lifetimes() {
    let content = load_content();
    for id in WeaponId::ALL {
        let spec = content.weapon(id);
        if spec.explodes_into_zone {
            assert!(spec.zone_lifetime > 0.0, "{:?} zone needs a lifetime", id);
            assert!(spec.damage_over_time, "{:?} zone should pulse", id);
        }
    }
}

#[test]
fn test_only_the_basic_weapon_starts_unlocked() {
    let content = load_content();
    assert!(content.weapon(WeaponId::Ripsaw).unlocked_by_default);
    for id in [WeaponId::Stinger, WeaponId::AcidFlask, WeaponId::Shockwave] {
        assert!(
            !content.weapon(id).unlocked_by_default,
            "{:?} should start locked",
            id
        );
    }
}

#[test]
fn test_all_enemies_are_defined_with_live_stats() {
    let content = load_content();
    for kind in EnemyKind::ALL {
        let spec = content.enemy(kind);
        assert!(spec.stats.max_health > 0, "{:?} health", kind);
        assert!(spec.stats.detection_radius > 0.0, "{:?} detection", kind);
        assert!(spec.stats.gold_drop > 0, "{:?} should drop gold", kind);
        assert!(spec.stats.score_value > 0, "{:?} should score", kind);
    }
}

#[test]
fn test_enemy_weapons_resolve() {
    let content = load_content();
    for kind in EnemyKind::ALL {
        let spec = content.enemy(kind);
        // Panics on a dangling reference.
        let _ = content.weapon(spec.weapon);
    }
}

#[test]
fn test_story_waves_spawn_something() {
    let content = load_content();
    assert!(!content.waves.story.is_empty());
    for wave in &content.waves.story {
        assert!(wave.total_enemy_count() > 0, "wave '{}'", wave.name);
        assert!(wave.max_concurrent > 0, "wave '{}'", wave.name);
        assert!(wave.spawn_interval > 0.0, "wave '{}'", wave.name);
    }
}

#[test]
fn test_survival_waves_escalate_in_size() {
    let content = load_content();
    let first = content.waves.survival.first().unwrap();
    let last = content.waves.survival.last().unwrap();
    // The list must be ordered easy -> hard for the progressive unlock.
    assert!(last.total_enemy_count() > first.total_enemy_count());
}

#[test]
fn test_shop_items_have_effects_and_positive_weights() {
    let content = load_content();
    assert!(!content.shop.items.is_empty());
    for item in &content.shop.items {
        assert!(!item.effects.is_empty(), "item '{}'", item.title);
        assert!(item.spawn_weight > 0, "item '{}'", item.title);
        assert!(item.base_cost >= 0, "item '{}'", item.title);
    }
}

#[test]
fn test_weapon_unlock_items_are_one_time() {
    let content = load_content();
    for item in &content.shop.items {
        let unlocks_weapon = item
            .effects
            .iter()
            .any(|effect| matches!(effect, UpgradeEffect::UnlockWeapon { .. }));
        if unlocks_weapon {
            assert!(item.one_time, "weapon unlock '{}' should be one-time", item.title);
        }
    }
}
