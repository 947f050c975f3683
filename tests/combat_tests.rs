//! Damage pipeline tests
//!
//! Drives the damage resolver against hand-built worlds and checks the
//! health/blocking/death invariants:
//! - Damage clamps at zero health and death is sticky
//! - The death notification fires exactly once
//! - Blocking trades stamina for a flat reduction; empty stamina breaks guard
//! - Zero-amount requests are pure hit reactions

use bevy::ecs::event::Events;
use bevy::prelude::*;

use gritwave::attack::AttackController;
use gritwave::combat::components::{CombatStats, Health, Stamina};
use gritwave::combat::events::{DamageRequest, EntityDied, HitTaken, KnockbackSpec};
use gritwave::combat::log::RunLog;
use gritwave::combat::systems::resolve_damage_requests;
use gritwave::content::{BehaviorType, CharacterStats, Locomotion, WeaponId};
use gritwave::enemy::ai::EnemyAgent;
use gritwave::enemy::detection::Detection;
use gritwave::movement::MoveController;
use gritwave::physics::{layers, Body, Collider, Velocity};
use gritwave::player::{PlayerRig, PlayerState};

fn stats(name: &str, max_health: i32) -> CharacterStats {
    CharacterStats {
        name: name.to_string(),
        max_health,
        damage: 5,
        move_speed: 3.0,
        attack_range: 1.5,
        attack_cooldown: 1.0,
        detection_radius: 6.0,
        max_stamina: 100.0,
        stamina_regen_rate: 15.0,
        dash_stamina_cost: 25.0,
        block_stamina_cost: 10.0,
        block_defense: 6,
        score_value: 10,
        gold_drop: 5,
    }
}

/// A world plus a schedule that runs only the damage resolver.
fn damage_world() -> (World, Schedule) {
    let mut world = World::new();
    world.init_resource::<Events<DamageRequest>>();
    world.init_resource::<Events<HitTaken>>();
    world.init_resource::<Events<EntityDied>>();
    world.init_resource::<RunLog>();

    let mut schedule = Schedule::default();
    schedule.add_systems(resolve_damage_requests);
    (world, schedule)
}

fn spawn_dummy(world: &mut World, max_health: i32) -> Entity {
    world
        .spawn((
            Transform::default(),
            Velocity::default(),
            Body::dynamic(1.0),
            Collider::new(0.5, layers::ENEMY),
            Health::new(max_health),
            CombatStats(stats("Dummy", max_health)),
            MoveController::new(Locomotion::Ground),
            AttackController::new(WeaponId::Bite),
            Detection::new(true),
            EnemyAgent::new(BehaviorType::Aggressive, Default::default(), 0.0),
        ))
        .id()
}

fn spawn_blocker(world: &mut World, max_health: i32, stamina: f32, crouching: bool) -> Entity {
    let mut rig = PlayerRig::default();
    rig.crouching = crouching;
    world
        .spawn((
            Transform::default(),
            Velocity::default(),
            Body::dynamic(1.0),
            Collider::new(0.5, layers::PLAYER),
            Health::new(max_health),
            Stamina { current: stamina },
            CombatStats(stats("Blocker", max_health)),
            MoveController::new(Locomotion::Ground),
            rig,
        ))
        .id()
}

fn send_damage(world: &mut World, target: Entity, amount: i32) {
    world.resource_mut::<Events<DamageRequest>>().send(DamageRequest {
        target,
        amount,
        source_pos: Vec2::new(-1.0, 0.0),
        knockback: None,
    });
}

fn drain_deaths(world: &mut World) -> Vec<EntityDied> {
    world.resource_mut::<Events<EntityDied>>().drain().collect()
}

#[test]
fn test_damage_reduces_health() {
    let (mut world, mut schedule) = damage_world();
    let target = spawn_dummy(&mut world, 20);

    send_damage(&mut world, target, 7);
    schedule.run(&mut world);

    assert_eq!(world.get::<Health>(target).unwrap().current, 13);
    assert!(drain_deaths(&mut world).is_empty());
}

#[test]
fn test_overkill_clamps_to_zero_and_dies_once() {
    let (mut world, mut schedule) = damage_world();
    let target = spawn_dummy(&mut world, 20);

    send_damage(&mut world, target, 25);
    schedule.run(&mut world);

    let health = world.get::<Health>(target).unwrap();
    assert_eq!(health.current, 0);
    assert!(health.dead);

    let deaths = drain_deaths(&mut world);
    assert_eq!(deaths.len(), 1);
    assert_eq!(deaths[0].score, 10);
    assert_eq!(deaths[0].gold, 5);

    // Sticky death: further damage is a no-op with no second notification.
    send_damage(&mut world, target, 5);
    schedule.run(&mut world);

    assert_eq!(world.get::<Health>(target).unwrap().current, 0);
    assert!(drain_deaths(&mut world).is_empty());
}

#[test]
fn test_death_disables_collider_and_freezes_body() {
    let (mut world, mut schedule) = damage_world();
    let target = spawn_dummy(&mut world, 10);

    send_damage(&mut world, target, 10);
    schedule.run(&mut world);

    assert!(!world.get::<Collider>(target).unwrap().enabled);
    assert!(world.get::<Body>(target).unwrap().kinematic);
    assert!(!world.get::<MoveController>(target).unwrap().can_move);
}

#[test]
fn test_exact_lethal_damage_kills() {
    let (mut world, mut schedule) = damage_world();
    let target = spawn_dummy(&mut world, 20);

    send_damage(&mut world, target, 20);
    schedule.run(&mut world);

    let health = world.get::<Health>(target).unwrap();
    assert_eq!(health.current, 0);
    assert!(health.dead);
    assert_eq!(drain_deaths(&mut world).len(), 1);
}

#[test]
fn test_full_block_absorbs_damage_and_debits_stamina() {
    let (mut world, mut schedule) = damage_world();
    // block_defense 6 >= incoming 5: no health change, stamina -10.
    let target = spawn_blocker(&mut world, 20, 50.0, true);

    send_damage(&mut world, target, 5);
    schedule.run(&mut world);

    assert_eq!(world.get::<Health>(target).unwrap().current, 20);
    assert_eq!(world.get::<Stamina>(target).unwrap().current, 40.0);
}

#[test]
fn test_partial_block_passes_the_difference() {
    let (mut world, mut schedule) = damage_world();
    // block_defense 6 < incoming 9: health -3, stamina -10.
    let target = spawn_blocker(&mut world, 20, 50.0, true);

    send_damage(&mut world, target, 9);
    schedule.run(&mut world);

    assert_eq!(world.get::<Health>(target).unwrap().current, 17);
    assert_eq!(world.get::<Stamina>(target).unwrap().current, 40.0);
}

#[test]
fn test_guard_break_on_empty_stamina() {
    let (mut world, mut schedule) = damage_world();
    // Not enough stamina for the block cost: full damage, short stun,
    // stamina untouched.
    let target = spawn_blocker(&mut world, 20, 4.0, true);

    send_damage(&mut world, target, 9);
    schedule.run(&mut world);

    assert_eq!(world.get::<Health>(target).unwrap().current, 11);
    assert_eq!(world.get::<Stamina>(target).unwrap().current, 4.0);
    assert_eq!(world.get::<PlayerRig>(target).unwrap().state, PlayerState::Stunned);
}

#[test]
fn test_not_crouching_means_no_block() {
    let (mut world, mut schedule) = damage_world();
    let target = spawn_blocker(&mut world, 20, 50.0, false);

    send_damage(&mut world, target, 9);
    schedule.run(&mut world);

    assert_eq!(world.get::<Health>(target).unwrap().current, 11);
    assert_eq!(world.get::<Stamina>(target).unwrap().current, 50.0);
}

#[test]
fn test_zero_amount_is_a_pure_hit_reaction() {
    let (mut world, mut schedule) = damage_world();
    let target = spawn_dummy(&mut world, 20);

    world.resource_mut::<Events<DamageRequest>>().send(DamageRequest {
        target,
        amount: 0,
        source_pos: Vec2::new(-1.0, 0.0),
        knockback: Some(KnockbackSpec { force: 10.0, upward_factor: 0.2, stun: 0.2 }),
    });
    schedule.run(&mut world);

    // No damage, no hit event, but the shove landed.
    assert_eq!(world.get::<Health>(target).unwrap().current, 20);
    assert!(world.resource_mut::<Events<HitTaken>>().drain().next().is_none());
    assert!(world.get::<Velocity>(target).unwrap().0.x > 0.0);
    assert!(world.get::<MoveController>(target).unwrap().is_knocked_back());
}

#[test]
fn test_knockback_pushes_away_and_locks_movement() {
    let (mut world, mut schedule) = damage_world();
    let target = spawn_dummy(&mut world, 20);

    world.resource_mut::<Events<DamageRequest>>().send(DamageRequest {
        target,
        amount: 3,
        source_pos: Vec2::new(2.0, 0.0),
        knockback: Some(KnockbackSpec { force: 8.0, upward_factor: 0.3, stun: 0.15 }),
    });
    schedule.run(&mut world);

    let velocity = world.get::<Velocity>(target).unwrap();
    // Source is to the right: push goes left, with lift.
    assert!(velocity.0.x < 0.0);
    assert!(velocity.0.y > 0.0);
    assert_eq!(world.get::<Health>(target).unwrap().current, 17);
}

#[test]
fn test_requests_resolve_in_emission_order() {
    let (mut world, mut schedule) = damage_world();
    let target = spawn_dummy(&mut world, 20);

    // 12 + 12 against 20 hp within one tick: the second request kills,
    // clamps at zero, and a third lands on the corpse.
    send_damage(&mut world, target, 12);
    send_damage(&mut world, target, 12);
    send_damage(&mut world, target, 12);
    schedule.run(&mut world);

    assert_eq!(world.get::<Health>(target).unwrap().current, 0);
    assert_eq!(drain_deaths(&mut world).len(), 1);
}
