//! Enemy object pool
//!
//! Enemies are never destroyed mid-run: the pool pre-warms a configurable
//! count of dormant instances per kind at run start and recycles them on
//! death. Acquiring resets every sub-state (health, cooldowns, targets,
//! detection, body) before the entity re-enters play; an exhausted queue
//! grows on demand with a soft warning. Entities return themselves to their
//! originating queue when they go dormant — game logic never re-enqueues
//! directly.

use bevy::prelude::*;
use std::collections::{HashMap, VecDeque};

use crate::attack::AttackController;
use crate::combat::components::{CombatStats, Health};
use crate::content::{BehaviorType, EnemyKind, EnemySpec, GameContent, Locomotion};
use crate::enemy::ai::{initialize_behavior, EnemyAgent};
use crate::enemy::detection::Detection;
use crate::enemy::{Enemy, EnemyMods};
use crate::movement::MoveController;
use crate::physics::{layers, Body, Collider, Grounded, Velocity};
use crate::schedule::SimSet;
use smallvec::SmallVec;

/// Body collider radius shared by all enemy kinds.
pub const ENEMY_RADIUS: f32 = 0.45;

/// Delay between an enemy's death and its return to the pool.
pub const ENEMY_DEATH_DELAY: f32 = 1.5;

/// Gravity scale for grounded enemies.
const GROUND_GRAVITY: f32 = 2.0;

/// Marker: this entity is parked in the pool and invisible to every
/// gameplay system.
#[derive(Component)]
pub struct Dormant;

/// Pool membership, resolved once at creation time by enemy kind.
#[derive(Component, Clone, Copy, Debug)]
pub struct Pooled {
    pub kind: EnemyKind,
}

/// Reuse queues keyed by enemy kind.
#[derive(Resource, Default)]
pub struct EnemyPool {
    queues: HashMap<EnemyKind, VecDeque<Entity>>,
}

impl EnemyPool {
    pub fn put(&mut self, kind: EnemyKind, entity: Entity) {
        self.queues.entry(kind).or_default().push_back(entity);
    }

    pub fn take(&mut self, kind: EnemyKind) -> Option<Entity> {
        self.queues.get_mut(&kind).and_then(VecDeque::pop_front)
    }

    pub fn available(&self, kind: EnemyKind) -> usize {
        self.queues.get(&kind).map_or(0, VecDeque::len)
    }
}

fn gravity_for(locomotion: Locomotion) -> f32 {
    match locomotion {
        Locomotion::Ground => GROUND_GRAVITY,
        Locomotion::Flying { .. } => 0.0,
    }
}

fn patrol_ring(spec: &EnemySpec, position: Vec2) -> SmallVec<[Vec2; 4]> {
    let mut points = SmallVec::new();
    if spec.behavior == BehaviorType::Patrol && spec.patrol_span > 0.0 {
        points.push(position + Vec2::new(-spec.patrol_span, 0.0));
        points.push(position + Vec2::new(spec.patrol_span, 0.0));
    }
    points
}

/// Spawn a fresh enemy entity, fully initialized and active. Used for pool
/// prewarm (followed by a [`Dormant`] tag) and for on-demand growth.
pub fn spawn_enemy_entity(
    commands: &mut Commands,
    content: &GameContent,
    kind: EnemyKind,
    position: Vec2,
    health_multiplier: f32,
    damage_multiplier: f32,
) -> Entity {
    let spec = content.enemy(kind);

    let mut stats = spec.stats.clone();
    stats.max_health =
        ((stats.max_health as f32 * health_multiplier).round() as i32).max(1);

    let mut mover = MoveController::new(spec.locomotion);
    mover.move_speed = stats.move_speed;

    let mut detection = Detection::new(true);
    let mut agent = EnemyAgent::new(spec.behavior, patrol_ring(spec, position), spec.patrol_wait);
    let mut attack = AttackController::new(spec.weapon);
    initialize_behavior(&mut agent, &mut detection, &mut mover, &mut attack);

    let max_health = stats.max_health;
    commands
        .spawn((
            Transform::from_translation(position.extend(0.0)),
            Velocity::default(),
            Body::dynamic(gravity_for(spec.locomotion)),
            Collider::new(ENEMY_RADIUS, layers::ENEMY),
            Grounded(false),
            Health::with_auto_despawn(max_health, ENEMY_DEATH_DELAY),
            CombatStats(stats),
            EnemyMods { damage_multiplier },
            mover,
            attack,
            detection,
            agent,
            Enemy,
            Pooled { kind },
        ))
        .id()
}

/// Reset a pooled entity for reuse: full health (with the new wave's
/// multipliers), cleared cooldowns and targets, restored body, and the
/// behavior's initial state.
#[allow(clippy::too_many_arguments)]
pub fn reset_enemy(
    spec: &EnemySpec,
    position: Vec2,
    health_multiplier: f32,
    damage_multiplier: f32,
    transform: &mut Transform,
    velocity: &mut Velocity,
    body: &mut Body,
    collider: &mut Collider,
    health: &mut Health,
    stats: &mut CombatStats,
    mods: &mut EnemyMods,
    mover: &mut MoveController,
    attack: &mut AttackController,
    detection: &mut Detection,
    agent: &mut EnemyAgent,
) {
    let mut base = spec.stats.clone();
    base.max_health = ((base.max_health as f32 * health_multiplier).round() as i32).max(1);

    transform.translation = position.extend(0.0);
    velocity.0 = Vec2::ZERO;
    body.kinematic = false;
    body.gravity_scale = gravity_for(spec.locomotion);
    collider.enabled = true;

    health.max = base.max_health;
    health.reset();

    mover.locomotion = spec.locomotion;
    mover.move_speed = base.move_speed;

    attack.weapon = spec.weapon;
    attack.reset_cooldown();

    agent.behavior = spec.behavior;
    agent.patrol_points = patrol_ring(spec, position);
    agent.patrol_wait = spec.patrol_wait;

    *stats = CombatStats(base);
    mods.damage_multiplier = damage_multiplier;

    initialize_behavior(agent, detection, mover, attack);
}

/// Pre-warm the pool with dormant instances of every kind. The entities are
/// tagged [`Dormant`] at spawn; [`reclaim_dormant`] enqueues them on the
/// first tick through the same path as any later return.
pub fn prewarm_pool(commands: &mut Commands, content: &GameContent) {
    for kind in EnemyKind::ALL {
        for _ in 0..content.pool_prewarm {
            let entity =
                spawn_enemy_entity(commands, content, kind, Vec2::new(0.0, -100.0), 1.0, 1.0);
            commands.entity(entity).insert(Dormant);
        }
        debug!("Pool '{:?}' pre-warmed with {} instances", kind, content.pool_prewarm);
    }
}

/// Re-enqueue entities that just went dormant (death despawn or forced
/// despawn) into their originating queue, and park their physics state.
pub fn reclaim_dormant(
    mut pool: ResMut<EnemyPool>,
    mut newly_dormant: Query<(Entity, &Pooled, &mut Collider, &mut Velocity), Added<Dormant>>,
) {
    for (entity, pooled, mut collider, mut velocity) in newly_dormant.iter_mut() {
        collider.enabled = false;
        velocity.0 = Vec2::ZERO;
        pool.put(pooled.kind, entity);
    }
}

pub struct PoolPlugin;

impl Plugin for PoolPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<EnemyPool>().add_systems(
            Update,
            reclaim_dormant
                .in_set(SimSet::Flow)
                .after(crate::combat::systems::tick_despawn_timers),
        );
    }
}
