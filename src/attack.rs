//! Attack execution
//!
//! Cooldown-gated firing for both sides. Enemies hold a single weapon; the
//! player carries an arsenal with unlockable specials, per-weapon ammo and
//! scroll cycling. `try_*` paths fail silently when a precondition is unmet:
//! no state change, no event. Ammo-gated weapons regenerate continuously
//! whether or not they are equipped.

use bevy::prelude::*;
use std::collections::HashMap;

use crate::combat::components::{CombatStats, GameRng, PlayerPerks};
use crate::combat::events::{AttackExecuted, AttackLanded, DamageRequest, KnockbackSpec};
use crate::content::{GameContent, WeaponBehavior, WeaponId, WeaponSpec};
use crate::enemy::ai::{EnemyAgent, EnemyState};
use crate::enemy::{Enemy, EnemyMods};
use crate::physics::{self, layers, Collider, Velocity};
use crate::player::{Player, PlayerRig, PlayerState};
use crate::pool::Dormant;
use crate::projectile::{spawn_carrier, CarrierParams, Projectile};
use crate::schedule::SimSet;

/// Distance the player's weapon orbits from the body; melee sweeps and
/// projectile muzzles originate here, along the aim direction.
pub const WEAPON_ORBIT_RADIUS: f32 = 1.2;

/// Per-run copy of every weapon definition plus its unlock flag. Upgrades
/// mutate this resource only; the loaded content is never touched, so runs
/// can never bleed stats into each other.
#[derive(Resource)]
pub struct WeaponBook {
    weapons: HashMap<WeaponId, WeaponRuntime>,
}

pub struct WeaponRuntime {
    pub spec: WeaponSpec,
    pub unlocked: bool,
}

impl WeaponBook {
    pub fn from_content(content: &GameContent) -> Self {
        let weapons = content
            .weapons
            .iter()
            .map(|(id, spec)| {
                (*id, WeaponRuntime { spec: spec.clone(), unlocked: spec.unlocked_by_default })
            })
            .collect();
        Self { weapons }
    }

    pub fn spec(&self, id: WeaponId) -> &WeaponSpec {
        &self.runtime(id).spec
    }

    pub fn spec_mut(&mut self, id: WeaponId) -> &mut WeaponSpec {
        &mut self
            .weapons
            .get_mut(&id)
            .unwrap_or_else(|| panic!("Weapon {:?} not in the run's weapon book", id))
            .spec
    }

    pub fn runtime(&self, id: WeaponId) -> &WeaponRuntime {
        self.weapons
            .get(&id)
            .unwrap_or_else(|| panic!("Weapon {:?} not in the run's weapon book", id))
    }

    pub fn is_unlocked(&self, id: WeaponId) -> bool {
        self.runtime(id).unlocked
    }

    pub fn unlock(&mut self, id: WeaponId) {
        if let Some(runtime) = self.weapons.get_mut(&id) {
            runtime.unlocked = true;
        }
    }

    pub fn ids(&self) -> impl Iterator<Item = WeaponId> + '_ {
        self.weapons.keys().copied()
    }
}

/// Knockback parameters of a weapon, if it causes a hit reaction.
pub fn knockback_of(spec: &WeaponSpec) -> Option<KnockbackSpec> {
    spec.has_hit_reaction.then(|| KnockbackSpec {
        force: spec.knockback_force,
        upward_factor: spec.knockback_upward_factor,
        stun: spec.hit_stun_duration,
    })
}

// ============================================================================
// Player arsenal
// ============================================================================

/// The player's weapon loadout: the always-available basic weapon plus
/// unlockable specials, per-weapon ammo, and the shared attack cooldown.
#[derive(Component)]
pub struct Arsenal {
    pub basic: WeaponId,
    pub specials: Vec<WeaponId>,
    /// 0 = basic, 1.. = specials.
    pub current_index: usize,
    /// Current ammo per registered weapon. Non-ammo weapons carry their max.
    pub ammo: HashMap<WeaponId, f32>,
    pub cooldown_timer: f32,
    pub can_attack: bool,
    /// Damage multiplier applied when a melee parry redirects a projectile.
    pub deflect_multiplier: f32,
}

impl Arsenal {
    pub fn new(basic: WeaponId, specials: Vec<WeaponId>, book: &WeaponBook) -> Self {
        let mut ammo = HashMap::new();
        for id in std::iter::once(basic).chain(specials.iter().copied()) {
            ammo.insert(id, book.spec(id).max_ammo);
        }
        Self {
            basic,
            specials,
            current_index: 0,
            ammo,
            cooldown_timer: 0.0,
            can_attack: true,
            deflect_multiplier: 1.5,
        }
    }

    pub fn slot_count(&self) -> usize {
        1 + self.specials.len()
    }

    pub fn weapon_at(&self, index: usize) -> WeaponId {
        if index == 0 {
            self.basic
        } else {
            self.specials.get(index - 1).copied().unwrap_or(self.basic)
        }
    }

    pub fn current_weapon(&self) -> WeaponId {
        self.weapon_at(self.current_index)
    }

    pub fn ammo_of(&self, id: WeaponId) -> f32 {
        self.ammo.get(&id).copied().unwrap_or(0.0)
    }

    pub fn is_ready(&self) -> bool {
        self.can_attack && self.cooldown_timer <= 0.0
    }

    /// Cycle to the next unlocked weapon in `direction` (±1), wrapping.
    /// Returns the newly equipped weapon when the selection changed.
    pub fn cycle(&mut self, direction: i32, book: &WeaponBook) -> Option<WeaponId> {
        let total = self.slot_count() as i32;
        if total <= 1 {
            return None;
        }

        let original = self.current_index;
        let mut index = original as i32;
        for _ in 0..total {
            index = (index + direction).rem_euclid(total);
            if book.is_unlocked(self.weapon_at(index as usize)) {
                break;
            }
        }

        if index as usize != original {
            self.current_index = index as usize;
            Some(self.current_weapon())
        } else {
            None
        }
    }

    /// Refill every ammo-gated weapon by a fraction of its max, clamped.
    pub fn refill_all(&mut self, book: &WeaponBook, fraction: f32) {
        for (id, ammo) in self.ammo.iter_mut() {
            let spec = book.spec(*id);
            if spec.use_ammo {
                *ammo = (*ammo + spec.max_ammo * fraction).min(spec.max_ammo);
            }
        }
    }

    /// Regenerate every registered ammo-gated weapon toward its max at its
    /// own rate, clamped — equipped or not.
    pub fn regen_ammo(&mut self, book: &WeaponBook, dt: f32) {
        for (id, ammo) in self.ammo.iter_mut() {
            let spec = book.spec(*id);
            if spec.use_ammo && *ammo < spec.max_ammo {
                *ammo = (*ammo + spec.ammo_regen_rate * dt).min(spec.max_ammo);
            }
        }
    }

    /// Precondition check + ammo debit. Silent failure leaves everything
    /// untouched.
    pub fn try_consume_shot(&mut self, id: WeaponId, book: &WeaponBook) -> bool {
        if !self.is_ready() || !book.is_unlocked(id) {
            return false;
        }
        let spec = book.spec(id);
        if spec.use_ammo {
            let ammo = self.ammo.entry(id).or_insert(0.0);
            if *ammo < spec.ammo_cost_per_shot {
                return false;
            }
            *ammo -= spec.ammo_cost_per_shot;
        }
        self.cooldown_timer = spec.cooldown;
        true
    }
}

// ============================================================================
// Enemy attack controller
// ============================================================================

/// Per-enemy weapon state: one weapon, one cooldown, one target.
#[derive(Component, Clone, Debug)]
pub struct AttackController {
    pub weapon: WeaponId,
    pub cooldown_timer: f32,
    pub can_attack: bool,
    pub target: Option<Entity>,
}

impl AttackController {
    pub fn new(weapon: WeaponId) -> Self {
        Self { weapon, cooldown_timer: 0.0, can_attack: true, target: None }
    }

    pub fn is_ready(&self) -> bool {
        self.can_attack && self.cooldown_timer <= 0.0
    }

    pub fn reset_cooldown(&mut self) {
        self.cooldown_timer = 0.0;
    }

    /// Effective attack range: melee uses the wielder's reach, carriers use
    /// the weapon's own range.
    pub fn attack_range(&self, book: &WeaponBook, stats: &CombatStats) -> f32 {
        let spec = book.spec(self.weapon);
        match spec.behavior {
            WeaponBehavior::Melee => stats.0.attack_range,
            _ => spec.range,
        }
    }
}

// ============================================================================
// Systems
// ============================================================================

/// Tick the player's shared cooldown and regenerate ammo for every
/// registered ammo-gated weapon at its own rate, equipped or not.
pub fn regenerate_weapons(
    time: Res<Time>,
    book: Res<WeaponBook>,
    mut arsenals: Query<&mut Arsenal>,
) {
    let dt = time.delta_secs();
    for mut arsenal in arsenals.iter_mut() {
        if arsenal.cooldown_timer > 0.0 {
            arsenal.cooldown_timer -= dt;
        }
        arsenal.regen_ammo(&book, dt);
    }
}

/// Enemy attack execution: fires whenever the behavior state machine sits in
/// Attack with a live target in range and the cooldown has elapsed.
pub fn enemy_attacks(
    time: Res<Time>,
    book: Res<WeaponBook>,
    mut commands: Commands,
    mut attackers: Query<
        (Entity, &Transform, &mut AttackController, &CombatStats, &EnemyAgent, &EnemyMods),
        (With<Enemy>, Without<Dormant>),
    >,
    colliders: Query<(Entity, &Transform, &Collider), (Without<Dormant>, Without<Projectile>)>,
    target_positions: Query<&Transform>,
    mut damage: EventWriter<DamageRequest>,
    mut executed: EventWriter<AttackExecuted>,
) {
    let dt = time.delta_secs();
    let snapshot = physics::collect_colliders(&colliders);

    for (entity, transform, mut attack, stats, agent, mods) in attackers.iter_mut() {
        if attack.cooldown_timer > 0.0 {
            attack.cooldown_timer -= dt;
        }

        if agent.state != EnemyState::Attack || !attack.is_ready() {
            continue;
        }
        let Some(target) = attack.target else {
            continue;
        };
        let Ok(target_transform) = target_positions.get(target) else {
            continue;
        };

        let origin = transform.translation.truncate();
        let target_pos = target_transform.translation.truncate();
        if origin.distance(target_pos) > attack.attack_range(&book, stats) {
            continue;
        }

        let spec = book.spec(attack.weapon);
        let scaled_damage = (spec.damage as f32 * mods.damage_multiplier).round() as i32;

        match spec.behavior {
            WeaponBehavior::Melee => {
                for hit in physics::overlap_circle(
                    origin,
                    stats.0.attack_range,
                    layers::PLAYER,
                    &snapshot,
                ) {
                    damage.send(DamageRequest {
                        target: hit,
                        amount: scaled_damage,
                        source_pos: origin,
                        knockback: knockback_of(spec),
                    });
                }
            }
            WeaponBehavior::Projectile | WeaponBehavior::Lobbed => {
                let direction = (target_pos - origin).normalize_or_zero();
                spawn_carrier(
                    &mut commands,
                    spec,
                    CarrierParams {
                        weapon: attack.weapon,
                        behavior: spec.behavior,
                        damage: scaled_damage,
                        origin,
                        direction,
                        collider_layer: layers::ENEMY_PROJECTILE,
                        target_mask: layers::PLAYER,
                    },
                );
            }
            WeaponBehavior::Area | WeaponBehavior::Zone => {
                spawn_carrier(
                    &mut commands,
                    spec,
                    CarrierParams {
                        weapon: attack.weapon,
                        behavior: spec.behavior,
                        damage: scaled_damage,
                        origin,
                        direction: Vec2::ZERO,
                        collider_layer: layers::ENEMY_PROJECTILE,
                        target_mask: layers::PLAYER,
                    },
                );
            }
        }

        attack.cooldown_timer = spec.cooldown;
        executed.send(AttackExecuted { attacker: entity, weapon: attack.weapon });
    }
}

/// Player attack execution: quick melee always routes to the basic weapon,
/// primary fire uses the equipped one. A melee sweep also scans the enemy
/// projectile layer and parries anything it catches.
#[allow(clippy::too_many_arguments)]
pub fn player_attacks(
    book: Res<WeaponBook>,
    input: Res<crate::player::InputSnapshot>,
    mut rng: ResMut<GameRng>,
    mut commands: Commands,
    mut players: Query<
        (Entity, &Transform, &mut Arsenal, &mut PlayerRig, &PlayerPerks),
        With<Player>,
    >,
    colliders: Query<(Entity, &Transform, &Collider), (Without<Dormant>, Without<Projectile>)>,
    mut parryable: Query<
        (&Transform, &mut Projectile, &mut Velocity, &mut Collider),
        Without<Player>,
    >,
    mut damage: EventWriter<DamageRequest>,
    mut executed: EventWriter<AttackExecuted>,
    mut landed: EventWriter<AttackLanded>,
) {
    let Ok((entity, transform, mut arsenal, mut rig, perks)) = players.get_single_mut() else {
        return;
    };

    if rig.state != PlayerState::Normal {
        return;
    }

    let weapon = if input.melee_pressed {
        arsenal.basic
    } else if input.fire_held {
        arsenal.current_weapon()
    } else {
        return;
    };

    if !arsenal.try_consume_shot(weapon, &book) {
        return;
    }

    let spec = book.spec(weapon);
    let position = transform.translation.truncate();
    let aim = if input.aim.length_squared() > 0.01 { input.aim.normalize() } else { Vec2::X };
    let origin = position + aim * WEAPON_ORBIT_RADIUS;

    // Crit roll applies to player damage at execution time.
    let mut rolled_damage = spec.damage;
    if rng.random_f32() < perks.crit_chance {
        rolled_damage = (rolled_damage as f32 * perks.crit_multiplier).round() as i32;
    }

    rig.state = PlayerState::Attacking;
    executed.send(AttackExecuted { attacker: entity, weapon });

    match spec.behavior {
        WeaponBehavior::Melee => {
            let snapshot = physics::collect_colliders(&colliders);
            let mut hit_something = false;

            for hit in physics::overlap_circle(origin, spec.range, layers::ENEMY, &snapshot) {
                damage.send(DamageRequest {
                    target: hit,
                    amount: rolled_damage,
                    source_pos: position,
                    knockback: knockback_of(spec),
                });
                hit_something = true;
            }

            // Parry: redirect enemy projectiles caught in the same sweep.
            for (proj_transform, mut projectile, mut velocity, mut collider) in
                parryable.iter_mut()
            {
                if !collider.enabled || collider.layer != layers::ENEMY_PROJECTILE {
                    continue;
                }
                let proj_pos = proj_transform.translation.truncate();
                let reach = spec.range + collider.radius;
                if proj_pos.distance_squared(origin) > reach * reach {
                    continue;
                }
                projectile.deflect(
                    &mut velocity,
                    &mut collider,
                    aim,
                    layers::ENEMY,
                    layers::PLAYER_PROJECTILE,
                    arsenal.deflect_multiplier,
                );
                hit_something = true;
            }

            if hit_something {
                landed.send(AttackLanded { attacker: entity });
            }
        }
        WeaponBehavior::Projectile | WeaponBehavior::Lobbed => {
            spawn_carrier(
                &mut commands,
                spec,
                CarrierParams {
                    weapon,
                    behavior: spec.behavior,
                    damage: rolled_damage,
                    origin,
                    direction: aim,
                    collider_layer: layers::PLAYER_PROJECTILE,
                    target_mask: layers::ENEMY,
                },
            );
        }
        WeaponBehavior::Area | WeaponBehavior::Zone => {
            spawn_carrier(
                &mut commands,
                spec,
                CarrierParams {
                    weapon,
                    behavior: spec.behavior,
                    damage: rolled_damage,
                    origin: position,
                    direction: Vec2::ZERO,
                    collider_layer: layers::PLAYER_PROJECTILE,
                    target_mask: layers::ENEMY,
                },
            );
        }
    }
}

pub struct AttackPlugin;

impl Plugin for AttackPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(
            Update,
            (regenerate_weapons, enemy_attacks, player_attacks)
                .chain()
                .in_set(SimSet::Action),
        );
    }
}
