//! Player controller
//!
//! An input-driven state machine (Normal / Attacking / Stunned / Dashing /
//! Dead) composing the shared movement, attack and health pieces. Input
//! arrives as a per-tick snapshot resource so the core never touches device
//! details; the headless runner fills the snapshot with an autopilot.

use bevy::prelude::*;
use smallvec::SmallVec;

use crate::attack::{Arsenal, WeaponBook};
use crate::combat::components::{CombatStats, Health, PlayerPerks, Stamina};
use crate::combat::events::{DamageRequest, KnockbackSpec, WeaponChanged};
use crate::content::{GameContent, Locomotion, WeaponId};
use crate::enemy::Enemy;
use crate::movement::MoveController;
use crate::physics::{layers, Body, Collider, Grounded, Velocity};
use crate::pool::Dormant;
use crate::projectile::Projectile;
use crate::schedule::SimSet;

/// Stamina cost of a fast-fall dive (the dash uses the stat-driven cost).
const FAST_FALL_STAMINA_COST: f32 = 10.0;

/// Radius of the player body collider.
pub const PLAYER_RADIUS: f32 = 0.5;

/// Marker for the player entity.
#[derive(Component)]
pub struct Player;

/// Per-tick input snapshot. The single seam between the core and whatever
/// samples real devices.
#[derive(Resource, Default, Clone, Debug)]
pub struct InputSnapshot {
    pub move_dir: Vec2,
    /// World-space aim direction (cursor for a real player).
    pub aim: Vec2,
    pub jump_pressed: bool,
    pub jump_released: bool,
    pub crouch_pressed: bool,
    pub crouch_released: bool,
    pub dash_pressed: bool,
    pub fast_fall_pressed: bool,
    /// Quick melee (always the basic weapon).
    pub melee_pressed: bool,
    /// Primary fire (the equipped weapon); held for automatic fire.
    pub fire_held: bool,
    pub weapon_scroll: f32,
}

impl InputSnapshot {
    pub fn clear(&mut self) {
        *self = Self::default();
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PlayerState {
    Normal,
    /// Swing/shot in progress; inputs resume once the cooldown clears.
    Attacking,
    Stunned,
    Dashing,
    Dead,
}

/// Player-specific state: the state machine plus dash/fast-fall windows and
/// the blocking posture.
#[derive(Component, Clone, Debug)]
pub struct PlayerRig {
    pub state: PlayerState,
    pub stun_timer: f32,
    /// Crouching doubles as the blocking posture.
    pub crouching: bool,
    pub aim: Vec2,
    pub facing: f32,

    pub jump_force: f32,

    pub dash_speed: f32,
    pub dash_duration: f32,
    pub dash_cooldown: f32,
    pub dash_timer: f32,
    pub dash_cooldown_timer: f32,
    pub dash_direction: f32,
    pub dash_knockback_force: f32,
    /// Enemies already shoved during the current dash.
    pub dash_struck: SmallVec<[Entity; 4]>,

    pub fast_falling: bool,
    pub fast_fall_timer: f32,
    pub fast_fall_hit_radius: f32,
    pub fast_fall_damage: i32,
    pub fast_fall_knockback: f32,

    /// Gravity scale to restore after a dash/fast-fall window.
    saved_gravity: f32,
}

impl Default for PlayerRig {
    fn default() -> Self {
        Self {
            state: PlayerState::Normal,
            stun_timer: 0.0,
            crouching: false,
            aim: Vec2::X,
            facing: 1.0,
            jump_force: 9.0,
            dash_speed: 20.0,
            dash_duration: 0.2,
            dash_cooldown: 1.0,
            dash_timer: 0.0,
            dash_cooldown_timer: 0.0,
            dash_direction: 1.0,
            dash_knockback_force: 15.0,
            dash_struck: SmallVec::new(),
            fast_falling: false,
            fast_fall_timer: 0.0,
            fast_fall_hit_radius: 1.0,
            fast_fall_damage: 5,
            fast_fall_knockback: 10.0,
            saved_gravity: 1.0,
        }
    }
}

impl PlayerRig {
    /// Time-boxed stun; a new stun overwrites the window.
    pub fn stun(&mut self, duration: f32) {
        if self.state == PlayerState::Dead {
            return;
        }
        self.state = PlayerState::Stunned;
        self.stun_timer = duration;
    }

    pub fn can_dash(&self) -> bool {
        self.dash_cooldown_timer <= 0.0 && self.state != PlayerState::Dashing && !self.fast_falling
    }
}

/// Spawn the player with per-run copies of its stats and weapons.
pub fn spawn_player(commands: &mut Commands, content: &GameContent, book: &WeaponBook) -> Entity {
    let stats = content.player.base.clone();
    let specials = vec![WeaponId::Stinger, WeaponId::AcidFlask, WeaponId::Shockwave];

    let mut mover = MoveController::new(Locomotion::Ground);
    mover.move_speed = stats.move_speed;

    commands
        .spawn((
            Transform::from_xyz(0.0, PLAYER_RADIUS, 0.0),
            Velocity::default(),
            Body::dynamic(1.0),
            Collider::new(PLAYER_RADIUS, layers::PLAYER),
            Grounded(true),
            Health::new(stats.max_health),
            Stamina::full(stats.max_stamina),
            CombatStats(stats),
            PlayerPerks::from_stats(&content.player),
            mover,
            Arsenal::new(WeaponId::Ripsaw, specials, book),
            PlayerRig::default(),
            Player,
        ))
        .id()
}

/// Player state machine and input handling.
#[allow(clippy::too_many_arguments)]
pub fn player_update(
    time: Res<Time>,
    input: Res<InputSnapshot>,
    book: Res<WeaponBook>,
    mut players: Query<
        (
            Entity,
            &Transform,
            &mut PlayerRig,
            &mut MoveController,
            &mut Velocity,
            &mut Body,
            &mut Stamina,
            &mut Arsenal,
            &CombatStats,
            &Health,
            &Grounded,
        ),
        With<Player>,
    >,
    obstacles: Query<
        (Entity, &Transform, &Collider),
        (With<Enemy>, Without<Dormant>, Without<Projectile>),
    >,
    mut damage: EventWriter<DamageRequest>,
    mut weapon_changed: EventWriter<WeaponChanged>,
) {
    let dt = time.delta_secs();
    let Ok((
        _entity,
        transform,
        mut rig,
        mut mover,
        mut velocity,
        mut body,
        mut stamina,
        mut arsenal,
        stats,
        health,
        grounded,
    )) = players.get_single_mut()
    else {
        return;
    };

    if rig.dash_cooldown_timer > 0.0 {
        rig.dash_cooldown_timer -= dt;
    }
    if mover.knockback_timer > 0.0 {
        // The player steers its own velocity, so the knockback lock is
        // ticked here rather than by the shared drive system.
        mover.knockback_timer -= dt;
    }

    if health.dead || rig.state == PlayerState::Dead {
        rig.state = PlayerState::Dead;
        mover.can_move = false;
        return;
    }

    // A stun can interrupt a dash mid-window; make sure suspended gravity
    // never outlives the window that suspended it.
    if rig.state != PlayerState::Dashing && !rig.fast_falling && body.gravity_scale == 0.0 {
        body.gravity_scale = rig.saved_gravity;
    }

    let position = transform.translation.truncate();

    // Stamina regenerates continuously except while holding the block.
    if !rig.crouching {
        stamina.regen(stats.0.stamina_regen_rate, stats.0.max_stamina, dt);
    }

    // Fast-fall rides on top of the normal state: constant downward velocity
    // until the window ends or the ground arrives, then the impact strike.
    if rig.fast_falling {
        velocity.0.y = -rig.dash_speed;
        rig.fast_fall_timer -= dt;
        if grounded.0 || rig.fast_fall_timer <= 0.0 {
            rig.fast_falling = false;
            body.gravity_scale = rig.saved_gravity;
            for (enemy, enemy_transform, collider) in obstacles.iter() {
                if !collider.enabled {
                    continue;
                }
                let reach = rig.fast_fall_hit_radius + collider.radius;
                if enemy_transform.translation.truncate().distance_squared(position)
                    <= reach * reach
                {
                    damage.send(DamageRequest {
                        target: enemy,
                        amount: rig.fast_fall_damage,
                        source_pos: position,
                        knockback: Some(KnockbackSpec {
                            force: rig.fast_fall_knockback,
                            upward_factor: 0.9,
                            stun: 0.2,
                        }),
                    });
                }
            }
        }
    }

    match rig.state {
        PlayerState::Stunned => {
            rig.stun_timer -= dt;
            if !mover.is_knocked_back() {
                velocity.0.x = 0.0;
            }
            if rig.stun_timer <= 0.0 {
                rig.state = PlayerState::Normal;
            }
        }
        PlayerState::Attacking => {
            if arsenal.cooldown_timer <= 0.0 {
                rig.state = PlayerState::Normal;
            }
            // Attacks don't root the player.
            if !mover.is_knocked_back() {
                handle_locomotion_input(&input, &mut rig, &mut velocity, stats, grounded);
            }
        }
        PlayerState::Dashing => {
            velocity.0 = Vec2::new(rig.dash_direction * rig.dash_speed, 0.0);
            rig.dash_timer -= dt;

            // Dash-through impact: shove enemies the dash passes through,
            // each at most once per dash.
            for (enemy, enemy_transform, collider) in obstacles.iter() {
                if !collider.enabled || rig.dash_struck.contains(&enemy) {
                    continue;
                }
                let reach = PLAYER_RADIUS + collider.radius + 0.2;
                if enemy_transform.translation.truncate().distance_squared(position)
                    <= reach * reach
                {
                    rig.dash_struck.push(enemy);
                    damage.send(DamageRequest {
                        target: enemy,
                        amount: 0,
                        source_pos: position,
                        knockback: Some(KnockbackSpec {
                            force: rig.dash_knockback_force,
                            upward_factor: 0.2,
                            stun: 0.2,
                        }),
                    });
                }
            }

            if rig.dash_timer <= 0.0 {
                body.gravity_scale = rig.saved_gravity;
                velocity.0 = Vec2::ZERO;
                rig.state = PlayerState::Normal;
            }
        }
        PlayerState::Normal => {
            rig.aim = input.aim;

            // Blocking posture.
            if input.crouch_pressed && grounded.0 && !rig.fast_falling {
                rig.crouching = true;
            }
            if input.crouch_released {
                rig.crouching = false;
            }

            if !mover.is_knocked_back() {
                handle_locomotion_input(&input, &mut rig, &mut velocity, stats, grounded);
            }

            // Dash: stamina-gated, horizontal, gravity suspended.
            if input.dash_pressed
                && rig.can_dash()
                && stamina.try_consume(stats.0.dash_stamina_cost)
            {
                let direction = if input.move_dir.x.abs() > 0.01 {
                    input.move_dir.x.signum()
                } else {
                    rig.facing
                };
                rig.state = PlayerState::Dashing;
                rig.dash_direction = direction;
                rig.dash_timer = rig.dash_duration;
                rig.dash_cooldown_timer = rig.dash_cooldown;
                rig.dash_struck.clear();
                rig.saved_gravity = body.gravity_scale;
                body.gravity_scale = 0.0;
                rig.crouching = false;
                velocity.0 = Vec2::new(direction * rig.dash_speed, 0.0);
            }

            // Fast-fall dive: only airborne, shares the dash cooldown.
            if input.fast_fall_pressed
                && !grounded.0
                && rig.can_dash()
                && stamina.try_consume(FAST_FALL_STAMINA_COST)
            {
                rig.fast_falling = true;
                rig.fast_fall_timer = rig.dash_duration * 2.0;
                rig.dash_cooldown_timer = rig.dash_cooldown;
                rig.saved_gravity = body.gravity_scale;
                body.gravity_scale = 0.0;
            }

            // Weapon cycling, skipping locked slots.
            let scroll = input.weapon_scroll;
            if scroll.abs() > 0.01 {
                let direction = if scroll > 0.0 { -1 } else { 1 };
                if let Some(weapon) = arsenal.cycle(direction, &book) {
                    weapon_changed.send(WeaponChanged { weapon });
                }
            }
        }
        PlayerState::Dead => {}
    }
}

fn handle_locomotion_input(
    input: &InputSnapshot,
    rig: &mut PlayerRig,
    velocity: &mut Velocity,
    stats: &CombatStats,
    grounded: &Grounded,
) {
    if rig.crouching {
        // Blocking roots the player.
        velocity.0.x = 0.0;
        return;
    }

    velocity.0.x = input.move_dir.x * stats.0.move_speed;
    if input.move_dir.x.abs() > 0.01 {
        rig.facing = input.move_dir.x.signum();
    }

    if input.jump_pressed && grounded.0 && !rig.fast_falling {
        velocity.0.y = rig.jump_force;
    }
    // Cut-jump: releasing early halves the remaining ascent.
    if input.jump_released && velocity.0.y > 0.0 {
        velocity.0.y *= 0.5;
    }
}

pub struct PlayerPlugin;

impl Plugin for PlayerPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<InputSnapshot>().add_systems(
            Update,
            player_update.in_set(SimSet::Ai).after(crate::enemy::ai::enemy_ai),
        );
    }
}
