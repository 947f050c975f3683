//! Attack carriers
//!
//! Spawned by attacks, resolved against health through the damage pipeline.
//! Four lifecycles share one component:
//! - Projectile: constant-speed kinematic flight, pierces up to its budget
//! - Lobbed: gravity arc, explodes on contact (optionally into a Zone)
//! - Area: grows to a final size, one-shot damage unless damage-over-time
//! - Zone: Area semantics with its own longer lifetime (lobbed aftermath)
//!
//! Each instance damages a given entity at most once per activation via its
//! struck ledger; damage-over-time pulses are each their own activation
//! window. Deflection re-aims an instance, switches which side it damages,
//! rescales its damage and extends its life.

use bevy::prelude::*;
use smallvec::SmallVec;

use crate::combat::events::{DamageRequest, KnockbackSpec};
use crate::content::{WeaponBehavior, WeaponId, WeaponSpec};
use crate::physics::{self, Arena, Body, Collider, Velocity};
use crate::pool::Dormant;
use crate::schedule::SimSet;
use crate::attack::knockback_of;

/// Collider radius of travelling carriers.
pub const CARRIER_RADIUS: f32 = 0.25;

/// Extra lifetime granted by a deflection.
pub const DEFLECT_LIFETIME_BONUS: f32 = 3.0;

/// Fallback lifetime when content leaves it at zero.
const DEFAULT_LIFETIME: f32 = 3.0;

/// Knockback origin offset backward along the heading, so the push reads as
/// "from where the shot came".
const KNOCKBACK_ORIGIN_BACKSET: f32 = 0.5;

/// A live attack carrier. All tuning is snapshotted from the weapon spec at
/// spawn time; mid-run weapon upgrades affect the next activation, not
/// instances already in flight.
#[derive(Component, Clone, Debug)]
pub struct Projectile {
    pub weapon: WeaponId,
    pub behavior: WeaponBehavior,
    /// Current damage; rescaled by deflection.
    pub damage: i32,
    pub direction: Vec2,
    pub speed: f32,
    /// Layers this instance damages; switched by deflection.
    pub target_mask: u8,
    pub lifetime: f32,
    /// Distinct targets struck so far (pierce accounting).
    pub hit_count: i32,
    pub pierce_count: i32,
    /// Per-activation ledger: entities already damaged by this instance.
    pub struck: SmallVec<[Entity; 8]>,
    pub knockback: Option<KnockbackSpec>,

    // Area / Zone growth
    pub scale: f32,
    pub final_size: f32,
    pub growth_speed: f32,
    pub damage_over_time: bool,
    pub tick_rate: f32,
    pub tick_timer: f32,

    // Lobbed burst
    pub explodes_into_zone: bool,
    pub zone_lifetime: f32,
}

impl Projectile {
    /// Reassign heading and side: the parry path. Damage is rescaled by the
    /// multiplier, lifetime extended, and the struck ledger cleared — the
    /// return trip is a fresh activation against the new side.
    pub fn deflect(
        &mut self,
        velocity: &mut Velocity,
        collider: &mut Collider,
        new_direction: Vec2,
        new_target_mask: u8,
        new_collider_layer: u8,
        damage_multiplier: f32,
    ) {
        self.direction = new_direction.normalize_or_zero();
        self.target_mask = new_target_mask;
        self.damage = (self.damage as f32 * damage_multiplier).round() as i32;
        self.lifetime += DEFLECT_LIFETIME_BONUS;
        self.struck.clear();
        collider.layer = new_collider_layer;
        velocity.0 = self.direction * self.speed;
    }

    fn knockback_origin(&self, position: Vec2) -> Vec2 {
        match self.behavior {
            WeaponBehavior::Projectile => position - self.direction * KNOCKBACK_ORIGIN_BACKSET,
            _ => position,
        }
    }
}

/// Spawn parameters for one carrier instance.
pub struct CarrierParams {
    pub weapon: WeaponId,
    pub behavior: WeaponBehavior,
    pub damage: i32,
    pub origin: Vec2,
    pub direction: Vec2,
    pub collider_layer: u8,
    pub target_mask: u8,
}

/// Spawn an attack carrier configured from the weapon spec.
pub fn spawn_carrier(commands: &mut Commands, spec: &WeaponSpec, params: CarrierParams) -> Entity {
    let lifetime = match params.behavior {
        WeaponBehavior::Zone => {
            if spec.zone_lifetime > 0.0 {
                spec.zone_lifetime
            } else {
                DEFAULT_LIFETIME
            }
        }
        _ => {
            if spec.projectile_lifetime > 0.0 {
                spec.projectile_lifetime
            } else {
                DEFAULT_LIFETIME
            }
        }
    };

    let projectile = Projectile {
        weapon: params.weapon,
        behavior: params.behavior,
        damage: params.damage,
        direction: params.direction,
        speed: spec.projectile_speed,
        target_mask: params.target_mask,
        lifetime,
        hit_count: 0,
        pierce_count: spec.pierce_count,
        struck: SmallVec::new(),
        knockback: knockback_of(spec),
        scale: 0.1,
        final_size: spec.area_final_size,
        growth_speed: spec.area_growth_speed,
        damage_over_time: spec.behavior == WeaponBehavior::Zone
            || params.behavior == WeaponBehavior::Zone
            || spec.damage_over_time,
        tick_rate: spec.tick_rate.max(0.1),
        // Armed so the first pulse lands immediately.
        tick_timer: spec.tick_rate,
        explodes_into_zone: spec.explodes_into_zone,
        zone_lifetime: spec.zone_lifetime,
    };

    let (velocity, body, radius) = match params.behavior {
        WeaponBehavior::Projectile => (
            Velocity(params.direction * spec.projectile_speed),
            Body { gravity_scale: 0.0, kinematic: false },
            CARRIER_RADIUS,
        ),
        WeaponBehavior::Lobbed => (
            Velocity(params.direction * spec.projectile_speed + Vec2::Y * spec.throw_arc),
            Body { gravity_scale: 1.0, kinematic: false },
            CARRIER_RADIUS,
        ),
        // Growing hazards stay where they were planted.
        _ => (Velocity::default(), Body { gravity_scale: 0.0, kinematic: true }, 0.05),
    };

    commands
        .spawn((
            Transform::from_translation(params.origin.extend(0.0)),
            velocity,
            body,
            Collider::new(radius, params.collider_layer),
            projectile,
        ))
        .id()
}

/// Tick carrier lifetimes; expired instances despawn regardless of state.
pub fn tick_carriers(
    time: Res<Time>,
    mut commands: Commands,
    mut carriers: Query<(Entity, &mut Projectile)>,
) {
    let dt = time.delta_secs();
    for (entity, mut projectile) in carriers.iter_mut() {
        projectile.lifetime -= dt;
        if projectile.lifetime <= 0.0 {
            commands.entity(entity).despawn();
        }
    }
}

/// Grow Area/Zone hazards and run their damage pulses.
pub fn update_areas(
    time: Res<Time>,
    mut commands: Commands,
    mut areas: Query<(Entity, &Transform, &mut Projectile, &mut Collider)>,
    targets: Query<(Entity, &Transform, &Collider), (Without<Dormant>, Without<Projectile>)>,
    mut damage: EventWriter<DamageRequest>,
) {
    let dt = time.delta_secs();
    let snapshot = physics::collect_colliders(&targets);

    for (entity, transform, mut area, mut collider) in areas.iter_mut() {
        if !matches!(area.behavior, WeaponBehavior::Area | WeaponBehavior::Zone) {
            continue;
        }

        if area.scale < area.final_size {
            area.scale = (area.scale + area.growth_speed * dt).min(area.final_size);
            collider.radius = area.scale / 2.0;
        }

        let center = transform.translation.truncate();

        if area.damage_over_time {
            // Periodic pulse: every tick re-queries the overlap and damages
            // whatever is inside right now.
            area.tick_timer += dt;
            if area.tick_timer >= area.tick_rate {
                area.tick_timer = 0.0;
                let radius = area.scale / 2.0;
                for hit in physics::overlap_circle(center, radius, area.target_mask, &snapshot) {
                    damage.send(DamageRequest {
                        target: hit,
                        amount: area.damage,
                        source_pos: center,
                        knockback: area.knockback,
                    });
                }
            }
        } else if area.behavior == WeaponBehavior::Area && area.scale >= area.final_size {
            // One-shot blast: damage everything inside once, then expire.
            let radius = area.scale / 2.0;
            for hit in physics::overlap_circle(center, radius, area.target_mask, &snapshot) {
                if area.struck.contains(&hit) {
                    continue;
                }
                area.struck.push(hit);
                damage.send(DamageRequest {
                    target: hit,
                    amount: area.damage,
                    source_pos: center,
                    knockback: area.knockback,
                });
            }
            commands.entity(entity).despawn();
        }
    }
}

/// Resolve travelling carriers against targets and the ground.
pub fn resolve_carrier_hits(
    arena: Res<Arena>,
    mut commands: Commands,
    mut carriers: Query<(Entity, &Transform, &mut Projectile, &Collider)>,
    targets: Query<(Entity, &Transform, &Collider), (Without<Dormant>, Without<Projectile>)>,
    mut damage: EventWriter<DamageRequest>,
) {
    let snapshot = physics::collect_colliders(&targets);

    for (entity, transform, mut projectile, collider) in carriers.iter_mut() {
        let position = transform.translation.truncate();
        let on_ground = position.y - collider.radius <= arena.ground_y + f32::EPSILON;

        match projectile.behavior {
            WeaponBehavior::Projectile => {
                if on_ground {
                    commands.entity(entity).despawn();
                    continue;
                }

                let hits = physics::overlap_circle(
                    position,
                    collider.radius,
                    projectile.target_mask,
                    &snapshot,
                );
                let mut spent = false;
                for hit in hits {
                    if projectile.struck.contains(&hit) {
                        continue;
                    }
                    projectile.struck.push(hit);
                    let source = projectile.knockback_origin(position);
                    damage.send(DamageRequest {
                        target: hit,
                        amount: projectile.damage,
                        source_pos: source,
                        knockback: projectile.knockback,
                    });

                    projectile.hit_count += 1;
                    if projectile.hit_count > projectile.pierce_count {
                        spent = true;
                        break;
                    }
                }
                if spent {
                    commands.entity(entity).despawn();
                }
            }
            WeaponBehavior::Lobbed => {
                let contact = physics::overlap_circle(
                    position,
                    collider.radius,
                    projectile.target_mask,
                    &snapshot,
                );
                if !on_ground && contact.is_empty() {
                    continue;
                }

                if projectile.explodes_into_zone {
                    // Burst into a persistent hazard at the impact point.
                    let zone = Projectile {
                        behavior: WeaponBehavior::Zone,
                        lifetime: if projectile.zone_lifetime > 0.0 {
                            projectile.zone_lifetime
                        } else {
                            DEFAULT_LIFETIME
                        },
                        damage_over_time: true,
                        scale: 0.1,
                        hit_count: 0,
                        struck: SmallVec::new(),
                        direction: Vec2::ZERO,
                        speed: 0.0,
                        ..projectile.clone()
                    };
                    commands.spawn((
                        Transform::from_translation(position.extend(0.0)),
                        Velocity::default(),
                        Body { gravity_scale: 0.0, kinematic: true },
                        Collider::new(0.05, collider.layer),
                        zone,
                    ));
                } else {
                    for hit in contact {
                        damage.send(DamageRequest {
                            target: hit,
                            amount: projectile.damage,
                            source_pos: position,
                            knockback: projectile.knockback,
                        });
                    }
                }
                commands.entity(entity).despawn();
            }
            _ => {}
        }
    }
}

pub struct ProjectilePlugin;

impl Plugin for ProjectilePlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(
            Update,
            (tick_carriers, update_areas, resolve_carrier_hits)
                .chain()
                .in_set(SimSet::Resolve),
        );
    }
}
