//! Damage pipeline
//!
//! Every hit in the game — melee sweeps, projectiles, area pulses, dash
//! shoves — funnels through [`resolve_damage_requests`]. The single code
//! path guarantees identical semantics for blocking, guard breaks, sticky
//! death, hit reactions and wake-ups no matter where damage originates.
//! Requests are resolved in emission order within the same tick.

use bevy::prelude::*;

use crate::combat::components::{CombatStats, DespawnTimer, Health, Stamina};
use crate::combat::events::{DamageRequest, EntityDied, HitTaken};
use crate::combat::log::{RunLog, RunLogEventType};
use crate::attack::AttackController;
use crate::enemy::ai::{apply_stun, EnemyAgent, EnemyState};
use crate::enemy::detection::Detection;
use crate::movement::{apply_physical_knockback, MoveController};
use crate::physics::{Body, Collider, Velocity};
use crate::player::{PlayerRig, PlayerState};
use crate::pool::Dormant;

/// Stun applied to the player when a block attempt fails on empty stamina.
pub const GUARD_BREAK_STUN: f32 = 0.5;

/// Movement lock window for player knockback.
pub const PLAYER_KNOCKBACK_LOCK: f32 = 0.2;

/// Lift multiplier on the upward component of player knockback.
const PLAYER_KNOCKBACK_LIFT: f32 = 5.0;

type DamageTargetQuery<'w, 's> = Query<
    'w,
    's,
    (
        &'static Transform,
        &'static mut Health,
        &'static mut Velocity,
        &'static mut Body,
        &'static mut Collider,
        &'static CombatStats,
        &'static mut MoveController,
        Option<&'static mut Stamina>,
        Option<&'static mut PlayerRig>,
        Option<&'static mut EnemyAgent>,
        Option<&'static mut Detection>,
        Option<&'static mut AttackController>,
    ),
    Without<Dormant>,
>;

/// Apply every pending [`DamageRequest`] in order.
pub fn resolve_damage_requests(
    mut commands: Commands,
    mut requests: EventReader<DamageRequest>,
    mut hits: EventWriter<HitTaken>,
    mut deaths: EventWriter<EntityDied>,
    mut log: ResMut<RunLog>,
    mut targets: DamageTargetQuery,
) {
    for request in requests.read() {
        let Ok((
            transform,
            mut health,
            mut velocity,
            mut body,
            mut collider,
            stats,
            mut mover,
            stamina,
            mut rig,
            mut agent,
            mut detection,
            mut attack,
        )) = targets.get_mut(request.target)
        else {
            continue;
        };

        // Sticky death: a corpse accepts nothing further.
        if health.dead {
            continue;
        }

        let target_pos = transform.translation.truncate();
        let mut amount = request.amount;

        // Blocking posture: the crouching player trades stamina for a flat
        // damage reduction. Running out of stamina breaks the guard and the
        // full hit lands.
        if amount > 0 {
            if let (Some(rig), Some(mut stamina)) = (rig.as_deref_mut(), stamina) {
                if rig.crouching {
                    if stamina.try_consume(stats.0.block_stamina_cost) {
                        let reduced = (amount - stats.0.block_defense).max(0);
                        if reduced == 0 {
                            log.log(
                                RunLogEventType::Damage,
                                format!("{} blocks {} damage", stats.0.name, amount),
                            );
                        }
                        amount = reduced;
                    } else {
                        rig.stun(GUARD_BREAK_STUN);
                        log.log(
                            RunLogEventType::Damage,
                            format!("{}'s guard breaks", stats.0.name),
                        );
                    }
                }
            }
        }

        if amount > 0 {
            health.current -= amount;
            hits.send(HitTaken { entity: request.target, amount });
            log.log(
                RunLogEventType::Damage,
                format!("{} takes {} damage", stats.0.name, amount),
            );

            // Taking damage wakes sleeping enemies even without a hit reaction.
            if let (Some(agent), Some(detection)) = (agent.as_deref_mut(), detection.as_deref_mut())
            {
                agent.wake(detection);
            }
        }

        // Hit reaction: knockback plus a stun window, applied independently
        // of how much damage got through. New knockback overwrites any
        // in-flight one (last-writer-wins).
        if let Some(kb) = request.knockback {
            if let Some(agent) = agent.as_deref_mut() {
                if let Some(detection) = detection.as_deref_mut() {
                    agent.wake(detection);
                }
                if kb.stun > 0.0 {
                    apply_stun(agent, &mut mover, attack.as_deref_mut(), kb.stun);
                }
                apply_physical_knockback(
                    &mut mover,
                    &mut velocity,
                    target_pos,
                    request.source_pos,
                    kb.force,
                    kb.upward_factor,
                    kb.stun,
                );
            } else if let Some(rig) = rig.as_deref_mut() {
                let mut push = target_pos - request.source_pos;
                if push.length_squared() < 0.01 {
                    push = Vec2::Y;
                }
                let mut force = push.normalize() * kb.force;
                force.y += kb.upward_factor * PLAYER_KNOCKBACK_LIFT;

                velocity.0 = force;
                mover.knockback_timer = PLAYER_KNOCKBACK_LOCK;
                if kb.stun > 0.0 {
                    rig.stun(kb.stun);
                }
            }
        }

        // Death transition: exactly once, then terminal.
        if amount > 0 && health.current <= 0 {
            health.current = 0;
            health.dead = true;

            collider.enabled = false;
            velocity.0 = Vec2::ZERO;
            body.kinematic = true;
            mover.can_move = false;
            mover.target = None;

            if let Some(mut attack) = attack {
                attack.can_attack = false;
                attack.target = None;
            }
            if let Some(mut agent) = agent {
                agent.state = EnemyState::Dead;
            }
            if let Some(mut rig) = rig {
                rig.state = PlayerState::Dead;
            }

            deaths.send(EntityDied {
                entity: request.target,
                score: stats.0.score_value,
                gold: stats.0.gold_drop,
            });
            log.log(RunLogEventType::Death, format!("{} dies", stats.0.name));

            if health.auto_despawn {
                commands
                    .entity(request.target)
                    .insert(DespawnTimer { remaining: health.death_delay });
            }
        }
    }
}

/// Tick death-delay timers; expired entities go dormant and the pool
/// reclaims them.
pub fn tick_despawn_timers(
    time: Res<Time>,
    mut commands: Commands,
    mut timers: Query<(Entity, &mut DespawnTimer), Without<Dormant>>,
) {
    let dt = time.delta_secs();
    for (entity, mut timer) in timers.iter_mut() {
        timer.remaining -= dt;
        if timer.remaining <= 0.0 {
            commands.entity(entity).remove::<DespawnTimer>().insert(Dormant);
        }
    }
}
