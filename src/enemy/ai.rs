//! Enemy behavior state machine
//!
//! Top-level states: Idle, Patrol, Chase, Attack, Dead (terminal). The
//! initial policy depends on the behavior type; losing the target returns to
//! that policy. Entering Attack halts instantly — nobody coasts into melee
//! range. Stuns freeze movement and attacking for a time-boxed window that a
//! newer stun simply overwrites.

use bevy::prelude::*;
use smallvec::SmallVec;

use crate::attack::{AttackController, WeaponBook};
use crate::combat::components::{CombatStats, Health};
use crate::content::BehaviorType;
use crate::enemy::detection::Detection;
use crate::enemy::Enemy;
use crate::movement::MoveController;
use crate::player::Player;
use crate::pool::Dormant;

/// Distance at which a patrol waypoint counts as reached.
const PATROL_ARRIVE_DISTANCE: f32 = 0.5;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EnemyState {
    Idle,
    Patrol,
    Chase,
    Attack,
    /// Terminal; no further transitions are processed.
    Dead,
}

/// Behavior state of one enemy.
#[derive(Component, Clone, Debug)]
pub struct EnemyAgent {
    pub behavior: BehaviorType,
    pub state: EnemyState,
    pub patrol_points: SmallVec<[Vec2; 4]>,
    pub patrol_index: usize,
    pub patrol_wait: f32,
    pub patrol_wait_timer: f32,
    /// While positive, movement and attacking stay locked.
    pub stun_timer: f32,
}

impl EnemyAgent {
    pub fn new(behavior: BehaviorType, patrol_points: SmallVec<[Vec2; 4]>, patrol_wait: f32) -> Self {
        Self {
            behavior,
            state: EnemyState::Idle,
            patrol_points,
            patrol_index: 0,
            patrol_wait,
            patrol_wait_timer: 0.0,
            stun_timer: 0.0,
        }
    }

    /// Wake a sleeping enemy: enable detection and arm an immediate poll.
    /// The sole feedback path from player damage into AI disruption, together
    /// with [`apply_stun`].
    pub fn wake(&mut self, detection: &mut Detection) {
        if self.behavior == BehaviorType::Sleeping && !detection.enabled {
            detection.enabled = true;
            detection.force_poll();
        }
    }

    pub fn is_stunned(&self) -> bool {
        self.stun_timer > 0.0
    }
}

/// Freeze movement and attacking for `duration`. Re-application overwrites
/// the window (last-writer-wins, no stacking). Dead enemies ignore stuns.
pub fn apply_stun(
    agent: &mut EnemyAgent,
    mover: &mut MoveController,
    attack: Option<&mut AttackController>,
    duration: f32,
) {
    if agent.state == EnemyState::Dead {
        return;
    }
    mover.can_move = false;
    if let Some(attack) = attack {
        attack.can_attack = false;
    }
    agent.stun_timer = duration;
}

/// Initialize agent, movement and detection to the behavior's starting
/// policy. Called at spawn and on every pool reuse.
pub fn initialize_behavior(
    agent: &mut EnemyAgent,
    detection: &mut Detection,
    mover: &mut MoveController,
    attack: &mut AttackController,
) {
    agent.state = EnemyState::Idle;
    agent.patrol_index = 0;
    agent.patrol_wait_timer = 0.0;
    agent.stun_timer = 0.0;
    detection.force_lose();
    mover.target = None;
    mover.stop_within = None;
    mover.knockback_timer = 0.0;
    attack.target = None;

    match agent.behavior {
        BehaviorType::Aggressive => {
            // Seeks the player immediately; the AI tick assigns the target.
            detection.enabled = true;
            mover.can_move = true;
        }
        BehaviorType::Patrol => {
            detection.enabled = true;
            mover.can_move = true;
            if !agent.patrol_points.is_empty() {
                agent.state = EnemyState::Patrol;
            }
        }
        BehaviorType::Stationary => {
            detection.enabled = true;
            mover.can_move = false;
        }
        BehaviorType::Sleeping => {
            detection.enabled = false;
            mover.can_move = false;
        }
    }
    attack.can_attack = true;
}

fn change_state(
    agent: &mut EnemyAgent,
    mover: &mut MoveController,
    new_state: EnemyState,
) {
    if agent.state == new_state {
        return;
    }

    // Exit effects: clear carried-over intent so states never bleed.
    match agent.state {
        EnemyState::Patrol => {
            mover.target = None;
            agent.patrol_wait_timer = 0.0;
        }
        EnemyState::Chase => {
            mover.target = None;
        }
        EnemyState::Attack => {
            if agent.behavior != BehaviorType::Stationary {
                mover.can_move = true;
            }
        }
        _ => {}
    }

    agent.state = new_state;

    match new_state {
        EnemyState::Idle => {
            // Stops with inertia; movement stays enabled so the brake is soft.
            mover.target = None;
        }
        EnemyState::Patrol => {
            mover.can_move = true;
        }
        EnemyState::Chase => {
            mover.can_move = agent.behavior != BehaviorType::Stationary;
        }
        EnemyState::Attack => {
            // Instant halt: no coasting into melee range.
            mover.target = None;
            mover.can_move = false;
        }
        EnemyState::Dead => {
            mover.target = None;
            mover.can_move = false;
        }
    }
}

fn return_to_initial(
    agent: &mut EnemyAgent,
    detection: &mut Detection,
    mover: &mut MoveController,
) {
    match agent.behavior {
        // Aggressive re-seeks immediately; the next tick re-targets.
        BehaviorType::Aggressive => change_state(agent, mover, EnemyState::Chase),
        BehaviorType::Patrol => {
            if agent.patrol_points.is_empty() {
                change_state(agent, mover, EnemyState::Idle);
            } else {
                change_state(agent, mover, EnemyState::Patrol);
            }
        }
        BehaviorType::Stationary => change_state(agent, mover, EnemyState::Idle),
        BehaviorType::Sleeping => {
            change_state(agent, mover, EnemyState::Idle);
            // Re-arm the dormant posture.
            detection.enabled = false;
            detection.force_lose();
        }
    }
}

/// Drive the behavior state machine.
pub fn enemy_ai(
    time: Res<Time>,
    book: Res<WeaponBook>,
    mut agents: Query<
        (
            &Transform,
            &mut EnemyAgent,
            &mut Detection,
            &mut MoveController,
            &mut AttackController,
            &CombatStats,
            &Health,
        ),
        (With<Enemy>, Without<Dormant>),
    >,
    players: Query<(Entity, &Transform, &Health), (With<Player>, Without<Enemy>)>,
) {
    let dt = time.delta_secs();
    let player = players
        .get_single()
        .ok()
        .filter(|(_, _, health)| !health.dead)
        .map(|(entity, transform, _)| (entity, transform.translation.truncate()));

    for (transform, mut agent, mut detection, mut mover, mut attack, stats, health) in
        agents.iter_mut()
    {
        if health.dead || agent.state == EnemyState::Dead {
            continue;
        }
        if agent.is_stunned() {
            continue;
        }

        // Aggressive enemies bypass the detection radius entirely: as long
        // as the player lives they always hold a target.
        if agent.behavior == BehaviorType::Aggressive && !detection.has_target() {
            if let Some((player_entity, _)) = player {
                detection.target = Some(player_entity);
            }
        }

        // Acquire / lose transitions.
        match agent.state {
            EnemyState::Idle | EnemyState::Patrol => {
                if detection.has_target() {
                    attack.target = detection.target;
                    change_state(&mut agent, &mut mover, EnemyState::Chase);
                }
            }
            EnemyState::Chase | EnemyState::Attack => {
                if detection.has_target() {
                    // Keep the attack target synced; aggressive enemies
                    // re-seek after a detection drop without passing
                    // through Idle.
                    attack.target = detection.target;
                } else {
                    attack.target = None;
                    return_to_initial(&mut agent, &mut detection, &mut mover);
                }
            }
            _ => {}
        }

        let position = transform.translation.truncate();

        match agent.state {
            EnemyState::Patrol => {
                let point = agent.patrol_points[agent.patrol_index];
                mover.stop_within = None;
                mover.target = Some(point);

                // Horizontal arrival: grounded walkers sit below the
                // authored point and flyers hover above it.
                if (position.x - point.x).abs() <= PATROL_ARRIVE_DISTANCE {
                    // Dwell, then advance around the ring.
                    mover.target = None;
                    agent.patrol_wait_timer += dt;
                    if agent.patrol_wait_timer >= agent.patrol_wait {
                        agent.patrol_index = (agent.patrol_index + 1) % agent.patrol_points.len();
                        agent.patrol_wait_timer = 0.0;
                    }
                }
            }
            EnemyState::Chase => {
                let Some((_, player_pos)) = player else {
                    continue;
                };
                let range = attack.attack_range(&book, stats);
                mover.target = Some(player_pos);
                mover.stop_within = Some(range);

                if position.distance(player_pos) <= range {
                    change_state(&mut agent, &mut mover, EnemyState::Attack);
                }
            }
            EnemyState::Attack => {
                let Some((_, player_pos)) = player else {
                    continue;
                };
                if position.distance(player_pos) > attack.attack_range(&book, stats) {
                    change_state(&mut agent, &mut mover, EnemyState::Chase);
                }
            }
            _ => {}
        }
    }
}

/// Tick stun windows and restore movement/attacking when they expire.
pub fn tick_stuns(
    time: Res<Time>,
    mut stunned: Query<
        (&mut EnemyAgent, &mut MoveController, &mut AttackController),
        (With<Enemy>, Without<Dormant>),
    >,
) {
    let dt = time.delta_secs();
    for (mut agent, mut mover, mut attack) in stunned.iter_mut() {
        if agent.stun_timer <= 0.0 {
            continue;
        }
        agent.stun_timer -= dt;
        if agent.stun_timer <= 0.0 && agent.state != EnemyState::Dead {
            mover.can_move = agent.behavior != BehaviorType::Stationary;
            attack.can_attack = true;
        }
    }
}
