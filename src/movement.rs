//! Physics-driven locomotion
//!
//! Ground entities steer horizontal velocity toward their target while the
//! integrator supplies gravity; flying entities smoothly interpolate the full
//! 2D velocity toward a hover-offset point. Stopping is inertial (exponential
//! decay) unless movement is explicitly disabled, which brakes instantly.
//! Knockback zeroes velocity, applies an impulse away from the source and
//! locks movement for the stun window.

use bevy::prelude::*;

use crate::content::Locomotion;
use crate::physics::{Grounded, Velocity};
use crate::player::Player;
use crate::pool::Dormant;
use crate::schedule::SimSet;

/// Speed delta above which an external shove is considered "being pushed"
/// and the resistance correction engages.
const PUSH_TOLERANCE: f32 = 0.5;

/// Velocity below which an inertial stop snaps to zero.
const STOP_EPSILON: f32 = 0.1;

/// Locomotion state for AI-driven entities. The player steers its own
/// velocity and uses this only for knockback locks and movement disabling.
#[derive(Component, Clone, Debug)]
pub struct MoveController {
    pub can_move: bool,
    /// Point to move toward; `None` decays to a stop.
    pub target: Option<Vec2>,
    /// Stop (with inertia) once within this range of the target.
    pub stop_within: Option<f32>,
    pub locomotion: Locomotion,
    /// Cruise speed, copied from the per-instance stat copy at spawn/reset.
    pub move_speed: f32,
    /// Exponential decay rate for inertial stops.
    pub deceleration: f32,
    /// Corrective force factor against unintended displacement.
    pub push_resistance: f32,
    /// While positive, knockback owns the velocity and steering is suspended.
    pub knockback_timer: f32,
}

impl MoveController {
    pub fn new(locomotion: Locomotion) -> Self {
        Self {
            can_move: true,
            target: None,
            stop_within: None,
            locomotion,
            move_speed: 0.0,
            deceleration: 5.0,
            push_resistance: 50.0,
            knockback_timer: 0.0,
        }
    }

    pub fn is_knocked_back(&self) -> bool {
        self.knockback_timer > 0.0
    }
}

/// Knockback impulse away from `source_pos`, horizontal-only direction with a
/// deterministic left/right fallback when the source is vertically aligned.
/// Velocity is zeroed first; re-application restarts the lock window
/// (last-writer-wins, no stacking).
pub fn apply_physical_knockback(
    mover: &mut MoveController,
    velocity: &mut Velocity,
    position: Vec2,
    source_pos: Vec2,
    force: f32,
    upward_factor: f32,
    stun_duration: f32,
) {
    let mut direction = Vec2::new(position.x - source_pos.x, 0.0);
    if direction.length_squared() < 0.01 {
        direction = if position.x >= source_pos.x { Vec2::X } else { -Vec2::X };
    } else {
        direction = direction.normalize();
    }

    velocity.0 = Vec2::ZERO;
    match mover.locomotion {
        Locomotion::Ground => {
            velocity.0 = Vec2::new(direction.x * force, force * upward_factor);
        }
        Locomotion::Flying { .. } => {
            // Flying bodies only take the horizontal shove.
            velocity.0 = direction * force;
        }
    }

    mover.knockback_timer = stun_duration.max(0.0);
}

/// Drive AI locomotion. Runs after the state machines (which set targets)
/// and before integration.
pub fn drive_movement(
    time: Res<Time>,
    mut movers: Query<
        (&Transform, &mut MoveController, &mut Velocity, &Grounded),
        (Without<Dormant>, Without<Player>),
    >,
) {
    let dt = time.delta_secs();

    for (transform, mut mover, mut velocity, grounded) in movers.iter_mut() {
        // Knockback owns the velocity until its window expires.
        if mover.knockback_timer > 0.0 {
            mover.knockback_timer -= dt;
            continue;
        }

        // Explicit disable brakes instantly (attack, death, stun).
        if !mover.can_move {
            match mover.locomotion {
                Locomotion::Flying { .. } => velocity.0 = Vec2::ZERO,
                Locomotion::Ground => velocity.0.x = 0.0,
            }
            continue;
        }

        let position = transform.translation.truncate();

        let Some(target) = mover.target else {
            inertial_stop(&mover, &mut velocity, dt);
            continue;
        };

        let distance = position.distance(target);
        if mover.stop_within.is_some_and(|range| distance <= range) {
            inertial_stop(&mover, &mut velocity, dt);
            continue;
        }

        match mover.locomotion {
            Locomotion::Ground => {
                let direction = (target - position).normalize_or_zero();
                let intended = direction.x.signum() * mover.move_speed;
                let current = velocity.0.x;

                // Push resistance: while intentionally moving, a significant
                // deviation from the intended speed means something shoved us
                // (separation, collision response). Correct toward intent
                // instead of snapping, so the shove still reads physically.
                // Suspended during knockback (handled above).
                if grounded.0 && (current - intended).abs() > PUSH_TOLERANCE {
                    velocity.0.x =
                        current + (intended - current) * (mover.push_resistance * dt).min(1.0);
                } else {
                    velocity.0.x = intended;
                }
            }
            Locomotion::Flying { hover_height, smoothing } => {
                let hover_target = Vec2::new(target.x, target.y + hover_height);
                let direction = (hover_target - position).normalize_or_zero();
                let wanted = direction * mover.move_speed;
                velocity.0 = velocity.0.lerp(wanted, (smoothing * dt).min(1.0));
            }
        }
    }
}

fn inertial_stop(mover: &MoveController, velocity: &mut Velocity, dt: f32) {
    let factor = (mover.deceleration * dt).min(1.0);
    match mover.locomotion {
        Locomotion::Flying { .. } => {
            velocity.0 = velocity.0.lerp(Vec2::ZERO, factor);
            if velocity.0.length() < STOP_EPSILON {
                velocity.0 = Vec2::ZERO;
            }
        }
        Locomotion::Ground => {
            velocity.0.x += (0.0 - velocity.0.x) * factor;
            if velocity.0.x.abs() < STOP_EPSILON {
                velocity.0.x = 0.0;
            }
        }
    }
}

pub struct MovementPlugin;

impl Plugin for MovementPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(Update, drive_movement.in_set(SimSet::Motion).before(crate::physics::separate_enemies));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::Locomotion;

    fn ground_mover() -> MoveController {
        let mut mover = MoveController::new(Locomotion::Ground);
        mover.move_speed = 4.0;
        mover
    }

    #[test]
    fn knockback_pushes_away_from_source() {
        let mut mover = ground_mover();
        let mut velocity = Velocity::default();
        apply_physical_knockback(
            &mut mover,
            &mut velocity,
            Vec2::new(5.0, 0.5),
            Vec2::new(2.0, 0.5),
            10.0,
            0.3,
            0.15,
        );
        assert!(velocity.0.x > 0.0);
        assert!((velocity.0.y - 3.0).abs() < 1e-4);
        assert!(mover.is_knocked_back());
    }

    #[test]
    fn vertically_aligned_knockback_falls_back_deterministically() {
        let mut mover = ground_mover();
        let mut velocity = Velocity::default();
        apply_physical_knockback(
            &mut mover,
            &mut velocity,
            Vec2::new(1.0, 0.5),
            Vec2::new(1.0, 3.0),
            8.0,
            0.0,
            0.1,
        );
        // Same x as the source resolves to a rightward push.
        assert!(velocity.0.x > 0.0);
    }

    #[test]
    fn new_knockback_overwrites_the_old_lock() {
        let mut mover = ground_mover();
        let mut velocity = Velocity::default();
        apply_physical_knockback(
            &mut mover,
            &mut velocity,
            Vec2::ZERO,
            Vec2::X,
            10.0,
            0.0,
            0.5,
        );
        apply_physical_knockback(
            &mut mover,
            &mut velocity,
            Vec2::ZERO,
            -Vec2::X,
            4.0,
            0.0,
            0.1,
        );
        assert!((mover.knockback_timer - 0.1).abs() < 1e-6);
        assert!(velocity.0.x > 0.0);
    }
}
