//! Thin 2D physics service
//!
//! The gameplay core does not resolve collisions; it consumes a small physics
//! surface: rigid-body velocity integration with gravity and ground contact,
//! circle overlap queries over collider snapshots, and a soft separation
//! shove that keeps crowded enemies from stacking. Everything else (AI,
//! attacks, projectiles) is built on top of these helpers.

use bevy::prelude::*;

use crate::pool::Dormant;
use crate::schedule::SimSet;

/// Downward acceleration applied to bodies with a positive gravity scale.
pub const GRAVITY: f32 = -30.0;

/// How close two enemy centers may get before the separation shove engages.
pub const SEPARATION_RADIUS: f32 = 0.9;

/// Strength of the separation shove (velocity units per unit of overlap).
pub const SEPARATION_FORCE: f32 = 18.0;

/// Collision layer bitmasks. A collider belongs to exactly one layer;
/// overlap queries filter by a mask of layers they care about.
pub mod layers {
    pub const PLAYER: u8 = 1 << 0;
    pub const ENEMY: u8 = 1 << 1;
    pub const PLAYER_PROJECTILE: u8 = 1 << 2;
    pub const ENEMY_PROJECTILE: u8 = 1 << 3;
}

/// Current linear velocity in world units per second.
#[derive(Component, Default, Clone, Copy)]
pub struct Velocity(pub Vec2);

/// Rigid-body parameters consumed by the integrator.
#[derive(Component, Clone, Copy)]
pub struct Body {
    /// Multiplier on [`GRAVITY`]. Flying bodies and kinematic projectiles use 0.
    pub gravity_scale: f32,
    /// Kinematic bodies are skipped by the integrator entirely
    /// (dead entities awaiting despawn).
    pub kinematic: bool,
}

impl Body {
    pub fn dynamic(gravity_scale: f32) -> Self {
        Self { gravity_scale, kinematic: false }
    }
}

/// Circle collider used for every overlap query in the game.
#[derive(Component, Clone, Copy)]
pub struct Collider {
    pub radius: f32,
    pub layer: u8,
    pub enabled: bool,
}

impl Collider {
    pub fn new(radius: f32, layer: u8) -> Self {
        Self { radius, layer, enabled: true }
    }
}

/// Ground contact flag, refreshed by the integrator each tick.
#[derive(Component, Default, Clone, Copy)]
pub struct Grounded(pub bool);

/// World bounds. The ground is a flat line at `ground_y`; bodies rest on it
/// and horizontal travel is clamped to `half_width`.
#[derive(Resource, Clone, Copy)]
pub struct Arena {
    pub half_width: f32,
    pub ground_y: f32,
}

impl Default for Arena {
    fn default() -> Self {
        Self { half_width: 30.0, ground_y: 0.0 }
    }
}

/// A snapshot row used by overlap queries: entity, center, radius, layer.
pub type ColliderSnapshot = (Entity, Vec2, f32, u8);

/// Collect every enabled collider into a snapshot for overlap queries.
/// Systems take the snapshot once and run as many queries as they need
/// against it without holding ECS borrows.
pub fn collect_colliders<F: bevy::ecs::query::QueryFilter>(
    query: &Query<(Entity, &Transform, &Collider), F>,
) -> Vec<ColliderSnapshot> {
    query
        .iter()
        .filter(|(_, _, c)| c.enabled)
        .map(|(e, t, c)| (e, t.translation.truncate(), c.radius, c.layer))
        .collect()
}

/// Circle overlap query: every collider in `mask` whose circle intersects
/// the query circle. Results preserve snapshot order.
pub fn overlap_circle(
    center: Vec2,
    radius: f32,
    mask: u8,
    colliders: &[ColliderSnapshot],
) -> Vec<Entity> {
    colliders
        .iter()
        .filter(|(_, pos, r, layer)| {
            (layer & mask) != 0 && pos.distance_squared(center) <= (radius + r) * (radius + r)
        })
        .map(|(e, _, _, _)| *e)
        .collect()
}

/// Integrate velocities: gravity, translation, ground clamp, arena bounds.
pub fn integrate_motion(
    time: Res<Time>,
    arena: Res<Arena>,
    mut bodies: Query<
        (&mut Transform, &mut Velocity, &Body, Option<&mut Grounded>, Option<&Collider>),
        Without<Dormant>,
    >,
) {
    let dt = time.delta_secs();

    for (mut transform, mut velocity, body, grounded, collider) in bodies.iter_mut() {
        if body.kinematic {
            continue;
        }

        if body.gravity_scale != 0.0 {
            velocity.0.y += GRAVITY * body.gravity_scale * dt;
        }

        transform.translation.x += velocity.0.x * dt;
        transform.translation.y += velocity.0.y * dt;

        let radius = collider.map_or(0.0, |c| c.radius);
        let floor = arena.ground_y + radius;

        let mut on_ground = false;
        if body.gravity_scale != 0.0 && transform.translation.y <= floor {
            transform.translation.y = floor;
            if velocity.0.y < 0.0 {
                velocity.0.y = 0.0;
            }
            on_ground = true;
        }

        transform.translation.x =
            transform.translation.x.clamp(-arena.half_width, arena.half_width);

        if let Some(mut flag) = grounded {
            flag.0 = on_ground;
        }
    }
}

/// Pairwise separation shove between living enemies. This is the "unintended
/// external displacement" that the movement controller's push resistance
/// corrects against: crowded enemies nudge each other apart instead of
/// stacking on one point.
pub fn separate_enemies(
    time: Res<Time>,
    mut enemies: Query<
        (&Transform, &mut Velocity, &Collider),
        (With<crate::enemy::Enemy>, Without<Dormant>),
    >,
) {
    let dt = time.delta_secs();

    // Corpses don't shove: only enabled colliders participate.
    let positions: Vec<Option<Vec2>> = enemies
        .iter()
        .map(|(t, _, c)| c.enabled.then(|| t.translation.truncate()))
        .collect();
    if positions.len() < 2 {
        return;
    }

    let mut nudges = vec![Vec2::ZERO; positions.len()];
    for i in 0..positions.len() {
        let Some(a) = positions[i] else { continue };
        for j in (i + 1)..positions.len() {
            let Some(b) = positions[j] else { continue };
            let delta = a - b;
            let dist_sq = delta.length_squared();
            if dist_sq < SEPARATION_RADIUS * SEPARATION_RADIUS && dist_sq > 1e-6 {
                let dist = dist_sq.sqrt();
                let overlap = SEPARATION_RADIUS - dist;
                let push = (delta / dist) * overlap * SEPARATION_FORCE * dt;
                nudges[i] += push;
                nudges[j] -= push;
            }
        }
    }

    for (index, (_, mut velocity, collider)) in enemies.iter_mut().enumerate() {
        if collider.enabled {
            velocity.0.x += nudges[index].x;
        }
    }
}

pub struct PhysicsPlugin;

impl Plugin for PhysicsPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<Arena>().add_systems(
            Update,
            (separate_enemies, integrate_motion).chain().in_set(SimSet::Motion),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overlap_filters_by_layer_mask() {
        let snapshot = vec![
            (Entity::from_raw(1), Vec2::ZERO, 0.5, layers::ENEMY),
            (Entity::from_raw(2), Vec2::new(0.5, 0.0), 0.5, layers::PLAYER),
            (Entity::from_raw(3), Vec2::new(10.0, 0.0), 0.5, layers::ENEMY),
        ];

        let hits = overlap_circle(Vec2::ZERO, 1.0, layers::ENEMY, &snapshot);
        assert_eq!(hits, vec![Entity::from_raw(1)]);
    }

    #[test]
    fn overlap_counts_touching_circles() {
        let snapshot = vec![(Entity::from_raw(7), Vec2::new(1.5, 0.0), 0.5, layers::ENEMY)];
        // query radius 1.0 + collider radius 0.5 exactly reaches the center
        let hits = overlap_circle(Vec2::ZERO, 1.0, layers::ENEMY, &snapshot);
        assert_eq!(hits.len(), 1);
    }
}
