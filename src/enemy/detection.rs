//! Target detection
//!
//! Low-frequency polling rather than per-tick scanning: each detector wakes
//! every `poll_interval`, acquires the player inside its detection radius and
//! drops the target again only past a larger lose radius. The hysteresis gap
//! prevents acquire/lose flicker at the boundary.

use bevy::prelude::*;

use crate::combat::components::{CombatStats, Health};
use crate::enemy::Enemy;
use crate::player::Player;
use crate::pool::Dormant;

/// Default polling cadence.
pub const DETECTION_POLL_INTERVAL: f32 = 0.2;

/// Default lose radius as a multiple of the detection radius.
pub const LOSE_RADIUS_FACTOR: f32 = 1.5;

/// Detection sub-state of one enemy.
#[derive(Component, Clone, Debug)]
pub struct Detection {
    /// Disabled detectors never acquire (sleeping enemies).
    pub enabled: bool,
    pub poll_interval: f32,
    pub timer: f32,
    pub lose_factor: f32,
    pub target: Option<Entity>,
}

impl Detection {
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            poll_interval: DETECTION_POLL_INTERVAL,
            timer: 0.0,
            lose_factor: LOSE_RADIUS_FACTOR,
            target: None,
        }
    }

    pub fn has_target(&self) -> bool {
        self.target.is_some()
    }

    pub fn force_lose(&mut self) {
        self.target = None;
    }

    /// Arm an immediate poll (used when an enemy is woken by damage).
    pub fn force_poll(&mut self) {
        self.timer = self.poll_interval;
    }
}

/// Poll detectors against the player.
pub fn detect_targets(
    time: Res<Time>,
    mut detectors: Query<
        (&Transform, &mut Detection, &CombatStats),
        (With<Enemy>, Without<Dormant>),
    >,
    players: Query<(Entity, &Transform, &Health), With<Player>>,
) {
    let dt = time.delta_secs();
    let player = players.get_single().ok();

    for (transform, mut detection, stats) in detectors.iter_mut() {
        detection.timer += dt;
        if detection.timer < detection.poll_interval {
            continue;
        }
        detection.timer = 0.0;

        let Some((player_entity, player_transform, player_health)) = player else {
            detection.force_lose();
            continue;
        };

        let position = transform.translation.truncate();
        let player_pos = player_transform.translation.truncate();
        let distance = position.distance(player_pos);

        if detection.has_target() {
            let lose_distance = stats.0.detection_radius * detection.lose_factor;
            if player_health.dead || distance > lose_distance {
                detection.force_lose();
            }
        } else if detection.enabled
            && !player_health.dead
            && distance <= stats.0.detection_radius
        {
            detection.target = Some(player_entity);
        }
    }
}
