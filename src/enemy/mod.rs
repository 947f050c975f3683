//! Enemy AI
//!
//! Detection (low-frequency polling with hysteresis) feeds the behavior
//! state machine, which drives the shared movement and attack controllers.

use bevy::prelude::*;

pub mod ai;
pub mod detection;

use crate::schedule::SimSet;

/// Marker for enemy entities.
#[derive(Component)]
pub struct Enemy;

/// Per-instance difficulty scaling applied at spawn time. Health multipliers
/// are baked into the stat copy; the damage multiplier scales each attack as
/// it fires.
#[derive(Component, Clone, Copy, Debug)]
pub struct EnemyMods {
    pub damage_multiplier: f32,
}

impl Default for EnemyMods {
    fn default() -> Self {
        Self { damage_multiplier: 1.0 }
    }
}

pub struct EnemyPlugin;

impl Plugin for EnemyPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(
            Update,
            (detection::detect_targets, ai::tick_stuns, ai::enemy_ai)
                .chain()
                .in_set(SimSet::Ai),
        );
    }
}
