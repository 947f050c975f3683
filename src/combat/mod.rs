//! Combat core
//!
//! Implements the shared health/damage pipeline:
//! - Health, stamina and per-instance stat copies
//! - The single damage resolver (blocking, guard breaks, sticky death)
//! - Death despawn scheduling
//! - Observer events and the structured run log

use bevy::prelude::*;

pub mod components;
pub mod events;
pub mod log;
pub mod systems;

use events::*;
use crate::schedule::SimSet;

/// Plugin for the combat core.
pub struct CombatPlugin;

impl Plugin for CombatPlugin {
    fn build(&self, app: &mut App) {
        app
            // Combat events
            .add_event::<DamageRequest>()
            .add_event::<AttackExecuted>()
            .add_event::<AttackLanded>()
            .add_event::<HitTaken>()
            .add_event::<EntityDied>()
            .add_event::<WeaponChanged>()
            .add_event::<GoldChanged>()
            .add_event::<ScoreChanged>()
            .add_event::<WaveStarted>()
            .add_event::<WaveCompleted>()
            .add_event::<RunEnded>()
            // Resources
            .init_resource::<log::RunLog>()
            // Systems
            .add_systems(Update, systems::resolve_damage_requests.in_set(SimSet::Damage))
            .add_systems(Update, systems::tick_despawn_timers.in_set(SimSet::Flow))
            .add_systems(Update, log::advance_log_clock.in_set(SimSet::Cleanup));
    }
}
