//! Simulation schedule
//!
//! One fixed-cadence tick, partitioned into strictly ordered phases:
//! input sampling runs before the state machines, state machines before
//! physics integration, and damage resolution before run-flow bookkeeping.
//! Every gameplay system belongs to exactly one phase.

use bevy::prelude::*;

/// Ordered phases of a simulation tick.
#[derive(SystemSet, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SimSet {
    /// Refresh the input snapshot (headless autopilot or a real input source).
    Input,
    /// Detection, enemy behavior state machines, player state machine.
    Ai,
    /// Attack execution: cooldown/ammo ticking, melee sweeps, projectile spawns.
    Action,
    /// Locomotion, knockback, dash windows, separation, velocity integration.
    Motion,
    /// Projectile lifecycles: travel consequences, growth, pulses, impacts.
    Resolve,
    /// The single damage pipeline: blocking, health, death, hit reactions.
    Damage,
    /// Run flow: waves, pooling, economy credit, despawn timers.
    Flow,
    /// Observer-facing log recording.
    Cleanup,
}

/// Chain the phases within `Update`.
pub fn configure_sim_sets(app: &mut App) {
    app.configure_sets(
        Update,
        (
            SimSet::Input,
            SimSet::Ai,
            SimSet::Action,
            SimSet::Motion,
            SimSet::Resolve,
            SimSet::Damage,
            SimSet::Flow,
            SimSet::Cleanup,
        )
            .chain(),
    );
}
