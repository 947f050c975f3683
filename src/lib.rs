//! Gritwave - Wave-Based Action Roguelite Core
//!
//! The gameplay core of a 2D action roguelite: player/enemy combat state
//! machines, a wave-based spawning director, enemy pooling, and a tiered
//! economy/upgrade system. Rendering, audio and UI are external
//! collaborators behind events and the run log; the crate runs complete
//! simulated runs headlessly.
//!
//! This library exposes the core game modules for testing and reuse.

use bevy::prelude::*;

pub mod attack;
pub mod cli;
pub mod combat;
pub mod content;
pub mod economy;
pub mod enemy;
pub mod headless;
pub mod movement;
pub mod physics;
pub mod player;
pub mod pool;
pub mod projectile;
pub mod schedule;
pub mod waves;

// Re-export commonly used types
pub use combat::events::RunOutcome;
pub use combat::log::{RunLog, RunLogEventType};
pub use content::{EnemyKind, GameContent, WeaponId};
pub use headless::{run_headless, RunConfig, RunSummary};
pub use waves::{Difficulty, GameMode};

/// Every gameplay system and resource, wired into the ordered simulation
/// phases. Content ([`GameContent`]) must be inserted before this plugin.
pub struct GameplayPlugin;

impl Plugin for GameplayPlugin {
    fn build(&self, app: &mut App) {
        schedule::configure_sim_sets(app);
        app.add_plugins((
            combat::CombatPlugin,
            physics::PhysicsPlugin,
            movement::MovementPlugin,
            attack::AttackPlugin,
            projectile::ProjectilePlugin,
            enemy::EnemyPlugin,
            player::PlayerPlugin,
            pool::PoolPlugin,
            waves::WavePlugin,
            economy::EconomyPlugin,
        ));
    }
}
