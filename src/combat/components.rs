//! Core combat components and resources

use bevy::prelude::*;
use rand::prelude::*;
use rand::rngs::StdRng;

use crate::content::{CharacterStats, PlayerStats};

/// Seeded random number generator for deterministic simulation.
///
/// When a seed is provided (e.g. via the headless run config), the same seed
/// always produces the same run. Without a seed, uses system entropy.
#[derive(Resource)]
pub struct GameRng {
    rng: StdRng,
    /// The seed used to initialize this RNG (if deterministic).
    pub seed: Option<u64>,
}

impl GameRng {
    pub fn from_seed(seed: u64) -> Self {
        Self { rng: StdRng::seed_from_u64(seed), seed: Some(seed) }
    }

    pub fn from_entropy() -> Self {
        Self { rng: StdRng::from_entropy(), seed: None }
    }

    /// Random f32 in [0.0, 1.0).
    pub fn random_f32(&mut self) -> f32 {
        self.rng.gen()
    }

    pub fn random_range(&mut self, min: f32, max: f32) -> f32 {
        min + self.random_f32() * (max - min)
    }

    /// Random index in [0, len).
    pub fn random_index(&mut self, len: usize) -> usize {
        debug_assert!(len > 0, "random_index on an empty range");
        (self.random_f32() * len as f32) as usize % len
    }
}

impl Default for GameRng {
    fn default() -> Self {
        Self::from_entropy()
    }
}

/// Health and the sticky death flag shared by player and enemies.
///
/// Invariants: `current` never drops below zero; once `dead` is set, neither
/// damage nor healing is accepted until [`Health::reset`] (pool recycle or
/// run restart).
#[derive(Component, Clone, Debug)]
pub struct Health {
    pub current: i32,
    pub max: i32,
    pub dead: bool,
    /// Schedule deactivation after death (enemies). The player corpse stays.
    pub auto_despawn: bool,
    /// Delay between death and deactivation.
    pub death_delay: f32,
}

impl Health {
    pub fn new(max: i32) -> Self {
        Self { current: max, max, dead: false, auto_despawn: false, death_delay: 1.5 }
    }

    pub fn with_auto_despawn(max: i32, death_delay: f32) -> Self {
        Self { auto_despawn: true, death_delay, ..Self::new(max) }
    }

    /// Clamped heal; rejected when dead.
    pub fn heal(&mut self, amount: i32) {
        if self.dead {
            return;
        }
        self.current = (self.current + amount).min(self.max);
    }

    /// Revive to full health. The only way to clear the dead flag.
    pub fn reset(&mut self) {
        self.dead = false;
        self.current = self.max;
    }

    pub fn is_alive(&self) -> bool {
        !self.dead
    }
}

/// Stamina pool gating blocking, dashes and fast-falls.
#[derive(Component, Clone, Copy, Debug, Default)]
pub struct Stamina {
    pub current: f32,
}

impl Stamina {
    pub fn full(max: f32) -> Self {
        Self { current: max }
    }

    /// Atomic check-then-debit. Returns false and leaves the pool untouched
    /// when there isn't enough.
    pub fn try_consume(&mut self, amount: f32) -> bool {
        if self.current >= amount {
            self.current -= amount;
            true
        } else {
            false
        }
    }

    pub fn regen(&mut self, rate: f32, max: f32, dt: f32) {
        if self.current < max {
            self.current = (self.current + rate * dt).min(max);
        }
    }
}

/// Per-instance runtime copy of a character's baseline stats. Spawning
/// copies the content record (with wave/difficulty multipliers baked in for
/// enemies) so no two live instances ever share a mutable record.
#[derive(Component, Clone, Debug)]
pub struct CombatStats(pub CharacterStats);

/// Player-only runtime fields, copied per run from [`PlayerStats`].
#[derive(Component, Clone, Debug)]
pub struct PlayerPerks {
    pub money_multiplier: f32,
    pub crit_chance: f32,
    pub crit_multiplier: f32,
    pub pickup_range: f32,
    pub revives: i32,
}

impl PlayerPerks {
    pub fn from_stats(stats: &PlayerStats) -> Self {
        Self {
            money_multiplier: stats.money_multiplier,
            crit_chance: stats.crit_chance,
            crit_multiplier: stats.crit_multiplier,
            pickup_range: stats.pickup_range,
            revives: stats.revives,
        }
    }
}

/// Countdown to deactivation after death.
#[derive(Component, Clone, Copy, Debug)]
pub struct DespawnTimer {
    pub remaining: f32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn heal_clamps_to_max() {
        let mut health = Health::new(20);
        health.current = 15;
        health.heal(10);
        assert_eq!(health.current, 20);
    }

    #[test]
    fn heal_rejected_when_dead() {
        let mut health = Health::new(20);
        health.current = 0;
        health.dead = true;
        health.heal(10);
        assert_eq!(health.current, 0);
    }

    #[test]
    fn reset_revives() {
        let mut health = Health::new(20);
        health.current = 0;
        health.dead = true;
        health.reset();
        assert!(health.is_alive());
        assert_eq!(health.current, 20);
    }

    #[test]
    fn stamina_consume_is_atomic() {
        let mut stamina = Stamina::full(10.0);
        assert!(!stamina.try_consume(15.0));
        assert_eq!(stamina.current, 10.0);
        assert!(stamina.try_consume(10.0));
        assert_eq!(stamina.current, 0.0);
    }

    #[test]
    fn seeded_rng_is_reproducible() {
        let mut a = GameRng::from_seed(42);
        let mut b = GameRng::from_seed(42);
        for _ in 0..16 {
            assert_eq!(a.random_f32().to_bits(), b.random_f32().to_bits());
        }
    }
}
