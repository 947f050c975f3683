//! Combat and run-flow events
//!
//! The presentation seam: every notification a renderer, HUD or audio layer
//! would subscribe to is a fire-and-forget event here. Nothing listens back
//! into the core except the input snapshot.

use bevy::prelude::*;
use serde::{Deserialize, Serialize};

use crate::content::WeaponId;

/// Knockback parameters carried alongside a damage request.
#[derive(Clone, Copy, Debug)]
pub struct KnockbackSpec {
    pub force: f32,
    /// Fraction of the force converted to lift.
    pub upward_factor: f32,
    /// Stun/lock window started on the target.
    pub stun: f32,
}

/// A request to apply damage to one entity this tick. All damage funnels
/// through the single resolver system so blocking, death and hit reactions
/// behave identically no matter the source. Requests are resolved in emission
/// order within the same tick; they never carry over to the next tick.
///
/// `amount == 0` is a pure hit-reaction (dash shove): knockback and wake-up
/// apply, health does not change.
#[derive(Event, Clone, Copy, Debug)]
pub struct DamageRequest {
    pub target: Entity,
    pub amount: i32,
    /// Where the hit came from; knockback pushes away from here.
    pub source_pos: Vec2,
    pub knockback: Option<KnockbackSpec>,
}

/// An attack was executed (fired/swung), regardless of whether it landed.
#[derive(Event, Clone, Copy, Debug)]
pub struct AttackExecuted {
    pub attacker: Entity,
    pub weapon: WeaponId,
}

/// A melee sweep or deflect connected with at least one target.
#[derive(Event, Clone, Copy, Debug)]
pub struct AttackLanded {
    pub attacker: Entity,
}

/// An entity took non-zero health damage.
#[derive(Event, Clone, Copy, Debug)]
pub struct HitTaken {
    pub entity: Entity,
    pub amount: i32,
}

/// An entity died. Fired exactly once per life; `score`/`gold` carry the
/// kill reward for enemies and are zero for the player.
#[derive(Event, Clone, Copy, Debug)]
pub struct EntityDied {
    pub entity: Entity,
    pub score: i32,
    pub gold: i32,
}

/// The player switched weapons.
#[derive(Event, Clone, Copy, Debug)]
pub struct WeaponChanged {
    pub weapon: WeaponId,
}

/// Gold balance changed; carries the new total.
#[derive(Event, Clone, Copy, Debug)]
pub struct GoldChanged {
    pub balance: i32,
}

/// Score changed; carries the new total.
#[derive(Event, Clone, Copy, Debug)]
pub struct ScoreChanged {
    pub score: i32,
}

/// A wave began spawning (1-based index for display).
#[derive(Event, Clone, Debug)]
pub struct WaveStarted {
    pub index: u32,
    pub name: String,
}

/// A wave finished: spawning complete and every spawned enemy down.
#[derive(Event, Clone, Copy, Debug)]
pub struct WaveCompleted {
    pub index: u32,
}

/// How a run ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunOutcome {
    /// Final story wave cleared.
    Victory,
    /// Player died.
    Defeat,
    /// Wall-clock cap reached (headless safety net).
    Timeout,
}

/// The run is over; emitted exactly once.
#[derive(Event, Clone, Copy, Debug)]
pub struct RunEnded {
    pub outcome: RunOutcome,
}
