//! Data-driven content records
//!
//! All author-time tuning lives in RON files under `assets/config/`:
//! character stats, weapon definitions, enemy archetypes, wave compositions
//! and the shop inventory. Records are loaded and validated once at startup
//! and never mutated afterwards — runs operate on private copies
//! (see [`crate::attack::WeaponBook`]).
//!
//! ## Benefits
//! - Balance changes don't require recompilation
//! - Easier to review and modify tuning values
//! - Validates all content exists at startup

use bevy::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

/// Enemy archetypes. Each maps to an [`EnemySpec`] in `enemies.ron` and keys
/// the enemy pool.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EnemyKind {
    /// Ground melee rusher, aggressive from spawn.
    Shambler,
    /// Flying spitter that patrols until it notices the player.
    Spitter,
    /// Immobile turret with a long detection radius.
    Sentry,
    /// Dormant ambusher that only wakes when hurt.
    Lurker,
}

impl EnemyKind {
    /// All kinds in a fixed order (pool prewarm, validation).
    pub const ALL: [EnemyKind; 4] =
        [EnemyKind::Shambler, EnemyKind::Spitter, EnemyKind::Sentry, EnemyKind::Lurker];
}

/// Weapon identifiers for both player and enemy attacks.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WeaponId {
    /// Player basic melee swing.
    Ripsaw,
    /// Player sidearm: fast piercing projectile, heat-gated.
    Stinger,
    /// Player grenade: lobbed arc that bursts into a lingering acid zone.
    AcidFlask,
    /// Player slam: expanding one-shot shockwave.
    Shockwave,
    /// Enemy melee bite.
    Bite,
    /// Enemy straight projectile.
    Spit,
}

impl WeaponId {
    pub const ALL: [WeaponId; 6] = [
        WeaponId::Ripsaw,
        WeaponId::Stinger,
        WeaponId::AcidFlask,
        WeaponId::Shockwave,
        WeaponId::Bite,
        WeaponId::Spit,
    ];
}

/// How an attack resolves once fired.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum WeaponBehavior {
    /// Immediate overlap sweep at weapon range.
    Melee,
    /// Kinematic carrier at constant speed along its initial heading.
    Projectile,
    /// Static carrier that grows to a final size.
    Area,
    /// Gravity-affected arc that explodes on contact.
    Lobbed,
    /// Long-lived growing hazard (usually the aftermath of a Lobbed burst).
    Zone,
}

/// Initial policy of an enemy's behavior state machine.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum BehaviorType {
    /// Seeks the player from spawn, ignoring the detection radius.
    Aggressive,
    /// Walks a waypoint ring until detection fires.
    Patrol,
    /// Never moves; waits for detection, then attacks in place.
    Stationary,
    /// Detection disabled until woken by damage.
    Sleeping,
}

/// Ground vs. flying locomotion.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub enum Locomotion {
    Ground,
    Flying { hover_height: f32, smoothing: f32 },
}

/// Shared baseline numeric stats for one character archetype.
/// Referenced by content, copied per instance at spawn.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CharacterStats {
    pub name: String,
    pub max_health: i32,
    pub damage: i32,
    pub move_speed: f32,
    #[serde(default)]
    pub attack_range: f32,
    #[serde(default)]
    pub attack_cooldown: f32,
    #[serde(default)]
    pub detection_radius: f32,
    #[serde(default)]
    pub max_stamina: f32,
    #[serde(default)]
    pub stamina_regen_rate: f32,
    #[serde(default)]
    pub dash_stamina_cost: f32,
    #[serde(default)]
    pub block_stamina_cost: f32,
    #[serde(default)]
    pub block_defense: i32,
    #[serde(default)]
    pub score_value: i32,
    #[serde(default)]
    pub gold_drop: i32,
}

/// Player stats: a plain [`CharacterStats`] value plus player-only fields.
/// Composition, not inheritance — nothing dispatches on the data.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PlayerStats {
    pub base: CharacterStats,
    /// Multiplier on gold earned from kills (1.0 = 100%).
    #[serde(default = "one")]
    pub money_multiplier: f32,
    /// Critical strike probability in [0, 1].
    #[serde(default)]
    pub crit_chance: f32,
    /// Damage multiplier on a critical strike.
    #[serde(default = "one")]
    pub crit_multiplier: f32,
    /// Radius for collecting drops.
    #[serde(default)]
    pub pickup_range: f32,
    /// Revives available per run.
    #[serde(default)]
    pub revives: i32,
}

fn one() -> f32 {
    1.0
}

/// Complete definition of one attack. Content is immutable; each run works
/// against its own mutable copy so upgrades never bleed between runs.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct WeaponSpec {
    pub name: String,
    pub behavior: WeaponBehavior,
    pub damage: i32,
    pub range: f32,
    pub cooldown: f32,

    // === Ammo / heat ===
    /// When true, firing is gated on the ammo pool below.
    #[serde(default)]
    pub use_ammo: bool,
    #[serde(default)]
    pub max_ammo: f32,
    #[serde(default)]
    pub ammo_cost_per_shot: f32,
    #[serde(default)]
    pub ammo_regen_rate: f32,

    // === Knockback ===
    #[serde(default)]
    pub has_hit_reaction: bool,
    #[serde(default)]
    pub hit_stun_duration: f32,
    #[serde(default)]
    pub knockback_force: f32,
    /// Fraction of the force converted to lift (0..1).
    #[serde(default)]
    pub knockback_upward_factor: f32,

    // === Projectile / Lobbed ===
    #[serde(default)]
    pub projectile_speed: f32,
    #[serde(default)]
    pub projectile_lifetime: f32,
    /// Extra targets a projectile may strike before despawning.
    #[serde(default)]
    pub pierce_count: i32,
    /// Upward impulse added to lobbed throws.
    #[serde(default)]
    pub throw_arc: f32,
    /// Lobbed only: burst into a Zone at the impact point.
    #[serde(default)]
    pub explodes_into_zone: bool,

    // === Area / Zone ===
    #[serde(default)]
    pub area_final_size: f32,
    #[serde(default)]
    pub area_growth_speed: f32,
    #[serde(default)]
    pub damage_over_time: bool,
    #[serde(default)]
    pub tick_rate: f32,
    /// Lifetime of a spawned Zone instance.
    #[serde(default)]
    pub zone_lifetime: f32,

    // === Unlock ===
    #[serde(default)]
    pub unlocked_by_default: bool,
}

/// One enemy archetype: stats, initial behavior, locomotion and weapon.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EnemySpec {
    pub stats: CharacterStats,
    pub behavior: BehaviorType,
    pub locomotion: Locomotion,
    pub weapon: WeaponId,
    /// Half-width of the generated patrol ring (Patrol behavior only).
    #[serde(default)]
    pub patrol_span: f32,
    /// Dwell time at each patrol point.
    #[serde(default)]
    pub patrol_wait: f32,
}

/// One entry of a wave's enemy composition.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct WaveEntry {
    pub kind: EnemyKind,
    pub count: u32,
    #[serde(default = "default_spawn_weight")]
    pub spawn_weight: u32,
}

fn default_spawn_weight() -> u32 {
    5
}

/// One scripted batch of enemies with its own pacing and difficulty.
/// Selected, never mutated, by the wave director.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct WaveConfig {
    pub name: String,
    /// Narrative payload surfaced to observers when the wave starts.
    #[serde(default)]
    pub briefing: Option<String>,
    pub composition: Vec<WaveEntry>,
    pub max_concurrent: u32,
    pub spawn_interval: f32,
    #[serde(default)]
    pub delay_before: f32,
    #[serde(default)]
    pub delay_after: f32,
    #[serde(default = "one")]
    pub health_multiplier: f32,
    #[serde(default = "one")]
    pub damage_multiplier: f32,
}

impl WaveConfig {
    pub fn total_enemy_count(&self) -> u32 {
        self.composition.iter().map(|e| e.count).sum()
    }
}

/// Authored wave lists. `story` is played in order; `survival` must be
/// ordered easy → hard (the director's progressive unlock depends on it).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct WavesConfig {
    pub story: Vec<WaveConfig>,
    pub survival: Vec<WaveConfig>,
}

/// Player stats an upgrade can touch.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlayerStatKind {
    MaxHealth,
    Damage,
    MoveSpeed,
    AttackCooldown,
    CritChance,
    CritMultiplier,
    MoneyMultiplier,
    MaxStamina,
    StaminaRegen,
    BlockDefense,
    BlockCost,
    DashCost,
    PickupRange,
    Revives,
}

/// Weapon stats an upgrade can touch.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum WeaponStatKind {
    Damage,
    Range,
    Cooldown,
    MaxAmmo,
    AmmoRegen,
    ProjectileSpeed,
    PierceCount,
}

/// A single upgrade effect. Items carry an ordered list of these; purchase
/// applies them in order to the live run state.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum UpgradeEffect {
    /// Flat or percentage delta on a player stat.
    StatBuff { stat: PlayerStatKind, amount: f32, #[serde(default)] percentage: bool },
    /// Delta on the equipped weapon, or on every unlocked weapon.
    WeaponBuff {
        stat: WeaponStatKind,
        amount: f32,
        #[serde(default)]
        percentage: bool,
        #[serde(default)]
        all_weapons: bool,
    },
    /// Flip the runtime unlock flag on a weapon.
    UnlockWeapon { weapon: WeaponId },
    /// Refill every ammo-gated weapon by a fraction of its max.
    RefillAmmo { fraction: f32 },
    /// Restore health (negative amounts are sacrificial trade-offs).
    Heal { amount: i32 },
}

/// One purchasable shop item.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ShopItemConfig {
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub base_cost: i32,
    /// Price growth per owned level (1.2 = 20% more each purchase).
    pub cost_multiplier: f32,
    /// Offer probability weight. High = common, low = rare.
    pub spawn_weight: u32,
    /// One-time items cap at level 1 and vanish from offers afterwards.
    #[serde(default)]
    pub one_time: bool,
    pub effects: Vec<UpgradeEffect>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ShopConfig {
    pub items: Vec<ShopItemConfig>,
}

// ============================================================================
// Loading & validation
// ============================================================================

/// Root RON document of `weapons.ron`.
#[derive(Debug, Serialize, Deserialize)]
pub struct WeaponsFile {
    pub weapons: HashMap<WeaponId, WeaponSpec>,
}

/// Root RON document of `enemies.ron`.
#[derive(Debug, Serialize, Deserialize)]
pub struct EnemiesFile {
    pub player: PlayerStats,
    pub enemies: HashMap<EnemyKind, EnemySpec>,
    /// Deactivated instances pre-warmed per kind at run start.
    #[serde(default = "default_pool_prewarm")]
    pub pool_prewarm: u32,
}

fn default_pool_prewarm() -> u32 {
    4
}

/// All loaded content. Inserted as a read-only resource.
#[derive(Resource, Debug)]
pub struct GameContent {
    pub player: PlayerStats,
    pub enemies: HashMap<EnemyKind, EnemySpec>,
    pub weapons: HashMap<WeaponId, WeaponSpec>,
    pub waves: WavesConfig,
    pub shop: ShopConfig,
    pub pool_prewarm: u32,
}

impl GameContent {
    pub fn weapon(&self, id: WeaponId) -> &WeaponSpec {
        self.weapons
            .get(&id)
            .unwrap_or_else(|| panic!("Weapon {:?} not found in definitions", id))
    }

    pub fn enemy(&self, kind: EnemyKind) -> &EnemySpec {
        self.enemies
            .get(&kind)
            .unwrap_or_else(|| panic!("Enemy {:?} not found in definitions", kind))
    }

    /// Load all content from `assets/config/` and validate it.
    pub fn load_default() -> Result<Self, String> {
        Self::load_from_dir(Path::new("assets/config"))
    }

    pub fn load_from_dir(dir: &Path) -> Result<Self, String> {
        let weapons: WeaponsFile = read_ron(&dir.join("weapons.ron"))?;
        let enemies: EnemiesFile = read_ron(&dir.join("enemies.ron"))?;
        let waves: WavesConfig = read_ron(&dir.join("waves.ron"))?;
        let shop: ShopConfig = read_ron(&dir.join("shop.ron"))?;

        let content = Self {
            player: enemies.player,
            enemies: enemies.enemies,
            weapons: weapons.weapons,
            waves,
            shop,
            pool_prewarm: enemies.pool_prewarm,
        };
        content.validate()?;
        Ok(content)
    }

    /// Cross-reference and sanity checks. Reported once, loudly, at load time
    /// so bad data is a designer problem rather than a runtime surprise.
    pub fn validate(&self) -> Result<(), String> {
        let mut problems = Vec::new();

        for id in WeaponId::ALL {
            if !self.weapons.contains_key(&id) {
                problems.push(format!("missing weapon definition: {:?}", id));
            }
        }
        for kind in EnemyKind::ALL {
            match self.enemies.get(&kind) {
                None => problems.push(format!("missing enemy definition: {:?}", kind)),
                Some(spec) => {
                    if !self.weapons.contains_key(&spec.weapon) {
                        problems.push(format!(
                            "enemy {:?} references missing weapon {:?}",
                            kind, spec.weapon
                        ));
                    }
                    if spec.stats.max_health <= 0 {
                        problems.push(format!("enemy {:?} has non-positive max health", kind));
                    }
                }
            }
        }

        for (id, spec) in &self.weapons {
            if spec.cooldown < 0.0 {
                problems.push(format!("weapon {:?} has negative cooldown", id));
            }
            if spec.use_ammo && spec.ammo_cost_per_shot > spec.max_ammo {
                problems.push(format!("weapon {:?} can never afford a shot", id));
            }
            if matches!(spec.behavior, WeaponBehavior::Area | WeaponBehavior::Zone)
                && spec.area_final_size <= 0.0
            {
                problems.push(format!("weapon {:?} has no area size", id));
            }
        }

        if self.waves.story.is_empty() {
            problems.push("no story waves authored".to_string());
        }
        if self.waves.survival.is_empty() {
            problems.push("no survival waves authored".to_string());
        }
        for wave in self.waves.story.iter().chain(self.waves.survival.iter()) {
            if wave.composition.is_empty() || wave.total_enemy_count() == 0 {
                problems.push(format!("wave '{}' spawns nothing", wave.name));
            }
            if wave.max_concurrent == 0 {
                problems.push(format!("wave '{}' has a zero concurrency cap", wave.name));
            }
            for entry in &wave.composition {
                if !self.enemies.contains_key(&entry.kind) {
                    problems.push(format!(
                        "wave '{}' references missing enemy {:?}",
                        wave.name, entry.kind
                    ));
                }
            }
        }

        for item in &self.shop.items {
            if item.base_cost < 0 {
                problems.push(format!("shop item '{}' has negative cost", item.title));
            }
            if item.effects.is_empty() {
                problems.push(format!("shop item '{}' does nothing", item.title));
            }
            for effect in &item.effects {
                if let UpgradeEffect::UnlockWeapon { weapon } = effect {
                    if !self.weapons.contains_key(weapon) {
                        problems.push(format!(
                            "shop item '{}' unlocks missing weapon {:?}",
                            item.title, weapon
                        ));
                    }
                }
            }
        }

        if problems.is_empty() {
            Ok(())
        } else {
            Err(format!("content validation failed:\n  {}", problems.join("\n  ")))
        }
    }
}

fn read_ron<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, String> {
    let contents = std::fs::read_to_string(path)
        .map_err(|e| format!("Failed to read {}: {}", path.display(), e))?;
    ron::from_str(&contents).map_err(|e| format!("Failed to parse {}: {}", path.display(), e))
}

/// Loads and validates content at startup. Panics on invalid data so broken
/// content never reaches a running simulation.
pub struct ContentPlugin;

impl Plugin for ContentPlugin {
    fn build(&self, app: &mut App) {
        match GameContent::load_default() {
            Ok(content) => {
                info!(
                    "Loaded content: {} weapons, {} enemies, {} story waves, {} shop items",
                    content.weapons.len(),
                    content.enemies.len(),
                    content.waves.story.len(),
                    content.shop.items.len()
                );
                app.insert_resource(content);
            }
            Err(e) => panic!("Failed to load game content: {}", e),
        }
    }
}
