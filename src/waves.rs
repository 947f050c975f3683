//! Wave director
//!
//! Sequences authored waves through a per-wave phase machine: briefing delay
//! → cadenced spawning under a concurrency ceiling → draining → intermission
//! (the shop window) → next wave. Story mode walks the authored list in
//! order up to the configured wave count; survival mode draws from a
//! progressively unlocked prefix of the easy→hard list. A wave is finished
//! only when spawning has completed AND every spawned enemy is down.

use bevy::prelude::*;

use crate::attack::AttackController;
use crate::combat::components::{CombatStats, DespawnTimer, GameRng, Health};
use crate::combat::events::{EntityDied, RunEnded, RunOutcome, WaveCompleted, WaveStarted};
use crate::combat::log::{RunLog, RunLogEventType};
use crate::content::{EnemyKind, GameContent, WaveConfig, WavesConfig};
use crate::enemy::ai::EnemyAgent;
use crate::enemy::detection::Detection;
use crate::enemy::{Enemy, EnemyMods};
use crate::movement::MoveController;
use crate::physics::{Body, Collider, Velocity};
use crate::player::Player;
use crate::pool::{self, Dormant, EnemyPool};
use crate::schedule::SimSet;

/// Survival unlocks its full wave pool by this wave index.
pub const SURVIVAL_UNLOCK_HORIZON: u32 = 30;

/// Polling cadence while the concurrency ceiling stalls spawning.
pub const SPAWN_STALL_POLL: f32 = 0.5;

/// Which selection policy the run uses.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum GameMode {
    /// Authored sequence with a bounded wave count and a victory at the end.
    Story,
    /// Endless weighted-progressive selection.
    Survival,
}

/// Global difficulty preset, combined multiplicatively with per-wave
/// multipliers.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum Difficulty {
    Easy,
    Normal,
    Hard,
}

impl Difficulty {
    pub fn health_multiplier(self) -> f32 {
        match self {
            Difficulty::Easy => 0.3,
            Difficulty::Normal => 1.0,
            Difficulty::Hard => 1.5,
        }
    }

    pub fn damage_multiplier(self) -> f32 {
        match self {
            Difficulty::Easy => 0.5,
            Difficulty::Normal => 1.0,
            Difficulty::Hard => 1.5,
        }
    }
}

/// Run-level settings, constructed once per run.
#[derive(Resource, Clone, Copy, Debug)]
pub struct RunSettings {
    pub mode: GameMode,
    pub max_story_waves: u32,
    pub difficulty: Difficulty,
}

/// Authored spawn locations with horizontal jitter.
#[derive(Resource, Clone, Debug)]
pub struct SpawnPoints {
    pub points: Vec<SpawnPoint>,
}

#[derive(Clone, Copy, Debug)]
pub struct SpawnPoint {
    pub position: Vec2,
    pub jitter: f32,
}

impl Default for SpawnPoints {
    fn default() -> Self {
        Self {
            points: vec![
                SpawnPoint { position: Vec2::new(-12.0, 2.0), jitter: 2.0 },
                SpawnPoint { position: Vec2::new(12.0, 2.0), jitter: 2.0 },
            ],
        }
    }
}

impl SpawnPoints {
    pub fn pick(&self, rng: &mut GameRng) -> Vec2 {
        let point = self.points[rng.random_index(self.points.len())];
        let offset = rng.random_range(-point.jitter, point.jitter);
        point.position + Vec2::new(offset, 0.0)
    }
}

/// Phase of the current wave.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum WavePhase {
    /// Not started yet.
    Idle,
    /// Pre-wave delay; briefing text goes out when it elapses.
    Briefing { timer: f32 },
    /// Dispatching spawns one at a time.
    Spawning { timer: f32 },
    /// Spawning complete, waiting for the field to clear.
    Draining,
    /// Between waves: the shop window plus the post-wave delay.
    Intermission { timer: f32 },
    /// Terminal: victory or defeat.
    Finished,
}

/// The wave scheduling state machine.
#[derive(Resource)]
pub struct WaveDirector {
    pub wave_index: u32,
    pub phase: WavePhase,
    pub current: Option<WaveConfig>,
    /// Count-expanded, shuffled spawn order for the current wave.
    pub queue: Vec<EnemyKind>,
    pub spawned: u32,
    pub alive: u32,
    pub spawning_done: bool,
    pub waves_cleared: u32,
    pub outcome: Option<RunOutcome>,
    announced: bool,
}

impl Default for WaveDirector {
    fn default() -> Self {
        Self {
            wave_index: 0,
            phase: WavePhase::Idle,
            current: None,
            queue: Vec::new(),
            spawned: 0,
            alive: 0,
            spawning_done: false,
            waves_cleared: 0,
            outcome: None,
            announced: false,
        }
    }
}

impl WaveDirector {
    /// True once spawning has completed AND every spawned enemy is gone.
    /// Stays true until the next wave starts.
    pub fn is_wave_finished(&self) -> bool {
        self.spawning_done && self.alive == 0
    }

    fn finish(&mut self, outcome: RunOutcome) {
        if self.outcome.is_none() {
            self.outcome = Some(outcome);
        }
        self.phase = WavePhase::Finished;
    }
}

/// Pick the next wave per the mode's selection policy.
///
/// Story: strict sequential lookup bounded by `max_story_waves`; a missing
/// config at a valid index is a content error reported once and treated as
/// early completion. Survival: a uniform draw from the first
/// `max(1, round(total * index / horizon))` entries of the easy→hard list,
/// so early waves are never harder than the unlock tier.
pub fn select_wave(
    waves: &WavesConfig,
    mode: GameMode,
    wave_index: u32,
    max_story_waves: u32,
    rng: &mut GameRng,
) -> Option<WaveConfig> {
    match mode {
        GameMode::Story => {
            if wave_index >= max_story_waves {
                return None;
            }
            let config = waves.story.get(wave_index as usize).cloned();
            if config.is_none() {
                error!(
                    "Missing wave config at story index {} (max {}); ending the run early",
                    wave_index, max_story_waves
                );
            }
            config
        }
        GameMode::Survival => {
            if waves.survival.is_empty() {
                return None;
            }
            let total = waves.survival.len() as f32;
            let progression = (wave_index as f32 / SURVIVAL_UNLOCK_HORIZON as f32).min(1.0);
            let available = ((total * progression).round() as usize).max(1);
            let index = rng.random_index(available);
            waves.survival.get(index).cloned()
        }
    }
}

/// Count-expand the wave composition and Fisher–Yates shuffle it.
pub fn build_spawn_queue(config: &WaveConfig, rng: &mut GameRng) -> Vec<EnemyKind> {
    let mut queue = Vec::with_capacity(config.total_enemy_count() as usize);
    for entry in &config.composition {
        for _ in 0..entry.count {
            queue.push(entry.kind);
        }
    }
    for i in (1..queue.len()).rev() {
        let j = rng.random_index(i + 1);
        queue.swap(i, j);
    }
    queue
}

/// Arm the director for wave zero. Called once by the run assembly.
pub fn start_run(
    director: &mut WaveDirector,
    content: &GameContent,
    settings: &RunSettings,
    rng: &mut GameRng,
) {
    director.wave_index = 0;
    match select_wave(&content.waves, settings.mode, 0, settings.max_story_waves, rng) {
        Some(config) => {
            director.phase = WavePhase::Briefing { timer: config.delay_before };
            director.current = Some(config);
        }
        None => director.finish(RunOutcome::Victory),
    }
}

type DormantResetQuery<'w, 's> = Query<
    'w,
    's,
    (
        &'static mut Transform,
        &'static mut Velocity,
        &'static mut Body,
        &'static mut Collider,
        &'static mut Health,
        &'static mut CombatStats,
        &'static mut EnemyMods,
        &'static mut MoveController,
        &'static mut AttackController,
        &'static mut Detection,
        &'static mut EnemyAgent,
    ),
    With<Dormant>,
>;

/// Step the wave phase machine.
#[allow(clippy::too_many_arguments)]
pub fn wave_director(
    time: Res<Time>,
    content: Res<GameContent>,
    settings: Res<RunSettings>,
    spawn_points: Res<SpawnPoints>,
    mut director: ResMut<WaveDirector>,
    mut rng: ResMut<GameRng>,
    mut pool: ResMut<EnemyPool>,
    mut commands: Commands,
    mut dormant: DormantResetQuery,
    mut deaths: EventReader<EntityDied>,
    enemies: Query<(), With<Enemy>>,
    mut wave_started: EventWriter<WaveStarted>,
    mut wave_completed: EventWriter<WaveCompleted>,
    mut run_ended: EventWriter<RunEnded>,
    mut log: ResMut<RunLog>,
) {
    let dt = time.delta_secs();

    // Enemy deaths drain the alive counter no matter the phase.
    for death in deaths.read() {
        if enemies.get(death.entity).is_ok() {
            director.alive = director.alive.saturating_sub(1);
        }
    }

    match director.phase {
        WavePhase::Idle => {}
        WavePhase::Briefing { timer } => {
            let remaining = timer - dt;
            if remaining > 0.0 {
                director.phase = WavePhase::Briefing { timer: remaining };
                return;
            }

            let Some(config) = director.current.clone() else {
                director.finish(RunOutcome::Victory);
                return;
            };

            director.queue = build_spawn_queue(&config, &mut rng);
            director.spawned = 0;
            director.spawning_done = director.queue.is_empty();
            director.phase = if director.spawning_done {
                // Degenerate authored wave; nothing to dispatch.
                WavePhase::Draining
            } else {
                WavePhase::Spawning { timer: 0.0 }
            };

            let index = director.wave_index + 1;
            if let Some(briefing) = &config.briefing {
                log.log(RunLogEventType::Wave, format!("[{}] {}", config.name, briefing));
            }
            log.log(RunLogEventType::Wave, format!("Wave {} started: {}", index, config.name));
            wave_started.send(WaveStarted { index, name: config.name.clone() });
        }
        WavePhase::Spawning { timer } => {
            let remaining = timer - dt;
            if remaining > 0.0 {
                director.phase = WavePhase::Spawning { timer: remaining };
                return;
            }

            let Some(config) = director.current.clone() else {
                director.finish(RunOutcome::Victory);
                return;
            };

            // Concurrency ceiling: stall and poll until the field thins out.
            if director.alive >= config.max_concurrent {
                director.phase = WavePhase::Spawning { timer: SPAWN_STALL_POLL };
                return;
            }

            let kind = director.queue[director.spawned as usize];
            let position = spawn_points.pick(&mut rng);
            let health_mult =
                config.health_multiplier * settings.difficulty.health_multiplier();
            let damage_mult =
                config.damage_multiplier * settings.difficulty.damage_multiplier();

            let mut reused = false;
            if let Some(entity) = pool.take(kind) {
                if let Ok(mut parts) = dormant.get_mut(entity) {
                    pool::reset_enemy(
                        content.enemy(kind),
                        position,
                        health_mult,
                        damage_mult,
                        &mut parts.0,
                        &mut parts.1,
                        &mut parts.2,
                        &mut parts.3,
                        &mut parts.4,
                        &mut parts.5,
                        &mut parts.6,
                        &mut parts.7,
                        &mut parts.8,
                        &mut parts.9,
                        &mut parts.10,
                    );
                    commands.entity(entity).remove::<Dormant>().remove::<DespawnTimer>();
                    reused = true;
                }
            }

            if !reused {
                // Pool exhausted: grow on demand.
                warn!("Enemy pool for {:?} exhausted; growing", kind);
                pool::spawn_enemy_entity(
                    &mut commands,
                    &content,
                    kind,
                    position,
                    health_mult,
                    damage_mult,
                );
            }

            director.alive += 1;
            director.spawned += 1;

            if director.spawned as usize >= director.queue.len() {
                director.spawning_done = true;
                director.phase = WavePhase::Draining;
            } else {
                director.phase = WavePhase::Spawning { timer: config.spawn_interval };
            }
        }
        WavePhase::Draining => {
            if !director.is_wave_finished() {
                return;
            }

            director.waves_cleared += 1;
            let index = director.wave_index + 1;
            log.log(RunLogEventType::Wave, format!("Wave {} completed", index));
            wave_completed.send(WaveCompleted { index });

            let is_final_story_wave = settings.mode == GameMode::Story
                && director.wave_index + 1 >= settings.max_story_waves;
            if is_final_story_wave {
                director.finish(RunOutcome::Victory);
            } else {
                let delay = director.current.as_ref().map_or(0.0, |c| c.delay_after);
                director.phase = WavePhase::Intermission { timer: delay };
            }
        }
        WavePhase::Intermission { timer } => {
            let remaining = timer - dt;
            if remaining > 0.0 {
                director.phase = WavePhase::Intermission { timer: remaining };
                return;
            }

            director.wave_index += 1;
            match select_wave(
                &content.waves,
                settings.mode,
                director.wave_index,
                settings.max_story_waves,
                &mut rng,
            ) {
                Some(config) => {
                    director.phase = WavePhase::Briefing { timer: config.delay_before };
                    director.current = Some(config);
                }
                None => director.finish(RunOutcome::Victory),
            }
        }
        WavePhase::Finished => {}
    }

    // Announce the terminal state exactly once.
    if director.phase == WavePhase::Finished && !director.announced {
        if let Some(outcome) = director.outcome {
            director.announced = true;
            log.log(RunLogEventType::RunEvent, format!("Run ended: {:?}", outcome));
            run_ended.send(RunEnded { outcome });
        }
    }
}

/// Player death ends the run: stop the wave loop and despawn every active
/// enemy back into the pool.
pub fn watch_player_death(
    mut deaths: EventReader<EntityDied>,
    players: Query<(), With<Player>>,
    active_enemies: Query<Entity, (With<Enemy>, Without<Dormant>)>,
    mut director: ResMut<WaveDirector>,
    mut commands: Commands,
    mut run_ended: EventWriter<RunEnded>,
    mut log: ResMut<RunLog>,
) {
    for death in deaths.read() {
        if players.get(death.entity).is_err() || director.outcome.is_some() {
            continue;
        }

        director.finish(RunOutcome::Defeat);
        director.announced = true;
        log.log(RunLogEventType::RunEvent, "Run ended: Defeat".to_string());
        run_ended.send(RunEnded { outcome: RunOutcome::Defeat });

        for enemy in active_enemies.iter() {
            commands.entity(enemy).insert(Dormant);
        }
        director.alive = 0;
    }
}

pub struct WavePlugin;

impl Plugin for WavePlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<WaveDirector>()
            .init_resource::<SpawnPoints>()
            .add_systems(
                Update,
                (wave_director, watch_player_death)
                    .chain()
                    .in_set(SimSet::Flow)
                    .after(crate::pool::reclaim_dormant),
            );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::{WaveConfig, WaveEntry};

    fn wave(name: &str) -> WaveConfig {
        WaveConfig {
            name: name.to_string(),
            briefing: None,
            composition: vec![WaveEntry { kind: EnemyKind::Shambler, count: 3, spawn_weight: 5 }],
            max_concurrent: 2,
            spawn_interval: 1.0,
            delay_before: 0.0,
            delay_after: 0.0,
            health_multiplier: 1.0,
            damage_multiplier: 1.0,
        }
    }

    fn waves_fixture(story: usize, survival: usize) -> WavesConfig {
        WavesConfig {
            story: (0..story).map(|i| wave(&format!("story-{}", i))).collect(),
            survival: (0..survival).map(|i| wave(&format!("survival-{}", i))).collect(),
        }
    }

    #[test]
    fn story_selection_is_sequential_and_bounded() {
        let waves = waves_fixture(3, 3);
        let mut rng = GameRng::from_seed(1);

        let first = select_wave(&waves, GameMode::Story, 0, 3, &mut rng).unwrap();
        assert_eq!(first.name, "story-0");
        let last = select_wave(&waves, GameMode::Story, 2, 3, &mut rng).unwrap();
        assert_eq!(last.name, "story-2");
        assert!(select_wave(&waves, GameMode::Story, 3, 3, &mut rng).is_none());
    }

    #[test]
    fn story_missing_config_is_early_completion() {
        let waves = waves_fixture(2, 2);
        let mut rng = GameRng::from_seed(1);
        // Index 2 is valid (max 5) but unauthored.
        assert!(select_wave(&waves, GameMode::Story, 2, 5, &mut rng).is_none());
    }

    #[test]
    fn survival_wave_zero_draws_only_the_easiest_entry() {
        let waves = waves_fixture(1, 10);
        // round(10 * 0/30) = 0 falls back to a single eligible entry.
        for seed in 0..20 {
            let mut rng = GameRng::from_seed(seed);
            let picked = select_wave(&waves, GameMode::Survival, 0, 1, &mut rng).unwrap();
            assert_eq!(picked.name, "survival-0");
        }
    }

    #[test]
    fn survival_unlock_grows_with_wave_index() {
        let waves = waves_fixture(1, 10);
        // At the horizon the whole pool is eligible; sample a few seeds and
        // check draws stay within it while reaching past the first entry.
        let mut seen_past_first = false;
        for seed in 0..40 {
            let mut rng = GameRng::from_seed(seed);
            let picked =
                select_wave(&waves, GameMode::Survival, SURVIVAL_UNLOCK_HORIZON, 1, &mut rng)
                    .unwrap();
            if picked.name != "survival-0" {
                seen_past_first = true;
            }
        }
        assert!(seen_past_first);
    }

    #[test]
    fn spawn_queue_expands_counts() {
        let mut config = wave("w");
        config.composition = vec![
            WaveEntry { kind: EnemyKind::Shambler, count: 2, spawn_weight: 5 },
            WaveEntry { kind: EnemyKind::Sentry, count: 1, spawn_weight: 5 },
        ];
        let mut rng = GameRng::from_seed(7);
        let queue = build_spawn_queue(&config, &mut rng);
        assert_eq!(queue.len(), 3);
        assert_eq!(queue.iter().filter(|k| **k == EnemyKind::Shambler).count(), 2);
        assert_eq!(queue.iter().filter(|k| **k == EnemyKind::Sentry).count(), 1);
    }

    #[test]
    fn wave_finished_requires_both_conditions() {
        let mut director = WaveDirector::default();
        director.spawning_done = false;
        director.alive = 0;
        assert!(!director.is_wave_finished());

        director.spawning_done = true;
        director.alive = 2;
        assert!(!director.is_wave_finished());

        director.alive = 0;
        assert!(director.is_wave_finished());
        // Idempotent until the next wave rearms the flags.
        assert!(director.is_wave_finished());
    }
}
