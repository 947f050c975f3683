//! Headless run execution
//!
//! Runs complete simulated runs without any graphical output, suitable for
//! automated testing and balance work. The app is stepped manually on a
//! fixed virtual timestep, so a multi-minute run finishes in well under a
//! second of wall-clock time and a seeded run is bit-for-bit reproducible.

use bevy::app::ScheduleRunnerPlugin;
use bevy::prelude::*;
use bevy::time::TimeUpdateStrategy;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::attack::WeaponBook;
use crate::combat::components::{GameRng, Health};
use crate::combat::events::RunOutcome;
use crate::combat::log::{RunLog, RunLogEventType, RunMetadata};
use crate::content::GameContent;
use crate::economy::{GoldLedger, Scoreboard, ShopState};
use crate::player::{spawn_player, Player};
use crate::pool::prewarm_pool;
use crate::schedule::SimSet;
use crate::waves::{start_run, RunSettings, WaveDirector};
use crate::GameplayPlugin;

use super::autopilot;
use super::config::RunConfig;

/// Simulation tick length (60 Hz).
pub const TICK: Duration = Duration::from_nanos(16_666_667);

/// Result of a completed headless run.
///
/// Programmatic access to run results for testing and analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub outcome: RunOutcome,
    pub waves_cleared: u32,
    pub score: i32,
    pub gold: i32,
    pub kills: u32,
    /// Simulated seconds from run start to the end condition.
    pub survival_time: f32,
    /// Player health remaining at run end (0 on defeat).
    pub final_health: i32,
    /// Random seed used (if deterministic mode).
    pub random_seed: Option<u64>,
}

/// Resource tracking headless run state.
#[derive(Resource)]
pub struct RunState {
    pub max_duration: f32,
    pub elapsed: f32,
    pub complete: bool,
    pub output_path: Option<String>,
    pub skip_log_file: bool,
    pub mode_label: String,
    pub random_seed: Option<u64>,
    pub summary: Option<RunSummary>,
}

/// Plugin for headless run execution. Assumes [`GameContent`] is already
/// inserted and [`GameplayPlugin`] is added alongside it.
pub struct HeadlessPlugin {
    pub config: RunConfig,
}

impl Plugin for HeadlessPlugin {
    fn build(&self, app: &mut App) {
        let content = app.world().resource::<GameContent>();
        let settings = self
            .config
            .to_settings(content)
            .expect("Invalid run configuration");

        let rng = match self.config.random_seed {
            Some(seed) => {
                info!("Using deterministic RNG with seed: {}", seed);
                GameRng::from_seed(seed)
            }
            None => {
                info!("Using non-deterministic RNG (no seed provided)");
                GameRng::from_entropy()
            }
        };

        app.insert_resource(settings)
            .insert_resource(rng)
            .insert_resource(RunState {
                max_duration: self.config.max_duration_secs,
                elapsed: 0.0,
                complete: false,
                output_path: self.config.output_path.clone(),
                skip_log_file: self.config.skip_log_file,
                mode_label: self.config.mode.clone(),
                random_seed: self.config.random_seed,
                summary: None,
            })
            .add_systems(Startup, headless_setup)
            .add_systems(Update, autopilot::drive_autopilot.in_set(SimSet::Input))
            .add_systems(
                Update,
                (headless_track_time, headless_check_run_end)
                    .chain()
                    .in_set(SimSet::Cleanup)
                    .after(crate::combat::log::advance_log_clock),
            )
            .add_systems(PostUpdate, headless_exit_on_complete);

        if self.config.auto_shop {
            app.add_systems(
                Update,
                autopilot::auto_shop
                    .in_set(SimSet::Flow)
                    .after(crate::economy::credit_kills),
            );
        }
    }
}

/// Assemble the run: per-run weapon book and shop counters, the player,
/// the pre-warmed pool, and the armed wave director.
fn headless_setup(
    mut commands: Commands,
    content: Res<GameContent>,
    settings: Res<RunSettings>,
    mut director: ResMut<WaveDirector>,
    mut rng: ResMut<GameRng>,
    mut log: ResMut<RunLog>,
) {
    log.clear();
    log.log(RunLogEventType::RunEvent, format!("Run started ({:?} mode)", settings.mode));

    let book = WeaponBook::from_content(&content);
    spawn_player(&mut commands, &content, &book);
    commands.insert_resource(book);
    commands.insert_resource(ShopState::new(content.shop.items.len()));

    prewarm_pool(&mut commands, &content);
    start_run(&mut director, &content, &settings, &mut rng);

    info!(
        "Headless run setup complete: {:?} mode, {} story waves available",
        settings.mode,
        content.waves.story.len()
    );
}

/// Track elapsed simulated time for timeout detection.
fn headless_track_time(time: Res<Time>, mut state: ResMut<RunState>) {
    if !state.complete {
        state.elapsed += time.delta_secs();
    }
}

/// Check whether the run has ended (director terminal, or timeout).
#[allow(clippy::too_many_arguments)]
fn headless_check_run_end(
    director: Res<WaveDirector>,
    scoreboard: Res<Scoreboard>,
    ledger: Res<GoldLedger>,
    players: Query<&Health, With<Player>>,
    mut state: ResMut<RunState>,
    log: Res<RunLog>,
) {
    if state.complete {
        return;
    }

    let outcome = if let Some(outcome) = director.outcome {
        outcome
    } else if state.elapsed >= state.max_duration {
        info!("Run timed out after {:.1}s", state.elapsed);
        RunOutcome::Timeout
    } else {
        return;
    };

    let final_health = players.get_single().map_or(0, |health| health.current);
    let summary = RunSummary {
        outcome,
        waves_cleared: director.waves_cleared,
        score: scoreboard.score,
        gold: ledger.balance(),
        kills: scoreboard.kills,
        survival_time: state.elapsed,
        final_health,
        random_seed: state.random_seed,
    };

    if !state.skip_log_file {
        let metadata = RunMetadata {
            mode: state.mode_label.clone(),
            outcome: Some(format!("{:?}", outcome)),
            waves_cleared: summary.waves_cleared,
            score: summary.score,
            gold: summary.gold,
            survival_time: summary.survival_time,
            random_seed: summary.random_seed,
        };
        match log.save_to_file(&metadata, state.output_path.as_deref()) {
            Ok(filename) => println!("Run complete. Log saved to: {}", filename),
            Err(e) => eprintln!("Failed to save run log: {}", e),
        }
    }

    state.summary = Some(summary);
    state.complete = true;
}

/// Exit the app when the run is complete (used when driven by `App::run`).
fn headless_exit_on_complete(state: Res<RunState>, mut exit: EventWriter<AppExit>) {
    if state.complete {
        exit.send(AppExit::Success);
    }
}

/// Build the headless app for a run configuration.
pub fn build_headless_app(config: RunConfig) -> Result<App, String> {
    config.validate()?;
    let content = GameContent::load_default()?;

    let mut app = App::new();
    app
        // Minimal plugins: no window, no rendering.
        .add_plugins(MinimalPlugins.set(ScheduleRunnerPlugin::run_loop(TICK)))
        .add_plugins(TransformPlugin)
        // Fixed virtual timestep: every update advances exactly one tick,
        // independent of wall-clock time.
        .insert_resource(TimeUpdateStrategy::ManualDuration(TICK))
        .insert_resource(content)
        .add_plugins(GameplayPlugin)
        .add_plugins(HeadlessPlugin { config });
    Ok(app)
}

/// Run a headless run to completion and return its summary.
pub fn run_headless(config: RunConfig) -> Result<RunSummary, String> {
    let max_duration = config.max_duration_secs;
    let mut app = build_headless_app(config)?;

    // Safety margin past the in-sim timeout so the loop always terminates.
    let max_frames = (max_duration as f64 / TICK.as_secs_f64()) as u64 + 600;
    for _ in 0..max_frames {
        app.update();
        if app.world().resource::<RunState>().complete {
            break;
        }
    }

    let mut state = app.world_mut().resource_mut::<RunState>();
    state
        .summary
        .take()
        .ok_or_else(|| "Run did not complete within the frame budget".to_string())
}
