//! JSON configuration for headless runs
//!
//! Parses JSON run configurations and converts them to the run settings the
//! director consumes.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::content::GameContent;
use crate::waves::{Difficulty, GameMode, RunSettings};

/// Headless run configuration loaded from JSON.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    /// "story" or "survival".
    #[serde(default = "default_mode")]
    pub mode: String,
    /// "easy", "normal" or "hard".
    #[serde(default = "default_difficulty")]
    pub difficulty: String,
    /// Story wave bound override (default: every authored story wave).
    #[serde(default)]
    pub max_waves: Option<u32>,
    /// Random seed for deterministic run reproduction. If provided, the run
    /// uses a seeded RNG for reproducible results.
    #[serde(default)]
    pub random_seed: Option<u64>,
    /// Maximum simulated run duration before declaring a timeout.
    #[serde(default = "default_max_duration")]
    pub max_duration_secs: f32,
    /// Let the autopilot spend gold between waves.
    #[serde(default = "default_true")]
    pub auto_shop: bool,
    /// Custom output path for the run log (optional).
    #[serde(default)]
    pub output_path: Option<String>,
    /// Skip writing the run log to disk (tests).
    #[serde(default)]
    pub skip_log_file: bool,
}

fn default_mode() -> String {
    "story".to_string()
}

fn default_difficulty() -> String {
    "normal".to_string()
}

fn default_max_duration() -> f32 {
    180.0
}

fn default_true() -> bool {
    true
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            mode: default_mode(),
            difficulty: default_difficulty(),
            max_waves: None,
            random_seed: None,
            max_duration_secs: default_max_duration(),
            auto_shop: true,
            output_path: None,
            skip_log_file: false,
        }
    }
}

impl RunConfig {
    /// Load configuration from a JSON file.
    pub fn load_from_file(path: &Path) -> Result<Self, String> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read config file: {}", e))?;

        let config: RunConfig = serde_json::from_str(&contents)
            .map_err(|e| format!("Failed to parse JSON: {}", e))?;

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), String> {
        self.parse_mode()?;
        self.parse_difficulty()?;
        if self.max_duration_secs <= 0.0 {
            return Err("max_duration_secs must be positive".to_string());
        }
        if self.max_waves == Some(0) {
            return Err("max_waves must be at least 1".to_string());
        }
        Ok(())
    }

    pub fn parse_mode(&self) -> Result<GameMode, String> {
        match self.mode.as_str() {
            "story" => Ok(GameMode::Story),
            "survival" => Ok(GameMode::Survival),
            other => Err(format!("Unknown mode: '{}'. Valid modes: story, survival", other)),
        }
    }

    pub fn parse_difficulty(&self) -> Result<Difficulty, String> {
        match self.difficulty.as_str() {
            "easy" => Ok(Difficulty::Easy),
            "normal" => Ok(Difficulty::Normal),
            "hard" => Ok(Difficulty::Hard),
            other => Err(format!(
                "Unknown difficulty: '{}'. Valid difficulties: easy, normal, hard",
                other
            )),
        }
    }

    /// Convert to the run settings resource.
    pub fn to_settings(&self, content: &GameContent) -> Result<RunSettings, String> {
        let mode = self.parse_mode()?;
        let difficulty = self.parse_difficulty()?;
        let max_story_waves =
            self.max_waves.unwrap_or(content.waves.story.len() as u32).max(1);
        Ok(RunSettings { mode, max_story_waves, difficulty })
    }
}
