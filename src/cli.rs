//! Command-line interface
//!
//! Headless-only: the binary simulates complete runs and prints a summary.

use clap::Parser;
use std::path::PathBuf;

/// Wave-based action roguelite simulator
#[derive(Parser, Debug)]
#[command(name = "gritwave")]
#[command(about = "Wave-based action roguelite simulator")]
#[command(version)]
pub struct Args {
    /// JSON run configuration file (takes precedence over the flags below)
    #[arg(long, value_name = "CONFIG_FILE")]
    pub config: Option<PathBuf>,

    /// Game mode: story or survival
    #[arg(long, default_value = "story")]
    pub mode: String,

    /// Difficulty preset: easy, normal or hard
    #[arg(long, default_value = "normal")]
    pub difficulty: String,

    /// Story wave bound override
    #[arg(long)]
    pub max_waves: Option<u32>,

    /// Random seed for a reproducible run
    #[arg(long)]
    pub seed: Option<u64>,

    /// Maximum simulated run duration in seconds
    #[arg(long, default_value = "180")]
    pub max_duration: f32,

    /// Output path for the run log
    #[arg(long, value_name = "OUTPUT_PATH")]
    pub output: Option<PathBuf>,
}

pub fn parse_args() -> Args {
    Args::parse()
}
