//! Headless run execution
//!
//! Complete simulated runs with no rendering: a JSON run config, an
//! autopilot that fills the input snapshot, and a fixed-timestep driver
//! that produces a deterministic [`runner::RunSummary`] under a seed.

pub mod autopilot;
pub mod config;
pub mod runner;

pub use config::RunConfig;
pub use runner::{run_headless, RunSummary};
