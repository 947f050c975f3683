//! Structured run log
//!
//! An ordered, timestamped record of everything observable that happened
//! during a run. Presentation layers read it live; the headless runner
//! serializes it to JSON next to the run summary so simulated runs can be
//! inspected after the fact.

use bevy::prelude::*;
use serde::{Deserialize, Serialize};

/// Category of a log entry, for filtering and assertions.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunLogEventType {
    Damage,
    Death,
    Attack,
    Wave,
    Economy,
    RunEvent,
}

/// One log line.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RunLogEntry {
    /// Simulation time in seconds since run start.
    pub time: f32,
    pub kind: RunLogEventType,
    pub message: String,
}

/// Metadata written alongside the entries when the log is saved.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RunMetadata {
    pub mode: String,
    pub outcome: Option<String>,
    pub waves_cleared: u32,
    pub score: i32,
    pub gold: i32,
    pub survival_time: f32,
    pub random_seed: Option<u64>,
}

#[derive(Serialize)]
struct RunLogDocument<'a> {
    metadata: &'a RunMetadata,
    entries: &'a [RunLogEntry],
}

/// The run log resource.
#[derive(Resource, Default)]
pub struct RunLog {
    entries: Vec<RunLogEntry>,
    /// Simulation time, advanced once per tick.
    pub run_time: f32,
}

impl RunLog {
    pub fn log(&mut self, kind: RunLogEventType, message: String) {
        self.entries.push(RunLogEntry { time: self.run_time, kind, message });
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.run_time = 0.0;
    }

    pub fn entries(&self) -> &[RunLogEntry] {
        &self.entries
    }

    pub fn entries_of(&self, kind: RunLogEventType) -> impl Iterator<Item = &RunLogEntry> {
        self.entries.iter().filter(move |e| e.kind == kind)
    }

    /// Serialize the log and metadata to a JSON file. Returns the path the
    /// log was written to.
    pub fn save_to_file(
        &self,
        metadata: &RunMetadata,
        output_path: Option<&str>,
    ) -> Result<String, String> {
        let filename = output_path
            .map(str::to_string)
            .unwrap_or_else(|| "run_log.json".to_string());

        let document = RunLogDocument { metadata, entries: &self.entries };
        let json = serde_json::to_string_pretty(&document)
            .map_err(|e| format!("Failed to serialize run log: {}", e))?;
        std::fs::write(&filename, json)
            .map_err(|e| format!("Failed to write {}: {}", filename, e))?;
        Ok(filename)
    }
}

/// Advance the log clock. Runs first in the cleanup phase so every entry
/// recorded this tick shares one timestamp.
pub fn advance_log_clock(time: Res<Time>, mut log: ResMut<RunLog>) {
    log.run_time += time.delta_secs();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entries_keep_insertion_order() {
        let mut log = RunLog::default();
        log.log(RunLogEventType::Wave, "wave 1".into());
        log.run_time = 2.5;
        log.log(RunLogEventType::Death, "shambler down".into());

        let entries = log.entries();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].time, 0.0);
        assert_eq!(entries[1].time, 2.5);
        assert_eq!(entries[1].kind, RunLogEventType::Death);
    }

    #[test]
    fn filter_by_kind() {
        let mut log = RunLog::default();
        log.log(RunLogEventType::Economy, "gold +5".into());
        log.log(RunLogEventType::Death, "down".into());
        log.log(RunLogEventType::Economy, "gold +8".into());

        assert_eq!(log.entries_of(RunLogEventType::Economy).count(), 2);
    }
}
