//! Optional per-tasktype execution-time statistics (spec §6 "Persisted
//! state"). Loaded at `Runtime::new`, written at `Runtime::shutdown`;
//! purely advisory, never required for correctness, consulted only by
//! the scheduler's locality/priority hinting.

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

pub type TaskTypeLabel = String;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WisdomEntry {
    /// Normalized mean execution cost in nanoseconds, across every
    /// observed run of this task type.
    pub mean_cost_ns: f64,
    /// Per-counter rolling averages (e.g. bytes touched, children
    /// spawned) keyed by counter name.
    pub counters: HashMap<String, f64>,
    pub sample_count: u64,
}

impl WisdomEntry {
    /// Folds one new observation into the running mean (spec §6:
    /// "normalized mean cost and per-counter rolling averages").
    pub fn record(&mut self, cost_ns: f64) {
        let n = self.sample_count as f64;
        self.mean_cost_ns = (self.mean_cost_ns * n + cost_ns) / (n + 1.0);
        self.sample_count += 1;
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WisdomTable {
    entries: HashMap<TaskTypeLabel, WisdomEntry>,
}

impl WisdomTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads the table from `path`, if it exists. A missing file is not an
    /// error, the very first run of a fresh install has no wisdom yet.
    pub fn load(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(content) => serde_json::from_str(&content).unwrap_or_else(|err| {
                tracing::warn!(target: "taskmesh_core", %err, "wisdom file unreadable, starting empty");
                Self::default()
            }),
            Err(_) => Self::default(),
        }
    }

    pub fn save(&self, path: &Path) -> std::io::Result<()> {
        let content = serde_json::to_string_pretty(self).expect("WisdomTable always serializes");
        std::fs::write(path, content)
    }

    pub fn entry(&self, label: &str) -> Option<&WisdomEntry> {
        self.entries.get(label)
    }

    pub fn record(&mut self, label: &str, cost_ns: f64) {
        self.entries.entry(label.to_string()).or_default().record(cost_ns);
    }
}
