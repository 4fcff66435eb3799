//! Owns every [`Step`] currently live across all tasks and drives the
//! "complete a step, release its successors" protocol shared by every
//! workflow shape (spec §4.4).

use taskmesh_sync::EntryList;
use std::sync::Mutex;

use crate::step::{Step, StepHandle};

/// The minimal DAG shape every task gets, named for readability at the
/// call site; `taskmesh_core` builds the actual chain with these labels.
pub mod labels {
    pub const START: &str = "start";
    pub const DATA_LINK: &str = "data_link";
    pub const DATA_FETCH: &str = "data_fetch";
    pub const EXECUTE: &str = "execute";
    pub const RELEASE: &str = "release";
    pub const OFFLOAD: &str = "offload";
    pub const REMOTE_COMPLETION: &str = "remote_completion";
}

#[derive(Default)]
pub struct WorkflowArena {
    steps: Mutex<EntryList<Step>>,
}

impl WorkflowArena {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, step: Step) -> StepHandle {
        self.steps.lock().unwrap().insert(step)
    }

    pub fn with<R>(&self, handle: StepHandle, f: impl FnOnce(&Step) -> R) -> Option<R> {
        self.steps.lock().unwrap().get(&handle).map(f)
    }

    fn remove(&self, handle: StepHandle) {
        self.steps.lock().unwrap().take(&handle);
    }

    /// Links `successor` behind `predecessor`: when `predecessor`
    /// completes, `successor`'s predecessor count is decremented.
    pub fn link(&self, predecessor: StepHandle, successor: StepHandle) {
        self.with(predecessor, |p| p.add_successor(successor));
    }

    /// Marks `handle`'s own work as done and releases its successors.
    /// Returns the successors that just reached zero remaining
    /// predecessors, the caller starts each of those (scheduling them,
    /// issuing a transfer, whatever the step kind demands). `handle`
    /// itself transitions `live → releasing → done` and is freed.
    ///
    /// A no-op (empty result) if `handle` already had its work marked
    /// done, a step completes exactly once.
    pub fn complete(&self, handle: StepHandle) -> Vec<StepHandle> {
        let Some(newly_first_done) = self.with(handle, |s| s.mark_work_done()) else {
            return Vec::new();
        };
        if !newly_first_done {
            return Vec::new();
        }

        self.with(handle, |s| s.begin_releasing());

        let successors = self.with(handle, |s| s.successors()).unwrap_or_default();
        let mut ready = Vec::new();
        for succ in successors {
            let became_ready = self.with(succ, |s| s.predecessor_released()).unwrap_or(false);
            if became_ready {
                ready.push(succ);
            }
        }

        self.with(handle, |s| s.finish());
        self.remove(handle);
        ready
    }

    pub fn active_count(&self) -> usize {
        self.steps.lock().unwrap().active_slots()
    }
}
