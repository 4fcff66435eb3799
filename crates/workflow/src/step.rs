//! A single node in a task's execution-step DAG (spec §4.4). Every step
//! holds a successor list; completing it decrements each successor's
//! predecessor count, and a successor starts the instant that count hits
//! zero. Lifetime is the explicit `{live, releasing, done}` state the
//! design notes require (spec §9) instead of a self-delete callback
//! capturing a raw `this`.

use std::sync::atomic::{AtomicU8, AtomicUsize, Ordering};
use std::sync::Mutex;

use taskmesh_sync::Entry;

/// Handle into a [`crate::workflow::WorkflowArena`].
pub type StepHandle = Entry;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum StepState {
    Live = 0,
    Releasing = 1,
    Done = 2,
}

impl StepState {
    fn from_u8(v: u8) -> Self {
        match v {
            0 => StepState::Live,
            1 => StepState::Releasing,
            2 => StepState::Done,
            _ => unreachable!("invalid StepState encoding"),
        }
    }
}

/// One node of a task's pre-execution DAG: `start`, `data-link`,
/// `data-fetch`, `execute`, `release`, or one of the cluster variants
/// defined in `taskmesh_cluster` (`ClusterDataLinkStep` and friends),
/// which build on this same arena and handle type.
#[derive(Debug)]
pub struct Step {
    pub label: &'static str,
    predecessors_remaining: AtomicUsize,
    successors: Mutex<Vec<StepHandle>>,
    state: AtomicU8,
    work_done: std::sync::atomic::AtomicBool,
}

impl Step {
    pub fn new(label: &'static str, predecessor_count: usize) -> Self {
        Self {
            label,
            predecessors_remaining: AtomicUsize::new(predecessor_count),
            successors: Mutex::new(Vec::new()),
            state: AtomicU8::new(StepState::Live as u8),
            work_done: std::sync::atomic::AtomicBool::new(false),
        }
    }

    pub fn state(&self) -> StepState {
        StepState::from_u8(self.state.load(Ordering::Acquire))
    }

    pub fn add_successor(&self, successor: StepHandle) {
        self.successors.lock().unwrap().push(successor);
    }

    pub fn successors(&self) -> Vec<StepHandle> {
        self.successors.lock().unwrap().clone()
    }

    /// Called once per predecessor completion. Returns `true` exactly when
    /// this call brings the remaining count to zero, the signal that
    /// this step itself should now start.
    pub fn predecessor_released(&self) -> bool {
        let prev = self.predecessors_remaining.fetch_sub(1, Ordering::AcqRel);
        debug_assert!(prev > 0, "a step cannot be released by more predecessors than it declared");
        prev == 1
    }

    pub fn predecessors_remaining(&self) -> usize {
        self.predecessors_remaining.load(Ordering::Acquire)
    }

    /// Marks this step's own work complete. Idempotent: returns `true`
    /// only the first time (mirrors the `DataAccess` satisfiability
    /// flags' sticky-set pattern in `taskmesh_types`).
    pub fn mark_work_done(&self) -> bool {
        !self.work_done.swap(true, Ordering::AcqRel)
    }

    pub fn is_work_done(&self) -> bool {
        self.work_done.load(Ordering::Acquire)
    }

    /// `live → releasing`: this step has finished its own work and is
    /// about to notify its successors.
    pub fn begin_releasing(&self) {
        debug_assert_eq!(self.state(), StepState::Live);
        self.state.store(StepState::Releasing as u8, Ordering::Release);
    }

    /// `releasing → done`: every successor has been notified. The arena
    /// frees the slot right after this transition.
    pub fn finish(&self) {
        debug_assert_eq!(self.state(), StepState::Releasing);
        self.state.store(StepState::Done as u8, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn predecessor_released_fires_exactly_once_at_zero() {
        let step = Step::new("test", 2);
        assert!(!step.predecessor_released());
        assert!(step.predecessor_released());
    }

    #[test]
    fn mark_work_done_is_a_one_shot() {
        let step = Step::new("test", 0);
        assert!(step.mark_work_done());
        assert!(!step.mark_work_done());
    }

    #[test]
    fn lifecycle_moves_live_releasing_done() {
        let step = Step::new("test", 0);
        assert_eq!(step.state(), StepState::Live);
        step.begin_releasing();
        assert_eq!(step.state(), StepState::Releasing);
        step.finish();
        assert_eq!(step.state(), StepState::Done);
    }
}
