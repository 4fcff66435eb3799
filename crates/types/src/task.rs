//! The task itself: identity, flags, counters and the access set every
//! other component mutates.

use std::sync::atomic::{AtomicBool, AtomicI64, AtomicUsize, Ordering};
use std::sync::Mutex;

use taskmesh_sync::Entry;

/// Handle returned by `create_task`; an index into the task lifecycle
/// manager's task arena (see `taskmesh_core`).
pub type TaskHandle = Entry;

/// Handle into the dependency engine's access arena.
pub type AccessHandle = Entry;

/// Handle into the execution-workflow step arena.
pub type WorkflowHandle = Entry;

bitflags::bitflags! {
    /// Boolean state a task carries through its lifecycle (spec §3).
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct TaskFlags: u16 {
        const SPAWNED          = 0b0000_0001;
        const REMOTE           = 0b0000_0010;
        const IF0              = 0b0000_0100;
        const MAIN             = 0b0000_1000;
        const FINISHED         = 0b0001_0000;
        const CHILDREN_FINISHED= 0b0010_0000;
        const RELEASED         = 0b0100_0000;
    }
}

/// The work a task performs. Bound closures carry their own captured
/// arguments, realized here as whatever the closure captured rather than
/// a raw byte buffer, Rust gives us a typed alternative to that pattern.
pub type TaskBody = Box<dyn FnOnce() + Send>;

/// A dynamically created unit of work with a data-flow dependent access
/// set. Identity, body and parent are fixed at creation; everything else
/// is mutated concurrently by the dependency engine, scheduler and worker
/// as the task moves through its lifecycle.
pub struct Task {
    pub id: u64,
    pub label: &'static str,
    pub parent: Option<TaskHandle>,
    body: Mutex<Option<TaskBody>>,
    flags: Mutex<TaskFlags>,
    pub remaining_predecessors: AtomicUsize,
    release_count: AtomicUsize,
    released: AtomicBool,
    pub pending_children: AtomicUsize,
    accesses: Mutex<Vec<AccessHandle>>,
    workflow: Mutex<Option<WorkflowHandle>>,
    pub priority: i32,
    /// CPU the immediate-successor optimization should target, if any
    /// (spec §4.2). `-1` means "no hint".
    immediate_successor_cpu: AtomicI64,
}

impl std::fmt::Debug for Task {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Task")
            .field("id", &self.id)
            .field("label", &self.label)
            .field("flags", &self.flags())
            .field("remaining_predecessors", &self.remaining_predecessors.load(Ordering::Relaxed))
            .field("release_count", &self.release_count.load(Ordering::Relaxed))
            .finish()
    }
}

impl Task {
    pub fn new(
        id: u64,
        label: &'static str,
        body: TaskBody,
        parent: Option<TaskHandle>,
        priority: i32,
        initial_flags: TaskFlags,
        initial_events: usize,
    ) -> Self {
        Self {
            id,
            label,
            parent,
            body: Mutex::new(Some(body)),
            flags: Mutex::new(initial_flags),
            remaining_predecessors: AtomicUsize::new(0),
            // 1 (self) + N initial events, per spec §4.5.
            release_count: AtomicUsize::new(1 + initial_events),
            released: AtomicBool::new(false),
            pending_children: AtomicUsize::new(0),
            accesses: Mutex::new(Vec::new()),
            workflow: Mutex::new(None),
            priority,
            immediate_successor_cpu: AtomicI64::new(-1),
        }
    }

    pub fn flags(&self) -> TaskFlags {
        *self.flags.lock().unwrap()
    }

    pub fn set_flag(&self, flag: TaskFlags) {
        self.flags.lock().unwrap().insert(flag);
    }

    pub fn has_flag(&self, flag: TaskFlags) -> bool {
        self.flags().contains(flag)
    }

    /// Takes the task body for execution. Returns `None` if already taken,
    /// a task body runs exactly once (spec §8 "no duplicate execution").
    pub fn take_body(&self) -> Option<TaskBody> {
        self.body.lock().unwrap().take()
    }

    pub fn push_access(&self, access: AccessHandle) {
        self.accesses.lock().unwrap().push(access);
    }

    pub fn accesses(&self) -> Vec<AccessHandle> {
        self.accesses.lock().unwrap().clone()
    }

    pub fn workflow(&self) -> Option<WorkflowHandle> {
        *self.workflow.lock().unwrap()
    }

    pub fn set_workflow(&self, handle: WorkflowHandle) {
        *self.workflow.lock().unwrap() = Some(handle);
    }

    pub fn immediate_successor_cpu(&self) -> Option<usize> {
        match self.immediate_successor_cpu.load(Ordering::Acquire) {
            -1 => None,
            cpu => Some(cpu as usize),
        }
    }

    pub fn set_immediate_successor_cpu(&self, cpu: usize) {
        self.immediate_successor_cpu.store(cpu as i64, Ordering::Release);
    }

    /// Increments the release counter by `n` events (spec §6's
    /// `increment(opaque, n)`).
    pub fn increment_release_counter(&self, n: usize) {
        self.release_count.fetch_add(n, Ordering::AcqRel);
    }

    /// Decrements the release counter by `n`. Returns `true` exactly once,
    /// the call that brings it to zero, the trigger for access
    /// unregistration (spec §4.5).
    pub fn decrement_release_counter(&self, n: usize) -> bool {
        let prev = self.release_count.fetch_sub(n, Ordering::AcqRel);
        debug_assert!(prev >= n, "release counter must never go negative");
        prev == n
    }

    pub fn release_count(&self) -> usize {
        self.release_count.load(Ordering::Acquire)
    }

    /// CAS from not-released to released. Returns `true` exactly once: the
    /// caller that wins this race is the one allowed to dispose the task
    /// (spec §3, "disposed only after released == true AND finalization
    /// returned true").
    pub fn mark_as_released(&self) -> bool {
        self.released
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    pub fn is_released(&self) -> bool {
        self.released.load(Ordering::Acquire)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_task(initial_events: usize) -> Task {
        Task::new(1, "test", Box::new(|| {}), None, 0, TaskFlags::empty(), initial_events)
    }

    #[test]
    fn release_counter_starts_at_one_plus_events() {
        let task = new_task(2);
        assert_eq!(task.release_count(), 3);
    }

    #[test]
    fn decrement_reports_zero_crossing_exactly_once() {
        let task = new_task(1);
        assert_eq!(task.release_count(), 2);
        assert!(!task.decrement_release_counter(1));
        assert!(task.decrement_release_counter(1));
    }

    #[test]
    fn mark_as_released_is_a_one_shot_cas() {
        let task = new_task(0);
        assert!(task.mark_as_released());
        assert!(!task.mark_as_released());
    }

    #[test]
    fn body_runs_exactly_once() {
        let task = new_task(0);
        assert!(task.take_body().is_some());
        assert!(task.take_body().is_none());
    }
}
