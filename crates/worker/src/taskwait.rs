//! `block_current_task` / `unblock_task` (spec §4.3, §6). Blocking a task
//! releases the worker thread to run other ready work instead of parking
//! the whole CPU; the blocked task's own progress waits on a dedicated
//! [`LockSignal`] that `unblock_task` fires.

use std::collections::HashMap;

use parking_lot::Mutex;

use taskmesh_sync::LockSignal;
use taskmesh_types::TaskHandle;

/// Registry of currently-blocked tasks. `taskmesh_core`'s task lifecycle
/// owns one instance; a task body calls `block_current_task` synchronously
/// from inside its own execution (it is the task's own OS thread that
/// waits, see spec §5 "cooperative within a worker... at explicit block
/// points").
#[derive(Default)]
pub struct TaskWaitRegistry {
    waiters: Mutex<HashMap<TaskHandle, std::sync::Arc<LockSignal>>>,
}

impl TaskWaitRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Blocks the calling thread until `unblock_task(task)` is called.
    /// Registers the wait signal first so a concurrent unblock can never
    /// race ahead of the block call and be lost.
    pub fn block_current_task(&self, task: TaskHandle) {
        let signal = {
            let mut waiters = self.waiters.lock();
            waiters.entry(task).or_insert_with(|| std::sync::Arc::new(LockSignal::new())).clone()
        };
        signal.try_lock();
        signal.wait();
        self.waiters.lock().remove(&task);
    }

    /// Wakes a blocked task. A no-op (not an error) if the task was not
    /// blocked, spec §6 allows `unblock_task` to race ahead of the
    /// matching `block_current_task`; the pre-registered signal below
    /// absorbs that race for the common case, but a caller that unblocks
    /// before the task ever blocks needs the task's own book-keeping
    /// layer to have pre-registered a signal (handled by
    /// `register_blockable` below).
    pub fn unblock_task(&self, task: TaskHandle) {
        if let Some(signal) = self.waiters.lock().get(&task).cloned() {
            signal.signal_all();
        }
    }

    /// Pre-registers a wait signal for `task` before it actually blocks,
    /// so an `unblock_task` that arrives early is not lost.
    pub fn register_blockable(&self, task: TaskHandle) {
        self.waiters.lock().entry(task).or_insert_with(|| std::sync::Arc::new(LockSignal::new()));
    }
}
