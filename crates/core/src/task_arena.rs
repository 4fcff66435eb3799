//! Owns every [`Task`] currently live in the runtime, indexed by
//! [`TaskHandle`] (spec §9: arena-of-handles). Mirrors
//! `taskmesh_depgraph::AccessArena`'s shape, lock briefly, never across a
//! call into the scheduler or dependency engine.

use std::sync::Mutex;

use taskmesh_sync::EntryList;
use taskmesh_types::{Task, TaskHandle};

#[derive(Default)]
pub struct TaskArena {
    items: Mutex<EntryList<Task>>,
}

impl TaskArena {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, task: Task) -> TaskHandle {
        self.items.lock().unwrap().insert(task)
    }

    pub fn with<R>(&self, handle: TaskHandle, f: impl FnOnce(&Task) -> R) -> Option<R> {
        self.items.lock().unwrap().get(&handle).map(f)
    }

    pub fn remove(&self, handle: TaskHandle) -> Option<Task> {
        self.items.lock().unwrap().take(&handle)
    }

    pub fn active_count(&self) -> usize {
        self.items.lock().unwrap().active_slots()
    }
}
