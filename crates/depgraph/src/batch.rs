//! Per-worker batch of side effects produced while the dependency engine's
//! locks were held, drained after they are released (spec §5: "the outer
//! loop drains this struct AFTER releasing the access-set lock, preventing
//! lock-rank violations").

use taskmesh_types::TaskHandle;

/// Side effects a worker must act on after a dependency-engine critical
/// section returns: tasks that just became ready to run, and tasks whose
/// disposal is now safe.
#[derive(Debug, Default)]
pub struct CpuDependencyData {
    pub satisfied_originators: Vec<TaskHandle>,
    pub removable_tasks: Vec<TaskHandle>,
}

impl CpuDependencyData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mark_satisfied(&mut self, task: TaskHandle) {
        self.satisfied_originators.push(task);
    }

    pub fn mark_removable(&mut self, task: TaskHandle) {
        self.removable_tasks.push(task);
    }

    pub fn is_empty(&self) -> bool {
        self.satisfied_originators.is_empty() && self.removable_tasks.is_empty()
    }

    pub fn drain_satisfied(&mut self) -> Vec<TaskHandle> {
        std::mem::take(&mut self.satisfied_originators)
    }

    pub fn drain_removable(&mut self) -> Vec<TaskHandle> {
        std::mem::take(&mut self.removable_tasks)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use taskmesh_sync::EntryList;

    #[test]
    fn drains_clear_each_list_independently() {
        let mut tasks: EntryList<()> = EntryList::new();
        let a = tasks.insert(());
        let b = tasks.insert(());

        let mut batch = CpuDependencyData::new();
        assert!(batch.is_empty());
        batch.mark_satisfied(a);
        batch.mark_removable(b);
        assert!(!batch.is_empty());

        assert_eq!(batch.drain_satisfied(), vec![a]);
        assert!(batch.satisfied_originators.is_empty());
        assert_eq!(batch.removable_tasks, vec![b]);

        assert_eq!(batch.drain_removable(), vec![b]);
        assert!(batch.is_empty());
    }
}
