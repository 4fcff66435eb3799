//! The synchronized outer façade (spec §4.2). A single lock protects both
//! the per-device unsynchronized queues and the per-CPU immediate-successor
//! slots; it is held only long enough to push/pop, never across a call
//! into the dependency engine or a worker's task body (spec §5).

use std::collections::HashMap;

use parking_lot::Mutex;

use taskmesh_types::TaskHandle;

use crate::device::DeviceKind;
use crate::hint::HintKind;
use crate::host_queue::{HostQueue, SchedulingPolicy};

/// CPU identifier as used by the worker pool (spec §4.3).
pub type CpuId = usize;

struct Inner {
    queues: HashMap<DeviceKind, HostQueue>,
    /// Per-CPU immediate-successor slot (spec §4.2's "immediate-successor
    /// optimization"): the most recent task still waiting to be handed
    /// straight back to the CPU that completed its predecessor.
    immediate_slots: HashMap<CpuId, TaskHandle>,
}

/// The two-level scheduler's synchronized half. Owns one unsynchronized
/// [`HostQueue`] per [`DeviceKind`] plus the immediate-successor slots.
pub struct Scheduler {
    policy: SchedulingPolicy,
    inner: Mutex<Inner>,
}

impl Scheduler {
    pub fn new(policy: SchedulingPolicy) -> Self {
        let mut queues = HashMap::new();
        queues.insert(DeviceKind::Host, HostQueue::new(policy));
        queues.insert(DeviceKind::Cluster, HostQueue::new(policy));
        Self { policy, inner: Mutex::new(Inner { queues, immediate_slots: HashMap::new() }) }
    }

    pub fn policy(&self) -> SchedulingPolicy {
        self.policy
    }

    /// Posts one ready task. `cpu_hint` combined with
    /// `HintKind::ImmediateSuccessor` attempts to place it directly into
    /// that CPU's slot, bypassing the shared queue entirely; any other
    /// hint (or an already-occupied slot) falls back to the device queue.
    pub fn add_ready_task(
        &self,
        device: DeviceKind,
        task: TaskHandle,
        priority: i32,
        cpu_hint: Option<CpuId>,
        hint: HintKind,
    ) {
        let mut inner = self.inner.lock();

        if hint == HintKind::ImmediateSuccessor {
            if let Some(cpu) = cpu_hint {
                if !inner.immediate_slots.contains_key(&cpu) {
                    inner.immediate_slots.insert(cpu, task);
                    return;
                }
            }
        }

        inner.queues.get_mut(&device).expect("device queue always present").push(task, priority);
    }

    /// Posts many ready tasks at once, e.g. the finalization batch drained
    /// from `CpuDependencyData` (spec §4.5). Each task is pushed under the
    /// same lock acquisition, matching spec §5's "tasks MUST be copied
    /// into the inner queue under this lock" while amortizing the lock
    /// over the whole batch.
    pub fn add_ready_tasks(
        &self,
        device: DeviceKind,
        tasks: &[(TaskHandle, i32)],
        cpu_hint: Option<CpuId>,
        hint: HintKind,
    ) {
        if tasks.is_empty() {
            return;
        }
        let mut inner = self.inner.lock();

        let mut rest_start = 0;
        if hint == HintKind::ImmediateSuccessor {
            if let Some(cpu) = cpu_hint {
                if !inner.immediate_slots.contains_key(&cpu) {
                    inner.immediate_slots.insert(cpu, tasks[0].0);
                    rest_start = 1;
                }
            }
        }

        let queue = inner.queues.get_mut(&device).expect("device queue always present");
        for &(task, priority) in &tasks[rest_start..] {
            queue.push(task, priority);
        }
    }

    /// Pops the next ready task for `cpu`: the immediate-successor slot
    /// first, then the shared host queue.
    pub fn get_ready_task(&self, cpu: CpuId) -> Option<TaskHandle> {
        let mut inner = self.inner.lock();
        if let Some(task) = inner.immediate_slots.remove(&cpu) {
            return Some(task);
        }
        inner.queues.get_mut(&DeviceKind::Host).and_then(|q| q.pop())
    }

    pub fn get_ready_cluster_task(&self) -> Option<TaskHandle> {
        let mut inner = self.inner.lock();
        inner.queues.get_mut(&DeviceKind::Cluster).and_then(|q| q.pop())
    }

    /// True iff a subsequent `get_ready_task(cpu)` would return `Some`
    /// under the current state (spec §4.2, §8 idle-race property). Must be
    /// called under the same lock a caller will use to transition idle, so
    /// this takes the lock itself and the worker pool serializes idle
    /// transitions against it (see `taskmesh_worker`).
    pub fn has_available_work(&self, cpu: CpuId) -> bool {
        let inner = self.inner.lock();
        if inner.immediate_slots.contains_key(&cpu) {
            return true;
        }
        inner.queues.get(&DeviceKind::Host).map(|q| !q.is_empty()).unwrap_or(false)
    }

    pub fn total_ready(&self) -> usize {
        let inner = self.inner.lock();
        inner.queues.values().map(HostQueue::len).sum::<usize>() + inner.immediate_slots.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use taskmesh_sync::EntryList;

    fn handles(n: usize) -> Vec<TaskHandle> {
        let mut list: EntryList<()> = EntryList::new();
        (0..n).map(|_| list.insert(())).collect()
    }

    #[test]
    fn immediate_successor_goes_to_targeted_cpu_slot() {
        let sched = Scheduler::new(SchedulingPolicy::Fifo);
        let h = handles(1);
        sched.add_ready_task(DeviceKind::Host, h[0], 0, Some(3), HintKind::ImmediateSuccessor);
        assert!(sched.has_available_work(3));
        assert!(!sched.has_available_work(4));
        assert_eq!(sched.get_ready_task(3), Some(h[0]));
        assert_eq!(sched.get_ready_task(3), None);
    }

    #[test]
    fn occupied_slot_falls_back_to_shared_queue() {
        let sched = Scheduler::new(SchedulingPolicy::Fifo);
        let h = handles(2);
        sched.add_ready_task(DeviceKind::Host, h[0], 0, Some(1), HintKind::ImmediateSuccessor);
        sched.add_ready_task(DeviceKind::Host, h[1], 0, Some(1), HintKind::ImmediateSuccessor);
        assert_eq!(sched.get_ready_task(1), Some(h[0]));
        // second task landed in the shared queue, any CPU can take it
        assert_eq!(sched.get_ready_task(9), Some(h[1]));
    }

    #[test]
    fn fifo_under_equal_priority_is_order_preserving() {
        let sched = Scheduler::new(SchedulingPolicy::Priority);
        let h = handles(2);
        sched.add_ready_task(DeviceKind::Host, h[0], 5, None, HintKind::None);
        sched.add_ready_task(DeviceKind::Host, h[1], 5, None, HintKind::None);
        assert_eq!(sched.get_ready_task(0), Some(h[0]));
        assert_eq!(sched.get_ready_task(0), Some(h[1]));
    }

    #[test]
    fn has_available_work_is_accurate() {
        let sched = Scheduler::new(SchedulingPolicy::Fifo);
        assert!(!sched.has_available_work(0));
        let h = handles(1);
        sched.add_ready_task(DeviceKind::Host, h[0], 0, None, HintKind::None);
        assert!(sched.has_available_work(0));
    }
}
