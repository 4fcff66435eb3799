//! Idle-CPU bookkeeping (spec §4.3, §5: "Idle-CPU bitmap: single spinlock
//! guarding both the bitmap and the sleep condition"). Idle CPUs are
//! pooled per NUMA node so `resume_any` can prefer waking a thread close
//! to the data that just became ready, without scanning the whole set.

use std::collections::{HashMap, HashSet, VecDeque};

use parking_lot::Mutex;

use taskmesh_numa::{CpuId, Topology};
use taskmesh_scheduler::Scheduler;
use taskmesh_sync::LockSignal;
use taskmesh_types::NodeId;

struct IdleState {
    by_node: HashMap<NodeId, VecDeque<CpuId>>,
    members: HashSet<CpuId>,
}

impl IdleState {
    fn new() -> Self {
        Self { by_node: HashMap::new(), members: HashSet::new() }
    }

    fn insert(&mut self, cpu: CpuId, node: NodeId) {
        if self.members.insert(cpu) {
            self.by_node.entry(node).or_default().push_back(cpu);
        }
    }

    fn remove_specific(&mut self, cpu: CpuId, node: NodeId) -> bool {
        if !self.members.remove(&cpu) {
            return false;
        }
        if let Some(queue) = self.by_node.get_mut(&node) {
            queue.retain(|&c| c != cpu);
        }
        true
    }

    fn pop_preferring(&mut self, node: NodeId) -> Option<CpuId> {
        if let Some(queue) = self.by_node.get_mut(&node) {
            if let Some(cpu) = queue.pop_front() {
                self.members.remove(&cpu);
                return Some(cpu);
            }
        }
        for queue in self.by_node.values_mut() {
            if let Some(cpu) = queue.pop_front() {
                self.members.remove(&cpu);
                return Some(cpu);
            }
        }
        None
    }
}

/// Coordinates the idle/active transition for every CPU in the pool. Holds
/// one [`LockSignal`] per CPU so a targeted wake-up never disturbs other
/// parked threads.
pub struct IdlePool {
    state: Mutex<IdleState>,
    signals: HashMap<CpuId, LockSignal>,
    topology: Topology,
}

impl IdlePool {
    pub fn new(topology: Topology) -> Self {
        let signals = topology.cpus().iter().map(|&cpu| (cpu, LockSignal::new())).collect();
        Self { state: Mutex::new(IdleState::new()), signals, topology }
    }

    fn node_of(&self, cpu: CpuId) -> NodeId {
        self.topology.node_of_cpu(cpu).unwrap_or(0)
    }

    /// The idle-admission race guard (spec §4.3, §8 "Idle race"): re-checks
    /// `scheduler.has_available_work` while holding the idle-set lock.
    /// Returns `false` (stay running, loop again) if work was found;
    /// otherwise marks `cpu` idle and returns `true`.
    pub fn cpu_becomes_idle(&self, cpu: CpuId, scheduler: &Scheduler) -> bool {
        let mut state = self.state.lock();
        if scheduler.has_available_work(cpu) {
            return false;
        }
        self.signals[&cpu].try_lock();
        state.insert(cpu, self.node_of(cpu));
        true
    }

    /// Blocks the calling (worker) thread until woken by `resume_idle` or
    /// `resume_any`. Must only be called after `cpu_becomes_idle` returned
    /// `true` for this `cpu`.
    pub fn park(&self, cpu: CpuId) {
        self.signals[&cpu].wait();
    }

    /// Wakes a specific CPU, e.g. because its own immediate-successor slot
    /// was just filled.
    pub fn resume_idle(&self, cpu: CpuId) -> bool {
        let mut state = self.state.lock();
        if !state.remove_specific(cpu, self.node_of(cpu)) {
            return false;
        }
        self.signals[&cpu].signal_one();
        true
    }

    /// Wakes any idle CPU, preferring one on `node` if available, used
    /// when a newly ready task has no CPU-specific hint but does have a
    /// NUMA locality preference.
    pub fn resume_any(&self, node: NodeId) -> Option<CpuId> {
        let mut state = self.state.lock();
        let cpu = state.pop_preferring(node)?;
        self.signals[&cpu].signal_one();
        Some(cpu)
    }

    pub fn idle_count(&self) -> usize {
        self.state.lock().members.len()
    }

    /// Wakes every idle CPU; used on shutdown so parked workers observe
    /// the shutting-down flag instead of sleeping forever.
    pub fn resume_all(&self) {
        for signal in self.signals.values() {
            signal.signal_all();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use taskmesh_scheduler::SchedulingPolicy;

    #[test]
    fn idle_then_resume_round_trips() {
        let topo = Topology::single_node(4, 4096);
        let pool = IdlePool::new(topo);
        let scheduler = Scheduler::new(SchedulingPolicy::Fifo);

        assert!(pool.cpu_becomes_idle(0, &scheduler));
        assert_eq!(pool.idle_count(), 1);
        assert!(pool.resume_idle(0));
        assert_eq!(pool.idle_count(), 0);
    }

    #[test]
    fn idle_admission_declines_when_work_already_present() {
        let topo = Topology::single_node(2, 4096);
        let pool = IdlePool::new(topo);
        let scheduler = Scheduler::new(SchedulingPolicy::Fifo);

        let mut list: taskmesh_sync::EntryList<()> = taskmesh_sync::EntryList::new();
        let handle = list.insert(());
        scheduler.add_ready_task(
            taskmesh_scheduler::DeviceKind::Host,
            handle,
            0,
            None,
            taskmesh_scheduler::HintKind::None,
        );

        assert!(!pool.cpu_becomes_idle(0, &scheduler));
        assert_eq!(pool.idle_count(), 0);
    }

    #[test]
    fn resume_any_prefers_same_node() {
        let mut cpu_node = HashMap::new();
        cpu_node.insert(0, 0);
        cpu_node.insert(1, 1);
        let topo = Topology::new(vec![0, 1], cpu_node, 4096);
        let pool = IdlePool::new(topo);
        let scheduler = Scheduler::new(SchedulingPolicy::Fifo);

        pool.cpu_becomes_idle(0, &scheduler);
        pool.cpu_becomes_idle(1, &scheduler);

        let woken = pool.resume_any(1).unwrap();
        assert_eq!(woken, 1);
    }
}
