//! The public facade (spec §4.5, §6): wires the dependency engine,
//! scheduler, worker pool, workflow arena and throttle together behind a
//! single `Runtime`, and implements `taskmesh_worker::TaskRunner` so the
//! worker pool has something to call back into.

use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;

use taskmesh_depgraph::DependencyEngine;
use taskmesh_numa::{CpuId, Topology};
use taskmesh_scheduler::Scheduler;
use taskmesh_throttle::Throttle;
use taskmesh_types::{TaskFlags, TaskHandle};
use taskmesh_worker::{NoopBinder, TaskRunner, TaskWaitRegistry, WorkerPool};
use taskmesh_workflow::WorkflowArena;

use crate::config::RuntimeConfig;
use crate::lifecycle::{DataAccessRequest, TaskLifecycle};
use crate::wisdom::WisdomTable;

/// NUMA block size assumed for the single-node topology this facade
/// builds; real multi-node topology discovery is out of scope (spec §1).
const DEFAULT_PAGE_SIZE: usize = 4096;

pub struct Runtime {
    config: RuntimeConfig,
    lifecycle: Arc<TaskLifecycle>,
    worker_pool: Arc<WorkerPool>,
    wisdom: Mutex<WisdomTable>,
    handles: Mutex<Vec<JoinHandle<()>>>,
}

impl Runtime {
    pub fn new(config: RuntimeConfig) -> Arc<Self> {
        let topology = Topology::single_node(config.worker_threads.max(1), DEFAULT_PAGE_SIZE);
        let scheduler = Arc::new(Scheduler::new(config.scheduling_policy.into()));
        let workflow = Arc::new(WorkflowArena::new());
        let deps = Arc::new(DependencyEngine::new());
        let throttle = Arc::new(Throttle::new(config.throttle_threshold));
        let wait_registry = Arc::new(TaskWaitRegistry::new());

        let lifecycle =
            Arc::new(TaskLifecycle::new(deps, Arc::clone(&scheduler), workflow, throttle, wait_registry));
        let worker_pool = WorkerPool::new(topology, scheduler, Arc::new(NoopBinder));

        let wisdom = config.wisdom_path.as_deref().map(WisdomTable::load).unwrap_or_default();

        Arc::new(Self { config, lifecycle, worker_pool, wisdom: Mutex::new(wisdom), handles: Mutex::new(Vec::new()) })
    }

    /// Spawns the worker pool's threads. `Runtime` itself is the
    /// `TaskRunner` they call back into.
    pub fn start(self: &Arc<Self>) {
        let runner: Arc<dyn TaskRunner> = Arc::clone(self);
        let handles = self.worker_pool.start(runner);
        *self.handles.lock().unwrap() = handles;
    }

    /// Cooperative shutdown (spec §5): signals workers to drain to empty
    /// and exit, joins their threads, then persists the wisdom table.
    pub fn shutdown(&self) {
        self.worker_pool.shutdown();
        for handle in self.handles.lock().unwrap().drain(..) {
            let _ = handle.join();
        }

        if let Some(path) = self.wisdom_path() {
            if let Err(err) = self.wisdom.lock().unwrap().save(&path) {
                tracing::warn!(target: "taskmesh_core", %err, "failed to persist wisdom table");
            }
        }
    }

    fn wisdom_path(&self) -> Option<PathBuf> {
        self.config.wisdom_path.clone()
    }

    pub fn create_task(
        &self,
        label: &'static str,
        body: taskmesh_types::TaskBody,
        parent: Option<TaskHandle>,
        priority: i32,
        flags: TaskFlags,
    ) -> TaskHandle {
        self.lifecycle.create_task(label, body, parent, priority, flags)
    }

    pub fn register_data_access(&self, task: TaskHandle, req: DataAccessRequest) {
        self.lifecycle.register_data_access(task, req);
    }

    pub fn submit_task(&self, task: TaskHandle) {
        self.lifecycle.submit_task(task);
    }

    pub fn spawn_function<F, A, C, CA>(
        &self,
        label: &'static str,
        f: F,
        args: A,
        completion_cb: C,
        completion_args: CA,
        priority: i32,
    ) -> TaskHandle
    where
        F: FnOnce(A) + Send + 'static,
        A: Send + 'static,
        C: FnOnce(CA) + Send + 'static,
        CA: Send + 'static,
    {
        self.lifecycle.spawn_function(label, f, args, completion_cb, completion_args, priority)
    }

    pub fn block_current_task(&self) {
        self.lifecycle.block_current_task();
    }

    pub fn unblock_task(&self, task: TaskHandle) {
        self.lifecycle.unblock_task(task);
    }

    pub fn current_event_counter(&self) -> Option<TaskHandle> {
        self.lifecycle.current_event_counter()
    }

    pub fn increment(&self, counter: TaskHandle, n: usize) {
        self.lifecycle.increment(counter, n);
    }

    pub fn decrement(&self, counter: TaskHandle, n: usize) {
        self.lifecycle.decrement(counter, n);
    }

    /// Folds one observed task-body execution cost into the wisdom table
    /// (spec §3.4). Purely advisory bookkeeping, never required to call
    /// this for correctness.
    pub fn record_wisdom(&self, label: &str, cost_ns: f64) {
        self.wisdom.lock().unwrap().record(label, cost_ns);
    }
}

impl TaskRunner for Runtime {
    fn run(&self, task: TaskHandle, cpu: CpuId) {
        self.lifecycle.execute_on_worker(task, cpu);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[test]
    #[ntest::timeout(5000)]
    fn runtime_runs_a_spawned_task_end_to_end() {
        let runtime = Runtime::new(RuntimeConfig { worker_threads: 2, ..RuntimeConfig::default() });
        runtime.start();

        let ran = Arc::new(AtomicUsize::new(0));
        let ran_clone = ran.clone();
        runtime.spawn_function("task", move |_: ()| ran_clone.fetch_add(1, Ordering::SeqCst), (), |_: ()| {}, (), 0);

        std::thread::sleep(Duration::from_millis(200));
        assert_eq!(ran.load(Ordering::SeqCst), 1);

        runtime.shutdown();
    }
}
