//! Task lifecycle and task-creation API (spec §4.5, §6): ties task
//! creation, access registration, workflow advancement, finalization
//! batching and disposal together. [`crate::runtime::Runtime`] is a thin
//! shell around this.

use std::cell::Cell;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use taskmesh_depgraph::{AccessRequest, CpuDependencyData, DependencyEngine};
use taskmesh_scheduler::{CpuId, DeviceKind, HintKind, Scheduler};
use taskmesh_throttle::Throttle;
use taskmesh_types::{AccessType, MemoryRegion, Task, TaskBody, TaskFlags, TaskHandle};
use taskmesh_worker::TaskWaitRegistry;
use taskmesh_workflow::{labels, Step, StepHandle, WorkflowArena};

use crate::task_arena::TaskArena;

thread_local! {
    /// The task currently executing on this worker thread, if any, the
    /// "current" half of `current_event_counter()`/`block_current_task()`
    /// (spec §6). Only ever set inside `TaskLifecycle::execute_on_worker`.
    static CURRENT_TASK: Cell<Option<TaskHandle>> = const { Cell::new(None) };
}

/// A pseudo-CPU id reserved for cooperative draining by a caller that is
/// not itself a worker thread (spec §5 "Back-pressure (throttle)":
/// `task_create` may execute ready work before returning). Never collides
/// with a real topology CPU id, which is always a small contiguous index.
const THROTTLE_CALLER_CPU: CpuId = CpuId::MAX;

/// The `start`/`execute`/`release` step handles of a task's workflow
/// chain, kept in a side table rather than on `Task` itself, `taskmesh_types`
/// has no dependency on the workflow crate (spec §9 layering).
#[derive(Clone, Copy)]
struct TaskSteps {
    execute: StepHandle,
    release: StepHandle,
}

/// One request to `register_data_access` (spec §6): either a plain
/// region/kind pair or a reduction contribution.
pub struct DataAccessRequest {
    pub region: MemoryRegion,
    pub kind: AccessType,
    pub weak: bool,
    pub reduction_operator: Option<u32>,
}

impl DataAccessRequest {
    pub fn new(region: MemoryRegion, kind: AccessType, weak: bool) -> Self {
        Self { region, kind, weak, reduction_operator: None }
    }

    pub fn reduction(region: MemoryRegion, operator: u32) -> Self {
        Self { region, kind: AccessType::Reduction, weak: false, reduction_operator: Some(operator) }
    }
}

pub struct TaskLifecycle {
    tasks: TaskArena,
    deps: Arc<DependencyEngine>,
    scheduler: Arc<Scheduler>,
    workflow: Arc<WorkflowArena>,
    throttle: Arc<Throttle>,
    wait_registry: Arc<TaskWaitRegistry>,
    steps: Mutex<HashMap<TaskHandle, TaskSteps>>,
    next_task_id: AtomicU64,
}

impl TaskLifecycle {
    pub fn new(
        deps: Arc<DependencyEngine>,
        scheduler: Arc<Scheduler>,
        workflow: Arc<WorkflowArena>,
        throttle: Arc<Throttle>,
        wait_registry: Arc<TaskWaitRegistry>,
    ) -> Self {
        Self {
            tasks: TaskArena::new(),
            deps,
            scheduler,
            workflow,
            throttle,
            wait_registry,
            steps: Mutex::new(HashMap::new()),
            next_task_id: AtomicU64::new(1),
        }
    }

    pub fn tasks(&self) -> &TaskArena {
        &self.tasks
    }

    /// `create_task` (spec §6): allocates the task and its workflow chain.
    /// Accesses are registered separately via `register_data_access`;
    /// nothing runs until `submit_task`.
    pub fn create_task(
        &self,
        label: &'static str,
        body: TaskBody,
        parent: Option<TaskHandle>,
        priority: i32,
        flags: TaskFlags,
    ) -> TaskHandle {
        let id = self.next_task_id.fetch_add(1, Ordering::Relaxed);
        let task = Task::new(id, label, body, parent, priority, flags, 0);
        let handle = self.tasks.insert(task);

        let start = self.workflow.insert(Step::new(labels::START, 0));
        let data_link = self.workflow.insert(Step::new(labels::DATA_LINK, 1));
        let data_fetch = self.workflow.insert(Step::new(labels::DATA_FETCH, 1));
        let execute = self.workflow.insert(Step::new(labels::EXECUTE, 1));
        let release = self.workflow.insert(Step::new(labels::RELEASE, 1));
        self.workflow.link(start, data_link);
        self.workflow.link(data_link, data_fetch);
        self.workflow.link(data_fetch, execute);
        self.workflow.link(execute, release);

        self.tasks.with(handle, |t| t.set_workflow(start));
        self.steps.lock().unwrap().insert(handle, TaskSteps { execute, release });

        if let Some(parent) = parent {
            self.tasks.with(parent, |p| p.pending_children.fetch_add(1, Ordering::AcqRel));
        }

        handle
    }

    /// `register_data_access` (spec §6). May be called any number of
    /// times between `create_task` and `submit_task`. The dependency
    /// engine's scope is always the task's own parent, matching the scope
    /// `finalize` later unregisters against.
    pub fn register_data_access(&self, task: TaskHandle, req: DataAccessRequest) {
        let scope = self.tasks.with(task, |t| t.parent).flatten();
        let request = match req.reduction_operator {
            Some(op) => AccessRequest::reduction(req.region, op),
            None => AccessRequest::new(req.region, req.kind, req.weak),
        };

        let produced = self.deps.register_accesses(scope, task, std::slice::from_ref(&request));
        for handle in produced.into_iter().flatten() {
            let ready = self.deps.arena().with(handle, |a| a.is_ready()).unwrap_or(true);
            self.tasks.with(task, |t| {
                t.push_access(handle);
                if !ready {
                    t.remaining_predecessors.fetch_add(1, Ordering::AcqRel);
                }
            });
        }
    }

    /// `submit_task` (spec §6): drives the workflow chain's local,
    /// synchronous hops (`start` → `data-link` → `data-fetch`, each a
    /// no-op for a task that never leaves this node) and, once `execute`
    /// is reached, posts the task to the scheduler iff its accesses are
    /// already satisfied. If they are not, the task waits, whichever
    /// `decrement` call later brings `remaining_predecessors` to zero
    /// posts it instead (see `drain_batch`).
    pub fn submit_task(&self, task: TaskHandle) {
        let Some(steps) = self.steps.lock().unwrap().get(&task).copied() else {
            return;
        };
        let start = self.tasks.with(task, |t| t.workflow()).flatten();
        let Some(start) = start else {
            return;
        };

        let mut frontier = self.workflow.complete(start);
        for _ in 0..2 {
            frontier = frontier.into_iter().flat_map(|s| self.workflow.complete(s)).collect();
        }

        let reached_execute = frontier.contains(&steps.execute);
        let remaining = self.tasks.with(task, |t| t.remaining_predecessors.load(Ordering::Acquire)).unwrap_or(0);

        if reached_execute && remaining == 0 {
            self.submit_ready(task);
        }

        self.throttle.task_created();
        if self.throttle.is_under_pressure() {
            self.throttle.admit(|| self.drain_one_ready(THROTTLE_CALLER_CPU));
        }
    }

    /// `spawn_function` (spec §6): a fire-and-forget top-level task with no
    /// declared accesses, composing the completion callback into the body
    /// itself.
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
        let body: TaskBody = Box::new(move || {
            f(args);
            completion_cb(completion_args);
        });
        let handle = self.create_task(label, body, None, priority, TaskFlags::SPAWNED);
        self.submit_task(handle);
        handle
    }

    /// Pushes `task` onto the scheduler, honoring its immediate-successor
    /// hint if it has one (spec §4.2).
    fn submit_ready(&self, task: TaskHandle) {
        let (priority, cpu_hint) =
            self.tasks.with(task, |t| (t.priority, t.immediate_successor_cpu())).unwrap_or((0, None));
        let hint = if cpu_hint.is_some() { HintKind::ImmediateSuccessor } else { HintKind::None };
        self.scheduler.add_ready_task(DeviceKind::Host, task, priority, cpu_hint, hint);
    }

    /// Pops and runs one ready task inline, for `Throttle::admit`'s
    /// cooperative draining. Returns whether one was found.
    fn drain_one_ready(&self, cpu: CpuId) -> bool {
        match self.scheduler.get_ready_task(cpu) {
            Some(task) => {
                self.execute_on_worker(task, cpu);
                true
            }
            None => false,
        }
    }

    /// `block_current_task` (spec §6): the calling OS thread blocks until
    /// `unblock_task` targets the task it is currently running.
    pub fn block_current_task(&self) {
        let Some(task) = CURRENT_TASK.with(|c| c.get()) else {
            tracing::warn!(target: "taskmesh_core", "block_current_task called outside a task body");
            return;
        };
        self.wait_registry.block_current_task(task);
    }

    pub fn unblock_task(&self, task: TaskHandle) {
        self.wait_registry.unblock_task(task);
    }

    /// `current_event_counter` (spec §6): the opaque handle the event
    /// counter ops operate on is simply the currently-running task.
    pub fn current_event_counter(&self) -> Option<TaskHandle> {
        CURRENT_TASK.with(|c| c.get())
    }

    pub fn increment(&self, counter: TaskHandle, n: usize) {
        self.tasks.with(counter, |t| t.increment_release_counter(n));
    }

    /// Decrements the release counter. If it reaches zero, runs access
    /// unregistration and drains the resulting batch inline (spec §4.5:
    /// "the worker walks the batch", here, whichever thread made the
    /// count reach zero).
    pub fn decrement(&self, counter: TaskHandle, n: usize) {
        let hit_zero = self.tasks.with(counter, |t| t.decrement_release_counter(n)).unwrap_or(false);
        if hit_zero {
            self.finalize(counter);
        }
    }

    fn finalize(&self, task: TaskHandle) {
        let Some((accesses, parent)) = self.tasks.with(task, |t| (t.accesses(), t.parent)) else {
            return;
        };

        let mut batch = CpuDependencyData::new();
        if let Err(err) = self.deps.unregister_accesses(parent, &accesses, &mut batch) {
            crate::error::abort_on_fatal(crate::error::FatalError::DependencyProtocolViolation(err));
        }

        let became_released = self.tasks.with(task, |t| t.mark_as_released()).unwrap_or(false);
        if became_released {
            batch.mark_removable(task);
        }

        self.drain_batch(batch);
    }

    fn drain_batch(&self, mut batch: CpuDependencyData) {
        for owner in batch.drain_satisfied() {
            let hit_zero = self
                .tasks
                .with(owner, |t| t.remaining_predecessors.fetch_sub(1, Ordering::AcqRel) == 1)
                .unwrap_or(false);
            if hit_zero {
                self.submit_ready(owner);
            }
        }

        for removable in batch.drain_removable() {
            self.dispose(removable);
        }
    }

    fn dispose(&self, task: TaskHandle) {
        if let Some(parent) = self.tasks.with(task, |t| t.parent).flatten() {
            let prev = self.tasks.with(parent, |p| p.pending_children.fetch_sub(1, Ordering::AcqRel));
            if prev == Some(1) {
                self.tasks.with(parent, |p| p.set_flag(TaskFlags::CHILDREN_FINISHED));
                self.wait_registry.unblock_task(parent);
            }
        }

        self.steps.lock().unwrap().remove(&task);
        self.tasks.remove(task);
        self.throttle.task_disposed();
    }

    /// The worker pool's `TaskRunner::run` seam (spec §4.3, §4.4 "execute
    /// step"). Runs the task body, releases its `execute`/`release`
    /// workflow steps, and decrements the "self" portion of its release
    /// counter.
    pub fn execute_on_worker(&self, task: TaskHandle, _cpu: CpuId) {
        CURRENT_TASK.with(|c| c.set(Some(task)));

        let body = self.tasks.with(task, |t| t.take_body()).flatten();
        if let Some(body) = body {
            body();
        }
        self.tasks.with(task, |t| t.set_flag(TaskFlags::FINISHED));

        if let Some(steps) = self.steps.lock().unwrap().get(&task).copied() {
            let ready = self.workflow.complete(steps.execute);
            for step in ready {
                if step == steps.release {
                    self.workflow.complete(steps.release);
                }
            }
        }

        CURRENT_TASK.with(|c| c.set(None));
        self.decrement(task, 1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use taskmesh_scheduler::SchedulingPolicy;

    fn new_lifecycle() -> TaskLifecycle {
        TaskLifecycle::new(
            Arc::new(DependencyEngine::new()),
            Arc::new(Scheduler::new(SchedulingPolicy::Fifo)),
            Arc::new(WorkflowArena::new()),
            Arc::new(Throttle::new(1_000)),
            Arc::new(TaskWaitRegistry::new()),
        )
    }

    #[test]
    fn task_with_no_accesses_becomes_ready_immediately() {
        let lc = new_lifecycle();
        let handle = lc.create_task("t", Box::new(|| {}), None, 0, TaskFlags::empty());
        lc.submit_task(handle);
        assert_eq!(lc.scheduler.get_ready_task(0), Some(handle));
    }

    #[test]
    fn second_writer_to_same_region_waits_for_first() {
        let lc = new_lifecycle();
        let first = lc.create_task("writer", Box::new(|| {}), None, 0, TaskFlags::empty());
        lc.register_data_access(first, DataAccessRequest::new(MemoryRegion::new(0, 8), AccessType::Out, false));
        lc.submit_task(first);
        assert_eq!(lc.scheduler.get_ready_task(0), Some(first));

        let second = lc.create_task("reader", Box::new(|| {}), None, 0, TaskFlags::empty());
        lc.register_data_access(second, DataAccessRequest::new(MemoryRegion::new(0, 8), AccessType::In, false));
        lc.submit_task(second);
        assert_eq!(lc.scheduler.get_ready_task(0), None, "second task must wait on the first's write");

        lc.execute_on_worker(first, 0);
        assert_eq!(lc.scheduler.get_ready_task(0), Some(second));
    }

    #[test]
    fn spawn_function_runs_body_and_completion() {
        let lc = new_lifecycle();
        let ran = Arc::new(AtomicUsize::new(0));
        let ran_body = ran.clone();
        let ran_cb = ran.clone();

        let handle = lc.spawn_function(
            "spawned",
            move |_: ()| {
                ran_body.fetch_add(1, Ordering::SeqCst);
            },
            (),
            move |_: ()| {
                ran_cb.fetch_add(10, Ordering::SeqCst);
            },
            (),
            0,
        );

        let task = lc.scheduler.get_ready_task(0).unwrap();
        assert_eq!(task, handle);
        lc.execute_on_worker(task, 0);
        assert_eq!(ran.load(Ordering::SeqCst), 11);
    }

    #[test]
    fn block_and_unblock_round_trip() {
        let lc = Arc::new(new_lifecycle());
        let handle = lc.create_task("blocker", Box::new(|| {}), None, 0, TaskFlags::empty());
        lc.wait_registry.register_blockable(handle);

        let lc_thread = lc.clone();
        let thread = std::thread::spawn(move || {
            CURRENT_TASK.with(|c| c.set(Some(handle)));
            lc_thread.block_current_task();
        });

        std::thread::sleep(std::time::Duration::from_millis(50));
        lc.unblock_task(handle);
        thread.join().unwrap();
    }
}
