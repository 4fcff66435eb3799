//! Worker thread pool: one kernel thread per enabled CPU (spec §4.3).
//! Threads are the only active agents in the runtime, they poll the
//! scheduler, run tasks, and park on the idle condition variable when
//! there is nothing ready.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;

use taskmesh_numa::{CpuId, Topology};
use taskmesh_scheduler::Scheduler;
use taskmesh_types::TaskHandle;

use crate::affinity::CpuBinder;
use crate::cpu_state::{CpuState, CpuStateCell};
use crate::idle_pool::IdlePool;

/// Supplied by `taskmesh_core`: actually runs a task's body and drives it
/// through the rest of its workflow. The worker pool only knows *when* to
/// call this, never *how* a task executes.
pub trait TaskRunner: Send + Sync {
    fn run(&self, task: TaskHandle, cpu: CpuId);
}

pub struct WorkerPool {
    topology: Topology,
    scheduler: Arc<Scheduler>,
    idle: Arc<IdlePool>,
    binder: Arc<dyn CpuBinder>,
    states: HashMap<CpuId, CpuStateCell>,
    shutting_down: AtomicBool,
}

impl WorkerPool {
    pub fn new(topology: Topology, scheduler: Arc<Scheduler>, binder: Arc<dyn CpuBinder>) -> Arc<Self> {
        let idle = Arc::new(IdlePool::new(topology.clone()));
        let states = topology.cpus().iter().map(|&cpu| (cpu, CpuStateCell::new())).collect();
        Arc::new(Self { topology, scheduler, idle, binder, states, shutting_down: AtomicBool::new(false) })
    }

    pub fn scheduler(&self) -> &Arc<Scheduler> {
        &self.scheduler
    }

    pub fn idle_pool(&self) -> &Arc<IdlePool> {
        &self.idle
    }

    pub fn cpu_state(&self, cpu: CpuId) -> Option<CpuState> {
        self.states.get(&cpu).map(CpuStateCell::get)
    }

    /// Spawns one worker thread per topology CPU. Returns their join
    /// handles; callers join them after `shutdown()`.
    pub fn start(self: &Arc<Self>, runner: Arc<dyn TaskRunner>) -> Vec<JoinHandle<()>> {
        self.topology
            .cpus()
            .iter()
            .map(|&cpu| {
                let pool = Arc::clone(self);
                let runner = Arc::clone(&runner);
                std::thread::Builder::new()
                    .name(format!("taskmesh-worker-{cpu}"))
                    .spawn(move || pool.worker_loop(cpu, runner))
                    .expect("failed to spawn worker thread")
            })
            .collect()
    }

    fn worker_loop(&self, cpu: CpuId, runner: Arc<dyn TaskRunner>) {
        self.binder.bind(cpu);
        let cell = self.states.get(&cpu).expect("cpu registered in topology at construction");
        cell.enable();

        loop {
            match self.scheduler.get_ready_task(cpu) {
                Some(task) => {
                    if cell.get() != CpuState::AcquiredRunning {
                        cell.acquire_running();
                    }
                    let _guard = taskmesh_sync::AbortIfPanic::new();
                    runner.run(task, cpu);
                    _guard.disarm();
                }
                None => {
                    if self.shutting_down.load(Ordering::Acquire) {
                        break;
                    }
                    if self.idle.cpu_becomes_idle(cpu, &self.scheduler) {
                        cell.become_idle();
                        self.idle.park(cpu);
                        if self.shutting_down.load(Ordering::Acquire) {
                            break;
                        }
                        cell.acquire_running();
                    }
                }
            }
        }

        cell.begin_shutdown();
        cell.terminate();
    }

    /// Signals every worker to drain the scheduler and exit, and wakes any
    /// currently-parked thread so it observes the flag instead of sleeping
    /// forever (spec §5 "Cancellation / timeouts").
    pub fn shutdown(&self) {
        self.shutting_down.store(true, Ordering::Release);
        self.idle.resume_all();
    }

    pub fn is_shutting_down(&self) -> bool {
        self.shutting_down.load(Ordering::Acquire)
    }
}
