//! Scenario 7 (spec §8): a worker finds the scheduler empty and calls
//! `cpu_becomes_idle` while another thread concurrently enqueues a task.
//! Either `cpu_becomes_idle` observes the work and returns false (the
//! worker loops instead of parking), or the CPU is marked idle and
//! `resume_idle` wakes it, either way the task runs in bounded time.
//! Driven through the full worker pool rather than `IdlePool` directly so
//! the scenario exercises the real race window, repeated many times to
//! make a lost wake-up show up as a flaky failure instead of hiding in a
//! single lucky interleaving.

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    use taskmesh_numa::Topology;
    use taskmesh_scheduler::{DeviceKind, HintKind, Scheduler, SchedulingPolicy};
    use taskmesh_sync::EntryList;
    use taskmesh_worker::{NoopBinder, TaskRunner, WorkerPool};

    struct CountingRunner {
        count: Arc<AtomicUsize>,
    }

    impl TaskRunner for CountingRunner {
        fn run(&self, _task: taskmesh_types::TaskHandle, _cpu: taskmesh_numa::CpuId) {
            self.count.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    #[ntest::timeout(10000)]
    fn task_enqueued_during_the_idle_race_is_never_lost() {
        for _ in 0..50 {
            let topo = Topology::single_node(1, 4096);
            let scheduler = Arc::new(Scheduler::new(SchedulingPolicy::Fifo));
            let pool = WorkerPool::new(topo, scheduler.clone(), Arc::new(NoopBinder));

            let count = Arc::new(AtomicUsize::new(0));
            let runner = Arc::new(CountingRunner { count: count.clone() });
            let handles = pool.start(runner);

            // give the lone worker a moment to reach its idle-check loop
            // before racing a task into the scheduler.
            std::thread::sleep(Duration::from_micros(200));

            let mut list: EntryList<()> = EntryList::new();
            let handle = list.insert(());
            scheduler.add_ready_task(DeviceKind::Host, handle, 0, None, HintKind::None);

            let deadline = std::time::Instant::now() + Duration::from_secs(2);
            while count.load(Ordering::SeqCst) == 0 && std::time::Instant::now() < deadline {
                std::thread::sleep(Duration::from_millis(1));
            }
            assert_eq!(count.load(Ordering::SeqCst), 1, "task enqueued during the idle race must still run");

            pool.shutdown();
            for h in handles {
                h.join().unwrap();
            }
        }
    }
}
