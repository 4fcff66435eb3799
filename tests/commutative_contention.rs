//! Scenario 4 (spec §8): 10 tasks each with COMMUTATIVE(x). All 10 must
//! execute; at most one may hold the region at a time; order need not be
//! submission order.

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    use taskmesh_core::{DataAccessRequest, Runtime, RuntimeConfig};
    use taskmesh_types::{AccessType, MemoryRegion, TaskFlags};

    #[test]
    #[ntest::timeout(5000)]
    fn ten_commutative_tasks_all_run_without_overlap() {
        let runtime = Runtime::new(RuntimeConfig { worker_threads: 4, ..RuntimeConfig::default() });
        runtime.start();

        let region = MemoryRegion::new(0, 8);
        let completed = Arc::new(AtomicUsize::new(0));
        let concurrent = Arc::new(AtomicUsize::new(0));
        let max_concurrent = Arc::new(AtomicUsize::new(0));

        for i in 0..10 {
            let (completed, concurrent, max_concurrent) =
                (completed.clone(), concurrent.clone(), max_concurrent.clone());
            let task = runtime.create_task(
                "commutative",
                Box::new(move || {
                    let now = concurrent.fetch_add(1, Ordering::SeqCst) + 1;
                    max_concurrent.fetch_max(now, Ordering::SeqCst);
                    std::thread::sleep(Duration::from_millis(2));
                    concurrent.fetch_sub(1, Ordering::SeqCst);
                    completed.fetch_add(1, Ordering::SeqCst);
                }),
                None,
                i,
                TaskFlags::empty(),
            );
            runtime.register_data_access(task, DataAccessRequest::new(region, AccessType::Commutative, false));
            runtime.submit_task(task);
        }

        std::thread::sleep(Duration::from_millis(500));
        runtime.shutdown();

        assert_eq!(completed.load(Ordering::SeqCst), 10, "all ten tasks must execute");
        assert_eq!(max_concurrent.load(Ordering::SeqCst), 1, "never more than one commutative holder at a time");
    }
}
