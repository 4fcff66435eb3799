//! Scenario 1 (spec §8): T1(OUT x) -> T2(INOUT x) -> T3(IN x). Expect
//! strict body-entry order T1 < T2 < T3, and that T3 observes the value
//! T2 wrote.

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use taskmesh_core::{DataAccessRequest, Runtime, RuntimeConfig};
    use taskmesh_types::{AccessType, MemoryRegion, TaskFlags};

    #[test]
    #[ntest::timeout(5000)]
    fn chain_of_three_runs_in_dependency_order() {
        let runtime = Runtime::new(RuntimeConfig { worker_threads: 4, ..RuntimeConfig::default() });
        runtime.start();

        let region = MemoryRegion::new(0, 8);
        let x = Arc::new(AtomicUsize::new(0));
        let order = Arc::new(Mutex::new(Vec::new()));

        let (x1, order1) = (x.clone(), order.clone());
        let t1 = runtime.create_task("t1", Box::new(move || {
            order1.lock().unwrap().push("t1");
            x1.store(1, Ordering::SeqCst);
        }), None, 0, TaskFlags::empty());
        runtime.register_data_access(t1, DataAccessRequest::new(region, AccessType::Out, false));
        runtime.submit_task(t1);

        let (x2, order2) = (x.clone(), order.clone());
        let t2 = runtime.create_task("t2", Box::new(move || {
            order2.lock().unwrap().push("t2");
            let seen = x2.load(Ordering::SeqCst);
            x2.store(seen + 1, Ordering::SeqCst);
        }), None, 0, TaskFlags::empty());
        runtime.register_data_access(t2, DataAccessRequest::new(region, AccessType::InOut, false));
        runtime.submit_task(t2);

        let (x3, order3, seen_by_t3) = (x.clone(), order.clone(), Arc::new(AtomicUsize::new(0)));
        let seen_by_t3_write = seen_by_t3.clone();
        let t3 = runtime.create_task("t3", Box::new(move || {
            order3.lock().unwrap().push("t3");
            seen_by_t3_write.store(x3.load(Ordering::SeqCst), Ordering::SeqCst);
        }), None, 0, TaskFlags::empty());
        runtime.register_data_access(t3, DataAccessRequest::new(region, AccessType::In, false));
        runtime.submit_task(t3);

        std::thread::sleep(Duration::from_millis(300));
        runtime.shutdown();

        assert_eq!(*order.lock().unwrap(), vec!["t1", "t2", "t3"]);
        assert_eq!(seen_by_t3.load(Ordering::SeqCst), 2, "T3 must observe the value T2 wrote");
    }
}
