//! Throughput of the scheduler's ready-queue (spec §4.2): enqueue/dequeue
//! cost under FIFO and priority-heap policies, the two `HostQueue` shapes
//! the two-level scheduler dispatches through.

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use std::sync::Arc;

use taskmesh_scheduler::{DeviceKind, HintKind, Scheduler, SchedulingPolicy};
use taskmesh_sync::EntryList;

fn fill_handles(n: usize) -> Vec<taskmesh_types::TaskHandle> {
    let mut list: EntryList<()> = EntryList::new();
    (0..n).map(|_| list.insert(())).collect()
}

fn bench_add_then_get(c: &mut Criterion) {
    let mut group = c.benchmark_group("scheduler_add_then_get");
    for &n in &[64usize, 1024, 8192] {
        for policy in [SchedulingPolicy::Fifo, SchedulingPolicy::Priority] {
            let label = match policy {
                SchedulingPolicy::Fifo => "fifo",
                SchedulingPolicy::Priority => "priority",
            };
            group.bench_with_input(BenchmarkId::new(label, n), &n, |b, &n| {
                let handles = fill_handles(n);
                b.iter(|| {
                    let scheduler = Arc::new(Scheduler::new(policy));
                    for (i, &h) in handles.iter().enumerate() {
                        scheduler.add_ready_task(DeviceKind::Host, h, (i % 8) as i32, None, HintKind::None);
                    }
                    for _ in 0..n {
                        criterion::black_box(scheduler.get_ready_task(0));
                    }
                });
            });
        }
    }
    group.finish();
}

fn bench_immediate_successor_hint(c: &mut Criterion) {
    let mut group = c.benchmark_group("scheduler_immediate_successor");
    let handles = fill_handles(1024);
    group.bench_function("hinted_cpu_slot", |b| {
        let scheduler = Arc::new(Scheduler::new(SchedulingPolicy::Fifo));
        b.iter(|| {
            for &h in &handles {
                scheduler.add_ready_task(DeviceKind::Host, h, 0, Some(0), HintKind::ImmediateSuccessor);
                criterion::black_box(scheduler.get_ready_task(0));
            }
        });
    });
    group.finish();
}

criterion_group!(benches, bench_add_then_get, bench_immediate_successor_hint);
criterion_main!(benches);
