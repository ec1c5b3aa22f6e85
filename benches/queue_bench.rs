//! Benchmarks for the pending-task queue.
//!
//! Benchmarks cover:
//! - Enqueue then drain of tasks that are all due
//! - Draining due tasks while most of the queue is scheduled in the future
//! - The locked `PriorityTaskQueue` wrapper under a single producer

#![allow(missing_docs)]

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use std::hint::black_box;
use std::time::Duration;

use prometheus_task_scheduler::core::{FnAction, PriorityTaskQueue, ScheduledTask, TaskQueue};
use prometheus_task_scheduler::infra::queue::InMemoryQueue;
use prometheus_task_scheduler::util::Priority;

// ============================================================================
// Helper Functions
// ============================================================================

const NOW: u128 = 1_700_000_000_000;

fn build_task(i: u64, due_ms: u128) -> ScheduledTask {
    let priority = Priority::ALL[usize::try_from(i % 4).unwrap_or(0)];
    ScheduledTask::new(
        format!("bench-{i}"),
        priority,
        FnAction::new(|| Ok(())),
        Duration::ZERO,
        due_ms,
    )
}

// ============================================================================
// Queue Benchmarks
// ============================================================================

fn bench_enqueue_drain_due(c: &mut Criterion) {
    let mut group = c.benchmark_group("queue_enqueue_drain_due");

    for size in [100_u64, 1_000, 10_000] {
        group.throughput(Throughput::Elements(size));
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, &size| {
            b.iter(|| {
                let mut q = InMemoryQueue::new();
                for i in 0..size {
                    q.enqueue(build_task(i, NOW - u128::from(i % 50)));
                }
                while let Some(task) = q.pop_due(NOW) {
                    black_box(task);
                }
            });
        });
    }
    group.finish();
}

fn bench_drain_with_future_tasks(c: &mut Criterion) {
    let mut group = c.benchmark_group("queue_drain_with_future_tasks");

    for size in [1_000_u64, 10_000] {
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, &size| {
            b.iter(|| {
                let mut q = InMemoryQueue::new();
                // One task in ten is due; the rest wait up to a minute.
                for i in 0..size {
                    let due = if i % 10 == 0 {
                        NOW
                    } else {
                        NOW + u128::from(i % 60_000) + 1
                    };
                    q.enqueue(build_task(i, due));
                }
                let mut popped = 0;
                while q.pop_due(NOW).is_some() {
                    popped += 1;
                }
                black_box(popped);
            });
        });
    }
    group.finish();
}

fn bench_locked_queue(c: &mut Criterion) {
    let mut group = c.benchmark_group("priority_task_queue");

    for size in [1_000_u64] {
        group.throughput(Throughput::Elements(size));
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, &size| {
            b.iter(|| {
                let q: PriorityTaskQueue = PriorityTaskQueue::default();
                for i in 0..size {
                    q.enqueue(build_task(i, NOW));
                }
                while let Some(task) = q.pop_due(NOW) {
                    black_box(task);
                }
            });
        });
    }
    group.finish();
}

criterion_group!(
    benches,
    bench_enqueue_drain_due,
    bench_drain_with_future_tasks,
    bench_locked_queue
);
criterion_main!(benches);
