//! Integration tests for the adaptive `WorkerPool`.
//!
//! These tests validate:
//! - Growth from `min_workers` towards `max_workers` under load
//! - Idle retirement back to the floor after keep-alive
//! - The active gauge under panicking units
//! - Draining the backlog on shutdown and rejecting later submissions

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use prometheus_task_scheduler::config::WorkerPoolConfig;
use prometheus_task_scheduler::core::{PoolError, WorkerExecutor, WorkerPool};

// ============================================================================
// TEST EXECUTORS
// ============================================================================

/// What a submitted unit does.
enum Job {
    /// Sleep on the worker thread.
    Sleep(Duration),
    /// Panic inside the executor.
    Poison,
}

#[derive(Clone, Default)]
struct SleepExecutor {
    done: Arc<AtomicUsize>,
    executing: Arc<AtomicUsize>,
    peak: Arc<AtomicUsize>,
}

#[async_trait]
impl WorkerExecutor<Job> for SleepExecutor {
    async fn execute(&self, job: Job) {
        match job {
            Job::Sleep(d) => {
                let now = self.executing.fetch_add(1, Ordering::SeqCst) + 1;
                self.peak.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(d).await;
                self.executing.fetch_sub(1, Ordering::SeqCst);
                self.done.fetch_add(1, Ordering::SeqCst);
            }
            Job::Poison => panic!("poisoned job"),
        }
    }
}

// ============================================================================
// HELPER FUNCTIONS
// ============================================================================

fn wait_until(timeout: Duration, mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        thread::sleep(Duration::from_millis(5));
    }
    condition()
}

fn pool(min: usize, max: usize, keep_alive_ms: u64) -> (WorkerPool<Job, SleepExecutor>, SleepExecutor) {
    let exec = SleepExecutor::default();
    let config = WorkerPoolConfig::new()
        .with_min_workers(min)
        .with_max_workers(max)
        .with_keep_alive(Duration::from_millis(keep_alive_ms));
    (WorkerPool::new(config, exec.clone()).unwrap(), exec)
}

// ============================================================================
// SIZING
// ============================================================================

#[test]
fn test_starts_with_min_workers() {
    let (pool, _exec) = pool(3, 6, 60_000);
    assert_eq!(pool.pool_size(), 3);
    assert_eq!(pool.active_count(), 0);
    pool.shutdown();
    assert!(pool.await_termination(Duration::from_secs(5)));
    assert_eq!(pool.pool_size(), 0);
}

#[test]
fn test_grows_to_max_under_load_and_never_beyond() {
    let (pool, exec) = pool(1, 4, 60_000);

    for _ in 0..12 {
        pool.submit(Job::Sleep(Duration::from_millis(40))).unwrap();
    }

    assert!(wait_until(Duration::from_secs(5), || pool.pool_size() == 4));
    assert!(wait_until(Duration::from_secs(10), || exec.done.load(Ordering::SeqCst) == 12));
    assert!(exec.peak.load(Ordering::SeqCst) <= 4);
    assert!(pool.stats().worker_count <= 4);
    assert_eq!(pool.stats().submitted_tasks, 12);

    pool.shutdown();
    assert!(pool.await_termination(Duration::from_secs(5)));
}

#[test]
fn test_idle_workers_retire_to_floor() {
    let (pool, exec) = pool(1, 3, 50);

    for _ in 0..6 {
        pool.submit(Job::Sleep(Duration::from_millis(30))).unwrap();
    }
    assert!(wait_until(Duration::from_secs(5), || pool.pool_size() == 3));
    assert!(wait_until(Duration::from_secs(5), || exec.done.load(Ordering::SeqCst) == 6));

    assert!(wait_until(Duration::from_secs(5), || pool.pool_size() == 1));
    // The floor survives further idle periods.
    thread::sleep(Duration::from_millis(200));
    assert_eq!(pool.pool_size(), 1);

    pool.submit(Job::Sleep(Duration::from_millis(1))).unwrap();
    assert!(wait_until(Duration::from_secs(5), || exec.done.load(Ordering::SeqCst) == 7));

    pool.shutdown();
    assert!(pool.await_termination(Duration::from_secs(5)));
}

// ============================================================================
// FAILURE AND SHUTDOWN
// ============================================================================

#[test]
fn test_panicking_unit_releases_active_gauge() {
    let (pool, exec) = pool(1, 1, 60_000);

    pool.submit(Job::Poison).unwrap();
    pool.submit(Job::Sleep(Duration::from_millis(1))).unwrap();

    assert!(wait_until(Duration::from_secs(5), || exec.done.load(Ordering::SeqCst) == 1));
    assert!(wait_until(Duration::from_secs(5), || pool.active_count() == 0));
    let stats = pool.stats();
    assert_eq!(stats.panicked_tasks, 1);
    assert_eq!(stats.completed_tasks, 2);
    assert_eq!(pool.pool_size(), 1);

    pool.shutdown();
    assert!(pool.await_termination(Duration::from_secs(5)));
}

#[test]
fn test_shutdown_drains_backlog_and_rejects_new_work() {
    let (pool, exec) = pool(1, 1, 60_000);

    for _ in 0..5 {
        pool.submit(Job::Sleep(Duration::from_millis(10))).unwrap();
    }
    pool.shutdown();
    assert!(pool.is_shutdown());
    assert!(matches!(
        pool.submit(Job::Sleep(Duration::ZERO)),
        Err(PoolError::PoolShutdown)
    ));

    assert!(pool.await_termination(Duration::from_secs(5)));
    assert_eq!(exec.done.load(Ordering::SeqCst), 5);
    assert_eq!(pool.queued_count(), 0);
}

#[test]
fn test_await_termination_times_out_on_long_unit() {
    let (pool, _exec) = pool(1, 1, 60_000);
    pool.submit(Job::Sleep(Duration::from_millis(500))).unwrap();
    assert!(wait_until(Duration::from_secs(5), || pool.active_count() == 1));

    pool.shutdown();
    assert!(!pool.await_termination(Duration::from_millis(20)));
}

#[test]
fn test_invalid_config_is_rejected() {
    let config = WorkerPoolConfig::new().with_min_workers(4).with_max_workers(2);
    let result = WorkerPool::new(config, SleepExecutor::default());
    assert!(matches!(result, Err(PoolError::InvalidConfig(_))));
}
