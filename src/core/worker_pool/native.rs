//! Native implementation of `WorkerPool` using OS threads.
//!
//! Each worker thread owns a single-threaded tokio runtime and drives the
//! executor's future to completion with `block_on`, so async task actions run
//! without touching the caller's runtime.
//!
//! # Design Principles
//!
//! - **No polling**: idle workers block on the backlog channel with a
//!   keep-alive timeout
//! - **Growth on demand**: `submit` adds a worker when every live worker is busy
//! - **Clean shutdown**: dropping the sender lets workers drain the backlog and exit

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam_channel::{unbounded, Receiver, RecvTimeoutError, Sender};
use parking_lot::Mutex;
use tracing::{debug, error, info, warn};

use crate::config::WorkerPoolConfig;
use crate::core::executor::WorkerExecutor;

use super::{ActiveGuard, PoolCounters, PoolError, PoolStats, WorkerJob};

/// Everything a worker thread needs, cloned per spawn.
struct WorkerContext<P, E> {
    worker_id: usize,
    job_rx: Receiver<WorkerJob<P>>,
    counters: Arc<PoolCounters>,
    executor: E,
    min_workers: usize,
    keep_alive: Duration,
}

/// Worker pool with dedicated OS threads and an unbounded backlog.
///
/// # Design
///
/// - **Floor and ceiling**: `min_workers` threads start eagerly; more are
///   added while every live worker is busy, never exceeding `max_workers`
/// - **Accurate gauges**: the active count is decremented by a drop guard
/// - **Panic isolation**: a panicking unit is logged and the worker keeps serving
pub struct WorkerPool<P, E>
where
    P: Send + 'static,
    E: WorkerExecutor<P>,
{
    /// Pool configuration.
    config: WorkerPoolConfig,

    /// Backlog sender. `None` once shut down.
    job_tx: Mutex<Option<Sender<WorkerJob<P>>>>,

    /// Receiver cloned into each new worker.
    job_rx: Receiver<WorkerJob<P>>,

    /// Pool statistics counters (lock-free atomics).
    counters: Arc<PoolCounters>,

    /// Shutdown flag (lock-free atomic).
    shutdown: AtomicBool,

    /// Worker thread handles, including ones that already retired.
    workers: Mutex<Vec<JoinHandle<()>>>,

    /// Next worker id, for thread names.
    next_worker_id: AtomicUsize,

    /// Job sequence counter.
    job_id_counter: AtomicU64,

    /// Executor cloned into each worker.
    executor: E,
}

impl<P, E> WorkerPool<P, E>
where
    P: Send + 'static,
    E: WorkerExecutor<P>,
{
    /// Create a new worker pool and start `config.min_workers` threads.
    ///
    /// # Errors
    ///
    /// `PoolError::InvalidConfig` if the configuration is invalid,
    /// `PoolError::Internal` if a worker thread cannot be spawned.
    pub fn new(config: WorkerPoolConfig, executor: E) -> Result<Self, PoolError> {
        config.validate().map_err(PoolError::InvalidConfig)?;

        let (job_tx, job_rx) = unbounded::<WorkerJob<P>>();
        let pool = Self {
            config,
            job_tx: Mutex::new(Some(job_tx)),
            job_rx,
            counters: Arc::new(PoolCounters::default()),
            shutdown: AtomicBool::new(false),
            workers: Mutex::new(Vec::new()),
            next_worker_id: AtomicUsize::new(0),
            job_id_counter: AtomicU64::new(0),
            executor,
        };

        for _ in 0..pool.config.min_workers {
            if !pool.counters.try_reserve_worker(pool.config.max_workers) {
                break;
            }
            pool.spawn_worker()?;
        }

        info!(
            min_workers = pool.config.min_workers,
            max_workers = pool.config.max_workers,
            keep_alive_ms = pool.config.keep_alive_ms,
            "WorkerPool initialized with dedicated OS threads"
        );

        Ok(pool)
    }

    /// Submit a unit of work. Returns immediately.
    ///
    /// When every live worker is busy and the ceiling allows it, a new worker
    /// is started; otherwise the unit waits in the backlog.
    ///
    /// # Errors
    ///
    /// `PoolError::PoolShutdown` if the pool has been shut down.
    pub fn submit(&self, payload: P) -> Result<(), PoolError> {
        if self.shutdown.load(Ordering::Acquire) {
            return Err(PoolError::PoolShutdown);
        }

        let job_id = self.job_id_counter.fetch_add(1, Ordering::Relaxed);
        {
            let job_tx = self.job_tx.lock();
            let Some(job_tx) = job_tx.as_ref() else {
                return Err(PoolError::PoolShutdown);
            };

            // Count before sending so a fast worker never decrements below zero.
            self.counters.queued_tasks.fetch_add(1, Ordering::AcqRel);
            if job_tx.send(WorkerJob { id: job_id, payload }).is_err() {
                self.counters.queued_tasks.fetch_sub(1, Ordering::AcqRel);
                return Err(PoolError::PoolShutdown);
            }
        }
        self.counters.submitted_tasks.fetch_add(1, Ordering::Relaxed);
        debug!(job_id, "Job submitted to worker pool");

        self.grow_if_saturated();
        Ok(())
    }

    /// Units currently executing.
    #[must_use]
    pub fn active_count(&self) -> usize {
        self.counters.active_tasks.load(Ordering::Acquire)
    }

    /// Live worker threads.
    #[must_use]
    pub fn pool_size(&self) -> usize {
        self.counters.live_workers.load(Ordering::Acquire)
    }

    /// Units waiting in the backlog.
    #[must_use]
    pub fn queued_count(&self) -> usize {
        self.counters.queued_tasks.load(Ordering::Acquire)
    }

    /// Configuration the pool was built with.
    #[must_use]
    pub const fn config(&self) -> &WorkerPoolConfig {
        &self.config
    }

    /// Get current pool statistics.
    #[must_use]
    pub fn stats(&self) -> PoolStats {
        self.counters.snapshot()
    }

    /// Whether `shutdown` has been called.
    #[must_use]
    pub fn is_shutdown(&self) -> bool {
        self.shutdown.load(Ordering::Acquire)
    }

    /// Stop accepting work. Returns immediately.
    ///
    /// Already-submitted units, queued or running, still execute; workers
    /// exit once the backlog is empty.
    pub fn shutdown(&self) {
        if self.shutdown.swap(true, Ordering::AcqRel) {
            return;
        }
        info!(
            queued = self.queued_count(),
            active = self.active_count(),
            "Shutting down worker pool"
        );
        // Drop the sender; workers see Disconnected after draining.
        self.job_tx.lock().take();
    }

    /// Wait up to `timeout` for every worker to exit.
    ///
    /// Returns `true` if all workers were joined. Workers still running when
    /// the deadline passes are detached, not cancelled.
    pub fn await_termination(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let handles: Vec<_> = self.workers.lock().drain(..).collect();
        let mut all_joined = true;

        for (idx, worker) in handles.into_iter().enumerate() {
            if worker.is_finished() {
                if worker.join().is_err() {
                    warn!(worker = idx, "Worker thread panicked");
                }
                continue;
            }

            let remaining = deadline.saturating_duration_since(Instant::now());
            let (tx, rx) = std::sync::mpsc::channel();
            let joiner = thread::spawn(move || {
                let _ = tx.send(worker.join().is_ok());
            });

            match rx.recv_timeout(remaining) {
                Ok(true) => debug!(worker = idx, "Worker joined"),
                Ok(false) => warn!(worker = idx, "Worker thread panicked"),
                Err(_) => {
                    warn!(worker = idx, "Worker did not exit before deadline - detaching");
                    all_joined = false;
                    continue;
                }
            }
            let _ = joiner.join();
        }

        if all_joined {
            info!("Worker pool terminated");
        }
        all_joined
    }

    /// Start one more worker if every live worker is occupied.
    fn grow_if_saturated(&self) {
        let live = self.pool_size();
        let busy = self.active_count() + self.queued_count();
        if busy <= live || !self.counters.try_reserve_worker(self.config.max_workers) {
            return;
        }
        if let Err(e) = self.spawn_worker() {
            error!(error = %e, "Failed to grow worker pool");
        } else {
            debug!(pool_size = self.pool_size(), "Worker pool grew");
        }
    }

    /// Spawn a worker for a slot already reserved in `live_workers`.
    fn spawn_worker(&self) -> Result<(), PoolError> {
        let worker_id = self.next_worker_id.fetch_add(1, Ordering::Relaxed);
        let ctx = WorkerContext {
            worker_id,
            job_rx: self.job_rx.clone(),
            counters: Arc::clone(&self.counters),
            executor: self.executor.clone(),
            min_workers: self.config.min_workers,
            keep_alive: self.config.keep_alive(),
        };

        let spawned = thread::Builder::new()
            .name(format!("task-worker-{worker_id}"))
            .stack_size(self.config.thread_stack_size)
            .spawn(move || worker_loop(ctx));

        match spawned {
            Ok(handle) => {
                let mut workers = self.workers.lock();
                workers.retain(|h| !h.is_finished());
                workers.push(handle);
                Ok(())
            }
            Err(e) => {
                self.counters.live_workers.fetch_sub(1, Ordering::AcqRel);
                Err(PoolError::Internal(format!("spawn worker thread: {e}")))
            }
        }
    }
}

impl<P, E> Drop for WorkerPool<P, E>
where
    P: Send + 'static,
    E: WorkerExecutor<P>,
{
    fn drop(&mut self) {
        // Signal shutdown but don't join: explicit await_termination() is
        // required for graceful cleanup.
        if !self.shutdown.swap(true, Ordering::AcqRel) {
            self.job_tx.lock().take();
            debug!("WorkerPool dropped without explicit shutdown - workers will be detached");
        }
    }
}

/// Body of one worker thread.
fn worker_loop<P, E>(ctx: WorkerContext<P, E>)
where
    P: Send + 'static,
    E: WorkerExecutor<P>,
{
    let WorkerContext {
        worker_id,
        job_rx,
        counters,
        executor,
        min_workers,
        keep_alive,
    } = ctx;
    debug!(worker_id, "Worker thread started");

    let rt = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(rt) => rt,
        Err(e) => {
            error!(worker_id, error = %e, "Failed to create worker runtime");
            counters.live_workers.fetch_sub(1, Ordering::AcqRel);
            return;
        }
    };

    loop {
        let job = match job_rx.recv_timeout(keep_alive) {
            Ok(job) => job,
            Err(RecvTimeoutError::Timeout) => {
                if counters.try_retire_worker(min_workers) {
                    debug!(worker_id, "Idle worker retiring");
                    return;
                }
                continue;
            }
            Err(RecvTimeoutError::Disconnected) => {
                debug!(worker_id, "Backlog closed and drained, exiting");
                break;
            }
        };

        counters.queued_tasks.fetch_sub(1, Ordering::AcqRel);
        let job_id = job.id;
        let outcome = {
            let _active = ActiveGuard::enter(&counters.active_tasks);
            debug!(worker_id, job_id, "Worker executing job");
            panic::catch_unwind(AssertUnwindSafe(|| {
                rt.block_on(executor.execute(job.payload));
            }))
        };

        counters.completed_tasks.fetch_add(1, Ordering::Relaxed);
        if let Err(panic) = outcome {
            counters.panicked_tasks.fetch_add(1, Ordering::Relaxed);
            error!(
                worker_id,
                job_id,
                panic = %panic_message(panic.as_ref()),
                "Job panicked; worker continues"
            );
        }
    }

    counters.live_workers.fetch_sub(1, Ordering::AcqRel);
}

/// Best-effort text of a panic payload.
pub(crate) fn panic_message(panic: &(dyn Any + Send)) -> String {
    panic
        .downcast_ref::<&str>()
        .map(|s| (*s).to_string())
        .or_else(|| panic.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "non-string panic payload".to_string())
}
