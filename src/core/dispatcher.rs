//! Periodic dispatch loop.
//!
//! A dedicated thread wakes every `interval`, drains the tasks that are due
//! (highest priority first) and hands each one to the worker pool. At most
//! `max_workers` tasks are in flight at once; the rest wait in the priority
//! queue for a later tick. The loop never runs task actions itself.

use std::fmt;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use parking_lot::{Condvar, Mutex, MutexGuard};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::persistence::log_persistence_failure;
use super::runner::TaskRunner;
use super::{PoolError, ScheduledTask, SchedulerCore, SchedulerError, WorkerPool};
use crate::util::serde::TaskStatus;

/// Reason recorded for a task whose hand-off to the pool was refused.
pub const POOL_REJECTED_MESSAGE: &str = "worker pool shut down before execution";

/// Lifecycle of the dispatch loop. `Stopped` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum DispatcherState {
    /// Ticking.
    Running,
    /// Stopped for good.
    Stopped,
}

impl fmt::Display for DispatcherState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Running => f.write_str("RUNNING"),
            Self::Stopped => f.write_str("STOPPED"),
        }
    }
}

fn spawn_failure(e: std::io::Error) -> SchedulerError {
    SchedulerError::Pool(PoolError::Internal(format!("spawn dispatcher thread: {e}")))
}

struct DispatchShared {
    core: Arc<SchedulerCore>,
    pool: Arc<WorkerPool<ScheduledTask, TaskRunner>>,
    state: Mutex<DispatcherState>,
    wake: Condvar,
    /// Serializes ticks from the loop thread and manual callers.
    tick_lock: Mutex<()>,
    interval: Duration,
}

/// Handle to the dispatch loop thread.
pub struct Dispatcher {
    shared: Arc<DispatchShared>,
    thread: Mutex<Option<JoinHandle<()>>>,
}

impl Dispatcher {
    /// Start the loop; the dispatcher is `Running` on return.
    pub(crate) fn spawn(
        core: Arc<SchedulerCore>,
        pool: Arc<WorkerPool<ScheduledTask, TaskRunner>>,
        interval: Duration,
    ) -> Result<Self, SchedulerError> {
        let shared = Arc::new(DispatchShared {
            core,
            pool,
            state: Mutex::new(DispatcherState::Running),
            wake: Condvar::new(),
            tick_lock: Mutex::new(()),
            interval,
        });

        let loop_shared = Arc::clone(&shared);
        let handle = thread::Builder::new()
            .name("task-dispatcher".into())
            .spawn(move || loop_shared.run_loop())
            .map_err(spawn_failure)?;

        info!(interval = ?interval, "Dispatcher started");
        Ok(Self {
            shared,
            thread: Mutex::new(Some(handle)),
        })
    }

    /// Current state.
    #[must_use]
    pub fn state(&self) -> DispatcherState {
        *self.shared.state.lock()
    }

    /// Whether the loop is still ticking.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.shared.is_running()
    }

    /// Run one tick as of `now_ms`, returning how many tasks were dispatched.
    ///
    /// Serialized with the loop's own ticks. Does nothing once stopped.
    pub fn tick(&self, now_ms: u128) -> usize {
        self.shared.tick(now_ms)
    }

    /// Stop the loop and wait for every in-progress tick to finish.
    ///
    /// On return, each task a tick already marked `Running` has been handed
    /// to the pool (or recorded as refused).
    pub fn stop(&self) {
        if !self.shared.signal_stop() {
            return;
        }
        if let Some(handle) = self.thread.lock().take() {
            if handle.join().is_err() {
                warn!("Dispatcher thread panicked");
            }
        }
        // Manual ticks run on caller threads; wait them out too.
        drop(self.shared.tick_lock.lock());
        info!("Dispatcher stopped");
    }
}

impl Drop for Dispatcher {
    fn drop(&mut self) {
        // Signal only; joining is left to an explicit stop().
        self.shared.signal_stop();
    }
}

impl DispatchShared {
    fn is_running(&self) -> bool {
        *self.state.lock() == DispatcherState::Running
    }

    /// Move to `Stopped`. Returns whether this call made the transition.
    fn signal_stop(&self) -> bool {
        let mut state = self.state.lock();
        if *state == DispatcherState::Stopped {
            return false;
        }
        *state = DispatcherState::Stopped;
        drop(state);
        self.wake.notify_all();
        true
    }

    fn run_loop(&self) {
        let mut state = self.state.lock();
        while *state == DispatcherState::Running {
            self.wake.wait_for(&mut state, self.interval);
            if *state != DispatcherState::Running {
                break;
            }
            MutexGuard::unlocked(&mut state, || {
                self.tick(self.core.clock.now_ms());
            });
        }
        debug!("Dispatch loop exiting");
    }

    fn tick(&self, now_ms: u128) -> usize {
        let _serial = self.tick_lock.lock();
        let mut dispatched = 0;
        // The backend promotes every due task before choosing, so a
        // not-yet-due head never hides a due task of lower priority.
        // Due tasks beyond the pool's capacity stay queued in priority order.
        while self.is_running() && self.has_capacity() {
            let Some(task) = self.core.queue.pop_due(now_ms) else {
                break;
            };
            self.dispatch(task);
            dispatched += 1;
        }
        if dispatched > 0 {
            debug!(dispatched, pending = self.core.queue.len(), "Dispatch tick");
        }
        dispatched
    }

    fn has_capacity(&self) -> bool {
        self.core.in_flight.load(Ordering::Acquire) < self.pool.config().max_workers
    }

    fn dispatch(&self, task: ScheduledTask) {
        let task_id = task.id().to_owned();
        let task_name = task.name().to_owned();

        self.core.in_flight.fetch_add(1, Ordering::AcqRel);
        if let Err(e) = self.core.registry.advance(&task_id, TaskStatus::Running) {
            warn!(task_id = %task_id, error = %e, "Dispatching task with unexpected status");
        }
        log_persistence_failure(
            "update_status",
            self.core.sink.update_status(&task_id, TaskStatus::Running),
        );
        debug!(task_id = %task_id, priority = %task.priority(), "Dispatching task");

        if let Err(e) = self.pool.submit(task) {
            warn!(task_id = %task_id, error = %e, "Worker pool refused task");
            self.core
                .fail_unexecuted(&task_id, &task_name, POOL_REJECTED_MESSAGE);
        }
    }
}
