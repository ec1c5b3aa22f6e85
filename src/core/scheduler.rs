//! The scheduler facade: queue, registry, history, pool and dispatcher.

use std::sync::atomic::AtomicUsize;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use tracing::info;

use super::persistence::log_persistence_failure;
use super::runner::TaskRunner;
use super::{
    Dispatcher, DispatcherState, ExecutionCounters, ExecutionHistory, ExecutionRecord,
    PersistenceSink, PoolStats, PriorityTaskQueue, ScheduledTask, SchedulerError, StatusRegistry,
    SystemMetrics, WorkerPool,
};
use crate::config::SchedulerConfig;
use crate::util::clock::Clock;
use crate::util::serde::{TaskId, TaskStatus};

/// Stores shared by the facade, the dispatcher and every worker.
///
/// Each store synchronizes itself; nothing here takes a global lock.
pub(crate) struct SchedulerCore {
    pub(crate) queue: PriorityTaskQueue,
    pub(crate) registry: StatusRegistry,
    pub(crate) history: ExecutionHistory,
    pub(crate) counters: ExecutionCounters,
    pub(crate) sink: Arc<dyn PersistenceSink>,
    pub(crate) clock: Arc<dyn Clock>,
    /// Tasks marked `Running` whose outcome is not yet recorded.
    pub(crate) in_flight: AtomicUsize,
}

/// In-process priority task scheduler.
///
/// `schedule_task` is the only mutation entry point; everything else is a
/// non-blocking read or lifecycle control.
///
/// # Example
///
/// ```rust,ignore
/// use prometheus_task_scheduler::config::SchedulerConfig;
/// use prometheus_task_scheduler::core::{FnAction, ScheduledTask, TaskScheduler};
/// use prometheus_task_scheduler::util::Priority;
///
/// let scheduler = TaskScheduler::new(SchedulerConfig::default())?;
/// scheduler.schedule_task(ScheduledTask::immediate(
///     "RevenueReporting",
///     Priority::Critical,
///     FnAction::new(|| Ok(())),
/// ))?;
/// println!("{}", scheduler.metrics());
/// scheduler.shutdown();
/// ```
pub struct TaskScheduler {
    core: Arc<SchedulerCore>,
    pool: Arc<WorkerPool<ScheduledTask, TaskRunner>>,
    dispatcher: Dispatcher,
    /// Held for reading across a whole `schedule_task`, for writing by `shutdown`.
    accepting: RwLock<bool>,
    shutdown_timeout: Duration,
}

impl TaskScheduler {
    /// Build a scheduler with the system clock and no persistence.
    ///
    /// # Errors
    ///
    /// Invalid configuration or failure to start threads.
    pub fn new(config: SchedulerConfig) -> Result<Self, SchedulerError> {
        crate::builders::SchedulerBuilder::new(config).build()
    }

    pub(crate) fn from_parts(
        config: &SchedulerConfig,
        sink: Arc<dyn PersistenceSink>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, SchedulerError> {
        config.validate().map_err(SchedulerError::InvalidConfig)?;

        let core = Arc::new(SchedulerCore {
            queue: PriorityTaskQueue::default(),
            registry: StatusRegistry::new(),
            history: ExecutionHistory::new(),
            counters: ExecutionCounters::new(),
            sink,
            clock,
            in_flight: AtomicUsize::new(0),
        });
        let pool = Arc::new(WorkerPool::new(
            config.pool.clone(),
            TaskRunner::new(Arc::clone(&core)),
        )?);
        let dispatcher = Dispatcher::spawn(
            Arc::clone(&core),
            Arc::clone(&pool),
            config.dispatch_interval(),
        )?;

        info!(
            min_workers = config.pool.min_workers,
            max_workers = config.pool.max_workers,
            dispatch_interval_ms = config.dispatch_interval_ms,
            "Task scheduler started"
        );
        Ok(Self {
            core,
            pool,
            dispatcher,
            accepting: RwLock::new(true),
            shutdown_timeout: config.shutdown_timeout(),
        })
    }

    /// Enqueue a task and mark it `Pending`.
    ///
    /// # Errors
    ///
    /// `ShutDown` after [`TaskScheduler::shutdown`]; `InvalidTransition` if a
    /// task with the same id was already scheduled.
    pub fn schedule_task(&self, task: ScheduledTask) -> Result<TaskId, SchedulerError> {
        let accepting = self.accepting.read();
        if !*accepting {
            return Err(SchedulerError::ShutDown);
        }
        let descriptor = task.descriptor();

        // Register before enqueueing so the dispatcher always finds `Pending`.
        self.core.registry.register_pending(&descriptor.id)?;
        log_persistence_failure(
            "save_task",
            self.core.sink.save_task(&descriptor, TaskStatus::Pending),
        );
        self.core.queue.enqueue(task);
        drop(accepting);

        info!(
            task_id = %descriptor.id,
            name = %descriptor.name,
            priority = %descriptor.priority,
            scheduled_time_ms = %descriptor.scheduled_time_ms,
            "Scheduled task"
        );
        Ok(descriptor.id)
    }

    /// Run a dispatch tick now instead of waiting for the next period.
    /// Returns the number of tasks handed to the pool.
    pub fn dispatch_due(&self) -> usize {
        self.dispatcher.tick(self.core.clock.now_ms())
    }

    /// Current status of a task.
    #[must_use]
    pub fn task_status(&self, task_id: &str) -> Option<TaskStatus> {
        self.core.registry.get(task_id)
    }

    /// Snapshot of queue, pool and outcome counters.
    #[must_use]
    pub fn metrics(&self) -> SystemMetrics {
        SystemMetrics {
            pending_tasks: self.core.queue.len(),
            active_workers: self.pool.active_count(),
            pool_size: self.pool.pool_size(),
            completed_tasks: self.core.counters.completed(),
            failed_tasks: self.core.counters.failed(),
            total_executions: self.core.history.len(),
        }
    }

    /// Every execution record so far, in insertion order.
    #[must_use]
    pub fn execution_history(&self) -> Vec<ExecutionRecord> {
        self.core.history.snapshot()
    }

    /// Number of tasks currently in `status`.
    #[must_use]
    pub fn count_with_status(&self, status: TaskStatus) -> usize {
        self.core.registry.count(status)
    }

    /// Worker pool statistics.
    #[must_use]
    pub fn pool_stats(&self) -> PoolStats {
        self.pool.stats()
    }

    /// Dispatch loop state.
    #[must_use]
    pub fn dispatcher_state(&self) -> DispatcherState {
        self.dispatcher.state()
    }

    /// Whether `schedule_task` still accepts work.
    #[must_use]
    pub fn is_accepting(&self) -> bool {
        *self.accepting.read()
    }

    /// Stop dispatching, stop the pool, and wait for in-flight work.
    ///
    /// Tasks already handed to the pool finish and are recorded; tasks still
    /// queued stay `Pending`. Returns `true` if every worker exited within the
    /// configured shutdown timeout. Calling it again is a no-op returning `true`.
    pub fn shutdown(&self) -> bool {
        {
            // Waits for in-progress schedule_task calls; none start afterwards.
            let mut accepting = self.accepting.write();
            if !*accepting {
                return true;
            }
            *accepting = false;
        }
        info!(pending = self.core.queue.len(), "Shutting down task scheduler");
        self.dispatcher.stop();
        self.pool.shutdown();
        let drained = self.pool.await_termination(self.shutdown_timeout);
        info!(drained, metrics = %self.metrics(), "Task scheduler shut down");
        drained
    }
}

impl Drop for TaskScheduler {
    fn drop(&mut self) {
        *self.accepting.get_mut() = false;
        // Dispatcher and pool signal their own threads when dropped.
    }
}
