//! Core scheduling engine: tasks, queue, worker pool, dispatcher, and the
//! concurrent stores that track each task's lifecycle.

pub mod dispatcher;
pub mod error;
pub mod executor;
pub mod history;
pub mod metrics;
pub mod persistence;
pub mod queue;
pub mod registry;
mod runner;
pub mod scheduler;
pub mod task;
pub mod worker_pool;

pub use dispatcher::{Dispatcher, DispatcherState, POOL_REJECTED_MESSAGE};
pub use error::{AppResult, SchedulerError};
pub use executor::{FnAction, TaskAction, WorkerExecutor};
pub use history::{ExecutionCounters, ExecutionHistory, ExecutionRecord};
pub use metrics::SystemMetrics;
pub use persistence::{InMemoryPersistence, NoopPersistence, PersistenceEvent, PersistenceSink};
pub use queue::{PriorityTaskQueue, TaskQueue};
pub use registry::StatusRegistry;
pub use runner::UNKNOWN_FAILURE_MESSAGE;
pub use scheduler::TaskScheduler;
pub(crate) use scheduler::SchedulerCore;
pub use task::{ScheduledTask, TaskDescriptor};
pub use worker_pool::{PoolError, PoolStats, WorkerPool};
