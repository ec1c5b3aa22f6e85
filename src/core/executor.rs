//! Execution traits: what a task does, and what a pool worker runs.

use async_trait::async_trait;

use super::AppResult;

/// The unit of work carried by a task: a single "execute, may fail" operation.
///
/// Actions run on a pool worker thread inside a current-thread tokio runtime,
/// so they may `.await` timers and other runtime-agnostic futures.
///
/// # Example
///
/// ```rust,ignore
/// use async_trait::async_trait;
/// use prometheus_task_scheduler::core::{AppResult, TaskAction};
///
/// struct RebuildIndex;
///
/// #[async_trait]
/// impl TaskAction for RebuildIndex {
///     async fn run(&self) -> AppResult<()> {
///         tokio::time::sleep(std::time::Duration::from_millis(50)).await;
///         Ok(())
///     }
/// }
/// ```
#[async_trait]
pub trait TaskAction: Send + Sync + 'static {
    /// Perform the work. An `Err` marks the task `Failed` with its message.
    async fn run(&self) -> AppResult<()>;
}

/// Adapter turning a synchronous closure into a [`TaskAction`].
pub struct FnAction<F> {
    f: F,
}

impl<F> FnAction<F>
where
    F: Fn() -> AppResult<()> + Send + Sync + 'static,
{
    /// Wrap a closure.
    pub const fn new(f: F) -> Self {
        Self { f }
    }
}

#[async_trait]
impl<F> TaskAction for FnAction<F>
where
    F: Fn() -> AppResult<()> + Send + Sync + 'static,
{
    async fn run(&self) -> AppResult<()> {
        (self.f)()
    }
}

/// Executor invoked by `WorkerPool` workers for each submitted payload.
///
/// On native platforms `execute` is driven by the worker thread's own
/// single-threaded tokio runtime, so blocking inside it only occupies
/// that worker.
#[async_trait]
pub trait WorkerExecutor<P>: Send + Sync + Clone + 'static
where
    P: Send + 'static,
{
    /// Run one payload to completion.
    async fn execute(&self, payload: P);
}
