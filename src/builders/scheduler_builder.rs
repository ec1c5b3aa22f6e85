//! Builder wiring configuration, persistence and clock into a scheduler.

use std::sync::Arc;

use crate::config::SchedulerConfig;
use crate::core::{NoopPersistence, PersistenceSink, SchedulerError, TaskScheduler};
use crate::util::clock::{Clock, SystemClock};

/// Assembles a [`TaskScheduler`].
///
/// Defaults to [`NoopPersistence`] and [`SystemClock`].
pub struct SchedulerBuilder {
    config: SchedulerConfig,
    sink: Arc<dyn PersistenceSink>,
    clock: Arc<dyn Clock>,
}

impl SchedulerBuilder {
    /// Start from a configuration.
    #[must_use]
    pub fn new(config: SchedulerConfig) -> Self {
        Self {
            config,
            sink: Arc::new(NoopPersistence),
            clock: Arc::new(SystemClock),
        }
    }

    /// Start from `SCHEDULER_*` environment variables.
    ///
    /// # Errors
    ///
    /// `InvalidConfig` if the environment holds unparseable or invalid values.
    pub fn from_env() -> Result<Self, SchedulerError> {
        SchedulerConfig::from_env()
            .map(Self::new)
            .map_err(SchedulerError::InvalidConfig)
    }

    /// Report lifecycle events to `sink`.
    #[must_use]
    pub fn with_persistence(mut self, sink: impl PersistenceSink + 'static) -> Self {
        self.sink = Arc::new(sink);
        self
    }

    /// Report lifecycle events to a sink the caller keeps a handle to.
    #[must_use]
    pub fn with_shared_persistence(mut self, sink: Arc<dyn PersistenceSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Read time from `clock` instead of the system clock.
    #[must_use]
    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    /// Validate the configuration and start the scheduler.
    ///
    /// # Errors
    ///
    /// `InvalidConfig` for a bad configuration, `Pool` if workers cannot start.
    pub fn build(self) -> Result<TaskScheduler, SchedulerError> {
        TaskScheduler::from_parts(&self.config, self.sink, self.clock)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::WorkerPoolConfig;

    #[test]
    fn test_build_rejects_invalid_config() {
        let mut config = SchedulerConfig::with_pool(WorkerPoolConfig::new().with_fixed_workers(1));
        config.dispatch_interval_ms = 0;
        let result = SchedulerBuilder::new(config).build();
        assert!(matches!(result, Err(SchedulerError::InvalidConfig(_))));
    }

    #[test]
    fn test_build_and_shutdown() {
        let config = SchedulerConfig::with_pool(WorkerPoolConfig::new().with_fixed_workers(1));
        let scheduler = SchedulerBuilder::new(config).build().unwrap();
        assert!(scheduler.is_accepting());
        assert!(scheduler.shutdown());
        assert!(!scheduler.is_accepting());
    }
}
