//! Pool and scheduler configuration structures.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Default dispatch tick period.
pub const DEFAULT_DISPATCH_INTERVAL_MS: u64 = 100;
/// Default idle time before a worker above the floor retires.
pub const DEFAULT_KEEP_ALIVE_MS: u64 = 60_000;
/// Default grace period for in-flight work on shutdown.
pub const DEFAULT_SHUTDOWN_TIMEOUT_MS: u64 = 30_000;
/// Default worker thread stack size.
pub const DEFAULT_THREAD_STACK_SIZE: usize = 2 * 1024 * 1024;

/// Worker pool sizing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkerPoolConfig {
    /// Workers kept alive even when idle.
    pub min_workers: usize,
    /// Upper bound on concurrently live workers.
    pub max_workers: usize,
    /// Idle time after which a worker above `min_workers` exits.
    pub keep_alive_ms: u64,
    /// Stack size for each worker thread.
    pub thread_stack_size: usize,
}

impl Default for WorkerPoolConfig {
    fn default() -> Self {
        Self {
            min_workers: 2,
            max_workers: num_cpus::get().max(2),
            keep_alive_ms: DEFAULT_KEEP_ALIVE_MS,
            thread_stack_size: DEFAULT_THREAD_STACK_SIZE,
        }
    }
}

impl WorkerPoolConfig {
    /// Defaults: floor of 2, ceiling of the CPU count.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the worker floor.
    #[must_use]
    pub const fn with_min_workers(mut self, min_workers: usize) -> Self {
        self.min_workers = min_workers;
        self
    }

    /// Set the worker ceiling.
    #[must_use]
    pub const fn with_max_workers(mut self, max_workers: usize) -> Self {
        self.max_workers = max_workers;
        self
    }

    /// Set floor and ceiling to the same value.
    #[must_use]
    pub const fn with_fixed_workers(mut self, workers: usize) -> Self {
        self.min_workers = workers;
        self.max_workers = workers;
        self
    }

    /// Set the idle retirement timeout.
    #[must_use]
    pub fn with_keep_alive(mut self, keep_alive: Duration) -> Self {
        self.keep_alive_ms = u64::try_from(keep_alive.as_millis()).unwrap_or(u64::MAX);
        self
    }

    /// Set the worker thread stack size.
    #[must_use]
    pub const fn with_thread_stack_size(mut self, bytes: usize) -> Self {
        self.thread_stack_size = bytes;
        self
    }

    /// Idle retirement timeout.
    #[must_use]
    pub const fn keep_alive(&self) -> Duration {
        Duration::from_millis(self.keep_alive_ms)
    }

    /// Validate sizing.
    ///
    /// # Errors
    ///
    /// Describes the first invalid field.
    pub fn validate(&self) -> Result<(), String> {
        if self.min_workers == 0 {
            return Err("min_workers must be greater than 0".into());
        }
        if self.max_workers < self.min_workers {
            return Err(format!(
                "max_workers ({}) must be >= min_workers ({})",
                self.max_workers, self.min_workers
            ));
        }
        if self.keep_alive_ms == 0 {
            return Err("keep_alive_ms must be greater than 0".into());
        }
        if self.thread_stack_size < 64 * 1024 {
            return Err("thread_stack_size must be at least 64 KiB".into());
        }
        Ok(())
    }
}

/// Root scheduler configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Worker pool sizing.
    pub pool: WorkerPoolConfig,
    /// Dispatch tick period in milliseconds.
    pub dispatch_interval_ms: u64,
    /// How long `shutdown` waits for in-flight work, in milliseconds.
    pub shutdown_timeout_ms: u64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            pool: WorkerPoolConfig::default(),
            dispatch_interval_ms: DEFAULT_DISPATCH_INTERVAL_MS,
            shutdown_timeout_ms: DEFAULT_SHUTDOWN_TIMEOUT_MS,
        }
    }
}

impl SchedulerConfig {
    /// Environment key for [`WorkerPoolConfig::min_workers`].
    pub const ENV_MIN_WORKERS: &'static str = "SCHEDULER_MIN_WORKERS";
    /// Environment key for [`WorkerPoolConfig::max_workers`].
    pub const ENV_MAX_WORKERS: &'static str = "SCHEDULER_MAX_WORKERS";
    /// Environment key for [`SchedulerConfig::dispatch_interval_ms`].
    pub const ENV_DISPATCH_INTERVAL_MS: &'static str = "SCHEDULER_DISPATCH_INTERVAL_MS";
    /// Environment key for [`WorkerPoolConfig::keep_alive_ms`].
    pub const ENV_KEEP_ALIVE_MS: &'static str = "SCHEDULER_KEEP_ALIVE_MS";
    /// Environment key for [`SchedulerConfig::shutdown_timeout_ms`].
    pub const ENV_SHUTDOWN_TIMEOUT_MS: &'static str = "SCHEDULER_SHUTDOWN_TIMEOUT_MS";

    /// Defaults with the given pool sizing.
    #[must_use]
    pub fn with_pool(pool: WorkerPoolConfig) -> Self {
        Self {
            pool,
            ..Self::default()
        }
    }

    /// Dispatch tick period.
    #[must_use]
    pub const fn dispatch_interval(&self) -> Duration {
        Duration::from_millis(self.dispatch_interval_ms)
    }

    /// Shutdown grace period.
    #[must_use]
    pub const fn shutdown_timeout(&self) -> Duration {
        Duration::from_millis(self.shutdown_timeout_ms)
    }

    /// Validate the pool and timing values.
    ///
    /// # Errors
    ///
    /// Describes the first invalid field.
    pub fn validate(&self) -> Result<(), String> {
        self.pool.validate().map_err(|e| format!("pool invalid: {e}"))?;
        if self.dispatch_interval_ms == 0 {
            return Err("dispatch_interval_ms must be greater than 0".into());
        }
        Ok(())
    }

    /// Parse scheduler configuration from a JSON string and validate.
    ///
    /// Missing fields take their defaults.
    ///
    /// # Errors
    ///
    /// Parse or validation failure.
    pub fn from_json_str(input: &str) -> Result<Self, String> {
        let cfg: Self = serde_json::from_str(input).map_err(|e| format!("parse error: {e}"))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Build from `SCHEDULER_*` environment variables, loading `.env` first.
    ///
    /// # Errors
    ///
    /// Unparseable values or a configuration that fails validation.
    pub fn from_env() -> Result<Self, String> {
        // A missing .env file is normal.
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup using the `SCHEDULER_*` keys.
    ///
    /// # Errors
    ///
    /// Unparseable values or a configuration that fails validation.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, String>
    where
        F: Fn(&str) -> Option<String>,
    {
        fn parse<T: std::str::FromStr>(key: &str, raw: Option<String>) -> Result<Option<T>, String>
        where
            T::Err: std::fmt::Display,
        {
            raw.map(|v| {
                v.trim()
                    .parse::<T>()
                    .map_err(|e| format!("{key}={v:?}: {e}"))
            })
            .transpose()
        }

        let mut cfg = Self::default();
        if let Some(v) = parse(Self::ENV_MIN_WORKERS, lookup(Self::ENV_MIN_WORKERS))? {
            cfg.pool.min_workers = v;
        }
        if let Some(v) = parse(Self::ENV_MAX_WORKERS, lookup(Self::ENV_MAX_WORKERS))? {
            cfg.pool.max_workers = v;
        }
        if let Some(v) = parse(Self::ENV_KEEP_ALIVE_MS, lookup(Self::ENV_KEEP_ALIVE_MS))? {
            cfg.pool.keep_alive_ms = v;
        }
        if let Some(v) = parse(
            Self::ENV_DISPATCH_INTERVAL_MS,
            lookup(Self::ENV_DISPATCH_INTERVAL_MS),
        )? {
            cfg.dispatch_interval_ms = v;
        }
        if let Some(v) = parse(
            Self::ENV_SHUTDOWN_TIMEOUT_MS,
            lookup(Self::ENV_SHUTDOWN_TIMEOUT_MS),
        )? {
            cfg.shutdown_timeout_ms = v;
        }
        cfg.validate()?;
        Ok(cfg)
    }
}
