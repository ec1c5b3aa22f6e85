//! Configuration models for the worker pool and scheduler.

pub mod pool;

pub use pool::{SchedulerConfig, WorkerPoolConfig};
