//! # Prometheus Task Scheduler
//!
//! An in-process, priority- and time-ordered task scheduler backed by an
//! adaptive pool of dedicated worker threads.
//!
//! Clients submit named tasks with a priority, an advisory duration estimate,
//! a scheduled start time and an action. A periodic dispatcher hands every due
//! task to the pool, highest priority first, and the scheduler records each
//! task's lifecycle (`PENDING -> RUNNING -> COMPLETED | FAILED`), an execution
//! history, and aggregate metrics for a monitoring dashboard.
//!
//! ## Key Features
//!
//! - **Priority with time gating**: a task never runs before its scheduled
//!   time; among due tasks the highest priority weight wins, then the earliest
//!   scheduled time
//! - **Adaptive worker pool**: `min_workers` threads always alive, growth to
//!   `max_workers` while every worker is busy, idle retirement after keep-alive
//! - **Failure containment**: an action that errors or panics is recorded as
//!   `FAILED` and never takes down its worker
//! - **Pluggable persistence**: lifecycle events go to a [`core::PersistenceSink`];
//!   the core owns no storage schema
//! - **Dashboard DTOs**: [`runtime::api`] serializes metrics and history in
//!   the dashboard's camelCase wire format
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::time::Duration;
//! use prometheus_task_scheduler::builders::SchedulerBuilder;
//! use prometheus_task_scheduler::config::SchedulerConfig;
//! use prometheus_task_scheduler::core::{FnAction, ScheduledTask};
//! use prometheus_task_scheduler::util::Priority;
//!
//! let scheduler = SchedulerBuilder::from_env()?.build()?;
//! scheduler.schedule_task(ScheduledTask::delayed(
//!     "DatabaseCleanup",
//!     Priority::Low,
//!     FnAction::new(|| Ok(())),
//!     Duration::from_secs(1),
//! ))?;
//! println!("{}", prometheus_task_scheduler::runtime::metrics_json(&scheduler)?);
//! scheduler.shutdown();
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

/// Core scheduling engine: queue, registry, history, pool, dispatcher.
pub mod core;
/// Configuration models for the pool and the dispatch loop.
pub mod config;
/// Builders to construct a scheduler from configuration.
pub mod builders;
/// Infrastructure adapters for queue backends and persistence.
pub mod infra;
/// Dashboard-facing API surface.
pub mod runtime;
/// Shared utilities: ids, enums, clocks, telemetry.
pub mod util;
