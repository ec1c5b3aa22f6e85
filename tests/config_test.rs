//! Tests for configuration parsing and validation.

use std::collections::HashMap;
use std::time::Duration;

use prometheus_task_scheduler::builders::SchedulerBuilder;
use prometheus_task_scheduler::config::{SchedulerConfig, WorkerPoolConfig};
use prometheus_task_scheduler::core::SchedulerError;

fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let map: HashMap<String, String> = pairs
        .iter()
        .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
        .collect();
    move |key: &str| map.get(key).cloned()
}

#[test]
fn test_defaults_are_valid() {
    let config = SchedulerConfig::default();
    assert!(config.validate().is_ok());
    assert_eq!(config.dispatch_interval(), Duration::from_millis(100));
    assert_eq!(config.pool.min_workers, 2);
    assert!(config.pool.max_workers >= config.pool.min_workers);
    assert_eq!(config.pool.keep_alive(), Duration::from_secs(60));
}

#[test]
fn test_pool_config_rejects_zero_floor() {
    let config = WorkerPoolConfig::new().with_fixed_workers(0);
    assert!(config.validate().is_err());
}

#[test]
fn test_pool_config_rejects_ceiling_below_floor() {
    let config = WorkerPoolConfig::new().with_min_workers(5).with_max_workers(3);
    let err = config.validate().unwrap_err();
    assert!(err.contains("max_workers"));
}

#[test]
fn test_pool_config_rejects_tiny_stack() {
    let config = WorkerPoolConfig::new()
        .with_fixed_workers(1)
        .with_thread_stack_size(1024);
    assert!(config.validate().is_err());
}

#[test]
fn test_scheduler_config_rejects_zero_interval() {
    let mut config = SchedulerConfig::with_pool(WorkerPoolConfig::new().with_fixed_workers(1));
    config.dispatch_interval_ms = 0;
    assert!(config.validate().is_err());
}

#[test]
fn test_from_json_fills_missing_fields() {
    let config = SchedulerConfig::from_json_str(
        r#"{ "pool": { "min_workers": 3, "max_workers": 7 }, "dispatch_interval_ms": 250 }"#,
    )
    .unwrap();
    assert_eq!(config.pool.min_workers, 3);
    assert_eq!(config.pool.max_workers, 7);
    assert_eq!(config.pool.keep_alive_ms, 60_000);
    assert_eq!(config.dispatch_interval_ms, 250);
    assert_eq!(config.shutdown_timeout_ms, 30_000);
}

#[test]
fn test_from_json_rejects_invalid_values() {
    let err = SchedulerConfig::from_json_str(r#"{ "pool": { "min_workers": 0 } }"#).unwrap_err();
    assert!(err.contains("min_workers"));
    assert!(SchedulerConfig::from_json_str("not json").is_err());
}

#[test]
fn test_from_lookup_overrides_defaults() {
    let config = SchedulerConfig::from_lookup(lookup(&[
        (SchedulerConfig::ENV_MIN_WORKERS, "4"),
        (SchedulerConfig::ENV_MAX_WORKERS, " 16 "),
        (SchedulerConfig::ENV_DISPATCH_INTERVAL_MS, "50"),
        (SchedulerConfig::ENV_KEEP_ALIVE_MS, "1000"),
        (SchedulerConfig::ENV_SHUTDOWN_TIMEOUT_MS, "2000"),
    ]))
    .unwrap();
    assert_eq!(config.pool.min_workers, 4);
    assert_eq!(config.pool.max_workers, 16);
    assert_eq!(config.dispatch_interval_ms, 50);
    assert_eq!(config.pool.keep_alive_ms, 1000);
    assert_eq!(config.shutdown_timeout(), Duration::from_secs(2));
}

#[test]
fn test_from_lookup_without_keys_is_default() {
    let config = SchedulerConfig::from_lookup(|_| None).unwrap();
    assert_eq!(config, SchedulerConfig::default());
}

#[test]
fn test_from_lookup_reports_unparseable_key() {
    let err =
        SchedulerConfig::from_lookup(lookup(&[(SchedulerConfig::ENV_MAX_WORKERS, "many")]))
            .unwrap_err();
    assert!(err.contains("SCHEDULER_MAX_WORKERS"));
}

#[test]
fn test_builder_surfaces_invalid_config() {
    let config = SchedulerConfig::with_pool(WorkerPoolConfig::new().with_min_workers(3).with_max_workers(1));
    let result = SchedulerBuilder::new(config).build();
    match result {
        Err(SchedulerError::InvalidConfig(msg)) => assert!(msg.contains("pool invalid")),
        Err(other) => panic!("unexpected error: {other}"),
        Ok(_) => panic!("invalid config accepted"),
    }
}
