//! Presentation-facing API surface over a running scheduler.

pub mod api;

pub use api::{
    health, history_json, history_response, metrics_json, metrics_response, Health, HistoryEntry,
    MetricsResponse,
};
