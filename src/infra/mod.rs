//! Infrastructure adapters for queue backends and persistence.

pub mod persistence;
pub mod queue;

pub use persistence::BackgroundPersistence;
pub use queue::InMemoryQueue;
