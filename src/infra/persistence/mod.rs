//! Persistence adapters.

pub mod background;

pub use background::BackgroundPersistence;
